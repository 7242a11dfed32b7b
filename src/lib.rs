pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::http::HttpTransport;
pub use config::Settings;
pub use core::client::{Delivery, ShowAdsClient};
pub use core::processor::{CustomerProcessor, ProcessingSummary};
pub use core::source::CsvSource;
pub use domain::model::{AgeLimit, BannerIdRange, BannerRequest, CustomerRecord};
pub use utils::error::{Result, ShowAdsError};
