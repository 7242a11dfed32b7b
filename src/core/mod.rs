pub mod client;
pub mod processor;
pub mod retry;
pub mod source;
pub mod validator;

pub use crate::domain::model::{AgeLimit, AuthToken, BannerIdRange, BannerRequest, CustomerRecord};
pub use crate::domain::ports::{Clock, SystemClock, Transport, TransportResponse};
pub use crate::utils::error::Result;
