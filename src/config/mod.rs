#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::model::BannerIdRange;
use crate::utils::error::{Result, ShowAdsError};
use crate::utils::validation::{
    validate_non_empty_string, validate_non_negative_seconds, validate_ordered_range,
    validate_positive_number, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PROJECT_KEY: &str = "dev-key";
pub const DEFAULT_MIN_BANNER_ID: i64 = 1;
pub const DEFAULT_MAX_BANNER_ID: i64 = 99;
pub const DEFAULT_TOKEN_EXPIRY_SECONDS: u64 = 84600;
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_BACKOFF_SECONDS: f64 = 2.0;
pub const DEFAULT_BULK_BATCH_SIZE: usize = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// ShowAds 連線與驗證政策設定，載入後唯讀
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub base_url: String,
    #[serde(default = "default_project_key")]
    pub project_key: String,
    #[serde(default = "default_min_banner_id")]
    pub min_banner_id: i64,
    #[serde(default = "default_max_banner_id")]
    pub max_banner_id: i64,
    #[serde(default = "default_token_expiry_seconds")]
    pub token_expiry_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_seconds")]
    pub retry_backoff_seconds: f64,
    #[serde(default = "default_bulk_batch_size")]
    pub bulk_batch_size: usize,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_project_key() -> String {
    DEFAULT_PROJECT_KEY.to_string()
}
fn default_min_banner_id() -> i64 {
    DEFAULT_MIN_BANNER_ID
}
fn default_max_banner_id() -> i64 {
    DEFAULT_MAX_BANNER_ID
}
fn default_token_expiry_seconds() -> u64 {
    DEFAULT_TOKEN_EXPIRY_SECONDS
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_retry_backoff_seconds() -> f64 {
    DEFAULT_RETRY_BACKOFF_SECONDS
}
fn default_bulk_batch_size() -> usize {
    DEFAULT_BULK_BATCH_SIZE
}
fn default_request_timeout_seconds() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECONDS
}

impl Settings {
    /// 以預設值建立設定，只需提供 base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            project_key: default_project_key(),
            min_banner_id: DEFAULT_MIN_BANNER_ID,
            max_banner_id: DEFAULT_MAX_BANNER_ID,
            token_expiry_seconds: DEFAULT_TOKEN_EXPIRY_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_seconds: DEFAULT_RETRY_BACKOFF_SECONDS,
            bulk_batch_size: DEFAULT_BULK_BATCH_SIZE,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
        }
    }

    /// 從 SHOWADS_* 環境變數載入
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("SHOWADS_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ShowAdsError::MissingConfigError {
                field: "SHOWADS_BASE_URL".to_string(),
            })?;

        Ok(Self {
            base_url,
            project_key: env::var("SHOWADS_PROJECT_KEY").unwrap_or_else(|_| default_project_key()),
            min_banner_id: env_or("SHOWADS_MIN_BANNER_ID", DEFAULT_MIN_BANNER_ID)?,
            max_banner_id: env_or("SHOWADS_MAX_BANNER_ID", DEFAULT_MAX_BANNER_ID)?,
            token_expiry_seconds: env_or(
                "SHOWADS_TOKEN_EXPIRY_SECONDS",
                DEFAULT_TOKEN_EXPIRY_SECONDS,
            )?,
            max_retries: env_or("SHOWADS_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            retry_backoff_seconds: env_or(
                "SHOWADS_RETRY_BACKOFF_SECONDS",
                DEFAULT_RETRY_BACKOFF_SECONDS,
            )?,
            bulk_batch_size: env_or("SHOWADS_BULK_BATCH_SIZE", DEFAULT_BULK_BATCH_SIZE)?,
            request_timeout_seconds: env_or(
                "SHOWADS_REQUEST_TIMEOUT_SECONDS",
                DEFAULT_REQUEST_TIMEOUT_SECONDS,
            )?,
        })
    }

    pub fn banner_range(&self) -> BannerIdRange {
        BannerIdRange::new(self.min_banner_id, self.max_banner_id)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs_f64(self.retry_backoff_seconds.max(0.0))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// 組出 API 端點 URL，容忍 base URL 結尾的斜線
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|_| ShowAdsError::InvalidConfigValueError {
                    field: name.to_string(),
                    value: raw.clone(),
                    reason: "Value is not a valid number".to_string(),
                })
        }
        _ => Ok(default),
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("base_url", &self.base_url)?;
        validate_non_empty_string("project_key", &self.project_key)?;
        validate_ordered_range("banner_id", self.min_banner_id, self.max_banner_id)?;
        validate_positive_number("token_expiry_seconds", self.token_expiry_seconds, 1)?;
        validate_positive_number("max_retries", self.max_retries, 1)?;
        validate_non_negative_seconds("retry_backoff_seconds", self.retry_backoff_seconds)?;
        validate_positive_number("bulk_batch_size", self.bulk_batch_size, 1)?;

        tracing::debug!("✅ Settings validation passed");
        Ok(())
    }
}
