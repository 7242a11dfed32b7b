use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShowAdsError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Transport error: {message}")]
    TransportError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("CSV header is missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("Malformed record at line {line}: {reason} (row: {row})")]
    MalformedRecord {
        line: u64,
        row: String,
        reason: String,
    },

    #[error("Authentication failed with status {status}: {body}")]
    AuthenticationError { status: u16, body: String },

    #[error("Missing AccessToken in auth response")]
    MissingToken,

    #[error("failed to obtain access token")]
    TokenUnavailable,
}

pub type Result<T> = std::result::Result<T, ShowAdsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Input,
    Auth,
    Network,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ShowAdsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::TransportError { .. } => ErrorCategory::Network,
            Self::CsvError(_) | Self::MissingColumns { .. } | Self::MalformedRecord { .. } => {
                ErrorCategory::Input
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Config,
            Self::AuthenticationError { .. } | Self::MissingToken | Self::TokenUnavailable => {
                ErrorCategory::Auth
            }
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MalformedRecord { .. } => ErrorSeverity::Low,
            Self::ApiError(_) | Self::TransportError { .. } | Self::TokenUnavailable => {
                ErrorSeverity::Medium
            }
            Self::CsvError(_)
            | Self::MissingColumns { .. }
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::AuthenticationError { .. }
            | Self::MissingToken => ErrorSeverity::High,
            Self::IoError(_) | Self::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    /// 是否應中止整個處理流程（單筆資料錯誤不算）
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedRecord { .. })
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Config => "檢查 SHOWADS_* 環境變數或 --config 指定的 TOML 檔案",
            ErrorCategory::Input => "確認 CSV 含有 Name, Age, Cookie, Banner_id 欄位且數值欄位為整數",
            ErrorCategory::Auth => "確認 SHOWADS_PROJECT_KEY 是否正確，或稍後再試",
            ErrorCategory::Network => "檢查網路連線與 SHOWADS_BASE_URL，稍後重試",
            ErrorCategory::Internal => "檢查檔案權限與磁碟狀態",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingColumns { missing } => {
                format!("CSV 檔案缺少欄位: {}", missing.join(", "))
            }
            Self::AuthenticationError { status, .. } => {
                format!("ShowAds 認證失敗 (HTTP {})", status)
            }
            Self::MissingToken | Self::TokenUnavailable => "無法取得 ShowAds access token".to_string(),
            Self::MissingConfigError { field } => format!("缺少必要設定: {}", field),
            other => other.to_string(),
        }
    }
}
