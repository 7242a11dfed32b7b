use crate::config::Settings;
use crate::core::retry::{RetryError, RetryPolicy, Step};
use crate::domain::model::{AuthToken, BannerRequest};
use crate::domain::ports::{Clock, SystemClock, Transport, TransportResponse};
use crate::utils::error::{Result, ShowAdsError};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// 送出結果；失敗時由呼叫端決定是否改為逐筆送出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed { reason: String },
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AuthRequest<'a> {
    project_key: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthResponse {
    access_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BulkPayload<'a> {
    data: &'a [BannerRequest],
}

/// 送出迴圈內部的致命結果
enum SubmitError {
    /// 400：請求本身有問題，重試無益
    Rejected(String),
    /// 無法取得 token，整個流程需中止
    Auth(ShowAdsError),
}

/// ShowAds API client。
///
/// 持有唯一的 token 快取：token 只有在 `expires_at` 嚴格晚於現在時才會使用，
/// 否則先同步刷新。快取以 mutex 保護並在刷新期間持有，同一時間最多只有一個刷新，
/// 其他呼叫端等待後直接沿用新 token。
pub struct ShowAdsClient<T: Transport, C: Clock = SystemClock> {
    settings: Settings,
    transport: T,
    clock: C,
    retry: RetryPolicy,
    token: Mutex<Option<AuthToken>>,
}

impl<T: Transport> ShowAdsClient<T> {
    pub fn new(settings: Settings, transport: T) -> Self {
        Self::with_clock(settings, transport, SystemClock)
    }
}

impl<T: Transport, C: Clock> ShowAdsClient<T, C> {
    pub fn with_clock(settings: Settings, transport: T, clock: C) -> Self {
        let retry = RetryPolicy::new(settings.max_retries, settings.retry_backoff());
        Self {
            settings,
            transport,
            clock,
            retry,
            token: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// 目前快取的 token（不觸發刷新）
    pub async fn cached_token(&self) -> Option<AuthToken> {
        self.token.lock().await.clone()
    }

    /// 取得有效的 access token，必要時先刷新
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_valid_at(self.clock.now()) {
                return Ok(token.access_token.clone());
            }
            tracing::debug!("Access token expired at {}, refreshing", token.expires_at);
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// 伺服器拒絕 `rejected` 之後呼叫；若其他呼叫端已換過 token 則直接沿用
    async fn refresh_rejected_token(&self, rejected: &str) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.access_token != rejected && token.is_valid_at(self.clock.now()) {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn request_token(&self) -> Result<AuthToken> {
        let url = self.settings.endpoint("/auth");
        let payload = serde_json::to_value(AuthRequest {
            project_key: &self.settings.project_key,
        })?;
        let (url, payload) = (url.as_str(), &payload);

        match self
            .retry
            .run("auth", |_| self.auth_attempt(url, payload))
            .await
        {
            Ok(token) => {
                tracing::info!("🔑 Obtained access token (expires at {})", token.expires_at);
                Ok(token)
            }
            Err(RetryError::Fatal(err)) => {
                tracing::error!("❌ Authentication failed: {}", err);
                Err(err)
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                tracing::error!(
                    "❌ Failed to obtain access token after {} attempts: {}",
                    attempts,
                    last
                );
                Err(ShowAdsError::TokenUnavailable)
            }
        }
    }

    async fn auth_attempt(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Step<AuthToken, ShowAdsError> {
        let response = match self.transport.post_json(url, payload, None).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Auth request error: {}", e);
                return Step::Backoff(e.to_string());
            }
        };

        match response.status {
            200 => match serde_json::from_str::<AuthResponse>(&response.body) {
                Ok(AuthResponse {
                    access_token: Some(access_token),
                }) if !access_token.is_empty() => Step::Done(AuthToken {
                    access_token,
                    expires_at: self.expiry_from_now(),
                }),
                _ => Step::Fatal(ShowAdsError::MissingToken),
            },
            400 | 401 => Step::Fatal(ShowAdsError::AuthenticationError {
                status: response.status,
                body: response.body,
            }),
            status => Step::Backoff(format!("auth responded with status {}", status)),
        }
    }

    fn expiry_from_now(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        i64::try_from(self.settings.token_expiry_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// POST /banners/show
    pub async fn show_banner(&self, banner: &BannerRequest) -> Result<Delivery> {
        let url = self.settings.endpoint("/banners/show");
        let payload = serde_json::to_value(banner)?;
        self.post_with_retry("show banner", &url, &payload).await
    }

    /// POST /banners/show/bulk，保持輸入順序
    pub async fn show_banners_bulk(&self, banners: &[BannerRequest]) -> Result<Delivery> {
        let url = self.settings.endpoint("/banners/show/bulk");
        let payload = serde_json::to_value(BulkPayload { data: banners })?;
        self.post_with_retry("show banners bulk", &url, &payload)
            .await
    }

    async fn post_with_retry(
        &self,
        label: &str,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<Delivery> {
        match self
            .retry
            .run(label, |_| self.submit_attempt(url, payload))
            .await
        {
            Ok(()) => Ok(Delivery::Delivered),
            Err(RetryError::Fatal(SubmitError::Rejected(reason))) => {
                Ok(Delivery::Failed { reason })
            }
            Err(RetryError::Fatal(SubmitError::Auth(err))) => Err(err),
            Err(RetryError::Exhausted { attempts, last }) => Ok(Delivery::Failed {
                reason: format!("gave up after {} attempts: {}", attempts, last),
            }),
        }
    }

    async fn submit_attempt(&self, url: &str, payload: &serde_json::Value) -> Step<(), SubmitError> {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(err) => return Step::Fatal(SubmitError::Auth(err)),
        };

        let TransportResponse { status, body } =
            match self.transport.post_json(url, payload, Some(&token)).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Request error: {}", e);
                    return Step::Backoff(e.to_string());
                }
            };

        match status {
            200 => Step::Done(()),
            401 => {
                tracing::info!("Access token expired or invalid, refreshing");
                match self.refresh_rejected_token(&token).await {
                    Ok(_) => Step::Repeat("token rejected with status 401".to_string()),
                    Err(err) => Step::Fatal(SubmitError::Auth(err)),
                }
            }
            400 => {
                tracing::error!("Bad request {}: {}", status, body);
                Step::Fatal(SubmitError::Rejected(format!("bad request (400): {}", body)))
            }
            status => Step::Backoff(format!("status {}", status)),
        }
    }
}
