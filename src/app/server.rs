use crate::core::client::ShowAdsClient;
use crate::core::processor::{CustomerProcessor, ProcessingSummary};
use crate::core::source::CsvSource;
use crate::domain::model::AgeLimit;
use crate::domain::ports::{Clock, SystemClock, Transport};
use crate::utils::error::{ErrorCategory, ShowAdsError};
use crate::utils::validation::Validate;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::io::Cursor;
use std::sync::{Arc, PoisonError, RwLock};

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// 全域年齡政策：讀取時複製一份快照，寫入時整個替換
#[derive(Debug, Clone, Default)]
pub struct SharedAgeLimit(Arc<RwLock<AgeLimit>>);

impl SharedAgeLimit {
    pub fn new(age_limit: AgeLimit) -> Self {
        Self(Arc::new(RwLock::new(age_limit)))
    }

    pub fn get(&self) -> AgeLimit {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn replace(&self, age_limit: AgeLimit) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = age_limit;
    }
}

pub struct AppState<T: Transport, C: Clock = SystemClock> {
    client: Arc<ShowAdsClient<T, C>>,
    age_limit: SharedAgeLimit,
}

impl<T: Transport, C: Clock> Clone for AppState<T, C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            age_limit: self.age_limit.clone(),
        }
    }
}

impl<T: Transport, C: Clock> AppState<T, C> {
    pub fn new(client: ShowAdsClient<T, C>, age_limit: AgeLimit) -> Self {
        Self {
            client: Arc::new(client),
            age_limit: SharedAgeLimit::new(age_limit),
        }
    }

    pub fn age_limit(&self) -> &SharedAgeLimit {
        &self.age_limit
    }
}

/// HTTP 錯誤回應，body 為 `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError(ShowAdsError);

impl From<ShowAdsError> for ApiError {
    fn from(err: ShowAdsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.category() {
            ErrorCategory::Config => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCategory::Input => StatusCode::BAD_REQUEST,
            ErrorCategory::Auth | ErrorCategory::Network => StatusCode::BAD_GATEWAY,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("❌ Request failed: {}", self.0);
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn router<T, C>(state: AppState<T, C>) -> Router
where
    T: Transport + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route(
            "/config/age-limit",
            get(get_age_limit::<T, C>).put(put_age_limit::<T, C>),
        )
        .route("/customers/upload", post(upload_customers::<T, C>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn get_age_limit<T: Transport, C: Clock>(
    State(state): State<AppState<T, C>>,
) -> Json<AgeLimit> {
    Json(state.age_limit.get())
}

async fn put_age_limit<T: Transport, C: Clock>(
    State(state): State<AppState<T, C>>,
    Json(payload): Json<AgeLimit>,
) -> Result<Json<AgeLimit>, ApiError> {
    payload.validate()?;
    state.age_limit.replace(payload);
    tracing::info!(
        "🔧 Age limit updated to {}..={}",
        payload.min_age,
        payload.max_age
    );
    Ok(Json(payload))
}

async fn upload_customers<T: Transport, C: Clock>(
    State(state): State<AppState<T, C>>,
    body: Bytes,
) -> Result<Json<ProcessingSummary>, ApiError> {
    let age_limit = state.age_limit.get();
    tracing::info!("📥 Received customer upload ({} bytes)", body.len());

    let source = CsvSource::from_reader(Cursor::new(body))?;
    let summary = CustomerProcessor::new(&state.client, age_limit)
        .process_source(source)
        .await?;
    Ok(Json(summary))
}
