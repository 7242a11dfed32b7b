use showads_etl::app::server::{router, AppState};
use showads_etl::utils::logger;
use showads_etl::utils::validation::Validate;
use showads_etl::{AgeLimit, HttpTransport, Settings, ShowAdsClient};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init_json_logger();

    let settings = Settings::from_env()?;
    settings.validate()?;

    let addr: SocketAddr = std::env::var("SHOWADS_API_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
        .parse()?;

    let transport = HttpTransport::from_settings(&settings)?;
    let client = ShowAdsClient::new(settings, transport);
    let app = router(AppState::new(client, AgeLimit::default()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 showads-api listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
