use clap::Parser;
use showads_etl::utils::error::ErrorSeverity;
use showads_etl::utils::{logger, validation::Validate};
use showads_etl::{CliConfig, CustomerProcessor, HttpTransport, ShowAdsClient, ShowAdsError};

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting showads-etl CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    match run(&config).await {
        Ok(()) => {}
        Err(e) => {
            tracing::error!(
                "❌ Processing failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low | ErrorSeverity::High => 1,
                ErrorSeverity::Medium => 2, // 暫時性錯誤，可重試
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }
}

async fn run(config: &CliConfig) -> Result<(), ShowAdsError> {
    let settings = config.load_settings()?;
    settings.validate()?;

    let age_limit = config.age_limit();
    age_limit.validate()?;
    tracing::info!(
        "🎯 Age limit {}..={}, banner ids {}..={}, batch size {}",
        age_limit.min_age,
        age_limit.max_age,
        settings.min_banner_id,
        settings.max_banner_id,
        settings.bulk_batch_size
    );

    let transport = HttpTransport::from_settings(&settings)?;
    let client = ShowAdsClient::new(settings, transport);

    // 拒絕原因已逐筆寫入日誌，CLI 不需要保留明細
    let summary = CustomerProcessor::new(&client, age_limit)
        .with_rejected_limit(0)
        .process_file(&config.csv_path)
        .await?;

    println!(
        "✅ Processed customers: {} valid, {} invalid",
        summary.valid, summary.invalid
    );
    if summary.undelivered > 0 {
        println!(
            "⚠️ {} banners could not be delivered (see log for details)",
            summary.undelivered
        );
    }
    Ok(())
}
