use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CLI_DIRECTIVE: &str = "showads_etl=info";
const VERBOSE_DIRECTIVE: &str = "showads_etl=debug,info";
const API_DIRECTIVE: &str = "showads_etl=info,showads_api=info";

/// RUST_LOG 優先；未設定時 verbose 用 debug，否則看 LOG_LEVEL（與舊版部署相容）
fn filter_directive(
    rust_log: Option<String>,
    log_level: Option<String>,
    verbose: bool,
    default_directive: &str,
) -> String {
    let non_empty = |v: Option<String>| v.filter(|v| !v.trim().is_empty());

    if let Some(directive) = non_empty(rust_log) {
        return directive;
    }
    if verbose {
        return VERBOSE_DIRECTIVE.to_string();
    }
    match non_empty(log_level) {
        Some(level) => format!("showads_etl={}", level.trim().to_lowercase()),
        None => default_directive.to_string(),
    }
}

fn build_filter(verbose: bool, default_directive: &str) -> EnvFilter {
    let directive = filter_directive(
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        std::env::var("LOG_LEVEL").ok(),
        verbose,
        default_directive,
    );
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(default_directive))
}

pub fn init_cli_logger(verbose: bool) {
    let filter = build_filter(verbose, CLI_DIRECTIVE);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

pub fn init_json_logger() {
    let filter = build_filter(false, API_DIRECTIVE);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .json(),
        )
        .init();
}
