use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use taskboard::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "taskboard",
        "taskboard starting: RUST_LOG='{}', http_port={}, db_path='{}'",
        rust_log, config.http_port, config.db_path
    );

    taskboard::server::run(config).await
}
