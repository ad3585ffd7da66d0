use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let session_store = std::env::var(thingamabob::config::SESSION_STORE_ENV)
        .unwrap_or_else(|_| "<unset>".to_string());
    let http_port = thingamabob::config::http_port();
    info!(
        target: "thingamabob",
        "thingamabob starting: RUST_LOG='{}', http_port={}, SESSION_STORE='{}'",
        rust_log, http_port, session_store
    );

    thingamabob::server::run().await
}
