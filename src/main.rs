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
    let cfg = opsdeck::config::Config::from_env();
    cfg.log_startup();
    info!(target: "opsdeck", "opsdeck mock admin API starting on port {}", cfg.http_port);

    opsdeck::server::run_with_port(cfg.http_port).await
}
