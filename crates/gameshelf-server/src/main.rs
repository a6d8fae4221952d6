use std::env;

use anyhow::Context;
use gameshelf_config::loader::load_config;
use gameshelf_server::cli::{CONFIG_ENV, resolve_config_path};
use gameshelf_server::{App, Telemetry, shutdown_signal};

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    let telemetry = Telemetry::install("info");

    if let Err(e) = run(&telemetry).await {
        tracing::error!(error = %format!("{e:#}"), "gameshelf-server failed");
        eprintln!("Error: {e:#}");
        std::process::exit(2);
    }
}

async fn run(telemetry: &Telemetry) -> anyhow::Result<()> {
    let location = resolve_config_path(env::args().skip(1), env::var(CONFIG_ENV).ok());
    let cfg = load_config(Some(&location.path))
        .with_context(|| format!("failed to load configuration from {}", location.path))?;
    tracing::info!(path = %location.path, origin = location.origin, "Configuration loaded");

    if let Err(e) = telemetry.apply_level(&cfg.logging.level) {
        tracing::warn!(error = %format!("{e:#}"), "keeping startup log level");
    }

    let app = App::build(cfg).context("initialization failed")?;
    app.run(shutdown_signal()).await
}
