use std::sync::Arc;
use trackfetch::{AcquisitionService, Config, run_with_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        mode = config.mode.as_str(),
        provider = config.provider.kind.name(),
        backend = config.acquisition.backend.binary_name(),
        secret_configured = config.provider.has_secret(),
        "trackfetch starting"
    );

    let service = Arc::new(AcquisitionService::from_config(config)?);
    run_with_shutdown(service).await?;

    tracing::info!("trackfetch stopped");
    Ok(())
}
