//! segment-dl server
//!
//! Loads `.env`, reads the JSON configuration named by `SEGMENT_DL_CONFIG`
//! (defaults otherwise), and serves the REST API until SIGINT/SIGTERM.
//!
//! Environment:
//! - `SEGMENT_DL_CONFIG` - path to a JSON config file
//! - `ADMIN_ACCESS_TOKEN` - admin secret, overrides the config file
//! - `RUST_LOG` - log filter (default `segment_dl=info,tower_http=info`)

use segment_dl::{Config, SegmentPipeline, run_with_shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("segment_dl=info,tower_http=info")),
        )
        .init();

    let config = load_config()?;
    tracing::info!(
        bind_address = %config.server.api.bind_address,
        documents_dir = %config.storage.documents_dir.display(),
        admin = config.server.api.admin_token.is_some(),
        "Configuration loaded"
    );

    let pipeline = SegmentPipeline::new(config).await?;
    run_with_shutdown(pipeline).await?;

    Ok(())
}

fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match std::env::var("SEGMENT_DL_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| format!("cannot read config file '{}': {}", path, e))?;
            serde_json::from_str::<Config>(&raw)
                .map_err(|e| format!("invalid config file '{}': {}", path, e))?
        }
        Err(_) => Config::default(),
    };

    if let Ok(token) = std::env::var("ADMIN_ACCESS_TOKEN")
        && !token.is_empty()
    {
        config.server.api.admin_token = Some(token);
    }

    Ok(config)
}
