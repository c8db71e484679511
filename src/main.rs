use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use clinic_core::{ClinicConfig, LogNotifier, reaper::run_reaper};

/// Main entry point for the clinic application
///
/// Starts the REST server and the artifact reaper concurrently:
/// - REST server on port 5000 (configurable via CLINIC_REST_ADDR)
/// - Reaper sweeping the artifact directory every `REAPER_INTERVAL_SECS`
///
/// `POST /prescriptions` requires an `x-api-key` header when `API_KEY` is set.
///
/// # Environment Variables
/// - `CLINIC_REST_ADDR`: REST server address (default: "0.0.0.0:5000")
/// - `ARTIFACT_DIR`: Directory for generated PDFs (default: "temp")
/// - `PUBLIC_BASE_URL`: Base URL the messaging provider fetches artifacts from
/// - `ARTIFACT_RETENTION_SECS`: Artifact lifetime after delivery (default: 300)
/// - `REAPER_INTERVAL_SECS`: Sweep interval (default: 60)
/// - `PLATFORM_NAME`: Name printed in the document footer
/// - `COUNTRY_CODE`: Dialling code prefixed to patient numbers (default: "91")
/// - `API_KEY`: API key for REST authentication
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("clinic_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CLINIC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".into());

    let cfg = ClinicConfig::from_env_values(
        std::env::var("ARTIFACT_DIR").ok(),
        std::env::var("PUBLIC_BASE_URL").ok(),
        std::env::var("ARTIFACT_RETENTION_SECS").ok(),
        std::env::var("REAPER_INTERVAL_SECS").ok(),
        std::env::var("PLATFORM_NAME").ok(),
        std::env::var("COUNTRY_CODE").ok(),
    )?;

    tracing::info!("++ Starting clinic REST on {}", rest_addr);
    tracing::info!(
        "++ Serving artifacts from {} as {}/temp",
        cfg.artifact_dir().display(),
        cfg.public_base_url()
    );

    let state = AppState::new(&cfg, Arc::new(LogNotifier), std::env::var("API_KEY").ok())?;

    // Start reaper
    let store = clinic_core::ArtifactStore::new(cfg.artifact_dir())?;
    let reaper = tokio::spawn(run_reaper(store, cfg.retention(), cfg.reaper_interval()));

    // Start REST server
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    let served = axum::serve(listener, router(state)).await;

    reaper.abort();
    served?;

    Ok(())
}
