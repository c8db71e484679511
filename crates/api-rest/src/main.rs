//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! This binary is useful for development and debugging when you only want the REST server (with
//! OpenAPI/Swagger UI). The workspace's main `clinic-run` binary also runs the artifact reaper
//! alongside the server.

use api_rest::{router, AppState};
use clinic_core::{ClinicConfig, LogNotifier};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the clinic REST API server
///
/// # Environment Variables
/// - `CLINIC_REST_ADDR`: Server address (default: "0.0.0.0:5000")
/// - `ARTIFACT_DIR`, `PUBLIC_BASE_URL`, `ARTIFACT_RETENTION_SECS`, `REAPER_INTERVAL_SECS`,
///   `PLATFORM_NAME`, `COUNTRY_CODE`: see [`ClinicConfig::from_env_values`]
/// - `API_KEY`: when set, `POST /prescriptions` requires a matching `x-api-key` header
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the artifact directory cannot be created,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("clinic_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CLINIC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".into());

    tracing::info!("-- Starting clinic REST API on {}", addr);

    let cfg = ClinicConfig::from_env_values(
        std::env::var("ARTIFACT_DIR").ok(),
        std::env::var("PUBLIC_BASE_URL").ok(),
        std::env::var("ARTIFACT_RETENTION_SECS").ok(),
        std::env::var("REAPER_INTERVAL_SECS").ok(),
        std::env::var("PLATFORM_NAME").ok(),
        std::env::var("COUNTRY_CODE").ok(),
    )?;

    tracing::info!("no messaging transport configured; deliveries are logged only");
    let state = AppState::new(&cfg, Arc::new(LogNotifier), std::env::var("API_KEY").ok())?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
