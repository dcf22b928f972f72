use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use medidesk_core::config::{adult_age_from_env_value, resolve_data_dir};
use medidesk_core::constants::DEFAULT_COPY_MARKER;
use medidesk_core::{ArchiveLifecycleManager, CoreConfig, EntityStore, YamlStore};

/// Main entry point for the MediDesk server
///
/// Serves the REST API (with Swagger UI under `/swagger-ui`) over the file-backed record store.
///
/// # Environment Variables
/// - `MEDIDESK_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `MEDIDESK_DATA_DIR`: Directory for record storage (default: "medidesk_data")
/// - `MEDIDESK_ADULT_AGE`: Age from which patients need no representative (default: 18)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, store setup, binding or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medidesk_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("MEDIDESK_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = resolve_data_dir(std::env::var("MEDIDESK_DATA_DIR").ok());
    let adult_age = adult_age_from_env_value(std::env::var("MEDIDESK_ADULT_AGE").ok())?;

    let cfg = Arc::new(CoreConfig::new(
        data_dir.clone(),
        adult_age,
        DEFAULT_COPY_MARKER.into(),
    )?);
    let store: Arc<dyn EntityStore> = Arc::new(YamlStore::open(&data_dir)?);
    let manager = ArchiveLifecycleManager::with_tracing(cfg, store);

    tracing::info!("++ Records stored under {}", data_dir.display());
    tracing::info!("++ Starting MediDesk REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(AppState::new(manager))).await?;

    Ok(())
}
