//! Process startup: backend selection, table provisioning and store wiring.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use idstore_configs::{BackendSettings, IdentityConfig};
use idstore_identity::{
    initialize_identity_tables_with, provisioned_throughput, schema_manager, IdentityStores,
};
use idstore_store::{InMemoryTableBackend, TableBackend, TableDescription};
use log::info;
use tokio_util::sync::CancellationToken;

/// Everything a command needs once startup is done.
pub struct Application {
    pub backend: Arc<dyn TableBackend>,
    pub stores: IdentityStores,
    pub tables: Vec<TableDescription>,
    pub cancel: CancellationToken,
}

/// Opens the configured table service.
pub async fn connect_backend(settings: &BackendSettings) -> Result<Arc<dyn TableBackend>> {
    match settings.kind.as_str() {
        "memory" => {
            log::warn!("Using the in-memory backend; nothing outlives this process");
            Ok(Arc::new(InMemoryTableBackend::new()))
        }
        "dynamodb" => connect_dynamodb(settings).await,
        other => anyhow::bail!("Unknown backend '{}'", other),
    }
}

#[cfg(feature = "dynamodb")]
async fn connect_dynamodb(settings: &BackendSettings) -> Result<Arc<dyn TableBackend>> {
    let backend = idstore_store::DynamoDbBackend::connect(
        &settings.region,
        settings.endpoint_url.as_deref(),
    )
    .await;
    info!(
        "Connected to DynamoDB in {}{}",
        settings.region,
        settings
            .endpoint_url
            .as_deref()
            .map(|url| format!(" via {}", url))
            .unwrap_or_default()
    );
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "dynamodb"))]
async fn connect_dynamodb(_settings: &BackendSettings) -> Result<Arc<dyn TableBackend>> {
    anyhow::bail!("This build does not include DynamoDB support; rebuild with `--features dynamodb`")
}

/// Connects, provisions the identity tables and builds the stores.
pub async fn bootstrap(config: &IdentityConfig) -> Result<Application> {
    let backend = connect_backend(&config.backend).await?;
    bootstrap_with(config, backend).await
}

pub async fn bootstrap_with(config: &IdentityConfig, backend: Arc<dyn TableBackend>) -> Result<Application> {
    let phase_start = Instant::now();
    let manager = schema_manager(backend.clone(), &config.schema);
    let tables = initialize_identity_tables_with(
        &manager,
        &config.tables,
        provisioned_throughput(&config.schema),
    )
    .await
    .context("Failed to initialize identity tables")?;
    info!(
        "Identity tables ready ({:.2}ms)",
        phase_start.elapsed().as_secs_f64() * 1000.0
    );

    let stores = IdentityStores::new(backend.clone(), &config.tables);
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    Ok(Application {
        backend,
        stores,
        tables,
        cancel,
    })
}

/// Cancels in-flight store calls on Ctrl-C.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Interrupt received, cancelling pending requests");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    });
}
