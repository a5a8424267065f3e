use std::sync::Arc;

use anyhow::Context;

use jobpulse_events::{ChangeFeed, InMemoryChangeFeed, JobChange};
use jobpulse_infra::{
    FileKeyValueStore, InMemoryJobStore, InMemoryKeyValueStore, InMemorySettingsBackend,
    KeyValueStore, TracingAlertSink,
};
use jobpulse_monitor::{Collaborators, MonitorConfig, NotificationCenter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jobpulse_observability::init();

    let config = MonitorConfig::from_env().context("invalid monitor configuration")?;

    let kv: Arc<dyn KeyValueStore> = match FileKeyValueStore::in_data_dir() {
        Ok(store) => {
            tracing::info!(dir = %store.dir().display(), "using file settings cache");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "no data directory; settings will not survive restarts");
            Arc::new(InMemoryKeyValueStore::new())
        }
    };

    let feed = Arc::new(InMemoryChangeFeed::<JobChange>::new());
    let store = Arc::new(InMemoryJobStore::with_feed(feed.clone()));

    let center = NotificationCenter::start(
        config,
        Collaborators {
            store,
            feed: feed.subscribe(),
            kv,
            settings_backend: Some(Arc::new(InMemorySettingsBackend::new())),
            alerts: Arc::new(TracingAlertSink),
        },
    )
    .await
    .context("failed to start notification center")?;

    center.refresh_commands().await;
    if let Some(health) = center.executor_health().await {
        tracing::info!(healthy = health.is_healthy(), "job executor probed");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutdown requested");
    center.shutdown().await;
    Ok(())
}
