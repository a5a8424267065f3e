//! Notification settings: loaded once, mutated only through [`SettingsStore::update`].

use std::sync::Arc;

use tokio::sync::RwLock;

use jobpulse_core::{NotificationSettings, SettingsPatch};
use jobpulse_infra::{KeyValueStore, SettingsBackend};

/// Key of the cached settings record in the durable key/value store.
pub const SETTINGS_KEY: &str = "jobpulse.notification_settings";

pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
    backend: Option<Arc<dyn SettingsBackend>>,
    current: RwLock<NotificationSettings>,
}

impl SettingsStore {
    /// Load the settings record.
    ///
    /// The local cache is read first; a record held by the backend takes
    /// precedence. Any read or parse failure falls back to defaults.
    pub async fn load(kv: Arc<dyn KeyValueStore>, backend: Option<Arc<dyn SettingsBackend>>) -> Self {
        let mut settings = read_cached(kv.as_ref()).unwrap_or_default();

        if let Some(backend) = &backend {
            match backend.read().await {
                Ok(Some(remote)) => settings = remote,
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, "settings backend read failed; using cached settings"),
            }
        }

        Self {
            kv,
            backend,
            current: RwLock::new(settings),
        }
    }

    /// Snapshot of the current settings.
    pub async fn current(&self) -> NotificationSettings {
        self.current.read().await.clone()
    }

    /// Merge `patch`, then persist the whole record to the cache and backend.
    ///
    /// Persistence failures are logged; the in-memory value is updated either way.
    pub async fn update(&self, patch: &SettingsPatch) -> NotificationSettings {
        let updated = {
            let mut current = self.current.write().await;
            *current = current.merged(patch);
            current.clone()
        };

        match serde_json::to_string(&updated) {
            Ok(json) => {
                if let Err(e) = self.kv.set(SETTINGS_KEY, &json) {
                    tracing::warn!(error = %e, "failed to cache notification settings");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize notification settings"),
        }

        if let Some(backend) = &self.backend
            && let Err(e) = backend.upsert(&updated).await
        {
            tracing::warn!(error = %e, "failed to store notification settings");
        }

        tracing::info!(
            enabled = updated.enabled,
            toast_level = ?updated.toast_level,
            "notification settings updated"
        );
        updated
    }
}

fn read_cached(kv: &dyn KeyValueStore) -> Option<NotificationSettings> {
    let raw = match kv.get(SETTINGS_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::debug!(error = %e, "settings cache read failed; using defaults");
            return None;
        }
    };
    serde_json::from_str(&raw)
        .map_err(|e| tracing::debug!(error = %e, "cached settings unreadable; using defaults"))
        .ok()
}
