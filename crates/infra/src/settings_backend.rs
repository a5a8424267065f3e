//! Server-side home of the notification settings record.

use std::sync::{Mutex, atomic::AtomicBool, atomic::Ordering};

use async_trait::async_trait;

use jobpulse_core::NotificationSettings;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsBackendError {
    #[error("settings backend unavailable: {0}")]
    Unavailable(String),
    #[error("malformed settings record: {0}")]
    Malformed(String),
}

/// Read-one / upsert-one access to the single settings record.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    async fn read(&self) -> Result<Option<NotificationSettings>, SettingsBackendError>;

    /// Replace the whole record.
    async fn upsert(&self, settings: &NotificationSettings) -> Result<(), SettingsBackendError>;
}

/// In-memory backend for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySettingsBackend {
    record: Mutex<Option<NotificationSettings>>,
    unavailable: AtomicBool,
}

impl InMemorySettingsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(settings: NotificationSettings) -> Self {
        Self {
            record: Mutex::new(Some(settings)),
            ..Self::default()
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// The record as last written, if any.
    pub fn stored(&self) -> Option<NotificationSettings> {
        self.record.lock().ok().and_then(|r| r.clone())
    }

    fn check_available(&self) -> Result<(), SettingsBackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SettingsBackendError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsBackend for InMemorySettingsBackend {
    async fn read(&self) -> Result<Option<NotificationSettings>, SettingsBackendError> {
        self.check_available()?;
        let record = self
            .record
            .lock()
            .map_err(|_| SettingsBackendError::Unavailable("lock poisoned".to_string()))?;
        Ok(record.clone())
    }

    async fn upsert(&self, settings: &NotificationSettings) -> Result<(), SettingsBackendError> {
        self.check_available()?;
        let mut record = self
            .record
            .lock()
            .map_err(|_| SettingsBackendError::Unavailable("lock poisoned".to_string()))?;
        *record = Some(settings.clone());
        Ok(())
    }
}
