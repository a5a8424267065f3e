//! Operator notification preferences.

use serde::{Deserialize, Serialize};

/// Which notification severities surface as toasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    ErrorsOnly,
    #[default]
    ErrorsAndWarnings,
    All,
}

impl ToastLevel {
    pub fn allows_warnings(&self) -> bool {
        matches!(self, ToastLevel::ErrorsAndWarnings | ToastLevel::All)
    }

    pub fn allows_info(&self) -> bool {
        matches!(self, ToastLevel::All)
    }
}

/// Persisted notification settings record.
///
/// Every field has a default so that records written by older versions (or
/// hand-edited ones) still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub show_progress: bool,
    pub sound_enabled: bool,
    pub browser_notifications: bool,
    pub max_recent_items: usize,
    pub toast_level: ToastLevel,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            show_progress: true,
            sound_enabled: false,
            browser_notifications: false,
            max_recent_items: 10,
            toast_level: ToastLevel::default(),
        }
    }
}

impl NotificationSettings {
    /// Merge a partial update into a copy of these settings.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self {
            enabled: patch.enabled.unwrap_or(self.enabled),
            show_progress: patch.show_progress.unwrap_or(self.show_progress),
            sound_enabled: patch.sound_enabled.unwrap_or(self.sound_enabled),
            browser_notifications: patch
                .browser_notifications
                .unwrap_or(self.browser_notifications),
            max_recent_items: patch.max_recent_items.unwrap_or(self.max_recent_items),
            toast_level: patch.toast_level.unwrap_or(self.toast_level),
        }
    }
}

/// Partial settings update; `None` leaves the current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub show_progress: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub browser_notifications: Option<bool>,
    pub max_recent_items: Option<usize>,
    pub toast_level: Option<ToastLevel>,
}

impl SettingsPatch {
    pub fn toast_level(level: ToastLevel) -> Self {
        Self {
            toast_level: Some(level),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: NotificationSettings =
            serde_json::from_str(r#"{"toast_level":"all","sound_enabled":true}"#).unwrap();
        assert_eq!(settings.toast_level, ToastLevel::All);
        assert!(settings.sound_enabled);
        assert!(settings.enabled);
        assert_eq!(settings.max_recent_items, 10);
    }

    #[test]
    fn toast_level_gates() {
        assert!(!ToastLevel::ErrorsOnly.allows_warnings());
        assert!(ToastLevel::ErrorsAndWarnings.allows_warnings());
        assert!(!ToastLevel::ErrorsAndWarnings.allows_info());
        assert!(ToastLevel::All.allows_info());
    }

    #[test]
    fn merge_only_touches_patched_fields() {
        let base = NotificationSettings {
            sound_enabled: true,
            ..NotificationSettings::default()
        };
        let merged = base.merged(&SettingsPatch::toast_level(ToastLevel::All));
        assert_eq!(merged.toast_level, ToastLevel::All);
        assert!(merged.sound_enabled);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: an empty patch is the identity.
        #[test]
        fn empty_patch_is_identity(
            enabled in any::<bool>(),
            show_progress in any::<bool>(),
            max_recent_items in 0usize..500,
        ) {
            let settings = NotificationSettings {
                enabled,
                show_progress,
                max_recent_items,
                ..NotificationSettings::default()
            };
            prop_assert_eq!(settings.merged(&SettingsPatch::default()), settings);
        }
    }
}
