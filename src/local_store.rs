/// Local device storage for client-side configuration
///
/// A simple write-through key-value cache backed by one JSON file per key.
/// Reminders are stored under a per-user key and onboarding completion under
/// a versioned key. Reads tolerate missing or malformed data by falling back
/// to defaults; there is no transactional guarantee across keys.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::UserId;

/// Versioned key for the onboarding/tour completion flag
pub const ONBOARDING_KEY: &str = "tour-completed:v2";

/// Fixed key for accessibility settings
pub const ACCESSIBILITY_KEY: &str = "accessibility-settings";

/// Accessibility preferences stored under `ACCESSIBILITY_KEY`
///
/// Shared across client surfaces; a missing or malformed entry falls back
/// to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessibilitySettings {
    /// Prefer plain linear output over visually aligned layouts
    pub screen_reader: bool,
}

/// Per-user key for the reminder list; guest mode shares one key
pub fn reminders_key(user: Option<UserId>) -> String {
    match user {
        Some(user) => format!("habit-reminders:{}", user),
        None => "habit-reminders:guest".to_string(),
    }
}

/// Errors that can occur opening local storage
#[derive(Error, Debug)]
pub enum LocalStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No writable storage directory available")]
    NoStorageDir,
}

/// File-backed key-value store
#[derive(Debug, Clone)]
pub struct LocalStore {
    base_dir: PathBuf,
}

impl LocalStore {
    /// Open local storage in the platform's data directory
    ///
    /// Falls back through the user's home directory and the temp directory,
    /// mirroring how the rest of the client degrades instead of failing.
    pub fn open_default() -> Result<Self, LocalStoreError> {
        let candidates = [
            dirs::data_dir().map(|mut p| {
                p.push("teatime");
                p
            }),
            dirs::home_dir().map(|mut p| {
                p.push(".teatime");
                p
            }),
            Some(std::env::temp_dir().join("teatime")),
        ];

        for candidate in candidates.into_iter().flatten() {
            if std::fs::create_dir_all(&candidate).is_ok() {
                return Self::open(candidate);
            }
        }

        Err(LocalStoreError::NoStorageDir)
    }

    /// Open local storage in a specific directory (created if absent)
    pub fn open(base_dir: PathBuf) -> Result<Self, LocalStoreError> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Read and deserialize a key; missing or malformed data yields None
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "malformed local-store entry, falling back to default");
                None
            }
        }
    }

    /// Serialize and write a key immediately (write-through, no flush step)
    ///
    /// A failed write is logged and swallowed: local storage is a cache, not
    /// a system of record.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let path = self.path_for(key);
        let serialized = match serde_json::to_string_pretty(value) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize local-store entry");
                return;
            }
        };
        if let Err(e) = std::fs::write(&path, serialized) {
            warn!(key, error = %e, "failed to write local-store entry");
        }
    }

    /// Remove a key; absent keys are fine
    pub fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys may contain separators; flatten them for the filesystem
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        self.base_dir.join(format!("{}.json", sanitized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_values() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path().to_path_buf()).unwrap();

        store.set(ONBOARDING_KEY, &true);
        assert_eq!(store.get::<bool>(ONBOARDING_KEY), Some(true));

        store.remove(ONBOARDING_KEY);
        assert_eq!(store.get::<bool>(ONBOARDING_KEY), None);
    }

    #[test]
    fn malformed_data_falls_back_to_none() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path().to_path_buf()).unwrap();

        store.set("reminders", &vec![1, 2, 3]);
        let path = dir.path().join("reminders.json");
        std::fs::write(&path, "{not json").unwrap();

        assert_eq!(store.get::<Vec<u32>>("reminders"), None);
    }

    #[test]
    fn accessibility_settings_default_when_unset() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path().to_path_buf()).unwrap();

        let settings: AccessibilitySettings =
            store.get(ACCESSIBILITY_KEY).unwrap_or_default();
        assert!(!settings.screen_reader);

        store.set(ACCESSIBILITY_KEY, &AccessibilitySettings { screen_reader: true });
        let settings: AccessibilitySettings =
            store.get(ACCESSIBILITY_KEY).unwrap_or_default();
        assert!(settings.screen_reader);
    }

    #[test]
    fn reminders_key_is_per_user() {
        let user = UserId::new();
        assert_ne!(reminders_key(Some(user)), reminders_key(None));
        assert!(reminders_key(Some(user)).contains(&user.to_string()));
    }
}
