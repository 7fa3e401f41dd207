//! Display preferences persisted alongside the conversation

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::SessionStorage;

/// User-facing display toggles
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Render citations under answers
    pub show_citations: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            show_citations: true,
        }
    }
}

/// Loads and saves [`Preferences`] under one storage key
#[derive(Clone)]
pub struct PreferenceStore {
    storage: Arc<dyn SessionStorage>,
    key: String,
}

impl PreferenceStore {
    /// Store backed by `storage` under `key`
    pub fn new(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Stored preferences, or defaults when absent or unreadable
    pub async fn load(&self) -> Preferences {
        match self.storage.get(&self.key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(key = %self.key, error = %e, "Preferences corrupt, using defaults");
                Preferences::default()
            }),
            Ok(None) => Preferences::default(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Preferences unreadable, using defaults");
                Preferences::default()
            }
        }
    }

    /// Save preferences, best-effort
    pub async fn save(&self, preferences: &Preferences) {
        let json = match serde_json::to_string(preferences) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Preferences not serializable");
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.key, &json).await {
            warn!(key = %self.key, error = %e, "Preferences not saved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    const KEY: &str = "rag_preferences";

    #[tokio::test]
    async fn test_defaults_when_absent_or_corrupt() {
        let storage = Arc::new(MemoryStorage::new());
        let store = PreferenceStore::new(storage.clone(), KEY);
        assert!(store.load().await.show_citations);

        storage.insert_raw(KEY, "not json");
        assert_eq!(store.load().await, Preferences::default());

        // Missing field falls back to its default
        storage.insert_raw(KEY, "{}");
        assert!(store.load().await.show_citations);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let storage = Arc::new(MemoryStorage::new());
        let store = PreferenceStore::new(storage.clone(), KEY);

        store
            .save(&Preferences {
                show_citations: false,
            })
            .await;
        assert_eq!(
            storage.get(KEY).await.unwrap().as_deref(),
            Some(r#"{"showCitations":false}"#)
        );
        assert!(!store.load().await.show_citations);
    }

    #[tokio::test]
    async fn test_save_failure_is_swallowed() {
        let storage = Arc::new(MemoryStorage::with_quota(4));
        let store = PreferenceStore::new(storage.clone(), KEY);
        store.save(&Preferences::default()).await;
        assert!(storage.is_empty());
    }
}
