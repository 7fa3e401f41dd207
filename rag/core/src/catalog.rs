//! Content catalog
//!
//! Explicitly constructed lookup of the browsable content (characters,
//! movies, parks) that citations point at. It must be initialized once
//! before the first read; reading early is an error, not an empty result.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::{Citation, ContentId, ContentType};

/// Catalog misuse and loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Read before [`ContentCatalog::initialize`]
    #[error("Content catalog read before initialization")]
    NotInitialized,

    /// [`ContentCatalog::initialize`] called twice
    #[error("Content catalog already initialized")]
    AlreadyInitialized,

    /// Catalog file could not be read
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog file is not a JSON array of entries
    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One piece of browsable content
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Kind of content
    pub content_type: ContentType,
    /// Id within its kind
    pub content_id: ContentId,
    /// Display name
    pub name: String,
    /// Short description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug)]
struct Loaded {
    entries: Vec<CatalogEntry>,
    index: HashMap<(ContentType, ContentId), usize>,
}

/// Initialize-once content lookup
#[derive(Debug, Default)]
pub struct ContentCatalog {
    loaded: RwLock<Option<Loaded>>,
}

impl ContentCatalog {
    /// Create an uninitialized catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the entries; later duplicates of the same type and id win
    ///
    /// # Errors
    ///
    /// [`CatalogError::AlreadyInitialized`] on a second call.
    pub fn initialize(&self, entries: Vec<CatalogEntry>) -> Result<(), CatalogError> {
        let mut loaded = self.loaded.write();
        if loaded.is_some() {
            return Err(CatalogError::AlreadyInitialized);
        }

        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| ((e.content_type, e.content_id.clone()), i))
            .collect();
        tracing::debug!(entries = entries.len(), "Content catalog initialized");
        *loaded = Some(Loaded { entries, index });
        Ok(())
    }

    /// Initialize from a JSON array file
    ///
    /// # Errors
    ///
    /// I/O and parse failures, or [`CatalogError::AlreadyInitialized`].
    pub async fn initialize_from_file(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)?;
        self.initialize(entries)
    }

    /// Whether [`initialize`](Self::initialize) has run
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.loaded.read().is_some()
    }

    /// Look up one entry
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotInitialized`] before initialization.
    pub fn get(
        &self,
        content_type: ContentType,
        content_id: &ContentId,
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        let loaded = self.loaded.read();
        let loaded = loaded.as_ref().ok_or(CatalogError::NotInitialized)?;
        Ok(loaded
            .index
            .get(&(content_type, content_id.clone()))
            .map(|&i| loaded.entries[i].clone()))
    }

    /// The entry a citation points at
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotInitialized`] before initialization.
    pub fn resolve(&self, citation: &Citation) -> Result<Option<CatalogEntry>, CatalogError> {
        self.get(citation.content_type, &citation.content_id)
    }

    /// All entries in load order
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotInitialized`] before initialization.
    pub fn entries(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.loaded
            .read()
            .as_ref()
            .map(|l| l.entries.clone())
            .ok_or(CatalogError::NotInitialized)
    }
}
