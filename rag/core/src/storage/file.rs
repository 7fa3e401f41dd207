//! File-backed session storage
//!
//! Layout: `{root}/{session_id}/{key}.json`. Writes go to a temporary file
//! that is then renamed over the target, so a crash mid-write leaves the
//! previous value intact.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{SessionStorage, StorageError};

/// [`SessionStorage`] persisted under a per-session directory
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage for `session_id` under `root`
    ///
    /// The directory is created lazily on first write.
    pub fn new(root: impl AsRef<Path>, session_id: &str) -> Self {
        Self {
            dir: root.as_ref().join(sanitize(session_id)),
        }
    }

    /// Directory holding this session's files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            || key.starts_with('.')
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Remove the whole session directory
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory exists but cannot be
    /// removed.
    pub async fn destroy(&self) -> Result<(), StorageError> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: self.dir.display().to_string(),
                source,
            }),
        }
    }
}

/// Keep session ids usable as a single path component
fn sanitize(session_id: &str) -> String {
    let cleaned: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).await.map_err(io_err)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value.as_bytes()).await.map_err(io_err)?;
        fs::rename(&tmp, &path).await.map_err(io_err)?;

        tracing::trace!(key, bytes = value.len(), "Session value written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}
