//! Temp-directory blob storage for queued uploads.
//!
//! Blobs live as flat files under one root directory; references are the
//! absolute paths. Deletion is best-effort.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{AppError, BlobStorage, Result};

use super::redact;

/// Filesystem-backed [`BlobStorage`] rooted at one directory.
pub struct TempDirStorage {
    root: PathBuf,
    counter: AtomicU64,
}

impl TempDirStorage {
    /// Opens the storage, creating the root directory if needed.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| AppError::storage("Failed to create storage directory", e))?;
        Ok(Self {
            root,
            counter: AtomicU64::new(0),
        })
    }

    /// The root directory blobs are stored under.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Keeps the base name portable: anything outside `[A-Za-z0-9._-]`
/// becomes `_`, and path separators can never leak through.
fn sanitize_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().to_string());
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

impl BlobStorage for TempDirStorage {
    fn save(&self, name: &str, data: &mut dyn Read) -> Result<String> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = self.root.join(format!("{id}_{}", sanitize_name(name)));

        let mut file = fs::File::create(&path)
            .map_err(|e| AppError::storage("Failed to create blob file", e))?;
        std::io::copy(data, &mut file)
            .map_err(|e| AppError::storage("Failed to write blob file", e))?;

        tracing::debug!(file = %redact(&path.to_string_lossy()), "blob saved");
        Ok(path.to_string_lossy().to_string())
    }

    fn read(&self, file_ref: &str) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(file_ref)
            .map_err(|e| AppError::storage(format!("Failed to open blob {file_ref}"), e))?;
        Ok(Box::new(file))
    }

    fn delete_all(&self, file_refs: &[String]) -> Result<()> {
        for file_ref in file_refs {
            if let Err(error) = fs::remove_file(file_ref) {
                tracing::warn!(
                    file = %redact(file_ref),
                    %error,
                    "failed to delete blob"
                );
            }
        }
        Ok(())
    }
}
