//! Artifact persistence behind the path guard.
//!
//! Reads and writes resolve through [`PathGuard`] against the same base.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;

use super::error::GenerationError;
use super::path_guard::PathGuard;

/// Result of persisting one artifact
#[derive(Debug, Clone)]
pub struct WrittenFile {
    /// Absolute, canonicalized target path
    pub path: PathBuf,

    /// Content digest (first 16 hex chars of SHA-256)
    pub content_hash: String,

    /// Bytes written
    pub size_bytes: u64,
}

/// Writes generated content below a base directory
#[derive(Debug, Clone, Copy, Default)]
pub struct FileWriter;

impl FileWriter {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a target path and create its parent directories
    ///
    /// The base directory is created if missing. Containment is checked
    /// before any directory below the base is created.
    pub async fn prepare(
        &self,
        base_dir: &Path,
        relative_path: &str,
    ) -> Result<PathBuf, GenerationError> {
        PathGuard::validate(relative_path)?;

        fs::create_dir_all(base_dir).await.map_err(|e| {
            GenerationError::storage(format!("create {}", base_dir.display()), e)
        })?;

        let target = PathGuard::resolve(base_dir, relative_path)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                GenerationError::storage(format!("create {}", parent.display()), e)
            })?;
        }

        Ok(target)
    }

    /// Persist content, overwriting any previous artifact at the same path
    pub async fn write(
        &self,
        base_dir: &Path,
        relative_path: &str,
        content: &str,
    ) -> Result<WrittenFile, GenerationError> {
        self.prepare(base_dir, relative_path).await?;

        // Parents exist now; resolve again so a swapped-in symlink is caught
        let target = PathGuard::resolve(base_dir, relative_path)?;

        if target.is_dir() {
            return Err(GenerationError::Storage(format!(
                "{} is a directory",
                relative_path
            )));
        }

        fs::write(&target, content)
            .await
            .map_err(|e| GenerationError::storage(format!("write {}", target.display()), e))?;

        Ok(WrittenFile {
            path: target,
            content_hash: content_digest(content),
            size_bytes: content.len() as u64,
        })
    }

    /// Read an existing artifact as UTF-8 text
    ///
    /// A missing base or target is `NotFound`; a directory or binary file is
    /// a validation error.
    pub async fn read_text(
        &self,
        base_dir: &Path,
        relative_path: &str,
    ) -> Result<String, GenerationError> {
        PathGuard::validate(relative_path)?;

        if !base_dir.is_dir() {
            return Err(GenerationError::NotFound(format!("File {}", relative_path)));
        }

        let target = PathGuard::resolve(base_dir, relative_path)?;

        let metadata = fs::metadata(&target)
            .await
            .map_err(|_| GenerationError::NotFound(format!("File {}", relative_path)))?;
        if !metadata.is_file() {
            return Err(GenerationError::Validation(format!(
                "Path is not a file: {}",
                relative_path
            )));
        }

        let bytes = fs::read(&target)
            .await
            .map_err(|e| GenerationError::storage(format!("read {}", relative_path), e))?;

        String::from_utf8(bytes).map_err(|_| {
            GenerationError::Validation(format!(
                "File is not a valid UTF-8 text file: {}",
                relative_path
            ))
        })
    }
}

/// Hash content (first 16 hex chars of SHA-256)
pub fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}
