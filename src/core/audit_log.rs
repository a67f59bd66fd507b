//! Append-only audit log with file-based persistence.
//!
//! Entries are stored per project as newline-delimited JSON
//! (`<root>/<project_id>/logs.jsonl`). Nothing here rewrites or removes a line.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::domain::LogEntry;

use super::error::GenerationError;

const LOG_FILE: &str = "logs.jsonl";

/// File-based audit log using JSONL format
#[derive(Debug, Clone)]
pub struct AuditLog {
    /// Directory holding one subdirectory per project
    root: PathBuf,
}

impl AuditLog {
    /// Create an audit log rooted at `root`
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to a project's log file
    pub fn log_path(&self, project_id: Uuid) -> PathBuf {
        self.root.join(project_id.to_string()).join(LOG_FILE)
    }

    /// Append an entry to its project's log
    pub async fn append(&self, entry: &LogEntry) -> Result<(), GenerationError> {
        let path = self.log_path(entry.project_id);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| GenerationError::storage(format!("create {}", parent.display()), e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| GenerationError::storage(format!("open {}", path.display()), e))?;

        let json = serde_json::to_string(entry)
            .map_err(|e| GenerationError::storage("serialize log entry", e))?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .map_err(|e| GenerationError::storage("write log entry", e))?;
        file.flush()
            .await
            .map_err(|e| GenerationError::storage("flush log entry", e))?;

        Ok(())
    }

    /// All entries of a project, ordered by timestamp
    ///
    /// Entries sharing a timestamp keep their append order.
    pub async fn entries(&self, project_id: Uuid) -> Result<Vec<LogEntry>, GenerationError> {
        let path = self.log_path(project_id);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)
            .await
            .map_err(|e| GenerationError::storage(format!("open {}", path.display()), e))?;

        let mut lines = BufReader::new(file).lines();
        let mut entries = Vec::new();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| GenerationError::storage("read log", e))?
        {
            if line.trim().is_empty() {
                continue;
            }
            let entry: LogEntry = serde_json::from_str(&line)
                .map_err(|e| GenerationError::storage(format!("parse log entry {}", line), e))?;
            entries.push(entry);
        }

        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }
}
