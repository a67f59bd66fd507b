//! Audit log entries.
//!
//! Entries record pipeline steps and per-file outcomes for one project.
//! They are written once and never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::project::ErrorCode;

/// A single entry in a project's audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique identifier for this entry
    pub id: Uuid,

    /// The project this entry belongs to
    pub project_id: Uuid,

    /// Pipeline step tag
    pub step: LogStep,

    /// Human-readable message (NO secrets)
    pub message: String,

    /// When this entry was recorded
    pub timestamp: DateTime<Utc>,

    /// Artifact path, for per-file entries (relative to the project root)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Outcome, for per-file result entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<FileOutcome>,

    /// Machine-readable error code, for failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,

    /// SHA-256 prefix of the written content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,

    /// Size of the written content in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl LogEntry {
    /// Create a new entry with the current timestamp
    pub fn new(project_id: Uuid, step: LogStep, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            step,
            message: message.into(),
            timestamp: Utc::now(),
            path: None,
            outcome: None,
            code: None,
            content_hash: None,
            size_bytes: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_outcome(mut self, outcome: FileOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach digest and size of a written artifact
    pub fn with_content(mut self, content_hash: String, size_bytes: u64) -> Self {
        self.content_hash = Some(content_hash);
        self.size_bytes = Some(size_bytes);
        self
    }

    /// Per-file success entry
    pub fn is_file_success(&self) -> bool {
        self.outcome == Some(FileOutcome::Success)
    }

    /// Per-file failure entry
    pub fn is_file_failure(&self) -> bool {
        self.outcome == Some(FileOutcome::Failure)
    }
}

/// Step tags used in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStep {
    Ingestion,
    Initialization,
    Planning,
    Structure,
    Frontend,
    Backend,
    Database,
    Root,
    Finalization,
    Complete,
    Optimization,
    Error,
}

impl LogStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::Initialization => "initialization",
            Self::Planning => "planning",
            Self::Structure => "structure",
            Self::Frontend => "frontend",
            Self::Backend => "backend",
            Self::Database => "database",
            Self::Root => "root",
            Self::Finalization => "finalization",
            Self::Complete => "complete",
            Self::Optimization => "optimization",
            Self::Error => "error",
        }
    }
}

/// Result of generating one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    Success,
    Failure,
}
