//! Project lifecycle state and reconstruction from status records.
//!
//! A project's status is never written in place: every transition is appended
//! to the project's status log and the current [`Project`] is derived by
//! replaying those records in order.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A project tracked by the generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier for this project
    pub id: Uuid,

    /// Human-readable project name
    pub name: String,

    /// Declared technology-stack label (e.g. "React + FastAPI")
    pub tech_stack: String,

    /// Current lifecycle state
    pub status: ProjectStatus,

    /// Progress phase while generating, diagnostic text after a failure
    pub current_step: Option<String>,

    /// Machine-readable code of the last fatal error (FAILED only)
    pub error_code: Option<ErrorCode>,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the last status record was written
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Reconstruct project state from its status records
    ///
    /// The first record must be a creation record; anything before it is ignored.
    pub fn from_records(records: &[StatusRecord]) -> Option<Self> {
        let mut iter = records
            .iter()
            .skip_while(|r| !matches!(r.kind, StatusRecordKind::Created { .. }));

        let first = iter.next()?;
        let StatusRecordKind::Created {
            ref name,
            ref tech_stack,
        } = first.kind
        else {
            return None;
        };

        let mut project = Self {
            id: first.project_id,
            name: name.clone(),
            tech_stack: tech_stack.clone(),
            status: ProjectStatus::Pending,
            current_step: None,
            error_code: None,
            created_at: first.timestamp,
            updated_at: first.timestamp,
        };

        for record in iter {
            project.apply_record(record);
        }

        Some(project)
    }

    /// Apply a single status record
    pub fn apply_record(&mut self, record: &StatusRecord) {
        if let StatusRecordKind::Transition {
            to,
            ref current_step,
            error_code,
            ..
        } = record.kind
        {
            self.status = to;
            self.current_step = current_step.clone();
            self.error_code = error_code;
        }
        self.updated_at = record.timestamp;
    }

    /// Whether a generation run is in flight
    pub fn is_generating(&self) -> bool {
        self.status == ProjectStatus::Generating
    }
}

/// Lifecycle states of a project (wire value = variant name in upper case)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    /// Created, or ready for a new run
    Pending,

    /// Specification ingestion in progress
    Parsing,

    /// A generation run owns the project
    Generating,

    /// The last run processed every section
    Done,

    /// The last run or ingestion hit a fatal error
    Failed,
}

impl ProjectStatus {
    /// Check whether moving from `self` to `next` is a legal transition
    ///
    /// `FAILED` and `DONE` only leave through a fresh spec upload (`PARSING`).
    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;

        matches!(
            (self, next),
            (Pending, Parsing)
                | (Failed, Parsing)
                | (Done, Parsing)
                | (Parsing, Pending)
                | (Parsing, Failed)
                | (Pending, Generating)
                | (Generating, Generating)
                | (Generating, Done)
                | (Generating, Failed)
        )
    }

    /// Terminal for a run: no automatic transition leaves these states
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Parsing => "PARSING",
            Self::Generating => "GENERATING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable machine-readable error codes carried next to free-text diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidPath,
    Forbidden,
    InvalidRequest,
    InvalidSpec,
    NotFound,
    Conflict,
    MissingSpec,
    ProviderFailure,
    StorageFailure,
    Interrupted,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPath => "invalid_path",
            Self::Forbidden => "forbidden",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidSpec => "invalid_spec",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::MissingSpec => "missing_spec",
            Self::ProviderFailure => "provider_failure",
            Self::StorageFailure => "storage_failure",
            Self::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a project's status log (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    /// When this record was written
    pub timestamp: DateTime<Utc>,

    /// The project this record belongs to
    pub project_id: Uuid,

    /// What happened
    #[serde(flatten)]
    pub kind: StatusRecordKind,
}

/// Kinds of status records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "record")]
pub enum StatusRecordKind {
    /// Project was created in `PENDING`
    Created { name: String, tech_stack: String },

    /// Project moved between two states
    Transition {
        from: ProjectStatus,
        to: ProjectStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_step: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
}

impl StatusRecord {
    /// Create a creation record stamped now
    pub fn created(project_id: Uuid, name: String, tech_stack: String) -> Self {
        Self {
            timestamp: Utc::now(),
            project_id,
            kind: StatusRecordKind::Created { name, tech_stack },
        }
    }

    /// Create a transition record stamped now
    pub fn transition(
        project_id: Uuid,
        from: ProjectStatus,
        to: ProjectStatus,
        current_step: Option<String>,
        error_code: Option<ErrorCode>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            project_id,
            kind: StatusRecordKind::Transition {
                from,
                to,
                current_step,
                error_code,
            },
        }
    }

    /// Target state, for transition records
    pub fn target(&self) -> Option<ProjectStatus> {
        match self.kind {
            StatusRecordKind::Transition { to, .. } => Some(to),
            StatusRecordKind::Created { .. } => None,
        }
    }
}
