//! Error taxonomy shared by the engine and its boundary operations.

use thiserror::Error;
use uuid::Uuid;

use crate::adapters::ProviderError;
use crate::domain::{ErrorCode, ProjectStatus};

use super::path_guard::PathError;

/// Errors surfaced by the generation engine
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Malformed or unsafe relative path
    #[error("Invalid path: {0}")]
    InvalidPath(PathError),

    /// Resolved path escapes its root
    #[error("Access denied: {0}")]
    Forbidden(PathError),

    /// Malformed request (bad name, unreadable artifact, ...)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Spec document could not be parsed
    #[error("Invalid specification: {0}")]
    InvalidSpec(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Illegal status transition attempted
    #[error("Project {project_id} cannot move from {from} to {to}")]
    Conflict {
        project_id: Uuid,
        from: ProjectStatus,
        to: ProjectStatus,
    },

    /// Operation not allowed while the project is in its current state
    #[error("Project {project_id} is {status}; {reason}")]
    Busy {
        project_id: Uuid,
        status: ProjectStatus,
        reason: &'static str,
    },

    #[error("Project specifications not found")]
    MissingSpec,

    /// Blueprint or content provider failure
    #[error("Provider failure: {0}")]
    Provider(#[from] ProviderError),

    /// Directory or file write failure
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl GenerationError {
    /// Stable machine-readable code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidPath(_) => ErrorCode::InvalidPath,
            Self::Forbidden(_) => ErrorCode::Forbidden,
            Self::Validation(_) => ErrorCode::InvalidRequest,
            Self::InvalidSpec(_) => ErrorCode::InvalidSpec,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Conflict { .. } | Self::Busy { .. } => ErrorCode::Conflict,
            Self::MissingSpec => ErrorCode::MissingSpec,
            Self::Provider(_) => ErrorCode::ProviderFailure,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }

    pub(crate) fn storage(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::Storage(format!("{}: {}", context, err))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Busy { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<PathError> for GenerationError {
    fn from(err: PathError) -> Self {
        if err.is_forbidden() {
            Self::Forbidden(err)
        } else {
            Self::InvalidPath(err)
        }
    }
}
