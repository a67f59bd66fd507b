//! Domain types for the autopilot generator.
//!
//! This module contains the core data structures:
//! - Project: lifecycle state derived from status records
//! - Spec: the four-facet generation input
//! - Blueprint: the per-run file manifest
//! - LogEntry: audit log records

pub mod blueprint;
pub mod log;
pub mod project;
pub mod spec;

// Re-export commonly used types
pub use blueprint::{Blueprint, BlueprintError, FileEntry, Section, SectionName, UNKNOWN_FRAMEWORK};
pub use log::{FileOutcome, LogEntry, LogStep};
pub use project::{ErrorCode, Project, ProjectStatus, StatusRecord, StatusRecordKind};
pub use spec::{Facet, Spec, SpecError, SpecSource, SpecUpdate};
