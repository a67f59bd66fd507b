//! Core generation engine.
//!
//! This module contains:
//! - PathGuard: Containment checks for every artifact read and write
//! - StatusStore: Project status machine with append-only persistence
//! - AuditLog: Append-only per-project log
//! - Orchestrator: Generation run driver
//! - GenerationService: Boundary operations, including artifact optimization

pub mod audit_log;
pub mod error;
pub mod fence;
pub mod file_tree;
pub mod file_writer;
pub mod orchestrator;
pub mod path_guard;
pub mod plan;
pub mod service;
pub mod status_store;

// Re-export commonly used types
pub use audit_log::AuditLog;
pub use error::GenerationError;
pub use fence::strip_code_fences;
pub use file_tree::{build_file_tree, NodeKind, TreeNode};
pub use file_writer::{content_digest, FileWriter, WrittenFile};
pub use orchestrator::{display_path, Orchestrator, RunSummary};
pub use path_guard::{PathError, PathGuard};
pub use plan::{FileTask, GenerationPlan, SectionPlan};
pub use service::{GenerationService, OptimizeReport, OptimizedFile};
pub use status_store::StatusStore;
