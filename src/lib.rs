//! autopilot - Spec-driven project generation engine
//!
//! Turns a structured project spec into a tree of generated source files
//! using two external collaborators: a blueprint provider that plans the
//! file manifest and a content provider that writes each file. Generated
//! files can later be rewritten in place by a code optimizer.
//!
//! # Architecture
//!
//! - Project status is an append-only log of transitions; the current state
//!   is derived by replay
//! - A generation run walks an ordered task list; a failure generating one
//!   file is logged and skipped, anything else fails the run
//! - Every artifact read and write goes through one containment check
//!
//! # Modules
//!
//! - `adapters`: Provider traits and chat-completions backed providers
//! - `core`: Engine (StatusStore, AuditLog, PathGuard, Orchestrator, service)
//! - `domain`: Data structures (Project, Spec, Blueprint, LogEntry)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! autopilot new "Shop" --stack "React + FastAPI"
//! autopilot spec <project-id> spec.yaml
//! autopilot generate <project-id>
//! autopilot tree <project-id>
//! autopilot optimize <project-id> backend/main.py
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{
    BlueprintProvider, CodeOptimizer, ContentProvider, ContentRequest, OptimizeRequest,
    ProviderError,
};
pub use self::core::{GenerationError, GenerationService, Orchestrator};
pub use domain::{Blueprint, LogEntry, Project, ProjectStatus, Spec, SpecSource};
