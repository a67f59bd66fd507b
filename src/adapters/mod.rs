//! Provider interfaces for external content synthesis.
//!
//! The engine depends on three external collaborators:
//! - [`BlueprintProvider`]: specs → file manifest
//! - [`ContentProvider`]: one manifest entry → file content
//! - [`CodeOptimizer`]: one generated file → rewritten file
//!
//! All are object-safe async traits so they can be injected as
//! `Arc<dyn ...>` and replaced by fakes in tests. The HTTP-backed
//! implementations talk to an OpenAI-compatible chat-completions endpoint.

pub mod chat;
pub mod codegen;
pub mod optimizer;
pub mod planner;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Blueprint, FileEntry, Spec};

// Re-export the HTTP-backed providers
pub use chat::{ChatClient, ChatSettings};
pub use codegen::HttpContentProvider;
pub use optimizer::HttpCodeOptimizer;
pub use planner::{blueprint_or_fallback, parse_blueprint, HttpBlueprintProvider};

/// Failures reported by providers
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Credentials or endpoint missing
    #[error("Provider is not configured: {0}")]
    NotConfigured(String),

    /// Network failure or timeout
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response arrived but is unusable
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Response-level failure (as opposed to a transport-level one)
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Everything a content provider gets to know about one file
#[derive(Debug, Clone, Copy)]
pub struct ContentRequest<'a> {
    /// Path relative to the section directory
    pub path: &'a str,

    /// Purpose text from the blueprint
    pub purpose: &'a str,

    pub project_name: &'a str,

    /// Section framework label
    pub framework: &'a str,

    pub spec: &'a Spec,

    /// Other files of the same section
    pub related_files: &'a [FileEntry],
}

/// One generated file handed to a [`CodeOptimizer`]
#[derive(Debug, Clone, Copy)]
pub struct OptimizeRequest<'a> {
    /// Path relative to the project root
    pub path: &'a str,

    /// Current file content
    pub content: &'a str,

    pub project_name: &'a str,

    pub tech_stack: &'a str,
}

/// Produces the file manifest for a project
#[async_trait]
pub trait BlueprintProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Produce a blueprint
    ///
    /// Malformed upstream output must be answered with
    /// [`Blueprint::fallback`], never with an error; errors are reserved for
    /// failures that make any answer impossible (transport, configuration).
    async fn generate(
        &self,
        project_name: &str,
        tech_stack: &str,
        spec: &Spec,
    ) -> Result<Blueprint, ProviderError>;
}

/// Produces the content of one artifact
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Raw artifact content, without wrapping markup
    async fn generate(&self, request: &ContentRequest<'_>) -> Result<String, ProviderError>;
}

/// Rewrites an existing artifact for quality and performance
#[async_trait]
pub trait CodeOptimizer: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Rewritten content, without wrapping markup
    async fn optimize(&self, request: &OptimizeRequest<'_>) -> Result<String, ProviderError>;
}
