//! Content provider backed by a chat-completions model.
//!
//! The user prompt is assembled per file: which spec facets are included
//! and which instructions follow depend on the file's [`FileKind`].

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ProviderSettings;
use crate::core::strip_code_fences;
use crate::domain::{Facet, FileEntry};

use super::chat::{ChatClient, ChatSettings};
use super::planner::format_facet;
use super::{ContentProvider, ContentRequest, ProviderError};

const SYSTEM_PROMPT: &str = "You are a senior software engineer writing production code.

CRITICAL RULES:
1. Return ONLY the file content - NO explanations, NO markdown
2. NO code block markers (no ```python, ```typescript, etc.)
3. Code must be complete, not a placeholder
4. Include necessary imports and proper structure
5. Match the specifications EXACTLY

Your response should start with the first line of the file and end with its last line.";

const BACKEND_INSTRUCTIONS: &str = "BACKEND FILE INSTRUCTIONS:
- Implement all API endpoints from specs
- Include proper error handling
- Add input validation
- Include database integration code
- Add authentication if required by specs
- Include proper typing/type hints
";

const FRONTEND_INSTRUCTIONS: &str = "FRONTEND FILE INSTRUCTIONS:
- Implement all features from specs
- Create proper component structure
- Add API integration
- Include state management
- Include error handling and loading states
- Make responsive and accessible
";

const DATABASE_INSTRUCTIONS: &str = "DATABASE FILE INSTRUCTIONS:
- Create all tables from schema specs
- Include proper constraints and indexes
- Add foreign key relationships
- Support migrations if applicable
";

const PACKAGE_JSON_INSTRUCTIONS: &str = "PACKAGE.JSON INSTRUCTIONS:
- Include all necessary dependencies
- Add proper scripts (dev, build, test)
- Include project metadata
";

const REQUIREMENTS_INSTRUCTIONS: &str = "REQUIREMENTS.TXT INSTRUCTIONS:
- Include all Python dependencies
- Pin versions
- Include only necessary packages
";

const CONFIG_INSTRUCTIONS: &str = "CONFIG FILE INSTRUCTIONS:
- Include all necessary configuration
- Use environment variables where appropriate
";

const README_INSTRUCTIONS: &str = "README INSTRUCTIONS:
- Explain what the project does
- Include setup instructions
- Add usage examples
- List all features
- Include tech stack details
- Add API documentation if applicable
";

const GENERIC_INSTRUCTIONS: &str = "Generate appropriate content for this file type.\n";

/// Coarse classification of a file, driving prompt assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Backend,
    Frontend,
    Database,
    Config,
    Readme,
    Other,
}

impl FileKind {
    /// Classify by path and extension; the first matching kind wins
    pub fn classify(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();

        if lower.contains("backend") || lower.ends_with(".py") {
            Self::Backend
        } else if lower.contains("frontend")
            || [".tsx", ".ts", ".jsx", ".js"].iter().any(|ext| lower.ends_with(ext))
        {
            Self::Frontend
        } else if lower.contains("database") || lower.ends_with(".sql") {
            Self::Database
        } else if is_config(&lower) {
            Self::Config
        } else if lower.ends_with(".md") {
            Self::Readme
        } else {
            Self::Other
        }
    }

    fn instructions(self, path: &str) -> &'static str {
        match self {
            Self::Backend => BACKEND_INSTRUCTIONS,
            Self::Frontend => FRONTEND_INSTRUCTIONS,
            Self::Database => DATABASE_INSTRUCTIONS,
            Self::Config if path.contains("package.json") => PACKAGE_JSON_INSTRUCTIONS,
            Self::Config if path.contains("requirements.txt") => REQUIREMENTS_INSTRUCTIONS,
            Self::Config => CONFIG_INSTRUCTIONS,
            Self::Readme => README_INSTRUCTIONS,
            Self::Other => GENERIC_INSTRUCTIONS,
        }
    }
}

fn is_config(lower: &str) -> bool {
    ["package.json", "requirements.txt", "config", ".env", "docker"]
        .iter()
        .any(|marker| lower.contains(marker))
}

fn facet_or_none(facet: &Facet) -> String {
    if facet.is_empty() {
        "(none specified)".to_string()
    } else {
        format_facet(facet)
    }
}

fn format_related(files: &[FileEntry]) -> String {
    files
        .iter()
        .map(|f| format!("- {}: {}", f.path, f.purpose))
        .collect::<Vec<_>>()
        .join("\n")
}

/// User prompt for one file
pub fn build_code_prompt(request: &ContentRequest<'_>) -> String {
    let kind = FileKind::classify(request.path);
    let lower = request.path.to_ascii_lowercase();
    let is_code = matches!(kind, FileKind::Backend | FileKind::Frontend);
    let is_script = [".py", ".js", ".ts"].iter().any(|ext| lower.ends_with(ext));
    let is_doc = lower.ends_with(".md");

    let mut prompt = format!(
        "Generate content for this file:\n\nFILE: {}\nPURPOSE: {}\nPROJECT: {}\nFRAMEWORK: {}\n\n",
        request.path, request.purpose, request.project_name, request.framework
    );

    if is_code {
        prompt.push_str(&format!(
            "FEATURES TO IMPLEMENT:\n{}\n\n",
            facet_or_none(&request.spec.features)
        ));
    }
    if kind == FileKind::Backend || is_script {
        prompt.push_str(&format!("API ENDPOINTS:\n{}\n\n", facet_or_none(&request.spec.apis)));
    }
    if matches!(kind, FileKind::Backend | FileKind::Database) {
        prompt.push_str(&format!(
            "DATABASE SCHEMA:\n{}\n\n",
            facet_or_none(&request.spec.database)
        ));
    }
    if kind == FileKind::Config || is_doc {
        prompt.push_str(&format!(
            "TECH STACK:\n{}\n\n",
            facet_or_none(&request.spec.tech_stack)
        ));
    }
    if !request.related_files.is_empty() {
        prompt.push_str(&format!(
            "RELATED FILES IN PROJECT:\n{}\n\n",
            format_related(request.related_files)
        ));
    }

    prompt.push_str(kind.instructions(&lower));
    prompt.push_str("\nGenerate the COMPLETE file content now.");
    prompt
}

/// Chat-completions backed [`ContentProvider`]
#[derive(Debug, Clone)]
pub struct HttpContentProvider {
    client: ChatClient,
    settings: ChatSettings,
}

impl HttpContentProvider {
    pub fn new(client: ChatClient, settings: ChatSettings) -> Self {
        Self { client, settings }
    }

    /// Build from resolved provider settings
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::new(
            ChatClient::from_settings(settings),
            ChatSettings {
                temperature: settings.content_temperature,
                max_tokens: settings.max_tokens,
                timeout: Duration::from_secs(settings.content_timeout_seconds),
            },
        )
    }
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    fn name(&self) -> &str {
        "chat-content"
    }

    async fn generate(&self, request: &ContentRequest<'_>) -> Result<String, ProviderError> {
        let prompt = build_code_prompt(request);
        let raw = self.client.complete(SYSTEM_PROMPT, &prompt, &self.settings).await?;
        Ok(strip_code_fences(&raw))
    }
}
