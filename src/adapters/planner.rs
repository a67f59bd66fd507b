//! Blueprint provider backed by a chat-completions model.
//!
//! The model is asked for a bare JSON manifest. Anything that arrives but
//! cannot be used as a blueprint (bad JSON, no files, unsafe paths) is
//! answered with [`Blueprint::fallback`] so a run can still proceed.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ProviderSettings;
use crate::core::{strip_code_fences, PathGuard};
use crate::domain::{Blueprint, BlueprintError, Facet, Spec};

use super::chat::{ChatClient, ChatSettings};
use super::{BlueprintProvider, ProviderError};

const SYSTEM_PROMPT: &str = r#"You are a senior software architect. You design complete project structures based on requirements.

CRITICAL RULES:
1. Return ONLY a valid JSON object
2. NO markdown formatting (no ```json or ``` tags)
3. NO explanations outside the JSON
4. The JSON must follow this exact structure:
{
  "frontend": {
    "framework": "string",
    "files": {
      "relative/path/file.ext": "purpose description"
    }
  },
  "backend": {
    "framework": "string",
    "files": {
      "relative/path/file.py": "purpose description"
    }
  },
  "database": {
    "files": {
      "schema.sql": "purpose description"
    }
  },
  "root": {
    "files": {
      "README.md": "purpose description",
      ".gitignore": "purpose description"
    }
  }
}

File paths are relative to their section directory and must not be absolute or contain "..".
Your output must be a single JSON document. Start with { and end with }."#;

/// Pretty-print a facet for prompt inclusion
pub(crate) fn format_facet(facet: &Facet) -> String {
    serde_json::to_string_pretty(facet).unwrap_or_else(|_| "{}".to_string())
}

/// User prompt for blueprint generation
pub fn build_blueprint_prompt(project_name: &str, tech_stack: &str, spec: &Spec) -> String {
    format!(
        r#"Design a complete project structure for: {name}

TECH STACK: {stack}

FEATURES:
{features}

API ENDPOINTS:
{apis}

DATABASE SCHEMA:
{database}

TECH STACK DETAILS:
{stack_details}

TASK:
Create a comprehensive file structure for this project. Include:

1. BACKEND FILES:
   - Main application entry point
   - API route files (one per domain/resource)
   - Database models
   - Configuration files
   - Requirements/dependencies file
   - Utility modules

2. FRONTEND FILES:
   - Main application component
   - Page components for each feature
   - Component files for UI elements
   - API client service
   - Routing configuration
   - Package.json or equivalent

3. DATABASE FILES:
   - Schema definition
   - Migration files (if applicable)

4. ROOT FILES:
   - README.md with setup instructions
   - .gitignore
   - Docker files (if applicable)
   - Environment file templates

RULES:
- Use appropriate file extensions for the chosen tech stack
- Organize files in logical directories
- Each file should have ONE clear purpose
- Match the project requirements exactly
- Return valid JSON only"#,
        name = project_name,
        stack = tech_stack,
        features = format_facet(&spec.features),
        apis = format_facet(&spec.apis),
        database = format_facet(&spec.database),
        stack_details = format_facet(&spec.tech_stack),
    )
}

/// Parse raw model output into a usable blueprint
///
/// Surrounding code fences are tolerated. A blueprint with no files or with
/// any path that would leave its section directory is rejected.
pub fn parse_blueprint(raw: &str) -> Result<Blueprint, BlueprintError> {
    let cleaned = strip_code_fences(raw);
    let blueprint = Blueprint::from_json(&cleaned)?;

    if blueprint.total_files() == 0 {
        return Err(BlueprintError::Empty);
    }

    for (section, entries) in blueprint.sections() {
        for file in &entries.files {
            if let Err(e) = PathGuard::validate(&file.path) {
                return Err(BlueprintError::UnsafePath {
                    section,
                    path: file.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(blueprint)
}

/// Parse raw model output, substituting the fallback blueprint when unusable
pub fn blueprint_or_fallback(raw: &str, tech_stack: &str) -> Blueprint {
    match parse_blueprint(raw) {
        Ok(blueprint) => blueprint,
        Err(e) => {
            let preview: String = raw.chars().take(200).collect();
            warn!(error = %e, preview = %preview, "Unusable blueprint, using fallback");
            Blueprint::fallback(tech_stack)
        }
    }
}

/// Chat-completions backed [`BlueprintProvider`]
#[derive(Debug, Clone)]
pub struct HttpBlueprintProvider {
    client: ChatClient,
    settings: ChatSettings,
}

impl HttpBlueprintProvider {
    pub fn new(client: ChatClient, settings: ChatSettings) -> Self {
        Self { client, settings }
    }

    /// Build from resolved provider settings
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::new(
            ChatClient::from_settings(settings),
            ChatSettings {
                temperature: settings.blueprint_temperature,
                max_tokens: settings.max_tokens,
                timeout: Duration::from_secs(settings.blueprint_timeout_seconds),
            },
        )
    }
}

#[async_trait]
impl BlueprintProvider for HttpBlueprintProvider {
    fn name(&self) -> &str {
        "chat-blueprint"
    }

    async fn generate(
        &self,
        project_name: &str,
        tech_stack: &str,
        spec: &Spec,
    ) -> Result<Blueprint, ProviderError> {
        let prompt = build_blueprint_prompt(project_name, tech_stack, spec);

        let raw = match self.client.complete(SYSTEM_PROMPT, &prompt, &self.settings).await {
            Ok(raw) => raw,
            Err(e) if e.is_malformed() => {
                warn!(error = %e, "Blueprint response unreadable, using fallback");
                return Ok(Blueprint::fallback(tech_stack));
            }
            Err(e) => return Err(e),
        };

        let blueprint = blueprint_or_fallback(&raw, tech_stack);
        debug!(files = blueprint.total_files(), "Blueprint ready");
        Ok(blueprint)
    }
}
