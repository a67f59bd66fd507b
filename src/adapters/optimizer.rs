//! Code optimizer backed by a chat-completions model.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ProviderSettings;
use crate::core::strip_code_fences;

use super::chat::{ChatClient, ChatSettings};
use super::codegen::FileKind;
use super::{CodeOptimizer, OptimizeRequest, ProviderError};

const SYSTEM_PROMPT: &str = "You are a senior software engineer. You improve code quality, performance, and maintainability. Return ONLY the optimized code without any explanations, markdown formatting, or code blocks. Just the raw code.";

/// Human label for the language of a file, used in the prompt
fn language_hint(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    let ext = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

    match ext {
        "py" => "Python",
        "ts" | "tsx" => "TypeScript",
        "js" | "jsx" => "JavaScript",
        "sql" => "SQL",
        "json" => "JSON",
        "md" => "Markdown",
        "yaml" | "yml" => "YAML",
        _ => match FileKind::classify(&lower) {
            FileKind::Config => "configuration",
            _ => "source",
        },
    }
}

/// User prompt for one file
pub fn build_optimize_prompt(request: &OptimizeRequest<'_>) -> String {
    format!(
        "Optimize this {} file without changing its behavior or public interface.\n\n\
         FILE: {}\nPROJECT: {}\nTECH STACK: {}\n\n\
         Improve readability, error handling and performance where it matters. \
         Keep every existing feature.\n\n\
         CURRENT CONTENT:\n{}\n\n\
         Return the COMPLETE optimized file content now.",
        language_hint(request.path),
        request.path,
        request.project_name,
        request.tech_stack,
        request.content
    )
}

/// Chat-completions backed [`CodeOptimizer`]
#[derive(Debug, Clone)]
pub struct HttpCodeOptimizer {
    client: ChatClient,
    settings: ChatSettings,
}

impl HttpCodeOptimizer {
    pub fn new(client: ChatClient, settings: ChatSettings) -> Self {
        Self { client, settings }
    }

    /// Build from resolved provider settings
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::new(
            ChatClient::from_settings(settings),
            ChatSettings {
                temperature: settings.optimize_temperature,
                max_tokens: settings.max_tokens,
                timeout: Duration::from_secs(settings.optimize_timeout_seconds),
            },
        )
    }
}

#[async_trait]
impl CodeOptimizer for HttpCodeOptimizer {
    fn name(&self) -> &str {
        "chat-optimizer"
    }

    async fn optimize(&self, request: &OptimizeRequest<'_>) -> Result<String, ProviderError> {
        let prompt = build_optimize_prompt(request);
        let raw = self.client.complete(SYSTEM_PROMPT, &prompt, &self.settings).await?;
        Ok(strip_code_fences(&raw))
    }
}
