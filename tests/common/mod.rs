//! Shared fixtures for integration tests: fake providers and a wired service.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;
use uuid::Uuid;

use autopilot::adapters::blueprint_or_fallback;
use autopilot::domain::{Section, SpecSource, SpecUpdate};
use autopilot::{
    Blueprint, BlueprintProvider, CodeOptimizer, ContentProvider, ContentRequest,
    GenerationService, LogEntry, OptimizeRequest, Project, ProviderError, Spec,
};

/// Returns a fixed blueprint
pub struct StaticBlueprints(pub Blueprint);

#[async_trait]
impl BlueprintProvider for StaticBlueprints {
    fn name(&self) -> &str {
        "static"
    }

    async fn generate(&self, _: &str, _: &str, _: &Spec) -> Result<Blueprint, ProviderError> {
        Ok(self.0.clone())
    }
}

/// Simulates an upstream that answers with prose instead of JSON
pub struct GarbageBlueprints;

#[async_trait]
impl BlueprintProvider for GarbageBlueprints {
    fn name(&self) -> &str {
        "garbage"
    }

    async fn generate(
        &self,
        _: &str,
        tech_stack: &str,
        _: &Spec,
    ) -> Result<Blueprint, ProviderError> {
        Ok(blueprint_or_fallback(
            "Sure! Here is your project structure: frontend, backend...",
            tech_stack,
        ))
    }
}

/// Fails as if the network were down
pub struct UnreachableBlueprints;

#[async_trait]
impl BlueprintProvider for UnreachableBlueprints {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn generate(&self, _: &str, _: &str, _: &Spec) -> Result<Blueprint, ProviderError> {
        Err(ProviderError::Transport("connection refused".to_string()))
    }
}

/// Holds the run inside blueprint generation until released
pub struct GatedBlueprints {
    pub inner: Blueprint,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[async_trait]
impl BlueprintProvider for GatedBlueprints {
    fn name(&self) -> &str {
        "gated"
    }

    async fn generate(&self, _: &str, _: &str, _: &Spec) -> Result<Blueprint, ProviderError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.inner.clone())
    }
}

/// One observed content request
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub framework: String,
    pub related: Vec<String>,
}

/// Echoes path and purpose back as content
#[derive(Default)]
pub struct EchoContent {
    fail_paths: HashSet<String>,
    fenced: bool,
    seen: Mutex<Vec<SeenRequest>>,
}

impl EchoContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every request for `path` (section-relative)
    pub fn failing_on(mut self, path: &str) -> Self {
        self.fail_paths.insert(path.to_string());
        self
    }

    /// Wrap every answer in a code fence
    pub fn fenced(mut self) -> Self {
        self.fenced = true;
        self
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn body(path: &str, purpose: &str) -> String {
        format!("// {}\n// {}\n", path, purpose)
    }
}

#[async_trait]
impl ContentProvider for EchoContent {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: &ContentRequest<'_>) -> Result<String, ProviderError> {
        self.seen.lock().unwrap().push(SeenRequest {
            path: request.path.to_string(),
            framework: request.framework.to_string(),
            related: request.related_files.iter().map(|f| f.path.clone()).collect(),
        });

        if self.fail_paths.contains(request.path) {
            return Err(ProviderError::Status {
                status: 503,
                body: "model overloaded".to_string(),
            });
        }

        let body = Self::body(request.path, request.purpose);
        if self.fenced {
            Ok(format!("```python\n{}```", body))
        } else {
            Ok(body)
        }
    }
}

/// Prefixes a marker line and answers inside a code fence
#[derive(Default)]
pub struct MarkingOptimizer {
    fail_paths: HashSet<String>,
    blank: bool,
    seen: Mutex<Vec<String>>,
}

impl MarkingOptimizer {
    pub const MARKER: &'static str = "// optimized";

    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every request for `path` (project-relative)
    pub fn failing_on(mut self, path: &str) -> Self {
        self.fail_paths.insert(path.to_string());
        self
    }

    /// Answer with nothing but whitespace
    pub fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeOptimizer for MarkingOptimizer {
    fn name(&self) -> &str {
        "marking"
    }

    async fn optimize(&self, request: &OptimizeRequest<'_>) -> Result<String, ProviderError> {
        self.seen.lock().unwrap().push(request.path.to_string());

        if self.fail_paths.contains(request.path) {
            return Err(ProviderError::Transport("timed out".to_string()));
        }
        if self.blank {
            return Ok("  \n".to_string());
        }

        Ok(format!("```\n{}\n{}```", Self::MARKER, request.content))
    }
}

/// A service wired to temporary state and output directories
pub struct Harness {
    pub service: GenerationService,
    pub state: TempDir,
    pub output: TempDir,
}

impl Harness {
    pub fn new(
        blueprints: impl BlueprintProvider + 'static,
        content: Arc<dyn ContentProvider>,
    ) -> Self {
        Self::with_optimizer(blueprints, content, Arc::new(MarkingOptimizer::new()))
    }

    pub fn with_optimizer(
        blueprints: impl BlueprintProvider + 'static,
        content: Arc<dyn ContentProvider>,
        optimizer: Arc<dyn CodeOptimizer>,
    ) -> Self {
        let state = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let service = GenerationService::with_providers(
            state.path().join("projects"),
            output.path().to_path_buf(),
            Arc::new(blueprints),
            content,
            optimizer,
        );

        Self {
            service,
            state,
            output,
        }
    }

    /// A `PENDING` project with an empty spec attached
    pub async fn project_with_spec(&self) -> Project {
        let project = self
            .service
            .create_project("Shop", "React + FastAPI")
            .await
            .unwrap();
        self.service
            .attach_spec(project.id, SpecSource::Parsed(SpecUpdate::default()))
            .await
            .unwrap()
    }

    /// Start a run and wait for it to finish
    pub async fn generate(&self, project_id: Uuid) -> Project {
        let handle = self.service.start_generation(project_id).await.unwrap();
        handle.await.unwrap();
        self.service.get_project(project_id).await.unwrap()
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.state.path().join("projects")
    }

    pub fn project_root(&self, project_id: Uuid) -> PathBuf {
        self.output.path().join(project_id.to_string())
    }

    pub async fn logs(&self, project_id: Uuid) -> Vec<LogEntry> {
        self.service.logs(project_id).await.unwrap()
    }
}

/// A small backend-only blueprint plus one root file
pub fn backend_blueprint() -> Blueprint {
    Blueprint {
        frontend: None,
        backend: Some(Section::new(
            Some("FastAPI"),
            &[
                ("main.py", "Application entry point"),
                ("models.py", "ORM models"),
                ("api/routes.py", "HTTP routes"),
            ],
        )),
        database: None,
        root: Some(Section::new(None, &[("README.md", "Project documentation")])),
    }
}

/// Every regular file below `dir`, relative to it
pub fn files_on_disk(dir: &std::path::Path) -> Vec<String> {
    fn walk(base: &std::path::Path, dir: &std::path::Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let rel = path.strip_prefix(base).unwrap();
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
