//! Boundary operations exposed to callers (CLI, transport layers).
//!
//! [`GenerationService`] owns the stores and the orchestrator, and is the
//! only place where a run is started. All components are created once and
//! shared by `Arc`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{
    BlueprintProvider, CodeOptimizer, ContentProvider, HttpBlueprintProvider, HttpCodeOptimizer,
    HttpContentProvider, OptimizeRequest,
};
use crate::domain::{
    ErrorCode, FileOutcome, LogEntry, LogStep, Project, ProjectStatus, Spec, SpecSource,
};

use super::audit_log::AuditLog;
use super::error::GenerationError;
use super::fence::strip_code_fences;
use super::file_tree::{build_file_tree, TreeNode};
use super::file_writer::{FileWriter, WrittenFile};
use super::orchestrator::{phase, Orchestrator};
use super::path_guard::PathGuard;
use super::status_store::StatusStore;

const PARSING_STEP: &str = "Parsing specifications";
const INTERRUPTED_MESSAGE: &str = "Generation interrupted: run abandoned by operator";

/// Per-file result of an optimization request
#[derive(Debug)]
pub struct OptimizeReport {
    /// Rewritten files, in request order
    pub optimized: Vec<OptimizedFile>,

    /// Files left untouched, with the reason
    pub failed: Vec<(String, GenerationError)>,
}

/// One rewritten artifact
#[derive(Debug, Clone)]
pub struct OptimizedFile {
    /// Path relative to the project root
    pub path: String,
    pub content_hash: String,
    pub size_bytes: u64,
}

/// Entry point for every project operation
#[derive(Clone)]
pub struct GenerationService {
    status: Arc<StatusStore>,
    audit: Arc<AuditLog>,
    orchestrator: Arc<Orchestrator>,
    optimizer: Arc<dyn CodeOptimizer>,
    writer: FileWriter,
}

impl GenerationService {
    pub fn new(
        status: Arc<StatusStore>,
        audit: Arc<AuditLog>,
        orchestrator: Arc<Orchestrator>,
        optimizer: Arc<dyn CodeOptimizer>,
    ) -> Self {
        Self {
            status,
            audit,
            orchestrator,
            optimizer,
            writer: FileWriter::new(),
        }
    }

    /// Wire a service from a state directory, an output root and its providers
    pub fn with_providers(
        projects_dir: PathBuf,
        output_root: PathBuf,
        blueprints: Arc<dyn BlueprintProvider>,
        content: Arc<dyn ContentProvider>,
        optimizer: Arc<dyn CodeOptimizer>,
    ) -> Self {
        let status = Arc::new(StatusStore::new(projects_dir.clone()));
        let audit = Arc::new(AuditLog::new(projects_dir));
        let orchestrator = Arc::new(Orchestrator::new(
            blueprints,
            content,
            status.clone(),
            audit.clone(),
            output_root,
        ));

        Self::new(status, audit, orchestrator, optimizer)
    }

    /// Wire a service from the resolved configuration with HTTP providers
    pub fn from_config() -> Result<Self> {
        let config = crate::config::config()?;

        Ok(Self::with_providers(
            config.projects_dir(),
            config.output.clone(),
            Arc::new(HttpBlueprintProvider::from_settings(&config.provider)),
            Arc::new(HttpContentProvider::from_settings(&config.provider)),
            Arc::new(HttpCodeOptimizer::from_settings(&config.provider)),
        ))
    }

    pub fn status_store(&self) -> &StatusStore {
        &self.status
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Create a project in `PENDING`
    pub async fn create_project(
        &self,
        name: &str,
        tech_stack: &str,
    ) -> Result<Project, GenerationError> {
        let project = self.status.create(name, tech_stack).await?;
        info!(project_id = %project.id, name = %project.name, "Project created");
        Ok(project)
    }

    pub async fn get_project(&self, project_id: Uuid) -> Result<Project, GenerationError> {
        self.status.get(project_id).await
    }

    /// All projects, newest first
    pub async fn list_projects(&self) -> Result<Vec<Project>, GenerationError> {
        self.status.list().await
    }

    /// Parse and store a spec document, running the ingestion transitions
    ///
    /// Facets absent from the document keep their previous value. On a parse
    /// failure the project ends in `FAILED` and the error is returned.
    #[instrument(skip(self, source), fields(project_id = %project_id))]
    pub async fn attach_spec(
        &self,
        project_id: Uuid,
        source: SpecSource,
    ) -> Result<Project, GenerationError> {
        self.status
            .transition(project_id, ProjectStatus::Parsing, Some(PARSING_STEP.to_string()))
            .await?;
        self.record(LogEntry::new(project_id, LogStep::Ingestion, PARSING_STEP))
            .await;

        let update = match source.parse() {
            Ok(update) => update,
            Err(e) => {
                let err = GenerationError::InvalidSpec(e.to_string());
                self.fail_ingestion(project_id, &err).await;
                return Err(err);
            }
        };

        let spec = match self.store_spec(project_id, update).await {
            Ok(spec) => spec,
            Err(err) => {
                self.fail_ingestion(project_id, &err).await;
                return Err(err);
            }
        };

        self.record(LogEntry::new(
            project_id,
            LogStep::Ingestion,
            format!(
                "Specifications uploaded successfully ({} features, {} APIs, {} tables)",
                spec.features.len(),
                spec.apis.len(),
                spec.database.len()
            ),
        ))
        .await;

        self.status
            .transition(project_id, ProjectStatus::Pending, None)
            .await
    }

    async fn store_spec(
        &self,
        project_id: Uuid,
        update: crate::domain::SpecUpdate,
    ) -> Result<Spec, GenerationError> {
        let previous = self.status.load_spec(project_id).await?;
        let spec = Spec::merged(previous, update);
        self.status.save_spec(project_id, &spec).await?;
        Ok(spec)
    }

    async fn fail_ingestion(&self, project_id: Uuid, err: &GenerationError) {
        let message = format!("Failed to parse specifications: {}", err);
        warn!(%project_id, error = %err, "Spec ingestion failed");

        self.record(
            LogEntry::new(project_id, LogStep::Error, message.clone()).with_code(err.code()),
        )
        .await;

        if let Err(e) = self.status.fail(project_id, message, err.code()).await {
            warn!(%project_id, error = %e, "Failed to record ingestion failure");
        }
    }

    /// Accept a generation request and run it in the background
    ///
    /// Only a `PENDING` project can start; anything else is a conflict and
    /// leaves the project untouched. The returned handle may be awaited or
    /// dropped; the run proceeds either way.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn start_generation(
        &self,
        project_id: Uuid,
    ) -> Result<JoinHandle<()>, GenerationError> {
        let project = self.status.get(project_id).await?;

        if project.status != ProjectStatus::Pending {
            return Err(GenerationError::Conflict {
                project_id,
                from: project.status,
                to: ProjectStatus::Generating,
            });
        }

        let claimed = self
            .status
            .transition_from(
                project_id,
                ProjectStatus::Pending,
                ProjectStatus::Generating,
                Some(phase::QUEUED.to_string()),
            )
            .await?;

        info!("Generation accepted");
        let orchestrator = self.orchestrator.clone();
        Ok(tokio::spawn(async move { orchestrator.run_claimed(claimed).await }))
    }

    /// Manually fail a run left in `GENERATING` by a dead process
    pub async fn abandon(&self, project_id: Uuid) -> Result<Project, GenerationError> {
        let project = self
            .status
            .fail_from(
                project_id,
                ProjectStatus::Generating,
                INTERRUPTED_MESSAGE,
                ErrorCode::Interrupted,
            )
            .await?;

        self.record(
            LogEntry::new(project_id, LogStep::Error, INTERRUPTED_MESSAGE)
                .with_code(ErrorCode::Interrupted),
        )
        .await;

        Ok(project)
    }

    /// Audit entries of a project, ordered by timestamp
    pub async fn logs(&self, project_id: Uuid) -> Result<Vec<LogEntry>, GenerationError> {
        self.status.get(project_id).await?;
        self.audit.entries(project_id).await
    }

    /// Directory tree of the generated output
    pub async fn artifact_tree(&self, project_id: Uuid) -> Result<Vec<TreeNode>, GenerationError> {
        self.status.get(project_id).await?;
        let root = self.orchestrator.project_root(project_id);

        tokio::task::spawn_blocking(move || build_file_tree(&root))
            .await
            .map_err(|e| GenerationError::storage("tree task", e))?
    }

    /// Read one generated artifact as UTF-8 text
    ///
    /// The path is validated before anything touches the filesystem.
    pub async fn read_artifact(
        &self,
        project_id: Uuid,
        relative_path: &str,
    ) -> Result<String, GenerationError> {
        PathGuard::validate(relative_path)?;

        self.status.get(project_id).await?;

        let root = self.orchestrator.project_root(project_id);
        self.writer.read_text(&root, relative_path).await
    }

    /// Rewrite generated files through the code optimizer
    ///
    /// Every path is validated up front; one bad path rejects the whole
    /// request. After that each file is read, optimized and written back on
    /// its own, and a failure leaves that file untouched. Not allowed while a
    /// run is in flight.
    #[instrument(skip(self, paths), fields(project_id = %project_id, files = paths.len()))]
    pub async fn optimize_artifacts(
        &self,
        project_id: Uuid,
        paths: &[String],
    ) -> Result<OptimizeReport, GenerationError> {
        let mut selected: Vec<&str> = Vec::new();
        for path in paths {
            PathGuard::validate(path)?;
            if !selected.contains(&path.as_str()) {
                selected.push(path);
            }
        }
        if selected.is_empty() {
            return Err(GenerationError::Validation(
                "No files selected for optimization".to_string(),
            ));
        }

        let project = self.status.get(project_id).await?;
        if project.is_generating() {
            return Err(GenerationError::Busy {
                project_id,
                status: project.status,
                reason: "files cannot be optimized during a generation run",
            });
        }

        let root = self.orchestrator.project_root(project_id);
        self.record(LogEntry::new(
            project_id,
            LogStep::Optimization,
            format!("Optimizing {} files", selected.len()),
        ))
        .await;

        let mut report = OptimizeReport {
            optimized: Vec::new(),
            failed: Vec::new(),
        };

        for path in selected {
            match self.optimize_one(&project, &root, path).await {
                Ok(written) => {
                    self.record(
                        LogEntry::new(project_id, LogStep::Optimization, format!("✓ Optimized {}", path))
                            .with_path(path)
                            .with_outcome(FileOutcome::Success)
                            .with_content(written.content_hash.clone(), written.size_bytes),
                    )
                    .await;
                    report.optimized.push(OptimizedFile {
                        path: path.to_string(),
                        content_hash: written.content_hash,
                        size_bytes: written.size_bytes,
                    });
                }
                Err(e) => {
                    warn!(path, error = %e, "File optimization failed");
                    self.record(
                        LogEntry::new(
                            project_id,
                            LogStep::Optimization,
                            format!("✗ Failed to optimize {}: {}", path, e),
                        )
                        .with_path(path)
                        .with_outcome(FileOutcome::Failure)
                        .with_code(e.code()),
                    )
                    .await;
                    report.failed.push((path.to_string(), e));
                }
            }
        }

        self.record(LogEntry::new(
            project_id,
            LogStep::Optimization,
            format!(
                "Optimized {} of {} files",
                report.optimized.len(),
                report.optimized.len() + report.failed.len()
            ),
        ))
        .await;

        Ok(report)
    }

    async fn optimize_one(
        &self,
        project: &Project,
        root: &Path,
        path: &str,
    ) -> Result<WrittenFile, GenerationError> {
        let current = self.writer.read_text(root, path).await?;

        let request = OptimizeRequest {
            path,
            content: &current,
            project_name: &project.name,
            tech_stack: &project.tech_stack,
        };
        let raw = self.optimizer.optimize(&request).await?;
        let content = strip_code_fences(&raw);

        if content.trim().is_empty() {
            return Err(GenerationError::Provider(crate::adapters::ProviderError::Malformed(
                "optimizer returned no content".to_string(),
            )));
        }

        self.writer.write(root, path, &content).await
    }

    async fn record(&self, entry: LogEntry) {
        if let Err(e) = self.audit.append(&entry).await {
            warn!(error = %e, "Failed to append audit entry");
        }
    }
}
