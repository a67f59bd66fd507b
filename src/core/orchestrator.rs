//! Generation run driver.
//!
//! Walks a [`GenerationPlan`] for one project: claims the project, asks the
//! blueprint provider for a manifest, then generates and writes every file
//! in order. File-level failures are logged and skipped; anything else ends
//! the run in `FAILED`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{BlueprintProvider, ContentProvider, ContentRequest};
use crate::domain::{
    FileOutcome, LogEntry, LogStep, Project, ProjectStatus, SectionName, Spec,
};

use super::audit_log::AuditLog;
use super::error::GenerationError;
use super::fence::strip_code_fences;
use super::file_writer::{FileWriter, WrittenFile};
use super::plan::{FileTask, GenerationPlan, SectionPlan};
use super::status_store::StatusStore;

/// Progress phase labels written to `current_step`
pub mod phase {
    pub const QUEUED: &str = "Queued for generation";
    pub const INITIALIZING: &str = "Initializing AI-driven project generation";
    pub const PLANNING: &str = "Creating project blueprint with AI";
    pub const STRUCTURE: &str = "Creating project structure";
    pub const FINALIZING: &str = "Finalizing project";
}

/// Summary of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total_files: usize,
    pub succeeded: usize,
}

/// Drives generation runs
pub struct Orchestrator {
    blueprints: Arc<dyn BlueprintProvider>,
    content: Arc<dyn ContentProvider>,
    status: Arc<StatusStore>,
    audit: Arc<AuditLog>,
    writer: FileWriter,
    output_root: PathBuf,
}

impl Orchestrator {
    /// Create an orchestrator writing below `output_root`
    pub fn new(
        blueprints: Arc<dyn BlueprintProvider>,
        content: Arc<dyn ContentProvider>,
        status: Arc<StatusStore>,
        audit: Arc<AuditLog>,
        output_root: PathBuf,
    ) -> Self {
        Self {
            blueprints,
            content,
            status,
            audit,
            writer: FileWriter::new(),
            output_root,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Output directory of a project
    pub fn project_root(&self, project_id: Uuid) -> PathBuf {
        self.output_root.join(project_id.to_string())
    }

    /// Claim a `PENDING` project and execute one run to a terminal state
    ///
    /// Outcomes are observable only through the status store and the audit
    /// log. A project that is not `PENDING` is left untouched, so a second
    /// call while a run is in flight does nothing.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn run(&self, project_id: Uuid) {
        let claimed = self
            .status
            .transition_from(
                project_id,
                ProjectStatus::Pending,
                ProjectStatus::Generating,
                Some(phase::QUEUED.into()),
            )
            .await;

        match claimed {
            Ok(project) => self.drive(project).await,
            Err(e) => warn!(error = %e, "Cannot start generation run"),
        }
    }

    /// Execute a run for a project the caller has already claimed
    pub(crate) async fn run_claimed(&self, project: Project) {
        if !project.is_generating() {
            warn!(project_id = %project.id, status = %project.status, "Run handed an unclaimed project");
            return;
        }
        self.drive(project).await;
    }

    async fn drive(&self, project: Project) {
        let project_id = project.id;

        match self.execute(&project).await {
            Ok(summary) => info!(
                %project_id,
                total = summary.total_files,
                succeeded = summary.succeeded,
                "Generation run finished"
            ),
            Err(e) => self.fail_run(project_id, &e).await,
        }
    }

    async fn execute(&self, project: &Project) -> Result<RunSummary, GenerationError> {
        let project_id = project.id;

        let spec = self
            .status
            .load_spec(project_id)
            .await?
            .ok_or(GenerationError::MissingSpec)?;

        self.set_phase(project_id, phase::INITIALIZING).await?;
        self.record(LogEntry::new(
            project_id,
            LogStep::Initialization,
            format!("Starting AI generation for project: {}", project.name),
        ))
        .await;

        self.set_phase(project_id, phase::PLANNING).await?;
        self.record(LogEntry::new(
            project_id,
            LogStep::Planning,
            "Generating project architecture blueprint...",
        ))
        .await;

        let blueprint = self
            .blueprints
            .generate(&project.name, &project.tech_stack, &spec)
            .await?;
        let plan = GenerationPlan::from_blueprint(&blueprint);

        self.record(LogEntry::new(
            project_id,
            LogStep::Planning,
            format!("Blueprint generated with {} files", plan.total_files()),
        ))
        .await;

        self.set_phase(project_id, phase::STRUCTURE).await?;
        let project_root = self.project_root(project_id);
        tokio::fs::create_dir_all(&project_root).await.map_err(|e| {
            GenerationError::storage(format!("create {}", project_root.display()), e)
        })?;
        self.record(LogEntry::new(
            project_id,
            LogStep::Structure,
            format!("Created project directory {}", project_root.display()),
        ))
        .await;

        let succeeded = self
            .generate_sections(project, &spec, &plan, &project_root)
            .await?;

        self.set_phase(project_id, phase::FINALIZING).await?;
        self.record(LogEntry::new(
            project_id,
            LogStep::Finalization,
            format!("Generated {} files successfully", succeeded),
        ))
        .await;

        self.status
            .transition(project_id, ProjectStatus::Done, None)
            .await?;
        self.record(LogEntry::new(
            project_id,
            LogStep::Complete,
            "Project generation completed",
        ))
        .await;

        Ok(RunSummary {
            total_files: plan.total_files(),
            succeeded,
        })
    }

    /// Walk the plan section by section; returns the number of files written
    async fn generate_sections(
        &self,
        project: &Project,
        spec: &Spec,
        plan: &GenerationPlan,
        project_root: &Path,
    ) -> Result<usize, GenerationError> {
        let total = plan.total_files();
        let mut succeeded = 0;

        for section in &plan.sections {
            self.set_phase(project.id, section.name.phase_label()).await?;
            let base_dir = section.base_dir(project_root);

            for task in &section.tasks {
                let rel_path = display_path(section.name, &task.path);
                let step = section.name.log_step();

                self.record(
                    LogEntry::new(
                        project.id,
                        step,
                        format!("Generating {} ({}/{})", rel_path, task.ordinal, total),
                    )
                    .with_path(&rel_path),
                )
                .await;

                match self
                    .generate_file(project, spec, section, task, &base_dir)
                    .await
                {
                    Ok(written) => {
                        succeeded += 1;
                        self.record(
                            LogEntry::new(project.id, step, format!("✓ Generated {}", rel_path))
                                .with_path(&rel_path)
                                .with_outcome(FileOutcome::Success)
                                .with_content(written.content_hash, written.size_bytes),
                        )
                        .await;
                    }
                    Err(e) => {
                        warn!(section = %section.name, path = %rel_path, error = %e, "File generation failed");
                        self.record(
                            LogEntry::new(
                                project.id,
                                step,
                                format!("✗ Failed to generate {}: {}", rel_path, e),
                            )
                            .with_path(&rel_path)
                            .with_outcome(FileOutcome::Failure)
                            .with_code(e.code()),
                        )
                        .await;
                    }
                }
            }
        }

        Ok(succeeded)
    }

    /// Generate and persist one file; every error stays scoped to this file
    async fn generate_file(
        &self,
        project: &Project,
        spec: &Spec,
        section: &SectionPlan,
        task: &FileTask,
        base_dir: &Path,
    ) -> Result<WrittenFile, GenerationError> {
        self.writer.prepare(base_dir, &task.path).await?;

        let request = ContentRequest {
            path: &task.path,
            purpose: &task.purpose,
            project_name: &project.name,
            framework: &section.framework,
            spec,
            related_files: &task.related_files,
        };
        let raw = self.content.generate(&request).await?;
        let content = strip_code_fences(&raw);

        self.writer.write(base_dir, &task.path, &content).await
    }

    async fn set_phase(&self, project_id: Uuid, label: &str) -> Result<(), GenerationError> {
        self.status
            .transition(project_id, ProjectStatus::Generating, Some(label.to_string()))
            .await
            .map(|_| ())
    }

    /// Append to the audit log; a failed append never affects the run
    async fn record(&self, entry: LogEntry) {
        if let Err(e) = self.audit.append(&entry).await {
            warn!(error = %e, step = entry.step.as_str(), "Failed to append audit entry");
        }
    }

    /// Log a fatal error and move the project to `FAILED`
    async fn fail_run(&self, project_id: Uuid, err: &GenerationError) {
        let message = format!("Generation failed: {}", err);
        error!(error = %err, code = %err.code(), "Generation run failed");

        self.record(
            LogEntry::new(project_id, LogStep::Error, message.clone()).with_code(err.code()),
        )
        .await;

        if let Err(e) = self.status.fail(project_id, message, err.code()).await {
            error!(error = %e, "Failed to record run failure");
        }
    }
}

/// Path of a file relative to the project root
pub fn display_path(section: SectionName, path: &str) -> String {
    match section.subdir() {
        Some(subdir) => format!("{}/{}", subdir, path),
        None => path.to_string(),
    }
}
