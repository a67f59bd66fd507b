//! Project status store.
//!
//! Each project owns a directory `<root>/<project_id>/` holding:
//! - `status.jsonl`: append-only status records, replayed into a [`Project`]
//! - `spec.json`: the current specification
//!
//! Transitions are checked against [`ProjectStatus::can_transition_to`] while
//! an advisory lock on the project's `.lock` file is held, so the
//! read-then-write of a transition is atomic for every process that goes
//! through this store.

use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{ErrorCode, Project, ProjectStatus, Spec, StatusRecord};

use super::error::GenerationError;

const STATUS_FILE: &str = "status.jsonl";
const SPEC_FILE: &str = "spec.json";
const LOCK_FILE: &str = ".lock";

/// Maximum length of project names and tech-stack labels
pub const MAX_LABEL_LEN: usize = 255;

/// File-based store of project lifecycle state
#[derive(Debug, Clone)]
pub struct StatusStore {
    /// Directory holding one subdirectory per project
    root: PathBuf,
}

impl StatusStore {
    /// Create a store rooted at `root`
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// State directory of a project
    pub fn project_dir(&self, project_id: Uuid) -> PathBuf {
        self.root.join(project_id.to_string())
    }

    /// Create a project in `PENDING`
    pub async fn create(&self, name: &str, tech_stack: &str) -> Result<Project, GenerationError> {
        let name = validate_label("Project name", name)?;
        let tech_stack = validate_label("Tech stack", tech_stack)?;

        let id = Uuid::new_v4();
        let dir = self.project_dir(id);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| GenerationError::storage(format!("create {}", dir.display()), e))?;

        let record = StatusRecord::created(id, name, tech_stack);
        let status_path = dir.join(STATUS_FILE);
        tokio::task::spawn_blocking(move || append_record(&status_path, &record).map(|_| record))
            .await
            .map_err(|e| GenerationError::storage("status task", e))?
            .and_then(|record| {
                Project::from_records(std::slice::from_ref(&record))
                    .ok_or_else(|| GenerationError::Storage("creation record unreadable".into()))
            })
    }

    /// Current state of a project
    pub async fn get(&self, project_id: Uuid) -> Result<Project, GenerationError> {
        let records = self.history(project_id).await?;
        Project::from_records(&records)
            .ok_or_else(|| GenerationError::NotFound(format!("Project {}", project_id)))
    }

    /// Every status record of a project, in append order
    pub async fn history(&self, project_id: Uuid) -> Result<Vec<StatusRecord>, GenerationError> {
        let path = self.project_dir(project_id).join(STATUS_FILE);

        if !path.exists() {
            return Err(GenerationError::NotFound(format!("Project {}", project_id)));
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| GenerationError::storage(format!("read {}", path.display()), e))?;

        parse_records(&content)
    }

    /// All projects, newest first
    pub async fn list(&self) -> Result<Vec<Project>, GenerationError> {
        let mut projects = Vec::new();

        if !self.root.exists() {
            return Ok(projects);
        }

        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| GenerationError::storage(format!("list {}", self.root.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GenerationError::storage("list projects", e))?
        {
            let Some(id) = entry.file_name().to_str().and_then(|n| Uuid::parse_str(n).ok()) else {
                continue;
            };

            match self.get(id).await {
                Ok(project) => projects.push(project),
                Err(e) => warn!(project_id = %id, error = %e, "Skipping unreadable project"),
            }
        }

        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    /// Move a project to `to`, replacing its current step
    pub async fn transition(
        &self,
        project_id: Uuid,
        to: ProjectStatus,
        current_step: Option<String>,
    ) -> Result<Project, GenerationError> {
        self.apply(project_id, None, to, current_step, None).await
    }

    /// Like [`transition`](Self::transition), but only from exactly `from`
    ///
    /// The check and the append happen under the same lock, so of two
    /// concurrent callers at most one succeeds.
    pub async fn transition_from(
        &self,
        project_id: Uuid,
        from: ProjectStatus,
        to: ProjectStatus,
        current_step: Option<String>,
    ) -> Result<Project, GenerationError> {
        self.apply(project_id, Some(from), to, current_step, None).await
    }

    /// Move a project to `FAILED` with a diagnostic and an error code
    pub async fn fail(
        &self,
        project_id: Uuid,
        message: impl Into<String>,
        code: ErrorCode,
    ) -> Result<Project, GenerationError> {
        self.apply(project_id, None, ProjectStatus::Failed, Some(message.into()), Some(code))
            .await
    }

    /// Move a project from exactly `from` to `FAILED`
    pub async fn fail_from(
        &self,
        project_id: Uuid,
        from: ProjectStatus,
        message: impl Into<String>,
        code: ErrorCode,
    ) -> Result<Project, GenerationError> {
        self.apply(
            project_id,
            Some(from),
            ProjectStatus::Failed,
            Some(message.into()),
            Some(code),
        )
        .await
    }

    async fn apply(
        &self,
        project_id: Uuid,
        expected: Option<ProjectStatus>,
        to: ProjectStatus,
        current_step: Option<String>,
        error_code: Option<ErrorCode>,
    ) -> Result<Project, GenerationError> {
        let dir = self.project_dir(project_id);

        tokio::task::spawn_blocking(move || {
            apply_locked(&dir, project_id, expected, to, current_step, error_code)
        })
        .await
        .map_err(|e| GenerationError::storage("status task", e))?
    }

    /// Replace the project's spec
    pub async fn save_spec(&self, project_id: Uuid, spec: &Spec) -> Result<(), GenerationError> {
        let dir = self.project_dir(project_id);
        let path = dir.join(SPEC_FILE);
        let tmp = dir.join(format!("{}.tmp", SPEC_FILE));

        let content = serde_json::to_string_pretty(spec)
            .map_err(|e| GenerationError::storage("serialize spec", e))?;

        fs::write(&tmp, content)
            .await
            .map_err(|e| GenerationError::storage(format!("write {}", tmp.display()), e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| GenerationError::storage(format!("replace {}", path.display()), e))?;

        Ok(())
    }

    /// The project's spec, if one was attached
    pub async fn load_spec(&self, project_id: Uuid) -> Result<Option<Spec>, GenerationError> {
        let path = self.project_dir(project_id).join(SPEC_FILE);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| GenerationError::storage(format!("read {}", path.display()), e))?;

        let spec = serde_json::from_str(&content)
            .map_err(|e| GenerationError::storage(format!("parse {}", path.display()), e))?;

        Ok(Some(spec))
    }
}

fn validate_label(what: &str, value: &str) -> Result<String, GenerationError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(GenerationError::Validation(format!("{} cannot be empty", what)));
    }
    if value.chars().count() > MAX_LABEL_LEN {
        return Err(GenerationError::Validation(format!(
            "{} exceeds {} characters",
            what, MAX_LABEL_LEN
        )));
    }

    Ok(value.to_string())
}

fn parse_records(content: &str) -> Result<Vec<StatusRecord>, GenerationError> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| GenerationError::storage(format!("parse status record {}", line), e))
        })
        .collect()
}

fn append_record(path: &Path, record: &StatusRecord) -> Result<(), GenerationError> {
    let json = serde_json::to_string(record)
        .map_err(|e| GenerationError::storage("serialize status record", e))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| GenerationError::storage(format!("open {}", path.display()), e))?;

    writeln!(file, "{}", json).map_err(|e| GenerationError::storage("write status record", e))?;
    file.flush()
        .map_err(|e| GenerationError::storage("flush status record", e))?;

    Ok(())
}

/// Read-check-append under the project's exclusive lock
fn apply_locked(
    dir: &Path,
    project_id: Uuid,
    expected: Option<ProjectStatus>,
    to: ProjectStatus,
    current_step: Option<String>,
    error_code: Option<ErrorCode>,
) -> Result<Project, GenerationError> {
    let status_path = dir.join(STATUS_FILE);

    if !status_path.exists() {
        return Err(GenerationError::NotFound(format!("Project {}", project_id)));
    }

    let lock_path = dir.join(LOCK_FILE);
    let lock = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(&lock_path)
        .map_err(|e| GenerationError::storage(format!("open {}", lock_path.display()), e))?;

    lock.lock_exclusive()
        .map_err(|e| GenerationError::storage("acquire status lock", e))?;

    let result = check_and_append(&status_path, project_id, expected, to, current_step, error_code);

    if let Err(e) = FileExt::unlock(&lock) {
        warn!(%project_id, error = %e, "Failed to release status lock");
    }

    result
}

fn check_and_append(
    status_path: &Path,
    project_id: Uuid,
    expected: Option<ProjectStatus>,
    to: ProjectStatus,
    current_step: Option<String>,
    error_code: Option<ErrorCode>,
) -> Result<Project, GenerationError> {
    let content = std::fs::read_to_string(status_path)
        .map_err(|e| GenerationError::storage(format!("read {}", status_path.display()), e))?;
    let records = parse_records(&content)?;

    let mut project = Project::from_records(&records)
        .ok_or_else(|| GenerationError::NotFound(format!("Project {}", project_id)))?;

    let unexpected = expected.is_some_and(|status| status != project.status);
    if unexpected || !project.status.can_transition_to(to) {
        return Err(GenerationError::Conflict {
            project_id,
            from: project.status,
            to,
        });
    }

    let record = StatusRecord::transition(project_id, project.status, to, current_step, error_code);
    append_record(status_path, &record)?;
    project.apply_record(&record);

    debug!(%project_id, status = %project.status, "Status updated");
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (StatusStore, TempDir) {
        let temp = TempDir::new().unwrap();
        (StatusStore::new(temp.path().to_path_buf()), temp)
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let (store, _temp) = create_test_store();

        let project = store.create("  Shop  ", "React + FastAPI").await.unwrap();
        assert_eq!(project.status, ProjectStatus::Pending);
        assert_eq!(project.name, "Shop");

        let loaded = store.get(project.id).await.unwrap();
        assert_eq!(loaded.id, project.id);
        assert_eq!(loaded.tech_stack, "React + FastAPI");
    }

    #[tokio::test]
    async fn test_create_validates_labels() {
        let (store, _temp) = create_test_store();

        assert!(matches!(
            store.create("", "React").await,
            Err(GenerationError::Validation(_))
        ));
        assert!(matches!(
            store.create("x", &"y".repeat(256)).await,
            Err(GenerationError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_illegal_transition_leaves_state_unchanged() {
        let (store, _temp) = create_test_store();
        let project = store.create("p", "s").await.unwrap();

        let err = store
            .transition(project.id, ProjectStatus::Done, None)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let history = store.history(project.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(store.get(project.id).await.unwrap().status, ProjectStatus::Pending);
    }

    #[tokio::test]
    async fn test_fail_records_code_and_message() {
        let (store, _temp) = create_test_store();
        let project = store.create("p", "s").await.unwrap();

        store
            .transition(project.id, ProjectStatus::Generating, Some("Queued".into()))
            .await
            .unwrap();
        let failed = store
            .fail(project.id, "Generation failed: timeout", ErrorCode::ProviderFailure)
            .await
            .unwrap();

        assert_eq!(failed.status, ProjectStatus::Failed);
        assert_eq!(failed.current_step.as_deref(), Some("Generation failed: timeout"));
        assert_eq!(failed.error_code, Some(ErrorCode::ProviderFailure));
    }

    #[tokio::test]
    async fn test_concurrent_claims_admit_one() {
        let (store, _temp) = create_test_store();
        let store = std::sync::Arc::new(store);
        let project = store.create("p", "s").await.unwrap();

        let claims: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .transition_from(
                            project.id,
                            ProjectStatus::Pending,
                            ProjectStatus::Generating,
                            None,
                        )
                        .await
                })
            })
            .collect();

        let mut accepted = 0;
        for claim in claims {
            match claim.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(e) => assert!(e.is_conflict()),
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(store.history(project.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_project_is_not_found() {
        let (store, temp) = create_test_store();
        let id = Uuid::new_v4();

        assert!(store.get(id).await.unwrap_err().is_not_found());
        assert!(store
            .transition(id, ProjectStatus::Parsing, None)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(!temp.path().join(id.to_string()).exists());
    }

    #[tokio::test]
    async fn test_spec_round_trip_and_replace() {
        let (store, _temp) = create_test_store();
        let project = store.create("p", "s").await.unwrap();

        assert!(store.load_spec(project.id).await.unwrap().is_none());

        let mut spec = Spec::default();
        spec.features.insert("auth".into(), json!({"login": true}));
        store.save_spec(project.id, &spec).await.unwrap();

        let replacement = Spec::default();
        store.save_spec(project.id, &replacement).await.unwrap();

        assert_eq!(store.load_spec(project.id).await.unwrap(), Some(replacement));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (store, _temp) = create_test_store();

        let first = store.create("first", "s").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.create("second", "s").await.unwrap();

        let projects = store.list().await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].id, second.id);
        assert_eq!(projects[1].id, first.id);
    }
}
