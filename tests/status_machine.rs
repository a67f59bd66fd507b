//! Status Machine Integration Tests
//!
//! Start-generation guards, spec ingestion transitions and manual recovery.

mod common;

use std::sync::Arc;

use tokio::sync::Notify;
use uuid::Uuid;

use autopilot::core::orchestrator::phase;
use autopilot::core::{AuditLog, StatusStore};
use autopilot::domain::{ErrorCode, ProjectStatus, SpecSource, StatusRecordKind};
use autopilot::{GenerationError, Orchestrator};

use common::{backend_blueprint, EchoContent, GatedBlueprints, Harness, StaticBlueprints};

fn harness() -> Harness {
    Harness::new(StaticBlueprints(backend_blueprint()), Arc::new(EchoContent::new()))
}

async fn targets(h: &Harness, project_id: Uuid) -> Vec<ProjectStatus> {
    h.service
        .status_store()
        .history(project_id)
        .await
        .unwrap()
        .iter()
        .filter_map(|r| r.target())
        .collect()
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let h = harness();
    let project = h.project_with_spec().await;

    let first = h.service.start_generation(project.id).await.unwrap();
    let second = h.service.start_generation(project.id).await;
    assert!(matches!(second, Err(GenerationError::Conflict { .. })));

    first.await.unwrap();

    let targets = targets(&h, project.id).await;
    assert_eq!(
        targets.iter().filter(|s| **s == ProjectStatus::Done).count(),
        1
    );

    let claims = h
        .service
        .status_store()
        .history(project.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| {
            matches!(
                r.kind,
                StatusRecordKind::Transition {
                    from: ProjectStatus::Pending,
                    to: ProjectStatus::Generating,
                    ..
                }
            )
        })
        .count();
    assert_eq!(claims, 1);
}

#[tokio::test]
async fn test_start_while_generating_leaves_state_unchanged() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let h = Harness::new(
        GatedBlueprints {
            inner: backend_blueprint(),
            entered: entered.clone(),
            release: release.clone(),
        },
        Arc::new(EchoContent::new()),
    );
    let project = h.project_with_spec().await;

    let run = h.service.start_generation(project.id).await.unwrap();
    entered.notified().await;

    let before = h.service.status_store().history(project.id).await.unwrap().len();
    let current = h.service.get_project(project.id).await.unwrap();
    assert!(current.is_generating());

    let err = h.service.start_generation(project.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);

    let after = h.service.status_store().history(project.id).await.unwrap().len();
    assert_eq!(before, after);

    release.notify_one();
    run.await.unwrap();
    assert_eq!(
        h.service.get_project(project.id).await.unwrap().status,
        ProjectStatus::Done
    );
}

/// An orchestrator sharing the harness's state and output directories
fn second_orchestrator(h: &Harness) -> Orchestrator {
    Orchestrator::new(
        Arc::new(StaticBlueprints(backend_blueprint())),
        Arc::new(EchoContent::new()),
        Arc::new(StatusStore::new(h.projects_dir())),
        Arc::new(AuditLog::new(h.projects_dir())),
        h.output.path().to_path_buf(),
    )
}

#[tokio::test]
async fn test_direct_run_during_live_run_does_nothing() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let h = Harness::new(
        GatedBlueprints {
            inner: backend_blueprint(),
            entered: entered.clone(),
            release: release.clone(),
        },
        Arc::new(EchoContent::new()),
    );
    let project = h.project_with_spec().await;

    let run = h.service.start_generation(project.id).await.unwrap();
    entered.notified().await;

    let before = h.service.status_store().history(project.id).await.unwrap().len();
    let logs_before = h.logs(project.id).await.len();

    second_orchestrator(&h).run(project.id).await;

    assert_eq!(
        h.service.status_store().history(project.id).await.unwrap().len(),
        before
    );
    assert_eq!(h.logs(project.id).await.len(), logs_before);
    assert!(!h.project_root(project.id).exists());

    release.notify_one();
    run.await.unwrap();

    let targets = targets(&h, project.id).await;
    assert_eq!(
        targets.iter().filter(|s| **s == ProjectStatus::Done).count(),
        1
    );
}

#[tokio::test]
async fn test_direct_run_claims_pending_project() {
    let h = harness();
    let project = h.project_with_spec().await;

    second_orchestrator(&h).run(project.id).await;

    let finished = h.service.get_project(project.id).await.unwrap();
    assert_eq!(finished.status, ProjectStatus::Done);
    assert!(!finished.is_generating());
    assert!(finished.status.is_terminal());
    assert!(h.project_root(project.id).join("backend/main.py").is_file());
}

#[tokio::test]
async fn test_terminal_states_require_new_spec() {
    let h = harness();
    let project = h.project_with_spec().await;

    let done = h.generate(project.id).await;
    assert_eq!(done.status, ProjectStatus::Done);
    assert!(h.service.start_generation(project.id).await.unwrap_err().is_conflict());

    // A fresh upload moves the project back to PENDING
    let pending = h
        .service
        .attach_spec(project.id, SpecSource::Json(r#"{"features": {}}"#.to_string()))
        .await
        .unwrap();
    assert_eq!(pending.status, ProjectStatus::Pending);

    let again = h.generate(project.id).await;
    assert_eq!(again.status, ProjectStatus::Done);
}

#[tokio::test]
async fn test_start_unknown_project_is_not_found() {
    let h = harness();
    let err = h.service.start_generation(Uuid::new_v4()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_phases_progress_through_generating() {
    let h = harness();
    let project = h.project_with_spec().await;

    h.generate(project.id).await;

    let steps: Vec<Option<String>> = h
        .service
        .status_store()
        .history(project.id)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|r| match r.kind {
            StatusRecordKind::Transition {
                to: ProjectStatus::Generating,
                current_step,
                ..
            } => Some(current_step),
            _ => None,
        })
        .collect();

    assert_eq!(steps.first().cloned().flatten().as_deref(), Some(phase::QUEUED));
    assert!(steps.contains(&Some(phase::PLANNING.to_string())));
    assert!(steps.contains(&Some("Generating backend code".to_string())));
    assert!(steps.contains(&Some("Generating project documentation".to_string())));
    assert!(!steps.contains(&Some("Generating frontend code".to_string())));
    assert_eq!(steps.last().cloned().flatten().as_deref(), Some(phase::FINALIZING));

    let targets = targets(&h, project.id).await;
    assert_eq!(targets.last(), Some(&ProjectStatus::Done));
}

#[tokio::test]
async fn test_invalid_spec_fails_ingestion() {
    let h = harness();
    let project = h
        .service
        .create_project("Shop", "React + FastAPI")
        .await
        .unwrap();

    let err = h
        .service
        .attach_spec(project.id, SpecSource::Json("{not json".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidSpec);

    let failed = h.service.get_project(project.id).await.unwrap();
    assert_eq!(failed.status, ProjectStatus::Failed);
    assert_eq!(failed.error_code, Some(ErrorCode::InvalidSpec));
    assert!(failed
        .current_step
        .unwrap()
        .starts_with("Failed to parse specifications"));

    // A valid upload recovers the project
    let recovered = h
        .service
        .attach_spec(
            project.id,
            SpecSource::Yaml("features:\n  cart:\n    add: Add item\n".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(recovered.status, ProjectStatus::Pending);
    assert_eq!(recovered.error_code, None);
    assert_eq!(
        targets(&h, project.id).await,
        vec![
            ProjectStatus::Parsing,
            ProjectStatus::Failed,
            ProjectStatus::Parsing,
            ProjectStatus::Pending,
        ]
    );
}

#[tokio::test]
async fn test_spec_upload_keeps_absent_facets() {
    let h = harness();
    let project = h
        .service
        .create_project("Shop", "React + FastAPI")
        .await
        .unwrap();

    h.service
        .attach_spec(
            project.id,
            SpecSource::Json(r#"{"features": {"auth": "email"}, "apis": {"GET /a": "A"}}"#.into()),
        )
        .await
        .unwrap();
    h.service
        .attach_spec(project.id, SpecSource::Json(r#"{"apis": {"GET /b": "B"}}"#.into()))
        .await
        .unwrap();

    let spec = h
        .service
        .status_store()
        .load_spec(project.id)
        .await
        .unwrap()
        .unwrap();
    assert!(spec.features.contains_key("auth"));
    assert!(spec.apis.contains_key("GET /b"));
    assert!(!spec.apis.contains_key("GET /a"));
    assert!(spec.database.is_empty());
}

#[tokio::test]
async fn test_abandon_recovers_stuck_run() {
    let h = harness();
    let project = h.project_with_spec().await;

    // A run whose process died: claimed but never finished
    h.service
        .status_store()
        .transition_from(
            project.id,
            ProjectStatus::Pending,
            ProjectStatus::Generating,
            Some(phase::QUEUED.to_string()),
        )
        .await
        .unwrap();

    assert!(h
        .service
        .attach_spec(project.id, SpecSource::Json("{}".into()))
        .await
        .unwrap_err()
        .is_conflict());

    let failed = h.service.abandon(project.id).await.unwrap();
    assert_eq!(failed.status, ProjectStatus::Failed);
    assert_eq!(failed.error_code, Some(ErrorCode::Interrupted));

    let logs = h.logs(project.id).await;
    assert_eq!(logs.last().unwrap().code, Some(ErrorCode::Interrupted));

    // Only a GENERATING project can be abandoned
    assert!(h.service.abandon(project.id).await.unwrap_err().is_conflict());
}
