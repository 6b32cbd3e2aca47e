#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use super::ProjectLifecycleService;
use crate::memory::InMemoryStore;
use crate::types::{
    Job, JobId, OrganizationId, ProjectStatus, Requester, Role, TechnicianId, UserId,
};
use crate::DispatchError;
use chrono::{TimeZone, Utc};

struct Fixture {
    store: InMemoryStore,
    service: ProjectLifecycleService<InMemoryStore>,
    job_id: JobId,
    technician: Requester,
    editor: Requester,
}

async fn fixture(status: ProjectStatus) -> Fixture {
    let store = InMemoryStore::new();
    let tech_user = UserId::generate();
    let tech_id = TechnicianId::generate();
    let editor_user = UserId::generate();

    let mut job = Job::new(
        OrganizationId::generate(),
        "Harbor condo",
        Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap(),
    );
    job.status = status;
    job.assigned_technician = Some(tech_id);
    job.assigned_editor = Some(editor_user);
    let job_id = job.id;
    store.insert_job(job).await;

    Fixture {
        service: ProjectLifecycleService::new(store.clone()),
        store,
        job_id,
        technician: Requester::technician(tech_user, tech_id),
        editor: Requester::new(editor_user, Role::Editor),
    }
}

#[tokio::test]
async fn assigned_technician_advances_booked_to_shooting() {
    let fx = fixture(ProjectStatus::Booked).await;

    let job = fx
        .service
        .update_status(&fx.technician, &fx.job_id, ProjectStatus::Shooting)
        .await
        .unwrap();

    assert_eq!(job.status, ProjectStatus::Shooting);
    assert_eq!(
        fx.store.job(&fx.job_id).await.map(|job| job.status),
        Some(ProjectStatus::Shooting)
    );
}

#[tokio::test]
async fn technician_skipping_to_editing_is_forbidden_but_admin_succeeds() {
    let fx = fixture(ProjectStatus::Booked).await;

    let denied = fx
        .service
        .update_status(&fx.technician, &fx.job_id, ProjectStatus::Editing)
        .await;
    assert!(matches!(denied, Err(DispatchError::Forbidden(_))));
    assert_eq!(
        fx.store.job(&fx.job_id).await.map(|job| job.status),
        Some(ProjectStatus::Booked)
    );

    let admin = Requester::new(UserId::generate(), Role::Admin);
    let job = fx
        .service
        .update_status(&admin, &fx.job_id, ProjectStatus::Editing)
        .await
        .unwrap();
    assert_eq!(job.status, ProjectStatus::Editing);
}

#[tokio::test]
async fn other_technician_is_forbidden() {
    let fx = fixture(ProjectStatus::Booked).await;
    let stranger = Requester::technician(UserId::generate(), TechnicianId::generate());

    let result = fx
        .service
        .update_status(&stranger, &fx.job_id, ProjectStatus::Shooting)
        .await;

    assert!(matches!(result, Err(DispatchError::Forbidden(_))));
}

#[tokio::test]
async fn technician_role_without_technician_profile_is_forbidden() {
    let fx = fixture(ProjectStatus::Booked).await;
    let profileless = Requester::new(UserId::generate(), Role::Technician);

    let result = fx
        .service
        .update_status(&profileless, &fx.job_id, ProjectStatus::Shooting)
        .await;

    assert!(matches!(result, Err(DispatchError::Forbidden(_))));
}

#[tokio::test]
async fn assigned_editor_delivers_and_unassigned_editor_cannot() {
    let fx = fixture(ProjectStatus::Editing).await;
    let other_editor = Requester::new(UserId::generate(), Role::Editor);

    let denied = fx
        .service
        .update_status(&other_editor, &fx.job_id, ProjectStatus::Delivered)
        .await;
    assert!(matches!(denied, Err(DispatchError::Forbidden(_))));

    let job = fx
        .service
        .update_status(&fx.editor, &fx.job_id, ProjectStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(job.status, ProjectStatus::Delivered);
}

#[tokio::test]
async fn agents_and_dispatchers_cannot_change_status() {
    let fx = fixture(ProjectStatus::Booked).await;
    for role in [Role::Agent, Role::Dispatcher] {
        let requester = Requester::new(UserId::generate(), role);
        let result = fx
            .service
            .update_status(&requester, &fx.job_id, ProjectStatus::Shooting)
            .await;
        assert!(matches!(result, Err(DispatchError::Forbidden(_))));
    }
}

#[tokio::test]
async fn missing_job_is_not_found() {
    let fx = fixture(ProjectStatus::Booked).await;
    let admin = Requester::new(UserId::generate(), Role::Admin);

    let result = fx
        .service
        .update_status(&admin, &JobId::generate(), ProjectStatus::Shooting)
        .await;

    assert!(matches!(result, Err(DispatchError::NotFound(_))));
}

#[tokio::test]
async fn direct_cancellation_is_rejected_and_left_to_the_assignment_service() {
    let fx = fixture(ProjectStatus::Booked).await;
    let admin = Requester::new(UserId::generate(), Role::Admin);

    let result = fx
        .service
        .update_status(&admin, &fx.job_id, ProjectStatus::Cancelled)
        .await;

    assert!(matches!(result, Err(DispatchError::Validation(_))));
    assert_eq!(
        fx.store.job(&fx.job_id).await.unwrap().status,
        ProjectStatus::Booked
    );

    let cancelled = fx.service.cancel(&admin, &fx.job_id).await.unwrap();
    assert_eq!(cancelled.status, ProjectStatus::Cancelled);
}
