// End-to-end dispatch flow against the in-memory adapters:
// rank -> assign -> external edit -> conflict -> acknowledge -> disconnect -> reconnect.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use dispatch::calendar_sync::SyncOutcome;
use dispatch::memory::{InMemoryCalendarProvider, InMemoryStore, ProviderOperation};
use dispatch::provider::{BusyInterval, GrantExchange, ProviderCalendar};
use dispatch::ranking::recommended;
use dispatch::{
    AvailabilityPolicy, AvailabilityResolver, CalendarIntegration, CalendarWebhook, ChangeType,
    ExternalCalendarId, GeoPoint, GrantId, IntegrationId, IntegrationStatus, Job,
    JobAssignmentService, MediaType, OrganizationId, ProjectLifecycleService, ProjectStatus,
    RankingConfig, RankingEngine, ReconcileOutcome, Requester, Role, SyncPolicy, SyncStatus,
    Technician, UserId,
};

fn monday(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap()
}

fn integration(tech: &Technician, grant: &str) -> CalendarIntegration {
    CalendarIntegration {
        id: IntegrationId::generate(),
        technician_id: tech.id,
        grant_id: GrantId::new(grant),
        calendar_id: ExternalCalendarId::new("primary"),
        account_email: format!("{}@example.test", tech.display_name),
        status: IntegrationStatus::Active,
        is_write_target: true,
        connected_at: monday(0, 0),
    }
}

fn technician(name: &str, rating: u8) -> Technician {
    let mut tech = Technician::new(UserId::generate(), name);
    tech.home = Some(GeoPoint::new(41.8781, -87.6298));
    tech.reliability.on_time_rate = 0.9;
    tech.skills.insert(MediaType::new("photo"), rating);
    tech
}

#[tokio::test]
async fn busy_favourite_is_skipped_and_the_assignment_survives_an_external_edit() {
    let store = InMemoryStore::new();
    let provider = InMemoryCalendarProvider::new();
    let org = OrganizationId::generate();

    let favourite = technician("fay", 5);
    let backup = technician("bea", 3);
    let fay_integration = integration(&favourite, "grant-fay");
    let bea_integration = integration(&backup, "grant-bea");
    store.insert_integration(fay_integration).await;
    store.insert_integration(bea_integration.clone()).await;
    store.insert_technician(favourite.clone()).await;
    store.insert_technician(backup.clone()).await;
    provider
        .set_busy(
            "fay@example.test",
            vec![BusyInterval::new(monday(13, 30), monday(14, 30))],
        )
        .await;

    let mut job = Job::new(org, "Lakeshore penthouse", monday(14, 0));
    job.location = Some(GeoPoint::new(41.88, -87.63));
    job.required_media = vec![MediaType::new("photo")];
    let job_id = job.id;
    store.insert_job(job.clone()).await;

    // Rank: fay is the better fit on paper but busy.
    let engine = RankingEngine::new(
        AvailabilityResolver::new(store.clone(), provider.clone(), AvailabilityPolicy::default()),
        RankingConfig::default(),
    );
    let ranked = engine
        .rank(&job, &[favourite.clone(), backup.clone()])
        .await
        .unwrap();
    assert_eq!(ranked.len(), 2);
    let pick = recommended(&ranked).unwrap();
    assert_eq!(pick.technician.id, backup.id);

    // Assign the recommendation; the event lands on bea's calendar.
    let service = JobAssignmentService::new(store.clone(), provider.clone(), SyncPolicy::default());
    let dispatcher = Requester::new(UserId::generate(), Role::Dispatcher);
    let outcome = service
        .assign_technician(&dispatcher, &job_id, &pick.technician.id)
        .await
        .unwrap();
    assert_eq!(outcome.job.status, ProjectStatus::Booked);
    let Some(SyncOutcome::Created { external_event_id }) = outcome.sync.clone() else {
        panic!("expected a created event, got {:?}", outcome.sync);
    };

    // Someone drags the event 5 minutes later in the external calendar.
    provider
        .move_event(
            &bea_integration.grant_id,
            &external_event_id,
            monday(14, 5),
            monday(15, 5),
        )
        .await;
    let reconcile = service
        .orchestrator()
        .reconcile(&CalendarWebhook {
            external_event_id: external_event_id.clone(),
            grant_id: bea_integration.grant_id.clone(),
            change_type: ChangeType::Updated,
        })
        .await
        .unwrap();
    let note = reconcile.conflict_note().unwrap().to_string();
    assert!(matches!(reconcile, ReconcileOutcome::ConflictFlagged { .. }));
    assert!(note.contains("2025-06-02T14:05:00+00:00"));

    let flagged = store.job(&job_id).await.unwrap();
    assert!(flagged.calendar_conflict);
    assert_eq!(flagged.scheduled_start, monday(14, 0));
    let notifications = store.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].recipient, backup.user_id);

    // A human resolves it by rescheduling and acknowledging.
    service
        .reschedule(&dispatcher, &job_id, monday(14, 5), Some(monday(15, 5)))
        .await
        .unwrap();
    let cleared = service
        .acknowledge_conflict(&dispatcher, &job_id)
        .await
        .unwrap();
    assert!(!cleared.job.calendar_conflict);
    assert_eq!(provider.call_count(ProviderOperation::Update).await, 1);

    // The assigned technician starts the shoot.
    let lifecycle = ProjectLifecycleService::new(store.clone());
    let shooting = lifecycle
        .update_status(
            &Requester::technician(backup.user_id, backup.id),
            &job_id,
            ProjectStatus::Shooting,
        )
        .await
        .unwrap();
    assert_eq!(shooting.status, ProjectStatus::Shooting);
}

#[tokio::test]
async fn disconnect_then_reconnect_recreates_the_event() {
    let store = InMemoryStore::new();
    let provider = InMemoryCalendarProvider::new();
    let tech = technician("rue", 4);
    let original = integration(&tech, "grant-rue-1");
    store.insert_integration(original.clone()).await;
    store.insert_technician(tech.clone()).await;

    let job = Job::new(OrganizationId::generate(), "Garden flat", monday(9, 0));
    let job_id = job.id;
    store.insert_job(job).await;

    let service = JobAssignmentService::new(store.clone(), provider.clone(), SyncPolicy::default());
    let manager = Requester::new(UserId::generate(), Role::ProjectManager);
    service
        .assign_technician(&manager, &job_id, &tech.id)
        .await
        .unwrap();

    let orchestrator = service.orchestrator();
    for _ in 0..2 {
        orchestrator.disconnect_integration(&original.id).await.unwrap();
        let event = store.event(&job_id).await.unwrap();
        assert_eq!(event.sync_status, SyncStatus::Pending);
        assert!(event.external_event_id.is_none());
    }

    // While disconnected a reschedule has nowhere to go.
    let moved = service
        .reschedule(&manager, &job_id, monday(10, 0), None)
        .await
        .unwrap();
    assert_eq!(
        moved.sync,
        Some(SyncOutcome::skipped(dispatch::calendar_sync::SkipReason::NoWriteTarget))
    );

    let new_grant = GrantId::new("grant-rue-2");
    provider
        .register_code(
            "code-2",
            GrantExchange {
                grant_id: new_grant.clone(),
                email: "rue@example.test".to_string(),
            },
        )
        .await;
    provider
        .add_calendar(
            new_grant.clone(),
            ProviderCalendar {
                id: ExternalCalendarId::new("rue-main"),
                name: "Rue".to_string(),
                is_primary: true,
                read_only: false,
            },
        )
        .await;

    let connected = orchestrator
        .connect_integration(&tech.id, "code-2")
        .await
        .unwrap();

    assert_eq!(connected.resynced.len(), 1);
    let event = store.event(&job_id).await.unwrap();
    assert_eq!(event.sync_status, SyncStatus::Synced);
    assert_eq!(event.grant_id, Some(new_grant.clone()));
    let remote = provider
        .event(&new_grant, event.external_event_id.as_ref().unwrap())
        .await
        .unwrap();
    assert_eq!(remote.start, monday(10, 0));
    assert_eq!(remote.end, monday(10, 0) + Duration::hours(1));
}
