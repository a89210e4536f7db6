use super::common::*;
use crate::board::domain::{ApplicationStatus, JobId};
use crate::board::service::{ApplicationDataService, JobBoardApi, LatencyProfile, ServiceError};
use crate::board::store::{ApplicationStore, MemoryKeyValueStore, StoreError};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn lists_jobs_in_catalog_order() {
    let (service, _) = memory_service();
    let jobs = service.jobs().await.expect("jobs listed");
    let ids: Vec<&str> = jobs.iter().map(|job| job.id.as_str()).collect();
    assert_eq!(ids, vec!["j1", "j2"]);
}

#[tokio::test]
async fn every_listed_job_resolves_by_id() {
    let (service, _) = memory_service();
    for job in service.jobs().await.expect("jobs listed") {
        let found = service.job(&job.id).await.expect("lookup succeeds");
        assert_eq!(found.as_ref(), Some(&job));
    }
    assert_eq!(
        service
            .job(&JobId::new("nonexistent"))
            .await
            .expect("lookup succeeds"),
        None
    );
}

#[tokio::test]
async fn submit_fills_generated_fields() {
    let (service, _) = memory_service();
    let mut seen = HashSet::new();

    for _ in 0..5 {
        let before = Utc::now();
        let input = draft("j1");
        let application = service
            .submit_application(input.clone())
            .await
            .expect("submission stored");

        assert_pending_copy_of(&application, &input);
        assert!(application.applied_at >= before);
        assert!(seen.insert(application.id.clone()), "duplicate id {}", application.id);
    }

    let stored = service.applications().await.expect("applications listed");
    assert_eq!(stored.len(), 5);
}

#[tokio::test]
async fn new_ids_stay_ahead_of_stored_ids() {
    let backend = Arc::new(MemoryKeyValueStore::new());
    let ahead = Utc::now().timestamp_millis() + 60 * 60 * 1000;
    let seeded = ApplicationStore::new(backend.clone());
    seeded
        .append(stored_application(&ahead.to_string(), "j1"))
        .await
        .expect("seed append");

    let service = service_with(backend);
    let application = service
        .submit_application(draft("j2"))
        .await
        .expect("no id conflict");

    let issued: i64 = application.id.as_str().parse().expect("numeric id");
    assert!(issued > ahead, "{issued} should follow {ahead}");
    assert_eq!(service.applications().await.expect("listed").len(), 2);
}

#[tokio::test]
async fn submit_keeps_optional_cover_letter() {
    let (service, _) = memory_service();
    let mut input = draft("j2");
    input.cover_letter = Some("I build analytical engines.".to_string());

    let application = service
        .submit_application(input.clone())
        .await
        .expect("submission stored");
    assert_eq!(application.cover_letter, input.cover_letter);
}

#[tokio::test]
async fn submit_accepts_unknown_job_ids() {
    let (service, _) = memory_service();
    let application = service
        .submit_application(draft("retired-posting"))
        .await
        .expect("no referential check on submit");
    assert_eq!(application.job_id, JobId::new("retired-posting"));
}

#[tokio::test]
async fn submit_surfaces_write_faults() {
    let service = service_with(Arc::new(MemoryKeyValueStore::with_quota(0)));

    match service.submit_application(draft("j1")).await {
        Err(ServiceError::Persistence(StoreError::QuotaExceeded { .. })) => {}
        other => panic!("expected quota fault, got {other:?}"),
    }
    assert!(service
        .applications()
        .await
        .expect("reads still succeed")
        .is_empty());
}

#[tokio::test]
async fn applications_read_as_empty_when_storage_is_down() {
    let service = service_with(Arc::new(UnavailableKeyValueStore));
    let applications = service.applications().await.expect("read faults are absorbed");
    assert!(applications.is_empty());
}

#[tokio::test]
async fn slow_operations_time_out() {
    let store = Arc::new(ApplicationStore::new(Arc::new(MemoryKeyValueStore::new())));
    let latency = LatencyProfile {
        list_jobs: Duration::from_secs(30),
        ..LatencyProfile::none()
    };
    let service = ApplicationDataService::new(catalog(), store)
        .with_latency(latency)
        .with_request_timeout(Some(Duration::from_millis(20)));

    match service.jobs().await {
        Err(ServiceError::TimedOut { operation, after }) => {
            assert_eq!(operation, "list jobs");
            assert_eq!(after, Duration::from_millis(20));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(service.job(&JobId::new("j1")).await.expect("lookup").is_some());
}

#[tokio::test]
async fn racing_submissions_are_all_persisted() {
    let store = Arc::new(ApplicationStore::new(Arc::new(MemoryKeyValueStore::new())));
    let latency = LatencyProfile {
        submit_application: Duration::from_millis(5),
        ..LatencyProfile::none()
    };
    let service = ApplicationDataService::new(catalog(), store).with_latency(latency);

    let (first, second, third) = tokio::join!(
        service.submit_application(draft("j1")),
        service.submit_application(draft("j2")),
        service.submit_application(draft("j1")),
    );
    let submitted = [
        first.expect("first stored"),
        second.expect("second stored"),
        third.expect("third stored"),
    ];

    let stored = service.applications().await.expect("applications listed");
    assert_eq!(stored.len(), 3);
    for application in &submitted {
        assert!(stored.contains(application));
        assert_eq!(application.status, ApplicationStatus::Pending);
    }
}

#[tokio::test]
async fn lovelace_scenario() {
    let (service, _) = memory_service();
    let original = service
        .job(&JobId::new("j1"))
        .await
        .expect("lookup")
        .expect("j1 exists");
    assert_eq!(original.min_salary, 80_000);
    assert_eq!(original.max_salary, 120_000);

    let application = service
        .submit_application(draft("j1"))
        .await
        .expect("submission stored");
    assert_eq!(application.status, ApplicationStatus::Pending);
    assert_eq!(application.status.label(), "Pending");
    assert!(!application.id.as_str().is_empty());

    let stored = service.applications().await.expect("applications listed");
    assert!(stored.contains(&application));

    let after = service
        .job(&JobId::new("j1"))
        .await
        .expect("lookup")
        .expect("j1 still exists");
    assert_eq!(after, original);
}
