use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Notify;

use crate::board::catalog::JobCatalog;
use crate::board::domain::{
    ApplicationDraft, ApplicationId, ApplicationStatus, Company, Job, JobApplication, JobId,
    JobType,
};
use crate::board::service::{ApplicationDataService, JobBoardApi, LatencyProfile, ServiceError};
use crate::board::store::{
    ApplicationStore, KeyValueStore, MemoryKeyValueStore, SlotUpdate, StoreError,
};

pub(crate) fn job(id: &str) -> Job {
    Job {
        id: JobId::new(id),
        title: format!("Rust Engineer {id}"),
        company: Company {
            name: "Ferrous Works".to_string(),
            logo: "https://images.example.com/logos/ferrous.png".to_string(),
            location: "Remote".to_string(),
        },
        job_type: JobType::FullTime,
        category: "Software Development".to_string(),
        min_salary: 80_000,
        max_salary: 120_000,
        posted: Utc
            .with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp"),
        description: "Build storage engines.".to_string(),
        requirements: vec!["Rust".to_string(), "Async IO".to_string()],
        responsibilities: vec!["Ship features".to_string()],
    }
}

pub(crate) fn catalog() -> Arc<JobCatalog> {
    Arc::new(JobCatalog::new(vec![job("j1"), job("j2")]).expect("valid catalog"))
}

pub(crate) fn draft(job_id: &str) -> ApplicationDraft {
    ApplicationDraft {
        job_id: JobId::new(job_id),
        full_name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "555-0100".to_string(),
        resume: "http://r".to_string(),
        cover_letter: None,
    }
}

pub(crate) fn stored_application(id: &str, job_id: &str) -> JobApplication {
    JobApplication::from_draft(
        draft(job_id),
        ApplicationId(id.to_string()),
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0)
            .single()
            .expect("valid timestamp"),
    )
}

pub(crate) fn service_with<S: KeyValueStore + 'static>(
    backend: Arc<S>,
) -> ApplicationDataService<S> {
    let store = Arc::new(ApplicationStore::new(backend));
    ApplicationDataService::new(catalog(), store).with_latency(LatencyProfile::none())
}

pub(crate) fn memory_service() -> (
    ApplicationDataService<MemoryKeyValueStore>,
    Arc<MemoryKeyValueStore>,
) {
    let backend = Arc::new(MemoryKeyValueStore::new());
    (service_with(backend.clone()), backend)
}

pub(crate) struct UnavailableKeyValueStore;

impl KeyValueStore for UnavailableKeyValueStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("storage disabled".to_string()))
    }

    fn set(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage disabled".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage disabled".to_string()))
    }

    fn update(&self, _key: &str, _apply: &mut SlotUpdate<'_>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage disabled".to_string()))
    }
}

/// Wraps a real service with switchable failures and gates that hold a
/// request open until the test releases it.
pub(crate) struct ScriptedApi {
    inner: ApplicationDataService<MemoryKeyValueStore>,
    fail_jobs: AtomicBool,
    fail_applications: AtomicBool,
    jobs_gate: Option<Arc<Notify>>,
    applications_gate: Option<Arc<Notify>>,
    job_lookups: AtomicUsize,
}

impl ScriptedApi {
    pub(crate) fn new(inner: ApplicationDataService<MemoryKeyValueStore>) -> Self {
        Self {
            inner,
            fail_jobs: AtomicBool::new(false),
            fail_applications: AtomicBool::new(false),
            jobs_gate: None,
            applications_gate: None,
            job_lookups: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_jobs(self) -> Self {
        self.fail_jobs.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn failing_applications(self) -> Self {
        self.fail_applications.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn gate_jobs(mut self, gate: Arc<Notify>) -> Self {
        self.jobs_gate = Some(gate);
        self
    }

    pub(crate) fn gate_applications(mut self, gate: Arc<Notify>) -> Self {
        self.applications_gate = Some(gate);
        self
    }

    pub(crate) fn store(&self) -> &Arc<ApplicationStore<MemoryKeyValueStore>> {
        self.inner.store()
    }

    pub(crate) fn job_lookups(&self) -> usize {
        self.job_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobBoardApi for ScriptedApi {
    async fn jobs(&self) -> Result<Vec<Job>, ServiceError> {
        if let Some(gate) = &self.jobs_gate {
            gate.notified().await;
        }
        if self.fail_jobs.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable("jobs backend offline".to_string()));
        }
        self.inner.jobs().await
    }

    async fn job(&self, id: &JobId) -> Result<Option<Job>, ServiceError> {
        self.job_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.job(id).await
    }

    async fn applications(&self) -> Result<Vec<JobApplication>, ServiceError> {
        if let Some(gate) = &self.applications_gate {
            gate.notified().await;
        }
        if self.fail_applications.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable(
                "applications backend offline".to_string(),
            ));
        }
        self.inner.applications().await
    }

    async fn submit_application(
        &self,
        draft: ApplicationDraft,
    ) -> Result<JobApplication, ServiceError> {
        self.inner.submit_application(draft).await
    }
}

pub(crate) fn assert_pending_copy_of(application: &JobApplication, draft: &ApplicationDraft) {
    assert!(application.matches_draft(draft), "fields differ: {application:?}");
    assert_eq!(application.status, ApplicationStatus::Pending);
    assert!(!application.id.as_str().is_empty());
}
