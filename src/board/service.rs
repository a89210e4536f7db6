use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use super::catalog::JobCatalog;
use super::domain::{ApplicationDraft, ApplicationId, Job, JobApplication, JobId};
use super::store::{ApplicationStore, KeyValueStore, StoreError};
use crate::config::ApiConfig;

/// Asynchronous read/write surface consumed by the board context.
///
/// Absence is reported as `Ok(None)`; `Err` is reserved for faults.
#[async_trait]
pub trait JobBoardApi: Send + Sync {
    async fn jobs(&self) -> Result<Vec<Job>, ServiceError>;
    async fn job(&self, id: &JobId) -> Result<Option<Job>, ServiceError>;
    async fn applications(&self) -> Result<Vec<JobApplication>, ServiceError>;
    async fn submit_application(
        &self,
        draft: ApplicationDraft,
    ) -> Result<JobApplication, ServiceError>;
}

/// Error raised by board API implementations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    TimedOut {
        operation: &'static str,
        after: Duration,
    },
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListJobs,
    GetJob,
    ListApplications,
    SubmitApplication,
}

impl Operation {
    pub const fn name(self) -> &'static str {
        match self {
            Operation::ListJobs => "list jobs",
            Operation::GetJob => "get job",
            Operation::ListApplications => "list applications",
            Operation::SubmitApplication => "submit application",
        }
    }
}

/// Artificial per-operation delay emulating a remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProfile {
    pub list_jobs: Duration,
    pub get_job: Duration,
    pub list_applications: Duration,
    pub submit_application: Duration,
}

impl LatencyProfile {
    pub const fn standard() -> Self {
        Self {
            list_jobs: Duration::from_millis(500),
            get_job: Duration::from_millis(300),
            list_applications: Duration::from_millis(300),
            submit_application: Duration::from_millis(700),
        }
    }

    pub const fn none() -> Self {
        Self {
            list_jobs: Duration::ZERO,
            get_job: Duration::ZERO,
            list_applications: Duration::ZERO,
            submit_application: Duration::ZERO,
        }
    }

    pub const fn delay_for(&self, operation: Operation) -> Duration {
        match operation {
            Operation::ListJobs => self.list_jobs,
            Operation::GetJob => self.get_job,
            Operation::ListApplications => self.list_applications,
            Operation::SubmitApplication => self.submit_application,
        }
    }
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self::standard()
    }
}

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

static LAST_APPLICATION_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Millisecond timestamp ids, bumped forward when two submissions share a tick.
fn next_application_id(now_millis: i64) -> ApplicationId {
    let mut current = LAST_APPLICATION_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = now_millis.max(current + 1);
        match LAST_APPLICATION_MILLIS.compare_exchange_weak(
            current,
            next,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return ApplicationId(next.to_string()),
            Err(observed) => current = observed,
        }
    }
}

/// Keep freshly stamped ids ahead of every numeric id already persisted, so a
/// clock that ran backwards between sessions cannot reissue one.
fn reserve_stored_ids(applications: &[JobApplication]) {
    let newest = applications
        .iter()
        .filter_map(|application| application.id.as_str().parse::<i64>().ok())
        .max();
    if let Some(newest) = newest {
        LAST_APPLICATION_MILLIS.fetch_max(newest, Ordering::AcqRel);
    }
}

/// Mock backend composing the job catalog and the application store.
pub struct ApplicationDataService<S> {
    catalog: Arc<JobCatalog>,
    store: Arc<ApplicationStore<S>>,
    latency: LatencyProfile,
    request_timeout: Option<Duration>,
}

impl<S> ApplicationDataService<S>
where
    S: KeyValueStore + 'static,
{
    pub fn new(catalog: Arc<JobCatalog>, store: Arc<ApplicationStore<S>>) -> Self {
        reserve_stored_ids(&store.load_all());
        Self {
            catalog,
            store,
            latency: LatencyProfile::standard(),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    pub fn from_config(
        catalog: Arc<JobCatalog>,
        store: Arc<ApplicationStore<S>>,
        config: &ApiConfig,
    ) -> Self {
        let latency = if config.simulate_latency {
            LatencyProfile::standard()
        } else {
            LatencyProfile::none()
        };

        Self::new(catalog, store)
            .with_latency(latency)
            .with_request_timeout(config.request_timeout)
    }

    pub fn with_latency(mut self, latency: LatencyProfile) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Option<Duration>) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn store(&self) -> &Arc<ApplicationStore<S>> {
        &self.store
    }

    async fn call<T, F>(&self, operation: Operation, work: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>> + Send,
    {
        let delay = self.latency.delay_for(operation);
        let delayed = async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            work.await
        };

        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, delayed)
                .await
                .map_err(|_| ServiceError::TimedOut {
                    operation: operation.name(),
                    after: limit,
                })?,
            None => delayed.await,
        }
    }
}

#[async_trait]
impl<S> JobBoardApi for ApplicationDataService<S>
where
    S: KeyValueStore + 'static,
{
    async fn jobs(&self) -> Result<Vec<Job>, ServiceError> {
        self.call(Operation::ListJobs, async {
            let jobs = self.catalog.list().to_vec();
            debug!(count = jobs.len(), "jobs listed");
            Ok(jobs)
        })
        .await
    }

    async fn job(&self, id: &JobId) -> Result<Option<Job>, ServiceError> {
        self.call(Operation::GetJob, async {
            let job = self.catalog.get(id).cloned();
            if job.is_none() {
                debug!(job_id = %id, "job not found");
            }
            Ok(job)
        })
        .await
    }

    async fn applications(&self) -> Result<Vec<JobApplication>, ServiceError> {
        self.call(Operation::ListApplications, async {
            Ok(self.store.load_all())
        })
        .await
    }

    async fn submit_application(
        &self,
        draft: ApplicationDraft,
    ) -> Result<JobApplication, ServiceError> {
        self.call(Operation::SubmitApplication, async move {
            let applied_at = Utc::now();
            let id = next_application_id(applied_at.timestamp_millis());
            let application = JobApplication::from_draft(draft, id, applied_at);
            let stored = self.store.append(application).await?;
            info!(
                application_id = %stored.id,
                job_id = %stored.job_id,
                "application submitted"
            );
            Ok::<_, ServiceError>(stored)
        })
        .await
    }
}
