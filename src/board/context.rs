//! Shared board state handed to presentation code.
//!
//! [`BoardContext`] is a cheap cloneable handle. Every clone observes the same
//! [`BoardState`] and callers either poll [`BoardContext::snapshot`] or hold a
//! receiver from [`BoardContext::subscribe`] to be woken on each change.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::domain::{ApplicationDraft, Job, JobApplication, JobId};
use super::service::{JobBoardApi, ServiceError};
use super::views::{AppliedJobView, JobFilter};

/// Message shown when the job listing cannot be loaded.
pub const JOBS_FETCH_ERROR: &str = "Failed to fetch jobs. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardState {
    pub jobs: Vec<Job>,
    pub applications: Vec<JobApplication>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            jobs: Vec::new(),
            applications: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

struct ContextInner<A> {
    api: Arc<A>,
    state: watch::Sender<BoardState>,
    disposed: AtomicBool,
}

pub struct BoardContext<A> {
    inner: Arc<ContextInner<A>>,
}

impl<A> Clone for BoardContext<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> BoardContext<A>
where
    A: JobBoardApi + 'static,
{
    pub fn new(api: Arc<A>) -> Self {
        let (state, _) = watch::channel(BoardState::default());
        Self {
            inner: Arc::new(ContextInner {
                api,
                state,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.inner.api
    }

    pub fn snapshot(&self) -> BoardState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.inner.state.subscribe()
    }

    /// Load jobs and applications concurrently.
    ///
    /// `loading` clears as soon as the jobs request settles; the applications
    /// request does not hold it up. A jobs failure is surfaced through `error`,
    /// an applications failure is only logged.
    pub async fn initialize(&self) {
        self.update(|state| state.loading = true);
        tokio::join!(self.fetch_jobs(), self.fetch_applications());
    }

    /// Run [`BoardContext::initialize`] on the runtime and hand back a handle
    /// that can cancel it.
    pub fn spawn_initialize(&self) -> FetchHandle {
        let context = self.clone();
        FetchHandle {
            task: tokio::spawn(async move { context.initialize().await }),
        }
    }

    /// Submit an application, then reload the stored applications so the
    /// state reflects what was just written.
    pub async fn submit(&self, draft: ApplicationDraft) -> Result<JobApplication, ServiceError> {
        let application = self.inner.api.submit_application(draft).await?;
        self.fetch_applications().await;
        Ok(application)
    }

    pub async fn refresh(&self) {
        self.fetch_applications().await;
    }

    /// Stop applying results. Requests still in flight complete but their
    /// outcome is dropped.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::AcqRel) {
            debug!("board context disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn filtered_jobs(&self, filter: &JobFilter) -> Vec<Job> {
        let state = self.inner.state.borrow();
        filter.apply(&state.jobs).into_iter().cloned().collect()
    }

    /// Pair every known application with its posting, looking each distinct
    /// job up once.
    pub async fn applied_jobs(&self) -> Vec<AppliedJobView> {
        let applications = self.inner.state.borrow().applications.clone();
        let mut resolved: HashMap<JobId, Option<Job>> = HashMap::new();

        for application in &applications {
            if resolved.contains_key(&application.job_id) {
                continue;
            }
            let job = match self.inner.api.job(&application.job_id).await {
                Ok(job) => job,
                Err(err) => {
                    warn!(job_id = %application.job_id, error = %err, "failed to fetch job");
                    None
                }
            };
            resolved.insert(application.job_id.clone(), job);
        }

        applications
            .into_iter()
            .map(|application| {
                let job = resolved.get(&application.job_id).cloned().flatten();
                AppliedJobView { application, job }
            })
            .collect()
    }

    async fn fetch_jobs(&self) {
        match self.inner.api.jobs().await {
            Ok(jobs) => {
                self.update(|state| {
                    state.jobs = jobs;
                    state.error = None;
                    state.loading = false;
                });
            }
            Err(err) => {
                error!(error = %err, "error fetching jobs");
                self.update(|state| {
                    state.jobs.clear();
                    state.error = Some(JOBS_FETCH_ERROR.to_string());
                    state.loading = false;
                });
            }
        }
    }

    async fn fetch_applications(&self) {
        match self.inner.api.applications().await {
            Ok(applications) => {
                self.update(|state| state.applications = applications);
            }
            Err(err) => warn!(error = %err, "error fetching applications"),
        }
    }

    fn update(&self, mutate: impl FnOnce(&mut BoardState)) {
        if self.is_disposed() {
            debug!("discarding result for disposed board context");
            return;
        }
        self.inner.state.send_modify(mutate);
    }
}

/// Background fetch started by [`BoardContext::spawn_initialize`].
#[derive(Debug)]
pub struct FetchHandle {
    task: JoinHandle<()>,
}

impl FetchHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Wait for the fetch. Returns `false` when it was cancelled first.
    pub async fn join(self) -> bool {
        match self.task.await {
            Ok(()) => true,
            Err(err) if err.is_cancelled() => false,
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        }
    }
}
