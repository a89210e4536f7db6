//! Job catalog, application storage, the mock data service and the shared
//! board state built on top of them.

pub mod catalog;
pub mod context;
pub mod domain;
pub mod form;
pub mod service;
pub mod store;
pub mod views;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, JobCatalog};
pub use context::{BoardContext, BoardState, FetchHandle, JOBS_FETCH_ERROR};
pub use domain::{
    ApplicationDraft, ApplicationId, ApplicationStatus, Company, Job, JobApplication, JobId,
    JobType,
};
pub use form::{ApplicationForm, FieldErrors, FormField};
pub use service::{
    ApplicationDataService, JobBoardApi, LatencyProfile, Operation, ServiceError,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use store::{
    ApplicationStore, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, SlotUpdate,
    StoreError, APPLICATIONS_KEY,
};
pub use views::{AppliedJobView, JobFilter};
