use std::collections::{HashMap, HashSet};

use super::domain::{Job, JobId};

const SEED_JOBS: &str = include_str!("seed/jobs.json");

/// Read-only collection of postings, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct JobCatalog {
    jobs: Vec<Job>,
    index: HashMap<JobId, usize>,
}

impl JobCatalog {
    /// Build a catalog from caller-provided postings, checking each record.
    pub fn new(jobs: Vec<Job>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(jobs.len());
        for (position, job) in jobs.iter().enumerate() {
            validate(job)?;
            if index.insert(job.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateId(job.id.clone()));
            }
        }

        Ok(Self { jobs, index })
    }

    /// The sample postings shipped with the crate.
    pub fn seeded() -> Result<Self, CatalogError> {
        let jobs: Vec<Job> = serde_json::from_str(SEED_JOBS)?;
        Self::new(jobs)
    }

    pub fn list(&self) -> &[Job] {
        &self.jobs
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.index.get(id).map(|&position| &self.jobs[position])
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        distinct(self.jobs.iter().map(|job| job.category.as_str()))
    }

    /// Distinct company locations in first-seen order.
    pub fn locations(&self) -> Vec<&str> {
        distinct(self.jobs.iter().map(|job| job.company.location.as_str()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|value| seen.insert(*value)).collect()
}

fn validate(job: &Job) -> Result<(), CatalogError> {
    if job.id.as_str().trim().is_empty() {
        return Err(CatalogError::MissingId);
    }
    if job.min_salary > job.max_salary {
        return Err(CatalogError::SalaryRange {
            id: job.id.clone(),
            min: job.min_salary,
            max: job.max_salary,
        });
    }
    let blank_entry = job
        .requirements
        .iter()
        .chain(job.responsibilities.iter())
        .any(|entry| entry.trim().is_empty());
    if blank_entry {
        return Err(CatalogError::BlankEntry(job.id.clone()));
    }
    Ok(())
}

/// Reasons a set of postings cannot form a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("job is missing an id")]
    MissingId,
    #[error("duplicate job id {0}")]
    DuplicateId(JobId),
    #[error("job {id} has minimum salary {min} above maximum {max}")]
    SalaryRange { id: JobId, min: u32, max: u32 },
    #[error("job {0} lists an empty requirement or responsibility")]
    BlankEntry(JobId),
    #[error("seed data is malformed: {0}")]
    Seed(#[from] serde_json::Error),
}
