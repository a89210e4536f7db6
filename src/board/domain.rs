use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for catalog postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Employment arrangement advertised by a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
    Contract,
    Internship,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::FullTime,
        JobType::PartTime,
        JobType::Contract,
        JobType::Internship,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            JobType::FullTime => "Full-time",
            JobType::PartTime => "Part-time",
            JobType::Contract => "Contract",
            JobType::Internship => "Internship",
        }
    }

    /// Case-insensitive parse of the display label.
    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub logo: String,
    pub location: String,
}

/// Immutable posting owned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub company: Company,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub category: String,
    pub min_salary: u32,
    pub max_salary: u32,
    pub posted: DateTime<Utc>,
    pub description: String,
    pub requirements: Vec<String>,
    pub responsibilities: Vec<String>,
}

/// Review state of a submitted application.
///
/// Submissions always start as [`ApplicationStatus::Pending`]; later states are
/// assigned by reviewers outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Reviewed => "Reviewed",
            ApplicationStatus::Accepted => "Accepted",
            ApplicationStatus::Rejected => "Rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected
        )
    }

    /// Whether an external reviewer may move an application from `self` to `next`.
    pub const fn can_transition_to(self, next: ApplicationStatus) -> bool {
        matches!(
            (self, next),
            (
                ApplicationStatus::Pending,
                ApplicationStatus::Reviewed
                    | ApplicationStatus::Accepted
                    | ApplicationStatus::Rejected
            ) | (
                ApplicationStatus::Reviewed,
                ApplicationStatus::Accepted | ApplicationStatus::Rejected
            )
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Applicant supplied fields; the service fills in id, status and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDraft {
    pub job_id: JobId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub resume: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
}

/// Persisted application record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub resume: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

impl JobApplication {
    pub fn from_draft(
        draft: ApplicationDraft,
        id: ApplicationId,
        applied_at: DateTime<Utc>,
    ) -> Self {
        let ApplicationDraft {
            job_id,
            full_name,
            email,
            phone,
            resume,
            cover_letter,
        } = draft;

        Self {
            id,
            job_id,
            full_name,
            email,
            phone,
            resume,
            cover_letter,
            status: ApplicationStatus::Pending,
            applied_at,
        }
    }

    /// Whether this record carries exactly the applicant fields of `draft`.
    pub fn matches_draft(&self, draft: &ApplicationDraft) -> bool {
        self.job_id == draft.job_id
            && self.full_name == draft.full_name
            && self.email == draft.email
            && self.phone == draft.phone
            && self.resume == draft.resume
            && self.cover_letter == draft.cover_letter
    }
}
