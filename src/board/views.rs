//! Presentation-facing projections over jobs and applications.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use super::domain::{Job, JobApplication, JobType};

/// Search box plus the optional type / category / location pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub search: Option<String>,
    pub job_type: Option<JobType>,
    pub category: Option<String>,
    pub location: Option<String>,
}

impl JobFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    /// Search is a case-insensitive substring match on title, company name or category.
    pub fn matches(&self, job: &Job) -> bool {
        if let Some(term) = non_blank(&self.search) {
            let term = term.to_lowercase();
            let hit = [&job.title, &job.company.name, &job.category]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        if let Some(kind) = self.job_type {
            if job.job_type != kind {
                return false;
            }
        }

        if let Some(category) = non_blank(&self.category) {
            if !job.category.eq_ignore_ascii_case(category.trim()) {
                return false;
            }
        }

        if let Some(location) = non_blank(&self.location) {
            let wanted = location.trim().to_lowercase();
            if !job.company.location.to_lowercase().contains(&wanted) {
                return false;
            }
        }

        true
    }

    pub fn apply<'a>(&self, jobs: &'a [Job]) -> Vec<&'a Job> {
        jobs.iter().filter(|job| self.matches(job)).collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|inner| !inner.trim().is_empty())
}

/// An application joined with its posting; `job` is `None` once the posting
/// can no longer be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedJobView {
    pub application: JobApplication,
    pub job: Option<Job>,
}

impl AppliedJobView {
    pub fn job_title(&self) -> &str {
        self.job
            .as_ref()
            .map(|job| job.title.as_str())
            .unwrap_or("Job no longer available")
    }
}

pub fn result_summary(count: usize) -> String {
    let noun = if count == 1 { "job" } else { "jobs" };
    format!("Showing {count} {noun}")
}

/// Whole-dollar amount with thousands separators, e.g. `$120,000`.
pub fn format_currency(amount: u32) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (position, ch) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}")
}

pub fn format_salary_range(job: &Job) -> String {
    format!(
        "{} - {}",
        format_currency(job.min_salary),
        format_currency(job.max_salary)
    )
}

/// Calendar date such as `Jun 15, 2023`.
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

const MINUTES_IN_DAY: i64 = 1_440;
const MINUTES_IN_ALMOST_TWO_DAYS: i64 = 2_520;
const MINUTES_IN_MONTH: i64 = 43_200;

/// "Time ago" label in the date-fns `formatDistanceToNow` style. Counts round
/// to the nearest unit; from a year on the label follows whole calendar months.
/// Future timestamps read as just posted.
pub fn format_from_now(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(at).num_seconds().max(0);
    let minutes = rounded_div(seconds, 60);

    let distance = if minutes == 0 {
        "less than a minute".to_string()
    } else if minutes < 45 {
        count(minutes, "minute")
    } else if minutes < 90 {
        "about 1 hour".to_string()
    } else if minutes < MINUTES_IN_DAY {
        format!("about {}", count(rounded_div(minutes, 60), "hour"))
    } else if minutes < MINUTES_IN_ALMOST_TWO_DAYS {
        "1 day".to_string()
    } else if minutes < MINUTES_IN_MONTH {
        count(rounded_div(minutes, MINUTES_IN_DAY), "day")
    } else if minutes < 2 * MINUTES_IN_MONTH {
        format!("about {}", count(rounded_div(minutes, MINUTES_IN_MONTH), "month"))
    } else {
        let months = calendar_months_between(at, now);
        if months < 12 {
            count(rounded_div(minutes, MINUTES_IN_MONTH), "month")
        } else {
            let years = months / 12;
            match months % 12 {
                0..=2 => format!("about {}", count(years, "year")),
                3..=8 => format!("over {}", count(years, "year")),
                _ => format!("almost {}", count(years + 1, "year")),
            }
        }
    };
    format!("{distance} ago")
}

/// Round half up, for non-negative values.
fn rounded_div(value: i64, unit: i64) -> i64 {
    (value + unit / 2) / unit
}

/// Whole calendar months from `earlier` to `later`.
fn calendar_months_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    let mut months = i64::from(later.year() - earlier.year()) * 12
        + i64::from(later.month())
        - i64::from(earlier.month());
    if (later.day(), later.time()) < (earlier.day(), earlier.time()) {
        months -= 1;
    }
    months
}

fn count(amount: i64, unit: &str) -> String {
    if amount == 1 {
        format!("1 {unit}")
    } else {
        format!("{amount} {unit}s")
    }
}
