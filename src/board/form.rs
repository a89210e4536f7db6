use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationDraft, JobId};

/// Raw applicant input as typed into the application form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub resume: String,
    #[serde(default)]
    pub cover_letter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    FullName,
    Email,
    Phone,
    Resume,
}

/// Field level messages, one per failing field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<FormField, &'static str>);

impl FieldErrors {
    pub fn get(&self, field: FormField) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &'static str)> + '_ {
        self.0.iter().map(|(field, message)| (*field, *message))
    }
}

fn email_shape() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"))
}

impl ApplicationForm {
    pub fn errors(&self) -> FieldErrors {
        let mut errors = BTreeMap::new();

        if self.full_name.trim().is_empty() {
            errors.insert(FormField::FullName, "Full name is required");
        }

        if self.email.trim().is_empty() {
            errors.insert(FormField::Email, "Email is required");
        } else if !email_shape().is_match(&self.email) {
            errors.insert(FormField::Email, "Email is invalid");
        }

        if self.phone.trim().is_empty() {
            errors.insert(FormField::Phone, "Phone number is required");
        }

        if self.resume.trim().is_empty() {
            errors.insert(FormField::Resume, "Resume link is required");
        }

        FieldErrors(errors)
    }

    /// Turn the form into a submission for `job_id`, or report every failing field.
    pub fn validate(self, job_id: JobId) -> Result<ApplicationDraft, FieldErrors> {
        let errors = self.errors();
        if !errors.is_empty() {
            return Err(errors);
        }

        let cover_letter = Some(self.cover_letter).filter(|text| !text.trim().is_empty());
        Ok(ApplicationDraft {
            job_id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            resume: self.resume,
            cover_letter,
        })
    }
}
