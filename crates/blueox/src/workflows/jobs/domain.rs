use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Employer shown when a posting does not name one.
pub const DEFAULT_EMPLOYER: &str = "Blue Ox Partner";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Open position as stored in the `jobs` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub country: String,
    pub job_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub salary_range: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobPosting {
    pub fn employer(&self) -> &str {
        self.company
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_EMPLOYER)
    }

    /// Lowercased title, description, and requirements used for keyword search.
    pub fn searchable_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.description,
            self.requirements.as_deref().unwrap_or_default()
        )
        .to_lowercase()
    }
}

/// Editable posting fields submitted from the review console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JobId>,
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub country: String,
    pub job_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl JobDraft {
    pub fn into_posting(self, id: JobId, created_at: DateTime<Utc>) -> JobPosting {
        JobPosting {
            id,
            title: self.title,
            company: self.company,
            location: self.location,
            country: self.country,
            job_type: self.job_type,
            description: self.description,
            requirements: self.requirements,
            salary_range: self.salary_range,
            is_active: self.is_active,
            created_at,
            updated_at: None,
        }
    }

    pub fn apply_to(self, posting: &mut JobPosting, updated_at: DateTime<Utc>) {
        posting.title = self.title;
        posting.company = self.company;
        posting.location = self.location;
        posting.country = self.country;
        posting.job_type = self.job_type;
        posting.description = self.description;
        posting.requirements = self.requirements;
        posting.salary_range = self.salary_range;
        posting.is_active = self.is_active;
        posting.updated_at = Some(updated_at);
    }
}
