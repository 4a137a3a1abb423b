use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::JobPosting;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryBasis {
    Hourly,
    Monthly,
}

impl SalaryBasis {
    fn marker(self) -> &'static str {
        match self {
            SalaryBasis::Hourly => "/hour",
            SalaryBasis::Monthly => "/month",
        }
    }
}

/// Public board filters. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobBoardFilter {
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub salary_basis: Option<SalaryBasis>,
}

impl JobBoardFilter {
    pub fn matches(&self, posting: &JobPosting) -> bool {
        self.matches_query(posting)
            && exact_or_unset(self.country.as_deref(), &posting.country)
            && exact_or_unset(self.job_type.as_deref(), &posting.job_type)
            && self.matches_salary(posting)
    }

    fn matches_query(&self, posting: &JobPosting) -> bool {
        let Some(query) = non_blank(self.query.as_deref()) else {
            return true;
        };
        let needle = query.to_lowercase();
        [
            Some(posting.title.as_str()),
            posting.location.as_deref(),
            Some(posting.country.as_str()),
            Some(posting.description.as_str()),
            posting.company.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|haystack| haystack.to_lowercase().contains(&needle))
    }

    fn matches_salary(&self, posting: &JobPosting) -> bool {
        match self.salary_basis {
            None => true,
            Some(basis) => posting
                .salary_range
                .as_deref()
                .map(|salary| salary.to_lowercase().contains(basis.marker()))
                .unwrap_or(false),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn exact_or_unset(wanted: Option<&str>, actual: &str) -> bool {
    match non_blank(wanted) {
        Some(wanted) => wanted == actual,
        None => true,
    }
}

/// Distinct filter values present on the board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobBoardFacets {
    pub countries: Vec<String>,
    pub job_types: Vec<String>,
}

/// Active postings as shown on the public jobs page.
#[derive(Debug, Clone, Default)]
pub struct JobBoard {
    postings: Vec<JobPosting>,
}

impl JobBoard {
    pub fn new(postings: Vec<JobPosting>) -> Self {
        let mut postings: Vec<_> = postings
            .into_iter()
            .filter(|posting| posting.is_active)
            .collect();
        postings.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Self { postings }
    }

    pub fn postings(&self) -> &[JobPosting] {
        &self.postings
    }

    pub fn filter(&self, filter: &JobBoardFilter) -> Vec<JobPosting> {
        self.postings
            .iter()
            .filter(|posting| filter.matches(posting))
            .cloned()
            .collect()
    }

    pub fn facets(&self) -> JobBoardFacets {
        let countries: BTreeSet<_> = self
            .postings
            .iter()
            .map(|posting| posting.country.trim())
            .filter(|country| !country.is_empty())
            .map(str::to_string)
            .collect();
        let job_types: BTreeSet<_> = self
            .postings
            .iter()
            .map(|posting| posting.job_type.trim())
            .filter(|job_type| !job_type.is_empty())
            .map(str::to_string)
            .collect();

        JobBoardFacets {
            countries: countries.into_iter().collect(),
            job_types: job_types.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::jobs::domain::JobId;
    use chrono::{TimeZone, Utc};

    fn posting(id: &str, title: &str, country: &str, salary: &str, day: u32) -> JobPosting {
        JobPosting {
            id: JobId(id.to_string()),
            title: title.to_string(),
            company: Some("Van Dijk Bouw".to_string()),
            location: Some("Rotterdam".to_string()),
            country: country.to_string(),
            job_type: "Full-time".to_string(),
            description: "Site work".to_string(),
            requirements: None,
            salary_range: Some(salary.to_string()),
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    fn board() -> JobBoard {
        let mut inactive = posting("job-4", "Archived role", "Netherlands", "€9/hour", 4);
        inactive.is_active = false;
        JobBoard::new(vec![
            posting("job-1", "Electrician", "Netherlands", "€2,400/month", 1),
            posting("job-2", "Welder", "Poland", "€8/hour", 3),
            posting("job-3", "Warehouse picker", "Czech Republic", "€7.5/Hour", 2),
            inactive,
        ])
    }

    #[test]
    fn board_hides_inactive_and_sorts_newest_first() {
        let ids: Vec<_> = board()
            .postings()
            .iter()
            .map(|posting| posting.id.0.clone())
            .collect();
        assert_eq!(ids, vec!["job-2", "job-3", "job-1"]);
    }

    #[test]
    fn query_is_case_insensitive_across_fields() {
        let filter = JobBoardFilter {
            query: Some("rotterDAM".to_string()),
            ..JobBoardFilter::default()
        };
        assert_eq!(board().filter(&filter).len(), 3);

        let filter = JobBoardFilter {
            query: Some("weld".to_string()),
            ..JobBoardFilter::default()
        };
        let found = board().filter(&filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.0, "job-2");
    }

    #[test]
    fn salary_basis_checks_the_label_suffix() {
        let filter = JobBoardFilter {
            salary_basis: Some(SalaryBasis::Hourly),
            ..JobBoardFilter::default()
        };
        let found: Vec<_> = board()
            .filter(&filter)
            .into_iter()
            .map(|posting| posting.id.0)
            .collect();
        assert_eq!(found, vec!["job-2", "job-3"]);
    }

    #[test]
    fn facets_are_sorted_and_distinct() {
        let facets = board().facets();
        assert_eq!(
            facets.countries,
            vec!["Czech Republic", "Netherlands", "Poland"]
        );
        assert_eq!(facets.job_types, vec!["Full-time"]);
    }
}
