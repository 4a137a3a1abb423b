//! Ranks open postings against the skills and countries collected in a conversation.

mod keywords;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use keywords::{keywords_for, ANY_SKILL};

use crate::config::MatchingConfig;
use crate::workflows::conversation::domain::CollectedAnswers;
use crate::workflows::jobs::{JobId, JobPosting, JobRepository};

/// Country selections that disable the country filter.
pub const ANY_COUNTRY_SENTINELS: [&str; 2] = ["Any", "Other"];

/// Scoring weights and the result cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    pub limit: usize,
    pub keyword_hit: u32,
    pub country_bonus: u32,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            limit: MatchingConfig::default().limit,
            keyword_hit: 2,
            country_bonus: 1,
        }
    }
}

impl From<MatchingConfig> for MatchPolicy {
    fn from(config: MatchingConfig) -> Self {
        Self {
            limit: config.limit,
            ..Self::default()
        }
    }
}

/// Display-oriented suggestion offered to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMatch {
    pub id: JobId,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(default)]
    pub salary: Option<String>,
    pub job_type: String,
    pub description: String,
    pub score: u32,
}

impl JobMatch {
    fn from_posting(posting: &JobPosting, score: u32) -> Self {
        Self {
            id: posting.id.clone(),
            title: posting.title.clone(),
            company: posting.employer().to_string(),
            location: posting.country.clone(),
            salary: posting.salary_range.clone(),
            job_type: posting.job_type.clone(),
            description: posting.description.clone(),
            score,
        }
    }
}

/// Stateless scorer over a posting snapshot.
#[derive(Debug, Clone, Default)]
pub struct JobMatcher {
    policy: MatchPolicy,
}

impl JobMatcher {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Filters by country, scores by skill keywords, and keeps the top `limit`.
    pub fn rank(&self, answers: &CollectedAnswers, postings: &[JobPosting]) -> Vec<JobMatch> {
        let skills = answers.skills();
        let countries = answers.target_countries();
        let any_country = countries.is_empty()
            || countries
                .iter()
                .any(|country| ANY_COUNTRY_SENTINELS.contains(&country.as_str()));

        let mut scored: Vec<(u32, &JobPosting)> = postings
            .iter()
            .filter(|posting| posting.is_active)
            .filter(|posting| any_country || countries.contains(&posting.country))
            .map(|posting| (self.score(&skills, &countries, posting), posting))
            .collect();

        // sort_by is stable, so ties keep backend order
        scored.sort_by(|left, right| right.0.cmp(&left.0));
        scored.truncate(self.policy.limit);

        scored
            .into_iter()
            .map(|(score, posting)| JobMatch::from_posting(posting, score))
            .collect()
    }

    pub fn score(&self, skills: &[String], countries: &[String], posting: &JobPosting) -> u32 {
        let text = posting.searchable_text();
        let mut score = 0;

        for skill in skills.iter().filter(|skill| skill.as_str() != ANY_SKILL) {
            let hits = keywords_for(skill)
                .iter()
                .filter(|keyword| text.contains(keyword.as_str()))
                .count() as u32;
            score += hits * self.policy.keyword_hit;
        }

        if countries.contains(&posting.country) {
            score += self.policy.country_bonus;
        }

        score
    }
}

/// Looks up active postings and ranks them; lookup failures yield no matches.
pub struct MatchingService<J> {
    jobs: Arc<J>,
    matcher: JobMatcher,
}

impl<J> MatchingService<J>
where
    J: JobRepository + 'static,
{
    pub fn new(jobs: Arc<J>, matcher: JobMatcher) -> Self {
        Self { jobs, matcher }
    }

    pub async fn suggest(&self, answers: &CollectedAnswers) -> Vec<JobMatch> {
        match self.jobs.active_jobs().await {
            Ok(postings) => {
                let matches = self.matcher.rank(answers, &postings);
                debug!(
                    candidates = postings.len(),
                    matched = matches.len(),
                    "ranked job postings"
                );
                matches
            }
            Err(err) => {
                warn!(error = %err, "job lookup failed; continuing without matches");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::conversation::domain::{AnswerValue, SKILLS_FIELD, TARGET_COUNTRIES_FIELD};
    use chrono::{TimeZone, Utc};

    fn posting(id: &str, title: &str, country: &str, description: &str) -> JobPosting {
        JobPosting {
            id: JobId(id.to_string()),
            title: title.to_string(),
            company: None,
            location: None,
            country: country.to_string(),
            job_type: "Full-time".to_string(),
            description: description.to_string(),
            requirements: None,
            salary_range: Some("€2,000/month".to_string()),
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    fn answers(countries: &[&str], skills: &[&str]) -> CollectedAnswers {
        let mut answers = CollectedAnswers::new();
        answers.insert(TARGET_COUNTRIES_FIELD, AnswerValue::list(countries.iter().copied()));
        answers.insert(SKILLS_FIELD, AnswerValue::list(skills.iter().copied()));
        answers
    }

    #[test]
    fn keyword_hits_outscore_identical_postings_without_them() {
        let matcher = JobMatcher::default();
        let with_keyword = posting("a", "Electrician", "Poland", "Industrial wiring");
        let without = posting("b", "Crew member", "Poland", "General duties");
        let skills = vec!["Electricians".to_string()];

        assert!(
            matcher.score(&skills, &[], &with_keyword) > matcher.score(&skills, &[], &without)
        );
    }

    #[test]
    fn any_country_keeps_every_posting() {
        let matcher = JobMatcher::default();
        let postings = vec![
            posting("a", "Welder", "Poland", ""),
            posting("b", "Driver", "Hungary", ""),
        ];

        assert_eq!(matcher.rank(&answers(&["Any"], &[]), &postings).len(), 2);
        assert_eq!(matcher.rank(&answers(&["Other"], &[]), &postings).len(), 2);
        assert_eq!(matcher.rank(&answers(&[], &[]), &postings).len(), 2);
    }

    #[test]
    fn country_filter_excludes_other_countries() {
        let matcher = JobMatcher::default();
        let postings = vec![
            posting("a", "Welder", "Poland", ""),
            posting("b", "Driver", "Hungary", ""),
        ];

        let ranked = matcher.rank(&answers(&["Hungary"], &[]), &postings);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id.0, "b");
        assert_eq!(ranked[0].score, 1);
    }

    #[test]
    fn output_never_exceeds_the_cap() {
        let matcher = JobMatcher::new(MatchPolicy {
            limit: 5,
            ..MatchPolicy::default()
        });
        let postings: Vec<_> = (0..12)
            .map(|index| posting(&format!("job-{index}"), "Plumber", "Poland", "pipes"))
            .collect();

        assert_eq!(matcher.rank(&answers(&[], &["Plumbers"]), &postings).len(), 5);
        assert_eq!(
            JobMatcher::default()
                .rank(&answers(&[], &["Plumbers"]), &postings)
                .len(),
            10
        );
    }

    #[test]
    fn ties_keep_original_order_and_inactive_postings_are_skipped() {
        let matcher = JobMatcher::default();
        let mut retired = posting("z", "Electrician", "Poland", "wiring");
        retired.is_active = false;
        let postings = vec![
            posting("first", "Helper", "Poland", ""),
            retired,
            posting("second", "Helper", "Poland", ""),
        ];

        let ids: Vec<_> = matcher
            .rank(&answers(&["Poland"], &["Electricians"]), &postings)
            .into_iter()
            .map(|found| found.id.0)
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn any_skill_adds_nothing() {
        let matcher = JobMatcher::default();
        let general = posting("a", "General helper for any site", "Poland", "all tasks");
        assert_eq!(matcher.score(&["Any".to_string()], &[], &general), 0);
    }

    #[test]
    fn matches_default_the_employer_name() {
        let matcher = JobMatcher::default();
        let ranked = matcher.rank(&answers(&[], &[]), &[posting("a", "Welder", "Poland", "")]);
        assert_eq!(ranked[0].company, crate::workflows::jobs::DEFAULT_EMPLOYER);
        assert_eq!(ranked[0].location, "Poland");
    }
}
