use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::domain::{Client, ClientId, Document, Payment, PaymentStatus};
use crate::workflows::applications::domain::{
    Application, ApplicationId, ApplicationStatus, DOCUMENT_PATHS_KEY, SAVED_AT_KEY,
    SELECTED_JOB_KEY, UPLOADED_DOCUMENTS_KEY, USER_PATH_KEY,
};
use crate::workflows::conversation::domain::{PathConfig, PathId};
use crate::workflows::jobs::JobPosting;

const HIDDEN_KEYS: [&str; 2] = [SAVED_AT_KEY, USER_PATH_KEY];

const EXTRA_LABELS: [(&str, &str); 3] = [
    (SELECTED_JOB_KEY, "Selected Job"),
    (UPLOADED_DOCUMENTS_KEY, "Uploaded Documents"),
    (DOCUMENT_PATHS_KEY, "Stored Documents"),
];

/// One labelled value of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldEntry {
    pub field: String,
    pub label: String,
    pub value: String,
}

/// Stored answers rendered against the path's field list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub path: PathId,
    pub path_label: &'static str,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub applicant: Option<Client>,
    /// Known fields in the order the applicant met them.
    pub fields: Vec<FieldEntry>,
    /// Keys the path does not declare.
    pub extra: Vec<FieldEntry>,
}

impl ApplicationView {
    pub fn render(
        application: &Application,
        config: Option<&PathConfig>,
        applicant: Option<&Client>,
    ) -> Self {
        let mut fields = Vec::new();
        let mut known: Vec<&str> = Vec::new();

        if let Some(config) = config {
            for (field, label) in config.known_fields() {
                known.push(field);
                if let Some(value) = application.data.get(field) {
                    fields.push(FieldEntry {
                        field: field.to_string(),
                        label: label.to_string(),
                        value: display_value(value),
                    });
                }
            }
        }

        let extra = application
            .data
            .iter()
            .filter(|(key, _)| !known.contains(&key.as_str()))
            .filter(|(key, _)| !HIDDEN_KEYS.contains(&key.as_str()))
            .map(|(key, value)| FieldEntry {
                field: key.clone(),
                label: EXTRA_LABELS
                    .iter()
                    .find(|(extra, _)| *extra == key.as_str())
                    .map(|(_, label)| label.to_string())
                    .unwrap_or_else(|| key.clone()),
                value: display_value(value),
            })
            .collect();

        Self {
            id: application.id.clone(),
            path: application.user_path,
            path_label: application.user_path.label(),
            status: application.status,
            created_at: application.created_at,
            applicant: applicant.cloned(),
            fields,
            extra,
        }
    }

    /// Case-insensitive match on applicant name, email, or path label.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let applicant = self
            .applicant
            .iter()
            .flat_map(|client| [client.full_name.as_str(), client.email.as_str()]);
        let answered = self
            .fields
            .iter()
            .filter(|entry| entry.field == "fullName" || entry.field == "email")
            .map(|entry| entry.value.as_str());

        applicant
            .chain(answered)
            .chain([self.path_label, self.path.as_str()])
            .any(|haystack| haystack.to_lowercase().contains(&needle))
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) if text.trim().is_empty() => "-".to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// A record with its owning client attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attached<T> {
    #[serde(flatten)]
    pub record: T,
    pub client: Option<Client>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub clients: usize,
    pub applications: usize,
    pub applications_by_status: BTreeMap<&'static str, usize>,
    pub unverified_documents: usize,
    pub pending_payments: usize,
    pub active_jobs: usize,
}

/// Everything the review console shows on load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub clients: Vec<Client>,
    pub applications: Vec<ApplicationView>,
    pub documents: Vec<Attached<Document>>,
    pub payments: Vec<Attached<Payment>>,
    pub jobs: Vec<JobPosting>,
    pub counts: DashboardCounts,
}

impl DashboardCounts {
    pub(crate) fn tally(
        clients: &[Client],
        applications: &[ApplicationView],
        documents: &[Attached<Document>],
        payments: &[Attached<Payment>],
        jobs: &[JobPosting],
    ) -> Self {
        let mut applications_by_status: BTreeMap<&'static str, usize> = ApplicationStatus::ALL
            .into_iter()
            .map(|status| (status.label(), 0))
            .collect();
        for view in applications {
            *applications_by_status.entry(view.status.label()).or_default() += 1;
        }

        Self {
            clients: clients.len(),
            applications: applications.len(),
            applications_by_status,
            unverified_documents: documents
                .iter()
                .filter(|document| !document.record.is_verified)
                .count(),
            pending_payments: payments
                .iter()
                .filter(|payment| payment.record.status == PaymentStatus::Pending)
                .count(),
            active_jobs: jobs.iter().filter(|job| job.is_active).count(),
        }
    }
}

/// A client's own records, as shown in their portal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientPortal {
    pub client: Client,
    pub applications: Vec<ApplicationView>,
    pub documents: Vec<Document>,
}

pub(crate) fn owner<'a>(clients: &'a [Client], id: Option<&ClientId>) -> Option<&'a Client> {
    id.and_then(|id| clients.iter().find(|client| &client.id == id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::conversation::PathCatalog;
    use chrono::TimeZone;
    use serde_json::{json, Map};

    fn application(data: Value) -> Application {
        let Value::Object(data) = data else {
            panic!("fixture must be an object");
        };
        Application {
            id: ApplicationId("app-1".to_string()),
            client_id: None,
            user_path: PathId::WorkerJob,
            data,
            status: ApplicationStatus::InReview,
            created_at: Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    #[test]
    fn known_fields_follow_catalog_order_with_labels() {
        let catalog = PathCatalog::standard();
        let app = application(json!({
            "fullName": "Ada Obi",
            "skills": ["Electricians", "Plumbers"],
            "targetCountries": ["Netherlands"],
            "userPath": "worker_job",
            "savedAt": "2025-02-01T11:59:00Z",
            "selectedJob": null,
            "uploadedDocuments": ["cv"],
            "favouriteColour": "blue",
        }));

        let view = ApplicationView::render(&app, catalog.get(PathId::WorkerJob), None);

        let labels: Vec<_> = view.fields.iter().map(|entry| entry.label.as_str()).collect();
        assert_eq!(labels, vec!["Target Countries", "Skills", "Full Name"]);
        assert_eq!(view.fields[1].value, "Electricians, Plumbers");

        let extra: Vec<_> = view
            .extra
            .iter()
            .map(|entry| (entry.label.as_str(), entry.value.as_str()))
            .collect();
        assert_eq!(
            extra,
            vec![
                ("favouriteColour", "blue"),
                ("Selected Job", "-"),
                ("Uploaded Documents", "cv"),
            ]
        );
        assert_eq!(view.path_label, "Worker - Job Search");
    }

    #[test]
    fn unknown_path_config_renders_everything_as_extra() {
        let mut data = Map::new();
        data.insert("email".to_string(), json!("ada@example.com"));
        let app = application(Value::Object(data));
        let view = ApplicationView::render(&app, None, None);
        assert!(view.fields.is_empty());
        assert_eq!(view.extra.len(), 1);
    }

    #[test]
    fn search_matches_answers_and_path_label() {
        let catalog = PathCatalog::standard();
        let app = application(json!({ "fullName": "Ada Obi", "email": "ada@example.com" }));
        let view = ApplicationView::render(&app, catalog.get(PathId::WorkerJob), None);

        assert!(view.matches("ADA"));
        assert!(view.matches("worker"));
        assert!(view.matches(""));
        assert!(!view.matches("university"));
    }
}
