use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four audiences the conversation can branch into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathId {
    StudentUniversity,
    StudentJob,
    WorkerJob,
    Company,
}

impl PathId {
    pub const ALL: [PathId; 4] = [
        PathId::StudentUniversity,
        PathId::WorkerJob,
        PathId::StudentJob,
        PathId::Company,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PathId::StudentUniversity => "student_university",
            PathId::StudentJob => "student_job",
            PathId::WorkerJob => "worker_job",
            PathId::Company => "company",
        }
    }

    /// Short label used by the review screens.
    pub const fn label(self) -> &'static str {
        match self {
            PathId::StudentUniversity => "Student - University",
            PathId::StudentJob => "Student - Job Search",
            PathId::WorkerJob => "Worker - Job Search",
            PathId::Company => "Company",
        }
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown conversation path '{0}'")]
pub struct UnknownPath(pub String);

impl FromStr for PathId {
    type Err = UnknownPath;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "student_university" => Ok(PathId::StudentUniversity),
            "student_job" => Ok(PathId::StudentJob),
            "worker_job" => Ok(PathId::WorkerJob),
            "company" => Ok(PathId::Company),
            other => Err(UnknownPath(other.to_string())),
        }
    }
}

/// Shape of the input a step expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Select,
    MultiSelect,
    Number,
    File,
}

impl InputKind {
    pub const fn takes_options(self) -> bool {
        matches!(self, InputKind::Select | InputKind::MultiSelect)
    }
}

/// One scripted question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: &'static str,
    pub label: &'static str,
    pub prompt: &'static str,
    pub kind: InputKind,
    pub field: &'static str,
    pub options: &'static [&'static str],
    pub placeholder: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFieldKind {
    Text,
    Email,
    Tel,
    File,
}

/// Contact or document field collected after the scripted steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub field: &'static str,
    pub label: &'static str,
    pub kind: FormFieldKind,
    pub placeholder: Option<&'static str>,
    pub required: bool,
    pub help_text: Option<&'static str>,
    pub help_link: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathConfig {
    pub id: PathId,
    pub name: &'static str,
    pub steps: Vec<Step>,
    pub form_fields: Vec<FormField>,
    pub job_matching: bool,
    pub redirect: bool,
}

impl PathConfig {
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn form_field(&self, field: &str) -> Option<&FormField> {
        self.form_fields.iter().find(|candidate| candidate.field == field)
    }

    /// Label for a step or form field stored under `field`.
    pub fn field_label(&self, field: &str) -> Option<&'static str> {
        self.steps
            .iter()
            .find(|step| step.field == field)
            .map(|step| step.label)
            .or_else(|| self.form_field(field).map(|form| form.label))
    }

    /// Step fields then form fields, in the order the user meets them.
    pub fn known_fields(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.steps
            .iter()
            .map(|step| (step.field, step.label))
            .chain(self.form_fields.iter().map(|form| (form.field, form.label)))
    }
}

/// Value recorded for a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    List(Vec<String>),
}

impl AnswerValue {
    pub fn text(value: impl Into<String>) -> Self {
        AnswerValue::Text(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnswerValue::List(values.into_iter().map(Into::into).collect())
    }

    pub fn as_list(&self) -> Vec<&str> {
        match self {
            AnswerValue::Text(value) => vec![value.as_str()],
            AnswerValue::List(values) => values.iter().map(String::as_str).collect(),
        }
    }

    pub fn display(&self) -> String {
        match self {
            AnswerValue::Text(value) => value.clone(),
            AnswerValue::List(values) => values.join(", "),
        }
    }
}

/// Answers accumulated while walking one path, keyed by step field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectedAnswers(BTreeMap<String, AnswerValue>);

pub const SKILLS_FIELD: &str = "skills";
pub const TARGET_COUNTRIES_FIELD: &str = "targetCountries";
pub const FULL_NAME_FIELD: &str = "fullName";

impl CollectedAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: AnswerValue) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&AnswerValue> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.0.iter()
    }

    pub fn list(&self, field: &str) -> Vec<String> {
        self.get(field)
            .map(|value| value.as_list().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn skills(&self) -> Vec<String> {
        self.list(SKILLS_FIELD)
    }

    pub fn target_countries(&self) -> Vec<String> {
        self.list(TARGET_COUNTRIES_FIELD)
    }
}

impl FromIterator<(String, AnswerValue)> for CollectedAnswers {
    fn from_iter<T: IntoIterator<Item = (String, AnswerValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Contact details and document markers posted with the final form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmission {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    /// Form fields that had a file attached.
    #[serde(default)]
    pub uploaded_fields: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_ids_round_trip_through_their_wire_names() {
        for path in PathId::ALL {
            assert_eq!(path.as_str().parse::<PathId>(), Ok(path));
        }
        assert!("recruiter".parse::<PathId>().is_err());
    }

    #[test]
    fn answers_deserialize_from_strings_and_lists() {
        let answers: CollectedAnswers = serde_json::from_str(
            r#"{"skills":["Electricians","Plumbers"],"experienceYears":"3-5 years"}"#,
        )
        .expect("answers parse");

        assert_eq!(answers.skills(), vec!["Electricians", "Plumbers"]);
        assert_eq!(
            answers.get("experienceYears"),
            Some(&AnswerValue::text("3-5 years"))
        );
        assert!(answers.target_countries().is_empty());
    }

    #[test]
    fn list_answers_display_comma_joined() {
        let value = AnswerValue::list(["Netherlands", "Poland"]);
        assert_eq!(value.display(), "Netherlands, Poland");
    }
}
