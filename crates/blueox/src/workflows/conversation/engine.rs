use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::catalog::PathCatalog;
use super::domain::{
    AnswerValue, CollectedAnswers, FormFieldKind, FormSubmission, InputKind, PathConfig, PathId,
    Step,
};
use super::draft::ConversationDraft;
use super::messages::{pre_form_message, AssistantMessage};
use crate::workflows::applications::domain::{
    ApplicationId, SubmissionPayload, SELECTED_JOB_KEY, UPLOADED_DOCUMENTS_KEY, USER_PATH_KEY,
};
use crate::workflows::jobs::JobId;
use crate::workflows::matching::JobMatch;

/// Where a conversation currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversationState {
    Idle,
    AwaitingAnswer { step_index: usize },
    JobMatching,
    ChoosingJob { matches: Vec<JobMatch> },
    AwaitingForm { selected_job: Option<JobMatch> },
    Submitting { selected_job: Option<JobMatch> },
    Complete { application_id: ApplicationId },
    Redirected,
}

impl ConversationState {
    pub const fn name(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::AwaitingAnswer { .. } => "awaiting_answer",
            ConversationState::JobMatching => "job_matching",
            ConversationState::ChoosingJob { .. } => "choosing_job",
            ConversationState::AwaitingForm { .. } => "awaiting_form",
            ConversationState::Submitting { .. } => "submitting",
            ConversationState::Complete { .. } => "complete",
            ConversationState::Redirected => "redirected",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConversationState::Complete { .. } | ConversationState::Redirected
        )
    }
}

/// Inputs the reducer understands. The last four come from effects, not the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    SelectPath { path: PathId },
    Answer { value: AnswerValue },
    JobsMatched { matches: Vec<JobMatch> },
    SelectJob { job_id: JobId },
    DeclineJobs,
    Submit { form: FormSubmission },
    SubmissionSucceeded { application_id: ApplicationId },
    SubmissionFailed { reason: String },
    Reset,
}

impl ConversationEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            ConversationEvent::SelectPath { .. } => "select_path",
            ConversationEvent::Answer { .. } => "answer",
            ConversationEvent::JobsMatched { .. } => "jobs_matched",
            ConversationEvent::SelectJob { .. } => "select_job",
            ConversationEvent::DeclineJobs => "decline_jobs",
            ConversationEvent::Submit { .. } => "submit",
            ConversationEvent::SubmissionSucceeded { .. } => "submission_succeeded",
            ConversationEvent::SubmissionFailed { .. } => "submission_failed",
            ConversationEvent::Reset => "reset",
        }
    }
}

/// Side effects the owner of a conversation must run after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    MatchJobs { answers: CollectedAnswers },
    Persist { payload: SubmissionPayload },
    SaveDraft,
    ClearDraft,
}

/// Output of one accepted event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    /// What the user's bubble should read, when the event came from the user.
    pub echo: Option<String>,
    pub messages: Vec<AssistantMessage>,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn say(message: AssistantMessage) -> Self {
        Self {
            messages: vec![message],
            ..Self::default()
        }
    }

    fn echo(mut self, echo: impl Into<String>) -> Self {
        self.echo = Some(echo.into());
        self
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("event '{event}' is not valid while {state}")]
    UnexpectedEvent {
        state: &'static str,
        event: &'static str,
    },
    #[error("path '{0}' is not in the catalog")]
    UnknownPath(PathId),
    #[error("invalid answer for '{field}': {reason}")]
    InvalidAnswer { field: &'static str, reason: String },
    #[error("job '{0}' was not among the suggestions")]
    UnknownJob(JobId),
    #[error("'{0}' is required")]
    MissingField(&'static str),
    #[error("'{0}' must be an email address")]
    InvalidEmail(&'static str),
    #[error("'{0}' is not part of this form")]
    UnknownFormField(String),
}

/// One applicant's walk through a single path.
#[derive(Debug, Clone)]
pub struct Conversation {
    catalog: Arc<PathCatalog>,
    path: Option<PathId>,
    state: ConversationState,
    answers: CollectedAnswers,
    form: FormSubmission,
}

impl Conversation {
    pub fn new(catalog: Arc<PathCatalog>) -> Self {
        Self {
            catalog,
            path: None,
            state: ConversationState::Idle,
            answers: CollectedAnswers::new(),
            form: FormSubmission::default(),
        }
    }

    /// Replays a saved draft, stopping at the first unanswered step.
    ///
    /// The returned transition carries the prompt for wherever the replay
    /// stopped, plus a match lookup when every step was already answered.
    pub fn restore(
        catalog: Arc<PathCatalog>,
        draft: &ConversationDraft,
    ) -> Result<(Self, Transition), ConversationError> {
        let mut conversation = Self::new(catalog);
        let mut last = conversation.apply(ConversationEvent::SelectPath { path: draft.path })?;

        let fields: Vec<&'static str> = conversation
            .config()?
            .steps
            .iter()
            .map(|step| step.field)
            .collect();

        for field in fields {
            let Some(value) = draft.answers.get(field) else {
                break;
            };
            last = conversation.apply(ConversationEvent::Answer {
                value: value.clone(),
            })?;
        }

        last.echo = None;
        last.effects.retain(|effect| !matches!(effect, Effect::SaveDraft));
        Ok((conversation, last))
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn path(&self) -> Option<PathId> {
        self.path
    }

    pub fn answers(&self) -> &CollectedAnswers {
        &self.answers
    }

    pub fn catalog(&self) -> &Arc<PathCatalog> {
        &self.catalog
    }

    /// Step waiting for an answer, if any.
    pub fn current_step(&self) -> Option<&Step> {
        match self.state {
            ConversationState::AwaitingAnswer { step_index } => self
                .path
                .and_then(|path| self.catalog.get(path))
                .and_then(|config| config.step(step_index)),
            _ => None,
        }
    }

    /// Snapshot for the draft cache; `None` before a path is chosen.
    pub fn draft(&self, saved_at: chrono::DateTime<chrono::Utc>) -> Option<ConversationDraft> {
        self.path.map(|path| ConversationDraft {
            path,
            answers: self.answers.clone(),
            saved_at,
        })
    }

    pub fn progress_percent(&self) -> u8 {
        let Some(config) = self.path.and_then(|path| self.catalog.get(path)) else {
            return 0;
        };

        let steps = config.steps.len();
        let form_step = usize::from(!config.form_fields.is_empty());
        let job_step = usize::from(config.job_matching);
        let total = steps + form_step + job_step;
        if total == 0 {
            return 0;
        }

        let current = match &self.state {
            ConversationState::Idle => 0,
            ConversationState::AwaitingAnswer { step_index } => step_index + 1,
            ConversationState::JobMatching | ConversationState::ChoosingJob { .. } => steps + 1,
            ConversationState::AwaitingForm { .. } | ConversationState::Submitting { .. } => {
                steps + job_step + 1
            }
            ConversationState::Complete { .. } | ConversationState::Redirected => total,
        };

        let percent = (current.min(total) * 100) as f64 / total as f64;
        percent.round() as u8
    }

    /// Single reducer for every event. Rejected events leave the conversation untouched.
    pub fn apply(&mut self, event: ConversationEvent) -> Result<Transition, ConversationError> {
        let event_name = event.name();
        let transition = match (self.state.clone(), event) {
            (_, ConversationEvent::Reset) => self.reset(),
            (ConversationState::Idle, ConversationEvent::SelectPath { path }) => {
                self.select_path(path)?
            }
            (ConversationState::AwaitingAnswer { step_index }, ConversationEvent::Answer { value }) => {
                self.answer(step_index, value)?
            }
            (ConversationState::JobMatching, ConversationEvent::JobsMatched { matches }) => {
                self.jobs_matched(matches)
            }
            (ConversationState::ChoosingJob { matches }, ConversationEvent::SelectJob { job_id }) => {
                let selected = matches
                    .into_iter()
                    .find(|candidate| candidate.id == job_id)
                    .ok_or(ConversationError::UnknownJob(job_id))?;
                self.select_job(selected)?
            }
            (ConversationState::ChoosingJob { .. }, ConversationEvent::DeclineJobs) => {
                let path = self.require_path()?;
                self.state = ConversationState::AwaitingForm { selected_job: None };
                Transition::say(pre_form_message(path, None))
                    .echo("None of these fit - show me the form anyway")
            }
            (ConversationState::AwaitingForm { selected_job }, ConversationEvent::Submit { form }) => {
                self.submit(selected_job, form)?
            }
            (
                ConversationState::Submitting { .. },
                ConversationEvent::SubmissionSucceeded { application_id },
            ) => {
                let completion = AssistantMessage::completion(&self.merged_answers());
                self.state = ConversationState::Complete { application_id };
                Transition::say(completion).with_effect(Effect::ClearDraft)
            }
            (
                ConversationState::Submitting { selected_job },
                ConversationEvent::SubmissionFailed { reason },
            ) => {
                debug!(%reason, "submission failed, form reopened");
                self.state = ConversationState::AwaitingForm { selected_job };
                Transition::say(AssistantMessage::submission_failed())
            }
            (state, _) => {
                return Err(ConversationError::UnexpectedEvent {
                    state: state.name(),
                    event: event_name,
                })
            }
        };

        debug!(
            event = event_name,
            state = self.state.name(),
            path = ?self.path,
            "conversation advanced"
        );
        Ok(transition)
    }

    fn config(&self) -> Result<&PathConfig, ConversationError> {
        let path = self.require_path()?;
        self.catalog
            .get(path)
            .ok_or(ConversationError::UnknownPath(path))
    }

    fn require_path(&self) -> Result<PathId, ConversationError> {
        self.path.ok_or(ConversationError::UnexpectedEvent {
            state: self.state.name(),
            event: "path_required",
        })
    }

    fn reset(&mut self) -> Transition {
        self.path = None;
        self.state = ConversationState::Idle;
        self.answers = CollectedAnswers::new();
        self.form = FormSubmission::default();
        Transition::say(AssistantMessage::welcome()).with_effect(Effect::ClearDraft)
    }

    fn select_path(&mut self, path: PathId) -> Result<Transition, ConversationError> {
        let config = self
            .catalog
            .get(path)
            .ok_or(ConversationError::UnknownPath(path))?;
        let label = super::messages::initial_choices()
            .into_iter()
            .find(|choice| choice.path == path)
            .map(|choice| choice.label)
            .unwrap_or(config.name);

        if config.redirect {
            self.path = Some(path);
            self.state = ConversationState::Redirected;
            return Ok(Transition::say(AssistantMessage::company_redirect()).echo(label));
        }

        let first = config.step(0).map(AssistantMessage::ask);
        self.path = Some(path);
        self.answers = CollectedAnswers::new();
        self.form = FormSubmission::default();

        match first {
            Some(prompt) => {
                self.state = ConversationState::AwaitingAnswer { step_index: 0 };
                Ok(Transition::say(prompt).echo(label))
            }
            None => Ok(self.finish_steps()?.echo(label)),
        }
    }

    fn answer(
        &mut self,
        step_index: usize,
        value: AnswerValue,
    ) -> Result<Transition, ConversationError> {
        let config = self.config()?;
        let step = config
            .step(step_index)
            .ok_or(ConversationError::UnexpectedEvent {
                state: "awaiting_answer",
                event: "answer",
            })?;
        let field = step.field;
        let accepted = validate_answer(step, value)?;
        let next = config.step(step_index + 1).map(AssistantMessage::ask);

        let echo = accepted.display();
        self.answers.insert(field, accepted);

        let transition = match next {
            Some(prompt) => {
                self.state = ConversationState::AwaitingAnswer {
                    step_index: step_index + 1,
                };
                Transition::say(prompt)
            }
            None => self.finish_steps()?,
        };

        Ok(transition.echo(echo).with_effect(Effect::SaveDraft))
    }

    fn finish_steps(&mut self) -> Result<Transition, ConversationError> {
        let config = self.config()?;
        if config.job_matching {
            let answers = self.answers.clone();
            self.state = ConversationState::JobMatching;
            return Ok(Transition::default().with_effect(Effect::MatchJobs { answers }));
        }

        let message = pre_form_message(config.id, None);
        self.state = ConversationState::AwaitingForm { selected_job: None };
        Ok(Transition::say(message))
    }

    fn jobs_matched(&mut self, matches: Vec<JobMatch>) -> Transition {
        if matches.is_empty() {
            self.state = ConversationState::AwaitingForm { selected_job: None };
            return Transition::say(AssistantMessage::no_matches());
        }

        self.state = ConversationState::ChoosingJob { matches };
        Transition::say(AssistantMessage::matches_found())
    }

    fn select_job(&mut self, job: JobMatch) -> Result<Transition, ConversationError> {
        let path = self.require_path()?;
        let echo = format!("Selected: {} at {}", job.title, job.company);
        let message = pre_form_message(path, Some(&job.title));
        self.state = ConversationState::AwaitingForm {
            selected_job: Some(job),
        };
        Ok(Transition::say(message).echo(echo))
    }

    fn submit(
        &mut self,
        selected_job: Option<JobMatch>,
        form: FormSubmission,
    ) -> Result<Transition, ConversationError> {
        let config = self.config()?;
        let form = validate_form(config, form)?;
        let path = config.id;

        self.form = form;
        let payload = SubmissionPayload {
            path,
            selected_job: selected_job.as_ref().map(|job| job.id.clone()),
            data: self.merged_payload(selected_job.as_ref()),
        };
        self.state = ConversationState::Submitting { selected_job };

        Ok(Transition::default().with_effect(Effect::Persist { payload }))
    }

    /// Answers with the submitted form values layered on top.
    fn merged_answers(&self) -> CollectedAnswers {
        let mut merged = self.answers.clone();
        for (field, value) in &self.form.values {
            merged.insert(field.clone(), AnswerValue::text(value.clone()));
        }
        merged
    }

    fn merged_payload(&self, selected_job: Option<&JobMatch>) -> Map<String, Value> {
        let mut data = Map::new();
        for (field, value) in self.answers.iter() {
            let value = match value {
                AnswerValue::Text(text) => Value::String(text.clone()),
                AnswerValue::List(items) => {
                    Value::Array(items.iter().cloned().map(Value::String).collect())
                }
            };
            data.insert(field.clone(), value);
        }
        for (field, value) in &self.form.values {
            data.insert(field.clone(), Value::String(value.clone()));
        }
        if let Some(path) = self.path {
            data.insert(USER_PATH_KEY.to_string(), Value::String(path.to_string()));
        }
        data.insert(
            SELECTED_JOB_KEY.to_string(),
            selected_job
                .map(|job| Value::String(job.id.to_string()))
                .unwrap_or(Value::Null),
        );
        data.insert(
            UPLOADED_DOCUMENTS_KEY.to_string(),
            Value::Array(
                self.form
                    .uploaded_fields
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
        data
    }
}

pub(crate) fn validate_answer(
    step: &Step,
    value: AnswerValue,
) -> Result<AnswerValue, ConversationError> {
    let invalid = |reason: &str| ConversationError::InvalidAnswer {
        field: step.field,
        reason: reason.to_string(),
    };

    match step.kind {
        InputKind::Text | InputKind::Number | InputKind::File => match value {
            AnswerValue::Text(text) if !text.trim().is_empty() => {
                Ok(AnswerValue::Text(text.trim().to_string()))
            }
            AnswerValue::Text(_) => Err(invalid("answer is empty")),
            AnswerValue::List(_) => Err(invalid("expected a single value")),
        },
        InputKind::Select => match value {
            AnswerValue::Text(text) => {
                let text = text.trim();
                if step.options.contains(&text) {
                    Ok(AnswerValue::text(text))
                } else {
                    Err(invalid(&format!("'{text}' is not an option")))
                }
            }
            AnswerValue::List(_) => Err(invalid("expected a single option")),
        },
        InputKind::MultiSelect => {
            let picked: Vec<String> = match value {
                AnswerValue::Text(text) => vec![text],
                AnswerValue::List(items) => items,
            };
            let mut accepted: Vec<String> = Vec::with_capacity(picked.len());
            for item in picked {
                let item = item.trim();
                if !step.options.contains(&item) {
                    return Err(invalid(&format!("'{item}' is not an option")));
                }
                if !accepted.iter().any(|seen| seen == item) {
                    accepted.push(item.to_string());
                }
            }
            if accepted.is_empty() {
                return Err(invalid("select at least one option"));
            }
            Ok(AnswerValue::List(accepted))
        }
    }
}

fn validate_form(
    config: &PathConfig,
    form: FormSubmission,
) -> Result<FormSubmission, ConversationError> {
    let mut values = std::collections::BTreeMap::new();
    for (field, value) in form.values {
        let Some(definition) = config.form_field(&field) else {
            return Err(ConversationError::UnknownFormField(field));
        };
        if definition.kind == FormFieldKind::File {
            return Err(ConversationError::UnknownFormField(field));
        }
        let value = value.trim().to_string();
        if !value.is_empty() {
            values.insert(field, value);
        }
    }

    for definition in config
        .form_fields
        .iter()
        .filter(|definition| definition.kind != FormFieldKind::File)
    {
        let value = values.get(definition.field);
        if definition.required && value.is_none() {
            return Err(ConversationError::MissingField(definition.field));
        }
        if definition.kind == FormFieldKind::Email && !value.map_or(true, |email| is_email(email)) {
            return Err(ConversationError::InvalidEmail(definition.field));
        }
    }

    let mut uploaded_fields = Vec::with_capacity(form.uploaded_fields.len());
    for field in form.uploaded_fields {
        match config.form_field(&field) {
            Some(definition) if definition.kind == FormFieldKind::File => {
                if !uploaded_fields.contains(&field) {
                    uploaded_fields.push(field);
                }
            }
            _ => return Err(ConversationError::UnknownFormField(field)),
        }
    }

    Ok(FormSubmission {
        values,
        uploaded_fields,
    })
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
