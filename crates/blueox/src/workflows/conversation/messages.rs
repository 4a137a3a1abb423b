use serde::Serialize;

use super::domain::{CollectedAnswers, InputKind, PathId, Step, FULL_NAME_FIELD};

pub const ASSISTANT_NAME: &str = "Blue OX";
pub const WHATSAPP_LINK: &str = "https://wa.me/message/F6QOLB6IS3VHF1";

const WELCOME: &str = "Hey! I'm Blue OX. What brings you here today?";

const MATCHES_FOUND: &str = "Great news! I found some jobs that match what you're looking for. Take a look and pick the one that catches your eye:";

const NO_MATCHES: &str = "I don't have exact matches right now, but don't worry - fill out your details and our team will find something perfect for you!";

const SUBMISSION_FAILED: &str = "Hmm, something went wrong while sending your application. Your details are still here - please try submitting again.";

/// Selectable path offered by the welcome message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatChoice {
    pub path: PathId,
    pub label: &'static str,
    pub description: &'static str,
}

/// Input the client should render under an assistant bubble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputPrompt {
    pub field: &'static str,
    pub kind: InputKind,
    #[serde(skip_serializing_if = "no_options")]
    pub options: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
}

fn no_options(options: &&'static [&'static str]) -> bool {
    options.is_empty()
}

/// Chat bubble emitted by the assistant on a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantMessage {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChatChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputPrompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<&'static str>,
}

impl AssistantMessage {
    pub fn say(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            choices: Vec::new(),
            input: None,
            link: None,
        }
    }

    pub fn welcome() -> Self {
        Self {
            choices: initial_choices(),
            ..Self::say(WELCOME)
        }
    }

    pub fn ask(step: &Step) -> Self {
        Self {
            input: Some(InputPrompt {
                field: step.field,
                kind: step.kind,
                options: step.options,
                placeholder: step.placeholder,
            }),
            ..Self::say(step.prompt)
        }
    }

    pub fn company_redirect() -> Self {
        Self {
            link: Some(WHATSAPP_LINK),
            ..Self::say(company_redirect_text())
        }
    }

    pub fn matches_found() -> Self {
        Self::say(MATCHES_FOUND)
    }

    pub fn no_matches() -> Self {
        Self::say(NO_MATCHES)
    }

    pub fn submission_failed() -> Self {
        Self::say(SUBMISSION_FAILED)
    }

    pub fn completion(answers: &CollectedAnswers) -> Self {
        Self {
            link: Some(WHATSAPP_LINK),
            ..Self::say(completion_text(answers))
        }
    }
}

pub fn initial_choices() -> Vec<ChatChoice> {
    vec![
        ChatChoice {
            path: PathId::StudentUniversity,
            label: "I'm a student looking for a school",
            description: "Find universities and programs in Europe",
        },
        ChatChoice {
            path: PathId::WorkerJob,
            label: "I'm a worker looking for a job",
            description: "Find employment opportunities in Europe",
        },
        ChatChoice {
            path: PathId::StudentJob,
            label: "I'm a student looking for a job",
            description: "Find work while you study",
        },
        ChatChoice {
            path: PathId::Company,
            label: "I'm a company looking to hire",
            description: "Connect with talented professionals from around the world",
        },
    ]
}

fn company_redirect_text() -> String {
    format!(
        "Great! We specialize in connecting companies with skilled Blue Collar workers across Europe.\n\n\
         Our expertise includes placing Electricians, Welders, Carpenters, Truck Drivers, Construction Workers, Warehouse Staff, and more.\n\n\
         For the best experience, let's chat directly. Our team can walk you through everything.\n\n\
         Reach out to us here: {WHATSAPP_LINK}\n\n\
         Looking forward to hearing from you!"
    )
}

/// Message shown right before the contact form, optionally naming the chosen job.
pub fn pre_form_message(path: PathId, selected_job: Option<&str>) -> AssistantMessage {
    let content = match (path, selected_job) {
        (PathId::StudentUniversity, _) => "This is looking great! I've got a good picture of what you're looking for.\n\n\
             Now I just need a few details from you so our team can start finding the perfect schools. \
             Fill out this quick form and we'll take it from there! You can do it!"
            .to_string(),
        (PathId::WorkerJob, Some(title)) => format!(
            "Excellent choice! \"{title}\" looks like a great fit for you! Oh yeah!\n\n\
             Let me get your details so we can move forward with your application."
        ),
        (PathId::WorkerJob, None) => "Based on what you've told me, I think we can find you something great!\n\n\
             Fill out this form and upload your documents - then we'll get the ball rolling! I believe in you!"
            .to_string(),
        (PathId::StudentJob, Some(title)) => format!(
            "Nice pick! \"{title}\" could be perfect for you! This is gonna be awesome!\n\n\
             Just need your details and documents to get your application started."
        ),
        (PathId::StudentJob, None) => "I've got some good options in mind for you!\n\n\
             Let's get your details down so we can connect you with the right opportunities. You've got this!"
            .to_string(),
        (PathId::Company, _) => "Let's get your details! You can do it!".to_string(),
    };
    AssistantMessage::say(content)
}

fn completion_text(answers: &CollectedAnswers) -> String {
    let full_name = answers
        .get(FULL_NAME_FIELD)
        .map(|value| value.display())
        .unwrap_or_default();
    let first_name = full_name
        .split_whitespace()
        .next()
        .unwrap_or("there")
        .to_string();

    format!(
        "You're all set, {first_name}! This is so exciting!\n\n\
         Your application has been submitted and our team is already on it. \
         We'll reach out to you on WhatsApp within 24-48 hours.\n\n\
         In the meantime, keep an eye on your messages. If you have any questions, don't hesitate to reach out! \
         I believe in you - we're gonna make your European dreams come true!\n\n\
         Follow up your progress on WhatsApp: {WHATSAPP_LINK}"
    )
}
