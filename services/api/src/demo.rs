use crate::infra::Services;
use blueox::backend::InMemoryBackend;
use blueox::config::MatchingConfig;
use blueox::error::AppError;
use blueox::workflows::applications::UploadedFile;
use blueox::workflows::conversation::domain::{SKILLS_FIELD, TARGET_COUNTRIES_FIELD};
use blueox::workflows::conversation::{
    AnswerValue, ChatEntry, ConversationState, ConversationView, FormSubmission, InputKind,
    PathCatalog, PathConfig, PathId, UserEvent,
};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Only print this path (student_university, worker_job, student_job, company)
    #[arg(long)]
    pub(crate) path: Option<PathId>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Country the scripted worker wants to work in
    #[arg(long, default_value = "Netherlands")]
    pub(crate) country: String,
    /// Skill the scripted worker selects
    #[arg(long, default_value = "Electricians")]
    pub(crate) skill: String,
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let catalog = PathCatalog::standard();
    for config in catalog.paths() {
        if args.path.is_some_and(|wanted| wanted != config.id) {
            continue;
        }
        render_path(config);
    }
    Ok(())
}

fn render_path(config: &PathConfig) {
    println!(
        "\n{} ({}) - {}",
        config.name,
        config.id,
        if config.redirect {
            "redirects to WhatsApp".to_string()
        } else {
            format!(
                "{} steps, job matching {}",
                config.steps.len(),
                if config.job_matching { "on" } else { "off" }
            )
        }
    );
    for (index, step) in config.steps.iter().enumerate() {
        println!(
            "  {}. {} [{}] -> {}",
            index + 1,
            step.label,
            kind_label(step.kind),
            step.field
        );
        if !step.options.is_empty() {
            println!("     options: {}", step.options.join(", "));
        }
    }
    if !config.form_fields.is_empty() {
        let fields: Vec<String> = config
            .form_fields
            .iter()
            .map(|field| {
                if field.required {
                    format!("{}*", field.label)
                } else {
                    field.label.to_string()
                }
            })
            .collect();
        println!("  form: {}", fields.join(", "));
    }
}

fn kind_label(kind: InputKind) -> &'static str {
    match kind {
        InputKind::Text => "text",
        InputKind::Select => "select",
        InputKind::MultiSelect => "multi-select",
        InputKind::Number => "number",
        InputKind::File => "file",
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { country, skill } = args;

    println!("Blue OX conversation demo");
    let services = Services::new(
        Arc::new(InMemoryBackend::with_sample_jobs()),
        MatchingConfig::default(),
    );
    let conversations = services.conversations.clone();

    let opened = conversations.open(None).await;
    let id = opened.session_id.clone();
    let mut printed = print_transcript(&opened, 0);

    let Some(config) = conversations.catalog().get(PathId::WorkerJob).cloned() else {
        println!("  Worker path missing from the catalog");
        return Ok(());
    };

    let mut view = match conversations
        .handle(&id, UserEvent::SelectPath(PathId::WorkerJob))
        .await
    {
        Ok(view) => view,
        Err(err) => {
            println!("  Path selection rejected: {}", err);
            return Ok(());
        }
    };
    printed = print_transcript(&view, printed);

    for step in &config.steps {
        let answer = match step.field {
            TARGET_COUNTRIES_FIELD => AnswerValue::list([country.as_str()]),
            SKILLS_FIELD => AnswerValue::list([skill.as_str()]),
            _ => match step.options.first() {
                Some(option) => AnswerValue::text(*option),
                None => AnswerValue::text("n/a"),
            },
        };
        view = match conversations.handle(&id, UserEvent::Answer(answer)).await {
            Ok(view) => view,
            Err(err) => {
                println!("  Answer for '{}' rejected: {}", step.label, err);
                return Ok(());
            }
        };
        printed = print_transcript(&view, printed);
    }

    if let ConversationState::ChoosingJob { matches } = &view.state {
        println!("\nSuggested jobs:");
        for job in matches {
            println!(
                "  - {} at {} ({}) score {} | {}",
                job.title,
                job.company,
                job.location,
                job.score,
                job.salary.as_deref().unwrap_or("salary on request")
            );
        }
        let event = match matches.first() {
            Some(top) => UserEvent::SelectJob(top.id.clone()),
            None => UserEvent::DeclineJobs,
        };
        view = match conversations.handle(&id, event).await {
            Ok(view) => view,
            Err(err) => {
                println!("  Job choice rejected: {}", err);
                return Ok(());
            }
        };
        printed = print_transcript(&view, printed);
    }

    let form = FormSubmission {
        values: [
            ("fullName", "Demo Applicant"),
            ("email", "demo.applicant@example.com"),
            ("whatsapp", "+234 800 000 0000"),
        ]
        .into_iter()
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect(),
        uploaded_fields: Vec::new(),
    };
    let cv = UploadedFile {
        field: "cv".to_string(),
        file_name: "demo-cv.pdf".to_string(),
        content_type: None,
        bytes: b"%PDF-1.7 demo".to_vec(),
    };
    view = match conversations
        .handle(
            &id,
            UserEvent::Submit {
                form,
                uploads: vec![cv],
            },
        )
        .await
    {
        Ok(view) => view,
        Err(err) => {
            println!("  Submission rejected: {}", err);
            return Ok(());
        }
    };
    print_transcript(&view, printed);

    let ConversationState::Complete { application_id } = &view.state else {
        println!("\nConversation ended in state {}", view.state.name());
        return Ok(());
    };

    println!("\nStored application as the review console shows it");
    match services.console.application(application_id).await {
        Ok(application) => {
            println!(
                "- {} [{}] {}",
                application.id,
                application.status.label(),
                application.path_label
            );
            for entry in application.fields.iter().chain(&application.extra) {
                println!("    {}: {}", entry.label, entry.value);
            }
        }
        Err(err) => println!("  Review console unavailable: {}", err),
    }
    println!("  Stored documents: {}", services.backend.object_count());

    Ok(())
}

fn print_transcript(view: &ConversationView, already_printed: usize) -> usize {
    for entry in view.transcript.iter().skip(already_printed) {
        match entry {
            ChatEntry::User { content } => println!("\n  you: {}", content),
            ChatEntry::Assistant(message) => {
                println!("\n  blue ox: {}", message.content);
                for choice in &message.choices {
                    println!("    * {} - {}", choice.label, choice.description);
                }
            }
        }
    }
    println!("  [{}% complete]", view.progress);
    view.transcript.len()
}
