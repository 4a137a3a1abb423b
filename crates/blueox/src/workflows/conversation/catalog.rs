use super::domain::{FormField, FormFieldKind, InputKind, PathConfig, PathId, Step};

const STUDY_COUNTRIES: &[&str] = &[
    "Netherlands",
    "Poland",
    "Czech Republic",
    "Hungary",
    "France",
    "Spain",
    "Italy",
    "Greece",
    "Slovakia",
    "Romania",
    "Serbia",
    "Bulgaria",
    "Lithuania",
    "Croatia",
    "Other",
];

const WORK_COUNTRIES: &[&str] = &[
    "Netherlands",
    "Poland",
    "Czech Republic",
    "Hungary",
    "Belgium",
    "Greece",
    "Slovakia",
    "Romania",
    "Serbia",
    "Bulgaria",
    "Lithuania",
    "Croatia",
    "Any",
];

const WORKER_SKILLS: &[&str] = &[
    "Electricians",
    "Scaffolders",
    "Mig Welding",
    "Mug Welding",
    "Carpentry",
    "Truck Drivers",
    "Forklift Drivers",
    "Construction Helpers",
    "Plumbers",
    "HVAC Techs",
    "Caregivers",
    "Warehouse Workers",
    "Ship Building",
    "Any",
];

const EDUCATION_LEVELS: &[&str] = &["Bachelor's Degree", "Master's Degree"];

const START_WINDOWS: &[&str] = &[
    "Immediately",
    "Within 1 month",
    "Within 3 months",
    "Within 6 months",
    "Flexible",
];

const EUROPASS_LINK: &str = "https://europass.europa.eu/en/create-europass-cv";

/// Immutable table of every conversation path.
#[derive(Debug, Clone)]
pub struct PathCatalog {
    paths: Vec<PathConfig>,
}

impl PathCatalog {
    pub fn standard() -> Self {
        Self {
            paths: vec![
                student_university_path(),
                worker_job_path(),
                student_job_path(),
                company_path(),
            ],
        }
    }

    pub fn get(&self, id: PathId) -> Option<&PathConfig> {
        self.paths.iter().find(|path| path.id == id)
    }

    pub fn paths(&self) -> &[PathConfig] {
        &self.paths
    }
}

impl Default for PathCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn student_university_path() -> PathConfig {
    PathConfig {
        id: PathId::StudentUniversity,
        name: "Student University Path",
        steps: vec![
            Step {
                id: "education_level",
                label: "Education Level",
                prompt: "Awesome! You're looking to study in Europe! This is gonna be so exciting!\n\nLet me ask you a few quick questions so I can point you in the right direction.\n\nFirst up - what's your current education level?",
                kind: InputKind::Select,
                field: "educationLevel",
                options: EDUCATION_LEVELS,
                placeholder: None,
            },
            Step {
                id: "target_countries",
                label: "Target Countries",
                prompt: "Perfect! Now, which European countries are you interested in?\n\nPick as many as you like - keeping your options open is always smart!",
                kind: InputKind::MultiSelect,
                field: "targetCountries",
                options: STUDY_COUNTRIES,
                placeholder: None,
            },
            Step {
                id: "field_of_study",
                label: "Field of Study",
                prompt: "What fields are you interested in studying?\n\nYou can choose multiple - I know it's hard to pick just one! Don't worry, I'll walk you through everything step by step!",
                kind: InputKind::MultiSelect,
                field: "fieldOfStudy",
                options: &[
                    "Engineering",
                    "Business & Economics",
                    "Computer Science",
                    "Medicine & Health",
                    "Arts & Humanities",
                    "Natural Sciences",
                    "Law",
                    "Other",
                ],
                placeholder: None,
            },
            Step {
                id: "budget",
                label: "Budget",
                prompt: "Let's talk money - what's your approximate annual budget for tuition and living expenses?\n\nBe honest, it helps me find the right fit for you. Together we'll make it happen!",
                kind: InputKind::Select,
                field: "budget",
                options: &[
                    "Under 5,000 EUR",
                    "5,000 - 10,000 EUR",
                    "10,000 - 15,000 EUR",
                    "15,000 - 20,000 EUR",
                    "Over 20,000 EUR",
                ],
                placeholder: None,
            },
            Step {
                id: "start_date",
                label: "Start Date",
                prompt: "When are you hoping to start your studies? We're gonna make your European dreams come true!",
                kind: InputKind::Select,
                field: "startDate",
                options: &[
                    "Spring 2025",
                    "Fall 2025",
                    "Spring 2026",
                    "Fall 2026",
                    "Not sure yet",
                ],
                placeholder: None,
            },
        ],
        form_fields: contact_form(true),
        job_matching: false,
        redirect: false,
    }
}

fn worker_job_path() -> PathConfig {
    PathConfig {
        id: PathId::WorkerJob,
        name: "Worker Job Path",
        steps: vec![
            Step {
                id: "target_countries",
                label: "Target Countries",
                prompt: "Looking for work in Europe? You've come to the right place!\n\nWhich countries are you interested in working in?",
                kind: InputKind::MultiSelect,
                field: "targetCountries",
                options: WORK_COUNTRIES,
                placeholder: None,
            },
            Step {
                id: "skills",
                label: "Skills",
                prompt: "What are your main skills?\n\nSelect all that apply.",
                kind: InputKind::MultiSelect,
                field: "skills",
                options: WORKER_SKILLS,
                placeholder: None,
            },
            Step {
                id: "experience_years",
                label: "Experience",
                prompt: "How many years of experience do you have? You can do it!",
                kind: InputKind::Select,
                field: "experienceYears",
                options: &[
                    "Less than 1 year",
                    "1-2 years",
                    "3-5 years",
                    "5-10 years",
                    "More than 10 years",
                ],
                placeholder: None,
            },
            Step {
                id: "salary_expectation",
                label: "Salary Expectation",
                prompt: "What monthly salary are you looking for? (in EUR)\n\nDon't undersell yourself - you're worth it!",
                kind: InputKind::Select,
                field: "salaryExpectation",
                options: &[
                    "1,000 - 1,500 EUR",
                    "1,500 - 2,000 EUR",
                    "2,000 - 2,500 EUR",
                    "2,500 - 3,000 EUR",
                    "Over 3,000 EUR",
                    "Negotiable",
                ],
                placeholder: None,
            },
            Step {
                id: "availability",
                label: "Availability",
                prompt: "When can you start a new position? We're gonna find something perfect for you!",
                kind: InputKind::Select,
                field: "availability",
                options: START_WINDOWS,
                placeholder: None,
            },
        ],
        form_fields: contact_form(false),
        job_matching: true,
        redirect: false,
    }
}

fn student_job_path() -> PathConfig {
    PathConfig {
        id: PathId::StudentJob,
        name: "Student Job Path",
        steps: vec![
            Step {
                id: "education_level",
                label: "Education Level",
                prompt: "Nice! A student looking for work - I love the hustle! You've got this!\n\nWhat's your current education level?",
                kind: InputKind::Select,
                field: "educationLevel",
                options: EDUCATION_LEVELS,
                placeholder: None,
            },
            Step {
                id: "target_countries",
                label: "Target Countries",
                prompt: "Which European country are you interested in?",
                kind: InputKind::MultiSelect,
                field: "targetCountries",
                options: STUDY_COUNTRIES,
                placeholder: None,
            },
            Step {
                id: "start_date",
                label: "Start Date",
                prompt: "When would you like to start working? Together we'll make it happen!",
                kind: InputKind::Select,
                field: "startDate",
                options: START_WINDOWS,
                placeholder: None,
            },
        ],
        form_fields: contact_form(true),
        job_matching: true,
        redirect: false,
    }
}

fn company_path() -> PathConfig {
    PathConfig {
        id: PathId::Company,
        name: "Company Path",
        steps: Vec::new(),
        form_fields: Vec::new(),
        job_matching: false,
        redirect: true,
    }
}

fn contact_form(with_nationality: bool) -> Vec<FormField> {
    let mut fields = vec![
        FormField {
            field: "fullName",
            label: "Full Name",
            kind: FormFieldKind::Text,
            placeholder: Some("Your full name"),
            required: true,
            help_text: None,
            help_link: None,
        },
        FormField {
            field: "email",
            label: "Email Address",
            kind: FormFieldKind::Email,
            placeholder: Some("your.email@example.com"),
            required: true,
            help_text: None,
            help_link: None,
        },
        FormField {
            field: "whatsapp",
            label: "WhatsApp Number",
            kind: FormFieldKind::Tel,
            placeholder: Some("+234 XXX XXX XXXX"),
            required: true,
            help_text: None,
            help_link: None,
        },
    ];

    if with_nationality {
        fields.push(FormField {
            field: "nationality",
            label: "Nationality",
            kind: FormFieldKind::Text,
            placeholder: Some("Your nationality"),
            required: true,
            help_text: None,
            help_link: None,
        });
    }

    fields.push(FormField {
        field: "cv",
        label: "Europass CV",
        kind: FormFieldKind::File,
        placeholder: None,
        required: true,
        help_text: Some("Create one at europass.europa.eu/en/create-europass-cv"),
        help_link: Some(EUROPASS_LINK),
    });
    fields.push(FormField {
        field: "passport",
        label: "Passport (clearly scanned)",
        kind: FormFieldKind::File,
        placeholder: None,
        required: true,
        help_text: None,
        help_link: None,
    });

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_path_is_registered_once() {
        let catalog = PathCatalog::standard();
        for id in PathId::ALL {
            assert_eq!(
                catalog.paths().iter().filter(|path| path.id == id).count(),
                1,
                "{id} registered once"
            );
        }
    }

    #[test]
    fn select_steps_declare_options() {
        let catalog = PathCatalog::standard();
        for path in catalog.paths() {
            for step in &path.steps {
                assert_eq!(
                    step.kind.takes_options(),
                    !step.options.is_empty(),
                    "{}::{}",
                    path.id,
                    step.id
                );
            }
        }
    }

    #[test]
    fn step_fields_are_unique_within_a_path() {
        let catalog = PathCatalog::standard();
        for path in catalog.paths() {
            let mut fields: Vec<_> = path.known_fields().map(|(field, _)| field).collect();
            let total = fields.len();
            fields.sort_unstable();
            fields.dedup();
            assert_eq!(fields.len(), total, "{} has duplicate fields", path.id);
        }
    }

    #[test]
    fn company_path_redirects_without_steps() {
        let catalog = PathCatalog::standard();
        let company = catalog.get(PathId::Company).expect("company path");
        assert!(company.redirect);
        assert!(company.steps.is_empty());
        assert!(!company.job_matching);
    }

    #[test]
    fn job_paths_collect_skills_or_countries_for_matching() {
        let catalog = PathCatalog::standard();
        let worker = catalog.get(PathId::WorkerJob).expect("worker path");
        assert!(worker.job_matching);
        assert_eq!(worker.steps.len(), 5);
        assert_eq!(worker.field_label("skills"), Some("Skills"));
        assert_eq!(worker.field_label("whatsapp"), Some("WhatsApp Number"));
        assert!(worker.form_field("nationality").is_none());

        let student = catalog.get(PathId::StudentJob).expect("student job path");
        assert!(student.job_matching);
        assert_eq!(student.steps.len(), 3);
    }
}
