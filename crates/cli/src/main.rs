use std::process::ExitCode;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use frontdesk_core::config::{
    DEFAULT_STATE_ENV, MATERIA_MEDICA_ENV, REMEDY_SOURCE_ENV, STORE_URL_ENV,
};
use frontdesk_core::patient::parse_iso_date;
use frontdesk_core::{
    CoreConfig, DeskError, DeskResult, HttpConnector, LookupOutcome, PatientRecord, PhoneNumber,
    RemedyCatalog, RemedyRecord, SearchOutcome, Session, Sex, StoreConnector, VisitDraft,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "frontdesk")]
#[command(about = "Clinic front desk: remedy lookup, prescriptions, patients and visits")]
struct Cli {
    /// Remote store endpoint (overrides FRONTDESK_STORE_URL)
    #[arg(long, global = true)]
    store_url: Option<String>,
    /// Remedy inventory URL or CSV path (overrides FRONTDESK_REMEDY_SOURCE)
    #[arg(long, global = true)]
    source: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Remedy inventory
    #[command(subcommand)]
    Remedies(RemedyCommands),
    /// Prescription text editing
    #[command(subcommand)]
    Prescription(PrescriptionCommands),
    /// Patient lookup and registration
    #[command(subcommand)]
    Patient(PatientCommands),
    /// Consultation visits
    #[command(subcommand)]
    Visit(VisitCommands),
}

#[derive(Subcommand)]
enum RemedyCommands {
    /// Search remedies by name fragment
    Search {
        /// Name fragment (case-insensitive)
        term: String,
    },
    /// Count remedies in the inventory
    Count,
}

#[derive(Subcommand)]
enum PrescriptionCommands {
    /// Show the search term taken from prescription text
    Term {
        /// Prescription text as typed
        text: String,
    },
    /// Merge a remedy into prescription text
    ///
    /// This edits text only. No catalog is loaded, so stock is not checked.
    Select {
        /// Prescription text as typed
        text: String,
        /// Remedy name
        name: String,
        /// Remedy potency
        #[arg(default_value = "")]
        potency: String,
    },
}

#[derive(Subcommand)]
enum PatientCommands {
    /// Look a patient up by phone and show their visit history
    Lookup {
        /// Phone number
        phone: String,
    },
    /// Register a patient or update an existing one
    Save(PatientArgs),
}

#[derive(Args)]
struct PatientArgs {
    #[arg(long)]
    phone: String,
    #[arg(long)]
    first_name: String,
    #[arg(long, default_value = "")]
    last_name: String,
    /// Male, Female or Other
    #[arg(long, default_value = "Male")]
    sex: String,
    #[arg(long, default_value = "")]
    city: String,
    /// Region (defaults to FRONTDESK_DEFAULT_STATE)
    #[arg(long, default_value = "")]
    state: String,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long, default_value = "")]
    dob: String,
    #[arg(long, default_value_t = 0)]
    age: u32,
}

impl PatientArgs {
    fn into_record(self) -> DeskResult<PatientRecord> {
        Ok(PatientRecord {
            phone: self.phone,
            first_name: self.first_name,
            last_name: self.last_name,
            sex: self.sex.parse::<Sex>()?,
            city: self.city,
            state: self.state,
            date_of_birth: self.dob,
            age: self.age,
        })
    }
}

#[derive(Subcommand)]
enum VisitCommands {
    /// Record a consultation for a registered patient
    Save {
        /// Patient phone number
        #[arg(long)]
        phone: String,
        /// Visit date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
        /// Symptoms (default "<date>; ")
        #[arg(long)]
        symptoms: Option<String>,
        #[arg(long, default_value = "")]
        diagnosis: String,
        #[arg(long, default_value = "")]
        prescription: String,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'frontdesk --help' for commands");
        return ExitCode::SUCCESS;
    };

    let result = resolve_config(cli.store_url, cli.source)
        .and_then(|cfg| execute(command, &cfg, &HttpConnector));

    match result {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

/// Command-line flags win over the environment.
fn resolve_config(store_url: Option<String>, source: Option<String>) -> DeskResult<CoreConfig> {
    CoreConfig::from_env_values(
        store_url.or_else(|| std::env::var(STORE_URL_ENV).ok()),
        source.or_else(|| std::env::var(REMEDY_SOURCE_ENV).ok()),
        std::env::var(MATERIA_MEDICA_ENV).ok(),
        std::env::var(DEFAULT_STATE_ENV).ok(),
    )
}

fn execute(
    command: Commands,
    cfg: &CoreConfig,
    connector: &dyn StoreConnector,
) -> DeskResult<Vec<String>> {
    match command {
        Commands::Remedies(RemedyCommands::Search { term }) => {
            let catalog = RemedyCatalog::load(cfg.remedy_source())?;
            Ok(match catalog.find(&term) {
                SearchOutcome::NoTerm => vec!["Type a remedy name to search.".to_string()],
                SearchOutcome::NoMatches => vec!["No matches found.".to_string()],
                SearchOutcome::Matches(records) => records.iter().map(remedy_line).collect(),
            })
        }
        Commands::Remedies(RemedyCommands::Count) => {
            let catalog = RemedyCatalog::load(cfg.remedy_source())?;
            Ok(vec![format!(
                "{} remedies in {}",
                catalog.len(),
                cfg.remedy_source().describe()
            )])
        }
        Commands::Prescription(PrescriptionCommands::Term { text }) => {
            let mut session = Session::new();
            session.set_prescription(text);
            Ok(vec![session.search_term().to_string()])
        }
        Commands::Prescription(PrescriptionCommands::Select {
            text,
            name,
            potency,
        }) => {
            let mut session = Session::new();
            session.set_prescription(text);
            Ok(vec![session.select_remedy(&name, &potency)?.to_string()])
        }
        Commands::Patient(PatientCommands::Lookup { phone }) => {
            let phone = PhoneNumber::new(&phone)?;
            let store = connector.connect(cfg)?;
            let mut session = Session::new();

            match session.lookup_patient(store.as_ref(), phone.as_str())? {
                LookupOutcome::NotFound => Ok(vec![format!(
                    "No patient with phone {phone}. Register with 'frontdesk patient save'."
                )]),
                LookupOutcome::Found => {
                    let mut lines = Vec::new();
                    if let Some(summary) = session.active_patient_summary() {
                        lines.push(format!("Active patient: {} ({})", summary.name, summary.phone));
                    }
                    if session.visit_history().is_empty() {
                        lines.push("No previous visits.".to_string());
                    }
                    for (i, visit) in session.visit_history().iter().enumerate() {
                        lines.push(format!(
                            "[{i}] {} | {} | {} | Rx: {}",
                            visit.date, visit.symptoms, visit.diagnosis, visit.prescription
                        ));
                    }
                    Ok(lines)
                }
            }
        }
        Commands::Patient(PatientCommands::Save(args)) => {
            let record = args.into_record()?;
            let store = connector.connect(cfg)?;
            let mut session = Session::new();
            let saved = session.register_patient(store.as_ref(), &record, cfg.default_state())?;
            Ok(vec![format!(
                "Patient saved: {} ({})",
                saved.display_name(),
                saved.phone
            )])
        }
        Commands::Visit(VisitCommands::Save {
            phone,
            date,
            symptoms,
            diagnosis,
            prescription,
        }) => {
            let phone = PhoneNumber::new(&phone)?;
            let date = match date {
                Some(date) => parse_iso_date(&date)?,
                None => Local::now().date_naive(),
            };
            let store = connector.connect(cfg)?;

            let mut session = Session::new();
            if session.lookup_patient(store.as_ref(), phone.as_str())? == LookupOutcome::NotFound {
                return Err(DeskError::NoActivePatient);
            }
            session.set_prescription(prescription);

            let mut draft = VisitDraft::new(date);
            if let Some(symptoms) = symptoms {
                draft.symptoms = symptoms;
            }
            draft.diagnosis = diagnosis;

            let visit = session.complete_consultation(store.as_ref(), draft)?;
            Ok(vec![format!(
                "Visit saved for {} on {}",
                visit.patient_phone, visit.date
            )])
        }
    }
}

fn remedy_line(record: &RemedyRecord) -> String {
    let status = if record.available {
        "available"
    } else {
        "unavailable"
    };
    match &record.box_number {
        Some(box_number) => format!(
            "{} {} • BOX {} [{status}]",
            record.name, record.potency, box_number
        ),
        None => format!("{} {} [{status}]", record.name, record.potency),
    }
}
