use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use medidesk_core::config::{adult_age_from_env_value, resolve_data_dir};
use medidesk_core::constants::DEFAULT_COPY_MARKER;
use medidesk_core::models::{PatientSnapshot, PractitionerId, Relationship};
use medidesk_core::{
    ArchiveLifecycleManager, CascadePreview, Confirmation, CoreConfig, DeleteOutcome,
    EntityStore, NewConsultation, NewPatient, NewPrescription, NewRepresentative, Notice,
    NoticeLevel, NotificationSink, Outcome, RecordId, StaticSession, TransitionReport, YamlStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "medidesk")]
#[command(about = "MediDesk practice records CLI")]
struct Cli {
    /// Practitioner the commands act for
    #[arg(long, env = "MEDIDESK_PRACTITIONER")]
    practitioner: Option<String>,
    /// Record directory (defaults to MEDIDESK_DATA_DIR, then ./medidesk_data)
    #[arg(long)]
    data_dir: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Patient,
    Prescription,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh practitioner id
    NewPractitioner,
    /// List patients
    List {
        /// Only archived patients
        #[arg(long, conflicts_with = "all")]
        archived: bool,
        /// Active and archived patients
        #[arg(long)]
        all: bool,
    },
    /// List prescriptions
    Prescriptions {
        #[arg(long, conflicts_with = "all")]
        archived: bool,
        #[arg(long)]
        all: bool,
    },
    /// Register a patient together with an empty medical history
    Register {
        full_name: String,
        #[arg(long)]
        national_id: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<NaiveDate>,
        /// Representative as `NAME:RELATIONSHIP`; the first one is primary
        #[arg(long = "representative")]
        representatives: Vec<String>,
    },
    /// Record a consultation against a medical history
    Consult {
        medical_history_id: String,
        reason: String,
        #[arg(long)]
        findings: Option<String>,
        #[arg(long)]
        diagnosis: Option<String>,
    },
    /// Issue a prescription
    Prescribe {
        medications: String,
        /// Medical history to attach to; omit for a detached prescription
        #[arg(long)]
        history: Option<String>,
        /// Patient name, required for a detached prescription
        #[arg(long)]
        patient_name: Option<String>,
        #[arg(long)]
        diagnosis: Option<String>,
        #[arg(long)]
        instructions: Option<String>,
    },
    /// Archive a patient or prescription and everything that depends on it
    Archive { target: Target, id: String },
    /// Restore a patient or prescription and everything that depends on it
    Restore {
        target: Target,
        id: String,
        /// Also restore an archived patient when restoring one of its prescriptions
        #[arg(long)]
        confirm: bool,
    },
    /// Show what an archive or restore would touch
    Preview { target: Target, id: String },
    /// Copy a patient or prescription
    Duplicate { target: Target, id: String },
    /// Delete a patient with no medical history, archive it otherwise
    Delete { id: String },
}

/// Prints notices the way the UI would show them.
///
/// Error notices are skipped: the failed command returns the same error from `main`, which
/// prints it once.
struct ConsoleSink;

impl ConsoleSink {
    fn line(notice: &Notice) -> Option<String> {
        match notice.level {
            NoticeLevel::Success => Some(notice.message.clone()),
            NoticeLevel::Warning => Some(format!("warning: {}", notice.message)),
            NoticeLevel::Error => None,
        }
    }
}

impl NotificationSink for ConsoleSink {
    fn notify(&self, notice: Notice) {
        let Some(line) = Self::line(&notice) else {
            return;
        };
        if matches!(notice.level, NoticeLevel::Success) {
            println!("{line}");
        } else {
            eprintln!("{line}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medidesk_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'medidesk --help' for commands");
        return Ok(());
    };
    if let Commands::NewPractitioner = command {
        println!("{}", PractitionerId::new());
        return Ok(());
    }

    let session = match cli.practitioner.as_deref() {
        Some(raw) => StaticSession::authenticated(
            PractitionerId::parse(raw).context("invalid practitioner id")?,
        ),
        None => StaticSession::anonymous(),
    };
    let data_dir =
        resolve_data_dir(cli.data_dir.or_else(|| std::env::var("MEDIDESK_DATA_DIR").ok()));
    let adult_age = adult_age_from_env_value(std::env::var("MEDIDESK_ADULT_AGE").ok())?;
    let cfg = Arc::new(CoreConfig::new(
        data_dir.clone(),
        adult_age,
        DEFAULT_COPY_MARKER.into(),
    )?);
    let store: Arc<dyn EntityStore> = Arc::new(YamlStore::open(data_dir)?);
    let manager = ArchiveLifecycleManager::new(cfg, store, Arc::new(ConsoleSink));

    match command {
        Commands::NewPractitioner => {}
        Commands::List { archived, all } => {
            let patients = manager.list_patients(&session, active_filter(archived, all))?;
            if patients.is_empty() {
                println!("No patients found.");
            }
            for p in patients {
                println!(
                    "{}  {}{}",
                    p.id,
                    p.full_name,
                    if p.active { "" } else { "  [archived]" }
                );
            }
        }
        Commands::Prescriptions { archived, all } => {
            let prescriptions =
                manager.list_prescriptions(&session, active_filter(archived, all))?;
            if prescriptions.is_empty() {
                println!("No prescriptions found.");
            }
            for rx in prescriptions {
                println!(
                    "{}  {}  {}  {}{}",
                    rx.id,
                    rx.date_prescribed,
                    rx.patient.name,
                    rx.medications,
                    if rx.active { "" } else { "  [archived]" }
                );
            }
        }
        Commands::Register {
            full_name,
            national_id,
            email,
            phone,
            address,
            birth_date,
            representatives,
        } => {
            let representatives = representatives
                .iter()
                .enumerate()
                .map(|(i, raw)| parse_representative(raw, i == 0))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let input = NewPatient {
                full_name,
                national_id,
                email,
                phone,
                address,
                birth_date,
            };
            let registered = manager.register_patient(&session, input, representatives)?;
            println!("patient:         {}", registered.patient.id);
            println!("medical history: {}", registered.medical_history.id);
            for rep in registered.representatives {
                println!("representative:  {} ({})", rep.id, rep.full_name);
            }
        }
        Commands::Consult {
            medical_history_id,
            reason,
            findings,
            diagnosis,
        } => {
            let history_id = parse_id(&medical_history_id)?;
            let input = NewConsultation {
                date: None,
                reason,
                findings,
                diagnosis,
                vital_signs: Default::default(),
            };
            let consultation = manager.record_consultation(&session, &history_id, input)?;
            println!("{}", consultation.id);
        }
        Commands::Prescribe {
            medications,
            history,
            patient_name,
            diagnosis,
            instructions,
        } => {
            let input = NewPrescription {
                medical_history_id: history.as_deref().map(parse_id).transpose()?,
                patient: patient_name.map(|name| PatientSnapshot {
                    name,
                    ..Default::default()
                }),
                date_prescribed: None,
                diagnosis,
                medications,
                instructions,
                notes: None,
            };
            let rx = manager.issue_prescription(&session, input)?;
            println!("{}", rx.id);
        }
        Commands::Archive { target, id } => {
            let id = parse_id(&id)?;
            let report = match target {
                Target::Patient => manager.archive_patient(&session, &id)?,
                Target::Prescription => manager.archive_prescription(&session, &id)?,
            };
            print_report(&report);
        }
        Commands::Restore {
            target,
            id,
            confirm,
        } => {
            let id = parse_id(&id)?;
            match target {
                Target::Patient => print_report(&manager.restore_patient(&session, &id)?),
                Target::Prescription => {
                    let confirmation = Confirmation::from(confirm);
                    match manager.restore_prescription(&session, &id, confirmation)? {
                        Outcome::Completed(report) => print_report(&report),
                        Outcome::ConfirmationRequired(preview) => {
                            println!(
                                "The patient of this prescription is archived and would be restored too:"
                            );
                            print_preview(&preview);
                            println!("Run again with --confirm to proceed.");
                        }
                    }
                }
            }
        }
        Commands::Preview { target, id } => {
            let id = parse_id(&id)?;
            let preview = match target {
                Target::Patient => manager.preview_patient(&session, &id)?,
                Target::Prescription => manager.preview_prescription(&session, &id)?,
            };
            print_preview(&preview);
        }
        Commands::Duplicate { target, id } => {
            let id = parse_id(&id)?;
            let copy_id = match target {
                Target::Patient => manager.duplicate_patient(&session, &id)?.id,
                Target::Prescription => manager.duplicate_prescription(&session, &id)?.id,
            };
            println!("{copy_id}");
        }
        Commands::Delete { id } => {
            let id = parse_id(&id)?;
            match manager.delete_patient(&session, &id)? {
                DeleteOutcome::Deleted { representatives } => {
                    println!("deleted with {representatives} representative(s)")
                }
                DeleteOutcome::Archived { report } => {
                    println!("patient has a medical history; archived instead");
                    print_report(&report);
                }
            }
        }
    }

    Ok(())
}

fn active_filter(archived: bool, all: bool) -> Option<bool> {
    match (archived, all) {
        (_, true) => None,
        (true, false) => Some(false),
        (false, false) => Some(true),
    }
}

fn parse_id(raw: &str) -> anyhow::Result<RecordId> {
    RecordId::parse(raw).with_context(|| format!("invalid id '{raw}'"))
}

fn parse_representative(raw: &str, primary: bool) -> anyhow::Result<NewRepresentative> {
    let (name, relationship) = raw
        .rsplit_once(':')
        .with_context(|| format!("representative '{raw}' must be NAME:RELATIONSHIP"))?;
    let relationship: Relationship = relationship.parse().map_err(anyhow::Error::msg)?;
    Ok(NewRepresentative {
        full_name: name.trim().to_string(),
        relationship,
        phone: None,
        email: None,
        primary,
    })
}

fn print_report(report: &TransitionReport) {
    println!(
        "{} {} {}: {} changed, {} already {}",
        report.direction,
        report.root_kind,
        report.root_id,
        report.changed.total(),
        report.unchanged.total(),
        report.direction.past_tense()
    );
    for failure in &report.failures {
        println!("  failed: {failure}");
    }
}

fn print_preview(preview: &CascadePreview) {
    if let Some(name) = &preview.patient_name {
        println!("  patient:         {name}");
    }
    println!(
        "  medical history: {}",
        if preview.medical_history { "yes" } else { "no" }
    );
    println!("  consultations:   {}", preview.consultations);
    println!("  prescriptions:   {}", preview.prescriptions);
    println!("  representatives: {}", preview.representatives);
}
