use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use gluco_client::OntimizeClient;
use gluco_core::memory::InMemoryApi;
use gluco_core::{
    record_reading, ClientConfig, GlucoApi, NonEmptyText, Notification,
    PatientDetailView, PatientForm, PatientId, PatientInput, PatientListView, ReadingInput,
    RouteGuard, Session, SessionGuard, Sex, TimeSlot,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod render;

/// User attached to the session in demo mode.
const DEMO_USER: &str = "demo";

#[derive(Parser)]
#[command(name = "gluco")]
#[command(about = "Glucose clinic patient pages on the command line")]
struct Cli {
    /// Use a built-in in-memory record store instead of the record API
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List patients
    List {
        /// Only patients whose name contains this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a patient's detail page
    Show {
        /// Patient id
        id: PatientId,
    },
    /// Create a patient
    Create(PatientArgs),
    /// Update a patient; only the given fields change
    Update {
        /// Patient id
        id: PatientId,
        #[command(flatten)]
        fields: PatientArgs,
    },
    /// Record a glucose reading
    AddReading {
        /// Patient id
        id: PatientId,
        /// breakfast, lunch, dinner or bedtime
        slot: TimeSlot,
        /// mg/dL
        value: f64,
        /// Reading date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Args)]
struct PatientArgs {
    #[arg(long)]
    name: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long)]
    birth_date: Option<NaiveDate>,
    /// M or F
    #[arg(long)]
    sex: Option<Sex>,
    /// Kilograms
    #[arg(long)]
    weight: Option<f64>,
    /// Centimetres
    #[arg(long)]
    height: Option<f64>,
    /// Percent
    #[arg(long)]
    hba1c: Option<f64>,
    /// mg/dL
    #[arg(long)]
    creatinine: Option<f64>,
    /// Years since diagnosis
    #[arg(long)]
    duration: Option<f64>,
    #[arg(long)]
    cad: Option<bool>,
    #[arg(long)]
    ckd: Option<bool>,
    #[arg(long)]
    hld: Option<bool>,
    /// A reading as SLOT=VALUE, e.g. lunch=142; may be repeated
    #[arg(long = "reading", value_parser = parse_reading)]
    readings: Vec<ReadingInput>,
}

impl From<PatientArgs> for PatientInput {
    fn from(args: PatientArgs) -> Self {
        PatientInput {
            name: args.name,
            birth_date: args.birth_date,
            patient_sex: args.sex,
            weight: args.weight,
            height: args.height,
            hba1c: args.hba1c,
            creatine_mg_dl: args.creatinine,
            duration: args.duration,
            cad: args.cad,
            ckd: args.ckd,
            hld: args.hld,
            readings: args.readings,
        }
    }
}

fn parse_reading(raw: &str) -> Result<ReadingInput, String> {
    let (slot, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT=VALUE, got {raw:?}"))?;
    let slot = slot.parse::<TimeSlot>().map_err(|e| e.to_string())?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid reading value {value:?}"))?;
    Ok(ReadingInput {
        slot,
        value,
        date: None,
    })
}

/// The record API and the session used to reach it.
fn connect(demo: bool) -> anyhow::Result<(Box<dyn GlucoApi>, Option<Session>)> {
    if demo {
        let user = NonEmptyText::new(DEMO_USER)?;
        return Ok((Box::new(InMemoryApi::demo()), Some(Session::new(user, ""))));
    }

    let config = ClientConfig::from_env_values(
        std::env::var("GLUCO_API_ENDPOINT").ok(),
        std::env::var("GLUCO_API_USER").ok(),
        std::env::var("GLUCO_API_PASSWORD").ok(),
        std::env::var("GLUCO_API_TIMEOUT_SECS").ok(),
    )?;
    let session = config
        .username()
        .map(NonEmptyText::new)
        .transpose()?
        .map(|user| Session::new(user, config.password().unwrap_or_default()));
    let client = OntimizeClient::new(&config)?;
    Ok((Box::new(client), session))
}

fn report(notification: Option<&Notification>) {
    if let Some(note) = notification {
        if note.is_error() {
            eprintln!("{}", note.message);
        } else {
            println!("{}", note.message);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("gluco=warn".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'gluco --help' for commands");
        return Ok(());
    };

    let (api, session) = connect(cli.demo)?;
    SessionGuard
        .authorize(session.as_ref(), Utc::now())
        .context("set GLUCO_API_USER (and GLUCO_API_PASSWORD) or pass --demo")?;
    let api = api.as_ref();

    match command {
        Commands::List { search } => {
            let mut view = PatientListView::new();
            if view.load(api).await.is_err() {
                report(view.notification());
                anyhow::bail!("could not list patients");
            }
            let options = view.search(search.as_deref().unwrap_or_default());
            print!("{}", render::patient_list(&options));
        }
        Commands::Show { id } => {
            let mut view = PatientDetailView::new();
            if view.select_patient(api, id).await.is_err() {
                report(view.state().notification.as_ref());
                anyhow::bail!("could not load patient {id}");
            }
            print!("{}", render::patient_detail(view.state()));
        }
        Commands::Create(fields) => {
            let mut form = PatientForm::new();
            form.apply(fields.into());
            let result = form.submit(api).await;
            report(form.notification());
            let id = result?;
            println!("Patient ID: {id}, {}", form.bmi_label());
        }
        Commands::Update { id, fields } => {
            let mut form = match PatientForm::load_for_edit(api, id).await {
                Ok(form) => form,
                Err(e) => {
                    report(Some(&Notification::failure(&e)));
                    return Err(e.into());
                }
            };
            form.apply(fields.into());
            let result = form.submit(api).await;
            report(form.notification());
            result?;
        }
        Commands::AddReading {
            id,
            slot,
            value,
            date,
        } => {
            let input = ReadingInput { slot, value, date };
            match record_reading(api, id, &input).await {
                Ok(reading) => println!("Recorded reading {reading} for patient {id}"),
                Err(e) => {
                    report(Some(&Notification::failure(&e)));
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_parse_from_slot_value_pairs() {
        let reading = parse_reading("Lunch=142").unwrap();
        assert_eq!(reading.slot, TimeSlot::Lunch);
        assert_eq!(reading.value, 142.0);
        assert!(parse_reading("lunch").is_err());
        assert!(parse_reading("brunch=100").is_err());
        assert!(parse_reading("dinner=lots").is_err());
    }

    #[test]
    fn update_arguments_parse() {
        let cli = Cli::try_parse_from([
            "gluco", "--demo", "update", "2", "--weight", "80", "--cad", "true", "--reading",
            "bedtime=150",
        ])
        .unwrap();
        assert!(cli.demo);
        let Some(Commands::Update { id, fields }) = cli.command else {
            panic!("expected update");
        };
        assert_eq!(id, 2);
        let input = PatientInput::from(fields);
        assert_eq!(input.weight, Some(80.0));
        assert_eq!(input.cad, Some(true));
        assert_eq!(input.name, None);
        assert_eq!(input.readings.len(), 1);
    }

    #[test]
    fn demo_mode_opens_a_session() {
        let (_, session) = connect(true).unwrap();
        assert!(SessionGuard.authorize(session.as_ref(), Utc::now()).is_ok());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
