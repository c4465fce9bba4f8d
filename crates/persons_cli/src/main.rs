//! Persons command-line interface.
//!
//! # Responsibility
//! - Map subcommands onto core handler requests.
//! - Print responses as pretty JSON and failures as `code: message`.

use clap::{Args, Parser, Subcommand};
use log::info;
use persons_core::db::DbError;
use persons_core::model::{EntityId, RelationshipType};
use persons_core::service::{
    AddRelationship, CreatePerson, DeletePerson, DeleteRelationship, GetPersonById,
    GetPersonsFiltered, GetRelationshipReport, UpdatePerson, UploadOrChangeImage,
};
use persons_core::{
    dispatch, init_logging, AppError, ConfigError, CoreConfig, HandlerContext, LocalFileStorage,
    LoggingError, RepoError, Store,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "persons")]
#[command(about = "Persons directory backed by SQLite", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Person operations
    #[command(subcommand)]
    Person(PersonCommand),
    /// Relationship operations
    #[command(subcommand)]
    Relationship(RelationshipCommand),
    /// Relationship counts per person and type
    Report {
        #[arg(long)]
        person_id: Option<EntityId>,
    },
}

#[derive(Debug, Subcommand)]
enum PersonCommand {
    /// Create a person from a JSON request file
    Create {
        #[arg(long)]
        json: PathBuf,
    },
    /// Update a person from a JSON request file
    Update {
        #[arg(long)]
        json: PathBuf,
    },
    Get {
        id: EntityId,
    },
    List(ListArgs),
    Delete {
        id: EntityId,
    },
    /// Upload or replace a person's image
    Image {
        id: EntityId,
        file: PathBuf,
    },
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    personal_number: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 10)]
    page_size: u32,
}

#[derive(Debug, Subcommand)]
enum RelationshipCommand {
    Add {
        person_id: EntityId,
        related_person_id: EntityId,
        /// colleague | acquaintance | relative | other
        #[arg(long = "type")]
        relationship_type: RelationshipType,
    },
    Delete {
        id: EntityId,
    },
}

/// Failure reported to the terminal.
struct Failure {
    code: &'static str,
    message: String,
}

impl Failure {
    fn new(code: &'static str, message: impl ToString) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }
}

impl From<AppError> for Failure {
    fn from(err: AppError) -> Self {
        Self::new(err.code(), &err)
    }
}

impl From<RepoError> for Failure {
    fn from(err: RepoError) -> Self {
        Self::new("store_unavailable", err)
    }
}

impl From<DbError> for Failure {
    fn from(err: DbError) -> Self {
        Self::new("store_unavailable", err)
    }
}

impl From<ConfigError> for Failure {
    fn from(err: ConfigError) -> Self {
        Self::new("invalid_config", err)
    }
}

impl From<LoggingError> for Failure {
    fn from(err: LoggingError) -> Self {
        Self::new("logging_failed", err)
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Self::new("invalid_json", err)
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(failure) = run(cli) {
        eprintln!("{}: {}", failure.code, failure.message);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Failure> {
    let config = CoreConfig::load(cli.config.as_deref())?;
    init_logging(&config.log)?;
    info!("event=cli_start module=cli status=ok version={}", persons_core::core_version());

    let store = Store::open(config.database_path.clone())?;
    let files = LocalFileStorage::new(config.image_dir.clone());
    let cancel = CancellationToken::new();
    let ctx = HandlerContext::new(&cancel, &files);
    let mut uow = store.unit_of_work()?;

    match cli.command {
        Commands::Person(command) => match command {
            PersonCommand::Create { json } => {
                let request: CreatePerson = read_json(&json)?;
                print_json(&dispatch(request, &mut uow, &ctx)?)
            }
            PersonCommand::Update { json } => {
                let request: UpdatePerson = read_json(&json)?;
                print_json(&dispatch(request, &mut uow, &ctx)?)
            }
            PersonCommand::Get { id } => print_json(&dispatch(GetPersonById { id }, &mut uow, &ctx)?),
            PersonCommand::List(args) => {
                let request = GetPersonsFiltered {
                    first_name: args.first_name,
                    last_name: args.last_name,
                    personal_number: args.personal_number,
                    page_number: args.page,
                    page_size: args.page_size,
                };
                print_json(&dispatch(request, &mut uow, &ctx)?)
            }
            PersonCommand::Delete { id } => {
                print_json(&dispatch(DeletePerson { person_id: id }, &mut uow, &ctx)?)
            }
            PersonCommand::Image { id, file } => {
                let bytes = std::fs::read(&file)
                    .map_err(|err| Failure::new("invalid_input", format!("{}: {err}", file.display())))?;
                let file_name = file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let request = UploadOrChangeImage {
                    person_id: id,
                    file_name,
                    bytes,
                };
                print_json(&dispatch(request, &mut uow, &ctx)?)
            }
        },
        Commands::Relationship(command) => match command {
            RelationshipCommand::Add {
                person_id,
                related_person_id,
                relationship_type,
            } => {
                let request = AddRelationship {
                    person_id,
                    related_person_id,
                    relationship_type,
                };
                print_json(&dispatch(request, &mut uow, &ctx)?)
            }
            RelationshipCommand::Delete { id } => print_json(&dispatch(
                DeleteRelationship {
                    relationship_id: id,
                },
                &mut uow,
                &ctx,
            )?),
        },
        Commands::Report { person_id } => {
            print_json(&dispatch(GetRelationshipReport { person_id }, &mut uow, &ctx)?)
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Failure> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| Failure::new("invalid_input", format!("{}: {err}", path.display())))?;
    Ok(serde_json::from_str(&raw)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Failure> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
