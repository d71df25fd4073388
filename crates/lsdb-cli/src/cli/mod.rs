mod commands;
mod helpers;

use clap::Parser;
use lsdb_core::domain::LsdbError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let error = error.as_lsdb_error();
            eprintln!("{}", error.diagnostic_line());
            if let Some(summary_line) = error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("lsdb".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();

    match Cli::try_parse_from(&full_args) {
        Ok(cli) => {
            init_logging(cli.log_level.as_deref())?;
            dispatch_parsed(cli.db, cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

fn init_logging(level: Option<&str>) -> Result<(), CliError> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|error| CliError::Usage(format!("invalid --log-level '{level}': {error}")))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    // A subscriber may already be installed when `run` is called repeatedly.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

#[derive(Parser)]
#[command(name = "lsdb", version, about = "Spectral line-shape database")]
struct Cli {
    /// Line-shape database file
    #[arg(long, global = true, default_value = "lsdb.json")]
    db: PathBuf,

    /// Log filter (e.g. `debug`, `lsdb_core=trace`); overrides RUST_LOG
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Create an empty database
    Init,
    /// Print models, environments, radiators, lines and datasets
    Info(commands::InfoArgs),
    /// Add a theoretical model
    AddModel(commands::NamedArgs),
    /// Add a plasma environment
    AddEnvironment(commands::NamedArgs),
    /// Add a radiating species
    AddRadiator(commands::AddRadiatorArgs),
    /// Add a spectral line of a radiator
    AddLine(commands::AddLineArgs),
    /// Add a line shape computed at given density and temperature
    AddDataset(commands::AddDatasetArgs),
    /// Delete an entity and everything that depends on it
    Delete(commands::DeleteArgs),
    /// Print a stored dataset
    Dataset(commands::DatasetArgs),
    /// Interpolate a line shape at arbitrary density and temperature
    Interpolate(commands::InterpolateArgs),
    /// Morph between two line shapes read from text files
    Morph(commands::MorphArgs),
}

fn dispatch_parsed(db: PathBuf, command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Init => commands::run_init_command(&db),
        CliCommand::Info(args) => commands::run_info_command(&db, args),
        CliCommand::AddModel(args) => commands::run_add_model_command(&db, args),
        CliCommand::AddEnvironment(args) => commands::run_add_environment_command(&db, args),
        CliCommand::AddRadiator(args) => commands::run_add_radiator_command(&db, args),
        CliCommand::AddLine(args) => commands::run_add_line_command(&db, args),
        CliCommand::AddDataset(args) => commands::run_add_dataset_command(&db, args),
        CliCommand::Delete(args) => commands::run_delete_command(&db, args),
        CliCommand::Dataset(args) => commands::run_dataset_command(&db, args),
        CliCommand::Interpolate(args) => commands::run_interpolate_command(&db, args),
        CliCommand::Morph(args) => commands::run_morph_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Core(LsdbError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_lsdb_error(&self) -> LsdbError {
        match self {
            Self::Usage(message) => LsdbError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Core(error) => error.clone(),
            Self::Internal(error) => LsdbError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
