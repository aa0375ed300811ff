// StepGrid CLI - run, replay and inspect step analyses over CSV data

mod commands;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use stepgrid_config::Settings;
use stepgrid_engine::StepError;
use stepgrid_io::IoError;

use exit_codes::{io_exit_code, step_exit_code, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "stepgrid")]
#[command(about = "Replayable step analyses over tabular data (headless)")]
#[command(version)]
struct Cli {
    /// Settings file (default: the user config directory)
    #[arg(long, global = true, env = "STEPGRID_CONFIG")]
    config: Option<PathBuf>,

    /// Log every step at debug level
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that loads data
#[derive(clap::Args, Clone)]
pub struct DataArgs {
    /// CSV files to load, one dataframe each (repeatable)
    #[arg(long, short = 'd', required = true, value_name = "CSV")]
    pub data: Vec<PathBuf>,

    /// CSV delimiter (default: sniffed, or from settings)
    #[arg(long)]
    pub delimiter: Option<char>,
}

/// Options controlling what a command prints or writes after executing
#[derive(clap::Args, Clone)]
pub struct OutputArgs {
    /// Print the generated pandas code
    #[arg(long)]
    pub code: bool,

    /// Leave out description comments from generated code
    #[arg(long)]
    pub no_comments: bool,

    /// Keep every filter line, even ones a later filter replaces
    #[arg(long)]
    pub no_optimize: bool,

    /// Write each sheet's visible rows as <DIR>/<df_name>.csv
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Print a JSON summary instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute step requests against CSV data
    #[command(after_help = "\
Examples:
  stepgrid run -d sales.csv --steps steps.json --code
  stepgrid run -d sales.csv --steps steps.json --save analysis.json
  cat steps.json | stepgrid run -d sales.csv --steps -")]
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// JSON array of step requests ('-' for stdin)
        #[arg(long, value_name = "FILE")]
        steps: PathBuf,

        /// Save the resulting analysis
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Re-execute a saved analysis against CSV data
    #[command(after_help = "\
Examples:
  stepgrid replay analysis.json -d sales.csv --code
  stepgrid replay analysis.json -d sales.csv --export out/")]
    Replay {
        /// Saved analysis file
        analysis: PathBuf,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print the params of the most recent matching step of an analysis
    #[command(after_help = "\
Examples:
  stepgrid params analysis.json -d sales.csv --step-type graph --step-id 3f2a...
  stepgrid params analysis.json -d sales.csv --step-type pivot --match destination_sheet_index=1")]
    Params {
        /// Saved analysis file
        analysis: PathBuf,

        #[command(flatten)]
        data: DataArgs,

        /// Step type to look for
        #[arg(long)]
        step_type: String,

        /// Step id to match
        #[arg(long, default_value = "")]
        step_id: String,

        /// Execution data to match, as key=json (repeatable)
        #[arg(long = "match", value_name = "KEY=JSON")]
        matches: Vec<String>,
    },

    /// List registered step types and their versions
    StepTypes,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => return report(err),
    };
    init_logging(&settings, cli.verbose);

    let result = match cli.command {
        Commands::Run { data, steps, save, output } => {
            commands::cmd_run(&settings, &data, &steps, save.as_deref(), &output)
        }
        Commands::Replay { analysis, data, output } => {
            commands::cmd_replay(&settings, &analysis, &data, &output)
        }
        Commands::Params { analysis, data, step_type, step_id, matches } => {
            commands::cmd_params(&settings, &analysis, &data, step_type, step_id, &matches)
        }
        Commands::StepTypes => commands::cmd_step_types(),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => report(err),
    }
}

fn report(CliError { code, message, hint }: CliError) -> ExitCode {
    if !message.is_empty() {
        eprintln!("error: {}", message);
    }
    if let Some(hint) = hint {
        eprintln!("hint:  {}", hint);
    }
    ExitCode::from(code)
}

fn load_settings(path: Option<&std::path::Path>) -> Result<Settings, CliError> {
    match path {
        Some(path) => Settings::load_from(path).map_err(|e| {
            CliError::args(e.to_string()).with_hint(format!(
                "default settings live at {}",
                Settings::config_path_display()
            ))
        }),
        None => Ok(Settings::load()),
    }
}

/// `RUST_LOG` wins over settings; `--verbose` wins over both.
fn init_logging(settings: &Settings, verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(settings.log.level.to_level_filter())
        .parse_default_env()
        .format_timestamp_millis();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    let _ = builder.try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<StepError> for CliError {
    fn from(err: StepError) -> Self {
        let hint = match &err {
            StepError::UnknownStepType(_) => Some("run `stepgrid step-types` to list step types".to_string()),
            StepError::UnsupportedStepVersion { .. } => {
                Some("the analysis was written by a newer stepgrid".to_string())
            }
            _ => None,
        };
        Self { code: step_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        Self { code: io_exit_code(&err), message: err.to_string(), hint: None }
    }
}
