// fsheet - headless forecast sheet: replay key scripts against a sheet file

mod exit_codes;
mod script;
mod sheet_file;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use forecast_config::Settings;
use forecast_core::{validate_variable_name, VariableId};
use forecast_engine::{SheetError, SheetStore};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE, EXIT_VALIDATION};
use script::RunError;
use sheet_file::SheetFile;

#[derive(Parser)]
#[command(name = "fsheet")]
#[command(about = "Forecast sheet (headless): replay editing sessions against a sheet file")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to <config dir>/forecast-sheet/settings.json)
    #[arg(long, global = true, env = "FSHEET_SETTINGS")]
    settings: Option<PathBuf>,

    /// Log navigation, editor and store activity to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a key script against a sheet and print the resulting variables
    #[command(after_help = "\
Script lines (blank lines and # comments are skipped):
  select <var> <YYYY-MM>             select-sub <var> <name> <YYYY-MM>
  key <Key>                          e.g. key 5, key Enter, key Shift+Tab, key Ctrl+Z
  type <text>                        paste <values, \\t and \\n escapes>
  choose <actual|projected|both>     mode <basic|expression>
  expand|hide|show <var>             toggle, click-outside, undo, redo
  rename <var> <title>               create <title>, delete <var>

Variables are named by id or title.

Example:
  fsheet replay plan.json edits.txt > result.json")]
    Replay {
        /// Sheet file (JSON: today, start, end, variables, expanded, hidden)
        sheet: PathBuf,

        /// Key script
        script: PathBuf,

        /// Write the result here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Check whether a name is acceptable for a variable in a sheet
    CheckName {
        /// Sheet file whose variables the name must not collide with
        sheet: PathBuf,

        /// Candidate name
        name: String,

        /// Id of the variable being renamed (its own title does not collide)
        #[arg(long)]
        ignore: Option<String>,
    },

    /// Print the settings file path
    ConfigPath,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Replay { sheet, script, output } => {
            cmd_replay(&sheet, &script, output.as_deref(), cli.settings.as_deref())
        }
        Commands::CheckName { sheet, name, ignore } => cmd_check_name(&sheet, &name, ignore),
        Commands::ConfigPath => {
            println!("{}", Settings::config_path_display());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins unless `--verbose` is set.
fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::io(format!("settings file not found: {}", path.display())));
            }
            tracing::debug!(path = %path.display(), "loading settings");
            Ok(Settings::load_from(path))
        }
        None => Ok(Settings::load()),
    }
}

// ============================================================================
// replay
// ============================================================================

fn cmd_replay(
    sheet_path: &Path,
    script_path: &Path,
    output: Option<&Path>,
    settings_path: Option<&Path>,
) -> Result<(), CliError> {
    let settings = load_settings(settings_path)?;
    let file = SheetFile::load(sheet_path)?;

    let source = std::fs::read_to_string(script_path)
        .map_err(|e| CliError::io(format!("{}: {}", script_path.display(), e)))?;
    let commands = script::parse_script(&source).map_err(|e| {
        CliError::args(format!("{}: {}", script_path.display(), e))
            .with_hint("run `fsheet replay --help` for the script syntax")
    })?;

    let mut sheet = file.open(settings);
    let run_result = script::run(&mut sheet, &commands);
    for event in sheet.drain_events() {
        tracing::debug!(?event, "sheet event");
    }
    run_result.map_err(CliError::run)?;

    let store = sheet.store();
    let report = serde_json::json!({
        "variables": store.variables(),
        "updates": store.update_count(),
        "creates": store.create_count(),
        "deletes": store.delete_count(),
        "version": store.version(),
    });
    let text = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::io(format!("failed to serialize result: {}", e)))?;

    match output {
        Some(path) => std::fs::write(path, text + "\n")
            .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?,
        None => println!("{}", text),
    }

    tracing::info!(commands = commands.len(), updates = store.update_count(), "replay finished");
    Ok(())
}

// ============================================================================
// check-name
// ============================================================================

fn cmd_check_name(sheet_path: &Path, name: &str, ignore: Option<String>) -> Result<(), CliError> {
    let file = SheetFile::load(sheet_path)?;
    let ignore = ignore.map(VariableId::new);

    validate_variable_name(name, &file.variables, ignore.as_ref())
        .map_err(|e| CliError::validation(format!("'{}': {}", name, e)))?;

    println!("ok");
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

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
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self { code: EXIT_VALIDATION, message: msg.into(), hint: None }
    }

    /// Create error from a failed script run with the matching exit code.
    pub fn run(err: RunError) -> Self {
        let message = err.to_string();
        match err {
            RunError::UnknownVariable { .. } => {
                Self::args(message).with_hint("variables are named by id or title")
            }
            RunError::Sheet { error: SheetError::Validation(_), .. } => Self::validation(message),
            RunError::Sheet { error: SheetError::ReadOnly, .. } => {
                Self::io(message).with_hint("the sheet is read-only; drop \"readonly\" from the sheet file")
            }
            RunError::Sheet { .. } => Self::io(message),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
