// inciscope CLI - headless concentration estimates for ingredient declarations

mod context;
mod estimate;
mod exit_codes;

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use estimate::{EstimateArgs, ResolveArgs, ValidateArgs};
use exit_codes::{estimate_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "inciscope")]
#[command(about = "Estimate ingredient concentrations from a declared ingredient list")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Log verbosity on stderr (RUST_LOG takes precedence when set)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate a percentage for every ingredient in a declaration
    #[command(after_help = "\
Examples:
  inciscope estimate -p serum -i 'Water, Glycerin, Niacinamide, Phenoxyethanol'
  inciscope estimate -p serum -i 'Aqua, Glycerin, Niacinamide' --known Niacinamide=5
  inciscope estimate -p cream --file label.txt --json
  inciscope estimate -p toner --file label.txt --csv > toner.csv
  cat label.txt | inciscope estimate -p serum --file -")]
    Estimate(EstimateArgs),

    /// Parse and validate a formula context file
    #[command(after_help = "\
Examples:
  inciscope validate --context skincare.toml
  INCISCOPE_CONTEXT=skincare.toml inciscope validate")]
    Validate(ValidateArgs),

    /// Show how ingredient names resolve against the context catalog
    #[command(after_help = "\
Examples:
  inciscope resolve Aqua 'Tocopherol (Vitamin E)' Glycerine
  inciscope resolve --json Parfum")]
    Resolve(ResolveArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  inciscope-estimate ", env!("CARGO_PKG_VERSION"),
        "\ncontext: --context, $INCISCOPE_CONTEXT, or <config dir>/inciscope/context.toml",
    )
}

/// Stderr subscriber. Engine `log` records arrive through the tracing-log bridge.
fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Engine error with its registry exit code.
    pub fn estimate(err: inciscope_estimate::EstimateError) -> Self {
        let code = estimate_exit_code(&err);
        let hint = match &err {
            inciscope_estimate::EstimateError::UnknownProfile(_) => {
                Some("run `inciscope validate` to list the context's profiles".to_string())
            }
            inciscope_estimate::EstimateError::UnresolvedAnchor { .. } => {
                Some("use the name as declared, or check it with `inciscope resolve`".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: inciscope <command> [options]");
            eprintln!("       inciscope --help for more information");
            Ok(())
        }
        Some(Commands::Estimate(args)) => estimate::cmd_estimate(args),
        Some(Commands::Validate(args)) => estimate::cmd_validate(args),
        Some(Commands::Resolve(args)) => estimate::cmd_resolve(args),
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
