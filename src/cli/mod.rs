//! CLI command definitions and handlers

mod check;
mod init;
mod patterns;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use nodelint::config::{load_config_file, load_project_config, ProjectConfig};
use nodelint::SocketDefinition;
use std::path::{Path, PathBuf};
use tracing::debug;

/// nodelint - validate custom-node scripts before they are saved
///
/// Nothing is executed: scripts are parsed and checked statically.
#[derive(Parser, Debug)]
#[command(name = "nodelint")]
#[command(
    version,
    about = "Static validator for custom-node JavaScript: contract, outputs and sandbox-safety checks",
    after_help = "\
Examples:
  nodelint check script.js -o Result:number         Validate a script against one output
  nodelint check a.js b.js -o Out -i Text:text      Several scripts, same sockets
  nodelint node nodes/*.json --format json          Validate node definition files
  nodelint check script.js --fail-on warning        Exit code 1 on warnings too (CI mode)
  nodelint patterns                                 List disallowed API patterns"
)]
pub struct Cli {
    /// Config file (default: nodelint.toml or .nodelintrc.json in the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by the validating commands
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Output format: text, json (default: from config, else text)
    #[arg(long, short = 'f', value_parser = ["text", "json"])]
    pub format: Option<String>,

    /// Exit with code 1 if findings at this severity or higher exist
    /// (default: from config, else error)
    #[arg(long, value_parser = ["error", "warning", "info"])]
    pub fail_on: Option<String>,

    /// Per-script timeout in milliseconds, 0 disables (default: from config, else 5000)
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate JavaScript files against output/input sockets given as flags
    #[command(after_help = "\
Socket syntax is NAME or NAME:TYPE, TYPE one of text, number, boolean, json, array, any.

Examples:
  nodelint check transform.js -o Total:number -o Label:text
  nodelint check transform.js -o Total -i Price:number -i Qty:number")]
    Check {
        /// Script files to validate
        #[arg(required = true, value_name = "SCRIPT")]
        scripts: Vec<PathBuf>,

        /// Declared output socket (repeatable)
        #[arg(short = 'o', long = "output", value_name = "NAME[:TYPE]")]
        outputs: Vec<SocketDefinition>,

        /// Declared input socket (repeatable); enables the undeclared-input check
        #[arg(short = 'i', long = "input", value_name = "NAME[:TYPE]")]
        inputs: Vec<SocketDefinition>,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Validate custom-node definition files
    ///
    /// Each file is a JSON object: { "name", "code" | "script", "outputs": [...], "inputs": [...] }
    Node {
        /// Definition files to validate
        #[arg(required = true, value_name = "DEFINITION.json")]
        definitions: Vec<PathBuf>,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// List the disallowed API patterns, including configured extras
    Patterns,

    /// Write an example nodelint.toml
    Init {
        /// Directory to write into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing nodelint.toml
        #[arg(long)]
        force: bool,
    },
}

/// Explicit `--config` must load; discovered files fall back to defaults
fn load_config(explicit: Option<&Path>) -> Result<ProjectConfig> {
    match explicit {
        Some(path) => {
            let config = load_config_file(path)
                .with_context(|| format!("Could not load --config {}", path.display()))?;
            debug!("Loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(load_project_config(Path::new("."))),
    }
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path, force } => init::run(&path, force),

        Commands::Patterns => {
            let config = load_config(cli.config.as_deref())?;
            patterns::run(&config)
        }

        Commands::Check {
            scripts,
            outputs,
            inputs,
            report,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let inputs = (!inputs.is_empty()).then_some(inputs);
            check::run_scripts(&config, &scripts, &outputs, inputs.as_deref(), &report)
        }

        Commands::Node {
            definitions,
            report,
        } => {
            let config = load_config(cli.config.as_deref())?;
            check::run_definitions(&config, &definitions, &report)
        }
    }
}
