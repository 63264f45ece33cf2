//! Check and node commands - validate scripts and node definition files

use super::ReportArgs;
use anyhow::{Context, Result};
use console::style;
use nodelint::config::ProjectConfig;
use nodelint::reporters::report_many;
use nodelint::{DetectorEngine, FindingsSummary, OutputFormat, Severity, SocketDefinition, ValidationResult};
use rayon::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// A custom-node definition as stored on disk
#[derive(Debug, Deserialize)]
struct NodeDefinition {
    #[serde(default)]
    name: Option<String>,
    #[serde(alias = "script")]
    code: String,
    #[serde(default)]
    outputs: Vec<SocketDefinition>,
    #[serde(default)]
    inputs: Option<Vec<SocketDefinition>>,
}

/// Effective settings after merging flags over config defaults
struct RunSettings {
    engine: DetectorEngine,
    format: OutputFormat,
    fail_on: Severity,
}

impl RunSettings {
    fn resolve(config: &ProjectConfig, args: &ReportArgs) -> Result<Self> {
        let mut config = config.clone();
        if let Some(ms) = args.timeout_ms {
            config.validator.timeout_ms = ms;
        }

        let format = args
            .format
            .as_deref()
            .or(config.defaults.format.as_deref())
            .map(OutputFormat::from_str)
            .transpose()
            .context("Invalid output format")?
            .unwrap_or_default();
        let fail_on = args
            .fail_on
            .as_deref()
            .or(config.defaults.fail_on.as_deref())
            .map(Severity::from_str)
            .transpose()
            .context("Invalid fail-on severity")?
            .unwrap_or(Severity::Error);

        let engine = config.build_engine();
        debug!(
            "Detectors: {:?}, entry: {}, timeout: {:?}",
            engine.detector_names(),
            engine.entry_function(),
            engine.timeout()
        );
        Ok(Self {
            engine,
            format,
            fail_on,
        })
    }
}

/// Run the check command
pub fn run_scripts(
    config: &ProjectConfig,
    scripts: &[PathBuf],
    outputs: &[SocketDefinition],
    inputs: Option<&[SocketDefinition]>,
    args: &ReportArgs,
) -> Result<()> {
    let settings = RunSettings::resolve(config, args)?;

    let results = scripts
        .par_iter()
        .map(|path| {
            let source = read_source(path)?;
            let result = settings.engine.validate_guarded(&source, outputs, inputs);
            Ok((path.display().to_string(), result))
        })
        .collect::<Result<Vec<_>>>()?;

    finish(&settings, &results)
}

/// Run the node command
pub fn run_definitions(config: &ProjectConfig, definitions: &[PathBuf], args: &ReportArgs) -> Result<()> {
    let settings = RunSettings::resolve(config, args)?;

    let results = definitions
        .par_iter()
        .map(|path| {
            let node = read_definition(path)?;
            let label = match &node.name {
                Some(name) => format!("{} ({name})", path.display()),
                None => path.display().to_string(),
            };
            let result = settings
                .engine
                .validate_guarded(&node.code, &node.outputs, node.inputs.as_deref());
            Ok((label, result))
        })
        .collect::<Result<Vec<_>>>()?;

    finish(&settings, &results)
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_definition(path: &Path) -> Result<NodeDefinition> {
    let content = read_source(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid node definition in {}", path.display()))
}

/// Print the report, a summary line on stderr, and apply the fail-on threshold
fn finish(settings: &RunSettings, results: &[(String, ValidationResult)]) -> Result<()> {
    let rendered = report_many(results, settings.format)?;
    print!("{rendered}");
    if !rendered.ends_with('\n') {
        println!();
    }

    let total = results.iter().fold(FindingsSummary::default(), |mut acc, (_, r)| {
        let s = r.summary();
        acc.error += s.error;
        acc.warning += s.warning;
        acc.info += s.info;
        acc.total += s.total;
        acc
    });
    print_summary(results.len(), &total);

    let failing = results
        .iter()
        .filter(|(_, r)| r.max_severity().is_some_and(|s| s >= settings.fail_on))
        .count();
    if failing > 0 {
        info!("{} of {} scripts at or above {}", failing, results.len(), settings.fail_on);
        eprintln!("Failing due to --fail-on={} threshold", settings.fail_on);
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(scripts: usize, total: &FindingsSummary) {
    let noun = if scripts == 1 { "script" } else { "scripts" };
    let marker = if total.error > 0 {
        style("✗").red().bold()
    } else if total.warning > 0 {
        style("!").yellow().bold()
    } else {
        style("✓").green().bold()
    };
    eprintln!(
        "{} {} {} checked: {} errors, {} warnings, {} notes",
        marker,
        scripts,
        noun,
        style(total.error).red(),
        style(total.warning).yellow(),
        style(total.info).dim()
    );
}
