//! Init command - write an example nodelint.toml

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

const EXAMPLE_CONFIG: &str = r#"# nodelint configuration

[validator]
# Function the runtime invokes
entry_function = "processData"

# Per-script timeout in milliseconds (0 disables)
timeout_ms = 5000

# Detectors: structure, output-coverage, security, heuristics
# [detectors.heuristics]
# enabled = false

# Extra disallowed APIs, checked after the built-in table
# [[security.extra_patterns]]
# pattern = '\bfetch\s*\('
# message = "fetch() is not available in the sandbox"

[defaults]
# Output format (text, json)
format = "text"

# Exit with code 1 when a finding at this severity or higher exists (error, warning, info)
fail_on = "error"
"#;

/// Run the init command
pub fn run(path: &Path, force: bool) -> Result<()> {
    let dir = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;

    if !dir.is_dir() {
        anyhow::bail!("Path is not a directory: {}", dir.display());
    }

    let config_path = dir.join("nodelint.toml");
    if config_path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    Ok(())
}
