//! Patterns command - list the disallowed API table

use anyhow::Result;
use console::style;
use nodelint::config::ProjectConfig;
use nodelint::detectors::builtin_patterns;

pub fn run(config: &ProjectConfig) -> Result<()> {
    let detector = config.security_detector();
    let builtin = builtin_patterns().len();

    println!("{}", style("Disallowed API patterns").bold());
    for (i, pattern) in detector.patterns().enumerate() {
        let origin = if i < builtin { "" } else { " (config)" };
        println!(
            "{:>3}. {}{}\n     {}",
            i + 1,
            style(pattern.pattern()).cyan(),
            style(origin).dim(),
            pattern.message()
        );
    }

    if !config.is_detector_enabled("security") {
        println!(
            "\n{} the security detector is disabled by config",
            style("note:").yellow()
        );
    }
    Ok(())
}
