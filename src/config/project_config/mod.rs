//! Project-level configuration support
//!
//! Loads per-project configuration from `nodelint.toml` or `.nodelintrc.json`
//! in the working directory, or from an explicit path.
//!
//! # Configuration Format
//!
//! ```toml
//! # nodelint.toml
//!
//! [validator]
//! entry_function = "processData"
//! timeout_ms = 5000        # 0 disables the timeout
//!
//! [detectors.heuristics]
//! enabled = false
//!
//! [[security.extra_patterns]]
//! pattern = '\bfetch\s*\('
//! message = "fetch() is not available in the sandbox"
//!
//! [defaults]
//! format = "text"
//! fail_on = "error"
//! ```

use crate::detectors::{
    default_detectors, detectors_with_security, DetectorEngine, SecurityDetector, SecurityPattern,
    ENTRY_FUNCTION,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// File names searched in the working directory, in order
pub const CONFIG_FILE_NAMES: &[&str] = &["nodelint.toml", ".nodelintrc.json"];

const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Project-level configuration loaded from nodelint.toml or similar
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub validator: ValidatorSettings,

    /// Per-detector configuration overrides
    #[serde(default)]
    pub detectors: HashMap<String, DetectorConfigOverride>,

    #[serde(default)]
    pub security: SecurityConfig,

    /// Default CLI flags
    #[serde(default)]
    pub defaults: CliDefaults,
}

/// Settings that shape every validation run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidatorSettings {
    /// Function the runtime invokes (default: processData)
    #[serde(default = "default_entry_function")]
    pub entry_function: String,

    /// Per-script timeout in milliseconds; 0 disables it (default: 5000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            entry_function: default_entry_function(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_entry_function() -> String {
    ENTRY_FUNCTION.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Configuration override for a specific detector
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DetectorConfigOverride {
    /// Whether the detector is enabled (default: true)
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// Checked after the built-in table
    #[serde(default)]
    pub extra_patterns: Vec<PatternConfig>,
}

/// A user-supplied disallowed-API pattern
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PatternConfig {
    pub pattern: String,
    pub message: String,
}

/// Default CLI flags that can be set in project config
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliDefaults {
    /// Default output format (text, json)
    #[serde(default)]
    pub format: Option<String>,

    /// Fail-on severity threshold for CI
    #[serde(default)]
    pub fail_on: Option<String>,
}

/// Load project configuration from a directory.
///
/// Searches for configuration files in this order:
/// 1. `nodelint.toml`
/// 2. `.nodelintrc.json`
///
/// Returns default configuration if no usable config file is found.
pub fn load_project_config(dir: &Path) -> ProjectConfig {
    for name in CONFIG_FILE_NAMES {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        match load_config_file(&path) {
            Ok(config) => {
                debug!("Loaded project config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("{}", e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

/// Load one configuration file; `.json` files are read as JSON, anything
/// else as TOML
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ProjectConfig {
    /// Check if a detector is enabled (defaults to true if not specified)
    pub fn is_detector_enabled(&self, name: &str) -> bool {
        let normalized = normalize_detector_name(name);

        self.detectors
            .get(&normalized)
            .or_else(|| self.detectors.get(name))
            .and_then(|c| c.enabled)
            .unwrap_or(true)
    }

    /// All detector names explicitly disabled
    pub fn disabled_detectors(&self) -> Vec<String> {
        let mut disabled: Vec<String> = self
            .detectors
            .iter()
            .filter(|(_, c)| c.enabled == Some(false))
            .map(|(name, _)| normalize_detector_name(name))
            .collect();
        disabled.sort();
        disabled
    }

    /// Configured timeout, `None` when `timeout_ms = 0`
    pub fn timeout(&self) -> Option<Duration> {
        match self.validator.timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Security detector with the configured extra patterns; invalid
    /// patterns are skipped
    pub fn security_detector(&self) -> SecurityDetector {
        let extra = self
            .security
            .extra_patterns
            .iter()
            .filter_map(|p| match SecurityPattern::new(&p.pattern, p.message.as_str()) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Skipping invalid security pattern {:?}: {}", p.pattern, e);
                    None
                }
            })
            .collect();
        SecurityDetector::with_extra_patterns(extra)
    }

    /// Engine with every enabled detector, the entry function and timeout
    pub fn build_engine(&self) -> DetectorEngine {
        let detectors = if self.security.extra_patterns.is_empty() {
            default_detectors()
        } else {
            detectors_with_security(self.security_detector())
        };

        let (enabled, skipped): (Vec<_>, Vec<_>) = detectors
            .into_iter()
            .partition(|d| self.is_detector_enabled(d.name()));
        for detector in &skipped {
            debug!("Detector {} disabled by config", detector.name());
        }

        DetectorEngine::builder()
            .detectors(enabled)
            .entry_function(self.validator.entry_function.clone())
            .timeout(self.timeout())
            .build()
    }
}

/// Normalize detector name for config lookup
/// Converts various formats to kebab-case for matching
pub fn normalize_detector_name(name: &str) -> String {
    // OutputCoverageDetector -> output-coverage
    // output_coverage -> output-coverage
    // output-coverage -> output-coverage

    let mut result = String::new();
    let chars: Vec<char> = name.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_is_lower = i > 0 && chars[i - 1].is_lowercase();
            let is_acronym_end = i > 0
                && chars[i - 1].is_uppercase()
                && i + 1 < chars.len()
                && chars[i + 1].is_lowercase();

            if prev_is_lower || is_acronym_end {
                result.push('-');
            }
            result.extend(c.to_lowercase());
        } else if *c == '_' {
            result.push('-');
        } else {
            result.push(*c);
        }
    }

    result.trim_end_matches("-detector").to_string()
}
