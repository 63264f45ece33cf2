//! Configuration module for nodelint
//!
//! This module handles:
//! - Project-level configuration (nodelint.toml, .nodelintrc.json)
//! - Per-detector enable/disable switches
//! - Extra security patterns
//! - CLI defaults

mod project_config;

pub use project_config::{
    load_config_file, load_project_config, normalize_detector_name, CliDefaults, ConfigError,
    DetectorConfigOverride, PatternConfig, ProjectConfig, SecurityConfig, ValidatorSettings,
    CONFIG_FILE_NAMES,
};
