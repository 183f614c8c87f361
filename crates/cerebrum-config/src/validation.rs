// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! All problems are collected and reported together.

use std::collections::HashSet;

use crate::{CerebrumConfig, ConfigError, ConfigResult};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const LOG_FORMATS: &[&str] = &["text", "json"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
    DuplicateRegion { region: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::DuplicateRegion { region } => {
                write!(f, "Region '{}' listed more than once in census.regions", region)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Non-empty cache keys
/// - A storage table name usable as a bare SQL identifier
/// - Known log level and format
/// - Positive run retention
/// - Non-empty census region names
///
/// Duplicate regions are not errors; see [`config_warnings`].
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &CerebrumConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_required_fields(config, &mut errors);
    validate_storage(config, &mut errors);
    validate_logging(config, &mut errors);
    validate_regions(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_required_fields(config: &CerebrumConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.cache.dataset.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "cache.dataset".to_string(),
        });
    }
    if config.cache.metadata_key.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "cache.metadata_key".to_string(),
        });
    }
    if config.cache.download_base.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "cache.download_base".to_string(),
        });
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_storage(config: &CerebrumConfig, errors: &mut Vec<ConfigValidationError>) {
    if !is_sql_identifier(&config.storage.table) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "storage.table".to_string(),
            reason: format!(
                "'{}' must start with a letter or underscore and contain only letters, digits and underscores",
                config.storage.table
            ),
        });
    }
    if config.storage.path.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "storage.path".to_string(),
        });
    }
}

fn validate_logging(config: &CerebrumConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.system.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "system.log_level".to_string(),
            reason: format!("must be one of {}", LOG_LEVELS.join(", ")),
        });
    }
    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.format".to_string(),
            reason: "must be 'text' or 'json'".to_string(),
        });
    }
    if config.logging.retention_runs == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.retention_runs".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
}

fn validate_regions(config: &CerebrumConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.census.regions.iter().any(|r| r.trim().is_empty()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "census.regions".to_string(),
            reason: "region names must be non-empty".to_string(),
        });
    }
}

/// Problems worth reporting that do not stop a run
///
/// A region listed more than once is censused once; each repeated name is
/// reported a single time.
pub fn config_warnings(config: &CerebrumConfig) -> Vec<ConfigValidationError> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    config
        .census
        .regions
        .iter()
        .filter(|region| !region.trim().is_empty())
        .filter(|region| !seen.insert(region.as_str()) && reported.insert(region.as_str()))
        .map(|region| ConfigValidationError::DuplicateRegion {
            region: region.clone(),
        })
        .collect()
}
