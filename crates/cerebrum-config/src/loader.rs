// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later tiers win:
//! 1. TOML file
//! 2. Environment variables (`CEREBRUM_*`)
//! 3. CLI arguments

use crate::{CerebrumConfig, ConfigError, ConfigResult, StorageBackend};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "cerebrum_configuration.toml";

/// Environment variable pointing at a configuration file
pub const CONFIG_PATH_ENV_VAR: &str = "CEREBRUM_CONFIG_PATH";

/// Find the Cerebrum configuration file
///
/// Search order:
/// 1. `CEREBRUM_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV_VAR) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV_VAR,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        search_paths.extend(cwd.ancestors().skip(1).take(5).map(|dir| dir.join(CONFIG_FILE_NAME)));
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Configuration file '{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV_VAR
    )))
}

/// Load configuration from a TOML file and apply overrides
///
/// * `config_path` - Config file; searched with [`find_config_file`] when `None`
/// * `cli_args` - Optional CLI argument overrides
///
/// Validation is left to the caller ([`crate::validate_config`]).
///
/// # Errors
///
/// Returns error if the config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<CerebrumConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: CerebrumConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_regions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Apply one `key = value` override. Unknown keys and unparsable values are ignored.
fn apply_override(config: &mut CerebrumConfig, key: &str, value: &str) {
    match key {
        "log_level" => config.system.log_level = value.to_string(),
        "max_threads" => {
            if let Ok(threads) = value.parse::<usize>() {
                config.system.max_threads = threads;
            }
        }
        "download_base" => config.cache.download_base = PathBuf::from(value),
        "dataset" => config.cache.dataset = value.to_string(),
        "metadata_key" => config.cache.metadata_key = value.to_string(),
        "regions" => config.census.regions = parse_regions(value),
        "parallel" => config.census.parallel = parse_bool(value),
        "taxonomy_file" => config.census.taxonomy_file = Some(PathBuf::from(value)),
        "storage_backend" => {
            if let Ok(backend) = value.parse::<StorageBackend>() {
                config.storage.backend = backend;
            }
        }
        "storage_path" => config.storage.path = PathBuf::from(value),
        "storage_table" => config.storage.table = value.to_string(),
        "log_format" => config.logging.format = value.to_lowercase(),
        "file_logging" => config.logging.file_logging = parse_bool(value),
        "log_dir" => config.logging.log_dir = PathBuf::from(value),
        _ => {}
    }
}

/// Keys accepted by [`apply_cli_overrides`]; the environment form is
/// `CEREBRUM_<KEY>` upper-cased.
const OVERRIDE_KEYS: &[&str] = &[
    "log_level",
    "max_threads",
    "download_base",
    "dataset",
    "metadata_key",
    "regions",
    "parallel",
    "taxonomy_file",
    "storage_backend",
    "storage_path",
    "storage_table",
    "log_format",
    "file_logging",
    "log_dir",
];

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `CEREBRUM_LOG_LEVEL` -> `system.log_level`
/// - `CEREBRUM_MAX_THREADS` -> `system.max_threads`
/// - `CEREBRUM_DOWNLOAD_BASE` -> `cache.download_base`
/// - `CEREBRUM_DATASET` -> `cache.dataset`
/// - `CEREBRUM_METADATA_KEY` -> `cache.metadata_key`
/// - `CEREBRUM_REGIONS` -> `census.regions` (comma separated)
/// - `CEREBRUM_PARALLEL` -> `census.parallel`
/// - `CEREBRUM_TAXONOMY_FILE` -> `census.taxonomy_file`
/// - `CEREBRUM_STORAGE_BACKEND` -> `storage.backend`
/// - `CEREBRUM_STORAGE_PATH` -> `storage.path`
/// - `CEREBRUM_STORAGE_TABLE` -> `storage.table`
/// - `CEREBRUM_LOG_FORMAT` -> `logging.format`
/// - `CEREBRUM_FILE_LOGGING` -> `logging.file_logging`
/// - `CEREBRUM_LOG_DIR` -> `logging.log_dir`
pub fn apply_environment_overrides(config: &mut CerebrumConfig) {
    for key in OVERRIDE_KEYS {
        let var = format!("CEREBRUM_{}", key.to_uppercase());
        if let Ok(value) = env::var(&var) {
            apply_override(config, key, &value);
        }
    }
}

/// Apply CLI argument overrides to configuration
///
/// * `cli_args` - e.g. `{"regions": "VISp,MOp", "storage_table": "visp_census"}`
pub fn apply_cli_overrides(config: &mut CerebrumConfig, cli_args: &HashMap<String, String>) {
    for key in OVERRIDE_KEYS {
        if let Some(value) = cli_args.get(*key) {
            apply_override(config, key, value);
        }
    }
}
