// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Every section is `#[serde(default)]`, so a partial file only overrides
//! the keys it names.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CerebrumConfig {
    pub system: SystemConfig,
    pub cache: CacheConfig,
    pub census: CensusConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub log_level: String,
    /// Worker threads for region-level parallelism (0 = rayon default)
    pub max_threads: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            max_threads: 0,
        }
    }
}

/// Location of the downloaded cell metadata
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub download_base: PathBuf,
    pub dataset: String,
    pub metadata_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            download_base: PathBuf::from("./cache/abc_mouse"),
            dataset: "MERFISH-C57BL6J-638850-CCF".to_string(),
            metadata_key: "cell_metadata_with_parcellation_annotation".to_string(),
        }
    }
}

/// Which regions to census and how
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CensusConfig {
    pub regions: Vec<String>,
    pub parallel: bool,
    /// Custom taxonomy TOML; the built-in ABC mouse taxonomy when absent
    pub taxonomy_file: Option<PathBuf>,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            parallel: true,
            taxonomy_file: None,
        }
    }
}

/// Row storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Sqlite,
    JsonLines,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "json_lines" | "jsonl" => Ok(StorageBackend::JsonLines),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
    pub table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: PathBuf::from("./cerebrum.db"),
            table: "abm_mouse".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// "text" or "json"
    pub format: String,
    pub file_logging: bool,
    pub log_dir: PathBuf,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_days: 30,
            retention_runs: 10,
        }
    }
}
