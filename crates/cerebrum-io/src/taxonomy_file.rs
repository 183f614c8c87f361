// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Custom taxonomies from TOML
//!
//! The file mirrors [`TaxonomySpec`]:
//!
//! ```toml
//! other_flag = "O"
//!
//! [excitatory]
//! flag = "E"
//! name = "Glut"
//! other = "Glut-Other"
//! rule = { field = "class", suffix = "Glut" }
//!
//! [[excitatory.categories]]
//! name = "ET"
//! labels = ["022 L5 ET CTX Glut"]
//!
//! [inhibitory]
//! flag = "I"
//! name = "GABA"
//! other = "GABA-Other"
//! rule = { field = "subclass", suffix = "Gaba" }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use cerebrum_census::{CensusError, Taxonomy, TaxonomySpec};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum TaxonomyFileError {
    #[error("Failed to read taxonomy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid taxonomy TOML in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid taxonomy in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: CensusError,
    },
}

/// Load and validate a taxonomy file
pub fn load_taxonomy(path: &Path) -> Result<Taxonomy, TaxonomyFileError> {
    let content = fs::read_to_string(path).map_err(|source| TaxonomyFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let spec: TaxonomySpec = toml::from_str(&content).map_err(|e| TaxonomyFileError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let taxonomy = Taxonomy::new(spec).map_err(|source| TaxonomyFileError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        target: "cerebrum-io",
        "Loaded taxonomy with {} columns from {}",
        taxonomy.columns().len(),
        path.display()
    );
    Ok(taxonomy)
}
