// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Boundary to the cell-table loader.

The census core never reads files itself. A [`CellSource`] hands it the
records of one region and distinguishes three outcomes:

- `Ok(Some(records))`: the backing table exists (records may be empty)
- `Ok(None)`: no backing data at all
- `Err(SourceError)`: the collaborator failed
*/

use std::path::PathBuf;

use ahash::AHashMap;

use crate::cell::CellRecord;

/// Failure raised by a cell-table collaborator
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed cell table {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Missing column '{column}' in {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Cell source unavailable: {0}")]
    Unavailable(String),
}

/// Provider of per-region cell records
pub trait CellSource: Send + Sync {
    /// Records whose `structure` equals `region`
    fn cells_in_region(&self, region: &str) -> Result<Option<Vec<CellRecord>>, SourceError>;
}

impl<S: CellSource + ?Sized> CellSource for &S {
    fn cells_in_region(&self, region: &str) -> Result<Option<Vec<CellRecord>>, SourceError> {
        (**self).cells_in_region(region)
    }
}

impl<S: CellSource + ?Sized> CellSource for Box<S> {
    fn cells_in_region(&self, region: &str) -> Result<Option<Vec<CellRecord>>, SourceError> {
        (**self).cells_in_region(region)
    }
}

/// Records held in memory, indexed by structure
#[derive(Debug, Clone, Default)]
pub struct InMemoryCellSource {
    by_region: AHashMap<String, Vec<CellRecord>>,
}

impl InMemoryCellSource {
    pub fn new(records: impl IntoIterator<Item = CellRecord>) -> Self {
        let mut by_region: AHashMap<String, Vec<CellRecord>> = AHashMap::new();
        for record in records {
            by_region
                .entry(record.structure.clone())
                .or_default()
                .push(record);
        }
        Self { by_region }
    }

    pub fn len(&self) -> usize {
        self.by_region.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_region.is_empty()
    }
}

impl CellSource for InMemoryCellSource {
    fn cells_in_region(&self, region: &str) -> Result<Option<Vec<CellRecord>>, SourceError> {
        // The table exists, so an unknown region is an empty selection
        Ok(Some(self.by_region.get(region).cloned().unwrap_or_default()))
    }
}
