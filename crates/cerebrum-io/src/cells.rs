// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cell-table loading from CSV
//!
//! The table is read on the first request and kept for the lifetime of the
//! source; every later request is a lookup by structure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use cerebrum_census::{region_fractions, CellRecord, CellSource, FractionTable, SourceError, Taxonomy};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::{debug, info};

use crate::cache::MetadataCache;

/// Columns the census needs; any other column is ignored
pub const REQUIRED_COLUMNS: [&str; 4] = [
    "class",
    "subclass",
    "parcellation_structure",
    "parcellation_substructure",
];

#[derive(Debug, Deserialize)]
struct CellMetadataRow {
    #[serde(rename = "class")]
    class_label: String,
    #[serde(rename = "subclass")]
    subclass_label: String,
    #[serde(rename = "parcellation_structure")]
    structure: String,
    #[serde(rename = "parcellation_substructure")]
    substructure: String,
}

impl From<CellMetadataRow> for CellRecord {
    fn from(row: CellMetadataRow) -> Self {
        CellRecord {
            class_label: row.class_label,
            subclass_label: row.subclass_label,
            structure: row.structure,
            substructure: row.substructure,
        }
    }
}

type RegionIndex = AHashMap<String, Vec<CellRecord>>;

#[derive(Debug, Clone)]
enum TableLocation {
    File(PathBuf),
    Cache(MetadataCache),
}

/// [`CellSource`] over a parcellation-annotated cell CSV
#[derive(Debug)]
pub struct CsvCellSource {
    location: TableLocation,
    /// `None` once resolved means there is no backing table
    table: OnceCell<Option<Arc<RegionIndex>>>,
}

impl CsvCellSource {
    /// Source reading `path` directly; a missing file means "no data"
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            location: TableLocation::File(path.into()),
            table: OnceCell::new(),
        }
    }

    /// Source resolving its table through a metadata cache on first use
    pub fn from_cache(cache: MetadataCache) -> Self {
        Self {
            location: TableLocation::Cache(cache),
            table: OnceCell::new(),
        }
    }

    /// Number of loaded records; `None` before the first request or without data
    pub fn loaded_len(&self) -> Option<usize> {
        self.table
            .get()
            .and_then(|table| table.as_ref())
            .map(|index| index.values().map(Vec::len).sum())
    }

    fn resolve_path(&self) -> Result<Option<PathBuf>, SourceError> {
        match &self.location {
            TableLocation::File(path) => Ok(path.is_file().then(|| path.clone())),
            TableLocation::Cache(cache) => cache.metadata_path(),
        }
    }

    fn table(&self) -> Result<Option<&Arc<RegionIndex>>, SourceError> {
        let table = self.table.get_or_try_init(|| {
            let Some(path) = self.resolve_path()? else {
                return Ok(None);
            };
            let records = read_cell_table(&path)?;
            info!(
                target: "cerebrum-io",
                "Loaded {} cells from {}",
                records.len(),
                path.display()
            );
            Ok::<_, SourceError>(Some(Arc::new(index_by_structure(records))))
        })?;
        Ok(table.as_ref())
    }
}

impl CellSource for CsvCellSource {
    fn cells_in_region(&self, region: &str) -> Result<Option<Vec<CellRecord>>, SourceError> {
        let Some(index) = self.table()? else {
            return Ok(None);
        };
        let records = index.get(region).cloned().unwrap_or_default();
        debug!(target: "cerebrum-io", "{} cells in {}", records.len(), region);
        Ok(Some(records))
    }
}

fn index_by_structure(records: Vec<CellRecord>) -> RegionIndex {
    let mut index = RegionIndex::new();
    for record in records {
        index.entry(record.structure.clone()).or_default().push(record);
    }
    index
}

fn csv_error(path: &Path, err: csv::Error) -> SourceError {
    let line = err.position().map(|pos| pos.line());
    match err.into_kind() {
        csv::ErrorKind::Io(source) => SourceError::Io {
            path: path.to_path_buf(),
            source,
        },
        kind => SourceError::Malformed {
            path: path.to_path_buf(),
            message: match line {
                Some(line) => format!("line {}: {:?}", line, kind),
                None => format!("{:?}", kind),
            },
        },
    }
}

/// Read every record of a cell table
///
/// # Errors
///
/// `MissingColumn` when a required header is absent, `Malformed` for rows
/// that do not parse, `Io` when the file cannot be read.
pub(crate) fn read_cell_table(path: &Path) -> Result<Vec<CellRecord>, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let headers = rdr.headers().map_err(|e| csv_error(path, e))?.clone();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(SourceError::MissingColumn {
            path: path.to_path_buf(),
            column: missing.to_string(),
        });
    }

    rdr.deserialize::<CellMetadataRow>()
        .map(|row| row.map(CellRecord::from).map_err(|e| csv_error(path, e)))
        .collect()
}

/// Fraction table of one region straight from a metadata cache
///
/// `Ok(None)` when the cache holds no table or the region has no cells.
pub fn cache_region_fractions(
    taxonomy: &Taxonomy,
    cache: &MetadataCache,
    region: &str,
) -> Result<Option<FractionTable>, SourceError> {
    let source = CsvCellSource::from_cache(cache.clone());
    region_fractions(taxonomy, &source, region)
}
