// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Cerebrum I/O

Collaborators of the census core:

- [`MetadataCache`]: locates the parcellation-annotated cell table inside a
  downloaded ABC atlas cache
- [`CsvCellSource`]: [`CellSource`](cerebrum_census::CellSource) backed by
  that table
- [`load_taxonomy`]: custom taxonomies from TOML
- [`RowWriter`]: census row storage ([`SqliteRowWriter`], [`JsonLinesWriter`])
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cache;
pub mod cells;
pub mod storage;
pub mod taxonomy_file;

pub use cache::MetadataCache;
pub use cells::{cache_region_fractions, CsvCellSource, REQUIRED_COLUMNS};
pub use storage::{JsonLinesWriter, RowWriter, SqliteRowWriter, StorageError, StorageResult};
pub use taxonomy_file::{load_taxonomy, TaxonomyFileError};
