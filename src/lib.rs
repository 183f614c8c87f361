// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Cerebrum - cell-type census of brain regions
//!
//! Classifies parcellation-annotated cells of a single-cell atlas into
//! excitatory, inhibitory and other lineages (plus named subtypes), counts
//! them per substructure, and derives per-layer cell-type fractions.
//!
//! ## Feature Flags
//!
//! - **`full`** (default): `io`, `config`, `observability`, `parallel`
//! - **`io`**: metadata cache lookup, CSV cell tables, SQLite / JSON lines storage
//! - **`config`**: `cerebrum_configuration.toml` loading with overrides
//! - **`observability`**: `tracing` subscriber setup
//! - **`parallel`**: one rayon task per requested region
//! - **`file-logging`**: JSON log files in timestamped run folders
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cerebrum::prelude::*;
//!
//! let cache = MetadataCache::new(
//!     "./cache/abc_mouse",
//!     "MERFISH-C57BL6J-638850-CCF",
//!     "cell_metadata_with_parcellation_annotation",
//! );
//! let query = CcfFractionQuery::new(Taxonomy::abc_mouse(), CsvCellSource::from_cache(cache));
//!
//! let rows: Vec<FlatRow> = flatten_rows(query.run(&ExecParams::new(["VISp", "MOp"]))).collect();
//! let mut writer = SqliteRowWriter::open("cerebrum.db", "abm_mouse")?;
//! writer.write_rows(&rows)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Core: cerebrum-census                                  │
//! │  (taxonomy, aggregation, fractions, query, flattening)  │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  I/O: cerebrum-io                                       │
//! │  (metadata cache, CSV cells, SQLite / JSON lines)       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Tools: region-census                                   │
//! │  (cerebrum-config + cerebrum-observability)             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export core
pub use cerebrum_census as census;

// Re-export I/O layer
#[cfg(feature = "io")]
pub use cerebrum_io as io;

// Re-export infrastructure
#[cfg(feature = "config")]
pub use cerebrum_config as config;

#[cfg(feature = "observability")]
pub use cerebrum_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::census::{
        flatten_rows, region_fractions, select_fractions, select_substructure, CcfFractionQuery,
        CellRecord, CellSource, CensusReport, ExecParams, FlatRow, FractionRow, FractionTable,
        InMemoryCellSource, QueryResult, Ratio, RegionCensus, Scalar, SkipReason, Taxonomy,
    };

    #[cfg(feature = "io")]
    pub use crate::io::{
        cache_region_fractions, load_taxonomy, CsvCellSource, JsonLinesWriter, MetadataCache,
        RowWriter, SqliteRowWriter,
    };

    #[cfg(feature = "config")]
    pub use crate::config::{load_config, validate_config, CerebrumConfig};
}
