// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Cerebrum Census

Cell-type census over parcellation-annotated cells:
- Hierarchical classification (E/I/O lineage, named subtypes, catch-alls)
- Per-substructure count aggregation with derived `T` and `EI` columns
- Fraction tables with explicit undefined ratios
- Flattening of nested query results into storage rows

## Pipeline

```text
CellSource -> classify -> aggregate_region -> compute_fractions
           -> CensusReport -> QueryResult -> flatten_rows -> RowWriter
```

The crate performs no I/O. Cell tables and row storage live in
`cerebrum-io`.

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod aggregate;
pub mod cell;
pub mod classify;
pub mod filter;
pub mod flatten;
pub mod fraction;
pub mod pipeline;
pub mod query;
pub mod row;
pub mod source;
pub mod taxonomy;
pub mod types;

pub use aggregate::{aggregate_region, RegionCountRow, RegionCountTable};
pub use cell::{CellRecord, LabelField};
pub use classify::{ClassifiedRecord, FlagSet};
pub use filter::{select_fractions, select_substructure, FractionSelection};
pub use flatten::{flatten_results, flatten_rows, FlattenRows, QueryResult, ResultNode};
pub use fraction::{compute_fractions, layer_label, FractionRow, FractionTable, Ratio};
pub use pipeline::{
    census_records, CensusReport, RegionCensus, RegionCensusEntry, SkipReason, SkippedRegion,
};
pub use query::{region_fractions, CcfFractionQuery, ExecParams, QueryResults};
pub use row::{FlatRow, Scalar, UNDEFINED_SENTINEL};
pub use source::{CellSource, InMemoryCellSource, SourceError};
pub use taxonomy::{
    abc_mouse_spec, fraction_column, CategorySpec, LineageSpec, SubtypeFraction, SuffixRule,
    Taxonomy, TaxonomySpec,
};
pub use types::{CensusError, CensusResult, RegionId};
