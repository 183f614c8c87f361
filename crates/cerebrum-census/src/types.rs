// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Core types for census operations.
*/

/// Spatial region identifier (e.g. "VISp")
pub type RegionId = String;

/// Result type for census operations
pub type CensusResult<T> = Result<T, CensusError>;

/// Errors that can occur while building a taxonomy or running a census.
///
/// Empty regions and zero denominators are not errors; they are reported
/// through `SkipReason` and `Ratio::Undefined` respectively.
#[derive(Debug, thiserror::Error)]
pub enum CensusError {
    #[error("Overlapping categories in {level}: '{label}' belongs to both '{first}' and '{second}'")]
    OverlappingCategories {
        level: String,
        label: String,
        first: String,
        second: String,
    },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Empty name in {0}")]
    EmptyName(String),

    #[error("Category '{0}' declares both labels and child categories")]
    MixedCategory(String),

    #[error("Too many flag columns: {count} (capacity {capacity})")]
    TooManyColumns { count: usize, capacity: usize },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Invalid taxonomy: {0}")]
    InvalidTaxonomy(String),
}

