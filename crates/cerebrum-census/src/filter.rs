// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Selections over query results.

- [`select_substructure`]: keep `region/substructure` of each result, re-keyed
  as `substructure -> row`
- [`select_fractions`]: pull the headline ratios of one keyed row
*/

use serde::Serialize;

use crate::flatten::{QueryResult, ResultNode};
use crate::fraction::{FRACTION_WI_REGION_COLUMN, INHIBITORY_FRACTION_COLUMN};
use crate::row::Scalar;
use crate::taxonomy::fraction_column;

/// Keep one substructure of one region from every result
///
/// A result without that path maps to an empty result.
pub fn select_substructure<I>(
    results: I,
    region: impl Into<String>,
    substructure: impl Into<String>,
) -> impl Iterator<Item = QueryResult>
where
    I: IntoIterator<Item = QueryResult>,
{
    let region = region.into();
    let substructure = substructure.into();
    results.into_iter().map(move |mut result| {
        let mut selected = QueryResult::new();
        let node = match result.swap_remove(&region) {
            Some(ResultNode::Branch(mut children)) => children.swap_remove(&substructure),
            _ => None,
        };
        if let Some(node) = node {
            selected.insert(substructure.clone(), node);
        }
        selected
    })
}

/// Headline ratios of one row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FractionSelection {
    pub inh_fraction: Option<Scalar>,
    pub region_fraction: Option<Scalar>,
    /// Present only when a cell type was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraction: Option<Scalar>,
}

/// Pull ratios of the row stored under `key` from every result
///
/// `key` is the top-level key of the result, typically a substructure after
/// [`select_substructure`]. Missing rows or columns yield `None` fields.
pub fn select_fractions<I>(
    results: I,
    key: impl Into<String>,
    cell_type: Option<&str>,
) -> impl Iterator<Item = FractionSelection>
where
    I: IntoIterator<Item = QueryResult>,
{
    let key = key.into();
    let cell_type_column = cell_type.filter(|c| !c.is_empty()).map(fraction_column);
    results.into_iter().map(move |result| {
        let row = result.get(&key).and_then(ResultNode::as_leaf);
        let column = |name: &str| row.and_then(|r| r.get(name)).cloned();
        FractionSelection {
            inh_fraction: column(INHIBITORY_FRACTION_COLUMN),
            region_fraction: column(FRACTION_WI_REGION_COLUMN),
            fraction: cell_type_column.as_deref().and_then(column),
        }
    })
}
