// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Query layer over the census orchestrator.

[`CcfFractionQuery::run`] yields a lazy sequence holding one [`QueryResult`].
The census is only executed when the sequence is first advanced.
*/

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::flatten::QueryResult;
use crate::fraction::FractionTable;
use crate::pipeline::{census_records, CensusReport, RegionCensus};
use crate::source::{CellSource, SourceError};
use crate::taxonomy::Taxonomy;

/// Execution parameters of a fraction query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecParams {
    /// Regions of interest
    pub region: Vec<String>,
}

impl ExecParams {
    pub fn new(regions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            region: regions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Cell-type fraction query over parcellation-annotated cells
pub struct CcfFractionQuery<'t, S> {
    census: RegionCensus<'t, S>,
}

impl<'t, S: CellSource> CcfFractionQuery<'t, S> {
    pub fn new(taxonomy: &'t Taxonomy, source: S) -> Self {
        Self {
            census: RegionCensus::new(taxonomy, source),
        }
    }

    pub fn with_parallel(self, parallel: bool) -> Self {
        Self {
            census: self.census.with_parallel(parallel),
        }
    }

    /// Full report (counts, fractions and skipped regions)
    pub fn report(&self, params: &ExecParams) -> CensusReport {
        info!(target: "cerebrum-census", "Fraction query for regions {:?}", params.region);
        self.census.run(&params.region)
    }

    /// Lazy result sequence: one map of region -> substructure -> row
    pub fn run<'q>(&'q self, params: &ExecParams) -> QueryResults<'q, 't, S> {
        QueryResults {
            query: self,
            pending: Some(params.clone()),
        }
    }
}

/// Single-pass result sequence of [`CcfFractionQuery::run`]
pub struct QueryResults<'q, 't, S> {
    query: &'q CcfFractionQuery<'t, S>,
    pending: Option<ExecParams>,
}

impl<S: CellSource> Iterator for QueryResults<'_, '_, S> {
    type Item = QueryResult;

    fn next(&mut self) -> Option<QueryResult> {
        let params = self.pending.take()?;
        Some(self.query.report(&params).into_query_result())
    }
}

/// Fraction table of a single region
///
/// `Ok(None)` when the region has no records or the source has no data.
pub fn region_fractions<S: CellSource + ?Sized>(
    taxonomy: &Taxonomy,
    source: &S,
    region: &str,
) -> Result<Option<FractionTable>, SourceError> {
    let Some(mut records) = source.cells_in_region(region)? else {
        return Ok(None);
    };
    records.retain(|record| record.structure == region);
    Ok(census_records(taxonomy, region, &records).map(|entry| entry.fractions))
}
