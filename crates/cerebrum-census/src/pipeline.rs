// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Region census orchestration.

For each requested region: load its records from a [`CellSource`], classify,
aggregate, and compute fractions. Regions are independent, so with the
`parallel` feature they run on the rayon pool; the report always follows
request order.

A region with no records, no backing data, or a failing source is recorded in
[`CensusReport::skipped`] and never aborts the request.
*/

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, error, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::aggregate::{aggregate_region, RegionCountTable};
use crate::cell::CellRecord;
use crate::flatten::{QueryResult, ResultNode};
use crate::fraction::{compute_fractions, FractionTable};
use crate::row::FlatRow;
use crate::source::CellSource;
use crate::taxonomy::Taxonomy;

/// Why a region contributed no rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The table exists but holds no record for the region
    NoRecords,
    /// The source has no backing data
    NoData,
    /// The source failed; the message is kept for reporting
    SourceFailure(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoRecords => write!(f, "no records"),
            SkipReason::NoData => write!(f, "no backing data"),
            SkipReason::SourceFailure(message) => write!(f, "source failure: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRegion {
    pub region: String,
    pub reason: SkipReason,
}

/// Counts and fractions of one region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCensusEntry {
    pub counts: RegionCountTable,
    pub fractions: FractionTable,
}

/// Outcome of one census run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CensusReport {
    /// Populated regions in request order
    pub regions: IndexMap<String, RegionCensusEntry>,
    pub skipped: Vec<SkippedRegion>,
}

impl CensusReport {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn fraction_table(&self, region: &str) -> Option<&FractionTable> {
        self.regions.get(region).map(|entry| &entry.fractions)
    }

    pub fn count_table(&self, region: &str) -> Option<&RegionCountTable> {
        self.regions.get(region).map(|entry| &entry.counts)
    }

    /// Region -> substructure -> fraction row
    pub fn into_query_result(self) -> QueryResult {
        self.regions
            .into_iter()
            .map(|(region, entry)| {
                let substructures = entry
                    .fractions
                    .rows
                    .iter()
                    .map(|row| (row.substructure.clone(), ResultNode::Leaf(row.to_flat_row())))
                    .collect();
                (region, ResultNode::Branch(substructures))
            })
            .collect()
    }

    /// Count rows of every region, each tagged with its region
    pub fn count_rows(&self) -> Vec<FlatRow> {
        self.regions
            .iter()
            .flat_map(|(region, entry)| {
                entry.counts.flat_rows().into_iter().map(move |row| {
                    let mut tagged = FlatRow::with_capacity(row.len() + 1);
                    tagged.insert(
                        crate::fraction::REGION_COLUMN.to_string(),
                        region.as_str().into(),
                    );
                    tagged.extend(row);
                    tagged
                })
            })
            .collect()
    }
}

/// Classify, aggregate and compute fractions for records of one region
///
/// Records must already be restricted to `region`. Returns `None` for an
/// empty record set; later stages are not invoked.
pub fn census_records(
    taxonomy: &Taxonomy,
    region: &str,
    records: &[CellRecord],
) -> Option<RegionCensusEntry> {
    if records.is_empty() {
        return None;
    }
    let classified = taxonomy.classify(records);
    let counts = aggregate_region(taxonomy, region, &classified);
    let fractions = compute_fractions(taxonomy, &counts, counts.record_count);
    Some(RegionCensusEntry { counts, fractions })
}

enum RegionOutcome {
    Census(RegionCensusEntry),
    Skipped(SkipReason),
}

/// Orchestrator over a cell source
pub struct RegionCensus<'t, S> {
    taxonomy: &'t Taxonomy,
    source: S,
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    parallel: bool,
}

impl<'t, S: CellSource> RegionCensus<'t, S> {
    pub fn new(taxonomy: &'t Taxonomy, source: S) -> Self {
        Self {
            taxonomy,
            source,
            parallel: cfg!(feature = "parallel"),
        }
    }

    /// Toggle region-level parallelism (no effect without the `parallel` feature)
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn taxonomy(&self) -> &'t Taxonomy {
        self.taxonomy
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run the census over `regions`; duplicates are processed once
    pub fn run(&self, regions: &[String]) -> CensusReport {
        let unique: Vec<&str> = regions
            .iter()
            .map(String::as_str)
            .collect::<IndexSet<&str>>()
            .into_iter()
            .collect();

        let outcomes = self.run_all(&unique);

        let mut report = CensusReport::default();
        for (region, outcome) in unique.into_iter().zip(outcomes) {
            match outcome {
                RegionOutcome::Census(entry) => {
                    report.regions.insert(region.to_string(), entry);
                }
                RegionOutcome::Skipped(reason) => report.skipped.push(SkippedRegion {
                    region: region.to_string(),
                    reason,
                }),
            }
        }

        info!(
            target: "cerebrum-census",
            "Census complete: {} region(s) populated, {} skipped",
            report.regions.len(),
            report.skipped.len()
        );
        report
    }

    fn run_all(&self, regions: &[&str]) -> Vec<RegionOutcome> {
        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                return regions
                    .par_iter()
                    .map(|region| self.run_region(region))
                    .collect();
            }
        }

        regions.iter().map(|region| self.run_region(region)).collect()
    }

    fn run_region(&self, region: &str) -> RegionOutcome {
        debug!(target: "cerebrum-census", "Processing region {}", region);

        let mut records = match self.source.cells_in_region(region) {
            Ok(Some(records)) => records,
            Ok(None) => {
                warn!(target: "cerebrum-census", "Skipping region {}: no backing data", region);
                return RegionOutcome::Skipped(SkipReason::NoData);
            }
            Err(e) => {
                error!(target: "cerebrum-census", "Cell source failed for region {}: {}", region, e);
                return RegionOutcome::Skipped(SkipReason::SourceFailure(e.to_string()));
            }
        };
        records.retain(|record| record.structure == region);

        match census_records(self.taxonomy, region, &records) {
            Some(entry) => {
                info!(
                    target: "cerebrum-census",
                    "Region {}: {} records in {} substructure(s)",
                    region,
                    entry.counts.record_count,
                    entry.fractions.rows.len()
                );
                RegionOutcome::Census(entry)
            }
            None => {
                warn!(target: "cerebrum-census", "Skipping region {}: no records", region);
                RegionOutcome::Skipped(SkipReason::NoRecords)
            }
        }
    }
}
