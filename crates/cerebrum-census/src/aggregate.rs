// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Per-substructure flag counts.

Classified records of one region are grouped by substructure and each flag
column is summed. Derived columns are computed after summation:

- `T`  = E + I + O
- `EI` = E + I

Substructures without records never appear; there are no zero-filled rows.
Rows are ordered by substructure key.
*/

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::classify::ClassifiedRecord;
use crate::row::{FlatRow, Scalar};
use crate::taxonomy::Taxonomy;

pub const TOTAL_COLUMN: &str = "T";
pub const EI_COLUMN: &str = "EI";
pub const SUBSTRUCTURE_COLUMN: &str = "parcellation_substructure";

/// Counts for one substructure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCountRow {
    pub substructure: String,
    /// One count per taxonomy column
    pub counts: Vec<u64>,
    pub total: u64,
    pub ei: u64,
}

impl RegionCountRow {
    pub fn count(&self, column: usize) -> u64 {
        self.counts.get(column).copied().unwrap_or(0)
    }
}

/// Count table of one region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCountTable {
    pub region: String,
    pub columns: Arc<[String]>,
    /// Number of records in the region (all substructures)
    pub record_count: u64,
    pub rows: Vec<RegionCountRow>,
}

impl RegionCountTable {
    pub fn row(&self, substructure: &str) -> Option<&RegionCountRow> {
        self.rows.iter().find(|r| r.substructure == substructure)
    }

    /// Count by column name; `T` and `EI` are accepted too
    pub fn count(&self, substructure: &str, column: &str) -> Option<u64> {
        let row = self.row(substructure)?;
        match column {
            TOTAL_COLUMN => Some(row.total),
            EI_COLUMN => Some(row.ei),
            _ => self
                .columns
                .iter()
                .position(|c| c == column)
                .map(|idx| row.count(idx)),
        }
    }

    /// Rows as storage records: substructure, every flag column, `T`, `EI`
    pub fn flat_rows(&self) -> Vec<FlatRow> {
        self.rows
            .iter()
            .map(|row| {
                let mut flat = FlatRow::with_capacity(self.columns.len() + 3);
                flat.insert(
                    SUBSTRUCTURE_COLUMN.to_string(),
                    Scalar::from(row.substructure.as_str()),
                );
                for (name, &count) in self.columns.iter().zip(&row.counts) {
                    flat.insert(name.clone(), Scalar::from(count));
                }
                flat.insert(TOTAL_COLUMN.to_string(), Scalar::from(row.total));
                flat.insert(EI_COLUMN.to_string(), Scalar::from(row.ei));
                flat
            })
            .collect()
    }
}

/// Group classified records by substructure and sum their flags
pub fn aggregate_region(
    taxonomy: &Taxonomy,
    region: &str,
    classified: &[ClassifiedRecord<'_>],
) -> RegionCountTable {
    let width = taxonomy.columns().len();
    let mut groups: BTreeMap<&str, Vec<u64>> = BTreeMap::new();

    for item in classified {
        let counts = groups
            .entry(item.record.substructure.as_str())
            .or_insert_with(|| vec![0; width]);
        for column in item.flags.iter() {
            counts[column] += 1;
        }
    }

    let e = taxonomy.excitatory_flag();
    let i = taxonomy.inhibitory_flag();
    let o = taxonomy.other_flag();

    let rows = groups
        .into_iter()
        .map(|(substructure, counts)| RegionCountRow {
            substructure: substructure.to_string(),
            total: counts[e] + counts[i] + counts[o],
            ei: counts[e] + counts[i],
            counts,
        })
        .collect();

    RegionCountTable {
        region: region.to_string(),
        columns: taxonomy.shared_columns(),
        record_count: classified.len() as u64,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellRecord;

    fn records() -> Vec<CellRecord> {
        vec![
            CellRecord::new("01 IT-ET Glut", "022 L5 ET CTX Glut", "MOp", "MOp5"),
            CellRecord::new("01 IT-ET Glut", "005 L5 IT CTX Glut", "MOp", "MOp5"),
            CellRecord::new("07 CTX-MGE GABA", "053 Sst Gaba", "MOp", "MOp5"),
            CellRecord::new("30 Astro-Epen", "319 Astro-TE NN", "MOp", "MOp1"),
        ]
    }

    #[test]
    fn test_counts_and_derived_columns() {
        let taxonomy = Taxonomy::abc_mouse();
        let cells = records();
        let table = aggregate_region(taxonomy, "MOp", &taxonomy.classify(&cells));

        assert_eq!(table.record_count, 4);
        // BTreeMap ordering: MOp1 before MOp5
        let subs: Vec<&str> = table.rows.iter().map(|r| r.substructure.as_str()).collect();
        assert_eq!(subs, vec!["MOp1", "MOp5"]);

        assert_eq!(table.count("MOp5", "E"), Some(2));
        assert_eq!(table.count("MOp5", "I"), Some(1));
        assert_eq!(table.count("MOp5", "O"), Some(0));
        assert_eq!(table.count("MOp5", "T"), Some(3));
        assert_eq!(table.count("MOp5", "EI"), Some(3));
        assert_eq!(table.count("MOp5", "IT-CTX"), Some(1));
        assert_eq!(table.count("MOp1", "O"), Some(1));
        assert_eq!(table.count("MOp1", "EI"), Some(0));
        assert_eq!(table.count("MOp9", "E"), None);
    }

    #[test]
    fn test_flat_rows_layout() {
        let taxonomy = Taxonomy::abc_mouse();
        let cells = records();
        let table = aggregate_region(taxonomy, "MOp", &taxonomy.classify(&cells));
        let rows = table.flat_rows();

        assert_eq!(rows.len(), 2);
        let keys: Vec<&str> = rows[1].keys().map(String::as_str).collect();
        assert_eq!(keys.first(), Some(&SUBSTRUCTURE_COLUMN));
        assert_eq!(keys[keys.len() - 2..], [TOTAL_COLUMN, EI_COLUMN]);
        assert_eq!(rows[1]["ET"], Scalar::Int(1));
    }

    #[test]
    fn test_empty_input_yields_no_rows() {
        let taxonomy = Taxonomy::abc_mouse();
        let table = aggregate_region(taxonomy, "MOp", &[]);
        assert!(table.rows.is_empty());
        assert_eq!(table.record_count, 0);
    }
}
