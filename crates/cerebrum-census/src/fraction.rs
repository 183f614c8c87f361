// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Fraction tables derived from region counts.

For each substructure row:

| Column | Value |
|---|---|
| `Region` | region id |
| `Layer` | substructure id with the region prefix removed |
| `nregion` | record count of the whole region |
| `inhibitory fraction` | I / EI |
| `fraction wi. region` | T / nregion |
| `<category> fraction` | category / lineage total (GABA or Glut) |

A zero denominator yields [`Ratio::Undefined`], never zero and never a panic.
*/

use crate::aggregate::RegionCountTable;
use crate::row::{FlatRow, Scalar};
use crate::taxonomy::{fraction_column, Taxonomy};

pub const REGION_COLUMN: &str = "Region";
pub const LAYER_COLUMN: &str = "Layer";
pub const NREGION_COLUMN: &str = "nregion";
pub const INHIBITORY_FRACTION_COLUMN: &str = "inhibitory fraction";
pub const FRACTION_WI_REGION_COLUMN: &str = "fraction wi. region";

/// Result of a division that may have a zero denominator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    Defined(f64),
    Undefined,
}

impl Ratio {
    pub fn new(numerator: u64, denominator: u64) -> Self {
        if denominator == 0 {
            Ratio::Undefined
        } else {
            Ratio::Defined(numerator as f64 / denominator as f64)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Ratio::Defined(v) => Some(*v),
            Ratio::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Ratio::Undefined)
    }
}

impl From<Ratio> for Scalar {
    fn from(ratio: Ratio) -> Self {
        match ratio {
            Ratio::Defined(v) => Scalar::Float(v),
            Ratio::Undefined => Scalar::Undefined,
        }
    }
}

/// Ratios for one substructure
#[derive(Debug, Clone, PartialEq)]
pub struct FractionRow {
    pub region: String,
    /// Full substructure key (map key in query results)
    pub substructure: String,
    pub layer: String,
    pub nregion: u64,
    pub inhibitory_fraction: Ratio,
    pub fraction_within_region: Ratio,
    /// (category, ratio) in taxonomy order
    pub subtype_fractions: Vec<(String, Ratio)>,
}

impl FractionRow {
    pub fn subtype_fraction(&self, category: &str) -> Option<Ratio> {
        self.subtype_fractions
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, ratio)| *ratio)
    }

    pub fn to_flat_row(&self) -> FlatRow {
        let mut row = FlatRow::with_capacity(5 + self.subtype_fractions.len());
        row.insert(REGION_COLUMN.to_string(), Scalar::from(self.region.as_str()));
        row.insert(LAYER_COLUMN.to_string(), Scalar::from(self.layer.as_str()));
        row.insert(NREGION_COLUMN.to_string(), Scalar::from(self.nregion));
        row.insert(
            INHIBITORY_FRACTION_COLUMN.to_string(),
            Scalar::from(self.inhibitory_fraction),
        );
        row.insert(
            FRACTION_WI_REGION_COLUMN.to_string(),
            Scalar::from(self.fraction_within_region),
        );
        for (category, ratio) in &self.subtype_fractions {
            row.insert(fraction_column(category), Scalar::from(*ratio));
        }
        row
    }
}

/// Fraction table of one region, one row per populated substructure
#[derive(Debug, Clone, PartialEq)]
pub struct FractionTable {
    pub region: String,
    pub rows: Vec<FractionRow>,
}

impl FractionTable {
    pub fn row(&self, substructure: &str) -> Option<&FractionRow> {
        self.rows.iter().find(|r| r.substructure == substructure)
    }
}

/// Strip the region key from the front of a substructure key
///
/// Keys that do not start with the region are returned unchanged.
pub fn layer_label<'a>(region: &str, substructure: &'a str) -> &'a str {
    substructure.strip_prefix(region).unwrap_or(substructure)
}

/// Compute one fraction row per count row
///
/// `region_record_count` is the denominator of `fraction wi. region`.
pub fn compute_fractions(
    taxonomy: &Taxonomy,
    counts: &RegionCountTable,
    region_record_count: u64,
) -> FractionTable {
    let inhibitory = taxonomy.inhibitory_flag();
    let ratios = taxonomy.subtype_fractions();

    let rows = counts
        .rows
        .iter()
        .map(|row| FractionRow {
            region: counts.region.clone(),
            substructure: row.substructure.clone(),
            layer: layer_label(&counts.region, &row.substructure).to_string(),
            nregion: region_record_count,
            inhibitory_fraction: Ratio::new(row.count(inhibitory), row.ei),
            fraction_within_region: Ratio::new(row.total, region_record_count),
            subtype_fractions: ratios
                .iter()
                .map(|f| {
                    (
                        f.category.clone(),
                        Ratio::new(row.count(f.column), row.count(f.parent)),
                    )
                })
                .collect(),
        })
        .collect();

    FractionTable {
        region: counts.region.clone(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_region;
    use crate::cell::CellRecord;

    #[test]
    fn test_ratio_zero_denominator_is_undefined() {
        assert_eq!(Ratio::new(0, 0), Ratio::Undefined);
        assert_eq!(Ratio::new(3, 0), Ratio::Undefined);
        assert_eq!(Ratio::new(0, 4), Ratio::Defined(0.0));
        assert_eq!(Ratio::new(1, 4).value(), Some(0.25));
        assert_eq!(Scalar::from(Ratio::Undefined), Scalar::Undefined);
    }

    #[test]
    fn test_layer_label() {
        assert_eq!(layer_label("VISp", "VISp2/3"), "2/3");
        assert_eq!(layer_label("VISp", "VISp"), "");
        assert_eq!(layer_label("VISp", "MOp5"), "MOp5");
        // Only the leading occurrence is removed
        assert_eq!(layer_label("A", "AxA"), "xA");
    }

    #[test]
    fn test_non_neuronal_substructure_has_undefined_ratios() {
        let taxonomy = Taxonomy::abc_mouse();
        let cells = vec![
            CellRecord::new("30 Astro-Epen", "319 Astro-TE NN", "SSp", "SSp1"),
            CellRecord::new("01 IT-ET Glut", "006 L4/5 IT CTX Glut", "SSp", "SSp4"),
        ];
        let counts = aggregate_region(taxonomy, "SSp", &taxonomy.classify(&cells));
        let table = compute_fractions(taxonomy, &counts, counts.record_count);

        let l1 = table.row("SSp1").unwrap();
        assert_eq!(l1.layer, "1");
        assert!(l1.inhibitory_fraction.is_undefined());
        assert_eq!(l1.fraction_within_region, Ratio::Defined(0.5));
        assert!(l1.subtype_fraction("IT").unwrap().is_undefined());

        let l4 = table.row("SSp4").unwrap();
        assert_eq!(l4.inhibitory_fraction, Ratio::Defined(0.0));
        assert_eq!(l4.subtype_fraction("IT"), Some(Ratio::Defined(1.0)));
        assert_eq!(l4.subtype_fraction("IT-CTX"), Some(Ratio::Defined(1.0)));
        assert!(l4.subtype_fraction("Pvalb").unwrap().is_undefined());
    }

    #[test]
    fn test_flat_row_columns() {
        let taxonomy = Taxonomy::abc_mouse();
        let cells = vec![CellRecord::new(
            "07 CTX-MGE GABA",
            "046 Vip Gaba",
            "VISp",
            "VISp1",
        )];
        let counts = aggregate_region(taxonomy, "VISp", &taxonomy.classify(&cells));
        let table = compute_fractions(taxonomy, &counts, 1);
        let row = table.rows[0].to_flat_row();

        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(
            keys[..5],
            [
                REGION_COLUMN,
                LAYER_COLUMN,
                NREGION_COLUMN,
                INHIBITORY_FRACTION_COLUMN,
                FRACTION_WI_REGION_COLUMN
            ]
        );
        assert_eq!(row["Vip fraction"], Scalar::Float(1.0));
        assert_eq!(row["IT fraction"], Scalar::Undefined);
        assert_eq!(row["inhibitory fraction"], Scalar::Float(1.0));
        assert_eq!(row.len(), 5 + taxonomy.subtype_fractions().len());
    }
}
