// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end census scenarios over an in-memory cell table

use cerebrum_census::{
    flatten_results, select_fractions, select_substructure, CcfFractionQuery, CellRecord,
    ExecParams, InMemoryCellSource, Ratio, RegionCensus, Scalar, SkipReason, Taxonomy,
};

const REGION: &str = "RSP";

/// Substructure A: 3 Glut (2 IT, 1 untagged) + 2 Gaba (1 Pvalb, 1 untagged).
/// Substructure B: a single non-neuronal cell.
fn scenario_cells() -> Vec<CellRecord> {
    let a = "RSPa";
    let b = "RSPb";
    vec![
        CellRecord::new("01 IT-ET Glut", "020 L2/3 IT RSP Glut", REGION, a),
        CellRecord::new("01 IT-ET Glut", "004 L6 IT CTX Glut", REGION, a),
        CellRecord::new("01 IT-ET Glut", "017 L6b CTX Glut", REGION, a),
        CellRecord::new("07 CTX-MGE GABA", "052 Pvalb Gaba", REGION, a),
        CellRecord::new("06 CTX-CGE GABA", "047 Sncg Gaba", REGION, a),
        CellRecord::new("33 Vascular", "333 Endo NN", REGION, b),
        // Another region, must not leak into RSP
        CellRecord::new("01 IT-ET Glut", "022 L5 ET CTX Glut", "MOp", "MOp5"),
    ]
}

#[test]
fn test_scenario_counts() {
    let census = RegionCensus::new(Taxonomy::abc_mouse(), InMemoryCellSource::new(scenario_cells()));
    let report = census.run(&[REGION.to_string()]);
    let counts = report.count_table(REGION).expect("region populated");

    assert_eq!(counts.record_count, 6);
    let expected = [
        ("E", 3),
        ("I", 2),
        ("O", 0),
        ("T", 5),
        ("EI", 5),
        ("IT", 2),
        ("Glut-Other", 1),
        ("Pvalb", 1),
        ("GABA-Other", 1),
        ("ET", 0),
    ];
    for (column, value) in expected {
        assert_eq!(counts.count("RSPa", column), Some(value), "column {}", column);
    }
    assert_eq!(counts.count("RSPb", "O"), Some(1));
    assert_eq!(counts.count("RSPb", "EI"), Some(0));
}

#[test]
fn test_scenario_fractions() {
    let census = RegionCensus::new(Taxonomy::abc_mouse(), InMemoryCellSource::new(scenario_cells()));
    let report = census.run(&[REGION.to_string()]);
    let fractions = report.fraction_table(REGION).unwrap();

    let a = fractions.row("RSPa").unwrap();
    assert_eq!(a.layer, "a");
    assert_eq!(a.nregion, 6);
    assert_eq!(a.inhibitory_fraction, Ratio::Defined(0.4));
    assert_eq!(a.fraction_within_region, Ratio::Defined(5.0 / 6.0));
    assert_eq!(a.subtype_fraction("IT"), Some(Ratio::Defined(2.0 / 3.0)));
    assert_eq!(a.subtype_fraction("Pvalb"), Some(Ratio::Defined(0.5)));

    let b = fractions.row("RSPb").unwrap();
    assert_eq!(b.inhibitory_fraction, Ratio::Undefined);
    assert_eq!(b.fraction_within_region, Ratio::Defined(1.0 / 6.0));
}

#[test]
fn test_empty_region_produces_no_rows() {
    let query = CcfFractionQuery::new(Taxonomy::abc_mouse(), InMemoryCellSource::new(scenario_cells()));
    let params = ExecParams::new(["ACA"]);

    let report = query.report(&params);
    assert_eq!(report.skipped[0].reason, SkipReason::NoRecords);

    let rows = flatten_results(query.run(&params));
    assert!(rows.is_empty());
}

#[test]
fn test_query_to_flat_rows() {
    let query = CcfFractionQuery::new(Taxonomy::abc_mouse(), InMemoryCellSource::new(scenario_cells()));
    let rows = flatten_results(query.run(&ExecParams::new(["MOp", REGION])));

    // MOp first (request order), then RSP substructures in key order
    let layers: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (r["Region"].as_str().unwrap(), r["Layer"].as_str().unwrap()))
        .collect();
    assert_eq!(layers, vec![("MOp", "5"), (REGION, "a"), (REGION, "b")]);

    let taxonomy = Taxonomy::abc_mouse();
    for row in &rows {
        assert_eq!(row.len(), 5 + taxonomy.subtype_fractions().len());
        for f in taxonomy.subtype_fractions() {
            assert!(row.contains_key(&format!("{} fraction", f.category)));
        }
    }
    assert_eq!(rows[2]["inhibitory fraction"], Scalar::Undefined);
}

#[test]
fn test_layer_then_fraction_filters() {
    let query = CcfFractionQuery::new(Taxonomy::abc_mouse(), InMemoryCellSource::new(scenario_cells()));
    let params = ExecParams::new([REGION]);

    let layer = select_substructure(query.run(&params), REGION, "RSPa");
    let picked: Vec<_> = select_fractions(layer, "RSPa", Some("IT")).collect();

    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].inh_fraction, Some(Scalar::Float(0.4)));
    assert_eq!(picked[0].region_fraction, Some(Scalar::Float(5.0 / 6.0)));
    assert_eq!(picked[0].fraction, Some(Scalar::Float(2.0 / 3.0)));
}
