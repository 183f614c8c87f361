// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cache directory -> CSV source -> fraction query -> SQLite / JSON lines

use std::fs;
use std::path::Path;

use cerebrum_census::{flatten_rows, CcfFractionQuery, ExecParams, Ratio, SkipReason, Taxonomy};
use cerebrum_io::{
    cache_region_fractions, CsvCellSource, JsonLinesWriter, MetadataCache, RowWriter,
    SqliteRowWriter,
};
use tempfile::tempdir;

const DATASET: &str = "MERFISH-C57BL6J-638850-CCF";
const KEY: &str = "cell_metadata_with_parcellation_annotation";

const CELLS: &str = "\
cell_label,class,subclass,parcellation_structure,parcellation_substructure
c1,01 IT-ET Glut,007 L2/3 IT CTX Glut,VISp,VISp2/3
c2,01 IT-ET Glut,022 L5 ET CTX Glut,VISp,VISp5
c3,07 CTX-MGE GABA,052 Pvalb Gaba,VISp,VISp5
c4,06 CTX-CGE GABA,046 Vip Gaba,VISp,VISp2/3
c5,30 Astro-Epen,319 Astro-TE NN,VISp,VISp1
c6,01 IT-ET Glut,022 L5 ET CTX Glut,MOp,MOp5
";

fn seed_cache(base: &Path) -> MetadataCache {
    let views = base
        .join("metadata")
        .join(DATASET)
        .join("20231215")
        .join("views");
    fs::create_dir_all(&views).unwrap();
    fs::write(views.join(format!("{KEY}.csv")), CELLS).unwrap();
    MetadataCache::new(base, DATASET, KEY)
}

#[test]
fn test_query_over_cached_table() {
    let dir = tempdir().unwrap();
    let cache = seed_cache(dir.path());
    let query = CcfFractionQuery::new(Taxonomy::abc_mouse(), CsvCellSource::from_cache(cache))
        .with_parallel(false);

    let report = query.report(&ExecParams::new(["VISp", "SSp", "MOp"]));
    assert_eq!(report.regions.keys().collect::<Vec<_>>(), ["VISp", "MOp"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].region, "SSp");
    assert_eq!(report.skipped[0].reason, SkipReason::NoRecords);

    let visp = report.fraction_table("VISp").unwrap();
    let l5 = visp.row("VISp5").unwrap();
    assert_eq!(l5.layer, "5");
    assert_eq!(l5.nregion, 5);
    assert_eq!(l5.inhibitory_fraction, Ratio::Defined(0.5));
    assert_eq!(l5.subtype_fraction("ET"), Some(Ratio::Defined(1.0)));

    let l1 = visp.row("VISp1").unwrap();
    assert_eq!(l1.inhibitory_fraction, Ratio::Undefined);
}

#[test]
fn test_missing_cache_skips_every_region() {
    let dir = tempdir().unwrap();
    let cache = MetadataCache::new(dir.path(), DATASET, KEY);
    let query = CcfFractionQuery::new(Taxonomy::abc_mouse(), CsvCellSource::from_cache(cache));

    let report = query.report(&ExecParams::new(["VISp"]));
    assert!(report.is_empty());
    assert_eq!(report.skipped[0].reason, SkipReason::NoData);
}

#[test]
fn test_single_region_helper() {
    let dir = tempdir().unwrap();
    let cache = seed_cache(dir.path());

    let table = cache_region_fractions(Taxonomy::abc_mouse(), &cache, "MOp")
        .unwrap()
        .unwrap();
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].fraction_within_region, Ratio::Defined(1.0));

    assert!(cache_region_fractions(Taxonomy::abc_mouse(), &cache, "ACA")
        .unwrap()
        .is_none());
}

#[test]
fn test_rows_written_to_sqlite() {
    let dir = tempdir().unwrap();
    let cache = seed_cache(dir.path());
    let query = CcfFractionQuery::new(Taxonomy::abc_mouse(), CsvCellSource::from_cache(cache));

    let rows: Vec<_> = flatten_rows(query.run(&ExecParams::new(["VISp", "MOp"]))).collect();
    assert_eq!(rows.len(), 4);

    let db = dir.path().join("census.db");
    let mut writer = SqliteRowWriter::open(&db, "abm_mouse").unwrap();
    assert_eq!(writer.write_rows(&rows).unwrap(), 4);

    let conn = writer.connection();
    let regions: Vec<String> = conn
        .prepare("SELECT Region FROM abm_mouse ORDER BY rowid")
        .unwrap()
        .query_map([], |r| r.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(regions, ["VISp", "VISp", "VISp", "MOp"]);

    let undefined: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM abm_mouse WHERE \"inhibitory fraction\" = 'NaN'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(undefined, 1);
}

#[test]
fn test_rows_written_as_json_lines() {
    let dir = tempdir().unwrap();
    let cache = seed_cache(dir.path());
    let query = CcfFractionQuery::new(Taxonomy::abc_mouse(), CsvCellSource::from_cache(cache));
    let rows: Vec<_> = flatten_rows(query.run(&ExecParams::new(["MOp"]))).collect();

    let path = dir.path().join("rows.jsonl");
    {
        let mut writer = JsonLinesWriter::create(&path).unwrap();
        writer.write_rows(&rows).unwrap();
    }

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with(r#"{"Region":"MOp","Layer":"5","nregion":1,"#));
}
