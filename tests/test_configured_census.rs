// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file -> cache lookup -> census -> selections -> storage

use std::fs;
use std::path::Path;

use cerebrum::config::{load_config, validate_config, StorageBackend};
use cerebrum::prelude::*;
use tempfile::tempdir;

const CELLS: &str = "\
cell_label,class,subclass,parcellation_structure,parcellation_substructure
c1,01 IT-ET Glut,007 L2/3 IT CTX Glut,SSp-bfd,SSp-bfd4
c2,01 IT-ET Glut,006 L4/5 IT CTX Glut,SSp-bfd,SSp-bfd4
c3,07 CTX-MGE GABA,052 Pvalb Gaba,SSp-bfd,SSp-bfd4
c4,07 CTX-MGE GABA,053 Sst Gaba,SSp-bfd,SSp-bfd5
c5,01 IT-ET Glut,030 L6 CT CTX Glut,SSp-bfd,SSp-bfd6a
";

fn write_fixture(base: &Path) -> std::path::PathBuf {
    let views = base
        .join("cache")
        .join("metadata")
        .join("MERFISH-C57BL6J-638850-CCF")
        .join("20231215")
        .join("views");
    fs::create_dir_all(&views).unwrap();
    fs::write(
        views.join("cell_metadata_with_parcellation_annotation.csv"),
        CELLS,
    )
    .unwrap();

    let config_path = base.join("cerebrum_configuration.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[cache]
download_base = "{cache}"

[census]
regions = ["SSp-bfd", "ACA"]
parallel = false

[storage]
backend = "sqlite"
path = "{db}"
table = "barrel_census"
"#,
            cache = base.join("cache").display(),
            db = base.join("census.db").display(),
        ),
    )
    .unwrap();
    config_path
}

#[test]
fn test_configured_census_end_to_end() {
    let dir = tempdir().unwrap();
    let config_path = write_fixture(dir.path());

    let config = load_config(Some(&config_path), None).unwrap();
    validate_config(&config).unwrap();
    assert_eq!(config.storage.backend, StorageBackend::Sqlite);

    let cache = MetadataCache::new(
        &config.cache.download_base,
        config.cache.dataset.as_str(),
        config.cache.metadata_key.as_str(),
    );
    let query = CcfFractionQuery::new(Taxonomy::abc_mouse(), CsvCellSource::from_cache(cache))
        .with_parallel(config.census.parallel);
    let params = ExecParams::new(config.census.regions.iter().cloned());

    let report = query.report(&params);
    assert_eq!(report.regions.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].region, "ACA");

    // Layer 4 of the barrel field: 2 IT + 1 Pvalb
    let selections: Vec<_> = select_fractions(
        select_substructure(query.run(&params), "SSp-bfd", "SSp-bfd4"),
        "SSp-bfd4",
        Some("Pvalb"),
    )
    .collect();
    assert_eq!(selections.len(), 1);
    let l4 = &selections[0];
    assert_eq!(l4.inh_fraction, Some(Scalar::Float(1.0 / 3.0)));
    assert_eq!(l4.region_fraction, Some(Scalar::Float(3.0 / 5.0)));
    assert_eq!(l4.fraction, Some(Scalar::Float(1.0)));

    let rows: Vec<FlatRow> = flatten_rows(query.run(&params)).collect();
    assert_eq!(rows.len(), 3);

    let mut writer = SqliteRowWriter::open(&config.storage.path, config.storage.table.as_str()).unwrap();
    assert_eq!(writer.write_rows(&rows).unwrap(), 3);
    drop(writer);

    let conn = rusqlite::Connection::open(&config.storage.path).unwrap();
    let layers: Vec<String> = conn
        .prepare("SELECT Layer FROM barrel_census ORDER BY rowid")
        .unwrap()
        .query_map([], |r| r.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(layers, ["4", "5", "6a"]);

    let ct: f64 = conn
        .query_row(
            "SELECT \"CT fraction\" FROM barrel_census WHERE Layer = '6a'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(ct, 1.0);
}

#[test]
fn test_missing_region_path_selects_nothing() {
    let dir = tempdir().unwrap();
    let config_path = write_fixture(dir.path());
    let config = load_config(Some(&config_path), None).unwrap();

    let cache = MetadataCache::new(
        &config.cache.download_base,
        config.cache.dataset.as_str(),
        config.cache.metadata_key.as_str(),
    );
    let query = CcfFractionQuery::new(Taxonomy::abc_mouse(), CsvCellSource::from_cache(cache));
    let params = ExecParams::new(["SSp-bfd"]);

    let selections: Vec<_> = select_fractions(
        select_substructure(query.run(&params), "SSp-bfd", "SSp-bfd2/3"),
        "SSp-bfd2/3",
        None,
    )
    .collect();
    assert_eq!(selections.len(), 1);
    assert_eq!(selections[0].inh_fraction, None);
    assert_eq!(selections[0].region_fraction, None);
    assert_eq!(selections[0].fraction, None);
}
