// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! region-census: cell-type fractions of brain regions from an ABC atlas cache
//!
//! Usage:
//!   region-census --region VISp,MOp
//!   region-census --config cerebrum_configuration.toml --backend json_lines --output rows.jsonl
//!   region-census --region VISp --substructure VISp4 --cell-type Pvalb
//!   region-census --region VISp --rows counts --debug cerebrum-census

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use cerebrum::census::{
    flatten_rows, select_fractions, select_substructure, CcfFractionQuery, CensusReport,
    ExecParams, FlatRow, QueryResult, ResultNode, Taxonomy,
};
use cerebrum::config::{
    apply_cli_overrides, apply_environment_overrides, config_warnings, load_config,
    validate_config, CerebrumConfig, ConfigError, StorageBackend,
};
use cerebrum::io::{
    load_taxonomy, CsvCellSource, JsonLinesWriter, MetadataCache, RowWriter, SqliteRowWriter,
};
use cerebrum::observability::{
    init_logging, CrateDebugFlags, LogFormat, LoggingConfig, DEBUG_ENV_VAR,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Sqlite,
    #[value(name = "json_lines")]
    JsonLines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RowKind {
    /// One fraction row per substructure
    Fractions,
    /// One count row per substructure
    Counts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Cell-type census of brain regions from parcellation-annotated cells
#[derive(Parser, Debug)]
#[command(name = "region-census", version, author, long_about = None)]
struct Args {
    /// Regions to census (repeat or comma-separate, e.g. "VISp,MOp")
    #[arg(short, long = "region", value_delimiter = ',')]
    regions: Vec<String>,

    /// Configuration file (default: search for cerebrum_configuration.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// ABC atlas cache directory
    #[arg(long)]
    download_base: Option<PathBuf>,

    /// Dataset directory key
    #[arg(long)]
    dataset: Option<String>,

    /// Metadata table key
    #[arg(long)]
    metadata_key: Option<String>,

    /// Custom taxonomy TOML
    #[arg(long)]
    taxonomy: Option<PathBuf>,

    /// Row storage backend
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Database or JSON lines file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// SQLite table name
    #[arg(long)]
    table: Option<String>,

    /// Which rows to store
    #[arg(long, value_enum, default_value_t = RowKind::Fractions)]
    rows: RowKind,

    /// Print headline fractions of this substructure of every region
    #[arg(long)]
    substructure: Option<String>,

    /// Also print "<cell type> fraction" (requires --substructure)
    #[arg(long, requires = "substructure")]
    cell_type: Option<String>,

    /// Process regions sequentially
    #[arg(long, default_value_t = false)]
    no_parallel: bool,

    /// Enable debug logging for a crate ("all" for every crate)
    #[arg(long = "debug", value_name = "CRATE")]
    debug: Vec<String>,

    /// Default log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Console log format
    #[arg(long, value_enum)]
    log_format: Option<Format>,
}

impl Args {
    /// Override map in the form accepted by `apply_cli_overrides`
    fn overrides(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        let mut set = |key: &str, value: String| {
            map.insert(key.to_string(), value);
        };

        if !self.regions.is_empty() {
            set("regions", self.regions.join(","));
        }
        if let Some(path) = &self.download_base {
            set("download_base", path.display().to_string());
        }
        if let Some(dataset) = &self.dataset {
            set("dataset", dataset.clone());
        }
        if let Some(key) = &self.metadata_key {
            set("metadata_key", key.clone());
        }
        if let Some(path) = &self.taxonomy {
            set("taxonomy_file", path.display().to_string());
        }
        if let Some(backend) = self.backend {
            let name = match backend {
                Backend::Sqlite => "sqlite",
                Backend::JsonLines => "json_lines",
            };
            set("storage_backend", name.to_string());
        }
        if let Some(path) = &self.output {
            set("storage_path", path.display().to_string());
        }
        if let Some(table) = &self.table {
            set("storage_table", table.clone());
        }
        if self.no_parallel {
            set("parallel", "false".to_string());
        }
        if let Some(level) = &self.log_level {
            set("log_level", level.clone());
        }
        if let Some(format) = self.log_format {
            let name = match format {
                Format::Text => "text",
                Format::Json => "json",
            };
            set("log_format", name.to_string());
        }
        map
    }
}

/// Load the configuration file if one exists, defaults otherwise
///
/// Returns the configuration and whether a file was found.
fn resolve_config(args: &Args) -> Result<(CerebrumConfig, bool)> {
    let overrides = args.overrides();
    match load_config(args.config.as_deref(), Some(&overrides)) {
        Ok(config) => Ok((config, true)),
        Err(ConfigError::FileNotFound(_)) if args.config.is_none() => {
            let mut config = CerebrumConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &overrides);
            Ok((config, false))
        }
        Err(e) => Err(e).context("Failed to load configuration"),
    }
}

fn logging_config(config: &CerebrumConfig) -> LoggingConfig {
    LoggingConfig {
        level: config.system.log_level.to_lowercase(),
        format: if config.logging.format == "json" {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
        file_logging: config.logging.file_logging,
        log_dir: config.logging.log_dir.clone(),
        retention_days: config.logging.retention_days,
        retention_runs: config.logging.retention_runs,
    }
}

fn open_writer(config: &CerebrumConfig) -> Result<Box<dyn RowWriter>> {
    let storage = &config.storage;
    let writer: Box<dyn RowWriter> = match storage.backend {
        StorageBackend::Sqlite => Box::new(
            SqliteRowWriter::open(&storage.path, storage.table.as_str())
                .with_context(|| format!("Failed to open database {}", storage.path.display()))?,
        ),
        StorageBackend::JsonLines => Box::new(
            JsonLinesWriter::create(&storage.path)
                .with_context(|| format!("Failed to create {}", storage.path.display()))?,
        ),
    };
    Ok(writer)
}

/// Headline fractions of `substructure` for every populated region, one JSON object each
fn selection_lines(
    report: &CensusReport,
    substructure: &str,
    cell_type: Option<&str>,
) -> Result<Vec<serde_json::Value>> {
    let mut lines = Vec::new();
    for (region, entry) in &report.regions {
        let branch = entry
            .fractions
            .rows
            .iter()
            .map(|row| (row.substructure.clone(), ResultNode::Leaf(row.to_flat_row())))
            .collect();
        let result: QueryResult =
            std::iter::once((region.clone(), ResultNode::Branch(branch))).collect();

        let selected = select_substructure(std::iter::once(result), region.as_str(), substructure);
        for selection in select_fractions(selected, substructure, cell_type) {
            let mut line = serde_json::to_value(&selection)?;
            if let Some(obj) = line.as_object_mut() {
                obj.insert("region".to_string(), region.as_str().into());
                obj.insert("substructure".to_string(), substructure.into());
            }
            lines.push(line);
        }
    }
    Ok(lines)
}

/// Census the configured regions and store the rows
///
/// Unknown or empty regions are skipped; when nothing is left an empty row
/// set is handed to the writer. Returns the number of rows stored.
fn run(args: &Args, config: &CerebrumConfig) -> Result<usize> {
    let custom_taxonomy;
    let taxonomy: &Taxonomy = match &config.census.taxonomy_file {
        Some(path) => {
            custom_taxonomy = load_taxonomy(path)?;
            &custom_taxonomy
        }
        None => Taxonomy::abc_mouse(),
    };

    let cache = MetadataCache::new(
        config.cache.download_base.clone(),
        config.cache.dataset.clone(),
        config.cache.metadata_key.clone(),
    );
    let query = CcfFractionQuery::new(taxonomy, CsvCellSource::from_cache(cache))
        .with_parallel(config.census.parallel);

    let report = query.report(&ExecParams::new(config.census.regions.iter().cloned()));
    for skipped in &report.skipped {
        warn!(target: "region-census", "Region {} skipped: {}", skipped.region, skipped.reason);
    }
    if report.is_empty() {
        warn!(target: "region-census", "None of the requested regions produced rows");
    }

    if let Some(substructure) = &args.substructure {
        for line in selection_lines(&report, substructure, args.cell_type.as_deref())? {
            println!("{}", line);
        }
    }

    let rows: Vec<FlatRow> = match args.rows {
        RowKind::Fractions => flatten_rows(std::iter::once(report.into_query_result())).collect(),
        RowKind::Counts => report.count_rows(),
    };

    let mut writer = open_writer(config)?;
    let written = writer
        .write_rows(&rows)
        .context("Failed to store census rows")?;
    info!(
        target: "region-census",
        "Stored {} rows in {}",
        written,
        config.storage.path.display()
    );
    Ok(written)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config, from_file) = resolve_config(&args)?;
    validate_config(&config).context("Invalid configuration")?;

    let mut debug_flags = CrateDebugFlags::from_crate_names(&args.debug);
    if let Ok(value) = std::env::var(DEBUG_ENV_VAR) {
        debug_flags.merge_env_value(&value);
    }
    let _logging = init_logging(&debug_flags, &logging_config(&config))?;

    if !from_file {
        warn!(target: "region-census", "No configuration file found; using defaults");
    }
    for warning in config_warnings(&config) {
        warn!(target: "region-census", "{}", warning);
    }
    if config.census.regions.is_empty() {
        bail!("No regions requested; pass --region or set census.regions");
    }

    if config.census.parallel && config.system.max_threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(config.system.max_threads)
            .build_global()
        {
            warn!(target: "region-census", "Could not size thread pool: {}", e);
        }
    }

    run(&args, &config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const CELLS: &str = "\
cell_label,class,subclass,parcellation_structure,parcellation_substructure
c1,01 IT-ET Glut,022 L5 ET CTX Glut,VISp,VISp5
c2,07 CTX-MGE GABA,052 Pvalb Gaba,VISp,VISp5
c3,01 IT-ET Glut,007 L2/3 IT CTX Glut,VISp,VISp2/3
c4,01 IT-ET Glut,022 L5 ET CTX Glut,MOp,MOp5
";

    fn seed_cache(base: &Path) {
        let views = base
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
    }

    fn args_and_config(argv: &[&str]) -> (Args, CerebrumConfig) {
        let args = Args::try_parse_from(std::iter::once("region-census").chain(argv.iter().copied()))
            .unwrap();
        let mut config = CerebrumConfig::default();
        apply_cli_overrides(&mut config, &args.overrides());
        validate_config(&config).unwrap();
        (args, config)
    }

    fn table_exists(db: &Path, table: &str) -> bool {
        let conn = rusqlite::Connection::open(db).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        count > 0
    }

    #[test]
    fn test_unknown_region_stores_nothing_and_succeeds() {
        let dir = tempdir().unwrap();
        seed_cache(dir.path());
        let base = dir.path().display().to_string();
        let db = dir.path().join("census.db");
        let db_arg = db.display().to_string();

        let (args, config) =
            args_and_config(&["--region", "MOp", "--download-base", &base, "--output", &db_arg]);
        assert_eq!(run(&args, &config).unwrap(), 1);
        assert!(table_exists(&db, "abm_mouse"));

        let (args, config) =
            args_and_config(&["--region", "NOPE", "--download-base", &base, "--output", &db_arg]);
        assert_eq!(run(&args, &config).unwrap(), 0);
        assert!(!table_exists(&db, "abm_mouse"));
    }

    #[test]
    fn test_missing_cache_stores_nothing_and_succeeds() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("empty-cache").display().to_string();
        let out = dir.path().join("rows.jsonl");
        let out_arg = out.display().to_string();

        let (args, config) = args_and_config(&[
            "--region",
            "VISp",
            "--download-base",
            &base,
            "--backend",
            "json_lines",
            "--output",
            &out_arg,
        ]);
        assert_eq!(run(&args, &config).unwrap(), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "");
    }

    #[test]
    fn test_repeated_region_censused_once() {
        let dir = tempdir().unwrap();
        seed_cache(dir.path());
        let base = dir.path().display().to_string();
        let db = dir.path().join("census.db").display().to_string();

        let (args, config) = args_and_config(&[
            "--region",
            "VISp,MOp,VISp",
            "--download-base",
            &base,
            "--output",
            &db,
            "--no-parallel",
        ]);
        assert_eq!(config_warnings(&config).len(), 1);
        assert_eq!(run(&args, &config).unwrap(), 3);
    }

    #[test]
    fn test_selection_lines_per_region() {
        let dir = tempdir().unwrap();
        seed_cache(dir.path());
        let cache = MetadataCache::new(
            dir.path(),
            "MERFISH-C57BL6J-638850-CCF",
            "cell_metadata_with_parcellation_annotation",
        );
        let query = CcfFractionQuery::new(Taxonomy::abc_mouse(), CsvCellSource::from_cache(cache))
            .with_parallel(false);
        let report = query.report(&ExecParams::new(["VISp", "MOp"]));

        let lines = selection_lines(&report, "VISp5", Some("Pvalb")).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["region"], "VISp");
        assert_eq!(lines[0]["inh_fraction"], serde_json::json!(0.5));
        assert_eq!(lines[0]["fraction"], serde_json::json!(1.0));
        assert_eq!(lines[1]["region"], "MOp");
        assert!(lines[1]["inh_fraction"].is_null());
    }
}
