// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always goes to stderr so that row output on stdout stays
//! machine readable. With the `file-logging` feature and
//! [`LoggingConfig::file_logging`] set, a JSON log is also written to a
//! timestamped run folder:
//!
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── cerebrum.log
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Keeps file writers alive; logs are flushed when dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder of this process, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Install the global tracing subscriber
///
/// # Errors
///
/// Returns error if the filter directives are invalid, the run folder cannot
/// be created, or a global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    let directives = debug_flags.to_filter_string(&config.level);
    let make_filter = || {
        EnvFilter::try_new(&directives)
            .with_context(|| format!("Invalid log filter: {}", directives))
    };

    let mut layers = Vec::new();

    let console_layer = match config.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(make_filter()?)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_filter(make_filter()?)
            .boxed(),
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let mut file_guards = Vec::new();
    #[cfg_attr(not(feature = "file-logging"), allow(unused_mut))]
    let mut log_dir = None;

    #[cfg(feature = "file-logging")]
    {
        if config.file_logging {
            let run_folder = create_run_folder(&config.log_dir)?;
            cleanup_old_logs(&config.log_dir, config.retention_days, config.retention_runs)?;

            let appender = tracing_appender::rolling::daily(&run_folder, "cerebrum.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_guards.push(guard);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(make_filter()?)
                .boxed();
            layers.push(file_layer);
            log_dir = Some(run_folder);
        }
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if config.file_logging && log_dir.is_none() {
        tracing::warn!(
            target: "cerebrum-observability",
            "File logging requested but the file-logging feature is disabled"
        );
    }

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        log_dir,
    })
}

/// Initialize console logging with default settings
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, &LoggingConfig::default())
}

/// Create `run_<timestamp>` under `base_log_dir`
pub fn create_run_folder(base_log_dir: &Path) -> Result<PathBuf> {
    let timestamp = Utc::now().format(RUN_TIMESTAMP_FORMAT);
    let run_folder = base_log_dir.join(format!("{}{}", RUN_PREFIX, timestamp));
    fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    Ok(run_folder)
}

/// Remove run folders older than `retention_days` and all but the newest
/// `retention_runs`. Returns the number of folders removed.
///
/// Directories whose name is not a run timestamp are left alone.
pub fn cleanup_old_logs(
    base_log_dir: &Path,
    retention_days: u64,
    retention_runs: usize,
) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let cutoff_date = Utc::now() - chrono::Duration::days(retention_days as i64);

    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();
    for entry in fs::read_dir(base_log_dir)
        .with_context(|| format!("Failed to list {}", base_log_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX));
        if let Some(stamp) = stamp {
            if let Ok(naive) = NaiveDateTime::parse_from_str(stamp, RUN_TIMESTAMP_FORMAT) {
                runs.push((path, naive.and_utc()));
            }
        }
    }

    // Oldest first
    runs.sort_by_key(|(_, dt)| *dt);
    let excess = runs.len().saturating_sub(retention_runs);

    let mut removed = 0;
    for (idx, (path, dt)) in runs.iter().enumerate() {
        if idx >= excess && *dt >= cutoff_date {
            continue;
        }
        match fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }

    Ok(removed)
}
