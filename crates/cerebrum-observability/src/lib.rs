// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # cerebrum-observability
//!
//! Logging setup shared by Cerebrum binaries.
//!
//! Every crate logs through the `tracing` facade with its crate name as the
//! target; this crate installs the subscriber and maps per-crate debug flags
//! onto `EnvFilter` directives.
//!
//! ## Features
//! - `file-logging`: JSON log file in a timestamped run folder with retention cleanup

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

// Re-export commonly used items
pub use cli::*;
pub use config::*;
pub use init::*;

/// Crate names accepted by debug flags (also the `tracing` targets)
pub const KNOWN_CRATES: &[&str] = &[
    "cerebrum-census",
    "cerebrum-io",
    "cerebrum-config",
    "cerebrum-observability",
    "region-census",
];
