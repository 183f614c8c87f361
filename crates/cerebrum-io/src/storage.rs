// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Census row storage.

Rows are schema-less ([`FlatRow`]); writers derive the table layout from the
rows they receive. The column set is the union over all rows in first-seen
order, and a row lacking a column stores NULL there.

Undefined ratios are stored as the text sentinel
[`UNDEFINED_SENTINEL`](cerebrum_census::UNDEFINED_SENTINEL).
*/

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use cerebrum_census::{FlatRow, Scalar, UNDEFINED_SENTINEL};
use indexmap::IndexMap;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid table name '{0}'")]
    InvalidTableName(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Sink for flattened census rows
pub trait RowWriter {
    /// Store `rows`, returning how many were written
    fn write_rows(&mut self, rows: &[FlatRow]) -> StorageResult<usize>;
}

impl<W: RowWriter + ?Sized> RowWriter for Box<W> {
    fn write_rows(&mut self, rows: &[FlatRow]) -> StorageResult<usize> {
        (**self).write_rows(rows)
    }
}

// ============================================================================
// SQLite
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    fn of(value: &Scalar) -> Self {
        match value {
            Scalar::Int(_) => ColumnType::Integer,
            Scalar::Float(_) | Scalar::Undefined => ColumnType::Real,
            Scalar::Text(_) => ColumnType::Text,
        }
    }

    fn widen(self, other: ColumnType) -> Self {
        use ColumnType::*;
        match (self, other) {
            (Text, _) | (_, Text) => Text,
            (Real, _) | (_, Real) => Real,
            _ => Integer,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(value: Option<&Scalar>) -> Value {
    match value {
        None => Value::Null,
        Some(Scalar::Int(v)) => Value::Integer(*v),
        Some(Scalar::Float(v)) if v.is_nan() => Value::Text(UNDEFINED_SENTINEL.to_string()),
        Some(Scalar::Float(v)) => Value::Real(*v),
        Some(Scalar::Text(s)) => Value::Text(s.clone()),
        Some(Scalar::Undefined) => Value::Text(UNDEFINED_SENTINEL.to_string()),
    }
}

/// Union of row columns in first-seen order with their widened types
fn column_layout(rows: &[FlatRow]) -> IndexMap<&str, ColumnType> {
    let mut layout: IndexMap<&str, ColumnType> = IndexMap::new();
    for row in rows {
        for (name, value) in row {
            let ty = ColumnType::of(value);
            layout
                .entry(name.as_str())
                .and_modify(|existing| *existing = existing.widen(ty))
                .or_insert(ty);
        }
    }
    layout
}

/// Writes rows into a SQLite table, replacing any previous contents
pub struct SqliteRowWriter {
    conn: Connection,
    table: String,
}

impl SqliteRowWriter {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>, table: impl Into<String>) -> StorageResult<Self> {
        Self::with_connection(Connection::open(path)?, table)
    }

    pub fn open_in_memory(table: impl Into<String>) -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: impl Into<String>) -> StorageResult<Self> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(StorageError::InvalidTableName(table));
        }
        Ok(Self { conn, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl RowWriter for SqliteRowWriter {
    /// Drop and recreate the table, then insert every row in one transaction
    ///
    /// With no rows the table is dropped and not recreated.
    fn write_rows(&mut self, rows: &[FlatRow]) -> StorageResult<usize> {
        let table = quote_identifier(&self.table);
        let layout = column_layout(rows);

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;

        if layout.is_empty() {
            tx.commit()?;
            warn!(target: "cerebrum-io", "No rows to write; table {} dropped", self.table);
            return Ok(0);
        }

        let column_defs = layout
            .iter()
            .map(|(name, ty)| format!("{} {}", quote_identifier(name), ty.sql()))
            .collect::<Vec<_>>()
            .join(", ");
        tx.execute(&format!("CREATE TABLE {} ({})", table, column_defs), [])?;

        let column_list = layout
            .keys()
            .map(|name| quote_identifier(name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=layout.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table, column_list, placeholders
            ))?;
            for row in rows {
                let values = layout.keys().map(|name| to_sql_value(row.get(*name)));
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        info!(
            target: "cerebrum-io",
            "Wrote {} rows ({} columns) to table {}",
            rows.len(),
            layout.len(),
            self.table
        );
        Ok(rows.len())
    }
}

// ============================================================================
// JSON lines
// ============================================================================

/// Writes one JSON object per row
pub struct JsonLinesWriter<W: Write> {
    out: W,
}

impl JsonLinesWriter<BufWriter<File>> {
    /// Create (truncate) a file
    pub fn create(path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RowWriter for JsonLinesWriter<W> {
    fn write_rows(&mut self, rows: &[FlatRow]) -> StorageResult<usize> {
        for row in rows {
            serde_json::to_writer(&mut self.out, row)?;
            self.out.write_all(b"\n")?;
        }
        self.out.flush()?;
        Ok(rows.len())
    }
}
