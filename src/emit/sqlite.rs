//! Direct SQLite output through `rusqlite`.
//!
//! Every table is written in its own transaction: `recreate_table` opens it,
//! `finish_table` commits it. A failing statement rolls the current table
//! back and leaves tables committed before it in place.

use crate::emit::schema::{EmittedRow, TableSchema};
use crate::emit::sink::TableSink;
use crate::emit::sql::{create_statements, present_cells, upsert_sql};
use anyhow::{Context, Result};
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use tracing::{debug, warn};

/// Writes tables straight into a SQLite database
pub struct SqliteSink {
    conn: Connection,
    id_column: String,
    in_transaction: bool,
}

impl SqliteSink {
    /// Open (or create) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, id_column: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Ok(Self::new(conn, id_column))
    }

    pub fn new(conn: Connection, id_column: impl Into<String>) -> Self {
        SqliteSink {
            conn,
            id_column: id_column.into(),
            in_transaction: false,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn begin(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN").context("Failed to begin transaction")?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT").context("Failed to commit transaction")?;
            self.in_transaction = false;
        }
        Ok(())
    }

    /// Roll the open transaction back when `result` is an error.
    fn rollback_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() && self.in_transaction {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("Rollback failed: {}", e);
            }
            self.in_transaction = false;
        }
        result
    }
}

impl TableSink for SqliteSink {
    fn recreate_table(&mut self, schema: &TableSchema) -> Result<()> {
        let statements = create_statements(schema)?;
        self.begin()?;
        let result = self
            .conn
            .execute_batch(&statements.join("\n"))
            .with_context(|| format!("Failed to create table {}", schema.name));
        self.rollback_on_error(result)
    }

    fn upsert_row(&mut self, schema: &TableSchema, row: &EmittedRow) -> Result<()> {
        let cells: Vec<Option<&str>> = present_cells(schema, row).collect();
        let placeholders: Vec<String> = (1..=cells.len()).map(|n| format!("?{}", n)).collect();
        let sql = upsert_sql(schema, row, &self.id_column, &placeholders)?;

        let result = self
            .conn
            .prepare_cached(&sql)
            .and_then(|mut statement| statement.execute(params_from_iter(cells.iter())))
            .with_context(|| format!("Failed to upsert into {}", schema.name));
        self.rollback_on_error(result).map(|_| ())
    }

    fn finish_table(&mut self, schema: &TableSchema) -> Result<()> {
        let result = self.commit();
        debug!("Committed table {}", schema.name);
        self.rollback_on_error(result)
    }

    fn finish(&mut self) -> Result<()> {
        self.commit()
    }
}
