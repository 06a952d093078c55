//! Storage-layer interface.
//!
//! The pipeline never talks to a database itself. It hands finished tables to
//! a [`TableSink`], which is asked to recreate each table and upsert its rows
//! keyed by the primary key when a row has one.

use crate::emit::schema::{EmittedRow, EmittedTable, TableSchema};
use crate::error::{ImportError, Result};
use anyhow::Result as SinkResult;
use serde::Serialize;
use tracing::info;

pub trait TableSink {
    /// Drop any previous table of this name and declare it afresh.
    fn recreate_table(&mut self, schema: &TableSchema) -> SinkResult<()>;

    /// Insert a row, or update the fields it carries when its key already exists.
    fn upsert_row(&mut self, schema: &TableSchema, row: &EmittedRow) -> SinkResult<()>;

    /// Called once all rows of a table went through.
    fn finish_table(&mut self, _schema: &TableSchema) -> SinkResult<()> {
        Ok(())
    }

    /// Called once after the last table.
    fn finish(&mut self) -> SinkResult<()> {
        Ok(())
    }
}

/// Tables written by [`deliver`], with their row counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub tables: Vec<(String, usize)>,
}

impl DeliveryReport {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows).sum()
    }
}

/// Push every table through a sink, in order.
///
/// The first failure stops the run: the failing table gets no further rows and
/// later tables are not started. Tables finished before it are left alone.
pub fn deliver<S: TableSink + ?Sized>(
    tables: &[EmittedTable],
    sink: &mut S,
) -> Result<DeliveryReport> {
    let mut report = DeliveryReport::default();

    for table in tables {
        let schema = &table.schema;
        info!("Writing table {} ({} rows)", schema.name, table.rows.len());

        sink.recreate_table(schema)
            .map_err(|e| ImportError::storage(&schema.name, None, format!("{:#}", e)))?;

        for (idx, row) in table.rows.iter().enumerate() {
            sink.upsert_row(schema, row)
                .map_err(|e| ImportError::storage(&schema.name, Some(idx), format!("{:#}", e)))?;
        }

        sink.finish_table(schema)
            .map_err(|e| ImportError::storage(&schema.name, None, format!("{:#}", e)))?;
        report.tables.push((schema.name.clone(), table.rows.len()));
    }

    sink.finish()
        .map_err(|e| ImportError::storage("<all>", None, format!("{:#}", e)))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::schema::{ColumnDef, ColumnKind};
    use anyhow::bail;

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<String>,
        fail_on: Option<(String, String)>,
    }

    impl TableSink for RecordingSink {
        fn recreate_table(&mut self, schema: &TableSchema) -> SinkResult<()> {
            self.events.push(format!("create {}", schema.name));
            Ok(())
        }

        fn upsert_row(&mut self, schema: &TableSchema, row: &EmittedRow) -> SinkResult<()> {
            if let Some((table, value)) = &self.fail_on {
                if *table == schema.name && row.values[0] == *value {
                    bail!("UNIQUE constraint failed");
                }
            }
            self.events.push(format!("row {} {}", schema.name, row.values[0]));
            Ok(())
        }

        fn finish(&mut self) -> SinkResult<()> {
            self.events.push("done".to_string());
            Ok(())
        }
    }

    fn emitted(name: &str, ids: &[&str]) -> EmittedTable {
        EmittedTable {
            schema: TableSchema {
                name: name.to_string(),
                source_name: name.to_string(),
                columns: vec![ColumnDef {
                    name: "id".to_string(),
                    source_name: "id".to_string(),
                    kind: ColumnKind::PrimaryKey,
                }],
            },
            rows: ids
                .iter()
                .map(|id| EmittedRow {
                    values: vec![id.to_string()],
                    present: vec![true],
                })
                .collect(),
        }
    }

    #[test]
    fn test_delivers_in_order() {
        let mut sink = RecordingSink::default();
        let tables = [emitted("a", &["1", "2"]), emitted("b", &["3"])];
        let report = deliver(&tables, &mut sink).unwrap();

        assert_eq!(
            sink.events,
            vec!["create a", "row a 1", "row a 2", "create b", "row b 3", "done"]
        );
        assert_eq!(report.total_rows(), 3);
    }

    #[test]
    fn test_failure_aborts_table_and_keeps_earlier_ones() {
        let mut sink = RecordingSink {
            fail_on: Some(("b".to_string(), "4".to_string())),
            ..Default::default()
        };
        let tables = [emitted("a", &["1"]), emitted("b", &["3", "4", "5"]), emitted("c", &["6"])];

        let err = deliver(&tables, &mut sink).unwrap_err();
        match err {
            ImportError::Storage { table, row, message } => {
                assert_eq!(table, "b");
                assert_eq!(row, Some(1));
                assert!(message.contains("UNIQUE"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sink.events, vec!["create a", "row a 1", "create b", "row b 3"]);
    }
}
