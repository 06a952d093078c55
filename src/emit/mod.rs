//! Relational emission - schema classification and the storage interface
//!
//! A finished catalog becomes a list of [`EmittedTable`]s (classified columns
//! plus row tuples). Sinks turn those into something a storage backend can
//! load: a SQLite database written directly, a SQLite script, or one JSON
//! Lines file per table.

pub mod jsonl;
pub mod schema;
pub mod sink;
pub mod sql;
pub mod sqlite;

pub use jsonl::JsonLinesSink;
pub use schema::{
    emit, emit_table, table_schema, ColumnDef, ColumnKind, EmittedRow, EmittedTable, TableSchema,
};
pub use sink::{deliver, DeliveryReport, TableSink};
pub use sql::SqlScriptSink;
pub use sqlite::SqliteSink;
