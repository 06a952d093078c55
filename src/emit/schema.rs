//! Classified schema and row tuples for a finished table.

use crate::config::ImportConfig;
use crate::table::{Catalog, TableModel};
use serde::Serialize;
use tracing::{info, warn};

/// Storage type class of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// The key column itself
    PrimaryKey,
    /// Name ends in `id`: an integer reference to another entity
    Reference,
    Text,
}

impl ColumnKind {
    pub fn classify(name: &str, id_column: &str) -> Self {
        if name == id_column {
            ColumnKind::PrimaryKey
        } else if name.ends_with("id") {
            ColumnKind::Reference
        } else {
            ColumnKind::Text
        }
    }

    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::PrimaryKey => "INTEGER PRIMARY KEY",
            ColumnKind::Reference => "INTEGER",
            ColumnKind::Text => "TEXT",
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, ColumnKind::Text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    /// Name used in storage (after reserved-word aliasing)
    pub name: String,
    /// Name as it appeared in the documents
    pub source_name: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    /// Storage name of the table
    pub name: String,
    pub source_name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Index of the primary key column, if the table has one.
    pub fn primary_key(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.kind == ColumnKind::PrimaryKey)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// One row in schema column order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedRow {
    /// One value per schema column, `""` where the row has no such field
    pub values: Vec<String>,
    /// Whether the row actually carried each column
    pub present: Vec<bool>,
}

impl EmittedRow {
    /// Columns the row carried, as (column index, value).
    pub fn present_values(&self) -> impl Iterator<Item = (usize, &str)> {
        self.values
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.present[*idx])
            .map(|(idx, v)| (idx, v.as_str()))
    }

    /// Value of the primary key when present and non-empty.
    pub fn key<'a>(&'a self, schema: &TableSchema) -> Option<&'a str> {
        let idx = schema.primary_key()?;
        if self.present[idx] && !self.values[idx].is_empty() {
            Some(&self.values[idx])
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedTable {
    pub schema: TableSchema,
    pub rows: Vec<EmittedRow>,
}

/// Build the storage schema of one table.
pub fn table_schema(model: &TableModel, config: &ImportConfig) -> TableSchema {
    let mut columns: Vec<ColumnDef> = Vec::with_capacity(model.columns.len());
    for source in &model.columns {
        let aliased = config.storage_name(source);
        let name = disambiguate(aliased, |name| {
            columns.iter().any(|c| c.name.eq_ignore_ascii_case(name))
        });
        if name != aliased {
            warn!(
                "Column {} of {} collides after aliasing, stored as {}",
                source, model.name, name
            );
        }
        let kind = ColumnKind::classify(&name, &config.id_column);
        columns.push(ColumnDef {
            name,
            source_name: source.clone(),
            kind,
        });
    }

    TableSchema {
        name: config.storage_name(&model.name).to_string(),
        source_name: model.name.clone(),
        columns,
    }
}

/// Append `_` until the name is free. SQLite compares identifiers without
/// regard to ASCII case, so callers check case-insensitively.
fn disambiguate(name: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let mut name = name.to_string();
    while is_taken(&name) {
        name.push('_');
    }
    name
}

/// Lay out a finished table as schema plus row tuples.
pub fn emit_table(model: &TableModel, config: &ImportConfig) -> EmittedTable {
    let schema = table_schema(model, config);
    let rows = model
        .rows
        .iter()
        .map(|row| {
            let mut values = Vec::with_capacity(schema.columns.len());
            let mut present = Vec::with_capacity(schema.columns.len());
            for column in &schema.columns {
                match row.get(&column.source_name) {
                    Some(value) => {
                        values.push(value.clone());
                        present.push(true);
                    }
                    None => {
                        values.push(String::new());
                        present.push(false);
                    }
                }
            }
            EmittedRow { values, present }
        })
        .collect();

    EmittedTable { schema, rows }
}

/// Emit every table of a finished catalog.
///
/// Storage table names are unique across the result: a table whose aliased
/// name is already in use gets `_` appended.
pub fn emit(catalog: &Catalog, config: &ImportConfig) -> Vec<EmittedTable> {
    let mut tables: Vec<EmittedTable> = Vec::with_capacity(catalog.len());
    for model in catalog.tables() {
        if config.skip_empty_tables && model.columns.is_empty() {
            info!("Skipping empty table: {}", model.name);
            continue;
        }

        let mut table = emit_table(model, config);
        let name = disambiguate(&table.schema.name, |name| {
            tables.iter().any(|t| t.schema.name.eq_ignore_ascii_case(name))
        });
        if name != table.schema.name {
            warn!("Table {} collides after aliasing, stored as {}", model.name, name);
            table.schema.name = name;
        }
        tables.push(table);
    }
    tables
}
