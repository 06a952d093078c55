//! SQLite script rendering of emitted tables.
//!
//! Produces a self-contained script (`sqlite3 legends.db < legends.sql`) that
//! drops, recreates and fills every table inside one transaction.

use crate::emit::schema::{EmittedRow, TableSchema};
use crate::emit::sink::TableSink;
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;

static PLAIN_IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap()
});

// Keywords SQLite refuses as bare identifiers in the statements we emit
const SQLITE_KEYWORDS: &[&str] = &[
    "abort", "action", "add", "all", "alter", "and", "as", "asc", "between", "by", "case", "check",
    "collate", "column", "commit", "conflict", "constraint", "create", "cross", "default",
    "delete", "desc", "distinct", "drop", "else", "end", "escape", "except", "exists", "foreign",
    "from", "full", "group", "having", "if", "in", "index", "inner", "insert", "intersect",
    "into", "is", "isnull", "join", "key", "left", "like", "limit", "natural", "not", "notnull",
    "null", "of", "offset", "on", "or", "order", "outer", "primary", "references", "right",
    "select", "set", "table", "then", "to", "transaction", "union", "unique", "update", "using",
    "values", "when", "where",
];

/// Quote an identifier unless it is a plain, non-keyword name.
pub fn quote_ident(name: &str) -> Result<String> {
    if name.is_empty() {
        bail!("Identifier cannot be empty");
    }
    if name.contains('\0') {
        bail!("Identifier contains a null byte: {:?}", name);
    }
    let keyword = SQLITE_KEYWORDS.contains(&name.to_ascii_lowercase().as_str());
    if PLAIN_IDENTIFIER_REGEX.is_match(name) && !keyword {
        Ok(name.to_string())
    } else {
        Ok(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

/// Render a text literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `DROP TABLE` + `CREATE TABLE` statements for a schema.
pub fn create_statements(schema: &TableSchema) -> Result<Vec<String>> {
    let table = quote_ident(&schema.name)?;
    let mut columns = Vec::with_capacity(schema.columns.len());
    for column in &schema.columns {
        columns.push(format!("{} {}", quote_ident(&column.name)?, column.kind.sql_type()));
    }
    Ok(vec![
        format!("DROP TABLE IF EXISTS {};", table),
        format!("CREATE TABLE {}({});", table, columns.join(",")),
    ])
}

/// `INSERT` for the columns a row carries, upserting on `id_column` when the
/// row has a key. `values` holds one rendered expression (a literal or a
/// placeholder) per present column.
pub fn upsert_sql(
    schema: &TableSchema,
    row: &EmittedRow,
    id_column: &str,
    values: &[String],
) -> Result<String> {
    let mut names = Vec::with_capacity(values.len());
    for (idx, _) in row.present_values() {
        names.push(quote_ident(&schema.columns[idx].name)?);
    }
    if names.is_empty() {
        bail!("Row has no columns");
    }
    if names.len() != values.len() {
        bail!("{} columns but {} values", names.len(), values.len());
    }

    let mut sql = format!(
        "INSERT INTO {}({}) VALUES ({})",
        quote_ident(&schema.name)?,
        names.join(","),
        values.join(",")
    );

    if row.key(schema).is_some() {
        let key = quote_ident(id_column)?;
        let updates: Vec<String> = names
            .iter()
            .filter(|n| **n != key)
            .map(|n| format!("{}=excluded.{}", n, n))
            .collect();
        if updates.is_empty() {
            sql.push_str(&format!(" ON CONFLICT({}) DO NOTHING", key));
        } else {
            sql.push_str(&format!(" ON CONFLICT({}) DO UPDATE SET {}", key, updates.join(",")));
        }
    }
    Ok(sql)
}

/// Present cells of a row, `None` where an integer column holds an empty cell.
pub(crate) fn present_cells<'a>(
    schema: &'a TableSchema,
    row: &'a EmittedRow,
) -> impl Iterator<Item = Option<&'a str>> + 'a {
    // Integer columns cannot hold '', so an empty cell is NULL there
    row.present_values().map(move |(idx, value)| {
        if value.is_empty() && schema.columns[idx].kind.is_integer() {
            None
        } else {
            Some(value)
        }
    })
}

/// Writes SQLite statements for every table to `W`
pub struct SqlScriptSink<W: Write> {
    writer: W,
    id_column: String,
    in_transaction: bool,
}

impl<W: Write> SqlScriptSink<W> {
    pub fn new(writer: W, id_column: impl Into<String>) -> Self {
        SqlScriptSink {
            writer,
            id_column: id_column.into(),
            in_transaction: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Full upsert statement for one row, values inlined as literals.
    pub fn upsert_statement(&self, schema: &TableSchema, row: &EmittedRow) -> Result<String> {
        let values: Vec<String> = present_cells(schema, row)
            .map(|cell| match cell {
                Some(value) => quote_literal(value),
                None => "NULL".to_string(),
            })
            .collect();
        let mut sql = upsert_sql(schema, row, &self.id_column, &values)?;
        sql.push(';');
        Ok(sql)
    }
}

impl<W: Write> TableSink for SqlScriptSink<W> {
    fn recreate_table(&mut self, schema: &TableSchema) -> Result<()> {
        if !self.in_transaction {
            writeln!(self.writer, "BEGIN;").context("Failed to write script")?;
            self.in_transaction = true;
        }
        for statement in create_statements(schema)? {
            writeln!(self.writer, "{}", statement).context("Failed to write script")?;
        }
        Ok(())
    }

    fn upsert_row(&mut self, schema: &TableSchema, row: &EmittedRow) -> Result<()> {
        let statement = self.upsert_statement(schema, row)?;
        writeln!(self.writer, "{}", statement).context("Failed to write script")
    }

    fn finish(&mut self) -> Result<()> {
        if self.in_transaction {
            writeln!(self.writer, "COMMIT;").context("Failed to write script")?;
            self.in_transaction = false;
        }
        self.writer.flush().context("Failed to flush script")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportConfig;
    use crate::emit::schema::emit_table;
    use crate::emit::sink::deliver;
    use crate::table::{ExtractedTable, Row, TableModel};

    fn regions() -> TableModel {
        let mut extracted = ExtractedTable::new("regions");
        let rows: Vec<Vec<(&str, &str)>> = vec![
            vec![("id", "1"), ("name", "Foo's"), ("type", "Forest")],
            vec![("id", "2")],
            vec![("name", "nameless"), ("group", "x")],
        ];
        for fields in rows {
            let row: Row = fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            extracted.push_row(row);
        }
        TableModel::from_extracted(extracted)
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("civ_id").unwrap(), "civ_id");
        assert_eq!(quote_ident("order").unwrap(), "\"order\"");
        assert_eq!(quote_ident("a-b").unwrap(), "\"a-b\"");
        assert_eq!(quote_ident("say\"what").unwrap(), "\"say\"\"what\"");
        assert!(quote_ident("").is_err());
    }

    #[test]
    fn test_create_statements() {
        let table = emit_table(&regions(), &ImportConfig::default());
        let statements = create_statements(&table.schema).unwrap();
        assert_eq!(statements[0], "DROP TABLE IF EXISTS regions;");
        assert_eq!(
            statements[1],
            "CREATE TABLE regions(id INTEGER PRIMARY KEY,name TEXT,type TEXT,grp TEXT);"
        );
    }

    #[test]
    fn test_upsert_statements() {
        let table = emit_table(&regions(), &ImportConfig::default());
        let sink = SqlScriptSink::new(Vec::new(), "id");

        assert_eq!(
            sink.upsert_statement(&table.schema, &table.rows[0]).unwrap(),
            "INSERT INTO regions(id,name,type) VALUES ('1','Foo''s','Forest') \
             ON CONFLICT(id) DO UPDATE SET name=excluded.name,type=excluded.type;"
        );
        assert_eq!(
            sink.upsert_statement(&table.schema, &table.rows[1]).unwrap(),
            "INSERT INTO regions(id) VALUES ('2') ON CONFLICT(id) DO NOTHING;"
        );
        assert_eq!(
            sink.upsert_statement(&table.schema, &table.rows[2]).unwrap(),
            "INSERT INTO regions(name,grp) VALUES ('nameless','x');"
        );
    }

    #[test]
    fn test_script_is_one_transaction() {
        let table = emit_table(&regions(), &ImportConfig::default());
        let mut sink = SqlScriptSink::new(Vec::new(), "id");
        deliver(&[table], &mut sink).unwrap();

        let script = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = script.lines().collect();
        assert_eq!(lines.first(), Some(&"BEGIN;"));
        assert_eq!(lines.last(), Some(&"COMMIT;"));
        assert_eq!(lines.len(), 7);
    }
}
