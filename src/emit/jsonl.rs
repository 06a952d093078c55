use crate::emit::schema::{EmittedRow, TableSchema};
use crate::emit::sink::TableSink;
use anyhow::{Context, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes each table to `<table>.jsonl` (one object per row) next to a
/// `<table>.schema.json` holding its classified columns.
///
/// Rows arrive already reconciled, so the upsert degenerates to an append.
pub struct JsonLinesSink {
    output_dir: PathBuf,
    writers: HashMap<String, BufWriter<File>>,
}

impl JsonLinesSink {
    /// Create a sink writing into `output_dir`, creating it if needed
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        std::fs::create_dir_all(&output_dir)
            .context("Failed to create output directory")?;

        Ok(JsonLinesSink {
            output_dir: output_dir.as_ref().to_path_buf(),
            writers: HashMap::new(),
        })
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{}.jsonl", table))
    }

    pub fn schema_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{}.schema.json", table))
    }
}

/// A row as a JSON object of its present columns, in schema order
struct RowObject<'a> {
    schema: &'a TableSchema,
    row: &'a EmittedRow,
}

impl Serialize for RowObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (idx, value) in self.row.present_values() {
            map.serialize_entry(&self.schema.columns[idx].name, value)?;
        }
        map.end()
    }
}

impl TableSink for JsonLinesSink {
    fn recreate_table(&mut self, schema: &TableSchema) -> Result<()> {
        let schema_path = self.schema_path(&schema.name);
        let schema_json = serde_json::to_string_pretty(schema)
            .context("Failed to serialize schema")?;
        std::fs::write(&schema_path, schema_json)
            .context(format!("Failed to write file: {}", schema_path.display()))?;

        let path = self.table_path(&schema.name);
        let file = File::create(&path)
            .context(format!("Failed to open file: {}", path.display()))?;
        self.writers.insert(schema.name.clone(), BufWriter::new(file));
        Ok(())
    }

    fn upsert_row(&mut self, schema: &TableSchema, row: &EmittedRow) -> Result<()> {
        let writer = self
            .writers
            .get_mut(&schema.name)
            .context(format!("Table {} was never created", schema.name))?;
        let json = serde_json::to_string(&RowObject { schema, row })
            .context("Failed to serialize row")?;
        writeln!(writer, "{}", json).context("Failed to write row")
    }

    fn finish_table(&mut self, schema: &TableSchema) -> Result<()> {
        if let Some(mut writer) = self.writers.remove(&schema.name) {
            writer.flush().context("Failed to flush writer")?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush().context("Failed to flush writer")?;
        }
        Ok(())
    }
}
