use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

/// One extracted record: column name -> cell text
pub type Row = IndexMap<String, String>;

/// Columns and rows pulled out of one collection of one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedTable {
    /// Entity type, i.e. the collection's tag name
    pub name: String,

    /// Column names in first-seen order
    pub columns: Vec<String>,

    pub rows: Vec<Row>,
}

impl ExtractedTable {
    pub fn new(name: impl Into<String>) -> Self {
        ExtractedTable {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a row, registering any column it introduces.
    pub fn push_row(&mut self, row: Row) {
        for key in row.keys() {
            push_unique(&mut self.columns, key);
        }
        self.rows.push(row);
    }
}

/// Result of extracting one whole document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentPass {
    /// Tag of the document's root element
    pub root_tag: String,

    /// One entry per collection name, in first-seen order
    pub tables: Vec<ExtractedTable>,

    /// Records dropped because they carried no fields
    pub skipped_records: usize,
}

impl DocumentPass {
    pub fn table(&self, name: &str) -> Option<&ExtractedTable> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// The accumulated model of one logical table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableModel {
    pub name: String,

    /// Every column seen for this entity type, first-seen order, no duplicates
    pub columns: Vec<String>,

    pub rows: Vec<Row>,
}

impl TableModel {
    pub fn new(name: impl Into<String>) -> Self {
        TableModel {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Start a model from the first document's extraction, rows kept as-is.
    pub fn from_extracted(extracted: ExtractedTable) -> Self {
        let mut model = TableModel {
            name: extracted.name,
            columns: Vec::with_capacity(extracted.columns.len()),
            rows: Vec::with_capacity(extracted.rows.len()),
        };
        for column in &extracted.columns {
            push_unique(&mut model.columns, column);
        }
        for row in extracted.rows {
            for key in row.keys() {
                push_unique(&mut model.columns, key);
            }
            model.rows.push(row);
        }
        model
    }

    /// Add a column at the end unless already known; true if it was new.
    pub fn add_column(&mut self, column: &str) -> bool {
        push_unique(&mut self.columns, column)
    }

    /// Fixed-order tuples of the requested columns, `""` where a row lacks one.
    pub fn project(&self, columns: &[&str]) -> Vec<Vec<&str>> {
        self.rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(*c).map(String::as_str).unwrap_or(""))
                    .collect()
            })
            .collect()
    }
}

/// All table models of a run, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    tables: Vec<TableModel>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, name: &str) -> Option<&TableModel> {
        self.index.get(name).map(|&idx| &self.tables[idx])
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut TableModel> {
        match self.index.get(name) {
            Some(&idx) => Some(&mut self.tables[idx]),
            None => None,
        }
    }

    pub fn tables(&self) -> &[TableModel] {
        &self.tables
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Register a brand-new table; an existing one of the same name is replaced.
    pub fn insert(&mut self, model: TableModel) {
        match self.index.get(&model.name) {
            Some(&idx) => self.tables[idx] = model,
            None => {
                self.index.insert(model.name.clone(), self.tables.len());
                self.tables.push(model);
            }
        }
    }
}

pub(crate) fn push_unique(columns: &mut Vec<String>, column: &str) -> bool {
    if columns.iter().any(|c| c == column) {
        false
    } else {
        columns.push(column.to_string());
        true
    }
}
