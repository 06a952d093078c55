//! Reconciling a later document's rows into the accumulated tables.
//!
//! Columns are unioned (existing order kept, new names appended). A row that
//! carries the key column and matches an existing row updates only the fields
//! it has; every other row is appended. Later documents win per field.

use crate::table::types::{Catalog, DocumentPass, ExtractedTable, TableModel};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// What a merge did to one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub new_columns: usize,
    pub updated_rows: usize,
    pub appended_rows: usize,
}

/// Merge `incoming` into `existing` and return the result.
pub fn merge(mut existing: TableModel, incoming: ExtractedTable, key_column: &str) -> TableModel {
    merge_into(&mut existing, incoming, key_column);
    existing
}

/// In-place form of [`merge`].
pub fn merge_into(
    existing: &mut TableModel,
    incoming: ExtractedTable,
    key_column: &str,
) -> MergeStats {
    let mut stats = MergeStats::default();

    let row_keys = incoming.rows.iter().flat_map(|row| row.keys());
    for column in incoming.columns.iter().chain(row_keys) {
        if existing.add_column(column) {
            stats.new_columns += 1;
        }
    }

    // First row per key wins the lookup, matching a linear scan
    let mut by_key: HashMap<String, usize> = HashMap::new();
    for (idx, row) in existing.rows.iter().enumerate() {
        if let Some(key) = row.get(key_column) {
            by_key.entry(key.clone()).or_insert(idx);
        }
    }

    for row in incoming.rows {
        let target = row.get(key_column).and_then(|key| by_key.get(key).copied());
        match target {
            Some(idx) => {
                existing.rows[idx].extend(row);
                stats.updated_rows += 1;
            }
            None => {
                if let Some(key) = row.get(key_column) {
                    by_key.insert(key.clone(), existing.rows.len());
                }
                existing.rows.push(row);
                stats.appended_rows += 1;
            }
        }
    }

    stats
}

impl Catalog {
    /// Fold one document's extraction into the catalog.
    ///
    /// Unknown tables are created as extracted; known ones are merged.
    pub fn absorb(&mut self, pass: DocumentPass, key_column: &str) {
        for incoming in pass.tables {
            match self.table_mut(&incoming.name) {
                Some(existing) => {
                    let name = incoming.name.clone();
                    let stats = merge_into(existing, incoming, key_column);
                    debug!(
                        "Merged {}: {} new columns, {} rows updated, {} rows appended",
                        name, stats.new_columns, stats.updated_rows, stats.appended_rows
                    );
                }
                None => self.insert(TableModel::from_extracted(incoming)),
            }
        }
    }
}
