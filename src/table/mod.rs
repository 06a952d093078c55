//! Relational tables inferred from the legends documents
//!
//! Records are extracted per collection, accumulated into one `TableModel`
//! per entity type, and reconciled across documents by primary key.

pub mod extractor;
pub mod merge;
pub mod types;

pub use extractor::RecordExtractor;
pub use merge::{merge, merge_into, MergeStats};
pub use types::{Catalog, DocumentPass, ExtractedTable, Row, TableModel};
