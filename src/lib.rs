//! # legends-db - Legends Export to Relational Tables
//!
//! Converts the pair of XML documents a world-history export consists of (a
//! base document plus a `_plus` supplement describing the same entities) into
//! relational tables whose columns are inferred from what the records carry.
//!
//! ## Modules
//!
//! - **decode**: Parse documents and decode subtrees into generic nested values
//! - **table**: Extract rows per collection and merge the two documents by `id`
//! - **emit**: Classify columns and hand tables to a storage sink (SQLite
//!   database, SQL script, JSON Lines)
//! - **pipeline**: Resolve the input pair and run both passes in order
//!
//! ## Quick Start
//!
//! ```rust
//! use legends_db::{emit, Converter, ImportConfig};
//!
//! # fn main() -> legends_db::Result<()> {
//! let base = r#"<df_world><regions>
//!     <region><id>1</id><name>Foo</name><type>Forest</type></region>
//! </regions></df_world>"#;
//! let plus = r#"<df_world><regions>
//!     <region><id>1</id><evilness>12</evilness></region>
//! </regions></df_world>"#;
//!
//! let config = ImportConfig::default();
//! let catalog = Converter::new(config.clone()).convert_str(base, plus)?;
//!
//! let regions = catalog.table("regions").unwrap();
//! assert_eq!(regions.columns, vec!["id", "name", "type", "evilness"]);
//!
//! // Classified schema and row tuples, ready for a storage sink
//! let tables = emit(&catalog, &config);
//! assert_eq!(tables[0].rows[0].values, vec!["1", "Foo", "Forest", "12"]);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

pub mod config;
pub mod decode;
pub mod emit;
pub mod error;
pub mod pipeline;
pub mod table;

// Re-export commonly used types for convenience
pub use config::{DocumentEncoding, ImportConfig, ReservedAlias};
pub use decode::{decode, parse_document, Element, GenericValue};
pub use emit::{
    deliver, emit, DeliveryReport, EmittedTable, JsonLinesSink, SqlScriptSink, SqliteSink,
    TableSink,
};
pub use error::{ImportError, Result};
pub use pipeline::{Converter, InputPair};
pub use table::{merge, Catalog, RecordExtractor, TableModel};

/// Main entry point: import the document pair next to `base_path` into `sink`
pub fn import_legends<S: TableSink + ?Sized>(
    base_path: &Path,
    sink: &mut S,
    config: &ImportConfig,
) -> Result<DeliveryReport> {
    let inputs = InputPair::from_base(base_path, config);
    import_pair(&inputs, sink, config)
}

/// Same as [`import_legends`] with an explicit supplemental path
pub fn import_pair<S: TableSink + ?Sized>(
    inputs: &InputPair,
    sink: &mut S,
    config: &ImportConfig,
) -> Result<DeliveryReport> {
    let catalog = Converter::new(config.clone()).convert_files(inputs)?;
    let tables = emit(&catalog, config);
    deliver(&tables, sink)
}
