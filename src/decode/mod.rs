//! Tree decoding - turn parsed elements into generic nested values
//!
//! The legends export has no fixed schema, so every subtree is decoded into
//! the same three-shape value (scalar / map / list) before it is stored.

pub mod element;
pub mod tree;
pub mod value;

pub use element::{parse_document, Element};
pub use tree::{decode, fold_siblings, group_attributes, NAMESPACE_URI_KEY};
pub use value::{GenericValue, ValueMap};
