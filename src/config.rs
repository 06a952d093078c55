//! Per-run configuration for the import pipeline.

use crate::error::{ImportError, Result};
use codepage_437::{FromCp437, CP437_CONTROL};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Text encoding of an input document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentEncoding {
    Utf8,
    /// IBM code page 437, what the game writes for the base export
    Cp437,
    /// Any other WHATWG encoding label (e.g. `windows-1252`)
    Label(String),
}

impl DocumentEncoding {
    /// Decode raw document bytes into text.
    pub fn decode(&self, bytes: Vec<u8>) -> Result<String> {
        match self {
            DocumentEncoding::Cp437 => Ok(String::from_cp437(bytes, &CP437_CONTROL)),
            DocumentEncoding::Utf8 => Ok(decode_with(encoding_rs::UTF_8, &bytes)),
            DocumentEncoding::Label(label) => {
                let encoding = encoding_rs::Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                    ImportError::Config(format!("Unknown encoding label: {}", label))
                })?;
                Ok(decode_with(encoding, &bytes))
            }
        }
    }
}

fn decode_with(encoding: &'static encoding_rs::Encoding, bytes: &[u8]) -> String {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!("Invalid {} sequences replaced while decoding", used.name());
    }
    text.into_owned()
}

impl FromStr for DocumentEncoding {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => DocumentEncoding::Utf8,
            "cp437" | "ibm437" | "437" => DocumentEncoding::Cp437,
            _ => DocumentEncoding::Label(s.to_string()),
        })
    }
}

impl From<String> for DocumentEncoding {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(encoding) => encoding,
            Err(never) => match never {},
        }
    }
}

impl From<DocumentEncoding> for String {
    fn from(encoding: DocumentEncoding) -> Self {
        match encoding {
            DocumentEncoding::Utf8 => "utf-8".to_string(),
            DocumentEncoding::Cp437 => "cp437".to_string(),
            DocumentEncoding::Label(label) => label,
        }
    }
}

/// A storage keyword and the spelling used in its place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedAlias {
    pub reserved: String,
    pub alias: String,
}

impl ReservedAlias {
    pub fn new(reserved: impl Into<String>, alias: impl Into<String>) -> Self {
        ReservedAlias {
            reserved: reserved.into(),
            alias: alias.into(),
        }
    }
}

/// Configuration for one conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Encoding of the base document
    pub base_encoding: DocumentEncoding,

    /// Encoding of the supplemental document
    pub plus_encoding: DocumentEncoding,

    /// Inserted before the base file's extension to find the supplemental file
    pub plus_suffix: String,

    /// Column used as primary key for merging and upserts
    pub id_column: String,

    /// Whole-name, case-insensitive renames applied to table and column names
    pub reserved_aliases: Vec<ReservedAlias>,

    /// Leave tables without any column out of the emitted output
    pub skip_empty_tables: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            base_encoding: DocumentEncoding::Cp437,
            plus_encoding: DocumentEncoding::Utf8,
            plus_suffix: String::from("_plus"),
            id_column: String::from("id"),
            reserved_aliases: vec![ReservedAlias::new("group", "grp")],
            skip_empty_tables: true,
        }
    }
}

impl ImportConfig {
    /// Load a configuration file (JSON); missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ImportError::io(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| ImportError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Storage-safe spelling of a table or column name.
    pub fn storage_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.reserved_aliases
            .iter()
            .find(|a| a.reserved.eq_ignore_ascii_case(name))
            .map(|a| a.alias.as_str())
            .unwrap_or(name)
    }
}
