//! Two-document conversion run.
//!
//! The base document is fully parsed and extracted before the supplemental
//! one is read, because the supplemental document's fields win on merge. A
//! run either yields a complete catalog or an error; nothing partial escapes.

use crate::config::{DocumentEncoding, ImportConfig};
use crate::decode::{parse_document, Element};
use crate::error::{ImportError, Result, MEMORY_ORIGIN};
use crate::table::{Catalog, RecordExtractor};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Paths of the base and supplemental documents of one dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPair {
    pub base: PathBuf,
    pub plus: PathBuf,
}

impl InputPair {
    pub fn new(base: impl Into<PathBuf>, plus: impl Into<PathBuf>) -> Self {
        InputPair {
            base: base.into(),
            plus: plus.into(),
        }
    }

    /// Derive the supplemental path from the base path (`legends.xml` ->
    /// `legends_plus.xml` with the default suffix).
    pub fn from_base(base: impl Into<PathBuf>, config: &ImportConfig) -> Self {
        let base = base.into();
        let plus = plus_path_for(&base, &config.plus_suffix);
        InputPair { base, plus }
    }

    /// Fail with `MissingInputFile` unless both documents exist.
    pub fn ensure_exist(&self) -> Result<()> {
        for path in [&self.base, &self.plus] {
            if !path.is_file() {
                return Err(ImportError::MissingInputFile { path: path.clone() });
            }
        }
        Ok(())
    }
}

/// Insert `suffix` between a file's stem and its extension.
pub fn plus_path_for(base: &Path, suffix: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    base.with_file_name(name)
}

/// Read a document from disk and parse it.
pub fn load_document(path: &Path, encoding: &DocumentEncoding) -> Result<Element> {
    let bytes = std::fs::read(path).map_err(|e| ImportError::io(path, e))?;
    let text = encoding.decode(bytes)?;
    parse_document(&text, &path.display().to_string())
}

/// Runs the conversion pipeline for one dataset
pub struct Converter {
    config: ImportConfig,
}

impl Converter {
    pub fn new(config: ImportConfig) -> Self {
        Converter { config }
    }

    /// Convert a document pair on disk.
    pub fn convert_files(&self, inputs: &InputPair) -> Result<Catalog> {
        inputs.ensure_exist()?;

        info!("Reading base document: {}", inputs.base.display());
        let base = load_document(&inputs.base, &self.config.base_encoding)?;
        let mut catalog = Catalog::new();
        self.absorb_document(&mut catalog, &base)?;
        let base_tag = base.tag.clone();
        drop(base);

        info!("Reading supplemental document: {}", inputs.plus.display());
        let plus = load_document(&inputs.plus, &self.config.plus_encoding)?;
        self.check_root(&base_tag, &plus.tag);
        self.absorb_document(&mut catalog, &plus)?;

        Ok(catalog)
    }

    /// Convert a document pair already held in memory.
    pub fn convert_str(&self, base: &str, plus: &str) -> Result<Catalog> {
        let base = parse_document(base, MEMORY_ORIGIN)?;
        let plus = parse_document(plus, MEMORY_ORIGIN)?;
        self.convert_documents(&base, &plus)
    }

    /// Convert two parsed documents, base first.
    pub fn convert_documents(&self, base: &Element, plus: &Element) -> Result<Catalog> {
        let mut catalog = Catalog::new();
        self.absorb_document(&mut catalog, base)?;
        self.check_root(&base.tag, &plus.tag);
        self.absorb_document(&mut catalog, plus)?;
        Ok(catalog)
    }

    fn absorb_document(&self, catalog: &mut Catalog, root: &Element) -> Result<()> {
        info!("Root element: {}", root.tag);
        let pass = RecordExtractor::extract(root)?;
        if pass.skipped_records > 0 {
            warn!("Skipped {} records without fields", pass.skipped_records);
        }
        catalog.absorb(pass, &self.config.id_column);
        Ok(())
    }

    fn check_root(&self, base_tag: &str, plus_tag: &str) {
        if base_tag != plus_tag {
            warn!(
                "Supplemental root <{}> differs from base root <{}>",
                plus_tag, base_tag
            );
        }
    }
}
