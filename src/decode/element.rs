//! Typed element tree built from a fully loaded document.
//!
//! The loader keeps only what a relational row can use: tag, namespace URI,
//! attributes in document order, child elements, and the text of leaves.
//! Comments, processing instructions, the declaration and DOCTYPE are dropped,
//! and text inside an element that also has children is discarded.

use crate::error::{ImportError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

/// One parsed element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local tag name (any prefix stripped)
    pub tag: String,

    /// Namespace URI the tag is bound to, if any
    pub namespace: Option<String>,

    /// Raw attribute names (`prefix:local` kept as written) and values
    pub attributes: Vec<(String, String)>,

    pub children: Vec<Element>,

    /// Text content; only kept for elements without children
    pub text: Option<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, uri: impl Into<String>) -> Self {
        self.namespace = Some(uri.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Convenience for `<tag>text</tag>`
    pub fn leaf(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Element::new(tag).with_text(text)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn push_text(&mut self, chunk: &str) {
        match self.text {
            Some(ref mut text) => text.push_str(chunk),
            None => self.text = Some(chunk.to_string()),
        }
    }

    fn finish(mut self) -> Self {
        if !self.children.is_empty() {
            self.text = None;
        }
        self
    }
}

/// Parse a whole document into its root element.
///
/// `origin` names the document in error messages.
pub fn parse_document(text: &str, origin: &str) -> Result<Element> {
    let mut reader = NsReader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position();
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(start))) => {
                let element = open_element(ns, &start, origin, position)?;
                stack.push(element);
            }
            Ok((ns, Event::Empty(start))) => {
                let element = open_element(ns, &start, origin, position)?;
                close_element(element, &mut stack, &mut root, origin, position)?;
            }
            Ok((_, Event::End(_))) => {
                let element = stack.pop().ok_or_else(|| {
                    ImportError::malformed(
                        origin,
                        format!("unexpected closing tag at byte {}", position),
                    )
                })?;
                close_element(element, &mut stack, &mut root, origin, position)?;
            }
            Ok((_, Event::Text(text))) => {
                let text = text.unescape().map_err(|e| {
                    ImportError::malformed(origin, format!("bad text at byte {}: {}", position, e))
                })?;
                match stack.last_mut() {
                    Some(top) => top.push_text(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(ImportError::malformed(
                            origin,
                            format!("text outside the root element at byte {}", position),
                        ))
                    }
                }
            }
            Ok((_, Event::CData(data))) => {
                if let Some(top) = stack.last_mut() {
                    top.push_text(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ImportError::malformed(
                    origin,
                    format!("at byte {}: {}", position, e),
                ))
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(ImportError::malformed(
            origin,
            format!("element <{}> is never closed", open.tag),
        ));
    }

    root.ok_or_else(|| ImportError::malformed(origin, "document has no root element"))
}

fn open_element(
    ns: ResolveResult,
    start: &BytesStart,
    origin: &str,
    position: usize,
) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.local_name().as_ref()));
    if let ResolveResult::Bound(uri) = ns {
        element.namespace = Some(String::from_utf8_lossy(uri.as_ref()).into_owned());
    }

    for attr in start.attributes() {
        let attr = attr.map_err(|e| {
            ImportError::malformed(origin, format!("bad attribute at byte {}: {}", position, e))
        })?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if name == "xmlns" || name.starts_with("xmlns:") {
            continue;
        }
        let value = attr.unescape_value().map_err(|e| {
            ImportError::malformed(
                origin,
                format!("bad attribute value at byte {}: {}", position, e),
            )
        })?;
        element.attributes.push((name, value.into_owned()));
    }

    Ok(element)
}

fn close_element(
    element: Element,
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
    origin: &str,
    position: usize,
) -> Result<()> {
    let element = element.finish();
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(ImportError::malformed(
                origin,
                format!("second root element <{}> at byte {}", element.tag, position),
            ))
        }
    }
    Ok(())
}
