//! Recursive decoding of an element subtree into a [`GenericValue`].
//!
//! Rules, applied at every level:
//!
//! - A leaf with neither attributes nor a namespaced tag decodes to its text
//!   (`Scalar("")` when it has none).
//! - Otherwise the result is a map holding, in order: `$$` with the tag's
//!   namespace URI, the grouped attributes, then the folded children. Child
//!   keys overwrite attribute keys of the same name. A leaf's text is dropped
//!   once the leaf has attributes.
//! - Attributes written `prefix:local` move under a nested map keyed by
//!   `prefix`, as `@local`. A name with an empty prefix or local part stays a
//!   plain attribute.
//! - Siblings fold into one map by tag; a repeated tag turns into a list of
//!   its occurrences in document order.

use crate::decode::element::Element;
use crate::decode::value::{GenericValue, ValueMap};
use indexmap::map::Entry;

/// Key holding the namespace URI of a namespaced tag
pub const NAMESPACE_URI_KEY: &str = "$$";

/// Prefix marking attributes moved under their namespace group
pub const GROUPED_ATTRIBUTE_MARKER: char = '@';

/// Key, inside a namespace group, for a plain attribute named like the prefix
pub const GROUP_SELF_KEY: &str = "$";

/// Decode one element subtree.
pub fn decode(element: &Element) -> GenericValue {
    let mut header = ValueMap::new();
    if let Some(uri) = &element.namespace {
        header.insert(NAMESPACE_URI_KEY.to_string(), GenericValue::scalar(uri.as_str()));
    }
    if !element.attributes.is_empty() {
        header.extend(group_attributes(&element.attributes));
    }

    if element.children.is_empty() {
        if header.is_empty() {
            GenericValue::Scalar(element.text.clone().unwrap_or_default())
        } else {
            GenericValue::Map(header)
        }
    } else {
        header.extend(fold_siblings(&element.children));
        GenericValue::Map(header)
    }
}

/// Fold a run of sibling elements into one map keyed by tag.
pub fn fold_siblings(children: &[Element]) -> ValueMap {
    let mut folded = ValueMap::new();
    for child in children {
        let value = decode(child);
        match folded.entry(child.tag.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                // `decode` never yields a list itself, so a list here is a promoted key
                GenericValue::List(items) => items.push(value),
                existing => {
                    let first = std::mem::replace(existing, GenericValue::List(Vec::new()));
                    *existing = GenericValue::List(vec![first, value]);
                }
            },
        }
    }
    folded
}

/// Group `prefix:local` attributes under their prefix.
///
/// Every attribute ends up exactly once in the result: plain ones at top level,
/// prefixed ones under `prefix` as `@local`. A plain attribute spelled like a
/// prefix in use is kept inside that group under `$`.
pub fn group_attributes(attributes: &[(String, String)]) -> ValueMap {
    let mut grouped = ValueMap::new();
    for (name, value) in attributes {
        let value = GenericValue::scalar(value.as_str());
        match split_prefixed(name) {
            Some((prefix, local)) => {
                let key = format!("{}{}", GROUPED_ATTRIBUTE_MARKER, local);
                match grouped.entry(prefix.to_string()) {
                    Entry::Occupied(mut slot) => match slot.get_mut() {
                        GenericValue::Map(group) => {
                            group.insert(key, value);
                        }
                        plain => {
                            let own = std::mem::replace(plain, GenericValue::Map(ValueMap::new()));
                            let mut group = ValueMap::new();
                            group.insert(GROUP_SELF_KEY.to_string(), own);
                            group.insert(key, value);
                            *plain = GenericValue::Map(group);
                        }
                    },
                    Entry::Vacant(slot) => {
                        let mut group = ValueMap::new();
                        group.insert(key, value);
                        slot.insert(GenericValue::Map(group));
                    }
                }
            }
            None => match grouped.get_mut(name) {
                Some(GenericValue::Map(group)) => {
                    group.insert(GROUP_SELF_KEY.to_string(), value);
                }
                _ => {
                    grouped.insert(name.clone(), value);
                }
            },
        }
    }
    grouped
}

/// Split `prefix:local`; `None` when either side is empty.
pub fn split_prefixed(name: &str) -> Option<(&str, &str)> {
    let (prefix, local) = name.split_once(':')?;
    if prefix.is_empty() || local.is_empty() {
        None
    } else {
        Some((prefix, local))
    }
}
