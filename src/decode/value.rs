//! Generic nested values and their canonical text encoding.
//!
//! Structured attribute-children are stored as a single text cell. The cell
//! holds the compact JSON rendering of a [`GenericValue`], with map keys in
//! document order, so identical structures always produce identical bytes.

use crate::error::Result;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::fmt;

/// Map of decoded keys in first-seen order.
pub type ValueMap = IndexMap<String, GenericValue>;

/// A decoded element subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenericValue {
    /// Text content of a plain leaf (possibly empty)
    Scalar(String),
    /// Attributes and/or child elements keyed by name
    Map(ValueMap),
    /// Repeated sibling elements in document order
    List(Vec<GenericValue>),
}

impl GenericValue {
    pub fn scalar(text: impl Into<String>) -> Self {
        GenericValue::Scalar(text.into())
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            GenericValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[GenericValue]> {
        match self {
            GenericValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key when this value is a map.
    pub fn get(&self, key: &str) -> Option<&GenericValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Encode into the canonical cell text.
    pub fn to_canonical_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a cell produced by [`GenericValue::to_canonical_string`].
    pub fn from_canonical_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Serialize for GenericValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            GenericValue::Scalar(text) => serializer.serialize_str(text),
            GenericValue::Map(map) => map.serialize(serializer),
            GenericValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

struct GenericValueVisitor;

impl<'de> Visitor<'de> for GenericValueVisitor {
    type Value = GenericValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, array or object")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<GenericValue, E> {
        Ok(GenericValue::Scalar(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<GenericValue, E> {
        Ok(GenericValue::Scalar(v))
    }

    // Hand-edited cells may carry bare numbers or booleans; keep their text.
    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<GenericValue, E> {
        Ok(GenericValue::Scalar(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<GenericValue, E> {
        Ok(GenericValue::Scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<GenericValue, E> {
        Ok(GenericValue::Scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<GenericValue, E> {
        Ok(GenericValue::Scalar(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<GenericValue, E> {
        Ok(GenericValue::Scalar(String::new()))
    }

    fn visit_seq<A: SeqAccess<'de>>(
        self,
        mut seq: A,
    ) -> std::result::Result<GenericValue, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(GenericValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut access: A,
    ) -> std::result::Result<GenericValue, A::Error> {
        let mut map = ValueMap::new();
        while let Some((key, value)) = access.next_entry::<String, GenericValue>()? {
            map.insert(key, value);
        }
        Ok(GenericValue::Map(map))
    }
}

impl<'de> Deserialize<'de> for GenericValue {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(GenericValueVisitor)
    }
}
