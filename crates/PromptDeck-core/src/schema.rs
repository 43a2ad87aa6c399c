//! Resolution of per-input parameter schemas from backend `object_info` metadata.
//!
//! The metadata is loosely structured: each input descriptor is either an array
//! (`["INT", {"default": 20}]`, `[["euler", "ddim"], {}]`) or an object carrying a
//! `choices` list. The resolver never fails; an absent document, a missing node type or
//! an unrecognised descriptor shape all read as "no constraint known".

use crate::domain::format_value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `object_info` document: node type name -> type schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectInfo(pub Map<String, Value>);

impl ObjectInfo {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn descriptor(&self, node_type: &str, input_name: &str) -> Option<&Value> {
        let input = self.0.get(node_type)?.get("input")?;
        ["required", "optional"].iter().find_map(|section| {
            input
                .get(section)
                .and_then(|params| params.get(input_name))
                .filter(|d| !d.is_null())
        })
    }
}

/// One input's descriptor, borrowed from the metadata document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSchema<'a> {
    descriptor: &'a Value,
}

impl<'a> ParamSchema<'a> {
    pub fn new(descriptor: &'a Value) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &'a Value {
        self.descriptor
    }

    /// The enumerated legal values, if the descriptor declares any.
    pub fn choices(&self) -> Option<Vec<String>> {
        extract_choices(self.descriptor)
    }

    /// The declared type tag (`INT`, `FLOAT`, `STRING`, `COMBO`, ...).
    pub fn type_tag(&self) -> Option<&'a str> {
        match self.descriptor {
            Value::Array(items) => match items.first()? {
                Value::String(tag) => Some(tag.as_str()),
                Value::Array(_) => Some("COMBO"),
                _ => None,
            },
            Value::Object(obj) => obj.get("type").and_then(Value::as_str),
            _ => None,
        }
    }

    /// The backend's default for this input, ignoring `null`.
    pub fn default_value(&self) -> Option<&'a Value> {
        let options = match self.descriptor {
            Value::Array(items) => items.iter().skip(1).find(|item| item.is_object())?,
            obj @ Value::Object(_) => obj,
            _ => return None,
        };
        options.get("default").filter(|d| !d.is_null())
    }
}

/// Extracts the choice list from one descriptor.
///
/// An array-shaped descriptor whose last element is an array yields that array. An
/// object-shaped descriptor yields its `choices` array. Any other shape yields `None`.
pub fn extract_choices(descriptor: &Value) -> Option<Vec<String>> {
    if let Value::Array(items) = descriptor
        && let Some(Value::Array(choices)) = items.last()
    {
        return Some(choices.iter().map(format_value).collect());
    }
    if let Value::Object(obj) = descriptor
        && let Some(Value::Array(choices)) = obj.get("choices")
    {
        return Some(choices.iter().map(format_value).collect());
    }
    None
}

/// Answers schema questions against the most recently fetched metadata.
#[derive(Debug, Clone, Default)]
pub struct SchemaResolver {
    metadata: Option<ObjectInfo>,
}

impl SchemaResolver {
    pub fn new(metadata: ObjectInfo) -> Self {
        Self {
            metadata: Some(metadata),
        }
    }

    /// A resolver with no metadata; every lookup reports "not found".
    pub fn degraded() -> Self {
        Self::default()
    }

    pub fn is_degraded(&self) -> bool {
        self.metadata.is_none()
    }

    pub fn metadata(&self) -> Option<&ObjectInfo> {
        self.metadata.as_ref()
    }

    pub fn replace(&mut self, metadata: ObjectInfo) {
        self.metadata = Some(metadata);
    }

    /// `metadata[node_type].input.required[input_name]`, else `.optional[input_name]`.
    pub fn lookup(&self, node_type: &str, input_name: &str) -> Option<ParamSchema<'_>> {
        self.metadata
            .as_ref()?
            .descriptor(node_type, input_name)
            .map(ParamSchema::new)
    }

    pub fn choices(&self, node_type: &str, input_name: &str) -> Option<Vec<String>> {
        self.lookup(node_type, input_name)?.choices()
    }

    pub fn default_value(&self, node_type: &str, input_name: &str) -> Option<&Value> {
        self.lookup(node_type, input_name)?.default_value()
    }
}
