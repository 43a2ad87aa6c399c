use crate::error::{PromptDeckError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type NodeId = i64;

/// `mode` written when a node is switched on.
pub const MODE_ENABLED: i64 = 0;
/// `mode` value the backend treats as bypassed.
pub const MODE_BYPASSED: i64 = 4;

/// A saved graph document.
///
/// Only `nodes` is interpreted. Links, groups, layout and anything else the editor
/// wrote are carried in `extra` so a save writes back exactly what was loaded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Workflow {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Absent means enabled; see [`Node::mode`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<InputDescriptor>>,
    /// Current values, index-aligned with `inputs`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub widgets_values: Option<WidgetValues>,
    /// Everything else, `title` included, kept exactly as loaded.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The stored `widgets_values`. Most nodes keep a positional list; some custom nodes
/// keep an object keyed by widget name, which is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WidgetValues {
    List(Vec<Value>),
    Other(Value),
}

impl From<Vec<Value>> for WidgetValues {
    fn from(values: Vec<Value>) -> Self {
        Self::List(values)
    }
}

impl Node {
    pub fn new(id: NodeId, node_type: impl Into<String>) -> Self {
        Self {
            id,
            node_type: node_type.into(),
            mode: None,
            inputs: None,
            widgets_values: None,
            extra: Map::new(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.extra.get("title").and_then(Value::as_str)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.extra
            .insert("title".to_string(), Value::String(title.into()));
    }

    /// Title shown in headers; untitled nodes show their type.
    pub fn display_title(&self) -> &str {
        self.title().unwrap_or(&self.node_type)
    }

    pub fn mode(&self) -> i64 {
        self.mode.unwrap_or(MODE_ENABLED)
    }

    pub fn inputs(&self) -> &[InputDescriptor] {
        self.inputs.as_deref().unwrap_or_default()
    }

    /// The positional values, or `None` when absent or not list-shaped.
    pub fn widgets(&self) -> Option<&[Value]> {
        match &self.widgets_values {
            Some(WidgetValues::List(values)) => Some(values),
            _ => None,
        }
    }

    /// The stored value at `index`, treating JSON `null` as absent.
    pub fn widget_value(&self, index: usize) -> Option<&Value> {
        self.widgets()
            .and_then(|values| values.get(index))
            .filter(|v| !v.is_null())
    }

    /// Writes `value` at `index`, creating the list and padding skipped slots with `null`.
    ///
    /// Nodes whose `widgets_values` is not a list cannot be edited by position.
    pub fn set_widget_value(&mut self, index: usize, value: Value) -> Result<()> {
        let id = self.id;
        match self
            .widgets_values
            .get_or_insert_with(|| WidgetValues::List(Vec::new()))
        {
            WidgetValues::List(values) => {
                if values.len() <= index {
                    values.resize(index + 1, Value::Null);
                }
                values[index] = value;
                Ok(())
            }
            WidgetValues::Other(_) => Err(PromptDeckError::Validation(format!(
                "node {id} does not store its widget values as a list"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InputDescriptor {
    pub fn new(name: impl Into<String>, input_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_type: Some(input_type.into()),
            default: None,
            extra: Map::new(),
        }
    }

    /// The declared type tag, `""` when the descriptor has none.
    pub fn input_type(&self) -> &str {
        self.input_type.as_deref().unwrap_or_default()
    }
}

/// A present key deserializes to `Some`, even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
