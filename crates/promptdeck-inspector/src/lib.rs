//! # PromptDeck Inspector
//!
//! Headless logic for the node parameter inspector. It binds each node's positional
//! `widgets_values` to editable fields, using backend schema metadata when it is
//! available and name heuristics when it is not, and writes edits back by index.

pub mod schema;

use promptdeck_core::domain::{MODE_BYPASSED, MODE_ENABLED, Node, NodeId, Workflow};
use promptdeck_core::error::{PromptDeckError, Result};
use promptdeck_core::schema::SchemaResolver;
use schema::VisualField;
use serde::Serialize;
use serde_json::Value;

/// The editable model of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    /// `title`, or the node type when untitled.
    pub heading: String,
    pub node_type: String,
    pub enabled: bool,
    /// One entry per declared input, in input order.
    pub fields: Vec<VisualField>,
}

impl NodeView {
    pub fn subtitle(&self) -> String {
        format!("{} · ID {}", self.node_type, self.id)
    }

    pub fn has_inputs(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// Derives the fields of one node from live state.
pub fn inspect_node(node: &Node, resolver: &SchemaResolver, model_names: &[String]) -> NodeView {
    let fields = node
        .inputs()
        .iter()
        .enumerate()
        .map(|(index, input)| VisualField::bind(node, index, input, resolver, model_names))
        .collect();

    NodeView {
        id: node.id,
        heading: node.display_title().to_string(),
        node_type: node.node_type.clone(),
        enabled: is_enabled(node),
        fields,
    }
}

/// Views for every node, in display order.
pub fn inspect_workflow(
    workflow: &Workflow,
    resolver: &SchemaResolver,
    model_names: &[String],
) -> Vec<NodeView> {
    display_order(workflow)
        .into_iter()
        .map(|node| inspect_node(node, resolver, model_names))
        .collect()
}

/// Nodes sorted by title, untitled first. Stored order is untouched.
pub fn display_order(workflow: &Workflow) -> Vec<&Node> {
    let mut nodes: Vec<&Node> = workflow.nodes.iter().collect();
    nodes.sort_by(|a, b| a.title().unwrap_or("").cmp(b.title().unwrap_or("")));
    nodes
}

/// Writes `raw` verbatim into `widgets_values[index]`.
///
/// No schema validation happens here; the backend rejects bad combinations on submit.
pub fn apply_edit(node: &mut Node, index: usize, raw: impl Into<String>) -> Result<()> {
    if index >= node.inputs().len() {
        return Err(PromptDeckError::NotFound(format!(
            "node {} has no input at index {index}",
            node.id
        )));
    }
    let raw = raw.into();
    tracing::debug!(node_id = node.id, index, value = %raw, "Applying edit");
    node.set_widget_value(index, Value::String(raw))
}

/// Like [`apply_edit`], addressing the input by name.
pub fn apply_edit_by_name(node: &mut Node, input_name: &str, raw: impl Into<String>) -> Result<()> {
    let index = node
        .inputs()
        .iter()
        .position(|input| input.name == input_name)
        .ok_or_else(|| {
            PromptDeckError::NotFound(format!("node {} has no input named {input_name}", node.id))
        })?;
    apply_edit(node, index, raw)
}

pub fn is_enabled(node: &Node) -> bool {
    node.mode() != MODE_BYPASSED
}

/// Collapses `mode` to `0` or `4`. Other mode values the editor may have written
/// (e.g. "never") are not preserved.
pub fn set_enabled(node: &mut Node, enabled: bool) {
    let mode = if enabled { MODE_ENABLED } else { MODE_BYPASSED };
    node.mode = Some(mode);
    tracing::debug!(node_id = node.id, mode, "Node mode changed");
}

/// Flips the enabled state and returns the new one.
pub fn toggle_enabled(node: &mut Node) -> bool {
    let enabled = !is_enabled(node);
    set_enabled(node, enabled);
    enabled
}
