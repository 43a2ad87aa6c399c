use promptdeck_core::domain::{InputDescriptor, Node, format_value};
use promptdeck_core::schema::SchemaResolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input names containing any of these are treated as model selectors.
const MODEL_NAME_HINTS: [&str; 3] = ["model", "ckpt", "vae"];

/// Where a select field's options came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceSource {
    /// Backend metadata.
    Schema,
    /// The operator's model registry, inferred from the input name.
    ModelRegistry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    Select {
        options: Vec<String>,
        source: ChoiceSource,
    },
    Integer {
        step: i64,
    },
    Float {
        step: f64,
    },
    Text,
}

impl FieldType {
    pub fn is_select(&self) -> bool {
        matches!(self, Self::Select { .. })
    }
}

/// One editable input of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualField {
    /// Position in `inputs` and `widgets_values`.
    pub index: usize,
    pub id: String,
    pub label: String,
    pub input_type: String,
    pub field_type: FieldType,
    /// The resolved current value.
    pub value: Value,
    /// What the editor shows initially.
    pub display: String,
}

impl VisualField {
    pub fn bind(
        node: &Node,
        index: usize,
        input: &InputDescriptor,
        resolver: &SchemaResolver,
        model_names: &[String],
    ) -> Self {
        let value = current_value(node, index, input, resolver);
        let field_type = resolve_field_type(&node.node_type, input, resolver, model_names);
        let display = initial_display(&field_type, &value);

        Self {
            index,
            id: input.name.clone(),
            label: format!("{} ({})", input.name, input.input_type()),
            input_type: input.input_type().to_string(),
            field_type,
            value,
            display,
        }
    }
}

/// Stored value, else the descriptor's default, else the backend default, else `""`.
/// `null` at any tier falls through to the next.
pub fn current_value(
    node: &Node,
    index: usize,
    input: &InputDescriptor,
    resolver: &SchemaResolver,
) -> Value {
    node.widget_value(index)
        .or_else(|| input.default.as_ref().filter(|d| !d.is_null()))
        .or_else(|| resolver.default_value(&node.node_type, &input.name))
        .cloned()
        .unwrap_or_else(|| Value::String(String::new()))
}

pub fn resolve_field_type(
    node_type: &str,
    input: &InputDescriptor,
    resolver: &SchemaResolver,
    model_names: &[String],
) -> FieldType {
    if let Some(options) = resolver.choices(node_type, &input.name) {
        return FieldType::Select {
            options,
            source: ChoiceSource::Schema,
        };
    }
    if let Some(options) = infer_model_choices(&input.name, model_names) {
        tracing::debug!(node_type = %node_type, input = %input.name, "Using model registry for choices");
        return FieldType::Select {
            options,
            source: ChoiceSource::ModelRegistry,
        };
    }
    match input.input_type() {
        "INT" => FieldType::Integer { step: 1 },
        "FLOAT" => FieldType::Float { step: 0.01 },
        _ => FieldType::Text,
    }
}

/// The registered model names, if `input_name` looks like a model selector.
pub fn infer_model_choices(input_name: &str, model_names: &[String]) -> Option<Vec<String>> {
    let lower = input_name.to_lowercase();
    MODEL_NAME_HINTS
        .iter()
        .any(|hint| lower.contains(hint))
        .then(|| model_names.to_vec())
}

/// A select never starts on a value outside its options.
pub fn initial_display(field_type: &FieldType, value: &Value) -> String {
    let text = format_value(value);
    match field_type {
        FieldType::Select { options, .. } => {
            if options.contains(&text) {
                text
            } else {
                options.first().cloned().unwrap_or_default()
            }
        }
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptdeck_core::schema::ObjectInfo;
    use serde_json::json;

    fn models() -> Vec<String> {
        vec!["sdxl".to_string(), "sd15".to_string()]
    }

    #[test]
    fn test_heuristic_matches_model_names() {
        assert_eq!(infer_model_choices("ckpt_name", &models()), Some(models()));
        assert_eq!(infer_model_choices("VAE_Name", &models()), Some(models()));
        assert_eq!(infer_model_choices("model", &[]), Some(vec![]));
        assert_eq!(infer_model_choices("seed", &models()), None);
    }

    #[test]
    fn test_schema_choices_take_priority() {
        let resolver = SchemaResolver::new(
            serde_json::from_value::<ObjectInfo>(json!({
                "Loader": {"input": {"required": {"ckpt_name": [["a.safetensors"]]}}}
            }))
            .unwrap(),
        );
        let input = InputDescriptor::new("ckpt_name", "COMBO");

        let field_type = resolve_field_type("Loader", &input, &resolver, &models());
        assert_eq!(
            field_type,
            FieldType::Select {
                options: vec!["a.safetensors".into()],
                source: ChoiceSource::Schema
            }
        );

        let degraded = resolve_field_type("Loader", &input, &SchemaResolver::degraded(), &models());
        assert_eq!(
            degraded,
            FieldType::Select {
                options: models(),
                source: ChoiceSource::ModelRegistry
            }
        );
    }

    #[test]
    fn test_primitive_fallbacks() {
        let resolver = SchemaResolver::degraded();
        let int = InputDescriptor::new("seed", "INT");
        let float = InputDescriptor::new("cfg", "FLOAT");
        let text = InputDescriptor::new("text", "STRING");

        assert_eq!(
            resolve_field_type("KSampler", &int, &resolver, &models()),
            FieldType::Integer { step: 1 }
        );
        assert_eq!(
            resolve_field_type("KSampler", &float, &resolver, &models()),
            FieldType::Float { step: 0.01 }
        );
        assert_eq!(
            resolve_field_type("KSampler", &text, &resolver, &models()),
            FieldType::Text
        );
    }

    #[test]
    fn test_initial_display_for_select() {
        let select = FieldType::Select {
            options: vec!["euler".into(), "ddim".into()],
            source: ChoiceSource::Schema,
        };
        assert_eq!(initial_display(&select, &json!("ddim")), "ddim");
        assert_eq!(initial_display(&select, &json!("heun")), "euler");

        let empty = FieldType::Select {
            options: vec![],
            source: ChoiceSource::ModelRegistry,
        };
        assert_eq!(initial_display(&empty, &json!("anything")), "");
        assert_eq!(initial_display(&FieldType::Text, &json!({"k": 1})), r#"{"k":1}"#);
    }

    #[test]
    fn test_current_value_tiers() {
        let resolver = SchemaResolver::new(
            serde_json::from_value::<ObjectInfo>(json!({
                "KSampler": {"input": {"required": {
                    "steps": ["INT", {"default": 20}],
                    "cfg": ["FLOAT", {"default": 8.0}]
                }}}
            }))
            .unwrap(),
        );
        let mut node = Node::new(3, "KSampler");
        node.widgets_values = Some(vec![json!(null)].into());

        let mut steps = InputDescriptor::new("steps", "INT");
        steps.default = Some(json!(30));
        // Descriptor default beats the backend default.
        assert_eq!(current_value(&node, 0, &steps, &resolver), json!(30));

        let cfg = InputDescriptor::new("cfg", "FLOAT");
        assert_eq!(current_value(&node, 1, &cfg, &resolver), json!(8.0));

        let denoise = InputDescriptor::new("denoise", "FLOAT");
        assert_eq!(current_value(&node, 2, &denoise, &resolver), json!(""));

        node.set_widget_value(1, json!("6.5")).unwrap();
        assert_eq!(current_value(&node, 1, &cfg, &resolver), json!("6.5"));
    }
}
