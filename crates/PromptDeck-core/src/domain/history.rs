use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One image the backend produced, as reported in its history document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputImage {
    pub filename: String,
    #[serde(rename = "type")]
    pub image_type: String,
    #[serde(default)]
    pub subfolder: String,
    /// The node that wrote the image.
    #[serde(default)]
    pub node_id: String,
}

impl OutputImage {
    pub fn label(&self) -> String {
        format!("{} · node {}", self.filename, self.node_id)
    }
}

/// Extracts every image reference for `prompt_id` from a `/history/<id>` response.
///
/// Shape: `{<prompt_id>: {"outputs": {<node_id>: {"images": [...]}}}}`. A missing entry,
/// missing outputs or malformed image descriptors contribute nothing.
pub fn collect_images(prompt_id: &str, history: &Value) -> Vec<OutputImage> {
    let Some(outputs) = history
        .get(prompt_id)
        .and_then(|entry| entry.get("outputs"))
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };

    let mut images = Vec::new();
    for (node_id, output) in outputs {
        let Some(descriptors) = output.get("images").and_then(Value::as_array) else {
            continue;
        };
        for descriptor in descriptors {
            match serde_json::from_value::<OutputImage>(descriptor.clone()) {
                Ok(mut image) => {
                    image.node_id = node_id.clone();
                    images.push(image);
                }
                Err(e) => {
                    tracing::warn!(prompt_id = %prompt_id, node_id = %node_id, error = %e, "Skipping malformed image descriptor")
                }
            }
        }
    }
    images
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub prompt_id: String,
    pub images: Vec<OutputImage>,
}

/// Submissions made in this session, newest first.
#[derive(Debug, Clone, Default)]
pub struct PromptHistory {
    entries: Vec<HistoryEntry>,
}

impl PromptHistory {
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn get(&self, prompt_id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.prompt_id == prompt_id)
    }

    /// Records a fresh submission with no images yet.
    pub fn record_submission(&mut self, prompt_id: impl Into<String>) {
        self.entries.insert(
            0,
            HistoryEntry {
                prompt_id: prompt_id.into(),
                images: Vec::new(),
            },
        );
    }

    /// Sets the images of `prompt_id`, adding an entry at the front if it is unknown.
    pub fn attach_images(&mut self, prompt_id: &str, images: Vec<OutputImage>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.prompt_id == prompt_id) {
            entry.images = images;
        } else {
            self.entries.insert(
                0,
                HistoryEntry {
                    prompt_id: prompt_id.to_string(),
                    images,
                },
            );
        }
    }

    pub fn images(&self) -> impl Iterator<Item = &OutputImage> {
        self.entries.iter().flat_map(|e| e.images.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collect_images_per_node() {
        let history = json!({
            "abc": {
                "outputs": {
                    "9": {"images": [
                        {"filename": "out_00001_.png", "type": "output", "subfolder": ""},
                        {"filename": "out_00002_.png", "type": "output"}
                    ]},
                    "12": {"text": ["no images here"]},
                    "15": {"images": [{"filename": "preview.png", "type": "temp", "subfolder": "previews"}]}
                }
            }
        });

        let images = collect_images("abc", &history);
        assert_eq!(images.len(), 3);
        assert_eq!(images[0].node_id, "9");
        assert_eq!(images[1].subfolder, "");
        assert_eq!(images[2].subfolder, "previews");
        assert_eq!(images[2].label(), "preview.png · node 15");
    }

    #[test]
    fn test_collect_images_missing_entry() {
        assert!(collect_images("abc", &json!({})).is_empty());
        assert!(collect_images("abc", &json!({"abc": {"status": {}}})).is_empty());
    }

    #[test]
    fn test_history_is_newest_first_and_additive() {
        let mut history = PromptHistory::default();
        history.record_submission("first");
        history.record_submission("second");
        assert_eq!(history.latest().unwrap().prompt_id, "second");

        let image = OutputImage {
            filename: "a.png".into(),
            image_type: "output".into(),
            subfolder: String::new(),
            node_id: "9".into(),
        };
        history.attach_images("first", vec![image.clone()]);
        assert_eq!(history.entries().len(), 2);
        assert_eq!(history.get("first").unwrap().images, vec![image]);

        history.attach_images("external", Vec::new());
        assert_eq!(history.latest().unwrap().prompt_id, "external");
    }
}
