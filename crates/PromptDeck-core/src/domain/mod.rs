pub mod history;
pub mod value;
pub mod workflow;

pub use history::{HistoryEntry, OutputImage, PromptHistory, collect_images};
pub use value::format_value;
pub use workflow::{
    InputDescriptor, MODE_BYPASSED, MODE_ENABLED, Node, NodeId, WidgetValues, Workflow,
};
