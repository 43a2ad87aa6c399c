use promptdeck_core::store::ModelEntry;
use promptdeck_inspector::NodeView;
use promptdeck_inspector::schema::{ChoiceSource, FieldType};
use promptdeck_sdk::Session;

pub fn nodes(views: &[NodeView]) {
    println!("{} nodes", views.len());
    for view in views {
        node(view);
    }
}

pub fn node(view: &NodeView) {
    let marker = if view.enabled { "[x]" } else { "[ ]" };
    println!();
    println!("{marker} {}  ({})", view.heading, view.subtitle());

    if !view.has_inputs() {
        println!("    (no editable inputs)");
        return;
    }

    let width = view.fields.iter().map(|f| f.label.len()).max().unwrap_or(0);
    for field in &view.fields {
        println!(
            "    {:>2}  {:<width$}  = {:<24} {}",
            field.index,
            field.label,
            field.display,
            describe(&field.field_type),
        );
    }
}

fn describe(field_type: &FieldType) -> String {
    match field_type {
        FieldType::Select { options, source } => {
            let origin = match source {
                ChoiceSource::Schema => "",
                ChoiceSource::ModelRegistry => " (registry)",
            };
            format!("[{}]{origin}", options.join(" | "))
        }
        FieldType::Integer { step } => format!("int, step {step}"),
        FieldType::Float { step } => format!("float, step {step}"),
        FieldType::Text => "text".to_string(),
    }
}

pub fn history(session: &Session, prompt_id: &str) {
    let Some(entry) = session.history().get(prompt_id) else {
        println!("no history for {prompt_id}");
        return;
    };
    if entry.images.is_empty() {
        println!("no output images for {prompt_id} yet");
        return;
    }
    for image in &entry.images {
        match session.image_url(image) {
            Ok(url) => println!("{}  {url}", image.label()),
            Err(e) => println!("{}  ({e})", image.label()),
        }
    }
}

pub fn models(models: &[ModelEntry]) {
    if models.is_empty() {
        println!("no registered models");
        return;
    }
    for model in models {
        let mut line = format!("{}  {}  {}", model.id, model.name, model.model_type);
        if !model.path.is_empty() {
            line.push_str(&format!(" · {}", model.path));
        }
        if !model.note.is_empty() {
            line.push_str(&format!("  # {}", model.note));
        }
        println!("{line}");
    }
}

pub fn latest_notice(session: &Session) {
    if let Some(notice) = session.activity().latest() {
        eprintln!("{:?}: {}", notice.level, notice.message);
    }
}
