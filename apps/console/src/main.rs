mod render;

use anyhow::Context;
use clap::{Parser, Subcommand};
use promptdeck_core::config::Settings;
use promptdeck_core::store::{ModelRegistry, NewModel};
use promptdeck_sdk::Session;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Inspect, edit and run ComfyUI workflows")]
struct Opts {
    /// Backend base URL (overrides COMFYUI_BASE_URL).
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Workflow document to edit (overrides WORKFLOW_FILE).
    #[arg(long, global = true)]
    workflow: Option<PathBuf>,

    /// Directory holding models.json (overrides PROMPTDECK_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the effective configuration.
    Config,

    /// List every node with its editable inputs.
    Nodes {
        /// Skip fetching backend metadata.
        #[arg(long)]
        offline: bool,
    },

    /// Set one input of a node and save the workflow.
    Set {
        node_id: i64,
        /// Input name, or its position in the node's inputs.
        input: String,
        value: String,
    },

    /// Enable or bypass a node and save the workflow.
    Toggle { node_id: i64 },

    /// Submit the workflow and wait once for its outputs.
    Run {
        /// Return right after submission.
        #[arg(long)]
        no_wait: bool,
    },

    /// Show the outputs of a submission.
    History {
        prompt_id: String,
        /// Download every image into this directory.
        #[arg(long)]
        download: Option<PathBuf>,
    },

    /// Manage the model registry.
    #[command(subcommand)]
    Models(ModelsCommand),
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// List registered models.
    #[command(name = "ls")]
    List,

    /// Register a model.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        model_type: String,
        #[arg(long)]
        path: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },

    /// Remove a model by id.
    Rm { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    let settings = settings(&opts)?;

    match opts.command {
        Command::Config => {
            println!("backend   {}", settings.backend_url);
            println!("workflow  {}", settings.workflow_file.display());
            println!("models    {}", settings.models_file().display());
        }
        Command::Nodes { offline } => {
            let mut session = Session::open(&settings)?;
            if !offline && !session.refresh_metadata().await {
                render::latest_notice(&session);
            }
            render::nodes(&session.views());
        }
        Command::Set {
            node_id,
            input,
            value,
        } => {
            let mut session = Session::open(&settings)?;
            match input.parse::<usize>() {
                Ok(index) => session.edit(node_id, index, value)?,
                Err(_) => session.edit_by_name(node_id, &input, value)?,
            }
            session.save()?;
            render::node(&session.node_view(node_id)?);
        }
        Command::Toggle { node_id } => {
            let mut session = Session::open(&settings)?;
            let enabled = session.toggle(node_id)?;
            session.save()?;
            println!(
                "node {node_id} is now {}",
                if enabled { "enabled" } else { "bypassed" }
            );
        }
        Command::Run { no_wait } => {
            let mut session = Session::open(&settings)?;
            let Some(prompt_id) = session.submit().await? else {
                println!("submitted (backend returned no prompt id)");
                return Ok(());
            };
            println!("submitted prompt {prompt_id}");
            if no_wait {
                return Ok(());
            }

            let poll = session.schedule_poll(prompt_id.clone());
            let outcome = tokio::select! {
                result = session.complete_poll(poll) => Some(result),
                _ = tokio::signal::ctrl_c() => None,
            };
            if finish_run(&prompt_id, outcome)? {
                render::history(&session, &prompt_id);
            }
        }
        Command::History {
            prompt_id,
            download,
        } => {
            let mut session = Session::open(&settings)?;
            session.poll_once(&prompt_id).await?;
            render::history(&session, &prompt_id);
            if let Some(dir) = download {
                download_images(&session, &prompt_id, &dir).await?;
            }
        }
        Command::Models(cmd) => {
            let mut registry = ModelRegistry::open(settings.models_file())?;
            match cmd {
                ModelsCommand::List => render::models(registry.list()),
                ModelsCommand::Add {
                    name,
                    model_type,
                    path,
                    note,
                } => {
                    let entry = registry.create(NewModel {
                        name: Some(name),
                        model_type: Some(model_type),
                        path,
                        note,
                    })?;
                    println!("registered {} ({})", entry.name, entry.id);
                }
                ModelsCommand::Rm { id } => {
                    registry.delete(&id)?;
                    println!("removed {id}");
                }
            }
        }
    }

    Ok(())
}

fn settings(opts: &Opts) -> anyhow::Result<Settings> {
    let mut settings = Settings::from_env()?;
    if let Some(url) = &opts.backend {
        settings = settings.with_backend_url(url)?;
    }
    if let Some(path) = &opts.workflow {
        settings.workflow_file = path.clone();
    }
    if let Some(dir) = &opts.data_dir {
        settings.data_dir = dir.clone();
    }
    tracing::debug!(backend = %settings.backend_url, workflow = ?settings.workflow_file, "Console settings resolved");
    Ok(settings)
}

/// `Ok(true)` when outputs were collected, `Ok(false)` when the wait was interrupted.
/// A failed result check is returned as an error; `main` reports it on stderr and exits
/// non-zero.
fn finish_run(
    prompt_id: &str,
    outcome: Option<promptdeck_core::Result<usize>>,
) -> anyhow::Result<bool> {
    match outcome {
        Some(Ok(_)) => Ok(true),
        Some(Err(e)) => {
            Err(anyhow::Error::new(e).context(format!("Result check for {prompt_id} failed")))
        }
        None => {
            println!("stopped waiting for {prompt_id}");
            Ok(false)
        }
    }
}

async fn download_images(session: &Session, prompt_id: &str, dir: &Path) -> anyhow::Result<()> {
    let Some(entry) = session.history().get(prompt_id) else {
        return Ok(());
    };
    std::fs::create_dir_all(dir).with_context(|| format!("Could not create {dir:?}"))?;
    for image in &entry.images {
        // Never let a backend-supplied name escape `dir`.
        let Some(name) = Path::new(&image.filename).file_name() else {
            continue;
        };
        let bytes = session.fetch_image(image).await?;
        let target = dir.join(name);
        std::fs::write(&target, bytes).with_context(|| format!("Could not write {target:?}"))?;
        println!("saved {}", target.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptdeck_core::PromptDeckError;

    #[test]
    fn test_failed_result_check_is_an_error() {
        let err = finish_run("p-1", Some(Err(PromptDeckError::Upstream("HTTP 500".into()))))
            .unwrap_err();
        assert_eq!(err.to_string(), "Result check for p-1 failed");
        assert_eq!(err.root_cause().to_string(), "HTTP 500");

        assert!(finish_run("p-1", Some(Ok(2))).unwrap());
        assert!(!finish_run("p-1", None).unwrap());
    }
}
