//! saymore - command line front end for a SayMore project folder
//!
//! Lists, creates, renames and watches sessions and people, adds files to
//! them and reports which workflow stages are complete.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use saymore_common::config::{ProjectFolderResolver, TomlConfig};
use saymore_common::human_time::format_duration;
use saymore_common::{ElementEvent, EventBus};
use saymore_model::{ElementKind, ProjectFolder, RenameOutcome};
use tokio::signal;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", ",
    env!("BUILD_PROFILE"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

/// Command-line arguments for saymore
#[derive(Parser, Debug)]
#[command(name = "saymore")]
#[command(about = "Manage sessions and people in a SayMore project")]
#[command(version = VERSION)]
struct Args {
    /// Project folder (contains Sessions/ and People/)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List elements of one kind
    List { kind: ElementKind },
    /// List the component files of an element
    Files { kind: ElementKind, id: String },
    /// Create an element (default name if no id is given)
    Create { kind: ElementKind, id: Option<String> },
    /// Change an element's id
    Rename {
        kind: ElementKind,
        id: String,
        new_id: String,
    },
    /// Copy files into an element
    Add {
        kind: ElementKind,
        id: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print an element's exportable fields as JSON
    Export { kind: ElementKind, id: String },
    /// Show completed workflow stages
    Stages {
        kind: ElementKind,
        id: String,
        /// Ignore stage overrides
        #[arg(long)]
        raw: bool,
    },
    /// Create one session per media file
    ImportSessions {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print component file changes (JSON lines) until Ctrl+C
    Watch { kind: ElementKind, id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let root = ProjectFolderResolver::new()
        .with_cli_arg(args.project.clone())
        .with_config(config.clone())
        .resolve();
    debug!(root = %root.display(), version = VERSION, "Starting saymore");

    let events = EventBus::new(1000);
    let project = ProjectFolder::open_with_defaults(&root, Arc::new(config.files.clone()), events.clone())
        .with_context(|| format!("Failed to open project at {}", root.display()))?;

    match args.command {
        Command::List { kind } => {
            for element in project.elements(kind)? {
                let duration = element.total_media_duration()?;
                println!("{}\t{}", element.id(), format_duration(duration));
            }
        }
        Command::Files { kind, id } => {
            let element = project.element(kind, &id)?;
            for file in element.get_component_files()? {
                println!("{:?}\t{}", file.kind(), file.file_name());
            }
        }
        Command::Create { kind, id } => {
            let element = project.create_element(kind, id.as_deref())?;
            println!("{}", element.folder_path().display());
        }
        Command::Rename { kind, id, new_id } => {
            let mut element = project.element(kind, &id)?;
            match element.try_change_id_and_save(&new_id) {
                Ok(RenameOutcome::Unchanged) => println!("{} unchanged", id),
                Ok(RenameOutcome::Renamed { new_id, .. }) => {
                    info!(old_id = %id, new_id = %new_id, "Renamed");
                    println!("{}", element.folder_path().display());
                }
                Err(failure) => {
                    for (from, to) in failure.renamed_files() {
                        eprintln!("already renamed: {} -> {}", from.display(), to.display());
                    }
                    bail!("{}", failure.message());
                }
            }
        }
        Command::Add { kind, id, files } => {
            let element = project.element(kind, &id)?;
            if !element.add_component_files(&files) {
                bail!("None of the given files can be added to {}", id);
            }
            println!("{} component files", element.get_component_files()?.len());
        }
        Command::Export { kind, id } => {
            let element = project.element(kind, &id)?;
            println!("{}", serde_json::to_string_pretty(&element.export_fields())?);
        }
        Command::Stages { kind, id, raw } => {
            let element = project.element(kind, &id)?;
            let completed = element.get_completed_stages(!raw)?;
            for role in element.component_roles() {
                let mark = if completed.iter().any(|r| r.id() == role.id()) { "x" } else { " " };
                println!("[{}] {}", mark, role.name());
            }
        }
        Command::ImportSessions { files } => {
            for session in project.create_sessions_from_files(&files)? {
                println!("{}", session.id());
            }
        }
        Command::Watch { kind, id } => watch(&project, kind, &id, &events).await?,
    }

    Ok(())
}

/// Print change events for one element until Ctrl+C
async fn watch(project: &ProjectFolder, kind: ElementKind, id: &str, events: &EventBus) -> Result<()> {
    let element = project.element(kind, id)?;
    let mut rx = events.subscribe();
    // First read builds the cache and starts the watcher
    let files = element.get_component_files()?;
    info!(element = %element, files = files.len(), "Watching for changes (Ctrl+C to stop)");

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping");
                break;
            }
            event = rx.recv() => match event {
                Ok(event @ ElementEvent::ComponentFileChanged { .. }) => {
                    println!("{}", serde_json::to_string(&event)?);
                }
                Ok(other) => debug!(event = other.name(), "Ignoring event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event receiver lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    Ok(())
}
