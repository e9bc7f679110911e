use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    load_project, BusyIndicator, Callbacks, CommandTransport, DispatchOutcome, ProjectClient,
    ProjectSession, RemoteDataView, RemoteFacetEngine, RemoteHistory, RemoteProcessMonitor,
    RenameOutcome, Updater, Widgets,
};
use shared::domain::{ChangeFlags, ExportFormat, ProjectId, UpdateOptions};
use tracing::info;

mod config;

use config::{load_settings, normalize_server_url};

#[derive(Parser, Debug)]
#[command(name = "gridworks", about = "Drive a Gridworks project from the command line")]
struct Cli {
    /// Overrides the server url from gridworks.toml and the environment.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    project: i64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the project title, its columns and the first page of rows.
    Show,
    Rename {
        name: String,
    },
    ExportRows {
        format: String,
        #[arg(long)]
        out: PathBuf,
    },
    ExportProject {
        #[arg(long)]
        out: PathBuf,
    },
    Denormalize,
    /// Run any mutating command, then refresh what it changed.
    Run {
        command: String,
        #[arg(long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
        #[arg(long = "body", value_parser = parse_pair)]
        body: Vec<(String, String)>,
        #[arg(long)]
        no_engine: bool,
        #[command(flatten)]
        flags: FlagSet,
    },
}

#[derive(Args, Debug, Default)]
struct FlagSet {
    #[arg(long)]
    everything_changed: bool,
    #[arg(long)]
    models_changed: bool,
    #[arg(long)]
    rows_changed: bool,
    #[arg(long)]
    row_metadata_changed: bool,
    #[arg(long)]
    cells_changed: bool,
    #[arg(long)]
    column_stats_changed: bool,
    #[arg(long)]
    engine_changed: bool,
}

impl From<&FlagSet> for ChangeFlags {
    fn from(set: &FlagSet) -> Self {
        ChangeFlags {
            everything_changed: set.everything_changed,
            models_changed: set.models_changed,
            rows_changed: set.rows_changed,
            row_metadata_changed: set.row_metadata_changed,
            cells_changed: set.cells_changed,
            column_stats_changed: set.column_stats_changed,
            engine_changed: set.engine_changed,
        }
    }
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

struct LogBusyIndicator;

impl BusyIndicator for LogBusyIndicator {
    fn show(&self) {
        info!("working...");
    }

    fn dismiss(&self) {
        info!("done");
    }
}

struct Session {
    session: ProjectSession,
    view: Arc<RemoteDataView>,
}

async fn open_session(server_url: &str, project_id: ProjectId) -> Result<Session> {
    let settings = load_settings();
    let client = ProjectClient::new(server_url, project_id)?;
    let transport: Arc<dyn CommandTransport> = Arc::new(client);
    let project = load_project(transport.as_ref(), project_id)
        .await
        .with_context(|| format!("failed to load project {project_id}"))?;

    let facets = Arc::new(RemoteFacetEngine::new(transport.clone()));
    let view = Arc::new(RemoteDataView::new(
        transport.clone(),
        facets.clone(),
        settings.row_page_size,
    ));
    let widgets = Widgets {
        history: Arc::new(RemoteHistory::new(transport.clone())),
        data_view: view.clone(),
        facets,
    };
    let updater = Arc::new(
        Updater::new(transport, project.into_shared(), widgets)
            .with_busy_indicator(Arc::new(LogBusyIndicator), settings.busy_delay),
    );
    let process = Arc::new(RemoteProcessMonitor::new(
        updater.clone(),
        settings.process_poll_interval,
    ));

    Ok(Session {
        session: ProjectSession::new(updater, process),
        view,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();

    let server_url = match &cli.server_url {
        Some(url) => normalize_server_url(url),
        None => load_settings().server_url,
    };
    let Session { session, view } = open_session(&server_url, ProjectId(cli.project)).await?;

    match cli.command {
        Command::Show => {
            session.update(ChangeFlags::rows(), None).await?;
            let project = session.project().read().await;
            println!("{}", project.title());
            if let Some(model) = &project.column_model {
                println!("columns: {}", model.header_labels().join(", "));
            }
            let page = view.page();
            println!(
                "rows {}..{} of {} ({} total)",
                page.start,
                page.start + page.rows.len(),
                page.filtered,
                page.total
            );
            for row in &page.rows {
                println!("{}", serde_json::to_string(row)?);
            }
        }
        Command::Rename { name } => match session.rename_project(&name).await? {
            RenameOutcome::Renamed(name) => println!("renamed to {name}"),
            RenameOutcome::Unchanged => println!("name unchanged"),
        },
        Command::ExportRows { format, out } => {
            let format = ExportFormat::parse(&format)
                .ok_or_else(|| anyhow!("unknown export format '{format}'"))?;
            let bytes = session.export_rows(format).await?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("wrote {} bytes to {}", bytes.len(), out.display());
        }
        Command::ExportProject { out } => {
            let bytes = session.export_project().await?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("wrote {} bytes to {}", bytes.len(), out.display());
        }
        Command::Denormalize => report(session.denormalize().await?),
        Command::Run {
            command,
            params,
            body,
            no_engine,
            flags,
        } => {
            let mut options = UpdateOptions::new(ChangeFlags::from(&flags));
            if no_engine {
                options = options.without_engine();
            }
            let callbacks = Callbacks::new().on_error(|envelope| {
                eprintln!(
                    "server refused the command: {}",
                    envelope.message.as_deref().unwrap_or("no message")
                );
                Ok(())
            });
            report(
                session
                    .post_process(&command, params, body, options, callbacks)
                    .await?,
            );
        }
    }

    Ok(())
}

fn report(outcome: DispatchOutcome) {
    match outcome {
        DispatchOutcome::Applied {
            history_entry: Some(entry),
        } => println!("applied: {} (undo entry {})", entry.description, entry.id),
        DispatchOutcome::Applied {
            history_entry: None,
        } => println!("applied"),
        DispatchOutcome::Failed { message } => {
            println!("failed: {}", message.unwrap_or_else(|| "no message".into()))
        }
        DispatchOutcome::Pending => println!("finished long-running process"),
        DispatchOutcome::Unrecognized => println!("server replied with an unrecognized code"),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
