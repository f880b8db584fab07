//! Attachment Preview command-line host
//!
//! Resolves the owning record from flags and environment, drives the
//! lifecycle controller for one action and prints the resulting view.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ap_attachments::{
    AnnotationRepository, AttachmentView, DirectorySink, FileUpload, LifecycleController,
    PreviewContent, PREVIEW_UNAVAILABLE,
};
use ap_core::{AppConfig, RecordRef};
use ap_webapi::{HttpWebApi, WebApi};

mod cli;
mod render;

use cli::{Cli, Command};
use render::{format_view, TerminalPresenter};

type Controller = LifecycleController<AnnotationRepository, RecordRef, TerminalPresenter>;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    cli.apply(&mut config);

    let mut api = HttpWebApi::new(&config.webapi.base_url)?;
    match config.require_access_token() {
        Ok(token) => api = api.with_access_token(token),
        Err(e) => tracing::warn!("{}; requests will be sent without authorization", e),
    }

    let record = config.record.to_record_ref();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        service_root = %api.base_url(),
        record = %record,
        "Starting attachment-preview"
    );

    let presenter = Arc::new(TerminalPresenter::new());
    let api: Arc<dyn WebApi> = Arc::new(api);
    let controller: Arc<Controller> = Arc::new(LifecycleController::new(
        Arc::new(AnnotationRepository::new()),
        Arc::new(record),
        presenter.clone(),
        api,
        &config.control,
    ));

    controller
        .spawn_init()
        .await
        .context("Initialization task failed")?;

    run(&controller, cli.command).await?;

    let view = presenter
        .last_view()
        .unwrap_or_else(|| AttachmentView::new(controller.settings().clone()));
    print_view(&view, cli.json)?;

    if view.has_error() {
        bail!("Command failed");
    }
    Ok(())
}

async fn run(controller: &Controller, command: Command) -> Result<()> {
    match command {
        Command::List => {}
        Command::Upload { files, subject } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let upload = FileUpload::from_path(path)
                    .await
                    .with_context(|| format!("Cannot read {}", path.display()))?;
                uploads.push(match &subject {
                    Some(subject) => upload.with_subject(subject.clone()),
                    None => upload,
                });
            }

            let report = controller.upload(uploads).await;
            info!(
                uploaded = report.uploaded.len(),
                rejected = report.rejected.len(),
                success = report.is_success(),
                "Upload finished"
            );
            for file in &report.not_attempted {
                eprintln!("skipped {}", file.name);
            }
        }
        Command::Delete { id } => {
            controller.delete(&id).await;
        }
        Command::Download { id, out } => {
            let attachment = controller
                .find(&id)
                .await
                .with_context(|| format!("Attachment {} not found", id))?;
            let sink = DirectorySink::new(&out);
            if controller.download(&attachment, &sink).await {
                println!("Saved {}", sink.path_for(&attachment.file_name).display());
            }
        }
        Command::Preview { id } => {
            let attachment = controller
                .find(&id)
                .await
                .with_context(|| format!("Attachment {} not found", id))?;
            match controller.preview(&attachment) {
                Some(PreviewContent::Image { data_uri }) | Some(PreviewContent::Pdf { data_uri }) => {
                    println!("{}", data_uri)
                }
                Some(PreviewContent::Unavailable) => println!("{}", PREVIEW_UNAVAILABLE),
                None => println!("Preview is disabled."),
            }
        }
    }
    Ok(())
}

fn print_view(view: &AttachmentView, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
    } else {
        println!("{}", format_view(view));
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ap_attachments=debug,ap_webapi=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}
