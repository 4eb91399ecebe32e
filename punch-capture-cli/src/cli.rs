//! # punch-capture CLI interface
//!
//! Host driver for the capture pipeline: parses arguments, loads config, wires the
//! host device stand-ins and HTTP clients into a [`PunchSession`], and prints results.
//!
//! All pipeline rules (ladder order, naming, validation, create-vs-update) live in the
//! `punch-capture` core crate. This module is glue only.
//!
//! ## How To Use
//! - Command-line: `punch-capture --config punch.yaml upload --image photo.png`
//! - Programmatic/integration: call [`run`] with a constructed [`Cli`].
//!
//! ## Extending
//! Add subcommands to [`Commands`] and keep business logic in the core crate.
use crate::device::{FileCaptureBackend, HostPermissions, StaticCredentials};
use crate::load_config::{load_config, CliConfig};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use punch_capture::acquire::GatedAcquirer;
use punch_capture::api::HttpPunchApi;
use punch_capture::contract::{CredentialProvider, ObjectStore, PunchApi};
use punch_capture::draft::PunchDraft;
use punch_capture::error::{ApiError, PipelineError};
use punch_capture::ladder::EncoderLadder;
use punch_capture::media::{CaptureSource, LocalMediaReader};
use punch_capture::pipeline::{CaptureOutcome, PunchSession};
use punch_capture::store::{HttpObjectStore, InMemoryObjectStore};
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for punch-capture: attach photos to punch items.
#[derive(Parser)]
#[clap(
    name = "punch-capture",
    version,
    about = "Capture, upload and attach punch item photos to facility records"
)]
pub struct Cli {
    /// Path to the YAML config file
    #[clap(long)]
    pub config: PathBuf,

    /// Keep uploads in memory and skip every punch API call
    #[clap(long)]
    pub dry_run: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload an image through the encoder ladder and print its public URL
    Upload {
        /// Image to pick from the host "gallery"
        #[clap(long)]
        image: PathBuf,
    },
    /// Create or update a punch, optionally attaching an image
    Submit {
        #[clap(long)]
        image: Option<PathBuf>,

        #[clap(flatten)]
        draft: DraftArgs,

        /// Update this existing punch instead of creating one
        #[clap(long)]
        punch_id: Option<String>,
    },
    /// Fetch and print a punch
    Show {
        #[clap(long)]
        id: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct DraftArgs {
    #[clap(long, default_value = "")]
    pub title: String,
    #[clap(long, default_value = "")]
    pub description: String,
    /// A, B, C or D
    #[clap(long, default_value = "")]
    pub category: String,
    /// OPEN or CLOSED
    #[clap(long, default_value = "OPEN")]
    pub status: String,
    #[clap(long, default_value = "")]
    pub system_id: String,
    #[clap(long, default_value = "")]
    pub project_id: String,
}

impl From<DraftArgs> for PunchDraft {
    fn from(args: DraftArgs) -> Self {
        PunchDraft {
            title: args.title,
            description: args.description,
            category: args.category,
            status: args.status,
            system_id: args.system_id,
            project_id: args.project_id,
            image_url: None,
        }
    }
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let result = dispatch(cli).await;

    let span = tracing::info_span!("exit", success = result.is_ok());
    let _entered = span.enter();
    match &result {
        Ok(()) => tracing::info!("exit"),
        Err(e) => tracing::error!(error = %e, "exit"),
    }
    result
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;
    let dry_run = cli.dry_run;

    match cli.command {
        Commands::Upload { image } => {
            tracing::info!(command = "upload", ?image, dry_run, "Starting upload");
            let session = build_session(&config, Some(image), dry_run, PunchDraft::default())?;
            match session
                .capture(CaptureSource::Gallery)
                .await
                .map_err(user_facing)?
            {
                CaptureOutcome::Uploaded(report) => {
                    tracing::info!(
                        command = "upload",
                        reference = %report.reference,
                        encoding = ?report.winning_encoding(),
                        attempts = report.attempts.len(),
                        "Upload complete"
                    );
                    println!("{}", report.reference);
                }
                CaptureOutcome::Cancelled => println!("Capture cancelled"),
            }
            Ok(())
        }
        Commands::Submit {
            image,
            draft,
            punch_id,
        } => {
            tracing::info!(command = "submit", ?image, ?punch_id, dry_run, "Starting submission");
            let has_image = image.is_some();
            let mut session = build_session(&config, image, dry_run, draft.into())?;
            if let Some(id) = punch_id {
                session = session.with_record_id(id);
            }

            if dry_run {
                session
                    .draft()
                    .validate()
                    .map_err(|e| user_facing(e.into()))?;
                if has_image {
                    session
                        .capture(CaptureSource::Gallery)
                        .await
                        .map_err(user_facing)?;
                }
                let payload = session.draft().to_payload();
                tracing::info!(command = "submit", "Dry run: punch API not called");
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }

            let record = if has_image {
                match session
                    .capture_and_submit(CaptureSource::Gallery)
                    .await
                    .map_err(user_facing)?
                {
                    Some(report) => {
                        if let Some(upload_error) = &report.upload_error {
                            tracing::warn!(error = %upload_error, "Punch saved without image");
                            eprintln!("Warning: {}", upload_error.user_message());
                        }
                        report.record
                    }
                    None => {
                        println!("Capture cancelled");
                        return Ok(());
                    }
                }
            } else {
                session.submit().await.map_err(user_facing)?
            };

            tracing::info!(command = "submit", punch_id = %record.uuid, "Submission complete");
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Show { id } => {
            tracing::info!(command = "show", punch_id = %id, "Fetching punch");
            if dry_run {
                tracing::warn!(command = "show", "--dry-run has no effect on show");
            }
            let api = HttpPunchApi::new(&config.api).context("Failed to build punch API client")?;
            let token = config
                .api_token
                .clone()
                .ok_or_else(|| user_facing(PipelineError::Association(ApiError::Unauthenticated)))?;
            let record = api
                .get_punch(&id, &token)
                .await
                .map_err(|e| user_facing(PipelineError::Association(e)))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    }
}

fn build_session(
    config: &CliConfig,
    image: Option<PathBuf>,
    dry_run: bool,
    draft: PunchDraft,
) -> Result<PunchSession> {
    let backend = FileCaptureBackend::new(image).context("Failed to create capture cache directory")?;
    let acquirer = GatedAcquirer::new(
        Arc::new(HostPermissions),
        Arc::new(backend),
        config.capture.capture_quality,
    );
    let ladder = EncoderLadder::new(Arc::new(LocalMediaReader::new()), object_store(config, dry_run)?);
    let api = HttpPunchApi::new(&config.api).context("Failed to build punch API client")?;
    let credentials = StaticCredentials::new(config.api_token.clone());

    Ok(PunchSession::new(
        config.capture.clone(),
        Arc::new(acquirer),
        ladder,
        Arc::new(api),
        Arc::new(credentials),
        draft,
    ))
}

fn object_store(config: &CliConfig, dry_run: bool) -> Result<Arc<dyn ObjectStore>> {
    if dry_run {
        tracing::info!("Dry run: objects are kept in memory");
        return Ok(Arc::new(InMemoryObjectStore::new(
            config.store.public_base.clone(),
            config.store.bucket.clone(),
        )));
    }
    let credentials = config
        .store_token
        .clone()
        .map(|token| Arc::new(StaticCredentials::new(Some(token))) as Arc<dyn CredentialProvider>);
    let store = HttpObjectStore::new(config.store.clone(), credentials)
        .context("Failed to build object store client")?;
    Ok(Arc::new(store))
}

fn user_facing(e: PipelineError) -> anyhow::Error {
    tracing::error!(error = %e, "Pipeline failed");
    anyhow!(e.user_message())
}
