mod cli;
mod error;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use clap::Parser as _;
use exn::{OptionExt, ResultExt};
use futures::StreamExt;
use pcat_catalogue::catalogue::{CatalogueEvent, Summary, catalogue};
use pcat_catalogue::tree::RootRef;
use pcat_config::{Config, StoreConfig};
use pcat_store::StoreHandle;
use pcat_store::backend::{GuardedStore, LocalStore, ReadOnlyStore};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

const DEFAULT_SOURCE: &str = "Google Photos";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(&cli);
    tracing::debug!("Parsed CLI arguments: {cli:?}");

    match run(cli).await {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        },
        Err(e) => {
            tracing::error!("{e:?}");
            ExitCode::FAILURE
        },
    }
}

fn setup_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).compact().init();
}

async fn run(cli: Cli) -> Result<Summary> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(dir) = cli.store_root {
        match &mut config.store {
            StoreConfig::Local { root, .. } => *root = Some(dir),
        }
    }
    config.validate().or_raise(|| ErrorKind::Config)?;

    let source = match cli.source.or_else(|| config.source.clone()) {
        Some(source) => source,
        None => prompt("Source folder", Some(DEFAULT_SOURCE)).await?,
    };
    let target = match cli.target.or_else(|| config.target.clone()) {
        Some(target) => target,
        None => prompt("Target folder", None).await?,
    };
    if target.trim().is_empty() {
        exn::bail!(ErrorKind::NoTarget);
    }

    let store = open_store(&config, cli.dry_run)?;
    let ctx = config.context();
    let (source, target) = (RootRef::parse(source.trim()), RootRef::parse(target.trim()));
    tracing::info!(store = store.name(), %source, %target, dry_run = cli.dry_run, "Cataloguing media");

    let mut summary = Summary::default();
    // Errors before discovery completes are fatal, later ones only affect a single file.
    let mut discovered = false;
    let mut events = std::pin::pin!(catalogue(&store, &ctx, source, target));
    while let Some(event) = events.next().await {
        match event {
            Ok(CatalogueEvent::Started) => tracing::debug!("Building snapshot trees"),
            Ok(CatalogueEvent::TreeBuilt { role, root, folders, files, complete }) => {
                tracing::info!(%role, %root, folders, files, "Snapshot tree built");
                if !complete {
                    tracing::warn!(%role, %root, "Some folders could not be listed; their media will be left alone");
                }
            },
            Ok(CatalogueEvent::DiscoveryComplete(total)) => {
                discovered = true;
                tracing::info!(total, "Found media to catalogue");
            },
            Ok(CatalogueEvent::Catalogued(action)) => summary.record(&action),
            Ok(CatalogueEvent::Complete) => tracing::info!(%summary, "Cataloguing complete"),
            Err(e) if discovered => {
                tracing::error!("{e:?}");
                summary.record_failure();
            },
            Err(e) => return Err(e).or_raise(|| ErrorKind::Catalogue),
        }
    }
    Ok(summary)
}

/// The configured store behind deadlines and retries, and made read-only for
/// dry runs.
fn open_store(config: &Config, dry_run: bool) -> Result<StoreHandle> {
    let store: StoreHandle = match &config.store {
        StoreConfig::Local { root, page_size } => {
            let root = root.as_deref().ok_or_raise(|| ErrorKind::Config)?;
            let root = std::path::absolute(root).or_raise(|| ErrorKind::Store)?;
            Arc::new(LocalStore::new("local", root).or_raise(|| ErrorKind::Store)?.with_page_size(*page_size))
        },
    };
    let guarded: StoreHandle =
        Arc::new(GuardedStore::new(store, config.retry_policy()).with_concurrency(config.concurrency));
    if dry_run {
        let read_only: StoreHandle = Arc::new(ReadOnlyStore::new(guarded));
        return Ok(read_only);
    }
    Ok(guarded)
}

/// Ask a question on the terminal, falling back to `default` for an empty answer.
async fn prompt(question: &str, default: Option<&str>) -> Result<String> {
    let text = match default {
        Some(default) => format!("{question} [{default}]: "),
        None => format!("{question}: "),
    };
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await.or_raise(|| ErrorKind::Prompt)?;
    stdout.flush().await.or_raise(|| ErrorKind::Prompt)?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut answer).await.or_raise(|| ErrorKind::Prompt)?;
    Ok(match answer.trim() {
        "" => default.unwrap_or_default().to_string(),
        answer => answer.to_string(),
    })
}
