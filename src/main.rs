//! Main entry point for the webdl CLI

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webdl::cli::{Args, Command, OutputFormatter};
use webdl::{Config, FsMediaStore, Locator, MediaStore, Orchestrator, TargetFolder, YtDlpBridge};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose)?;
    debug!("Starting webdl with args: {:?}", args);

    let formatter = Arc::new(OutputFormatter::new(args.verbosity_level()));
    let config = args.to_config();
    formatter.debug(&format!(
        "Storage root: {}, cache: {}, scratch: {}",
        config.storage_root.display(),
        config.cache_dir.display(),
        config.temp_dir.display()
    ));

    let store = Arc::new(
        FsMediaStore::open(&config.storage_root)
            .await
            .with_context(|| format!("opening storage at {}", config.storage_root.display()))?,
    );

    let found = match &args.command {
        Command::List { .. } => {
            return handle_list(store.as_ref(), args.command.target_folder(), &formatter).await;
        }
        Command::Open { locator } => {
            return handle_open(store.as_ref(), &Locator::new(locator.as_str()), &formatter).await;
        }
        Command::Search { url } => {
            let orchestrator = build_orchestrator(&config, store, &formatter)?;
            formatter.start_spinner("Looking up video...");
            let metadata = orchestrator.search(url).await;
            formatter.stop_spinner();
            formatter.print_metadata(&metadata);
            !metadata.is_empty()
        }
        Command::Download { url, .. } => {
            let orchestrator = build_orchestrator(&config, store.clone(), &formatter)?;
            let folder = args.command.target_folder().unwrap_or_default();
            let start_time = Instant::now();
            formatter.start_spinner(&format!("Downloading into {}...", folder));
            let result = orchestrator.download(url, folder).await;
            formatter.stop_spinner();
            let content = match &result.locator {
                Some(locator) => store.content_path(locator).await,
                None => None,
            };
            formatter.print_download_result(&result, content.as_deref(), start_time.elapsed());
            result.success
        }
    };

    Ok(if found {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Wire the yt-dlp extractor and the store into an orchestrator that reports
/// through `formatter`
fn build_orchestrator(
    config: &Config,
    store: Arc<FsMediaStore>,
    formatter: &Arc<OutputFormatter>,
) -> anyhow::Result<Orchestrator> {
    let bridge = Arc::new(YtDlpBridge::from_config(config)?);
    info!("Using extractor at {:?}", bridge.program());

    let notices = formatter.clone();
    Ok(Orchestrator::new(bridge, store, config)?
        .with_notifier(move |notice| notices.notice(&notice)))
}

/// Open a finalized entry with the desktop's default application
async fn handle_open(
    store: &dyn MediaStore,
    locator: &Locator,
    formatter: &OutputFormatter,
) -> anyhow::Result<ExitCode> {
    let Some(path) = store.content_path(locator).await else {
        formatter.error(&format!("No saved video for {}", locator));
        return Ok(ExitCode::FAILURE);
    };
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        formatter.error(&format!("File not found: {}", path.display()));
        return Ok(ExitCode::FAILURE);
    }

    formatter.success(&format!("Opening {}", path.display()));
    open::that(&path).with_context(|| format!("opening {}", path.display()))?;
    Ok(ExitCode::SUCCESS)
}

/// Print saved entries of one folder, or of all of them
async fn handle_list(
    store: &dyn MediaStore,
    folder: Option<TargetFolder>,
    formatter: &OutputFormatter,
) -> anyhow::Result<ExitCode> {
    let folders = match folder {
        Some(folder) => vec![folder],
        None => TargetFolder::all().to_vec(),
    };

    let mut entries = Vec::new();
    for folder in folders {
        entries.extend(
            store
                .entries(folder.collection())
                .await
                .with_context(|| format!("listing {}", folder))?,
        );
    }
    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    formatter.print_entries(&entries);
    Ok(ExitCode::SUCCESS)
}

/// Initialize logging system
fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "info" } else { "warn" };

    // RUST_LOG wins over the verbosity flag
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .context("installing log subscriber")?;

    Ok(())
}
