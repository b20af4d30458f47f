//! # Blobxfer CLI
//!
//! Command-line interface for the blobxfer library.
//! Uploads a single file to, or downloads a single blob from, a storage container.

use std::path::PathBuf;

use anyhow::Context;
use blobxfer::{
    DEFAULT_BUFFER_SIZE, Direction, HttpBlobStore, LogSink, OverwriteBehavior, ProgressSink,
    StoreConfig, TransferEngine, TransferOptions,
};
use clap::{Args, Parser, Subcommand};
use log::error;

mod cli;

/// Command-line interface for blobxfer
#[derive(Parser)]
#[command(name = "blobxfer")]
#[command(about = "Upload or download a single file to blob storage with progress")]
#[command(long_about = "Moves one file between the local disk and a blob container:
  blobxfer upload ./upload.msi                  # Upload as 'upload.msi'
  blobxfer upload ./build.tar --name ci/b.tar   # Upload under another name
  blobxfer download upload.msi                  # Download to ./upload.msi
  blobxfer download upload.msi /tmp/copy.msi    # Download to a chosen path

Connection settings default to the local Azurite emulator and can be set
with flags or BLOBXFER_ENDPOINT, BLOBXFER_CONTAINER and BLOBXFER_SAS_TOKEN.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    store: StoreArgs,

    /// Read buffer size in bytes for downloads
    #[arg(long, global = true, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Report progress as log lines instead of a progress bar
    #[arg(long, global = true)]
    log_progress: bool,

    /// Show what would be transferred without touching disk or network
    #[arg(long, global = true)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct StoreArgs {
    /// Blob service endpoint
    #[arg(long, global = true, env = "BLOBXFER_ENDPOINT")]
    endpoint: Option<String>,

    /// Container holding the objects
    #[arg(long, global = true, env = "BLOBXFER_CONTAINER")]
    container: Option<String>,

    /// Pre-signed SAS query string appended to every request
    #[arg(long, global = true, env = "BLOBXFER_SAS_TOKEN", hide_env_values = true)]
    sas_token: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a local file
    Upload {
        /// File to upload
        file: PathBuf,

        /// Object name (defaults to the file's base name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Download a blob to a local file
    Download {
        /// Object name in the container
        name: String,

        /// Output file path (defaults to the object's last path segment)
        output: Option<PathBuf>,

        /// Never overwrite existing files (fail if destination exists)
        #[arg(long)]
        no_clobber: bool,
    },
}

impl StoreArgs {
    fn into_config(self) -> StoreConfig {
        let mut config = StoreConfig::default();
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(container) = self.container {
            config.container = container;
        }
        config.sas_token = self.sas_token.filter(|s| !s.trim().is_empty());
        config
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let default_filter = if cli.verbose {
        "debug"
    } else if cli.log_progress {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    if cli.verbose {
        eprintln!("📦 Blobxfer v{} starting...", env!("CARGO_PKG_VERSION"));
    }

    let config = cli.store.into_config();

    match cli.command {
        Command::Upload { file, name } => {
            let name = match name {
                Some(name) => name,
                None => blobxfer::remote_name_for(&file)?,
            };
            if cli.dry_run {
                eprintln!(
                    "🔍 [DRY RUN] Would upload {} to {}/{}/{}",
                    file.display(),
                    config.endpoint,
                    config.container,
                    name
                );
                return Ok(());
            }

            let options = TransferOptions {
                buffer_size: cli.buffer_size,
                ..Default::default()
            };
            let mut engine = engine_for(&config, options)?;
            let mut sink = progress_sink(
                Direction::Upload,
                cli.log_progress,
                &format!("⬆️  Uploading {} to {}/{}", file.display(), config.container, name),
            );

            let sent = engine
                .upload_as(&file, &name, &mut sink)
                .await
                .with_context(|| format!("uploading {}", file.display()))?;
            eprintln!("✅ Upload completed: {}", blobxfer::format_size(sent));
        }
        Command::Download {
            name,
            output,
            no_clobber,
        } => {
            let output = output
                .unwrap_or_else(|| PathBuf::from(blobxfer::resolve_output_filename(&name)));
            if cli.dry_run {
                eprintln!(
                    "🔍 [DRY RUN] Would download {}/{}/{} to {}",
                    config.endpoint,
                    config.container,
                    name,
                    output.display()
                );
                return Ok(());
            }

            let options = TransferOptions {
                buffer_size: cli.buffer_size,
                overwrite: if no_clobber {
                    OverwriteBehavior::NeverOverwrite
                } else {
                    OverwriteBehavior::Force
                },
            };
            let mut engine = engine_for(&config, options)?;
            eprintln!("📁 Saving to: {}", output.display());
            let mut sink = progress_sink(
                Direction::Download,
                cli.log_progress,
                &format!("⬇️  Downloading {}/{}", config.container, name),
            );

            let written = engine
                .download(&name, &output, &mut sink)
                .await
                .with_context(|| format!("downloading {name}"))?;
            eprintln!("✅ Download completed: {}", blobxfer::format_size(written));
        }
    }

    Ok(())
}

fn engine_for(
    config: &StoreConfig,
    options: TransferOptions,
) -> anyhow::Result<TransferEngine<HttpBlobStore>> {
    let store = HttpBlobStore::new(config.clone()).context("invalid store configuration")?;
    Ok(TransferEngine::with_options(
        store,
        config.container.clone(),
        options,
    ))
}

/// Pick the progress sink for this run
fn progress_sink(direction: Direction, log_progress: bool, message: &str) -> Box<dyn ProgressSink> {
    if log_progress {
        Box::new(LogSink::new(message.trim_start_matches(|c: char| !c.is_alphanumeric())))
    } else {
        Box::new(cli::ProgressBarSink::new(direction, message))
    }
}
