use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bucketfs::config;
use bucketfs::storage::{EntryKind, FileSystemManager};

#[derive(Parser)]
#[command(
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")"),
    about = "Browse and edit S3 buckets as a filesystem"
)]
struct Opts {
    /// Path to config.json. By default the one in the working directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    subcmd: Command,
}

#[derive(Parser)]
enum Command {
    /// Show what a path is, its size and modification time
    Stat { uri: String },

    /// List the immediate children of a folder
    Ls { uri: String },

    /// Write an object's content to stdout
    Cat { uri: String },

    /// Upload a local file, replacing the object
    Put { local: PathBuf, uri: String },

    /// Delete an object
    Rm { uri: String },

    /// Create a folder (folders only exist as key prefixes)
    Mkdir { uri: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bucketfs=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let opts = Opts::parse();

    // Load configuration / 加载配置
    let app_config = match &opts.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
    .map_err(anyhow::Error::msg)?;

    let manager = FileSystemManager::new();
    bucketfs::register_file_providers(&manager, &app_config).await?;

    match opts.subcmd {
        Command::Stat { uri } => {
            let file = manager.resolve_file(&uri).await?;
            let kind = file.file_type().await?;
            let size = file.content_size().await?;
            let modified = file
                .last_modified()
                .await?
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            println!("{:?}\t{}\t{}\t{}", kind, size, modified, file.path());
        }
        Command::Ls { uri } => {
            let file = manager.resolve_file(&uri).await?;
            for child in file.list_children().await? {
                let marker = if child.kind == EntryKind::Folder { "/" } else { "" };
                println!("{:>12}\t{}{}", child.size, child.name, marker);
            }
        }
        Command::Cat { uri } => {
            let mut file = manager.resolve_file(&uri).await?;
            let mut input = file.input_stream().await?;
            let mut stdout = tokio::io::stdout();
            tokio::io::copy(&mut input, &mut stdout).await?;
            stdout.flush().await?;
        }
        Command::Put { local, uri } => {
            let mut source = tokio::fs::File::open(&local)
                .await
                .with_context(|| format!("Failed to open {:?}", local))?;
            let file = manager.resolve_file(&uri).await?;
            let mut output = file.output_stream(false).await?;
            let copied = tokio::io::copy(&mut source, &mut output).await?;
            output
                .shutdown()
                .await
                .map_err(bucketfs::VfsError::from_io)?;
            tracing::info!("Uploaded {} bytes to {}", copied, uri);
        }
        Command::Rm { uri } => {
            let mut file = manager.resolve_file(&uri).await?;
            file.delete().await?;
        }
        Command::Mkdir { uri } => {
            let file = manager.resolve_file(&uri).await?;
            file.create_folder().await?;
        }
    }

    Ok(())
}
