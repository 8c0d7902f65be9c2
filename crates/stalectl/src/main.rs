//! stalectl - inspect, verify and purge cache snapshots

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use stalecache::{
    snapshot, CacheStorage, EntryGroup, PersistentStorage, StorageConfig, DEFAULT_CAPACITY,
    DEFAULT_FILE_NAME,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Storage directory
    #[arg(short, long)]
    dir: PathBuf,

    /// Snapshot file name
    #[arg(short, long, default_value = DEFAULT_FILE_NAME)]
    file: String,

    /// Cache capacity (number of stored variants)
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print every stored variant
    List,
    /// Decode the snapshot without loading it
    Verify,
    /// Clear the cache and delete the snapshot
    Purge,
}

impl Args {
    fn config(&self) -> StorageConfig {
        StorageConfig::new(&self.dir)
            .file_name(self.file.clone())
            .capacity(self.capacity)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = args.config();

    match args.command {
        Command::List => {
            for line in list(&config.snapshot_path(), Utc::now())? {
                println!("{}", line);
            }
        }
        Command::Verify => {
            let (resources, entries) = verify(&config.snapshot_path())?;
            println!("OK: {} resources, {} entries", resources, entries);
        }
        Command::Purge => purge(config)?,
    }

    Ok(())
}

fn read(path: &Path) -> Result<Vec<EntryGroup>> {
    snapshot::read_file(path).with_context(|| format!("reading snapshot {}", path.display()))
}

/// One line per variant, least recently used first
fn list(path: &Path, now: DateTime<Utc>) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(vec![format!("no snapshot at {}", path.display())]);
    }

    let mut lines = Vec::new();
    for group in read(path)? {
        for (vary, item) in &group.variants {
            let selector = if vary.is_empty() {
                "-".to_string()
            } else {
                vary.to_string()
            };
            let freshness = if item.is_stale(now) { "stale" } else { "fresh" };
            lines.push(format!(
                "{}\t{}\t{}\t{}",
                group.uri,
                selector,
                item.response().status(),
                freshness
            ));
        }
    }
    Ok(lines)
}

/// Resource and entry counts of a readable snapshot
fn verify(path: &Path) -> Result<(usize, usize)> {
    let groups = read(path)?;
    let entries = groups.iter().map(|group| group.variants.len()).sum();
    Ok((groups.len(), entries))
}

fn purge(config: StorageConfig) -> Result<()> {
    let dir = config.dir().to_path_buf();
    let storage = PersistentStorage::open(config)
        .with_context(|| format!("opening storage in {}", dir.display()))?;

    let entries = storage.len();
    storage.clear();
    info!(entries, dir = %dir.display(), "purged cache");
    Ok(())
}
