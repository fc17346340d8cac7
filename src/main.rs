// SPDX-License-Identifier: MIT OR Apache-2.0

//! FireSync command line: sync one named collection (default `users`) or
//! every configured collection with `--all`. Exits non-zero only on a
//! fatal configuration, credential or fetch failure; per-document errors
//! are logged and do not fail the run.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use firesync_rust::core::config::SyncConfig;
use firesync_rust::core::source::FirestoreSource;
use firesync_rust::core::sync::SyncRunner;
use firesync_rust::core::table::SqliteBackend;
use firesync_rust::core::transform::TransformRegistry;
use firesync_rust::FireSyncResult;

/// Collection synced when no name and no `--all` flag is given.
const DEFAULT_COLLECTION: &str = "users";

#[derive(Debug, Parser)]
#[command(name = "firesync", about = "Sync Firestore collections into relational rows")]
struct Cli {
    /// Collection to sync; defaults to `users` when omitted
    collection: Option<String>,

    /// Sync every configured collection
    #[arg(long)]
    all: bool,

    /// Path to the TOML configuration file
    #[arg(long, default_value = "firesync.toml")]
    config: PathBuf,

    /// Override the credentials file path from the configuration
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Override the destination database path from the configuration
    #[arg(long)]
    database: Option<PathBuf>,
}

fn run(cli: &Cli) -> FireSyncResult<()> {
    let config = SyncConfig::from_file(&cli.config)?;

    let credentials_path = cli
        .credentials
        .clone()
        .unwrap_or_else(|| config.global.credentials_path.clone());
    let database_path = cli
        .database
        .clone()
        .unwrap_or_else(|| config.global.database_path.clone());

    let source = FirestoreSource::from_credentials_file(&credentials_path)?;
    let tables = SqliteBackend::open(&database_path)?;
    let mut runner = SyncRunner::new(
        config,
        TransformRegistry::with_builtins(),
        Box::new(source),
        Box::new(tables),
    );

    if cli.all {
        let results = runner.sync_all();
        let fatal = results.iter().filter(|(_, r)| r.is_err()).count();
        if fatal > 0 {
            return Err(firesync_rust::FireSyncError::other(format!(
                "{fatal} collection(s) failed fatally"
            )));
        }
        return Ok(());
    }

    let name = cli.collection.as_deref().unwrap_or(DEFAULT_COLLECTION);
    let summary = runner.sync_collection(name)?;
    info!("done: {summary}");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
