use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use services::{Clock, ProgressEngine};
use storage::repository::Storage;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use training_core::catalog::ModuleCatalog;
use training_core::model::EngineSettings;

mod cli;
mod commands;
mod db;

use cli::Cli;

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    // Open + migrate SQLite here so the library crates stay free of file-system setup.
    let db_url = db::normalize_sqlite_url(&cli.db);
    db::prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;

    let (engine, report) = ProgressEngine::open(
        Clock::system(),
        EngineSettings::default(),
        ModuleCatalog::default(),
        Arc::clone(&storage.kv),
    )
    .await;
    if !report.is_clean() {
        warn!(
            progress = report.progress_issues.len(),
            history = report.history_issues.len(),
            "stored progress needed repairs"
        );
    }

    commands::execute(engine, cli.command).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }
}
