//! Seeds the configured SQLite workflow store with the hardcoded workflows
//! in [`diy_troubleshooting_engine::seed`], mirroring the original source's
//! `scripts/db_seed_workflows.py`.
//!
//! Usage:
//!   seed-workflows [--config <PATH>] [--force]
//!
//! By default, existing workflows with the same name are left untouched
//! unless `--force` is passed, in which case every seed workflow overwrites
//! whatever is already stored.

use std::path::PathBuf;

use diy_troubleshooting_engine::config::AppConfig;
use diy_troubleshooting_engine::seed;
use diy_troubleshooting_engine::store::{SqliteWorkflowStore, WorkflowStore};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

struct CliConfig {
    config_path: PathBuf,
    force: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self { config_path: PathBuf::from("config.toml"), force: false }
    }
}

fn parse_args() -> CliConfig {
    let mut config = CliConfig::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                if let Some(path) = args.next() {
                    config.config_path = PathBuf::from(path);
                }
            }
            "--force" => config.force = true,
            "--help" | "-h" => {
                println!("seed-workflows [--config <PATH>] [--force]");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(1);
            }
        }
    }

    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = parse_args();

    let base =
        if cli.config_path.exists() { AppConfig::from_file(&cli.config_path)? } else { AppConfig::default() };
    let config = AppConfig::from_env(base)?;

    let store = SqliteWorkflowStore::new(&config.database.url).await?;
    let existing: std::collections::HashSet<String> =
        store.list().await?.into_iter().map(|w| w.name).collect();

    let mut inserted = 0;
    let mut skipped = 0;
    for workflow in seed::all() {
        if !cli.force && existing.contains(&workflow.name) {
            info!(workflow = %workflow.name, "already present, skipping");
            skipped += 1;
            continue;
        }
        workflow.validate().map_err(|e| anyhow::anyhow!("seed workflow '{}' is invalid: {e}", workflow.name))?;
        info!(workflow = %workflow.name, "seeding");
        store.put(&workflow).await?;
        inserted += 1;
    }

    info!(inserted, skipped, "seeding complete");
    Ok(())
}
