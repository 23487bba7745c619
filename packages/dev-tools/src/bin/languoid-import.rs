//! Bulk import CLI
//!
//! Reads a JSON array of import records and runs it against a languoid store.
//! Runs as a dry run unless `--commit` is given, so operators can iterate on
//! a dataset until every problem is fixed.
//!
//! # Usage
//!
//! ```bash
//! # Check a dataset against an empty catalog
//! cargo run --bin languoid-import -- dataset.json
//!
//! # Apply it to a persisted snapshot and write the snapshot back
//! LANGUOID_STORE_SNAPSHOT=catalog.json cargo run --bin languoid-import -- dataset.json --commit
//! ```
//!
//! Service tunables come from the `LANGUOID_*` variables read by
//! `CatalogConfig::from_env()`.

use anyhow::Context;
use clap::Parser;
use languoid_core::db::LanguoidStore;
use languoid_core::models::{ImportRecord, Languoid};
use languoid_core::services::LanguoidCatalog;
use languoid_core::CatalogConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "languoid-import", about = "Import a languoid dataset")]
#[command(version)]
struct Cli {
    /// JSON file holding an array of import records
    dataset: PathBuf,

    /// Apply the import instead of only checking it
    #[arg(long)]
    commit: bool,

    /// JSON snapshot of the stored languoids; rewritten after a commit
    #[arg(long, env = "LANGUOID_STORE_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Check the stored hierarchy after the import
    #[arg(long)]
    verify: bool,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = CatalogConfig::from_env();

    let store = match &cli.snapshot {
        Some(path) if path.exists() => {
            let languoids: Vec<Languoid> = read_json(path)?;
            tracing::info!("Loaded {} languoids from {}", languoids.len(), path.display());
            LanguoidStore::with_languoids(languoids)?
        }
        _ => LanguoidStore::new(),
    };
    let catalog = LanguoidCatalog::new(Arc::new(store), config);

    let records: Vec<ImportRecord> = read_json(&cli.dataset)?;
    let service = catalog.import_service();
    let result = if cli.commit {
        service.import(records).await
    } else {
        service.dry_run(records).await
    };

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("❌ {}", e);
            for problem in e.import_problems() {
                eprintln!("   - {}", problem);
            }
            std::process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if cli.commit {
        catalog.settle().await;
        if let Some(path) = &cli.snapshot {
            let languoids = catalog.store().all_languoids().await;
            std::fs::write(path, serde_json::to_string_pretty(&languoids)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✅ Wrote {} languoids to {}", languoids.len(), path.display());
        }
    }

    if cli.verify {
        let report = catalog.maintenance().verify_hierarchy().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
