use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::warn;

use scenario_ev::config::{self, EngineConfig};
use scenario_ev::{dataset, historical_dataset, parquet_source};

/// Loads provider exports into the local sqlite store.
#[derive(Parser)]
#[command(name = "hist_ingest")]
struct Args {
    /// Parquet export to ingest (repeatable)
    #[arg(long = "parquet")]
    parquet: Vec<PathBuf>,
    /// JSON array of matches to ingest (repeatable)
    #[arg(long = "json-data")]
    json: Vec<PathBuf>,
    /// League name for rows without a country column
    #[arg(long)]
    league: Option<String>,
    /// Target sqlite path; defaults to SCENARIO_DB or the cache dir
    #[arg(long)]
    db: Option<PathBuf>,
}

fn main() -> Result<()> {
    config::load_dotenv();
    config::init_tracing();

    let args = Args::parse();
    if args.parquet.is_empty() && args.json.is_empty() {
        return Err(anyhow!("nothing to ingest: pass --parquet or --json-data"));
    }

    let db_path = args
        .db
        .or(EngineConfig::from_env().db_path)
        .context("unable to resolve sqlite path")?;
    let mut conn = historical_dataset::open_db(&db_path)?;

    let mut failures = Vec::new();
    for path in &args.parquet {
        match parquet_source::load_parquet(path, args.league.as_deref()) {
            Ok(load) => {
                let summary = historical_dataset::ingest_matches(
                    &mut conn,
                    db_path.clone(),
                    &path.display().to_string(),
                    &load.matches,
                    load.skipped,
                )?;
                print_summary(&summary);
            }
            Err(err) => {
                warn!(path = %path.display(), "parquet ingest failed: {err:#}");
                failures.push(format!("{}: {err:#}", path.display()));
            }
        }
    }
    for path in &args.json {
        match dataset::load_json(path) {
            Ok(matches) => {
                let summary = historical_dataset::ingest_matches(
                    &mut conn,
                    db_path.clone(),
                    &path.display().to_string(),
                    &matches,
                    0,
                )?;
                print_summary(&summary);
            }
            Err(err) => {
                warn!(path = %path.display(), "json ingest failed: {err:#}");
                failures.push(format!("{}: {err:#}", path.display()));
            }
        }
    }

    if !failures.is_empty() {
        println!("errors: {}", failures.len());
        for err in failures.iter().take(6) {
            println!("   - {err}");
        }
    }
    Ok(())
}

fn print_summary(summary: &historical_dataset::IngestSummary) {
    println!("Historical ingest complete");
    println!("DB: {}", summary.db_path.display());
    println!("Source: {}", summary.source);
    println!(
        "Rows: {} read, {} skipped",
        summary.rows_read, summary.rows_skipped
    );
    println!("Matches upserted: {}", summary.matches_upserted);
    println!("Leagues in store: {}", summary.leagues.join(", "));
}
