use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::dataset::{self, Dataset, DatasetFilter};
use crate::{fake_dataset, historical_dataset, parquet_source};

/// Where a session's historical matches come from.
#[derive(Debug, Clone)]
pub enum DataSource {
    Sqlite(PathBuf),
    Parquet(PathBuf),
    Json(PathBuf),
    /// Synthetic matches from a fixed seed.
    Demo(u64),
}

impl DataSource {
    /// Picks the first explicit source, falling back to the configured sqlite path.
    pub fn resolve(
        db: Option<PathBuf>,
        parquet: Option<PathBuf>,
        json: Option<PathBuf>,
        demo: bool,
        configured_db: Option<PathBuf>,
    ) -> Result<Self> {
        if demo {
            return Ok(DataSource::Demo(DEMO_SEED));
        }
        if let Some(path) = parquet {
            return Ok(DataSource::Parquet(path));
        }
        if let Some(path) = json {
            return Ok(DataSource::Json(path));
        }
        db.or(configured_db)
            .map(DataSource::Sqlite)
            .ok_or_else(|| anyhow!("no data source: pass --db, --parquet, --json-data or --demo"))
    }

    /// Loads the matches accepted by `filter` into an immutable [`Dataset`].
    pub fn load(&self, filter: &DatasetFilter) -> Result<Dataset> {
        let matches = match self {
            DataSource::Sqlite(path) => {
                if !path.exists() {
                    return Err(anyhow!(
                        "sqlite db {} not found; run hist_ingest first",
                        path.display()
                    ));
                }
                let conn = historical_dataset::open_db(path)?;
                historical_dataset::load_matches(&conn, filter)?
            }
            DataSource::Parquet(path) => {
                let load = parquet_source::load_parquet(path, filter.league.as_deref())
                    .with_context(|| format!("load parquet {}", path.display()))?;
                keep(load.matches, filter)
            }
            DataSource::Json(path) => keep(dataset::load_json(path)?, filter),
            DataSource::Demo(seed) => keep(fake_dataset::generate(*seed), filter),
        };
        info!(source = %self, matches = matches.len(), "historical matches loaded");
        Ok(Dataset::new(matches))
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Sqlite(p) => write!(f, "sqlite:{}", p.display()),
            DataSource::Parquet(p) => write!(f, "parquet:{}", p.display()),
            DataSource::Json(p) => write!(f, "json:{}", p.display()),
            DataSource::Demo(seed) => write!(f, "demo:{seed}"),
        }
    }
}

pub const DEMO_SEED: u64 = 2024;

fn keep(
    matches: Vec<dataset::HistoricalMatch>,
    filter: &DatasetFilter,
) -> Vec<dataset::HistoricalMatch> {
    matches.into_iter().filter(|m| filter.accepts(m)).collect()
}
