use std::env;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::aggregate::DEFAULT_TOP_K;
use crate::dataset::GOAL_LINES;
use crate::ev::DEFAULT_MIN_SAMPLE;

const CACHE_DIR: &str = "scenario_ev";
const DB_FILE: &str = "historical_matches.sqlite";

/// Engine defaults read from the environment. CLI flags override these.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub top_k: usize,
    pub min_sample: usize,
    pub commission: f64,
    pub thresholds: Vec<f64>,
    pub db_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_sample: DEFAULT_MIN_SAMPLE,
            commission: 0.0,
            thresholds: GOAL_LINES.to_vec(),
            db_path: default_db_path(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let top_k = env::var("SCENARIO_TOP_K")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_K)
            .clamp(1, 50);
        let min_sample = env::var("SCENARIO_MIN_SAMPLE")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_MIN_SAMPLE);
        let commission = env::var("SCENARIO_COMMISSION")
            .ok()
            .and_then(|val| val.trim().replace(',', ".").parse::<f64>().ok())
            .filter(|c| c.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 0.5);
        let thresholds = env::var("SCENARIO_THRESHOLDS")
            .ok()
            .map(|raw| parse_thresholds(&raw))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| GOAL_LINES.to_vec());
        let db_path = env::var("SCENARIO_DB")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .or_else(default_db_path);
        Self {
            top_k,
            min_sample,
            commission,
            thresholds,
            db_path,
        }
    }
}

/// Parses `"0.5,1.5;2.5"` into thresholds; unparseable and negative entries are dropped.
pub fn parse_thresholds(raw: &str) -> Vec<f64> {
    let mut out: Vec<f64> = raw
        .split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<f64>().ok())
        .filter(|t| t.is_finite() && *t >= 0.0)
        .collect();
    out.sort_by(f64::total_cmp);
    out.dedup();
    out
}

/// Installs the stderr log subscriber for the binaries; `RUST_LOG` overrides the `warn` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Loads `.env.local` then `.env` from the working directory; missing files are ignored.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_parse_sorted_and_deduped() {
        assert_eq!(parse_thresholds("2.5, 0.5;2.5 x -1"), vec![0.5, 2.5]);
        assert!(parse_thresholds("").is_empty());
    }

    #[test]
    fn defaults_use_goal_lines() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.top_k, 6);
        assert_eq!(cfg.min_sample, 20);
        assert_eq!(cfg.thresholds, GOAL_LINES.to_vec());
    }
}
