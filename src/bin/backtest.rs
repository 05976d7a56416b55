use std::path::PathBuf;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use clap::Parser;

use scenario_ev::backtest::{
    DEFAULT_MIN_PATTERN_MATCHES, backtest_range, strong_patterns, summarize_patterns,
};
use scenario_ev::config::{self, EngineConfig};
use scenario_ev::dataset::DatasetFilter;
use scenario_ev::report_export;
use scenario_ev::source::DataSource;

/// Replays over-2.5 pricing day by day using only earlier matches of the same label.
#[derive(Parser)]
#[command(name = "backtest")]
struct Args {
    /// First day, YYYY-MM-DD
    #[arg(long)]
    from: NaiveDate,
    /// Last day (inclusive); defaults to `from`
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    league: Option<String>,
    /// Commission on winnings, e.g. 0.045
    #[arg(long)]
    commission: Option<f64>,
    #[arg(long, default_value_t = DEFAULT_MIN_PATTERN_MATCHES)]
    min_matches: usize,
    /// Write rows and pattern summary to this xlsx file
    #[arg(long)]
    xlsx: Option<PathBuf>,
    #[arg(long)]
    db: Option<PathBuf>,
    #[arg(long)]
    parquet: Option<PathBuf>,
    #[arg(long = "json-data")]
    json: Option<PathBuf>,
    #[arg(long)]
    demo: bool,
}

fn main() -> Result<()> {
    config::load_dotenv();
    config::init_tracing();

    let args = Args::parse();
    let cfg = EngineConfig::from_env();
    let to = args.to.unwrap_or(args.from);
    if to < args.from {
        return Err(anyhow!("--to {to} is before --from {}", args.from));
    }
    let commission = args.commission.unwrap_or(cfg.commission);
    if !(0.0..1.0).contains(&commission) {
        return Err(anyhow!("commission {commission} outside 0..1"));
    }

    let source = DataSource::resolve(args.db, args.parquet, args.json, args.demo, cfg.db_path)?;
    let filter = DatasetFilter {
        league: args.league,
        ..DatasetFilter::default()
    };
    let dataset = source.load(&filter)?;

    let rows = backtest_range(&dataset, args.from, to, commission);
    if rows.is_empty() {
        println!("No priced fixtures with history between {} and {to}.", args.from);
        return Ok(());
    }
    let summary = summarize_patterns(&rows);
    let strong = strong_patterns(&summary, args.min_matches);

    let total_profit: f64 = rows.iter().map(|r| r.profit).sum();
    println!("Fixtures: {}", rows.len());
    println!(
        "Profit: {:+.2} units (ROI {:+.1}%)",
        total_profit,
        total_profit / rows.len() as f64 * 100.0
    );
    println!(
        "{:<20} {:>6} {:>9} {:>9} {:>9} {:>7}",
        "label", "n", "mean EV%", "profit", "mean", "over%"
    );
    for p in &summary {
        println!(
            "{:<20} {:>6} {:>9.2} {:>9.2} {:>9.3} {:>7.1}{}",
            p.label,
            p.matches,
            p.mean_ev * 100.0,
            p.total_profit,
            p.mean_profit,
            p.over_hit.pct,
            if p.is_strong(args.min_matches) { "  *" } else { "" }
        );
    }
    println!(
        "Strong patterns (n >= {}, mean profit > 0, mean EV > 0): {}",
        args.min_matches,
        strong.len()
    );

    if let Some(path) = args.xlsx {
        let report =
            report_export::export_backtest_xlsx(&path, &rows, &summary, args.min_matches)?;
        println!(
            "Workbook: {} ({} rows, {} patterns, {} strong)",
            path.display(),
            report.rows,
            report.patterns,
            report.strong_patterns
        );
    }
    Ok(())
}
