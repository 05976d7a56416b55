use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::warn;

use scenario_ev::aggregate::{AggregateOptions, AggregateStats, ScorelineTable, Share, aggregate};
use scenario_ev::config::{self, EngineConfig};
use scenario_ev::dataset::{Dataset, DatasetFilter};
use scenario_ev::ev::{
    BetMode, EvOptions, EvReport, Market, MarketOdds, compute_ev, correct_score_ev,
};
use scenario_ev::label::{self, Label};
use scenario_ev::label_stats::{
    self, BackLayRoi, Outcome, OutcomeRates, OverUnderRoi, back_lay_roi, outcome_rates_by_label,
    over_under_roi,
};
use scenario_ev::projection::Side;
use scenario_ev::scenario::{LiveScenario, match_scenario};
use scenario_ev::source::DataSource;
use scenario_ev::team_patterns::{self, GoalPatterns, Venue};

#[derive(Parser)]
#[command(name = "scenario_ev")]
#[command(about = "Historical scenario matching and expected value for in-play football")]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// SQLite store written by hist_ingest
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Provider parquet export
    #[arg(long, global = true)]
    parquet: Option<PathBuf>,
    /// JSON array of historical matches
    #[arg(long = "json-data", global = true)]
    json_data: Option<PathBuf>,
    /// Use the built-in synthetic dataset
    #[arg(long, global = true)]
    demo: bool,
}

#[derive(Args)]
struct ScopeArgs {
    /// League name, compared case-insensitively
    #[arg(long)]
    league: Option<String>,
    /// Restrict to these seasons (repeatable)
    #[arg(long = "season")]
    seasons: Vec<String>,
}

impl ScopeArgs {
    fn filter(&self) -> DatasetFilter {
        DatasetFilter {
            league: self.league.clone(),
            seasons: self.seasons.clone(),
            ..DatasetFilter::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Match a live scenario against history and price markets
    Live {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        home_odds: f64,
        #[arg(long)]
        away_odds: f64,
        /// Current match minute (1-120)
        #[arg(long)]
        minute: u16,
        /// Live score, e.g. 1-0
        #[arg(long)]
        score: String,
        /// Market price as market=odds, e.g. over2.5=1.95 (repeatable)
        #[arg(long = "market")]
        markets: Vec<MarketOdds>,
        /// Price the markets as lays instead of backs
        #[arg(long)]
        lay: bool,
        #[arg(long)]
        commission: Option<f64>,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        min_sample: Option<usize>,
        /// Side the for/against splits refer to
        #[arg(long, value_enum)]
        perspective: Option<SideArg>,
        #[arg(long)]
        json: bool,
    },
    /// Outcome rates and flat-stake back/lay ROI per label
    Labels {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        commission: Option<f64>,
        /// Goal line for the optional over/under settlement
        #[arg(long, default_value_t = 2.5)]
        line: f64,
        #[arg(long)]
        over_odds: Option<f64>,
        #[arg(long)]
        under_odds: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Full-time scoreline frequencies for a pre-match label
    CorrectScore {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        home_odds: f64,
        #[arg(long)]
        away_odds: f64,
        /// Correct-score price, e.g. cs1-0=7.5 (repeatable)
        #[arg(long = "market")]
        markets: Vec<MarketOdds>,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        commission: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Goal-flow patterns of one team at one venue
    Team {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        team: String,
        #[arg(long, value_enum, default_value_t = VenueArg::Home)]
        venue: VenueArg,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Home,
    Away,
}

impl From<SideArg> for Side {
    fn from(value: SideArg) -> Self {
        match value {
            SideArg::Home => Side::Home,
            SideArg::Away => Side::Away,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum VenueArg {
    Home,
    Away,
}

impl From<VenueArg> for Venue {
    fn from(value: VenueArg) -> Self {
        match value {
            VenueArg::Home => Venue::Home,
            VenueArg::Away => Venue::Away,
        }
    }
}

fn main() -> Result<()> {
    config::load_dotenv();
    config::init_tracing();

    let cli = Cli::parse();
    let cfg = EngineConfig::from_env();
    let source = DataSource::resolve(
        cli.source.db,
        cli.source.parquet,
        cli.source.json_data,
        cli.source.demo,
        cfg.db_path.clone(),
    )?;

    match cli.command {
        Commands::Live {
            scope,
            home_odds,
            away_odds,
            minute,
            score,
            markets,
            lay,
            commission,
            top_k,
            min_sample,
            perspective,
            json,
        } => {
            let scenario = LiveScenario::from_odds(home_odds, away_odds, minute, &score)?;
            let dataset = source.load(&scope.filter())?;
            let agg_opts = AggregateOptions {
                thresholds: cfg.thresholds.clone(),
                top_k: top_k.unwrap_or(cfg.top_k),
                perspective: perspective.map(Side::from),
            };
            let ev_opts = EvOptions {
                mode: if lay { BetMode::Lay } else { BetMode::Back },
                commission: commission_or(commission, &cfg)?,
                min_sample: min_sample.unwrap_or(cfg.min_sample),
            };
            run_live(&dataset, &scenario, &markets, &agg_opts, &ev_opts, json)
        }
        Commands::Labels {
            scope,
            commission,
            line,
            over_odds,
            under_odds,
            json,
        } => {
            let dataset = source.load(&scope.filter())?;
            let commission = commission_or(commission, &cfg)?;
            let ou_prices = over_odds.zip(under_odds);
            run_labels(&dataset, commission, line, ou_prices, json)
        }
        Commands::CorrectScore {
            scope,
            home_odds,
            away_odds,
            markets,
            top_k,
            commission,
            json,
        } => {
            let dataset = source.load(&scope.filter())?;
            let label = label::classify(Some(home_odds), Some(away_odds));
            let ev_opts = EvOptions {
                mode: BetMode::Back,
                commission: commission_or(commission, &cfg)?,
                min_sample: cfg.min_sample,
            };
            run_correct_score(
                &dataset,
                label,
                &markets,
                top_k.unwrap_or(cfg.top_k),
                &ev_opts,
                json,
            )
        }
        Commands::Team {
            scope,
            team,
            venue,
            json,
        } => {
            let dataset = source.load(&scope.filter())?;
            let patterns = team_patterns::goal_patterns(dataset.matches(), &team, venue.into());
            if patterns.played == 0 {
                warn!(team = %team, "no matches found for team at venue");
            }
            if json {
                print_json(&patterns)
            } else {
                print_team(&patterns);
                Ok(())
            }
        }
    }
}

fn commission_or(flag: Option<f64>, cfg: &EngineConfig) -> Result<f64> {
    let commission = flag.unwrap_or(cfg.commission);
    if !(0.0..1.0).contains(&commission) {
        return Err(anyhow!("commission {commission} outside 0..1"));
    }
    Ok(commission)
}

#[derive(Serialize)]
struct LiveReport<'a> {
    stats: &'a AggregateStats,
    ev: &'a EvReport,
}

fn run_live(
    dataset: &Dataset,
    scenario: &LiveScenario,
    markets: &[MarketOdds],
    agg_opts: &AggregateOptions,
    ev_opts: &EvOptions,
    json: bool,
) -> Result<()> {
    let set = match_scenario(dataset.matches(), scenario);
    let stats = aggregate(&set, agg_opts);
    let ev = compute_ev(&stats, markets, ev_opts);
    if !ev.sufficient_sample {
        warn!(
            sample = stats.sample_size,
            min_sample = ev_opts.min_sample,
            "sample below minimum, no recommendation"
        );
    }
    if json {
        return print_json(&LiveReport {
            stats: &stats,
            ev: &ev,
        });
    }

    println!(
        "Scenario: {} at {}' score {}-{} (perspective {:?})",
        scenario.label, scenario.minute, scenario.home_goals, scenario.away_goals, stats.perspective
    );
    println!(
        "Matched: {} of {} examined",
        stats.sample_size, set.examined
    );
    if stats.sample_size == 0 {
        println!("No comparable historical matches.");
        return Ok(());
    }
    println!(
        "Goal after {}': {}",
        scenario.minute,
        share(&stats.goal_after_cut)
    );
    println!("Over/under on goals still to come:");
    for line in &stats.over_under {
        println!(
            "  {:>4}  over {}  under {}",
            line.threshold,
            share(&line.over),
            share(&line.under)
        );
    }
    print_scorelines(&stats.scorelines);
    println!(
        "Post-cut goals by band ({} total, for/against {:?}):",
        stats.time_bands.total_goals, stats.perspective
    );
    for band in &stats.time_bands.bands {
        println!(
            "  {:>6}  {:>3}/{:<3}  {}",
            band.label(),
            band.goals_for,
            band.goals_against,
            share(&band.share_of_goals)
        );
    }
    println!(
        "First goal after cut: {:?} {}  other {}",
        stats.perspective,
        share(&stats.first_goal_after_cut.perspective_first),
        share(&stats.first_goal_after_cut.other_first)
    );
    if stats.first_goal_after_cut.same_minute > 0 {
        println!(
            "  ({} with both sides scoring in the same minute, not split)",
            stats.first_goal_after_cut.same_minute
        );
    }
    println!(
        "1X2: home {}  draw {}  away {}",
        share(&stats.outcomes.home_win),
        share(&stats.outcomes.draw),
        share(&stats.outcomes.away_win)
    );
    println!("Both teams score: {}", share(&stats.both_teams_score));
    print_ev(&ev);
    Ok(())
}

#[derive(Serialize)]
struct LabelReport {
    label: Label,
    rates: OutcomeRates,
    roi: BackLayRoi,
    over_under: Option<OverUnderRoi>,
}

fn run_labels(
    dataset: &Dataset,
    commission: f64,
    line: f64,
    ou_prices: Option<(f64, f64)>,
    json: bool,
) -> Result<()> {
    let rates = outcome_rates_by_label(dataset.matches());
    let reports: Vec<LabelReport> = rates
        .into_iter()
        .map(|(label, rates)| {
            let of_label = || dataset.matches().iter().filter(move |m| m.label() == label);
            LabelReport {
                label,
                rates,
                roi: back_lay_roi(of_label(), commission),
                over_under: ou_prices.and_then(|(over, under)| {
                    over_under_roi(of_label(), line, over, under, commission)
                }),
            }
        })
        .collect();
    if json {
        return print_json(&reports);
    }

    println!("Matches: {}  commission {:.3}", dataset.len(), commission);
    for report in &reports {
        println!(
            "{:<20} n={:<6} 1 {}  X {}  2 {}",
            report.label,
            report.rates.matches,
            share(&report.rates.shares.home_win),
            share(&report.rates.shares.draw),
            share(&report.rates.shares.away_win)
        );
        if report.roi.matches == 0 {
            println!("  no settleable prices ({} excluded)", report.roi.excluded);
        } else {
            let mut parts = Vec::new();
            for outcome in Outcome::ALL {
                parts.push(format!(
                    "{} back {:+.1}% lay {:+.1}%",
                    outcome.as_str(),
                    report.roi.back(outcome).roi_pct,
                    report.roi.lay(outcome).roi_pct
                ));
            }
            println!(
                "  ROI over {} ({} excluded): {}",
                report.roi.matches,
                report.roi.excluded,
                parts.join(" | ")
            );
        }
        if let Some(ou) = &report.over_under {
            println!(
                "  O/U {}: over {} ROI {:+.1}%  under {} ROI {:+.1}%",
                ou.line,
                share(&ou.over),
                ou.over_roi.roi_pct,
                share(&ou.under),
                ou.under_roi.roi_pct
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct CorrectScoreReport<'a> {
    label: Label,
    table: &'a ScorelineTable,
    ev: &'a EvReport,
}

fn run_correct_score(
    dataset: &Dataset,
    label: Label,
    markets: &[MarketOdds],
    top_k: usize,
    opts: &EvOptions,
    json: bool,
) -> Result<()> {
    let table = label_stats::correct_score_table(dataset.matches(), label, top_k);
    let mut prices = Vec::new();
    for price in markets {
        match price.market {
            Market::CorrectScore(h, a) => prices.push(((h, a), price.odds)),
            other => warn!(market = %other, "ignoring non correct-score market"),
        }
    }
    let ev = correct_score_ev(&table, &prices, opts);
    if json {
        return print_json(&CorrectScoreReport {
            label,
            table: &table,
            ev: &ev,
        });
    }
    println!("Label: {label}  matches: {}", table.total);
    print_scorelines(&table);
    if !prices.is_empty() {
        print_ev(&ev);
    }
    Ok(())
}

fn print_scorelines(table: &ScorelineTable) {
    println!("Final scores:");
    for row in &table.top {
        println!("  {:>5}  {}", row.scoreline, share(&row.share));
    }
    println!("  {:>5}  {}", "other", share(&table.other));
}

fn print_ev(ev: &EvReport) {
    if ev.rows.is_empty() && ev.skipped.is_empty() {
        return;
    }
    println!("Expected value (sample {}):", ev.sample_size);
    for row in &ev.rows {
        println!(
            "  {:<9} {:?} p={:.3} odds={:.2} ev={:+.3}{}",
            row.market.to_string(),
            row.mode,
            row.probability,
            row.odds,
            row.ev,
            if row.value { "  value" } else { "" }
        );
    }
    for market in &ev.skipped {
        println!("  {:<9} skipped", market.to_string());
    }
    match (&ev.recommendation, &ev.best) {
        (Some(rec), _) => println!(
            "Recommendation: {:?} {} at {:.2} (ev {:+.3})",
            rec.mode, rec.market, rec.odds, rec.ev
        ),
        (None, Some(best)) if best.value => println!(
            "No recommendation: sample {} too small for {} (ev {:+.3})",
            ev.sample_size, best.market, best.ev
        ),
        _ => println!("No recommendation: no market with positive EV"),
    }
}

fn print_team(p: &GoalPatterns) {
    println!("{} ({:?}) played {}", p.team, p.venue, p.played);
    println!(
        "  W {}  D {}  L {}",
        share(&p.win),
        share(&p.draw),
        share(&p.loss)
    );
    println!(
        "  first goal {}  last goal {}",
        share(&p.first_goal),
        share(&p.last_goal)
    );
    println!(
        "  scored first {}  then 2-0 {}  then 1-1 {}",
        share(&p.scored_first),
        share(&p.two_zero_after_scoring_first),
        share(&p.level_after_scoring_first)
    );
    println!(
        "  conceded first {}  then 1-1 {}  then 0-2 {}",
        share(&p.conceded_first),
        share(&p.level_after_conceding_first),
        share(&p.zero_two_after_conceding_first)
    );
    println!(
        "  margin 2+ {}  0-0 {}",
        share(&p.margin_two_plus),
        share(&p.nil_nil)
    );
    println!(
        "  1st half W/D/L {} / {} / {}",
        share(&p.first_half[0]),
        share(&p.first_half[1]),
        share(&p.first_half[2])
    );
    println!(
        "  2nd half W/D/L {} / {} / {}",
        share(&p.second_half[0]),
        share(&p.second_half[1]),
        share(&p.second_half[2])
    );
    println!("  goals by band (scored | conceded):");
    for (scored, conceded) in p.scored_by_band.iter().zip(&p.conceded_by_band) {
        println!(
            "    {:>2}-{:<2}  {:>3} {:>6.1}% | {:>3} {:>6.1}%",
            scored.start,
            scored.end,
            scored.count,
            scored.share.pct,
            conceded.count,
            conceded.share.pct
        );
    }
}

fn share(s: &Share) -> String {
    format!("{:.1}% ({}/{})", s.pct, s.count, s.denominator)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
