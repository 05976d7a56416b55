use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::Share;
use crate::dataset::{Dataset, HistoricalMatch};
use crate::ev::back_ev;
use crate::label::Label;
use crate::label_stats::MIN_SETTLE_ODDS;

/// Goal line settled by the backtest.
pub const BACKTEST_LINE: f64 = 2.5;
pub const DEFAULT_MIN_PATTERN_MATCHES: usize = 5;

/// One fixture replayed against the history available before its kick-off day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRow {
    pub date: NaiveDate,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub label: Label,
    pub over_odds: f64,
    /// Earlier matches sharing the label.
    pub history: usize,
    pub probability: f64,
    pub ev: f64,
    pub scoreline: String,
    pub hit: bool,
    pub profit: f64,
}

/// Replays every fixture on `date` that has over/under 2.5 prices. The estimate for each
/// fixture only uses matches dated strictly earlier with the same label; fixtures without any
/// such history are left out.
pub fn backtest_day(dataset: &Dataset, date: NaiveDate, commission: f64) -> Vec<BacktestRow> {
    let fixtures: Vec<&HistoricalMatch> = dataset
        .matches()
        .iter()
        .filter(|m| m.date == Some(date))
        .collect();
    let mut rows: Vec<BacktestRow> = fixtures
        .par_iter()
        .filter_map(|fixture| replay_fixture(dataset.matches(), fixture, date, commission))
        .collect();
    rows.sort_by(|a, b| {
        a.league
            .cmp(&b.league)
            .then_with(|| a.home_team.cmp(&b.home_team))
    });
    debug!(%date, fixtures = fixtures.len(), rows = rows.len(), "backtest day");
    rows
}

/// Runs [`backtest_day`] for every dated day in `from..=to` that has fixtures.
pub fn backtest_range(
    dataset: &Dataset,
    from: NaiveDate,
    to: NaiveDate,
    commission: f64,
) -> Vec<BacktestRow> {
    let days: Vec<NaiveDate> = dataset
        .dates()
        .into_iter()
        .filter(|d| *d >= from && *d <= to)
        .collect();
    let rows: Vec<BacktestRow> = days
        .iter()
        .flat_map(|day| backtest_day(dataset, *day, commission))
        .collect();
    info!(%from, %to, days = days.len(), rows = rows.len(), "backtest range finished");
    rows
}

fn replay_fixture(
    all: &[HistoricalMatch],
    fixture: &HistoricalMatch,
    date: NaiveDate,
    commission: f64,
) -> Option<BacktestRow> {
    let over_odds = fixture
        .odds
        .over_line(BACKTEST_LINE)
        .filter(|o| o.is_finite() && *o > MIN_SETTLE_ODDS)?;
    fixture.odds.under_line(BACKTEST_LINE)?;

    let label = fixture.label();
    let (history, over_hits) = all
        .iter()
        .filter(|m| m.date.is_some_and(|d| d < date) && m.label() == label)
        .fold((0usize, 0usize), |(n, hits), m| {
            (n + 1, hits + usize::from(f64::from(m.total_goals()) > BACKTEST_LINE))
        });
    if history == 0 {
        return None;
    }

    let probability = Share::of(over_hits, history).probability();
    let hit = f64::from(fixture.total_goals()) > BACKTEST_LINE;
    let profit = if hit {
        (over_odds - 1.0) * (1.0 - commission)
    } else {
        -1.0
    };
    Some(BacktestRow {
        date,
        league: fixture.league.clone(),
        home_team: fixture.home_team.clone(),
        away_team: fixture.away_team.clone(),
        label,
        over_odds,
        history,
        probability,
        ev: back_ev(probability, over_odds, commission),
        scoreline: fixture.scoreline(),
        hit,
        profit,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSummary {
    pub label: Label,
    pub matches: usize,
    pub mean_ev: f64,
    pub total_profit: f64,
    pub mean_profit: f64,
    pub over_hit: Share,
}

impl PatternSummary {
    pub fn is_strong(&self, min_matches: usize) -> bool {
        self.matches >= min_matches && self.mean_profit > 0.0 && self.mean_ev > 0.0
    }
}

/// Groups backtest rows by label, highest mean EV first.
pub fn summarize_patterns(rows: &[BacktestRow]) -> Vec<PatternSummary> {
    let mut grouped: BTreeMap<Label, Vec<&BacktestRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.label).or_default().push(row);
    }
    let mut out: Vec<PatternSummary> = grouped
        .into_iter()
        .map(|(label, rows)| {
            let n = rows.len();
            let total_ev: f64 = rows.iter().map(|r| r.ev).sum();
            let total_profit: f64 = rows.iter().map(|r| r.profit).sum();
            let hits = rows.iter().filter(|r| r.hit).count();
            PatternSummary {
                label,
                matches: n,
                mean_ev: total_ev / n as f64,
                total_profit,
                mean_profit: total_profit / n as f64,
                over_hit: Share::of(hits, n),
            }
        })
        .collect();
    out.sort_by(|a, b| b.mean_ev.total_cmp(&a.mean_ev));
    out
}

pub fn strong_patterns(summary: &[PatternSummary], min_matches: usize) -> Vec<PatternSummary> {
    summary
        .iter()
        .filter(|p| p.is_strong(min_matches))
        .cloned()
        .collect()
}
