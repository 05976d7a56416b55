use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateStats, ScorelineTable};
use crate::scenario::parse_score;

pub const DEFAULT_MIN_SAMPLE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BetMode {
    #[default]
    Back,
    Lay,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Market {
    /// More goals than the threshold after the live score.
    Over(f64),
    Under(f64),
    GoalAfterCut,
    HomeWin,
    Draw,
    AwayWin,
    BothTeamsScore,
    CorrectScore(u8, u8),
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Over(t) => write!(f, "over{t}"),
            Market::Under(t) => write!(f, "under{t}"),
            Market::GoalAfterCut => f.write_str("goal"),
            Market::HomeWin => f.write_str("home"),
            Market::Draw => f.write_str("draw"),
            Market::AwayWin => f.write_str("away"),
            Market::BothTeamsScore => f.write_str("btts"),
            Market::CorrectScore(h, a) => write!(f, "cs{h}-{a}"),
        }
    }
}

impl FromStr for Market {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let market = match key.as_str() {
            "goal" => Market::GoalAfterCut,
            "home" | "1" => Market::HomeWin,
            "draw" | "x" => Market::Draw,
            "away" | "2" => Market::AwayWin,
            "btts" | "gg" => Market::BothTeamsScore,
            _ => {
                if let Some(rest) = key.strip_prefix("over") {
                    Market::Over(parse_line(rest)?)
                } else if let Some(rest) = key.strip_prefix("under") {
                    Market::Under(parse_line(rest)?)
                } else if let Some(rest) = key.strip_prefix("cs") {
                    let (h, a) =
                        parse_score(rest).ok_or_else(|| anyhow!("invalid correct score {rest:?}"))?;
                    Market::CorrectScore(h, a)
                } else {
                    return Err(anyhow!("unknown market {s:?}"));
                }
            }
        };
        Ok(market)
    }
}

fn parse_line(raw: &str) -> anyhow::Result<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .with_context(|| format!("invalid goal line {raw:?}"))
}

/// A user-supplied decimal price for a market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketOdds {
    pub market: Market,
    pub odds: f64,
}

impl FromStr for MarketOdds {
    type Err = anyhow::Error;

    /// Parses `market=odds`, e.g. `over2.5=1.95` or `cs1-0=7,5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (market, odds) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected market=odds, got {s:?}"))?;
        let odds = crate::label::parse_decimal_odds(odds)
            .ok_or_else(|| anyhow!("invalid odds in {s:?}"))?;
        Ok(Self {
            market: market.parse()?,
            odds,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EvOptions {
    pub mode: BetMode,
    /// Exchange commission on net winnings, `0.0..1.0`.
    pub commission: f64,
    pub min_sample: usize,
}

impl Default for EvOptions {
    fn default() -> Self {
        Self {
            mode: BetMode::Back,
            commission: 0.0,
            min_sample: DEFAULT_MIN_SAMPLE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvRow {
    pub market: Market,
    pub mode: BetMode,
    pub probability: f64,
    pub odds: f64,
    pub ev: f64,
    pub value: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvReport {
    pub sample_size: usize,
    pub sufficient_sample: bool,
    pub rows: Vec<EvRow>,
    /// Highest-EV row regardless of sign.
    pub best: Option<EvRow>,
    /// Best row, only when it has value and the sample is large enough.
    pub recommendation: Option<EvRow>,
    /// Markets that had no probability or an unusable price.
    pub skipped: Vec<Market>,
}

/// Net expected profit per unit staked when backing at decimal `odds`.
pub fn back_ev(probability: f64, odds: f64, commission: f64) -> f64 {
    probability * (odds - 1.0) * (1.0 - commission) - (1.0 - probability)
}

/// Net expected profit per unit of liability when laying at decimal `odds`.
///
/// The backer's stake is `1 / (odds - 1)`, so a losing lay costs exactly one unit.
pub fn lay_ev(probability: f64, odds: f64, commission: f64) -> f64 {
    let stake = 1.0 / (odds - 1.0);
    (1.0 - probability) * stake * (1.0 - commission) - probability
}

pub fn market_probability(stats: &AggregateStats, market: Market) -> Option<f64> {
    let share = match market {
        Market::Over(t) => stats.over_under_line(t)?.over,
        Market::Under(t) => stats.over_under_line(t)?.under,
        Market::GoalAfterCut => stats.goal_after_cut,
        Market::HomeWin => stats.outcomes.home_win,
        Market::Draw => stats.outcomes.draw,
        Market::AwayWin => stats.outcomes.away_win,
        Market::BothTeamsScore => stats.both_teams_score,
        Market::CorrectScore(h, a) => {
            return Some(correct_score_probability(&stats.scorelines, h, a));
        }
    };
    Some(share.probability())
}

/// Priced from the full scoreline counts; the top rows only limit what is displayed.
fn correct_score_probability(table: &ScorelineTable, h: u8, a: u8) -> f64 {
    table.share_of(h, a).probability()
}

pub fn compute_ev(stats: &AggregateStats, prices: &[MarketOdds], opts: &EvOptions) -> EvReport {
    let sufficient_sample = stats.meets_sample(opts.min_sample);
    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    for price in prices {
        let Some(probability) = market_probability(stats, price.market) else {
            skipped.push(price.market);
            continue;
        };
        match ev_row(price.market, probability, price.odds, opts) {
            Some(row) => rows.push(row),
            None => skipped.push(price.market),
        }
    }
    finish_report(stats.sample_size, sufficient_sample, rows, skipped)
}

/// EV rows for correct-score prices against a whole-label scoreline table.
pub fn correct_score_ev(
    table: &ScorelineTable,
    prices: &[((u8, u8), f64)],
    opts: &EvOptions,
) -> EvReport {
    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    for ((h, a), odds) in prices {
        let market = Market::CorrectScore(*h, *a);
        let probability = correct_score_probability(table, *h, *a);
        match ev_row(market, probability, *odds, opts) {
            Some(row) => rows.push(row),
            None => skipped.push(market),
        }
    }
    finish_report(table.total, table.total >= opts.min_sample, rows, skipped)
}

fn ev_row(market: Market, probability: f64, odds: f64, opts: &EvOptions) -> Option<EvRow> {
    if !odds.is_finite() || odds <= 1.0 || !probability.is_finite() {
        return None;
    }
    let commission = opts.commission.clamp(0.0, 1.0);
    let ev = match opts.mode {
        BetMode::Back => back_ev(probability, odds, commission),
        BetMode::Lay => lay_ev(probability, odds, commission),
    };
    Some(EvRow {
        market,
        mode: opts.mode,
        probability,
        odds,
        ev,
        value: ev > 0.0,
    })
}

fn finish_report(
    sample_size: usize,
    sufficient_sample: bool,
    rows: Vec<EvRow>,
    skipped: Vec<Market>,
) -> EvReport {
    let best = rows
        .iter()
        .max_by(|a, b| a.ev.total_cmp(&b.ev))
        .cloned();
    let recommendation = best
        .as_ref()
        .filter(|row| row.value && sufficient_sample)
        .cloned();
    EvReport {
        sample_size,
        sufficient_sample,
        rows,
        best,
        recommendation,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::scoreline_table;
    use crate::dataset::{HistoricalMatch, MatchRecord};

    fn finals(scores: &[((u8, u8), usize)]) -> Vec<HistoricalMatch> {
        let mut out = Vec::new();
        for &((h, a), times) in scores {
            for _ in 0..times {
                out.push(HistoricalMatch::new(MatchRecord {
                    home_goals: h,
                    away_goals: a,
                    ..MatchRecord::default()
                }));
            }
        }
        out
    }

    #[test]
    fn back_ev_matches_reference_values() {
        assert!((back_ev(0.55, 2.0, 0.0) - 0.10).abs() < 1e-12);
        assert!((back_ev(0.40, 2.0, 0.0) + 0.20).abs() < 1e-12);
    }

    #[test]
    fn commission_only_reduces_winnings() {
        let ev = back_ev(0.5, 3.0, 0.05);
        assert!((ev - (0.5 * 2.0 * 0.95 - 0.5)).abs() < 1e-12);
        assert!(ev < back_ev(0.5, 3.0, 0.0));
    }

    #[test]
    fn lay_is_mirror_of_back_without_commission() {
        // Laying at fair odds is break-even.
        assert!(lay_ev(0.5, 2.0, 0.0).abs() < 1e-12);
        // Outcome at 25% laid at 3.0: stake 0.5 won 75% of the time, liability lost 25%.
        assert!((lay_ev(0.25, 3.0, 0.0) - (0.75 * 0.5 - 0.25)).abs() < 1e-12);
    }

    #[test]
    fn market_strings_parse() {
        assert_eq!("over2.5".parse::<Market>().unwrap(), Market::Over(2.5));
        assert_eq!("UNDER1,5".parse::<Market>().unwrap(), Market::Under(1.5));
        assert_eq!("cs2-1".parse::<Market>().unwrap(), Market::CorrectScore(2, 1));
        assert_eq!("x".parse::<Market>().unwrap(), Market::Draw);
        assert!("corners".parse::<Market>().is_err());
        let price: MarketOdds = "over0.5=1,40".parse().unwrap();
        assert_eq!(price.market, Market::Over(0.5));
        assert!((price.odds - 1.4).abs() < 1e-12);
        assert!("over0.5".parse::<MarketOdds>().is_err());
    }

    #[test]
    fn unusable_odds_are_skipped() {
        let opts = EvOptions::default();
        assert!(ev_row(Market::Draw, 0.3, 1.0, &opts).is_none());
        assert!(ev_row(Market::Draw, 0.3, f64::NAN, &opts).is_none());
        assert!(ev_row(Market::Draw, 0.3, 4.0, &opts).is_some());
    }

    #[test]
    fn market_display_parses_back() {
        for market in [
            Market::Over(2.5),
            Market::Under(0.5),
            Market::GoalAfterCut,
            Market::HomeWin,
            Market::Draw,
            Market::AwayWin,
            Market::BothTeamsScore,
            Market::CorrectScore(3, 1),
        ] {
            assert_eq!(market.to_string().parse::<Market>().unwrap(), market);
        }
    }

    #[test]
    fn correct_score_below_top_rows_keeps_its_frequency() {
        let data = finals(&[
            ((0, 0), 4),
            ((1, 0), 4),
            ((0, 1), 4),
            ((1, 1), 4),
            ((2, 0), 4),
            ((0, 2), 4),
            ((2, 1), 3),
            ((3, 3), 3),
        ]);
        let table = scoreline_table(&data, 6);
        assert!(table.top.iter().all(|r| r.scoreline != "2-1"));
        assert_eq!(table.share_of(2, 1).count, 3);
        assert_eq!(table.share_of(4, 4).count, 0);

        let lay = EvOptions {
            mode: BetMode::Lay,
            min_sample: 1,
            ..EvOptions::default()
        };
        let report = correct_score_ev(&table, &[((2, 1), 5.0)], &lay);
        let row = &report.rows[0];
        assert!((row.probability - 0.1).abs() < 1e-12);
        assert!((row.ev - (0.9 * 0.25 - 0.1)).abs() < 1e-12);

        let back = EvOptions {
            min_sample: 1,
            ..EvOptions::default()
        };
        let report = correct_score_ev(&table, &[((2, 1), 12.0)], &back);
        assert!((report.rows[0].ev - 0.2).abs() < 1e-12);
        assert!(report.recommendation.is_some());
    }
}
