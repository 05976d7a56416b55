use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{OutcomeShares, ScorelineTable, Share, scoreline_table};
use crate::dataset::HistoricalMatch;
use crate::label::Label;

/// Prices at or below this are treated as missing when settling historical bets.
pub const MIN_SETTLE_ODDS: f64 = 1.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    pub fn of(m: &HistoricalMatch) -> Outcome {
        match m.home_goals.cmp(&m.away_goals) {
            std::cmp::Ordering::Greater => Outcome::Home,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::Away,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Home => "HOME",
            Outcome::Draw => "DRAW",
            Outcome::Away => "AWAY",
        }
    }

    fn index(self) -> usize {
        match self {
            Outcome::Home => 0,
            Outcome::Draw => 1,
            Outcome::Away => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OutcomeRates {
    pub matches: usize,
    pub shares: OutcomeShares,
}

pub fn outcome_rates<'a, I>(matches: I) -> OutcomeRates
where
    I: IntoIterator<Item = &'a HistoricalMatch>,
{
    let mut counts = [0usize; 3];
    for m in matches {
        counts[Outcome::of(m).index()] += 1;
    }
    let n: usize = counts.iter().sum();
    OutcomeRates {
        matches: n,
        shares: OutcomeShares {
            home_win: Share::of(counts[0], n),
            draw: Share::of(counts[1], n),
            away_win: Share::of(counts[2], n),
        },
    }
}

pub fn outcome_rates_by_label<'a, I>(matches: I) -> BTreeMap<Label, OutcomeRates>
where
    I: IntoIterator<Item = &'a HistoricalMatch>,
{
    let mut grouped: BTreeMap<Label, Vec<&HistoricalMatch>> = BTreeMap::new();
    for m in matches {
        grouped.entry(m.label()).or_default().push(m);
    }
    grouped
        .into_iter()
        .map(|(label, rows)| (label, outcome_rates(rows)))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RoiLine {
    pub profit: f64,
    /// Profit per match, as a percentage of one unit.
    pub roi_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackLayRoi {
    pub matches: usize,
    pub excluded: usize,
    pub commission: f64,
    /// Indexed Home, Draw, Away.
    pub back: [RoiLine; 3],
    pub lay: [RoiLine; 3],
}

impl BackLayRoi {
    pub fn back(&self, outcome: Outcome) -> RoiLine {
        self.back[outcome.index()]
    }

    pub fn lay(&self, outcome: Outcome) -> RoiLine {
        self.lay[outcome.index()]
    }
}

/// Settles a flat one-unit bet on every 1X2 outcome of every match at the closing prices.
///
/// Backs pay `odds - 1` net of commission. Lays risk one unit of liability, so the lay stake
/// is `1 / (odds - 1)`. Matches with any price missing or at/below [`MIN_SETTLE_ODDS`] are
/// excluded.
pub fn back_lay_roi<'a, I>(matches: I, commission: f64) -> BackLayRoi
where
    I: IntoIterator<Item = &'a HistoricalMatch>,
{
    let mut out = BackLayRoi {
        commission,
        ..BackLayRoi::default()
    };
    let mut back = [0.0_f64; 3];
    let mut lay = [0.0_f64; 3];

    for m in matches {
        let prices = [m.odds.home, m.odds.draw, m.odds.away];
        let usable = prices
            .iter()
            .all(|p| p.is_some_and(|v| v.is_finite() && v > MIN_SETTLE_ODDS));
        if !usable {
            out.excluded += 1;
            continue;
        }
        out.matches += 1;
        let result = Outcome::of(m);
        for outcome in Outcome::ALL {
            let idx = outcome.index();
            let price = prices[idx].unwrap_or_default();
            if result == outcome {
                back[idx] += (price - 1.0) * (1.0 - commission);
                lay[idx] -= 1.0;
            } else {
                back[idx] -= 1.0;
                lay[idx] += 1.0 / (price - 1.0);
            }
        }
    }

    for idx in 0..3 {
        out.back[idx] = roi_line(back[idx], out.matches);
        out.lay[idx] = roi_line(lay[idx], out.matches);
    }
    out
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OverUnderRoi {
    pub line: f64,
    pub matches: usize,
    pub over: Share,
    pub under: Share,
    pub over_roi: RoiLine,
    pub under_roi: RoiLine,
}

/// Settles backing over and under `line` at fixed prices across the given matches.
pub fn over_under_roi<'a, I>(
    matches: I,
    line: f64,
    over_odds: f64,
    under_odds: f64,
    commission: f64,
) -> Option<OverUnderRoi>
where
    I: IntoIterator<Item = &'a HistoricalMatch>,
{
    if !(over_odds > MIN_SETTLE_ODDS && under_odds > MIN_SETTLE_ODDS) {
        return None;
    }
    let mut total = 0usize;
    let mut over_hits = 0usize;
    let mut profit_over = 0.0_f64;
    let mut profit_under = 0.0_f64;
    for m in matches {
        total += 1;
        if f64::from(m.total_goals()) > line {
            over_hits += 1;
            profit_over += (over_odds - 1.0) * (1.0 - commission);
            profit_under -= 1.0;
        } else {
            profit_under += (under_odds - 1.0) * (1.0 - commission);
            profit_over -= 1.0;
        }
    }
    if total == 0 {
        return None;
    }
    Some(OverUnderRoi {
        line,
        matches: total,
        over: Share::of(over_hits, total),
        under: Share::of(total - over_hits, total),
        over_roi: roi_line(profit_over, total),
        under_roi: roi_line(profit_under, total),
    })
}

/// Full-time scoreline frequency over every match of a label.
pub fn correct_score_table<'a, I>(matches: I, label: Label, top_k: usize) -> ScorelineTable
where
    I: IntoIterator<Item = &'a HistoricalMatch>,
{
    scoreline_table(matches.into_iter().filter(|m| m.label() == label), top_k)
}

fn roi_line(profit: f64, matches: usize) -> RoiLine {
    let roi_pct = if matches == 0 {
        0.0
    } else {
        profit / matches as f64 * 100.0
    };
    RoiLine { profit, roi_pct }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MatchOdds, MatchRecord};

    fn priced(h: u8, a: u8, odds: (f64, f64, f64)) -> HistoricalMatch {
        HistoricalMatch::new(MatchRecord {
            home_goals: h,
            away_goals: a,
            odds: MatchOdds {
                home: Some(odds.0),
                draw: Some(odds.1),
                away: Some(odds.2),
                ..MatchOdds::default()
            },
            ..MatchRecord::default()
        })
    }

    #[test]
    fn back_and_lay_settle_per_outcome() {
        let data = vec![priced(2, 0, (2.0, 3.0, 5.0)), priced(1, 1, (2.0, 3.0, 5.0))];
        let roi = back_lay_roi(&data, 0.0);
        assert_eq!(roi.matches, 2);
        // Home back: +1, -1.
        assert!(roi.back(Outcome::Home).profit.abs() < 1e-12);
        // Draw back: -1, +2.
        assert!((roi.back(Outcome::Draw).profit - 1.0).abs() < 1e-12);
        assert!((roi.back(Outcome::Draw).roi_pct - 50.0).abs() < 1e-9);
        // Away lay: stake 0.25 won twice.
        assert!((roi.lay(Outcome::Away).profit - 0.5).abs() < 1e-12);
        // Home lay: -1 then +1.
        assert!(roi.lay(Outcome::Home).profit.abs() < 1e-12);
    }

    #[test]
    fn bad_prices_are_excluded() {
        let mut missing = priced(1, 0, (2.0, 3.0, 4.0));
        missing.odds.draw = None;
        let data = vec![missing, priced(1, 0, (1.01, 3.0, 4.0))];
        let roi = back_lay_roi(&data, 0.045);
        assert_eq!(roi.matches, 0);
        assert_eq!(roi.excluded, 2);
        assert_eq!(roi.back(Outcome::Home).roi_pct, 0.0);
    }

    #[test]
    fn over_under_roi_requires_prices_and_matches() {
        let data = vec![priced(2, 1, (2.0, 3.0, 4.0)), priced(0, 0, (2.0, 3.0, 4.0))];
        assert!(over_under_roi(&data, 2.5, 1.0, 1.9, 0.0).is_none());
        assert!(over_under_roi(std::iter::empty::<&HistoricalMatch>(), 2.5, 1.9, 1.9, 0.0).is_none());
        let roi = over_under_roi(&data, 2.5, 2.0, 1.8, 0.0).unwrap();
        assert_eq!(roi.over.count, 1);
        assert!(roi.over_roi.profit.abs() < 1e-12);
        assert!((roi.under_roi.profit + 0.2).abs() < 1e-12);
    }

    #[test]
    fn rates_group_by_label() {
        let data = vec![
            priced(1, 0, (1.3, 5.0, 9.0)),
            priced(0, 0, (1.3, 5.0, 9.0)),
            priced(0, 2, (2.5, 3.1, 2.8)),
        ];
        let by_label = outcome_rates_by_label(&data);
        let strong = by_label[&Label::HomeStrongFavorite];
        assert_eq!(strong.matches, 2);
        assert!((strong.shares.home_win.pct - 50.0).abs() < 1e-9);
        assert_eq!(by_label[&Label::SuperCompetitive].shares.away_win.count, 1);
    }
}
