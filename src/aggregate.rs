use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dataset::{GOAL_LINES, HistoricalMatch};
use crate::projection::Side;
use crate::scenario::{LiveScenario, ScenarioMatchSet};

pub const DEFAULT_TOP_K: usize = 6;

/// Half-open `(start, end]` minute bands; later minutes clamp into the last band.
pub const TIME_BANDS: [(u16, u16); 6] = [(0, 15), (15, 30), (30, 45), (45, 60), (60, 75), (75, 90)];

/// A count over an explicit denominator. `pct` is 0 when the denominator is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub count: usize,
    pub denominator: usize,
    pub pct: f64,
}

impl Share {
    pub fn of(count: usize, denominator: usize) -> Self {
        let pct = if denominator == 0 {
            0.0
        } else {
            count as f64 * 100.0 / denominator as f64
        };
        Self {
            count,
            denominator,
            pct,
        }
    }

    /// Probability in `[0, 1]`, 0 for an empty base.
    pub fn probability(&self) -> f64 {
        self.pct / 100.0
    }
}

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub thresholds: Vec<f64>,
    pub top_k: usize,
    /// Side the "for"/"against" splits are relative to. Defaults to the label's favourite,
    /// or the home side when the label has none.
    pub perspective: Option<Side>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            thresholds: GOAL_LINES.to_vec(),
            top_k: DEFAULT_TOP_K,
            perspective: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverUnderLine {
    pub threshold: f64,
    pub over: Share,
    pub under: Share,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorelineRow {
    pub scoreline: String,
    pub home_goals: u8,
    pub away_goals: u8,
    pub share: Share,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScorelineTable {
    pub total: usize,
    pub top: Vec<ScorelineRow>,
    /// Everything outside the top rows, so that top + other covers the whole set.
    pub other: Share,
    #[serde(skip)]
    counts: HashMap<(u8, u8), usize>,
}

impl ScorelineTable {
    /// Observed frequency of a scoreline over the whole set, listed in `top` or not.
    pub fn share_of(&self, home_goals: u8, away_goals: u8) -> Share {
        let count = self
            .counts
            .get(&(home_goals, away_goals))
            .copied()
            .unwrap_or(0);
        Share::of(count, self.total)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandRow {
    pub start: u16,
    pub end: u16,
    pub goals_for: usize,
    pub goals_against: usize,
    pub total: usize,
    /// Band total over all post-cut goals in the set.
    pub share_of_goals: Share,
}

impl BandRow {
    pub fn label(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBandTable {
    pub total_goals: usize,
    pub bands: Vec<BandRow>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FirstGoalSplit {
    /// Matches where one side clearly scored first after the cut.
    pub base: usize,
    pub perspective_first: Share,
    pub other_first: Share,
    /// Matches whose first post-cut goals came from both sides in the same minute; left out
    /// of the base.
    pub same_minute: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OutcomeShares {
    pub home_win: Share,
    pub draw: Share,
    pub away_win: Share,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateStats {
    pub scenario: LiveScenario,
    pub sample_size: usize,
    pub perspective: Side,
    pub goal_after_cut: Share,
    pub over_under: Vec<OverUnderLine>,
    pub scorelines: ScorelineTable,
    pub time_bands: TimeBandTable,
    pub first_goal_after_cut: FirstGoalSplit,
    pub outcomes: OutcomeShares,
    pub both_teams_score: Share,
}

impl AggregateStats {
    pub fn over_under_line(&self, threshold: f64) -> Option<&OverUnderLine> {
        self.over_under
            .iter()
            .find(|l| (l.threshold - threshold).abs() < 1e-9)
    }

    pub fn meets_sample(&self, min_sample: usize) -> bool {
        self.sample_size >= min_sample
    }
}

/// Aggregates a scenario match set. Every rate is computed over a stated denominator and an
/// empty set yields zeroes throughout.
pub fn aggregate(set: &ScenarioMatchSet<'_>, opts: &AggregateOptions) -> AggregateStats {
    let scenario = set.scenario;
    let n = set.len();
    let perspective = opts
        .perspective
        .or_else(|| scenario.label.favored_side())
        .unwrap_or(Side::Home);
    let partial_total = scenario.partial_total();

    let mut with_post_goal = 0usize;
    let mut perspective_first = 0usize;
    let mut other_first = 0usize;
    let mut same_minute_first = 0usize;
    let mut over_counts = vec![0usize; opts.thresholds.len()];
    let mut band_for = [0usize; TIME_BANDS.len()];
    let mut band_against = [0usize; TIME_BANDS.len()];
    let mut home_win = 0usize;
    let mut draw = 0usize;
    let mut away_win = 0usize;
    let mut btts = 0usize;

    for matched in &set.matches {
        let record = matched.record;
        let state = &matched.state;

        if state.has_post_cut_goal() {
            with_post_goal += 1;
            match state.first_after_cut() {
                Some(first) if first == perspective => perspective_first += 1,
                Some(_) => other_first += 1,
                None => same_minute_first += 1,
            }
        }

        let extra = record.total_goals().saturating_sub(partial_total) as f64;
        for (idx, threshold) in opts.thresholds.iter().enumerate() {
            if extra > *threshold {
                over_counts[idx] += 1;
            }
        }

        for goal in &state.post_cut {
            let band = band_index(goal.minute);
            if goal.side == perspective {
                band_for[band] += 1;
            } else {
                band_against[band] += 1;
            }
        }

        match record.home_goals.cmp(&record.away_goals) {
            std::cmp::Ordering::Greater => home_win += 1,
            std::cmp::Ordering::Equal => draw += 1,
            std::cmp::Ordering::Less => away_win += 1,
        }
        if record.home_goals > 0 && record.away_goals > 0 {
            btts += 1;
        }
    }

    let over_under = opts
        .thresholds
        .iter()
        .zip(&over_counts)
        .map(|(threshold, over)| OverUnderLine {
            threshold: *threshold,
            over: Share::of(*over, n),
            under: Share::of(n - over, n),
        })
        .collect();

    let decided = perspective_first + other_first;
    let total_goals: usize = band_for.iter().chain(band_against.iter()).sum();
    let bands = TIME_BANDS
        .iter()
        .enumerate()
        .map(|(idx, (start, end))| {
            let total = band_for[idx] + band_against[idx];
            BandRow {
                start: *start,
                end: *end,
                goals_for: band_for[idx],
                goals_against: band_against[idx],
                total,
                share_of_goals: Share::of(total, total_goals),
            }
        })
        .collect();

    AggregateStats {
        scenario,
        sample_size: n,
        perspective,
        goal_after_cut: Share::of(with_post_goal, n),
        over_under,
        scorelines: scoreline_table(set.records(), opts.top_k),
        time_bands: TimeBandTable { total_goals, bands },
        first_goal_after_cut: FirstGoalSplit {
            base: decided,
            perspective_first: Share::of(perspective_first, decided),
            other_first: Share::of(other_first, decided),
            same_minute: same_minute_first,
        },
        outcomes: OutcomeShares {
            home_win: Share::of(home_win, n),
            draw: Share::of(draw, n),
            away_win: Share::of(away_win, n),
        },
        both_teams_score: Share::of(btts, n),
    }
}

/// Final-score frequency, count descending with ties broken by the scoreline text.
pub fn scoreline_table<'a, I>(matches: I, top_k: usize) -> ScorelineTable
where
    I: IntoIterator<Item = &'a HistoricalMatch>,
{
    let mut counts: HashMap<(u8, u8), usize> = HashMap::new();
    let mut total = 0usize;
    for m in matches {
        *counts.entry((m.home_goals, m.away_goals)).or_insert(0) += 1;
        total += 1;
    }

    let mut rows: Vec<ScorelineRow> = counts
        .iter()
        .map(|(&(h, a), &count)| ScorelineRow {
            scoreline: format!("{h}-{a}"),
            home_goals: h,
            away_goals: a,
            share: Share::of(count, total),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.share
            .count
            .cmp(&a.share.count)
            .then_with(|| a.scoreline.cmp(&b.scoreline))
    });
    rows.truncate(top_k);

    let covered: usize = rows.iter().map(|r| r.share.count).sum();
    ScorelineTable {
        total,
        top: rows,
        other: Share::of(total - covered, total),
        counts,
    }
}

/// Index into [`TIME_BANDS`] for a goal minute.
pub fn band_index(minute: u16) -> usize {
    if minute <= TIME_BANDS[0].1 {
        return 0;
    }
    let idx = usize::from((minute - 1) / 15);
    idx.min(TIME_BANDS.len() - 1)
}
