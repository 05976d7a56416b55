use anyhow::{Result, anyhow, ensure};
use serde::{Deserialize, Serialize};

use crate::dataset::HistoricalMatch;
use crate::label::{self, Label};
use crate::projection::{MatchState, project_state};

pub const MIN_MINUTE: u16 = 1;
pub const MAX_MINUTE: u16 = 120;

/// In-play state to look up in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveScenario {
    pub label: Label,
    pub minute: u16,
    pub home_goals: u8,
    pub away_goals: u8,
}

impl LiveScenario {
    pub fn new(label: Label, minute: u16, home_goals: u8, away_goals: u8) -> Result<Self> {
        ensure!(
            (MIN_MINUTE..=MAX_MINUTE).contains(&minute),
            "minute {minute} outside {MIN_MINUTE}..={MAX_MINUTE}"
        );
        Ok(Self {
            label,
            minute,
            home_goals,
            away_goals,
        })
    }

    /// Builds a scenario from the live prices, e.g. `from_odds(1.9, 4.2, 60, "1-0")`.
    pub fn from_odds(home_odds: f64, away_odds: f64, minute: u16, score: &str) -> Result<Self> {
        let (home_goals, away_goals) =
            parse_score(score).ok_or_else(|| anyhow!("invalid live score {score:?}"))?;
        Self::new(
            label::classify(Some(home_odds), Some(away_odds)),
            minute,
            home_goals,
            away_goals,
        )
    }

    pub fn partial_total(&self) -> u32 {
        u32::from(self.home_goals) + u32::from(self.away_goals)
    }
}

/// A matched historical record together with its projection at the scenario minute.
#[derive(Debug, Clone)]
pub struct MatchedRecord<'a> {
    pub record: &'a HistoricalMatch,
    pub state: MatchState,
}

/// Historical matches comparable to a [`LiveScenario`]. May be empty.
#[derive(Debug, Clone)]
pub struct ScenarioMatchSet<'a> {
    pub scenario: LiveScenario,
    pub matches: Vec<MatchedRecord<'a>>,
    /// Records inspected before the label/score test.
    pub examined: usize,
}

impl<'a> ScenarioMatchSet<'a> {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &'a HistoricalMatch> + '_ {
        self.matches.iter().map(|m| m.record)
    }
}

/// Keeps matches sharing the scenario label whose projected score at the scenario minute
/// equals the live score. Single pass, inputs untouched.
pub fn match_scenario<'a, I>(matches: I, scenario: &LiveScenario) -> ScenarioMatchSet<'a>
where
    I: IntoIterator<Item = &'a HistoricalMatch>,
{
    let want = (
        u32::from(scenario.home_goals),
        u32::from(scenario.away_goals),
    );
    let mut examined = 0usize;
    let mut out = Vec::new();
    for record in matches {
        examined += 1;
        if record.label() != scenario.label {
            continue;
        }
        let state = project_state(record, scenario.minute);
        if state.score_at_cut() == want {
            out.push(MatchedRecord { record, state });
        }
    }
    ScenarioMatchSet {
        scenario: *scenario,
        matches: out,
        examined,
    }
}

/// Parses a live score such as `"1-0"`, `"2 : 1"` or `"FT 0-0"`.
pub fn parse_score(raw: &str) -> Option<(u8, u8)> {
    let mut nums = raw
        .split(|ch: char| !ch.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u8>().ok());
    let home = nums.next()??;
    let away = nums.next()??;
    if nums.next().is_some() {
        return None;
    }
    Some((home, away))
}
