use std::collections::BTreeSet;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::goal_minutes::parse_goal_minutes;
use crate::label::{self, Label};

/// Over/under thresholds the provider publishes prices for.
pub const GOAL_LINES: [f64; 5] = [0.5, 1.5, 2.5, 3.5, 4.5];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchOdds {
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
    /// Over prices indexed like [`GOAL_LINES`].
    #[serde(default)]
    pub over: [Option<f64>; 5],
    #[serde(default)]
    pub under: [Option<f64>; 5],
}

impl MatchOdds {
    pub fn over_line(&self, line: f64) -> Option<f64> {
        line_index(line).and_then(|idx| self.over[idx])
    }

    pub fn under_line(&self, line: f64) -> Option<f64> {
        line_index(line).and_then(|idx| self.under[idx])
    }
}

pub fn line_index(line: f64) -> Option<usize> {
    GOAL_LINES.iter().position(|l| (l - line).abs() < 1e-9)
}

/// Stored fields of one completed match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub league: String,
    pub season: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u8,
    pub away_goals: u8,
    #[serde(default)]
    pub home_goals_ht: Option<u8>,
    #[serde(default)]
    pub away_goals_ht: Option<u8>,
    /// Minutes as stored; not necessarily sorted and not reconciled with the score.
    /// Accepts a JSON array or the provider's `;`/`,` delimited text.
    #[serde(default, deserialize_with = "goal_minutes_field")]
    pub home_goal_minutes: Vec<u16>,
    #[serde(default, deserialize_with = "goal_minutes_field")]
    pub away_goal_minutes: Vec<u16>,
    #[serde(default)]
    pub odds: MatchOdds,
}

impl MatchRecord {
    pub fn total_goals(&self) -> u32 {
        u32::from(self.home_goals) + u32::from(self.away_goals)
    }

    pub fn scoreline(&self) -> String {
        format!("{}-{}", self.home_goals, self.away_goals)
    }

    pub fn has_goal_minutes(&self) -> bool {
        !self.home_goal_minutes.is_empty() || !self.away_goal_minutes.is_empty()
    }

    pub fn half_time(&self) -> Option<(u8, u8)> {
        Some((self.home_goals_ht?, self.away_goals_ht?))
    }

    pub fn involves(&self, team: &str) -> bool {
        same_name(&self.home_team, team) || same_name(&self.away_team, team)
    }
}

fn goal_minutes_field<'de, D>(deserializer: D) -> std::result::Result<Vec<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Minutes {
        List(Vec<u16>),
        Text(String),
    }

    Ok(match Option::<Minutes>::deserialize(deserializer)? {
        Some(Minutes::List(minutes)) => minutes,
        Some(Minutes::Text(raw)) => parse_goal_minutes(Some(&raw)),
        None => Vec::new(),
    })
}

/// One completed match from the historical store, with its odds label cached.
///
/// Reads go through [`MatchRecord`]; any mutable access drops the cached label so it is
/// reclassified from the current odds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoricalMatch {
    record: MatchRecord,
    #[serde(skip)]
    label: OnceCell<Label>,
}

impl HistoricalMatch {
    pub fn new(record: MatchRecord) -> Self {
        Self {
            record,
            label: OnceCell::new(),
        }
    }

    /// Odds-derived label, classified on first access and cached on the record.
    pub fn label(&self) -> Label {
        *self
            .label
            .get_or_init(|| label::classify(self.record.odds.home, self.record.odds.away))
    }

    pub fn record(&self) -> &MatchRecord {
        &self.record
    }
}

impl From<MatchRecord> for HistoricalMatch {
    fn from(record: MatchRecord) -> Self {
        Self::new(record)
    }
}

impl Deref for HistoricalMatch {
    type Target = MatchRecord;

    fn deref(&self) -> &MatchRecord {
        &self.record
    }
}

impl DerefMut for HistoricalMatch {
    fn deref_mut(&mut self) -> &mut MatchRecord {
        self.label.take();
        &mut self.record
    }
}

/// Restricts a dataset before scenario matching.
#[derive(Debug, Clone, Default)]
pub struct DatasetFilter {
    pub league: Option<String>,
    pub seasons: Vec<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    /// Only matches dated strictly before this day; undated matches are dropped.
    pub before: Option<NaiveDate>,
}

impl DatasetFilter {
    pub fn league(league: impl Into<String>) -> Self {
        Self {
            league: Some(league.into()),
            ..Self::default()
        }
    }

    pub fn accepts(&self, m: &HistoricalMatch) -> bool {
        if let Some(league) = self.league.as_deref()
            && !same_name(&m.league, league)
        {
            return false;
        }
        if !self.seasons.is_empty() && !self.seasons.iter().any(|s| s.trim() == m.season.trim())
        {
            return false;
        }
        if let Some(home) = self.home_team.as_deref()
            && !same_name(&m.home_team, home)
        {
            return false;
        }
        if let Some(away) = self.away_team.as_deref()
            && !same_name(&m.away_team, away)
        {
            return false;
        }
        if let Some(before) = self.before {
            return m.date.is_some_and(|d| d < before);
        }
        true
    }
}

/// Immutable snapshot of historical matches for one analysis session.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    matches: Vec<HistoricalMatch>,
}

impl Dataset {
    /// Takes ownership of the records and classifies every label once.
    pub fn new(matches: Vec<HistoricalMatch>) -> Self {
        matches.par_iter().for_each(|m| {
            m.label();
        });
        debug!(matches = matches.len(), "dataset labels warmed");
        Self { matches }
    }

    pub fn matches(&self) -> &[HistoricalMatch] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn filter<'a>(
        &'a self,
        filter: &'a DatasetFilter,
    ) -> impl Iterator<Item = &'a HistoricalMatch> + 'a {
        self.matches.iter().filter(move |m| filter.accepts(m))
    }

    pub fn leagues(&self) -> Vec<String> {
        let set: BTreeSet<String> = self
            .matches
            .iter()
            .map(|m| m.league.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        set.into_iter().collect()
    }

    /// Seasons for a league, most recent first.
    pub fn seasons(&self, league: &str) -> Vec<String> {
        let set: BTreeSet<String> = self
            .matches
            .iter()
            .filter(|m| same_name(&m.league, league))
            .map(|m| m.season.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        set.into_iter().rev().collect()
    }

    pub fn teams(&self, league: &str) -> Vec<String> {
        let set: BTreeSet<String> = self
            .matches
            .iter()
            .filter(|m| same_name(&m.league, league))
            .flat_map(|m| [m.home_team.trim(), m.away_team.trim()])
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        set.into_iter().collect()
    }

    /// Distinct match days, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let set: BTreeSet<NaiveDate> = self.matches.iter().filter_map(|m| m.date).collect();
        set.into_iter().collect()
    }
}

impl From<Vec<HistoricalMatch>> for Dataset {
    fn from(matches: Vec<HistoricalMatch>) -> Self {
        Self::new(matches)
    }
}

pub fn load_json(path: &Path) -> Result<Vec<HistoricalMatch>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read dataset {}", path.display()))?;
    serde_json::from_str::<Vec<HistoricalMatch>>(&raw)
        .with_context(|| format!("invalid dataset json {}", path.display()))
}

pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
