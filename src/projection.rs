use serde::{Deserialize, Serialize};

use crate::dataset::HistoricalMatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedGoal {
    pub minute: u16,
    pub side: Side,
}

/// Score of a historical match at a cut minute, plus everything scored afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    pub cut: u16,
    pub home_at_cut: u32,
    pub away_at_cut: u32,
    /// Goals with minute strictly greater than `cut`, ascending by minute.
    pub post_cut: Vec<TimedGoal>,
}

impl MatchState {
    pub fn score_at_cut(&self) -> (u32, u32) {
        (self.home_at_cut, self.away_at_cut)
    }

    pub fn has_post_cut_goal(&self) -> bool {
        !self.post_cut.is_empty()
    }

    /// Side that scored first after the cut. `None` when no goal followed or when both sides
    /// scored in that same minute.
    pub fn first_after_cut(&self) -> Option<Side> {
        opening_side(&self.post_cut)
    }
}

/// Side of the earliest goal in a chronological list, unless the other side also scored in
/// that minute. Minutes carry no finer ordering.
pub fn opening_side(goals: &[TimedGoal]) -> Option<Side> {
    let first = goals.first()?;
    sole_side(goals.iter().take_while(|g| g.minute == first.minute), first.side)
}

/// Side of the latest goal, with the same-minute rule of [`opening_side`].
pub fn closing_side(goals: &[TimedGoal]) -> Option<Side> {
    let last = goals.last()?;
    sole_side(goals.iter().rev().take_while(|g| g.minute == last.minute), last.side)
}

fn sole_side<'a>(mut same_minute: impl Iterator<Item = &'a TimedGoal>, side: Side) -> Option<Side> {
    same_minute.all(|g| g.side == side).then_some(side)
}

/// Projects the match state at `cut` from the stored goal minutes.
///
/// The minute lists are trusted as-is; a list that disagrees with the final score is not
/// corrected here.
pub fn project_state(m: &HistoricalMatch, cut: u16) -> MatchState {
    let home_at_cut = m.home_goal_minutes.iter().filter(|&&x| x <= cut).count() as u32;
    let away_at_cut = m.away_goal_minutes.iter().filter(|&&x| x <= cut).count() as u32;

    let mut post_cut = tag_goals(m, |minute| minute > cut);
    sort_goals(&mut post_cut);

    MatchState {
        cut,
        home_at_cut,
        away_at_cut,
        post_cut,
    }
}

/// Every recorded goal of the match in chronological order; within a minute home goals are
/// listed first.
pub fn timeline(m: &HistoricalMatch) -> Vec<TimedGoal> {
    let mut goals = tag_goals(m, |_| true);
    sort_goals(&mut goals);
    goals
}

fn tag_goals(m: &HistoricalMatch, keep: impl Fn(u16) -> bool) -> Vec<TimedGoal> {
    let home = m.home_goal_minutes.iter().map(|&minute| TimedGoal {
        minute,
        side: Side::Home,
    });
    let away = m.away_goal_minutes.iter().map(|&minute| TimedGoal {
        minute,
        side: Side::Away,
    });
    home.chain(away).filter(|g| keep(g.minute)).collect()
}

fn sort_goals(goals: &mut [TimedGoal]) {
    goals.sort_by(|a, b| a.minute.cmp(&b.minute).then(a.side.cmp(&b.side)));
}
