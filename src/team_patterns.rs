use serde::{Deserialize, Serialize};

use crate::aggregate::{Share, TIME_BANDS, band_index};
use crate::dataset::{HistoricalMatch, same_name};
use crate::projection::{Side, closing_side, opening_side, timeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
}

impl Venue {
    pub fn side(self) -> Side {
        match self {
            Venue::Home => Side::Home,
            Venue::Away => Side::Away,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandGoals {
    pub start: u16,
    pub end: u16,
    pub count: usize,
    pub share: Share,
}

/// Goal-flow figures for one team at one venue, all from that team's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalPatterns {
    pub team: String,
    pub venue: Venue,
    pub played: usize,
    pub win: Share,
    pub draw: Share,
    pub loss: Share,
    pub first_goal: Share,
    pub last_goal: Share,
    pub scored_first: Share,
    pub two_zero_after_scoring_first: Share,
    pub level_after_scoring_first: Share,
    pub conceded_first: Share,
    pub level_after_conceding_first: Share,
    pub zero_two_after_conceding_first: Share,
    pub margin_two_plus: Share,
    pub nil_nil: Share,
    /// Half-time and second-half results over matches with a recorded half-time score.
    pub first_half: [Share; 3],
    pub second_half: [Share; 3],
    pub scored_by_band: Vec<BandGoals>,
    pub conceded_by_band: Vec<BandGoals>,
}

/// A record counts as played once it has goal minutes or a recorded result. Loaded records
/// always carry a final score; a bare 0-0 with no date and no half-time score is a placeholder.
pub fn is_played(m: &HistoricalMatch) -> bool {
    m.has_goal_minutes() || m.total_goals() > 0 || m.half_time().is_some() || m.date.is_some()
}

pub fn goal_patterns<'a, I>(matches: I, team: &str, venue: Venue) -> GoalPatterns
where
    I: IntoIterator<Item = &'a HistoricalMatch>,
{
    let own = venue.side();
    let games: Vec<&HistoricalMatch> = matches
        .into_iter()
        .filter(|m| match venue {
            Venue::Home => same_name(&m.home_team, team),
            Venue::Away => same_name(&m.away_team, team),
        })
        .filter(|m| is_played(m))
        .collect();
    let n = games.len();

    let mut wins = 0usize;
    let mut draws = 0usize;
    let mut losses = 0usize;
    let mut first_goal = 0usize;
    let mut last_goal = 0usize;
    let mut scored_first = 0usize;
    let mut two_zero = 0usize;
    let mut level_after_lead = 0usize;
    let mut conceded_first = 0usize;
    let mut level_after_trail = 0usize;
    let mut zero_two = 0usize;
    let mut margin_two = 0usize;
    let mut nil_nil = 0usize;
    let mut with_ht = 0usize;
    let mut first_half = [0usize; 3];
    let mut second_half = [0usize; 3];
    let mut scored = [0usize; TIME_BANDS.len()];
    let mut conceded = [0usize; TIME_BANDS.len()];

    for m in &games {
        let (gf, ga) = match venue {
            Venue::Home => (m.home_goals, m.away_goals),
            Venue::Away => (m.away_goals, m.home_goals),
        };
        match gf.cmp(&ga) {
            std::cmp::Ordering::Greater => wins += 1,
            std::cmp::Ordering::Equal => draws += 1,
            std::cmp::Ordering::Less => losses += 1,
        }
        if gf.abs_diff(ga) >= 2 {
            margin_two += 1;
        }
        if gf == 0 && ga == 0 {
            nil_nil += 1;
        }

        if let Some((hh, ha)) = m.half_time() {
            with_ht += 1;
            let (ff, fa) = match venue {
                Venue::Home => (hh, ha),
                Venue::Away => (ha, hh),
            };
            first_half[result_index(ff, fa)] += 1;
            let sf = gf.saturating_sub(ff);
            let sa = ga.saturating_sub(fa);
            second_half[result_index(sf, sa)] += 1;
        }

        let goals = timeline(m);
        if closing_side(&goals) == Some(own) {
            last_goal += 1;
        }

        for goal in &goals {
            let band = band_index(goal.minute);
            if goal.side == own {
                scored[band] += 1;
            } else {
                conceded[band] += 1;
            }
        }

        // Same-minute openers from both sides have no order to follow.
        let Some(opener) = opening_side(&goals) else {
            continue;
        };
        let led = opener == own;
        // Follow the score from the opening goal until it becomes 2-0 or 1-1 either way.
        let (mut us, mut them) = if led {
            first_goal += 1;
            scored_first += 1;
            (1u32, 0u32)
        } else {
            conceded_first += 1;
            (0u32, 1u32)
        };
        for goal in goals.iter().skip(1) {
            if goal.side == own {
                us += 1;
            } else {
                them += 1;
            }
            match (led, us, them) {
                (true, 2, 0) => {
                    two_zero += 1;
                    break;
                }
                (false, 0, 2) => {
                    zero_two += 1;
                    break;
                }
                (true, 1, 1) => {
                    level_after_lead += 1;
                    break;
                }
                (false, 1, 1) => {
                    level_after_trail += 1;
                    break;
                }
                _ => {}
            }
        }
    }

    GoalPatterns {
        team: team.trim().to_string(),
        venue,
        played: n,
        win: Share::of(wins, n),
        draw: Share::of(draws, n),
        loss: Share::of(losses, n),
        first_goal: Share::of(first_goal, n),
        last_goal: Share::of(last_goal, n),
        scored_first: Share::of(scored_first, n),
        two_zero_after_scoring_first: Share::of(two_zero, scored_first),
        level_after_scoring_first: Share::of(level_after_lead, scored_first),
        conceded_first: Share::of(conceded_first, n),
        level_after_conceding_first: Share::of(level_after_trail, conceded_first),
        zero_two_after_conceding_first: Share::of(zero_two, conceded_first),
        margin_two_plus: Share::of(margin_two, n),
        nil_nil: Share::of(nil_nil, n),
        first_half: first_half.map(|c| Share::of(c, with_ht)),
        second_half: second_half.map(|c| Share::of(c, with_ht)),
        scored_by_band: band_goals(&scored),
        conceded_by_band: band_goals(&conceded),
    }
}

/// 0 = win, 1 = draw, 2 = loss for the first pair member.
fn result_index(ours: u8, theirs: u8) -> usize {
    match ours.cmp(&theirs) {
        std::cmp::Ordering::Greater => 0,
        std::cmp::Ordering::Equal => 1,
        std::cmp::Ordering::Less => 2,
    }
}

fn band_goals(counts: &[usize; TIME_BANDS.len()]) -> Vec<BandGoals> {
    let total: usize = counts.iter().sum();
    TIME_BANDS
        .iter()
        .zip(counts)
        .map(|((start, end), count)| BandGoals {
            start: *start,
            end: *end,
            count: *count,
            share: Share::of(*count, total),
        })
        .collect()
}
