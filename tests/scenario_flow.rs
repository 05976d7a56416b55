use std::fs;
use std::path::PathBuf;

use scenario_ev::aggregate::{AggregateOptions, aggregate};
use scenario_ev::dataset::{
    Dataset, DatasetFilter, HistoricalMatch, MatchOdds, MatchRecord, load_json,
};
use scenario_ev::ev::{BetMode, EvOptions, Market, MarketOdds, compute_ev};
use scenario_ev::label::Label;
use scenario_ev::projection::Side;
use scenario_ev::scenario::{LiveScenario, match_scenario};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn competitive(home: &[u16], away: &[u16]) -> HistoricalMatch {
    HistoricalMatch::new(MatchRecord {
        league: "Test League".to_string(),
        home_goals: home.len() as u8,
        away_goals: away.len() as u8,
        home_goal_minutes: home.to_vec(),
        away_goal_minutes: away.to_vec(),
        odds: MatchOdds {
            home: Some(2.4),
            draw: Some(3.1),
            away: Some(2.9),
            ..MatchOdds::default()
        },
        ..MatchRecord::default()
    })
}

/// 10 SuperCompetitive matches: 6 at 1-0 on the hour, 4 of which see a later goal.
fn ten_match_dataset() -> Dataset {
    Dataset::new(vec![
        competitive(&[10, 70], &[]),
        competitive(&[22], &[61]),
        competitive(&[35, 80, 95], &[]),
        competitive(&[5], &[88]),
        competitive(&[44], &[]),
        competitive(&[59], &[]),
        competitive(&[], &[30]),
        competitive(&[20, 40], &[]),
        competitive(&[], &[]),
        competitive(&[65], &[]),
    ])
}

#[test]
fn end_to_end_post_cut_goal_rate() {
    let dataset = ten_match_dataset();
    assert!(dataset.matches().iter().all(|m| m.label() == Label::SuperCompetitive));

    let scenario = LiveScenario::new(Label::SuperCompetitive, 60, 1, 0).expect("valid scenario");
    let set = match_scenario(dataset.matches(), &scenario);
    assert_eq!(set.len(), 6);
    assert_eq!(set.examined, 10);

    let stats = aggregate(&set, &AggregateOptions::default());
    assert_eq!(stats.sample_size, 6);
    assert_eq!(stats.goal_after_cut.count, 4);
    assert_eq!(stats.goal_after_cut.denominator, 6);
    assert!((stats.goal_after_cut.pct - 66.666_666).abs() < 1e-3);

    // Extra goals beyond 1-0: 1, 1, 2, 1, 0, 0.
    let over_05 = stats.over_under_line(0.5).expect("0.5 line");
    assert_eq!(over_05.over.count, 4);
    let over_15 = stats.over_under_line(1.5).expect("1.5 line");
    assert_eq!(over_15.over.count, 1);
    assert_eq!(over_15.under.count, 5);

    // Post-cut goals 61 and 70 fall in (60,75]; 80, 88 and a clamped 95 in (75,90].
    assert_eq!(stats.time_bands.total_goals, 5);
    assert_eq!(stats.time_bands.bands[4].total, 2);
    assert_eq!(stats.time_bands.bands[5].total, 3);

    assert_eq!(stats.perspective, Side::Home);
    assert_eq!(stats.first_goal_after_cut.base, 4);
    assert_eq!(stats.first_goal_after_cut.perspective_first.count, 2);

    let scoreline_pct: f64 = stats.scorelines.top.iter().map(|r| r.share.pct).sum::<f64>()
        + stats.scorelines.other.pct;
    assert!((scoreline_pct - 100.0).abs() < 1e-9);
}

#[test]
fn ev_recommendation_requires_sample() {
    let dataset = ten_match_dataset();
    let scenario = LiveScenario::new(Label::SuperCompetitive, 60, 1, 0).expect("valid scenario");
    let stats = aggregate(
        &match_scenario(dataset.matches(), &scenario),
        &AggregateOptions::default(),
    );
    let prices: Vec<MarketOdds> = ["goal=2.0", "over1.5=3.0", "draw=3.5"]
        .iter()
        .map(|raw| raw.parse().expect("valid price"))
        .collect();

    let strict = compute_ev(&stats, &prices, &EvOptions::default());
    let best = strict.best.as_ref().expect("best row");
    assert_eq!(best.market, Market::GoalAfterCut);
    assert!(best.value);
    assert!(!strict.sufficient_sample);
    assert!(strict.recommendation.is_none());

    let relaxed = compute_ev(
        &stats,
        &prices,
        &EvOptions {
            min_sample: 5,
            ..EvOptions::default()
        },
    );
    let rec = relaxed.recommendation.expect("recommendation");
    assert_eq!(rec.market, Market::GoalAfterCut);
    assert!((rec.ev - (4.0 / 6.0 * 2.0 - 1.0)).abs() < 1e-12);
}

#[test]
fn live_correct_score_is_priced_beyond_displayed_rows() {
    const HOME: [u16; 3] = [20, 40, 60];
    const AWAY: [u16; 3] = [30, 50, 70];
    let mut records = Vec::new();
    for ((h, a), times) in [
        ((0, 0), 4),
        ((1, 0), 4),
        ((0, 1), 4),
        ((1, 1), 4),
        ((2, 0), 4),
        ((0, 2), 4),
        ((2, 1), 3),
        ((3, 3), 3),
    ] {
        for _ in 0..times {
            records.push(competitive(&HOME[..h], &AWAY[..a]));
        }
    }
    let dataset = Dataset::new(records);
    let scenario = LiveScenario::new(Label::SuperCompetitive, 5, 0, 0).expect("valid scenario");
    let stats = aggregate(
        &match_scenario(dataset.matches(), &scenario),
        &AggregateOptions::default(),
    );
    assert_eq!(stats.sample_size, 30);
    assert!(stats.scorelines.top.iter().all(|r| r.scoreline != "2-1"));

    let prices: Vec<MarketOdds> = vec!["cs2-1=5.0".parse().expect("valid price")];
    let report = compute_ev(
        &stats,
        &prices,
        &EvOptions {
            mode: BetMode::Lay,
            min_sample: 20,
            ..EvOptions::default()
        },
    );
    let row = &report.rows[0];
    assert!((row.probability - 0.1).abs() < 1e-12);
    assert!((row.ev - 0.125).abs() < 1e-12);
}

#[test]
fn lay_mode_prices_the_complement() {
    let dataset = ten_match_dataset();
    let scenario = LiveScenario::new(Label::SuperCompetitive, 60, 1, 0).expect("valid scenario");
    let stats = aggregate(
        &match_scenario(dataset.matches(), &scenario),
        &AggregateOptions::default(),
    );
    let prices = vec![MarketOdds {
        market: Market::Over(1.5),
        odds: 3.0,
    }];
    let report = compute_ev(
        &stats,
        &prices,
        &EvOptions {
            mode: BetMode::Lay,
            min_sample: 1,
            ..EvOptions::default()
        },
    );
    let row = &report.rows[0];
    // p = 1/6, stake 0.5 per unit of liability.
    assert!((row.ev - (5.0 / 6.0 * 0.5 - 1.0 / 6.0)).abs() < 1e-12);
    assert!(report.recommendation.is_some());
}

#[test]
fn empty_scenario_is_all_zero() {
    let dataset = ten_match_dataset();
    let scenario = LiveScenario::new(Label::HomeStrongFavorite, 30, 0, 0).expect("valid scenario");
    let set = match_scenario(dataset.matches(), &scenario);
    assert!(set.is_empty());
    let stats = aggregate(&set, &AggregateOptions::default());
    assert_eq!(stats.goal_after_cut.pct, 0.0);
    assert!(stats.over_under.iter().all(|l| l.over.pct == 0.0 && l.under.pct == 0.0));
    assert!(stats.scorelines.top.is_empty());
    assert_eq!(stats.scorelines.other.pct, 0.0);
    assert!(stats.time_bands.bands.iter().all(|b| b.share_of_goals.pct == 0.0));

    let prices = vec![MarketOdds {
        market: Market::Over(0.5),
        odds: 1.5,
    }];
    let report = compute_ev(&stats, &prices, &EvOptions::default());
    assert_eq!(report.sample_size, 0);
    assert!(report.recommendation.is_none());
}

#[test]
fn json_fixture_loads_and_filters() {
    let matches = load_json(&fixture_path("historical_matches.json")).expect("fixture loads");
    assert_eq!(matches.len(), 5);
    let dataset = Dataset::new(matches);
    assert_eq!(dataset.leagues().len(), 2);
    assert_eq!(
        dataset.seasons("italy serie a"),
        vec!["2023/2024".to_string(), "2022/2023".to_string()]
    );

    let filter = DatasetFilter {
        seasons: vec!["2023/2024".to_string()],
        ..DatasetFilter::league("Italy Serie A")
    };
    let scoped: Vec<&HistoricalMatch> = dataset.filter(&filter).collect();
    assert_eq!(scoped.len(), 3);

    let lazio = &dataset.matches()[0];
    assert_eq!(lazio.label(), Label::SuperCompetitive);
    assert_eq!(lazio.odds.over_line(2.5), Some(2.05));
    let scenario = LiveScenario::from_odds(2.6, 2.8, 60, "1-1").expect("valid scenario");
    let set = match_scenario(dataset.filter(&filter), &scenario);
    assert_eq!(set.len(), 1);
    assert_eq!(set.matches[0].state.post_cut.len(), 1);
}

#[test]
fn fixture_file_is_valid_json_array() {
    let raw = fs::read_to_string(fixture_path("historical_matches.json"))
        .expect("fixture file should be readable");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert!(value.is_array());
}
