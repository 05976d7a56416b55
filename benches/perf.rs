use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use scenario_ev::aggregate::{AggregateOptions, aggregate};
use scenario_ev::backtest::backtest_day;
use scenario_ev::dataset::Dataset;
use scenario_ev::ev::{EvOptions, MarketOdds, compute_ev};
use scenario_ev::fake_dataset;
use scenario_ev::goal_minutes::parse_goal_minutes;
use scenario_ev::label::{Label, classify};
use scenario_ev::scenario::{LiveScenario, match_scenario};

fn demo_dataset() -> Dataset {
    // Several seeds so the scan covers a few thousand records.
    let mut matches = Vec::new();
    for seed in 0..8 {
        matches.extend(fake_dataset::generate(seed));
    }
    Dataset::new(matches)
}

fn bench_classify(c: &mut Criterion) {
    let odds: Vec<(f64, f64)> = (0..1_000)
        .map(|i| (1.1 + (i % 50) as f64 * 0.1, 1.2 + (i % 37) as f64 * 0.15))
        .collect();
    c.bench_function("classify_1k", |b| {
        b.iter(|| {
            let supercomp = odds
                .iter()
                .filter(|(h, a)| classify(Some(*h), Some(*a)) == Label::SuperCompetitive)
                .count();
            black_box(supercomp);
        })
    });
}

fn bench_goal_minutes_parse(c: &mut Criterion) {
    c.bench_function("goal_minutes_parse", |b| {
        b.iter(|| {
            let minutes = parse_goal_minutes(black_box(Some("3;17,45.0;;61;x;88;90")));
            black_box(minutes.len());
        })
    });
}

fn bench_match_and_aggregate(c: &mut Criterion) {
    let dataset = demo_dataset();
    let scenario = LiveScenario::new(Label::SuperCompetitive, 60, 1, 0).unwrap();
    let opts = AggregateOptions::default();
    let prices: Vec<MarketOdds> = ["goal=1.6", "over1.5=3.2", "under0.5=2.6", "draw=3.9"]
        .iter()
        .map(|raw| raw.parse().unwrap())
        .collect();

    c.bench_function("match_scenario", |b| {
        b.iter(|| {
            let set = match_scenario(dataset.matches(), black_box(&scenario));
            black_box(set.len());
        })
    });
    c.bench_function("match_aggregate_ev", |b| {
        b.iter(|| {
            let set = match_scenario(dataset.matches(), black_box(&scenario));
            let stats = aggregate(&set, &opts);
            let ev = compute_ev(&stats, &prices, &EvOptions::default());
            black_box(ev.rows.len());
        })
    });
}

fn bench_backtest_day(c: &mut Criterion) {
    let dataset = demo_dataset();
    let Some(day) = dataset.dates().into_iter().last() else {
        return;
    };
    c.bench_function("backtest_day", |b| {
        b.iter(|| {
            let rows = backtest_day(&dataset, black_box(day), 0.045);
            black_box(rows.len());
        })
    });
}

criterion_group!(
    perf,
    bench_classify,
    bench_goal_minutes_parse,
    bench_match_and_aggregate,
    bench_backtest_day
);
criterion_main!(perf);
