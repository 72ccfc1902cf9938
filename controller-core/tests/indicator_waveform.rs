mod support;

use std::time::Duration;

use controller_core::IndicatorConfig;
use controller_core::indicator::{
    BlinkPattern, Cadence, IndicatorEngine, PatternId, PatternTable, register_status_patterns,
};

use support::MockInstant;

const UNIT_US: u64 = 500_000;

fn status_table() -> PatternTable {
    let mut table = PatternTable::new();
    register_status_patterns(&mut table).expect("status patterns fit");
    table
}

/// Ticks `pattern` every `step_us` until `horizon_us` and returns the edges.
fn waveform(
    table: &PatternTable,
    pattern: PatternId,
    step_us: u64,
    horizon_us: u64,
) -> Vec<(u64, bool)> {
    let mut engine = IndicatorEngine::<MockInstant>::new(pattern, IndicatorConfig::default());
    engine.set_cadence(Cadence::Normal);

    let mut edges = Vec::new();
    let mut now = 0;
    while now <= horizon_us {
        if let Some(level) = engine.tick(MockInstant(now), table) {
            edges.push((now, level));
        }
        now += step_us;
    }
    edges
}

/// Durations of the completed high and low runs in the waveform.
fn runs(edges: &[(u64, bool)]) -> (Vec<u64>, Vec<u64>) {
    let mut high = Vec::new();
    let mut low = Vec::new();
    for pair in edges.windows(2) {
        let (start, level) = pair[0];
        let (end, _) = pair[1];
        if level {
            high.push(end - start);
        } else {
            low.push(end - start);
        }
    }
    (high, low)
}

fn blinking(table: &PatternTable) -> impl Iterator<Item = (PatternId, BlinkPattern)> + '_ {
    table
        .iter()
        .map(|(id, pattern)| (id, *pattern))
        .filter(|(_, pattern)| pattern.on_units > 0 && pattern.off_units > 0)
}

#[test]
fn every_status_pattern_produces_exact_runs() {
    let table = status_table();
    let mut checked = 0;

    for (id, pattern) in blinking(&table) {
        let period_us = u64::from(pattern.period()) * UNIT_US;
        let edges = waveform(&table, id, 1_000, 3 * period_us);
        let (high, low) = runs(&edges);

        assert!(high.len() >= 2 && low.len() >= 2, "{pattern} produced {edges:?}");
        let on_us = u64::from(pattern.on_units) * UNIT_US;
        let off_us = u64::from(pattern.off_units) * UNIT_US;
        assert!(high.iter().all(|run| *run == on_us), "{pattern} high runs {high:?}");
        assert!(low.iter().all(|run| *run == off_us), "{pattern} low runs {low:?}");
        checked += 1;
    }

    assert_eq!(checked, 6);
}

#[test]
fn solid_and_dark_patterns_hold_their_level() {
    let table = status_table();
    let solid = table
        .iter()
        .find(|(_, pattern)| **pattern == BlinkPattern::new(5, 0))
        .map(|(id, _)| id)
        .expect("solid pattern registered");
    let dark = table
        .iter()
        .find(|(_, pattern)| **pattern == BlinkPattern::new(0, 1))
        .map(|(id, _)| id)
        .expect("dark pattern registered");

    assert_eq!(waveform(&table, solid, 1_000, 10 * UNIT_US), vec![(0, true)]);
    assert_eq!(waveform(&table, dark, 1_000, 10 * UNIT_US), vec![(0, false)]);
}

#[test]
fn uneven_tick_spacing_shifts_edges_by_at_most_one_tick() {
    let table = status_table();
    let step_us = 7_000;

    for (id, pattern) in blinking(&table) {
        let period_us = u64::from(pattern.period()) * UNIT_US;
        let edges = waveform(&table, id, step_us, 6 * period_us);
        let (high, low) = runs(&edges);
        assert!(high.len() >= 4, "{pattern} produced {edges:?}");

        let on_us = u64::from(pattern.on_units) * UNIT_US;
        let off_us = u64::from(pattern.off_units) * UNIT_US;
        for run in high {
            assert!(run + step_us > on_us, "{pattern} high run {run}");
            assert!(run < on_us + step_us, "{pattern} high run {run}");
        }
        for run in low {
            assert!(run + step_us > off_us, "{pattern} low run {run}");
            assert!(run < off_us + step_us, "{pattern} low run {run}");
        }
        // Edges stay on the unit grid instead of drifting.
        for (at, _) in &edges {
            assert!(at % UNIT_US < step_us, "{pattern} edge at {at}");
        }
    }
}

#[test]
fn unsafe_cadence_runs_five_times_faster() {
    let table = status_table();
    let (id, pattern) = blinking(&table).next().expect("blinking pattern");

    let mut engine = IndicatorEngine::<MockInstant>::new(id, IndicatorConfig::default());
    assert_eq!(engine.cadence(), Cadence::Unsafe);
    assert_eq!(engine.unit(), Duration::from_millis(100));

    let mut edges = Vec::new();
    for now in (0..=2_000_000).step_by(1_000) {
        if let Some(level) = engine.tick(MockInstant(now), &table) {
            edges.push((now, level));
        }
    }
    let (high, _) = runs(&edges);
    assert!(!high.is_empty());
    assert!(high.iter().all(|run| *run == u64::from(pattern.on_units) * 100_000));
}
