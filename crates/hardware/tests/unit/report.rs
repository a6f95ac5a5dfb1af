//! Report Assembly and Determinism Tests.

use pretty_assertions::assert_eq;

use snoopsim_core::SimReport;

use crate::common::{mesi_config, other, read, run, write};

/// Re-running the same trace gives bit-identical stats.
#[test]
fn identical_runs_produce_identical_reports() {
    let trace = vec![read(0), other(3), read(1), other(2), write(0)];
    let first = run(&mesi_config(), vec![trace.clone(), trace.clone()]);
    let second = run(&mesi_config(), vec![trace.clone(), trace]);

    assert_eq!(
        SimReport::from_simulator(&first, 0.0),
        SimReport::from_simulator(&second, 0.0)
    );
}

/// Every load and store lands in exactly one of hits or misses.
#[test]
fn accesses_partition_into_hits_and_misses() {
    let trace = vec![read(0), other(3), read(1), other(2), write(0)];
    let sim = run(&mesi_config(), vec![trace.clone(), trace]);
    let report = SimReport::from_simulator(&sim, 0.0);

    for core in &report.cores {
        assert_eq!(core.hits + core.misses, core.loads + core.stores);
    }
}

/// Report rows carry the per-core counters and the derived miss rate.
#[test]
fn report_rows_carry_the_counters() {
    let sim = run(&mesi_config(), vec![vec![write(0), write(512), write(1024)]]);
    let report = SimReport::from_simulator(&sim, 0.0);

    assert_eq!(report.protocol, "MESI");
    assert_eq!(report.total_cycles, 104);
    assert_eq!(report.cores.len(), 1);
    assert_eq!(report.cores[0].stores, 3);
    assert_eq!(report.cores[0].misses, 3);
    assert!((report.cores[0].miss_rate - 1.0).abs() < f64::EPSILON);
    assert_eq!(report.traffic_bytes, 72);
    assert_eq!(report.invalidations_or_updates, 0);
}

/// A core that never touches memory reports a zero miss rate, not NaN.
#[test]
fn miss_rate_is_zero_without_accesses() {
    let sim = run(&mesi_config(), vec![vec![other(5)]]);
    let report = SimReport::from_simulator(&sim, 0.0);
    assert!(report.cores[0].miss_rate.abs() < f64::EPSILON);
}
