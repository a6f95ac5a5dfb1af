//! Processor and Scheduler Boundary Tests.
//!
//! Exercises the issue state machine through the full scheduler: empty
//! streams, zero-cost instruction chaining, solo miss and hit latencies.
//! Cycle totals are worked out from the timing model in the comments.

use snoopsim_core::core::processor::ProcState;
use snoopsim_core::core::protocol::BlockState;

use crate::common::{mesi_config, other, read, run, write};

// ══════════════════════════════════════════════════════════
// 1. Stream boundaries
// ══════════════════════════════════════════════════════════

/// An empty instruction stream reaches `Done` at the first tick.
#[test]
fn empty_stream_is_done_immediately() {
    let sim = run(&mesi_config(), vec![vec![]]);
    assert_eq!(sim.procs[0].state, ProcState::Done);
    assert_eq!(sim.cycles, 1);
    assert_eq!(sim.procs[0].stats.loads, 0);
    assert_eq!(sim.procs[0].stats.stores, 0);
}

/// `Other(0)` must not consume a cycle of its own: the chain collapses
/// into the tick that issues the first non-zero instruction.
#[test]
fn zero_cost_other_chains_in_one_tick() {
    // Tick 1 issues Other(0), Other(0) and Other(5) back to back, leaving
    // ExecutingOther(4); ticks 2..=5 count it down. Total: 5 cycles.
    let sim = run(&mesi_config(), vec![vec![other(0), other(0), other(5)]]);
    assert_eq!(sim.cycles, 5);
    assert_eq!(sim.procs[0].stats.compute_cycles, 5);
}

/// `Other(n)` occupies exactly n cycles: the issue tick plus n-1 more.
#[test]
fn other_occupies_its_cycle_count() {
    let sim = run(&mesi_config(), vec![vec![other(3)]]);
    assert_eq!(sim.cycles, 3);
    assert_eq!(sim.procs[0].stats.compute_cycles, 3);
}

// ══════════════════════════════════════════════════════════
// 2. Solo memory latencies
// ══════════════════════════════════════════════════════════

/// A lone read miss with no peers costs ask(2) + mem(100) = 102 cycles:
/// the issue-and-grant tick plus 101 residual.
#[test]
fn solo_read_miss_costs_ask_plus_memory() {
    let sim = run(&mesi_config(), vec![vec![read(0)]]);
    assert_eq!(sim.cycles, 102);
    assert_eq!(sim.caches[0].stats.misses, 1);
    assert_eq!(sim.caches[0].stats.hits, 0);
    assert_eq!(sim.procs[0].stats.idle_cycles, 101);
    assert_eq!(sim.caches[0].store.state_of(crate::common::addr(0)), Some(BlockState::Exclusive));
}

/// A hit after the fill costs one cycle; the trailing BusRd broadcast
/// drains for one more after the processor finishes.
#[test]
fn read_then_hit() {
    // Cycle 1: miss, grant (nominal 102, busy through cycle 102).
    // Cycle 103: hit resolves within the tick; the BusRd broadcast from
    // the fill also starts at 103 (nominal 2) and drains one cycle past
    // the processor's completion.
    let sim = run(&mesi_config(), vec![vec![read(0), read(0)]]);
    assert_eq!(sim.cycles, 104);
    assert_eq!(sim.caches[0].stats.hits, 1);
    assert_eq!(sim.caches[0].stats.misses, 1);
    assert_eq!(sim.caches[0].stats.private_accesses, 1);
}

/// A write hit on an Exclusive block silently upgrades to Modified.
#[test]
fn write_hit_upgrades_exclusive_to_modified() {
    let sim = run(&mesi_config(), vec![vec![read(0), write(0)]]);
    assert_eq!(sim.cycles, 104);
    assert_eq!(
        sim.caches[0].store.state_of(crate::common::addr(0)),
        Some(BlockState::Modified)
    );
    assert_eq!(sim.caches[0].stats.private_accesses, 1);
}

// ══════════════════════════════════════════════════════════
// 3. Cycle accounting identities
// ══════════════════════════════════════════════════════════

/// Per-core cycle counters advance every tick regardless of state; on a
/// single core they equal the pre-drain total.
#[test]
fn core_cycles_track_the_clock() {
    let sim = run(&mesi_config(), vec![vec![read(0), other(7)]]);
    // Miss spans cycles 1..=102, Other(7) spans 103..=109. No drain: the
    // fill's broadcast ran during the Other window.
    assert_eq!(sim.cycles, 109);
    assert_eq!(sim.procs[0].stats.cycles, 109);
    assert_eq!(sim.procs[0].stats.idle_cycles, 101);
    assert_eq!(sim.procs[0].stats.compute_cycles, 7);
}
