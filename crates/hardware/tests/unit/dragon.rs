//! Dragon Protocol Tests.
//!
//! Write-update scenarios with exact cycle totals (default latencies:
//! ask = 2, cache-to-cache = 16, memory = flush = 100, hit = 1), plus the
//! snoop and request transition tables.

use rstest::rstest;

use snoopsim_core::config::Config;
use snoopsim_core::core::bus::Bus;
use snoopsim_core::core::cache::{Cache, CacheState, PrOutcome};
use snoopsim_core::core::protocol::{BlockState, BusOp, MemOp};
use snoopsim_core::core::store::SetAssocStore;
use snoopsim_core::core::timing::Timing;
use snoopsim_core::Protocol;
use snoopsim_core::SimError;

use crate::common::{addr, build, dragon_config, other, read, run, write};

// ══════════════════════════════════════════════════════════
// 1. Scenarios
// ══════════════════════════════════════════════════════════

/// Write/write to one address. Core 0 fills I→M; core 1's write miss
/// finds the dirty peer, rides a cache-to-cache transfer into Sm, and its
/// BusRd then BusUpd broadcasts move core 0 M→Sm→Sc.
#[test]
fn write_after_write_converges_to_sm_plus_sc() {
    let sim = run(
        &dragon_config(),
        vec![vec![write(0)], vec![write(0), other(300)]],
    );

    // Grant core 0 at cycle 1 (nominal 102); its BusRdX broadcast at
    // 103–104; grant core 1 at 105 (nominal 18, completes 122); BusRd at
    // 123–124, BusUpd at 125–126; core 1 computes through cycle 422.
    assert_eq!(sim.cycles, 422);
    assert_eq!(
        sim.caches[0].store.state_of(addr(0)),
        Some(BlockState::SharedClean)
    );
    assert_eq!(
        sim.caches[1].store.state_of(addr(0)),
        Some(BlockState::SharedModified)
    );
    // Two fills (32 + 32), BusRdX + BusRd addresses (4 + 4), one update
    // payload (32).
    assert_eq!(sim.bus.traffic_bytes(), 104);

    // Both writes started from I: no update events are counted.
    let updates: u64 = sim
        .caches
        .iter()
        .map(|c| c.stats.invalidations_or_updates)
        .sum();
    assert_eq!(updates, 0);
}

/// Read/read of one address: the first fill installs E, the second rides
/// a cache-to-cache transfer into Sc and its BusRd demotes the first to
/// Sc as well.
#[test]
fn read_after_read_converges_to_shared_clean() {
    let sim = run(&dragon_config(), vec![vec![read(0)], vec![read(0), other(50)]]);

    assert_eq!(sim.cycles, 172);
    assert_eq!(
        sim.caches[0].store.state_of(addr(0)),
        Some(BlockState::SharedClean)
    );
    assert_eq!(
        sim.caches[1].store.state_of(addr(0)),
        Some(BlockState::SharedClean)
    );
    assert_eq!(sim.bus.traffic_bytes(), 72);
}

/// A write hit on Sc arbitrates for the bus, broadcasts the update, and
/// counts the peer copies it rewrites; the writer ends Sm, the snooping
/// peer stays Sc.
#[test]
fn shared_clean_write_updates_peers() {
    let sim = run(
        &dragon_config(),
        vec![
            vec![read(0), other(140), write(0)],
            vec![read(0), other(200)],
        ],
    );

    assert_eq!(sim.cycles, 322);
    assert_eq!(
        sim.caches[0].store.state_of(addr(0)),
        Some(BlockState::SharedModified)
    );
    assert_eq!(
        sim.caches[1].store.state_of(addr(0)),
        Some(BlockState::SharedClean)
    );
    assert_eq!(sim.caches[0].stats.invalidations_or_updates, 1);
    assert_eq!(sim.caches[0].stats.shared_accesses, 1);
    assert_eq!(sim.bus.traffic_bytes(), 104);
}

/// The combined-state invariant holds at every quiescent point under
/// write-update contention.
#[test]
fn block_states_stay_coherent_throughout() {
    let mut sim = build(
        &dragon_config(),
        vec![vec![write(0)], vec![write(0), other(300)]],
    );
    loop {
        sim.check_block_states().expect("coherent block states");
        if !sim.step().expect("step succeeds") {
            break;
        }
    }
}

// ══════════════════════════════════════════════════════════
// 2. Snoop transition table
// ══════════════════════════════════════════════════════════

fn timing() -> Timing {
    Timing::from_config(&Config::default())
}

fn cache_holding(state: BlockState) -> Cache {
    let mut store = SetAssocStore::new(512, 2, 100);
    store.insert(addr(0), state).unwrap();
    Cache::new(0, Protocol::Dragon, store)
}

#[rstest]
#[case(BlockState::Exclusive, BusOp::Rd, Some(BlockState::SharedClean), 0)]
#[case(BlockState::SharedClean, BusOp::Rd, Some(BlockState::SharedClean), 0)]
#[case(BlockState::SharedClean, BusOp::Upd, Some(BlockState::SharedClean), 0)]
#[case(BlockState::SharedModified, BusOp::Rd, Some(BlockState::SharedModified), 100)]
#[case(BlockState::SharedModified, BusOp::Upd, Some(BlockState::SharedClean), 0)]
#[case(BlockState::Modified, BusOp::Rd, Some(BlockState::SharedModified), 0)]
fn snoop_transitions(
    #[case] start: BlockState,
    #[case] op: BusOp,
    #[case] end: Option<BlockState>,
    #[case] flush: u64,
) {
    let mut cache = cache_holding(start);
    let cost = cache.snoop(op, addr(0), &timing()).unwrap();
    assert_eq!(cost, flush);
    assert_eq!(cache.store.state_of(addr(0)), end);
}

/// BusUpd can only reach caches in Sc or Sm; E and M holders rule it out.
#[rstest]
#[case(BlockState::Exclusive)]
#[case(BlockState::Modified)]
fn snoop_upd_on_exclusive_holder_is_an_invariant_error(#[case] state: BlockState) {
    let mut cache = cache_holding(state);
    let err = cache.snoop(BusOp::Upd, addr(0), &timing()).unwrap_err();
    assert!(matches!(err, SimError::IllegalTransition { .. }));
}

/// BusRdX announces a fill nobody else holds; snooping one on a held
/// block is a bug, on an absent block a no-op.
#[test]
fn snoop_rdx_is_ignored_when_absent_and_illegal_when_held() {
    let mut empty = Cache::new(0, Protocol::Dragon, SetAssocStore::new(512, 2, 100));
    assert_eq!(empty.snoop(BusOp::RdX, addr(0), &timing()).unwrap(), 0);

    let mut holder = cache_holding(BlockState::SharedClean);
    let err = holder.snoop(BusOp::RdX, addr(0), &timing()).unwrap_err();
    assert!(matches!(err, SimError::IllegalTransition { .. }));
}

// ══════════════════════════════════════════════════════════
// 3. Request and grant entry points
// ══════════════════════════════════════════════════════════

/// Dragon misses always arbitrate, reads and writes alike.
#[rstest]
#[case(MemOp::Read)]
#[case(MemOp::Write)]
fn miss_queues_on_the_bus(#[case] op: MemOp) {
    let mut cache = Cache::new(0, Protocol::Dragon, SetAssocStore::new(512, 2, 100));
    let mut bus = Bus::new();
    let outcome = cache.pr_sig(op, addr(0), 0, &mut bus, &timing()).unwrap();
    assert_eq!(outcome, PrOutcome::Queued);
    assert!(bus.requests_pending());
}

/// A write hit on Sc also arbitrates: the update needs the bus.
#[test]
fn shared_clean_write_queues() {
    let mut cache = cache_holding(BlockState::SharedClean);
    let mut bus = Bus::new();
    let outcome = cache
        .pr_sig(MemOp::Write, addr(0), 1, &mut bus, &timing())
        .unwrap();
    assert_eq!(outcome, PrOutcome::Queued);
    assert_eq!(
        cache.state,
        CacheState::WaitingForBus(MemOp::Write, addr(0))
    );
    assert_eq!(cache.stats.invalidations_or_updates, 1);
    assert_eq!(cache.stats.hits, 1);
}

/// A write hit on E upgrades silently to M, no bus involvement.
#[test]
fn exclusive_write_upgrades_locally() {
    let mut cache = cache_holding(BlockState::Exclusive);
    let mut bus = Bus::new();
    let outcome = cache
        .pr_sig(MemOp::Write, addr(0), 0, &mut bus, &timing())
        .unwrap();
    assert_eq!(outcome, PrOutcome::Resolving);
    assert_eq!(cache.store.state_of(addr(0)), Some(BlockState::Modified));
    assert!(!bus.signals_pending());
    assert!(!bus.requests_pending());
    assert_eq!(cache.stats.private_accesses, 1);
}

/// A granted Sc write with peers becomes Sm and queues the update:
/// residual = ask - 1 = 1.
#[test]
fn granted_shared_write_with_peers_becomes_sm() {
    let mut cache = cache_holding(BlockState::SharedClean);
    cache.state = CacheState::WaitingForBus(MemOp::Write, addr(0));
    let mut bus = Bus::new();
    let residual = cache.bus_ready(1, &mut bus, &timing()).unwrap();
    assert_eq!(residual, 1);
    assert_eq!(
        cache.store.state_of(addr(0)),
        Some(BlockState::SharedModified)
    );
    assert!(bus.signals_pending());
}

/// The same grant with no peers left takes full ownership instead.
#[test]
fn granted_shared_write_without_peers_becomes_modified() {
    let mut cache = cache_holding(BlockState::SharedModified);
    cache.state = CacheState::WaitingForBus(MemOp::Write, addr(0));
    let mut bus = Bus::new();
    let residual = cache.bus_ready(0, &mut bus, &timing()).unwrap();
    assert_eq!(residual, 1);
    assert_eq!(cache.store.state_of(addr(0)), Some(BlockState::Modified));
}

/// A granted write miss with peers installs Sm and announces BusRd then
/// BusUpd: residual = ask + c2c - 1 = 17.
#[test]
fn granted_write_miss_with_peers_installs_sm() {
    let mut cache = Cache::new(0, Protocol::Dragon, SetAssocStore::new(512, 2, 100));
    cache.state = CacheState::WaitingForBus(MemOp::Write, addr(0));
    let mut bus = Bus::new();
    let residual = cache.bus_ready(1, &mut bus, &timing()).unwrap();
    assert_eq!(residual, 17);
    assert_eq!(
        cache.store.state_of(addr(0)),
        Some(BlockState::SharedModified)
    );
}
