//! Hardware components of the simulated system.
//!
//! Leaves first: derived timing constants, the set-associative tag store,
//! then the three clocked components (cache, processor, bus) that the
//! scheduler advances in lock-step.

/// Shared snoopy bus: arbitration queue, broadcast queue, busy accounting.
pub mod bus;
/// Coherence cache: the block-state machine and its three entry points.
pub mod cache;
/// Processor: instruction issue and the per-core timing state machine.
pub mod processor;
/// Coherence vocabulary: block states, memory events, bus transactions.
pub mod protocol;
/// Set-associative tag store with LRU recency and eviction cost.
pub mod store;
/// Latencies derived from the configured geometry.
pub mod timing;
