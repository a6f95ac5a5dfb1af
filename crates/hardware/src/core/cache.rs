//! Coherence cache: the block-state machine and its three entry points.
//!
//! A cache's block states are driven from three directions:
//! 1. [`Cache::pr_sig`]: a request from its own processor. Hits resolve
//!    locally; misses either complete immediately (the Illinois write-miss
//!    shortcut) or queue the cache on the bus.
//! 2. [`Cache::bus_ready`]: the continuation that runs when the bus grants
//!    a queued request. It probes the peers, pays the eviction, transitions
//!    the block, and announces the transaction.
//! 3. [`Cache::snoop`]: a transaction broadcast by a peer, possibly
//!    demoting or invalidating the local copy and charging a flush.
//!
//! MESI and Dragon share this machinery and differ only in the transition
//! tables.

use tracing::debug;

use crate::common::addr::WordAddr;
use crate::common::error::SimError;
use crate::config::Protocol;

use super::bus::Bus;
use super::protocol::{BlockState, BusOp, MemOp};
use super::store::SetAssocStore;
use super::timing::Timing;

/// Cache request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No outstanding processor request.
    Idle,
    /// Queued on the bus, holding the deferred request.
    WaitingForBus(MemOp, WordAddr),
    /// Request in flight; resolves when the residual reaches zero.
    ResolvingRequest(u64),
}

/// Per-cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests that found the block in a non-I state.
    pub hits: u64,
    /// Requests that found the block absent.
    pub misses: u64,
    /// Hits on a block held in E or M.
    pub private_accesses: u64,
    /// Hits on a block held in S, Sc or Sm.
    pub shared_accesses: u64,
    /// Peer copies invalidated (MESI) or updated (Dragon) by this cache's
    /// writes to shared blocks.
    pub invalidations_or_updates: u64,
}

/// Outcome of a processor request delivered to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrOutcome {
    /// Completed within this cycle; the processor may proceed.
    Proceed,
    /// Completing after the hit latency elapses.
    Resolving,
    /// Queued on the bus; resolution continues in [`Cache::bus_ready`].
    Queued,
}

/// A per-core coherence cache.
#[derive(Debug)]
pub struct Cache {
    id: usize,
    protocol: Protocol,
    /// Tag store with LRU recency.
    pub store: SetAssocStore,
    /// Request state.
    pub state: CacheState,
    /// Per-cache counters.
    pub stats: CacheStats,
}

impl Cache {
    /// Creates an idle cache over the given store.
    pub fn new(id: usize, protocol: Protocol, store: SetAssocStore) -> Self {
        Self {
            id,
            protocol,
            store,
            state: CacheState::Idle,
            stats: CacheStats::default(),
        }
    }

    /// This cache's id; equals its processor's id.
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Processor-issued request.
    ///
    /// `peers` is the number of other caches currently holding the block in
    /// a non-I state. On `Ok(PrOutcome::Proceed)` the caller releases the
    /// processor in the same cycle.
    ///
    /// # Errors
    ///
    /// An internal invariant violation when the stored block state is not
    /// one the configured protocol can produce.
    pub fn pr_sig(
        &mut self,
        op: MemOp,
        addr: WordAddr,
        peers: usize,
        bus: &mut Bus,
        timing: &Timing,
    ) -> Result<PrOutcome, SimError> {
        let state = self.store.state_of(addr);
        self.record_access(state, op, peers);
        match self.protocol {
            Protocol::Mesi => self.pr_sig_mesi(op, addr, state, bus, timing),
            Protocol::Dragon => self.pr_sig_dragon(op, addr, state, bus, timing),
        }
    }

    /// Hit/miss, private/shared and invalidation/update bookkeeping.
    fn record_access(&mut self, state: Option<BlockState>, op: MemOp, peers: usize) {
        match state {
            None => self.stats.misses += 1,
            Some(s) => {
                self.stats.hits += 1;
                if s.is_private() {
                    self.stats.private_accesses += 1;
                } else {
                    self.stats.shared_accesses += 1;
                }
            }
        }
        // A write to a shared block removes or rewrites every peer copy.
        let broadcasts = match (self.protocol, state) {
            (Protocol::Mesi, Some(BlockState::Shared)) => op == MemOp::Write,
            (
                Protocol::Dragon,
                Some(BlockState::SharedClean | BlockState::SharedModified),
            ) => op == MemOp::Write,
            _ => false,
        };
        if broadcasts {
            self.stats.invalidations_or_updates += peers as u64;
        }
    }

    fn pr_sig_mesi(
        &mut self,
        op: MemOp,
        addr: WordAddr,
        state: Option<BlockState>,
        bus: &mut Bus,
        timing: &Timing,
    ) -> Result<PrOutcome, SimError> {
        match (state, op) {
            (None, MemOp::Read) => Ok(self.wait_for_bus(op, addr, bus)),
            (None, MemOp::Write) => {
                if self.store.is_full(addr) {
                    // The write-allocate would evict through the bus.
                    Ok(self.wait_for_bus(op, addr, bus))
                } else {
                    // Illinois write-miss shortcut: install M immediately
                    // and let the queued BusRdX invalidate the peers.
                    bus.broadcast(self.id, BusOp::RdX, addr);
                    self.insert(addr, BlockState::Modified)?;
                    self.state = CacheState::Idle;
                    Ok(PrOutcome::Proceed)
                }
            }
            (Some(BlockState::Shared | BlockState::Exclusive), MemOp::Read) => {
                self.hit(addr, timing)
            }
            (Some(BlockState::Shared), MemOp::Write) => {
                bus.broadcast(self.id, BusOp::RdX, addr);
                self.set_state(addr, BlockState::Modified)?;
                self.hit(addr, timing)
            }
            (Some(BlockState::Exclusive), MemOp::Write) => {
                self.set_state(addr, BlockState::Modified)?;
                self.hit(addr, timing)
            }
            (Some(BlockState::Modified), _) => self.hit(addr, timing),
            (Some(s), _) => Err(self.illegal("request", op.name(), addr, s)),
        }
    }

    fn pr_sig_dragon(
        &mut self,
        op: MemOp,
        addr: WordAddr,
        state: Option<BlockState>,
        bus: &mut Bus,
        timing: &Timing,
    ) -> Result<PrOutcome, SimError> {
        match (state, op) {
            (None, _) => Ok(self.wait_for_bus(op, addr, bus)),
            (Some(BlockState::Exclusive), MemOp::Read) => self.hit(addr, timing),
            (Some(BlockState::Exclusive), MemOp::Write) => {
                self.set_state(addr, BlockState::Modified)?;
                self.hit(addr, timing)
            }
            (
                Some(BlockState::SharedClean | BlockState::SharedModified),
                MemOp::Read,
            ) => self.hit(addr, timing),
            (
                Some(BlockState::SharedClean | BlockState::SharedModified),
                MemOp::Write,
            ) => Ok(self.wait_for_bus(op, addr, bus)),
            (Some(BlockState::Modified), _) => self.hit(addr, timing),
            (Some(s), _) => Err(self.illegal("request", op.name(), addr, s)),
        }
    }

    /// Queues this cache on the bus and parks the request.
    fn wait_for_bus(&mut self, op: MemOp, addr: WordAddr, bus: &mut Bus) -> PrOutcome {
        bus.acquire(self.id);
        self.state = CacheState::WaitingForBus(op, addr);
        PrOutcome::Queued
    }

    /// Immediate hit: refresh recency and resolve after the hit latency.
    fn hit(&mut self, addr: WordAddr, timing: &Timing) -> Result<PrOutcome, SimError> {
        self.touch(addr)?;
        if timing.cache_hit > 0 {
            self.state = CacheState::ResolvingRequest(timing.cache_hit);
            Ok(PrOutcome::Resolving)
        } else {
            self.state = CacheState::Idle;
            Ok(PrOutcome::Proceed)
        }
    }

    /// Bus-grant continuation for the request parked in `WaitingForBus`.
    ///
    /// Computes the transaction: pays any eviction, transitions the block,
    /// queues the announcement broadcasts, and returns the residual busy
    /// time (the grant cycle itself is already accounted for). The cache
    /// ends in `ResolvingRequest` of the same residual.
    ///
    /// # Errors
    ///
    /// [`SimError::SpuriousGrant`] when no request is parked, or an
    /// invariant violation for a `(state, op)` pair the protocol rules out.
    pub fn bus_ready(
        &mut self,
        peers: usize,
        bus: &mut Bus,
        timing: &Timing,
    ) -> Result<u64, SimError> {
        let CacheState::WaitingForBus(op, addr) = self.state else {
            return Err(SimError::SpuriousGrant { cache: self.id });
        };
        let state = self.store.state_of(addr);
        let others = peers > 0;

        let (latency, next, signals): (u64, BlockState, &[BusOp]) = match self.protocol {
            Protocol::Mesi => match (state, op) {
                // Illinois: prefer a cache-to-cache transfer; install E on a
                // clean fill, S when peers answered. Both announce BusRd.
                (None, MemOp::Read) if others => (
                    timing.ask_other_caches + timing.cache_to_cache,
                    BlockState::Shared,
                    &[BusOp::Rd],
                ),
                (None, MemOp::Read) => (
                    timing.ask_other_caches + timing.mem_fetch,
                    BlockState::Exclusive,
                    &[BusOp::Rd],
                ),
                // Only reachable when the write-allocate had to evict.
                (None, MemOp::Write) => (0, BlockState::Modified, &[BusOp::RdX]),
                (s, _) => {
                    return Err(self.illegal_opt("bus grant", op.name(), addr, s));
                }
            },
            Protocol::Dragon => match (state, op) {
                (None, MemOp::Read) if others => (
                    timing.ask_other_caches + timing.cache_to_cache,
                    BlockState::SharedClean,
                    &[BusOp::Rd],
                ),
                (None, MemOp::Read) => (
                    timing.ask_other_caches + timing.mem_fetch,
                    BlockState::Exclusive,
                    &[BusOp::RdX],
                ),
                (None, MemOp::Write) if others => (
                    timing.ask_other_caches + timing.cache_to_cache,
                    BlockState::SharedModified,
                    &[BusOp::Rd, BusOp::Upd],
                ),
                (None, MemOp::Write) => (
                    timing.ask_other_caches + timing.mem_fetch,
                    BlockState::Modified,
                    &[BusOp::RdX],
                ),
                (
                    Some(BlockState::SharedClean | BlockState::SharedModified),
                    MemOp::Write,
                ) => {
                    let next = if others {
                        BlockState::SharedModified
                    } else {
                        BlockState::Modified
                    };
                    (timing.ask_other_caches, next, &[BusOp::Upd])
                }
                (s, _) => {
                    return Err(self.illegal_opt("bus grant", op.name(), addr, s));
                }
            },
        };

        let evict_cost = match state {
            Some(_) => {
                self.touch(addr)?;
                self.set_state(addr, next)?;
                0
            }
            None => {
                let cost = self.insert(addr, next)?;
                if cost > 0 {
                    debug!(cache = self.id, %addr, "dirty eviction on fill");
                    bus.add_traffic(timing.block_bytes);
                }
                // A fill moves one block over the bus, from memory or a peer.
                bus.add_traffic(timing.block_bytes);
                cost
            }
        };
        for &sig in signals {
            bus.broadcast(self.id, sig, addr);
        }

        // The grant cycle itself is the first cycle of the transaction.
        let residual = (evict_cost + latency).saturating_sub(1);
        self.state = CacheState::ResolvingRequest(residual);
        debug!(
            cache = self.id,
            op = op.name(),
            %addr,
            residual,
            "bus grant"
        );
        Ok(residual)
    }

    /// Snooped transaction from a peer; returns the flush latency this
    /// cache adds to the transaction.
    ///
    /// # Errors
    ///
    /// An invariant violation for a `(state, op)` pair the protocol rules
    /// out (for instance `BusUpd` snooped by a Dragon cache in E or M).
    pub fn snoop(
        &mut self,
        op: BusOp,
        addr: WordAddr,
        timing: &Timing,
    ) -> Result<u64, SimError> {
        let Some(state) = self.store.state_of(addr) else {
            return Ok(0);
        };
        let flush = match self.protocol {
            Protocol::Mesi => match (state, op) {
                (BlockState::Shared, BusOp::Rd) => 0,
                (BlockState::Shared, BusOp::RdX) => {
                    self.invalidate(addr)?;
                    0
                }
                // A clean exclusive copy answers a read without a writeback.
                (BlockState::Exclusive, BusOp::Rd) => {
                    self.set_state(addr, BlockState::Shared)?;
                    0
                }
                (BlockState::Exclusive, BusOp::RdX) => {
                    self.invalidate(addr)?;
                    timing.flush
                }
                (BlockState::Modified, BusOp::Rd) => {
                    self.set_state(addr, BlockState::Shared)?;
                    timing.flush
                }
                (BlockState::Modified, BusOp::RdX) => {
                    self.invalidate(addr)?;
                    timing.flush
                }
                (s, _) => return Err(self.illegal("snoop", op.name(), addr, s)),
            },
            Protocol::Dragon => match (state, op) {
                (BlockState::Exclusive, BusOp::Rd) => {
                    self.set_state(addr, BlockState::SharedClean)?;
                    0
                }
                (BlockState::SharedClean, BusOp::Rd | BusOp::Upd) => 0,
                (BlockState::SharedModified, BusOp::Rd) => timing.flush,
                (BlockState::SharedModified, BusOp::Upd) => {
                    self.set_state(addr, BlockState::SharedClean)?;
                    0
                }
                (BlockState::Modified, BusOp::Rd) => {
                    self.set_state(addr, BlockState::SharedModified)?;
                    0
                }
                (s, _) => return Err(self.illegal("snoop", op.name(), addr, s)),
            },
        };
        if flush > 0 {
            debug!(cache = self.id, op = op.name(), %addr, "snoop flush");
        }
        Ok(flush)
    }

    /// Countdown phase of one tick of stride `k`.
    pub(crate) fn tick(&mut self, k: u64) {
        if let CacheState::ResolvingRequest(t) = self.state {
            self.state = CacheState::ResolvingRequest(t.saturating_sub(k));
        }
    }

    /// End-of-tick normalisation. Returns `true` when a resolved request
    /// should release the processor.
    pub(crate) fn prepare(&mut self) -> bool {
        if self.state == CacheState::ResolvingRequest(0) {
            self.state = CacheState::Idle;
            true
        } else {
            false
        }
    }

    /// Stride contribution: the resolving residual, nothing otherwise.
    pub(crate) fn stride_bound(&self) -> Option<u64> {
        match self.state {
            CacheState::ResolvingRequest(t) => Some(t),
            CacheState::Idle | CacheState::WaitingForBus(..) => None,
        }
    }

    fn illegal(
        &self,
        entry: &'static str,
        stimulus: &'static str,
        addr: WordAddr,
        state: BlockState,
    ) -> SimError {
        SimError::IllegalTransition {
            cache: self.id,
            entry,
            stimulus,
            addr,
            state: state.name(),
        }
    }

    fn illegal_opt(
        &self,
        entry: &'static str,
        stimulus: &'static str,
        addr: WordAddr,
        state: Option<BlockState>,
    ) -> SimError {
        SimError::IllegalTransition {
            cache: self.id,
            entry,
            stimulus,
            addr,
            state: state.map_or("I", BlockState::name),
        }
    }

    fn touch(&mut self, addr: WordAddr) -> Result<(), SimError> {
        self.store
            .touch(addr)
            .map_err(|source| self.store_error(addr, source))
    }

    fn set_state(&mut self, addr: WordAddr, state: BlockState) -> Result<(), SimError> {
        self.store
            .set_state(addr, state)
            .map_err(|source| self.store_error(addr, source))
    }

    fn invalidate(&mut self, addr: WordAddr) -> Result<(), SimError> {
        self.store
            .invalidate(addr)
            .map_err(|source| self.store_error(addr, source))
    }

    fn insert(&mut self, addr: WordAddr, state: BlockState) -> Result<u64, SimError> {
        self.store
            .insert(addr, state)
            .map_err(|source| self.store_error(addr, source))
    }

    const fn store_error(
        &self,
        addr: WordAddr,
        source: crate::common::error::StoreError,
    ) -> SimError {
        SimError::Store {
            cache: self.id,
            addr,
            source,
        }
    }
}
