//! Top-level simulator: all components side-by-side under one clock.
//!
//! The scheduler owns the processors, caches and bus in parallel arrays
//! and advances them in a fixed per-cycle order: every processor ticks,
//! then every cache, then the bus; the cycle counter advances; then the
//! bus, caches and processors run their prepare phases. The order is
//! mandatory: a request issued by a processor is observed by its cache in
//! the same cycle, and a request acquired by a cache is observed by the
//! bus in the same cycle, but a bus grant never short-circuits back into a
//! processor action until the next cycle (via `ReadyToProceed`).
//!
//! Instead of ticking cycle by cycle, the loop advances by a variable
//! stride: the minimum residual over every timed component, clamped to 1
//! whenever some component can act now. Components that merely wait
//! contribute no bound, so long stretches where everything counts down are
//! skipped in one step.

use tracing::{debug, trace};

use crate::common::addr::WordAddr;
use crate::common::error::SimError;
use crate::config::{Config, Protocol};
use crate::core::bus::{Bus, BusState, Signal};
use crate::core::cache::{Cache, CacheState, PrOutcome};
use crate::core::processor::{Instr, ProcState, Processor};
use crate::core::protocol::{BlockState, BusOp, MemOp};
use crate::core::store::SetAssocStore;
use crate::core::timing::Timing;

/// The coupled Processor/Cache/Bus system plus the shared clock.
#[derive(Debug)]
pub struct Simulator {
    /// One processor per trace; index = processor id.
    pub procs: Vec<Processor>,
    /// One private cache per processor, same index.
    pub caches: Vec<Cache>,
    /// The shared bus.
    pub bus: Bus,
    /// Derived latencies.
    pub timing: Timing,
    /// Protocol every cache runs.
    pub protocol: Protocol,
    /// Global cycle counter; includes the final bus drain after [`run`].
    ///
    /// [`run`]: Self::run
    pub cycles: u64,
}

impl Simulator {
    /// Builds a simulator running one program per core.
    ///
    /// # Errors
    ///
    /// [`SimError::Config`] when the geometry fails validation.
    pub fn new(config: &Config, programs: Vec<Vec<Instr>>) -> Result<Self, SimError> {
        config.validate()?;
        let timing = Timing::from_config(config);
        let num_sets = config.num_sets();
        let caches = (0..programs.len())
            .map(|id| {
                Cache::new(
                    id,
                    config.protocol,
                    SetAssocStore::new(num_sets, config.assoc, timing.flush),
                )
            })
            .collect();
        let procs = programs
            .into_iter()
            .enumerate()
            .map(|(id, program)| Processor::new(id, program))
            .collect();
        Ok(Self {
            procs,
            caches,
            bus: Bus::new(),
            timing,
            protocol: config.protocol,
            cycles: 0,
        })
    }

    /// Number of simulated cores.
    pub fn num_cores(&self) -> usize {
        self.procs.len()
    }

    /// Whether every processor has finished its instruction stream.
    pub fn done(&self) -> bool {
        self.procs.iter().all(|p| p.state == ProcState::Done)
    }

    /// Runs the simulation to completion and drains the bus.
    ///
    /// # Errors
    ///
    /// Propagates internal invariant violations; see [`SimError`].
    pub fn run(&mut self) -> Result<(), SimError> {
        while self.step()? {}
        if let BusState::Busy(t) = self.bus.state {
            self.cycles += t;
        }
        Ok(())
    }

    /// Advances one scheduler iteration (one stride of the clock).
    ///
    /// Returns `Ok(true)` while work remains, `Ok(false)` once every
    /// processor is done; in that case the bus may still be busy and
    /// [`run`] accounts for the drain.
    ///
    /// [`run`]: Self::run
    ///
    /// # Errors
    ///
    /// Propagates internal invariant violations; see [`SimError`].
    pub fn step(&mut self) -> Result<bool, SimError> {
        if self.done() {
            return Ok(false);
        }
        let k = self.stride()?;
        trace!(cycle = self.cycles, k, "tick");

        for i in 0..self.procs.len() {
            if self.procs[i].tick(k) {
                self.issue(i)?;
            }
        }
        for cache in &mut self.caches {
            cache.tick(k);
        }
        self.bus_tick(k)?;
        self.cycles += k;

        self.bus.prepare();
        for i in 0..self.caches.len() {
            if self.caches[i].prepare() {
                self.procs[i].proceed();
            }
        }
        for proc in &mut self.procs {
            proc.prepare();
        }
        Ok(!self.done())
    }

    /// Stride for this iteration: the minimum residual over all timed
    /// components, at least 1.
    fn stride(&self) -> Result<u64, SimError> {
        self.procs
            .iter()
            .filter_map(Processor::stride_bound)
            .chain(self.caches.iter().filter_map(Cache::stride_bound))
            .chain(self.bus.stride_bound())
            .min()
            .map(|k| k.max(1))
            .ok_or(SimError::Stalled { cycle: self.cycles })
    }

    /// Issue step for a `Ready` processor. Zero-cost `Other` instructions
    /// chain within the tick; an exhausted stream parks the processor in
    /// `Done`.
    fn issue(&mut self, i: usize) -> Result<(), SimError> {
        loop {
            let Some(instr) = self.procs[i].fetch() else {
                self.procs[i].state = ProcState::Done;
                return Ok(());
            };
            match instr {
                Instr::Other(t) => {
                    self.procs[i].stats.compute_cycles += t;
                    if t > 0 {
                        self.procs[i].state = ProcState::ExecutingOther(t - 1);
                        return Ok(());
                    }
                }
                Instr::Read(addr) => {
                    self.procs[i].stats.loads += 1;
                    return self.mem_request(i, MemOp::Read, addr);
                }
                Instr::Write(addr) => {
                    self.procs[i].stats.stores += 1;
                    return self.mem_request(i, MemOp::Write, addr);
                }
            }
        }
    }

    /// Hands a memory operation to the core's cache.
    fn mem_request(&mut self, i: usize, op: MemOp, addr: WordAddr) -> Result<(), SimError> {
        self.procs[i].state = ProcState::WaitingForCache;
        let peers = self.peers_holding(i, addr);
        let outcome = self.caches[i].pr_sig(op, addr, peers, &mut self.bus, &self.timing)?;
        if outcome == PrOutcome::Proceed {
            self.procs[i].proceed();
        }
        Ok(())
    }

    /// Number of caches other than `i` holding `addr` in a non-I state.
    fn peers_holding(&self, i: usize, addr: WordAddr) -> usize {
        self.caches
            .iter()
            .enumerate()
            .filter(|(j, c)| *j != i && c.store.state_of(addr).is_some())
            .count()
    }

    /// Bus phase of one tick: count down when busy; when idle, start the
    /// next transaction, queued broadcasts before queued grants.
    fn bus_tick(&mut self, k: u64) -> Result<(), SimError> {
        if matches!(self.bus.state, BusState::Busy(_)) {
            self.bus.tick(k);
            return Ok(());
        }
        if let Some(sig) = self.bus.next_signal() {
            self.run_broadcast(sig)
        } else if let Some(cache) = self.bus.next_grant() {
            self.run_grant(cache)
        } else {
            Ok(())
        }
    }

    /// Runs one broadcast transaction: charge the address send, snoop every
    /// peer synchronously, and commit the assembled busy time.
    fn run_broadcast(&mut self, sig: Signal) -> Result<(), SimError> {
        self.bus.add_traffic(match sig.op {
            BusOp::Upd => self.timing.block_bytes,
            BusOp::Rd | BusOp::RdX => self.timing.address_bytes,
        });
        self.bus.add_busy_time(self.timing.ask_other_caches);
        for j in 0..self.caches.len() {
            if j == sig.origin {
                continue;
            }
            let flush = self.caches[j].snoop(sig.op, sig.addr, &self.timing)?;
            if flush > 0 {
                self.bus.add_traffic(self.timing.block_bytes);
            }
            self.bus.add_busy_time(flush);
        }
        // The processing cycle is the first cycle of the transaction.
        let busy = self.bus.take_pending_busy_time().saturating_sub(1);
        self.bus.state = BusState::Busy(busy);
        debug!(
            origin = sig.origin,
            op = sig.op.name(),
            addr = %sig.addr,
            busy,
            "broadcast"
        );
        Ok(())
    }

    /// Runs one grant: the queued cache computes its transaction and the
    /// bus stays busy for the returned residual.
    fn run_grant(&mut self, cache: usize) -> Result<(), SimError> {
        let CacheState::WaitingForBus(_, addr) = self.caches[cache].state else {
            return Err(SimError::SpuriousGrant { cache });
        };
        let peers = self.peers_holding(cache, addr);
        let residual = self.caches[cache].bus_ready(peers, &mut self.bus, &self.timing)?;
        self.bus.state = BusState::Busy(residual);
        Ok(())
    }

    /// Checks combined per-block state legality across all caches.
    ///
    /// At most one cache may hold a block in E or M, an exclusive holder
    /// rules out every other copy, at most one Sm copy may exist, and no
    /// cache may hold a state foreign to the configured protocol. The check
    /// is only meaningful at quiescent points (while a broadcast is still
    /// queued, a transaction's side effects are in flight and mixed
    /// combinations are expected), so it reports `Ok` early in that case.
    ///
    /// # Errors
    ///
    /// A description of the offending block on violation.
    pub fn check_block_states(&self) -> Result<(), String> {
        if self.bus.signals_pending() {
            return Ok(());
        }
        let mut blocks: std::collections::HashMap<(usize, u32), Vec<BlockState>> =
            std::collections::HashMap::new();
        for cache in &self.caches {
            for (index, tag, state) in cache.store.entries() {
                blocks.entry((index, tag)).or_default().push(state);
            }
        }
        for ((index, tag), states) in &blocks {
            let exclusive = states
                .iter()
                .filter(|s| matches!(s, BlockState::Exclusive | BlockState::Modified))
                .count();
            let shared_modified = states
                .iter()
                .filter(|s| matches!(s, BlockState::SharedModified))
                .count();
            let foreign = states.iter().any(|s| match self.protocol {
                Protocol::Mesi => matches!(
                    s,
                    BlockState::SharedClean | BlockState::SharedModified
                ),
                Protocol::Dragon => matches!(s, BlockState::Shared),
            });
            let legal = !foreign
                && shared_modified <= 1
                && (exclusive == 0 || (exclusive == 1 && states.len() == 1));
            if !legal {
                let names: Vec<&str> = states.iter().map(|s| s.name()).collect();
                return Err(format!(
                    "block (set {index}, tag {tag:#x}) held as {{{}}}",
                    names.join(", ")
                ));
            }
        }
        Ok(())
    }
}
