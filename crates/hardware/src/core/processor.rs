//! Processor: instruction issue and the per-core timing state machine.
//!
//! A processor walks its instruction stream under the scheduler's clock.
//! Memory operations are handed to the local cache and the processor idles
//! in `WaitingForCache` until the cache posts `ReadyToProceed`; the explicit
//! `ReadyToProceed` state exists so that, in the cycle a request finishes,
//! the processor observes the completion first and issues again only on the
//! next cycle.

use crate::common::addr::WordAddr;

/// One trace instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    /// Load from a word address.
    Read(WordAddr),
    /// Store to a word address.
    Write(WordAddr),
    /// Non-memory work consuming the given number of cycles.
    Other(u64),
}

/// Processor execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    /// Will issue the next instruction this cycle.
    Ready,
    /// Busy with non-memory work; the residual cycle count ticks down.
    ExecutingOther(u64),
    /// Stalled on an outstanding cache request.
    WaitingForCache,
    /// The cache request completed this cycle; issues again next cycle.
    ReadyToProceed,
    /// Instruction stream exhausted.
    Done,
}

/// Per-core counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcStats {
    /// Cycles this core has been clocked (excludes the final bus drain).
    pub cycles: u64,
    /// Cycles attributed to `Other` instructions.
    pub compute_cycles: u64,
    /// Loads issued.
    pub loads: u64,
    /// Stores issued.
    pub stores: u64,
    /// Cycles spent waiting on the cache or after `Done`.
    pub idle_cycles: u64,
}

/// A processor: an instruction stream plus the issue state machine.
#[derive(Debug)]
pub struct Processor {
    id: usize,
    program: Vec<Instr>,
    pc: usize,
    /// Current execution state.
    pub state: ProcState,
    /// Per-core counters.
    pub stats: ProcStats,
}

impl Processor {
    /// Creates a processor over its instruction stream. Initial state is
    /// `Ready`; an empty stream becomes `Done` at the first tick.
    pub fn new(id: usize, program: Vec<Instr>) -> Self {
        Self {
            id,
            program,
            pc: 0,
            state: ProcState::Ready,
            stats: ProcStats::default(),
        }
    }

    /// This processor's id (also its arbitration priority, lowest first).
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Whether the instruction stream is exhausted.
    pub fn exhausted(&self) -> bool {
        self.pc >= self.program.len()
    }

    /// Consumes and returns the next instruction, if any.
    pub(crate) fn fetch(&mut self) -> Option<Instr> {
        let instr = self.program.get(self.pc).copied();
        if instr.is_some() {
            self.pc += 1;
        }
        instr
    }

    /// Posts request completion; the processor issues again next cycle.
    pub fn proceed(&mut self) {
        self.state = ProcState::ReadyToProceed;
    }

    /// Time-accounting phase of one tick of stride `k`.
    ///
    /// Returns `true` when the processor is `Ready` and the scheduler must
    /// run the issue step (only possible when `k == 1`).
    pub(crate) fn tick(&mut self, k: u64) -> bool {
        self.stats.cycles += k;
        match self.state {
            ProcState::ExecutingOther(n) => {
                self.state = ProcState::ExecutingOther(n.saturating_sub(k));
                false
            }
            ProcState::WaitingForCache | ProcState::ReadyToProceed | ProcState::Done => {
                self.stats.idle_cycles += k;
                false
            }
            ProcState::Ready => true,
        }
    }

    /// End-of-tick normalisation.
    pub(crate) fn prepare(&mut self) {
        if matches!(
            self.state,
            ProcState::ReadyToProceed | ProcState::ExecutingOther(0)
        ) {
            self.state = ProcState::Ready;
        }
        if self.state == ProcState::Ready && self.exhausted() {
            self.state = ProcState::Done;
        }
    }

    /// Stride contribution: residual work if timed, 1 if about to issue,
    /// nothing while waiting on another component.
    pub(crate) fn stride_bound(&self) -> Option<u64> {
        match self.state {
            ProcState::Ready => Some(1),
            ProcState::ExecutingOther(n) => Some(n),
            ProcState::WaitingForCache | ProcState::ReadyToProceed | ProcState::Done => None,
        }
    }
}
