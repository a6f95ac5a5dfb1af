//! Simulator error taxonomy.
//!
//! Two categories with very different meanings:
//! 1. **Input errors** (trace I/O, trace syntax, configuration) are
//!    recoverable in the sense that they are reported once and the
//!    simulation never starts.
//! 2. **Internal invariant violations** (absent store entry, duplicate tag,
//!    illegal protocol transition, stalled scheduler) indicate a simulator
//!    bug; they halt the run with a diagnostic naming the component, the
//!    address and the state involved.

use std::path::PathBuf;

use thiserror::Error;

use super::addr::WordAddr;

/// Failures of the raw tag store.
///
/// The owning cache wraps these with its id and the address involved; see
/// [`SimError::Store`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// `set_state` or `touch` was called for an address with no stored entry.
    #[error("no stored entry for the address")]
    NotPresent,

    /// `insert` was called for a tag already present in the target set.
    #[error("tag already present in the target set")]
    AlreadyPresent,
}

/// Top-level simulator error.
#[derive(Debug, Error)]
pub enum SimError {
    /// A trace file (or trace directory) could not be read.
    #[error("could not read {}: {source}", path.display())]
    TraceIo {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A trace line did not parse.
    #[error("trace file {}, line {line}: {reason}", path.display())]
    TraceParse {
        /// Trace file containing the offending line.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// Trace discovery found no matching files.
    #[error("no trace files matching {prefix}_<pid>.data under {}", dir.display())]
    NoTraceFiles {
        /// Directory that was searched.
        dir: PathBuf,
        /// File-name prefix that was required.
        prefix: String,
    },

    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A tag-store operation hit an entry in an impossible condition.
    #[error("cache {cache}: {source} (address {addr})")]
    Store {
        /// Cache the store belongs to.
        cache: usize,
        /// Address of the failing operation.
        addr: WordAddr,
        /// The underlying store failure.
        source: StoreError,
    },

    /// A protocol state machine was driven with a stimulus it rules out.
    #[error(
        "cache {cache}: {entry} {stimulus} at {addr} in state {state} has no legal transition"
    )]
    IllegalTransition {
        /// Cache whose state machine was misdriven.
        cache: usize,
        /// Entry point: `"request"`, `"bus grant"` or `"snoop"`.
        entry: &'static str,
        /// The stimulus delivered (`PrRead`, `BusUpd`, ...).
        stimulus: &'static str,
        /// Address of the block involved.
        addr: WordAddr,
        /// Mnemonic of the block state at the time (`I`, `M`, `Sc`, ...).
        state: &'static str,
    },

    /// The bus granted a cache that had no queued request.
    #[error("cache {cache}: bus grant delivered with no request outstanding")]
    SpuriousGrant {
        /// Cache that received the grant.
        cache: usize,
    },

    /// No component could bound the stride while processors remain.
    #[error("scheduler stalled at cycle {cycle}: no component can make progress")]
    Stalled {
        /// Cycle count at the time of the stall.
        cycle: u64,
    },
}
