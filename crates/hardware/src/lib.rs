//! Shared-bus multiprocessor cache-coherence simulator library.
//!
//! This crate implements a cycle-accurate discrete-event simulator for a
//! multiprocessor whose per-core private caches are kept coherent over a
//! single snoopy bus:
//! 1. **Protocols:** MESI with the Illinois read-miss optimisation, and the
//!    Dragon write-update protocol.
//! 2. **Components:** processor issue machine, set-associative cache with
//!    per-set LRU recency, shared bus with grant and broadcast queues.
//! 3. **Scheduling:** variable-stride lock-step ticking of all components
//!    under one logical clock, with tick and prepare phases.
//! 4. **I/O:** per-core instruction traces, JSON-loadable configuration,
//!    and a sectioned statistics report.

/// Common types (word addresses, error taxonomy).
pub mod common;
/// Simulator configuration (defaults, protocol selection, validation).
pub mod config;
/// Hardware components: tag store, cache, processor, bus, derived timing.
pub mod core;
/// Simulation: the scheduler and trace I/O.
pub mod sim;
/// Final statistics report.
pub mod stats;

/// Top-level error type; input errors and internal invariant violations.
pub use crate::common::error::SimError;
/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::{Config, Protocol};
/// Top-level simulator; owns the processors, caches and bus side-by-side.
pub use crate::sim::simulator::Simulator;
/// Statistics report assembled from a finished simulation.
pub use crate::stats::SimReport;
