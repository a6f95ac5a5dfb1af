//! Simulation: the scheduler and trace I/O.
//!
//! 1. **Scheduler:** [`simulator::Simulator`] owns the processors, caches
//!    and bus side-by-side and advances them in lock-step phases.
//! 2. **Traces:** [`trace`] discovers `<prefix>_<pid>.data` files and
//!    parses them into per-core instruction streams.

/// Top-level simulator and its main loop.
pub mod simulator;
/// Trace discovery and parsing.
pub mod trace;
