//! Final statistics report.
//!
//! This module assembles and prints the metrics of a finished simulation:
//! 1. **Summary:** total cycles, host seconds, simulated frequency.
//! 2. **Cores:** per-core cycles, compute cycles, loads/stores, idle
//!    cycles, hit/miss counts and miss rate, private/shared accesses.
//! 3. **Bus:** aggregate traffic in bytes and the invalidation-or-update
//!    count.

use crate::sim::simulator::Simulator;

/// Per-core row of the final report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoreReport {
    /// Cycles this core was clocked (excludes the final bus drain).
    pub cycles: u64,
    /// Cycles attributed to `Other` instructions.
    pub compute_cycles: u64,
    /// Loads issued.
    pub loads: u64,
    /// Stores issued.
    pub stores: u64,
    /// Cycles spent waiting on the cache or after completion.
    pub idle_cycles: u64,
    /// Cache hits.
    pub hits: u64,
    /// Cache misses.
    pub misses: u64,
    /// Misses over total accesses, in [0, 1].
    pub miss_rate: f64,
    /// Hits on blocks held in E or M.
    pub private_accesses: u64,
    /// Hits on blocks held in S, Sc or Sm.
    pub shared_accesses: u64,
}

/// Full simulation report.
#[derive(Debug, Clone, PartialEq)]
pub struct SimReport {
    /// Protocol name ("MESI" or "Dragon").
    pub protocol: &'static str,
    /// Total execution cycles, including the final bus drain.
    pub total_cycles: u64,
    /// One row per core.
    pub cores: Vec<CoreReport>,
    /// Bytes moved over the bus.
    pub traffic_bytes: u64,
    /// Peer copies invalidated or updated by writes to shared blocks.
    pub invalidations_or_updates: u64,
    /// Host wall-clock seconds of the run (0 when not measured).
    pub host_seconds: f64,
}

/// Section names for selective report output.
///
/// Valid identifiers: `"summary"`, `"cores"`, `"bus"`. Pass an empty slice
/// to [`SimReport::print_sections`] to print everything.
pub const REPORT_SECTIONS: &[&str] = &["summary", "cores", "bus"];

impl SimReport {
    /// Builds the report from a finished simulator.
    ///
    /// `host_seconds` is measured by the caller so the library itself
    /// stays deterministic; pass 0.0 when it does not matter.
    pub fn from_simulator(sim: &Simulator, host_seconds: f64) -> Self {
        let cores = sim
            .procs
            .iter()
            .zip(&sim.caches)
            .map(|(proc, cache)| {
                let accesses = cache.stats.hits + cache.stats.misses;
                CoreReport {
                    cycles: proc.stats.cycles,
                    compute_cycles: proc.stats.compute_cycles,
                    loads: proc.stats.loads,
                    stores: proc.stats.stores,
                    idle_cycles: proc.stats.idle_cycles,
                    hits: cache.stats.hits,
                    misses: cache.stats.misses,
                    miss_rate: if accesses == 0 {
                        0.0
                    } else {
                        cache.stats.misses as f64 / accesses as f64
                    },
                    private_accesses: cache.stats.private_accesses,
                    shared_accesses: cache.stats.shared_accesses,
                }
            })
            .collect();
        Self {
            protocol: sim.protocol.name(),
            total_cycles: sim.cycles,
            cores,
            traffic_bytes: sim.bus.traffic_bytes(),
            invalidations_or_updates: sim
                .caches
                .iter()
                .map(|c| c.stats.invalidations_or_updates)
                .sum(),
            host_seconds,
        }
    }

    /// Prints only the requested report sections to stdout.
    ///
    /// Each element of `sections` should be one of `"summary"`, `"cores"`
    /// or `"bus"`. Pass an empty slice to print all sections.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);

        if want("summary") {
            println!("\n==========================================================");
            println!("SHARED-BUS COHERENCE SIMULATION STATISTICS");
            println!("==========================================================");
            println!("protocol                 {}", self.protocol);
            println!("num_cores                {}", self.cores.len());
            println!("total_cycles             {}", self.total_cycles);
            if self.host_seconds > 0.0 {
                let khz = (self.total_cycles as f64 / self.host_seconds) / 1000.0;
                println!("host_seconds             {:.4} s", self.host_seconds);
                println!("sim_freq                 {khz:.2} kHz");
            }
            println!("----------------------------------------------------------");
        }
        if want("cores") {
            for (id, core) in self.cores.iter().enumerate() {
                println!("CORE {id}");
                println!("  cycles                 {}", core.cycles);
                println!("  compute_cycles         {}", core.compute_cycles);
                println!("  loads                  {}", core.loads);
                println!("  stores                 {}", core.stores);
                println!("  idle_cycles            {}", core.idle_cycles);
                println!(
                    "  hits: {:<12} misses: {:<12} miss_rate: {:.2}%",
                    core.hits,
                    core.misses,
                    core.miss_rate * 100.0
                );
                println!(
                    "  private_accesses       {} / shared {}",
                    core.private_accesses, core.shared_accesses
                );
                println!("----------------------------------------------------------");
            }
        }
        if want("bus") {
            println!("BUS");
            println!("  traffic_bytes          {}", self.traffic_bytes);
            println!(
                "  invalidations_updates  {}",
                self.invalidations_or_updates
            );
        }
        println!("==========================================================");
    }

    /// Prints the full report. Equivalent to `print_sections(&[])`.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
