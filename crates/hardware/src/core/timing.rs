//! Latencies derived from the configured geometry.
//!
//! Every latency the components charge is computed once, up front, from
//! the word/address/block sizes and the base bus and memory latencies.

use crate::config::Config;

/// Derived latency and transfer-size constants, all in cycles and bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Cycles for a cache hit.
    pub cache_hit: u64,
    /// Cycles to fetch one block from memory.
    pub mem_fetch: u64,
    /// Cycles to write one dirty block back to memory.
    pub flush: u64,
    /// Cycles to broadcast an address to the other caches:
    /// `BUS_WORD_TF_LAT * ADDRESS_SIZE / WORD_SIZE`.
    pub ask_other_caches: u64,
    /// Cycles for a cache-to-cache block transfer:
    /// `BUS_WORD_TF_LAT * BLOCK_SIZE / WORD_SIZE`.
    pub cache_to_cache: u64,
    /// Bytes moved by a block transfer, flush or update payload.
    pub block_bytes: u64,
    /// Bytes moved by an address broadcast.
    pub address_bytes: u64,
}

impl Timing {
    /// Derives all constants from a validated configuration.
    pub const fn from_config(config: &Config) -> Self {
        Self {
            cache_hit: config.cache_hit_latency,
            mem_fetch: config.mem_latency,
            flush: config.mem_latency,
            ask_other_caches: config.bus_word_tf_latency * config.address_size
                / config.word_size,
            cache_to_cache: config.bus_word_tf_latency * config.block_size / config.word_size,
            block_bytes: config.block_size,
            address_bytes: config.address_size,
        }
    }
}
