//! Configuration system for the coherence simulator.
//!
//! This module defines the structures that parameterize a simulation. It
//! provides:
//! 1. **Defaults:** baseline geometry and latency constants.
//! 2. **Structures:** a flat [`Config`] covering protocol, cache geometry
//!    and bus/memory latencies.
//! 3. **Validation:** the divisibility rules the geometry must satisfy,
//!    checked once before a run starts.
//!
//! Configuration is supplied as JSON (every field individually defaulted)
//! or assembled from CLI flags over `Config::default()`.

use std::str::FromStr;

use serde::Deserialize;

use crate::common::error::SimError;

/// Default configuration constants for the simulator.
mod defaults {
    /// Word size in bytes. Trace addresses count words of this size.
    pub const WORD_SIZE: u64 = 4;

    /// Address size in bytes, as broadcast on the bus.
    pub const ADDRESS_SIZE: u64 = 4;

    /// Main-memory latency in cycles: fetching or writing back one block.
    pub const MEM_LATENCY: u64 = 100;

    /// Cache hit latency in cycles.
    pub const CACHE_HIT_LATENCY: u64 = 1;

    /// Cycles to move one word across the bus.
    pub const BUS_WORD_TF_LATENCY: u64 = 2;

    /// Cache block size in bytes.
    pub const BLOCK_SIZE: u64 = 32;

    /// Total size of each per-core cache in bytes.
    pub const CACHE_SIZE: u64 = 4096;

    /// Set associativity of each per-core cache.
    pub const ASSOC: usize = 2;
}

/// Coherence protocol driven by every cache in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Protocol {
    /// Invalidation-based MESI with the Illinois read-miss optimisation:
    /// a read miss prefers a cache-to-cache transfer whenever any peer
    /// holds the block.
    #[default]
    #[serde(alias = "MESI")]
    Mesi,

    /// Update-based Dragon protocol (E, Sc, Sm, M): writes to shared
    /// blocks broadcast the new data instead of invalidating peers.
    Dragon,
}

impl Protocol {
    /// Human-readable protocol name, as printed in the report.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mesi => "MESI",
            Self::Dragon => "Dragon",
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mesi" => Ok(Self::Mesi),
            "dragon" => Ok(Self::Dragon),
            other => Err(format!(
                "unknown protocol '{other}' (expected 'mesi' or 'dragon')"
            )),
        }
    }
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use snoopsim_core::config::{Config, Protocol};
///
/// let config = Config::default();
/// assert_eq!(config.protocol, Protocol::Mesi);
/// assert_eq!(config.cache_size, 4096);
/// assert_eq!(config.num_sets(), 512);
/// ```
///
/// Deserializing from JSON, with unspecified fields defaulted:
///
/// ```
/// use snoopsim_core::config::{Config, Protocol};
///
/// let json = r#"{ "protocol": "Dragon", "assoc": 4 }"#;
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.protocol, Protocol::Dragon);
/// assert_eq!(config.assoc, 4);
/// assert_eq!(config.mem_latency, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Coherence protocol.
    #[serde(default)]
    pub protocol: Protocol,

    /// Word size in bytes.
    #[serde(default = "Config::default_word_size")]
    pub word_size: u64,

    /// Address size in bytes (cost of an address broadcast on the bus).
    #[serde(default = "Config::default_address_size")]
    pub address_size: u64,

    /// Memory fetch / writeback latency in cycles.
    #[serde(default = "Config::default_mem_latency")]
    pub mem_latency: u64,

    /// Cache hit latency in cycles.
    #[serde(default = "Config::default_cache_hit_latency")]
    pub cache_hit_latency: u64,

    /// Cycles per word transferred on the bus.
    #[serde(default = "Config::default_bus_word_tf_latency")]
    pub bus_word_tf_latency: u64,

    /// Cache block size in bytes.
    #[serde(default = "Config::default_block_size")]
    pub block_size: u64,

    /// Total per-core cache size in bytes.
    #[serde(default = "Config::default_cache_size")]
    pub cache_size: u64,

    /// Set associativity.
    #[serde(default = "Config::default_assoc")]
    pub assoc: usize,
}

impl Config {
    /// Returns the default word size in bytes.
    fn default_word_size() -> u64 {
        defaults::WORD_SIZE
    }

    /// Returns the default address size in bytes.
    fn default_address_size() -> u64 {
        defaults::ADDRESS_SIZE
    }

    /// Returns the default memory latency in cycles.
    fn default_mem_latency() -> u64 {
        defaults::MEM_LATENCY
    }

    /// Returns the default cache hit latency in cycles.
    fn default_cache_hit_latency() -> u64 {
        defaults::CACHE_HIT_LATENCY
    }

    /// Returns the default per-word bus transfer latency in cycles.
    fn default_bus_word_tf_latency() -> u64 {
        defaults::BUS_WORD_TF_LATENCY
    }

    /// Returns the default block size in bytes.
    fn default_block_size() -> u64 {
        defaults::BLOCK_SIZE
    }

    /// Returns the default cache size in bytes.
    fn default_cache_size() -> u64 {
        defaults::CACHE_SIZE
    }

    /// Returns the default set associativity.
    fn default_assoc() -> usize {
        defaults::ASSOC
    }

    /// Number of sets in each cache: `(CACHE_SIZE / WORD_SIZE) / ASSOC`.
    ///
    /// Only meaningful for a validated configuration.
    pub const fn num_sets(&self) -> u32 {
        (self.cache_size / self.word_size / self.assoc as u64) as u32
    }

    /// Checks the geometry rules a runnable configuration must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] when any size is zero, when
    /// `CACHE_SIZE / WORD_SIZE` is not divisible by `ASSOC`, or when
    /// `BLOCK_SIZE` is not divisible by `WORD_SIZE`.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.word_size == 0
            || self.address_size == 0
            || self.block_size == 0
            || self.cache_size == 0
            || self.assoc == 0
        {
            return Err(SimError::Config(
                "word size, address size, block size, cache size and associativity must all be non-zero"
                    .to_owned(),
            ));
        }
        if self.cache_size % self.word_size != 0
            || (self.cache_size / self.word_size) % self.assoc as u64 != 0
        {
            return Err(SimError::Config(format!(
                "cache size {} words is not divisible by associativity {}",
                self.cache_size / self.word_size,
                self.assoc
            )));
        }
        if self.block_size % self.word_size != 0 {
            return Err(SimError::Config(format!(
                "block size {} is not divisible by word size {}",
                self.block_size, self.word_size
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            word_size: defaults::WORD_SIZE,
            address_size: defaults::ADDRESS_SIZE,
            mem_latency: defaults::MEM_LATENCY,
            cache_hit_latency: defaults::CACHE_HIT_LATENCY,
            bus_word_tf_latency: defaults::BUS_WORD_TF_LATENCY,
            block_size: defaults::BLOCK_SIZE,
            cache_size: defaults::CACHE_SIZE,
            assoc: defaults::ASSOC,
        }
    }
}
