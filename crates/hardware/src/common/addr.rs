//! Word-address type and set/tag decomposition.
//!
//! The simulated memory is word-addressed, never byte-addressed: a trace
//! value of `0x10` names the sixteenth word of memory, regardless of the
//! configured word size. Set index and tag are derived against the cache
//! geometry's set count, so the same address type serves every cache.

use std::fmt;

/// A word address in the simulated address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WordAddr(pub u32);

impl WordAddr {
    /// Creates a new word address from a raw value.
    #[inline]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Returns the raw address value.
    #[inline]
    pub const fn val(self) -> u32 {
        self.0
    }

    /// Returns the cache set this address maps to.
    #[inline]
    pub const fn index(self, num_sets: u32) -> usize {
        (self.0 % num_sets) as usize
    }

    /// Returns the tag stored alongside the block state for this address.
    #[inline]
    pub const fn tag(self, num_sets: u32) -> u32 {
        self.0 / num_sets
    }
}

impl fmt::Display for WordAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
