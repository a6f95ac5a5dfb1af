//! Set-associative tag store with LRU recency and eviction cost.
//!
//! Each set is an ordered sequence of `(tag, state)` entries: the front is
//! the least recently used entry, the back the most recently used. Invalid
//! blocks are never stored (an absent tag *is* state I), so a set holds at
//! most `assoc` live entries and no two entries share a tag.
//!
//! Associativity is single-digit in practice, so a plain ordered `Vec` per
//! set beats any balanced structure and keeps the recency order stable,
//! which determinism depends on.

use crate::common::addr::WordAddr;
use crate::common::error::StoreError;

use super::protocol::BlockState;

/// One live block: its tag and coherence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    tag: u32,
    state: BlockState,
}

/// The per-cache tag store.
#[derive(Debug, Clone)]
pub struct SetAssocStore {
    num_sets: u32,
    assoc: usize,
    flush_latency: u64,
    sets: Vec<Vec<Entry>>,
}

impl SetAssocStore {
    /// Creates an empty store with the given geometry.
    ///
    /// `flush_latency` is the cost [`Self::insert`] reports when it evicts
    /// a dirty victim.
    pub fn new(num_sets: u32, assoc: usize, flush_latency: u64) -> Self {
        Self {
            num_sets,
            assoc,
            flush_latency,
            sets: vec![Vec::with_capacity(assoc); num_sets as usize],
        }
    }

    /// Number of sets in the store.
    pub const fn num_sets(&self) -> u32 {
        self.num_sets
    }

    /// Coherence state of `addr`, or `None` for state I.
    pub fn state_of(&self, addr: WordAddr) -> Option<BlockState> {
        let tag = addr.tag(self.num_sets);
        self.sets[addr.index(self.num_sets)]
            .iter()
            .find(|e| e.tag == tag)
            .map(|e| e.state)
    }

    /// Whether the set `addr` maps to already holds `assoc` live entries.
    pub fn is_full(&self, addr: WordAddr) -> bool {
        self.sets[addr.index(self.num_sets)].len() == self.assoc
    }

    /// Overwrites the state of the entry for `addr` in place.
    ///
    /// Recency is not changed. Transitions to I go through
    /// [`Self::invalidate`] instead, since I entries are never stored.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotPresent`] when `addr` has no entry.
    pub fn set_state(&mut self, addr: WordAddr, state: BlockState) -> Result<(), StoreError> {
        let tag = addr.tag(self.num_sets);
        self.sets[addr.index(self.num_sets)]
            .iter_mut()
            .find(|e| e.tag == tag)
            .map(|e| e.state = state)
            .ok_or(StoreError::NotPresent)
    }

    /// Removes the entry for `addr` (transition to state I).
    ///
    /// # Errors
    ///
    /// [`StoreError::NotPresent`] when `addr` has no entry.
    pub fn invalidate(&mut self, addr: WordAddr) -> Result<(), StoreError> {
        let tag = addr.tag(self.num_sets);
        let set = &mut self.sets[addr.index(self.num_sets)];
        let pos = set
            .iter()
            .position(|e| e.tag == tag)
            .ok_or(StoreError::NotPresent)?;
        let _ = set.remove(pos);
        Ok(())
    }

    /// Moves the entry for `addr` to the most-recently-used position.
    ///
    /// The state is not changed.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotPresent`] when `addr` has no entry.
    pub fn touch(&mut self, addr: WordAddr) -> Result<(), StoreError> {
        let tag = addr.tag(self.num_sets);
        let set = &mut self.sets[addr.index(self.num_sets)];
        let pos = set
            .iter()
            .position(|e| e.tag == tag)
            .ok_or(StoreError::NotPresent)?;
        let entry = set.remove(pos);
        set.push(entry);
        Ok(())
    }

    /// Installs a new most-recently-used entry `(tag(addr), state)`.
    ///
    /// If the set is full the least-recently-used entry is evicted first;
    /// a dirty victim (M, or Sm in Dragon) reports the flush latency as the
    /// eviction cost, a clean one reports 0.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyPresent`] when the tag is already live in the
    /// set.
    pub fn insert(&mut self, addr: WordAddr, state: BlockState) -> Result<u64, StoreError> {
        let tag = addr.tag(self.num_sets);
        let set = &mut self.sets[addr.index(self.num_sets)];
        if set.iter().any(|e| e.tag == tag) {
            return Err(StoreError::AlreadyPresent);
        }
        let mut evict_cost = 0;
        if set.len() == self.assoc {
            let victim = set.remove(0);
            if victim.state.is_dirty() {
                evict_cost = self.flush_latency;
            }
        }
        set.push(Entry { tag, state });
        Ok(evict_cost)
    }

    /// Iterates over every live entry as `(set index, tag, state)`.
    ///
    /// Entries within a set come out in LRU-to-MRU order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, u32, BlockState)> + '_ {
        self.sets
            .iter()
            .enumerate()
            .flat_map(|(index, set)| set.iter().map(move |e| (index, e.tag, e.state)))
    }
}
