//! Coherence vocabulary: block states, memory events, bus transactions.

/// Coherence state of a block that is present in a cache.
///
/// The Invalid state is represented by absence: a block with no stored
/// entry is in state I, and stores never hold I entries. `Shared` belongs
/// to MESI; `SharedClean` and `SharedModified` belong to Dragon;
/// `Exclusive` and `Modified` are used by both protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockState {
    /// Clean, possibly held by several caches (MESI).
    Shared,
    /// Clean, sole copy.
    Exclusive,
    /// Dirty, sole copy.
    Modified,
    /// Clean shared copy (Dragon).
    SharedClean,
    /// Dirty shared copy (Dragon); responsible for the eventual writeback.
    SharedModified,
}

impl BlockState {
    /// Whether evicting a block in this state writes it back to memory.
    pub const fn is_dirty(self) -> bool {
        matches!(self, Self::Modified | Self::SharedModified)
    }

    /// Whether a hit on this state counts as a private access (E/M) rather
    /// than a shared one (S/Sc/Sm).
    pub const fn is_private(self) -> bool {
        matches!(self, Self::Exclusive | Self::Modified)
    }

    /// Short mnemonic used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Shared => "S",
            Self::Exclusive => "E",
            Self::Modified => "M",
            Self::SharedClean => "Sc",
            Self::SharedModified => "Sm",
        }
    }
}

/// Processor-side memory event delivered to the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemOp {
    /// `PrRead`: a load.
    Read,
    /// `PrWrite`: a store.
    Write,
}

impl MemOp {
    /// Diagnostic name (`PrRead` / `PrWrite`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Read => "PrRead",
            Self::Write => "PrWrite",
        }
    }
}

/// Snoopy-bus transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    /// `BusRd`: read-shared fetch.
    Rd,
    /// `BusRdX`: read-for-ownership; invalidates other copies (MESI).
    RdX,
    /// `BusUpd`: shared-line update broadcast (Dragon).
    Upd,
}

impl BusOp {
    /// Diagnostic name (`BusRd` / `BusRdX` / `BusUpd`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rd => "BusRd",
            Self::RdX => "BusRdX",
            Self::Upd => "BusUpd",
        }
    }
}
