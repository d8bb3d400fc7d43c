//! Privilege levels and the access mask they compose into.
//!
//! `Privilege` is the ordered chain from spec §3: `NONE < AUTH <
//! COMPARE < SEARCH < READ < WRITE_ADD < WRITE_DEL < WRITE < MANAGE`.
//! Each level maps to a bit in [`AccessMask`]; granting a level
//! cumulatively grants every weaker level below it in the chain
//! (`Privilege::cumulative_bits`), which is what lets
//! `AccessMask::grants` do a single containment check.

use serde::Serialize;
use std::cmp::Ordering;

/// A single point in the ordered privilege chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Privilege {
    None,
    Auth,
    Compare,
    Search,
    Read,
    WriteAdd,
    WriteDel,
    Write,
    Manage,
}

impl Privilege {
    /// Ordinal position in the chain, used only for `Ord`/`PartialOrd`.
    /// Not the same thing as the mask bits two privileges compose to —
    /// `WriteAdd` and `WriteDel` are adjacent ordinals but their masks
    /// differ by one bit (see [`Privilege::cumulative_bits`]).
    const fn ordinal(self) -> u8 {
        match self {
            Privilege::None => 0,
            Privilege::Auth => 1,
            Privilege::Compare => 2,
            Privilege::Search => 3,
            Privilege::Read => 4,
            Privilege::WriteAdd => 5,
            Privilege::WriteDel => 6,
            Privilege::Write => 7,
            Privilege::Manage => 8,
        }
    }

    /// The bits this privilege implies when granted, cumulative down
    /// the chain. `Read` implies `Search`, `Compare` and `Auth` too;
    /// `WriteDel` implies `WriteAdd` as well as everything `Read`
    /// implies. `Write` is literally `WriteAdd | WriteDel` (spec §3).
    pub fn cumulative_bits(self) -> AccessMask {
        match self {
            Privilege::None => AccessMask::NONE,
            Privilege::Auth => AccessMask::AUTH,
            Privilege::Compare => Privilege::Auth.cumulative_bits().union(AccessMask::COMPARE),
            Privilege::Search => Privilege::Compare.cumulative_bits().union(AccessMask::SEARCH),
            Privilege::Read => Privilege::Search.cumulative_bits().union(AccessMask::READ),
            Privilege::WriteAdd => Privilege::Read.cumulative_bits().union(AccessMask::WRITE_ADD),
            Privilege::WriteDel => Privilege::WriteAdd.cumulative_bits().union(AccessMask::WRITE_DEL),
            Privilege::Write => Privilege::WriteDel.cumulative_bits(),
            Privilege::Manage => Privilege::Write.cumulative_bits().union(AccessMask::MANAGE),
        }
    }
}

impl PartialOrd for Privilege {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Privilege {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal().cmp(&other.ordinal())
    }
}

/// A requested privilege plus the modifier flags spec §3 describes.
#[derive(Debug, Clone, Copy)]
pub struct RequestedAccess {
    pub privilege: Privilege,
    /// When set, the caller marked this as an authentication probe
    /// (e.g. a bind-time check), which downgrades SEARCH/READ requests
    /// to AUTH (spec §3: "authentication context converts SEARCH/READ
    /// into AUTH when the caller marks the operation as an auth check").
    pub is_auth_check: bool,
}

impl RequestedAccess {
    pub fn new(privilege: Privilege) -> Self {
        Self {
            privilege,
            is_auth_check: false,
        }
    }

    pub fn auth_check(privilege: Privilege) -> Self {
        Self {
            privilege,
            is_auth_check: true,
        }
    }

    /// The privilege actually tested against the final mask, after the
    /// auth-check modifier is applied.
    pub fn effective_privilege(&self) -> Privilege {
        if self.is_auth_check
            && matches!(self.privilege, Privilege::Search | Privilege::Read)
        {
            Privilege::Auth
        } else {
            self.privilege
        }
    }
}

/// The running privilege bitmask, confined to the seven privilege bits
/// (spec §3's "privilege bit space"). `ADDITIVE`/`SUBTRACTIVE` are
/// modeled as [`MaskEffect`] variants rather than bits on this type, so
/// the "never simultaneously set" invariant of spec §8 holds by
/// construction instead of by convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AccessMask {
    bits: u16,
}

impl AccessMask {
    pub const NONE: Self = Self { bits: 0 };
    pub const AUTH: Self = Self { bits: 1 << 0 };
    pub const COMPARE: Self = Self { bits: 1 << 1 };
    pub const SEARCH: Self = Self { bits: 1 << 2 };
    pub const READ: Self = Self { bits: 1 << 3 };
    pub const WRITE_ADD: Self = Self { bits: 1 << 4 };
    pub const WRITE_DEL: Self = Self { bits: 1 << 5 };
    pub const MANAGE: Self = Self { bits: 1 << 6 };

    /// All bits a mask is allowed to carry; anything outside this is a
    /// hygiene violation (spec §8).
    const PRIV_BIT_SPACE: u16 = Self::AUTH.bits
        | Self::COMPARE.bits
        | Self::SEARCH.bits
        | Self::READ.bits
        | Self::WRITE_ADD.bits
        | Self::WRITE_DEL.bits
        | Self::MANAGE.bits;

    pub const fn empty() -> Self {
        Self::NONE
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            bits: (self.bits | other.bits) & Self::PRIV_BIT_SPACE,
        }
    }

    pub fn minus(self, other: Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    pub fn intersect(self, other: Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    pub fn contains(self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// True iff every set bit lies within the declared privilege bit
    /// space (spec §8 "Mask hygiene").
    pub fn is_well_formed(self) -> bool {
        self.bits & !Self::PRIV_BIT_SPACE == 0
    }

    /// Does this mask grant `requested`, after auth-check downgrading?
    pub fn grants(self, requested: &RequestedAccess) -> bool {
        self.contains(requested.effective_privilege().cumulative_bits())
    }
}

/// How a who-clause's configured privilege combines with the running
/// mask (spec §4.4). The three variants are mutually exclusive by
/// construction, which is what keeps ADDITIVE/SUBTRACTIVE from ever
/// co-existing in a single effect.
#[derive(Debug, Clone, Copy)]
pub enum MaskEffect {
    /// `+<privs>`: OR bits into the running mask.
    Additive(AccessMask),
    /// `-<privs>`: clear bits from the running mask.
    Subtractive(AccessMask),
    /// `=<privs>`: replace the running mask outright.
    Absolute(AccessMask),
}

impl MaskEffect {
    /// Apply this effect to `running`, per spec §4.4.
    pub fn apply(self, running: AccessMask) -> AccessMask {
        match self {
            MaskEffect::Additive(m) => running.union(m),
            MaskEffect::Subtractive(m) => running.minus(m),
            MaskEffect::Absolute(m) => m,
        }
    }

    /// The privilege level configured on this effect, independent of
    /// its +/-/= sign. The dynamic-ACI dimension gates on this: it only
    /// evaluates when the clause's own declared level already grants
    /// the requested privilege (spec §4.3).
    pub fn declared_mask(self) -> AccessMask {
        match self {
            MaskEffect::Additive(m) | MaskEffect::Subtractive(m) | MaskEffect::Absolute(m) => m,
        }
    }
}

/// What to do after a who-clause's effect has been applied (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlVerdict {
    Continue,
    Break,
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_bits_are_downward_inclusive() {
        assert!(Privilege::Read
            .cumulative_bits()
            .contains(AccessMask::AUTH));
        assert!(Privilege::Read
            .cumulative_bits()
            .contains(AccessMask::SEARCH));
        assert!(!Privilege::Read
            .cumulative_bits()
            .contains(AccessMask::WRITE_ADD));
    }

    #[test]
    fn write_del_implies_write_add() {
        assert!(Privilege::WriteDel
            .cumulative_bits()
            .contains(AccessMask::WRITE_ADD));
    }

    #[test]
    fn write_is_add_and_del() {
        let write = Privilege::Write.cumulative_bits();
        assert!(write.contains(AccessMask::WRITE_ADD));
        assert!(write.contains(AccessMask::WRITE_DEL));
    }

    #[test]
    fn auth_only_mask_does_not_grant_read() {
        let mask = MaskEffect::Absolute(Privilege::Auth.cumulative_bits()).apply(AccessMask::NONE);
        assert!(!mask.grants(&RequestedAccess::new(Privilege::Read)));
        assert!(mask.grants(&RequestedAccess::new(Privilege::Auth)));
    }

    #[test]
    fn auth_check_downgrades_read_request() {
        let mask = Privilege::Auth.cumulative_bits();
        assert!(mask.grants(&RequestedAccess::auth_check(Privilege::Read)));
    }

    #[test]
    fn well_formed_rejects_stray_bits() {
        let bad = AccessMask { bits: 1 << 9 };
        assert!(!bad.is_well_formed());
        assert!(AccessMask::READ.is_well_formed());
    }

    #[test]
    fn subtractive_then_additive_never_reintroduce_cleared_bit() {
        let running = Privilege::Write.cumulative_bits();
        let after_sub = MaskEffect::Subtractive(AccessMask::WRITE_DEL).apply(running);
        assert!(!after_sub.contains(AccessMask::WRITE_DEL));
        assert!(after_sub.contains(AccessMask::WRITE_ADD));
    }
}
