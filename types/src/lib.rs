//! Core domain types for Reforge.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod decline;
mod ids;
mod outcome;
mod record;

pub use decline::{ActionDeclined, IdentityError};
pub use ids::{InstanceIdentity, InvalidIdError, ItemKind, ItemMove, OwnerId, PositionHint};
pub use outcome::{FeedbackCue, Outcome, OutcomeKind, RollResult};
pub use record::UpgradeRecord;

use std::fmt;
use thiserror::Error;

// ============================================================================
// Tier
// ============================================================================

/// Highest reachable upgrade tier.
pub const MAX_TIER: u8 = 3;

/// Upgrade level of one item instance, always within `0..=MAX_TIER`.
///
/// Out-of-range tiers are unrepresentable: every constructor validates, and
/// arithmetic goes through [`Tier::shifted`], which clamps.
///
/// ```compile_fail
/// let _ = reforge_types::Tier(7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tier(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("tier {attempted} is outside 0..={max}", max = MAX_TIER)]
pub struct TierError {
    pub attempted: i64,
}

impl Tier {
    pub const BASE: Tier = Tier(0);
    pub const MAX: Tier = Tier(MAX_TIER);

    pub fn new(level: u8) -> Result<Self, TierError> {
        Self::try_from(i64::from(level))
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn is_base(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_max(self) -> bool {
        self.0 == MAX_TIER
    }

    /// The last tier before the cap. Items at this tier risk destruction.
    #[must_use]
    pub const fn pre_cap() -> Tier {
        Tier(MAX_TIER - 1)
    }

    /// Apply a signed delta, clamping into `0..=MAX_TIER`.
    #[must_use]
    pub fn shifted(self, delta: i8) -> Tier {
        let raw = i16::from(self.0) + i16::from(delta);
        Tier(raw.clamp(0, i16::from(MAX_TIER)) as u8)
    }

    /// All tiers in ascending order.
    pub fn all() -> impl Iterator<Item = Tier> {
        (0..=MAX_TIER).map(Tier)
    }
}

impl TryFrom<i64> for Tier {
    type Error = TierError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        if (0..=i64::from(MAX_TIER)).contains(&level) {
            Ok(Self(level as u8))
        } else {
            Err(TierError { attempted: level })
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.0
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}", self.0)
    }
}
