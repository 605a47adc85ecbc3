use thiserror::Error;

use crate::ItemKind;

/// Why an item could not be given a stable identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("owner is unavailable")]
    MissingOwner,
    #[error("item kind is unavailable")]
    MissingKind,
}

/// Reasons an upgrade action is refused before or instead of a roll.
///
/// Only the first four are meant for the end user; `IdentityUnresolvable`
/// is a silent internal failure that callers treat as "tier 0, nothing to do".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionDeclined {
    #[error("{kind} cannot be reforged")]
    NotUpgradeable { kind: ItemKind },
    #[error("item is already at max tier")]
    AlreadyMaxTier,
    #[error("not enough {material} (need {required}, have {available})")]
    MaterialInsufficient {
        material: String,
        required: u32,
        available: u32,
    },
    #[error("failed to consume {material}")]
    MaterialConsumeFailed { material: String },
    #[error("identity unresolvable: {0}")]
    IdentityUnresolvable(#[from] IdentityError),
}

impl ActionDeclined {
    /// Whether the reason should be shown to the user.
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::IdentityUnresolvable(_))
    }
}
