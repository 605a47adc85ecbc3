use std::fmt;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidIdError {
    #[error("{what} must not be empty")]
    Empty { what: &'static str },
    #[error("{what} `{value}` is a placeholder, not a real id")]
    Placeholder { what: &'static str, value: String },
    #[error("instance token `{value}` is not a uuid")]
    MalformedToken { value: String },
}

/// Hosts report unknown item types with this id instead of omitting them.
const UNKNOWN_KIND: &str = "unknown";

/// Stable identifier of the user holding items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidIdError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(InvalidIdError::Empty { what: "owner id" });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Item type id as reported by the host, e.g. `Weapon_Sword_Iron`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKind(String);

impl ItemKind {
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidIdError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(InvalidIdError::Empty { what: "item kind" });
        }
        if value.eq_ignore_ascii_case(UNKNOWN_KIND) {
            return Err(InvalidIdError::Placeholder {
                what: "item kind",
                value,
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an item currently sits: a named container plus a slot index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionHint {
    container: String,
    slot: u16,
}

impl PositionHint {
    #[must_use]
    pub fn new(container: impl Into<String>, slot: u16) -> Self {
        Self {
            container: container.into(),
            slot,
        }
    }

    #[must_use]
    pub fn hotbar(slot: u16) -> Self {
        Self::new("hotbar", slot)
    }

    #[must_use]
    pub fn storage(slot: u16) -> Self {
        Self::new("storage", slot)
    }

    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    #[must_use]
    pub fn slot(&self) -> u16 {
        self.slot
    }
}

impl fmt::Display for PositionHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.container, self.slot)
    }
}

/// Opaque token naming one physical item instance.
///
/// Minted randomly; never derived from display strings or positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceIdentity(Uuid);

impl InstanceIdentity {
    #[must_use]
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Result<Self, InvalidIdError> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| InvalidIdError::MalformedToken {
                value: value.to_string(),
            })
    }
}

impl fmt::Display for InstanceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

/// One item moving between positions, possibly between owners.
///
/// Moves are reported by the container collaborator and applied as a batch,
/// so a swap is simply two moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMove {
    pub kind: ItemKind,
    pub from_owner: OwnerId,
    pub from: PositionHint,
    pub to_owner: OwnerId,
    pub to: PositionHint,
}

impl ItemMove {
    /// A move that stays with the same owner.
    #[must_use]
    pub fn within(owner: OwnerId, kind: ItemKind, from: PositionHint, to: PositionHint) -> Self {
        Self {
            kind,
            from_owner: owner.clone(),
            from,
            to_owner: owner,
            to,
        }
    }

    #[must_use]
    pub fn changes_owner(&self) -> bool {
        self.from_owner != self.to_owner
    }
}
