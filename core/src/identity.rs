//! Stable identities for items that carry none of their own.
//!
//! Host items can be re-created on every query, so identity is anchored to a
//! structural key `(owner, kind, position)`. The key is hashed into a
//! [`StructuralDigest`] and bound to a randomly minted [`InstanceIdentity`] the
//! first time it is seen. Moves reported by the container collaborator carry
//! the binding to the new position.

use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};

use reforge_types::{IdentityError, InstanceIdentity, ItemKind, ItemMove, OwnerId, PositionHint};

const DIGEST_LEN: usize = 16;

/// Truncated SHA-256 of a structural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructuralDigest([u8; DIGEST_LEN]);

impl StructuralDigest {
    /// Each field is length-prefixed so `("ab", "c")` and `("a", "bc")` differ.
    #[must_use]
    pub fn of(owner: &OwnerId, kind: &ItemKind, position: &PositionHint) -> Self {
        let mut hasher = Sha256::new();
        for field in [owner.as_str(), kind.as_str(), position.container()] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.update(position.slot().to_le_bytes());
        let full = hasher.finalize();

        let mut truncated = [0u8; DIGEST_LEN];
        truncated.copy_from_slice(&full[..DIGEST_LEN]);
        Self(truncated)
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != DIGEST_LEN * 2 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; DIGEST_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for StructuralDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Result of a successful resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub identity: InstanceIdentity,
    pub digest: StructuralDigest,
    /// True when this call minted the identity.
    pub minted: bool,
}

/// Bindings from structural digests to minted identities, kept in both directions.
#[derive(Debug, Default)]
pub struct IdentityResolver {
    by_digest: HashMap<StructuralDigest, InstanceIdentity>,
    by_identity: HashMap<InstanceIdentity, StructuralDigest>,
}

impl IdentityResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the item at `position`, minting an identity on first sight.
    ///
    /// Fails when the owner or kind is unavailable; nothing is recorded then.
    pub fn resolve(
        &mut self,
        owner: Option<&OwnerId>,
        kind: Option<&ItemKind>,
        position: &PositionHint,
    ) -> Result<Resolution, IdentityError> {
        let owner = owner.ok_or(IdentityError::MissingOwner)?;
        let kind = kind.ok_or(IdentityError::MissingKind)?;
        let digest = StructuralDigest::of(owner, kind, position);

        if let Some(identity) = self.by_digest.get(&digest) {
            return Ok(Resolution {
                identity: *identity,
                digest,
                minted: false,
            });
        }

        let identity = InstanceIdentity::mint();
        self.bind(digest, identity);
        tracing::debug!(%owner, %kind, %position, %identity, "Minted instance identity");
        Ok(Resolution {
            identity,
            digest,
            minted: true,
        })
    }

    /// Look up a binding without minting.
    #[must_use]
    pub fn lookup(&self, digest: &StructuralDigest) -> Option<InstanceIdentity> {
        self.by_digest.get(digest).copied()
    }

    #[must_use]
    pub fn digest_of(&self, identity: &InstanceIdentity) -> Option<StructuralDigest> {
        self.by_identity.get(identity).copied()
    }

    /// Bind `digest` to `identity`, replacing whatever either side was bound to.
    pub fn bind(&mut self, digest: StructuralDigest, identity: InstanceIdentity) {
        if let Some(previous) = self.by_digest.insert(digest, identity)
            && previous != identity
        {
            self.by_identity.remove(&previous);
        }
        if let Some(stale) = self.by_identity.insert(identity, digest)
            && stale != digest
        {
            self.by_digest.remove(&stale);
        }
    }

    pub fn forget(&mut self, digest: &StructuralDigest) -> Option<InstanceIdentity> {
        let identity = self.by_digest.remove(digest)?;
        self.by_identity.remove(&identity);
        Some(identity)
    }

    /// Apply a batch of moves. All sources are unbound before any destination
    /// is bound, so swaps and rotations keep every identity.
    ///
    /// Returns the identities that moved, paired with their move.
    pub fn relocate<'a>(
        &mut self,
        moves: &'a [ItemMove],
    ) -> Vec<(&'a ItemMove, InstanceIdentity)> {
        let lifted: Vec<_> = moves
            .iter()
            .filter_map(|mv| {
                let from = StructuralDigest::of(&mv.from_owner, &mv.kind, &mv.from);
                self.forget(&from).map(|identity| (mv, identity))
            })
            .collect();

        for (mv, identity) in &lifted {
            let to = StructuralDigest::of(&mv.to_owner, &mv.kind, &mv.to);
            self.bind(to, *identity);
        }
        lifted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_digest.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_digest.is_empty()
    }
}
