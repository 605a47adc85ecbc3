use crate::{InstanceIdentity, ItemKind, Tier};

/// Upgrade state of one tracked item instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRecord {
    pub tier: Tier,
    pub kind: ItemKind,
    pub instance: InstanceIdentity,
    /// Epoch milliseconds of the last write.
    pub last_modified_ms: i64,
}

impl UpgradeRecord {
    #[must_use]
    pub fn new(tier: Tier, kind: ItemKind, instance: InstanceIdentity, last_modified_ms: i64) -> Self {
        Self {
            tier,
            kind,
            instance,
            last_modified_ms,
        }
    }
}
