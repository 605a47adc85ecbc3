//! Periodic re-application of tier labels to held items.
//!
//! Host-side labels can be lost when items are re-created. The sweep walks
//! every online owner and writes the label each upgraded item should carry.
//! It only reads the store, so running it twice changes nothing the second
//! time.

use std::sync::Arc;

use reforge_types::OwnerId;

use crate::context::ReforgeContext;
use crate::ports::{CollaboratorError, OwnerHandle};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub owners_visited: usize,
    /// No owner id, or nothing upgraded.
    pub owners_skipped: usize,
    pub owners_failed: usize,
    pub items_relabeled: usize,
}

impl ReforgeContext {
    /// Relabel every upgraded item held by `owners`. A failing owner is
    /// logged and counted; the rest are still visited.
    pub fn sweep(&self, owners: &[Arc<dyn OwnerHandle>]) -> SweepReport {
        let mut report = SweepReport::default();
        for handle in owners {
            let Some(owner) = handle.owner_id() else {
                report.owners_skipped += 1;
                continue;
            };
            if !self.store.owner_has_records(&owner) {
                report.owners_skipped += 1;
                continue;
            }

            report.owners_visited += 1;
            match self.sweep_owner(&owner, handle.as_ref()) {
                Ok(relabeled) => report.items_relabeled += relabeled,
                Err(e) => {
                    report.owners_failed += 1;
                    tracing::warn!(%owner, "Sweep failed for owner: {e}");
                }
            }
        }
        tracing::debug!(
            visited = report.owners_visited,
            skipped = report.owners_skipped,
            failed = report.owners_failed,
            relabeled = report.items_relabeled,
            "Sweep finished"
        );
        report
    }

    fn sweep_owner(&self, owner: &OwnerId, handle: &dyn OwnerHandle) -> Result<usize, CollaboratorError> {
        let mut relabeled = 0;
        let mut first_error = None;
        for item in handle.held_items()? {
            let Some(kind) = item.kind.as_ref() else {
                continue;
            };
            if !self.classifier.is_upgradeable(kind) {
                continue;
            }
            let tier = self.tier_at(owner, kind, &item.position);
            if tier.is_base() {
                continue;
            }
            let Some(base) = item.label_base() else {
                continue;
            };

            let label = self.catalog.label(tier, base);
            match self.presenter.relabel(owner, &item.position, &label) {
                Ok(()) => relabeled += 1,
                Err(e) => {
                    tracing::debug!(%owner, position = %item.position, "Relabel failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(relabeled), Err)
    }
}
