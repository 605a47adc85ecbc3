//! One user-triggered reforge action, start to finish.

use reforge_types::{
    ActionDeclined, FeedbackCue, IdentityError, InstanceIdentity, OwnerId, RollResult, Tier,
};

use crate::context::ReforgeContext;
use crate::outcome::Dice;
use crate::ports::{HeldItem, Inventory};

/// The item an owner asked to reforge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub owner: Option<OwnerId>,
    pub item: HeldItem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub owner: OwnerId,
    pub instance: InstanceIdentity,
    pub result: RollResult,
    /// Label sent to the presenter; `None` when the item was destroyed or
    /// has no name to label.
    pub label: Option<String>,
}

impl ActionReport {
    #[must_use]
    pub fn tier(&self) -> Option<Tier> {
        self.result.resulting_tier()
    }
}

impl ReforgeContext {
    /// Run a reforge action.
    ///
    /// Every decline happens before material is consumed, except
    /// [`ActionDeclined::MaterialConsumeFailed`], which the host reports
    /// after the start cue.
    pub fn reforge(
        &self,
        request: &UpgradeRequest,
        inventory: &mut dyn Inventory,
        dice: &mut dyn Dice,
    ) -> Result<ActionReport, ActionDeclined> {
        let item = &request.item;
        let kind = item.kind.as_ref().ok_or(IdentityError::MissingKind)?;
        if !self.classifier.is_upgradeable(kind) {
            return Err(ActionDeclined::NotUpgradeable { kind: kind.clone() });
        }
        let owner = request.owner.as_ref().ok_or(IdentityError::MissingOwner)?;
        if self.tier_at(owner, kind, &item.position).is_max() {
            return Err(ActionDeclined::AlreadyMaxTier);
        }

        let material = &self.material;
        let available = inventory.material_count(&material.material);
        if available < material.cost {
            return Err(ActionDeclined::MaterialInsufficient {
                material: material.material.clone(),
                required: material.cost,
                available,
            });
        }

        self.play(owner, FeedbackCue::Start);
        if !inventory.consume_material(&material.material, material.cost) {
            return Err(ActionDeclined::MaterialConsumeFailed {
                material: material.material.clone(),
            });
        }

        // Identities are only minted for items that actually get rolled.
        let resolution = self.resolve(Some(owner), Some(kind), &item.position)?;
        let current = self.tier_of(owner, &resolution.identity);
        let result = self.engine.roll(current, dice);
        let label = match result {
            RollResult::Destroyed { from } => {
                self.destroy(owner, &resolution);
                if let Err(e) = inventory.remove_item(&item.position) {
                    tracing::warn!(%owner, position = %item.position, "Failed to remove destroyed item: {e}");
                }
                tracing::info!(%owner, %kind, instance = %resolution.identity, %from, "Item destroyed");
                None
            }
            RollResult::Transition(outcome) => {
                if outcome.to != current {
                    self.set_tier(owner, &resolution.identity, outcome.to, kind);
                }
                tracing::info!(
                    %owner,
                    %kind,
                    instance = %resolution.identity,
                    outcome = outcome.kind.as_str(),
                    from = %outcome.from,
                    to = %outcome.to,
                    "Reforge rolled"
                );
                item.label_base().and_then(|base| {
                    let label = self.catalog.label(outcome.to, base);
                    match self.presenter.relabel(owner, &item.position, &label) {
                        Ok(()) => Some(label),
                        Err(e) => {
                            tracing::warn!(%owner, position = %item.position, "Relabel failed: {e}");
                            None
                        }
                    }
                })
            }
        };
        self.play(owner, result.cue());

        Ok(ActionReport {
            owner: owner.clone(),
            instance: resolution.identity,
            result,
            label,
        })
    }

    fn play(&self, owner: &OwnerId, cue: FeedbackCue) {
        self.presenter.cue(owner, cue, self.cues.sound(cue));
    }
}
