//! The explicit owner of all upgrade state.
//!
//! A [`ReforgeContext`] is built once with [`ReforgeContext::open`] and torn
//! down with [`ReforgeContext::close`]. It is `Send + Sync`; share it behind
//! an `Arc`.
//!
//! # Locks
//!
//! - `resolver` guards identity bindings.
//! - The store's internal lock guards records and the dirty counter.
//! - `flush_lock` serializes snapshot writes.
//!
//! The resolver and store locks are never held at the same time. A flush
//! holds `flush_lock` while taking each of the other two in turn.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use reforge_config::ReforgeConfig;
use reforge_types::{
    IdentityError, InstanceIdentity, ItemKind, ItemMove, OwnerId, PositionHint, Tier, UpgradeRecord,
};

use crate::catalog::{CatalogError, CueSheet, TierCatalog};
use crate::identity::{IdentityResolver, Resolution, StructuralDigest};
use crate::outcome::{OutcomeEngine, OutcomeTable, OutcomeTableError};
use crate::persistence::{SnapshotEntry, SnapshotStore};
use crate::ports::{ItemClassifier, PatternClassifier, Presenter};
use crate::store::{Mutation, StoreKey, UpgradeStore};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid outcome table: {0}")]
    Outcome(#[from] OutcomeTableError),
    #[error("invalid tier table: {0}")]
    Catalog(#[from] CatalogError),
    #[error("invalid upgradeable pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("autosave threshold must be at least 1")]
    AutosaveThreshold,
}

/// Material rules for one reforge action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MaterialRule {
    pub(crate) material: String,
    pub(crate) cost: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// Nothing changed since the last successful flush.
    Clean,
    Saved,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReport {
    pub backup: Option<PathBuf>,
    pub flushed: bool,
    pub records: usize,
}

pub struct ReforgeContext {
    resolver: Mutex<IdentityResolver>,
    pub(crate) store: UpgradeStore,
    snapshots: SnapshotStore,
    flush_lock: Mutex<()>,
    pub(crate) engine: OutcomeEngine,
    pub(crate) catalog: TierCatalog,
    pub(crate) cues: CueSheet,
    pub(crate) classifier: Box<dyn ItemClassifier>,
    pub(crate) presenter: Arc<dyn Presenter>,
    pub(crate) material: MaterialRule,
}

impl std::fmt::Debug for ReforgeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReforgeContext")
            .field("snapshot", &self.snapshots.path())
            .field("records", &self.store.count())
            .finish_non_exhaustive()
    }
}

impl ReforgeContext {
    /// Validate `config`, load the snapshot, and restore identity bindings.
    ///
    /// A missing or unreadable snapshot is not an error; the context starts
    /// empty.
    pub fn open(config: &ReforgeConfig, presenter: Arc<dyn Presenter>) -> Result<Self, SetupError> {
        let rules = &config.reforge;
        let table = OutcomeTable::new(rules.weights.clone())?;
        let engine = OutcomeEngine::new(table, rules.destruction_chance)?;
        let catalog = TierCatalog::from_config(&config.tiers)?;
        let classifier = PatternClassifier::new(&rules.upgradeable_pattern)?;
        if config.storage.autosave_threshold == 0 {
            return Err(SetupError::AutosaveThreshold);
        }

        let snapshots = SnapshotStore::new(
            config.storage.resolved_data_dir(),
            config.storage.snapshot_file.clone(),
        );
        let loaded = snapshots.load();

        let mut resolver = IdentityResolver::new();
        let store = UpgradeStore::new(config.storage.autosave_threshold);
        for entry in &loaded.entries {
            if let Some(digest) = entry.slot_digest {
                resolver.bind(digest, entry.record.instance);
            }
        }
        store.seed(
            loaded
                .entries
                .into_iter()
                .map(|entry| (entry.key, entry.record)),
        );
        tracing::info!(
            records = store.count(),
            bindings = resolver.len(),
            path = %snapshots.path().display(),
            "Reforge context opened"
        );

        Ok(Self {
            resolver: Mutex::new(resolver),
            store,
            snapshots,
            flush_lock: Mutex::new(()),
            engine,
            catalog,
            cues: CueSheet::new(config.sfx.clone()),
            classifier: Box::new(classifier),
            presenter,
            material: MaterialRule {
                material: rules.material.clone(),
                cost: rules.material_cost,
            },
        })
    }

    /// Replace the pattern classifier built from config.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl ItemClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    fn resolver(&self) -> MutexGuard<'_, IdentityResolver> {
        self.resolver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn catalog(&self) -> &TierCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshots.path()
    }

    /// Resolve an item to its identity, minting one on first sight.
    pub fn resolve(
        &self,
        owner: Option<&OwnerId>,
        kind: Option<&ItemKind>,
        position: &PositionHint,
    ) -> Result<Resolution, IdentityError> {
        self.resolver().resolve(owner, kind, position)
    }

    /// Tier of the item at a slot without minting. Unknown items are tier 0.
    #[must_use]
    pub fn tier_at(&self, owner: &OwnerId, kind: &ItemKind, position: &PositionHint) -> Tier {
        let digest = StructuralDigest::of(owner, kind, position);
        let bound = self.resolver().lookup(&digest);
        bound.map_or(Tier::BASE, |identity| self.store.tier(owner, &identity))
    }

    #[must_use]
    pub fn tier_of(&self, owner: &OwnerId, instance: &InstanceIdentity) -> Tier {
        self.store.tier(owner, instance)
    }

    #[must_use]
    pub fn record(&self, owner: &OwnerId, instance: &InstanceIdentity) -> Option<UpgradeRecord> {
        self.store.get(owner, instance)
    }

    /// Write a tier. Tier 0 removes the record.
    pub fn set_tier(&self, owner: &OwnerId, instance: &InstanceIdentity, tier: Tier, kind: &ItemKind) {
        if tier.is_base() {
            self.remove(owner, instance);
            return;
        }
        let mutation = self.store.set(owner, instance, tier, kind);
        self.after_mutation(mutation);
    }

    pub fn remove(&self, owner: &OwnerId, instance: &InstanceIdentity) -> Option<UpgradeRecord> {
        let (record, mutation) = self.store.remove(owner, instance)?;
        self.after_mutation(mutation);
        Some(record)
    }

    /// Drop an item entirely: its record and its slot binding.
    pub(crate) fn destroy(&self, owner: &OwnerId, resolution: &Resolution) {
        self.resolver().forget(&resolution.digest);
        self.remove(owner, &resolution.identity);
    }

    /// Apply moves reported by the container collaborator. Bindings follow
    /// the items; records follow them across owners.
    ///
    /// Returns how many bound identities moved.
    pub fn relocate(&self, moves: &[ItemMove]) -> usize {
        let moved: Vec<(ItemMove, InstanceIdentity)> = self
            .resolver()
            .relocate(moves)
            .into_iter()
            .map(|(mv, identity)| (mv.clone(), identity))
            .collect();

        // A moved binding changes the persisted slotDigest, so every tracked
        // item that moved counts as a mutation.
        for (mv, identity) in &moved {
            let mutation = if mv.changes_owner() {
                let reassigned = self.store.reassign(&mv.from_owner, &mv.to_owner, identity);
                if reassigned.is_some() {
                    tracing::debug!(
                        from = %mv.from_owner,
                        to = %mv.to_owner,
                        %identity,
                        "Record changed owner"
                    );
                }
                reassigned
            } else {
                self.store.touch(&mv.to_owner, identity)
            };
            if let Some(mutation) = mutation {
                self.after_mutation(mutation);
            }
        }
        moved.len()
    }

    fn after_mutation(&self, mutation: Mutation) {
        if mutation.autosave_due() {
            tracing::debug!("Autosave threshold reached");
            self.flush();
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.store.count()
    }

    #[must_use]
    pub fn records_for(&self, owner: &OwnerId) -> Vec<UpgradeRecord> {
        self.store.records_for(owner)
    }

    #[must_use]
    pub fn owners(&self) -> Vec<OwnerId> {
        let mut owners: Vec<OwnerId> = self
            .store
            .snapshot()
            .into_iter()
            .map(|(key, _)| key.owner)
            .collect();
        owners.sort();
        owners.dedup();
        owners
    }

    #[must_use]
    pub fn dirty(&self) -> u32 {
        self.store.dirty()
    }

    fn snapshot_entries(&self, entries: Vec<(StoreKey, UpgradeRecord)>) -> Vec<SnapshotEntry> {
        let resolver = self.resolver();
        entries
            .into_iter()
            .map(|(key, record)| SnapshotEntry {
                slot_digest: resolver.digest_of(&record.instance),
                key,
                record,
            })
            .collect()
    }

    /// Write every record to the snapshot. Failures are logged and leave the
    /// store dirty.
    pub fn flush(&self) -> bool {
        let _flushing = self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ticket = self.store.begin_flush();
        let entries = self.snapshot_entries(std::mem::take(&mut ticket.entries));
        let saved = self.snapshots.save(&entries);
        self.store.finish_flush(&ticket, saved);
        saved
    }

    pub fn flush_if_dirty(&self) -> FlushStatus {
        if self.store.dirty() == 0 {
            return FlushStatus::Clean;
        }
        if self.flush() {
            FlushStatus::Saved
        } else {
            FlushStatus::Failed
        }
    }

    /// Copy the current snapshot aside. Failures are logged, not returned.
    pub fn backup(&self) -> Option<PathBuf> {
        let _flushing = self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.snapshots.backup() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Snapshot backup failed: {e}");
                None
            }
        }
    }

    /// Final backup, then an unconditional flush.
    pub fn close(&self) -> CloseReport {
        let backup = self.backup();
        let flushed = self.flush();
        let records = self.count();
        tracing::info!(records, flushed, backup = ?backup, "Reforge context closed");
        CloseReport {
            backup,
            flushed,
            records,
        }
    }
}
