//! In-memory upgrade records: the runtime source of truth.
//!
//! One mutex guards the record map and the dirty counter together, so a
//! mutation and its autosave check are a single atomic step. Exactly one
//! writer observes [`Mutation::AutosaveDue`] per threshold crossing.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use reforge_types::{InstanceIdentity, ItemKind, OwnerId, Tier, TierError, UpgradeRecord};

/// Store key: one record per (owner, instance) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    pub owner: OwnerId,
    pub instance: InstanceIdentity,
}

impl StoreKey {
    #[must_use]
    pub fn new(owner: OwnerId, instance: InstanceIdentity) -> Self {
        Self { owner, instance }
    }
}

/// What a write did to the dirty counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Mutation {
    Recorded,
    /// This write crossed the autosave threshold; the caller should flush.
    AutosaveDue,
}

impl Mutation {
    #[must_use]
    pub fn autosave_due(self) -> bool {
        matches!(self, Self::AutosaveDue)
    }
}

/// Records captured for a flush, plus how many mutations they cover.
#[derive(Debug)]
pub struct FlushTicket {
    pub entries: Vec<(StoreKey, UpgradeRecord)>,
    covered: u32,
}

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<StoreKey, UpgradeRecord>,
    dirty: u32,
    autosave_claimed: bool,
}

#[derive(Debug)]
pub struct UpgradeStore {
    state: Mutex<StoreState>,
    autosave_threshold: u32,
}

#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl UpgradeStore {
    /// `autosave_threshold` is clamped to at least 1.
    #[must_use]
    pub fn new(autosave_threshold: u32) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            autosave_threshold: autosave_threshold.max(1),
        }
    }

    // The guarded state is consistent between statements, so a panic in
    // another holder leaves nothing half-written.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn note_mutation(&self, state: &mut StoreState) -> Mutation {
        state.dirty = state.dirty.saturating_add(1);
        if state.dirty >= self.autosave_threshold && !state.autosave_claimed {
            state.autosave_claimed = true;
            Mutation::AutosaveDue
        } else {
            Mutation::Recorded
        }
    }

    /// Seed records loaded from a snapshot. Does not touch the dirty counter.
    pub fn seed(&self, entries: impl IntoIterator<Item = (StoreKey, UpgradeRecord)>) {
        let mut state = self.lock();
        state.records.extend(entries);
    }

    #[must_use]
    pub fn get(&self, owner: &OwnerId, instance: &InstanceIdentity) -> Option<UpgradeRecord> {
        let key = StoreKey::new(owner.clone(), *instance);
        self.lock().records.get(&key).cloned()
    }

    /// Current tier, with absence meaning [`Tier::BASE`].
    #[must_use]
    pub fn tier(&self, owner: &OwnerId, instance: &InstanceIdentity) -> Tier {
        self.get(owner, instance)
            .map_or(Tier::BASE, |record| record.tier)
    }

    /// Upsert a record.
    pub fn set(
        &self,
        owner: &OwnerId,
        instance: &InstanceIdentity,
        tier: Tier,
        kind: &ItemKind,
    ) -> Mutation {
        let record = UpgradeRecord::new(tier, kind.clone(), *instance, now_ms());
        let mut state = self.lock();
        state
            .records
            .insert(StoreKey::new(owner.clone(), *instance), record);
        self.note_mutation(&mut state)
    }

    /// Upsert from an unvalidated level. Out-of-range levels are rejected and
    /// the prior record, if any, is kept untouched.
    pub fn set_level(
        &self,
        owner: &OwnerId,
        instance: &InstanceIdentity,
        level: i64,
        kind: &ItemKind,
    ) -> Result<Mutation, TierError> {
        let tier = Tier::try_from(level)?;
        Ok(self.set(owner, instance, tier, kind))
    }

    pub fn remove(
        &self,
        owner: &OwnerId,
        instance: &InstanceIdentity,
    ) -> Option<(UpgradeRecord, Mutation)> {
        let key = StoreKey::new(owner.clone(), *instance);
        let mut state = self.lock();
        let removed = state.records.remove(&key)?;
        let mutation = self.note_mutation(&mut state);
        Some((removed, mutation))
    }

    /// Move a record to a new owner, e.g. after a trade.
    pub fn reassign(
        &self,
        from: &OwnerId,
        to: &OwnerId,
        instance: &InstanceIdentity,
    ) -> Option<Mutation> {
        if from == to {
            return None;
        }
        let mut state = self.lock();
        let mut record = state
            .records
            .remove(&StoreKey::new(from.clone(), *instance))?;
        record.last_modified_ms = now_ms();
        state
            .records
            .insert(StoreKey::new(to.clone(), *instance), record);
        Some(self.note_mutation(&mut state))
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().records.len()
    }

    #[must_use]
    pub fn owner_has_records(&self, owner: &OwnerId) -> bool {
        self.lock().records.keys().any(|key| &key.owner == owner)
    }

    /// An owner's records, highest tier first.
    #[must_use]
    pub fn records_for(&self, owner: &OwnerId) -> Vec<UpgradeRecord> {
        let mut records: Vec<UpgradeRecord> = self
            .lock()
            .records
            .iter()
            .filter(|(key, _)| &key.owner == owner)
            .map(|(_, record)| record.clone())
            .collect();
        records.sort_by(|a, b| b.tier.cmp(&a.tier).then(a.kind.cmp(&b.kind)));
        records
    }

    #[must_use]
    pub fn dirty(&self) -> u32 {
        self.lock().dirty
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<(StoreKey, UpgradeRecord)> {
        self.lock()
            .records
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }

    /// Capture every record and zero the dirty counter in one step.
    pub fn begin_flush(&self) -> FlushTicket {
        let mut state = self.lock();
        let covered = std::mem::take(&mut state.dirty);
        state.autosave_claimed = false;
        let entries = state
            .records
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect();
        FlushTicket { entries, covered }
    }

    /// Report the outcome of a flush. On failure the covered mutations are
    /// counted as dirty again so a later flush retries them, and threshold
    /// autosaves stay claimed until some flush succeeds. Retries are left to
    /// the timed autosave.
    pub fn finish_flush(&self, ticket: &FlushTicket, persisted: bool) {
        if persisted {
            return;
        }
        let mut state = self.lock();
        state.dirty = state.dirty.saturating_add(ticket.covered);
        state.autosave_claimed = true;
    }

    /// Count a change that only affects persisted metadata of an existing
    /// record, such as its slot binding. Returns `None` when there is no
    /// record to persist.
    pub fn touch(&self, owner: &OwnerId, instance: &InstanceIdentity) -> Option<Mutation> {
        let key = StoreKey::new(owner.clone(), *instance);
        let mut state = self.lock();
        if !state.records.contains_key(&key) {
            return None;
        }
        Some(self.note_mutation(&mut state))
    }
}
