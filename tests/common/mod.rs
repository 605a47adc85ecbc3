//! Shared test utilities and fixtures
//!
//! Fake host collaborators and a scripted dice source.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use reforge_config::ReforgeConfig;
use reforge_core::{
    CollaboratorError, Dice, HeldItem, Inventory, OwnerHandle, Presenter, ReforgeContext,
    UpgradeRequest,
};
use reforge_types::{FeedbackCue, ItemKind, OwnerId, PositionHint};

pub const IRON: &str = "Ingredient_Bar_Iron";

pub fn owner(id: &str) -> OwnerId {
    OwnerId::new(id).expect("owner id")
}

pub fn kind(id: &str) -> ItemKind {
    ItemKind::new(id).expect("item kind")
}

pub fn sword() -> ItemKind {
    kind("Weapon_Sword_Iron")
}

pub fn config_in(dir: &Path) -> ReforgeConfig {
    let mut config = ReforgeConfig::default();
    config.storage.data_dir = Some(dir.to_string_lossy().into_owned());
    config
}

pub fn open(dir: &Path) -> (Arc<ReforgeContext>, Arc<ScreenPresenter>) {
    open_with(&config_in(dir))
}

pub fn open_with(config: &ReforgeConfig) -> (Arc<ReforgeContext>, Arc<ScreenPresenter>) {
    let presenter = Arc::new(ScreenPresenter::default());
    let ctx = ReforgeContext::open(config, presenter.clone()).expect("open context");
    (Arc::new(ctx), presenter)
}

pub fn request(who: &str, item_kind: ItemKind, slot: u16, name: &str) -> UpgradeRequest {
    UpgradeRequest {
        owner: Some(owner(who)),
        item: HeldItem::new(item_kind, PositionHint::hotbar(slot)).with_base_name(name),
    }
}

/// Keeps the current label of every slot, like a client screen would.
#[derive(Default)]
pub struct ScreenPresenter {
    screen: Mutex<BTreeMap<(String, String), String>>,
    relabels: Mutex<usize>,
    cues: Mutex<Vec<FeedbackCue>>,
}

impl ScreenPresenter {
    pub fn screen(&self) -> BTreeMap<(String, String), String> {
        self.screen.lock().expect("screen").clone()
    }

    pub fn label(&self, who: &str, position: &PositionHint) -> Option<String> {
        self.screen
            .lock()
            .expect("screen")
            .get(&(who.to_string(), position.to_string()))
            .cloned()
    }

    pub fn relabels(&self) -> usize {
        *self.relabels.lock().expect("relabels")
    }

    pub fn cues(&self) -> Vec<FeedbackCue> {
        self.cues.lock().expect("cues").clone()
    }
}

impl Presenter for ScreenPresenter {
    fn relabel(
        &self,
        owner: &OwnerId,
        position: &PositionHint,
        label: &str,
    ) -> Result<(), CollaboratorError> {
        self.screen.lock().expect("screen").insert(
            (owner.to_string(), position.to_string()),
            label.to_string(),
        );
        *self.relabels.lock().expect("relabels") += 1;
        Ok(())
    }

    fn cue(&self, _owner: &OwnerId, cue: FeedbackCue, _sound: Option<&str>) {
        self.cues.lock().expect("cues").push(cue);
    }
}

/// Draws from a fixed queue.
pub struct QueuedDice(VecDeque<f64>);

impl QueuedDice {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self(draws.into_iter().collect())
    }

    pub fn remaining(&self) -> usize {
        self.0.len()
    }
}

impl Dice for QueuedDice {
    fn draw(&mut self) -> f64 {
        self.0.pop_front().expect("test dice exhausted")
    }
}

/// Inventory holding only iron bars.
#[derive(Debug, Default)]
pub struct Satchel {
    pub bars: u32,
    pub removed: Vec<PositionHint>,
}

impl Satchel {
    pub fn with_bars(bars: u32) -> Self {
        Self {
            bars,
            removed: Vec::new(),
        }
    }
}

impl Inventory for Satchel {
    fn material_count(&self, material: &str) -> u32 {
        if material == IRON { self.bars } else { 0 }
    }

    fn consume_material(&mut self, material: &str, amount: u32) -> bool {
        if material != IRON || self.bars < amount {
            return false;
        }
        self.bars -= amount;
        true
    }

    fn remove_item(&mut self, position: &PositionHint) -> Result<(), CollaboratorError> {
        self.removed.push(position.clone());
        Ok(())
    }
}

/// An online owner with a fixed set of held items.
pub struct Holder {
    pub id: Option<OwnerId>,
    pub items: Mutex<Result<Vec<HeldItem>, CollaboratorError>>,
}

impl Holder {
    pub fn new(who: &str, items: Vec<HeldItem>) -> Arc<Self> {
        Arc::new(Self {
            id: Some(owner(who)),
            items: Mutex::new(Ok(items)),
        })
    }

    pub fn failing(who: &str) -> Arc<Self> {
        Arc::new(Self {
            id: Some(owner(who)),
            items: Mutex::new(Err(CollaboratorError::new("host unavailable"))),
        })
    }

    pub fn set_items(&self, items: Vec<HeldItem>) {
        *self.items.lock().expect("items") = Ok(items);
    }
}

impl OwnerHandle for Holder {
    fn owner_id(&self) -> Option<OwnerId> {
        self.id.clone()
    }

    fn held_items(&self) -> Result<Vec<HeldItem>, CollaboratorError> {
        self.items.lock().expect("items").clone()
    }
}

pub fn held(item_kind: ItemKind, slot: u16, name: &str) -> HeldItem {
    HeldItem::new(item_kind, PositionHint::hotbar(slot)).with_base_name(name)
}
