//! Seams to the host: item classification, presentation, inventories, and
//! the online owners the sweep walks.

use regex::Regex;
use thiserror::Error;

use reforge_types::{FeedbackCue, ItemKind, OwnerId, PositionHint};

/// A host call that failed. Carries only a message; the host owns the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CollaboratorError(String);

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub trait ItemClassifier: Send + Sync {
    fn is_upgradeable(&self, kind: &ItemKind) -> bool;
}

/// Accepts kinds whose whole id matches a regex.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    pattern: Regex,
}

impl PatternClassifier {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&format!("^(?:{pattern})$"))?,
        })
    }
}

impl ItemClassifier for PatternClassifier {
    fn is_upgradeable(&self, kind: &ItemKind) -> bool {
        self.pattern.is_match(kind.as_str())
    }
}

/// Outbound, fire-and-forget presentation calls.
pub trait Presenter: Send + Sync {
    fn relabel(
        &self,
        owner: &OwnerId,
        position: &PositionHint,
        label: &str,
    ) -> Result<(), CollaboratorError>;

    /// `sound` is `None` when the cue has no configured sound.
    fn cue(&self, owner: &OwnerId, cue: FeedbackCue, sound: Option<&str>);
}

/// The acting owner's inventory for the duration of one action.
pub trait Inventory {
    fn material_count(&self, material: &str) -> u32;

    /// Returns false when the host refused to remove the material.
    fn consume_material(&mut self, material: &str, amount: u32) -> bool;

    fn remove_item(&mut self, position: &PositionHint) -> Result<(), CollaboratorError>;
}

/// An item as the host reports it. Any field may be missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldItem {
    pub kind: Option<ItemKind>,
    pub position: PositionHint,
    /// Host display name, without any tier label.
    pub base_name: Option<String>,
}

impl HeldItem {
    pub fn new(kind: ItemKind, position: PositionHint) -> Self {
        Self {
            kind: Some(kind),
            position,
            base_name: None,
        }
    }

    #[must_use]
    pub fn with_base_name(mut self, name: impl Into<String>) -> Self {
        self.base_name = Some(name.into());
        self
    }

    /// Name to build labels from: the host name, else the kind id.
    #[must_use]
    pub fn label_base(&self) -> Option<&str> {
        self.base_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.kind.as_ref().map(ItemKind::as_str))
    }
}

/// An online owner whose held items the sweep re-labels.
pub trait OwnerHandle: Send + Sync {
    fn owner_id(&self) -> Option<OwnerId>;

    fn held_items(&self) -> Result<Vec<HeldItem>, CollaboratorError>;
}
