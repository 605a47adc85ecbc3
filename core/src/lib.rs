//! Core upgrade logic for Reforge.
//!
//! - [`identity`]: stable identities for items that carry none.
//! - [`outcome`]: weighted outcome rolls plus the destruction roll.
//! - [`store`]: the in-memory record map and its dirty counter.
//! - [`persistence`]: the JSON snapshot and its backups.
//! - [`ReforgeContext`]: owns all of the above and runs actions and sweeps.
//!
//! Everything here is synchronous. Scheduling lives in `reforge-engine`.

#![allow(clippy::missing_errors_doc)]

mod action;
pub mod catalog;
mod context;
pub mod identity;
pub mod outcome;
pub mod persistence;
pub mod ports;
pub mod store;
mod sweep;

pub use action::{ActionReport, UpgradeRequest};
pub use catalog::{CatalogError, CueSheet, TierCatalog};
pub use context::{CloseReport, FlushStatus, ReforgeContext, SetupError};
pub use identity::{IdentityResolver, Resolution, StructuralDigest};
pub use outcome::{Dice, OutcomeEngine, OutcomeTable, OutcomeTableError, ThreadDice};
pub use persistence::{LoadedSnapshot, PersistenceError, SnapshotDecodeError, SnapshotEntry, SnapshotStore};
pub use ports::{
    CollaboratorError, HeldItem, Inventory, ItemClassifier, OwnerHandle, PatternClassifier,
    Presenter,
};
pub use store::{Mutation, StoreKey, UpgradeStore};
pub use sweep::SweepReport;
