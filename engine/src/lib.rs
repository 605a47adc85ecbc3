//! Background maintenance for a [`reforge_core::ReforgeContext`].
//!
//! Two tokio tasks run on their own schedules: a timed autosave and the
//! reconciliation sweep. Both hand the synchronous core work to the blocking
//! pool.

mod maintenance;

pub use maintenance::{Maintenance, MaintenanceSchedule, Roster, ShutdownReport};
