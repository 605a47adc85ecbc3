//! Shared infrastructure utilities for Reforge.
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename) and
//!   no-clobber copies for backups

pub mod atomic_write;

pub use atomic_write::{
    AtomicWriteOptions, FileSyncPolicy, ParentDirSyncPolicy, atomic_copy_new, atomic_write,
    atomic_write_with_options, recover_bak_file,
};
