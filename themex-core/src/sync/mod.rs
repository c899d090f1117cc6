//! Two-way synchronization between the extension store and the system store.
//!
//! Each [SyncRule] ties a day key and a night key of the extension ("local")
//! store to one key of the system ("remote") store. While synchronization is
//! active the remote value equals the local value selected by the
//! [NightSignal](crate::signal::NightSignal), apart from the single change
//! being propagated.
//!
//! Cycles stop because a store write of an unchanged value is a no-op: once
//! both sides agree, the echo of a write notifies nobody.

mod engine;
mod rule;

pub use engine::SyncEngine;
pub use rule::{default_rules, Preference, SyncRule};

use thiserror::Error;
use themex_services::{KeyStore, StoreError, StoreResult};

/// Errors raised while setting up synchronization.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A rule names a key the store does not have. This is a programming error.
    #[error("Sync rule references undefined key '{key}' in store '{store}'")]
    UnknownKey {
        /// Name of the store.
        store: String,
        /// The undefined key.
        key: String,
    },

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Copy the string at `from_key` of `from` into `to_key` of `to`.
///
/// Returns true if the destination changed.
pub fn reconcile(from: &dyn KeyStore, from_key: &str, to: &dyn KeyStore, to_key: &str) -> StoreResult<bool> {
    let value = from.get_string(from_key);
    let changed = to.set_string(to_key, &value)?;
    if changed {
        log::debug!(
            "{}:{} -> {}:{} = {:?}",
            from.name(),
            from_key,
            to.name(),
            to_key,
            value
        );
    } else {
        log::trace!("{}:{} already {:?}", to.name(), to_key, value);
    }
    Ok(changed)
}
