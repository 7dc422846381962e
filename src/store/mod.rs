//! Store Module - Local Persisted State
//!
//! Small JSON files under the data directory: the address book and the
//! recent-addresses list. A missing or corrupt file reads as empty.

pub mod address_book;
pub mod recent;

pub use address_book::{AddressBook, BookEntry};
pub use recent::RecentAddresses;

use eyre::{eyre, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Read a JSON file, falling back to `T::default()` when absent or unreadable
pub(crate) fn read_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return T::default(),
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("⚠️ Ignoring corrupt {}: {}", path.display(), e);
            T::default()
        }
    }
}

/// Write a JSON file atomically (temp file + rename), creating parent dirs
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .map_err(|e| eyre!("cannot create {}: {}", dir.display(), e))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| eyre!("cannot write {}: {}", tmp.display(), e))?;
    fs::rename(&tmp, path).map_err(|e| eyre!("cannot replace {}: {}", path.display(), e))?;
    Ok(())
}
