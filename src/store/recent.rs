//! Recently scanned owners, most recent first

use eyre::Result;
use std::path::{Path, PathBuf};

use super::{read_json, write_json};
use crate::utils::constants::MAX_RECENT_ADDRESSES;

const FILE_NAME: &str = "recent.json";

/// File-backed recent list, capped at `MAX_RECENT_ADDRESSES`
#[derive(Debug)]
pub struct RecentAddresses {
    path: PathBuf,
    entries: Vec<String>,
}

impl RecentAddresses {
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(FILE_NAME);
        let mut entries: Vec<String> = read_json(&path);
        entries.truncate(MAX_RECENT_ADDRESSES);
        Self { path, entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Move `address` to the front, dropping any case-insensitive duplicate
    pub fn push(&mut self, address: &str) -> Result<()> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(());
        }
        self.entries.retain(|a| !a.eq_ignore_ascii_case(address));
        self.entries.insert(0, address.to_string());
        self.entries.truncate(MAX_RECENT_ADDRESSES);
        write_json(&self.path, &self.entries)
    }
}
