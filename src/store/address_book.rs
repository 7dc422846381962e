//! Address book: labelled owner addresses, newest first

use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{read_json, write_json};

const FILE_NAME: &str = "address_book.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEntry {
    /// Address (or name) as it was saved
    pub address: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// File-backed address book
#[derive(Debug)]
pub struct AddressBook {
    path: PathBuf,
    entries: Vec<BookEntry>,
}

impl AddressBook {
    /// Load from `<data_dir>/address_book.json`
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(FILE_NAME);
        let entries = read_json(&path);
        Self { path, entries }
    }

    pub fn entries(&self) -> &[BookEntry] {
        &self.entries
    }

    /// Case-insensitive lookup
    pub fn find(&self, address: &str) -> Option<&BookEntry> {
        let address = address.trim();
        self.entries
            .iter()
            .find(|e| e.address.eq_ignore_ascii_case(address))
    }

    /// Save `address` under `label`
    ///
    /// An existing entry (case-insensitive match) only gets its label
    /// updated and keeps its position; a new one goes to the front.
    /// Returns `true` when a new entry was created.
    pub fn add(&mut self, address: &str, label: &str) -> Result<bool> {
        let address = address.trim();
        let label = label.trim();
        if address.is_empty() {
            return Err(eyre!("address must not be empty"));
        }
        if label.is_empty() {
            return Err(eyre!("label must not be empty"));
        }

        let created = match self
            .entries
            .iter_mut()
            .find(|e| e.address.eq_ignore_ascii_case(address))
        {
            Some(existing) => {
                existing.label = label.to_string();
                false
            }
            None => {
                self.entries.insert(
                    0,
                    BookEntry {
                        address: address.to_string(),
                        label: label.to_string(),
                        created_at: Utc::now(),
                    },
                );
                true
            }
        };

        self.save()?;
        info!("📒 Saved {} as \"{}\"", address, label);
        Ok(created)
    }

    /// Remove by address (case-insensitive); `true` if something was removed
    pub fn remove(&mut self, address: &str) -> Result<bool> {
        let address = address.trim();
        let before = self.entries.len();
        self.entries
            .retain(|e| !e.address.eq_ignore_ascii_case(address));
        let removed = self.entries.len() != before;
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    fn save(&self) -> Result<()> {
        write_json(&self.path, &self.entries)
    }
}
