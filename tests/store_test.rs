//! Address book and recent list persistence

use allowance_watch::store::{AddressBook, RecentAddresses};
use allowance_watch::utils::constants::MAX_RECENT_ADDRESSES;
use std::fs;
use tempfile::TempDir;

const VITALIK: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

#[test]
fn test_book_starts_empty() {
    let dir = TempDir::new().unwrap();
    let book = AddressBook::load(dir.path());
    assert!(book.entries().is_empty());
}

#[test]
fn test_book_add_persists_newest_first() {
    let dir = TempDir::new().unwrap();
    let mut book = AddressBook::load(dir.path());

    assert!(book.add(VITALIK, "vitalik").unwrap());
    assert!(book.add("  nick.eth ", " nick ").unwrap());

    let reloaded = AddressBook::load(dir.path());
    let labels: Vec<&str> = reloaded.entries().iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["nick", "vitalik"]);
    assert_eq!(reloaded.entries()[0].address, "nick.eth");
}

#[test]
fn test_book_relabels_existing_entry_in_place() {
    let dir = TempDir::new().unwrap();
    let mut book = AddressBook::load(dir.path());
    book.add(VITALIK, "old").unwrap();
    book.add("0x0000000000000000000000000000000000000001", "other").unwrap();

    assert!(!book.add(&VITALIK.to_lowercase(), "main").unwrap());

    let reloaded = AddressBook::load(dir.path());
    assert_eq!(reloaded.entries().len(), 2);
    assert_eq!(reloaded.entries()[1].label, "main");
    assert_eq!(reloaded.entries()[1].address, VITALIK);
    assert!(reloaded.find(&VITALIK.to_uppercase().replace("0X", "0x")).is_some());
}

#[test]
fn test_book_rejects_blank_fields() {
    let dir = TempDir::new().unwrap();
    let mut book = AddressBook::load(dir.path());
    assert!(book.add("  ", "label").is_err());
    assert!(book.add(VITALIK, "   ").is_err());
    assert!(book.entries().is_empty());
}

#[test]
fn test_book_remove() {
    let dir = TempDir::new().unwrap();
    let mut book = AddressBook::load(dir.path());
    book.add(VITALIK, "vitalik").unwrap();

    assert!(!book.remove("0x0000000000000000000000000000000000000002").unwrap());
    assert!(book.remove(&VITALIK.to_lowercase()).unwrap());
    assert!(AddressBook::load(dir.path()).entries().is_empty());
}

#[test]
fn test_corrupt_files_read_as_empty() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("address_book.json"), "{not json").unwrap();
    fs::write(dir.path().join("recent.json"), "[1, 2").unwrap();

    assert!(AddressBook::load(dir.path()).entries().is_empty());
    assert!(RecentAddresses::load(dir.path()).entries().is_empty());

    // and can be overwritten
    let mut book = AddressBook::load(dir.path());
    book.add(VITALIK, "vitalik").unwrap();
    assert_eq!(AddressBook::load(dir.path()).entries().len(), 1);
}

#[test]
fn test_recent_is_capped_and_deduplicated() {
    let dir = TempDir::new().unwrap();
    let mut recent = RecentAddresses::load(dir.path());

    for i in 0..12 {
        recent.push(&format!("0x{:040x}", i)).unwrap();
    }
    assert_eq!(recent.entries().len(), MAX_RECENT_ADDRESSES);
    assert_eq!(recent.entries()[0], format!("0x{:040x}", 11));

    recent.push(VITALIK).unwrap();
    recent.push(&VITALIK.to_lowercase()).unwrap();

    let reloaded = RecentAddresses::load(dir.path());
    assert_eq!(reloaded.entries().len(), MAX_RECENT_ADDRESSES);
    assert_eq!(reloaded.entries()[0], VITALIK.to_lowercase());
    assert_eq!(
        reloaded
            .entries()
            .iter()
            .filter(|a| a.eq_ignore_ascii_case(VITALIK))
            .count(),
        1
    );
}

#[test]
fn test_recent_creates_missing_data_dir() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b");
    let mut recent = RecentAddresses::load(&nested);
    recent.push("vitalik.eth").unwrap();
    assert!(nested.join("recent.json").exists());
}
