//! Tests for opening, reopening and validating container files
//!
//! These tests verify:
//! - Fresh containers and truncation
//! - Reload rebuilds the same index
//! - Read-only opens never touch the file
//! - Malformed files are rejected

use std::fs;
use std::path::{Path, PathBuf};

use mapkv::storage::{ENTRY_META_SIZE, HEADER_SIZE, TAG};
use mapkv::{Config, Container, DuplicatePolicy, MapError, OpenMode};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_path() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.ofl");
    (temp_dir, path)
}

fn populate(path: &Path, entries: &[(&str, &[u8])]) {
    let mut container = Container::open_path(path, "rw").unwrap();
    for (name, data) in entries {
        container.write(name, data).unwrap();
    }
    container.close().unwrap();
}

fn open_with_policy(path: &Path, policy: DuplicatePolicy) -> Result<Container, MapError> {
    let config = Config::builder()
        .path(path)
        .mode(OpenMode::read_only())
        .duplicate_policy(policy)
        .build();
    Container::open(config)
}

/// Write two entries, then overwrite the second name on disk so both share one name
fn write_duplicate_file(path: &Path) {
    let mut container = Container::open_path(path, "rw").unwrap();
    container.write("aa", b"first").unwrap();
    container.write("bb", b"second").unwrap();
    let second = container.get_offset("bb") as usize;
    container.close().unwrap();

    let mut bytes = fs::read(path).unwrap();
    let name_start = second + ENTRY_META_SIZE;
    bytes[name_start..name_start + 2].copy_from_slice(b"aa");
    fs::write(path, bytes).unwrap();
}

// =============================================================================
// Open / Create Tests
// =============================================================================

#[test]
fn test_create_new_container() {
    let (_temp, path) = setup_temp_path();

    let container = Container::open_path(&path, "rw").unwrap();

    assert!(container.is_empty());
    assert_eq!(container.entry_count(), 0);
    assert_eq!(container.logical_size(), HEADER_SIZE);
    assert!(container.is_writable());
    container.close().unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), HEADER_SIZE);
    assert_eq!(&bytes[..TAG.len()], TAG);
}

#[test]
fn test_open_missing_read_only_fails() {
    let (_temp, path) = setup_temp_path();

    let err = Container::open_path(&path, "r").unwrap_err();

    match err {
        MapError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("Expected Io(NotFound), got {:?}", other),
    }
    assert!(!path.exists());
}

#[test]
fn test_zero_page_size_rejected() {
    let (_temp, path) = setup_temp_path();
    let config = Config::builder()
        .path(&path)
        .mode(OpenMode::read_write())
        .page_size(0)
        .build();

    assert!(matches!(Container::open(config), Err(MapError::Config(_))));
}

#[test]
fn test_truncate_resets_container() {
    let (_temp, path) = setup_temp_path();
    populate(&path, &[("one", b"1"), ("two", b"2")]);

    let container = Container::open_path(&path, "rwt").unwrap();

    assert!(container.is_empty());
    assert_eq!(container.entry_count(), 0);
    assert_eq!(container.logical_size(), HEADER_SIZE);
    container.close().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len() as usize, HEADER_SIZE);
}

#[test]
fn test_truncate_ignored_when_read_only() {
    let (_temp, path) = setup_temp_path();
    populate(&path, &[("keep", b"me")]);

    let container = Container::open_path(&path, "rt").unwrap();

    assert_eq!(container.read("keep").unwrap(), b"me");
}

// =============================================================================
// Reload Tests
// =============================================================================

#[test]
fn test_reopen_preserves_entries() {
    let (_temp, path) = setup_temp_path();
    let mut container = Container::open_path(&path, "rw").unwrap();
    for i in 0..100 {
        container
            .write(&format!("entry{}", i), format!("data for {}", i).as_bytes())
            .unwrap();
    }
    container.delete("entry10").unwrap();
    container.rename("entry20", "renamed-twenty").unwrap();
    let mut before = container.entries();
    let size = container.logical_size();
    container.close().unwrap();

    let reopened = Container::open_path(&path, "r").unwrap();
    let mut after = reopened.entries();
    before.sort_by(|a, b| a.name.cmp(&b.name));
    after.sort_by(|a, b| a.name.cmp(&b.name));

    assert_eq!(before, after);
    assert_eq!(reopened.logical_size(), size);
    assert_eq!(reopened.entry_count(), 99);
    assert_eq!(reopened.read("renamed-twenty").unwrap(), b"data for 20");
    assert!(!reopened.contains("entry10"));
}

#[test]
fn test_reopen_twice_is_stable() {
    let (_temp, path) = setup_temp_path();
    populate(&path, &[("a", b"1"), ("b", b"22"), ("c", b"333")]);

    let first = Container::open_path(&path, "rw").unwrap();
    let offsets: Vec<u64> = ["a", "b", "c"].iter().map(|n| first.get_offset(n)).collect();
    first.close().unwrap();
    let bytes = fs::read(&path).unwrap();

    let second = Container::open_path(&path, "rw").unwrap();
    let reloaded: Vec<u64> = ["a", "b", "c"].iter().map(|n| second.get_offset(n)).collect();
    second.close().unwrap();

    assert_eq!(offsets, reloaded);
    assert_eq!(fs::read(&path).unwrap(), bytes);
}

#[test]
fn test_reopen_with_different_bucket_count() {
    let (_temp, path) = setup_temp_path();
    populate(&path, &[("x", b"1"), ("y", b"2"), ("z", b"3")]);

    let config = Config::builder()
        .path(&path)
        .mode(OpenMode::read_only())
        .bucket_count(1)
        .build();
    let container = Container::open(config).unwrap();

    assert_eq!(container.len(), 3);
    assert_eq!(container.read("z").unwrap(), b"3");
    assert_eq!(container.config().bucket_count, 1);
    assert_eq!(container.config().page_size, mapkv::config::DEFAULT_PAGE_SIZE);
    assert_eq!(container.mode(), OpenMode::read_only());
}

#[test]
fn test_duplicate_on_reload_keeps_first() {
    let (_temp, path) = setup_temp_path();
    write_duplicate_file(&path);

    let container = open_with_policy(&path, DuplicatePolicy::Warn).unwrap();

    assert_eq!(container.len(), 1);
    assert_eq!(container.entry_count(), 2);
    assert_eq!(container.read("aa").unwrap(), b"first");
}

#[test]
fn test_duplicate_on_reload_rejected() {
    let (_temp, path) = setup_temp_path();
    write_duplicate_file(&path);

    let err = open_with_policy(&path, DuplicatePolicy::Reject).unwrap_err();

    assert!(matches!(err, MapError::InvalidFormat(_)));
}

// =============================================================================
// Read-only Tests
// =============================================================================

#[test]
fn test_read_only_rejects_mutations() {
    let (_temp, path) = setup_temp_path();
    populate(&path, &[("stay", b"put"), ("also", b"here")]);
    let before = fs::read(&path).unwrap();

    let mut container = Container::open_path(&path, "r").unwrap();

    assert!(matches!(container.write("new", b"x"), Err(MapError::ReadOnly)));
    assert!(matches!(container.delete("stay"), Err(MapError::ReadOnly)));
    assert!(matches!(
        container.rename("stay", "gone"),
        Err(MapError::ReadOnly)
    ));
    assert!(matches!(container.clean_up(), Err(MapError::ReadOnly)));

    assert_eq!(container.read("stay").unwrap(), b"put");
    assert_eq!(container.len(), 2);
    assert!(!container.is_poisoned());
    container.close().unwrap();

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_read_only_reads() {
    let (_temp, path) = setup_temp_path();
    populate(&path, &[("k", b"value")]);

    let container = Container::open_path(&path, "r").unwrap();
    let mut buf = [0u8; 8];

    assert_eq!(container.read_into("k", &mut buf).unwrap(), 5);
    assert_eq!(&buf[..5], b"value");
    assert_eq!(container.materialize(container.get_offset("k")), Some(&b"value"[..]));
}

// =============================================================================
// Format Validation Tests
// =============================================================================

#[test]
fn test_short_file_rejected() {
    let (_temp, path) = setup_temp_path();
    fs::write(&path, b"OFL").unwrap();

    assert!(matches!(
        Container::open_path(&path, "rw"),
        Err(MapError::InvalidFormat(_))
    ));
}

#[test]
fn test_bad_tag_rejected() {
    let (_temp, path) = setup_temp_path();
    populate(&path, &[("k", b"v")]);
    let mut bytes = fs::read(&path).unwrap();
    bytes[0..3].copy_from_slice(b"XYZ");
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        Container::open_path(&path, "r"),
        Err(MapError::InvalidFormat(_))
    ));
}

#[test]
fn test_cut_short_file_rejected() {
    let (_temp, path) = setup_temp_path();
    populate(&path, &[("k", b"some data here")]);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

    assert!(matches!(
        Container::open_path(&path, "r"),
        Err(MapError::InvalidFormat(_))
    ));
}

#[test]
fn test_corrupt_entry_length_rejected() {
    let (_temp, path) = setup_temp_path();
    populate(&path, &[("k", b"v")]);
    let mut bytes = fs::read(&path).unwrap();
    // Blow up the data size of the first entry
    let word = std::mem::size_of::<usize>();
    bytes[HEADER_SIZE..HEADER_SIZE + word].copy_from_slice(&usize::MAX.to_ne_bytes());
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        Container::open_path(&path, "r"),
        Err(MapError::InvalidFormat(_))
    ));
}
