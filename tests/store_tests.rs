// Basic get/put/delete/clear behavior against committed state.

use burrow::{Error, Store};
use tempfile::tempdir;

#[test]
fn get_absent_key_returns_none() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    assert_eq!(store.get(b"never_set").unwrap(), None);
}

#[test]
fn read_your_write() {
    let dir = tempdir().unwrap();
    let mut store = Store::open(dir.path()).unwrap();

    store.put(b"key", b"value").unwrap();
    assert_eq!(store.get(b"key").unwrap(), Some(b"value".to_vec()));
}

#[test]
fn put_overwrites_existing_value() {
    let dir = tempdir().unwrap();
    let mut store = Store::open(dir.path()).unwrap();

    store.put(b"key", b"first").unwrap();
    store.put(b"key", b"second").unwrap();
    assert_eq!(store.get(b"key").unwrap(), Some(b"second".to_vec()));
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn delete_returns_prior_value() {
    let dir = tempdir().unwrap();
    let mut store = Store::open(dir.path()).unwrap();

    store.put(b"key", b"value").unwrap();
    assert_eq!(store.delete(b"key").unwrap(), Some(b"value".to_vec()));
    assert_eq!(store.get(b"key").unwrap(), None);
}

#[test]
fn delete_absent_key_is_not_an_error() {
    let dir = tempdir().unwrap();
    let mut store = Store::open(dir.path()).unwrap();
    assert_eq!(store.delete(b"missing").unwrap(), None);
}

#[test]
fn empty_value_is_distinct_from_absent() {
    let dir = tempdir().unwrap();
    let mut store = Store::open(dir.path()).unwrap();

    store.put(b"key", b"").unwrap();
    assert_eq!(store.get(b"key").unwrap(), Some(Vec::new()));
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn len_counts_distinct_keys_and_clear_resets() {
    let dir = tempdir().unwrap();
    let mut store = Store::open(dir.path()).unwrap();

    assert!(store.is_empty().unwrap());
    store.put(b"a", b"1").unwrap();
    store.put(b"b", b"2").unwrap();
    store.put(b"a", b"3").unwrap();
    assert_eq!(store.len().unwrap(), 2);

    store.clear().unwrap();
    assert_eq!(store.len().unwrap(), 0);
    assert_eq!(store.get(b"a").unwrap(), None);
}

#[test]
fn empty_key_is_rejected() {
    let dir = tempdir().unwrap();
    let mut store = Store::open(dir.path()).unwrap();
    assert!(matches!(
        store.put(b"", b"value"),
        Err(Error::InvalidArgument(_))
    ));
}
