// Ordered iteration: direction, start keys, re-evaluation.

use burrow::{Direction, Store};
use tempfile::tempdir;

fn seeded_store(dir: &std::path::Path) -> Store {
    let mut store = Store::open(dir).unwrap();
    store.put(b"key1", b"val1").unwrap();
    store.put(b"key2", b"val2").unwrap();
    store.put(b"key3", b"val3").unwrap();
    store
}

fn collect(store: &Store, direction: Direction, start: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)> {
    store.cursor(direction, start).unwrap().collect()
}

#[test]
fn ascending_yields_exact_sequence() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());

    assert_eq!(
        collect(&store, Direction::Ascending, None),
        vec![
            (b"key1".to_vec(), b"val1".to_vec()),
            (b"key2".to_vec(), b"val2".to_vec()),
            (b"key3".to_vec(), b"val3".to_vec()),
        ]
    );
}

#[test]
fn descending_yields_exact_reverse() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());

    assert_eq!(
        collect(&store, Direction::Descending, None),
        vec![
            (b"key3".to_vec(), b"val3".to_vec()),
            (b"key2".to_vec(), b"val2".to_vec()),
            (b"key1".to_vec(), b"val1".to_vec()),
        ]
    );
}

#[test]
fn ascending_starts_at_smallest_key_at_or_after_start() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());

    // Exact hit is included.
    let keys: Vec<Vec<u8>> = collect(&store, Direction::Ascending, Some(b"key2"))
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec![b"key2".to_vec(), b"key3".to_vec()]);

    // A start between keys lands on the next larger one.
    let keys: Vec<Vec<u8>> = collect(&store, Direction::Ascending, Some(b"key15"))
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec![b"key2".to_vec(), b"key3".to_vec()]);
}

#[test]
fn descending_starts_at_largest_key_at_or_before_start() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());

    let keys: Vec<Vec<u8>> = collect(&store, Direction::Descending, Some(b"key2"))
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec![b"key2".to_vec(), b"key1".to_vec()]);

    let keys: Vec<Vec<u8>> = collect(&store, Direction::Descending, Some(b"key25"))
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec![b"key2".to_vec(), b"key1".to_vec()]);
}

#[test]
fn start_past_either_end_yields_nothing() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());

    assert!(collect(&store, Direction::Ascending, Some(b"zzz")).is_empty());
    assert!(collect(&store, Direction::Descending, Some(b"aaa")).is_empty());
}

#[test]
fn fresh_cursor_reflects_later_mutations() {
    let dir = tempdir().unwrap();
    let mut store = Store::open(dir.path()).unwrap();
    store.put(b"a", b"1").unwrap();

    let first: Vec<_> = store.iter().unwrap().collect();
    assert_eq!(first.len(), 1);

    store.put(b"b", b"2").unwrap();
    let second: Vec<_> = store.iter().unwrap().collect();
    assert_eq!(second.len(), 2);
}

#[test]
fn empty_store_yields_empty_sequence() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    assert_eq!(store.iter().unwrap().count(), 0);
}
