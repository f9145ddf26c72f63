use llm_cost_calculator::{StorageLocation, UsageStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const THREADS: u64 = 8;
const RECORDS_PER_THREAD: u64 = 25;

/// Many threads sharing one store must get unique, increasing ids and exact totals
#[test]
fn test_concurrent_record_shared_store() {
    let temp_dir = TempDir::new().unwrap();
    let location = StorageLocation::File(temp_dir.path().join("test_concurrent.db"));
    let store = Arc::new(UsageStore::open(&location).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let endpoint = format!("/thread/{t}");
                for i in 0..RECORDS_PER_THREAD {
                    store
                        .record("gpt-4o-mini", t * 100 + i, 10, Some(endpoint.as_str()))
                        .unwrap();
                    // Reads interleave with other writers
                    assert!(!store.get_recent(1).unwrap().is_empty());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let total = THREADS * RECORDS_PER_THREAD;
    let records = store.get_recent(usize::MAX).unwrap();
    assert_eq!(records.len() as u64, total);
    assert!(records.windows(2).all(|w| w[0].id > w[1].id));

    let unique: HashSet<i64> = records.iter().map(|r| r.id).collect();
    assert_eq!(unique.len() as u64, total);

    let expected_input: u64 = (0..THREADS)
        .flat_map(|t| (0..RECORDS_PER_THREAD).map(move |i| t * 100 + i))
        .sum();
    let summary = store.get_summary().unwrap();
    assert_eq!(summary.total_requests, total);
    assert_eq!(summary.total_input_tokens, expected_input);
    assert_eq!(summary.total_output_tokens, total * 10);
    assert_eq!(summary.by_model.len(), 1);
}

/// Separate stores (connections) on one file serialize through SQLite
#[test]
fn test_concurrent_record_separate_connections() {
    let temp_dir = TempDir::new().unwrap();
    let location = StorageLocation::File(temp_dir.path().join("test_shared_file.db"));

    // Open sequentially so schema creation and WAL setup never race
    let stores: Vec<UsageStore> = (0..4).map(|_| UsageStore::open(&location).unwrap()).collect();

    let handles: Vec<_> = stores
        .into_iter()
        .enumerate()
        .map(|(t, store)| {
            thread::spawn(move || {
                for _ in 0..20 {
                    let model = if t % 2 == 0 { "gpt-4o" } else { "claude-haiku-4-5-20251001" };
                    store.record(model, 1_000, 1_000, None).unwrap();
                }
                store.close().unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let store = UsageStore::open(&location).unwrap();
    let summary = store.get_summary().unwrap();
    assert_eq!(summary.total_requests, 80);
    assert_eq!(summary.total_input_tokens, 80_000);
    assert_eq!(summary.by_model.len(), 2);

    let records = store.get_recent(usize::MAX).unwrap();
    let unique: HashSet<i64> = records.iter().map(|r| r.id).collect();
    assert_eq!(unique.len(), 80);
    assert!(records.windows(2).all(|w| w[0].id > w[1].id));
}
