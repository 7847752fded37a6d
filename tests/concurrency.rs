//! Thread-safety of the pool: concurrent readers, late subscribers and
//! registrations against one shared `DataPool`.

use signal_pool::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

fn stored_signal(pool: &DataPool, n: usize) -> String {
    let id = pool
        .register(
            KindTag::TemporalSignal,
            "shared",
            "acq",
            false,
            StorageMode::Ram,
            KindParams::temporal(0.001, "V"),
        )
        .unwrap();
    let values: Vec<f32> = (0..n).map(|i| i as f32).collect();
    pool.store(&id, values, "acq", None).unwrap();
    id
}

#[test]
fn test_concurrent_readers_release_exactly_once() {
    let pool = DataPool::default();
    let mut events = pool.subscribe_events();
    let id = stored_signal(&pool, 1000);
    let readers: Vec<String> = (0..8).map(|n| format!("reader-{n}")).collect();
    for reader in &readers {
        pool.add_subscriber(&id, reader).unwrap();
    }

    let start = Arc::new(Barrier::new(readers.len()));
    let mut handles = vec![];
    for reader in readers {
        let pool = pool.clone();
        let id = id.clone();
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || {
            start.wait();
            let total: usize = pool
                .get_chunk_generator(&id, &reader, 64)
                .unwrap()
                .map(|chunk| chunk.unwrap().len())
                .sum();
            total
        }));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1000);
    }

    assert_eq!(pool.state(&id).unwrap(), RecordState::Released);
    let mut released = 0;
    let mut acknowledged = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            PoolEvent::Released { .. } => released += 1,
            PoolEvent::Acknowledged { .. } => acknowledged += 1,
            _ => {}
        }
    }
    assert_eq!(released, 1);
    assert_eq!(acknowledged, 8);
}

#[test]
fn test_subscriber_added_during_acknowledgments_is_honoured() {
    for _ in 0..50 {
        let pool = DataPool::default();
        let id = stored_signal(&pool, 16);
        pool.add_subscriber(&id, "first").unwrap();

        let start = Arc::new(Barrier::new(2));
        let late = {
            let pool = pool.clone();
            let id = id.clone();
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                pool.add_subscriber(&id, "late")
            })
        };
        start.wait();
        let released = pool.acknowledge(&id, "first").unwrap();
        let added = late.join().unwrap();

        if released {
            // The barrier won the race; the late subscriber saw a released record.
            assert!(matches!(added, Err(PoolError::NotFound(_))));
        } else {
            // The late subscriber was bound first and now holds the record.
            added.unwrap();
            assert_eq!(pool.state(&id).unwrap(), RecordState::Unlocked);
            assert_eq!(pool.get_data(&id, "late").unwrap().len(), 16);
            assert_eq!(pool.state(&id).unwrap(), RecordState::Released);
        }
    }
}

#[test]
fn test_concurrent_registration() {
    let pool = DataPool::default();
    let mut handles = vec![];
    for n in 0..10i32 {
        let pool = pool.clone();
        handles.push(thread::spawn(move || {
            let source = format!("source-{n}");
            let id = pool
                .register(
                    KindTag::Integers,
                    "counts",
                    &source,
                    false,
                    StorageMode::Ram,
                    KindParams::default(),
                )
                .unwrap();
            pool.store(&id, vec![n; 4], &source, None).unwrap();
            id
        }));
    }
    let mut ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);
    assert_eq!(pool.len(), 10);
    assert!(pool
        .list_records()
        .iter()
        .all(|info| info.element_count == 4));
}

#[test]
fn test_readers_and_random_access_share_a_file_record() {
    let dir = tempfile::tempdir().unwrap();
    let pool = DataPool::default();
    let id = pool
        .register(
            KindTag::TemporalSignal,
            "on disk",
            "acq",
            true,
            StorageMode::File,
            KindParams::temporal(0.001, "V"),
        )
        .unwrap();
    let values: Vec<f32> = (0..256).map(|i| i as f32).collect();
    pool.store(&id, values.clone(), "acq", Some(dir.path()))
        .unwrap();
    for n in 0..4 {
        pool.add_subscriber(&id, &format!("reader-{n}")).unwrap();
    }

    let mut handles = vec![];
    for n in 0..4 {
        let pool = pool.clone();
        let id = id.clone();
        handles.push(thread::spawn(move || {
            let reader = format!("reader-{n}");
            let windows: Vec<Samples> = pool
                .get_overlapped_chunk_generator(&id, &reader, 32, 50.0)
                .unwrap()
                .collect::<PoolResult<_>>()
                .unwrap();
            let chunk = pool.get_chunk_at(&id, n, 64).unwrap();
            (windows.len(), chunk)
        }));
    }
    for (n, handle) in handles.into_iter().enumerate() {
        let (windows, chunk) = handle.join().unwrap();
        assert_eq!(windows, 16);
        assert_eq!(chunk, Samples::Float32(values[n * 64..(n + 1) * 64].to_vec()));
    }
    // Protected records stay after every subscriber has acknowledged.
    assert_eq!(pool.state(&id).unwrap(), RecordState::Unlocked);
}

#[test]
fn test_lock_and_convert_wait_out_a_store_in_progress() {
    let pool = DataPool::default();
    let id = pool
        .register(
            KindTag::Integers,
            "streamed",
            "acq",
            false,
            StorageMode::Ram,
            KindParams::default(),
        )
        .unwrap();

    let mut during_store = None;
    let chunks = (0..4i32).map(|n| {
        if n == 2 {
            // Runs while the store holds the record.
            let lock = pool.lock(&id);
            let unlock = pool.unlock(&id);
            let convert = {
                let pool = pool.clone();
                let id = id.clone();
                thread::spawn(move || pool.convert_to_ram(&id)).join().unwrap()
            };
            let second_store = pool.store(&id, vec![9i32], "acq", None);
            during_store = Some((lock, unlock, convert, second_store));
        }
        Samples::Int32(vec![n; 4])
    });
    pool.store_from_chunks(&id, chunks, "acq", None).unwrap();

    let (lock, unlock, convert, second_store) = during_store.unwrap();
    assert!(matches!(lock, Err(PoolError::Locked(_))));
    assert!(matches!(unlock, Err(PoolError::Locked(_))));
    assert!(matches!(convert, Err(PoolError::Locked(_))));
    assert!(matches!(second_store, Err(PoolError::Locked(_))));

    assert_eq!(pool.state(&id).unwrap(), RecordState::Unlocked);
    assert_eq!(pool.get_info(&id).unwrap().element_count, 16);
    pool.convert_to_ram(&id).unwrap();
    assert_eq!(pool.state(&id).unwrap(), RecordState::Unlocked);
}
