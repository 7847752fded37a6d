//! Chunking properties of the storage engine, checked against both backends.

use signal_pool::data::backend::{RecordStore, StorageMode};
use signal_pool::data::codec::{SampleType, Samples};
use signal_pool::data::kind::{DataKind, KindTag};
use signal_pool::data::record::{Convertible, DataRecord, Streamable};
use signal_pool::error::PoolResult;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn ramp(n: usize) -> Samples {
    Samples::Float64((0..n).map(|i| i as f64 * 0.5).collect())
}

/// The same elements, once in memory and once on disk.
fn both_backends(samples: &Samples, dir: &Path) -> Vec<RecordStore> {
    let mut memory = RecordStore::new(samples.sample_type(), StorageMode::Ram);
    memory.write_whole(samples.clone(), None).unwrap();
    let mut file = RecordStore::new(samples.sample_type(), StorageMode::File);
    file.write_whole(samples.clone(), Some(&dir.join("record.dat")))
        .unwrap();
    vec![memory, file]
}

fn join(chunks: impl Iterator<Item = PoolResult<Samples>>, sample_type: SampleType) -> Samples {
    let mut joined = Samples::empty(sample_type);
    for chunk in chunks {
        joined.append(chunk.unwrap()).unwrap();
    }
    joined
}

#[test]
fn test_sequential_chunks_join_to_the_record() {
    for n in [0usize, 1, 7, 64, 1000] {
        let dir = tempdir().unwrap();
        let samples = ramp(n);
        for store in both_backends(&samples, dir.path()) {
            for chunk_size in [1usize, 3, 64, 5000] {
                let chunks: Vec<Samples> = store
                    .read_sequential_chunks(chunk_size)
                    .unwrap()
                    .map(Result::unwrap)
                    .collect();
                assert_eq!(chunks.len(), n.div_ceil(chunk_size));
                assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= chunk_size));
                let joined = join(
                    store.read_sequential_chunks(chunk_size).unwrap(),
                    SampleType::Float64,
                );
                assert_eq!(joined, samples, "n={n} chunk_size={chunk_size}");
            }
        }
    }
}

#[test]
fn test_overlapped_windows_on_500_elements() {
    let dir = tempdir().unwrap();
    let samples = ramp(500);
    for store in both_backends(&samples, dir.path()) {
        let windows: Vec<Samples> = store
            .read_overlapped_chunks(50, 50.0)
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(windows.len(), 20);
        for (n, window) in windows.iter().enumerate() {
            let start = n * 25;
            let end = (start + 50).min(500);
            assert_eq!(window, &samples.slice(start..end), "window {n}");
        }
        assert_eq!(windows[18].len(), 50);
        assert_eq!(windows[19].len(), 25);
    }
}

#[test]
fn test_overlap_floors_the_step() {
    let samples = Samples::Int32((0..10).collect());
    let mut store = RecordStore::new(SampleType::Int32, StorageMode::Ram);
    store.write_whole(samples, None).unwrap();
    // 3 * (1 - 0.4) = 1.8, floored to 1
    let chunks = store.read_overlapped_chunks(3, 40.0).unwrap();
    assert_eq!(chunks.step(), 1);
    assert_eq!(chunks.count(), 10);

    assert!(store.read_overlapped_chunks(1, 50.0).is_err());
}

#[test]
fn test_random_access_matches_slices() {
    let dir = tempdir().unwrap();
    let samples = ramp(103);
    for store in both_backends(&samples, dir.path()) {
        let all = store.read_all().unwrap();
        assert_eq!(all, samples);
        for chunk_size in [1usize, 10, 50] {
            let chunks = 103usize.div_ceil(chunk_size);
            for index in 0..chunks {
                let start = index * chunk_size;
                let end = (start + chunk_size).min(103);
                assert_eq!(
                    store.read_chunk_at(index, chunk_size).unwrap(),
                    all.slice(start..end)
                );
            }
            assert!(store.read_chunk_at(chunks, chunk_size).unwrap().is_empty());
            assert!(store.read_chunk_at(usize::MAX, chunk_size).unwrap().is_empty());
        }
    }
}

#[test]
fn test_streamed_file_write_matches_whole_write() {
    let dir = tempdir().unwrap();
    let samples = ramp(40);
    let mut streamed = RecordStore::new(SampleType::Float64, StorageMode::File);
    let chunks = (0..4).map(|n| samples.slice(n * 10..n * 10 + 10));
    streamed
        .write_from_iterator(chunks, Some(&dir.path().join("streamed.dat")))
        .unwrap();
    let mut whole = RecordStore::new(SampleType::Float64, StorageMode::File);
    whole
        .write_whole(samples.clone(), Some(&dir.path().join("whole.dat")))
        .unwrap();

    let streamed_bytes = std::fs::read(dir.path().join("streamed.dat")).unwrap();
    let whole_bytes = std::fs::read(dir.path().join("whole.dat")).unwrap();
    assert_eq!(streamed_bytes, whole_bytes);
    assert_eq!(streamed_bytes.len(), 320);
    assert_eq!(streamed.element_count(), 40);
}

#[test]
fn test_mismatched_chunk_aborts_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("record.dat");
    let mut store = RecordStore::new(SampleType::Int32, StorageMode::File);
    store
        .write_whole(Samples::Int32(vec![1, 2, 3]), Some(&path))
        .unwrap();

    let chunks = vec![Samples::Int32(vec![4, 5]), Samples::Float32(vec![6.0])];
    assert!(store.write_from_iterator(chunks, None).is_err());
    assert_eq!(store.read_all().unwrap(), Samples::Int32(vec![1, 2, 3]));
    assert_eq!(std::fs::read(&path).unwrap().len(), 12);
}

#[test]
fn test_text_chunks_on_disk() {
    let dir = tempdir().unwrap();
    let lines: Vec<String> = (0..5).map(|n| format!("line {n}")).collect();
    let samples = Samples::Text(lines.clone());
    for store in both_backends(&samples, dir.path()) {
        assert_eq!(store.element_count(), 5);
        assert_eq!(
            store.read_chunk_at(1, 2).unwrap(),
            Samples::Text(lines[2..4].to_vec())
        );
        let joined = join(store.read_sequential_chunks(2).unwrap(), SampleType::Text);
        assert_eq!(joined, samples);
    }
}

fn converted_record(dir: &TempDir) -> DataRecord {
    let mut record = DataRecord::new(
        "rec-1",
        "ints",
        DataKind::Integers,
        SampleType::Int32,
        StorageMode::Ram,
    )
    .unwrap();
    record
        .store_samples(Samples::Int32((0..8).collect()), None, "dat")
        .unwrap();
    record.convert_to_file(dir.path(), "dat").unwrap();
    record
}

#[test]
fn test_record_streams_after_conversion() {
    let dir = tempdir().unwrap();
    let mut record = converted_record(&dir);
    assert_eq!(record.tag(), KindTag::Integers);
    assert_eq!(
        record.store().file_path(),
        Some(dir.path().join("rec-1.dat").as_path())
    );
    let windows: Vec<Samples> = record
        .read_overlapped_chunks(4, 25.0)
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(
        windows,
        vec![
            Samples::Int32(vec![0, 1, 2, 3]),
            Samples::Int32(vec![3, 4, 5, 6]),
            Samples::Int32(vec![6, 7]),
        ]
    );

    record.convert_to_memory().unwrap();
    assert!(!dir.path().join("rec-1.dat").exists());
    assert_eq!(record.read_chunk_at(1, 4).unwrap(), Samples::Int32(vec![4, 5, 6, 7]));
}
