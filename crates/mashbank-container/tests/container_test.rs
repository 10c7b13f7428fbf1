//! Integration tests: append/read/scan round-trips, rotation, torn tails.

use std::io::Cursor;

use mashbank_container::chain::{advance_chain, replay_chain, ReplayOutcome};
use mashbank_container::{
    append_from_reader, read_data, scan, select_container, validate_entry, EntryHeader,
};
use mashbank_core::hashing;

fn append_bytes(path: &std::path::Path, data: &[u8]) -> (String, u64) {
    let hash = hashing::hash_bytes(data);
    let offset = append_from_reader(path, &hash, data.len() as u64, &mut Cursor::new(data)).unwrap();
    (hash, offset)
}

#[test]
fn test_append_then_read_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.dat");

    let data = b"hello container".to_vec();
    let (_, offset) = append_bytes(&path, &data);
    assert_eq!(offset, 0);

    let back = read_data(&path, offset, data.len() as u64).unwrap();
    assert_eq!(back, data);
}

#[test]
fn test_offsets_are_contiguous() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.dat");

    let (_, o1) = append_bytes(&path, &[1u8; 100]);
    let (_, o2) = append_bytes(&path, &[2u8; 50]);
    let (_, o3) = append_bytes(&path, &[3u8; 7]);

    assert_eq!(o1, 0);
    assert_eq!(o2, 110 + 100);
    assert_eq!(o3, o2 + 110 + 50);
}

#[test]
fn test_short_reader_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.dat");
    let data = [9u8; 10];
    let hash = hashing::hash_bytes(&data);

    let err = append_from_reader(&path, &hash, 20, &mut Cursor::new(&data)).unwrap_err();
    assert!(err.to_string().contains("size mismatch"));
}

#[test]
fn test_long_reader_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.dat");
    let data = [9u8; 30];
    let hash = hashing::hash_bytes(&data);

    let err = append_from_reader(&path, &hash, 20, &mut Cursor::new(&data)).unwrap_err();
    assert!(err.to_string().contains("size mismatch"));
}

#[test]
fn test_scan_visits_entries_in_append_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.dat");

    let mut hashes = Vec::new();
    for i in 0..5u8 {
        let data = vec![i; 10 + i as usize];
        hashes.push(append_bytes(&path, &data).0);
    }

    let mut seen = Vec::new();
    let count = scan(&path, |offset, header| {
        seen.push((offset, header.hash.clone(), header.data_len));
    })
    .unwrap();

    assert_eq!(count, 5);
    assert_eq!(seen.len(), 5);
    for (i, (_, hash, len)) in seen.iter().enumerate() {
        assert_eq!(hash, &hashes[i]);
        assert_eq!(*len, 10 + i as u64);
    }
    // Offsets are strictly increasing and contiguous.
    for pair in seen.windows(2) {
        assert_eq!(pair[1].0, pair[0].0 + 110 + pair[0].2);
    }
}

#[test]
fn test_scan_tolerates_torn_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.dat");

    append_bytes(&path, &[1u8; 100]);
    append_bytes(&path, &[2u8; 100]);

    // Simulate a crashed partial write: a header promising more data
    // than the file holds.
    let orphan = EntryHeader::new(&hashing::hash_bytes(b"orphan"), 9999).unwrap();
    let mut raw = std::fs::read(&path).unwrap();
    raw.extend_from_slice(&orphan.serialize().unwrap());
    raw.extend_from_slice(&[0u8; 17]);
    std::fs::write(&path, &raw).unwrap();

    let count = scan(&path, |_, _| {}).unwrap();
    assert_eq!(count, 2);
}

#[test]
fn test_scan_tolerates_garbage_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.dat");

    append_bytes(&path, &[1u8; 64]);
    let mut raw = std::fs::read(&path).unwrap();
    raw.extend_from_slice(b"not a header at all, just junk bytes following the last entry ......");
    std::fs::write(&path, &raw).unwrap();

    assert_eq!(scan(&path, |_, _| {}).unwrap(), 1);
}

#[test]
fn test_validate_detects_flipped_byte() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.dat");

    let (_, offset) = append_bytes(&path, &[5u8; 256]);
    assert!(validate_entry(&path, offset).is_ok());

    // Flip one data byte.
    let mut raw = std::fs::read(&path).unwrap();
    raw[110 + 17] ^= 0xff;
    std::fs::write(&path, &raw).unwrap();

    let err = validate_entry(&path, offset).unwrap_err();
    assert!(err.to_string().contains("hash mismatch"));
}

#[test]
fn test_replay_chain_matches_incremental() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.dat");

    let mut chain = String::new();
    for i in 0..4u8 {
        let data = vec![i; 500];
        let hash = hashing::hash_bytes(&data);
        append_from_reader(&path, &hash, 500, &mut Cursor::new(&data)).unwrap();
        let header = EntryHeader::new(&hash, 500).unwrap();
        chain = advance_chain(&chain, &header.serialize().unwrap(), &data).unwrap();
    }

    match replay_chain(&path, 0, |_| true).unwrap() {
        ReplayOutcome::Complete { chain_hex, count } => {
            assert_eq!(count, 4);
            assert_eq!(chain_hex, chain);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn test_replay_chain_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.dat");
    for i in 0..10u8 {
        append_bytes(&path, &[i; 64]);
    }

    let outcome = replay_chain(&path, 3, |done| done < 3).unwrap();
    assert_eq!(outcome, ReplayOutcome::Cancelled { entries_done: 3 });
}

#[test]
fn test_replay_ignores_truncated_final_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.dat");

    append_bytes(&path, &[1u8; 300]);
    append_bytes(&path, &[2u8; 300]);

    // Truncate one byte out of the final entry.
    let raw = std::fs::read(&path).unwrap();
    std::fs::write(&path, &raw[..raw.len() - 1]).unwrap();

    match replay_chain(&path, 0, |_| true).unwrap() {
        ReplayOutcome::Complete { count, .. } => assert_eq!(count, 1),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn test_rotation_policy() {
    let dir = tempfile::tempdir().unwrap();

    // Fresh topic: first entry goes to 001.dat.
    let choice = select_container(dir.path(), 500, 2048).unwrap();
    assert_eq!(choice.name, "001.dat");
    assert!(choice.fresh);

    // Five 500-byte entries under a 2 KiB cap: three fit in 001
    // (3 * 610 = 1830 <= 2048), the next two roll to 002.
    for i in 0..5u8 {
        let data = vec![i; 500];
        let choice = select_container(dir.path(), 500, 2048).unwrap();
        let hash = hashing::hash_bytes(&data);
        append_from_reader(&choice.path, &hash, 500, &mut Cursor::new(&data)).unwrap();
        if i < 3 {
            assert_eq!(choice.name, "001.dat", "entry {i}");
        } else {
            assert_eq!(choice.name, "002.dat", "entry {i}");
        }
    }

    assert_eq!(scan(&dir.path().join("001.dat"), |_, _| {}).unwrap(), 3);
    assert_eq!(scan(&dir.path().join("002.dat"), |_, _| {}).unwrap(), 2);
}

#[test]
fn test_rotation_skips_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
    std::fs::create_dir(dir.path().join(".internal")).unwrap();

    let choice = select_container(dir.path(), 10, 1 << 20).unwrap();
    assert_eq!(choice.name, "001.dat");
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_header_roundtrip(data_len in 0u64..u64::MAX / 2, seed in any::<[u8; 32]>()) {
            let hash = blake3::hash(&seed).to_hex().to_string();
            let header = EntryHeader::new(&hash, data_len).unwrap();
            let parsed = EntryHeader::parse(&header.serialize().unwrap()).unwrap();
            prop_assert_eq!(parsed, header);
        }

        #[test]
        fn prop_append_read_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("001.dat");
            let hash = hashing::hash_bytes(&data);
            let offset = append_from_reader(
                &path, &hash, data.len() as u64, &mut Cursor::new(&data),
            ).unwrap();
            let back = read_data(&path, offset, data.len() as u64).unwrap();
            prop_assert_eq!(back, data);
        }
    }
}
