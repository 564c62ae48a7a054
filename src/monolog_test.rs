use super::*;

#[test]
fn test_fine_locate_bucket_boundaries() {
    // bucket k holds 2^(k+4) elements: bucket 0 = [0,16), bucket 1 =
    // [16,48), bucket 2 = [48,112), doubling each time (spec §4.1).
    assert_eq!(fine_locate(0).0, 0);
    assert_eq!(fine_locate(15).0, 0);
    assert_eq!(fine_locate(16).0, 1);
    assert_eq!(fine_locate(47).0, 1);
    assert_eq!(fine_locate(48).0, 2);
    assert_eq!(fine_locate(111).0, 2);
    assert_eq!(fine_locate(112).0, 3);
}

#[test]
fn test_fine_log_store_load_single_bucket() {
    let log = FineLog::new();
    log.ensure_allocated(0, 10);
    for i in 0..10 {
        log.store(i, (i as u64) * 7);
    }
    for i in 0..10 {
        assert_eq!(log.load(i), (i as u64) * 7);
    }
}

#[test]
fn test_fine_log_crosses_bucket_boundary() {
    let log = FineLog::new();
    log.ensure_allocated(0, 40);
    for i in 0..40 {
        log.store(i, i as u64);
    }
    for i in 0..40 {
        assert_eq!(log.load(i), i as u64);
    }
}

#[test]
fn test_fine_log_concurrent_allocation_single_winner() {
    use std::sync::Arc;
    use std::thread;

    let log = Arc::new(FineLog::new());
    let mut handles = Vec::new();
    for t in 0..8u64 {
        let log = Arc::clone(&log);
        handles.push(thread::spawn(move || {
            log.ensure_allocated(100, 200);
            log.store(100 + t, t);
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    for t in 0..8u64 {
        assert_eq!(log.load(100 + t), t);
    }
}

#[test]
fn test_coarse_bytes_write_read_within_bucket() {
    let log = CoarseBytes::new(16, 4);
    log.ensure_allocated(0, 16);
    log.write(0, b"hello world!!!!!");
    let mut dst = [0u8; 16];
    log.read(0, &mut dst);
    assert_eq!(&dst, b"hello world!!!!!");
}

#[test]
fn test_coarse_bytes_write_read_across_buckets() {
    let log = CoarseBytes::new(8, 4);
    let payload = b"0123456789abcdef"; // 16 bytes, spans two 8-byte buckets
    log.ensure_allocated(4, 4 + payload.len() as u64);
    log.write(4, payload);
    let mut dst = vec![0u8; payload.len()];
    log.read(4, &mut dst);
    assert_eq!(&dst[..], &payload[..]);
}

#[test]
fn test_coarse_words_store_load_across_buckets() {
    let log = CoarseWords::new(4, 8);
    log.ensure_allocated(0, 20);
    for i in 0..20u64 {
        log.store(i, i * 100);
    }
    for i in 0..20u64 {
        assert_eq!(log.load(i), i * 100);
    }
}

#[test]
fn test_coarse_words_storage_size_grows_with_touched_buckets() {
    let log = CoarseWords::new(4, 8);
    let before = log.storage_size();
    log.ensure_allocated(0, 4);
    let after = log.storage_size();
    assert!(after > before);
}
