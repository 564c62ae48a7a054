use super::*;

#[test]
fn test_pack_unpack_round_trip() {
    let word = pack(12345, 678);
    assert_eq!(unpack(word), (12345, 678));
}

#[test]
fn test_begin_end_append_single_threaded() {
    let log = OffsetLog::new(16);
    let id = log.begin_append(100, 20).unwrap();
    assert_eq!(id, 0);
    assert!(!log.is_visible(id));
    log.end_append(id);
    assert!(log.is_visible(id));
    assert_eq!(log.lookup(id), (100, 20));
    assert_eq!(log.num_visible(), 1);
}

#[test]
fn test_end_append_enforces_order() {
    use std::sync::Arc;
    use std::thread;

    let log = Arc::new(OffsetLog::new(16));
    let id0 = log.begin_append(0, 1).unwrap();
    let id1 = log.begin_append(1, 1).unwrap();
    assert_eq!((id0, id1), (0, 1));

    let log2 = Arc::clone(&log);
    let h = thread::spawn(move || {
        // publish id1 first; must block (spin) until id0 publishes.
        log2.end_append(id1);
    });
    std::thread::sleep(std::time::Duration::from_millis(20));
    assert!(!log.is_visible(id1), "id1 must not publish before id0");
    log.end_append(id0);
    h.join().unwrap();
    assert!(log.is_visible(id1));
    assert_eq!(log.num_visible(), 2);
}

#[test]
fn test_reserve_ids_batch() {
    let log = OffsetLog::new(16);
    let start = log.reserve_ids(5).unwrap();
    assert_eq!(start, 0);
    for i in 0..5u64 {
        log.write_entry(start + i, i * 10, 1);
    }
    log.end_append_range(start, 5);
    assert_eq!(log.num_visible(), 5);
    for i in 0..5u64 {
        assert_eq!(log.lookup(i), (i * 10, 1));
    }
}

#[test]
fn test_is_visible_at_uses_supplied_ceiling() {
    let log = OffsetLog::new(16);
    let id = log.begin_append(0, 1).unwrap();
    log.end_append(id);
    let id2 = log.begin_append(0, 1).unwrap();
    log.end_append(id2);
    assert!(log.is_visible_at(id, 2));
    assert!(!log.is_visible_at(id2, 1));
}
