use super::*;

#[test]
fn test_chunk_bits_matches_width_depth_table() {
    assert_eq!(chunk_bits(1), vec![8]);
    assert_eq!(chunk_bits(2), vec![16]);
    assert_eq!(chunk_bits(3), vec![16, 8]);
    assert_eq!(chunk_bits(4), vec![16, 16]);
    assert_eq!(chunk_bits(5), vec![16, 16, 8]);
    assert_eq!(chunk_bits(6), vec![16, 16, 16]);
    assert_eq!(chunk_bits(7), vec![16, 16, 16, 8]);
    assert_eq!(chunk_bits(8), vec![16, 16, 16, 16]);
}

#[test]
fn test_decompose_is_msb_first() {
    // width 3 -> [16, 8]; value 0x01_0203 -> chunks [0x0102, 0x03]
    let parts = decompose(0x01_0203, &chunk_bits(3));
    assert_eq!(parts, vec![0x0102, 0x03]);
}

#[test]
fn test_depth_for_each_width() {
    for (width, expected_depth) in [(1u8, 1), (2, 1), (3, 2), (4, 2), (5, 3), (6, 3), (7, 4), (8, 4)] {
        let index = TieredIndex::new(width);
        assert_eq!(index.depth(), expected_depth, "width {}", width);
    }
}

#[test]
fn test_lookup_absent_value_is_none() {
    let index = TieredIndex::new(1);
    assert!(index.lookup(42).is_none());
}

#[test]
fn test_add_entry_then_lookup_single_level() {
    let index = TieredIndex::new(1);
    index.add_entry(7, 100);
    index.add_entry(7, 101);
    let posting = index.lookup(7).expect("leaf must exist after add_entry");
    assert_eq!(posting.size(), 2);
    assert_eq!(posting.get(0), 100);
    assert_eq!(posting.get(1), 101);
}

#[test]
fn test_add_entry_multi_level_depth() {
    let index = TieredIndex::new(4); // depth 2, two 65536-way levels
    index.add_entry(0x0001_0002, 5);
    index.add_entry(0x0001_0002, 6);
    index.add_entry(0x0003_0004, 9);
    assert_eq!(index.lookup(0x0001_0002).unwrap().size(), 2);
    assert_eq!(index.lookup(0x0003_0004).unwrap().size(), 1);
    assert!(index.lookup(0x0005_0006).is_none());
}

#[test]
fn test_boundary_token_values() {
    let index = TieredIndex::new(1);
    index.add_entry(0, 1);
    index.add_entry(255, 2);
    assert_eq!(index.lookup(0).unwrap().size(), 1);
    assert_eq!(index.lookup(255).unwrap().size(), 1);
}

#[test]
fn test_concurrent_add_entry_same_branch() {
    use std::sync::Arc;
    use std::thread;

    let index = Arc::new(TieredIndex::new(2));
    let mut handles = Vec::new();
    for t in 0..8u64 {
        let index = Arc::clone(&index);
        handles.push(thread::spawn(move || {
            for i in 0..50u64 {
                index.add_entry(999, t * 50 + i);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(index.lookup(999).unwrap().size(), 400);
}
