use super::*;

#[test]
fn test_filter_empty_range_on_absent_value() {
    let index = TieredIndex::new(1);
    index.add_entry(5, 0);
    let it = FilterIter::new(Some(&index), 6, 6, 100);
    assert_eq!(it.collect::<Vec<_>>(), Vec::<u64>::new());
}

#[test]
fn test_filter_single_value_yields_all_postings() {
    let index = TieredIndex::new(1);
    index.add_entry(5, 10);
    index.add_entry(5, 11);
    let it = FilterIter::new(Some(&index), 5, 5, 100);
    assert_eq!(it.collect::<Vec<_>>(), vec![10, 11]);
}

#[test]
fn test_filter_range_spans_multiple_values() {
    let index = TieredIndex::new(1);
    for i in 0..100u64 {
        index.add_entry(i % 20, i);
    }
    let it = FilterIter::new(Some(&index), 10, 19, 100);
    let mut ids: Vec<u64> = it.collect();
    ids.sort_unstable();
    let mut expected: Vec<u64> = (0..100u64).filter(|&i| (i % 20) >= 10 && (i % 20) <= 19).collect();
    expected.sort_unstable();
    assert_eq!(ids, expected);
}

#[test]
fn test_filter_respects_ceiling() {
    let index = TieredIndex::new(1);
    index.add_entry(3, 0);
    index.add_entry(3, 1);
    index.add_entry(3, 2);
    let it = FilterIter::new(Some(&index), 3, 3, 2);
    assert_eq!(it.collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn test_filter_full_range_ordered_by_token_then_posting_order() {
    let index = TieredIndex::new(1);
    index.add_entry(0, 100);
    index.add_entry(255, 200);
    index.add_entry(0, 101);
    let it = FilterIter::new(Some(&index), 0, 255, 1000);
    assert_eq!(it.collect::<Vec<_>>(), vec![100, 101, 200]);
}

#[test]
fn test_filter_with_no_index_is_empty() {
    let it: FilterIter = FilterIter::new(None, 0, u64::MAX, 100);
    assert!(it.is_finished());
    assert_eq!(it.collect::<Vec<_>>(), Vec::<u64>::new());
}

#[test]
fn test_filter_at_u64_max_absent_value_does_not_overflow() {
    // width-8 upper boundary (B2/B3): v_lo == v_hi == u64::MAX and the value
    // is absent. Regression for an overflow in the v_cur += 1 step.
    let index = TieredIndex::new(8);
    index.add_entry(0, 0);
    let it = FilterIter::new(Some(&index), u64::MAX, u64::MAX, 100);
    assert_eq!(it.collect::<Vec<_>>(), Vec::<u64>::new());
}

#[test]
fn test_filter_at_u64_max_present_value_does_not_overflow() {
    let index = TieredIndex::new(8);
    index.add_entry(u64::MAX, 42);
    let mut it = FilterIter::new(Some(&index), u64::MAX, u64::MAX, 100);
    assert_eq!(it.next(), Some(42));
    assert_eq!(it.next(), None);
    assert!(it.is_finished());
}

#[test]
fn test_is_finished_after_drain() {
    let index = TieredIndex::new(1);
    index.add_entry(1, 0);
    let mut it = FilterIter::new(Some(&index), 1, 1, 100);
    assert!(!it.is_finished());
    assert_eq!(it.next(), Some(0));
    assert_eq!(it.next(), None);
    assert!(it.is_finished());
}
