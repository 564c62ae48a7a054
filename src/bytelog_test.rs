use super::*;

#[test]
fn test_reserve_is_monotonic_and_exclusive() {
    let log = ByteLog::new(64);
    let a = log.reserve(10).unwrap();
    let b = log.reserve(20).unwrap();
    assert_eq!(a, 0);
    assert_eq!(b, 10);
}

#[test]
fn test_write_then_read_round_trip() {
    let log = ByteLog::new(64);
    let offset = log.reserve(5).unwrap();
    log.ensure_allocated(offset, offset + 5);
    log.write(offset, b"hello");
    let mut buf = [0u8; 5];
    log.read(offset, &mut buf);
    assert_eq!(&buf, b"hello");
}

#[test]
fn test_write_spans_bucket_boundary() {
    let log = ByteLog::new(4);
    let offset = log.reserve(10).unwrap();
    log.ensure_allocated(offset, offset + 10);
    log.write(offset, b"0123456789");
    let mut buf = [0u8; 10];
    log.read(offset, &mut buf);
    assert_eq!(&buf, b"0123456789");
}

#[test]
fn test_reserve_rejects_beyond_capacity() {
    let log = ByteLog::new(64);
    let err = log.reserve(MAX_OFFSET + 1).unwrap_err();
    assert!(matches!(err, crate::error::Error::CapacityExhausted(_)));
}
