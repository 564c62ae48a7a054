//! Error and Result types for the log store.
//!
//! Follows the `err_at!` convention: wrap a lower-level failure (or a bare
//! message) together with the call-site so that a `Display`-ed error reads
//! as `<kind>: <file>:<line> <detail>`.

use std::{fmt, result};

/// Failure kinds surfaced by this crate's public API.
///
/// Per the engine's error design, `not_visible` and `unknown_index` are
/// NOT represented here: those are plain `bool`/empty-iterator returns
/// (see [`crate::store::LogStore::get`], [`crate::store::LogStore::filter`]).
/// `Error` is reserved for the handful of failures that can occur before a
/// record id is ever assigned.
#[derive(Debug)]
pub enum Error {
    /// `insert` was called with a payload longer than `u16::MAX` bytes.
    RecordTooLarge(String),
    /// `add_index` was called with a token width outside `1..=8`.
    WidthUnsupported(String),
    /// The byte-log offset or the record-id space has been exhausted.
    CapacityExhausted(String),
    /// An invariant the engine relies on did not hold; should never occur.
    Fatal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::RecordTooLarge(msg) => write!(f, "record-too-large: {}", msg),
            Error::WidthUnsupported(msg) => write!(f, "width-unsupported: {}", msg),
            Error::CapacityExhausted(msg) => write!(f, "capacity-exhausted: {}", msg),
            Error::Fatal(msg) => write!(f, "fatal: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Construct an `Err(Error::<variant>(..))`, tagging the message with the
/// call site. Two forms:
///
/// * `err_at!(Variant, msg: "fmt", args...)` — build the error directly.
/// * `err_at!(Variant, result_expr)` — convert a foreign `Result`'s `Err`
///   side into `Error::<variant>`, passing `Ok` through unchanged.
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let msg = format!($($arg),+);
        Err($crate::error::Error::$v(format!("{}:{} {}", file!(), line!(), msg)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let msg = format!("{}:{} err:{}", file!(), line!(), err);
                Err($crate::error::Error::$v(msg))
            }
        }
    }};
}
