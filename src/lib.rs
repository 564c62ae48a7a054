//! An in-memory, append-only log store with secondary indexing and
//! derived streams, designed as the storage engine beneath a higher-level
//! multi-log / time-series service.
//!
//! Writers append opaque byte records together with a list of *tokens*
//! (typed integer keys naming secondary index entries); readers look up
//! records by id, range-scan secondary indexes, and consume per-stream
//! derived views produced by user-supplied filter predicates. Many
//! concurrent writers and readers are supported without locks on the hot
//! path; a record's publication is a single atomic boundary, and queries
//! see a consistent snapshot of the log.
//!
//! The engine is built from a small set of components, leaves first:
//! a bucketed grow-on-demand array ([`monolog`]) underlies a linear byte
//! store ([`bytelog`]), an append-only sequence of record ids
//! ([`postinglist`]), and the per-record-id offset/length map
//! ([`offsetlog`]) that carries the store's visibility boundary. A 1-4
//! level tree of those arrays ([`tieredindex`]) maps token values to
//! posting lists, and a lazy cursor ([`filter`]) walks a token range of
//! one. [`stream`] re-materialises a filtered subset of the log under a
//! user predicate. [`store::LogStore`] ties all of it together.
//!
//! ```
//! use monolog::{Config, LogStore, Token};
//!
//! let store = LogStore::new(Config::new("example"));
//! let idx = store.add_index(2);
//! let id = store.insert(b"hello", &[Token::new(idx, 258)]).unwrap();
//!
//! let mut buf = [0u8; 5];
//! assert!(store.get(id, &mut buf));
//! assert_eq!(&buf, b"hello");
//! ```

mod bits;
mod bytelog;
pub mod config;
pub mod error;
mod filter;
mod monolog;
mod offsetlog;
mod postinglist;
mod serialize;
pub mod store;
mod stream;
mod tieredindex;
pub mod types;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::filter::FilterIter;
pub use crate::store::LogStore;
pub use crate::stream::Predicate;
pub use crate::types::{Entry, RecordId, StorageFootprint, Token};
