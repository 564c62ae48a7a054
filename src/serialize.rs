//! Module `serialize` supplies the wire encodings named in spec §6 for a
//! collaborator that persists a store externally. The engine itself never
//! calls these paths — there is no on-disk format in the core (spec §1's
//! Non-goals exclude persistence). Grounded on the teacher's `core::Serialize`
//! trait (`encode`/`decode` pair, hand-rolled rather than cbor-based).

use crate::error::Result;

pub(crate) trait Serialize {
    fn encode(&self, buf: &mut Vec<u8>);
    fn decode(&mut self, buf: &[u8]) -> Result<()>;
}

#[cfg(test)]
#[path = "serialize_test.rs"]
mod serialize_test;
