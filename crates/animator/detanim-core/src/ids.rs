//! Stable identifiers for graph entities.
//!
//! State ids are FNV-1a hashes of the state name: stable across bakes and
//! machines, dense enough for linear scans, and never 0 (0 is the "no
//! state" sentinel throughout the runtime).

use serde::{Deserialize, Serialize};

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Identifier of a state within a graph. `StateId::NONE` (0) means
/// "no state" (empty layer head, no active transition).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StateId(pub u32);

impl StateId {
    pub const NONE: StateId = StateId(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self.0 != 0
    }
}

/// Hash a state name into its stable id.
///
/// A hash that lands on 0 is remapped to the FNV offset basis so the
/// sentinel stays reserved; `Graph::validate` rejects collisions.
pub fn state_id(name: &str) -> StateId {
    let mut hash = FNV_OFFSET;
    for byte in name.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    if hash == 0 {
        hash = FNV_OFFSET;
    }
    StateId(hash)
}
