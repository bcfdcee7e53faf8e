use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Hash function plugged into the partitioner. Takes any string (a key or a
/// member address) and maps it to a non-negative integer; the partitioner
/// always reduces the result modulo its ring size before use.
pub type HashFn = Box<dyn Fn(&str) -> u64 + Send + Sync>;

/// Default hash used by the binary: the standard library hasher, which gives
/// a stable mapping within a single process lifetime. Collision resistance is
/// not required; colliding member positions are rejected at `add_member`.
pub fn default_hash(input: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    hasher.finish()
}

/// One backend node as seen by the ring.
///
/// The address is the identity (an opaque routable `host:port` string); the
/// position is derived from it by hashing and fixed for the member's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingMember {
    /// Routable address of the backend node.
    pub address: String,
    /// Location on the ring, in `[0, ring_size)`.
    pub position: u64,
}

/// Why keys are being moved between two members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedistributionMode {
    /// A member was inserted: move only the keys whose owner is now the new
    /// member.
    Split,
    /// A member is leaving: move every key it holds to its successor.
    Drain,
}
