//! Error types for the partitioning engine.

/// Errors surfaced by the partitioner's public API.
///
/// Per-key migration faults are deliberately absent: with no replication,
/// abandoning an unreachable key is the only local option, so those are
/// logged by the redistribution tasks instead of failing the whole call.
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    /// A lookup was attempted against an empty ring.
    #[error("no members in the ring")]
    NoMembers,

    /// A removal named an address that is not a member.
    #[error("no member with address {0} in the ring")]
    NotFound(String),

    /// An addition named an address that is already a member.
    #[error("member {0} is already in the ring")]
    AddressCollision(String),

    /// An addition hashed onto a position another member already occupies.
    #[error("address {address} hashes to ring position {position}, which is already taken")]
    PositionCollision { address: String, position: u64 },

    /// The key enumeration step of a redistribution failed; the preceding
    /// ring mutation is left in place.
    #[error("failed to enumerate keys on {address}: {reason}")]
    MigrationEnumerationFailed { address: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PartitionError>;
