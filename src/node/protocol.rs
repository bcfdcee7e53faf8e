//! Node Key API
//!
//! Routes and wire formats exposed by every backend node. The coordinator's
//! partitioner is configured with these same routes so it can enumerate and
//! move keys during redistribution.

use serde::{Deserialize, Serialize};

/// Enumerates every key held by the node.
pub const ROUTE_ALL_KEYS: &str = "/keys";
/// Per-key operations: `POST` to store, `GET ?key=` to read, `DELETE ?key=`
/// to remove.
pub const ROUTE_KEY: &str = "/key";
/// Node diagnostics.
pub const ROUTE_STATS: &str = "/stats";

/// The value envelope: what clients upload and what a key read returns.
/// Migration forwards these bodies byte-for-byte between nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Response to a key enumeration.
#[derive(Debug, Serialize, Deserialize)]
pub struct AllKeysResponse {
    pub keys: Vec<String>,
}

/// Point-in-time diagnostics for one node.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeStatsResponse {
    pub keys: usize,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}
