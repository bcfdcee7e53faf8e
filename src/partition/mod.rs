//! Ring Partitioning Module
//!
//! Implements the consistent-hashing engine that decides which backend node
//! owns each key, and the membership-change protocol that moves keys between
//! nodes when the cluster grows or shrinks.
//!
//! ## Core Concepts
//! - **Ring**: members are placed on a circular keyspace of `ring_size`
//!   positions; a key belongs to the first member at or after its position
//!   (wrapping around).
//! - **Membership**: adding a member splits the arc of its successor; removing
//!   a member drains every key it holds into its successor.
//! - **Redistribution**: key movement happens over the nodes' HTTP key API,
//!   one concurrent task per key, while the partitioner lock serializes all
//!   routing and membership traffic.

pub mod error;
pub mod partitioner;
pub mod ring;
pub mod types;

#[cfg(test)]
mod tests;
