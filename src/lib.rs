//! Consistent-Hash Sharded Key-Value Cluster Library
//!
//! This library crate defines the components of the cluster; the binary
//! (`main.rs`) wires them into a coordinator process, a backend node process,
//! or a load-test run.
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems:
//!
//! - **`partition`**: The ring-based partitioning engine. Maps keys onto an
//!   ordered ring of members and, on every membership change, migrates the
//!   minimal affected set of keys between exactly two nodes.
//! - **`node`**: The backend key-value store. One per cluster member, exposing
//!   the small HTTP key API that both clients (via the coordinator) and the
//!   migration protocol use.
//! - **`coordinator`**: The client-facing front-end. Routes every key request
//!   through the partitioner and proxies it to the owning node.
//! - **`loadtest`**: A randomized exerciser that churns cluster membership
//!   while verifying that uploaded data stays reachable.

pub mod coordinator;
pub mod loadtest;
pub mod node;
pub mod partition;
