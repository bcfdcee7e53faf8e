//! Coordinator Front-End Module
//!
//! The single entry point clients see. It owns the partitioner: every key
//! request is routed to the owning backend node and proxied there, and the
//! membership endpoints drive ring mutations (with their key migrations)
//! before answering.

use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub mod handlers;


use crate::partition::partitioner::Partitioner;
use handlers::{
    handle_add_member, handle_delete_key, handle_get_key, handle_remove_member, handle_topology,
    handle_upload_key,
};

/// Builds the coordinator router around a shared partitioner.
pub fn app(partitioner: Arc<Partitioner>, max_body_bytes: usize) -> Router {
    Router::new()
        .route(
            "/key",
            get(handle_get_key)
                .post(handle_upload_key)
                .delete(handle_delete_key),
        )
        .route("/add-member", get(handle_add_member))
        .route("/remove-member", get(handle_remove_member))
        .route("/topology", get(handle_topology))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(Extension(partitioner))
        .layer(Extension(reqwest::Client::new()))
}
