//! Backend Node Module
//!
//! One instance of this app runs per cluster member. It is a plain in-memory
//! key-value store behind a small HTTP surface: clients reach it only through
//! the coordinator's proxy, and the coordinator's partitioner drives the same
//! endpoints to move keys during membership changes.

use axum::extract::Extension;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub mod handlers;
pub mod protocol;
pub mod store;


use handlers::{
    handle_all_keys, handle_delete_key, handle_get_key, handle_put_key, handle_stats,
};
use store::KeyStore;

/// Builds the node's router around a shared store.
pub fn app(store: Arc<KeyStore>) -> Router {
    Router::new()
        .route(
            protocol::ROUTE_KEY,
            get(handle_get_key)
                .post(handle_put_key)
                .delete(handle_delete_key),
        )
        .route(protocol::ROUTE_ALL_KEYS, get(handle_all_keys))
        .route(protocol::ROUTE_STATS, get(handle_stats))
        .layer(Extension(store))
}
