//! Node API Handlers
//!
//! HTTP endpoints of one backend node. They translate requests straight into
//! [`KeyStore`] calls; all routing intelligence lives on the coordinator, a
//! node only ever answers for the keys it physically holds.

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use sysinfo::System;

use super::protocol::{AllKeysResponse, KeyValue, NodeStatsResponse};
use super::store::KeyStore;

#[derive(Deserialize)]
pub struct KeyParams {
    pub key: String,
}

/// Stores an uploaded key-value pair. Also the target of migration placement
/// calls, which replay another node's read responses here verbatim.
pub async fn handle_put_key(
    Extension(store): Extension<Arc<KeyStore>>,
    Json(entry): Json<KeyValue>,
) -> StatusCode {
    tracing::debug!("storing key {}", entry.key);
    store.put(entry.key, entry.value);
    StatusCode::CREATED
}

/// Reads one key. The 200 body is the same envelope `POST` accepts, so a
/// migration can forward it to another node without reshaping it.
pub async fn handle_get_key(
    Extension(store): Extension<Arc<KeyStore>>,
    Query(params): Query<KeyParams>,
) -> Result<Json<KeyValue>, StatusCode> {
    match store.get(&params.key) {
        Some(value) => Ok(Json(KeyValue {
            key: params.key,
            value,
        })),
        None => {
            tracing::debug!("key {} not found", params.key);
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// Removes one key. Idempotent: deleting an absent key still answers 200.
pub async fn handle_delete_key(
    Extension(store): Extension<Arc<KeyStore>>,
    Query(params): Query<KeyParams>,
) -> StatusCode {
    tracing::debug!("removing key {}", params.key);
    store.remove(&params.key);
    StatusCode::OK
}

/// Enumerates every key on this node; the first step of any redistribution.
pub async fn handle_all_keys(
    Extension(store): Extension<Arc<KeyStore>>,
) -> Json<AllKeysResponse> {
    Json(AllKeysResponse { keys: store.keys() })
}

pub async fn handle_stats(Extension(store): Extension<Arc<KeyStore>>) -> Json<NodeStatsResponse> {
    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo returns bytes for memory values.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(NodeStatsResponse {
        keys: store.len(),
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
    })
}
