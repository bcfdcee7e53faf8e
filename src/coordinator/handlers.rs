//! Coordinator API Handlers
//!
//! The client-facing surface of the cluster. Key traffic is routed through
//! the partitioner and proxied to the owning backend node with its body and
//! Content-Type intact; membership changes are translated into partitioner
//! calls and their typed errors mapped onto HTTP statuses.

use axum::body::Bytes;
use axum::extract::{Extension, Query};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::node::protocol::ROUTE_KEY;
use crate::partition::error::PartitionError;
use crate::partition::partitioner::Partitioner;

#[derive(Deserialize)]
pub struct KeyParams {
    pub key: String,
}

#[derive(Deserialize)]
pub struct MemberParams {
    pub srv: String,
}

/// Only the routing key is read out of an upload; the body itself is
/// forwarded untouched.
#[derive(Deserialize)]
struct UploadEnvelope {
    key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopologyEntry {
    pub address: String,
    pub position: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopologyResponse {
    pub members: Vec<TopologyEntry>,
}

/// Uploads a key-value pair: pick the shard by the `"key"` field of the JSON
/// body, then replay the raw bytes against that node.
pub async fn handle_upload_key(
    Extension(partitioner): Extension<Arc<Partitioner>>,
    Extension(client): Extension<reqwest::Client>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let envelope: UploadEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!("rejecting upload with undecodable body: {}", err);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let shard = match partitioner.get_shard(&envelope.key).await {
        Ok(address) => address,
        Err(err) => {
            tracing::error!("no shard for key {}: {}", envelope.key, err);
            return error_status(&err).into_response();
        }
    };
    tracing::debug!("proxying upload of key {} to {}", envelope.key, shard);

    let mut request = client
        .post(format!("http://{}{}", shard, ROUTE_KEY))
        .body(body);
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request = request.header(header::CONTENT_TYPE, content_type.clone());
    }
    relay(request.send().await).await
}

/// Reads a key from whichever node owns it.
pub async fn handle_get_key(
    Extension(partitioner): Extension<Arc<Partitioner>>,
    Extension(client): Extension<reqwest::Client>,
    Query(params): Query<KeyParams>,
) -> Response {
    let shard = match partitioner.get_shard(&params.key).await {
        Ok(address) => address,
        Err(err) => {
            tracing::error!("no shard for key {}: {}", params.key, err);
            return error_status(&err).into_response();
        }
    };
    tracing::debug!("proxying read of key {} to {}", params.key, shard);

    relay(
        client
            .get(format!("http://{}{}", shard, ROUTE_KEY))
            .query(&[("key", params.key.as_str())])
            .send()
            .await,
    )
    .await
}

/// Deletes a key on whichever node owns it.
pub async fn handle_delete_key(
    Extension(partitioner): Extension<Arc<Partitioner>>,
    Extension(client): Extension<reqwest::Client>,
    Query(params): Query<KeyParams>,
) -> Response {
    let shard = match partitioner.get_shard(&params.key).await {
        Ok(address) => address,
        Err(err) => {
            tracing::error!("no shard for key {}: {}", params.key, err);
            return error_status(&err).into_response();
        }
    };

    relay(
        client
            .delete(format!("http://{}{}", shard, ROUTE_KEY))
            .query(&[("key", params.key.as_str())])
            .send()
            .await,
    )
    .await
}

pub async fn handle_add_member(
    Extension(partitioner): Extension<Arc<Partitioner>>,
    Query(params): Query<MemberParams>,
) -> StatusCode {
    match partitioner.add_member(&params.srv).await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::error!("add-member {} failed: {}", params.srv, err);
            error_status(&err)
        }
    }
}

pub async fn handle_remove_member(
    Extension(partitioner): Extension<Arc<Partitioner>>,
    Query(params): Query<MemberParams>,
) -> StatusCode {
    match partitioner.remove_member(&params.srv).await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::error!("remove-member {} failed: {}", params.srv, err);
            error_status(&err)
        }
    }
}

pub async fn handle_topology(
    Extension(partitioner): Extension<Arc<Partitioner>>,
) -> Json<TopologyResponse> {
    let members = partitioner
        .topology()
        .await
        .into_iter()
        .map(|member| TopologyEntry {
            address: member.address,
            position: member.position,
        })
        .collect();
    Json(TopologyResponse { members })
}

fn error_status(err: &PartitionError) -> StatusCode {
    match err {
        PartitionError::NoMembers => StatusCode::SERVICE_UNAVAILABLE,
        PartitionError::NotFound(_) => StatusCode::NOT_FOUND,
        PartitionError::AddressCollision(_) | PartitionError::PositionCollision { .. } => {
            StatusCode::CONFLICT
        }
        PartitionError::MigrationEnumerationFailed { .. } => StatusCode::BAD_GATEWAY,
    }
}

/// Turns a backend node's reply into the client's reply, preserving status,
/// body bytes and Content-Type. Transport failures become 502.
async fn relay(outcome: Result<reqwest::Response, reqwest::Error>) -> Response {
    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!("proxying to backend node failed: {}", err);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| HeaderValue::from_bytes(value.as_bytes()).ok());

    match response.bytes().await {
        Ok(body) => {
            let mut relayed = (status, body).into_response();
            if let Some(content_type) = content_type {
                relayed
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, content_type);
            }
            relayed
        }
        Err(err) => {
            tracing::warn!("reading backend node response failed: {}", err);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}
