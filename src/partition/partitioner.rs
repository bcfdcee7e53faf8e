//! Partitioner
//!
//! The public face of the partitioning engine. The coordinator front-end
//! calls it for every key lookup and every membership change; it is the only
//! code that mutates the ring and the only code that initiates key migration.
//!
//! ## Locking
//! Every public method holds one exclusive lock for its entire duration,
//! including the HTTP round-trips of a redistribution. A lookup therefore
//! never observes a half-finished rebalance, at the cost of queueing behind
//! one. Within a redistribution the per-key migration tasks run concurrently
//! with each other; they touch only the two nodes involved, never the ring.

use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

use super::error::{PartitionError, Result};
use super::ring::Ring;
use super::types::{HashFn, RedistributionMode, RingMember};

/// Bound on every HTTP call made during redistribution.
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Construction-time settings for a [`Partitioner`].
///
/// The four routes are the endpoints every backend node exposes for moving
/// keys around; they are fixed for the lifetime of the cluster.
pub struct PartitionerConfig {
    /// Route queried on a member to enumerate its keys.
    pub all_keys_route: String,
    /// Route on a member for `GET ?key=...`.
    pub get_key_route: String,
    /// Route on a member for `POST` with a value body.
    pub add_key_route: String,
    /// Route on a member for `DELETE ?key=...`.
    pub remove_key_route: String,
    /// Keyspace modulus; every hash is reduced into `[0, ring_size)`.
    pub ring_size: u64,
}

pub struct Partitioner {
    config: PartitionerConfig,
    hash_fn: HashFn,
    http_client: reqwest::Client,
    ring: Mutex<Ring>,
}

/// Body of a node's key-enumeration response.
#[derive(Debug, Deserialize)]
struct AllKeysResponse {
    keys: Vec<String>,
}

impl Partitioner {
    pub fn new(config: PartitionerConfig, hash_fn: HashFn) -> Self {
        assert!(config.ring_size > 0, "ring_size must be positive");
        Self {
            config,
            hash_fn,
            http_client: reqwest::Client::new(),
            ring: Mutex::new(Ring::new()),
        }
    }

    /// Reduced ring position of any key or member address.
    pub fn position_of(&self, input: &str) -> u64 {
        (self.hash_fn)(input) % self.config.ring_size
    }

    /// Address of the member that owns `key` under the current ring state.
    pub async fn get_shard(&self, key: &str) -> Result<String> {
        let ring = self.ring.lock().await;
        let position = self.position_of(key);
        ring.owner(position)
            .map(|member| member.address.clone())
            .ok_or(PartitionError::NoMembers)
    }

    /// Adds a backend node to the ring and migrates onto it the keys it now
    /// owns, taken from its successor.
    ///
    /// If migration enumeration fails the error is surfaced but the insertion
    /// stays: the ring already routes to the new member, and some keys may be
    /// left behind on the successor until they are re-written.
    pub async fn add_member(&self, address: &str) -> Result<()> {
        let mut ring = self.ring.lock().await;

        if ring.find(address).is_some() {
            return Err(PartitionError::AddressCollision(address.to_string()));
        }
        let position = self.position_of(address);
        if ring.contains_position(position) {
            return Err(PartitionError::PositionCollision {
                address: address.to_string(),
                position,
            });
        }

        let member = RingMember {
            address: address.to_string(),
            position,
        };
        let inserted = member.clone();
        let index = ring.insert(member);
        tracing::info!("added member {} at ring position {}", address, position);

        if ring.len() == 1 {
            return Ok(());
        }

        // The successor owned the whole arc now split with the new member.
        let from = ring.successor(index).clone();
        self.redistribute(&ring, &from, &inserted, RedistributionMode::Split)
            .await
    }

    /// Removes a backend node, first draining every key it holds into its
    /// successor. A single-member ring is removed without migration; its keys
    /// are lost, as there is nowhere to put them.
    pub async fn remove_member(&self, address: &str) -> Result<()> {
        let mut ring = self.ring.lock().await;

        let index = ring
            .find(address)
            .ok_or_else(|| PartitionError::NotFound(address.to_string()))?;

        if ring.len() > 1 {
            let from = ring.members()[index].clone();
            let to = ring.successor(index).clone();
            self.redistribute(&ring, &from, &to, RedistributionMode::Drain)
                .await?;
        }

        ring.remove(index);
        tracing::info!("removed member {}", address);
        Ok(())
    }

    /// Ordered snapshot of the ring, lowest position first.
    pub async fn topology(&self) -> Vec<RingMember> {
        self.ring.lock().await.members().to_vec()
    }

    /// Moves keys from one member to another over the nodes' key API.
    ///
    /// Runs under the caller's ring lock so the ownership filter sees exactly
    /// the post-mutation ring. Enumeration failures abort the call; per-key
    /// failures abandon that key and are visible only in the logs.
    async fn redistribute(
        &self,
        ring: &Ring,
        from: &RingMember,
        to: &RingMember,
        mode: RedistributionMode,
    ) -> Result<()> {
        let url = format!("http://{}{}", from.address, self.config.all_keys_route);
        let enumeration_failed = |reason: String| PartitionError::MigrationEnumerationFailed {
            address: from.address.clone(),
            reason,
        };

        let response = self
            .http_client
            .get(&url)
            .timeout(HTTP_TIMEOUT)
            .send()
            .await
            .map_err(|err| enumeration_failed(err.to_string()))?;
        if !response.status().is_success() {
            return Err(enumeration_failed(format!(
                "unexpected status {}",
                response.status()
            )));
        }
        let enumerated: AllKeysResponse = response
            .json()
            .await
            .map_err(|err| enumeration_failed(err.to_string()))?;

        let moving: Vec<String> = enumerated
            .keys
            .into_iter()
            .filter(|key| match mode {
                RedistributionMode::Drain => true,
                RedistributionMode::Split => ring
                    .owner(self.position_of(key))
                    .map(|owner| owner.address == to.address)
                    .unwrap_or(false),
            })
            .collect();

        tracing::info!(
            "redistributing {} key(s) from {} to {} ({:?})",
            moving.len(),
            from.address,
            to.address,
            mode
        );

        let mut tasks = Vec::with_capacity(moving.len());
        for key in moving {
            let client = self.http_client.clone();
            let from_address = from.address.clone();
            let to_address = to.address.clone();
            let routes = KeyRoutes {
                get_key: self.config.get_key_route.clone(),
                add_key: self.config.add_key_route.clone(),
                remove_key: self.config.remove_key_route.clone(),
            };
            tasks.push(tokio::spawn(async move {
                migrate_key(client, from_address, to_address, routes, key).await;
            }));
        }
        for task in tasks {
            let _ = task.await;
        }

        Ok(())
    }
}

/// The per-key routes a migration task needs, detached from the partitioner
/// so the task borrows nothing across the spawn.
struct KeyRoutes {
    get_key: String,
    add_key: String,
    remove_key: String,
}

/// Moves a single key: fetch from the source, place on the destination, then
/// evict from the source. The order guarantees the key exists on at least one
/// side if any step fails. Failures abandon the key and are only logged.
async fn migrate_key(
    client: reqwest::Client,
    from: String,
    to: String,
    routes: KeyRoutes,
    key: String,
) {
    let fetched = match client
        .get(format!("http://{}{}", from, routes.get_key))
        .query(&[("key", key.as_str())])
        .timeout(HTTP_TIMEOUT)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!("abandoning key {}: fetch from {} failed: {}", key, from, err);
            return;
        }
    };
    if fetched.status() != reqwest::StatusCode::OK {
        tracing::warn!(
            "abandoning key {}: fetch from {} returned {}",
            key,
            from,
            fetched.status()
        );
        return;
    }
    let content_type = fetched.headers().get(reqwest::header::CONTENT_TYPE).cloned();
    let body = match fetched.bytes().await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!("abandoning key {}: reading value failed: {}", key, err);
            return;
        }
    };

    let mut place = client
        .post(format!("http://{}{}", to, routes.add_key))
        .body(body)
        .timeout(HTTP_TIMEOUT);
    if let Some(content_type) = content_type {
        place = place.header(reqwest::header::CONTENT_TYPE, content_type);
    }
    match place.send().await {
        Ok(response) => {
            if response.status() != reqwest::StatusCode::CREATED {
                tracing::warn!(
                    "abandoning key {}: place on {} returned {}",
                    key,
                    to,
                    response.status()
                );
                return;
            }
        }
        Err(err) => {
            tracing::warn!("abandoning key {}: place on {} failed: {}", key, to, err);
            return;
        }
    }

    match client
        .delete(format!("http://{}{}", from, routes.remove_key))
        .query(&[("key", key.as_str())])
        .timeout(HTTP_TIMEOUT)
        .send()
        .await
    {
        Ok(response) => {
            if response.status() != reqwest::StatusCode::OK {
                tracing::warn!(
                    "key {} copied but evicting from {} returned {}",
                    key,
                    from,
                    response.status()
                );
            }
        }
        Err(err) => {
            tracing::warn!("key {} copied but evicting from {} failed: {}", key, from, err);
        }
    }
}
