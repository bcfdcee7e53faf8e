//! Load Generator Module
//!
//! Exercises a running cluster through the coordinator: uploads random
//! key-value pairs while randomly adding and removing members, and re-reads
//! earlier uploads to check they survived the reshuffling. Individual
//! failures are logged and counted, never fatal; only a broken setup aborts
//! the run.

use anyhow::Context;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::StatusCode;

use crate::node::protocol::KeyValue;

/// Outcome counters for one load-test run.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub uploads_ok: usize,
    pub upload_failures: usize,
    pub membership_changes: usize,
    pub membership_failures: usize,
    pub verified_ok: usize,
    pub verify_failures: usize,
}

/// Runs `data_points` iterations against a coordinator that is already up,
/// with `nodes` as the pool of backend addresses to shuffle in and out.
pub async fn run(
    data_points: usize,
    coordinator: &str,
    nodes: &[String],
) -> anyhow::Result<LoadReport> {
    let client = reqwest::Client::new();
    let (mut active, mut inactive) = setup(&client, coordinator, nodes.to_vec()).await?;
    tracing::info!("initial active nodes: {:?}", active);
    tracing::info!("initial inactive nodes: {:?}", inactive);

    let mut uploaded: Vec<KeyValue> = Vec::new();
    let mut report = LoadReport::default();

    for _ in 0..data_points {
        let entry = KeyValue {
            key: rand_seq(8),
            value: rand_seq(8),
        };
        match upload(&client, coordinator, &entry).await {
            Ok(()) => {
                uploaded.push(entry);
                report.uploads_ok += 1;
            }
            Err(err) => {
                tracing::warn!("upload failed: {}", err);
                report.upload_failures += 1;
                continue;
            }
        }

        // Randomly remove a member.
        if active.len() > 1 && rand::thread_rng().gen_range(0..100) > 50 {
            let index = rand::thread_rng().gen_range(0..active.len());
            let removed = active.remove(index);
            match remove_server(&client, coordinator, &removed).await {
                Ok(()) => report.membership_changes += 1,
                Err(err) => {
                    tracing::warn!("removing {} failed: {}", removed, err);
                    report.membership_failures += 1;
                }
            }
            inactive.push(removed);
        }

        // Randomly bring one back.
        if !inactive.is_empty() && rand::thread_rng().gen_range(0..100) > 50 {
            let index = rand::thread_rng().gen_range(0..inactive.len());
            let added = inactive.remove(index);
            match add_server(&client, coordinator, &added).await {
                Ok(()) => report.membership_changes += 1,
                Err(err) => {
                    tracing::warn!("adding {} failed: {}", added, err);
                    report.membership_failures += 1;
                }
            }
            active.push(added);
        }

        // Randomly re-read something uploaded earlier.
        if !uploaded.is_empty() && rand::thread_rng().gen_range(0..100) > 50 {
            let candidate = &uploaded[rand::thread_rng().gen_range(0..uploaded.len())];
            match get_key(&client, coordinator, &candidate.key).await {
                Ok(result) if &result == candidate => report.verified_ok += 1,
                Ok(result) => {
                    tracing::warn!("verify mismatch: expected {:?}, got {:?}", candidate, result);
                    report.verify_failures += 1;
                }
                Err(err) => {
                    tracing::warn!("verify of key {} failed: {}", candidate.key, err);
                    report.verify_failures += 1;
                }
            }
        }

        tracing::info!("active nodes: {:?}", active);
    }

    Ok(report)
}

/// Registers a random non-empty subset of the node pool as initial members;
/// the rest start out inactive.
async fn setup(
    client: &reqwest::Client,
    coordinator: &str,
    mut nodes: Vec<String>,
) -> anyhow::Result<(Vec<String>, Vec<String>)> {
    let initial = rand::thread_rng().gen_range(1..=nodes.len());
    let mut active = Vec::with_capacity(initial);
    for _ in 0..initial {
        let index = rand::thread_rng().gen_range(0..nodes.len());
        let selected = nodes.remove(index);
        add_server(client, coordinator, &selected)
            .await
            .context("failed to add server during setup")?;
        active.push(selected);
    }
    Ok((active, nodes))
}

async fn add_server(client: &reqwest::Client, coordinator: &str, addr: &str) -> anyhow::Result<()> {
    let response = client
        .get(format!("http://{}/add-member", coordinator))
        .query(&[("srv", addr)])
        .send()
        .await?;
    if response.status() != StatusCode::OK {
        anyhow::bail!("add-member for {} returned {}", addr, response.status());
    }
    Ok(())
}

async fn remove_server(
    client: &reqwest::Client,
    coordinator: &str,
    addr: &str,
) -> anyhow::Result<()> {
    let response = client
        .get(format!("http://{}/remove-member", coordinator))
        .query(&[("srv", addr)])
        .send()
        .await?;
    if response.status() != StatusCode::OK {
        anyhow::bail!("remove-member for {} returned {}", addr, response.status());
    }
    Ok(())
}

async fn upload(
    client: &reqwest::Client,
    coordinator: &str,
    entry: &KeyValue,
) -> anyhow::Result<()> {
    let response = client
        .post(format!("http://{}/key", coordinator))
        .json(entry)
        .send()
        .await?;
    if response.status() != StatusCode::CREATED {
        anyhow::bail!("upload returned {}", response.status());
    }
    Ok(())
}

async fn get_key(
    client: &reqwest::Client,
    coordinator: &str,
    key: &str,
) -> anyhow::Result<KeyValue> {
    let response = client
        .get(format!("http://{}/key", coordinator))
        .query(&[("key", key)])
        .send()
        .await?;
    if response.status() != StatusCode::OK {
        anyhow::bail!("get returned {}", response.status());
    }
    Ok(response.json().await?)
}

fn rand_seq(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
