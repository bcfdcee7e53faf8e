use ringkv::coordinator;
use ringkv::loadtest;
use ringkv::node;
use ringkv::partition::partitioner::{Partitioner, PartitionerConfig};
use ringkv::partition::types::default_hash;
use std::net::SocketAddr;
use std::sync::Arc;

const DEFAULT_RING_SIZE: u64 = 360;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    // `ringkv loadtest <coordinator> <node>...` drives an already-running
    // cluster instead of starting a process.
    if args.len() >= 2 && args[1] == "loadtest" {
        if args.len() < 4 {
            eprintln!("Usage: {} loadtest <coordinator> <node>...", args[0]);
            std::process::exit(1);
        }
        let coordinator_addr = args[2].clone();
        let nodes: Vec<String> = args[3..].to_vec();
        let report = loadtest::run(100, &coordinator_addr, &nodes).await?;
        tracing::info!("load test finished: {:?}", report);
        return Ok(());
    }

    let mut bind_addr: Option<SocketAddr> = None;
    let mut role: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--role" => {
                role = Some(args[i + 1].clone());
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let Some(bind_addr) = bind_addr else {
        usage(&args[0])
    };

    match role.as_deref() {
        Some("node") => {
            let store = Arc::new(node::store::KeyStore::new());
            let app = node::app(store);

            tracing::info!("backend node listening on {}", bind_addr);
            let listener = tokio::net::TcpListener::bind(bind_addr).await?;
            axum::serve(listener, app).await?;
        }
        Some("coordinator") => {
            let ring_size = std::env::var("RING_SIZE")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RING_SIZE);
            let max_body_bytes = std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(20 * 1024 * 1024);

            let config = PartitionerConfig {
                all_keys_route: node::protocol::ROUTE_ALL_KEYS.to_string(),
                get_key_route: node::protocol::ROUTE_KEY.to_string(),
                add_key_route: node::protocol::ROUTE_KEY.to_string(),
                remove_key_route: node::protocol::ROUTE_KEY.to_string(),
                ring_size,
            };
            let partitioner = Arc::new(Partitioner::new(config, Box::new(default_hash)));
            let app = coordinator::app(partitioner, max_body_bytes);

            tracing::info!(
                "coordinator listening on {} (ring size {})",
                bind_addr,
                ring_size
            );
            let listener = tokio::net::TcpListener::bind(bind_addr).await?;
            axum::serve(listener, app).await?;
        }
        _ => usage(&args[0]),
    }

    Ok(())
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} --bind <addr:port> --role <coordinator|node>", program);
    eprintln!("       {} loadtest <coordinator> <node>...", program);
    std::process::exit(1);
}
