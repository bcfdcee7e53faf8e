//! Partitioning Engine Tests
//!
//! Validates the ring ordering invariants, the ownership rule, and the full
//! membership-change protocol.
//!
//! ## Test Scopes
//! - **Ring**: ordering after random mutation, the clockwise-successor
//!   ownership rule including wrap-around, circular successor arithmetic.
//! - **Partitioner**: lookup routing, collision/not-found rejection, and the
//!   surfaced enumeration failure.
//! - **Redistribution**: SPLIT and DRAIN runs against real backend nodes
//!   bound to ephemeral ports.

#[cfg(test)]
mod tests {
    use crate::node::store::KeyStore;
    use crate::partition::error::PartitionError;
    use crate::partition::partitioner::{Partitioner, PartitionerConfig};
    use crate::partition::ring::Ring;
    use crate::partition::types::{default_hash, HashFn, RingMember};
    use rand::Rng;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    const TEST_RING_SIZE: u64 = 360;

    fn member(address: &str, position: u64) -> RingMember {
        RingMember {
            address: address.to_string(),
            position,
        }
    }

    fn test_config() -> PartitionerConfig {
        PartitionerConfig {
            all_keys_route: "/keys".to_string(),
            get_key_route: "/key".to_string(),
            add_key_route: "/key".to_string(),
            remove_key_route: "/key".to_string(),
            ring_size: TEST_RING_SIZE,
        }
    }

    /// Hash giving exact ring positions: member addresses come from the
    /// table, and a key takes the numeric tail of its name, so "k150" lands
    /// on position 150.
    fn scripted_hash(members: &[(String, u64)]) -> HashFn {
        let table: HashMap<String, u64> = members.iter().cloned().collect();
        Box::new(move |input: &str| match table.get(input) {
            Some(position) => *position,
            None => input
                .trim_start_matches(|c: char| !c.is_ascii_digit())
                .parse()
                .unwrap_or(0),
        })
    }

    fn scripted_partitioner(members: &[(String, u64)]) -> Partitioner {
        Partitioner::new(test_config(), scripted_hash(members))
    }

    /// Starts a real backend node on an ephemeral port and returns its
    /// address together with a handle on its store.
    async fn spawn_node() -> (String, Arc<KeyStore>) {
        let store = Arc::new(KeyStore::new());
        let app = crate::node::app(store.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (address, store)
    }

    fn sorted(mut keys: Vec<String>) -> Vec<String> {
        keys.sort();
        keys
    }

    // ============================================================
    // RING TESTS
    // ============================================================

    #[test]
    fn test_insert_keeps_positions_ascending() {
        let mut ring = Ring::new();
        let mut used = HashSet::new();

        for i in 0..100 {
            let position = rand::thread_rng().gen_range(0..TEST_RING_SIZE);
            if !used.insert(position) {
                continue;
            }
            ring.insert(member(&format!("node-{}", i), position));
        }

        let members = ring.members();
        for i in 1..members.len() {
            assert!(
                members[i - 1].position < members[i].position,
                "positions must be strictly ascending, got {} before {}",
                members[i - 1].position,
                members[i].position
            );
        }
    }

    #[test]
    fn test_insert_returns_resulting_index() {
        let mut ring = Ring::new();

        assert_eq!(ring.insert(member("a", 100)), 0);
        assert_eq!(ring.insert(member("b", 50)), 0);
        assert_eq!(ring.insert(member("c", 200)), 2);
        assert_eq!(ring.insert(member("d", 75)), 1);

        let positions: Vec<u64> = ring.members().iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![50, 75, 100, 200]);
    }

    #[test]
    fn test_owner_matches_naive_scan() {
        let mut ring = Ring::new();
        let mut used = HashSet::new();
        for i in 0..20 {
            let position = rand::thread_rng().gen_range(0..TEST_RING_SIZE);
            if !used.insert(position) {
                continue;
            }
            ring.insert(member(&format!("node-{}", i), position));
        }

        for position in 0..TEST_RING_SIZE {
            // Smallest member position at or after `position`, else the
            // overall minimum.
            let expected = ring
                .members()
                .iter()
                .filter(|m| m.position >= position)
                .min_by_key(|m| m.position)
                .or_else(|| ring.members().iter().min_by_key(|m| m.position))
                .unwrap();

            let owner = ring.owner(position).unwrap();
            assert_eq!(
                owner.position, expected.position,
                "owner of {} should be {}",
                position, expected.position
            );
        }
    }

    #[test]
    fn test_owner_of_member_position_is_that_member() {
        let mut ring = Ring::new();
        for position in [20, 160, 220] {
            ring.insert(member(&format!("node-{}", position), position));
        }

        for m in ring.members() {
            assert_eq!(ring.owner(m.position).unwrap(), m);
        }
    }

    #[test]
    fn test_owner_wraps_past_highest_position() {
        let mut ring = Ring::new();
        ring.insert(member("a", 20));
        ring.insert(member("b", 160));
        ring.insert(member("c", 220));

        assert_eq!(ring.owner(80).unwrap().address, "b");
        assert_eq!(ring.owner(160).unwrap().address, "b");
        assert_eq!(ring.owner(190).unwrap().address, "c");
        // Past the highest member, ownership wraps to the lowest one.
        assert_eq!(ring.owner(300).unwrap().address, "a");
        // Below the lowest member, the lowest member owns too.
        assert_eq!(ring.owner(10).unwrap().address, "a");
    }

    #[test]
    fn test_owner_on_empty_ring_is_none() {
        let ring = Ring::new();
        assert!(ring.owner(42).is_none());
    }

    #[test]
    fn test_successor_is_circular() {
        let mut ring = Ring::new();
        ring.insert(member("a", 20));
        ring.insert(member("b", 160));
        ring.insert(member("c", 220));

        assert_eq!(ring.successor(0).address, "b");
        assert_eq!(ring.successor(1).address, "c");
        assert_eq!(ring.successor(2).address, "a");
    }

    #[test]
    fn test_find_and_remove_by_address() {
        let mut ring = Ring::new();
        ring.insert(member("a", 20));
        ring.insert(member("b", 160));

        assert_eq!(ring.find("b"), Some(1));
        assert_eq!(ring.find("missing"), None);

        let removed = ring.remove(1).unwrap();
        assert_eq!(removed.address, "b");
        assert_eq!(ring.len(), 1);
        assert!(ring.remove(5).is_none());
    }

    #[test]
    fn test_contains_position() {
        let mut ring = Ring::new();
        ring.insert(member("a", 20));
        ring.insert(member("b", 160));

        assert!(ring.contains_position(160));
        assert!(!ring.contains_position(161));
    }

    // ============================================================
    // PARTITIONER LOOKUP TESTS
    // ============================================================

    #[tokio::test]
    async fn test_get_shard_on_empty_ring_fails() {
        let partitioner = scripted_partitioner(&[]);

        let err = partitioner.get_shard("anything").await.unwrap_err();
        assert!(matches!(err, PartitionError::NoMembers));
    }

    #[tokio::test]
    async fn test_single_member_owns_every_key() {
        let members = vec![("10.1.1.1:7000".to_string(), 100)];
        let partitioner = scripted_partitioner(&members);
        partitioner.add_member("10.1.1.1:7000").await.unwrap();

        for key in ["k0", "k100", "k250", "k359"] {
            assert_eq!(partitioner.get_shard(key).await.unwrap(), "10.1.1.1:7000");
        }
    }

    #[tokio::test]
    async fn test_lookup_routes_to_clockwise_successor() {
        let (addr_a, _store_a) = spawn_node().await;
        let (addr_b, _store_b) = spawn_node().await;
        let (addr_c, _store_c) = spawn_node().await;
        let members = vec![
            (addr_a.clone(), 20),
            (addr_b.clone(), 160),
            (addr_c.clone(), 220),
        ];
        let partitioner = scripted_partitioner(&members);
        partitioner.add_member(&addr_a).await.unwrap();
        partitioner.add_member(&addr_b).await.unwrap();
        partitioner.add_member(&addr_c).await.unwrap();

        assert_eq!(partitioner.get_shard("k80").await.unwrap(), addr_b);
        assert_eq!(partitioner.get_shard("k160").await.unwrap(), addr_b);
        assert_eq!(partitioner.get_shard("k190").await.unwrap(), addr_c);
        assert_eq!(partitioner.get_shard("k300").await.unwrap(), addr_a);
    }

    #[tokio::test]
    async fn test_repeated_lookup_is_stable() {
        let members = vec![("10.1.1.1:7000".to_string(), 100)];
        let partitioner = scripted_partitioner(&members);
        partitioner.add_member("10.1.1.1:7000").await.unwrap();

        let first = partitioner.get_shard("some-key").await.unwrap();
        for _ in 0..10 {
            assert_eq!(partitioner.get_shard("some-key").await.unwrap(), first);
        }
    }

    #[tokio::test]
    async fn test_default_hash_positions_are_deterministic_and_reduced() {
        let partitioner = Partitioner::new(test_config(), Box::new(default_hash));

        for i in 0..1000 {
            let key = format!("test_key_{}", i);
            let position = partitioner.position_of(&key);
            assert_eq!(position, partitioner.position_of(&key));
            assert!(position < TEST_RING_SIZE);
        }
    }

    #[tokio::test]
    async fn test_default_hash_spreads_keys() {
        let partitioner = Partitioner::new(test_config(), Box::new(default_hash));

        let mut seen = HashSet::new();
        for i in 0..10000 {
            seen.insert(partitioner.position_of(&format!("key_{}", i)));
        }
        // 10k keys over 360 slots should fill most of the ring.
        assert!(
            seen.len() > 300,
            "expected the keys to cover most positions, got {}",
            seen.len()
        );
    }

    // ============================================================
    // MEMBERSHIP REJECTION TESTS
    // ============================================================

    #[tokio::test]
    async fn test_add_member_rejects_duplicate_address() {
        let members = vec![("10.1.1.1:7000".to_string(), 100)];
        let partitioner = scripted_partitioner(&members);
        partitioner.add_member("10.1.1.1:7000").await.unwrap();

        let err = partitioner.add_member("10.1.1.1:7000").await.unwrap_err();
        assert!(matches!(err, PartitionError::AddressCollision(_)));
        assert_eq!(partitioner.topology().await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_member_rejects_position_collision() {
        let members = vec![
            ("10.1.1.1:7000".to_string(), 100),
            ("10.1.1.2:7000".to_string(), 100),
        ];
        let partitioner = scripted_partitioner(&members);
        partitioner.add_member("10.1.1.1:7000").await.unwrap();

        let err = partitioner.add_member("10.1.1.2:7000").await.unwrap_err();
        match err {
            PartitionError::PositionCollision { position, .. } => assert_eq!(position, 100),
            other => panic!("expected PositionCollision, got {:?}", other),
        }
        assert_eq!(partitioner.topology().await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_member_unknown_address_fails() {
        let partitioner = scripted_partitioner(&[]);

        let err = partitioner.remove_member("10.9.9.9:7000").await.unwrap_err();
        assert!(matches!(err, PartitionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_enumeration_failure_is_surfaced_and_member_kept() {
        // 127.0.0.1:9 refuses connections, so enumerating the successor of
        // the second member fails.
        let members = vec![
            ("127.0.0.1:9".to_string(), 100),
            ("10.1.1.2:7000".to_string(), 200),
        ];
        let partitioner = scripted_partitioner(&members);
        partitioner.add_member("127.0.0.1:9").await.unwrap();

        let err = partitioner.add_member("10.1.1.2:7000").await.unwrap_err();
        match err {
            PartitionError::MigrationEnumerationFailed { address, .. } => {
                assert_eq!(address, "127.0.0.1:9");
            }
            other => panic!("expected MigrationEnumerationFailed, got {:?}", other),
        }

        // The mutation is not rolled back: the ring already routes to the
        // new member.
        assert_eq!(partitioner.topology().await.len(), 2);
    }

    #[tokio::test]
    async fn test_removing_last_member_skips_migration() {
        // A dead address proves no migration HTTP is attempted for the last
        // member.
        let members = vec![("127.0.0.1:9".to_string(), 50)];
        let partitioner = scripted_partitioner(&members);
        partitioner.add_member("127.0.0.1:9").await.unwrap();

        partitioner.remove_member("127.0.0.1:9").await.unwrap();

        assert!(partitioner.topology().await.is_empty());
        let err = partitioner.get_shard("k10").await.unwrap_err();
        assert!(matches!(err, PartitionError::NoMembers));
    }

    // ============================================================
    // REDISTRIBUTION TESTS (live backend nodes)
    // ============================================================

    #[tokio::test]
    async fn test_split_moves_exactly_the_new_arc() {
        let (addr_a, _store_a) = spawn_node().await;
        let (addr_b, store_b) = spawn_node().await;
        let (addr_c, store_c) = spawn_node().await;
        let (addr_d, store_d) = spawn_node().await;
        let members = vec![
            (addr_a.clone(), 20),
            (addr_b.clone(), 160),
            (addr_c.clone(), 220),
            (addr_d.clone(), 180),
        ];
        let partitioner = scripted_partitioner(&members);
        partitioner.add_member(&addr_a).await.unwrap();
        partitioner.add_member(&addr_b).await.unwrap();
        partitioner.add_member(&addr_c).await.unwrap();

        // Keys owned by C before the insert; two of them fall in (160, 180].
        store_c.put("k165".to_string(), "v165".to_string());
        store_c.put("k175".to_string(), "v175".to_string());
        store_c.put("k190".to_string(), "v190".to_string());
        store_c.put("k220".to_string(), "v220".to_string());
        // A key on B, outside the affected arc entirely.
        store_b.put("k100".to_string(), "v100".to_string());

        partitioner.add_member(&addr_d).await.unwrap();

        assert_eq!(sorted(store_d.keys()), vec!["k165", "k175"]);
        assert_eq!(sorted(store_c.keys()), vec!["k190", "k220"]);
        assert_eq!(sorted(store_b.keys()), vec!["k100"]);
        // Values travel with their keys.
        assert_eq!(store_d.get("k165").as_deref(), Some("v165"));
        assert_eq!(store_d.get("k175").as_deref(), Some("v175"));

        // Lookups agree with where the data went.
        assert_eq!(partitioner.get_shard("k165").await.unwrap(), addr_d);
        assert_eq!(partitioner.get_shard("k175").await.unwrap(), addr_d);
        assert_eq!(partitioner.get_shard("k190").await.unwrap(), addr_c);
    }

    #[tokio::test]
    async fn test_split_handles_wraparound_arc() {
        let (addr_a, store_a) = spawn_node().await;
        let (addr_b, store_b) = spawn_node().await;
        let (addr_c, _store_c) = spawn_node().await;
        let members = vec![
            (addr_a.clone(), 20),
            (addr_b.clone(), 160),
            (addr_c.clone(), 220),
        ];
        let partitioner = scripted_partitioner(&members);
        partitioner.add_member(&addr_b).await.unwrap();
        partitioner.add_member(&addr_c).await.unwrap();

        // With only B and C on the ring, B owns the wrapped arc (220, 160].
        store_b.put("k10".to_string(), "v10".to_string());
        store_b.put("k300".to_string(), "v300".to_string());
        store_b.put("k100".to_string(), "v100".to_string());

        partitioner.add_member(&addr_a).await.unwrap();

        // A@20 takes over (220, 20]: both the wrapped key and the low one.
        assert_eq!(sorted(store_a.keys()), vec!["k10", "k300"]);
        assert_eq!(sorted(store_b.keys()), vec!["k100"]);
    }

    #[tokio::test]
    async fn test_drain_moves_every_key_to_successor() {
        let (addr_a, _store_a) = spawn_node().await;
        let (addr_b, store_b) = spawn_node().await;
        let (addr_c, store_c) = spawn_node().await;
        let members = vec![
            (addr_a.clone(), 20),
            (addr_b.clone(), 160),
            (addr_c.clone(), 220),
        ];
        let partitioner = scripted_partitioner(&members);
        partitioner.add_member(&addr_a).await.unwrap();
        partitioner.add_member(&addr_b).await.unwrap();
        partitioner.add_member(&addr_c).await.unwrap();

        store_b.put("k80".to_string(), "v80".to_string());
        store_b.put("k100".to_string(), "v100".to_string());
        store_b.put("k150".to_string(), "v150".to_string());

        partitioner.remove_member(&addr_b).await.unwrap();

        assert!(store_b.is_empty());
        assert_eq!(sorted(store_c.keys()), vec!["k100", "k150", "k80"]);
        assert_eq!(store_c.get("k80").as_deref(), Some("v80"));

        let topology = partitioner.topology().await;
        assert_eq!(topology.len(), 2);
        assert_eq!(topology[0].address, addr_a);
        assert_eq!(topology[1].address, addr_c);

        // The drained keys now route to the successor.
        assert_eq!(partitioner.get_shard("k80").await.unwrap(), addr_c);
    }

    #[tokio::test]
    async fn test_per_key_failures_do_not_fail_the_call() {
        let (addr_b, store_b) = spawn_node().await;
        // The destination refuses connections: enumeration (on B) works but
        // every per-key placement fails.
        let members = vec![(addr_b.clone(), 160), ("127.0.0.1:9".to_string(), 220)];
        let partitioner = scripted_partitioner(&members);
        partitioner.add_member(&addr_b).await.unwrap();
        let _ = partitioner.add_member("127.0.0.1:9").await;
        assert_eq!(partitioner.topology().await.len(), 2);

        store_b.put("k80".to_string(), "v80".to_string());
        store_b.put("k150".to_string(), "v150".to_string());

        // The drain still reports success; the abandoned keys stay where
        // they were because eviction only follows a successful placement.
        partitioner.remove_member(&addr_b).await.unwrap();

        assert_eq!(sorted(store_b.keys()), vec!["k150", "k80"]);
        assert_eq!(partitioner.topology().await.len(), 1);
    }

    #[tokio::test]
    async fn test_topology_snapshot_is_ordered() {
        let members = vec![
            ("127.0.0.1:9".to_string(), 220),
            ("127.0.0.2:9".to_string(), 20),
        ];
        let partitioner = scripted_partitioner(&members);
        partitioner.add_member("127.0.0.1:9").await.unwrap();

        // The second add enumerates the first member, which is unreachable;
        // the mutation still lands, which is all this test needs.
        let _ = partitioner.add_member("127.0.0.2:9").await;

        let topology = partitioner.topology().await;
        assert_eq!(topology.len(), 2);
        assert_eq!(topology[0].position, 20);
        assert_eq!(topology[1].position, 220);
    }
}
