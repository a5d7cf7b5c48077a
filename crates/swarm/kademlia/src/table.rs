//! Proximity-ordered bucket table.
//!
//! Peers are placed in the bucket matching their proximity order (PO) to the
//! local address. Buckets are created on first use and dropped once they
//! empty, so a sparse table only pays for the orders it actually holds.
//!
//! # Locking
//!
//! All state sits behind a single `parking_lot::RwLock`. Inserts, removals
//! and evictions take the write lock; nearest-peer queries and statistics
//! take the read lock and see one consistent snapshot.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use tracing::{debug, trace};
use vertex_swarm_primitives::{ChunkAddress, OverlayAddress, Proximity};

use crate::{Bucket, BucketInsert, ConfigError, KademliaConfig, PeerEvents};

/// Result of [`BucketTable::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New peer stored in bucket `po`.
    Added { po: u16 },
    /// Known peer marked as most recently seen.
    Refreshed { po: u16 },
    /// New peer stored; `evicted` was dropped from the full bucket.
    Evicted { po: u16, evicted: OverlayAddress },
    /// Bucket `po` was full and kept its peers.
    Rejected { po: u16 },
    /// The peer is the local address.
    Ignored,
}

impl InsertOutcome {
    /// Whether the peer is in the table after the insert.
    pub fn is_stored(&self) -> bool {
        matches!(
            self,
            Self::Added { .. } | Self::Refreshed { .. } | Self::Evicted { .. }
        )
    }
}

/// Point-in-time counters of a [`BucketTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Total peers.
    pub peers: usize,
    /// Non-empty buckets.
    pub buckets: usize,
    /// Buckets at capacity.
    pub full_buckets: usize,
    /// Deepest non-empty bucket, if any.
    pub deepest: Option<u16>,
    /// Suggested neighbourhood depth, see [`BucketTable::saturation_depth`].
    pub saturation_depth: u16,
}

#[derive(Debug, Default)]
struct TableState {
    buckets: BTreeMap<u16, Bucket>,
    index: HashMap<OverlayAddress, u16>,
    clock: u64,
}

/// Kademlia routing table keyed by proximity order to the local address.
pub struct BucketTable {
    local: OverlayAddress,
    config: KademliaConfig,
    state: RwLock<TableState>,
}

impl std::fmt::Debug for BucketTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("BucketTable")
            .field("local", &self.local)
            .field("peers", &state.index.len())
            .field("buckets", &state.buckets.len())
            .finish_non_exhaustive()
    }
}

impl BucketTable {
    /// Create an empty table around `local`.
    ///
    /// The configuration is taken as is. A zero bucket size yields a table
    /// that rejects every peer; use [`try_new`](Self::try_new) to refuse such
    /// configurations up front.
    pub fn new(local: OverlayAddress, config: KademliaConfig) -> Self {
        Self {
            local,
            config,
            state: RwLock::new(TableState::default()),
        }
    }

    /// Create an empty table around `local` after validating `config`.
    pub fn try_new(local: OverlayAddress, config: KademliaConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(local, config))
    }

    /// The local overlay address.
    pub fn local(&self) -> &OverlayAddress {
        &self.local
    }

    /// Table configuration.
    pub fn config(&self) -> &KademliaConfig {
        &self.config
    }

    /// Record that `peer` was seen.
    ///
    /// A new peer goes into bucket `PO(local, peer)` if there is room; a known
    /// peer moves to the most-recently-seen end of its bucket. When the bucket
    /// is full the configured [`EvictionPolicy`](crate::EvictionPolicy)
    /// decides between the newcomer and the oldest peer.
    pub fn insert(&self, peer: OverlayAddress) -> InsertOutcome {
        if peer == self.local {
            trace!(%peer, "ignoring local address");
            return InsertOutcome::Ignored;
        }

        let po = self.local.proximity(&peer);
        let mut state = self.state.write();
        state.clock += 1;
        let seen = state.clock;

        let TableState { buckets, index, .. } = &mut *state;
        let bucket = buckets
            .entry(po)
            .or_insert_with(|| Bucket::new(self.config.bucket_size));

        match bucket.insert(peer, seen, self.config.eviction) {
            BucketInsert::Added => {
                index.insert(peer, po);
                trace!(%peer, po, "added peer");
                InsertOutcome::Added { po }
            }
            BucketInsert::Refreshed => {
                trace!(%peer, po, "refreshed peer");
                InsertOutcome::Refreshed { po }
            }
            BucketInsert::Evicted(evicted) => {
                index.remove(&evicted);
                index.insert(peer, po);
                debug!(%peer, %evicted, po, "bucket full, evicted oldest peer");
                InsertOutcome::Evicted { po, evicted }
            }
            BucketInsert::Rejected => {
                if bucket.is_empty() {
                    buckets.remove(&po);
                }
                trace!(%peer, po, "bucket full, rejected peer");
                InsertOutcome::Rejected { po }
            }
        }
    }

    /// Remove a peer. Returns `true` if it was present.
    pub fn remove(&self, peer: &OverlayAddress) -> bool {
        let mut state = self.state.write();
        let TableState { buckets, index, .. } = &mut *state;

        let Some(po) = index.remove(peer) else {
            return false;
        };
        if let Some(bucket) = buckets.get_mut(&po) {
            bucket.remove(peer);
            if bucket.is_empty() {
                buckets.remove(&po);
            }
        }
        trace!(%peer, po, "removed peer");
        true
    }

    /// The `n` peers closest to `target`, closest first.
    ///
    /// Peers are ranked by proximity order to the target, higher first. Ties
    /// go to the more recently seen peer. Fewer than `n` are returned only
    /// when the table holds fewer peers.
    pub fn nearest_to(&self, target: &ChunkAddress, n: usize) -> Vec<OverlayAddress> {
        self.nearest_with_proximity(target, n)
            .into_iter()
            .map(|(peer, _)| peer)
            .collect()
    }

    /// Like [`nearest_to`](Self::nearest_to), paired with each peer's
    /// proximity order to `target`.
    pub fn nearest_with_proximity(
        &self,
        target: &ChunkAddress,
        n: usize,
    ) -> Vec<(OverlayAddress, u16)> {
        if n == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<(u16, u64, OverlayAddress)> = {
            let state = self.state.read();
            state
                .buckets
                .values()
                .flat_map(|bucket| bucket.iter_recent())
                .map(|(peer, seen)| (target.proximity(peer), seen, *peer))
                .collect()
        };

        ranked.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        ranked.truncate(n);
        ranked.into_iter().map(|(po, _, peer)| (peer, po)).collect()
    }

    /// Whether `peer` is in the table.
    pub fn contains(&self, peer: &OverlayAddress) -> bool {
        self.state.read().index.contains_key(peer)
    }

    /// Bucket a stored peer lives in.
    pub fn proximity_of(&self, peer: &OverlayAddress) -> Option<u16> {
        self.state.read().index.get(peer).copied()
    }

    /// Total number of peers.
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    /// Whether the table holds no peers.
    pub fn is_empty(&self) -> bool {
        self.state.read().index.is_empty()
    }

    /// `(po, peers)` for every non-empty bucket, ascending by PO.
    pub fn bucket_sizes(&self) -> Vec<(u16, usize)> {
        self.state
            .read()
            .buckets
            .iter()
            .map(|(po, bucket)| (*po, bucket.len()))
            .collect()
    }

    /// Peers in bucket `po`, most recently seen first.
    pub fn peers_in_bucket(&self, po: u16) -> Vec<OverlayAddress> {
        self.state
            .read()
            .buckets
            .get(&po)
            .map(|bucket| bucket.iter_recent().map(|(peer, _)| *peer).collect())
            .unwrap_or_default()
    }

    /// Every non-empty bucket with its peers, taken under one read lock.
    pub fn snapshot(&self) -> Vec<(u16, Vec<OverlayAddress>)> {
        self.state
            .read()
            .buckets
            .iter()
            .map(|(po, bucket)| (*po, bucket.iter_recent().map(|(peer, _)| *peer).collect()))
            .collect()
    }

    /// Deepest bucket holding at least `low_watermark` peers, or 0.
    ///
    /// A suggestion for the neighbourhood depth: below it the node knows
    /// enough peers per order to forward reliably.
    pub fn saturation_depth(&self) -> u16 {
        let state = self.state.read();
        Self::saturation_of(&state, self.config.low_watermark)
    }

    fn saturation_of(state: &TableState, low_watermark: usize) -> u16 {
        state
            .buckets
            .iter()
            .rev()
            .find(|(_, bucket)| bucket.len() >= low_watermark)
            .map(|(po, _)| *po)
            .unwrap_or(0)
    }

    /// Current counters.
    pub fn stats(&self) -> TableStats {
        self.stats_of(&self.state.read())
    }

    fn stats_of(&self, state: &TableState) -> TableStats {
        TableStats {
            peers: state.index.len(),
            buckets: state.buckets.len(),
            full_buckets: state.buckets.values().filter(|b| b.is_full()).count(),
            deepest: state.buckets.keys().next_back().copied(),
            saturation_depth: Self::saturation_of(state, self.config.low_watermark),
        }
    }

    /// Log bucket populations at debug level.
    ///
    /// Non-empty buckets are listed as `po:peers`; the saturation depth is
    /// bracketed.
    pub fn log_status(&self) {
        let (sizes, stats) = {
            let state = self.state.read();
            let sizes: Vec<(u16, usize)> = state
                .buckets
                .iter()
                .map(|(po, bucket)| (*po, bucket.len()))
                .collect();
            (sizes, self.stats_of(&state))
        };

        let mut bins = String::new();
        for (po, count) in sizes {
            if !bins.is_empty() {
                bins.push(' ');
            }
            if po == stats.saturation_depth {
                bins.push_str(&format!("[{po}:{count}]"));
            } else {
                bins.push_str(&format!("{po}:{count}"));
            }
        }
        if bins.is_empty() {
            bins = "(empty)".to_string();
        }

        debug!(
            local = %self.local,
            peers = stats.peers,
            full = stats.full_buckets,
            depth = stats.saturation_depth,
            bins = %bins,
            "kademlia buckets"
        );
    }
}

impl PeerEvents for BucketTable {
    fn on_peer_seen(&self, peer: OverlayAddress) {
        self.insert(peer);
    }

    fn on_peer_lost(&self, peer: &OverlayAddress) {
        self.remove(peer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EvictionPolicy;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use std::{collections::HashSet, sync::Arc};
    use vertex_swarm_primitives::{address_with_proximity, random_address_at};

    fn local() -> OverlayAddress {
        "a1b2c3d4e5f60718293a4b5c6d7e8f90112233445566778899aabbccddeeff00"
            .parse()
            .unwrap()
    }

    fn table(bucket_size: usize, eviction: EvictionPolicy) -> BucketTable {
        BucketTable::new(
            local(),
            KademliaConfig::default()
                .with_bucket_size(bucket_size)
                .with_eviction(eviction),
        )
    }

    /// Deterministic peer at `po` from `base`.
    fn peer_at(base: &OverlayAddress, po: u16, fill: u8) -> OverlayAddress {
        address_with_proximity(base, po, || fill)
    }

    #[test]
    fn test_local_address_ignored() {
        let table = table(4, EvictionPolicy::EvictOldest);
        assert_eq!(table.insert(local()), InsertOutcome::Ignored);
        assert!(table.is_empty());
        assert!(table.bucket_sizes().is_empty());
    }

    #[test]
    fn test_insert_places_by_proximity() {
        let table = table(4, EvictionPolicy::EvictOldest);
        for po in [0u16, 3, 3, 200, 255] {
            let peer = random_address_at(&local(), po);
            assert_eq!(table.insert(peer), InsertOutcome::Added { po });
            assert_eq!(table.proximity_of(&peer), Some(po));
        }
        assert_eq!(table.len(), 5);
        assert_eq!(table.bucket_sizes(), vec![(0, 1), (3, 2), (200, 1), (255, 1)]);
    }

    #[test]
    fn test_reinsert_refreshes() {
        let table = table(4, EvictionPolicy::EvictOldest);
        let a = peer_at(&local(), 5, 0x00);
        let b = peer_at(&local(), 5, 0xff);
        table.insert(a);
        table.insert(b);
        assert_eq!(table.peers_in_bucket(5), vec![b, a]);

        assert_eq!(table.insert(a), InsertOutcome::Refreshed { po: 5 });
        assert_eq!(table.peers_in_bucket(5), vec![a, b]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_full_bucket_evict_oldest() {
        let table = table(2, EvictionPolicy::EvictOldest);
        let peers: Vec<_> = (0..3u8).map(|i| peer_at(&local(), 10, i)).collect();
        table.insert(peers[0]);
        table.insert(peers[1]);

        assert_eq!(
            table.insert(peers[2]),
            InsertOutcome::Evicted {
                po: 10,
                evicted: peers[0]
            }
        );
        assert!(!table.contains(&peers[0]));
        assert_eq!(table.proximity_of(&peers[0]), None);
        assert_eq!(table.peers_in_bucket(10), vec![peers[2], peers[1]]);
    }

    #[test]
    fn test_full_bucket_reject_new() {
        let table = table(2, EvictionPolicy::RejectNew);
        let peers: Vec<_> = (0..3u8).map(|i| peer_at(&local(), 10, i)).collect();
        table.insert(peers[0]);
        table.insert(peers[1]);

        let outcome = table.insert(peers[2]);
        assert_eq!(outcome, InsertOutcome::Rejected { po: 10 });
        assert!(!outcome.is_stored());
        assert!(!table.contains(&peers[2]));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_zero_bucket_size_stores_nothing() {
        let table = table(0, EvictionPolicy::EvictOldest);
        let peer = peer_at(&local(), 1, 0);
        assert_matches!(table.insert(peer), InsertOutcome::Rejected { po: 1 });
        assert!(table.bucket_sizes().is_empty());
    }

    #[test]
    fn test_try_new_validates_config() {
        assert_matches!(
            BucketTable::try_new(local(), KademliaConfig::default().with_bucket_size(0)),
            Err(ConfigError::ZeroBucketSize)
        );
        assert_matches!(
            BucketTable::try_new(local(), KademliaConfig::default().with_neighbourhood_depth(300)),
            Err(ConfigError::DepthOutOfRange(300))
        );

        let table = BucketTable::try_new(local(), KademliaConfig::default().with_bucket_size(1))
            .unwrap();
        let peer = peer_at(&local(), 1, 0);
        assert_matches!(table.insert(peer), InsertOutcome::Added { po: 1 });
        assert_eq!(table.config().bucket_size, 1);
    }

    #[test]
    fn test_remove_drops_empty_bucket() {
        let table = table(4, EvictionPolicy::EvictOldest);
        let a = peer_at(&local(), 7, 0x01);
        let b = peer_at(&local(), 7, 0x02);
        table.insert(a);
        table.insert(b);

        assert!(table.remove(&a));
        assert!(!table.remove(&a));
        assert_eq!(table.bucket_sizes(), vec![(7, 1)]);
        assert!(table.remove(&b));
        assert!(table.bucket_sizes().is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_nearest_to_scenario() {
        // peers at PO 2, 5, 5, 8 from local; target shares PO 8 with the
        // deepest peer, so it is closest, then the PO 5 pair
        let table = table(16, EvictionPolicy::EvictOldest);
        let p2 = peer_at(&local(), 2, 0x11);
        let p5a = peer_at(&local(), 5, 0x22);
        let p5b = peer_at(&local(), 5, 0x33);
        let p8 = peer_at(&local(), 8, 0x44);
        for peer in [p2, p5a, p5b, p8] {
            table.insert(peer);
        }

        let target = peer_at(&p8, 8, 0x55);
        assert_eq!(target.proximity(&p8), 8);
        assert_eq!(target.proximity(&p5a), 5);
        assert_eq!(target.proximity(&p2), 2);

        // ties on PO 5 go to the more recently seen peer
        assert_eq!(table.nearest_to(&target, 2), vec![p8, p5b]);
        assert_eq!(table.nearest_to(&target, 10), vec![p8, p5b, p5a, p2]);

        table.insert(p5a);
        assert_eq!(table.nearest_to(&target, 2), vec![p8, p5a]);
    }

    #[test]
    fn test_nearest_to_edge_cases() {
        let table = table(4, EvictionPolicy::EvictOldest);
        assert!(table.nearest_to(&local(), 3).is_empty());

        let peer = random_address_at(&local(), 4);
        table.insert(peer);
        assert!(table.nearest_to(&local(), 0).is_empty());
        assert_eq!(table.nearest_to(&local(), 3), vec![peer]);
        assert_eq!(table.nearest_with_proximity(&peer, 1), vec![(peer, 256)]);
    }

    #[test]
    fn test_saturation_and_stats() {
        let table = BucketTable::new(
            local(),
            KademliaConfig::default()
                .with_bucket_size(3)
                .with_low_watermark(2),
        );
        assert_eq!(table.saturation_depth(), 0);

        for i in 0..3u8 {
            table.insert(peer_at(&local(), 1, i));
        }
        for i in 0..2u8 {
            table.insert(peer_at(&local(), 4, i));
        }
        table.insert(peer_at(&local(), 9, 0));

        assert_eq!(table.saturation_depth(), 4);
        assert_eq!(
            table.stats(),
            TableStats {
                peers: 6,
                buckets: 3,
                full_buckets: 1,
                deepest: Some(9),
                saturation_depth: 4,
            }
        );
        table.log_status();
    }

    #[test]
    fn test_snapshot_consistent() {
        let table = table(4, EvictionPolicy::EvictOldest);
        let a = peer_at(&local(), 0, 1);
        let b = peer_at(&local(), 12, 1);
        table.insert(a);
        table.insert(b);
        assert_eq!(table.snapshot(), vec![(0, vec![a]), (12, vec![b])]);
    }

    #[test]
    fn test_peer_events() {
        let table = Arc::new(table(4, EvictionPolicy::EvictOldest));
        let peer = random_address_at(&local(), 3);

        fn notify(events: impl PeerEvents, peer: OverlayAddress) {
            events.on_peer_seen(peer);
        }
        notify(table.clone(), peer);
        assert!(table.contains(&peer));

        table.on_peer_lost(&peer);
        assert!(!table.contains(&peer));
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let table = Arc::new(table(8, EvictionPolicy::EvictOldest));
        let target = random_address_at(&local(), 0);

        std::thread::scope(|s| {
            for _ in 0..4 {
                let table = table.clone();
                s.spawn(move || {
                    for i in 0..500u32 {
                        let peer = random_address_at(&local(), (i % 20) as u16);
                        table.insert(peer);
                        if i % 3 == 0 {
                            table.remove(&peer);
                        }
                    }
                });
            }
            for _ in 0..2 {
                let table = table.clone();
                s.spawn(move || {
                    for _ in 0..500 {
                        let nearest = table.nearest_to(&target, 5);
                        assert!(nearest.len() <= 5);
                        let unique: HashSet<_> = nearest.iter().collect();
                        assert_eq!(unique.len(), nearest.len());
                    }
                });
            }
        });

        let snapshot = table.snapshot();
        let total: usize = snapshot.iter().map(|(_, peers)| peers.len()).sum();
        assert_eq!(total, table.len());
        for (po, peers) in snapshot {
            assert!(!peers.is_empty() && peers.len() <= 8);
            for peer in peers {
                assert_eq!(local().proximity(&peer), po);
                assert_eq!(table.proximity_of(&peer), Some(po));
            }
        }
    }

    fn arb_ops() -> impl Strategy<Value = Vec<(u16, u8, bool)>> {
        prop::collection::vec((0u16..12, any::<u8>(), prop::bool::weighted(0.2)), 0..300)
    }

    proptest! {
        #[test]
        fn prop_bucket_invariant(
            ops in arb_ops(),
            bucket_size in 1usize..6,
            reject in any::<bool>(),
        ) {
            let policy = if reject {
                EvictionPolicy::RejectNew
            } else {
                EvictionPolicy::EvictOldest
            };
            let table = table(bucket_size, policy);

            for (po, fill, remove) in ops {
                let peer = peer_at(&local(), po, fill);
                if remove {
                    table.remove(&peer);
                } else {
                    table.insert(peer);
                }
            }

            let mut seen = HashSet::new();
            for (po, peers) in table.snapshot() {
                prop_assert!(!peers.is_empty());
                prop_assert!(peers.len() <= bucket_size);
                for peer in peers {
                    prop_assert_eq!(local().proximity(&peer), po);
                    prop_assert!(seen.insert(peer));
                }
            }
            prop_assert_eq!(seen.len(), table.len());
        }

        #[test]
        fn prop_nearest_matches_brute_force(
            peers in prop::collection::vec(any::<[u8; 32]>(), 0..64),
            target in any::<[u8; 32]>(),
            n in 0usize..20,
        ) {
            let table = table(64, EvictionPolicy::EvictOldest);
            for peer in &peers {
                table.insert(OverlayAddress::new(*peer));
            }
            let target = ChunkAddress::new(target);
            let stored: Vec<OverlayAddress> = table
                .snapshot()
                .into_iter()
                .flat_map(|(_, peers)| peers)
                .collect();

            let nearest = table.nearest_to(&target, n);
            prop_assert_eq!(nearest.len(), n.min(stored.len()));

            let pos: Vec<u16> = nearest.iter().map(|p| target.proximity(p)).collect();
            prop_assert!(pos.windows(2).all(|w| w[0] >= w[1]));

            if let Some(&worst) = pos.last() {
                for peer in stored.iter().filter(|p| !nearest.contains(p)) {
                    prop_assert!(target.proximity(peer) <= worst);
                }
            }
        }
    }
}
