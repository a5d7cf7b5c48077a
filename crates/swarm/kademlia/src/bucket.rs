//! A single Kademlia bucket: the peers at one proximity order from the local
//! node, ordered by when they were last seen.

use hashlink::LinkedHashMap;
use vertex_swarm_primitives::OverlayAddress;

use crate::EvictionPolicy;

/// Result of offering a peer to a [`Bucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketInsert {
    /// The peer was not present and there was room.
    Added,
    /// The peer was already present and is now the most recently seen.
    Refreshed,
    /// The bucket was full; the contained peer was dropped to make room.
    Evicted(OverlayAddress),
    /// The bucket was full and kept its current peers.
    Rejected,
}

/// Bounded, recency-ordered set of peers.
///
/// The front of the map is the least recently seen peer, the back the most
/// recent. Values are the table-wide logical clock at the time the peer was
/// last seen.
#[derive(Debug, Clone)]
pub struct Bucket {
    peers: LinkedHashMap<OverlayAddress, u64>,
    capacity: usize,
}

impl Bucket {
    /// Create an empty bucket holding at most `capacity` peers.
    pub fn new(capacity: usize) -> Self {
        Self {
            peers: LinkedHashMap::new(),
            capacity,
        }
    }

    /// Offer a peer seen at logical time `seen`.
    pub fn insert(
        &mut self,
        peer: OverlayAddress,
        seen: u64,
        policy: EvictionPolicy,
    ) -> BucketInsert {
        if self.peers.remove(&peer).is_some() {
            self.peers.insert(peer, seen);
            return BucketInsert::Refreshed;
        }

        if self.peers.len() < self.capacity {
            self.peers.insert(peer, seen);
            return BucketInsert::Added;
        }

        match policy {
            EvictionPolicy::RejectNew => BucketInsert::Rejected,
            EvictionPolicy::EvictOldest => match self.peers.pop_front() {
                Some((oldest, _)) => {
                    self.peers.insert(peer, seen);
                    BucketInsert::Evicted(oldest)
                }
                None => BucketInsert::Rejected,
            },
        }
    }

    /// Remove a peer. Returns `true` if it was present.
    pub fn remove(&mut self, peer: &OverlayAddress) -> bool {
        self.peers.remove(peer).is_some()
    }

    /// Whether the peer is in this bucket.
    pub fn contains(&self, peer: &OverlayAddress) -> bool {
        self.peers.contains_key(peer)
    }

    /// Number of peers held.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether the bucket holds no peers.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Whether the bucket is at capacity.
    pub fn is_full(&self) -> bool {
        self.peers.len() >= self.capacity
    }

    /// Maximum number of peers.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Least recently seen peer, the next to go under
    /// [`EvictionPolicy::EvictOldest`].
    pub fn oldest(&self) -> Option<OverlayAddress> {
        self.peers.front().map(|(peer, _)| *peer)
    }

    /// Peers with their last-seen time, most recent first.
    pub fn iter_recent(&self) -> impl Iterator<Item = (&OverlayAddress, u64)> + '_ {
        self.peers.iter().rev().map(|(peer, seen)| (peer, *seen))
    }
}
