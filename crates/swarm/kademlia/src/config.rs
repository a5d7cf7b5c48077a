//! Kademlia bucket table and routing configuration.
//!
//! # Thresholds
//!
//! - **Bucket size** (`bucket_size`, default 16): the classic Kademlia `K`.
//!   Each proximity order holds at most this many peers.
//!
//! - **Eviction** (`eviction`, default [`EvictionPolicy::EvictOldest`]): what
//!   happens when a peer arrives for a full bucket.
//!
//! - **Neighbourhood depth** (`neighbourhood_depth`, default 8): minimum
//!   proximity order between a peer and a chunk for the peer to be
//!   authoritative for storing it. Shallower peers only forward.
//!
//! - **Low watermark** (`low_watermark`, default 3): minimum peers in a
//!   bucket for it to count towards the suggested saturation depth.
//!
//! - **Hop budget** (`max_hops`, default 16) and **hop timeout**
//!   (`hop_timeout`, default 10s): bounds on a greedy lookup.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vertex_swarm_primitives::MAX_PO;

use crate::ConfigError;

/// Default maximum peers per bucket (K).
pub const DEFAULT_BUCKET_SIZE: usize = 16;

/// Default minimum proximity order for a peer to be authoritative for a chunk.
pub const DEFAULT_NEIGHBOURHOOD_DEPTH: u16 = 8;

/// Default maximum forwarding hops in a greedy lookup.
pub const DEFAULT_MAX_HOPS: usize = 16;

/// Default minimum peers in a bucket for saturation depth calculation.
pub const DEFAULT_LOW_WATERMARK: usize = 3;

/// Default time allowed for a single lookup hop.
pub const DEFAULT_HOP_TIMEOUT: Duration = Duration::from_secs(10);

/// What to do when a peer is seen for a bucket that is already full.
///
/// The choice changes churn behaviour under load: `EvictOldest` lets fresh
/// peers displace stale ones, `RejectNew` keeps long-lived peers and ignores
/// newcomers until a slot frees up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionPolicy {
    /// Drop the least-recently-seen peer of the bucket to make room.
    #[default]
    EvictOldest,
    /// Keep the bucket as is and drop the newcomer.
    RejectNew,
}

/// Configuration for the bucket table and proximity router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct KademliaConfig {
    /// Maximum peers per bucket (K).
    pub bucket_size: usize,

    /// Policy applied when a bucket is full.
    pub eviction: EvictionPolicy,

    /// Minimum proximity order to a chunk for a peer to store it.
    pub neighbourhood_depth: u16,

    /// Maximum forwarding hops for a greedy lookup.
    pub max_hops: usize,

    /// Minimum peers in a bucket for saturation depth calculation.
    pub low_watermark: usize,

    /// Time allowed for a single lookup hop.
    #[serde(with = "millis")]
    pub hop_timeout: Duration,
}

impl Default for KademliaConfig {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
            eviction: EvictionPolicy::default(),
            neighbourhood_depth: DEFAULT_NEIGHBOURHOOD_DEPTH,
            max_hops: DEFAULT_MAX_HOPS,
            low_watermark: DEFAULT_LOW_WATERMARK,
            hop_timeout: DEFAULT_HOP_TIMEOUT,
        }
    }
}

impl KademliaConfig {
    /// Check the configuration for values the table cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_size == 0 {
            return Err(ConfigError::ZeroBucketSize);
        }
        if self.neighbourhood_depth > MAX_PO {
            return Err(ConfigError::DepthOutOfRange(self.neighbourhood_depth));
        }
        Ok(())
    }

    /// Set the maximum peers per bucket.
    pub fn with_bucket_size(mut self, size: usize) -> Self {
        self.bucket_size = size;
        self
    }

    /// Set the eviction policy for full buckets.
    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Set the neighbourhood depth.
    pub fn with_neighbourhood_depth(mut self, depth: u16) -> Self {
        self.neighbourhood_depth = depth;
        self
    }

    /// Set the lookup hop budget.
    pub fn with_max_hops(mut self, hops: usize) -> Self {
        self.max_hops = hops;
        self
    }

    /// Set the low watermark for saturation depth calculation.
    pub fn with_low_watermark(mut self, count: usize) -> Self {
        self.low_watermark = count;
        self
    }

    /// Set the per-hop lookup timeout.
    pub fn with_hop_timeout(mut self, timeout: Duration) -> Self {
        self.hop_timeout = timeout;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
