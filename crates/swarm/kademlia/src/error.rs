use vertex_swarm_primitives::{MAX_PO, OverlayAddress};

/// Errors from validating a [`KademliaConfig`](crate::KademliaConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Buckets must hold at least one peer.
    #[error("bucket size must be at least 1")]
    ZeroBucketSize,
    /// Neighbourhood depth beyond the address width.
    #[error("neighbourhood depth {0} exceeds maximum proximity order {MAX_PO}")]
    DepthOutOfRange(u16),
}

/// Errors reported by a [`PeerLookup`](crate::PeerLookup) transport for a
/// single hop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The peer could not be reached.
    #[error("peer {0} unreachable")]
    Unreachable(OverlayAddress),
    /// The peer answered with something unusable.
    #[error("invalid response from {peer}: {reason}")]
    InvalidResponse {
        /// Peer that answered.
        peer: OverlayAddress,
        /// What was wrong with the answer.
        reason: String,
    },
    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors from a greedy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// The deadline passed or the lookup was cancelled before any candidate
    /// was known.
    #[error("lookup cancelled before any candidate was found")]
    Cancelled,
}
