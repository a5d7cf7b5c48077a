//! Seams between the routing core and the node around it.

use std::sync::Arc;

use async_trait::async_trait;
use vertex_swarm_primitives::{ChunkAddress, OverlayAddress};

use crate::LookupError;

/// Peer liveness notifications from the connection layer.
#[auto_impl::auto_impl(&, Arc)]
pub trait PeerEvents: Send + Sync {
    /// A peer was seen (connected, or answered a request).
    fn on_peer_seen(&self, peer: OverlayAddress);

    /// A peer went away.
    fn on_peer_lost(&self, peer: &OverlayAddress);
}

/// One hop of a greedy lookup, implemented by the network transport.
#[async_trait]
pub trait PeerLookup: Send + Sync {
    /// Ask `peer` for up to `count` peers it knows closest to `target`.
    async fn closer_peers(
        &self,
        peer: &OverlayAddress,
        target: &ChunkAddress,
        count: usize,
    ) -> Result<Vec<OverlayAddress>, LookupError>;
}

#[async_trait]
impl<T: PeerLookup + ?Sized> PeerLookup for Arc<T> {
    async fn closer_peers(
        &self,
        peer: &OverlayAddress,
        target: &ChunkAddress,
        count: usize,
    ) -> Result<Vec<OverlayAddress>, LookupError> {
        (**self).closer_peers(peer, target, count).await
    }
}
