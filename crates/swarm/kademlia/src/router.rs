//! Chunk routing by proximity.
//!
//! The router answers two questions for a chunk address: which locally known
//! peers are closest to it (and whether they are in its neighbourhood), and,
//! through a [`PeerLookup`] transport, which peers anywhere in the network
//! are. The second is a greedy Kademlia lookup: ask the closest known peer for
//! peers closer still and move on only while each hop strictly improves the
//! proximity order.

use std::{collections::HashSet, future::Future, sync::Arc};

use tokio::time::Instant;
use tracing::{debug, trace, warn};
use vertex_swarm_primitives::{ChunkAddress, OverlayAddress, Proximity};

use crate::{BucketTable, PeerEvents, PeerLookup, RouteError};

/// Whether a peer is expected to store a chunk or only pass requests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Proximity order to the chunk is at least the neighbourhood depth.
    Storer,
    /// Shallower than the neighbourhood; forwards towards it.
    Forwarder,
}

/// A locally known peer ranked for a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// The peer.
    pub address: OverlayAddress,
    /// Proximity order between the peer and the chunk.
    pub proximity: u16,
    /// What the peer does for the chunk.
    pub role: Role,
}

/// Why a lookup stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The local node or the closest candidate is inside the chunk's
    /// neighbourhood.
    Neighbourhood,
    /// The last hop brought no strictly closer peer.
    NoCloserPeer,
    /// `max_hops` hops were made.
    HopLimit,
    /// No candidates left.
    Exhausted,
    /// The deadline passed or the cancel future completed.
    Cancelled,
}

/// Outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Best candidates found, closest first.
    pub peers: Vec<OverlayAddress>,
    /// Hops attempted, including failed ones.
    pub hops: usize,
    /// Why the lookup stopped.
    pub termination: Termination,
}

/// Routes chunk addresses over a [`BucketTable`].
pub struct ProximityRouter<L> {
    table: Arc<BucketTable>,
    transport: L,
}

impl<L> std::fmt::Debug for ProximityRouter<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProximityRouter")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl<L: PeerLookup> ProximityRouter<L> {
    /// Create a router over `table`, reaching remote peers through `transport`.
    pub fn new(table: Arc<BucketTable>, transport: L) -> Self {
        Self { table, transport }
    }

    /// The underlying table.
    pub fn table(&self) -> &Arc<BucketTable> {
        &self.table
    }

    /// Role of a peer at proximity order `po` from a chunk.
    pub fn role_for(&self, po: u16) -> Role {
        if po >= self.table.config().neighbourhood_depth {
            Role::Storer
        } else {
            Role::Forwarder
        }
    }

    /// The `n` locally known peers closest to `target`, closest first.
    pub fn candidates(&self, target: &ChunkAddress, n: usize) -> Vec<Candidate> {
        self.table
            .nearest_with_proximity(target, n)
            .into_iter()
            .map(|(address, proximity)| Candidate {
                address,
                proximity,
                role: self.role_for(proximity),
            })
            .collect()
    }

    /// Of the `n` closest local candidates, those authoritative for `target`.
    pub fn storers(&self, target: &ChunkAddress, n: usize) -> Vec<OverlayAddress> {
        self.candidates(target, n)
            .into_iter()
            .filter(|c| c.role == Role::Storer)
            .map(|c| c.address)
            .collect()
    }

    /// Find the `n` peers closest to `target`, giving up at `deadline`.
    ///
    /// See [`route_until`](Self::route_until).
    pub async fn route(
        &self,
        target: &ChunkAddress,
        n: usize,
        deadline: Instant,
    ) -> Result<Vec<OverlayAddress>, RouteError> {
        self.route_until(target, n, tokio::time::sleep_until(deadline))
            .await
    }

    /// Find the `n` peers closest to `target`, giving up when `cancel`
    /// completes.
    ///
    /// Returns the best candidates known when the lookup stops, closest
    /// first, including when `cancel` fires midway. An empty table yields an
    /// empty list. The only error is [`RouteError::Cancelled`], when the
    /// lookup was cancelled without a single candidate in hand.
    pub async fn route_until<F>(
        &self,
        target: &ChunkAddress,
        n: usize,
        cancel: F,
    ) -> Result<Vec<OverlayAddress>, RouteError>
    where
        F: Future<Output = ()>,
    {
        let lookup = self.lookup(target, n, cancel).await;
        if lookup.termination == Termination::Cancelled && lookup.peers.is_empty() {
            return Err(RouteError::Cancelled);
        }
        Ok(lookup.peers)
    }

    /// Greedy lookup with full reporting.
    ///
    /// Starts from the local table and repeatedly asks the closest
    /// not-yet-queried candidate for peers closer to `target`. Every hop must
    /// go to a peer strictly closer than the local node and than the last peer
    /// that answered. Stops as soon as the local node or the closest
    /// candidate is in the neighbourhood, a hop brings nothing strictly
    /// closer, `max_hops` is spent, no candidates remain, or `cancel`
    /// completes. Each hop is bounded by `hop_timeout`; a failed or timed-out
    /// peer is dropped from the candidates.
    ///
    /// Local candidates are gathered before `cancel` is first polled, so a
    /// cancelled lookup still reports them.
    pub async fn lookup<F>(&self, target: &ChunkAddress, n: usize, cancel: F) -> Lookup
    where
        F: Future<Output = ()>,
    {
        let config = self.table.config();
        let local = *self.table.local();
        let local_po = target.proximity(&local);
        let mut best = self.table.nearest_with_proximity(target, n);
        let mut queried = HashSet::new();
        let mut failed = HashSet::new();
        let mut last_po = local_po;
        let mut hops = 0;

        let mut cancel = std::pin::pin!(cancel);

        let termination = if local_po >= config.neighbourhood_depth {
            trace!(%target, local_po, "local node is in the neighbourhood");
            Termination::Neighbourhood
        } else if futures::poll!(cancel.as_mut()).is_ready() {
            trace!(%target, "lookup cancelled before the first hop");
            Termination::Cancelled
        } else {
            loop {
                let Some(&(peer, po)) = best.first() else {
                    break Termination::Exhausted;
                };
                if po >= config.neighbourhood_depth {
                    break Termination::Neighbourhood;
                }
                if queried.contains(&peer) || po <= last_po {
                    break Termination::NoCloserPeer;
                }
                if hops >= config.max_hops {
                    break Termination::HopLimit;
                }

                queried.insert(peer);
                hops += 1;
                trace!(%target, %peer, po, hops, "lookup hop");

                let reply = tokio::select! {
                    biased;
                    _ = &mut cancel => break Termination::Cancelled,
                    reply = tokio::time::timeout(
                        config.hop_timeout,
                        self.transport.closer_peers(&peer, target, n),
                    ) => reply,
                };

                match reply {
                    Ok(Ok(found)) => {
                        last_po = po;
                        let offered = found.len();
                        for address in found {
                            if address == local
                                || failed.contains(&address)
                                || best.iter().any(|(known, _)| *known == address)
                            {
                                continue;
                            }
                            best.push((address, target.proximity(&address)));
                        }
                        // stable: on equal proximity, earlier candidates stay ahead
                        best.sort_by(|a, b| b.1.cmp(&a.1));
                        best.truncate(n);
                        trace!(%peer, offered, "lookup hop answered");
                    }
                    Ok(Err(err)) => {
                        warn!(%peer, %err, "lookup hop failed");
                        failed.insert(peer);
                        best.retain(|(known, _)| *known != peer);
                    }
                    Err(_) => {
                        warn!(%peer, timeout = ?config.hop_timeout, "lookup hop timed out");
                        failed.insert(peer);
                        best.retain(|(known, _)| *known != peer);
                    }
                }
            }
        };

        debug!(
            %target,
            hops,
            ?termination,
            found = best.len(),
            closest = best.first().map(|(_, po)| *po),
            "lookup finished"
        );

        Lookup {
            peers: best.into_iter().map(|(peer, _)| peer).collect(),
            hops,
            termination,
        }
    }
}

impl<L: PeerLookup> PeerEvents for ProximityRouter<L> {
    fn on_peer_seen(&self, peer: OverlayAddress) {
        self.table.insert(peer);
    }

    fn on_peer_lost(&self, peer: &OverlayAddress) {
        self.table.remove(peer);
    }
}
