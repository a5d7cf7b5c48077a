//! Kademlia routing over the Swarm proximity metric.
//!
//! Peers are kept in a [`BucketTable`]: one bounded, recency-ordered
//! [`Bucket`] per proximity order (PO) to the local address. A
//! [`ProximityRouter`] ranks known peers for a chunk address and runs greedy
//! lookups through a [`PeerLookup`] transport supplied by the host.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use vertex_swarm_kademlia::{BucketTable, KademliaConfig, ProximityRouter};
//!
//! let table = Arc::new(BucketTable::new(local, KademliaConfig::default()));
//! table.insert(peer);
//!
//! let router = ProximityRouter::new(table, transport);
//! let storers = router.storers(&chunk, 4);
//! let peers = router.route(&chunk, 4, deadline).await?;
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod bucket;
mod config;
mod error;
mod router;
mod table;
mod traits;

pub use bucket::{Bucket, BucketInsert};
pub use config::{
    DEFAULT_BUCKET_SIZE, DEFAULT_HOP_TIMEOUT, DEFAULT_LOW_WATERMARK, DEFAULT_MAX_HOPS,
    DEFAULT_NEIGHBOURHOOD_DEPTH, EvictionPolicy, KademliaConfig,
};
pub use error::{ConfigError, LookupError, RouteError};
pub use router::{Candidate, Lookup, ProximityRouter, Role, Termination};
pub use table::{BucketTable, InsertOutcome, TableStats};
pub use traits::{PeerEvents, PeerLookup};
