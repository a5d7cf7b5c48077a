//! Core primitive types for the Swarm overlay address space.
//!
//! Nodes and chunks share one 256-bit address space. This crate provides the
//! address type and the metric everything else routes by.
//!
//! # Types
//!
//! ## Address Types
//! - [`SwarmAddress`] - Fixed-size overlay address (32 bytes)
//! - [`OverlayAddress`] - Alias used for peers (Kademlia routing)
//! - [`ChunkAddress`] - Alias used for content (BMT root of a chunk)
//!
//! ## Metric
//! - [`proximity`], [`Proximity`] - Proximity order (shared-prefix bit count)
//! - [`distance`], [`distance_cmp`] - Raw XOR distance and comparison
//! - [`address_with_proximity`] - Generator for addresses at a controlled PO
//! - [`common_bits_address`] - Generator for addresses in another address's region

mod address;
mod distance;
mod proximity;

pub use address::{ADDRESS_SIZE, AddressError, SwarmAddress};
pub use distance::{distance, distance_cmp};
pub use proximity::{MAX_PO, Proximity, address_with_proximity, common_bits_address, proximity};

#[cfg(feature = "rand")]
pub use proximity::random_address_at;

/// Overlay address for Swarm routing and peer identification.
///
/// Used for Kademlia bucketing (proximity calculations against the local
/// node) and as the identity passed through peer events.
pub type OverlayAddress = SwarmAddress;

/// Address of a chunk: the BMT root of its content.
///
/// Lives in the same space as [`OverlayAddress`], so the proximity between a
/// chunk and a peer decides who stores it.
pub type ChunkAddress = SwarmAddress;
