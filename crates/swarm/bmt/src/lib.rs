//! Binary Merkle Tree (BMT) hashing for content addressing.
//!
//! A chunk of at most `count` segments is hashed into a Merkle root whose
//! shape depends only on the chunk's length. The root is the chunk's
//! [`ChunkAddress`](vertex_swarm_primitives::ChunkAddress), which the
//! Kademlia layer then routes by proximity.
//!
//! ```
//! use vertex_swarm_bmt::{BmtHasher, chunk_address};
//!
//! let hasher: BmtHasher = BmtHasher::new(4).unwrap();
//! let address = hasher.hash(&[0x01; 96]);
//! assert_eq!(
//!     address.to_string(),
//!     "04072b4bf8f53aa19257313c41b149c84cc90cc57849c5135b237ec6b302f721"
//! );
//!
//! // 4096-byte chunks hashed with Keccak-256
//! let _ = chunk_address(b"hello swarm");
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod constants;
mod error;
mod hasher;
mod writer;

pub use constants::*;
pub use error::BmtError;
pub use hasher::{BmtHasher, chunk_address};
pub use writer::ChunkWriter;

/// Re-exported so callers can name the default base hash.
pub use sha3::Keccak256;
