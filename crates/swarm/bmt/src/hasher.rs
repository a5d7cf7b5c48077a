//! Binary Merkle Tree hasher.

use std::{fmt, marker::PhantomData};

use digest::{Digest, OutputSizeUser, typenum::U32};
use sha3::Keccak256;
use tracing::trace;
use vertex_swarm_primitives::ChunkAddress;

use crate::{
    BmtError, ChunkWriter, DEFAULT_SEGMENT_COUNT, MAX_SEGMENT_COUNT, PARALLEL_THRESHOLD,
    SECTION_SIZE, SEGMENT_SIZE, span_for,
};

type Node = [u8; SEGMENT_SIZE];

/// Computes the BMT root of a chunk, which is the chunk's address.
///
/// The tree shape is a pure function of the input length and the span:
///
/// - an input of at most one section (two segments) is a leaf and is hashed
///   as-is, without padding;
/// - otherwise the input is split at the largest power-of-two multiple of
///   the segment size strictly below its length. The left part is always a
///   subtree. The right remainder is a subtree when it is longer than one
///   segment, and is concatenated raw otherwise.
///
/// Every node digest is a single invocation of the base hash `D` over
/// `left || right`, with a fresh `D` instance per node. Independent subtrees
/// of large inputs are hashed on the rayon pool.
///
/// `D` must not admit extension collisions within a single leaf: a short
/// leaf and a longer one with trailing zero bytes are distinguished only by
/// the base hash's own framing, never by padding or length prefixes.
pub struct BmtHasher<D = Keccak256> {
    count: usize,
    span: usize,
    cap: usize,
    parallel: bool,
    _marker: PhantomData<fn() -> D>,
}

impl<D> BmtHasher<D>
where
    D: Digest + OutputSizeUser<OutputSize = U32>,
{
    /// Create a hasher for chunks of up to `count` segments.
    pub fn new(count: usize) -> Result<Self, BmtError> {
        if count == 0 || count > MAX_SEGMENT_COUNT {
            return Err(BmtError::InvalidSegmentCount(count));
        }
        Ok(Self::with_valid_count(count))
    }

    fn with_valid_count(count: usize) -> Self {
        Self {
            count,
            span: span_for(count),
            cap: count * SEGMENT_SIZE,
            parallel: true,
            _marker: PhantomData,
        }
    }

    /// Enable or disable hashing subtrees on the rayon pool.
    ///
    /// The root is identical either way.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Number of segments a chunk may hold.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Byte length of the canonical tree the shape is derived from.
    pub fn span(&self) -> usize {
        self.span
    }

    /// Maximum number of input bytes that contribute to the root.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Byte length of a leaf section (two segments).
    pub fn section(&self) -> usize {
        SECTION_SIZE
    }

    /// Byte length of a segment (the base hash output size).
    pub fn segment_size(&self) -> usize {
        SEGMENT_SIZE
    }

    /// Compute the chunk address of `data`.
    ///
    /// Input beyond [`cap`](Self::cap) bytes is silently ignored: the result
    /// equals the hash of the first `cap` bytes. Callers that must not lose
    /// data have to check the length themselves.
    pub fn hash(&self, data: &[u8]) -> ChunkAddress {
        if data.len() > self.cap {
            trace!(len = data.len(), cap = self.cap, "truncating oversized chunk");
        }
        let (data, _) = data.split_at(data.len().min(self.cap));

        ChunkAddress::new(self.hash_node(data, self.span))
    }

    /// A streaming writer producing the same root as [`hash`](Self::hash).
    pub fn writer(&self) -> ChunkWriter<D> {
        ChunkWriter::new(self.clone())
    }

    fn hash_node(&self, data: &[u8], mut span: usize) -> Node {
        if data.len() <= SECTION_SIZE {
            return digest_pair::<D>(data, &[]);
        }

        while span >= data.len() {
            span /= 2;
        }

        let (left, right) = data.split_at(span);
        if right.len() <= SEGMENT_SIZE {
            let left = self.hash_node(left, span);
            return digest_pair::<D>(&left, right);
        }

        let (left, right) = if self.parallel && data.len() > PARALLEL_THRESHOLD {
            rayon::join(
                || self.hash_node(left, span),
                || self.hash_node(right, span),
            )
        } else {
            (self.hash_node(left, span), self.hash_node(right, span))
        };

        digest_pair::<D>(&left, &right)
    }
}

/// Hash `left || right` with a fresh base hash instance.
#[inline]
fn digest_pair<D>(left: &[u8], right: &[u8]) -> Node
where
    D: Digest + OutputSizeUser<OutputSize = U32>,
{
    D::new().chain_update(left).chain_update(right).finalize().into()
}

impl<D> Default for BmtHasher<D>
where
    D: Digest + OutputSizeUser<OutputSize = U32>,
{
    fn default() -> Self {
        Self::with_valid_count(DEFAULT_SEGMENT_COUNT)
    }
}

impl<D> Clone for BmtHasher<D> {
    fn clone(&self) -> Self {
        Self {
            count: self.count,
            span: self.span,
            cap: self.cap,
            parallel: self.parallel,
            _marker: PhantomData,
        }
    }
}

impl<D> fmt::Debug for BmtHasher<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BmtHasher")
            .field("count", &self.count)
            .field("span", &self.span)
            .field("cap", &self.cap)
            .field("parallel", &self.parallel)
            .finish()
    }
}

/// Compute the address of a default-sized chunk with Keccak-256.
pub fn chunk_address(data: &[u8]) -> ChunkAddress {
    BmtHasher::<Keccak256>::default().hash(data)
}
