//! Constants used in the Binary Merkle Tree implementation.

use vertex_swarm_primitives::ADDRESS_SIZE;

/// Output size of the base hash in bytes (H). The root is an address, so it
/// matches the address size.
pub const HASH_SIZE: usize = ADDRESS_SIZE;

/// Size of a segment, the BMT leaf granularity (same as hash size)
pub const SEGMENT_SIZE: usize = HASH_SIZE;

/// The length of a section (two segments), the largest input hashed as a leaf
pub const SECTION_SIZE: usize = 2 * SEGMENT_SIZE;

/// Default number of segments in a chunk
pub const DEFAULT_SEGMENT_COUNT: usize = 128;

/// Default chunk capacity (4096 bytes)
pub const DEFAULT_CHUNK_SIZE: usize = DEFAULT_SEGMENT_COUNT * SEGMENT_SIZE;

/// Largest accepted segment count (a 512 MiB chunk)
pub const MAX_SEGMENT_COUNT: usize = 1 << 24;

/// Subtrees covering at most this many bytes are hashed on the calling
/// thread instead of being split across the rayon pool.
pub const PARALLEL_THRESHOLD: usize = 8 * SECTION_SIZE;

/// The span for a given segment count.
///
/// Let `c` be the smallest power of two `>= count` (at least 2). The span is
/// `c / 2` segments when `c > 2`, otherwise 2 segments.
pub const fn span_for(count: usize) -> usize {
    let mut c = 2;
    while c < count {
        c *= 2;
    }
    if c > 2 {
        c /= 2;
    }
    c * SEGMENT_SIZE
}
