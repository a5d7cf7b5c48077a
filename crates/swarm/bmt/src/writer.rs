//! Streaming front-end for the BMT hasher.

use std::{fmt, io};

use digest::{Digest, OutputSizeUser, typenum::U32};
use sha3::Keccak256;
use vertex_swarm_primitives::ChunkAddress;

use crate::BmtHasher;

/// Accumulates a chunk incrementally and hashes it on finalization.
///
/// The root is bit-identical to [`BmtHasher::hash`] over the concatenation of
/// everything written. Bytes beyond the hasher's cap are dropped, mirroring
/// the truncation of the whole-input form.
pub struct ChunkWriter<D = Keccak256> {
    hasher: BmtHasher<D>,
    buffer: Vec<u8>,
}

impl<D> ChunkWriter<D>
where
    D: Digest + OutputSizeUser<OutputSize = U32>,
{
    /// Create a writer hashing with `hasher`.
    pub fn new(hasher: BmtHasher<D>) -> Self {
        let buffer = Vec::with_capacity(hasher.cap());
        Self { hasher, buffer }
    }

    /// Append `data`, returning how many bytes fit under the cap.
    pub fn update(&mut self, data: &[u8]) -> usize {
        let len = data.len().min(self.remaining());
        let (accepted, _) = data.split_at(len);
        self.buffer.extend_from_slice(accepted);
        len
    }

    /// Bytes buffered so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been buffered yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Bytes that can still be written before the cap is reached.
    pub fn remaining(&self) -> usize {
        self.hasher.cap() - self.buffer.len()
    }

    /// Discard buffered data.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Hash the buffered data.
    pub fn finalize(self) -> ChunkAddress {
        self.hasher.hash(&self.buffer)
    }

    /// Hash the buffered data and reset the writer for reuse.
    pub fn finalize_reset(&mut self) -> ChunkAddress {
        let address = self.hasher.hash(&self.buffer);
        self.reset();
        address
    }
}

impl<D> Clone for ChunkWriter<D> {
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            buffer: self.buffer.clone(),
        }
    }
}

impl<D> fmt::Debug for ChunkWriter<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkWriter")
            .field("hasher", &self.hasher)
            .field("len", &self.buffer.len())
            .finish()
    }
}

impl<D> io::Write for ChunkWriter<D>
where
    D: Digest + OutputSizeUser<OutputSize = U32>,
{
    /// Returns `Ok(0)` once the chunk is full, so `write_all` past the cap
    /// fails with [`io::ErrorKind::WriteZero`].
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.update(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
