//! Ordered collection of audio chunks for one synthesis attempt.

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};

/// Collects audio payloads in arrival order.
///
/// Append-only: chunks are never removed, reordered or deduplicated.
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    chunks: Vec<Bytes>,
    total: usize,
}

impl ChunkAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk.
    pub fn append(&mut self, chunk: Bytes) {
        self.total += chunk.len();
        self.chunks.push(chunk);
    }

    /// Sum of the lengths of all appended chunks.
    pub fn total_length(&self) -> usize {
        self.total
    }

    /// Number of appended chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if nothing was appended.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Concatenates all chunks into one buffer.
    ///
    /// Zero bytes is a failure, not an empty success.
    pub fn finalize(self) -> Result<Bytes> {
        if self.total == 0 {
            return Err(Error::EmptyResult);
        }

        let mut buf = BytesMut::with_capacity(self.total);
        for chunk in &self.chunks {
            buf.extend_from_slice(chunk);
        }
        Ok(buf.freeze())
    }
}
