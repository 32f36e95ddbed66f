//! Bump-allocated arena with guard zones and release poisoning.

use std::collections::BTreeMap;

use log::{debug, warn};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{CHUNK_ALIGN, FREED_BYTE, GUARD_BYTE};
use crate::config::SandboxConfig;
use crate::error::{DemoError, DemoResult};

/// Identifier of a chunk. Ids start at 1 and are never reused.
pub type ChunkId = u64;

/// Liveness of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Live,
    Released,
}

/// Bookkeeping for one allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: ChunkId,
    /// Arena offset of the first data byte
    pub offset: usize,
    /// Requested size in bytes
    pub size: usize,
    /// Guard bytes following the data
    pub guard_size: usize,
    pub state: ChunkState,
}

impl Chunk {
    /// Offset one past the last data byte (start of the guard zone).
    pub fn end(&self) -> usize {
        self.offset + self.size
    }

    /// Offset one past the guard zone.
    pub fn guard_end(&self) -> usize {
        self.end() + self.guard_size
    }

    pub fn is_live(&self) -> bool {
        self.state == ChunkState::Live
    }
}

/// Fixed-size arena standing in for the process heap.
pub struct SandboxHeap {
    memory: Vec<u8>,
    chunks: BTreeMap<ChunkId, Chunk>,
    next_offset: usize,
    next_id: ChunkId,
    guard_size: usize,
}

impl SandboxHeap {
    /// Create an arena filled with reproducible garbage derived from `config.seed`.
    pub fn new(config: &SandboxConfig) -> Self {
        let mut memory = vec![0u8; config.heap_size];
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        rng.fill_bytes(&mut memory);

        debug!(
            "sandbox heap: {} bytes, guard {} bytes, seed {}",
            config.heap_size, config.guard_size, config.seed
        );

        Self {
            memory,
            chunks: BTreeMap::new(),
            next_offset: 0,
            next_id: 1,
            guard_size: config.guard_size,
        }
    }

    /// Total arena size.
    pub fn size(&self) -> usize {
        self.memory.len()
    }

    pub fn guard_size(&self) -> usize {
        self.guard_size
    }

    /// Bytes left after the bump pointer.
    pub fn available(&self) -> usize {
        self.memory.len().saturating_sub(align_up(self.next_offset))
    }

    /// Reserve `size` bytes followed by a guard zone.
    ///
    /// Data bytes are left as they are (uninitialized garbage).
    pub fn allocate(&mut self, size: usize) -> DemoResult<ChunkId> {
        let offset = align_up(self.next_offset);
        let available = self.available();
        let fits = size
            .checked_add(self.guard_size)
            .is_some_and(|needed| needed <= available);
        if !fits {
            return Err(DemoError::OutOfMemory {
                requested: size.saturating_add(self.guard_size),
                available,
            });
        }

        let id = self.next_id;
        self.next_id += 1;

        let chunk = Chunk {
            id,
            offset,
            size,
            guard_size: self.guard_size,
            state: ChunkState::Live,
        };
        self.memory[chunk.end()..chunk.guard_end()].fill(GUARD_BYTE);
        self.next_offset = chunk.guard_end();

        debug!("allocate #{}: {} bytes at offset {:#06x}", id, size, offset);
        self.chunks.insert(id, chunk);
        Ok(id)
    }

    /// Look up a chunk regardless of state.
    pub fn chunk(&self, id: ChunkId) -> DemoResult<&Chunk> {
        self.chunks.get(&id).ok_or(DemoError::InvalidHandle(id))
    }

    /// Look up a chunk, failing if it has been released.
    pub fn live_chunk(&self, id: ChunkId, operation: &'static str) -> DemoResult<&Chunk> {
        let chunk = self.chunk(id)?;
        if !chunk.is_live() {
            return Err(DemoError::UseAfterFree { id, operation });
        }
        Ok(chunk)
    }

    /// All chunks in allocation order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Arena offset of the first guard byte of `id` that no longer holds the guard pattern.
    pub fn guard_breach(&self, id: ChunkId) -> DemoResult<Option<usize>> {
        let chunk = self.chunk(id)?;
        let guard = &self.memory[chunk.end()..chunk.guard_end()];
        Ok(guard
            .iter()
            .position(|&b| b != GUARD_BYTE)
            .map(|i| chunk.end() + i))
    }

    /// Release a chunk and poison its data bytes.
    ///
    /// A second release of the same chunk is a use-after-free. A damaged
    /// guard zone is reported as [`DemoError::HeapCorruption`] after the
    /// chunk has been released.
    pub fn release(&mut self, id: ChunkId) -> DemoResult<()> {
        let (offset, end) = {
            let chunk = self.live_chunk(id, "release")?;
            (chunk.offset, chunk.end())
        };
        let breach = self.guard_breach(id)?;

        self.memory[offset..end].fill(FREED_BYTE);
        if let Some(chunk) = self.chunks.get_mut(&id) {
            chunk.state = ChunkState::Released;
        }
        debug!("release #{}", id);

        match breach {
            Some(at) => {
                warn!("guard zone of chunk #{} overwritten at offset {:#06x}", id, at);
                Err(DemoError::HeapCorruption { id, offset: at })
            }
            None => Ok(()),
        }
    }

    /// Read raw arena bytes. Only the arena bounds are enforced.
    pub fn read(&self, offset: usize, len: usize) -> DemoResult<&[u8]> {
        let end = self.check_range(offset, len)?;
        Ok(&self.memory[offset..end])
    }

    /// Write raw arena bytes. Only the arena bounds are enforced.
    ///
    /// Nothing is written when the range leaves the arena.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> DemoResult<()> {
        let end = self.check_range(offset, data.len())?;
        self.memory[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Bytes from `offset` up to (not including) the first NUL, bounded by the arena.
    pub fn read_c_str(&self, offset: usize) -> DemoResult<&[u8]> {
        let tail = self.read(offset, self.memory.len().saturating_sub(offset))?;
        let len = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        Ok(&tail[..len])
    }

    fn check_range(&self, offset: usize, len: usize) -> DemoResult<usize> {
        let heap_size = self.memory.len();
        match offset.checked_add(len) {
            Some(end) if end <= heap_size => Ok(end),
            _ => Err(DemoError::SandboxViolation {
                offset,
                len,
                heap_size,
            }),
        }
    }
}

fn align_up(offset: usize) -> usize {
    (offset + CHUNK_ALIGN - 1) & !(CHUNK_ALIGN - 1)
}
