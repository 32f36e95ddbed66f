//! Sandbox heap
//!
//! Every bug-reproducing ("faithful") code path in this crate operates on a
//! [`SandboxHeap`]: a fixed-size arena owned by the demo, never on host
//! memory. Overflows spill into guard zones and neighbouring arena bytes,
//! stale reads see poisoned bytes, and anything that would leave the arena is
//! refused with [`DemoError::SandboxViolation`](crate::DemoError).
//!
//! # Layout
//!
//! ```text
//! offset 0                                                   heap_size
//! ┌────────────┬───────┬──┬────────────┬───────┬──┬──────────────────┐
//! │ chunk #1   │ guard │  │ chunk #2   │ guard │  │ unallocated      │
//! │ (garbage)  │ FD FD │  │            │ FD FD │  │ (garbage)        │
//! └────────────┴───────┴──┴────────────┴───────┴──┴──────────────────┘
//!                        ^ alignment padding
//! ```

pub mod heap;

pub use heap::{Chunk, ChunkId, ChunkState, SandboxHeap};

/// Default arena size in bytes.
pub const DEFAULT_HEAP_SIZE: usize = 4096;

/// Largest arena a config may ask for (16 MiB).
pub const MAX_HEAP_SIZE: usize = 16 * 1024 * 1024;

/// Default guard zone size placed after every chunk.
pub const DEFAULT_GUARD_SIZE: usize = 8;

/// Chunk start alignment.
pub const CHUNK_ALIGN: usize = 8;

/// Fill byte for guard zones.
pub const GUARD_BYTE: u8 = 0xFD;

/// Fill byte written over released chunks.
pub const FREED_BYTE: u8 = 0xDD;

/// Default seed for the uninitialized-memory generator.
pub const DEFAULT_SEED: u64 = 42;
