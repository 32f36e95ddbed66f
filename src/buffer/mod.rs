//! Fixed-capacity byte buffers
//!
//! Two implementations sit behind the [`ByteBuffer`] trait:
//!
//! | Mode | Type | Oversized copy |
//! |------|------|----------------|
//! | `faithful` | [`SimulatedBuffer`] | written past capacity inside the sandbox heap |
//! | `strict` | [`CheckedBuffer`] | rejected with `CapacityExceeded`, nothing written |
//! | `grow` | [`CheckedBuffer`] | region grows to fit |
//!
//! Callers pick a mode with [`allocate_buffer`] and drive every buffer the
//! same way, which is what lets the overflow demo run unchanged in all three.

pub mod checked;
pub mod simulated;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use checked::CheckedBuffer;
pub use simulated::SimulatedBuffer;

use crate::config::SandboxConfig;
use crate::error::DemoResult;
use crate::sandbox::{ChunkId, SandboxHeap};

/// Terminator appended by [`ByteBuffer::copy_terminated`].
pub const TERMINATOR: u8 = 0;

/// How a buffer treats a copy larger than its capacity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OverflowMode {
    /// Reproduce the unchecked copy inside the sandbox heap
    #[default]
    Faithful,
    /// Reject oversized copies
    Strict,
    /// Grow the buffer to fit
    Grow,
}

impl OverflowMode {
    /// True when the mode enforces the capacity invariant.
    pub fn is_safe(&self) -> bool {
        !matches!(self, OverflowMode::Faithful)
    }
}

impl fmt::Display for OverflowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowMode::Faithful => write!(f, "faithful"),
            OverflowMode::Strict => write!(f, "strict"),
            OverflowMode::Grow => write!(f, "grow"),
        }
    }
}

/// Outcome of a terminated copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyReport {
    /// Bytes written, terminator included
    pub written: usize,
    /// Bytes that landed past the declared capacity
    pub overflow: usize,
    /// New capacity when the buffer grew
    pub grown_to: Option<usize>,
}

/// Common interface of every demo buffer.
pub trait ByteBuffer {
    fn mode(&self) -> OverflowMode;

    /// Current capacity (the declared size unless the buffer grew).
    fn capacity(&self) -> usize;

    /// Copy `src` followed by [`TERMINATOR`] to the start of the buffer.
    fn copy_terminated(&mut self, src: &[u8]) -> DemoResult<CopyReport>;

    /// Bytes rendered by a dump the caller sized at `requested`.
    ///
    /// Checked buffers always return exactly their logical contents;
    /// simulated buffers return `requested` bytes, over-reading if asked to.
    fn dump(&self, requested: usize) -> DemoResult<Vec<u8>>;

    /// Contents up to the first terminator, read the way `%s` would.
    fn content(&self) -> DemoResult<String>;

    /// Give the storage back. Consumes the buffer, so it cannot be touched again.
    fn release(self: Box<Self>) -> DemoResult<()>;

    /// Backing sandbox heap and chunk, for buffers that live in one.
    fn sandbox(&self) -> Option<(&SandboxHeap, ChunkId)> {
        None
    }
}

/// Allocate a buffer of `capacity` bytes behaving according to `mode`.
pub fn allocate_buffer(
    mode: OverflowMode,
    capacity: usize,
    sandbox: &SandboxConfig,
) -> DemoResult<Box<dyn ByteBuffer>> {
    match mode {
        OverflowMode::Faithful => Ok(Box::new(SimulatedBuffer::new(capacity, sandbox)?)),
        OverflowMode::Strict => Ok(Box::new(CheckedBuffer::new(capacity)?)),
        OverflowMode::Grow => Ok(Box::new(CheckedBuffer::growable(capacity)?)),
    }
}

/// Interpret bytes up to the first terminator as lossy UTF-8.
pub(crate) fn c_string(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .position(|&b| b == TERMINATOR)
        .unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
