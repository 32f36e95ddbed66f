//! Error taxonomy for the memory-safety demonstrations.
//!
//! Every defect the demos reproduce is reported as one of these recoverable
//! conditions. None of them abort the host process.

use thiserror::Error;

/// Errors raised by the sandbox heap, buffers, cells and demo runners.
#[derive(Debug, Error)]
pub enum DemoError {
    /// A bounds-checked copy would exceed the destination capacity.
    #[error("copy of {requested} bytes exceeds buffer capacity of {capacity} bytes")]
    CapacityExceeded { requested: usize, capacity: usize },

    /// Access to storage after it was released (includes double release).
    #[error("use after free: {operation} on released allocation #{id}")]
    UseAfterFree { id: u64, operation: &'static str },

    /// Read of a cell that was never written.
    #[error("read of uninitialized cell #{0}")]
    UninitializedRead(u64),

    /// Handle that was never issued by the store.
    #[error("invalid handle #{0}")]
    InvalidHandle(u64),

    /// Simulated access that would leave the sandbox arena.
    #[error("sandbox violation: offset {offset} + len {len} > heap size {heap_size}")]
    SandboxViolation {
        offset: usize,
        len: usize,
        heap_size: usize,
    },

    /// Guard zone after a chunk was overwritten, detected on release.
    #[error("heap corruption: guard zone of chunk #{id} overwritten at offset {offset}")]
    HeapCorruption { id: u64, offset: usize },

    /// Sandbox arena has no room for the requested allocation.
    #[error("out of sandbox memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },

    /// Writing to the output sink failed.
    #[error("output sink error: {0}")]
    Io(#[from] std::io::Error),
}

impl DemoError {
    /// True for the defects a safe mode exists to stop.
    ///
    /// The CLI reports these as blocked rather than as failures.
    pub fn is_prevented_defect(&self) -> bool {
        matches!(
            self,
            DemoError::CapacityExceeded { .. }
                | DemoError::UseAfterFree { .. }
                | DemoError::UninitializedRead(_)
        )
    }
}

/// Result type for demo operations.
pub type DemoResult<T> = Result<T, DemoError>;
