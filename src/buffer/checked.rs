//! Bounds-checked owned buffer.

use log::debug;

use super::{c_string, ByteBuffer, CopyReport, OverflowMode, TERMINATOR};
use crate::error::{DemoError, DemoResult};

/// Zero-initialized buffer that never writes past its capacity.
///
/// In strict mode an oversized copy fails; a growable buffer resizes instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckedBuffer {
    data: Vec<u8>,
    growable: bool,
}

impl CheckedBuffer {
    /// Create a strict buffer with the given capacity, filled with zeros
    pub fn new(capacity: usize) -> DemoResult<Self> {
        Ok(Self {
            data: zeroed(capacity)?,
            growable: false,
        })
    }

    /// Create a buffer that grows to fit oversized copies
    pub fn growable(capacity: usize) -> DemoResult<Self> {
        Ok(Self {
            data: zeroed(capacity)?,
            growable: true,
        })
    }

    /// Get the buffer as a slice
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return the underlying Vec
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl ByteBuffer for CheckedBuffer {
    fn mode(&self) -> OverflowMode {
        if self.growable {
            OverflowMode::Grow
        } else {
            OverflowMode::Strict
        }
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn copy_terminated(&mut self, src: &[u8]) -> DemoResult<CopyReport> {
        let needed = src.len() + 1;
        let mut grown_to = None;

        if needed > self.data.len() {
            if !self.growable {
                return Err(DemoError::CapacityExceeded {
                    requested: needed,
                    capacity: self.data.len(),
                });
            }
            debug!("growing buffer from {} to {} bytes", self.data.len(), needed);
            reserve(&mut self.data, needed)?;
            self.data.resize(needed, 0);
            grown_to = Some(needed);
        }

        self.data[..src.len()].copy_from_slice(src);
        self.data[src.len()] = TERMINATOR;

        Ok(CopyReport {
            written: needed,
            overflow: 0,
            grown_to,
        })
    }

    fn dump(&self, _requested: usize) -> DemoResult<Vec<u8>> {
        Ok(self.data.clone())
    }

    fn content(&self) -> DemoResult<String> {
        Ok(c_string(&self.data))
    }

    fn release(self: Box<Self>) -> DemoResult<()> {
        debug!("release checked buffer ({} bytes)", self.data.len());
        Ok(())
    }
}

/// Zero-filled allocation that reports failure instead of aborting.
fn zeroed(capacity: usize) -> DemoResult<Vec<u8>> {
    let mut data = Vec::new();
    reserve(&mut data, capacity)?;
    data.resize(capacity, 0);
    Ok(data)
}

fn reserve(data: &mut Vec<u8>, total: usize) -> DemoResult<()> {
    let additional = total.saturating_sub(data.len());
    data.try_reserve_exact(additional).map_err(|_| DemoError::OutOfMemory {
        requested: total,
        available: data.capacity(),
    })
}
