//! Buffer that reproduces an unchecked copy inside a private sandbox heap.

use log::{debug, warn};

use super::{c_string, ByteBuffer, CopyReport, OverflowMode, TERMINATOR};
use crate::config::SandboxConfig;
use crate::error::DemoResult;
use crate::sandbox::{ChunkId, SandboxHeap};

/// A chunk of `capacity` bytes in its own [`SandboxHeap`].
///
/// Copies and dumps only respect the arena bounds, so an oversized copy
/// spills into the guard zone exactly as a heap overflow would, and the
/// damage is reported when the buffer is released.
pub struct SimulatedBuffer {
    heap: SandboxHeap,
    chunk: ChunkId,
    offset: usize,
    capacity: usize,
}

impl SimulatedBuffer {
    pub fn new(capacity: usize, sandbox: &SandboxConfig) -> DemoResult<Self> {
        let mut heap = SandboxHeap::new(sandbox);
        let chunk = heap.allocate(capacity)?;
        let offset = heap.chunk(chunk)?.offset;
        Ok(Self {
            heap,
            chunk,
            offset,
            capacity,
        })
    }

    /// Arena offset of the first buffer byte.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl ByteBuffer for SimulatedBuffer {
    fn mode(&self) -> OverflowMode {
        OverflowMode::Faithful
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn copy_terminated(&mut self, src: &[u8]) -> DemoResult<CopyReport> {
        let mut bytes = Vec::with_capacity(src.len() + 1);
        bytes.extend_from_slice(src);
        bytes.push(TERMINATOR);

        let overflow = bytes.len().saturating_sub(self.capacity);
        if overflow > 0 {
            warn!(
                "simulated overflow: writing {} bytes into a {}-byte buffer ({} past the end)",
                bytes.len(),
                self.capacity,
                overflow
            );
        }

        self.heap.write(self.offset, &bytes)?;
        debug!("unchecked copy of {} bytes at {:#06x}", bytes.len(), self.offset);

        Ok(CopyReport {
            written: bytes.len(),
            overflow,
            grown_to: None,
        })
    }

    fn dump(&self, requested: usize) -> DemoResult<Vec<u8>> {
        if requested > self.capacity {
            warn!(
                "simulated over-read: dumping {} bytes of a {}-byte buffer",
                requested, self.capacity
            );
        }
        Ok(self.heap.read(self.offset, requested)?.to_vec())
    }

    fn content(&self) -> DemoResult<String> {
        Ok(c_string(self.heap.read_c_str(self.offset)?))
    }

    fn release(self: Box<Self>) -> DemoResult<()> {
        let SimulatedBuffer {
            mut heap, chunk, ..
        } = *self;
        heap.release(chunk)
    }

    fn sandbox(&self) -> Option<(&SandboxHeap, ChunkId)> {
        Some((&self.heap, self.chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DemoError;
    use crate::sandbox::GUARD_BYTE;

    fn buffer(capacity: usize) -> SimulatedBuffer {
        SimulatedBuffer::new(capacity, &SandboxConfig::default()).unwrap()
    }

    #[test]
    fn test_fitting_copy_leaves_guard_intact() {
        let mut buf = buffer(5);
        let report = buf.copy_terminated(b"hi").unwrap();
        assert_eq!(report.overflow, 0);
        assert_eq!(buf.dump(3).unwrap(), b"hi\0");
        assert_eq!(buf.content().unwrap(), "hi");
        Box::new(buf).release().unwrap();
    }

    #[test]
    fn test_before_dump_over_reads_into_guard() {
        let buf = buffer(5);
        let dump = buf.dump(10).unwrap();
        assert_eq!(dump.len(), 10);
        assert_eq!(&dump[5..10], &[GUARD_BYTE; 5]);
    }

    #[test]
    fn test_overflow_spills_and_is_detected_on_release() {
        let mut buf = buffer(5);
        let report = buf.copy_terminated(b"AAAAAAAAAA").unwrap();
        assert_eq!(report.written, 11);
        assert_eq!(report.overflow, 6);
        assert_eq!(buf.dump(10).unwrap(), b"AAAAAAAAAA");
        assert_eq!(buf.content().unwrap(), "AAAAAAAAAA");

        let err = Box::new(buf).release().unwrap_err();
        assert!(matches!(err, DemoError::HeapCorruption { offset: 5, .. }));
    }

    #[test]
    fn test_copy_leaving_sandbox_is_refused() {
        let sandbox = SandboxConfig {
            heap_size: 16,
            guard_size: 8,
            seed: 1,
        };
        let mut buf = SimulatedBuffer::new(5, &sandbox).unwrap();
        let before = buf.dump(16).unwrap();

        let err = buf.copy_terminated(&[b'B'; 20]).unwrap_err();
        assert!(matches!(err, DemoError::SandboxViolation { .. }));
        assert_eq!(buf.dump(16).unwrap(), before);
    }
}
