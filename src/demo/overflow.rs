//! Buffer overflow demonstration.
//!
//! Copies a caller-supplied input plus a terminator into a fixed-capacity
//! buffer and dumps the buffer before and after. Both dumps are sized by the
//! input length, not the capacity, so in faithful mode a long input shows
//! the over-read as well as the overflow.

use std::io::Write;

use log::info;

use crate::buffer::{allocate_buffer, ByteBuffer, CopyReport, OverflowMode};
use crate::config::{DemoConfig, SandboxConfig};
use crate::error::{DemoError, DemoResult};
use crate::hexdump::{format_rows, write_dump};

/// Settings for one overflow run.
#[derive(Debug, Clone, PartialEq)]
pub struct OverflowOptions {
    pub capacity: usize,
    pub mode: OverflowMode,
    pub sandbox: SandboxConfig,
}

impl OverflowOptions {
    pub fn from_config(config: &DemoConfig) -> Self {
        Self {
            capacity: config.overflow.capacity,
            mode: config.overflow.mode,
            sandbox: config.sandbox,
        }
    }

    pub fn with_mode(mut self, mode: OverflowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for OverflowOptions {
    fn default() -> Self {
        Self::from_config(&DemoConfig::default())
    }
}

/// The buffer handed back by [`run_overflow_demo`] and what the copy did.
pub struct OverflowRun {
    pub buffer: Box<dyn ByteBuffer>,
    pub copy: CopyReport,
}

/// Summary of a full [`run_overflow_scenario`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowReport {
    pub mode: OverflowMode,
    /// Capacity at release time
    pub capacity: usize,
    pub written: usize,
    /// Bytes written past the declared capacity
    pub overflow: usize,
    /// Buffer read back as a string
    pub content: String,
    /// Arena offset of the damaged guard byte, if release found one
    pub corruption_at: Option<usize>,
}

/// Allocate, dump, copy, dump. Ownership of the buffer goes to the caller.
///
/// Writes the `Before overflow:` and `After overflow:` lines. In strict mode
/// an oversized input fails with [`DemoError::CapacityExceeded`] after the
/// first line and the buffer is dropped.
pub fn run_overflow_demo<W: Write>(
    out: &mut W,
    input: &[u8],
    options: &OverflowOptions,
) -> DemoResult<OverflowRun> {
    let mut buffer = allocate_buffer(options.mode, options.capacity, &options.sandbox)?;
    let input_length = input.len();
    info!(
        "overflow demo: {} input bytes, capacity {}, {} mode",
        input_length, options.capacity, options.mode
    );

    write_dump(out, "Before overflow: ", &buffer.dump(input_length)?)?;

    let copy = buffer.copy_terminated(input)?;

    write_dump(out, "After overflow:  ", &buffer.dump(input_length)?)?;

    Ok(OverflowRun { buffer, copy })
}

/// Run the demo, print the buffer content, then release the buffer.
///
/// Heap corruption found on release is reported on the sink and in the
/// returned report rather than as an error.
pub fn run_overflow_scenario<W: Write>(
    out: &mut W,
    input: &[u8],
    options: &OverflowOptions,
    show_heap: bool,
) -> DemoResult<OverflowReport> {
    let OverflowRun { buffer, copy } = run_overflow_demo(out, input, options)?;

    if show_heap {
        if let Some(map) = describe_sandbox(&*buffer)? {
            out.write_all(map.as_bytes())?;
        }
    }

    let content = buffer.content()?;
    writeln!(out, "Buffer content: {}", content)?;

    let mode = buffer.mode();
    let capacity = buffer.capacity();
    let corruption_at = match buffer.release() {
        Ok(()) => None,
        Err(DemoError::HeapCorruption { offset, .. }) => {
            writeln!(
                out,
                "Release detected heap corruption at offset {:#06X}",
                offset
            )?;
            Some(offset)
        }
        Err(e) => return Err(e),
    };

    Ok(OverflowReport {
        mode,
        capacity,
        written: copy.written,
        overflow: copy.overflow,
        content,
        corruption_at,
    })
}

/// Chunk map and raw bytes of the sandbox behind a faithful buffer.
///
/// Returns `None` for buffers that do not live in a sandbox heap.
pub fn describe_sandbox(buffer: &dyn ByteBuffer) -> DemoResult<Option<String>> {
    let (heap, id) = match buffer.sandbox() {
        Some(sandbox) => sandbox,
        None => return Ok(None),
    };

    let mut text = format!(
        "Sandbox heap: {} bytes, {} available\n",
        heap.size(),
        heap.available()
    );
    for chunk in heap.chunks() {
        let guard = match heap.guard_breach(chunk.id)? {
            Some(at) => format!("guard breached at {:#06X}", at),
            None => "guard intact".to_string(),
        };
        text.push_str(&format!(
            "  chunk #{} offset {:#06X} size {} guard {} {:?} ({})\n",
            chunk.id, chunk.offset, chunk.size, chunk.guard_size, chunk.state, guard
        ));
    }

    let chunk = heap.chunk(id)?;
    let bytes = heap.read(chunk.offset, chunk.guard_end() - chunk.offset)?;
    text.push_str(&format_rows(chunk.offset, bytes));
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_strict_hi() {
        let mut out = Vec::new();
        let options = OverflowOptions::default().with_mode(OverflowMode::Strict);
        let report = run_overflow_scenario(&mut out, b"hi", &options, false).unwrap();

        assert_eq!(
            output(out),
            "Before overflow: 00 00 00 00 00\n\
             After overflow:  68 69 00 00 00\n\
             Buffer content: hi\n"
        );
        assert_eq!(report.content, "hi");
        assert_eq!(report.corruption_at, None);
    }

    #[test]
    fn test_strict_oversized_stops_after_first_dump() {
        let mut out = Vec::new();
        let options = OverflowOptions::default().with_mode(OverflowMode::Strict);
        let err = run_overflow_demo(&mut out, b"hello", &options).err().unwrap();

        assert!(matches!(
            err,
            DemoError::CapacityExceeded {
                requested: 6,
                capacity: 5
            }
        ));
        assert_eq!(output(out), "Before overflow: 00 00 00 00 00\n");
    }

    #[test]
    fn test_faithful_hi_matches_input() {
        let mut out = Vec::new();
        let report =
            run_overflow_scenario(&mut out, b"hi", &OverflowOptions::default(), false).unwrap();
        let text = output(out);

        assert!(text.contains("After overflow:  68 69\n"));
        assert!(text.ends_with("Buffer content: hi\n"));
        assert_eq!(report.overflow, 0);
        assert_eq!(report.corruption_at, None);
    }

    #[test]
    fn test_describe_sandbox() {
        let mut out: Vec<u8> = Vec::new();
        let run = run_overflow_demo(&mut out, b"AAAAAAAA", &OverflowOptions::default()).unwrap();
        let map = describe_sandbox(&*run.buffer).unwrap().unwrap();

        assert!(map.contains("chunk #1 offset 0x0000 size 5 guard 8 Live"));
        assert!(map.contains("guard breached at 0x0005"));
        assert!(map.contains("00000000  41 41 41 41 41 41 41 41 00 FD FD FD FD"));

        let strict = OverflowOptions::default().with_mode(OverflowMode::Strict);
        let mut sink: Vec<u8> = Vec::new();
        let run = run_overflow_demo(&mut sink, b"hi", &strict).unwrap();
        assert!(describe_sandbox(&*run.buffer).unwrap().is_none());
    }
}
