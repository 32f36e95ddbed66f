//! memlab - Sandboxed Memory-Safety Defect Demonstrations
//!
//! Reproduces two classic memory-safety bugs without ever performing an
//! unsafe access on the host process:
//!
//! - **Buffer overflow**: an unchecked copy of an oversized input into a
//!   fixed 5-byte buffer, with before/after hex dumps
//! - **Use-after-free**: a cell written with 42, released, then read again
//!
//! # Modes
//!
//! Every demo runs either *faithfully* (the defect happens, but inside a
//! private [`SandboxHeap`]) or *safely* (the defect is refused):
//!
//! | Demo | Faithful | Safe |
//! |------|----------|------|
//! | Overflow | bytes spill into the guard zone, detected on release | `CapacityExceeded`, or the buffer grows |
//! | Use-after-free | stale read yields `IndeterminateRead` | `UseAfterFree` |
//!
//! # Example
//!
//! ```rust
//! use memlab::buffer::OverflowMode;
//! use memlab::demo::{run_overflow_scenario, OverflowOptions};
//!
//! let mut out = Vec::new();
//! let options = OverflowOptions::default().with_mode(OverflowMode::Strict);
//! let report = run_overflow_scenario(&mut out, b"hi", &options, false).unwrap();
//!
//! assert_eq!(report.content, "hi");
//! assert!(String::from_utf8(out).unwrap().contains("After overflow:  68 69 00 00 00"));
//! ```

#![warn(clippy::all)]

pub mod buffer;
pub mod cell;
pub mod config;
pub mod demo;
pub mod error;
pub mod hexdump;
pub mod sandbox;

// Re-export commonly used types
pub use buffer::{allocate_buffer, ByteBuffer, CheckedBuffer, OverflowMode, SimulatedBuffer};
pub use cell::{CellHandle, CellMode, CellState, CellStore, CellValue};
pub use config::{ConfigError, DemoConfig};
pub use demo::{
    run_overflow_demo, run_overflow_scenario, run_use_after_free_demo, OverflowOptions,
    OverflowReport, UseAfterFreeOptions, UseAfterFreeReport,
};
pub use error::{DemoError, DemoResult};
pub use sandbox::SandboxHeap;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
