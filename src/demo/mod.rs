//! Demonstration runners
//!
//! Each runner writes its transcript to any [`std::io::Write`] sink and
//! returns a report, so the CLI prints to stdout while tests capture a
//! `Vec<u8>`.

pub mod overflow;
pub mod use_after_free;

pub use overflow::{
    describe_sandbox, run_overflow_demo, run_overflow_scenario, OverflowOptions, OverflowReport,
    OverflowRun,
};
pub use use_after_free::{run_use_after_free_demo, UseAfterFreeOptions, UseAfterFreeReport};
