//! Use-after-free demonstration.

use std::io::Write;

use log::info;

use crate::cell::{CellMode, CellStore, CellValue};
use crate::config::{DemoConfig, SandboxConfig};
use crate::error::DemoResult;

/// Settings for one use-after-free run.
#[derive(Debug, Clone, PartialEq)]
pub struct UseAfterFreeOptions {
    /// Value written before release
    pub value: i32,
    pub mode: CellMode,
    pub sandbox: SandboxConfig,
}

impl UseAfterFreeOptions {
    pub fn from_config(config: &DemoConfig) -> Self {
        Self {
            value: config.use_after_free.value,
            mode: config.use_after_free.mode,
            sandbox: config.sandbox,
        }
    }

    pub fn with_mode(mut self, mode: CellMode) -> Self {
        self.mode = mode;
        self
    }
}

impl Default for UseAfterFreeOptions {
    fn default() -> Self {
        Self::from_config(&DemoConfig::default())
    }
}

/// The two reads the demo performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UseAfterFreeReport {
    pub before: CellValue,
    pub after: CellValue,
}

/// Write a cell, read it, release it, read it again.
///
/// In checked mode the final read fails with `UseAfterFree`; the failure is
/// printed on the `Value after free:` line and then returned.
pub fn run_use_after_free_demo<W: Write>(
    out: &mut W,
    options: &UseAfterFreeOptions,
) -> DemoResult<UseAfterFreeReport> {
    info!("use-after-free demo: {} mode", options.mode);
    let mut cells = CellStore::new(options.mode, &options.sandbox);

    let cell = cells.allocate()?;
    cells.write(cell, options.value)?;
    writeln!(
        out,
        "Manually declared and initialized int pointer with value {}",
        options.value
    )?;

    let before = cells.read(cell)?;
    writeln!(out, "Value before free: {}", before)?;

    writeln!(out, "Freeing memory...")?;
    cells.release(cell)?;
    writeln!(out, "Memory freed.")?;

    let after = match cells.read(cell) {
        Ok(value) => value,
        Err(e) => {
            writeln!(out, "Value after free: <blocked: {}>", e)?;
            return Err(e);
        }
    };
    writeln!(out, "Value after free: {}", after)?;

    Ok(UseAfterFreeReport { before, after })
}
