//! Integer cells with tracked liveness.
//!
//! A cell moves through `Uninitialized -> Written -> Released`. Handles are
//! plain ids, so a stale handle can still be presented after release; the
//! store checks the state tag on every access instead of trusting the caller.
//!
//! In [`CellMode::Checked`] any access after release fails with
//! [`DemoError::UseAfterFree`]. In [`CellMode::Faithful`] the stale read is
//! reproduced: it returns [`CellValue::IndeterminateRead`] carrying whatever
//! bytes the sandbox now holds, and never the old value. Releasing twice is
//! an error in both modes.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::SandboxConfig;
use crate::error::{DemoError, DemoResult};
use crate::sandbox::{ChunkId, SandboxHeap};

/// Size of a cell in the sandbox heap.
pub const CELL_SIZE: usize = std::mem::size_of::<i32>();

/// How accesses to released or unwritten cells are handled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CellMode {
    /// Reproduce stale reads as indeterminate values
    #[default]
    Faithful,
    /// Reject every access after release
    Checked,
}

impl fmt::Display for CellMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellMode::Faithful => write!(f, "faithful"),
            CellMode::Checked => write!(f, "checked"),
        }
    }
}

/// Handle to a cell in a [`CellStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellHandle(ChunkId);

impl CellHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Uninitialized,
    Written,
    Released,
}

/// Result of reading a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue {
    /// Value of a written, live cell
    Live(i32),
    /// Read of storage that holds no defined value
    IndeterminateRead { stale: [u8; CELL_SIZE] },
}

impl CellValue {
    /// The value, if it is defined.
    pub fn live(&self) -> Option<i32> {
        match self {
            CellValue::Live(v) => Some(*v),
            CellValue::IndeterminateRead { .. } => None,
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, CellValue::IndeterminateRead { .. })
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Live(v) => write!(f, "{}", v),
            CellValue::IndeterminateRead { stale } => write!(
                f,
                "<indeterminate> (stale bytes {})",
                crate::hexdump::format_dump(stale).trim_end()
            ),
        }
    }
}

/// Cells stored in a private sandbox heap.
pub struct CellStore {
    heap: SandboxHeap,
    states: BTreeMap<CellHandle, CellState>,
    mode: CellMode,
}

impl CellStore {
    pub fn new(mode: CellMode, sandbox: &SandboxConfig) -> Self {
        Self {
            heap: SandboxHeap::new(sandbox),
            states: BTreeMap::new(),
            mode,
        }
    }

    pub fn mode(&self) -> CellMode {
        self.mode
    }

    /// Allocate an uninitialized cell.
    pub fn allocate(&mut self) -> DemoResult<CellHandle> {
        let handle = CellHandle(self.heap.allocate(CELL_SIZE)?);
        self.states.insert(handle, CellState::Uninitialized);
        debug!("cell {} allocated", handle);
        Ok(handle)
    }

    /// Current state of a cell.
    pub fn state(&self, handle: CellHandle) -> DemoResult<CellState> {
        self.states
            .get(&handle)
            .copied()
            .ok_or(DemoError::InvalidHandle(handle.0))
    }

    /// Store `value` in the cell.
    ///
    /// A faithful write after release lands in the freed sandbox bytes.
    pub fn write(&mut self, handle: CellHandle, value: i32) -> DemoResult<()> {
        let state = self.state(handle)?;
        if state == CellState::Released {
            if self.mode == CellMode::Checked {
                return Err(DemoError::UseAfterFree {
                    id: handle.0,
                    operation: "write",
                });
            }
            warn!("simulated write to released cell {}", handle);
        }

        let offset = self.heap.chunk(handle.0)?.offset;
        self.heap.write(offset, &value.to_le_bytes())?;
        if state != CellState::Released {
            self.states.insert(handle, CellState::Written);
        }
        Ok(())
    }

    /// Read the cell.
    pub fn read(&self, handle: CellHandle) -> DemoResult<CellValue> {
        let state = self.state(handle)?;
        let offset = self.heap.chunk(handle.0)?.offset;
        let mut bytes = [0u8; CELL_SIZE];
        bytes.copy_from_slice(self.heap.read(offset, CELL_SIZE)?);

        match (state, self.mode) {
            (CellState::Written, _) => Ok(CellValue::Live(i32::from_le_bytes(bytes))),
            (CellState::Uninitialized, CellMode::Checked) => {
                Err(DemoError::UninitializedRead(handle.0))
            }
            (CellState::Released, CellMode::Checked) => Err(DemoError::UseAfterFree {
                id: handle.0,
                operation: "read",
            }),
            (CellState::Uninitialized, CellMode::Faithful) => {
                warn!("simulated read of uninitialized cell {}", handle);
                Ok(CellValue::IndeterminateRead { stale: bytes })
            }
            (CellState::Released, CellMode::Faithful) => {
                warn!("simulated read of released cell {}", handle);
                Ok(CellValue::IndeterminateRead { stale: bytes })
            }
        }
    }

    /// Release the cell. A second release fails with `UseAfterFree`.
    pub fn release(&mut self, handle: CellHandle) -> DemoResult<()> {
        if self.state(handle)? == CellState::Released {
            return Err(DemoError::UseAfterFree {
                id: handle.0,
                operation: "release",
            });
        }
        self.heap.release(handle.0)?;
        self.states.insert(handle, CellState::Released);
        debug!("cell {} released", handle);
        Ok(())
    }

    /// Number of cells not yet released.
    pub fn live_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| **s != CellState::Released)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::FREED_BYTE;

    fn store(mode: CellMode) -> CellStore {
        CellStore::new(mode, &SandboxConfig::default())
    }

    #[test]
    fn test_lifecycle() {
        let mut cells = store(CellMode::Checked);
        let h = cells.allocate().unwrap();
        assert_eq!(cells.state(h).unwrap(), CellState::Uninitialized);

        cells.write(h, 42).unwrap();
        assert_eq!(cells.state(h).unwrap(), CellState::Written);
        assert_eq!(cells.read(h).unwrap(), CellValue::Live(42));
        assert_eq!(cells.live_count(), 1);

        cells.release(h).unwrap();
        assert_eq!(cells.state(h).unwrap(), CellState::Released);
        assert_eq!(cells.live_count(), 0);
    }

    #[test]
    fn test_checked_rejects_access_after_release() {
        let mut cells = store(CellMode::Checked);
        let h = cells.allocate().unwrap();
        cells.write(h, 42).unwrap();
        cells.release(h).unwrap();

        assert!(matches!(
            cells.read(h),
            Err(DemoError::UseAfterFree {
                operation: "read",
                ..
            })
        ));
        assert!(matches!(
            cells.write(h, 7),
            Err(DemoError::UseAfterFree {
                operation: "write",
                ..
            })
        ));
    }

    #[test]
    fn test_faithful_stale_read_is_indeterminate() {
        let mut cells = store(CellMode::Faithful);
        let h = cells.allocate().unwrap();
        cells.write(h, 42).unwrap();
        cells.release(h).unwrap();

        let value = cells.read(h).unwrap();
        assert_eq!(
            value,
            CellValue::IndeterminateRead {
                stale: [FREED_BYTE; CELL_SIZE]
            }
        );
        assert_eq!(value.live(), None);
    }

    #[test]
    fn test_faithful_write_after_release_stays_indeterminate() {
        let mut cells = store(CellMode::Faithful);
        let h = cells.allocate().unwrap();
        cells.write(h, 42).unwrap();
        cells.release(h).unwrap();
        cells.write(h, 42).unwrap();

        assert_eq!(cells.state(h).unwrap(), CellState::Released);
        assert!(cells.read(h).unwrap().is_indeterminate());
    }

    #[test]
    fn test_double_release_fails_in_both_modes() {
        for mode in [CellMode::Checked, CellMode::Faithful] {
            let mut cells = store(mode);
            let h = cells.allocate().unwrap();
            cells.release(h).unwrap();
            assert!(matches!(
                cells.release(h),
                Err(DemoError::UseAfterFree {
                    operation: "release",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_uninitialized_read() {
        let mut cells = store(CellMode::Checked);
        let h = cells.allocate().unwrap();
        assert!(matches!(cells.read(h), Err(DemoError::UninitializedRead(_))));

        let mut cells = store(CellMode::Faithful);
        let h = cells.allocate().unwrap();
        assert!(cells.read(h).unwrap().is_indeterminate());
    }

    #[test]
    fn test_unknown_handle() {
        let mut cells = store(CellMode::Checked);
        let h = cells.allocate().unwrap();
        let other = store(CellMode::Checked);
        assert!(matches!(other.read(h), Err(DemoError::InvalidHandle(_))));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(CellValue::Live(42).to_string(), "42");
        let stale = CellValue::IndeterminateRead {
            stale: [0xDD; CELL_SIZE],
        };
        assert_eq!(
            stale.to_string(),
            "<indeterminate> (stale bytes DD DD DD DD)"
        );
    }
}
