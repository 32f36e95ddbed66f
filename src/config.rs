//! memlab configuration
//!
//! Handles parsing of `memlab.toml`. Every field has a default matching the
//! classic demonstrations (input `"hi"`, a 5-byte buffer, the value 42), so a
//! missing file is not an error when searching from a directory.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::buffer::OverflowMode;
use crate::cell::{CellMode, CELL_SIZE};
use crate::sandbox::{DEFAULT_GUARD_SIZE, DEFAULT_HEAP_SIZE, DEFAULT_SEED, MAX_HEAP_SIZE};

/// Name of the configuration file looked up by [`DemoConfig::find_and_load`].
pub const CONFIG_FILE_NAME: &str = "memlab.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching memlab.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DemoConfig {
    /// Buffer overflow demonstration
    #[serde(default)]
    pub overflow: OverflowConfig,

    /// Use-after-free demonstration
    #[serde(default)]
    pub use_after_free: UseAfterFreeConfig,

    /// Sandbox heap used by faithful modes
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

impl DemoConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: DemoConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                // Reached root without finding config
                return Ok(Self::default());
            }
        }
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// Reject settings no demonstration can run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.overflow.capacity == 0 {
            return Err(ConfigError::Invalid(
                "overflow.capacity must be at least 1".to_string(),
            ));
        }
        if self.sandbox.heap_size == 0 {
            return Err(ConfigError::Invalid(
                "sandbox.heap_size must be at least 1".to_string(),
            ));
        }
        if self.sandbox.heap_size > MAX_HEAP_SIZE {
            return Err(ConfigError::Invalid(format!(
                "sandbox.heap_size must be at most {}",
                MAX_HEAP_SIZE
            )));
        }
        // Each demo allocates one chunk (buffer or cell) in its own heap
        let largest = self.overflow.capacity.max(CELL_SIZE);
        let fits = largest
            .checked_add(self.sandbox.guard_size)
            .is_some_and(|needed| needed <= self.sandbox.heap_size);
        if !fits {
            return Err(ConfigError::Invalid(format!(
                "chunk of {} bytes plus guard {} does not fit in sandbox.heap_size {}",
                largest, self.sandbox.guard_size, self.sandbox.heap_size
            )));
        }
        Ok(())
    }
}

/// Settings for the overflow demonstration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverflowConfig {
    /// Bytes copied into the buffer
    #[serde(default = "default_input")]
    pub input: String,

    /// Declared buffer capacity
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default)]
    pub mode: OverflowMode,
}

fn default_input() -> String {
    "hi".to_string()
}

fn default_capacity() -> usize {
    5
}

impl Default for OverflowConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            capacity: default_capacity(),
            mode: OverflowMode::default(),
        }
    }
}

/// Settings for the use-after-free demonstration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UseAfterFreeConfig {
    /// Value written into the cell
    #[serde(default = "default_value")]
    pub value: i32,

    #[serde(default)]
    pub mode: CellMode,
}

fn default_value() -> i32 {
    42
}

impl Default for UseAfterFreeConfig {
    fn default() -> Self {
        Self {
            value: default_value(),
            mode: CellMode::default(),
        }
    }
}

/// Sandbox heap settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Arena size in bytes
    #[serde(default = "default_heap_size")]
    pub heap_size: usize,

    /// Guard bytes after each chunk
    #[serde(default = "default_guard_size")]
    pub guard_size: usize,

    /// Seed for the uninitialized-memory pattern
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_heap_size() -> usize {
    DEFAULT_HEAP_SIZE
}

fn default_guard_size() -> usize {
    DEFAULT_GUARD_SIZE
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            heap_size: default_heap_size(),
            guard_size: default_guard_size(),
            seed: default_seed(),
        }
    }
}
