//! memlab - Sandboxed Memory-Safety Defect Demonstrations
//!
//! Main CLI entry point for running the overflow and use-after-free demos.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use memlab::buffer::OverflowMode;
use memlab::cell::CellMode;
use memlab::config::DemoConfig;
use memlab::demo::{
    run_overflow_scenario, run_use_after_free_demo, OverflowOptions, UseAfterFreeOptions,
};
use memlab::error::DemoResult;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "memlab")]
#[command(version)]
#[command(about = "Sandboxed buffer overflow and use-after-free demonstrations", long_about = None)]
struct Cli {
    /// Config file (default: memlab.toml in the current directory or a parent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for the simulated uninitialized memory
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Verbose logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both demonstrations with the configured settings
    All,

    /// Copy an input plus terminator into a fixed-capacity buffer
    Overflow {
        /// Input copied into the buffer (default: "hi")
        #[arg(short, long)]
        input: Option<String>,

        /// Declared buffer capacity (default: 5)
        #[arg(short, long)]
        capacity: Option<usize>,

        /// Copy behaviour
        #[arg(short, long, value_enum)]
        mode: Option<OverflowMode>,

        /// Print the sandbox heap map after the copy (faithful mode)
        #[arg(long)]
        show_heap: bool,
    },

    /// Read an integer cell after releasing it
    UseAfterFree {
        /// Access checking
        #[arg(short, long, value_enum)]
        mode: Option<CellMode>,

        /// Value written before release (default: 42)
        #[arg(long)]
        value: Option<i32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(seed) = cli.seed {
        config.sandbox.seed = seed;
    }

    match cli.command {
        Commands::All => cmd_all(&config),
        Commands::Overflow {
            input,
            capacity,
            mode,
            show_heap,
        } => {
            if let Some(input) = input {
                config.overflow.input = input;
            }
            if let Some(capacity) = capacity {
                config.overflow.capacity = capacity;
            }
            if let Some(mode) = mode {
                config.overflow.mode = mode;
            }
            config.validate().context("Invalid overflow settings")?;
            cmd_overflow(&config, show_heap)
        }
        Commands::UseAfterFree { mode, value } => {
            if let Some(mode) = mode {
                config.use_after_free.mode = mode;
            }
            if let Some(value) = value {
                config.use_after_free.value = value;
            }
            cmd_use_after_free(&config)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(path: Option<&PathBuf>) -> Result<DemoConfig> {
    match path {
        Some(path) => DemoConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => DemoConfig::load_from_cwd().context("Failed to load memlab.toml"),
    }
}

fn cmd_all(config: &DemoConfig) -> Result<()> {
    cmd_overflow(config, false)?;
    println!();
    cmd_use_after_free(config)
}

fn cmd_overflow(config: &DemoConfig, show_heap: bool) -> Result<()> {
    let options = OverflowOptions::from_config(config);
    let mut stdout = io::stdout().lock();

    let result = run_overflow_scenario(
        &mut stdout,
        config.overflow.input.as_bytes(),
        &options,
        show_heap,
    );
    if let Some(report) = blocked_or(&mut stdout, result)? {
        info!(
            "{} mode: wrote {} bytes, {} past capacity {}",
            report.mode, report.written, report.overflow, report.capacity
        );
    }
    stdout.flush()?;
    Ok(())
}

fn cmd_use_after_free(config: &DemoConfig) -> Result<()> {
    let options = UseAfterFreeOptions::from_config(config);
    let mut stdout = io::stdout().lock();

    let result = run_use_after_free_demo(&mut stdout, &options);
    if let Some(report) = blocked_or(&mut stdout, result)? {
        info!("read before free {}, after free {}", report.before, report.after);
    }
    stdout.flush()?;
    Ok(())
}

/// Report defects a safe mode stopped; pass everything else through.
fn blocked_or<W: Write, T>(out: &mut W, result: DemoResult<T>) -> Result<Option<T>> {
    match result {
        Ok(report) => Ok(Some(report)),
        Err(e) if e.is_prevented_defect() => {
            writeln!(out, "Blocked: {}", e)?;
            Ok(None)
        }
        Err(e) => Err(e).context("Demonstration failed"),
    }
}
