use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// webcil - convert .NET assemblies to and from Webcil and its WebAssembly wrapper
#[derive(Debug, Parser)]
#[command(name = "webcil", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Conversion direction for `batch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BatchDirection {
    /// PE assemblies (.dll/.exe) to Webcil.
    ToWebcil,
    /// Webcil (.wasm/.webcil) to PE assemblies.
    FromWebcil,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert a PE assembly into Webcil, wrapped in a WebAssembly module by default.
    ToWebcil {
        /// Path to the .NET assembly file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Output file (default: input with .wasm or .webcil extension).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Write the bare Webcil payload without the WebAssembly wrapper.
        #[arg(long)]
        no_wasm: bool,
    },

    /// Reconstruct a PE assembly from a Webcil file (wrapped or bare, detected).
    FromWebcil {
        /// Path to the .wasm or .webcil file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Output file (default: input with .dll extension).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Fixed PE timestamp (hex like 0x5f000000 or decimal) for reproducible output.
        #[arg(long, value_name = "SECONDS")]
        timestamp: Option<String>,
    },

    /// Display container format, CLI header and metadata streams of any supported file.
    Info {
        /// Path to a PE assembly, Webcil payload or WebAssembly module.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Convert many files in parallel.
    Batch {
        /// Conversion direction.
        #[arg(value_enum)]
        direction: BatchDirection,

        /// Files or directories (scanned recursively for matching extensions).
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Directory for the converted files (default: next to each input).
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Write bare Webcil for `to-webcil`; `from-webcil` detects the container per file.
        #[arg(long)]
        no_wasm: bool,

        /// Fixed PE timestamp for `from-webcil` (hex or decimal).
        #[arg(long, value_name = "SECONDS")]
        timestamp: Option<String>,
    },
}
