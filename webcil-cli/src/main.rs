mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .expect("failed to set Ctrl+C handler");

    let cli = Cli::parse();

    // webcil info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("webcil", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::ToWebcil {
            path,
            output,
            no_wasm,
        } => commands::to_webcil::run(path, output.as_deref(), !*no_wasm, &cli.global),
        Command::FromWebcil {
            path,
            output,
            timestamp,
        } => commands::from_webcil::run(
            path,
            output.as_deref(),
            timestamp.as_deref(),
            &cli.global,
        ),
        Command::Info { path } => commands::info::run(path, &cli.global),
        Command::Batch {
            direction,
            paths,
            output_dir,
            no_wasm,
            timestamp,
        } => commands::batch::run(
            paths,
            &commands::batch::BatchOptions {
                direction: *direction,
                output_dir: output_dir.as_deref(),
                webassembly: !*no_wasm,
                timestamp: timestamp.as_deref(),
                global: &cli.global,
            },
        ),
    }
}
