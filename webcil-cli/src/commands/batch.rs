use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::Serialize;
use webcil::prelude::*;

use crate::{
    app::{BatchDirection, GlobalOptions},
    commands::common::{collect_files, convert_options, file_display_name, output_path},
    output::{print_output, Align, TabWriter},
};

const PE_EXTENSIONS: &[&str] = &["dll", "exe"];
const WEBCIL_EXTENSIONS: &[&str] = &["wasm", "webcil"];

pub struct BatchOptions<'a> {
    pub direction: BatchDirection,
    pub output_dir: Option<&'a Path>,
    pub webassembly: bool,
    pub timestamp: Option<&'a str>,
    pub global: &'a GlobalOptions,
}

#[derive(Debug, Serialize)]
struct JobInfo {
    input: String,
    output: String,
    converted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct BatchInfo {
    results: Vec<JobInfo>,
    total_files: usize,
    failed_count: usize,
}

pub fn run(paths: &[PathBuf], opts: &BatchOptions) -> anyhow::Result<()> {
    let (direction, inputs, extension) = match opts.direction {
        BatchDirection::ToWebcil => {
            let extension = if opts.webassembly {
                Format::Wasm.extension()
            } else {
                Format::Webcil.extension()
            };
            (Direction::ToWebcil, PE_EXTENSIONS, extension)
        }
        BatchDirection::FromWebcil => (
            Direction::FromWebcil,
            WEBCIL_EXTENSIONS,
            Format::Pe.extension(),
        ),
    };

    if let Some(dir) = opts.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }

    let mut jobs = Vec::new();
    for path in paths {
        let files = if path.is_dir() {
            collect_files(path, inputs)?
        } else {
            vec![path.clone()]
        };
        jobs.extend(files.into_iter().map(|input| {
            let output = output_path(&input, opts.output_dir, extension);
            BatchJob::new(input, output, direction)
        }));
    }

    let options = convert_options(opts.webassembly, opts.timestamp)?;
    let results: Vec<JobInfo> = jobs
        .iter()
        .zip(convert_batch(&jobs, &options))
        .map(|(job, result)| JobInfo {
            input: job.input.display().to_string(),
            output: job.output.display().to_string(),
            converted: result.is_ok(),
            error: result.err().map(|error| error.to_string()),
        })
        .collect();

    let failed_count = results.iter().filter(|job| !job.converted).count();
    let batch = BatchInfo {
        total_files: results.len(),
        failed_count,
        results,
    };

    print_output(&batch, opts.global, |batch| {
        let mut table = TabWriter::new(vec![
            ("Input", Align::Left),
            ("Output", Align::Left),
            ("Status", Align::Left),
        ]);
        for job in &batch.results {
            table.row(vec![
                file_display_name(Path::new(&job.input)),
                file_display_name(Path::new(&job.output)),
                job.error.clone().unwrap_or_else(|| "ok".to_string()),
            ]);
        }
        table.print();
        println!();
        println!(
            "Converted {} of {} files",
            batch.total_files - batch.failed_count,
            batch.total_files
        );
    })?;

    if failed_count > 0 {
        bail!("{failed_count} of {} conversions failed", jobs.len());
    }
    Ok(())
}
