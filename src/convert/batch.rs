//! Parallel conversion of independent files.
//!
//! Every job reads its own input and writes its own output, so jobs share nothing but the
//! [`ConvertOptions`]. They run on the rayon thread pool and each yields its own result; a
//! failing job never cancels the others.

use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use rayon::prelude::*;

use crate::{
    convert::{
        to_pe::convert_from_webcil_with, to_webcil::convert_to_webcil_with, ConvertOptions, Format,
    },
    Result,
};

/// Conversion direction of a [`BatchJob`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// PE assembly to (wrapped) Webcil
    ToWebcil,
    /// (Wrapped) Webcil to PE assembly
    FromWebcil,
}

/// One input/output pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    /// File to read
    pub input: PathBuf,
    /// File to create or overwrite
    pub output: PathBuf,
    /// What to convert into
    pub direction: Direction,
}

impl BatchJob {
    /// Creates a job converting `input` into `output`
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, direction: Direction) -> Self {
        BatchJob {
            input: input.into(),
            output: output.into(),
            direction,
        }
    }

    /// Runs this job on the current thread.
    ///
    /// # Errors
    /// Any error of [`convert_to_webcil_with`] or [`convert_from_webcil_file`].
    pub fn run(&self, options: &ConvertOptions) -> Result<()> {
        match self.direction {
            Direction::ToWebcil => convert_to_webcil_with(&self.input, &self.output, options),
            Direction::FromWebcil => convert_from_webcil_file(&self.input, &self.output, options),
        }
    }
}

/// Reconstructs the PE image of the Webcil file at `input` and writes it to `output`.
///
/// The container is detected per file: a WebAssembly module is unwrapped and a bare Webcil
/// payload is read as is, whatever `options.webassembly` says. Only input that is neither
/// falls back to `options.webassembly` and fails with the matching error.
///
/// # Errors
/// [`crate::Error::FileError`] if a file cannot be read or written, otherwise any error of
/// [`convert_from_webcil_with`].
pub fn convert_from_webcil_file(input: &Path, output: &Path, options: &ConvertOptions) -> Result<()> {
    let data = fs::read(input)?;
    let wrapped = match Format::detect(&data) {
        Some(Format::Wasm) => true,
        Some(Format::Webcil) => false,
        Some(Format::Pe) | None => options.webassembly,
    };

    let image = convert_from_webcil_with(&mut Cursor::new(data), &options.with_webassembly(wrapped))?;
    fs::write(output, image)?;

    debug!(
        "Converted {} to {} (wrapped: {})",
        input.display(),
        output.display(),
        wrapped
    );
    Ok(())
}

/// Runs all `jobs` in parallel and returns their results in job order.
///
/// # Examples
///
/// ```rust,no_run
/// use webcil::convert::batch::{convert_batch, BatchJob, Direction};
/// use webcil::ConvertOptions;
///
/// let jobs = vec![
///     BatchJob::new("System.Runtime.dll", "System.Runtime.wasm", Direction::ToWebcil),
///     BatchJob::new("System.Console.dll", "System.Console.wasm", Direction::ToWebcil),
/// ];
///
/// for (job, result) in jobs.iter().zip(convert_batch(&jobs, &ConvertOptions::default())) {
///     if let Err(error) = result {
///         eprintln!("{}: {error}", job.input.display());
///     }
/// }
/// ```
pub fn convert_batch(jobs: &[BatchJob], options: &ConvertOptions) -> Vec<Result<()>> {
    debug!("Converting {} files", jobs.len());

    jobs.par_iter()
        .map(|job| {
            let result = job.run(options);
            if let Err(error) = &result {
                warn!("{}: {}", job.input.display(), error);
            }
            result
        })
        .collect()
}
