use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::Context;
use webcil::prelude::*;

/// Read a whole input file.
pub fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Classify `data`, failing for anything that is neither PE, Webcil nor WebAssembly.
pub fn detect_format(path: &Path, data: &[u8]) -> anyhow::Result<Format> {
    Format::detect(data).with_context(|| {
        format!(
            "unrecognized file format (not PE, Webcil or WebAssembly): {}",
            path.display()
        )
    })
}

/// Strip the WebAssembly layer if `format` is [`Format::Wasm`], returning the Webcil payload.
///
/// PE images are returned unchanged.
pub fn webcil_payload(path: &Path, data: Vec<u8>, format: Format) -> anyhow::Result<Vec<u8>> {
    match format {
        Format::Wasm => WasmWebcilUnwrapper::new(&mut Cursor::new(data))
            .unwrap_to_vec()
            .with_context(|| format!("failed to unwrap WebAssembly module: {}", path.display())),
        Format::Pe | Format::Webcil => Ok(data),
    }
}

/// Turn any supported input into a PE image.
pub fn load_pe_image(
    path: &Path,
    data: Vec<u8>,
    format: Format,
    options: &ConvertOptions,
) -> anyhow::Result<Vec<u8>> {
    let wrapped = match format {
        Format::Pe => return Ok(data),
        Format::Wasm => true,
        Format::Webcil => false,
    };

    let options = options.with_webassembly(wrapped);
    convert_from_webcil_with(&mut Cursor::new(data), &options)
        .with_context(|| format!("failed to convert Webcil file: {}", path.display()))
}

/// Parse a timestamp string supporting hex (0x...) and decimal.
pub fn parse_timestamp(s: &str) -> anyhow::Result<u32> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).with_context(|| format!("invalid hex timestamp: {s}"))
    } else {
        trimmed
            .parse::<u32>()
            .with_context(|| format!("invalid timestamp: {s}"))
    }
}

/// Build conversion options from the command line flags.
pub fn convert_options(webassembly: bool, timestamp: Option<&str>) -> anyhow::Result<ConvertOptions> {
    let options = ConvertOptions::default().with_webassembly(webassembly);
    match timestamp {
        Some(value) => Ok(options.with_timestamp(parse_timestamp(value)?)),
        None => Ok(options),
    }
}

/// Output path for `input`: inside `output_dir` if given, else next to the input.
pub fn output_path(input: &Path, output_dir: Option<&Path>, extension: &str) -> PathBuf {
    let renamed = input.with_extension(extension);
    match (output_dir, renamed.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => renamed,
    }
}

/// Collect all files with one of `extensions` recursively from a directory.
pub fn collect_files(dir: &Path, extensions: &[&str]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files_recursive(dir, extensions, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files_recursive(
    dir: &Path,
    extensions: &[&str],
    files: &mut Vec<PathBuf>,
) -> anyhow::Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_files_recursive(&path, extensions, files)?;
        } else if has_extension(&path, extensions) {
            files.push(path);
        }
    }
    Ok(())
}

/// Returns true if the path ends in one of `extensions` (case-insensitive).
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)))
}

/// Extract a display-friendly filename from a path.
pub fn file_display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}
