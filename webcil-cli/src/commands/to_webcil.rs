use std::path::Path;

use anyhow::Context;
use log::info;
use serde::Serialize;
use webcil::prelude::*;

use crate::{
    app::GlobalOptions,
    commands::common::{convert_options, file_display_name, output_path},
    output::{format_size, print_field, print_output},
};

#[derive(Debug, Serialize)]
pub struct ConversionInfo {
    pub input: String,
    pub output: String,
    pub format: String,
    pub input_size: u64,
    pub output_size: u64,
}

pub fn run(
    path: &Path,
    output: Option<&Path>,
    webassembly: bool,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let format = if webassembly {
        Format::Wasm
    } else {
        Format::Webcil
    };
    let output = output.map_or_else(|| output_path(path, None, format.extension()), Path::to_path_buf);
    let options = convert_options(webassembly, None)?;

    convert_to_webcil_with(path, &output, &options)
        .with_context(|| format!("failed to convert assembly: {}", path.display()))?;
    info!("Wrote {}", output.display());

    let info = ConversionInfo {
        input: path.display().to_string(),
        output: output.display().to_string(),
        format: format.to_string(),
        input_size: std::fs::metadata(path)?.len(),
        output_size: std::fs::metadata(&output)?.len(),
    };

    print_output(&info, opts, display_conversion)
}

/// Shared by `to-webcil` and `from-webcil`.
pub fn display_conversion(info: &ConversionInfo) {
    let input = file_display_name(Path::new(&info.input));
    let output = file_display_name(Path::new(&info.output));
    println!("{input} -> {output} ({})", info.format);
    print_field("Input size", size_label(info.input_size), 11);
    print_field("Output size", size_label(info.output_size), 11);
}

fn size_label(size: u64) -> String {
    u32::try_from(size).map_or_else(|_| size.to_string(), format_size)
}
