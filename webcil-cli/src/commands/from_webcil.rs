use std::path::Path;

use anyhow::{bail, Context};
use log::info;
use webcil::prelude::*;

use crate::{
    app::GlobalOptions,
    commands::{
        common::{convert_options, detect_format, load_pe_image, output_path, read_input},
        to_webcil::{display_conversion, ConversionInfo},
    },
    output::print_output,
};

pub fn run(
    path: &Path,
    output: Option<&Path>,
    timestamp: Option<&str>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let data = read_input(path)?;
    let input_size = data.len() as u64;

    let format = detect_format(path, &data)?;
    if format == Format::Pe {
        bail!("{} is already a PE image", path.display());
    }

    let options = convert_options(format == Format::Wasm, timestamp)?;
    let image = load_pe_image(path, data, format, &options)?;

    let output = output.map_or_else(
        || output_path(path, None, Format::Pe.extension()),
        Path::to_path_buf,
    );
    std::fs::write(&output, &image)
        .with_context(|| format!("failed to write file: {}", output.display()))?;
    info!("Wrote {}", output.display());

    let info = ConversionInfo {
        input: path.display().to_string(),
        output: output.display().to_string(),
        format: Format::Pe.to_string(),
        input_size,
        output_size: image.len() as u64,
    };

    print_output(&info, opts, display_conversion)
}
