//! PE to Webcil conversion.
//!
//! The payload keeps the raw bytes of every section and drops everything a loader of Webcil
//! does not need: the DOS header and stub, the COFF and optional headers, section names and
//! characteristics. Section data is packed contiguously behind the section table:
//!
//! ```text
//! WebcilHeader               22 bytes
//! WebcilSectionHeader xN     16 bytes each
//! section 0 .. N-1 raw data  PE order, no padding
//! ```

use std::{
    fs,
    io::Write,
    path::Path,
};

use goblin::pe::data_directories::DataDirectoryType;
use log::{debug, trace};

use crate::{
    convert::ConvertOptions,
    file::{
        io::{write_struct, StructIO},
        File,
    },
    wasm::WasmWebcilWrapper,
    webcil::{WebcilHeader, WebcilSectionHeader, WEBCIL_VERSION_MAJOR, WEBCIL_VERSION_MINOR},
    Result,
};

/// Converts the PE assembly at `input` into Webcil at `output`, wrapped into a WebAssembly
/// module if `wrap`.
///
/// # Errors
/// Any error of [`convert_to_webcil_with`].
pub fn convert_to_webcil(input: &Path, output: &Path, wrap: bool) -> Result<()> {
    convert_to_webcil_with(input, output, &ConvertOptions::default().with_webassembly(wrap))
}

/// Converts the PE assembly at `input` into Webcil at `output` according to `options`.
///
/// # Errors
/// - [`crate::Error::FileError`] if reading `input` or writing `output` fails
/// - [`crate::Error::GoblinErr`] if `input` is not a PE image
/// - [`crate::Error::Malformed`] if it carries no CLR runtime header
/// - [`crate::Error::OutOfBounds`] if section data lies outside the image
pub fn convert_to_webcil_with(input: &Path, output: &Path, options: &ConvertOptions) -> Result<()> {
    let file = File::from_file(input)?;

    // Nothing touches `output` until the whole module is built
    let mut module = Vec::new();
    write_webcil(&file, &mut module, options)?;

    fs::write(output, module)?;

    debug!("Converted {} to {}", input.display(), output.display());
    Ok(())
}

/// Writes the Webcil form of `file` to `output`, wrapped if `options.webassembly` is set.
///
/// # Errors
/// See [`pe_to_webcil`]; additionally [`crate::Error::FileError`] if writing fails.
pub fn write_webcil<W: Write + ?Sized>(
    file: &File,
    output: &mut W,
    options: &ConvertOptions,
) -> Result<()> {
    let payload = pe_to_webcil(file)?;

    if options.webassembly {
        WasmWebcilWrapper::new(&payload).write_wrapped(output)
    } else {
        output.write_all(&payload)?;
        Ok(())
    }
}

/// Builds the bare Webcil payload of `file`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the image has more sections than a Webcil header
/// can count, or its section data does not fit a 32 bit payload, and
/// [`crate::Error::OutOfBounds`] if section data lies outside the image.
///
/// # Examples
///
/// ```rust,no_run
/// use webcil::{convert::to_webcil::pe_to_webcil, File};
/// use std::path::Path;
///
/// let file = File::from_file(Path::new("HelloWorld.dll"))?;
/// let payload = pe_to_webcil(&file)?;
/// std::fs::write("HelloWorld.webcil", payload)?;
/// # Ok::<(), webcil::Error>(())
/// ```
pub fn pe_to_webcil(file: &File) -> Result<Vec<u8>> {
    let Ok(coff_sections) = u16::try_from(file.section_count()) else {
        return Err(malformed_error!(
            "Too many sections for Webcil - {}",
            file.section_count()
        ));
    };

    let (pe_cli_header_rva, pe_cli_header_size) = file.clr();
    let (pe_debug_rva, pe_debug_size) = file
        .get_data_directory(DataDirectoryType::DebugTable)
        .unwrap_or_default();

    let header = WebcilHeader {
        version_major: WEBCIL_VERSION_MAJOR,
        version_minor: WEBCIL_VERSION_MINOR,
        coff_sections,
        pe_cli_header_rva,
        pe_cli_header_size,
        pe_debug_rva,
        pe_debug_size,
    };

    let mut pointer =
        (WebcilHeader::SIZE + usize::from(coff_sections) * WebcilSectionHeader::SIZE) as u64;
    let mut sections = Vec::with_capacity(file.section_count());
    for section in file.sections() {
        let Ok(pointer_to_raw_data) = u32::try_from(pointer) else {
            return Err(malformed_error!(
                "Webcil payload exceeds 4 GiB at section {}",
                sections.len()
            ));
        };

        trace!(
            "Section {}: 0x{:x} -> 0x{:x}, {} bytes",
            sections.len(),
            section.pointer_to_raw_data,
            pointer_to_raw_data,
            section.size_of_raw_data
        );

        sections.push((
            WebcilSectionHeader {
                virtual_size: section.virtual_size,
                virtual_address: section.virtual_address,
                size_of_raw_data: section.size_of_raw_data,
                pointer_to_raw_data,
            },
            file.section_data(section)?,
        ));
        pointer += u64::from(section.size_of_raw_data);
    }

    debug!(
        "Webcil payload: {} sections, CLI header 0x{:x}, {} bytes",
        coff_sections, pe_cli_header_rva, pointer
    );

    let mut payload = Vec::with_capacity(usize::try_from(pointer).unwrap_or_default());
    write_struct(&mut payload, &header)?;
    for (section, _) in &sections {
        write_struct(&mut payload, section)?;
    }
    for (_, data) in &sections {
        payload.extend_from_slice(data);
    }

    Ok(payload)
}
