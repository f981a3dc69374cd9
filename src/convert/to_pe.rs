//! Webcil to PE32 reconstruction.
//!
//! A Webcil payload keeps only the section bytes and the minimum needed to map them. To feed
//! it to a regular .NET metadata reader, the converter synthesizes the header set a compiler
//! would have emitted for a 32 bit class library and moves every section behind it:
//!
//! ```text
//! 0x000  IMAGE_DOS_HEADER          64 bytes, e_lfanew = 0x80
//! 0x040  DOS stub                  64 bytes
//! 0x080  IMAGE_NT_HEADERS32        248 bytes
//! 0x178  IMAGE_SECTION_HEADER x3   120 bytes
//! 0x1F0  zero padding
//! 0x200  .text, .rsrc, .reloc raw data
//! ```
//!
//! Section contents are copied verbatim. All `PointerToRawData` values shift by the same
//! amount so the first section starts right behind the headers.

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use log::{debug, trace, warn};

use crate::{
    convert::{align_up, round_to_nearest, ConvertOptions},
    file::io::{read_struct, write_struct},
    pe::{
        DataDirectory, DosHeader, FileHeader, NtHeaders32, OptionalHeader32, SectionHeader,
        DIRECTORY_ENTRY_BASERELOC, DIRECTORY_ENTRY_COM_DESCRIPTOR, DIRECTORY_ENTRY_IAT,
        DIRECTORY_ENTRY_RESOURCE, DOS_SIGNATURE, IMAGE_FILE_EXECUTABLE_IMAGE,
        IMAGE_FILE_LARGE_ADDRESS_AWARE, IMAGE_FILE_MACHINE_I386, IMAGE_SCN_CNT_CODE,
        IMAGE_SCN_CNT_INITIALIZED_DATA, IMAGE_SCN_MEM_DISCARDABLE, IMAGE_SCN_MEM_EXECUTE,
        IMAGE_SCN_MEM_READ, IMAGE_SUBSYSTEM_WINDOWS_CUI, NUMBER_OF_DIRECTORY_ENTRIES,
        OPTIONAL_HEADER32_MAGIC, PE_SIGNATURE, SIZEOF_DOS_HEADER, SIZEOF_NT_HEADERS32,
        SIZEOF_OPTIONAL_HEADER32, SIZEOF_SECTION_HEADER,
    },
    wasm::WasmWebcilUnwrapper,
    webcil::{
        WebcilHeader, WebcilSectionHeader, SECTION_RELOC, SECTION_RSRC, SECTION_TEXT,
        WEBCIL_SECTION_COUNT, WEBCIL_VERSION_MAJOR, WEBCIL_VERSION_MINOR,
    },
    Error::UnexpectedSectionCount,
    Result,
};

/// Real-mode program printing "This program cannot be run in DOS mode."
pub const DOS_STUB: [u8; 64] = [
    0x0E, 0x1F, 0xBA, 0x0E, 0x00, 0xB4, 0x09, 0xCD, 0x21, 0xB8, 0x01, 0x4C, 0xCD, 0x21, 0x54, 0x68,
    0x69, 0x73, 0x20, 0x70, 0x72, 0x6F, 0x67, 0x72, 0x61, 0x6D, 0x20, 0x63, 0x61, 0x6E, 0x6E, 0x6F,
    0x74, 0x20, 0x62, 0x65, 0x20, 0x72, 0x75, 0x6E, 0x20, 0x69, 0x6E, 0x20, 0x44, 0x4F, 0x53, 0x20,
    0x6D, 0x6F, 0x64, 0x65, 0x2E, 0x0D, 0x0D, 0x0A, 0x24, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Names of the reconstructed sections, in Webcil order
pub const SECTION_NAMES: [[u8; 8]; 3] = [*b".text\0\0\0", *b".rsrc\0\0\0", *b".reloc\0\0"];

/// Characteristics of the reconstructed sections, in Webcil order
pub const SECTION_CHARACTERISTICS: [u32; 3] = [
    IMAGE_SCN_CNT_CODE | IMAGE_SCN_MEM_EXECUTE | IMAGE_SCN_MEM_READ,
    IMAGE_SCN_CNT_INITIALIZED_DATA | IMAGE_SCN_MEM_READ,
    IMAGE_SCN_CNT_INITIALIZED_DATA | IMAGE_SCN_MEM_DISCARDABLE | IMAGE_SCN_MEM_READ,
];

/// `e_lfanew`: the NT headers follow the DOS header and stub
pub const NEW_EXE_HEADER_OFFSET: u32 = (SIZEOF_DOS_HEADER + DOS_STUB.len()) as u32;

/// Alignment of raw section data in the reconstructed file
pub const FILE_ALIGNMENT: u32 = 0x200;

/// Alignment of sections in memory
pub const SECTION_ALIGNMENT: u32 = 0x2000;

const IMAGE_BASE: u32 = 0x0040_0000;
const DLL_CHARACTERISTICS: u16 = 0x8560;
const IAT_SIZE: u32 = 8;
const CLI_HEADER_SIZE: u32 = 0x48;

/// Reconstructs a PE image from a Webcil payload, wrapped into WebAssembly if `wrapped`.
///
/// The reader is consumed from its current position and never closed.
///
/// # Errors
/// Any error of [`convert_from_webcil_with`].
pub fn convert_from_webcil<R: Read + Seek + ?Sized>(
    reader: &mut R,
    wrapped: bool,
) -> Result<Vec<u8>> {
    convert_from_webcil_with(reader, &ConvertOptions::default().with_webassembly(wrapped))
}

/// Reconstructs a PE image from a Webcil payload according to `options`.
///
/// # Errors
/// - Wrapper errors such as [`crate::Error::InvalidWasmPrefix`] if the module is invalid
/// - [`crate::Error::TruncatedStruct`] if a header is cut short
/// - [`crate::Error::UnexpectedSectionCount`] for anything but three sections
/// - [`crate::Error::Malformed`] if the section layout cannot be relocated or section data
///   is missing
/// - [`crate::Error::FileError`] for I/O failures of `reader`
pub fn convert_from_webcil_with<R: Read + Seek + ?Sized>(
    reader: &mut R,
    options: &ConvertOptions,
) -> Result<Vec<u8>> {
    if options.webassembly {
        let payload = WasmWebcilUnwrapper::new(reader).unwrap_to_vec()?;
        debug!("Unwrapped {} byte Webcil payload", payload.len());

        webcil_to_pe(&mut Cursor::new(payload), options)
    } else {
        webcil_to_pe(reader, options)
    }
}

fn webcil_to_pe<R: Read + Seek + ?Sized>(reader: &mut R, options: &ConvertOptions) -> Result<Vec<u8>> {
    let base = reader.stream_position()?;

    let header: WebcilHeader = read_struct(reader)?;
    if header.version_major != WEBCIL_VERSION_MAJOR || header.version_minor != WEBCIL_VERSION_MINOR
    {
        warn!(
            "Unexpected Webcil version {}.{}",
            header.version_major, header.version_minor
        );
    }

    if header.coff_sections != WEBCIL_SECTION_COUNT {
        return Err(UnexpectedSectionCount(header.coff_sections));
    }

    let mut sections = [WebcilSectionHeader::default(); WEBCIL_SECTION_COUNT as usize];
    for section in &mut sections {
        *section = read_struct(reader)?;
    }

    match cli_header_section(&header, &sections) {
        Some(index) => trace!("CLI header 0x{:x} in section {}", header.pe_cli_header_rva, index),
        None if header.pe_cli_header_rva != 0 => warn!(
            "CLI header RVA 0x{:x} is not mapped by any section",
            header.pe_cli_header_rva
        ),
        None => debug!("No CLI header RVA, falling back to .text + 0x{:x}", IAT_SIZE),
    }

    let section_start = NEW_EXE_HEADER_OFFSET as usize
        + SIZEOF_NT_HEADERS32
        + sections.len() * SIZEOF_SECTION_HEADER;
    let size_of_headers = round_to_nearest(section_start as u32, FILE_ALIGNMENT);
    let pointers = relocate_sections(&sections, size_of_headers)?;

    let stream_end = reader.seek(SeekFrom::End(0))?;
    for (index, section) in sections.iter().enumerate() {
        let end = base + u64::from(section.pointer_to_raw_data) + u64::from(section.size_of_raw_data);
        if end > stream_end {
            return Err(malformed_error!(
                "Section {} data at 0x{:x} ({} bytes) exceeds the Webcil payload",
                index,
                section.pointer_to_raw_data,
                section.size_of_raw_data
            ));
        }
    }

    debug!(
        "Reconstructing PE: headers 0x{:x}, sections at 0x{:x}/0x{:x}/0x{:x}",
        size_of_headers, pointers[0], pointers[1], pointers[2]
    );

    let image_size = sections
        .iter()
        .zip(pointers)
        .map(|(section, pointer)| pointer as usize + section.size_of_raw_data as usize)
        .fold(size_of_headers as usize, usize::max);

    let mut image = Vec::with_capacity(image_size);
    write_struct(&mut image, &dos_header())?;
    image.extend_from_slice(&DOS_STUB);
    write_struct(
        &mut image,
        &nt_headers(&header, &sections, size_of_headers, options.timestamp()),
    )?;
    for (index, section) in sections.iter().enumerate() {
        write_struct(&mut image, &section_header(index, section, pointers[index]))?;
    }
    image.resize(image_size, 0);

    for (index, (section, pointer)) in sections.iter().zip(pointers).enumerate() {
        let start = pointer as usize;
        let end = start + section.size_of_raw_data as usize;

        reader.seek(SeekFrom::Start(base + u64::from(section.pointer_to_raw_data)))?;
        reader.read_exact(&mut image[start..end]).map_err(|error| {
            if error.kind() == io::ErrorKind::UnexpectedEof {
                malformed_error!(
                    "Section {} data at 0x{:x} ({} bytes) exceeds the Webcil payload",
                    index,
                    section.pointer_to_raw_data,
                    section.size_of_raw_data
                )
            } else {
                error.into()
            }
        })?;

        trace!(
            "Section {}: 0x{:x} -> 0x{:x}, {} bytes",
            index,
            section.pointer_to_raw_data,
            pointer,
            section.size_of_raw_data
        );
    }

    Ok(image)
}

/// Index of the section mapping the CLI header RVA of `header`, if any
fn cli_header_section(header: &WebcilHeader, sections: &[WebcilSectionHeader]) -> Option<usize> {
    if header.pe_cli_header_rva == 0 {
        return None;
    }

    sections
        .iter()
        .position(|section| section.contains_rva(header.pe_cli_header_rva))
}

/// Shifts all section pointers so the first section starts at `size_of_headers`.
fn relocate_sections(
    sections: &[WebcilSectionHeader; 3],
    size_of_headers: u32,
) -> Result<[u32; 3]> {
    let shift = i64::from(size_of_headers) - i64::from(sections[SECTION_TEXT].pointer_to_raw_data);

    let mut pointers = [0_u32; 3];
    let mut previous_end = u64::from(size_of_headers);
    for (index, section) in sections.iter().enumerate() {
        let Ok(pointer) = u32::try_from(i64::from(section.pointer_to_raw_data) + shift) else {
            return Err(malformed_error!(
                "Section {} pointer 0x{:x} cannot be relocated",
                index,
                section.pointer_to_raw_data
            ));
        };

        if u64::from(pointer) < previous_end {
            return Err(malformed_error!(
                "Section {} at 0x{:x} overlaps the preceding data",
                index,
                section.pointer_to_raw_data
            ));
        }

        previous_end = u64::from(pointer) + u64::from(section.size_of_raw_data);
        if previous_end > u64::from(u32::MAX) {
            return Err(malformed_error!(
                "Section {} exceeds the 32 bit file size",
                index
            ));
        }

        pointers[index] = pointer;
    }

    Ok(pointers)
}

fn dos_header() -> DosHeader {
    DosHeader {
        magic: DOS_SIGNATURE,
        bytes_on_last_page: 0x90,
        pages_in_file: 3,
        size_of_header_in_paragraphs: 4,
        maximum_extra_paragraphs: 0xFFFF,
        initial_sp: 0xB8,
        address_of_relocation_table: 0x40,
        file_address_of_new_exe_header: NEW_EXE_HEADER_OFFSET,
        ..DosHeader::default()
    }
}

fn nt_headers(
    header: &WebcilHeader,
    sections: &[WebcilSectionHeader; 3],
    size_of_headers: u32,
    timestamp: u32,
) -> NtHeaders32 {
    let text = &sections[SECTION_TEXT];
    let rsrc = &sections[SECTION_RSRC];
    let reloc = &sections[SECTION_RELOC];

    let mut data_directory = [DataDirectory::default(); NUMBER_OF_DIRECTORY_ENTRIES];
    data_directory[DIRECTORY_ENTRY_RESOURCE] =
        DataDirectory::new(rsrc.virtual_address, rsrc.virtual_size);
    data_directory[DIRECTORY_ENTRY_BASERELOC] =
        DataDirectory::new(reloc.virtual_address, reloc.virtual_size);
    data_directory[DIRECTORY_ENTRY_IAT] = DataDirectory::new(text.virtual_address, IAT_SIZE);
    data_directory[DIRECTORY_ENTRY_COM_DESCRIPTOR] = if header.pe_cli_header_rva != 0 {
        DataDirectory::new(header.pe_cli_header_rva, header.pe_cli_header_size)
    } else {
        DataDirectory::new(text.virtual_address.saturating_add(IAT_SIZE), CLI_HEADER_SIZE)
    };

    let raw_total: u32 = sections.iter().map(|s| s.size_of_raw_data).sum();

    NtHeaders32 {
        signature: PE_SIGNATURE,
        file_header: FileHeader {
            machine: IMAGE_FILE_MACHINE_I386,
            number_of_sections: WEBCIL_SECTION_COUNT,
            time_date_stamp: timestamp,
            pointer_to_symbol_table: 0,
            number_of_symbols: 0,
            size_of_optional_header: SIZEOF_OPTIONAL_HEADER32 as u16,
            characteristics: IMAGE_FILE_EXECUTABLE_IMAGE | IMAGE_FILE_LARGE_ADDRESS_AWARE,
        },
        optional_header: OptionalHeader32 {
            magic: OPTIONAL_HEADER32_MAGIC,
            major_linker_version: 0x30,
            minor_linker_version: 0,
            size_of_code: text.size_of_raw_data,
            size_of_initialized_data: rsrc.size_of_raw_data + reloc.size_of_raw_data,
            base_of_code: text.virtual_address,
            base_of_data: rsrc.virtual_address,
            image_base: IMAGE_BASE,
            section_alignment: SECTION_ALIGNMENT,
            file_alignment: FILE_ALIGNMENT,
            major_operating_system_version: 4,
            major_subsystem_version: 4,
            size_of_image: align_up(raw_total, SECTION_ALIGNMENT),
            size_of_headers,
            subsystem: IMAGE_SUBSYSTEM_WINDOWS_CUI,
            dll_characteristics: DLL_CHARACTERISTICS,
            size_of_stack_reserve: 0x0010_0000,
            size_of_stack_commit: 0x1000,
            size_of_heap_reserve: 0x0010_0000,
            size_of_heap_commit: 0x1000,
            number_of_rva_and_sizes: NUMBER_OF_DIRECTORY_ENTRIES as u32,
            data_directory,
            ..OptionalHeader32::default()
        },
    }
}

fn section_header(index: usize, section: &WebcilSectionHeader, pointer: u32) -> SectionHeader {
    SectionHeader {
        name: SECTION_NAMES[index],
        virtual_size: section.virtual_size,
        virtual_address: section.virtual_address,
        size_of_raw_data: section.size_of_raw_data,
        pointer_to_raw_data: pointer,
        characteristics: SECTION_CHARACTERISTICS[index],
        ..SectionHeader::default()
    }
}
