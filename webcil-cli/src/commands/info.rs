use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use webcil::{file::io::StructIO, prelude::*};

use crate::{
    app::GlobalOptions,
    commands::common::{detect_format, file_display_name, load_pe_image, read_input, webcil_payload},
    output::{format_size, print_field, print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
pub struct FileInfo {
    pub file: String,
    pub format: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webcil: Option<WebcilInfo>,
    pub cli_header_rva: String,
    pub cli_header_size: u32,
    pub runtime_version: String,
    pub flags: String,
    pub metadata_rva: String,
    pub metadata_size: u32,
    pub metadata_version: String,
    pub streams: Vec<String>,
    pub identifier_count: usize,
}

#[derive(Debug, Serialize)]
pub struct WebcilInfo {
    pub version: String,
    pub debug_rva: String,
    pub debug_size: u32,
    pub sections: Vec<SectionInfo>,
}

#[derive(Debug, Serialize)]
pub struct SectionInfo {
    pub virtual_address: String,
    pub virtual_size: u32,
    pub raw_size: u32,
    pub raw_pointer: String,
    pub holds_cli_header: bool,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let data = read_input(path)?;
    let size = data.len() as u64;
    let format = detect_format(path, &data)?;

    let payload = webcil_payload(path, data, format)?;
    let webcil = match format {
        Format::Pe => None,
        Format::Wasm | Format::Webcil => Some(webcil_info(&payload)?),
    };

    let unwrapped = if format == Format::Pe { format } else { Format::Webcil };
    let image = load_pe_image(path, payload, unwrapped, &ConvertOptions::default())?;
    let summary = MetadataSummary::from_pe_bytes(image)
        .with_context(|| format!("failed to read metadata: {}", path.display()))?;

    let info = FileInfo {
        file: file_display_name(path),
        format: format.to_string(),
        size,
        webcil,
        cli_header_rva: format!("0x{:08x}", summary.cli_header_rva),
        cli_header_size: summary.cli_header_size,
        runtime_version: format!("{}.{}", summary.runtime_version.0, summary.runtime_version.1),
        flags: format!("0x{:08x}", summary.flags),
        metadata_rva: format!("0x{:08x}", summary.metadata_rva),
        metadata_size: summary.metadata_size,
        metadata_version: summary.version,
        streams: summary.streams,
        identifier_count: summary.identifiers.len(),
    };

    print_output(&info, opts, display_info)
}

fn webcil_info(payload: &[u8]) -> anyhow::Result<WebcilInfo> {
    let header = WebcilHeader::from_bytes(payload).context("failed to read Webcil header")?;

    let mut sections = Vec::with_capacity(usize::from(header.coff_sections));
    for index in 0..usize::from(header.coff_sections) {
        let offset = WebcilHeader::SIZE + index * WebcilSectionHeader::SIZE;
        let section = payload
            .get(offset..)
            .map(WebcilSectionHeader::from_bytes)
            .with_context(|| format!("section header {index} is out of bounds"))??;

        sections.push(SectionInfo {
            virtual_address: format!("0x{:08x}", section.virtual_address),
            virtual_size: section.virtual_size,
            raw_size: section.size_of_raw_data,
            raw_pointer: format!("0x{:08x}", section.pointer_to_raw_data),
            holds_cli_header: section.contains_rva(header.pe_cli_header_rva),
        });
    }

    Ok(WebcilInfo {
        version: format!("{}.{}", header.version_major, header.version_minor),
        debug_rva: format!("0x{:08x}", header.pe_debug_rva),
        debug_size: header.pe_debug_size,
        sections,
    })
}

fn display_info(info: &FileInfo) {
    const WIDTH: usize = 16;

    print_field("File", &info.file, WIDTH);
    print_field("Format", &info.format, WIDTH);
    print_field("Size", info.size, WIDTH);

    if let Some(webcil) = &info.webcil {
        println!();
        print_field("Webcil version", &webcil.version, WIDTH);
        print_field(
            "Debug directory",
            format!("{} ({})", webcil.debug_rva, format_size(webcil.debug_size)),
            WIDTH,
        );
        println!("Sections:");
        let mut table = TabWriter::new(vec![
            ("RVA", Align::Left),
            ("VSize", Align::Right),
            ("RawSize", Align::Right),
            ("RawPtr", Align::Left),
            ("", Align::Left),
        ])
        .indent("  ");
        for section in &webcil.sections {
            table.row(vec![
                section.virtual_address.clone(),
                format!("0x{:x}", section.virtual_size),
                format!("0x{:x}", section.raw_size),
                section.raw_pointer.clone(),
                if section.holds_cli_header { "CLI header" } else { "" }.to_string(),
            ]);
        }
        table.print();
    }

    println!();
    print_field(
        "CLI header",
        format!("{} ({})", info.cli_header_rva, format_size(info.cli_header_size)),
        WIDTH,
    );
    print_field("Runtime", &info.runtime_version, WIDTH);
    print_field("Flags", &info.flags, WIDTH);
    print_field(
        "Metadata",
        format!("{} ({})", info.metadata_rva, format_size(info.metadata_size)),
        WIDTH,
    );
    print_field("Metadata version", &info.metadata_version, WIDTH);
    print_field("Streams", info.streams.join(", "), WIDTH);
    print_field("Identifiers", info.identifier_count, WIDTH);
}
