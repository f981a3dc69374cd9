//! Builds a small, valid .NET PE32 library in memory.
//!
//! The image mirrors what the C# compiler emits for a class library with a single type and
//! method: `.text` holds an 8 byte IAT, the CLI header and the metadata root (`#~`,
//! `#Strings`, `#GUID`, `#Blob`), `.rsrc` an empty resource directory and `.reloc` a single
//! base relocation block.
#![allow(dead_code)]

/// RVA of `.text`
pub const TEXT_RVA: u32 = 0x2000;
/// RVA of the CLI header, right behind the IAT
pub const CLI_HEADER_RVA: u32 = 0x2008;
/// RVA of the metadata root, right behind the CLI header
pub const METADATA_RVA: u32 = 0x2050;
/// RVA of `.rsrc`
pub const RSRC_RVA: u32 = 0x4000;
/// RVA of `.reloc`
pub const RELOC_RVA: u32 = 0x6000;
/// `TimeDateStamp` of the built image
pub const IMAGE_TIMESTAMP: u32 = 0x6543_2100;
/// Metadata version string
pub const RUNTIME_VERSION: &str = "v4.0.30319";

const HEADERS_SIZE: usize = 0x200;
const TEXT_RAW_SIZE: usize = 0x400;
const RSRC_RAW_SIZE: usize = 0x200;
const RELOC_RAW_SIZE: usize = 0x200;

const DOS_STUB: [u8; 64] = [
    0x0E, 0x1F, 0xBA, 0x0E, 0x00, 0xB4, 0x09, 0xCD, 0x21, 0xB8, 0x01, 0x4C, 0xCD, 0x21, 0x54, 0x68,
    0x69, 0x73, 0x20, 0x70, 0x72, 0x6F, 0x67, 0x72, 0x61, 0x6D, 0x20, 0x63, 0x61, 0x6E, 0x6E, 0x6F,
    0x74, 0x20, 0x62, 0x65, 0x20, 0x72, 0x75, 0x6E, 0x20, 0x69, 0x6E, 0x20, 0x44, 0x4F, 0x53, 0x20,
    0x6D, 0x6F, 0x64, 0x65, 0x2E, 0x0D, 0x0D, 0x0A, 0x24, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

struct Section {
    name: &'static [u8; 8],
    virtual_size: u32,
    virtual_address: u32,
    size_of_raw_data: u32,
    pointer_to_raw_data: u32,
    characteristics: u32,
}

fn put_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn push_u16(data: &mut Vec<u8>, value: u16) {
    data.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(data: &mut Vec<u8>, value: u32) {
    data.extend_from_slice(&value.to_le_bytes());
}

fn pad4(data: &mut Vec<u8>) {
    while data.len() % 4 != 0 {
        data.push(0);
    }
}

/// Identifier strings stored in the `#Strings` heap of [`build_assembly`]
pub fn identifiers(namespace: &str, type_name: &str, method_name: &str) -> Vec<String> {
    vec![
        "<Module>".to_string(),
        format!("{namespace}.dll"),
        namespace.to_string(),
        type_name.to_string(),
        method_name.to_string(),
        ".ctor".to_string(),
        "System".to_string(),
        "Object".to_string(),
        "mscorlib".to_string(),
    ]
}

/// Builds the metadata root with its four streams
pub fn build_metadata(namespace: &str, type_name: &str, method_name: &str) -> Vec<u8> {
    let mut tables = Vec::new();
    push_u32(&mut tables, 0);
    tables.extend_from_slice(&[2, 0, 0, 1]);
    tables.extend_from_slice(&0_u64.to_le_bytes());
    tables.extend_from_slice(&0_u64.to_le_bytes());

    let mut strings = vec![0_u8];
    for identifier in identifiers(namespace, type_name, method_name) {
        strings.extend_from_slice(identifier.as_bytes());
        strings.push(0);
    }
    pad4(&mut strings);

    let guid: Vec<u8> = (1..=16).collect();
    let blob = vec![0_u8; 4];

    let streams: [(&str, &[u8]); 4] = [
        ("#~", &tables),
        ("#Strings", &strings),
        ("#GUID", &guid),
        ("#Blob", &blob),
    ];

    let mut version = RUNTIME_VERSION.as_bytes().to_vec();
    version.push(0);
    pad4(&mut version);

    let mut header = Vec::new();
    push_u32(&mut header, 0x424A_5342);
    push_u16(&mut header, 1);
    push_u16(&mut header, 1);
    push_u32(&mut header, 0);
    push_u32(&mut header, version.len() as u32);
    header.extend_from_slice(&version);
    push_u16(&mut header, 0);
    push_u16(&mut header, streams.len() as u16);

    let headers_len: usize = streams
        .iter()
        .map(|(name, _)| 8 + (name.len() + 1 + 3) / 4 * 4)
        .sum();

    let mut offset = header.len() + headers_len;
    let mut bodies = Vec::new();
    for (name, body) in &streams {
        push_u32(&mut header, offset as u32);
        push_u32(&mut header, body.len() as u32);
        header.extend_from_slice(name.as_bytes());
        header.push(0);
        pad4(&mut header);

        bodies.extend_from_slice(body);
        offset += body.len();
    }

    header.extend_from_slice(&bodies);
    header
}

/// Builds a complete PE32 class library
pub fn build_assembly(namespace: &str, type_name: &str, method_name: &str) -> Vec<u8> {
    let metadata = build_metadata(namespace, type_name, method_name);
    let metadata_offset = (METADATA_RVA - TEXT_RVA) as usize;
    assert!(metadata_offset + metadata.len() <= TEXT_RAW_SIZE);

    let sections = [
        Section {
            name: b".text\0\0\0",
            virtual_size: (metadata_offset + metadata.len()) as u32,
            virtual_address: TEXT_RVA,
            size_of_raw_data: TEXT_RAW_SIZE as u32,
            pointer_to_raw_data: HEADERS_SIZE as u32,
            characteristics: 0x6000_0020,
        },
        Section {
            name: b".rsrc\0\0\0",
            virtual_size: 0x10,
            virtual_address: RSRC_RVA,
            size_of_raw_data: RSRC_RAW_SIZE as u32,
            pointer_to_raw_data: (HEADERS_SIZE + TEXT_RAW_SIZE) as u32,
            characteristics: 0x4000_0040,
        },
        Section {
            name: b".reloc\0\0",
            virtual_size: 0x0C,
            virtual_address: RELOC_RVA,
            size_of_raw_data: RELOC_RAW_SIZE as u32,
            pointer_to_raw_data: (HEADERS_SIZE + TEXT_RAW_SIZE + RSRC_RAW_SIZE) as u32,
            characteristics: 0x4200_0040,
        },
    ];

    let mut image = vec![0_u8; HEADERS_SIZE + TEXT_RAW_SIZE + RSRC_RAW_SIZE + RELOC_RAW_SIZE];

    // DOS header and stub
    put_u16(&mut image, 0x00, 0x5A4D);
    put_u16(&mut image, 0x02, 0x90);
    put_u16(&mut image, 0x04, 3);
    put_u16(&mut image, 0x08, 4);
    put_u16(&mut image, 0x0C, 0xFFFF);
    put_u16(&mut image, 0x10, 0xB8);
    put_u16(&mut image, 0x18, 0x40);
    put_u32(&mut image, 0x3C, 0x80);
    image[0x40..0x80].copy_from_slice(&DOS_STUB);

    // COFF file header
    put_u32(&mut image, 0x80, 0x4550);
    put_u16(&mut image, 0x84, 0x014C);
    put_u16(&mut image, 0x86, sections.len() as u16);
    put_u32(&mut image, 0x88, IMAGE_TIMESTAMP);
    put_u16(&mut image, 0x94, 0xE0);
    put_u16(&mut image, 0x96, 0x2022);

    // PE32 optional header
    let optional = 0x98;
    put_u16(&mut image, optional, 0x010B);
    image[optional + 2] = 0x30;
    put_u32(&mut image, optional + 4, TEXT_RAW_SIZE as u32);
    put_u32(&mut image, optional + 8, (RSRC_RAW_SIZE + RELOC_RAW_SIZE) as u32);
    put_u32(&mut image, optional + 20, TEXT_RVA);
    put_u32(&mut image, optional + 24, RSRC_RVA);
    put_u32(&mut image, optional + 28, 0x0040_0000);
    put_u32(&mut image, optional + 32, 0x2000);
    put_u32(&mut image, optional + 36, 0x200);
    put_u16(&mut image, optional + 40, 4);
    put_u16(&mut image, optional + 48, 4);
    put_u32(&mut image, optional + 56, 0x8000);
    put_u32(&mut image, optional + 60, HEADERS_SIZE as u32);
    put_u16(&mut image, optional + 68, 3);
    put_u16(&mut image, optional + 70, 0x8560);
    put_u32(&mut image, optional + 72, 0x0010_0000);
    put_u32(&mut image, optional + 76, 0x1000);
    put_u32(&mut image, optional + 80, 0x0010_0000);
    put_u32(&mut image, optional + 84, 0x1000);
    put_u32(&mut image, optional + 92, 16);

    let directories = optional + 96;
    let mut directory = |index: usize, rva: u32, size: u32| {
        put_u32(&mut image, directories + index * 8, rva);
        put_u32(&mut image, directories + index * 8 + 4, size);
    };
    directory(2, RSRC_RVA, 0x10);
    directory(5, RELOC_RVA, 0x0C);
    directory(12, TEXT_RVA, 8);
    directory(14, CLI_HEADER_RVA, 0x48);

    // Section table
    for (index, section) in sections.iter().enumerate() {
        let header = 0x178 + index * 40;
        image[header..header + 8].copy_from_slice(section.name);
        put_u32(&mut image, header + 8, section.virtual_size);
        put_u32(&mut image, header + 12, section.virtual_address);
        put_u32(&mut image, header + 16, section.size_of_raw_data);
        put_u32(&mut image, header + 20, section.pointer_to_raw_data);
        put_u32(&mut image, header + 36, section.characteristics);
    }

    // CLI header
    let cli = HEADERS_SIZE + (CLI_HEADER_RVA - TEXT_RVA) as usize;
    put_u32(&mut image, cli, 0x48);
    put_u16(&mut image, cli + 4, 2);
    put_u16(&mut image, cli + 6, 5);
    put_u32(&mut image, cli + 8, METADATA_RVA);
    put_u32(&mut image, cli + 12, metadata.len() as u32);
    put_u32(&mut image, cli + 16, 1);

    let metadata_start = HEADERS_SIZE + metadata_offset;
    image[metadata_start..metadata_start + metadata.len()].copy_from_slice(&metadata);

    // A single HIGHLOW relocation for the IAT slot, padded to a 4 byte block
    let reloc = HEADERS_SIZE + TEXT_RAW_SIZE + RSRC_RAW_SIZE;
    put_u32(&mut image, reloc, TEXT_RVA);
    put_u32(&mut image, reloc + 4, 0x0C);
    put_u16(&mut image, reloc + 8, 0x3000);

    image
}

/// A hello world class library: `HelloWorld.Greeter.Greet`
pub fn hello_world() -> Vec<u8> {
    build_assembly("HelloWorld", "Greeter", "Greet")
}
