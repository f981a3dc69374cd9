//! Typed model of the PE/COFF headers that make up a .NET assembly image.
//!
//! Only the subset of the Microsoft PE/COFF specification needed to reconstruct a PE32 image
//! from Webcil is modelled here: the legacy DOS header, the NT headers (signature, COFF file
//! header and PE32 optional header with its 16 data directories) and the section table.
//!
//! Every structure implements [`crate::file::io::StructIO`] with an explicit, field-ordered
//! serializer, so the byte layout below is exactly what ends up on disk:
//!
//! | Structure | Size |
//! |---|---|
//! | [`DosHeader`] | 64 |
//! | [`FileHeader`] | 20 |
//! | [`OptionalHeader32`] | 224 |
//! | [`NtHeaders32`] | 248 |
//! | [`SectionHeader`] | 40 |
//!
//! Parsing arbitrary PE files is left to [`crate::File`], which wraps `goblin`.

mod headers;
mod section;

pub use headers::{DataDirectory, DosHeader, FileHeader, NtHeaders32, OptionalHeader32};
pub use section::SectionHeader;

/// `MZ`, the DOS header signature
pub const DOS_SIGNATURE: u16 = 0x5A4D;
/// `PE\0\0`, the NT headers signature
pub const PE_SIGNATURE: u32 = 0x0000_4550;
/// Magic of a PE32 optional header
pub const OPTIONAL_HEADER32_MAGIC: u16 = 0x010B;
/// Intel 386 machine type
pub const IMAGE_FILE_MACHINE_I386: u16 = 0x014C;

/// The image file is valid and can be run
pub const IMAGE_FILE_EXECUTABLE_IMAGE: u16 = 0x0002;
/// The application can handle addresses above 2 GB
pub const IMAGE_FILE_LARGE_ADDRESS_AWARE: u16 = 0x0020;

/// Windows character subsystem
pub const IMAGE_SUBSYSTEM_WINDOWS_CUI: u16 = 3;

/// Number of entries in the optional header data directory table
pub const NUMBER_OF_DIRECTORY_ENTRIES: usize = 16;

/// Index of the resource table directory
pub const DIRECTORY_ENTRY_RESOURCE: usize = 2;
/// Index of the base relocation table directory
pub const DIRECTORY_ENTRY_BASERELOC: usize = 5;
/// Index of the debug directory
pub const DIRECTORY_ENTRY_DEBUG: usize = 6;
/// Index of the import address table directory
pub const DIRECTORY_ENTRY_IAT: usize = 12;
/// Index of the CLI (COR20) header directory
pub const DIRECTORY_ENTRY_COM_DESCRIPTOR: usize = 14;

/// The section contains executable code
pub const IMAGE_SCN_CNT_CODE: u32 = 0x0000_0020;
/// The section contains initialized data
pub const IMAGE_SCN_CNT_INITIALIZED_DATA: u32 = 0x0000_0040;
/// The section can be discarded as needed
pub const IMAGE_SCN_MEM_DISCARDABLE: u32 = 0x0200_0000;
/// The section can be executed as code
pub const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;
/// The section can be read
pub const IMAGE_SCN_MEM_READ: u32 = 0x4000_0000;

/// Size of the DOS header
pub const SIZEOF_DOS_HEADER: usize = 64;
/// Size of the PE signature
pub const SIZEOF_PE_SIGNATURE: usize = 4;
/// Size of the COFF file header
pub const SIZEOF_FILE_HEADER: usize = 20;
/// Size of the PE32 optional header, including its data directories
pub const SIZEOF_OPTIONAL_HEADER32: usize = 224;
/// Size of the complete NT headers
pub const SIZEOF_NT_HEADERS32: usize =
    SIZEOF_PE_SIGNATURE + SIZEOF_FILE_HEADER + SIZEOF_OPTIONAL_HEADER32;
/// Size of a section table entry
pub const SIZEOF_SECTION_HEADER: usize = 40;
