//! The Webcil container: a PE image with every header stripped except the section table.
//!
//! A Webcil payload starts with a 22 byte [`WebcilHeader`], followed by
//! [`WebcilHeader::coff_sections`] 16 byte [`WebcilSectionHeader`] records and the raw section
//! bytes they address. All fields are stored little-endian on disk; the
//! [`crate::file::io::Endian`] passed to the readers decides whether a byte swap happens.
//!
//! ```text
//! offset 0:  u16 version_major
//! offset 2:  u16 version_minor
//! offset 4:  u16 coff_sections
//! offset 6:  u32 pe_cli_header_rva
//! offset 10: u32 pe_cli_header_size
//! offset 14: u32 pe_debug_rva
//! offset 18: u32 pe_debug_size
//! offset 22: coff_sections x WebcilSectionHeader
//! ```
//!
//! Sections are always emitted in PE order, which for .NET assemblies is code (`.text`),
//! resources (`.rsrc`) and base relocations (`.reloc`).

use crate::{
    file::io::{read_at, write_at, Endian, StructIO},
    Result,
};

/// Major version written into new Webcil payloads
pub const WEBCIL_VERSION_MAJOR: u16 = 0;
/// Minor version written into new Webcil payloads
pub const WEBCIL_VERSION_MINOR: u16 = 0;

/// Number of sections a Webcil payload of a .NET assembly carries
pub const WEBCIL_SECTION_COUNT: u16 = 3;

/// Index of the code section
pub const SECTION_TEXT: usize = 0;
/// Index of the resource section
pub const SECTION_RSRC: usize = 1;
/// Index of the base relocation section
pub const SECTION_RELOC: usize = 2;

/// The fixed header at the start of every Webcil payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WebcilHeader {
    /// Format major version
    pub version_major: u16,
    /// Format minor version
    pub version_minor: u16,
    /// Number of section headers following this header
    pub coff_sections: u16,
    /// RVA of the CLI header
    pub pe_cli_header_rva: u32,
    /// Size of the CLI header
    pub pe_cli_header_size: u32,
    /// RVA of the debug directory
    pub pe_debug_rva: u32,
    /// Size of the debug directory
    pub pe_debug_size: u32,
}

impl WebcilHeader {
    /// Returns a copy with the byte order of every field reversed.
    #[must_use]
    pub fn swap_bytes(&self) -> Self {
        WebcilHeader {
            version_major: self.version_major.swap_bytes(),
            version_minor: self.version_minor.swap_bytes(),
            coff_sections: self.coff_sections.swap_bytes(),
            pe_cli_header_rva: self.pe_cli_header_rva.swap_bytes(),
            pe_cli_header_size: self.pe_cli_header_size.swap_bytes(),
            pe_debug_rva: self.pe_debug_rva.swap_bytes(),
            pe_debug_size: self.pe_debug_size.swap_bytes(),
        }
    }
}

impl StructIO for WebcilHeader {
    const NAME: &'static str = "WebcilHeader";
    const SIZE: usize = 22;

    fn struct_read(data: &[u8], offset: &mut usize, endian: Endian) -> Result<Self> {
        Ok(WebcilHeader {
            version_major: read_at(data, offset, endian)?,
            version_minor: read_at(data, offset, endian)?,
            coff_sections: read_at(data, offset, endian)?,
            pe_cli_header_rva: read_at(data, offset, endian)?,
            pe_cli_header_size: read_at(data, offset, endian)?,
            pe_debug_rva: read_at(data, offset, endian)?,
            pe_debug_size: read_at(data, offset, endian)?,
        })
    }

    fn struct_write(&self, data: &mut [u8], offset: &mut usize, endian: Endian) -> Result<()> {
        write_at(data, offset, self.version_major, endian)?;
        write_at(data, offset, self.version_minor, endian)?;
        write_at(data, offset, self.coff_sections, endian)?;
        write_at(data, offset, self.pe_cli_header_rva, endian)?;
        write_at(data, offset, self.pe_cli_header_size, endian)?;
        write_at(data, offset, self.pe_debug_rva, endian)?;
        write_at(data, offset, self.pe_debug_size, endian)
    }
}

/// A section table entry, reduced to the four fields needed to map the section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WebcilSectionHeader {
    /// Size of the section when loaded into memory
    pub virtual_size: u32,
    /// RVA of the section
    pub virtual_address: u32,
    /// Size of the section data in the payload
    pub size_of_raw_data: u32,
    /// Offset of the section data from the start of the payload
    pub pointer_to_raw_data: u32,
}

impl WebcilSectionHeader {
    /// Returns a copy with the byte order of every field reversed.
    #[must_use]
    pub fn swap_bytes(&self) -> Self {
        WebcilSectionHeader {
            virtual_size: self.virtual_size.swap_bytes(),
            virtual_address: self.virtual_address.swap_bytes(),
            size_of_raw_data: self.size_of_raw_data.swap_bytes(),
            pointer_to_raw_data: self.pointer_to_raw_data.swap_bytes(),
        }
    }

    /// Returns `true` if `rva` falls into the in-memory range of this section
    #[must_use]
    pub fn contains_rva(&self, rva: u32) -> bool {
        let size = self.virtual_size.max(self.size_of_raw_data);
        rva >= self.virtual_address
            && u64::from(rva) < u64::from(self.virtual_address) + u64::from(size)
    }
}

impl StructIO for WebcilSectionHeader {
    const NAME: &'static str = "WebcilSectionHeader";
    const SIZE: usize = 16;

    fn struct_read(data: &[u8], offset: &mut usize, endian: Endian) -> Result<Self> {
        Ok(WebcilSectionHeader {
            virtual_size: read_at(data, offset, endian)?,
            virtual_address: read_at(data, offset, endian)?,
            size_of_raw_data: read_at(data, offset, endian)?,
            pointer_to_raw_data: read_at(data, offset, endian)?,
        })
    }

    fn struct_write(&self, data: &mut [u8], offset: &mut usize, endian: Endian) -> Result<()> {
        write_at(data, offset, self.virtual_size, endian)?;
        write_at(data, offset, self.virtual_address, endian)?;
        write_at(data, offset, self.size_of_raw_data, endian)?;
        write_at(data, offset, self.pointer_to_raw_data, endian)
    }
}
