use crate::{
    file::io::{read_array_at, read_at, write_array_at, write_at, Endian, StructIO},
    pe::SIZEOF_SECTION_HEADER,
    Result,
};

/// An entry of the section table (`IMAGE_SECTION_HEADER`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionHeader {
    /// 8-byte, null-padded section name
    pub name: [u8; 8],
    /// Total size of the section when loaded into memory
    pub virtual_size: u32,
    /// RVA of the first byte of the section
    pub virtual_address: u32,
    /// Size of the initialized data on disk
    pub size_of_raw_data: u32,
    /// File offset of the section data
    pub pointer_to_raw_data: u32,
    /// File offset of the relocation entries, zero for images
    pub pointer_to_relocations: u32,
    /// File offset of the line-number entries, zero for images
    pub pointer_to_linenumbers: u32,
    /// Number of relocation entries
    pub number_of_relocations: u16,
    /// Number of line-number entries
    pub number_of_linenumbers: u16,
    /// Section flags
    pub characteristics: u32,
}

impl SectionHeader {
    /// Returns the section name with trailing NUL padding removed.
    ///
    /// Names that are not valid UTF-8 yield `None`.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        std::str::from_utf8(&self.name)
            .ok()
            .map(|name| name.trim_end_matches('\0'))
    }
}

impl StructIO for SectionHeader {
    const NAME: &'static str = "IMAGE_SECTION_HEADER";
    const SIZE: usize = SIZEOF_SECTION_HEADER;

    fn struct_read(data: &[u8], offset: &mut usize, endian: Endian) -> Result<Self> {
        Ok(SectionHeader {
            name: read_array_at(data, offset, endian)?,
            virtual_size: read_at(data, offset, endian)?,
            virtual_address: read_at(data, offset, endian)?,
            size_of_raw_data: read_at(data, offset, endian)?,
            pointer_to_raw_data: read_at(data, offset, endian)?,
            pointer_to_relocations: read_at(data, offset, endian)?,
            pointer_to_linenumbers: read_at(data, offset, endian)?,
            number_of_relocations: read_at(data, offset, endian)?,
            number_of_linenumbers: read_at(data, offset, endian)?,
            characteristics: read_at(data, offset, endian)?,
        })
    }

    fn struct_write(&self, data: &mut [u8], offset: &mut usize, endian: Endian) -> Result<()> {
        write_array_at(data, offset, &self.name, endian)?;
        write_at(data, offset, self.virtual_size, endian)?;
        write_at(data, offset, self.virtual_address, endian)?;
        write_at(data, offset, self.size_of_raw_data, endian)?;
        write_at(data, offset, self.pointer_to_raw_data, endian)?;
        write_at(data, offset, self.pointer_to_relocations, endian)?;
        write_at(data, offset, self.pointer_to_linenumbers, endian)?;
        write_at(data, offset, self.number_of_relocations, endian)?;
        write_at(data, offset, self.number_of_linenumbers, endian)?;
        write_at(data, offset, self.characteristics, endian)
    }
}
