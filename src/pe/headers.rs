use crate::{
    file::io::{read_array_at, read_at, write_array_at, write_at, Endian, StructIO},
    pe::{NUMBER_OF_DIRECTORY_ENTRIES, SIZEOF_DOS_HEADER, SIZEOF_FILE_HEADER, SIZEOF_NT_HEADERS32,
        SIZEOF_OPTIONAL_HEADER32},
    Result,
};

/// The legacy MS-DOS header (`IMAGE_DOS_HEADER`) found at offset 0 of every PE image.
///
/// Only [`DosHeader::file_address_of_new_exe_header`] (`e_lfanew`) is meaningful to a PE
/// loader; the remaining fields describe the real-mode stub program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DosHeader {
    /// `e_magic` - `MZ`
    pub magic: u16,
    /// `e_cblp` - Bytes on last page of file
    pub bytes_on_last_page: u16,
    /// `e_cp` - Pages in file
    pub pages_in_file: u16,
    /// `e_crlc` - Relocations
    pub relocations: u16,
    /// `e_cparhdr` - Size of header in paragraphs
    pub size_of_header_in_paragraphs: u16,
    /// `e_minalloc` - Minimum extra paragraphs needed
    pub minimum_extra_paragraphs: u16,
    /// `e_maxalloc` - Maximum extra paragraphs needed
    pub maximum_extra_paragraphs: u16,
    /// `e_ss` - Initial (relative) SS value
    pub initial_ss: u16,
    /// `e_sp` - Initial SP value
    pub initial_sp: u16,
    /// `e_csum` - Checksum
    pub checksum: u16,
    /// `e_ip` - Initial IP value
    pub initial_ip: u16,
    /// `e_cs` - Initial (relative) CS value
    pub initial_cs: u16,
    /// `e_lfarlc` - File address of relocation table
    pub address_of_relocation_table: u16,
    /// `e_ovno` - Overlay number
    pub overlay_number: u16,
    /// `e_res` - Reserved words
    pub reserved_words1: [u16; 4],
    /// `e_oemid` - OEM identifier
    pub oem_identifier: u16,
    /// `e_oeminfo` - OEM information
    pub oem_information: u16,
    /// `e_res2` - Reserved words
    pub reserved_words2: [u16; 10],
    /// `e_lfanew` - File address of the NT headers
    pub file_address_of_new_exe_header: u32,
}

impl StructIO for DosHeader {
    const NAME: &'static str = "IMAGE_DOS_HEADER";
    const SIZE: usize = SIZEOF_DOS_HEADER;

    fn struct_read(data: &[u8], offset: &mut usize, endian: Endian) -> Result<Self> {
        Ok(DosHeader {
            magic: read_at(data, offset, endian)?,
            bytes_on_last_page: read_at(data, offset, endian)?,
            pages_in_file: read_at(data, offset, endian)?,
            relocations: read_at(data, offset, endian)?,
            size_of_header_in_paragraphs: read_at(data, offset, endian)?,
            minimum_extra_paragraphs: read_at(data, offset, endian)?,
            maximum_extra_paragraphs: read_at(data, offset, endian)?,
            initial_ss: read_at(data, offset, endian)?,
            initial_sp: read_at(data, offset, endian)?,
            checksum: read_at(data, offset, endian)?,
            initial_ip: read_at(data, offset, endian)?,
            initial_cs: read_at(data, offset, endian)?,
            address_of_relocation_table: read_at(data, offset, endian)?,
            overlay_number: read_at(data, offset, endian)?,
            reserved_words1: read_array_at(data, offset, endian)?,
            oem_identifier: read_at(data, offset, endian)?,
            oem_information: read_at(data, offset, endian)?,
            reserved_words2: read_array_at(data, offset, endian)?,
            file_address_of_new_exe_header: read_at(data, offset, endian)?,
        })
    }

    fn struct_write(&self, data: &mut [u8], offset: &mut usize, endian: Endian) -> Result<()> {
        write_at(data, offset, self.magic, endian)?;
        write_at(data, offset, self.bytes_on_last_page, endian)?;
        write_at(data, offset, self.pages_in_file, endian)?;
        write_at(data, offset, self.relocations, endian)?;
        write_at(data, offset, self.size_of_header_in_paragraphs, endian)?;
        write_at(data, offset, self.minimum_extra_paragraphs, endian)?;
        write_at(data, offset, self.maximum_extra_paragraphs, endian)?;
        write_at(data, offset, self.initial_ss, endian)?;
        write_at(data, offset, self.initial_sp, endian)?;
        write_at(data, offset, self.checksum, endian)?;
        write_at(data, offset, self.initial_ip, endian)?;
        write_at(data, offset, self.initial_cs, endian)?;
        write_at(data, offset, self.address_of_relocation_table, endian)?;
        write_at(data, offset, self.overlay_number, endian)?;
        write_array_at(data, offset, &self.reserved_words1, endian)?;
        write_at(data, offset, self.oem_identifier, endian)?;
        write_at(data, offset, self.oem_information, endian)?;
        write_array_at(data, offset, &self.reserved_words2, endian)?;
        write_at(data, offset, self.file_address_of_new_exe_header, endian)
    }
}

/// The COFF file header (`IMAGE_FILE_HEADER`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileHeader {
    /// The architecture type of the computer
    pub machine: u16,
    /// The number of sections, i.e. the size of the section table
    pub number_of_sections: u16,
    /// The low 32 bits of the number of seconds since the Unix epoch at image creation
    pub time_date_stamp: u32,
    /// File offset of the COFF symbol table, zero for images
    pub pointer_to_symbol_table: u32,
    /// Number of entries in the symbol table
    pub number_of_symbols: u32,
    /// Size of the optional header that follows
    pub size_of_optional_header: u16,
    /// Image characteristic flags
    pub characteristics: u16,
}

impl StructIO for FileHeader {
    const NAME: &'static str = "IMAGE_FILE_HEADER";
    const SIZE: usize = SIZEOF_FILE_HEADER;

    fn struct_read(data: &[u8], offset: &mut usize, endian: Endian) -> Result<Self> {
        Ok(FileHeader {
            machine: read_at(data, offset, endian)?,
            number_of_sections: read_at(data, offset, endian)?,
            time_date_stamp: read_at(data, offset, endian)?,
            pointer_to_symbol_table: read_at(data, offset, endian)?,
            number_of_symbols: read_at(data, offset, endian)?,
            size_of_optional_header: read_at(data, offset, endian)?,
            characteristics: read_at(data, offset, endian)?,
        })
    }

    fn struct_write(&self, data: &mut [u8], offset: &mut usize, endian: Endian) -> Result<()> {
        write_at(data, offset, self.machine, endian)?;
        write_at(data, offset, self.number_of_sections, endian)?;
        write_at(data, offset, self.time_date_stamp, endian)?;
        write_at(data, offset, self.pointer_to_symbol_table, endian)?;
        write_at(data, offset, self.number_of_symbols, endian)?;
        write_at(data, offset, self.size_of_optional_header, endian)?;
        write_at(data, offset, self.characteristics, endian)
    }
}

/// An entry of the optional header data directory table (`IMAGE_DATA_DIRECTORY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataDirectory {
    /// RVA of the table
    pub virtual_address: u32,
    /// Size of the table in bytes
    pub size: u32,
}

impl DataDirectory {
    /// Creates a directory entry pointing at `virtual_address`
    #[must_use]
    pub fn new(virtual_address: u32, size: u32) -> Self {
        DataDirectory {
            virtual_address,
            size,
        }
    }

    /// Returns `true` if the entry does not point anywhere
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.virtual_address == 0 && self.size == 0
    }
}

impl StructIO for DataDirectory {
    const NAME: &'static str = "IMAGE_DATA_DIRECTORY";
    const SIZE: usize = 8;

    fn struct_read(data: &[u8], offset: &mut usize, endian: Endian) -> Result<Self> {
        Ok(DataDirectory {
            virtual_address: read_at(data, offset, endian)?,
            size: read_at(data, offset, endian)?,
        })
    }

    fn struct_write(&self, data: &mut [u8], offset: &mut usize, endian: Endian) -> Result<()> {
        write_at(data, offset, self.virtual_address, endian)?;
        write_at(data, offset, self.size, endian)
    }
}

/// The PE32 optional header (`IMAGE_OPTIONAL_HEADER32`), including its 16 data directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OptionalHeader32 {
    /// `0x10B` for PE32
    pub magic: u16,
    /// Linker major version
    pub major_linker_version: u8,
    /// Linker minor version
    pub minor_linker_version: u8,
    /// Combined size of all code sections
    pub size_of_code: u32,
    /// Combined size of all initialized data sections
    pub size_of_initialized_data: u32,
    /// Combined size of all uninitialized data sections
    pub size_of_uninitialized_data: u32,
    /// RVA of the entry point, zero when there is none
    pub address_of_entry_point: u32,
    /// RVA of the beginning of the code section
    pub base_of_code: u32,
    /// RVA of the beginning of the data section
    pub base_of_data: u32,
    /// Preferred load address, a multiple of 64K
    pub image_base: u32,
    /// In-memory alignment of sections
    pub section_alignment: u32,
    /// On-disk alignment of section raw data
    pub file_alignment: u32,
    /// Required operating system major version
    pub major_operating_system_version: u16,
    /// Required operating system minor version
    pub minor_operating_system_version: u16,
    /// Image major version
    pub major_image_version: u16,
    /// Image minor version
    pub minor_image_version: u16,
    /// Subsystem major version
    pub major_subsystem_version: u16,
    /// Subsystem minor version
    pub minor_subsystem_version: u16,
    /// Reserved, must be zero
    pub win32_version_value: u32,
    /// Size of the image in memory including all headers, a multiple of `section_alignment`
    pub size_of_image: u32,
    /// Combined size of all headers rounded to `file_alignment`
    pub size_of_headers: u32,
    /// Image checksum
    pub checksum: u32,
    /// Subsystem required to run the image
    pub subsystem: u16,
    /// DLL characteristic flags
    pub dll_characteristics: u16,
    /// Stack reservation size
    pub size_of_stack_reserve: u32,
    /// Stack commit size
    pub size_of_stack_commit: u32,
    /// Heap reservation size
    pub size_of_heap_reserve: u32,
    /// Heap commit size
    pub size_of_heap_commit: u32,
    /// Reserved, must be zero
    pub loader_flags: u32,
    /// Number of valid entries in `data_directory`
    pub number_of_rva_and_sizes: u32,
    /// The data directory table
    pub data_directory: [DataDirectory; NUMBER_OF_DIRECTORY_ENTRIES],
}

impl StructIO for OptionalHeader32 {
    const NAME: &'static str = "IMAGE_OPTIONAL_HEADER32";
    const SIZE: usize = SIZEOF_OPTIONAL_HEADER32;

    fn struct_read(data: &[u8], offset: &mut usize, endian: Endian) -> Result<Self> {
        let mut header = OptionalHeader32 {
            magic: read_at(data, offset, endian)?,
            major_linker_version: read_at(data, offset, endian)?,
            minor_linker_version: read_at(data, offset, endian)?,
            size_of_code: read_at(data, offset, endian)?,
            size_of_initialized_data: read_at(data, offset, endian)?,
            size_of_uninitialized_data: read_at(data, offset, endian)?,
            address_of_entry_point: read_at(data, offset, endian)?,
            base_of_code: read_at(data, offset, endian)?,
            base_of_data: read_at(data, offset, endian)?,
            image_base: read_at(data, offset, endian)?,
            section_alignment: read_at(data, offset, endian)?,
            file_alignment: read_at(data, offset, endian)?,
            major_operating_system_version: read_at(data, offset, endian)?,
            minor_operating_system_version: read_at(data, offset, endian)?,
            major_image_version: read_at(data, offset, endian)?,
            minor_image_version: read_at(data, offset, endian)?,
            major_subsystem_version: read_at(data, offset, endian)?,
            minor_subsystem_version: read_at(data, offset, endian)?,
            win32_version_value: read_at(data, offset, endian)?,
            size_of_image: read_at(data, offset, endian)?,
            size_of_headers: read_at(data, offset, endian)?,
            checksum: read_at(data, offset, endian)?,
            subsystem: read_at(data, offset, endian)?,
            dll_characteristics: read_at(data, offset, endian)?,
            size_of_stack_reserve: read_at(data, offset, endian)?,
            size_of_stack_commit: read_at(data, offset, endian)?,
            size_of_heap_reserve: read_at(data, offset, endian)?,
            size_of_heap_commit: read_at(data, offset, endian)?,
            loader_flags: read_at(data, offset, endian)?,
            number_of_rva_and_sizes: read_at(data, offset, endian)?,
            data_directory: [DataDirectory::default(); NUMBER_OF_DIRECTORY_ENTRIES],
        };

        for directory in &mut header.data_directory {
            *directory = DataDirectory::struct_read(data, offset, endian)?;
        }

        Ok(header)
    }

    fn struct_write(&self, data: &mut [u8], offset: &mut usize, endian: Endian) -> Result<()> {
        write_at(data, offset, self.magic, endian)?;
        write_at(data, offset, self.major_linker_version, endian)?;
        write_at(data, offset, self.minor_linker_version, endian)?;
        write_at(data, offset, self.size_of_code, endian)?;
        write_at(data, offset, self.size_of_initialized_data, endian)?;
        write_at(data, offset, self.size_of_uninitialized_data, endian)?;
        write_at(data, offset, self.address_of_entry_point, endian)?;
        write_at(data, offset, self.base_of_code, endian)?;
        write_at(data, offset, self.base_of_data, endian)?;
        write_at(data, offset, self.image_base, endian)?;
        write_at(data, offset, self.section_alignment, endian)?;
        write_at(data, offset, self.file_alignment, endian)?;
        write_at(data, offset, self.major_operating_system_version, endian)?;
        write_at(data, offset, self.minor_operating_system_version, endian)?;
        write_at(data, offset, self.major_image_version, endian)?;
        write_at(data, offset, self.minor_image_version, endian)?;
        write_at(data, offset, self.major_subsystem_version, endian)?;
        write_at(data, offset, self.minor_subsystem_version, endian)?;
        write_at(data, offset, self.win32_version_value, endian)?;
        write_at(data, offset, self.size_of_image, endian)?;
        write_at(data, offset, self.size_of_headers, endian)?;
        write_at(data, offset, self.checksum, endian)?;
        write_at(data, offset, self.subsystem, endian)?;
        write_at(data, offset, self.dll_characteristics, endian)?;
        write_at(data, offset, self.size_of_stack_reserve, endian)?;
        write_at(data, offset, self.size_of_stack_commit, endian)?;
        write_at(data, offset, self.size_of_heap_reserve, endian)?;
        write_at(data, offset, self.size_of_heap_commit, endian)?;
        write_at(data, offset, self.loader_flags, endian)?;
        write_at(data, offset, self.number_of_rva_and_sizes, endian)?;

        for directory in &self.data_directory {
            directory.struct_write(data, offset, endian)?;
        }

        Ok(())
    }
}

/// `IMAGE_NT_HEADERS32`: the PE signature followed by the file and optional headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NtHeaders32 {
    /// `PE\0\0`
    pub signature: u32,
    /// The COFF file header
    pub file_header: FileHeader,
    /// The PE32 optional header
    pub optional_header: OptionalHeader32,
}

impl StructIO for NtHeaders32 {
    const NAME: &'static str = "IMAGE_NT_HEADERS32";
    const SIZE: usize = SIZEOF_NT_HEADERS32;

    fn struct_read(data: &[u8], offset: &mut usize, endian: Endian) -> Result<Self> {
        Ok(NtHeaders32 {
            signature: read_at(data, offset, endian)?,
            file_header: FileHeader::struct_read(data, offset, endian)?,
            optional_header: OptionalHeader32::struct_read(data, offset, endian)?,
        })
    }

    fn struct_write(&self, data: &mut [u8], offset: &mut usize, endian: Endian) -> Result<()> {
        write_at(data, offset, self.signature, endian)?;
        self.file_header.struct_write(data, offset, endian)?;
        self.optional_header.struct_write(data, offset, endian)
    }
}
