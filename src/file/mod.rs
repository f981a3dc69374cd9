//! PE file abstraction over disk and memory backends.
//!
//! [`File`] parses a Portable Executable with `goblin` and keeps the parsed view alive next to
//! the bytes it borrows from. It is the entry point of the PE to Webcil direction: the
//! converter walks [`File::sections`], looks up the CLI header and debug directories through
//! [`File::get_data_directory`] and copies raw section bytes with [`File::data_slice`].
//!
//! # Key Components
//!
//! - [`crate::file::File`] - Parsed PE image, guaranteed to carry a CLR runtime header
//! - [`crate::file::Backend`] - Trait for the data source (memory-mapped file, buffer)
//! - [`crate::file::io`] - Bounds-checked primitive and fixed-layout struct I/O
//!
//! # Examples
//!
//! ```rust,no_run
//! use webcil::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("HelloWorld.dll"))?;
//! for section in file.sections() {
//!     let name = std::str::from_utf8(&section.name)
//!         .unwrap_or("<invalid>")
//!         .trim_end_matches('\0');
//!     println!("{name}: RVA 0x{:x}, {} bytes", section.virtual_address, section.size_of_raw_data);
//! }
//!
//! let (clr_rva, clr_size) = file.clr();
//! let clr_offset = file.rva_to_offset(clr_rva as usize)?;
//! println!("CLI header at 0x{clr_offset:x}, {clr_size} bytes");
//! # Ok::<(), webcil::Error>(())
//! ```

pub mod io;

mod memory;
pub mod parser;
mod physical;

use std::path::Path;

use crate::{
    Error::{Empty, GoblinErr},
    Result,
};
use goblin::pe::{
    data_directories::DataDirectoryType, header::Header, section_table::SectionTable, PE,
};
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Backend abstraction for the bytes of a [`File`].
///
/// Implementations must be `Send + Sync` so that a loaded [`File`] can be handed to a worker
/// thread during batch conversion.
pub trait Backend: Send + Sync {
    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the complete data
    fn data(&self) -> &[u8];

    /// Returns the data length in bytes
    fn len(&self) -> usize;
}

/// A parsed PE image containing a .NET assembly.
#[self_referencing]
pub struct File {
    data: Box<dyn Backend>,
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Memory-maps and parses the file at `file`.
    ///
    /// # Errors
    /// - [`crate::Error::FileError`] if the file cannot be opened
    /// - [`crate::Error::Empty`] if the file is empty
    /// - [`crate::Error::GoblinErr`] if the file is not a valid PE image
    /// - [`crate::Error::Malformed`] if the image carries no CLR runtime header
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Parses a PE image held in memory.
    ///
    /// # Errors
    /// See [`File::from_file`].
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);

        File::try_new(data, |data| {
            let data = data.as_ref();
            match PE::parse(data.data()) {
                Ok(pe) => match pe.header.optional_header {
                    Some(optional_header) => {
                        if optional_header
                            .data_directories
                            .get_clr_runtime_header()
                            .is_none()
                        {
                            Err(malformed_error!(
                                "File does not have a CLR runtime header directory"
                            ))
                        } else {
                            Ok(pe)
                        }
                    }
                    None => Err(malformed_error!("File does not have an OptionalHeader")),
                },
                Err(error) => Err(GoblinErr(error)),
            }
        })
    }

    /// Returns the size of the image in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the image holds no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the parsed COFF and optional headers
    #[must_use]
    pub fn header(&self) -> &Header {
        self.with_pe(|pe| &pe.header)
    }

    /// Returns the section table in file order
    pub fn sections(&self) -> impl Iterator<Item = &SectionTable> {
        self.with_pe(|pe| pe.sections.iter())
    }

    /// Returns the number of entries in the section table
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.with_pe(|pe| pe.sections.len())
    }

    /// Returns RVA and size of the CLI header.
    ///
    /// Its presence was verified while loading.
    #[must_use]
    pub fn clr(&self) -> (u32, u32) {
        self.get_data_directory(DataDirectoryType::ClrRuntimeHeader)
            .unwrap_or_default()
    }

    /// Returns RVA and size of a data directory, `None` if it is absent or empty.
    #[must_use]
    pub fn get_data_directory(&self, dir_type: DataDirectoryType) -> Option<(u32, u32)> {
        self.with_pe(|pe| {
            pe.header
                .optional_header
                .as_ref()?
                .data_directories
                .dirs()
                .find(|(directory_type, directory)| {
                    *directory_type == dir_type
                        && directory.virtual_address != 0
                        && directory.size != 0
                })
                .map(|(_, directory)| (directory.virtual_address, directory.size))
        })
    }

    /// Returns the complete image
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Returns `len` bytes starting at file offset `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }

    /// Translates a relative virtual address into a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section maps `rva`, or a section header
    /// overflows the address space.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva_u32 =
            u32::try_from(rva).map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

        self.with_pe(|pe| {
            for section in &pe.sections {
                let Some(section_max) = section
                    .virtual_address
                    .checked_add(section.virtual_size.max(section.size_of_raw_data))
                else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        section.virtual_size
                    ));
                };

                if section.virtual_address <= rva_u32 && section_max > rva_u32 {
                    return Ok((rva - section.virtual_address as usize)
                        + section.pointer_to_raw_data as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - {}",
                rva
            ))
        })
    }

    /// Returns the raw on-disk bytes of `section`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the section data lies outside the image.
    pub fn section_data(&self, section: &SectionTable) -> Result<&[u8]> {
        self.data_slice(
            section.pointer_to_raw_data as usize,
            section.size_of_raw_data as usize,
        )
    }
}
