//! CLR 2.0 (Cor20) header of a .NET assembly.
//!
//! The header is the target of the `IMAGE_DIRECTORY_ENTRY_COM_DESCRIPTOR` data directory and
//! of [`crate::webcil::WebcilHeader::pe_cli_header_rva`]. It locates the metadata root and
//! is the first structure checked when proving that a reconstructed PE still describes the
//! same assembly.
//!
//! # Reference
//! - [ECMA-335 II.25.3.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    file::io::{read_at, write_at, Endian, StructIO},
    Result,
};

/// Serialized size of the CLI header
pub const COR20_HEADER_SIZE: usize = 72;

/// The CLI header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct Cor20Header {
    pub cb: u32,
    pub major_runtime_version: u16,
    pub minor_runtime_version: u16,
    pub meta_data_rva: u32,
    pub meta_data_size: u32,
    pub flags: u32,
    pub entry_point_token: u32,
    pub resource_rva: u32,
    pub resource_size: u32,
    pub strong_name_signature_rva: u32,
    pub strong_name_signature_size: u32,
    pub code_manager_table_rva: u32,
    pub code_manager_table_size: u32,
    pub vtable_fixups_rva: u32,
    pub vtable_fixups_size: u32,
    pub export_address_table_jmp_rva: u32,
    pub export_address_table_jmp_size: u32,
    pub managed_native_header_rva: u32,
    pub managed_native_header_size: u32,
}

impl Cor20Header {
    /// Reads and validates a CLI header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 72 bytes are available, or
    /// [`crate::Error::Malformed`] if the size field, runtime version or metadata location
    /// are invalid.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        let header = Cor20Header::from_bytes(data)?;

        if header.cb as usize != COR20_HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                header.cb
            ));
        }

        if header.major_runtime_version == 0 || header.major_runtime_version > 10 {
            return Err(malformed_error!(
                "Invalid major runtime version: {}",
                header.major_runtime_version
            ));
        }

        if header.meta_data_rva == 0 {
            return Err(malformed_error!("Metadata RVA cannot be zero"));
        }

        if header.meta_data_size == 0 {
            return Err(malformed_error!("Metadata size cannot be zero"));
        } else if header.meta_data_size > 0x1000_0000 {
            return Err(malformed_error!(
                "Metadata size {} exceeds reasonable limit (256MB)",
                header.meta_data_size
            ));
        }

        Ok(header)
    }
}

impl StructIO for Cor20Header {
    const NAME: &'static str = "IMAGE_COR20_HEADER";
    const SIZE: usize = COR20_HEADER_SIZE;

    fn struct_read(data: &[u8], offset: &mut usize, endian: Endian) -> Result<Self> {
        Ok(Cor20Header {
            cb: read_at(data, offset, endian)?,
            major_runtime_version: read_at(data, offset, endian)?,
            minor_runtime_version: read_at(data, offset, endian)?,
            meta_data_rva: read_at(data, offset, endian)?,
            meta_data_size: read_at(data, offset, endian)?,
            flags: read_at(data, offset, endian)?,
            entry_point_token: read_at(data, offset, endian)?,
            resource_rva: read_at(data, offset, endian)?,
            resource_size: read_at(data, offset, endian)?,
            strong_name_signature_rva: read_at(data, offset, endian)?,
            strong_name_signature_size: read_at(data, offset, endian)?,
            code_manager_table_rva: read_at(data, offset, endian)?,
            code_manager_table_size: read_at(data, offset, endian)?,
            vtable_fixups_rva: read_at(data, offset, endian)?,
            vtable_fixups_size: read_at(data, offset, endian)?,
            export_address_table_jmp_rva: read_at(data, offset, endian)?,
            export_address_table_jmp_size: read_at(data, offset, endian)?,
            managed_native_header_rva: read_at(data, offset, endian)?,
            managed_native_header_size: read_at(data, offset, endian)?,
        })
    }

    fn struct_write(&self, data: &mut [u8], offset: &mut usize, endian: Endian) -> Result<()> {
        write_at(data, offset, self.cb, endian)?;
        write_at(data, offset, self.major_runtime_version, endian)?;
        write_at(data, offset, self.minor_runtime_version, endian)?;
        write_at(data, offset, self.meta_data_rva, endian)?;
        write_at(data, offset, self.meta_data_size, endian)?;
        write_at(data, offset, self.flags, endian)?;
        write_at(data, offset, self.entry_point_token, endian)?;
        write_at(data, offset, self.resource_rva, endian)?;
        write_at(data, offset, self.resource_size, endian)?;
        write_at(data, offset, self.strong_name_signature_rva, endian)?;
        write_at(data, offset, self.strong_name_signature_size, endian)?;
        write_at(data, offset, self.code_manager_table_rva, endian)?;
        write_at(data, offset, self.code_manager_table_size, endian)?;
        write_at(data, offset, self.vtable_fixups_rva, endian)?;
        write_at(data, offset, self.vtable_fixups_size, endian)?;
        write_at(data, offset, self.export_address_table_jmp_rva, endian)?;
        write_at(data, offset, self.export_address_table_jmp_size, endian)?;
        write_at(data, offset, self.managed_native_header_rva, endian)?;
        write_at(data, offset, self.managed_native_header_size, endian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    const HEADER_BYTES: [u8; 72] = [
        0x48, 0x00, 0x00, 0x00,
        0x02, 0x00,
        0x05, 0x00,
        0x50, 0x20, 0x00, 0x00,
        0xC8, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn crafted() {
        let header = Cor20Header::read(&HEADER_BYTES).unwrap();

        assert_eq!(header.cb, 0x48);
        assert_eq!(header.major_runtime_version, 2);
        assert_eq!(header.minor_runtime_version, 5);
        assert_eq!(header.meta_data_rva, 0x2050);
        assert_eq!(header.meta_data_size, 0xC8);
        assert_eq!(header.flags, 1);
        assert_eq!(header.entry_point_token, 0);

        assert_eq!(header.to_bytes().unwrap(), HEADER_BYTES);
    }

    #[test]
    fn crafted_invalid() {
        let mut bytes = HEADER_BYTES;
        bytes[0] = 0x40;
        assert!(Cor20Header::read(&bytes).is_err());

        let mut bytes = HEADER_BYTES;
        bytes[8..12].fill(0);
        assert!(Cor20Header::read(&bytes).is_err());

        assert!(matches!(
            Cor20Header::read(&HEADER_BYTES[..71]),
            Err(crate::Error::OutOfBounds)
        ));
    }
}
