//! Metadata root (`BSJB`) header and stream directory.
//!
//! # Example
//!
//! ```rust
//! use webcil::metadata::root::Root;
//!
//! let root = Root::read(&[
//!     0x42, 0x53, 0x4A, 0x42,
//!     0x01, 0x00,
//!     0x01, 0x00,
//!     0x00, 0x00, 0x00, 0x00,
//!     0x04, 0x00, 0x00, 0x00,
//!     b'v', b'4', b'.', 0x00,
//!     0x00, 0x00,
//!     0x01, 0x00,
//!     0x20, 0x00, 0x00, 0x00, // StreamHeader
//!     0x01, 0x00, 0x00, 0x00,
//!     0x23, 0x7E, 0x00, 0x00,
//!     0x00,
//! ])?;
//! assert_eq!(root.version, "v4.");
//! assert_eq!(root.stream_headers[0].name, "#~");
//! # Ok::<(), webcil::Error>(())
//! ```
//!
//! # References
//!
//! - [ECMA-335 II.24.2.1: Metadata root](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::parser::Parser, metadata::streams::StreamHeader, Error::OutOfBounds, Result};

/// `BSJB`, the metadata root signature
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// The metadata root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    /// Always [`CIL_HEADER_MAGIC`]
    pub signature: u32,
    /// Major version, 1
    pub major_version: u16,
    /// Minor version, 1
    pub minor_version: u16,
    /// Reserved, 0
    pub reserved: u32,
    /// Length of the padded version string field
    pub length: u32,
    /// Runtime version the assembly was compiled against, e.g. `v4.0.30319`
    pub version: String,
    /// Reserved, 0
    pub flags: u16,
    /// Number of stream headers
    pub stream_number: u16,
    /// The stream directory
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Reads the metadata root at the start of `data`, which must span the whole metadata
    /// blob so stream ranges can be validated.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a wrong signature, an invalid stream directory
    /// or streams exceeding `data`, and [`crate::Error::OutOfBounds`] if `data` is truncated.
    pub fn read(data: &[u8]) -> Result<Root> {
        let mut parser = Parser::new(data);

        let signature = parser.read_le::<u32>()?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - 0x{:08X}",
                signature
            ));
        }

        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let reserved = parser.read_le::<u32>()?;
        let length = parser.read_le::<u32>()?;

        let version_bytes = parser.read_bytes(length as usize)?;
        let version_end = version_bytes
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(version_bytes.len());
        let version = String::from_utf8(version_bytes[..version_end].to_vec())
            .map_err(|_| malformed_error!("Metadata version string is not valid UTF-8"))?;

        let flags = parser.read_le::<u16>()?;
        let stream_number = parser.read_le::<u16>()?;
        if stream_number == 0 || stream_number > 8 {
            return Err(malformed_error!("Invalid stream count - {}", stream_number));
        }

        let mut stream_headers = Vec::with_capacity(stream_number as usize);
        for _ in 0..stream_number {
            let stream = StreamHeader::read(&mut parser)?;

            match stream.offset.checked_add(stream.size) {
                Some(end) if end as usize <= data.len() => {}
                Some(_) => return Err(OutOfBounds),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        stream.offset,
                        stream.size
                    ))
                }
            }

            if stream_headers
                .iter()
                .any(|existing: &StreamHeader| existing.name == stream.name)
            {
                return Err(malformed_error!("Duplicate stream - {}", stream.name));
            }

            stream_headers.push(stream);
        }

        Ok(Root {
            signature,
            major_version,
            minor_version,
            reserved,
            length,
            version,
            flags,
            stream_number,
            stream_headers,
        })
    }

    /// Returns the header of the stream called `name`
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|stream| stream.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00,
            0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x0C, 0x00, 0x00, 0x00,
            b'v', b'4', b'.', b'0', b'.', b'3', b'0', b'3', b'1', b'9', 0x00, 0x00,
            0x00, 0x00,
            0x02, 0x00,

            0x38, 0x00, 0x00, 0x00, // StreamHeader
            0x04, 0x00, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,

            0x3C, 0x00, 0x00, 0x00, // StreamHeader
            0x04, 0x00, 0x00, 0x00,
            b'#', b'S', b't', b'r', b'i', b'n', b'g', b's', 0x00, 0x00, 0x00, 0x00,

            0x00, 0x00, 0x00, 0x00,
            0x00, b'A', 0x00, 0x00,
        ];

        let root = Root::read(&header_bytes).unwrap();

        assert_eq!(root.signature, CIL_HEADER_MAGIC);
        assert_eq!(root.major_version, 1);
        assert_eq!(root.minor_version, 1);
        assert_eq!(root.length, 12);
        assert_eq!(root.version, "v4.0.30319");
        assert_eq!(root.stream_number, 2);
        assert_eq!(root.stream_headers[0].name, "#~");
        assert_eq!(root.stream_headers[0].offset, 0x38);
        assert_eq!(root.stream("#Strings").unwrap().offset, 0x3C);
        assert!(root.stream("#Blob").is_none());
    }

    #[test]
    fn crafted_invalid() {
        let mut header_bytes = [0u8; 40];
        header_bytes[0..4].copy_from_slice(b"BSJA");
        assert!(matches!(
            Root::read(&header_bytes),
            Err(crate::Error::Malformed { .. })
        ));

        // Stream past the end of the metadata
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00, 0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
            0x01, 0x00,
            0x10, 0x00, 0x00, 0x00,
            0x40, 0x00, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,
        ];
        assert!(Root::read(&header_bytes).is_err());
    }
}
