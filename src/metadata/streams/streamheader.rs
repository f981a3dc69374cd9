//! Stream headers of the metadata root.
//!
//! # Reference
//! - [ECMA-335 II.24.2.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::parser::Parser, Result};

/// Stream names the runtime recognizes. `#-` is the uncompressed table stream.
pub const VALID_STREAM_NAMES: [&str; 6] = ["#Strings", "#US", "#Blob", "#GUID", "#~", "#-"];

/// Name, offset and size of one metadata stream. The header is variable-length: the name is
/// null-terminated and padded to a 4 byte boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream from the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Stream name, at most 32 characters
    pub name: String,
}

impl StreamHeader {
    /// Reads one stream header and leaves `parser` on the next 4 byte boundary.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the header is truncated, or
    /// [`crate::Error::Malformed`] for an unknown stream name.
    pub fn read(parser: &mut Parser) -> Result<StreamHeader> {
        let offset = parser.read_le::<u32>()?;
        let size = parser.read_le::<u32>()?;
        let name = parser.read_string_utf8()?;
        parser.align(4)?;

        if name.len() > 32 || !VALID_STREAM_NAMES.contains(&name.as_str()) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        Ok(StreamHeader { offset, size, name })
    }
}
