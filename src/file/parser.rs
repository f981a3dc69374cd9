//! Cursor-based byte parser for the metadata structures inside a PE image.
//!
//! The CLI header, the metadata root and its stream headers are variable-length records
//! (null-terminated, 4-byte padded names and version strings), which do not fit the
//! fixed-layout [`crate::file::io::StructIO`] model. [`Parser`] walks them with a position
//! cursor; every read is bounds-checked.

use crate::{
    file::io::{read_le_at, CilIO},
    Error::OutOfBounds,
    Result,
};

/// A bounds-checked reader over a borrowed byte slice.
///
/// # Examples
///
/// ```rust
/// use webcil::Parser;
///
/// let data = [0x42, 0x53, 0x4A, 0x42, 0x01, 0x00];
/// let mut parser = Parser::new(&data);
///
/// assert_eq!(parser.read_le::<u32>()?, 0x424A_5342);
/// assert_eq!(parser.read_le::<u16>()?, 1);
/// assert!(!parser.has_more_data());
/// # Ok::<(), webcil::Error>(())
/// ```
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser positioned at the start of `data`
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if unread bytes remain
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Returns the current position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Moves the cursor to `pos`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies beyond the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Skips `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `step` bytes remain.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let end = self.calc_end_position(step)?;
        self.position = end;
        Ok(())
    }

    /// Skips padding up to the next multiple of `alignment`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the padding runs past the data.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Reads a little-endian `T` and advances past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Reads `length` raw bytes and advances past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Reads a null-terminated UTF-8 string and advances past the terminator.
    ///
    /// A string running to the end of the data without a terminator is accepted.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the bytes are not valid UTF-8.
    pub fn read_string_utf8(&mut self) -> Result<String> {
        let start = self.position;
        let remaining = &self.data[start..];
        let length = remaining
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(remaining.len());

        let string_data = &remaining[..length];
        self.position = (start + length + 1).min(self.data.len());

        String::from_utf8(string_data.to_vec()).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                start + length,
                e.utf8_error()
            )
        })
    }

    fn calc_end_position(&self, length: usize) -> Result<usize> {
        match self.position.checked_add(length) {
            Some(end) if end <= self.data.len() => Ok(end),
            _ => Err(OutOfBounds),
        }
    }
}
