//! The `#Strings` heap.
//!
//! UTF-8 identifiers referenced by the metadata tables. The heap starts with an empty string
//! at index 0 and every entry is null-terminated.
//!
//! # Reference
//! - [ECMA-335 II.24.2.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::ffi::CStr;

use crate::{Error::OutOfBounds, Result};

/// View over a `#Strings` heap.
///
/// # Examples
///
/// ```rust
/// use webcil::metadata::streams::Strings;
///
/// let data = [0u8, b'H', b'e', b'l', b'l', b'o', 0u8];
/// let strings = Strings::from(&data)?;
/// assert_eq!(strings.get(1)?, "Hello");
/// assert_eq!(strings.iter().collect::<Vec<_>>(), vec![(1, "Hello")]);
/// # Ok::<(), webcil::Error>(())
/// ```
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wraps the heap bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap is empty or does not start with the
    /// empty string.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #String heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Returns the string starting at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for an index past the heap, or
    /// [`crate::Error::Malformed`] if the entry is unterminated or not UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        CStr::from_bytes_until_nul(&self.data[index..])
            .ok()
            .and_then(|entry| entry.to_str().ok())
            .ok_or_else(|| malformed_error!("Invalid string at index - {}", index))
    }

    /// Iterates the non-empty entries as `(index, string)` pairs, stopping at the padding
    /// or the first malformed entry.
    #[must_use]
    pub fn iter(&self) -> StringsIterator<'a> {
        StringsIterator {
            strings: Strings { data: self.data },
            position: 1,
        }
    }
}

/// Iterator over the entries of a [`Strings`] heap
pub struct StringsIterator<'a> {
    strings: Strings<'a>,
    position: usize,
}

impl<'a> Iterator for StringsIterator<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.position;
        let entry = self.strings.get(index).ok()?;
        if entry.is_empty() {
            return None;
        }

        self.position += entry.len() + 1;
        Some((index, entry))
    }
}
