//! Metadata stream directory and the `#Strings` heap.
//!
//! A converted image only needs to prove that it still carries the same metadata, so just the
//! pieces required for that are modelled here:
//!
//! - [`StreamHeader`] - name, offset and size of each stream listed by the metadata root
//! - [`Strings`] - the UTF-8 identifier heap, used to compare type and member names
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24.2.2 - Stream Headers

mod streamheader;
mod strings;

pub use streamheader::{StreamHeader, VALID_STREAM_NAMES};
pub use strings::{Strings, StringsIterator};
