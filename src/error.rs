use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure is deterministic: a malformed container will fail the same way on every
/// attempt, so none of these variants carry retry semantics. A failure aborts the single
/// conversion in progress and nothing else.
///
/// # Error Categories
///
/// ## WebAssembly Wrapper Errors
/// - [`Error::TruncatedWasmPrefix`] - The input ended before the module preamble
/// - [`Error::InvalidWasmPrefix`] - The module preamble did not match
/// - [`Error::MissingDataSection`] - No Data section (id 11) was found
/// - [`Error::UnexpectedSegmentCode`] - A data segment was not passive
/// - [`Error::EmptyDataSection`] - The Data section holds no segments
/// - [`Error::Leb128Overflow`] - A LEB128 value does not fit into 32 bits
///
/// ## Container Errors
/// - [`Error::TruncatedStruct`] - Fewer bytes available than a fixed header needs
/// - [`Error::UnexpectedSectionCount`] - Webcil payload without the code/resource/reloc triple
/// - [`Error::Malformed`] - Corrupted or inconsistent file structure
/// - [`Error::OutOfBounds`] - Attempted to read or write beyond a buffer
/// - [`Error::NotSupported`] - Unsupported file format or feature
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem and stream I/O errors
/// - [`Error::GoblinErr`] - PE parsing errors from the goblin crate
///
/// # Examples
///
/// ```rust,no_run
/// use std::fs::File;
/// use webcil::{convert_from_webcil, Error};
///
/// let mut input = File::open("System.Private.CoreLib.wasm")?;
/// match convert_from_webcil(&mut input, true) {
///     Ok(pe) => println!("Reconstructed {} bytes", pe.len()),
///     Err(Error::InvalidWasmPrefix) => eprintln!("Not a WebAssembly module"),
///     Err(Error::MissingDataSection) => eprintln!("Module carries no payload"),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The stream ended before the 8-byte WebAssembly preamble could be read.
    #[error("Unable to read Wasm prefix.")]
    TruncatedWasmPrefix,

    /// The stream does not start with the WebAssembly magic and version.
    #[error("Invalid Wasm prefix.")]
    InvalidWasmPrefix,

    /// The stream ended while scanning for the Data section.
    #[error("Unable to read Data Section.")]
    MissingDataSection,

    /// A data segment used a mode other than passive (`1`).
    #[error("Unexpected segment code for segment {index}.")]
    UnexpectedSegmentCode {
        /// Index of the offending segment
        index: u32,
        /// The mode byte that was found
        code: u8,
    },

    /// The Data section was found, but declares no segments.
    #[error("Unable to read DataSection.")]
    EmptyDataSection,

    /// An unsigned LEB128 value exceeded the 32-bit range.
    #[error("LEB128 value does not fit into 32 bits")]
    Leb128Overflow,

    /// Fewer bytes were available than a fixed-layout structure requires.
    ///
    /// Structures are never zero-filled on a short read.
    #[error("Couldn't read the full structure {name} from the stream - expected {expected} bytes")]
    TruncatedStruct {
        /// Name of the structure being read
        name: &'static str,
        /// The serialized size of the structure
        expected: usize,
    },

    /// A Webcil payload did not declare exactly the code, resource and relocation sections.
    #[error("Expected 3 Webcil sections (code, resources, relocations), found {0}")]
    UnexpectedSectionCount(u16),

    /// The file is damaged and could not be parsed.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors from reading or writing files and streams.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),
}
