//! # webcil Prelude
//!
//! The types and functions needed for everyday conversions, for glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all webcil operations
pub use crate::Error;

/// The result type used throughout webcil
pub use crate::Result;

/// Low-level file parsing utilities
pub use crate::{File, Parser};

// ================================================================================================
// Conversion
// ================================================================================================

/// PE to Webcil
pub use crate::{convert_to_webcil, convert_to_webcil_with, pe_to_webcil};

/// Webcil to PE
pub use crate::{convert_from_webcil, convert_from_webcil_with};

/// Settings and container detection
pub use crate::{ConvertOptions, Format};

/// Parallel conversion
pub use crate::convert::batch::{convert_batch, BatchJob, Direction};

// ================================================================================================
// Container Formats
// ================================================================================================

/// Webcil records
pub use crate::webcil::{WebcilHeader, WebcilSectionHeader};

/// WebAssembly wrapping
pub use crate::wasm::{WasmWebcilUnwrapper, WasmWebcilWrapper};

// ================================================================================================
// Metadata
// ================================================================================================

/// Metadata identity of an assembly
pub use crate::metadata::MetadataSummary;

/// Metadata root constants
pub use crate::metadata::root::CIL_HEADER_MAGIC;
