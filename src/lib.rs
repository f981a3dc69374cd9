// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # webcil
//!
//! Conversion between .NET PE assemblies and Webcil, the container format used to ship .NET
//! assemblies to the browser.
//!
//! Webcil strips a PE image down to its section data plus a small header, so that assemblies
//! do not trip over firewalls and anti-virus scanners that block Windows executables. For the
//! same reason it is usually wrapped into a minimal WebAssembly module whose last passive data
//! segment carries the payload.
//!
//! ## Features
//!
//! - **PE to Webcil** - Re-layout any .NET PE32/PE32+ image, optionally WebAssembly-wrapped
//! - **Webcil to PE** - Reconstruct a loadable PE32 image that standard metadata readers accept
//! - **Streaming** - Reads from any `Read + Seek` source and never closes caller streams
//! - **Metadata inspection** - Compare CLI header, metadata root and identifiers of two images
//! - **Batch conversion** - Convert many files in parallel
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::{fs, path::Path};
//! use webcil::prelude::*;
//!
//! // Publish: PE assembly to wrapped Webcil
//! convert_to_webcil(Path::new("HelloWorld.dll"), Path::new("HelloWorld.wasm"), true)?;
//!
//! // Inspect: wrapped Webcil back to a PE image
//! let mut wasm = fs::File::open("HelloWorld.wasm")?;
//! let pe = convert_from_webcil(&mut wasm, true)?;
//!
//! let summary = MetadataSummary::from_pe_bytes(pe)?;
//! println!("{} ({} identifiers)", summary.version, summary.identifiers.len());
//! # Ok::<(), webcil::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - PE access through `goblin` and bounds-checked binary I/O
//! - [`pe`] - PE32 header records written by the reconstruction
//! - [`webcil`] - Webcil header and section records
//! - [`wasm`] - WebAssembly wrapper and unwrapper
//! - [`convert`] - The conversions in both directions and batch processing
//! - [`metadata`] - CLI header, metadata root and `#Strings` heap inspection
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Logging
//!
//! The library logs through the [`log`] facade: one `debug` record per conversion step,
//! `trace` per section and `warn` for suspicious input. Install any logger to see them.
#[macro_use]
pub(crate) mod error;

pub mod file;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and functions.
///
/// # Example
///
/// ```rust,no_run
/// use webcil::prelude::*;
///
/// let file = File::from_file("HelloWorld.dll".as_ref())?;
/// let payload = pe_to_webcil(&file)?;
/// # Ok::<(), webcil::Error>(())
/// ```
pub mod prelude;

/// PE32 header records.
pub mod pe;

/// Webcil header records.
pub mod webcil;

/// WebAssembly wrapping of Webcil payloads.
pub mod wasm;

/// Conversion between PE and Webcil.
pub mod convert;

/// .NET metadata inspection.
pub mod metadata;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust,no_run
/// use webcil::{File, Result};
///
/// fn load_assembly(path: &str) -> Result<File> {
///     File::from_file(std::path::Path::new(path))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `webcil` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use webcil::{convert_from_webcil, Error};
///
/// let mut input = std::fs::File::open("HelloWorld.wasm")?;
/// match convert_from_webcil(&mut input, true) {
///     Ok(pe) => println!("Reconstructed {} bytes", pe.len()),
///     Err(Error::InvalidWasmPrefix) => println!("Not a WebAssembly module"),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub use error::Error;

/// The conversions and their options.
pub use convert::{
    to_pe::{convert_from_webcil, convert_from_webcil_with},
    to_webcil::{convert_to_webcil, convert_to_webcil_with, pe_to_webcil},
    ConvertOptions, Format,
};

/// Metadata identity of an assembly.
pub use metadata::MetadataSummary;

/// Low-level file and byte parsing.
pub use file::{parser::Parser, File};
