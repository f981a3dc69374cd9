//! Conversion between PE assemblies and (WebAssembly-wrapped) Webcil payloads.
//!
//! # Architecture
//!
//! Both directions are stateless free functions. Every call builds its headers from scratch,
//! owns its intermediate buffers and borrows the caller's streams without closing them.
//!
//! - [`to_webcil`] - PE image to Webcil: strips the DOS/NT headers and section names, keeps the
//!   raw section bytes and optionally wraps the result into a WebAssembly module
//! - [`to_pe`] - Webcil to PE: unwraps the module if needed, synthesizes a PE32 header set and
//!   relocates the section bytes behind it
//! - [`batch`] - many independent conversions in parallel
//!
//! [`ConvertOptions`] carries the settings shared by both directions, [`Format`] tells the
//! three container kinds apart.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::{fs::File, path::Path};
//! use webcil::{convert_from_webcil_with, convert_to_webcil_with, ConvertOptions};
//!
//! let options = ConvertOptions::default().with_timestamp(0);
//! convert_to_webcil_with(Path::new("HelloWorld.dll"), Path::new("HelloWorld.wasm"), &options)?;
//!
//! let mut wasm = File::open("HelloWorld.wasm")?;
//! let pe = convert_from_webcil_with(&mut wasm, &options)?;
//! # Ok::<(), webcil::Error>(())
//! ```

pub mod batch;
pub mod to_pe;
pub mod to_webcil;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    file::io::StructIO,
    wasm::WASM_PREFIX,
    webcil::{WebcilHeader, WEBCIL_VERSION_MAJOR, WEBCIL_VERSION_MINOR},
};

/// Settings shared by both conversion directions.
///
/// # Examples
///
/// ```rust
/// use webcil::ConvertOptions;
///
/// let options = ConvertOptions::default()
///     .with_webassembly(false)
///     .with_timestamp(0x6543_2100);
///
/// assert!(!options.webassembly);
/// assert_eq!(options.timestamp(), 0x6543_2100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Wrap the Webcil payload into a WebAssembly module, or expect one when reading
    pub webassembly: bool,
    /// Fixed `TimeDateStamp` for reconstructed PE images; `None` uses the current time
    pub timestamp: Option<u32>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            webassembly: true,
            timestamp: None,
        }
    }
}

impl ConvertOptions {
    /// Creates the default options: WebAssembly wrapping, current time stamp
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether payloads are wrapped into / unwrapped from a WebAssembly module
    #[must_use]
    pub fn with_webassembly(mut self, webassembly: bool) -> Self {
        self.webassembly = webassembly;
        self
    }

    /// Pins the `TimeDateStamp` of reconstructed PE images, making the output reproducible
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Returns the configured time stamp, or the low 32 bits of the current Unix time
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        self.timestamp.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| elapsed.as_secs() as u32)
        })
    }
}

/// Container kind of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// A WebAssembly module, presumably wrapping a Webcil payload
    Wasm,
    /// A PE image starting with `MZ`
    Pe,
    /// A bare Webcil payload
    Webcil,
}

impl Format {
    /// Classifies `data` by its leading bytes.
    ///
    /// Webcil carries no signature; a buffer is taken as Webcil when its header parses with
    /// version 0.0 and a plausible section count.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use webcil::Format;
    ///
    /// assert_eq!(Format::detect(b"\0asm\x01\0\0\0"), Some(Format::Wasm));
    /// assert_eq!(Format::detect(b"MZ\x90\0"), Some(Format::Pe));
    /// assert_eq!(Format::detect(b"ELF"), None);
    /// ```
    #[must_use]
    pub fn detect(data: &[u8]) -> Option<Format> {
        if data.starts_with(&WASM_PREFIX[..4]) {
            return Some(Format::Wasm);
        }

        if data.starts_with(b"MZ") {
            return Some(Format::Pe);
        }

        let header = WebcilHeader::from_bytes(data).ok()?;
        if header.version_major == WEBCIL_VERSION_MAJOR
            && header.version_minor == WEBCIL_VERSION_MINOR
            && (1..=96).contains(&header.coff_sections)
        {
            return Some(Format::Webcil);
        }

        None
    }

    /// Returns the customary file extension
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Format::Wasm => "wasm",
            Format::Pe => "dll",
            Format::Webcil => "webcil",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Wasm => write!(f, "WebAssembly"),
            Format::Pe => write!(f, "PE"),
            Format::Webcil => write!(f, "Webcil"),
        }
    }
}

/// Rounds `value` to the nearest multiple of `alignment`; halfway values round up.
#[must_use]
pub fn round_to_nearest(value: u32, alignment: u32) -> u32 {
    let remainder = value % alignment;
    if remainder >= alignment / 2 {
        value + (alignment - remainder)
    } else {
        value - remainder
    }
}

/// Rounds `value` up to the next multiple of `alignment`.
#[must_use]
pub fn align_up(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment).saturating_mul(alignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(round_to_nearest(0, 512), 0);
        assert_eq!(round_to_nearest(255, 512), 0);
        assert_eq!(round_to_nearest(256, 512), 512);
        assert_eq!(round_to_nearest(496, 512), 512);
        assert_eq!(round_to_nearest(511, 512), 512);
        assert_eq!(round_to_nearest(512, 512), 512);
        assert_eq!(round_to_nearest(800, 512), 1024);

        assert_eq!(align_up(0, 0x2000), 0);
        assert_eq!(align_up(1, 0x2000), 0x2000);
        assert_eq!(align_up(0x800, 0x2000), 0x2000);
        assert_eq!(align_up(0x2000, 0x2000), 0x2000);
        assert_eq!(align_up(0x2001, 0x2000), 0x4000);
    }

    #[test]
    fn options() {
        let options = ConvertOptions::default();
        assert!(options.webassembly);
        assert_eq!(options.timestamp, None);
        assert!(options.timestamp() > 0);

        let options = ConvertOptions::new().with_webassembly(false).with_timestamp(7);
        assert!(!options.webassembly);
        assert_eq!(options.timestamp(), 7);
    }

    #[test]
    fn detect() {
        assert_eq!(Format::detect(&WASM_PREFIX), Some(Format::Wasm));
        assert_eq!(Format::detect(&[0x4D, 0x5A, 0x90, 0x00]), Some(Format::Pe));

        #[rustfmt::skip]
        let webcil = [
            0x00, 0x00, 0x00, 0x00,
            0x03, 0x00,
            0x08, 0x20, 0x00, 0x00, 0x48, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(Format::detect(&webcil), Some(Format::Webcil));

        let mut versioned = webcil;
        versioned[0] = 1;
        assert_eq!(Format::detect(&versioned), None);

        assert_eq!(Format::detect(&[]), None);
        assert_eq!(Format::detect(&webcil[..21]), None);
        assert_eq!(Format::Webcil.to_string(), "Webcil");
        assert_eq!(Format::Wasm.extension(), "wasm");
    }
}
