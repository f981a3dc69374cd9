//! Carrying a Webcil payload inside a WebAssembly module.
//!
//! Browsers and CDNs treat `.wasm` files as opaque binaries, which makes them a convenient
//! envelope for .NET assemblies. The payload is stored as the last passive data segment of a
//! minimal module; a passive segment is never copied into linear memory at instantiation, the
//! host pulls it out on demand through the exported `getWebcilPayload` function.
//!
//! # Module layout
//!
//! [`WasmWebcilWrapper`] emits, in order:
//!
//! | Id | Section | Content |
//! |---|---|---|
//! | 1 | type | `(i32) -> ()`, `(i32, i32) -> ()` |
//! | 2 | import | `webcil.memory`, at least one page |
//! | 3 | function | two functions using the types above |
//! | 6 | global | immutable `i32` Webcil version |
//! | 7 | export | `webcilVersion`, `getWebcilSize`, `getWebcilPayload` |
//! | 12 | datacount | 2 |
//! | 10 | code | two `memory.init` bodies |
//! | 11 | data | payload size (4 bytes LE), payload |
//!
//! [`WasmWebcilUnwrapper`] accepts any module whose data section ends with a passive segment:
//! it skips every section up to the data section and copies out the last segment verbatim.

use std::io::{self, Read, Write};

use log::{debug, trace};

use crate::{Error, Result};

/// `\0asm` followed by binary format version 1
pub const WASM_PREFIX: [u8; 8] = [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];

/// Id of the type section
pub const SECTION_TYPE: u8 = 1;
/// Id of the import section
pub const SECTION_IMPORT: u8 = 2;
/// Id of the function section
pub const SECTION_FUNCTION: u8 = 3;
/// Id of the global section
pub const SECTION_GLOBAL: u8 = 6;
/// Id of the export section
pub const SECTION_EXPORT: u8 = 7;
/// Id of the code section
pub const SECTION_CODE: u8 = 10;
/// Id of the data section
pub const SECTION_DATA: u8 = 11;
/// Id of the data count section
pub const SECTION_DATA_COUNT: u8 = 12;

/// Mode byte of a passive data segment
pub const SEGMENT_PASSIVE: u8 = 1;

/// Decodes an unsigned LEB128 value of at most 32 bits from `reader`.
///
/// Each byte contributes its low 7 bits at an increasing shift of 7; decoding stops at the
/// first byte without the continuation bit `0x80`.
///
/// # Errors
/// Returns [`Error::Leb128Overflow`] if the value does not fit into a `u32`, or
/// [`Error::FileError`] if the stream ends inside the value.
pub fn decode_uleb128<R: Read + ?Sized>(reader: &mut R) -> Result<u32> {
    let mut result = 0_u32;
    let mut shift = 0_u32;

    loop {
        let mut byte = [0_u8; 1];
        reader.read_exact(&mut byte)?;
        let byte = byte[0];

        let bits = u32::from(byte & 0x7F);
        if shift == 28 && bits > 0x0F {
            return Err(Error::Leb128Overflow);
        }

        result |= bits << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;
        if shift > 28 {
            return Err(Error::Leb128Overflow);
        }
    }
}

/// Appends the canonical (shortest) unsigned LEB128 encoding of `value` to `out`.
pub fn encode_uleb128(mut value: u32, out: &mut Vec<u8>) {
    loop {
        #[allow(clippy::cast_possible_truncation)]
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }

        out.push(byte | 0x80);
    }
}

/// Extracts the Webcil payload from a WebAssembly module.
///
/// The source stream is borrowed; it is read up to the end of the payload and left open.
///
/// # Examples
///
/// ```rust,no_run
/// use webcil::wasm::WasmWebcilUnwrapper;
///
/// let mut input = std::fs::File::open("HelloWorld.wasm")?;
/// let mut payload = Vec::new();
/// WasmWebcilUnwrapper::new(&mut input).write_unwrapped(&mut payload)?;
/// # Ok::<(), webcil::Error>(())
/// ```
pub struct WasmWebcilUnwrapper<'a, R: Read + ?Sized> {
    reader: &'a mut R,
}

impl<'a, R: Read + ?Sized> WasmWebcilUnwrapper<'a, R> {
    /// Creates an unwrapper reading the module from `reader`
    pub fn new(reader: &'a mut R) -> Self {
        WasmWebcilUnwrapper { reader }
    }

    /// Validates the module preamble, locates the data section and writes the last data
    /// segment to `output`.
    ///
    /// # Errors
    /// - [`Error::TruncatedWasmPrefix`] if the stream holds fewer than 8 bytes
    /// - [`Error::InvalidWasmPrefix`] if the preamble is not `\0asm` version 1
    /// - [`Error::MissingDataSection`] if the stream ends before or inside the data section
    /// - [`Error::UnexpectedSegmentCode`] if a segment is not passive
    /// - [`Error::EmptyDataSection`] if the data section has no segments
    pub fn write_unwrapped<W: Write + ?Sized>(mut self, output: &mut W) -> Result<()> {
        self.validate_prefix()?;
        self.seek_data_section()?;

        // Size of the whole data section, not needed to walk its segments
        decode_uleb128(self.reader).map_err(data_section_error)?;
        let segment_count = decode_uleb128(self.reader).map_err(data_section_error)?;
        debug!("Data section holds {} segment(s)", segment_count);

        if segment_count == 0 {
            return Err(Error::EmptyDataSection);
        }

        let last_segment = segment_count - 1;
        for index in 0..segment_count {
            let code = read_byte(self.reader)?.ok_or(Error::MissingDataSection)?;
            if code != SEGMENT_PASSIVE {
                return Err(Error::UnexpectedSegmentCode { index, code });
            }

            let size = decode_uleb128(self.reader).map_err(data_section_error)?;
            trace!("Segment {} is {} bytes", index, size);

            if index == last_segment {
                copy_exact(self.reader, size, output)?;
            } else {
                copy_exact(self.reader, size, &mut io::sink())?;
            }
        }

        Ok(())
    }

    /// Convenience wrapper around [`WasmWebcilUnwrapper::write_unwrapped`] collecting the
    /// payload into a buffer.
    ///
    /// # Errors
    /// See [`WasmWebcilUnwrapper::write_unwrapped`].
    pub fn unwrap_to_vec(self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        self.write_unwrapped(&mut payload)?;

        Ok(payload)
    }

    fn validate_prefix(&mut self) -> Result<()> {
        let mut prefix = [0_u8; WASM_PREFIX.len()];
        if let Err(error) = self.reader.read_exact(&mut prefix) {
            return Err(match error.kind() {
                io::ErrorKind::UnexpectedEof => Error::TruncatedWasmPrefix,
                _ => Error::FileError(error),
            });
        }

        if prefix != WASM_PREFIX {
            return Err(Error::InvalidWasmPrefix);
        }

        Ok(())
    }

    fn seek_data_section(&mut self) -> Result<()> {
        loop {
            let id = read_byte(self.reader)?.ok_or(Error::MissingDataSection)?;
            if id == SECTION_DATA {
                return Ok(());
            }

            let size = decode_uleb128(self.reader).map_err(data_section_error)?;
            trace!("Skipping section {} ({} bytes)", id, size);

            copy_exact(self.reader, size, &mut io::sink())?;
        }
    }
}

/// Wraps a Webcil payload into a minimal WebAssembly module.
///
/// # Examples
///
/// ```rust
/// use webcil::wasm::{WasmWebcilUnwrapper, WasmWebcilWrapper};
///
/// let payload = b"webcil payload".to_vec();
/// let mut module = Vec::new();
/// WasmWebcilWrapper::new(&payload).write_wrapped(&mut module)?;
///
/// let unwrapped = WasmWebcilUnwrapper::new(&mut module.as_slice()).unwrap_to_vec()?;
/// assert_eq!(unwrapped, payload);
/// # Ok::<(), webcil::Error>(())
/// ```
pub struct WasmWebcilWrapper<'a> {
    payload: &'a [u8],
}

impl<'a> WasmWebcilWrapper<'a> {
    /// Creates a wrapper around `payload`
    #[must_use]
    pub fn new(payload: &'a [u8]) -> Self {
        WasmWebcilWrapper { payload }
    }

    /// Writes the complete module to `output`.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] if the payload is larger than 4 GiB, or
    /// [`Error::FileError`] if writing fails.
    pub fn write_wrapped<W: Write + ?Sized>(&self, output: &mut W) -> Result<()> {
        let Ok(payload_size) = u32::try_from(self.payload.len()) else {
            return Err(malformed_error!(
                "Webcil payload of {} bytes exceeds the WebAssembly segment limit",
                self.payload.len()
            ));
        };

        debug!("Wrapping {} byte Webcil payload", payload_size);

        output.write_all(&WASM_PREFIX)?;
        for (id, body) in Self::preamble_sections() {
            write_section(output, id, &body)?;
        }

        let mut data = Vec::with_capacity(self.payload.len() + 16);
        encode_uleb128(2, &mut data);

        data.push(SEGMENT_PASSIVE);
        encode_uleb128(4, &mut data);
        data.extend_from_slice(&payload_size.to_le_bytes());

        data.push(SEGMENT_PASSIVE);
        encode_uleb128(payload_size, &mut data);
        data.extend_from_slice(self.payload);

        write_section(output, SECTION_DATA, &data)
    }

    /// Every section ahead of the data section, which do not depend on the payload
    fn preamble_sections() -> [(u8, Vec<u8>); 7] {
        #[rustfmt::skip]
        let types = vec![
            0x02,
            0x60, 0x01, 0x7F, 0x00,
            0x60, 0x02, 0x7F, 0x7F, 0x00,
        ];

        let mut imports = vec![0x01];
        write_name(&mut imports, "webcil");
        write_name(&mut imports, "memory");
        // memory, limits without maximum, one page
        imports.extend_from_slice(&[0x02, 0x00, 0x01]);

        let functions = vec![0x02, 0x00, 0x01];

        // i32, immutable, (i32.const 0) end
        let globals = vec![0x01, 0x7F, 0x00, 0x41, 0x00, 0x0B];

        let mut exports = vec![0x03];
        write_name(&mut exports, "webcilVersion");
        exports.extend_from_slice(&[0x03, 0x00]);
        write_name(&mut exports, "getWebcilSize");
        exports.extend_from_slice(&[0x00, 0x00]);
        write_name(&mut exports, "getWebcilPayload");
        exports.extend_from_slice(&[0x00, 0x01]);

        let data_count = vec![0x02];

        #[rustfmt::skip]
        let code = vec![
            0x02,
            // getWebcilSize(dest): memory.init 0 (dest, 0, 4)
            0x0C, 0x00,
            0x20, 0x00, 0x41, 0x00, 0x41, 0x04, 0xFC, 0x08, 0x00, 0x00, 0x0B,
            // getWebcilPayload(dest, size): memory.init 1 (dest, 0, size)
            0x0C, 0x00,
            0x20, 0x00, 0x41, 0x00, 0x20, 0x01, 0xFC, 0x08, 0x01, 0x00, 0x0B,
        ];

        [
            (SECTION_TYPE, types),
            (SECTION_IMPORT, imports),
            (SECTION_FUNCTION, functions),
            (SECTION_GLOBAL, globals),
            (SECTION_EXPORT, exports),
            (SECTION_DATA_COUNT, data_count),
            (SECTION_CODE, code),
        ]
    }
}

fn write_section<W: Write + ?Sized>(output: &mut W, id: u8, body: &[u8]) -> Result<()> {
    let Ok(size) = u32::try_from(body.len()) else {
        return Err(malformed_error!("Section {} is too large", id));
    };

    let mut header = vec![id];
    encode_uleb128(size, &mut header);

    output.write_all(&header)?;
    output.write_all(body)?;

    Ok(())
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    #[allow(clippy::cast_possible_truncation)]
    let len = name.len() as u32;
    encode_uleb128(len, out);
    out.extend_from_slice(name.as_bytes());
}

/// Copies exactly `size` bytes, a short stream means the data section was cut off
fn copy_exact<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    size: u32,
    output: &mut W,
) -> Result<()> {
    let copied = io::copy(&mut Read::take(reader, u64::from(size)), output)?;
    if copied != u64::from(size) {
        return Err(Error::MissingDataSection);
    }

    Ok(())
}

fn read_byte<R: Read + ?Sized>(reader: &mut R) -> Result<Option<u8>> {
    let mut byte = [0_u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(Error::FileError(error)),
        }
    }
}

fn data_section_error(error: Error) -> Error {
    match error {
        Error::FileError(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
            Error::MissingDataSection
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<u32> {
        let mut reader = bytes;
        decode_uleb128(&mut reader)
    }

    fn encode(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        encode_uleb128(value, &mut out);
        out
    }

    fn unwrap(module: &[u8]) -> Result<Vec<u8>> {
        let mut reader = module;
        WasmWebcilUnwrapper::new(&mut reader).unwrap_to_vec()
    }

    #[test]
    fn uleb128_boundaries() {
        assert_eq!(decode(&[0x00]).unwrap(), 0);
        assert_eq!(decode(&[0x7F]).unwrap(), 127);
        assert_eq!(decode(&[0x80, 0x01]).unwrap(), 128);
        assert_eq!(decode(&[0x80, 0x80, 0x01]).unwrap(), 16384);
        assert_eq!(decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]).unwrap(), u32::MAX);

        assert_eq!(encode(0), [0x00]);
        assert_eq!(encode(127), [0x7F]);
        assert_eq!(encode(128), [0x80, 0x01]);
        assert_eq!(encode(16384), [0x80, 0x80, 0x01]);
        assert_eq!(encode(u32::MAX), [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn uleb128_non_canonical() {
        // Padded encodings are legal in WebAssembly
        assert_eq!(decode(&[0x85, 0x80, 0x00]).unwrap(), 5);
    }

    #[test]
    fn uleb128_overflow() {
        assert!(matches!(
            decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F]),
            Err(Error::Leb128Overflow)
        ));
        assert!(matches!(
            decode(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]),
            Err(Error::Leb128Overflow)
        ));
    }

    #[test]
    fn uleb128_truncated() {
        assert!(matches!(decode(&[0x80]), Err(Error::FileError(_))));
        assert!(matches!(decode(&[]), Err(Error::FileError(_))));
    }

    #[test]
    fn wrap_layout() {
        let mut module = Vec::new();
        WasmWebcilWrapper::new(&[0xAA, 0xBB, 0xCC])
            .write_wrapped(&mut module)
            .unwrap();

        assert_eq!(&module[..8], &WASM_PREFIX);
        // type section, 10 bytes, 2 types
        assert_eq!(&module[8..11], &[SECTION_TYPE, 0x0A, 0x02]);

        #[rustfmt::skip]
        let data_section = [
            SECTION_DATA, 0x0C,
            0x02,
            0x01, 0x04, 0x03, 0x00, 0x00, 0x00,
            0x01, 0x03, 0xAA, 0xBB, 0xCC,
        ];
        assert!(module.ends_with(&data_section));
    }

    #[test]
    fn wrap_unwrap() {
        let payload: Vec<u8> = (0..70_000_u32).map(|i| (i % 251) as u8).collect();

        let mut module = Vec::new();
        WasmWebcilWrapper::new(&payload)
            .write_wrapped(&mut module)
            .unwrap();

        assert_eq!(unwrap(&module).unwrap(), payload);
    }

    #[test]
    fn wrap_unwrap_empty() {
        let mut module = Vec::new();
        WasmWebcilWrapper::new(&[]).write_wrapped(&mut module).unwrap();

        assert!(unwrap(&module).unwrap().is_empty());
    }

    #[test]
    fn unwrap_last_segment() {
        let mut module = WASM_PREFIX.to_vec();
        // custom section, skipped
        module.extend_from_slice(&[0x00, 0x03, 0x01, 0x02, 0x03]);
        #[rustfmt::skip]
        module.extend_from_slice(&[
            SECTION_DATA, 0x09,
            0x02,
            0x01, 0x02, 0xDE, 0xAD,
            0x01, 0x02, 0xBE, 0xEF,
        ]);

        assert_eq!(unwrap(&module).unwrap(), [0xBE, 0xEF]);
    }

    #[test]
    fn unwrap_truncated_prefix() {
        assert!(matches!(
            unwrap(&WASM_PREFIX[..5]),
            Err(Error::TruncatedWasmPrefix)
        ));
        assert!(matches!(unwrap(&[]), Err(Error::TruncatedWasmPrefix)));
    }

    #[test]
    fn unwrap_invalid_prefix() {
        let module = [0x4D, 0x5A, 0x90, 0x00, 0x03, 0x00, 0x00, 0x00, 0x0B, 0x00];
        let error = unwrap(&module).unwrap_err();
        assert!(matches!(error, Error::InvalidWasmPrefix));
        assert_eq!(error.to_string(), "Invalid Wasm prefix.");

        // version 2
        let mut module = WASM_PREFIX.to_vec();
        module[4] = 0x02;
        assert!(matches!(unwrap(&module), Err(Error::InvalidWasmPrefix)));
    }

    #[test]
    fn unwrap_missing_data_section() {
        let mut module = WASM_PREFIX.to_vec();
        module.extend_from_slice(&[SECTION_TYPE, 0x04, 0x01, 0x60, 0x00, 0x00]);

        let error = unwrap(&module).unwrap_err();
        assert!(matches!(error, Error::MissingDataSection));
        assert_eq!(error.to_string(), "Unable to read Data Section.");

        // section claims more bytes than the stream holds
        let mut module = WASM_PREFIX.to_vec();
        module.extend_from_slice(&[SECTION_TYPE, 0x40, 0x01]);
        assert!(matches!(unwrap(&module), Err(Error::MissingDataSection)));
    }

    #[test]
    fn unwrap_active_segment() {
        let mut module = WASM_PREFIX.to_vec();
        #[rustfmt::skip]
        module.extend_from_slice(&[
            SECTION_DATA, 0x0A,
            0x02,
            0x01, 0x01, 0xFF,
            0x00, 0x41, 0x00, 0x0B, 0x01, 0xFF,
        ]);

        let error = unwrap(&module).unwrap_err();
        assert!(matches!(
            error,
            Error::UnexpectedSegmentCode { index: 1, code: 0 }
        ));
        assert_eq!(error.to_string(), "Unexpected segment code for segment 1.");
    }

    #[test]
    fn unwrap_no_segments() {
        let mut module = WASM_PREFIX.to_vec();
        module.extend_from_slice(&[SECTION_DATA, 0x01, 0x00]);

        let error = unwrap(&module).unwrap_err();
        assert!(matches!(error, Error::EmptyDataSection));
        assert_eq!(error.to_string(), "Unable to read DataSection.");
    }

    #[test]
    fn unwrap_truncated_payload() {
        let mut module = WASM_PREFIX.to_vec();
        module.extend_from_slice(&[SECTION_DATA, 0x06, 0x01, 0x01, 0x08, 0x01, 0x02, 0x03]);

        assert!(matches!(unwrap(&module), Err(Error::MissingDataSection)));
    }
}
