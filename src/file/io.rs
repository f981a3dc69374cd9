//! Low-level byte order and fixed-layout structure I/O for PE and Webcil headers.
//!
//! This module provides endian-aware, bounds-checked reading and writing of primitive values
//! and of complete fixed-layout records. Every header in this crate (DOS header, COFF file
//! header, optional header, section headers, Webcil header) is serialized through it, so the
//! on-disk layout is always spelled out field by field in declaration order, with no padding.
//!
//! # Key Components
//!
//! - [`crate::file::io::CilIO`] - Primitive types that can be converted to and from bytes
//! - [`crate::file::io::Endian`] - The byte order of a buffer, the single place where swapping happens
//! - [`crate::file::io::StructIO`] - Fixed-layout records with an explicit serialized size
//! - [`crate::file::io::read_struct`] / [`crate::file::io::write_struct`] - Stream adapters for records
//!
//! # Byte Order
//!
//! Both container formats are little-endian on disk. The helpers below never reinterpret host
//! memory; the decision of which byte order to apply is made exclusively by [`Endian`], which
//! keeps the rest of the crate endian-agnostic and makes big-endian decoding testable on
//! little-endian development machines.
//!
//! # Examples
//!
//! ```rust,ignore
//! use webcil::file::io::{read_le_at, write_le_at};
//!
//! let mut data = [0u8; 6];
//! let mut offset = 0;
//! write_le_at(&mut data, &mut offset, 1u16)?;
//! write_le_at(&mut data, &mut offset, 2u32)?;
//!
//! offset = 0;
//! assert_eq!(read_le_at::<u16>(&data, &mut offset)?, 1);
//! assert_eq!(read_le_at::<u32>(&data, &mut offset)?, 2);
//! # Ok::<(), webcil::Error>(())
//! ```
//!
//! # Error Handling
//!
//! Buffer helpers return [`crate::Error::OutOfBounds`] if there are insufficient bytes.
//! [`read_struct`] returns [`crate::Error::TruncatedStruct`] when a stream ends early; a short
//! read is never padded with zeroes.

use std::io::{self, Read, Write};

use crate::{
    Error::{FileError, OutOfBounds, TruncatedStruct},
    Result,
};

/// Trait for implementing type-specific safe binary data reading and writing operations.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size
/// byte array required for that particular type (e.g., `[u8; 4]` for `u32`).
pub trait CilIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cilio {
    ($($ty:ty),*) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_cilio!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Byte order of a serialized buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Least significant byte first, the on-disk order of PE and Webcil
    Little,
    /// Most significant byte first
    Big,
}

impl Endian {
    /// The byte order of the host this crate was compiled for.
    pub const NATIVE: Endian = if cfg!(target_endian = "big") {
        Endian::Big
    } else {
        Endian::Little
    };
}

/// Safely reads a value of type `T` in little-endian byte order from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a little-endian `T` at `offset`, advancing the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    Ok(T::from_le_bytes(take_bytes::<T>(data, offset)?))
}

/// Safely reads a value of type `T` in big-endian byte order from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Safely reads a big-endian `T` at `offset`, advancing the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    Ok(T::from_be_bytes(take_bytes::<T>(data, offset)?))
}

/// Reads a `T` at `offset` in the given byte order, advancing the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_at<T: CilIO>(data: &[u8], offset: &mut usize, endian: Endian) -> Result<T> {
    match endian {
        Endian::Little => read_le_at(data, offset),
        Endian::Big => read_be_at(data, offset),
    }
}

/// Reads `N` consecutive values of `T` in the given byte order.
///
/// Used for the inline fixed-length arrays of the PE headers (reserved words, section names,
/// data directories), which carry no length prefix.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_array_at<T: CilIO + Copy + Default, const N: usize>(
    data: &[u8],
    offset: &mut usize,
    endian: Endian,
) -> Result<[T; N]> {
    let mut values = [T::default(); N];
    for value in &mut values {
        *value = read_at(data, offset, endian)?;
    }

    Ok(values)
}

/// Writes `value` in little-endian byte order to the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_le<T: CilIO>(data: &mut [u8], value: T) -> Result<()> {
    let mut offset = 0_usize;
    write_le_at(data, &mut offset, value)
}

/// Writes `value` in little-endian byte order at `offset`, advancing the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_le_at<T: CilIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    put_bytes(data, offset, value.to_le_bytes().as_ref())
}

/// Writes `value` in big-endian byte order to the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_be<T: CilIO>(data: &mut [u8], value: T) -> Result<()> {
    let mut offset = 0_usize;
    write_be_at(data, &mut offset, value)
}

/// Writes `value` in big-endian byte order at `offset`, advancing the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_be_at<T: CilIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    put_bytes(data, offset, value.to_be_bytes().as_ref())
}

/// Writes `value` at `offset` in the given byte order, advancing the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_at<T: CilIO>(
    data: &mut [u8],
    offset: &mut usize,
    value: T,
    endian: Endian,
) -> Result<()> {
    match endian {
        Endian::Little => write_le_at(data, offset, value),
        Endian::Big => write_be_at(data, offset, value),
    }
}

/// Writes all `values` consecutively in the given byte order.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_array_at<T: CilIO + Copy>(
    data: &mut [u8],
    offset: &mut usize,
    values: &[T],
    endian: Endian,
) -> Result<()> {
    for value in values {
        write_at(data, offset, *value, endian)?;
    }

    Ok(())
}

fn take_bytes<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T::Bytes> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };

    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;
    Ok(read)
}

fn put_bytes(data: &mut [u8], offset: &mut usize, bytes: &[u8]) -> Result<()> {
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(OutOfBounds);
    };

    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;

    Ok(())
}

/// A fixed-layout record with an explicit, padding-free serialized form.
///
/// Implementations list their fields in declaration order; nested records and inline arrays
/// are serialized in place. `SIZE` is the exact number of bytes produced and consumed.
pub trait StructIO: Sized {
    /// Human readable name, used in error messages
    const NAME: &'static str;
    /// Serialized size in bytes
    const SIZE: usize;

    /// Reads the record at `offset` in the given byte order, advancing the offset by `SIZE`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
    fn struct_read(data: &[u8], offset: &mut usize, endian: Endian) -> Result<Self>;

    /// Writes the record at `offset` in the given byte order, advancing the offset by `SIZE`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
    fn struct_write(&self, data: &mut [u8], offset: &mut usize, endian: Endian) -> Result<()>;

    /// Serializes the record in its on-disk (little-endian) form.
    ///
    /// # Errors
    /// Returns an error if the implementation writes more than `SIZE` bytes.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut data = vec![0_u8; Self::SIZE];
        let mut offset = 0;
        self.struct_write(&mut data, &mut offset, Endian::Little)?;

        Ok(data)
    }

    /// Deserializes the record from the start of `data` in its on-disk (little-endian) form.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `SIZE`.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut offset = 0;
        Self::struct_read(data, &mut offset, Endian::Little)
    }
}

/// Reads exactly `T::SIZE` bytes from `reader` and decodes them as a little-endian `T`.
///
/// # Errors
/// Returns [`crate::Error::TruncatedStruct`] if the stream ends before `T::SIZE` bytes were
/// read, or [`crate::Error::FileError`] for any other I/O failure.
pub fn read_struct<T: StructIO, R: Read + ?Sized>(reader: &mut R) -> Result<T> {
    let mut buffer = vec![0_u8; T::SIZE];
    if let Err(error) = reader.read_exact(&mut buffer) {
        return Err(match error.kind() {
            io::ErrorKind::UnexpectedEof => TruncatedStruct {
                name: T::NAME,
                expected: T::SIZE,
            },
            _ => FileError(error),
        });
    }

    T::from_bytes(&buffer)
}

/// Serializes `value` in its little-endian on-disk form and writes it to `writer`.
///
/// # Errors
/// Returns [`crate::Error::FileError`] if the write fails.
pub fn write_struct<T: StructIO, W: Write + ?Sized>(writer: &mut W, value: &T) -> Result<()> {
    writer.write_all(&value.to_bytes()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[derive(Debug, PartialEq)]
    struct Pair {
        small: u16,
        large: u32,
        words: [u16; 2],
    }

    impl StructIO for Pair {
        const NAME: &'static str = "Pair";
        const SIZE: usize = 10;

        fn struct_read(data: &[u8], offset: &mut usize, endian: Endian) -> Result<Self> {
            Ok(Pair {
                small: read_at(data, offset, endian)?,
                large: read_at(data, offset, endian)?,
                words: read_array_at(data, offset, endian)?,
            })
        }

        fn struct_write(&self, data: &mut [u8], offset: &mut usize, endian: Endian) -> Result<()> {
            write_at(data, offset, self.small, endian)?;
            write_at(data, offset, self.large, endian)?;
            write_array_at(data, offset, &self.words, endian)
        }
    }

    #[test]
    fn read_le_u16() {
        let result = read_le::<u16>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0201);
    }

    #[test]
    fn read_le_u32() {
        let result = read_le::<u32>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0403_0201);
    }

    #[test]
    fn read_le_u64() {
        let result = read_le::<u64>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0807060504030201);
    }

    #[test]
    fn read_be_u16() {
        let result = read_be::<u16>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x102);
    }

    #[test]
    fn read_be_u32() {
        let result = read_be::<u32>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x1020304);
    }

    #[test]
    fn read_le_at_advances() {
        let mut offset = 2;
        let result = read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(result, 0x0403);
        assert_eq!(offset, 4);
    }

    #[test]
    fn read_out_of_bounds() {
        let mut offset = 6;
        assert!(matches!(
            read_le_at::<u32>(&TEST_BUFFER, &mut offset),
            Err(OutOfBounds)
        ));
        assert_eq!(offset, 6);

        let mut offset = usize::MAX;
        assert!(read_le_at::<u8>(&TEST_BUFFER, &mut offset).is_err());
    }

    #[test]
    fn write_le_be() {
        let mut data = [0u8; 4];
        write_le(&mut data, 0x0102_0304_u32).unwrap();
        assert_eq!(data, [0x04, 0x03, 0x02, 0x01]);

        write_be(&mut data, 0x0102_0304_u32).unwrap();
        assert_eq!(data, [0x01, 0x02, 0x03, 0x04]);

        let mut small = [0u8; 3];
        assert!(write_le(&mut small, 1_u32).is_err());
    }

    #[test]
    fn endian_dispatch() {
        let mut offset = 0;
        assert_eq!(
            read_at::<u16>(&TEST_BUFFER, &mut offset, Endian::Big).unwrap(),
            0x0102
        );
        assert_eq!(
            read_at::<u16>(&TEST_BUFFER, &mut offset, Endian::Little).unwrap(),
            0x0403
        );
        assert_eq!(offset, 4);
    }

    #[test]
    fn native_endian() {
        if cfg!(target_endian = "little") {
            assert_eq!(Endian::NATIVE, Endian::Little);
        } else {
            assert_eq!(Endian::NATIVE, Endian::Big);
        }
    }

    #[test]
    fn struct_layout_is_packed() {
        let pair = Pair {
            small: 0x0102,
            large: 0x0304_0506,
            words: [0x0708, 0x090A],
        };

        let bytes = pair.to_bytes().unwrap();
        assert_eq!(
            bytes,
            [0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0x08, 0x07, 0x0A, 0x09]
        );

        let mut stream = Vec::new();
        write_struct(&mut stream, &pair).unwrap();
        assert_eq!(stream, bytes);
    }

    #[test]
    fn struct_big_endian() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A];
        let mut offset = 0;
        let pair = Pair::struct_read(&bytes, &mut offset, Endian::Big).unwrap();

        assert_eq!(pair.small, 0x0102);
        assert_eq!(pair.large, 0x0304_0506);
        assert_eq!(pair.words, [0x0708, 0x090A]);
        assert_eq!(offset, Pair::SIZE);
    }

    #[test]
    fn read_struct_exact() {
        let mut cursor = Cursor::new(vec![
            0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0x08, 0x07, 0x0A, 0x09, 0xFF,
        ]);
        let pair: Pair = read_struct(&mut cursor).unwrap();

        assert_eq!(pair.small, 0x0102);
        assert_eq!(cursor.position(), 10);
    }

    #[test]
    fn read_struct_truncated() {
        let mut cursor = Cursor::new(vec![0x02, 0x01, 0x06]);
        match read_struct::<Pair, _>(&mut cursor) {
            Err(TruncatedStruct { name, expected }) => {
                assert_eq!(name, "Pair");
                assert_eq!(expected, 10);
            }
            other => panic!("Expected TruncatedStruct, got {:?}", other),
        }
    }
}
