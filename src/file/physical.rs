//! Memory-mapped file backend.
//!
//! Assemblies are mapped instead of read so that large framework libraries
//! (`System.Private.CoreLib.dll` is well above 10 MB) can be converted without copying the
//! whole image first. Only the section bytes that are actually copied into the Webcil
//! payload get paged in.

use super::Backend;
use crate::{
    Error::{Error, FileError, OutOfBounds},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// Input file backed by a read-only memory map
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Opens and maps the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened, or
    /// [`crate::Error::Error`] if mapping it fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        // SAFETY: read-only mapping, the file must not be truncated while it is mapped
        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => return Err(Error(error.to_string())),
        };

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if offset_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn temp_file(name: &str, data: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn physical() {
        let path = temp_file("webcil_physical.bin", &[0x4D, 0x5A, 0x90, 0x00, 0x03, 0x00]);
        let physical = Physical::new(&path).unwrap();

        assert_eq!(physical.len(), 6);
        assert_eq!(physical.data()[0..2], [0x4D, 0x5A]);
        assert_eq!(physical.data_slice(2, 4).unwrap(), &[0x90, 0x00, 0x03, 0x00]);

        assert!(matches!(physical.data_slice(usize::MAX, 1), Err(OutOfBounds)));
        assert!(matches!(physical.data_slice(5, 2), Err(OutOfBounds)));
        assert_eq!(physical.data_slice(6, 0).unwrap().len(), 0);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn invalid_file_path() {
        match Physical::new(PathBuf::from("/nonexistent/path/to/file.dll")) {
            Err(FileError(io_error)) => {
                assert_eq!(io_error.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected FileError"),
        }
    }

    #[test]
    fn empty_file() {
        let path = temp_file("webcil_physical_empty.bin", b"");

        let physical = Physical::new(&path).unwrap();
        assert_eq!(physical.len(), 0);
        assert!(physical.data_slice(0, 1).is_err());

        fs::remove_file(&path).unwrap();
    }
}
