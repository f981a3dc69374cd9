use log::debug;

use crate::{
    file::File,
    metadata::{
        cor20header::{Cor20Header, COR20_HEADER_SIZE},
        root::Root,
        streams::Strings,
    },
    Result,
};

/// Metadata identity of an assembly, compared before and after a conversion.
///
/// Two images with equal summaries carry the same CLI header location, byte-identical
/// metadata and the same identifier strings, which is what a .NET metadata reader consumes.
///
/// # Examples
///
/// ```rust,no_run
/// use webcil::{File, MetadataSummary};
/// use std::path::Path;
///
/// let file = File::from_file(Path::new("HelloWorld.dll"))?;
/// let summary = MetadataSummary::from_file(&file)?;
/// println!("{} streams: {:?}", summary.version, summary.streams);
/// # Ok::<(), webcil::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSummary {
    /// RVA of the CLI header
    pub cli_header_rva: u32,
    /// Size of the CLI header directory
    pub cli_header_size: u32,
    /// Runtime version from the CLI header as `(major, minor)`
    pub runtime_version: (u16, u16),
    /// CLI header flags
    pub flags: u32,
    /// RVA of the metadata root
    pub metadata_rva: u32,
    /// Size of the metadata blob
    pub metadata_size: u32,
    /// Version string of the metadata root
    pub version: String,
    /// Stream names in directory order
    pub streams: Vec<String>,
    /// Non-empty entries of the `#Strings` heap, in heap order
    pub identifiers: Vec<String>,
    /// The raw metadata blob
    pub metadata: Vec<u8>,
}

impl MetadataSummary {
    /// Reads the CLI header, metadata root and `#Strings` heap of `file`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if an RVA does not map into a section or one of the
    /// structures is invalid, and [`crate::Error::OutOfBounds`] if they extend past the image.
    pub fn from_file(file: &File) -> Result<MetadataSummary> {
        let (cli_header_rva, cli_header_size) = file.clr();
        let cli_offset = file.rva_to_offset(cli_header_rva as usize)?;
        let cor20 = Cor20Header::read(file.data_slice(cli_offset, COR20_HEADER_SIZE)?)?;

        let metadata_offset = file.rva_to_offset(cor20.meta_data_rva as usize)?;
        let metadata = file.data_slice(metadata_offset, cor20.meta_data_size as usize)?;
        let root = Root::read(metadata)?;

        let identifiers = match root.stream("#Strings") {
            Some(stream) => {
                let start = stream.offset as usize;
                let heap = &metadata[start..start + stream.size as usize];
                Strings::from(heap)?
                    .iter()
                    .map(|(_, identifier)| identifier.to_string())
                    .collect()
            }
            None => Vec::new(),
        };

        debug!(
            "Metadata at 0x{:x} ({} bytes), {} streams, {} identifiers",
            cor20.meta_data_rva,
            cor20.meta_data_size,
            root.stream_headers.len(),
            identifiers.len()
        );

        Ok(MetadataSummary {
            cli_header_rva,
            cli_header_size,
            runtime_version: (cor20.major_runtime_version, cor20.minor_runtime_version),
            flags: cor20.flags,
            metadata_rva: cor20.meta_data_rva,
            metadata_size: cor20.meta_data_size,
            version: root.version,
            streams: root.stream_headers.into_iter().map(|stream| stream.name).collect(),
            identifiers,
            metadata: metadata.to_vec(),
        })
    }

    /// Parses `data` as a PE image and summarizes it.
    ///
    /// # Errors
    /// See [`File::from_mem`] and [`MetadataSummary::from_file`].
    pub fn from_pe_bytes(data: Vec<u8>) -> Result<MetadataSummary> {
        let file = File::from_mem(data)?;
        MetadataSummary::from_file(&file)
    }

    /// Returns `true` if `name` is one of the `#Strings` identifiers
    #[must_use]
    pub fn has_identifier(&self, name: &str) -> bool {
        self.identifiers.iter().any(|identifier| identifier == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{
        build_assembly, hello_world, identifiers, CLI_HEADER_RVA, METADATA_RVA, RUNTIME_VERSION,
    };

    #[test]
    fn hello_world_summary() {
        let summary = MetadataSummary::from_pe_bytes(hello_world()).unwrap();

        assert_eq!(summary.cli_header_rva, CLI_HEADER_RVA);
        assert_eq!(summary.cli_header_size, 0x48);
        assert_eq!(summary.runtime_version, (2, 5));
        assert_eq!(summary.flags, 1);
        assert_eq!(summary.metadata_rva, METADATA_RVA);
        assert_eq!(summary.metadata_size as usize, summary.metadata.len());
        assert_eq!(&summary.metadata[0..4], b"BSJB");
        assert_eq!(summary.version, RUNTIME_VERSION);
        assert_eq!(summary.streams, vec!["#~", "#Strings", "#GUID", "#Blob"]);
        assert_eq!(
            summary.identifiers,
            identifiers("HelloWorld", "Greeter", "Greet")
        );
        assert!(summary.has_identifier("Greeter"));
        assert!(!summary.has_identifier("Main"));
    }

    #[test]
    fn different_assemblies() {
        let first = MetadataSummary::from_pe_bytes(hello_world()).unwrap();
        let second =
            MetadataSummary::from_pe_bytes(build_assembly("Calculator", "Adder", "Add")).unwrap();

        assert_ne!(first, second);
        assert!(second.has_identifier("Calculator.dll"));
        assert!(second.has_identifier("Add"));
    }

    #[test]
    fn broken_metadata_signature() {
        let mut image = hello_world();
        let metadata_offset = 0x200 + (METADATA_RVA - 0x2000) as usize;
        image[metadata_offset] = b'X';

        assert!(matches!(
            MetadataSummary::from_pe_bytes(image),
            Err(crate::Error::Malformed { .. })
        ));
    }
}
