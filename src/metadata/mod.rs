//! .NET metadata inspection.
//!
//! Webcil keeps the CLI header and the metadata blob of an assembly untouched; only the
//! container around them changes. This module reads just enough of the ECMA-335 structures to
//! show what a container carries and to compare two containers:
//!
//! - [`cor20header::Cor20Header`] - the CLI header the COM descriptor directory points to
//! - [`root::Root`] - the `BSJB` metadata root and its stream directory
//! - [`streams`] - stream headers and the `#Strings` identifier heap
//! - [`MetadataSummary`] - all of the above condensed into one comparable value
//!
//! Metadata tables are not decoded.

pub mod cor20header;
pub mod root;
pub mod streams;

mod summary;

pub use summary::MetadataSummary;
