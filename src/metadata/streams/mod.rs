//! Metadata heaps (ECMA-335 II.24.2).
//!
//! Read-only views that dereference heap indexes found in table rows, plus builders that produce
//! well-formed heap bytes for [`crate::metadata::image::MetadataImageBuilder`].
//!
//! # Key Components
//!
//! - [`crate::metadata::streams::Strings`] - `#Strings`, NUL-terminated UTF-8 identifiers
//! - [`crate::metadata::streams::Blob`] - `#Blob`, length-prefixed binary entries
//! - [`crate::metadata::streams::Guid`] - `#GUID`, 16-byte GUIDs addressed from 1

mod blob;
pub use blob::{write_compressed_uint, Blob, BlobBuilder};

mod guid;
pub use guid::{Guid, GuidBuilder};

mod strings;
pub use strings::{Strings, StringsBuilder};
