//! Image byte sources and low-level decoding primitives.
//!
//! The metadata facade mostly works on already decoded rows and heaps, but two concerns still
//! need raw bytes:
//!
//! - hashing the entire image, which requires the complete file contents, and
//! - cursor-based decoding of blobs (signatures, custom attribute arguments, constants).
//!
//! # Key Components
//!
//! - [`crate::file::Backend`] - Trait for byte sources holding a complete image
//! - [`crate::file::Memory`] - Owned in-memory buffer
//! - [`crate::file::Physical`] - Memory-mapped file on disk
//! - [`crate::file::parser::Parser`] - Bounds-checked cursor used by every blob decoder
//! - [`crate::file::io`] - Little-endian primitive reads
//!
//! # Examples
//!
//! ```rust
//! use cilimport::file::{Backend, Memory};
//!
//! let image = Memory::new(vec![0x4D, 0x5A, 0x90, 0x00]);
//! assert_eq!(image.len(), 4);
//! assert_eq!(image.data_slice(0, 2)?, &[0x4D, 0x5A]);
//! # Ok::<(), cilimport::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

pub use memory::Memory;
pub use physical::Physical;

use crate::Result;

/// Backend for reading the complete bytes of an image.
///
/// Implementations must be immutable once constructed: the facade reads them concurrently and
/// without locking.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;

    /// Returns true if the backend holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn checked_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let Some(offset_end) = offset.checked_add(len) else {
        return Err(crate::Error::OutOfBounds);
    };

    data.get(offset..offset_end).ok_or(crate::Error::OutOfBounds)
}
