//! The `#Blob` heap: length-prefixed binary entries (ECMA-335 II.24.2.4).
//!
//! Every entry starts with its length as a compressed unsigned integer. Signatures, custom
//! attribute arguments, constants, marshalling descriptors and public keys all live here.

use std::collections::HashMap;

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

/// A read-only view of a `#Blob` heap.
///
/// ## Examples
///
/// ```rust
/// use cilimport::metadata::streams::Blob;
///
/// let data = &[0x00, 0x03, 0x20, 0x00, 0x01];
/// let blob = Blob::from(data)?;
///
/// assert_eq!(blob.get(0)?, &[] as &[u8]);
/// assert_eq!(blob.get(1)?, &[0x20, 0x00, 0x01]);
/// # Ok::<(), cilimport::Error>(())
/// ```
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Create a view over heap bytes. The heap must start with the empty blob.
    ///
    /// # Errors
    /// Returns an error if `data` is empty or does not start with a zero length byte.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// Read the entry starting at byte offset `index`.
    ///
    /// # Errors
    /// Returns an error if `index` is outside the heap or the entry's length runs past its end.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        let skip = parser.pos();

        let Some(data_start) = index.checked_add(skip) else {
            return Err(OutOfBounds);
        };

        let Some(data_end) = data_start.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if data_start > self.data.len() || data_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[data_start..data_end])
    }
}

/// Append `value` to `buffer` as an ECMA-335 compressed unsigned integer.
///
/// # Errors
/// Returns an error if `value` does not fit into 29 bits.
pub fn write_compressed_uint(value: u32, buffer: &mut Vec<u8>) -> Result<()> {
    if value <= 0x7F {
        buffer.push(value as u8);
    } else if value <= 0x3FFF {
        buffer.push(((value >> 8) as u8) | 0x80);
        buffer.push(value as u8);
    } else if value <= 0x1FFF_FFFF {
        buffer.push(((value >> 24) as u8) | 0xC0);
        buffer.push((value >> 16) as u8);
        buffer.push((value >> 8) as u8);
        buffer.push(value as u8);
    } else {
        return Err(malformed_error!(
            "Value too large for compressed encoding - {}",
            value
        ));
    }

    Ok(())
}

/// Builds `#Blob` heap bytes, interning identical entries.
#[derive(Debug, Clone)]
pub struct BlobBuilder {
    data: Vec<u8>,
    interned: HashMap<Vec<u8>, u32>,
}

impl BlobBuilder {
    /// Create a heap holding only the empty blob at index 0.
    #[must_use]
    pub fn new() -> Self {
        BlobBuilder {
            data: vec![0],
            interned: HashMap::new(),
        }
    }

    /// Add `value` and return its heap index. The empty blob is always index 0.
    ///
    /// # Errors
    /// Returns an error if `value` is too long for a compressed length or the heap outgrows `u32`.
    pub fn add(&mut self, value: &[u8]) -> Result<u32> {
        if value.is_empty() {
            return Ok(0);
        }
        if let Some(index) = self.interned.get(value) {
            return Ok(*index);
        }

        let index = u32::try_from(self.data.len())
            .map_err(|_| malformed_error!("#Blob heap exceeds 4GB"))?;
        let len = u32::try_from(value.len())
            .map_err(|_| malformed_error!("Blob entry exceeds 4GB"))?;
        write_compressed_uint(len, &mut self.data)?;
        self.data.extend_from_slice(value);
        self.interned.insert(value.to_vec(), index);

        Ok(index)
    }

    /// Consume the builder and return the heap bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

impl Default for BlobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = [
            0x00,
            0x03, 0x20, 0x00, 0x01,
            0x08, 0xB7, 0x7A, 0x5C, 0x56, 0x19, 0x34, 0xE0, 0x89,
            0x05, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let blob = Blob::from(&data).unwrap();
        assert_eq!(blob.get(0).unwrap(), &[] as &[u8]);
        assert_eq!(blob.get(1).unwrap(), &[0x20, 0x00, 0x01]);
        assert_eq!(
            blob.get(5).unwrap(),
            &[0xB7, 0x7A, 0x5C, 0x56, 0x19, 0x34, 0xE0, 0x89]
        );
        assert_eq!(blob.get(14).unwrap(), &[0, 0, 0, 0, 0]);
        assert!(blob.get(20).is_err());
    }

    #[test]
    fn truncated_entry() {
        let data = [0x00, 0x05, 0x01, 0x02];
        let blob = Blob::from(&data).unwrap();
        assert!(matches!(blob.get(1), Err(OutOfBounds)));

        assert!(Blob::from(&[0x01, 0x00]).is_err());
    }

    #[test]
    fn compressed_writer() {
        let mut buffer = Vec::new();
        write_compressed_uint(0x03, &mut buffer).unwrap();
        write_compressed_uint(0x80, &mut buffer).unwrap();
        write_compressed_uint(0x2E57, &mut buffer).unwrap();
        write_compressed_uint(0x4000, &mut buffer).unwrap();
        assert!(write_compressed_uint(0x2000_0000, &mut buffer).is_err());

        assert_eq!(
            buffer,
            vec![0x03, 0x80, 0x80, 0xAE, 0x57, 0xC0, 0x00, 0x40, 0x00]
        );
    }

    #[test]
    fn builder_long_entry() {
        let mut builder = BlobBuilder::new();
        let long = vec![0xAB; 200];
        let index = builder.add(&long).unwrap();
        assert_eq!(builder.add(&long).unwrap(), index);
        assert_eq!(builder.add(&[]).unwrap(), 0);

        let data = builder.finish();
        let blob = Blob::from(&data).unwrap();
        assert_eq!(blob.get(index as usize).unwrap(), long.as_slice());
    }
}
