//! Forward-only byte cursor for blobs and signatures.
//!
//! [`Parser`] walks a borrowed byte slice and knows the variable-length encodings ECMA-335 uses
//! inside the `#Blob` heap: compressed unsigned integers (II.23.2), `TypeDefOrRef` coded tokens
//! embedded in signatures, and length-prefixed payloads. Every read is bounds checked and
//! returns [`crate::Error::OutOfBounds`] or [`crate::Error::Malformed`] instead of panicking, so
//! a cursor can be pointed at untrusted data directly.
//!
//! # Examples
//!
//! ```rust
//! use cilimport::Parser;
//!
//! // HASTHIS, 1 parameter, void return, string parameter
//! let signature = [0x20, 0x01, 0x01, 0x0E];
//! let mut parser = Parser::new(&signature);
//!
//! assert_eq!(parser.read_le::<u8>()?, 0x20);
//! assert_eq!(parser.read_compressed_uint()?, 1);
//! assert_eq!(parser.remaining(), 2);
//! # Ok::<(), cilimport::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    metadata::token::Token,
    Error::OutOfBounds,
    Result,
};

/// A bounds-checked cursor over a byte slice.
///
/// The cursor never owns data; it borrows the slice for `'a`, so byte ranges returned by
/// [`Parser::read_bytes`] outlive the cursor itself.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new cursor positioned at the first byte of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying slice.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying slice is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true while at least one unread byte remains.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Current position of the cursor.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// The complete underlying slice.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Rewind the cursor to the first byte.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Move the cursor to an absolute position. Seeking to `len()` is allowed.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies past the end of the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Skip `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `step` bytes remain.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let end = self.calc_end_position(step)?;
        self.position = end;
        Ok(())
    }

    /// Look at the next byte without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data.get(self.position).copied().ok_or(OutOfBounds)
    }

    /// Run `f` and rewind the cursor if it fails.
    ///
    /// # Errors
    /// Returns whatever error `f` produced.
    pub fn transactional<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved_position = self.position;
        let result = f(self);
        if result.is_err() {
            self.position = saved_position;
        }
        result
    }

    /// Read a little-endian primitive and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes remain.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read an ECMA-335 compressed unsigned integer (II.23.2).
    ///
    /// - `0xxxxxxx` - one byte, 7 bits of value
    /// - `10xxxxxx xxxxxxxx` - two bytes, 14 bits of value
    /// - `110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx` - four bytes, 29 bits of value
    ///
    /// A lead byte of the form `111xxxxx` is invalid; `0xFF` in particular is used by custom
    /// attribute blobs as the null-string marker and must be handled by the caller.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input or [`crate::Error::Malformed`]
    /// on an invalid lead byte.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            let value = ((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte);
            return Ok(value);
        }

        // 4-byte encoding: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            let value = ((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3;
            return Ok(value);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read a `TypeDefOrRef` coded index as it appears inside signatures (II.23.2.8).
    ///
    /// The low two bits select the table (TypeDef, TypeRef, TypeSpec), the remaining bits are
    /// the row id.
    ///
    /// # Errors
    /// Returns an error on truncated input or an invalid table tag.
    pub fn read_compressed_token(&mut self) -> Result<Token> {
        let compressed_token = self.read_compressed_uint()?;

        let table: u32 = match compressed_token & 0x3 {
            0x0 => 0x0200_0000, // TypeDef
            0x1 => 0x0100_0000, // TypeRef
            0x2 => 0x1B00_0000, // TypeSpec
            _ => {
                return Err(malformed_error!(
                    "Invalid compressed token - {}",
                    compressed_token
                ))
            }
        };

        Ok(Token::new(table | (compressed_token >> 2)))
    }

    /// Borrow the next `length` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read `byte_count` bytes as UTF-16LE text.
    ///
    /// Unpaired surrogates are replaced rather than rejected.
    ///
    /// # Errors
    /// Returns an error if fewer than `byte_count` bytes remain or `byte_count` is odd.
    pub fn read_utf16(&mut self, byte_count: usize) -> Result<String> {
        if byte_count % 2 != 0 {
            return Err(malformed_error!(
                "UTF-16 payload of {} bytes is not a whole number of code units",
                byte_count
            ));
        }

        let bytes = self.read_bytes(byte_count)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(widestring::U16Str::from_slice(&units).to_string_lossy())
    }

    fn calc_end_position(&self, length: usize) -> Result<usize> {
        let end = self.position.checked_add(length).ok_or(OutOfBounds)?;

        if end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_uint_forms() {
        #[rustfmt::skip]
        let data = [
            0x03,
            0x7F,
            0x80, 0x80,
            0xAE, 0x57,
            0xBF, 0xFF,
            0xC0, 0x00, 0x40, 0x00,
            0xDF, 0xFF, 0xFF, 0xFF,
        ];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_compressed_uint().unwrap(), 0x03);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x7F);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x80);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x2E57);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x3FFF);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x4000);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x1FFF_FFFF);
        assert!(!parser.has_more_data());
    }

    #[test]
    fn compressed_uint_invalid_lead() {
        let mut parser = Parser::new(&[0xFF, 0x00]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn compressed_uint_truncated() {
        let mut parser = Parser::new(&[0xC0, 0x00]);
        assert!(parser.read_compressed_uint().is_err());
    }

    #[test]
    fn transactional_rewinds() {
        let mut parser = Parser::new(&[0xFF, 0x41]);
        assert!(parser.transactional(|p| p.read_compressed_uint()).is_err());
        assert_eq!(parser.pos(), 0);
        assert_eq!(parser.read_le::<u8>().unwrap(), 0xFF);
    }

    #[test]
    fn compressed_tokens() {
        // TypeRef row 0x12, TypeDef row 5, TypeSpec row 1
        let data = [0x49, 0x14, 0x06];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_compressed_token().unwrap().value(), 0x0100_0012);
        assert_eq!(parser.read_compressed_token().unwrap().value(), 0x0200_0005);
        assert_eq!(parser.read_compressed_token().unwrap().value(), 0x1B00_0001);

        let mut parser = Parser::new(&[0x03]);
        assert!(parser.read_compressed_token().is_err());
    }

    #[test]
    fn read_bytes_and_seek() {
        let data = [1, 2, 3, 4, 5];
        let mut parser = Parser::new(&data);

        parser.advance_by(1).unwrap();
        assert_eq!(parser.read_bytes(3).unwrap(), &[2, 3, 4]);
        assert!(parser.read_bytes(2).is_err());
        assert_eq!(parser.remaining(), 1);

        parser.seek(5).unwrap();
        assert!(!parser.has_more_data());
        assert!(parser.seek(6).is_err());

        parser.reset();
        assert_eq!(parser.peek_byte().unwrap(), 1);
        assert_eq!(parser.pos(), 0);
    }

    #[test]
    fn utf16_text() {
        let data = [b'h', 0, b'i', 0, 0x3D, 0xD8];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_utf16(4).unwrap(), "hi");

        let mut parser = Parser::new(&data);
        assert!(parser.read_utf16(3).is_err());

        // A lone high surrogate is replaced, not rejected
        let mut parser = Parser::new(&data);
        let text = parser.read_utf16(6).unwrap();
        assert!(text.starts_with("hi"));
        assert_eq!(text.chars().count(), 3);
    }
}
