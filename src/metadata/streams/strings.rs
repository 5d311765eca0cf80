//! The `#Strings` heap: NUL-terminated UTF-8 identifiers (ECMA-335 II.24.2.3).

use std::{collections::HashMap, ffi::CStr};

use crate::{Error::OutOfBounds, Result};

/// A read-only view of a `#Strings` heap.
///
/// ## Examples
///
/// ```rust
/// use cilimport::metadata::streams::Strings;
///
/// let data = &[0u8, b'<', b'M', b'o', b'd', b'u', b'l', b'e', b'>', 0u8];
/// let strings = Strings::from(data)?;
///
/// assert_eq!(strings.get(0)?, "");
/// assert_eq!(strings.get(1)?, "<Module>");
/// # Ok::<(), cilimport::Error>(())
/// ```
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Create a view over heap bytes. The heap must start with the empty string.
    ///
    /// # Errors
    /// Returns an error if `data` is empty or does not start with a NUL byte.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #String heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Read the string starting at byte offset `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` is outside the heap, or
    /// [`crate::Error::Malformed`] if the string is unterminated or not valid UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        match CStr::from_bytes_until_nul(&self.data[index..]) {
            Ok(result) => match result.to_str() {
                Ok(result) => Ok(result),
                Err(_) => Err(malformed_error!("Invalid string at index - {}", index)),
            },
            Err(_) => Err(malformed_error!("Invalid string at index - {}", index)),
        }
    }
}

/// Builds `#Strings` heap bytes, interning identical strings.
#[derive(Debug, Clone)]
pub struct StringsBuilder {
    data: Vec<u8>,
    interned: HashMap<String, u32>,
}

impl StringsBuilder {
    /// Create a heap holding only the empty string at index 0.
    #[must_use]
    pub fn new() -> Self {
        StringsBuilder {
            data: vec![0],
            interned: HashMap::new(),
        }
    }

    /// Add `value` and return its heap index. The empty string is always index 0.
    ///
    /// # Errors
    /// Returns an error if `value` contains a NUL character or the heap outgrows `u32`.
    pub fn add(&mut self, value: &str) -> Result<u32> {
        if value.is_empty() {
            return Ok(0);
        }
        if value.contains('\0') {
            return Err(malformed_error!(
                "String heap entries cannot contain NUL - {:?}",
                value
            ));
        }
        if let Some(index) = self.interned.get(value) {
            return Ok(*index);
        }

        let index = u32::try_from(self.data.len())
            .map_err(|_| malformed_error!("#Strings heap exceeds 4GB"))?;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.interned.insert(value.to_string(), index);

        Ok(index)
    }

    /// Consume the builder and return the heap bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

impl Default for StringsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
