//! The `#GUID` heap: 1-based array of 16-byte GUIDs (ECMA-335 II.24.2.5).

use crate::{Error::OutOfBounds, Result};

/// A read-only view of a `#GUID` heap.
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Create a view over heap bytes.
    ///
    /// # Errors
    /// Returns an error if the heap is not a whole number of 16-byte entries.
    pub fn from(data: &'a [u8]) -> Result<Guid<'a>> {
        if data.len() % 16 != 0 {
            return Err(malformed_error!(
                "Data for #Guid heap is not a multiple of 16 bytes - {}",
                data.len()
            ));
        }

        Ok(Guid { data })
    }

    /// Read the GUID at 1-based `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for index 0 or an index past the end of the heap.
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index < 1 || index > self.data.len() / 16 {
            return Err(OutOfBounds);
        }

        let offset_start = (index - 1) * 16;
        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(&self.data[offset_start..offset_start + 16]);

        Ok(uguid::Guid::from_bytes(buffer))
    }
}

/// Builds `#GUID` heap bytes.
#[derive(Debug, Clone, Default)]
pub struct GuidBuilder {
    data: Vec<u8>,
}

impl GuidBuilder {
    /// Create an empty heap.
    #[must_use]
    pub fn new() -> Self {
        GuidBuilder { data: Vec::new() }
    }

    /// Add `guid` and return its 1-based index. Identical GUIDs share an index.
    pub fn add(&mut self, guid: uguid::Guid) -> u32 {
        let bytes = guid.to_bytes();
        if let Some(position) = self
            .data
            .chunks_exact(16)
            .position(|entry| entry == bytes.as_slice())
        {
            return position as u32 + 1;
        }

        self.data.extend_from_slice(&bytes);
        (self.data.len() / 16) as u32
    }

    /// Consume the builder and return the heap bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data : [u8; 48] = [
            0x8e, 0x90, 0x37, 0xd4, 0xe6, 0x65, 0x7c, 0x48, 0x97, 0x35, 0x7b, 0xdf, 0xf6, 0x99, 0xbe, 0xa5,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let guids = Guid::from(&data).unwrap();

        assert_eq!(
            guids.get(1).unwrap(),
            uguid::guid!("d437908e-65e6-487c-9735-7bdff699bea5")
        );
        assert_eq!(
            guids.get(2).unwrap(),
            uguid::guid!("AAAAAAAA-AAAA-AAAA-AAAA-AAAAAAAAAAAA")
        );
        assert_eq!(
            guids.get(3).unwrap(),
            uguid::guid!("00000000-0000-0000-0000-000000000000")
        );
        assert!(guids.get(0).is_err());
        assert!(guids.get(4).is_err());
    }

    #[test]
    fn builder() {
        let mut builder = GuidBuilder::new();
        let first = builder.add(uguid::guid!("d437908e-65e6-487c-9735-7bdff699bea5"));
        let second = builder.add(uguid::guid!("AAAAAAAA-AAAA-AAAA-AAAA-AAAAAAAAAAAA"));
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(
            builder.add(uguid::guid!("d437908e-65e6-487c-9735-7bdff699bea5")),
            1
        );

        let data = builder.finish();
        let guids = Guid::from(&data).unwrap();
        assert_eq!(
            guids.get(2).unwrap(),
            uguid::guid!("AAAAAAAA-AAAA-AAAA-AAAA-AAAAAAAAAAAA")
        );
    }
}
