//! Whole-image hashing with a per-algorithm cache.
//!
//! Assembly references may carry a hash of the referenced file, and strong name tooling needs a
//! digest of the complete image. Both only make sense when the full bytes of the image are
//! resident, so a [`HashProvider`] built without a [`HashSource`] refuses every request.
//!
//! Digests are computed on first request and kept for the lifetime of the provider. The
//! computation runs without holding a lock; if two threads race, both compute and the first
//! published digest is the one every caller sees afterwards.

use std::sync::Arc;

use dashmap::DashMap;
use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use strum::{EnumIter, FromRepr};
use tracing::trace;

use crate::{file::Backend, Error, Result};

/// Hash algorithms an image can be hashed with, keyed by their `AssemblyHashAlgorithm` id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter)]
#[repr(u32)]
pub enum HashAlgorithm {
    /// MD5, 16 byte digest
    Md5 = 0x8003,
    /// SHA-1, 20 byte digest
    Sha1 = 0x8004,
    /// SHA-256, 32 byte digest
    Sha256 = 0x800C,
    /// SHA-384, 48 byte digest
    Sha384 = 0x800D,
    /// SHA-512, 64 byte digest
    Sha512 = 0x800E,
}

impl HashAlgorithm {
    /// Map an `AssemblyHashAlgorithm` id to a supported algorithm.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for `NONE` and unknown ids.
    pub fn from_id(id: u32) -> Result<HashAlgorithm> {
        HashAlgorithm::from_repr(id).ok_or_else(|| {
            Error::NotSupported(format!("hash algorithm 0x{id:04x} is not supported"))
        })
    }

    /// The `AssemblyHashAlgorithm` id of this algorithm.
    #[must_use]
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Length of the digest in bytes.
    #[must_use]
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Hash `data` with this algorithm.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Md5 => Md5::digest(data).to_vec(),
            HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Something that can hash the complete bytes of an image.
pub trait HashSource: Send + Sync {
    /// Compute the digest of the whole image.
    ///
    /// # Errors
    /// Returns an error if the image bytes cannot be read.
    fn compute_hash(&self, algorithm: HashAlgorithm) -> Result<Vec<u8>>;
}

/// [`HashSource`] over a resident image [`Backend`].
pub struct ImageHashSource {
    image: Box<dyn Backend>,
}

impl ImageHashSource {
    /// Hash the bytes held by `image`.
    #[must_use]
    pub fn new(image: Box<dyn Backend>) -> Self {
        ImageHashSource { image }
    }

    /// The underlying image bytes.
    #[must_use]
    pub fn image(&self) -> &dyn Backend {
        self.image.as_ref()
    }
}

impl HashSource for ImageHashSource {
    fn compute_hash(&self, algorithm: HashAlgorithm) -> Result<Vec<u8>> {
        Ok(algorithm.digest(self.image.data()))
    }
}

/// Lazily computed, cached image digests.
pub struct HashProvider {
    source: Option<Box<dyn HashSource>>,
    hashes: DashMap<HashAlgorithm, Arc<[u8]>>,
}

impl HashProvider {
    /// Provider backed by `source`, or a metadata-only provider for `None`.
    #[must_use]
    pub fn new(source: Option<Box<dyn HashSource>>) -> Self {
        HashProvider {
            source,
            hashes: DashMap::new(),
        }
    }

    /// True if the complete image is available for hashing.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.source.is_some()
    }

    /// Number of algorithms with a cached digest.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.hashes.len()
    }

    /// Digest of the image for the `AssemblyHashAlgorithm` id `algorithm_id`.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for metadata-only images and unknown algorithm ids, or the
    /// error of the underlying source.
    pub fn hash(&self, algorithm_id: u32) -> Result<Arc<[u8]>> {
        let algorithm = HashAlgorithm::from_id(algorithm_id)?;
        self.hash_with(algorithm)
    }

    /// Digest of the image for `algorithm`.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for metadata-only images, or the error of the underlying
    /// source.
    pub fn hash_with(&self, algorithm: HashAlgorithm) -> Result<Arc<[u8]>> {
        if let Some(cached) = self.hashes.get(&algorithm) {
            return Ok(Arc::clone(&cached));
        }

        let Some(source) = &self.source else {
            return Err(Error::NotSupported(
                "hashing requires the entire image, only metadata is available".to_string(),
            ));
        };

        let digest: Arc<[u8]> = Arc::from(source.compute_hash(algorithm)?);
        let published = self.hashes.entry(algorithm).or_insert_with(|| {
            trace!(algorithm = ?algorithm, "image hash published");
            digest
        });
        Ok(Arc::clone(&published))
    }
}

impl std::fmt::Debug for HashProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashProvider")
            .field("available", &self.is_available())
            .field("cached", &self.hashes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use strum::IntoEnumIterator;

    use super::*;
    use crate::{file::Memory, metadata::tables::AssemblyHashAlgorithm};

    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    impl HashSource for CountingSource {
        fn compute_hash(&self, algorithm: HashAlgorithm) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(algorithm.digest(b"image"))
        }
    }

    #[test]
    fn algorithm_ids() {
        assert_eq!(HashAlgorithm::from_id(0x8004).unwrap(), HashAlgorithm::Sha1);
        assert_eq!(HashAlgorithm::Sha256.id(), 0x800C);
        assert!(matches!(
            HashAlgorithm::from_id(AssemblyHashAlgorithm::NONE),
            Err(Error::NotSupported(_))
        ));

        for algorithm in HashAlgorithm::iter() {
            assert_eq!(algorithm.digest(&[]).len(), algorithm.digest_len());
        }
    }

    #[test]
    fn known_digests() {
        let sha1 = HashAlgorithm::Sha1.digest(b"abc");
        assert_eq!(
            sha1,
            [
                0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78, 0x50,
                0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d
            ]
        );

        let md5 = HashAlgorithm::Md5.digest(b"");
        assert_eq!(md5[..4], [0xd4, 0x1d, 0x8c, 0xd9]);
    }

    #[test]
    fn computed_once_per_algorithm() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = HashProvider::new(Some(Box::new(CountingSource {
            calls: Arc::clone(&calls),
        })));

        let first = provider.hash(AssemblyHashAlgorithm::SHA1).unwrap();
        let second = provider.hash(AssemblyHashAlgorithm::SHA1).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        provider.hash(AssemblyHashAlgorithm::SHA256).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(provider.cached(), 2);
    }

    #[test]
    fn metadata_only() {
        let provider = HashProvider::new(None);
        assert!(!provider.is_available());
        assert!(matches!(
            provider.hash(AssemblyHashAlgorithm::SHA1),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn image_source() {
        let source = ImageHashSource::new(Box::new(Memory::new(b"abc".to_vec())));
        assert_eq!(source.image().len(), 3);

        let provider = HashProvider::new(Some(Box::new(source)));
        let digest = provider.hash_with(HashAlgorithm::Sha1).unwrap();
        assert_eq!(&digest[..], HashAlgorithm::Sha1.digest(b"abc").as_slice());
    }
}
