//! Strong name identity: a full public key, or the 8-byte token derived from it.
//!
//! The public key token of ECMA-335 II.6.2.1.3 is the last 8 bytes of the hash of the public key,
//! in reverse order. [`Identity::Token`] stores those 8 bytes as a little-endian `u64`, so
//! `token.to_le_bytes()` yields the bytes in the familiar display order (`b77a5c561934e089`).

use crate::{file::io::read_le, metadata::hash::HashAlgorithm, Error, Result};

/// Length of a public key token in bytes.
pub const PUBLIC_KEY_TOKEN_LEN: usize = 8;

/// An identifier for an assembly's strong name.
/// Either the full public key or its token, as indicated by the `PublicKey` flag of the row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// The full RSA public-key
    PubKey(Vec<u8>),
    /// Token bytes in display order, read as little-endian
    Token(u64),
}

impl Identity {
    /// Create an `Identity` from raw data.
    ///
    /// # Arguments
    /// * `data`    - The public key or token blob
    /// * `is_pub`  - Is it a public-key, or a token
    ///
    /// # Errors
    /// Returns an error if a token is not exactly 8 bytes long.
    pub fn from(data: &[u8], is_pub: bool) -> Result<Self> {
        if is_pub {
            return Ok(Identity::PubKey(data.to_vec()));
        }

        if data.len() != PUBLIC_KEY_TOKEN_LEN {
            return Err(Error::InvalidIdentifier {
                kind: "public key token",
                value: format!("{} bytes", data.len()),
            });
        }

        Ok(Identity::Token(read_le::<u64>(data)?))
    }

    /// Get the token for `algo_id`, the `AssemblyHashAlgorithm` of the target assembly.
    ///
    /// A token identity returns itself regardless of the algorithm.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] if the algorithm is not supported.
    pub fn to_token(&self, algo_id: u32) -> Result<u64> {
        match self {
            Identity::PubKey(data) => {
                let digest = HashAlgorithm::from_id(algo_id)?.digest(data);
                let mut token = [0u8; PUBLIC_KEY_TOKEN_LEN];
                for (slot, byte) in token.iter_mut().zip(digest.iter().rev()) {
                    *slot = *byte;
                }
                Ok(u64::from_le_bytes(token))
            }
            Identity::Token(token) => Ok(*token),
        }
    }

    /// The public key token bytes in display order, computed with SHA-1 for public keys.
    ///
    /// # Errors
    /// Returns an error if the token cannot be computed.
    pub fn token_bytes(&self) -> Result<[u8; PUBLIC_KEY_TOKEN_LEN]> {
        Ok(self.to_token(HashAlgorithm::Sha1.id())?.to_le_bytes())
    }

    /// True for a full public key.
    #[must_use]
    pub fn is_public_key(&self) -> bool {
        matches!(self, Identity::PubKey(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::AssemblyHashAlgorithm;

    /// The ECMA standard "neutral" public key.
    const ECMA_KEY: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];

    #[test]
    fn test_identity_from_pubkey() {
        let identity = Identity::from(&ECMA_KEY, true).unwrap();
        assert_eq!(identity, Identity::PubKey(ECMA_KEY.to_vec()));
        assert!(identity.is_public_key());
    }

    #[test]
    fn test_identity_from_token() {
        let data = [0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89];
        let identity = Identity::from(&data, false).unwrap();

        assert_eq!(identity, Identity::Token(0x89e0_3419_565c_7ab7));
        assert_eq!(identity.token_bytes().unwrap(), data);
    }

    #[test]
    fn test_identity_from_token_wrong_length() {
        assert!(matches!(
            Identity::from(&[1, 2, 3], false),
            Err(Error::InvalidIdentifier { .. })
        ));
        assert!(Identity::from(&[0; 10], false).is_err());
    }

    #[test]
    fn test_ecma_key_token() {
        let identity = Identity::PubKey(ECMA_KEY.to_vec());
        assert_eq!(
            identity.token_bytes().unwrap(),
            [0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89]
        );
    }

    #[test]
    fn test_to_token_algorithms() {
        let identity = Identity::PubKey((0..=255).collect());

        let md5 = identity.to_token(AssemblyHashAlgorithm::MD5).unwrap();
        let sha1 = identity.to_token(AssemblyHashAlgorithm::SHA1).unwrap();
        assert_ne!(md5, sha1);
        assert_eq!(sha1, identity.to_token(AssemblyHashAlgorithm::SHA1).unwrap());

        assert!(matches!(
            identity.to_token(0x9999),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn test_to_token_from_token_identity() {
        let identity = Identity::Token(0x1234_5678_9ABC_DEF0);
        assert_eq!(identity.to_token(AssemblyHashAlgorithm::NONE).unwrap(), 0x1234_5678_9ABC_DEF0);
    }
}
