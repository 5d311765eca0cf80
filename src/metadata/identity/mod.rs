//! Assembly identity and strong names.
//!
//! # ECMA-335 References
//!
//! - **Section II.6.3**: Referencing assemblies - defines assembly reference format
//! - **Section II.22.2**: Assembly table - defines assembly metadata structure
//! - **Section II.22.5**: AssemblyRef table - defines assembly reference structure
//! - **Section II.6.2.1.3**: PublicKeyToken - defines public key token computation
//!
//! # Key Components
//!
//! - [`AssemblyIdentity`] - Name, version, culture, strong name and flags of an assembly
//! - [`AssemblyVersion`] - Four-part version numbering with parsing and comparison
//! - [`Identity`] - Public key or public key token
//!
//! # Examples
//!
//! ```rust
//! use cilimport::metadata::{identity::Identity, tables::AssemblyHashAlgorithm};
//!
//! let ecma_key = [0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];
//! let identity = Identity::from(&ecma_key, true)?;
//!
//! let token = identity.to_token(AssemblyHashAlgorithm::SHA1)?;
//! assert_eq!(token.to_le_bytes(), [0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89]);
//! # Ok::<(), cilimport::Error>(())
//! ```

pub use assembly::{validate_identifier, AssemblyContentType, AssemblyIdentity, AssemblyVersion};
pub use cryptographic::{Identity, PUBLIC_KEY_TOKEN_LEN};

mod assembly;
mod cryptographic;
