//! Assembly identity as read from the `Assembly` and `AssemblyRef` tables.
//!
//! # ECMA-335 References
//!
//! - **Section II.6.2.1**: Assembly versioning - four-part version number semantics
//! - **Section II.6.2.1.3**: Public key and token - strong name identity format
//! - **Section II.22.2**: Assembly table - assembly metadata structure
//! - **Section II.22.5**: AssemblyRef table - assembly reference structure
//!
//! # Validation
//!
//! Names and cultures must be valid metadata identifiers: non-empty and free of NUL characters.
//! An empty culture denotes a culture-neutral assembly. A reference that does not hold a full
//! public key must hold either nothing or an 8-byte token. Only the `Default` and
//! `WindowsRuntime` content types exist. Violations are reported as
//! [`crate::Error::InvalidIdentifier`], a malformed-image condition.
//!
//! Name and culture checks can be switched off through
//! [`crate::metadata::options::ModuleOptions::validate_identifiers`]; the structural checks on
//! tokens and content types always apply.

use std::{fmt, fmt::Write as _, str::FromStr};

use strum::FromRepr;

use crate::{
    metadata::{
        identity::Identity,
        reader::RawMetadata,
        tables::{AssemblyFlags, AssemblyRaw, AssemblyRefRaw},
    },
    Error, Result,
};

/// Complete identity of an assembly definition or reference.
///
/// # Examples
///
/// ```rust
/// use cilimport::metadata::identity::{AssemblyIdentity, AssemblyVersion};
///
/// let identity = AssemblyIdentity::new("MyLibrary", AssemblyVersion::new(1, 2, 3, 4));
/// assert_eq!(
///     identity.display_name(),
///     "MyLibrary, Version=1.2.3.4, Culture=neutral, PublicKeyToken=null"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyIdentity {
    /// Simple assembly name (e.g., "mscorlib", "System.Core").
    pub name: String,
    /// Four-part version number.
    pub version: AssemblyVersion,
    /// Culture of a satellite assembly, `None` for culture-neutral assemblies.
    pub culture: Option<String>,
    /// Public key or public key token, if the assembly is strong named.
    pub strong_name: Option<Identity>,
    /// The reference may be satisfied by an assembly with a different identity at runtime.
    pub retargetable: bool,
    /// Kind of code the assembly contains.
    pub content_type: AssemblyContentType,
}

/// Four-part version numbering for .NET assemblies.
///
/// Versions are compared component-wise in order: major, minor, build, revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssemblyVersion {
    /// Major version component.
    pub major: u16,
    /// Minor version component.
    pub minor: u16,
    /// Build version component.
    pub build: u16,
    /// Revision version component.
    pub revision: u16,
}

/// Content type stored in bits 9 to 11 of the assembly flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromRepr)]
#[repr(u32)]
pub enum AssemblyContentType {
    /// Ordinary managed code
    #[default]
    Default = 0,
    /// Windows Runtime metadata
    WindowsRuntime = 1,
}

impl AssemblyContentType {
    /// Extract the content type from assembly flags.
    ///
    /// # Errors
    /// Returns [`Error::InvalidIdentifier`] for reserved content type values.
    pub fn from_flags(flags: u32) -> Result<Self> {
        let value = (flags & AssemblyFlags::CONTENT_TYPE_MASK) >> 9;
        AssemblyContentType::from_repr(value).ok_or_else(|| Error::InvalidIdentifier {
            kind: "assembly content type",
            value: value.to_string(),
        })
    }
}

/// Raw identity columns shared by `Assembly` and `AssemblyRef` rows.
struct IdentityColumns<'a> {
    version: [u32; 4],
    flags: u32,
    name: &'a str,
    culture: &'a str,
    key: &'a [u8],
    has_public_key: bool,
}

impl AssemblyIdentity {
    /// Create an unsigned, culture-neutral identity.
    #[must_use]
    pub fn new(name: &str, version: AssemblyVersion) -> Self {
        AssemblyIdentity {
            name: name.to_string(),
            version,
            culture: None,
            strong_name: None,
            retargetable: false,
            content_type: AssemblyContentType::Default,
        }
    }

    /// Read the identity of an `Assembly` row. Its key blob always holds a full public key.
    ///
    /// # Errors
    /// Returns an error if a heap reference is broken or the identity is invalid.
    pub fn from_assembly(
        reader: &dyn RawMetadata,
        assembly: &AssemblyRaw,
        validate: bool,
    ) -> Result<Self> {
        Self::from_columns(
            &IdentityColumns {
                version: [
                    assembly.major_version,
                    assembly.minor_version,
                    assembly.build_number,
                    assembly.revision_number,
                ],
                flags: assembly.flags,
                name: reader.string(assembly.name)?,
                culture: reader.string(assembly.culture)?,
                key: reader.blob(assembly.public_key)?,
                has_public_key: true,
            },
            validate,
        )
    }

    /// Read the identity of an `AssemblyRef` row.
    ///
    /// # Errors
    /// Returns an error if a heap reference is broken or the identity is invalid.
    pub fn from_assembly_ref(
        reader: &dyn RawMetadata,
        assembly_ref: &AssemblyRefRaw,
        validate: bool,
    ) -> Result<Self> {
        Self::from_columns(
            &IdentityColumns {
                version: [
                    assembly_ref.major_version,
                    assembly_ref.minor_version,
                    assembly_ref.build_number,
                    assembly_ref.revision_number,
                ],
                flags: assembly_ref.flags,
                name: reader.string(assembly_ref.name)?,
                culture: reader.string(assembly_ref.culture)?,
                key: reader.blob(assembly_ref.public_key_or_token)?,
                has_public_key: assembly_ref.flags & AssemblyFlags::PUBLIC_KEY != 0,
            },
            validate,
        )
    }

    fn from_columns(columns: &IdentityColumns<'_>, validate: bool) -> Result<Self> {
        if validate {
            validate_identifier("assembly name", columns.name)?;
        }

        let culture = if columns.culture.is_empty() {
            None
        } else {
            if validate {
                validate_identifier("culture name", columns.culture)?;
            }
            Some(columns.culture.to_string())
        };

        let strong_name = if columns.key.is_empty() {
            None
        } else {
            Some(Identity::from(columns.key, columns.has_public_key)?)
        };

        Ok(AssemblyIdentity {
            name: columns.name.to_string(),
            version: AssemblyVersion::from_columns(columns.version)?,
            culture,
            strong_name,
            retargetable: columns.flags & AssemblyFlags::RETARGETABLE != 0,
            content_type: AssemblyContentType::from_flags(columns.flags)?,
        })
    }

    /// Display name in the `Name, Version=a.b.c.d, Culture=x, PublicKeyToken=y` format.
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut result = String::with_capacity(self.name.len() + 80);

        result.push_str(&self.name);
        let _ = write!(result, ", Version={}", self.version);
        let _ = write!(
            result,
            ", Culture={}",
            self.culture.as_deref().unwrap_or("neutral")
        );

        result.push_str(", PublicKeyToken=");
        match self.public_key_token() {
            Some(token) => {
                for byte in token {
                    let _ = write!(result, "{byte:02x}");
                }
            }
            None => result.push_str("null"),
        }

        if self.retargetable {
            result.push_str(", Retargetable=Yes");
        }
        if self.content_type == AssemblyContentType::WindowsRuntime {
            result.push_str(", ContentType=WindowsRuntime");
        }

        result
    }

    /// The public key token in display order, derived with SHA-1 from a full public key.
    #[must_use]
    pub fn public_key_token(&self) -> Option<[u8; 8]> {
        self.strong_name
            .as_ref()
            .and_then(|identity| identity.token_bytes().ok())
    }

    /// True if the identity carries a public key or token.
    #[must_use]
    pub fn is_strong_named(&self) -> bool {
        self.strong_name.is_some()
    }

    /// True if the assembly has no culture.
    #[must_use]
    pub fn is_culture_neutral(&self) -> bool {
        self.culture.is_none()
    }
}

/// Check that `value` is a valid metadata identifier: non-empty and without NUL characters.
///
/// # Errors
/// Returns [`Error::InvalidIdentifier`] naming `kind` if the check fails.
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains('\0') {
        return Err(Error::InvalidIdentifier {
            kind,
            value: value.to_string(),
        });
    }

    Ok(())
}

impl AssemblyVersion {
    /// Sentinel value for an unspecified version (0.0.0.0).
    pub const UNKNOWN: Self = Self {
        major: 0,
        minor: 0,
        build: 0,
        revision: 0,
    };

    /// Create a new assembly version with the specified components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// True for [`AssemblyVersion::UNKNOWN`].
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    fn from_columns(columns: [u32; 4]) -> Result<Self> {
        let mut components = [0u16; 4];
        for (component, column) in components.iter_mut().zip(columns) {
            *component = u16::try_from(column)
                .map_err(|_| malformed_error!("Version component {} exceeds 16 bits", column))?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }

    /// Parse a version from one to four dot-separated components.
    ///
    /// ```rust
    /// use cilimport::metadata::identity::AssemblyVersion;
    ///
    /// let partial = AssemblyVersion::parse("2.0")?;
    /// assert_eq!(partial, AssemblyVersion::new(2, 0, 0, 0));
    /// # Ok::<(), cilimport::Error>(())
    /// ```
    ///
    /// # Errors
    /// Returns an error if the version string has an invalid format.
    pub fn parse(version_str: &str) -> Result<Self> {
        let parts: Vec<&str> = version_str.split('.').collect();

        if parts.len() > 4 {
            return Err(malformed_error!("Invalid version format: {}", version_str));
        }

        let mut components = [0u16; 4];
        for (component, part) in components.iter_mut().zip(&parts) {
            *component = part
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version component: {}", part))?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for AssemblyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
