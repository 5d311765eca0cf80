//! Construction options of a [`crate::metadata::module::PeModule`].

/// Options fixed when a module is opened.
///
/// # Examples
///
/// ```rust
/// use cilimport::metadata::options::ModuleOptions;
///
/// let options = ModuleOptions::default().with_embedded_interop_types(true);
/// assert!(options.include_embedded_interop_types);
/// assert!(options.validate_identifiers);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleOptions {
    /// The module's embedded interop types are imported as ordinary types.
    /// Every NoPia query answers negative without scanning attributes.
    pub include_embedded_interop_types: bool,

    /// Assembly names and cultures must be valid metadata identifiers
    /// when assembly identities are read.
    pub validate_identifiers: bool,
}

impl Default for ModuleOptions {
    fn default() -> Self {
        Self {
            include_embedded_interop_types: false,
            validate_identifiers: true,
        }
    }
}

impl ModuleOptions {
    /// Options for loading possibly obfuscated images: identifiers are taken as found.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            include_embedded_interop_types: false,
            validate_identifiers: false,
        }
    }

    /// Options for a module whose interop types are embedded into the compilation.
    #[must_use]
    pub fn embedded_interop() -> Self {
        Self {
            include_embedded_interop_types: true,
            validate_identifiers: true,
        }
    }

    /// Set [`ModuleOptions::include_embedded_interop_types`].
    #[must_use]
    pub fn with_embedded_interop_types(mut self, include: bool) -> Self {
        self.include_embedded_interop_types = include;
        self
    }

    /// Set [`ModuleOptions::validate_identifiers`].
    #[must_use]
    pub fn with_identifier_validation(mut self, validate: bool) -> Self {
        self.validate_identifiers = validate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let default = ModuleOptions::default();
        assert!(!default.include_embedded_interop_types);
        assert!(default.validate_identifiers);

        assert!(!ModuleOptions::lenient().validate_identifiers);
        assert!(ModuleOptions::embedded_interop().include_embedded_interop_types);
    }

    #[test]
    fn setters() {
        let options = ModuleOptions::default()
            .with_identifier_validation(false)
            .with_embedded_interop_types(true);
        assert_eq!(options, ModuleOptions {
            include_embedded_interop_types: true,
            validate_identifiers: false,
        });
    }
}
