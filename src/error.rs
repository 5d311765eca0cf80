use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into two groups. The malformed-image group ([`Error::Malformed`],
/// [`Error::InvalidIdentifier`], [`Error::OutOfBounds`], [`Error::InvalidToken`]) describes
/// structural violations found in the metadata image itself; use [`Error::is_malformed`] to test
/// for the whole group at once. The remaining variants describe misuse of the facade or
/// environmental failures.
///
/// Attribute argument decoding never produces an `Error`. A value that could not be decoded is
/// reported as `None` by the decoders in [`crate::metadata::attributes`].
///
/// # Examples
///
/// ```rust
/// use cilimport::Error;
///
/// fn report(error: &Error) -> &'static str {
///     match error {
///         e if e.is_malformed() => "referenced assembly metadata is invalid",
///         Error::NotSupported(_) => "operation not supported for this image",
///         Error::Disposed => "module has been disposed",
///         _ => "unexpected failure",
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The image is damaged and a structure could not be decoded.
    ///
    /// Raised for bad row ids, bad heap offsets, truncated blobs, invalid string encodings and
    /// handles of an unexpected kind. The error includes the source location where the
    /// malformation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A decoded name failed metadata identifier validation.
    ///
    /// This is a malformed-image condition that carries the kind of identifier (assembly name,
    /// culture, module name, ...) and the offending value.
    #[error("Invalid {kind} in metadata: '{value}'")]
    InvalidIdentifier {
        /// What kind of identifier was rejected
        kind: &'static str,
        /// The rejected value, lossily rendered
        value: String,
    },

    /// An out of bound access was attempted while reading a heap, blob or backend.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// A token referenced a table or row that does not exist.
    #[error("Invalid token - {0}")]
    InvalidToken(Token),

    /// The requested operation cannot be served by this image.
    ///
    /// Hashing a metadata-only image, asking for an unknown hash algorithm, or requesting the
    /// layout of an auto-layout type through the strict accessor all end up here.
    #[error("Operation not supported - {0}")]
    NotSupported(String),

    /// The module was disposed and no longer answers queries.
    #[error("The module has been disposed")]
    Disposed,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while opening a file-backed image.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for every error that describes a structurally invalid image.
    ///
    /// Best-effort queries fold exactly this group into their negative result; strict queries
    /// surface it to the caller.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::Malformed { .. }
                | Error::InvalidIdentifier { .. }
                | Error::OutOfBounds
                | Error::InvalidToken(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_macro_captures_location() {
        let error = malformed_error!("bad row {}", 7);
        match &error {
            Error::Malformed { message, file, line } => {
                assert_eq!(message, "bad row 7");
                assert!(file.ends_with("error.rs"));
                assert!(*line > 0);
            }
            _ => panic!("Expected Malformed variant"),
        }
        assert!(error.is_malformed());
    }

    #[test]
    fn malformed_group() {
        assert!(Error::OutOfBounds.is_malformed());
        assert!(Error::InvalidToken(Token::new(0x0200_0001)).is_malformed());
        assert!(Error::InvalidIdentifier {
            kind: "assembly name",
            value: String::new()
        }
        .is_malformed());

        assert!(!Error::Disposed.is_malformed());
        assert!(!Error::NotSupported("hash".to_string()).is_malformed());
    }

    #[test]
    fn display_messages() {
        let error = Error::InvalidIdentifier {
            kind: "culture",
            value: "en\0US".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid culture in metadata: 'en\0US'");
        assert_eq!(
            Error::InvalidToken(Token::new(0x0100_0002)).to_string(),
            "Invalid token - 0x01000002"
        );
    }
}
