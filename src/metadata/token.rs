//! Metadata tokens, the typed handles used for every row reference.
//!
//! A [`Token`] packs a table id into the high byte and a 1-based row id into the low three
//! bytes (ECMA-335 II.22). Row id 0 denotes "no row" regardless of the table byte, which is how
//! nil coded indexes (an exported type without an implementation, a type without a base type)
//! are represented.
//!
//! # Examples
//!
//! ```rust
//! use cilimport::metadata::{tables::TableId, token::Token};
//!
//! let token = Token::from_parts(TableId::TypeDef, 5);
//! assert_eq!(token.value(), 0x0200_0005);
//! assert_eq!(token.kind(), Some(TableId::TypeDef));
//! assert!(token.is(TableId::TypeDef));
//! assert!(!token.is_null());
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::metadata::tables::TableId;

/// A metadata token: `table << 24 | row`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Token(pub u32);

impl Token {
    /// Create a token from its raw 32-bit value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token for `row` of `table`.
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw 32-bit value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The raw table byte.
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The table this token refers to, if the table byte is a known table.
    #[must_use]
    pub fn kind(&self) -> Option<TableId> {
        TableId::from_u8(self.table())
    }

    /// Returns true if this token points into `table`.
    #[must_use]
    pub fn is(&self, table: TableId) -> bool {
        self.table() == table as u8
    }

    /// The 1-based row id.
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if the token refers to no row.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}
