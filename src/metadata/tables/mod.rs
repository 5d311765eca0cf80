//! Metadata tables: identifiers, coded index kinds, flag constants and row layouts.
//!
//! Only the tables the import facade reads are modelled as rows. [`TableId`] still lists every
//! ECMA-335 table that may appear in a token, so tokens into unmodelled tables (an
//! `InterfaceImpl` parent of a custom attribute, say) can be described and rejected cleanly.
//!
//! # Key Components
//!
//! - [`crate::metadata::tables::TableId`] - Table numbers
//! - [`crate::metadata::tables::CodedIndexType`] - Allowed targets of coded index columns
//! - [`crate::metadata::tables::TableRow`] - A row of any modelled table
//! - [`crate::metadata::tables::RowDefinition`] - Typed access to a single table's rows

mod codedindex;
mod flags;
mod rows;
mod tableid;

pub use codedindex::CodedIndexType;
pub use flags::*;
pub use rows::*;
pub use tableid::TableId;
