// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # cilimport
//!
//! Metadata import for compilers consuming .NET assemblies. `cilimport` sits between a decoded
//! ECMA-335 metadata image and a compiler's symbol tables: it answers the typed questions a
//! binder asks about imported types, members and attributes, and it caches the expensive answers
//! so that many binder threads can share one imported module.
//!
//! ## Features
//!
//! - **Two accessor families** - `_or_throw` queries report malformed metadata, best-effort
//!   queries degrade to "feature absent"
//! - **Well-known attribute catalog** - Signature matching and argument decoding for
//!   `Obsolete`, `DecimalConstant`, `Dynamic`, `TypeIdentifier` and friends
//! - **Lock-free caches** - Publish-once name indexes, forwarder maps and reference lists, plus
//!   a bit-per-row NoPia cache
//! - **Assembly identities** - Versions, cultures, public keys and public key tokens
//! - **Image hashing** - MD5 and the SHA family, computed once per algorithm
//!
//! ## Quick Start
//!
//! ```rust
//! use cilimport::prelude::*;
//!
//! let mut builder = MetadataImageBuilder::new();
//! builder.add_module("Library.dll")?;
//! let mscorlib = builder.add_assembly_ref("mscorlib", [4, 0, 0, 0], &[], "")?;
//! let attribute = builder.add_type_ref(mscorlib, "System", "ObsoleteAttribute")?;
//! let ctor = builder.add_member_ref(attribute, ".ctor", &[0x20, 0x01, 0x01, 0x0E])?;
//! let widget = builder.add_type_def(TypeAttributes::PUBLIC, "Library", "Widget", Token::default())?;
//! builder.add_custom_attribute(widget, ctor, &[0x01, 0x00, 0x03, b'o', b'l', b'd', 0x00, 0x00])?;
//!
//! let module = PeModule::new(Box::new(builder.build()), ModuleOptions::default());
//! let obsolete = module.deprecated_or_obsolete_attribute(widget).unwrap();
//! assert_eq!(obsolete.message.as_deref(), Some("old"));
//! assert!(!obsolete.is_error);
//! # Ok::<(), cilimport::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result`]. Malformed metadata is reported as
//! [`Error::Malformed`], [`Error::InvalidIdentifier`], [`Error::OutOfBounds`] or
//! [`Error::InvalidToken`]; [`Error::is_malformed`] groups them.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: `debug` when a best-effort query absorbs an error and
//! `trace` when a lazy cache is published. No subscriber is installed.

#[macro_use]
pub(crate) mod error;

/// Image byte sources, the blob cursor and little-endian primitives.
pub mod file;

/// Metadata import: the raw reader contract, attribute decoding, caches and the
/// [`metadata::module::PeModule`] facade.
pub mod metadata;

/// Convenient re-exports of the most commonly used types.
///
/// ```rust
/// use cilimport::prelude::*;
///
/// let module = PeModule::new(Box::new(MetadataImageBuilder::new().build()), ModuleOptions::default());
/// assert!(!module.contains_no_pia_local_types());
/// ```
pub mod prelude;

pub(crate) mod utils;

/// `cilimport` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cilimport` Error type
///
/// ```rust
/// use cilimport::{metadata::{image::MetadataImageBuilder, module::PeModule, options::ModuleOptions}, Error};
///
/// let module = PeModule::new(Box::new(MetadataImageBuilder::new().build()), ModuleOptions::default());
/// match module.name() {
///     Ok(name) => println!("Module: {name}"),
///     Err(error) if error.is_malformed() => println!("Malformed: {error}"),
///     Err(error) => println!("Error: {error}"),
/// }
/// ```
pub use error::Error;

/// Bounds-checked cursor over metadata blobs.
pub use file::parser::Parser;

/// The import facade; see [`metadata::module::PeModule`].
pub use metadata::module::PeModule;
