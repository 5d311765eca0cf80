//! Metadata import for ECMA-335 modules.
//!
//! This module contains everything between a decoded metadata image and the symbol layer of a
//! compiler: the raw reader contract, recognition and decoding of well-known attributes, the
//! NoPia local type cache, namespace grouping and type forwarders, assembly identities, and the
//! [`module::PeModule`] facade tying them together.
//!
//! # Key Components
//!
//! - [`module`] - The [`module::PeModule`] facade and its typed property records
//! - [`reader`] - The [`reader::RawMetadata`] accessor contract
//! - [`image`] - An in-memory [`reader::RawMetadata`] and the builder producing it
//! - [`attributes`] - Attribute catalog, signature matcher and value decoders
//! - [`nopia`] - Per-row cache of embedded interop types
//! - [`namespaces`] - Namespace grouping, name indexes and the forwarder map
//! - [`identity`] - Assembly identities and strong names
//! - [`hash`] - Cached hashes of the full image
//! - [`layout`] - Type layout, platform invoke data, constants and resources
//! - [`token`] - Metadata tokens
//! - [`tables`], [`streams`], [`signatures`] - Rows, heaps and signature constants
//!
//! # Examples
//!
//! ```rust
//! use cilimport::metadata::{
//!     image::MetadataImageBuilder, module::PeModule, namespaces::NameComparer,
//!     options::ModuleOptions, tables::TypeAttributes, token::Token,
//! };
//!
//! let mut builder = MetadataImageBuilder::new();
//! builder.add_module("Library.dll")?;
//! builder.add_type_def(TypeAttributes::PUBLIC, "Library.Collections", "Bag", Token::default())?;
//! builder.add_type_def(TypeAttributes::PUBLIC, "Library", "Widget", Token::default())?;
//!
//! let module = PeModule::new(Box::new(builder.build()), ModuleOptions::default());
//! let groups = module.group_types_by_namespace_or_throw(NameComparer::Ordinal)?;
//! assert_eq!(groups[0].namespace, "Library");
//! assert_eq!(groups[1].namespace, "Library.Collections");
//! # Ok::<(), cilimport::Error>(())
//! ```

pub mod attributes;
pub mod hash;
pub mod identity;
pub mod image;
pub mod layout;
pub mod module;
pub mod namespaces;
pub mod nopia;
pub mod options;
pub mod reader;
pub mod signatures;
pub mod streams;
pub mod tables;
pub mod token;
