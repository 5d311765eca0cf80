//! Recognition and decoding of well-known custom attributes.
//!
//! Compilers importing metadata care about a fixed set of attributes: `ParamArray`, `Obsolete`,
//! `DecimalConstant`, `TypeIdentifier` and so on. This module knows how to find those on a
//! metadata entity and how to read their constructor arguments, without building a general
//! custom attribute model.
//!
//! # Key Components
//!
//! - [`AttributeDescription`] - Catalog entry: attribute type plus accepted constructor
//!   signatures
//! - [`find_target_attribute`], [`find_last_target_attribute`], [`find_target_attributes`] -
//!   First, last and all matches on a parent
//! - [`decode`] - Extract a [`ValueKind`] shaped value from an attribute blob
//! - [`Decimal`], [`ObsoleteAttributeData`] - Typed payloads
//!
//! Matching and decoding are independent steps. An attribute whose constructor matched may still
//! carry a blob that does not decode, and callers treat that as "value not available".
//!
//! # Examples
//!
//! ```rust
//! use cilimport::metadata::{
//!     attributes::{find_target_attribute, AttributeDescription},
//!     image::MetadataImageBuilder,
//!     tables::TypeAttributes,
//!     token::Token,
//! };
//!
//! let mut builder = MetadataImageBuilder::new();
//! builder.add_module("Library.dll")?;
//! let mscorlib = builder.add_assembly_ref("mscorlib", [4, 0, 0, 0], &[], "")?;
//! let attribute = builder.add_type_ref(mscorlib, "System", "ParamArrayAttribute")?;
//! let ctor = builder.add_member_ref(attribute, ".ctor", &[0x20, 0x00, 0x01])?;
//! let widget = builder.add_type_def(TypeAttributes::PUBLIC, "Library", "Widget", Token::default())?;
//! builder.add_custom_attribute(widget, ctor, &[0x01, 0x00])?;
//! let image = builder.build();
//!
//! let info = find_target_attribute(&image, widget, &AttributeDescription::PARAM_ARRAY);
//! assert_eq!(info.map(|info| info.signature_index), Some(0));
//! # Ok::<(), cilimport::Error>(())
//! ```

mod decoder;
mod description;
mod matcher;
mod values;

pub use decoder::{
    crack_bool, crack_bool_array, crack_byte, crack_decimal, crack_deprecated, crack_i16,
    crack_i32, crack_i64, crack_obsolete, crack_string, crack_string_and_int, decode,
    decode_attribute, AttributeValue, ValueKind, ATTRIBUTE_PROLOG, NULL_STRING_MARKER,
};
pub use description::{AttributeDescription, SignatureTemplate, SignatureToken, TypeHandleTarget};
pub use matcher::{
    attribute_namespace_and_name, count_target_attributes_or_throw, find_last_target_attribute,
    find_target_attribute, find_target_attributes, is_nested, is_target_attribute,
    method_signature, target_attribute_signature_index, type_and_constructor, AttributeInfo,
    INSTANCE_CONSTRUCTOR_NAME,
};
pub use values::{
    ComInterfaceType, Decimal, ObsoleteAttributeData, ObsoleteAttributeKind, TypeLibTypeFlags,
    DECIMAL_MAX_SCALE,
};
