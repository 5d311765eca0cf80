//! # cilimport Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! cilimport library. Import this module to get quick access to the facade, the in-memory image
//! builder and the attribute catalog.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilimport operations
pub use crate::Error;

/// The result type used throughout cilimport
pub use crate::Result;

/// Bounds-checked blob cursor
pub use crate::Parser;

// ================================================================================================
// Facade
// ================================================================================================

/// The import facade and its options
pub use crate::metadata::{module::PeModule, options::ModuleOptions};

/// Typed property records returned by the facade
pub use crate::metadata::module::{
    EventDefProps, FieldDefProps, GenericParamProps, MemberRefProps, MethodDefProps,
    MethodSpecProps, ParamProps, PropertyDefProps, TypeDefProps, TypeRefProps,
};

// ================================================================================================
// Raw Metadata
// ================================================================================================

/// Reader contract and the in-memory implementation
pub use crate::metadata::{
    image::{MetadataImage, MetadataImageBuilder},
    reader::RawMetadata,
};

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Table identifiers and flag constants
pub use crate::metadata::tables::{
    AssemblyFlags, AssemblyHashAlgorithm, FileAttributes, PInvokeAttributes, TableId,
    TypeAttributes,
};

/// Image byte sources
pub use crate::file::{Backend, Memory, Physical};

// ================================================================================================
// Attributes and Values
// ================================================================================================

/// Attribute catalog and match records
pub use crate::metadata::attributes::{
    AttributeDescription, AttributeInfo, AttributeValue, ComInterfaceType, Decimal,
    ObsoleteAttributeData, ObsoleteAttributeKind, TypeLibTypeFlags, ValueKind,
};

/// Values describing the physical shape of imported entities
pub use crate::metadata::layout::{
    ConstantValue, DllImportData, EmbeddedResource, LayoutKind, TypeLayout,
};

// ================================================================================================
// Caches and Identities
// ================================================================================================

/// Namespace grouping and the forwarder map
pub use crate::metadata::namespaces::{
    ForwarderMap, IdentifierCollection, NameComparer, NamespaceGroup,
};

/// Embedded interop type cache
pub use crate::metadata::nopia::{NoPiaCache, NoPiaLocalTypeInfo, ThreeState};

/// Assembly identities and strong names
pub use crate::metadata::identity::{AssemblyIdentity, AssemblyVersion, Identity};

/// Image hashing
pub use crate::metadata::hash::{HashAlgorithm, HashProvider, HashSource};
