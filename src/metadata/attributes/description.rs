//! Catalog of the attributes the facade recognizes.
//!
//! An [`AttributeDescription`] names an attribute type and lists, in priority order, the
//! constructor signatures that count as a match. Each [`SignatureTemplate`] is compared token by
//! token against the `MethodDefSig` (ECMA-335 II.23.2.1) of the constructor an attribute row
//! points to.
//!
//! `class` and `valuetype` parameters are written as [`SignatureToken::TypeHandle`] and carry the
//! well-known type the referenced `TypeDef`/`TypeRef` has to name, e.g. `System.Type` or an enum
//! such as `System.AttributeTargets`. Array parameters are an `SZARRAY` token followed by the
//! element type token.

use crate::metadata::signatures::{CALLING_CONVENTION, ELEMENT_TYPE};

/// Well-known types a handle-typed constructor parameter can be required to reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeHandleTarget {
    /// `System.Type`
    SystemType,
    /// `System.AttributeTargets`
    AttributeTargets,
    /// `System.Runtime.InteropServices.ComInterfaceType`
    ComInterfaceType,
    /// `System.Runtime.InteropServices.TypeLibTypeFlags`
    TypeLibTypeFlags,
    /// `Windows.Foundation.Metadata.DeprecationType`
    DeprecationType,
    /// `Windows.Foundation.Metadata.Platform`
    Platform,
}

impl TypeHandleTarget {
    /// Namespace of the target type.
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        match self {
            TypeHandleTarget::SystemType | TypeHandleTarget::AttributeTargets => "System",
            TypeHandleTarget::ComInterfaceType | TypeHandleTarget::TypeLibTypeFlags => {
                "System.Runtime.InteropServices"
            }
            TypeHandleTarget::DeprecationType | TypeHandleTarget::Platform => {
                "Windows.Foundation.Metadata"
            }
        }
    }

    /// Simple name of the target type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            TypeHandleTarget::SystemType => "Type",
            TypeHandleTarget::AttributeTargets => "AttributeTargets",
            TypeHandleTarget::ComInterfaceType => "ComInterfaceType",
            TypeHandleTarget::TypeLibTypeFlags => "TypeLibTypeFlags",
            TypeHandleTarget::DeprecationType => "DeprecationType",
            TypeHandleTarget::Platform => "Platform",
        }
    }
}

/// One token of a constructor signature template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureToken {
    /// An `ELEMENT_TYPE` code that must appear verbatim
    Element(u8),
    /// A `class` or `valuetype` parameter referencing the given type
    TypeHandle(TypeHandleTarget),
}

/// An acceptable constructor signature: instance, `void` return, and the listed parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureTemplate {
    /// Calling convention byte
    pub header: u8,
    /// Number of parameters
    pub param_count: u8,
    /// Return type code
    pub return_type: u8,
    /// Parameter tokens; an array parameter spans two tokens
    pub parameters: &'static [SignatureToken],
}

impl SignatureTemplate {
    /// An instance constructor taking `parameters`.
    #[must_use]
    pub const fn constructor(parameters: &'static [SignatureToken]) -> Self {
        SignatureTemplate {
            header: CALLING_CONVENTION::HASTHIS,
            param_count: count_parameters(parameters),
            return_type: ELEMENT_TYPE::VOID,
            parameters,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn count_parameters(tokens: &[SignatureToken]) -> u8 {
    let mut count = 0;
    let mut index = 0;
    while index < tokens.len() {
        if let SignatureToken::Element(ELEMENT_TYPE::SZARRAY) = tokens[index] {
            // The element type belongs to the same parameter
            index += 1;
        }
        count += 1;
        index += 1;
    }
    count as u8
}

/// A recognized attribute type and its accepted constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescription {
    /// Namespace of the attribute type
    pub namespace: &'static str,
    /// Simple name of the attribute type
    pub name: &'static str,
    /// Accepted constructor signatures, matched in order
    pub signatures: &'static [SignatureTemplate],
    /// Compare namespace and name ignoring case
    pub match_ignoring_case: bool,
}

mod templates {
    use super::{SignatureTemplate, SignatureToken, TypeHandleTarget};
    use crate::metadata::signatures::ELEMENT_TYPE;

    const STRING: SignatureToken = SignatureToken::Element(ELEMENT_TYPE::STRING);
    const BOOLEAN: SignatureToken = SignatureToken::Element(ELEMENT_TYPE::BOOLEAN);
    const U1: SignatureToken = SignatureToken::Element(ELEMENT_TYPE::U1);
    const I2: SignatureToken = SignatureToken::Element(ELEMENT_TYPE::I2);
    const I4: SignatureToken = SignatureToken::Element(ELEMENT_TYPE::I4);
    const U4: SignatureToken = SignatureToken::Element(ELEMENT_TYPE::U4);
    const I8: SignatureToken = SignatureToken::Element(ELEMENT_TYPE::I8);
    const SZARRAY: SignatureToken = SignatureToken::Element(ELEMENT_TYPE::SZARRAY);
    const TYPE: SignatureToken = SignatureToken::TypeHandle(TypeHandleTarget::SystemType);
    const DEPRECATION_TYPE: SignatureToken =
        SignatureToken::TypeHandle(TypeHandleTarget::DeprecationType);

    pub const VOID: SignatureTemplate = SignatureTemplate::constructor(&[]);
    pub const STRING_ARG: SignatureTemplate = SignatureTemplate::constructor(&[STRING]);
    pub const BOOL_ARG: SignatureTemplate = SignatureTemplate::constructor(&[BOOLEAN]);
    pub const INT16_ARG: SignatureTemplate = SignatureTemplate::constructor(&[I2]);
    pub const INT64_ARG: SignatureTemplate = SignatureTemplate::constructor(&[I8]);
    pub const TYPE_ARG: SignatureTemplate = SignatureTemplate::constructor(&[TYPE]);
    pub const TYPE_INT: SignatureTemplate = SignatureTemplate::constructor(&[TYPE, I4]);
    pub const STRING_STRING: SignatureTemplate = SignatureTemplate::constructor(&[STRING, STRING]);
    pub const STRING_BOOL: SignatureTemplate = SignatureTemplate::constructor(&[STRING, BOOLEAN]);
    pub const BOOL_ARRAY: SignatureTemplate = SignatureTemplate::constructor(&[SZARRAY, BOOLEAN]);
    pub const DECIMAL_UNSIGNED: SignatureTemplate =
        SignatureTemplate::constructor(&[U1, U1, U4, U4, U4]);
    pub const DECIMAL_SIGNED: SignatureTemplate =
        SignatureTemplate::constructor(&[U1, U1, I4, I4, I4]);
    pub const ATTRIBUTE_TARGETS: SignatureTemplate = SignatureTemplate::constructor(&[
        SignatureToken::TypeHandle(TypeHandleTarget::AttributeTargets),
    ]);
    pub const COM_INTERFACE_TYPE: SignatureTemplate = SignatureTemplate::constructor(&[
        SignatureToken::TypeHandle(TypeHandleTarget::ComInterfaceType),
    ]);
    pub const TYPE_LIB_TYPE_FLAGS: SignatureTemplate = SignatureTemplate::constructor(&[
        SignatureToken::TypeHandle(TypeHandleTarget::TypeLibTypeFlags),
    ]);
    pub const DEPRECATED: SignatureTemplate =
        SignatureTemplate::constructor(&[STRING, DEPRECATION_TYPE, U4]);
    pub const DEPRECATED_PLATFORM: SignatureTemplate = SignatureTemplate::constructor(&[
        STRING,
        DEPRECATION_TYPE,
        U4,
        SignatureToken::TypeHandle(TypeHandleTarget::Platform),
    ]);
    pub const DEPRECATED_CONTRACT: SignatureTemplate =
        SignatureTemplate::constructor(&[STRING, DEPRECATION_TYPE, U4, STRING]);
}

const COMPILER_SERVICES: &str = "System.Runtime.CompilerServices";
const INTEROP_SERVICES: &str = "System.Runtime.InteropServices";

impl AttributeDescription {
    const fn new(
        namespace: &'static str,
        name: &'static str,
        signatures: &'static [SignatureTemplate],
    ) -> Self {
        AttributeDescription {
            namespace,
            name,
            signatures,
            match_ignoring_case: false,
        }
    }

    /// `System.ParamArrayAttribute()`
    pub const PARAM_ARRAY: Self = Self::new("System", "ParamArrayAttribute", &[templates::VOID]);

    /// `System.Runtime.CompilerServices.ExtensionAttribute()`
    pub const EXTENSION: Self =
        Self::new(COMPILER_SERVICES, "ExtensionAttribute", &[templates::VOID]);

    /// `ExtensionAttribute()`, matched ignoring case
    pub const CASE_INSENSITIVE_EXTENSION: Self = AttributeDescription {
        match_ignoring_case: true,
        ..Self::EXTENSION
    };

    /// `Microsoft.VisualBasic.Embedded()`
    pub const VISUAL_BASIC_EMBEDDED: Self =
        Self::new("Microsoft.VisualBasic", "Embedded", &[templates::VOID]);

    /// `System.Runtime.CompilerServices.RequiredAttributeAttribute(Type)`
    pub const REQUIRED_ATTRIBUTE: Self = Self::new(
        COMPILER_SERVICES,
        "RequiredAttributeAttribute",
        &[templates::TYPE_ARG],
    );

    /// `System.Reflection.DefaultMemberAttribute(string)`
    pub const DEFAULT_MEMBER: Self = Self::new(
        "System.Reflection",
        "DefaultMemberAttribute",
        &[templates::STRING_ARG],
    );

    /// `System.Runtime.InteropServices.GuidAttribute(string)`
    pub const GUID: Self = Self::new(INTEROP_SERVICES, "GuidAttribute", &[templates::STRING_ARG]);

    /// `System.Runtime.CompilerServices.AccessedThroughPropertyAttribute(string)`
    pub const ACCESSED_THROUGH_PROPERTY: Self = Self::new(
        COMPILER_SERVICES,
        "AccessedThroughPropertyAttribute",
        &[templates::STRING_ARG],
    );

    /// `System.Runtime.CompilerServices.FixedBufferAttribute(Type, int)`
    pub const FIXED_BUFFER: Self = Self::new(
        COMPILER_SERVICES,
        "FixedBufferAttribute",
        &[templates::TYPE_INT],
    );

    /// `System.Runtime.CompilerServices.DynamicAttribute()` and `(bool[])`
    pub const DYNAMIC: Self = Self::new(
        COMPILER_SERVICES,
        "DynamicAttribute",
        &[templates::VOID, templates::BOOL_ARRAY],
    );

    /// `System.Runtime.CompilerServices.NullableAttribute()` and `(bool[])`
    pub const NULLABLE: Self = Self::new(
        COMPILER_SERVICES,
        "NullableAttribute",
        &[templates::VOID, templates::BOOL_ARRAY],
    );

    /// `System.Runtime.CompilerServices.NullableOptOutAttribute(bool)`
    pub const NULLABLE_OPT_OUT: Self = Self::new(
        COMPILER_SERVICES,
        "NullableOptOutAttribute",
        &[templates::BOOL_ARG],
    );

    /// `System.ObsoleteAttribute()`, `(string)` and `(string, bool)`
    pub const OBSOLETE: Self = Self::new(
        "System",
        "ObsoleteAttribute",
        &[
            templates::VOID,
            templates::STRING_ARG,
            templates::STRING_BOOL,
        ],
    );

    /// `Windows.Foundation.Metadata.DeprecatedAttribute` with its three constructors
    pub const DEPRECATED: Self = Self::new(
        "Windows.Foundation.Metadata",
        "DeprecatedAttribute",
        &[
            templates::DEPRECATED,
            templates::DEPRECATED_PLATFORM,
            templates::DEPRECATED_CONTRACT,
        ],
    );

    /// `System.AttributeUsageAttribute(AttributeTargets)`
    pub const ATTRIBUTE_USAGE: Self = Self::new(
        "System",
        "AttributeUsageAttribute",
        &[templates::ATTRIBUTE_TARGETS],
    );

    /// `System.Runtime.InteropServices.InterfaceTypeAttribute(short)` and `(ComInterfaceType)`
    pub const INTERFACE_TYPE: Self = Self::new(
        INTEROP_SERVICES,
        "InterfaceTypeAttribute",
        &[templates::INT16_ARG, templates::COM_INTERFACE_TYPE],
    );

    /// `System.Runtime.InteropServices.TypeLibTypeAttribute(short)` and `(TypeLibTypeFlags)`
    pub const TYPE_LIB_TYPE: Self = Self::new(
        INTEROP_SERVICES,
        "TypeLibTypeAttribute",
        &[templates::INT16_ARG, templates::TYPE_LIB_TYPE_FLAGS],
    );

    /// `System.Runtime.CompilerServices.DateTimeConstantAttribute(long)`
    pub const DATE_TIME_CONSTANT: Self = Self::new(
        COMPILER_SERVICES,
        "DateTimeConstantAttribute",
        &[templates::INT64_ARG],
    );

    /// `System.Runtime.CompilerServices.DecimalConstantAttribute` with unsigned and signed parts
    pub const DECIMAL_CONSTANT: Self = Self::new(
        COMPILER_SERVICES,
        "DecimalConstantAttribute",
        &[templates::DECIMAL_UNSIGNED, templates::DECIMAL_SIGNED],
    );

    /// `System.Runtime.CompilerServices.InternalsVisibleToAttribute(string)`
    pub const INTERNALS_VISIBLE_TO: Self = Self::new(
        COMPILER_SERVICES,
        "InternalsVisibleToAttribute",
        &[templates::STRING_ARG],
    );

    /// `System.Diagnostics.ConditionalAttribute(string)`
    pub const CONDITIONAL: Self = Self::new(
        "System.Diagnostics",
        "ConditionalAttribute",
        &[templates::STRING_ARG],
    );

    /// `System.Runtime.InteropServices.TypeIdentifierAttribute()` and `(string scope, string
    /// identifier)`
    pub const TYPE_IDENTIFIER: Self = Self::new(
        INTEROP_SERVICES,
        "TypeIdentifierAttribute",
        &[templates::VOID, templates::STRING_STRING],
    );
}
