//! Matching custom attribute rows against an [`AttributeDescription`].
//!
//! A `CustomAttribute` row only records the constructor it invokes. Recognizing an attribute
//! therefore means resolving that constructor to its declaring type, comparing the type's
//! namespace and name, and then comparing the constructor's signature against the templates of
//! the description in order.
//!
//! Matching sits on the hot path of attribute binding, so every function here treats a
//! malformed image as "no match" instead of failing. The one exception is
//! [`count_target_attributes_or_throw`], whose caller wants to report the damage.

use tracing::debug;

use crate::{
    file::parser::Parser,
    metadata::{
        attributes::description::{
            AttributeDescription, SignatureTemplate, SignatureToken, TypeHandleTarget,
        },
        namespaces::NameComparer,
        reader::RawMetadata,
        signatures::ELEMENT_TYPE,
        tables::{TableId, TypeAttributes},
        token::Token,
    },
    Result,
};

/// Name of instance constructors.
pub const INSTANCE_CONSTRUCTOR_NAME: &str = ".ctor";

/// A matched custom attribute and the index of the signature template it matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttributeInfo {
    /// The `CustomAttribute` row
    pub handle: Token,
    /// Index into [`AttributeDescription::signatures`]
    pub signature_index: usize,
}

impl AttributeInfo {
    /// Create a new match record.
    #[must_use]
    pub fn new(handle: Token, signature_index: usize) -> Self {
        AttributeInfo {
            handle,
            signature_index,
        }
    }

    /// True if this refers to an actual attribute row.
    #[must_use]
    pub fn has_value(&self) -> bool {
        !self.handle.is_null()
    }
}

/// The first attribute on `parent` matching `description`.
pub fn find_target_attribute(
    reader: &dyn RawMetadata,
    parent: Token,
    description: &AttributeDescription,
) -> Option<AttributeInfo> {
    let attributes = attributes_of(reader, parent)?;
    attributes.into_iter().find_map(|attribute| {
        target_attribute_signature_index(reader, attribute, description)
            .map(|index| AttributeInfo::new(attribute, index))
    })
}

/// The last attribute on `parent` matching `description`.
pub fn find_last_target_attribute(
    reader: &dyn RawMetadata,
    parent: Token,
    description: &AttributeDescription,
) -> Option<AttributeInfo> {
    let attributes = attributes_of(reader, parent)?;
    attributes.into_iter().rev().find_map(|attribute| {
        target_attribute_signature_index(reader, attribute, description)
            .map(|index| AttributeInfo::new(attribute, index))
    })
}

/// Every attribute on `parent` matching `description`, in table order.
pub fn find_target_attributes(
    reader: &dyn RawMetadata,
    parent: Token,
    description: &AttributeDescription,
) -> Vec<AttributeInfo> {
    let Some(attributes) = attributes_of(reader, parent) else {
        return Vec::new();
    };

    attributes
        .into_iter()
        .filter_map(|attribute| {
            target_attribute_signature_index(reader, attribute, description)
                .map(|index| AttributeInfo::new(attribute, index))
        })
        .collect()
}

/// Number of attributes on `parent` matching `description`.
///
/// # Errors
/// Returns an error if the attributes of `parent` cannot be enumerated.
pub fn count_target_attributes_or_throw(
    reader: &dyn RawMetadata,
    parent: Token,
    description: &AttributeDescription,
) -> Result<usize> {
    Ok(reader
        .custom_attributes(parent)?
        .into_iter()
        .filter(|&attribute| {
            target_attribute_signature_index(reader, attribute, description).is_some()
        })
        .count())
}

fn attributes_of(reader: &dyn RawMetadata, parent: Token) -> Option<Vec<Token>> {
    match reader.custom_attributes(parent) {
        Ok(attributes) => Some(attributes),
        Err(error) => {
            debug!(token = %parent, %error, "custom attributes not readable");
            None
        }
    }
}

/// Index of the first template of `description` the constructor of `attribute` matches.
pub fn target_attribute_signature_index(
    reader: &dyn RawMetadata,
    attribute: Token,
    description: &AttributeDescription,
) -> Option<usize> {
    let constructor = is_target_attribute(
        reader,
        attribute,
        description.namespace,
        description.name,
        description.match_ignoring_case,
    )?;

    match match_signatures(reader, constructor, description.signatures) {
        Ok(index) => index,
        Err(error) => {
            debug!(token = %attribute, %error, "attribute constructor signature not readable");
            None
        }
    }
}

/// Returns the constructor of `attribute` if its type is `namespace.name`.
pub fn is_target_attribute(
    reader: &dyn RawMetadata,
    attribute: Token,
    namespace: &str,
    name: &str,
    ignore_case: bool,
) -> Option<Token> {
    let (constructor_type, constructor) = type_and_constructor(reader, attribute)?;
    let (type_namespace, type_name) = attribute_namespace_and_name(reader, constructor_type)?;

    let comparer = NameComparer::from_ignore_case(ignore_case);
    (comparer.equals(type_name, name) && comparer.equals(type_namespace, namespace))
        .then_some(constructor)
}

/// Resolve the constructor of `attribute` and the type declaring it.
///
/// Returns `(declaring type, constructor)`. The constructor must be a `MethodDef` or `MemberRef`
/// named `.ctor`.
pub fn type_and_constructor(reader: &dyn RawMetadata, attribute: Token) -> Option<(Token, Token)> {
    if !attribute.is(TableId::CustomAttribute) {
        return None;
    }

    type_and_constructor_or_throw(reader, attribute).unwrap_or_else(|error| {
        debug!(token = %attribute, %error, "attribute constructor not resolvable");
        None
    })
}

fn type_and_constructor_or_throw(
    reader: &dyn RawMetadata,
    attribute: Token,
) -> Result<Option<(Token, Token)>> {
    let constructor = reader.custom_attribute(attribute.row())?.constructor;

    if constructor.is(TableId::MemberRef) {
        let member = reader.member_ref(constructor.row())?;
        if reader.string(member.name)? != INSTANCE_CONSTRUCTOR_NAME {
            return Ok(None);
        }

        Ok(Some((member.class, constructor)))
    } else if constructor.is(TableId::MethodDef) {
        let method = reader.method_def(constructor.row())?;
        if reader.string(method.name)? != INSTANCE_CONSTRUCTOR_NAME {
            return Ok(None);
        }

        let owner = reader.declaring_type_of_method(constructor.row())?;
        Ok(Some((Token::from_parts(TableId::TypeDef, owner), constructor)))
    } else {
        Ok(None)
    }
}

/// Namespace and name of a top-level `TypeDef` or `TypeRef`.
///
/// Nested types, and type references scoped to another type, give `None`.
pub fn attribute_namespace_and_name(
    reader: &dyn RawMetadata,
    type_def_or_ref: Token,
) -> Option<(&str, &str)> {
    namespace_and_name_or_throw(reader, type_def_or_ref).unwrap_or_else(|error| {
        debug!(token = %type_def_or_ref, %error, "attribute type name not readable");
        None
    })
}

fn namespace_and_name_or_throw(
    reader: &dyn RawMetadata,
    type_def_or_ref: Token,
) -> Result<Option<(&str, &str)>> {
    let (namespace, name) = if type_def_or_ref.is(TableId::TypeRef) {
        let row = reader.type_ref(type_def_or_ref.row())?;
        if row.resolution_scope.is(TableId::TypeRef) || row.resolution_scope.is(TableId::TypeDef) {
            return Ok(None);
        }
        (row.type_namespace, row.type_name)
    } else if type_def_or_ref.is(TableId::TypeDef) {
        let row = reader.type_def(type_def_or_ref.row())?;
        if is_nested(row.flags) {
            return Ok(None);
        }
        (row.type_namespace, row.type_name)
    } else {
        return Ok(None);
    };

    Ok(Some((reader.string(namespace)?, reader.string(name)?)))
}

/// True if the `TypeDef` flags describe a nested type.
#[must_use]
pub fn is_nested(flags: u32) -> bool {
    flags & TypeAttributes::NESTED_MASK != 0
}

/// Signature blob of a `MethodDef` or `MemberRef`.
///
/// # Errors
/// Returns an error if `method` is of another kind or its row cannot be read.
pub fn method_signature<'r>(reader: &'r dyn RawMetadata, method: Token) -> Result<&'r [u8]> {
    let signature = if method.is(TableId::MethodDef) {
        reader.method_def(method.row())?.signature
    } else if method.is(TableId::MemberRef) {
        reader.member_ref(method.row())?.signature
    } else {
        return Err(malformed_error!("Not a method token - {}", method));
    };

    reader.blob(signature)
}

fn match_signatures(
    reader: &dyn RawMetadata,
    constructor: Token,
    templates: &[SignatureTemplate],
) -> Result<Option<usize>> {
    let signature = method_signature(reader, constructor)?;

    for (index, template) in templates.iter().enumerate() {
        let mut parser = Parser::new(signature);
        if template_matches(reader, &mut parser, template)? {
            return Ok(Some(index));
        }
    }

    Ok(None)
}

fn template_matches(
    reader: &dyn RawMetadata,
    parser: &mut Parser,
    template: &SignatureTemplate,
) -> Result<bool> {
    if parser.remaining() < 3
        || parser.read_le::<u8>()? != template.header
        || parser.read_le::<u8>()? != template.param_count
        || parser.read_le::<u8>()? != template.return_type
    {
        return Ok(false);
    }

    for token in template.parameters {
        if !parser.has_more_data() {
            return Ok(false);
        }

        let code = parser.read_compressed_uint()?;
        let is_type_handle =
            code == u32::from(ELEMENT_TYPE::CLASS) || code == u32::from(ELEMENT_TYPE::VALUETYPE);

        let matched = match *token {
            SignatureToken::Element(expected) => !is_type_handle && code == u32::from(expected),
            SignatureToken::TypeHandle(target) => {
                is_type_handle && type_handle_matches(reader, parser.read_compressed_token()?, target)?
            }
        };

        if !matched {
            return Ok(false);
        }
    }

    Ok(!parser.has_more_data())
}

fn type_handle_matches(
    reader: &dyn RawMetadata,
    handle: Token,
    target: TypeHandleTarget,
) -> Result<bool> {
    let (namespace, name) = if handle.is(TableId::TypeDef) {
        let row = reader.type_def(handle.row())?;
        if is_nested(row.flags) {
            return Ok(false);
        }
        (row.type_namespace, row.type_name)
    } else if handle.is(TableId::TypeRef) {
        let row = reader.type_ref(handle.row())?;
        if row.resolution_scope.is(TableId::TypeRef) {
            return Ok(false);
        }
        (row.type_namespace, row.type_name)
    } else {
        return Ok(false);
    };

    Ok(reader.string(namespace)? == target.namespace() && reader.string(name)? == target.name())
}
