//! The import facade over one module of an assembly.
//!
//! [`PeModule`] owns a [`RawMetadata`] reader and everything derived from it: the NoPia local
//! type cache, the forwarder map, the name indexes, the list of referenced assemblies and the
//! hashes of the full image. A compiler creates one `PeModule` per imported module and shares
//! it between all threads binding symbols against it.
//!
//! # Two accessor families
//!
//! - `*_or_throw` operations propagate malformed-image conditions. Callers use them when they
//!   need the data and will report a diagnostic ("referenced assembly metadata is invalid")
//!   on failure.
//! - Best-effort operations (attribute queries, NoPia detection, layout, marshalling, constant
//!   values) absorb malformed-image conditions and answer with a negative or default result.
//!   A single corrupt attribute never aborts unrelated work.
//!
//! # Lazy state
//!
//! Derived state is published once with [`crate::utils::publish_once`]: racing threads may
//! compute the same value twice, but every reader observes the single published value.
//!
//! # Examples
//!
//! ```rust
//! use cilimport::metadata::{
//!     image::MetadataImageBuilder,
//!     module::PeModule,
//!     options::ModuleOptions,
//!     tables::TypeAttributes,
//!     token::Token,
//! };
//!
//! let mut builder = MetadataImageBuilder::new();
//! builder.add_module("Library.dll")?;
//! builder.add_assembly("Library", [1, 0, 0, 0], &[], "")?;
//! let widget = builder.add_type_def(TypeAttributes::PUBLIC, "Library", "Widget", Token::default())?;
//!
//! let module = PeModule::new(Box::new(builder.build()), ModuleOptions::default());
//! assert_eq!(module.name()?, "Library.dll");
//! assert!(module.is_manifest_module()?);
//! assert_eq!(module.type_def_name_or_throw(widget)?, "Widget");
//! assert!(module.is_no_pia_local_type(widget).is_none());
//! # Ok::<(), cilimport::Error>(())
//! ```

use std::{
    collections::HashSet,
    ops::Range,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
};

use tracing::{debug, trace};

use crate::{
    file::Backend,
    metadata::{
        attributes::{
            self, decode_attribute, find_last_target_attribute, find_target_attribute,
            find_target_attributes, AttributeDescription, AttributeInfo, AttributeValue,
            ComInterfaceType, ObsoleteAttributeData, ObsoleteAttributeKind, TypeLibTypeFlags,
            ValueKind,
        },
        hash::{HashProvider, HashSource, ImageHashSource},
        identity::{validate_identifier, AssemblyIdentity},
        layout::{
            marshalling_type, ConstantValue, DllImportData, EmbeddedResource, LayoutKind,
            TypeLayout,
        },
        namespaces::{
            full_name, group_types_by_namespace, namespace_name_collection, type_def_name,
            type_name_collection, ForwarderMap, IdentifierCollection, NameComparer,
            NamespaceGroup,
        },
        nopia::{NoPiaCache, NoPiaLocalTypeInfo},
        options::ModuleOptions,
        reader::{table_tokens, RawMetadata},
        tables::{FileAttributes, TableId, TypeAttributes},
        token::Token,
    },
    utils::{publish_once, AtomicThreeState, ThreeState},
    Error, Result,
};

/// Token of the single `Module` row.
const MODULE_TOKEN: Token = Token(0x0000_0001);

/// Token of the single `Assembly` row.
const ASSEMBLY_TOKEN: Token = Token(0x2000_0001);

/// Characters that turn a module name into a path.
const PATH_SEPARATORS: [char; 3] = ['/', '\\', ':'];

/// Name, flags and base type of a `TypeDef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDefProps<'a> {
    /// Namespace, empty for the global namespace and for nested types
    pub namespace: &'a str,
    /// Simple name as stored in metadata
    pub name: &'a str,
    /// `TypeAttributes`
    pub flags: u32,
    /// Base type, a `TypeDefOrRef` token or nil
    pub extends: Token,
}

/// Resolution scope and name of a `TypeRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRefProps<'a> {
    /// `Module`, `ModuleRef`, `AssemblyRef` or `TypeRef` the type resolves in
    pub scope: Token,
    /// Namespace
    pub namespace: &'a str,
    /// Simple name
    pub name: &'a str,
}

/// Name and flags of a `MethodDef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDefProps<'a> {
    /// Method name
    pub name: &'a str,
    /// `MethodAttributes`
    pub flags: u32,
    /// `MethodImplAttributes`
    pub impl_flags: u32,
    /// RVA of the body, 0 for abstract and extern methods
    pub rva: u32,
}

/// Parent, name and signature of a `MemberRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRefProps<'a> {
    /// `MemberRefParent` token
    pub class: Token,
    /// Member name
    pub name: &'a str,
    /// Signature blob
    pub signature: &'a [u8],
}

/// Name, position and flags of a `Param`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamProps<'a> {
    /// Parameter name, may be empty
    pub name: &'a str,
    /// 0 for the return value, 1-based position otherwise
    pub sequence: u32,
    /// `ParamAttributes`
    pub flags: u32,
}

/// Name, flags and signature of a `Property`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDefProps<'a> {
    /// Property name
    pub name: &'a str,
    /// `PropertyAttributes`
    pub flags: u32,
    /// Signature blob
    pub signature: &'a [u8],
}

/// Name, flags and handler type of an `Event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventDefProps<'a> {
    /// Event name
    pub name: &'a str,
    /// `EventAttributes`
    pub flags: u32,
    /// Delegate type, a `TypeDefOrRef` token
    pub event_type: Token,
}

/// Name and flags of a `Field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefProps<'a> {
    /// Field name
    pub name: &'a str,
    /// `FieldAttributes`
    pub flags: u32,
}

/// Owner, position, name and flags of a `GenericParam`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericParamProps<'a> {
    /// The `TypeDef` or `MethodDef` declaring the parameter
    pub owner: Token,
    /// 0-based position
    pub number: u32,
    /// `GenericParamAttributes`
    pub flags: u32,
    /// Parameter name
    pub name: &'a str,
}

/// Generic method and instantiation of a `MethodSpec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpecProps<'a> {
    /// The generic `MethodDef` or `MemberRef`
    pub method: Token,
    /// Instantiation signature blob
    pub instantiation: &'a [u8],
}

/// Import facade over the metadata of one module.
///
/// `PeModule` is `Send + Sync`; every query takes `&self`. After [`PeModule::dispose`] all
/// `_or_throw` queries fail with [`Error::Disposed`] and best-effort queries answer negatively.
pub struct PeModule {
    reader: Box<dyn RawMetadata>,
    options: ModuleOptions,
    disposed: AtomicBool,

    no_pia: NoPiaCache,
    hashes: HashProvider,

    name: OnceLock<String>,
    referenced_assemblies: OnceLock<Vec<AssemblyIdentity>>,
    forwarders: OnceLock<ForwarderMap>,
    type_names: OnceLock<IdentifierCollection>,
    namespace_names: OnceLock<IdentifierCollection>,
    utilizes_nullable: AtomicThreeState,
}

impl PeModule {
    /// Create a facade over metadata only. Hashing the image is not supported.
    #[must_use]
    pub fn new(reader: Box<dyn RawMetadata>, options: ModuleOptions) -> Self {
        Self::from_parts(reader, None, options)
    }

    /// Create a facade over metadata with the full image bytes resident in `image`.
    #[must_use]
    pub fn with_image(
        reader: Box<dyn RawMetadata>,
        image: Box<dyn Backend>,
        options: ModuleOptions,
    ) -> Self {
        Self::from_parts(reader, Some(Box::new(ImageHashSource::new(image))), options)
    }

    /// Create a facade whose image hashes are computed by `source`.
    #[must_use]
    pub fn with_hash_source(
        reader: Box<dyn RawMetadata>,
        source: Box<dyn HashSource>,
        options: ModuleOptions,
    ) -> Self {
        Self::from_parts(reader, Some(source), options)
    }

    fn from_parts(
        reader: Box<dyn RawMetadata>,
        hash_source: Option<Box<dyn HashSource>>,
        options: ModuleOptions,
    ) -> Self {
        let type_def_count = reader.row_count(TableId::TypeDef);

        PeModule {
            no_pia: NoPiaCache::new(type_def_count, options.include_embedded_interop_types),
            hashes: HashProvider::new(hash_source),
            reader,
            options,
            disposed: AtomicBool::new(false),
            name: OnceLock::new(),
            referenced_assemblies: OnceLock::new(),
            forwarders: OnceLock::new(),
            type_names: OnceLock::new(),
            namespace_names: OnceLock::new(),
            utilizes_nullable: AtomicThreeState::default(),
        }
    }

    /// The options this module was opened with.
    #[must_use]
    pub fn options(&self) -> &ModuleOptions {
        &self.options
    }

    /// The underlying reader.
    ///
    /// # Errors
    /// Returns [`Error::Disposed`] after [`PeModule::dispose`].
    pub fn metadata(&self) -> Result<&dyn RawMetadata> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(Error::Disposed);
        }

        Ok(self.reader.as_ref())
    }

    /// The reader for a best-effort query, `None` once disposed.
    fn live(&self) -> Option<&dyn RawMetadata> {
        self.metadata().ok()
    }

    /// Release the module. Every later query fails or answers negatively.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            debug!(hashes = self.hashes.cached(), "module disposed");
        }
    }

    /// True after [`PeModule::dispose`].
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// True if the full image bytes are available, so the image can be hashed.
    #[must_use]
    pub fn is_entire_image_available(&self) -> bool {
        !self.is_disposed() && self.hashes.is_available()
    }

    /// Hash of the full image with the `AssemblyHashAlgorithm` `algorithm_id`.
    ///
    /// Repeated requests for an algorithm reuse the first published digest.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for metadata-only modules and unknown algorithms, and
    /// [`Error::Disposed`] after disposal.
    pub fn image_hash(&self, algorithm_id: u32) -> Result<Arc<[u8]>> {
        self.metadata()?;
        self.hashes.hash(algorithm_id)
    }
}

// Module and assembly level queries
impl PeModule {
    /// Name of the module, from the `Module` row.
    ///
    /// # Errors
    /// Returns an error if the `Module` row or its name cannot be read.
    pub fn name(&self) -> Result<&str> {
        let reader = self.metadata()?;
        publish_once(&self.name, || {
            let name = reader.string(reader.module_row(1)?.name)?.to_string();
            trace!(name = %name, "module name published");
            Ok(name)
        })
        .map(String::as_str)
    }

    /// The module version id.
    ///
    /// # Errors
    /// Returns an error if the `Module` row or the `#GUID` entry cannot be read.
    pub fn module_version_id_or_throw(&self) -> Result<uguid::Guid> {
        let reader = self.metadata()?;
        reader.guid(reader.module_row(1)?.mvid)
    }

    /// True if the module carries the assembly manifest.
    ///
    /// # Errors
    /// Returns [`Error::Disposed`] after disposal.
    pub fn is_manifest_module(&self) -> Result<bool> {
        Ok(self.metadata()?.row_count(TableId::Assembly) > 0)
    }

    /// True if the module is a secondary module of a multi-module assembly.
    ///
    /// # Errors
    /// Returns [`Error::Disposed`] after disposal.
    pub fn is_linked_module(&self) -> Result<bool> {
        Ok(!self.is_manifest_module()?)
    }

    /// Names of the other modules of the assembly, from `File` rows that contain metadata.
    ///
    /// # Errors
    /// Returns an error if a row cannot be read or a name is not a valid module file name.
    pub fn metadata_module_names_or_throw(&self) -> Result<Vec<String>> {
        let reader = self.metadata()?;
        let mut names = Vec::new();

        for rid in 1..=reader.row_count(TableId::File) {
            let file = reader.file(rid)?;
            if file.flags & FileAttributes::CONTAINS_NO_META_DATA != 0 {
                continue;
            }

            let name = reader.string(file.name)?;
            validate_file_name(name)?;
            names.push(name.to_string());
        }

        Ok(names)
    }

    /// Names of the modules `TypeRef`s resolve in, in order of first use.
    ///
    /// # Errors
    /// Returns an error if a `TypeRef` or `ModuleRef` row cannot be read.
    pub fn referenced_managed_modules_or_throw(&self) -> Result<Vec<String>> {
        let reader = self.metadata()?;
        let mut seen = HashSet::new();
        let mut names = Vec::new();

        for rid in 1..=reader.row_count(TableId::TypeRef) {
            let scope = reader.type_ref(rid)?.resolution_scope;
            if scope.is(TableId::ModuleRef) && seen.insert(scope) {
                names.push(self.module_ref_name_or_throw(scope)?.to_string());
            }
        }

        Ok(names)
    }

    /// Manifest resources stored in this module.
    ///
    /// # Errors
    /// Returns an error if a `ManifestResource` row or its name cannot be read.
    pub fn embedded_resources_or_throw(&self) -> Result<Vec<EmbeddedResource>> {
        let reader = self.metadata()?;
        let mut resources = Vec::new();

        for rid in 1..=reader.row_count(TableId::ManifestResource) {
            let row = reader.manifest_resource(rid)?;
            if let Some(resource) = EmbeddedResource::read(reader, &row)? {
                resources.push(resource);
            }
        }

        Ok(resources)
    }

    /// Name of a `ModuleRef`.
    ///
    /// # Errors
    /// Returns an error if `module_ref` is not a readable `ModuleRef` row.
    pub fn module_ref_name_or_throw(&self, module_ref: Token) -> Result<&str> {
        let reader = self.metadata()?;
        let row = reader.module_ref(expect_table(module_ref, TableId::ModuleRef)?)?;
        reader.string(row.name)
    }

    /// Identity of the assembly defined by this module, `None` for linked modules.
    ///
    /// # Errors
    /// Returns an error if the `Assembly` row cannot be read or carries an invalid identity.
    pub fn read_assembly_identity_or_throw(&self) -> Result<Option<AssemblyIdentity>> {
        let reader = self.metadata()?;
        if reader.row_count(TableId::Assembly) == 0 {
            return Ok(None);
        }

        let assembly = reader.assembly(ASSEMBLY_TOKEN.row())?;
        AssemblyIdentity::from_assembly(reader, &assembly, self.options.validate_identifiers)
            .map(Some)
    }

    /// Identities of all `AssemblyRef` rows, in row order.
    ///
    /// # Errors
    /// Returns an error if any `AssemblyRef` row cannot be read or carries an invalid identity.
    /// Nothing is published in that case.
    pub fn referenced_assemblies(&self) -> Result<&[AssemblyIdentity]> {
        let reader = self.metadata()?;
        publish_once(&self.referenced_assemblies, || {
            let validate = self.options.validate_identifiers;
            let identities = (1..=reader.row_count(TableId::AssemblyRef))
                .map(|rid| AssemblyIdentity::from_assembly_ref(reader, &reader.assembly_ref(rid)?, validate))
                .collect::<Result<Vec<_>>>()?;

            trace!(count = identities.len(), "referenced assemblies published");
            Ok(identities)
        })
        .map(Vec::as_slice)
    }

    /// The first `AssemblyRef` named `name`, compared case-sensitively.
    ///
    /// Returns `None` if there is none, or if the table cannot be read.
    pub fn assembly_ref(&self, name: &str) -> Option<Token> {
        let reader = self.live()?;
        let lookup = || -> Result<Option<Token>> {
            for token in table_tokens(TableId::AssemblyRef, reader.row_count(TableId::AssemblyRef)) {
                if reader.string(reader.assembly_ref(token.row())?.name)? == name {
                    return Ok(Some(token));
                }
            }
            Ok(None)
        };

        absorb(ASSEMBLY_TOKEN, lookup()).flatten()
    }

    /// Position of `identity` in [`PeModule::referenced_assemblies`].
    ///
    /// # Errors
    /// Returns an error if the referenced assemblies cannot be read.
    pub fn assembly_reference_index_or_throw(
        &self,
        identity: &AssemblyIdentity,
    ) -> Result<Option<usize>> {
        Ok(self
            .referenced_assemblies()?
            .iter()
            .position(|reference| reference == identity))
    }
}

// Types
impl PeModule {
    /// `namespace.name` from two `#Strings` indices, or `name` for the global namespace.
    ///
    /// # Errors
    /// Returns an error if either string cannot be read.
    pub fn full_name_or_throw(&self, namespace: u32, name: u32) -> Result<String> {
        let reader = self.metadata()?;
        Ok(full_name(reader.string(namespace)?, reader.string(name)?))
    }

    /// Name of a `TypeDef`.
    ///
    /// Nested types carrying a namespace get it prepended. Some compilers split the names of
    /// nested types at the last dot.
    ///
    /// # Errors
    /// Returns an error if `type_def` is not a readable `TypeDef` row.
    pub fn type_def_name_or_throw(&self, type_def: Token) -> Result<String> {
        let reader = self.metadata()?;
        type_def_name(reader, &reader.type_def(expect_table(type_def, TableId::TypeDef)?)?)
    }

    /// Namespace of a `TypeDef`.
    ///
    /// # Errors
    /// Returns an error if `type_def` is not a readable `TypeDef` row.
    pub fn type_def_namespace_or_throw(&self, type_def: Token) -> Result<&str> {
        Ok(self.type_def_props_or_throw(type_def)?.namespace)
    }

    /// Base type of a `TypeDef`, nil for `System.Object` and interfaces.
    ///
    /// # Errors
    /// Returns an error if `type_def` is not a readable `TypeDef` row.
    pub fn type_def_extends_or_throw(&self, type_def: Token) -> Result<Token> {
        Ok(self.type_def_props_or_throw(type_def)?.extends)
    }

    /// `TypeAttributes` of a `TypeDef`.
    ///
    /// # Errors
    /// Returns an error if `type_def` is not a readable `TypeDef` row.
    pub fn type_def_flags_or_throw(&self, type_def: Token) -> Result<u32> {
        Ok(self.type_def_props_or_throw(type_def)?.flags)
    }

    /// Namespace, name, flags and base type of a `TypeDef`.
    ///
    /// # Errors
    /// Returns an error if `type_def` is not a readable `TypeDef` row.
    pub fn type_def_props_or_throw(&self, type_def: Token) -> Result<TypeDefProps<'_>> {
        let reader = self.metadata()?;
        let row = reader.type_def(expect_table(type_def, TableId::TypeDef)?)?;

        Ok(TypeDefProps {
            namespace: reader.string(row.type_namespace)?,
            name: reader.string(row.type_name)?,
            flags: row.flags,
            extends: row.extends,
        })
    }

    /// True if the `TypeDef` is nested in another type.
    ///
    /// # Errors
    /// Returns an error if `type_def` is not a readable `TypeDef` row.
    pub fn is_nested_type_def_or_throw(&self, type_def: Token) -> Result<bool> {
        Ok(attributes::is_nested(self.type_def_flags_or_throw(type_def)?))
    }

    /// True if the `TypeDef` is an interface.
    ///
    /// # Errors
    /// Returns an error if `type_def` is not a readable `TypeDef` row.
    pub fn is_interface_or_throw(&self, type_def: Token) -> Result<bool> {
        Ok(self.type_def_flags_or_throw(type_def)? & TypeAttributes::CLASS_SEMANTICS_MASK
            == TypeAttributes::INTERFACE)
    }

    /// The type enclosing a nested `TypeDef`, `None` for top-level types.
    ///
    /// # Errors
    /// Returns an error if the `NestedClass` table cannot be read.
    pub fn containing_type_or_throw(&self, type_def: Token) -> Result<Option<Token>> {
        let reader = self.metadata()?;
        Ok(reader
            .enclosing_type(expect_table(type_def, TableId::TypeDef)?)?
            .map(|rid| Token::from_parts(TableId::TypeDef, rid)))
    }

    /// Types nested directly in a `TypeDef`.
    ///
    /// # Errors
    /// Returns an error if the `NestedClass` table cannot be read.
    pub fn nested_type_defs_or_throw(&self, type_def: Token) -> Result<Vec<Token>> {
        let reader = self.metadata()?;
        Ok(reader
            .nested_types(expect_table(type_def, TableId::TypeDef)?)?
            .into_iter()
            .map(|rid| Token::from_parts(TableId::TypeDef, rid))
            .collect())
    }

    /// Methods of a `TypeDef`.
    ///
    /// # Errors
    /// Returns an error if the method run of the type is out of bounds.
    pub fn methods_of_type_or_throw(&self, type_def: Token) -> Result<Vec<Token>> {
        let reader = self.metadata()?;
        let methods = reader.methods_of_type(expect_table(type_def, TableId::TypeDef)?)?;
        Ok(range_tokens(TableId::MethodDef, methods))
    }

    /// Fields of a `TypeDef`.
    ///
    /// # Errors
    /// Returns an error if the field run of the type is out of bounds.
    pub fn fields_of_type_or_throw(&self, type_def: Token) -> Result<Vec<Token>> {
        let reader = self.metadata()?;
        let fields = reader.fields_of_type(expect_table(type_def, TableId::TypeDef)?)?;
        Ok(range_tokens(TableId::Field, fields))
    }

    /// Properties of a `TypeDef`.
    ///
    /// # Errors
    /// Returns an error if the `PropertyMap` table cannot be read.
    pub fn properties_of_type_or_throw(&self, type_def: Token) -> Result<Vec<Token>> {
        let reader = self.metadata()?;
        let properties = reader.properties_of_type(expect_table(type_def, TableId::TypeDef)?)?;
        Ok(range_tokens(TableId::Property, properties))
    }

    /// Events of a `TypeDef`.
    ///
    /// # Errors
    /// Returns an error if the `EventMap` table cannot be read.
    pub fn events_of_type_or_throw(&self, type_def: Token) -> Result<Vec<Token>> {
        let reader = self.metadata()?;
        let events = reader.events_of_type(expect_table(type_def, TableId::TypeDef)?)?;
        Ok(range_tokens(TableId::Event, events))
    }

    /// Generic parameters of a `TypeDef`, ordered by position.
    ///
    /// # Errors
    /// Returns an error if the `GenericParam` table cannot be read.
    pub fn type_def_generic_params_or_throw(&self, type_def: Token) -> Result<Vec<Token>> {
        expect_table(type_def, TableId::TypeDef)?;
        self.generic_params_of(type_def)
    }

    /// True if the `TypeDef` declares generic parameters.
    ///
    /// # Errors
    /// Returns an error if the `GenericParam` table cannot be read.
    pub fn has_generic_parameters_or_throw(&self, type_def: Token) -> Result<bool> {
        Ok(!self.type_def_generic_params_or_throw(type_def)?.is_empty())
    }

    fn generic_params_of(&self, owner: Token) -> Result<Vec<Token>> {
        let reader = self.metadata()?;
        Ok(reader
            .generic_params_of(owner)?
            .into_iter()
            .map(|rid| Token::from_parts(TableId::GenericParam, rid))
            .collect())
    }

    /// Layout of a `TypeDef`. Auto-layout types and unreadable rows get the default layout.
    #[must_use]
    pub fn type_layout(&self, type_def: Token) -> TypeLayout {
        let Some(reader) = self.live() else {
            return TypeLayout::default();
        };

        let layout = expect_table(type_def, TableId::TypeDef)
            .and_then(|rid| TypeLayout::read(reader, rid));
        absorb(type_def, layout).unwrap_or_default()
    }

    /// Layout of a sequential or explicit layout `TypeDef`.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for auto-layout types, or an error if the rows cannot be
    /// read.
    pub fn type_layout_or_throw(&self, type_def: Token) -> Result<TypeLayout> {
        let reader = self.metadata()?;
        let layout = TypeLayout::read(reader, expect_table(type_def, TableId::TypeDef)?)?;
        if layout.kind == LayoutKind::Auto {
            return Err(Error::NotSupported(format!(
                "type {type_def} has automatic layout"
            )));
        }

        Ok(layout)
    }

    /// The `TypeDef` of `System.Object`: a public class without a base type.
    ///
    /// Rows that cannot be read are skipped.
    pub fn find_system_object_type_def(&self) -> Option<Token> {
        let reader = self.live()?;

        table_tokens(TableId::TypeDef, reader.row_count(TableId::TypeDef)).find(|&token| {
            let is_object = || -> Result<bool> {
                let row = reader.type_def(token.row())?;
                Ok(row.extends.is_null()
                    && row.flags & (TypeAttributes::PUBLIC | TypeAttributes::INTERFACE)
                        == TypeAttributes::PUBLIC
                    && reader.string(row.type_name)? == "Object"
                    && reader.string(row.type_namespace)? == "System")
            };

            absorb(token, is_object()).unwrap_or(false)
        })
    }

    /// Top-level types grouped by namespace, including empty groups for namespaces that only
    /// hold forwarded types.
    ///
    /// # Errors
    /// Returns an error if a `TypeDef` row or a namespace name cannot be read.
    pub fn group_types_by_namespace_or_throw(
        &self,
        comparer: NameComparer,
    ) -> Result<Vec<NamespaceGroup>> {
        let reader = self.metadata()?;
        group_types_by_namespace(reader, self.forwarder_map()?, comparer)
    }

    /// Simple names of all types, generic arity suffix removed.
    ///
    /// # Errors
    /// Returns [`Error::Disposed`] after disposal.
    pub fn type_names(&self) -> Result<&IdentifierCollection> {
        let reader = self.metadata()?;
        publish_once(&self.type_names, || {
            let names = type_name_collection(reader);
            trace!(count = names.len(), "type names published");
            Ok(names)
        })
    }

    /// Dot separated fragments of all namespaces.
    ///
    /// # Errors
    /// Returns [`Error::Disposed`] after disposal.
    pub fn namespace_names(&self) -> Result<&IdentifierCollection> {
        let reader = self.metadata()?;
        publish_once(&self.namespace_names, || {
            let names = namespace_name_collection(reader);
            trace!(count = names.len(), "namespace names published");
            Ok(names)
        })
    }

    /// Resolution scope, namespace and name of a `TypeRef`.
    ///
    /// # Errors
    /// Returns an error if `type_ref` is not a readable `TypeRef` row.
    pub fn type_ref_props_or_throw(&self, type_ref: Token) -> Result<TypeRefProps<'_>> {
        let reader = self.metadata()?;
        let row = reader.type_ref(expect_table(type_ref, TableId::TypeRef)?)?;

        Ok(TypeRefProps {
            scope: row.resolution_scope,
            namespace: reader.string(row.type_namespace)?,
            name: reader.string(row.type_name)?,
        })
    }

    /// The first `TypeRef` to `namespace.name` resolved in `scope`.
    ///
    /// Returns `None` if there is none, or if the table cannot be read.
    pub fn type_ref(&self, scope: Token, namespace: &str, name: &str) -> Option<Token> {
        let reader = self.live()?;
        let lookup = || -> Result<Option<Token>> {
            for token in table_tokens(TableId::TypeRef, reader.row_count(TableId::TypeRef)) {
                let row = reader.type_ref(token.row())?;
                if row.resolution_scope == scope
                    && reader.string(row.type_name)? == name
                    && reader.string(row.type_namespace)? == namespace
                {
                    return Ok(Some(token));
                }
            }
            Ok(None)
        };

        absorb(scope, lookup()).flatten()
    }
}

// Members
impl PeModule {
    /// Name of a `MethodDef`.
    ///
    /// # Errors
    /// Returns an error if `method` is not a readable `MethodDef` row.
    pub fn method_def_name_or_throw(&self, method: Token) -> Result<&str> {
        Ok(self.method_def_props_or_throw(method)?.name)
    }

    /// `MethodAttributes` of a `MethodDef`.
    ///
    /// # Errors
    /// Returns an error if `method` is not a readable `MethodDef` row.
    pub fn method_def_flags_or_throw(&self, method: Token) -> Result<u32> {
        let reader = self.metadata()?;
        Ok(reader.method_def(expect_table(method, TableId::MethodDef)?)?.flags)
    }

    /// Name, flags, implementation flags and RVA of a `MethodDef`.
    ///
    /// # Errors
    /// Returns an error if `method` is not a readable `MethodDef` row.
    pub fn method_def_props_or_throw(&self, method: Token) -> Result<MethodDefProps<'_>> {
        let reader = self.metadata()?;
        let row = reader.method_def(expect_table(method, TableId::MethodDef)?)?;

        Ok(MethodDefProps {
            name: reader.string(row.name)?,
            flags: row.flags,
            impl_flags: row.impl_flags,
            rva: row.rva,
        })
    }

    /// Signature blob of a `MethodDef` or `MemberRef`.
    ///
    /// # Errors
    /// Returns an error if `method` is of another kind or cannot be read.
    pub fn method_signature_or_throw(&self, method: Token) -> Result<&[u8]> {
        attributes::method_signature(self.metadata()?, method)
    }

    /// The `TypeDef` declaring a `MethodDef`.
    ///
    /// # Errors
    /// Returns an error if `method` is not a `MethodDef` owned by any type.
    pub fn containing_type_of_method_or_throw(&self, method: Token) -> Result<Token> {
        let reader = self.metadata()?;
        let owner = reader.declaring_type_of_method(expect_table(method, TableId::MethodDef)?)?;
        Ok(Token::from_parts(TableId::TypeDef, owner))
    }

    /// The `TypeDef` declaring a `Field`.
    ///
    /// # Errors
    /// Returns an error if `field` is not a `Field` owned by any type.
    pub fn containing_type_of_field_or_throw(&self, field: Token) -> Result<Token> {
        let reader = self.metadata()?;
        let owner = reader.declaring_type_of_field(expect_table(field, TableId::Field)?)?;
        Ok(Token::from_parts(TableId::TypeDef, owner))
    }

    /// `Param` rows of a `MethodDef`.
    ///
    /// # Errors
    /// Returns an error if the parameter run of the method is out of bounds.
    pub fn parameters_of_method_or_throw(&self, method: Token) -> Result<Vec<Token>> {
        let reader = self.metadata()?;
        let params = reader.params_of_method(expect_table(method, TableId::MethodDef)?)?;
        Ok(range_tokens(TableId::Param, params))
    }

    /// Generic parameters of a `MethodDef`, ordered by position.
    ///
    /// # Errors
    /// Returns an error if the `GenericParam` table cannot be read.
    pub fn generic_params_of_method_or_throw(&self, method: Token) -> Result<Vec<Token>> {
        expect_table(method, TableId::MethodDef)?;
        self.generic_params_of(method)
    }

    /// Platform invoke data of a `MethodDef`.
    ///
    /// Returns `None` for methods without an `ImplMap` row, for imports without a module and for
    /// unreadable rows.
    pub fn dll_import_data(&self, method: Token) -> Option<DllImportData> {
        let reader = self.live()?;
        let read = || -> Result<Option<DllImportData>> {
            let Some(import) = reader.impl_map_for(method)? else {
                return Ok(None);
            };
            if import.import_scope == 0 {
                return Ok(None);
            }

            let module = reader.module_ref(import.import_scope)?;
            Ok(Some(DllImportData {
                module_name: reader.string(module.name)?.to_string(),
                entry_point_name: reader.string(import.import_name)?.to_string(),
                flags: import.mapping_flags,
            }))
        };

        absorb(method, read()).flatten()
    }

    /// Name of a `MemberRef`.
    ///
    /// # Errors
    /// Returns an error if `member` is not a readable `MemberRef` row.
    pub fn member_ref_name_or_throw(&self, member: Token) -> Result<&str> {
        Ok(self.member_ref_props_or_throw(member)?.name)
    }

    /// Parent, name and signature of a `MemberRef`.
    ///
    /// # Errors
    /// Returns an error if `member` is not a readable `MemberRef` row.
    pub fn member_ref_props_or_throw(&self, member: Token) -> Result<MemberRefProps<'_>> {
        let reader = self.metadata()?;
        let row = reader.member_ref(expect_table(member, TableId::MemberRef)?)?;

        Ok(MemberRefProps {
            class: row.class,
            name: reader.string(row.name)?,
            signature: reader.blob(row.signature)?,
        })
    }

    /// Signature blob of a `MemberRef`.
    ///
    /// # Errors
    /// Returns an error if `member` is not a readable `MemberRef` row.
    pub fn member_ref_signature_or_throw(&self, member: Token) -> Result<&[u8]> {
        Ok(self.member_ref_props_or_throw(member)?.signature)
    }

    /// The `MemberRefParent` of a `MemberRef`.
    ///
    /// # Errors
    /// Returns an error if `member` is not a readable `MemberRef` row.
    pub fn containing_type_of_member_ref_or_throw(&self, member: Token) -> Result<Token> {
        let reader = self.metadata()?;
        Ok(reader.member_ref(expect_table(member, TableId::MemberRef)?)?.class)
    }

    /// Name, sequence number and flags of a `Param`.
    ///
    /// # Errors
    /// Returns an error if `param` is not a readable `Param` row.
    pub fn param_props_or_throw(&self, param: Token) -> Result<ParamProps<'_>> {
        let reader = self.metadata()?;
        let row = reader.param(expect_table(param, TableId::Param)?)?;

        Ok(ParamProps {
            name: reader.string(row.name)?,
            sequence: row.sequence,
            flags: row.flags,
        })
    }

    /// Sequence number of a `Param`, 0 for the return value.
    ///
    /// # Errors
    /// Returns an error if `param` is not a readable `Param` row.
    pub fn param_sequence_number_or_throw(&self, param: Token) -> Result<u32> {
        let reader = self.metadata()?;
        Ok(reader.param(expect_table(param, TableId::Param)?)?.sequence)
    }

    /// Name, flags and signature of a `Property`.
    ///
    /// # Errors
    /// Returns an error if `property` is not a readable `Property` row.
    pub fn property_def_props_or_throw(&self, property: Token) -> Result<PropertyDefProps<'_>> {
        let reader = self.metadata()?;
        let row = reader.property(expect_table(property, TableId::Property)?)?;

        Ok(PropertyDefProps {
            name: reader.string(row.name)?,
            flags: row.flags,
            signature: reader.blob(row.signature)?,
        })
    }

    /// Signature blob of a `Property`.
    ///
    /// # Errors
    /// Returns an error if `property` is not a readable `Property` row.
    pub fn property_signature_or_throw(&self, property: Token) -> Result<&[u8]> {
        Ok(self.property_def_props_or_throw(property)?.signature)
    }

    /// Name, flags and handler type of an `Event`.
    ///
    /// # Errors
    /// Returns an error if `event` is not a readable `Event` row.
    pub fn event_def_props_or_throw(&self, event: Token) -> Result<EventDefProps<'_>> {
        let reader = self.metadata()?;
        let row = reader.event(expect_table(event, TableId::Event)?)?;

        Ok(EventDefProps {
            name: reader.string(row.name)?,
            flags: row.flags,
            event_type: row.event_type,
        })
    }

    /// Name and flags of a `Field`.
    ///
    /// # Errors
    /// Returns an error if `field` is not a readable `Field` row.
    pub fn field_def_props_or_throw(&self, field: Token) -> Result<FieldDefProps<'_>> {
        let reader = self.metadata()?;
        let row = reader.field(expect_table(field, TableId::Field)?)?;

        Ok(FieldDefProps {
            name: reader.string(row.name)?,
            flags: row.flags,
        })
    }

    /// Signature blob of a `Field`.
    ///
    /// # Errors
    /// Returns an error if `field` is not a readable `Field` row.
    pub fn field_signature_or_throw(&self, field: Token) -> Result<&[u8]> {
        let reader = self.metadata()?;
        let row = reader.field(expect_table(field, TableId::Field)?)?;
        reader.blob(row.signature)
    }
}

// Generics and specifications
impl PeModule {
    /// Owner, position, flags and name of a `GenericParam`.
    ///
    /// # Errors
    /// Returns an error if `param` is not a readable `GenericParam` row.
    pub fn generic_param_props_or_throw(&self, param: Token) -> Result<GenericParamProps<'_>> {
        let reader = self.metadata()?;
        let row = reader.generic_param(expect_table(param, TableId::GenericParam)?)?;

        Ok(GenericParamProps {
            owner: row.owner,
            number: row.number,
            flags: row.flags,
            name: reader.string(row.name)?,
        })
    }

    /// Constraint types of a `GenericParam`, in row order.
    ///
    /// # Errors
    /// Returns an error if the `GenericParamConstraint` table cannot be read.
    pub fn generic_param_constraints_or_throw(&self, param: Token) -> Result<Vec<Token>> {
        let reader = self.metadata()?;
        reader
            .constraints_of(expect_table(param, TableId::GenericParam)?)?
            .into_iter()
            .map(|rid| Ok(reader.generic_param_constraint(rid)?.constraint))
            .collect()
    }

    /// Signature blob of a `TypeSpec`.
    ///
    /// # Errors
    /// Returns an error if `type_spec` is not a readable `TypeSpec` row.
    pub fn type_spec_signature_or_throw(&self, type_spec: Token) -> Result<&[u8]> {
        let reader = self.metadata()?;
        let row = reader.type_spec(expect_table(type_spec, TableId::TypeSpec)?)?;
        reader.blob(row.signature)
    }

    /// Generic method and instantiation blob of a `MethodSpec`.
    ///
    /// # Errors
    /// Returns an error if `method_spec` is not a readable `MethodSpec` row.
    pub fn method_spec_or_throw(&self, method_spec: Token) -> Result<MethodSpecProps<'_>> {
        let reader = self.metadata()?;
        let row = reader.method_spec(expect_table(method_spec, TableId::MethodSpec)?)?;

        Ok(MethodSpecProps {
            method: row.method,
            instantiation: reader.blob(row.instantiation)?,
        })
    }
}

// Values and marshalling
impl PeModule {
    /// Default value of a `Param`, [`ConstantValue::Bad`] if it has none or it cannot be read.
    #[must_use]
    pub fn param_default_value(&self, param: Token) -> ConstantValue {
        self.constant_value(param)
    }

    /// Value of a constant `Field`, [`ConstantValue::Bad`] if it has none or it cannot be read.
    #[must_use]
    pub fn constant_field_value(&self, field: Token) -> ConstantValue {
        self.constant_value(field)
    }

    fn constant_value(&self, parent: Token) -> ConstantValue {
        let Some(reader) = self.live() else {
            return ConstantValue::Bad;
        };

        let value = reader.constant_for(parent).and_then(|constant| match constant {
            Some(constant) => ConstantValue::read(reader, &constant),
            None => Ok(ConstantValue::Bad),
        });
        absorb(parent, value).unwrap_or_default()
    }

    /// First byte of the marshalling descriptor of a field or parameter.
    ///
    /// Values above the last known `UnmanagedType`, missing descriptors and unreadable rows give
    /// 0.
    #[must_use]
    pub fn marshalling_type(&self, parent: Token) -> u8 {
        marshalling_type(self.marshalling_descriptor(parent))
    }

    /// Marshalling descriptor blob of a field or parameter, empty if it has none.
    #[must_use]
    pub fn marshalling_descriptor(&self, parent: Token) -> &[u8] {
        let Some(reader) = self.live() else {
            return &[];
        };

        let descriptor = reader.field_marshal_for(parent).and_then(|marshal| match marshal {
            Some(marshal) => reader.blob(marshal.native_type),
            None => Ok(&[][..]),
        });
        absorb(parent, descriptor).unwrap_or_default()
    }

    /// Explicit offset of a `Field`, `None` if it has no `FieldLayout` row.
    #[must_use]
    pub fn field_offset(&self, field: Token) -> Option<u32> {
        let reader = self.live()?;
        let offset = expect_table(field, TableId::Field)
            .and_then(|rid| reader.field_layout_for(rid))
            .map(|layout| layout.map(|layout| layout.field_offset));
        absorb(field, offset).flatten()
    }
}

// Custom attributes
impl PeModule {
    /// `CustomAttribute` rows attached to `parent`.
    ///
    /// # Errors
    /// Returns an error if the attribute index cannot be read.
    pub fn custom_attributes_or_throw(&self, parent: Token) -> Result<Vec<Token>> {
        self.metadata()?.custom_attributes(parent)
    }

    /// Raw value blob of a `CustomAttribute`.
    ///
    /// # Errors
    /// Returns an error if `attribute` is not a readable `CustomAttribute` row.
    pub fn custom_attribute_value_or_throw(&self, attribute: Token) -> Result<&[u8]> {
        let reader = self.metadata()?;
        let row = reader.custom_attribute(expect_table(attribute, TableId::CustomAttribute)?)?;
        reader.blob(row.value)
    }

    /// Index of the template of `description` the constructor of `attribute` matches.
    pub fn target_attribute_signature_index(
        &self,
        attribute: Token,
        description: &AttributeDescription,
    ) -> Option<usize> {
        attributes::target_attribute_signature_index(self.live()?, attribute, description)
    }

    /// The constructor of `attribute` if its type is `namespace.name`.
    pub fn is_target_attribute(
        &self,
        attribute: Token,
        namespace: &str,
        name: &str,
        ignore_case: bool,
    ) -> Option<Token> {
        attributes::is_target_attribute(self.live()?, attribute, namespace, name, ignore_case)
    }

    /// Declaring type and constructor of `attribute`.
    pub fn type_and_constructor(&self, attribute: Token) -> Option<(Token, Token)> {
        attributes::type_and_constructor(self.live()?, attribute)
    }

    /// Namespace and name of a top-level `TypeDef` or `TypeRef`.
    pub fn attribute_namespace_and_name(&self, type_def_or_ref: Token) -> Option<(&str, &str)> {
        attributes::attribute_namespace_and_name(self.live()?, type_def_or_ref)
    }

    /// True if `token` carries an attribute matching `description`.
    #[must_use]
    pub fn has_attribute(&self, token: Token, description: &AttributeDescription) -> bool {
        self.find_attribute(token, description).is_some()
    }

    /// The first attribute on `token` matching `description`.
    pub fn attribute_handle(
        &self,
        token: Token,
        description: &AttributeDescription,
    ) -> Option<Token> {
        self.find_attribute(token, description).map(|info| info.handle)
    }

    fn find_attribute(
        &self,
        token: Token,
        description: &AttributeDescription,
    ) -> Option<AttributeInfo> {
        find_target_attribute(self.live()?, token, description)
    }

    fn attribute_value(&self, attribute: Token, kind: ValueKind) -> Option<AttributeValue> {
        decode_attribute(self.live()?, attribute, kind)
    }

    /// The string argument of the first attribute matching `description`. The inner `None` is
    /// a null string.
    fn string_valued_attribute(
        &self,
        token: Token,
        description: &AttributeDescription,
    ) -> Option<Option<String>> {
        let info = self.find_attribute(token, description)?;
        let AttributeValue::String(value) = self.attribute_value(info.handle, ValueKind::String)?
        else {
            return None;
        };
        Some(value)
    }

    /// Non-null string arguments of every attribute matching `description`.
    fn string_values_of_attributes(
        &self,
        token: Token,
        description: &AttributeDescription,
    ) -> Vec<String> {
        let Some(reader) = self.live() else {
            return Vec::new();
        };

        find_target_attributes(reader, token, description)
            .into_iter()
            .filter_map(|info| match decode_attribute(reader, info.handle, ValueKind::String) {
                Some(AttributeValue::String(value)) => value,
                _ => None,
            })
            .collect()
    }

    /// True if `token` carries `System.ParamArrayAttribute`.
    #[must_use]
    pub fn has_params_attribute(&self, token: Token) -> bool {
        self.has_attribute(token, &AttributeDescription::PARAM_ARRAY)
    }

    /// Number of `System.ParamArrayAttribute`s on `token`.
    ///
    /// # Errors
    /// Returns an error if the attributes of `token` cannot be enumerated.
    pub fn param_array_count_or_throw(&self, token: Token) -> Result<usize> {
        attributes::count_target_attributes_or_throw(
            self.metadata()?,
            token,
            &AttributeDescription::PARAM_ARRAY,
        )
    }

    /// True if `token` carries `ExtensionAttribute`, optionally matching its name ignoring case.
    #[must_use]
    pub fn has_extension_attribute(&self, token: Token, ignore_case: bool) -> bool {
        let description = if ignore_case {
            &AttributeDescription::CASE_INSENSITIVE_EXTENSION
        } else {
            &AttributeDescription::EXTENSION
        };
        self.has_attribute(token, description)
    }

    /// True if `token` carries `Microsoft.VisualBasic.Embedded`.
    #[must_use]
    pub fn has_visual_basic_embedded_attribute(&self, token: Token) -> bool {
        self.has_attribute(token, &AttributeDescription::VISUAL_BASIC_EMBEDDED)
    }

    /// True if `token` carries `RequiredAttributeAttribute`.
    #[must_use]
    pub fn has_required_attribute_attribute(&self, token: Token) -> bool {
        self.has_attribute(token, &AttributeDescription::REQUIRED_ATTRIBUTE)
    }

    /// Member name of `DefaultMemberAttribute`.
    pub fn default_member_attribute(&self, token: Token) -> Option<Option<String>> {
        self.string_valued_attribute(token, &AttributeDescription::DEFAULT_MEMBER)
    }

    /// Value of `GuidAttribute`.
    pub fn guid_attribute(&self, token: Token) -> Option<Option<String>> {
        self.string_valued_attribute(token, &AttributeDescription::GUID)
    }

    /// Property name of `AccessedThroughPropertyAttribute`.
    pub fn accessed_through_property_attribute(&self, token: Token) -> Option<Option<String>> {
        self.string_valued_attribute(token, &AttributeDescription::ACCESSED_THROUGH_PROPERTY)
    }

    /// Element type name and length of `FixedBufferAttribute`.
    pub fn fixed_buffer_attribute(&self, token: Token) -> Option<(Option<String>, i32)> {
        let info = self.find_attribute(token, &AttributeDescription::FIXED_BUFFER)?;
        let AttributeValue::StringAndInt(element_type, length) =
            self.attribute_value(info.handle, ValueKind::StringAndInt)?
        else {
            return None;
        };
        Some((element_type, length))
    }

    /// Transform flags of `DynamicAttribute`. The argumentless form means `[true]`.
    pub fn dynamic_attribute(&self, token: Token) -> Option<Vec<bool>> {
        self.bool_array_attribute(token, &AttributeDescription::DYNAMIC)
    }

    /// Transform flags of `NullableAttribute`. The argumentless form means `[true]`.
    pub fn nullable_attribute(&self, token: Token) -> Option<Vec<bool>> {
        self.bool_array_attribute(token, &AttributeDescription::NULLABLE)
    }

    fn bool_array_attribute(
        &self,
        token: Token,
        description: &AttributeDescription,
    ) -> Option<Vec<bool>> {
        let info = self.find_attribute(token, description)?;
        if info.signature_index == 0 {
            return Some(vec![true]);
        }

        let AttributeValue::BoolArray(flags) =
            self.attribute_value(info.handle, ValueKind::BoolArray)?
        else {
            return None;
        };
        Some(flags)
    }

    /// Argument of `NullableOptOutAttribute`.
    pub fn nullable_opt_out_attribute(&self, token: Token) -> Option<bool> {
        let info = self.find_attribute(token, &AttributeDescription::NULLABLE_OPT_OUT)?;
        let AttributeValue::Bool(value) = self.attribute_value(info.handle, ValueKind::Bool)?
        else {
            return None;
        };
        Some(value)
    }

    /// True if the module itself carries the argumentless `NullableAttribute`.
    ///
    /// The answer is computed once per module.
    #[must_use]
    pub fn utilizes_nullable_reference_types(&self) -> bool {
        if let Some(known) = self.utilizes_nullable.load().value() {
            return known;
        }

        if self.is_disposed() {
            return false;
        }

        let found = self
            .find_attribute(MODULE_TOKEN, &AttributeDescription::NULLABLE)
            .is_some_and(|info| info.signature_index == 0);
        self.utilizes_nullable.publish(ThreeState::from(found)) == ThreeState::True
    }

    /// Data of `Windows.Foundation.Metadata.DeprecatedAttribute`, or of `System.ObsoleteAttribute`
    /// if the former is absent.
    pub fn deprecated_or_obsolete_attribute(&self, token: Token) -> Option<ObsoleteAttributeData> {
        if let Some(info) = self.find_attribute(token, &AttributeDescription::DEPRECATED) {
            let AttributeValue::Obsolete(data) =
                self.attribute_value(info.handle, ValueKind::Deprecated)?
            else {
                return None;
            };
            return Some(data);
        }

        let info = self.find_attribute(token, &AttributeDescription::OBSOLETE)?;
        match info.signature_index {
            0 => Some(ObsoleteAttributeData::without_message(
                ObsoleteAttributeKind::Obsolete,
            )),
            1 => match self.attribute_value(info.handle, ValueKind::String)? {
                AttributeValue::String(message) => Some(ObsoleteAttributeData {
                    kind: ObsoleteAttributeKind::Obsolete,
                    message,
                    is_error: false,
                }),
                _ => None,
            },
            _ => match self.attribute_value(info.handle, ValueKind::Obsolete)? {
                AttributeValue::Obsolete(data) => Some(data),
                _ => None,
            },
        }
    }

    /// The `AttributeUsageAttribute` on an attribute type.
    pub fn attribute_usage_attribute(&self, token: Token) -> Option<Token> {
        self.attribute_handle(token, &AttributeDescription::ATTRIBUTE_USAGE)
    }

    /// Interface kind of `InterfaceTypeAttribute`. Values outside the known kinds are ignored.
    pub fn interface_type_attribute(&self, token: Token) -> Option<ComInterfaceType> {
        let info = self.find_attribute(token, &AttributeDescription::INTERFACE_TYPE)?;
        let value = match info.signature_index {
            0 => match self.attribute_value(info.handle, ValueKind::Int16)? {
                AttributeValue::Int16(value) => i32::from(value),
                _ => return None,
            },
            _ => match self.attribute_value(info.handle, ValueKind::Int32)? {
                AttributeValue::Int32(value) => value,
                _ => return None,
            },
        };

        ComInterfaceType::from_value(value)
    }

    /// Flags of `TypeLibTypeAttribute`.
    pub fn type_lib_type_attribute(&self, token: Token) -> Option<TypeLibTypeFlags> {
        let info = self.find_attribute(token, &AttributeDescription::TYPE_LIB_TYPE)?;
        let value = match info.signature_index {
            0 => match self.attribute_value(info.handle, ValueKind::Int16)? {
                AttributeValue::Int16(value) => i32::from(value),
                _ => return None,
            },
            _ => match self.attribute_value(info.handle, ValueKind::Int32)? {
                AttributeValue::Int32(value) => value,
                _ => return None,
            },
        };

        Some(TypeLibTypeFlags::from_bits_retain(value as u32))
    }

    /// Ticks of the last `DateTimeConstantAttribute` on `token`.
    pub fn date_time_constant_attribute(&self, token: Token) -> Option<ConstantValue> {
        let reader = self.live()?;
        let info =
            find_last_target_attribute(reader, token, &AttributeDescription::DATE_TIME_CONSTANT)?;
        match decode_attribute(reader, info.handle, ValueKind::Int64)? {
            AttributeValue::Int64(ticks) => Some(ConstantValue::DateTime(ticks)),
            _ => None,
        }
    }

    /// Value of the last `DecimalConstantAttribute` on `token`.
    pub fn decimal_constant_attribute(&self, token: Token) -> Option<ConstantValue> {
        let reader = self.live()?;
        let info =
            find_last_target_attribute(reader, token, &AttributeDescription::DECIMAL_CONSTANT)?;
        match decode_attribute(reader, info.handle, ValueKind::Decimal)? {
            AttributeValue::Decimal(value) => Some(ConstantValue::Decimal(value)),
            _ => None,
        }
    }

    /// Friend assembly names of every `InternalsVisibleToAttribute` on `token`.
    #[must_use]
    pub fn internals_visible_to_attribute_values(&self, token: Token) -> Vec<String> {
        self.string_values_of_attributes(token, &AttributeDescription::INTERNALS_VISIBLE_TO)
    }

    /// Friend assembly names declared on the assembly.
    #[must_use]
    pub fn assembly_internals_visible_to(&self) -> Vec<String> {
        self.internals_visible_to_attribute_values(ASSEMBLY_TOKEN)
    }

    /// Condition symbols of every `ConditionalAttribute` on `token`.
    #[must_use]
    pub fn conditional_attribute_values(&self, token: Token) -> Vec<String> {
        self.string_values_of_attributes(token, &AttributeDescription::CONDITIONAL)
    }
}

// Embedded interop types
impl PeModule {
    /// The `TypeIdentifierAttribute` of a `TypeDef`, if it is an embedded interop type.
    ///
    /// The answer is cached per row: repeated calls do not scan attributes again.
    pub fn is_no_pia_local_type(&self, type_def: Token) -> Option<AttributeInfo> {
        if !type_def.is(TableId::TypeDef) {
            return None;
        }
        self.no_pia.is_no_pia_local_type(self.live()?, type_def.row())
    }

    /// Like [`PeModule::is_no_pia_local_type`], additionally reading the interface guid and the
    /// explicit scope and identifier of the local type.
    pub fn no_pia_local_type_info(&self, type_def: Token) -> Option<NoPiaLocalTypeInfo> {
        if !type_def.is(TableId::TypeDef) {
            return None;
        }
        self.no_pia.local_type_info(self.live()?, type_def.row())
    }

    /// True if any type of the module is an embedded interop type.
    #[must_use]
    pub fn contains_no_pia_local_types(&self) -> bool {
        match self.live() {
            Some(reader) => self.no_pia.contains_no_pia_local_types(reader),
            None => false,
        }
    }

    /// Answer every later NoPia query negatively.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] if local types were already found.
    pub fn pretend_there_are_no_no_pia_local_types(&self) -> Result<()> {
        self.no_pia.pretend_there_are_no_no_pia_local_types()
    }

    /// The NoPia cache, for inspecting its state.
    #[must_use]
    pub fn no_pia_cache(&self) -> &NoPiaCache {
        &self.no_pia
    }
}

// Type forwarders
impl PeModule {
    fn forwarder_map(&self) -> Result<&ForwarderMap> {
        let reader = self.metadata()?;
        publish_once(&self.forwarders, || {
            let map = ForwarderMap::build(reader);
            trace!(count = map.len(), "forwarder map published");
            Ok(map)
        })
    }

    /// The `AssemblyRef` a type was forwarded to, and its name as stored in metadata.
    ///
    /// Case-insensitive lookups walk all forwarders.
    pub fn assembly_for_forwarded_type(
        &self,
        full_name: &str,
        ignore_case: bool,
    ) -> Option<(Token, &str)> {
        self.forwarder_map().ok()?.get(full_name, ignore_case)
    }

    /// All forwarded types with their destination `AssemblyRef`.
    pub fn forwarded_types(&self) -> impl Iterator<Item = (&str, Token)> {
        self.forwarder_map().ok().into_iter().flat_map(ForwarderMap::iter)
    }
}

impl std::fmt::Debug for PeModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeModule")
            .field("options", &self.options)
            .field("disposed", &self.is_disposed())
            .field("no_pia", &self.no_pia.gate())
            .field("hashes", &self.hashes)
            .finish_non_exhaustive()
    }
}

/// Row id of `token` if it belongs to `table`.
fn expect_table(token: Token, table: TableId) -> Result<u32> {
    if token.is(table) && !token.is_null() {
        Ok(token.row())
    } else {
        Err(Error::InvalidToken(token))
    }
}

fn range_tokens(table: TableId, rows: Range<u32>) -> Vec<Token> {
    rows.map(|rid| Token::from_parts(table, rid)).collect()
}

/// Fold the error of a best-effort query into `None`.
fn absorb<T>(token: Token, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            debug!(token = %token, %error, "best-effort metadata query failed");
            None
        }
    }
}

/// A module name from the `File` table must be a plain file name.
fn validate_file_name(name: &str) -> Result<()> {
    validate_identifier("module name", name)?;
    if name.contains(PATH_SEPARATORS) {
        return Err(Error::InvalidIdentifier {
            kind: "module name",
            value: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        file::Memory,
        metadata::{
            image::MetadataImageBuilder,
            signatures::ELEMENT_TYPE,
            tables::{AssemblyHashAlgorithm, ManifestResourceAttributes, PInvokeAttributes},
        },
    };

    struct Fixture {
        builder: MetadataImageBuilder,
        mscorlib: Token,
    }

    impl Fixture {
        fn new() -> Self {
            let mut builder = MetadataImageBuilder::new();
            builder.add_module("Library.dll").unwrap();
            let mscorlib = builder
                .add_assembly_ref("mscorlib", [4, 0, 0, 0], &[0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89], "")
                .unwrap();
            Fixture { builder, mscorlib }
        }

        fn attribute_ctor(&mut self, namespace: &str, name: &str, signature: &[u8]) -> Token {
            let attribute = self.builder.add_type_ref(self.mscorlib, namespace, name).unwrap();
            self.builder.add_member_ref(attribute, ".ctor", signature).unwrap()
        }

        fn module(self) -> PeModule {
            PeModule::new(Box::new(self.builder.build()), ModuleOptions::default())
        }
    }

    #[test]
    fn module_identity() {
        let mut fixture = Fixture::new();
        fixture.builder.add_assembly("Library", [1, 2, 3, 4], &[], "").unwrap();
        let module = fixture.module();

        assert_eq!(module.name().unwrap(), "Library.dll");
        assert!(module.is_manifest_module().unwrap());
        assert!(!module.is_linked_module().unwrap());
        assert_eq!(
            module.module_version_id_or_throw().unwrap(),
            uguid::guid!("d437908e-65e6-487c-9735-7bdff699bea5")
        );

        let identity = module.read_assembly_identity_or_throw().unwrap().unwrap();
        assert_eq!(identity.name, "Library");
        assert_eq!(identity.version.to_string(), "1.2.3.4");
    }

    #[test]
    fn linked_module_has_no_identity() {
        let module = Fixture::new().module();
        assert!(module.is_linked_module().unwrap());
        assert!(module.read_assembly_identity_or_throw().unwrap().is_none());
    }

    #[test]
    fn referenced_assemblies() {
        let mut fixture = Fixture::new();
        let system = fixture
            .builder
            .add_assembly_ref("System", [4, 0, 0, 0], &[], "")
            .unwrap();
        let mscorlib = fixture.mscorlib;
        let module = fixture.module();

        let references = module.referenced_assemblies().unwrap();
        assert_eq!(references.len(), 2);
        assert_eq!(references[0].name, "mscorlib");
        assert_eq!(references[1].name, "System");
        assert!(std::ptr::eq(references, module.referenced_assemblies().unwrap()));

        assert_eq!(module.assembly_ref("System"), Some(system));
        assert_eq!(module.assembly_ref("mscorlib"), Some(mscorlib));
        assert_eq!(module.assembly_ref("system"), None);

        let index = module.assembly_reference_index_or_throw(&references[1].clone()).unwrap();
        assert_eq!(index, Some(1));
    }

    #[test]
    fn invalid_referenced_assembly_is_reported() {
        let mut fixture = Fixture::new();
        fixture.builder.add_assembly_ref("", [1, 0, 0, 0], &[], "").unwrap();
        let module = fixture.module();

        assert!(matches!(
            module.referenced_assemblies(),
            Err(Error::InvalidIdentifier { .. })
        ));

        let mut fixture = Fixture::new();
        fixture.builder.add_assembly_ref("", [1, 0, 0, 0], &[], "").unwrap();
        let lenient = PeModule::new(Box::new(fixture.builder.build()), ModuleOptions::lenient());
        assert_eq!(lenient.referenced_assemblies().unwrap().len(), 2);
    }

    #[test]
    fn module_files_and_resources() {
        let mut fixture = Fixture::new();
        fixture.builder.add_file(FileAttributes::CONTAINS_META_DATA, "Second.netmodule").unwrap();
        fixture.builder.add_file(FileAttributes::CONTAINS_NO_META_DATA, "data.bin").unwrap();
        fixture
            .builder
            .add_manifest_resource(0, ManifestResourceAttributes::PUBLIC.bits(), "Strings.resources", Token::default())
            .unwrap();
        let external = fixture.mscorlib;
        fixture
            .builder
            .add_manifest_resource(0, ManifestResourceAttributes::PUBLIC.bits(), "Other.resources", external)
            .unwrap();
        let native = fixture.builder.add_module_ref("Native.netmodule").unwrap();
        fixture.builder.add_type_ref(native, "N", "A").unwrap();
        fixture.builder.add_type_ref(native, "N", "B").unwrap();
        let module = fixture.module();

        assert_eq!(module.metadata_module_names_or_throw().unwrap(), vec!["Second.netmodule"]);
        assert_eq!(
            module.referenced_managed_modules_or_throw().unwrap(),
            vec!["Native.netmodule"]
        );

        let resources = module.embedded_resources_or_throw().unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name, "Strings.resources");
        assert!(resources[0].is_public());
    }

    #[test]
    fn module_file_names_are_validated() {
        let mut fixture = Fixture::new();
        fixture.builder.add_file(FileAttributes::CONTAINS_META_DATA, "sub/Second.netmodule").unwrap();
        let module = fixture.module();

        assert!(matches!(
            module.metadata_module_names_or_throw(),
            Err(Error::InvalidIdentifier { kind: "module name", .. })
        ));
    }

    #[test]
    fn type_queries() {
        let mut fixture = Fixture::new();
        let object_ref = fixture.builder.add_type_ref(fixture.mscorlib, "System", "Object").unwrap();
        let outer = fixture
            .builder
            .add_type_def(TypeAttributes::PUBLIC, "Library", "Outer`1", object_ref)
            .unwrap();
        let field = fixture.builder.add_field(0x0001, "value", &[0x06, 0x08]).unwrap();
        let method = fixture.builder.add_method(0x0006, "Run", &[0x00, 0x01, 0x01, 0x08]).unwrap();
        let param = fixture.builder.add_param(0, 1, "count").unwrap();
        let generic = fixture.builder.add_generic_param(outer, 0, 0, "T").unwrap();
        fixture.builder.add_generic_param_constraint(generic, object_ref).unwrap();
        let inner = fixture
            .builder
            .add_type_def(TypeAttributes::NESTED_PUBLIC | TypeAttributes::INTERFACE, "", "IInner", Token::default())
            .unwrap();
        fixture.builder.add_nested_class(inner, outer).unwrap();
        let module = fixture.module();

        let props = module.type_def_props_or_throw(outer).unwrap();
        assert_eq!((props.namespace, props.name), ("Library", "Outer`1"));
        assert_eq!(props.extends, object_ref);
        assert_eq!(module.type_def_name_or_throw(outer).unwrap(), "Outer`1");
        assert!(!module.is_nested_type_def_or_throw(outer).unwrap());
        assert!(module.is_nested_type_def_or_throw(inner).unwrap());
        assert!(module.is_interface_or_throw(inner).unwrap());
        assert!(!module.is_interface_or_throw(outer).unwrap());

        assert_eq!(module.containing_type_or_throw(inner).unwrap(), Some(outer));
        assert_eq!(module.containing_type_or_throw(outer).unwrap(), None);
        assert_eq!(module.nested_type_defs_or_throw(outer).unwrap(), vec![inner]);

        assert_eq!(module.fields_of_type_or_throw(outer).unwrap(), vec![field]);
        assert_eq!(module.methods_of_type_or_throw(outer).unwrap(), vec![method]);
        assert_eq!(module.parameters_of_method_or_throw(method).unwrap(), vec![param]);
        assert_eq!(module.containing_type_of_method_or_throw(method).unwrap(), outer);
        assert_eq!(module.containing_type_of_field_or_throw(field).unwrap(), outer);
        assert!(module.fields_of_type_or_throw(inner).unwrap().is_empty());

        assert_eq!(module.type_def_generic_params_or_throw(outer).unwrap(), vec![generic]);
        assert!(module.has_generic_parameters_or_throw(outer).unwrap());
        assert!(!module.has_generic_parameters_or_throw(inner).unwrap());
        assert_eq!(module.generic_param_constraints_or_throw(generic).unwrap(), vec![object_ref]);
        assert_eq!(module.generic_param_props_or_throw(generic).unwrap().name, "T");

        let method_props = module.method_def_props_or_throw(method).unwrap();
        assert_eq!(method_props.name, "Run");
        assert_eq!(method_props.flags, 0x0006);
        assert_eq!(module.method_signature_or_throw(method).unwrap(), &[0x00, 0x01, 0x01, 0x08]);
        assert_eq!(module.param_sequence_number_or_throw(param).unwrap(), 1);
        assert_eq!(module.param_props_or_throw(param).unwrap().name, "count");
        assert_eq!(module.field_def_props_or_throw(field).unwrap().name, "value");
        assert_eq!(module.field_signature_or_throw(field).unwrap(), &[0x06, 0x08]);
    }

    #[test]
    fn wrong_token_kind_is_reported() {
        let mut fixture = Fixture::new();
        let mscorlib = fixture.mscorlib;
        let module = fixture.module();

        assert!(matches!(
            module.type_def_props_or_throw(mscorlib),
            Err(Error::InvalidToken(_))
        ));
        assert!(module.type_def_props_or_throw(Token::from_parts(TableId::TypeDef, 9)).is_err());
        assert!(module.method_def_name_or_throw(Token::default()).is_err());
    }

    #[test]
    fn type_refs_and_system_object() {
        let mut fixture = Fixture::new();
        let mscorlib = fixture.mscorlib;
        let string_ref = fixture.builder.add_type_ref(mscorlib, "System", "String").unwrap();
        fixture
            .builder
            .add_type_def(TypeAttributes::PUBLIC | TypeAttributes::INTERFACE, "System", "Object", Token::default())
            .unwrap();
        let object = fixture
            .builder
            .add_type_def(TypeAttributes::PUBLIC, "System", "Object", Token::default())
            .unwrap();
        let module = fixture.module();

        assert_eq!(module.type_ref(mscorlib, "System", "String"), Some(string_ref));
        assert_eq!(module.type_ref(mscorlib, "System", "string"), None);
        assert_eq!(module.type_ref(Token::default(), "System", "String"), None);

        let props = module.type_ref_props_or_throw(string_ref).unwrap();
        assert_eq!((props.scope, props.namespace, props.name), (mscorlib, "System", "String"));

        assert_eq!(module.find_system_object_type_def(), Some(object));
    }

    #[test]
    fn members_and_specs() {
        let mut fixture = Fixture::new();
        let list = fixture.builder.add_type_ref(fixture.mscorlib, "System", "List").unwrap();
        let add = fixture.builder.add_member_ref(list, "Add", &[0x20, 0x01, 0x01, 0x13, 0x00]).unwrap();
        let spec = fixture.builder.add_type_spec(&[0x15, 0x12, 0x05, 0x01, 0x08]).unwrap();
        let method_spec = fixture.builder.add_method_spec(add, &[0x0A, 0x01, 0x08]).unwrap();
        let owner = fixture
            .builder
            .add_type_def(TypeAttributes::PUBLIC, "Library", "Widget", Token::default())
            .unwrap();
        fixture.builder.add_property_map(owner).unwrap();
        let property = fixture.builder.add_property(0, "Count", &[0x28, 0x00, 0x08]).unwrap();
        fixture.builder.add_event_map(owner).unwrap();
        let event = fixture.builder.add_event(0, "Changed", list).unwrap();
        let module = fixture.module();

        let member = module.member_ref_props_or_throw(add).unwrap();
        assert_eq!((member.class, member.name), (list, "Add"));
        assert_eq!(module.member_ref_name_or_throw(add).unwrap(), "Add");
        assert_eq!(module.containing_type_of_member_ref_or_throw(add).unwrap(), list);
        assert_eq!(module.member_ref_signature_or_throw(add).unwrap(), member.signature);
        assert_eq!(module.method_signature_or_throw(add).unwrap(), member.signature);

        assert_eq!(module.type_spec_signature_or_throw(spec).unwrap(), &[0x15, 0x12, 0x05, 0x01, 0x08]);
        let instantiation = module.method_spec_or_throw(method_spec).unwrap();
        assert_eq!(instantiation.method, add);
        assert_eq!(instantiation.instantiation, &[0x0A, 0x01, 0x08]);

        assert_eq!(module.properties_of_type_or_throw(owner).unwrap(), vec![property]);
        assert_eq!(module.property_signature_or_throw(property).unwrap(), &[0x28, 0x00, 0x08]);
        assert_eq!(module.property_def_props_or_throw(property).unwrap().name, "Count");
        assert_eq!(module.events_of_type_or_throw(owner).unwrap(), vec![event]);
        let event_props = module.event_def_props_or_throw(event).unwrap();
        assert_eq!((event_props.name, event_props.event_type), ("Changed", list));
    }

    #[test]
    fn layout_and_values() {
        let mut fixture = Fixture::new();
        let point = fixture
            .builder
            .add_type_def(TypeAttributes::PUBLIC | TypeAttributes::EXPLICIT_LAYOUT, "Library", "Point", Token::default())
            .unwrap();
        fixture.builder.add_class_layout(point, 4, 16).unwrap();
        let x = fixture.builder.add_field(0x0001, "X", &[0x06, 0x08]).unwrap();
        let y = fixture.builder.add_field(0x0001, "Y", &[0x06, 0x08]).unwrap();
        fixture.builder.add_field_layout(x, 8).unwrap();
        fixture.builder.add_constant(x, ELEMENT_TYPE::I4, &42i32.to_le_bytes()).unwrap();
        fixture.builder.add_field_marshal(y, &[0x14, 0x00]).unwrap();
        fixture.builder.add_field_marshal(x, &[0x66]).unwrap();
        let auto = fixture
            .builder
            .add_type_def(TypeAttributes::PUBLIC, "Library", "Auto", Token::default())
            .unwrap();
        let module = fixture.module();

        let layout = module.type_layout(point);
        assert_eq!(layout.kind, LayoutKind::Explicit);
        assert_eq!((layout.size, layout.packing), (16, 4));
        assert_eq!(module.type_layout(auto), TypeLayout::default());
        assert_eq!(module.type_layout(Token::from_parts(TableId::TypeDef, 40)), TypeLayout::default());
        assert_eq!(module.type_layout_or_throw(point).unwrap(), layout);
        assert!(matches!(module.type_layout_or_throw(auto), Err(Error::NotSupported(_))));
        assert!(module.type_layout_or_throw(Token::from_parts(TableId::TypeDef, 40)).is_err());

        assert_eq!(module.field_offset(x), Some(8));
        assert_eq!(module.field_offset(y), None);

        assert_eq!(module.constant_field_value(x), ConstantValue::Int32(42));
        assert_eq!(module.constant_field_value(y), ConstantValue::Bad);
        assert_eq!(module.param_default_value(Token::from_parts(TableId::Param, 1)), ConstantValue::Bad);

        assert_eq!(module.marshalling_type(y), 0x14);
        assert_eq!(module.marshalling_descriptor(y), &[0x14, 0x00]);
        assert_eq!(module.marshalling_type(x), 0);
        assert!(module.marshalling_descriptor(auto).is_empty());
    }

    #[test]
    fn dll_import() {
        let mut fixture = Fixture::new();
        fixture
            .builder
            .add_type_def(TypeAttributes::PUBLIC, "Library", "NativeMethods", Token::default())
            .unwrap();
        let beep = fixture.builder.add_method(0x2016, "Beep", &[0x00, 0x00, 0x01]).unwrap();
        let local = fixture.builder.add_method(0x2016, "Local", &[0x00, 0x00, 0x01]).unwrap();
        let plain = fixture.builder.add_method(0x0006, "Plain", &[0x00, 0x00, 0x01]).unwrap();
        let kernel32 = fixture.builder.add_module_ref("kernel32.dll").unwrap();
        let flags = PInvokeAttributes::NO_MANGLE | PInvokeAttributes::CALL_CONV_WINAPI;
        fixture.builder.add_impl_map(beep, flags, "Beep", kernel32).unwrap();
        fixture.builder.add_impl_map(local, flags, "Local", Token::default()).unwrap();
        let module = fixture.module();

        let data = module.dll_import_data(beep).unwrap();
        assert_eq!(data.module_name, "kernel32.dll");
        assert_eq!(data.entry_point_name, "Beep");
        assert!(data.exact_spelling());

        assert!(module.dll_import_data(local).is_none());
        assert!(module.dll_import_data(plain).is_none());
        assert_eq!(module.module_ref_name_or_throw(kernel32).unwrap(), "kernel32.dll");
    }

    #[test]
    fn catalog_queries() {
        let mut fixture = Fixture::new();
        let target = fixture
            .builder
            .add_type_def(TypeAttributes::PUBLIC, "Library", "Widget", Token::default())
            .unwrap();

        let default_member = fixture.attribute_ctor("System.Reflection", "DefaultMemberAttribute", &[0x20, 0x01, 0x01, 0x0E]);
        fixture.builder.add_custom_attribute(target, default_member, &[0x01, 0x00, 0x04, b'I', b't', b'e', b'm', 0x00, 0x00]).unwrap();

        let dynamic = fixture.attribute_ctor("System.Runtime.CompilerServices", "DynamicAttribute", &[0x20, 0x00, 0x01]);
        fixture.builder.add_custom_attribute(target, dynamic, &[0x01, 0x00, 0x00, 0x00]).unwrap();

        let obsolete = fixture.attribute_ctor("System", "ObsoleteAttribute", &[0x20, 0x02, 0x01, 0x0E, 0x02]);
        fixture.builder.add_custom_attribute(target, obsolete, &[0x01, 0x00, 0x03, b'o', b'l', b'd', 0x01, 0x00, 0x00]).unwrap();

        let interface_type = fixture.attribute_ctor("System.Runtime.InteropServices", "InterfaceTypeAttribute", &[0x20, 0x01, 0x01, 0x06]);
        fixture.builder.add_custom_attribute(target, interface_type, &[0x01, 0x00, 0x01, 0x00, 0x00, 0x00]).unwrap();

        let module = fixture.module();

        assert_eq!(module.default_member_attribute(target), Some(Some("Item".to_string())));
        assert_eq!(module.dynamic_attribute(target), Some(vec![true]));
        assert_eq!(module.guid_attribute(target), None);
        assert!(!module.has_params_attribute(target));

        let obsolete = module.deprecated_or_obsolete_attribute(target).unwrap();
        assert_eq!(obsolete.kind, ObsoleteAttributeKind::Obsolete);
        assert_eq!(obsolete.message.as_deref(), Some("old"));
        assert!(obsolete.is_error);

        assert_eq!(
            module.interface_type_attribute(target),
            Some(ComInterfaceType::InterfaceIsIUnknown)
        );
    }

    #[test]
    fn module_level_nullable_is_cached() {
        let mut fixture = Fixture::new();
        let nullable = fixture.attribute_ctor("System.Runtime.CompilerServices", "NullableAttribute", &[0x20, 0x00, 0x01]);
        fixture.builder.add_custom_attribute(MODULE_TOKEN, nullable, &[0x01, 0x00]).unwrap();
        let module = fixture.module();

        assert!(module.utilizes_nullable_reference_types());
        assert_eq!(module.utilizes_nullable.load(), ThreeState::True);
        assert!(module.utilizes_nullable_reference_types());

        assert!(!Fixture::new().module().utilizes_nullable_reference_types());
    }

    #[test]
    fn forwarders_and_groups() {
        let mut fixture = Fixture::new();
        let mscorlib = fixture.mscorlib;
        fixture
            .builder
            .add_exported_type(TypeAttributes::FORWARDER, "Moved", "Thing", mscorlib)
            .unwrap();
        let local = fixture
            .builder
            .add_type_def(TypeAttributes::PUBLIC, "Library", "Widget", Token::default())
            .unwrap();
        let module = fixture.module();

        assert_eq!(module.assembly_for_forwarded_type("Moved.Thing", false), Some((mscorlib, "Moved.Thing")));
        assert_eq!(module.assembly_for_forwarded_type("moved.thing", true), Some((mscorlib, "Moved.Thing")));
        assert_eq!(module.assembly_for_forwarded_type("moved.thing", false), None);
        assert_eq!(module.forwarded_types().count(), 1);

        let groups = module.group_types_by_namespace_or_throw(NameComparer::Ordinal).unwrap();
        let names: Vec<_> = groups.iter().map(|group| group.namespace.as_str()).collect();
        assert_eq!(names, vec!["Library", "Moved"]);
        assert_eq!(groups[0].types, vec![local]);
        assert!(groups[1].types.is_empty());

        assert!(module.type_names().unwrap().contains("Widget"));
        assert!(module.namespace_names().unwrap().contains("Library"));
    }

    #[test]
    fn image_hash() {
        let module = PeModule::with_image(
            Box::new(Fixture::new().builder.build()),
            Box::new(Memory::new(b"image bytes".to_vec())),
            ModuleOptions::default(),
        );
        assert!(module.is_entire_image_available());

        let first = module.image_hash(AssemblyHashAlgorithm::SHA1).unwrap();
        let second = module.image_hash(AssemblyHashAlgorithm::SHA1).unwrap();
        assert_eq!(first.len(), 20);
        assert!(Arc::ptr_eq(&first, &second));

        let metadata_only = Fixture::new().module();
        assert!(!metadata_only.is_entire_image_available());
        assert!(matches!(
            metadata_only.image_hash(AssemblyHashAlgorithm::SHA1),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn disposed_module() {
        let mut fixture = Fixture::new();
        let widget = fixture
            .builder
            .add_type_def(TypeAttributes::PUBLIC, "Library", "Widget", Token::default())
            .unwrap();
        let module = fixture.module();
        assert!(module.name().is_ok());

        module.dispose();
        module.dispose();
        assert!(module.is_disposed());
        assert!(matches!(module.name(), Err(Error::Disposed)));
        assert!(matches!(module.type_def_props_or_throw(widget), Err(Error::Disposed)));
        assert!(matches!(module.referenced_assemblies(), Err(Error::Disposed)));
        assert!(module.assembly_ref("mscorlib").is_none());
        assert!(module.is_no_pia_local_type(widget).is_none());
        assert!(!module.contains_no_pia_local_types());
        assert_eq!(module.type_layout(widget), TypeLayout::default());
        assert_eq!(module.forwarded_types().count(), 0);
    }
}
