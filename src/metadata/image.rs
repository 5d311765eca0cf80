//! In-memory metadata image and its builder.
//!
//! [`MetadataImage`] is the crate's own [`RawMetadata`] implementation: decoded rows per table
//! plus the three heaps as real heap bytes. It is what a loader hands to
//! [`crate::metadata::module::PeModule`], and what tests and benchmarks build through
//! [`MetadataImageBuilder`].
//!
//! # Examples
//!
//! ```rust
//! use cilimport::metadata::{
//!     image::MetadataImageBuilder,
//!     reader::RawMetadata,
//!     tables::{TableId, TypeAttributes},
//! };
//!
//! let mut builder = MetadataImageBuilder::new();
//! builder.add_module("Library.dll")?;
//! let mscorlib = builder.add_assembly_ref("mscorlib", [4, 0, 0, 0], &[], "")?;
//! let object = builder.add_type_ref(mscorlib, "System", "Object")?;
//! builder.add_type_def(TypeAttributes::PUBLIC, "Library", "Widget", object)?;
//!
//! let image = builder.build();
//! assert_eq!(image.row_count(TableId::TypeDef), 1);
//! assert_eq!(image.row_count(TableId::TypeRef), 1);
//! # Ok::<(), cilimport::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    metadata::{
        reader::RawMetadata,
        streams::{Blob, BlobBuilder, Guid, GuidBuilder, Strings, StringsBuilder},
        tables::{
            AssemblyFlags, AssemblyRaw, AssemblyRefRaw, ClassLayoutRaw, CodedIndexType,
            ConstantRaw, CustomAttributeRaw, EventMapRaw, EventRaw, ExportedTypeRaw,
            FieldLayoutRaw, FieldMarshalRaw, FieldRaw, FileRaw, GenericParamConstraintRaw,
            GenericParamRaw, ImplMapRaw, ManifestResourceRaw, MemberRefRaw, MethodDefRaw,
            MethodSpecRaw, ModuleRaw, ModuleRefRaw, NestedClassRaw, ParamRaw, PropertyMapRaw,
            PropertyRaw, RowDefinition, TableId, TableRow, TypeDefRaw, TypeRefRaw, TypeSpecRaw,
        },
        token::Token,
    },
    Error, Result,
};

/// A fully decoded, immutable metadata image.
#[derive(Debug, Clone)]
pub struct MetadataImage {
    tables: HashMap<TableId, Vec<TableRow>>,
    strings: Vec<u8>,
    blobs: Vec<u8>,
    guids: Vec<u8>,
    attributes_by_parent: HashMap<Token, Vec<Token>>,
}

impl MetadataImage {
    fn rows(&self, table: TableId) -> &[TableRow] {
        self.tables.get(&table).map_or(&[], Vec::as_slice)
    }
}

impl RawMetadata for MetadataImage {
    fn row_count(&self, table: TableId) -> u32 {
        self.rows(table).len() as u32
    }

    fn row(&self, token: Token) -> Result<TableRow> {
        let Some(table) = token.kind() else {
            return Err(Error::InvalidToken(token));
        };
        if token.is_null() {
            return Err(Error::InvalidToken(token));
        }

        self.rows(table)
            .get(token.row() as usize - 1)
            .cloned()
            .ok_or(Error::InvalidToken(token))
    }

    fn custom_attributes(&self, parent: Token) -> Result<Vec<Token>> {
        Ok(self
            .attributes_by_parent
            .get(&parent)
            .cloned()
            .unwrap_or_default())
    }

    fn string(&self, index: u32) -> Result<&str> {
        Strings::from(&self.strings)?.get(index as usize)
    }

    fn blob(&self, index: u32) -> Result<&[u8]> {
        Blob::from(&self.blobs)?.get(index as usize)
    }

    fn guid(&self, index: u32) -> Result<uguid::Guid> {
        Guid::from(&self.guids)?.get(index as usize)
    }
}

/// Builds a [`MetadataImage`] row by row.
///
/// Strings, blobs and GUIDs are interned into real heap bytes. Every `add_*` method returns the
/// token of the new row. Rows that own runs of other rows (`TypeDef` owns fields and methods,
/// `MethodDef` owns parameters) start their run at the current end of the owned table, so owned
/// rows are added right after their owner.
#[derive(Debug, Clone)]
pub struct MetadataImageBuilder {
    tables: HashMap<TableId, Vec<TableRow>>,
    strings: StringsBuilder,
    blobs: BlobBuilder,
    guids: GuidBuilder,
}

impl MetadataImageBuilder {
    /// Create a builder with empty tables and heaps.
    #[must_use]
    pub fn new() -> Self {
        MetadataImageBuilder {
            tables: HashMap::new(),
            strings: StringsBuilder::new(),
            blobs: BlobBuilder::new(),
            guids: GuidBuilder::new(),
        }
    }

    /// Number of rows added to `table` so far.
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.tables.get(&table).map_or(0, |rows| rows.len() as u32)
    }

    /// Intern a string and return its heap index.
    ///
    /// # Errors
    /// Returns an error if the string contains NUL.
    pub fn string(&mut self, value: &str) -> Result<u32> {
        self.strings.add(value)
    }

    /// Intern a blob and return its heap index.
    ///
    /// # Errors
    /// Returns an error if the blob is too large.
    pub fn blob(&mut self, value: &[u8]) -> Result<u32> {
        self.blobs.add(value)
    }

    /// Intern a GUID and return its 1-based heap index.
    pub fn guid(&mut self, value: uguid::Guid) -> u32 {
        self.guids.add(value)
    }

    /// Append a row and return its token.
    ///
    /// # Errors
    /// Returns an error if a coded index column points into a table its kind does not allow.
    pub fn add_row<R: RowDefinition>(&mut self, row: R) -> Result<Token> {
        let row = row.into_row();
        for (kind, token) in coded_indexes(&row) {
            if !kind.accepts(token) {
                return Err(malformed_error!(
                    "Token {} is not a valid {:?} coded index",
                    token,
                    kind
                ));
            }
        }

        let rows = self.tables.entry(R::TABLE).or_default();
        rows.push(row);
        Ok(Token::from_parts(R::TABLE, rows.len() as u32))
    }

    /// Add the `Module` row with a fresh module version id.
    ///
    /// # Errors
    /// Returns an error if the name cannot be interned.
    pub fn add_module(&mut self, name: &str) -> Result<Token> {
        let name = self.string(name)?;
        let mvid = self.guid(uguid::guid!("d437908e-65e6-487c-9735-7bdff699bea5"));
        self.add_row(ModuleRaw {
            generation: 0,
            name,
            mvid,
            enc_id: 0,
            enc_base_id: 0,
        })
    }

    /// Add the `Assembly` row.
    ///
    /// # Errors
    /// Returns an error if a string or blob cannot be interned.
    pub fn add_assembly(
        &mut self,
        name: &str,
        version: [u16; 4],
        public_key: &[u8],
        culture: &str,
    ) -> Result<Token> {
        let name = self.string(name)?;
        let culture = self.string(culture)?;
        let public_key = self.blob(public_key)?;
        self.add_row(AssemblyRaw {
            hash_alg_id: crate::metadata::tables::AssemblyHashAlgorithm::SHA1,
            major_version: u32::from(version[0]),
            minor_version: u32::from(version[1]),
            build_number: u32::from(version[2]),
            revision_number: u32::from(version[3]),
            flags: if public_key == 0 {
                0
            } else {
                AssemblyFlags::PUBLIC_KEY
            },
            public_key,
            name,
            culture,
        })
    }

    /// Add an `AssemblyRef` row holding a public key token (or nothing, if empty).
    ///
    /// # Errors
    /// Returns an error if a string or blob cannot be interned.
    pub fn add_assembly_ref(
        &mut self,
        name: &str,
        version: [u16; 4],
        public_key_token: &[u8],
        culture: &str,
    ) -> Result<Token> {
        let name = self.string(name)?;
        let culture = self.string(culture)?;
        let public_key_or_token = self.blob(public_key_token)?;
        self.add_row(AssemblyRefRaw {
            major_version: u32::from(version[0]),
            minor_version: u32::from(version[1]),
            build_number: u32::from(version[2]),
            revision_number: u32::from(version[3]),
            flags: 0,
            public_key_or_token,
            name,
            culture,
            hash_value: 0,
        })
    }

    /// Add a `ModuleRef` row.
    ///
    /// # Errors
    /// Returns an error if the name cannot be interned.
    pub fn add_module_ref(&mut self, name: &str) -> Result<Token> {
        let name = self.string(name)?;
        self.add_row(ModuleRefRaw { name })
    }

    /// Add a `TypeRef` row resolved in `scope`.
    ///
    /// # Errors
    /// Returns an error if a name cannot be interned or `scope` is not a resolution scope.
    pub fn add_type_ref(&mut self, scope: Token, namespace: &str, name: &str) -> Result<Token> {
        let type_namespace = self.string(namespace)?;
        let type_name = self.string(name)?;
        self.add_row(TypeRefRaw {
            resolution_scope: scope,
            type_name,
            type_namespace,
        })
    }

    /// Add a `TypeDef` row. Its field and method runs start at the current end of those tables.
    ///
    /// # Errors
    /// Returns an error if a name cannot be interned or `extends` is not a `TypeDefOrRef`.
    pub fn add_type_def(
        &mut self,
        flags: u32,
        namespace: &str,
        name: &str,
        extends: Token,
    ) -> Result<Token> {
        let type_namespace = self.string(namespace)?;
        let type_name = self.string(name)?;
        let field_list = self.row_count(TableId::Field) + 1;
        let method_list = self.row_count(TableId::MethodDef) + 1;
        self.add_row(TypeDefRaw {
            flags,
            type_name,
            type_namespace,
            extends,
            field_list,
            method_list,
        })
    }

    /// Add a `NestedClass` row making `nested` a member of `enclosing`.
    ///
    /// # Errors
    /// Returns an error if either token is not a `TypeDef`.
    pub fn add_nested_class(&mut self, nested: Token, enclosing: Token) -> Result<Token> {
        if !nested.is(TableId::TypeDef) || !enclosing.is(TableId::TypeDef) {
            return Err(malformed_error!(
                "NestedClass rows relate two TypeDefs - {} {}",
                nested,
                enclosing
            ));
        }

        self.add_row(NestedClassRaw {
            nested_class: nested.row(),
            enclosing_class: enclosing.row(),
        })
    }

    /// Add a `Field` row to the most recently added type.
    ///
    /// # Errors
    /// Returns an error if the name or signature cannot be interned.
    pub fn add_field(&mut self, flags: u32, name: &str, signature: &[u8]) -> Result<Token> {
        let name = self.string(name)?;
        let signature = self.blob(signature)?;
        self.add_row(FieldRaw {
            flags,
            name,
            signature,
        })
    }

    /// Add a `MethodDef` row to the most recently added type. Its parameter run starts at the
    /// current end of the `Param` table.
    ///
    /// # Errors
    /// Returns an error if the name or signature cannot be interned.
    pub fn add_method(&mut self, flags: u32, name: &str, signature: &[u8]) -> Result<Token> {
        let name = self.string(name)?;
        let signature = self.blob(signature)?;
        let param_list = self.row_count(TableId::Param) + 1;
        self.add_row(MethodDefRaw {
            rva: 0,
            impl_flags: 0,
            flags,
            name,
            signature,
            param_list,
        })
    }

    /// Add a `Param` row to the most recently added method.
    ///
    /// # Errors
    /// Returns an error if the name cannot be interned.
    pub fn add_param(&mut self, flags: u32, sequence: u16, name: &str) -> Result<Token> {
        let name = self.string(name)?;
        self.add_row(ParamRaw {
            flags,
            sequence: u32::from(sequence),
            name,
        })
    }

    /// Add a `MemberRef` row.
    ///
    /// # Errors
    /// Returns an error if `class` is not a `MemberRefParent` or interning fails.
    pub fn add_member_ref(&mut self, class: Token, name: &str, signature: &[u8]) -> Result<Token> {
        let name = self.string(name)?;
        let signature = self.blob(signature)?;
        self.add_row(MemberRefRaw {
            class,
            name,
            signature,
        })
    }

    /// Add a `CustomAttribute` row applying `constructor` to `parent` with argument blob `value`.
    ///
    /// # Errors
    /// Returns an error if either token has the wrong kind or the blob cannot be interned.
    pub fn add_custom_attribute(
        &mut self,
        parent: Token,
        constructor: Token,
        value: &[u8],
    ) -> Result<Token> {
        let value = self.blob(value)?;
        self.add_row(CustomAttributeRaw {
            parent,
            constructor,
            value,
        })
    }

    /// Add a `Constant` row of element type `base`.
    ///
    /// # Errors
    /// Returns an error if `parent` is not a `HasConstant` or the blob cannot be interned.
    pub fn add_constant(&mut self, parent: Token, base: u8, value: &[u8]) -> Result<Token> {
        let value = self.blob(value)?;
        self.add_row(ConstantRaw {
            base,
            parent,
            value,
        })
    }

    /// Add a `FieldMarshal` row.
    ///
    /// # Errors
    /// Returns an error if `parent` is not a `HasFieldMarshal` or the blob cannot be interned.
    pub fn add_field_marshal(&mut self, parent: Token, native_type: &[u8]) -> Result<Token> {
        let native_type = self.blob(native_type)?;
        self.add_row(FieldMarshalRaw {
            parent,
            native_type,
        })
    }

    /// Add a `ClassLayout` row for a type.
    ///
    /// # Errors
    /// Returns an error if `parent` is not a `TypeDef`.
    pub fn add_class_layout(
        &mut self,
        parent: Token,
        packing_size: u16,
        class_size: u32,
    ) -> Result<Token> {
        if !parent.is(TableId::TypeDef) {
            return Err(malformed_error!("ClassLayout parent must be a TypeDef - {}", parent));
        }

        self.add_row(ClassLayoutRaw {
            packing_size: u32::from(packing_size),
            class_size,
            parent: parent.row(),
        })
    }

    /// Add a `FieldLayout` row for a field.
    ///
    /// # Errors
    /// Returns an error if `field` is not a `Field`.
    pub fn add_field_layout(&mut self, field: Token, field_offset: u32) -> Result<Token> {
        if !field.is(TableId::Field) {
            return Err(malformed_error!("FieldLayout field must be a Field - {}", field));
        }

        self.add_row(FieldLayoutRaw {
            field_offset,
            field: field.row(),
        })
    }

    /// Add a `PropertyMap` row for `parent`, starting at the current end of the `Property` table.
    ///
    /// # Errors
    /// Returns an error if `parent` is not a `TypeDef`.
    pub fn add_property_map(&mut self, parent: Token) -> Result<Token> {
        if !parent.is(TableId::TypeDef) {
            return Err(malformed_error!("PropertyMap parent must be a TypeDef - {}", parent));
        }

        let property_list = self.row_count(TableId::Property) + 1;
        self.add_row(PropertyMapRaw {
            parent: parent.row(),
            property_list,
        })
    }

    /// Add a `Property` row to the most recent property map.
    ///
    /// # Errors
    /// Returns an error if the name or signature cannot be interned.
    pub fn add_property(&mut self, flags: u32, name: &str, signature: &[u8]) -> Result<Token> {
        let name = self.string(name)?;
        let signature = self.blob(signature)?;
        self.add_row(PropertyRaw {
            flags,
            name,
            signature,
        })
    }

    /// Add an `EventMap` row for `parent`, starting at the current end of the `Event` table.
    ///
    /// # Errors
    /// Returns an error if `parent` is not a `TypeDef`.
    pub fn add_event_map(&mut self, parent: Token) -> Result<Token> {
        if !parent.is(TableId::TypeDef) {
            return Err(malformed_error!("EventMap parent must be a TypeDef - {}", parent));
        }

        let event_list = self.row_count(TableId::Event) + 1;
        self.add_row(EventMapRaw {
            parent: parent.row(),
            event_list,
        })
    }

    /// Add an `Event` row to the most recent event map.
    ///
    /// # Errors
    /// Returns an error if the name cannot be interned or `event_type` is not a `TypeDefOrRef`.
    pub fn add_event(&mut self, flags: u32, name: &str, event_type: Token) -> Result<Token> {
        let name = self.string(name)?;
        self.add_row(EventRaw {
            flags,
            name,
            event_type,
        })
    }

    /// Add a `TypeSpec` row.
    ///
    /// # Errors
    /// Returns an error if the signature cannot be interned.
    pub fn add_type_spec(&mut self, signature: &[u8]) -> Result<Token> {
        let signature = self.blob(signature)?;
        self.add_row(TypeSpecRaw { signature })
    }

    /// Add an `ImplMap` row importing `member` from the module `scope`.
    ///
    /// # Errors
    /// Returns an error if `scope` is neither nil nor a `ModuleRef`.
    pub fn add_impl_map(
        &mut self,
        member: Token,
        mapping_flags: u32,
        import_name: &str,
        scope: Token,
    ) -> Result<Token> {
        if !scope.is_null() && !scope.is(TableId::ModuleRef) {
            return Err(malformed_error!("ImplMap scope must be a ModuleRef - {}", scope));
        }

        let import_name = self.string(import_name)?;
        self.add_row(ImplMapRaw {
            mapping_flags,
            member_forwarded: member,
            import_name,
            import_scope: scope.row(),
        })
    }

    /// Add a `File` row.
    ///
    /// # Errors
    /// Returns an error if the name cannot be interned.
    pub fn add_file(&mut self, flags: u32, name: &str) -> Result<Token> {
        let name = self.string(name)?;
        self.add_row(FileRaw {
            flags,
            name,
            hash_value: 0,
        })
    }

    /// Add an `ExportedType` row.
    ///
    /// # Errors
    /// Returns an error if a name cannot be interned or `implementation` has the wrong kind.
    pub fn add_exported_type(
        &mut self,
        flags: u32,
        namespace: &str,
        name: &str,
        implementation: Token,
    ) -> Result<Token> {
        let namespace = self.string(namespace)?;
        let name = self.string(name)?;
        self.add_row(ExportedTypeRaw {
            flags,
            type_def_id: 0,
            name,
            namespace,
            implementation,
        })
    }

    /// Add a `ManifestResource` row.
    ///
    /// # Errors
    /// Returns an error if the name cannot be interned or `implementation` has the wrong kind.
    pub fn add_manifest_resource(
        &mut self,
        offset: u32,
        flags: u32,
        name: &str,
        implementation: Token,
    ) -> Result<Token> {
        let name = self.string(name)?;
        self.add_row(ManifestResourceRaw {
            offset,
            flags,
            name,
            implementation,
        })
    }

    /// Add a `GenericParam` row.
    ///
    /// # Errors
    /// Returns an error if the name cannot be interned or `owner` is not a `TypeOrMethodDef`.
    pub fn add_generic_param(
        &mut self,
        owner: Token,
        number: u16,
        flags: u32,
        name: &str,
    ) -> Result<Token> {
        let name = self.string(name)?;
        self.add_row(GenericParamRaw {
            number: u32::from(number),
            flags,
            owner,
            name,
        })
    }

    /// Add a `GenericParamConstraint` row.
    ///
    /// # Errors
    /// Returns an error if `owner` is not a `GenericParam` or `constraint` is not a `TypeDefOrRef`.
    pub fn add_generic_param_constraint(
        &mut self,
        owner: Token,
        constraint: Token,
    ) -> Result<Token> {
        if !owner.is(TableId::GenericParam) {
            return Err(malformed_error!(
                "GenericParamConstraint owner must be a GenericParam - {}",
                owner
            ));
        }

        self.add_row(GenericParamConstraintRaw {
            owner: owner.row(),
            constraint,
        })
    }

    /// Add a `MethodSpec` row.
    ///
    /// # Errors
    /// Returns an error if `method` is not a `MethodDefOrRef` or the blob cannot be interned.
    pub fn add_method_spec(&mut self, method: Token, instantiation: &[u8]) -> Result<Token> {
        let instantiation = self.blob(instantiation)?;
        self.add_row(MethodSpecRaw {
            method,
            instantiation,
        })
    }

    /// Finish the image and index custom attributes by parent.
    #[must_use]
    pub fn build(self) -> MetadataImage {
        let mut attributes_by_parent: HashMap<Token, Vec<Token>> = HashMap::new();
        if let Some(rows) = self.tables.get(&TableId::CustomAttribute) {
            for (index, row) in rows.iter().enumerate() {
                if let TableRow::CustomAttribute(attribute) = row {
                    attributes_by_parent
                        .entry(attribute.parent)
                        .or_default()
                        .push(Token::from_parts(
                            TableId::CustomAttribute,
                            index as u32 + 1,
                        ));
                }
            }
        }

        MetadataImage {
            tables: self.tables,
            strings: self.strings.finish(),
            blobs: self.blobs.finish(),
            guids: self.guids.finish(),
            attributes_by_parent,
        }
    }
}

impl Default for MetadataImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The coded index columns of a row together with their kinds.
fn coded_indexes(row: &TableRow) -> Vec<(CodedIndexType, Token)> {
    match row {
        TableRow::TypeRef(raw) => vec![(CodedIndexType::ResolutionScope, raw.resolution_scope)],
        TableRow::TypeDef(raw) => vec![(CodedIndexType::TypeDefOrRef, raw.extends)],
        TableRow::MemberRef(raw) => vec![(CodedIndexType::MemberRefParent, raw.class)],
        TableRow::Constant(raw) => vec![(CodedIndexType::HasConstant, raw.parent)],
        TableRow::CustomAttribute(raw) => vec![
            (CodedIndexType::HasCustomAttribute, raw.parent),
            (CodedIndexType::CustomAttributeType, raw.constructor),
        ],
        TableRow::FieldMarshal(raw) => vec![(CodedIndexType::HasFieldMarshal, raw.parent)],
        TableRow::Event(raw) => vec![(CodedIndexType::TypeDefOrRef, raw.event_type)],
        TableRow::ImplMap(raw) => vec![(CodedIndexType::MemberForwarded, raw.member_forwarded)],
        TableRow::ExportedType(raw) => vec![(CodedIndexType::Implementation, raw.implementation)],
        TableRow::ManifestResource(raw) => {
            vec![(CodedIndexType::Implementation, raw.implementation)]
        }
        TableRow::GenericParam(raw) => vec![(CodedIndexType::TypeOrMethodDef, raw.owner)],
        TableRow::MethodSpec(raw) => vec![(CodedIndexType::MethodDefOrRef, raw.method)],
        TableRow::GenericParamConstraint(raw) => {
            vec![(CodedIndexType::TypeDefOrRef, raw.constraint)]
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::TypeAttributes;

    #[test]
    fn builder_assigns_tokens() {
        let mut builder = MetadataImageBuilder::new();
        let module = builder.add_module("Test.dll").unwrap();
        let first = builder
            .add_type_def(0, "", "<Module>", Token(0))
            .unwrap();
        let second = builder
            .add_type_def(TypeAttributes::PUBLIC, "N", "C", Token(0))
            .unwrap();

        assert_eq!(module, Token(0x0000_0001));
        assert_eq!(first, Token(0x0200_0001));
        assert_eq!(second, Token(0x0200_0002));

        let image = builder.build();
        assert_eq!(image.row_count(TableId::TypeDef), 2);
        assert_eq!(image.row_count(TableId::Field), 0);
        assert_eq!(
            image.string(image.module_row(1).unwrap().name).unwrap(),
            "Test.dll"
        );
    }

    #[test]
    fn builder_rejects_bad_coded_index() {
        let mut builder = MetadataImageBuilder::new();
        let typedef = builder.add_type_def(0, "N", "C", Token(0)).unwrap();
        let field = builder.add_field(0, "f", &[0x06, 0x08]).unwrap();

        // A field is not a valid custom attribute constructor
        assert!(builder.add_custom_attribute(typedef, field, &[]).is_err());
        assert!(builder.add_type_ref(field, "N", "T").is_err());
        assert!(builder.add_class_layout(field, 0, 0).is_err());
    }

    #[test]
    fn invalid_tokens() {
        let image = MetadataImageBuilder::new().build();
        assert!(matches!(
            image.row(Token(0x0200_0001)),
            Err(Error::InvalidToken(_))
        ));
        assert!(image.row(Token(0x7F00_0001)).is_err());
        assert!(image.row(Token(0x0200_0000)).is_err());
        assert!(image.type_def(1).is_err());
    }

    #[test]
    fn members_and_owners() {
        let mut builder = MetadataImageBuilder::new();
        let first = builder.add_type_def(0, "N", "A", Token(0)).unwrap();
        builder.add_field(0, "a", &[0x06, 0x08]).unwrap();
        builder.add_method(0, "M1", &[0x00, 0x00, 0x01]).unwrap();
        builder.add_param(0, 1, "x").unwrap();
        builder.add_method(0, "M2", &[0x00, 0x00, 0x01]).unwrap();
        let empty = builder.add_type_def(0, "N", "B", Token(0)).unwrap();
        let last = builder.add_type_def(0, "N", "C", Token(0)).unwrap();
        let field = builder.add_field(0, "c", &[0x06, 0x08]).unwrap();
        let method = builder.add_method(0, "M3", &[0x00, 0x00, 0x01]).unwrap();
        builder.add_nested_class(empty, first).unwrap();

        let image = builder.build();
        assert_eq!(image.fields_of_type(first.row()).unwrap(), 1..2);
        assert_eq!(image.methods_of_type(first.row()).unwrap(), 1..3);
        assert_eq!(image.methods_of_type(empty.row()).unwrap(), 3..3);
        assert_eq!(image.methods_of_type(last.row()).unwrap(), 3..4);
        assert_eq!(image.params_of_method(1).unwrap(), 1..2);
        assert_eq!(image.params_of_method(2).unwrap(), 2..2);

        assert_eq!(image.declaring_type_of_method(2).unwrap(), first.row());
        assert_eq!(image.declaring_type_of_method(method.row()).unwrap(), last.row());
        assert_eq!(image.declaring_type_of_field(field.row()).unwrap(), last.row());
        assert!(image.declaring_type_of_method(9).is_err());

        assert_eq!(image.enclosing_type(empty.row()).unwrap(), Some(first.row()));
        assert_eq!(image.enclosing_type(first.row()).unwrap(), None);
        assert_eq!(image.nested_types(first.row()).unwrap(), vec![empty.row()]);
    }

    #[test]
    fn attributes_indexed_by_parent() {
        let mut builder = MetadataImageBuilder::new();
        let typedef = builder.add_type_def(0, "N", "C", Token(0)).unwrap();
        let ctor = builder
            .add_method(0x1800, ".ctor", &[0x20, 0x00, 0x01])
            .unwrap();
        let first = builder.add_custom_attribute(typedef, ctor, &[0x01, 0x00]).unwrap();
        builder.add_custom_attribute(ctor, ctor, &[0x01, 0x00]).unwrap();
        let third = builder.add_custom_attribute(typedef, ctor, &[0x01, 0x00]).unwrap();

        let image = builder.build();
        assert_eq!(image.custom_attributes(typedef).unwrap(), vec![first, third]);
        assert!(image
            .custom_attributes(Token(0x0400_0001))
            .unwrap()
            .is_empty());
    }
}
