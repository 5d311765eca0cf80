//! Row layouts of the metadata tables the import facade reads.
//!
//! Rows keep heap references as raw heap indexes (`u32`) and coded indexes as resolved
//! [`Token`]s. Columns that index a single table (`field_list`, `parent` of `ClassLayout`, ...)
//! keep the 1-based row id. A row does not know its own token; that is determined by its
//! position in its table.

use crate::metadata::{tables::TableId, token::Token};

/// Common behaviour of all row types, used by the typed accessors of
/// [`crate::metadata::reader::RawMetadata`].
pub trait RowDefinition: Sized {
    /// The table rows of this type live in
    const TABLE: TableId;

    /// Wrap the row into the table-agnostic [`TableRow`].
    fn into_row(self) -> TableRow;

    /// Unwrap a [`TableRow`], returning `None` if it belongs to a different table.
    fn from_row(row: TableRow) -> Option<Self>;
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `Module` table describes the current module. `TableId` = 0x00
pub struct ModuleRaw {
    /// a 2-byte value, reserved, shall be zero
    pub generation: u32,
    /// an index into the String heap
    pub name: u32,
    /// an index into the Guid heap; the module version id
    pub mvid: u32,
    /// an index into the Guid heap; reserved, shall be zero
    pub enc_id: u32,
    /// an index into the Guid heap; reserved, shall be zero
    pub enc_base_id: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `TypeRef` table references types in other scopes. `TableId` = 0x01
pub struct TypeRefRaw {
    /// a `ResolutionScope` coded index
    pub resolution_scope: Token,
    /// an index into the String heap
    pub type_name: u32,
    /// an index into the String heap
    pub type_namespace: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `TypeDef` table defines types in the current module. `TableId` = 0x02
pub struct TypeDefRaw {
    /// a 4-byte bitmask of type `TypeAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub type_name: u32,
    /// an index into the String heap
    pub type_namespace: u32,
    /// a `TypeDefOrRef` coded index, nil for `System.Object` and interfaces
    pub extends: Token,
    /// an index into the Field table; first of a contiguous run of fields owned by this type
    pub field_list: u32,
    /// an index into the `MethodDef` table; first of a contiguous run of methods owned by this type
    pub method_list: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `Field` table. `TableId` = 0x04
pub struct FieldRaw {
    /// a 2-byte bitmask of type `FieldAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub name: u32,
    /// an index into the Blob heap
    pub signature: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `MethodDef` table. `TableId` = 0x06
pub struct MethodDefRaw {
    /// a 4-byte constant, the RVA of the method body
    pub rva: u32,
    /// a 2-byte bitmask of type `MethodImplAttributes`
    pub impl_flags: u32,
    /// a 2-byte bitmask of type `MethodAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub name: u32,
    /// an index into the Blob heap
    pub signature: u32,
    /// an index into the Param table; first of a contiguous run of parameters owned by this method
    pub param_list: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `Param` table. `TableId` = 0x08
pub struct ParamRaw {
    /// a 2-byte bitmask of type `ParamAttributes`
    pub flags: u32,
    /// a 2-byte constant; 0 is the return value
    pub sequence: u32,
    /// an index into the String heap
    pub name: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `MemberRef` table. `TableId` = 0x0A
pub struct MemberRefRaw {
    /// a `MemberRefParent` coded index
    pub class: Token,
    /// an index into the String heap
    pub name: u32,
    /// an index into the Blob heap
    pub signature: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `Constant` table. `TableId` = 0x0B
pub struct ConstantRaw {
    /// a 1-byte `ELEMENT_TYPE` constant
    pub base: u8,
    /// a `HasConstant` coded index
    pub parent: Token,
    /// an index into the Blob heap
    pub value: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `CustomAttribute` table. `TableId` = 0x0C
pub struct CustomAttributeRaw {
    /// a `HasCustomAttribute` coded index
    pub parent: Token,
    /// a `CustomAttributeType` coded index
    pub constructor: Token,
    /// an index into the Blob heap
    pub value: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `FieldMarshal` table. `TableId` = 0x0D
pub struct FieldMarshalRaw {
    /// a `HasFieldMarshal` coded index
    pub parent: Token,
    /// an index into the Blob heap
    pub native_type: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `ClassLayout` table. `TableId` = 0x0F
pub struct ClassLayoutRaw {
    /// a 2-byte constant
    pub packing_size: u32,
    /// a 4-byte constant
    pub class_size: u32,
    /// an index into the `TypeDef` table
    pub parent: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `FieldLayout` table. `TableId` = 0x10
pub struct FieldLayoutRaw {
    /// a 4-byte constant
    pub field_offset: u32,
    /// an index into the Field table
    pub field: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `EventMap` table. `TableId` = 0x12
pub struct EventMapRaw {
    /// an index into the `TypeDef` table
    pub parent: u32,
    /// an index into the Event table; first of a contiguous run of events owned by `parent`
    pub event_list: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `Event` table. `TableId` = 0x14
pub struct EventRaw {
    /// a 2-byte bitmask of type `EventAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub name: u32,
    /// a `TypeDefOrRef` coded index
    pub event_type: Token,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `PropertyMap` table. `TableId` = 0x15
pub struct PropertyMapRaw {
    /// an index into the `TypeDef` table
    pub parent: u32,
    /// an index into the Property table; first of a contiguous run of properties owned by `parent`
    pub property_list: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `Property` table. `TableId` = 0x17
pub struct PropertyRaw {
    /// a 2-byte bitmask of type `PropertyAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub name: u32,
    /// an index into the Blob heap
    pub signature: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `ModuleRef` table. `TableId` = 0x1A
pub struct ModuleRefRaw {
    /// an index into the String heap
    pub name: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `TypeSpec` table. `TableId` = 0x1B
pub struct TypeSpecRaw {
    /// an index into the Blob heap
    pub signature: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `ImplMap` table. `TableId` = 0x1C
pub struct ImplMapRaw {
    /// a 2-byte bitmask of type `PInvokeAttributes`
    pub mapping_flags: u32,
    /// a `MemberForwarded` coded index
    pub member_forwarded: Token,
    /// an index into the String heap
    pub import_name: u32,
    /// an index into the `ModuleRef` table
    pub import_scope: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `Assembly` table. `TableId` = 0x20
pub struct AssemblyRaw {
    /// a 4-byte constant of type `AssemblyHashAlgorithm`
    pub hash_alg_id: u32,
    /// a 2-byte constant
    pub major_version: u32,
    /// a 2-byte constant
    pub minor_version: u32,
    /// a 2-byte constant
    pub build_number: u32,
    /// a 2-byte constant
    pub revision_number: u32,
    /// a 4-byte bitmask of type `AssemblyFlags`
    pub flags: u32,
    /// an index into the Blob heap
    pub public_key: u32,
    /// an index into the String heap
    pub name: u32,
    /// an index into the String heap
    pub culture: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `AssemblyRef` table. `TableId` = 0x23
pub struct AssemblyRefRaw {
    /// a 2-byte constant
    pub major_version: u32,
    /// a 2-byte constant
    pub minor_version: u32,
    /// a 2-byte constant
    pub build_number: u32,
    /// a 2-byte constant
    pub revision_number: u32,
    /// a 4-byte bitmask of type `AssemblyFlags`
    pub flags: u32,
    /// an index into the Blob heap; public key or token
    pub public_key_or_token: u32,
    /// an index into the String heap
    pub name: u32,
    /// an index into the String heap
    pub culture: u32,
    /// an index into the Blob heap
    pub hash_value: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `File` table. `TableId` = 0x26
pub struct FileRaw {
    /// a 4-byte bitmask of type `FileAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub name: u32,
    /// an index into the Blob heap
    pub hash_value: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `ExportedType` table. `TableId` = 0x27
pub struct ExportedTypeRaw {
    /// a 4-byte bitmask of type `TypeAttributes`
    pub flags: u32,
    /// a 4-byte hint into the `TypeDef` table of the implementing module
    pub type_def_id: u32,
    /// an index into the String heap
    pub name: u32,
    /// an index into the String heap
    pub namespace: u32,
    /// an `Implementation` coded index
    pub implementation: Token,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `ManifestResource` table. `TableId` = 0x28
pub struct ManifestResourceRaw {
    /// a 4-byte constant, offset of the resource inside the resource directory
    pub offset: u32,
    /// a 4-byte bitmask of type `ManifestResourceAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub name: u32,
    /// an `Implementation` coded index, nil for resources embedded in this file
    pub implementation: Token,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `NestedClass` table. `TableId` = 0x29
pub struct NestedClassRaw {
    /// an index into the `TypeDef` table
    pub nested_class: u32,
    /// an index into the `TypeDef` table
    pub enclosing_class: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `GenericParam` table. `TableId` = 0x2A
pub struct GenericParamRaw {
    /// a 2-byte index of the generic parameter, numbered left-to-right from zero
    pub number: u32,
    /// a 2-byte bitmask of type `GenericParamAttributes`
    pub flags: u32,
    /// a `TypeOrMethodDef` coded index
    pub owner: Token,
    /// an index into the String heap
    pub name: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `MethodSpec` table. `TableId` = 0x2B
pub struct MethodSpecRaw {
    /// a `MethodDefOrRef` coded index
    pub method: Token,
    /// an index into the Blob heap
    pub instantiation: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// The `GenericParamConstraint` table. `TableId` = 0x2C
pub struct GenericParamConstraintRaw {
    /// an index into the `GenericParam` table
    pub owner: u32,
    /// a `TypeDefOrRef` coded index
    pub constraint: Token,
}

macro_rules! table_rows {
    ($($table:ident => $raw:ident),* $(,)?) => {
        /// A row of any modelled table.
        #[derive(Clone, Debug, PartialEq)]
        pub enum TableRow {
            $(
                #[allow(missing_docs)]
                $table($raw),
            )*
        }

        impl TableRow {
            /// The table this row belongs to.
            #[must_use]
            pub fn table(&self) -> TableId {
                match self {
                    $(TableRow::$table(_) => TableId::$table,)*
                }
            }
        }

        $(
            impl RowDefinition for $raw {
                const TABLE: TableId = TableId::$table;

                fn into_row(self) -> TableRow {
                    TableRow::$table(self)
                }

                fn from_row(row: TableRow) -> Option<Self> {
                    match row {
                        TableRow::$table(raw) => Some(raw),
                        _ => None,
                    }
                }
            }
        )*
    };
}

table_rows! {
    Module => ModuleRaw,
    TypeRef => TypeRefRaw,
    TypeDef => TypeDefRaw,
    Field => FieldRaw,
    MethodDef => MethodDefRaw,
    Param => ParamRaw,
    MemberRef => MemberRefRaw,
    Constant => ConstantRaw,
    CustomAttribute => CustomAttributeRaw,
    FieldMarshal => FieldMarshalRaw,
    ClassLayout => ClassLayoutRaw,
    FieldLayout => FieldLayoutRaw,
    EventMap => EventMapRaw,
    Event => EventRaw,
    PropertyMap => PropertyMapRaw,
    Property => PropertyRaw,
    ModuleRef => ModuleRefRaw,
    TypeSpec => TypeSpecRaw,
    ImplMap => ImplMapRaw,
    Assembly => AssemblyRaw,
    AssemblyRef => AssemblyRefRaw,
    File => FileRaw,
    ExportedType => ExportedTypeRaw,
    ManifestResource => ManifestResourceRaw,
    NestedClass => NestedClassRaw,
    GenericParam => GenericParamRaw,
    MethodSpec => MethodSpecRaw,
    GenericParamConstraint => GenericParamConstraintRaw,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_wrapping() {
        let row = TypeRefRaw {
            resolution_scope: Token(0x2300_0001),
            type_name: 5,
            type_namespace: 1,
        }
        .into_row();

        assert_eq!(row.table(), TableId::TypeRef);
        assert!(TypeDefRaw::from_row(row.clone()).is_none());

        let back = TypeRefRaw::from_row(row).unwrap();
        assert_eq!(back.type_name, 5);
        assert_eq!(TypeRefRaw::TABLE, TableId::TypeRef);
    }
}
