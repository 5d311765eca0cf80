//! Metadata table identifiers (ECMA-335 II.22).

use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// Identifiers of the metadata tables, valued by their ECMA-335 table number.
///
/// The value is the high byte of every [`crate::metadata::token::Token`] pointing into the
/// table. Edit-and-continue and pointer tables are not listed, since no import path reads them.
#[derive(Clone, Copy, PartialEq, Debug, EnumIter, EnumCount, Eq, Hash, PartialOrd, Ord)]
pub enum TableId {
    /// `Module`, exactly one row describing the current module
    Module = 0x00,
    /// `TypeRef`, references to types defined in other modules or assemblies
    TypeRef = 0x01,
    /// `TypeDef`, types defined in this module
    TypeDef = 0x02,
    /// `Field`, field definitions
    Field = 0x04,
    /// `MethodDef`, method definitions
    MethodDef = 0x06,
    /// `Param`, parameter definitions
    Param = 0x08,
    /// `InterfaceImpl`, interfaces implemented by a type
    InterfaceImpl = 0x09,
    /// `MemberRef`, references to fields and methods of other types
    MemberRef = 0x0A,
    /// `Constant`, compile-time constant values for fields, parameters and properties
    Constant = 0x0B,
    /// `CustomAttribute`, custom attribute applications
    CustomAttribute = 0x0C,
    /// `FieldMarshal`, marshalling descriptors of fields and parameters
    FieldMarshal = 0x0D,
    /// `DeclSecurity`, declarative security
    DeclSecurity = 0x0E,
    /// `ClassLayout`, explicit size and packing of a type
    ClassLayout = 0x0F,
    /// `FieldLayout`, explicit field offsets
    FieldLayout = 0x10,
    /// `StandAloneSig`, standalone signatures
    StandAloneSig = 0x11,
    /// `EventMap`, maps types to their run of events
    EventMap = 0x12,
    /// `Event`, event definitions
    Event = 0x14,
    /// `PropertyMap`, maps types to their run of properties
    PropertyMap = 0x15,
    /// `Property`, property definitions
    Property = 0x17,
    /// `MethodSemantics`, accessor associations
    MethodSemantics = 0x18,
    /// `MethodImpl`, explicit method overrides
    MethodImpl = 0x19,
    /// `ModuleRef`, references to other modules
    ModuleRef = 0x1A,
    /// `TypeSpec`, type specifications by signature
    TypeSpec = 0x1B,
    /// `ImplMap`, P/Invoke import information
    ImplMap = 0x1C,
    /// `FieldRVA`, initial data of fields
    FieldRVA = 0x1D,
    /// `Assembly`, the current assembly's manifest row
    Assembly = 0x20,
    /// `AssemblyRef`, referenced assemblies
    AssemblyRef = 0x23,
    /// `File`, files of a multi-module assembly
    File = 0x26,
    /// `ExportedType`, types exported or forwarded to other assemblies
    ExportedType = 0x27,
    /// `ManifestResource`, manifest resources
    ManifestResource = 0x28,
    /// `NestedClass`, nesting relations between types
    NestedClass = 0x29,
    /// `GenericParam`, generic parameters of types and methods
    GenericParam = 0x2A,
    /// `MethodSpec`, generic method instantiations
    MethodSpec = 0x2B,
    /// `GenericParamConstraint`, constraints of generic parameters
    GenericParamConstraint = 0x2C,
}

impl TableId {
    /// Look up a table by its ECMA-335 table number.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<TableId> {
        TableId::iter().find(|table| *table as u8 == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_numbers() {
        assert_eq!(TableId::from_u8(0x02), Some(TableId::TypeDef));
        assert_eq!(TableId::from_u8(0x27), Some(TableId::ExportedType));
        assert_eq!(TableId::from_u8(0x03), None);
        assert_eq!(TableId::from_u8(0xFF), None);
    }

    #[test]
    fn every_table_round_trips() {
        for table in TableId::iter() {
            assert_eq!(TableId::from_u8(table as u8), Some(table));
        }
        assert_eq!(TableId::iter().count(), TableId::COUNT);
    }
}
