//! Values describing the physical shape of imported entities.
//!
//! [`TypeLayout`] from `ClassLayout`, [`DllImportData`] from `ImplMap`, [`ConstantValue`] from
//! `Constant`, [`EmbeddedResource`] from `ManifestResource`, and the first byte of a
//! `FieldMarshal` descriptor. The readers here propagate malformed-image errors. The facade
//! decides per operation whether to surface them or fold them into a default.

use std::fmt;

use crate::{
    file::parser::Parser,
    metadata::{
        attributes::Decimal,
        reader::RawMetadata,
        signatures::ELEMENT_TYPE,
        tables::{
            ConstantRaw, ManifestResourceAttributes, ManifestResourceRaw, PInvokeAttributes,
            TypeAttributes,
        },
    },
    Result,
};

/// Largest `UnmanagedType` value the compiler cares about; higher first bytes read as 0.
pub const MAX_UNMANAGED_TYPE: u8 = 0x50;

/// How the fields of a type are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutKind {
    /// The runtime chooses the layout
    #[default]
    Auto,
    /// Fields are laid out in declaration order
    Sequential,
    /// Field offsets are given explicitly
    Explicit,
}

/// Layout of a type, from its flags and `ClassLayout` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeLayout {
    /// Layout kind from the type flags
    pub kind: LayoutKind,
    /// Class size in bytes, 0 if unspecified or out of range
    pub size: u32,
    /// Packing alignment, 0 if unspecified or out of range
    pub packing: u8,
}

impl TypeLayout {
    /// Read the layout of a `TypeDef` row.
    ///
    /// Auto-layout types and types with an unknown layout kind get the default layout. A type
    /// without a `ClassLayout` row has size and packing 0.
    ///
    /// # Errors
    /// Returns an error if the `TypeDef` or `ClassLayout` rows cannot be read.
    pub fn read(reader: &dyn RawMetadata, type_rid: u32) -> Result<TypeLayout> {
        let flags = reader.type_def(type_rid)?.flags;

        let kind = match flags & TypeAttributes::LAYOUT_MASK {
            TypeAttributes::SEQUENTIAL_LAYOUT => LayoutKind::Sequential,
            TypeAttributes::EXPLICIT_LAYOUT => LayoutKind::Explicit,
            _ => return Ok(TypeLayout::default()),
        };

        let Some(layout) = reader.class_layout_for(type_rid)? else {
            return Ok(TypeLayout {
                kind,
                ..TypeLayout::default()
            });
        };

        Ok(TypeLayout {
            kind,
            size: if i32::try_from(layout.class_size).is_ok() {
                layout.class_size
            } else {
                0
            },
            packing: u8::try_from(layout.packing_size).unwrap_or(0),
        })
    }
}

/// Platform invoke data of a method, from its `ImplMap` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DllImportData {
    /// Name of the `ModuleRef` the method is imported from
    pub module_name: String,
    /// Name of the native entry point
    pub entry_point_name: String,
    /// `PInvokeAttributes` flags
    pub flags: u32,
}

impl DllImportData {
    /// True if the entry point name is used exactly as given.
    #[must_use]
    pub fn exact_spelling(&self) -> bool {
        self.flags & PInvokeAttributes::NO_MANGLE != 0
    }

    /// Character set bits of the flags.
    #[must_use]
    pub fn char_set(&self) -> u32 {
        self.flags & PInvokeAttributes::CHAR_SET_MASK
    }

    /// Calling convention bits of the flags.
    #[must_use]
    pub fn calling_convention(&self) -> u32 {
        self.flags & PInvokeAttributes::CALL_CONV_MASK
    }

    /// True if the callee sets the last error.
    #[must_use]
    pub fn set_last_error(&self) -> bool {
        self.flags & PInvokeAttributes::SUPPORTS_LAST_ERROR != 0
    }
}

/// A manifest resource stored inside this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedResource {
    /// Offset of the resource in the resources directory
    pub offset: u32,
    /// Visibility flags
    pub flags: ManifestResourceAttributes,
    /// Resource name
    pub name: String,
}

impl EmbeddedResource {
    /// Read a `ManifestResource` row. Returns `None` if the resource lives in another file or
    /// assembly.
    ///
    /// # Errors
    /// Returns an error if the name cannot be read.
    pub fn read(reader: &dyn RawMetadata, row: &ManifestResourceRaw) -> Result<Option<Self>> {
        if !row.implementation.is_null() {
            return Ok(None);
        }

        Ok(Some(EmbeddedResource {
            offset: row.offset,
            flags: ManifestResourceAttributes::from_bits_retain(row.flags),
            name: reader.string(row.name)?.to_string(),
        }))
    }

    /// True for publicly visible resources.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.flags.contains(ManifestResourceAttributes::PUBLIC)
    }
}

/// A compile-time constant.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConstantValue {
    /// No constant, or a constant that could not be decoded
    #[default]
    Bad,
    /// The null reference
    Null,
    /// `bool`
    Boolean(bool),
    /// `char`, a UTF-16 code unit
    Char(u16),
    /// `sbyte`
    SByte(i8),
    /// `short`
    Int16(i16),
    /// `int`
    Int32(i32),
    /// `long`
    Int64(i64),
    /// `byte`
    Byte(u8),
    /// `ushort`
    UInt16(u16),
    /// `uint`
    UInt32(u32),
    /// `ulong`
    UInt64(u64),
    /// `float`
    Single(f32),
    /// `double`
    Double(f64),
    /// `string`
    String(String),
    /// `decimal`, from `DecimalConstantAttribute`
    Decimal(Decimal),
    /// `DateTime` ticks, from `DateTimeConstantAttribute`
    DateTime(i64),
}

impl ConstantValue {
    /// Decode a `Constant` row.
    ///
    /// Unknown type codes, a `CLASS` constant whose value is not a 4-byte zero, and blobs too
    /// short for their type decode as [`ConstantValue::Bad`].
    ///
    /// # Errors
    /// Returns an error if the value blob cannot be read from the heap.
    pub fn read(reader: &dyn RawMetadata, constant: &ConstantRaw) -> Result<ConstantValue> {
        let blob = reader.blob(constant.value)?;
        Ok(Self::decode(constant.base, blob).unwrap_or(ConstantValue::Bad))
    }

    /// Decode a constant of element type `base` from `blob`.
    ///
    /// # Errors
    /// Returns an error if `blob` is too short for `base`.
    pub fn decode(base: u8, blob: &[u8]) -> Result<ConstantValue> {
        let mut parser = Parser::new(blob);

        Ok(match base {
            ELEMENT_TYPE::BOOLEAN => ConstantValue::Boolean(parser.read_le::<u8>()? != 0),
            ELEMENT_TYPE::CHAR => ConstantValue::Char(parser.read_le::<u16>()?),
            ELEMENT_TYPE::I1 => ConstantValue::SByte(parser.read_le::<i8>()?),
            ELEMENT_TYPE::U1 => ConstantValue::Byte(parser.read_le::<u8>()?),
            ELEMENT_TYPE::I2 => ConstantValue::Int16(parser.read_le::<i16>()?),
            ELEMENT_TYPE::U2 => ConstantValue::UInt16(parser.read_le::<u16>()?),
            ELEMENT_TYPE::I4 => ConstantValue::Int32(parser.read_le::<i32>()?),
            ELEMENT_TYPE::U4 => ConstantValue::UInt32(parser.read_le::<u32>()?),
            ELEMENT_TYPE::I8 => ConstantValue::Int64(parser.read_le::<i64>()?),
            ELEMENT_TYPE::U8 => ConstantValue::UInt64(parser.read_le::<u64>()?),
            ELEMENT_TYPE::R4 => ConstantValue::Single(parser.read_le::<f32>()?),
            ELEMENT_TYPE::R8 => ConstantValue::Double(parser.read_le::<f64>()?),
            ELEMENT_TYPE::STRING => ConstantValue::String(parser.read_utf16(blob.len())?),
            ELEMENT_TYPE::CLASS => {
                if parser.read_le::<u32>()? == 0 {
                    ConstantValue::Null
                } else {
                    ConstantValue::Bad
                }
            }
            _ => ConstantValue::Bad,
        })
    }

    /// True for [`ConstantValue::Bad`].
    #[must_use]
    pub fn is_bad(&self) -> bool {
        matches!(self, ConstantValue::Bad)
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Bad => write!(f, "<bad>"),
            ConstantValue::Null => write!(f, "null"),
            ConstantValue::Boolean(value) => write!(f, "{value}"),
            ConstantValue::Char(value) => write!(f, "'\\u{value:04x}'"),
            ConstantValue::SByte(value) => write!(f, "{value}"),
            ConstantValue::Int16(value) => write!(f, "{value}"),
            ConstantValue::Int32(value) => write!(f, "{value}"),
            ConstantValue::Int64(value) => write!(f, "{value}"),
            ConstantValue::Byte(value) => write!(f, "{value}"),
            ConstantValue::UInt16(value) => write!(f, "{value}"),
            ConstantValue::UInt32(value) => write!(f, "{value}"),
            ConstantValue::UInt64(value) => write!(f, "{value}"),
            ConstantValue::Single(value) => write!(f, "{value}"),
            ConstantValue::Double(value) => write!(f, "{value}"),
            ConstantValue::String(value) => write!(f, "{value:?}"),
            ConstantValue::Decimal(value) => write!(f, "{value}"),
            ConstantValue::DateTime(ticks) => write!(f, "#{ticks}#"),
        }
    }
}

/// The `UnmanagedType` in the first byte of a marshalling descriptor, or 0 if the descriptor is
/// empty or starts with a value above [`MAX_UNMANAGED_TYPE`].
#[must_use]
pub fn marshalling_type(descriptor: &[u8]) -> u8 {
    match descriptor.first() {
        Some(&native_type) if native_type <= MAX_UNMANAGED_TYPE => native_type,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{image::MetadataImageBuilder, tables::TableId, token::Token};

    #[test]
    fn constants() {
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::I4, &[0x2A, 0, 0, 0]).unwrap(),
            ConstantValue::Int32(42)
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::BOOLEAN, &[0x02]).unwrap(),
            ConstantValue::Boolean(true)
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::CHAR, &[0x41, 0x00]).unwrap(),
            ConstantValue::Char(0x41)
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::R8, &1.5f64.to_le_bytes()).unwrap(),
            ConstantValue::Double(1.5)
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::STRING, &[b'h', 0, b'i', 0]).unwrap(),
            ConstantValue::String("hi".to_string())
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::STRING, &[]).unwrap(),
            ConstantValue::String(String::new())
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::CLASS, &[0, 0, 0, 0]).unwrap(),
            ConstantValue::Null
        );
        assert!(ConstantValue::decode(ELEMENT_TYPE::CLASS, &[1, 0, 0, 0])
            .unwrap()
            .is_bad());
        assert!(ConstantValue::decode(ELEMENT_TYPE::OBJECT, &[0]).unwrap().is_bad());
        assert!(ConstantValue::decode(ELEMENT_TYPE::I8, &[1, 2, 3]).is_err());
    }

    #[test]
    fn constant_display() {
        assert_eq!(ConstantValue::Int32(-7).to_string(), "-7");
        assert_eq!(ConstantValue::String("a".to_string()).to_string(), "\"a\"");
        assert_eq!(ConstantValue::Null.to_string(), "null");
    }

    #[test]
    fn layouts() {
        let mut builder = MetadataImageBuilder::new();
        let auto = builder
            .add_type_def(TypeAttributes::PUBLIC, "N", "Auto", Token::default())
            .unwrap();
        let sequential = builder
            .add_type_def(
                TypeAttributes::PUBLIC | TypeAttributes::SEQUENTIAL_LAYOUT,
                "N",
                "Sequential",
                Token::default(),
            )
            .unwrap();
        let explicit = builder
            .add_type_def(
                TypeAttributes::PUBLIC | TypeAttributes::EXPLICIT_LAYOUT,
                "N",
                "Explicit",
                Token::default(),
            )
            .unwrap();
        let oversized = builder
            .add_type_def(
                TypeAttributes::PUBLIC | TypeAttributes::SEQUENTIAL_LAYOUT,
                "N",
                "Oversized",
                Token::default(),
            )
            .unwrap();
        builder.add_class_layout(explicit, 8, 32).unwrap();
        builder.add_class_layout(oversized, 0x1_00, 0x8000_0000).unwrap();
        let image = builder.build();
        assert_eq!(image.row_count(TableId::ClassLayout), 2);

        assert_eq!(TypeLayout::read(&image, auto.row()).unwrap(), TypeLayout::default());
        assert_eq!(
            TypeLayout::read(&image, sequential.row()).unwrap(),
            TypeLayout {
                kind: LayoutKind::Sequential,
                size: 0,
                packing: 0
            }
        );
        assert_eq!(
            TypeLayout::read(&image, explicit.row()).unwrap(),
            TypeLayout {
                kind: LayoutKind::Explicit,
                size: 32,
                packing: 8
            }
        );
        assert_eq!(
            TypeLayout::read(&image, oversized.row()).unwrap(),
            TypeLayout {
                kind: LayoutKind::Sequential,
                size: 0,
                packing: 0
            }
        );
        assert!(TypeLayout::read(&image, 99).is_err());
    }

    #[test]
    fn marshalling() {
        assert_eq!(marshalling_type(&[0x14]), 0x14);
        assert_eq!(marshalling_type(&[0x50, 0x01]), 0x50);
        assert_eq!(marshalling_type(&[0x51]), 0);
        assert_eq!(marshalling_type(&[]), 0);
    }

    #[test]
    fn pinvoke_flags() {
        let data = DllImportData {
            module_name: "user32.dll".to_string(),
            entry_point_name: "MessageBoxW".to_string(),
            flags: PInvokeAttributes::NO_MANGLE
                | PInvokeAttributes::CHAR_SET_UNICODE
                | PInvokeAttributes::SUPPORTS_LAST_ERROR
                | PInvokeAttributes::CALL_CONV_WINAPI,
        };
        assert!(data.exact_spelling());
        assert!(data.set_last_error());
        assert_eq!(data.char_set(), PInvokeAttributes::CHAR_SET_UNICODE);
        assert_eq!(data.calling_convention(), PInvokeAttributes::CALL_CONV_WINAPI);
    }
}
