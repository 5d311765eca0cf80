//! Cursor decoders for the fixed arguments of well-known attributes.
//!
//! A custom attribute blob (ECMA-335 II.23.3) starts with the prolog `01 00` followed by the
//! constructor arguments in declaration order. The attributes the facade understands only use a
//! handful of argument shapes, each handled by one `crack_*` function here:
//!
//! - fixed width little-endian integers and booleans,
//! - `SerString`: a compressed length followed by UTF-8 bytes, or the single byte `0xFF` for a
//!   null string,
//! - boolean arrays: a 4 byte element count followed by one byte per element,
//! - the five field layout of `DecimalConstantAttribute`.
//!
//! Decoders never fail with an [`crate::Error`]. A value that cannot be decoded, for whatever
//! reason, is `None`. Whether a blob decodes is independent of whether its constructor matched a
//! catalogued signature.
//!
//! # Examples
//!
//! ```rust
//! use cilimport::metadata::attributes::{decode, AttributeValue, ValueKind};
//!
//! let blob = [0x01, 0x00, 0x05, b'h', b'e', b'l', b'l', b'o'];
//! assert_eq!(
//!     decode(ValueKind::String, &blob),
//!     Some(AttributeValue::String(Some("hello".to_string())))
//! );
//! ```

use tracing::debug;

use crate::{
    file::parser::Parser,
    metadata::{
        attributes::values::{Decimal, ObsoleteAttributeData, ObsoleteAttributeKind},
        reader::RawMetadata,
        tables::TableId,
        token::Token,
    },
};

/// Prolog every custom attribute blob starts with.
pub const ATTRIBUTE_PROLOG: u16 = 0x0001;

/// Marker byte encoding a null `SerString`.
pub const NULL_STRING_MARKER: u8 = 0xFF;

/// The argument shapes the facade extracts from attribute blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A single string argument
    String,
    /// A single `bool` argument
    Bool,
    /// A single `int16` argument
    Int16,
    /// A single `int32` argument
    Int32,
    /// A single `int64` argument
    Int64,
    /// A string followed by an `int32`
    StringAndInt,
    /// A `bool[]` argument
    BoolArray,
    /// The `(byte, byte, int, int, int)` layout of a decimal constant
    Decimal,
    /// `ObsoleteAttribute(string, bool)`
    Obsolete,
    /// `DeprecatedAttribute(string, DeprecationType, ...)`
    Deprecated,
}

/// A value decoded from an attribute blob.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A string, `None` for the null string
    String(Option<String>),
    /// A boolean
    Bool(bool),
    /// A 16-bit integer
    Int16(i16),
    /// A 32-bit integer
    Int32(i32),
    /// A 64-bit integer
    Int64(i64),
    /// A string and an integer
    StringAndInt(Option<String>, i32),
    /// A boolean array
    BoolArray(Vec<bool>),
    /// A decimal number
    Decimal(Decimal),
    /// Obsolete or deprecated marker data
    Obsolete(ObsoleteAttributeData),
}

/// Decode the first constructor argument(s) of `blob` as `kind`.
///
/// The blob must be longer than four bytes and start with the attribute prolog; anything else is
/// not decoded.
#[must_use]
pub fn decode(kind: ValueKind, blob: &[u8]) -> Option<AttributeValue> {
    // Prolog plus at least a minimal argument
    if blob.len() <= 4 {
        return None;
    }

    let mut parser = Parser::new(blob);
    if parser.read_le::<u16>().ok()? != ATTRIBUTE_PROLOG {
        return None;
    }

    match kind {
        ValueKind::String => crack_string(&mut parser).map(AttributeValue::String),
        ValueKind::Bool => crack_bool(&mut parser).map(AttributeValue::Bool),
        ValueKind::Int16 => crack_i16(&mut parser).map(AttributeValue::Int16),
        ValueKind::Int32 => crack_i32(&mut parser).map(AttributeValue::Int32),
        ValueKind::Int64 => crack_i64(&mut parser).map(AttributeValue::Int64),
        ValueKind::StringAndInt => crack_string_and_int(&mut parser)
            .map(|(value, number)| AttributeValue::StringAndInt(value, number)),
        ValueKind::BoolArray => crack_bool_array(&mut parser).map(AttributeValue::BoolArray),
        ValueKind::Decimal => crack_decimal(&mut parser).map(AttributeValue::Decimal),
        ValueKind::Obsolete => crack_obsolete(&mut parser).map(AttributeValue::Obsolete),
        ValueKind::Deprecated => crack_deprecated(&mut parser).map(AttributeValue::Obsolete),
    }
}

/// Decode the value blob of the `CustomAttribute` row `attribute` as `kind`.
///
/// A row or blob that cannot be read is not decoded.
pub fn decode_attribute(
    reader: &dyn RawMetadata,
    attribute: Token,
    kind: ValueKind,
) -> Option<AttributeValue> {
    if !attribute.is(TableId::CustomAttribute) {
        return None;
    }

    let blob = reader
        .custom_attribute(attribute.row())
        .and_then(|row| reader.blob(row.value));

    match blob {
        Ok(blob) => decode(kind, blob),
        Err(error) => {
            debug!(token = %attribute, %error, "attribute value not readable");
            None
        }
    }
}

/// Read a `SerString`. The outer `Option` is the decode result, the inner one distinguishes the
/// null string.
///
/// Trailing NUL characters are trimmed. If the length prefix cannot be read, or claims more bytes
/// than remain, the next byte is consumed and the result is a null string if that byte is
/// `0xFF`.
pub fn crack_string(parser: &mut Parser) -> Option<Option<String>> {
    if let Ok(length) = parser.transactional(|cursor| cursor.read_compressed_uint()) {
        if parser.remaining() >= length as usize {
            let bytes = parser.read_bytes(length as usize).ok()?;
            let value = String::from_utf8_lossy(bytes);
            return Some(Some(value.trim_end_matches('\0').to_string()));
        }
    }

    match parser.read_le::<u8>() {
        Ok(NULL_STRING_MARKER) => Some(None),
        _ => None,
    }
}

/// Read a one byte boolean, any non-zero value is true.
pub fn crack_bool(parser: &mut Parser) -> Option<bool> {
    parser.read_le::<u8>().ok().map(|value| value != 0)
}

/// Read a byte.
pub fn crack_byte(parser: &mut Parser) -> Option<u8> {
    parser.read_le::<u8>().ok()
}

/// Read a little-endian `int16`.
pub fn crack_i16(parser: &mut Parser) -> Option<i16> {
    parser.read_le::<i16>().ok()
}

/// Read a little-endian `int32`.
pub fn crack_i32(parser: &mut Parser) -> Option<i32> {
    parser.read_le::<i32>().ok()
}

/// Read a little-endian `int64`.
pub fn crack_i64(parser: &mut Parser) -> Option<i64> {
    parser.read_le::<i64>().ok()
}

/// Read a `SerString` followed by an `int32`.
pub fn crack_string_and_int(parser: &mut Parser) -> Option<(Option<String>, i32)> {
    let value = crack_string(parser)?;
    let number = crack_i32(parser)?;
    Some((value, number))
}

/// Read a `bool[]`: a 4 byte count followed by one byte per element, where only `1` is true.
pub fn crack_bool_array(parser: &mut Parser) -> Option<Vec<bool>> {
    let count = parser.read_le::<u32>().ok()? as usize;
    if parser.remaining() < count {
        return None;
    }

    let bytes = parser.read_bytes(count).ok()?;
    Some(bytes.iter().map(|&value| value == 1).collect())
}

/// Read the `(scale, sign, hi, mid, lo)` layout of `DecimalConstantAttribute`.
///
/// The two constructor overloads only differ in the signedness of the 32-bit parts, which does
/// not change their encoding. A scale above 28 does not decode.
#[allow(clippy::cast_sign_loss)]
pub fn crack_decimal(parser: &mut Parser) -> Option<Decimal> {
    let scale = crack_byte(parser)?;
    let sign = crack_byte(parser)?;
    let hi = crack_i32(parser)?;
    let mid = crack_i32(parser)?;
    let lo = crack_i32(parser)?;

    Decimal::new(lo as u32, mid as u32, hi as u32, sign != 0, scale)
}

/// Read `ObsoleteAttribute(string message, bool error)`.
pub fn crack_obsolete(parser: &mut Parser) -> Option<ObsoleteAttributeData> {
    let message = crack_string(parser)?;
    let is_error = crack_bool(parser)?;

    Some(ObsoleteAttributeData {
        kind: ObsoleteAttributeKind::Obsolete,
        message,
        is_error,
    })
}

/// Read the leading `(string message, DeprecationType type)` of a `DeprecatedAttribute`.
///
/// A deprecation type of `1` (Remove) is reported as an error.
pub fn crack_deprecated(parser: &mut Parser) -> Option<ObsoleteAttributeData> {
    let (message, deprecation_type) = crack_string_and_int(parser)?;

    Some(ObsoleteAttributeData {
        kind: ObsoleteAttributeKind::Deprecated,
        message,
        is_error: deprecation_type == 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_with_trailing_nuls() {
        let blob = [0x01, 0x00, 0x07, b'h', b'e', b'l', b'l', b'o', 0x00, 0x00];
        assert_eq!(
            decode(ValueKind::String, &blob),
            Some(AttributeValue::String(Some("hello".to_string())))
        );
    }

    #[test]
    fn null_string_marker() {
        let mut parser = Parser::new(&[0xFF]);
        assert_eq!(crack_string(&mut parser), Some(None));
        assert!(!parser.has_more_data());

        let blob = [0x01, 0x00, 0xFF, 0x00, 0x00];
        assert_eq!(
            decode(ValueKind::String, &blob),
            Some(AttributeValue::String(None))
        );
    }

    #[test]
    fn string_length_exceeds_data() {
        // Claims 9 bytes, only 2 follow; the next byte is not the null marker
        let mut parser = Parser::new(&[0x09, b'a', b'b']);
        assert_eq!(crack_string(&mut parser), None);

        // Claims 9 bytes, and the byte after the length happens to be 0xFF
        let mut parser = Parser::new(&[0x09, 0xFF]);
        assert_eq!(crack_string(&mut parser), Some(None));

        let mut parser = Parser::new(&[]);
        assert_eq!(crack_string(&mut parser), None);
    }

    #[test]
    fn string_invalid_utf8_is_replaced() {
        let mut parser = Parser::new(&[0x03, b'a', 0xC3, b'b']);
        assert_eq!(crack_string(&mut parser), Some(Some("a\u{FFFD}b".to_string())));
    }

    #[test]
    fn prolog_and_length_requirements() {
        assert_eq!(decode(ValueKind::Int16, &[0x01, 0x00, 0x01, 0x00]), None);
        assert_eq!(decode(ValueKind::Int16, &[]), None);
        assert_eq!(decode(ValueKind::Int32, &[0x02, 0x00, 0x01, 0x00, 0x00, 0x00]), None);
        assert_eq!(
            decode(ValueKind::Int32, &[0x01, 0x00, 0x2A, 0x00, 0x00, 0x00]),
            Some(AttributeValue::Int32(42))
        );
    }

    #[test]
    fn primitives() {
        assert_eq!(
            decode(ValueKind::Bool, &[0x01, 0x00, 0x02, 0x00, 0x00]),
            Some(AttributeValue::Bool(true))
        );
        assert_eq!(
            decode(ValueKind::Int16, &[0x01, 0x00, 0xFE, 0xFF, 0x00, 0x00]),
            Some(AttributeValue::Int16(-2))
        );

        #[rustfmt::skip]
        let ticks = [
            0x01, 0x00,
            0x00, 0x80, 0x3E, 0xD5, 0xDE, 0xB1, 0x9D, 0x01,
        ];
        assert_eq!(
            decode(ValueKind::Int64, &ticks),
            Some(AttributeValue::Int64(0x019D_B1DE_D53E_8000))
        );

        assert_eq!(decode(ValueKind::Int64, &[0x01, 0x00, 0x01, 0x02, 0x03]), None);
    }

    #[test]
    fn decimal_constant() {
        #[rustfmt::skip]
        let blob = [
            0x01, 0x00,
            0x02,                   // scale
            0x01,                   // sign
            0x00, 0x00, 0x00, 0x00, // hi
            0x00, 0x00, 0x00, 0x00, // mid
            0x39, 0x30, 0x00, 0x00, // lo = 12345
        ];

        let Some(AttributeValue::Decimal(value)) = decode(ValueKind::Decimal, &blob) else {
            panic!("decimal did not decode");
        };
        assert_eq!(value.to_string(), "-123.45");
        assert_eq!(value.mantissa(), 12345);

        let mut bad_scale = blob;
        bad_scale[2] = 29;
        assert_eq!(decode(ValueKind::Decimal, &bad_scale), None);

        assert_eq!(decode(ValueKind::Decimal, &blob[..10]), None);
    }

    #[test]
    fn bool_array() {
        #[rustfmt::skip]
        let blob = [
            0x01, 0x00,
            0x03, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x02,
        ];
        assert_eq!(
            decode(ValueKind::BoolArray, &blob),
            Some(AttributeValue::BoolArray(vec![true, false, false]))
        );

        // Count larger than the remaining data
        let truncated = [0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01];
        assert_eq!(decode(ValueKind::BoolArray, &truncated), None);

        let huge = [0x01, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert_eq!(decode(ValueKind::BoolArray, &huge), None);
    }

    #[test]
    fn obsolete_and_deprecated() {
        #[rustfmt::skip]
        let obsolete = [
            0x01, 0x00,
            0x03, b'o', b'l', b'd',
            0x01,
        ];
        assert_eq!(
            decode(ValueKind::Obsolete, &obsolete),
            Some(AttributeValue::Obsolete(ObsoleteAttributeData {
                kind: ObsoleteAttributeKind::Obsolete,
                message: Some("old".to_string()),
                is_error: true,
            }))
        );
        assert_eq!(decode(ValueKind::Obsolete, &obsolete[..6]), None);

        #[rustfmt::skip]
        let deprecated = [
            0x01, 0x00,
            0xFF,
            0x01, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x01, 0x00,
        ];
        assert_eq!(
            decode(ValueKind::Deprecated, &deprecated),
            Some(AttributeValue::Obsolete(ObsoleteAttributeData {
                kind: ObsoleteAttributeKind::Deprecated,
                message: None,
                is_error: true,
            }))
        );
    }

    #[test]
    fn string_and_int() {
        #[rustfmt::skip]
        let blob = [
            0x01, 0x00,
            0x0C, b'S', b'y', b's', b't', b'e', b'm', b'.', b'B', b'y', b't', b'e', 0x00,
            0x10, 0x00, 0x00, 0x00,
        ];
        assert_eq!(
            decode(ValueKind::StringAndInt, &blob),
            Some(AttributeValue::StringAndInt(
                Some("System.Byte".to_string()),
                16
            ))
        );
    }
}
