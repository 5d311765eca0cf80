//! Little-endian primitive reads over byte slices.
//!
//! Every multi-byte quantity in ECMA-335 metadata (table columns, blob payloads, custom
//! attribute arguments, constant values) is stored little-endian. This module provides the
//! [`CilIO`] abstraction over the primitive types that can appear there, plus the two
//! bounds-checked entry points used throughout the crate:
//!
//! - [`read_le`] - read a value from the start of a buffer
//! - [`read_le_at`] - read a value at an offset and advance the offset past it
//!
//! Both return [`crate::Error::OutOfBounds`] instead of panicking when the buffer is too short.
//!
//! # Examples
//!
//! ```rust
//! use cilimport::file::io::read_le_at;
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//!
//! let first: u16 = read_le_at(&data, &mut offset)?;
//! let second: u16 = read_le_at(&data, &mut offset)?;
//! let third: u32 = read_le_at(&data, &mut offset)?;
//!
//! assert_eq!((first, second, third), (1, 2, 3));
//! assert_eq!(offset, 8);
//! # Ok::<(), cilimport::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Primitive types that can be decoded from a fixed number of little-endian bytes.
pub trait CilIO: Sized {
    /// The fixed-size byte representation of the type
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Decode the value from its little-endian byte representation
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_cil_io {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_cil_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Read a value of type `T` from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` holds fewer than `size_of::<T>()` bytes.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Read a value of type `T` at `offset` and advance `offset` past it.
///
/// On failure `offset` is left untouched.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would cross the end of `data`.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };

    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}
