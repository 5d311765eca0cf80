//! Typed payloads decoded from well-known attribute blobs.

use std::fmt;

use bitflags::bitflags;
use strum::FromRepr;

/// Largest scale a decimal value can carry.
pub const DECIMAL_MAX_SCALE: u8 = 28;

/// A 96-bit decimal number as stored by `DecimalConstantAttribute`.
///
/// The value is `(-1)^negative * (hi:mid:lo) / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    lo: u32,
    mid: u32,
    hi: u32,
    scale: u8,
    negative: bool,
}

impl Decimal {
    /// Assemble a decimal from its parts. Returns `None` if `scale` exceeds
    /// [`DECIMAL_MAX_SCALE`].
    #[must_use]
    pub fn new(lo: u32, mid: u32, hi: u32, negative: bool, scale: u8) -> Option<Self> {
        if scale > DECIMAL_MAX_SCALE {
            return None;
        }

        Some(Decimal {
            lo,
            mid,
            hi,
            scale,
            negative,
        })
    }

    /// The unsigned 96-bit mantissa.
    #[must_use]
    pub fn mantissa(&self) -> u128 {
        (u128::from(self.hi) << 64) | (u128::from(self.mid) << 32) | u128::from(self.lo)
    }

    /// Number of digits after the decimal point.
    #[must_use]
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// True if the sign bit is set.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Lossy conversion to a floating point value.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> f64 {
        let magnitude = self.mantissa() as f64 / 10f64.powi(i32::from(self.scale));
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mantissa = self.mantissa();
        let digits = mantissa.to_string();
        let scale = usize::from(self.scale);

        if self.negative && mantissa != 0 {
            write!(f, "-")?;
        }

        if scale == 0 {
            return write!(f, "{digits}");
        }

        if digits.len() > scale {
            let (integral, fraction) = digits.split_at(digits.len() - scale);
            write!(f, "{integral}.{fraction}")
        } else {
            write!(f, "0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    }
}

/// Which attribute an [`ObsoleteAttributeData`] was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObsoleteAttributeKind {
    /// `System.ObsoleteAttribute`
    Obsolete,
    /// `Windows.Foundation.Metadata.DeprecatedAttribute`
    Deprecated,
}

/// Decoded payload of an obsolete or deprecated marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsoleteAttributeData {
    /// Attribute the data came from
    pub kind: ObsoleteAttributeKind,
    /// Diagnostic message, `None` when absent or encoded as a null string
    pub message: Option<String>,
    /// Whether using the entity is an error rather than a warning
    pub is_error: bool,
}

impl ObsoleteAttributeData {
    /// Data for an `ObsoleteAttribute` without arguments.
    #[must_use]
    pub fn without_message(kind: ObsoleteAttributeKind) -> Self {
        ObsoleteAttributeData {
            kind,
            message: None,
            is_error: false,
        }
    }
}

/// COM interface kinds accepted by `InterfaceTypeAttribute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum ComInterfaceType {
    /// Dual interface, exposed to both early and late binding
    InterfaceIsDual = 0,
    /// `IUnknown` derived interface
    InterfaceIsIUnknown = 1,
    /// Dispatch-only interface
    InterfaceIsIDispatch = 2,
    /// Windows Runtime `IInspectable` interface
    InterfaceIsIInspectable = 3,
}

impl ComInterfaceType {
    /// Map a decoded attribute argument to an interface kind, rejecting values outside `0..=3`.
    #[must_use]
    pub fn from_value(value: i32) -> Option<Self> {
        u8::try_from(value).ok().and_then(Self::from_repr)
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// Flags carried by `TypeLibTypeAttribute`
    pub struct TypeLibTypeFlags: u32 {
        /// The type is an application object
        const APP_OBJECT = 0x0001;
        /// Instances of the type can be created
        const CAN_CREATE = 0x0002;
        /// The type is licensed
        const LICENSED = 0x0004;
        /// The type is predefined
        const PRE_DECL_ID = 0x0008;
        /// The type should not be displayed to browsers
        const HIDDEN = 0x0010;
        /// The type is a control
        const CONTROL = 0x0020;
        /// The interface supplies both `IDispatch` and V-table binding
        const DUAL = 0x0040;
        /// The interface cannot add members at run time
        const NON_EXTENSIBLE = 0x0080;
        /// Types used in the interface are automation compatible
        const OLE_AUTOMATION = 0x0100;
        /// Use of the type is restricted
        const RESTRICTED = 0x0200;
        /// The type is aggregatable
        const AGGREGATABLE = 0x0400;
        /// The object supports `IConnectionPointWithDefault`
        const REPLACEABLE = 0x0800;
        /// The interface derives from `IDispatch`
        const DISPATCHABLE = 0x1000;
        /// The interface should not be used for reverse binding
        const REVERSE_BIND = 0x2000;
    }
}
