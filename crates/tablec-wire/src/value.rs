//! Value encoding.
//!
//! Every keyed field carries a one-byte [`FieldTag`] that is enough to skip
//! its payload without knowing the field: the low four bits are the element
//! width (1, 2, 4 or 8 bytes, or 0 for a `u32`-length-prefixed blob) and the
//! top bit marks a `u16`-count-prefixed array.

use crate::error::WireError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    /// Fixed number of bytes per value.
    Fixed(u8),
    /// `u32` byte length followed by the bytes.
    Blob,
}

impl WireKind {
    fn width_code(self) -> u8 {
        match self {
            WireKind::Fixed(width) => width,
            WireKind::Blob => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTag {
    pub kind: WireKind,
    pub array: bool,
}

impl FieldTag {
    const ARRAY_BIT: u8 = 0x80;
    const WIDTH_MASK: u8 = 0x0f;

    pub fn scalar(kind: WireKind) -> Self {
        FieldTag { kind, array: false }
    }

    pub fn array(kind: WireKind) -> Self {
        FieldTag { kind, array: true }
    }

    pub fn to_byte(self) -> u8 {
        let array = if self.array { Self::ARRAY_BIT } else { 0 };
        array | self.kind.width_code()
    }

    pub fn from_byte(byte: u8) -> Result<Self, WireError> {
        if byte & !(Self::ARRAY_BIT | Self::WIDTH_MASK) != 0 {
            return Err(WireError::InvalidTag(byte));
        }
        let kind = match byte & Self::WIDTH_MASK {
            0 => WireKind::Blob,
            w @ (1 | 2 | 4 | 8) => WireKind::Fixed(w),
            _ => return Err(WireError::InvalidTag(byte)),
        };
        Ok(FieldTag {
            kind,
            array: byte & Self::ARRAY_BIT != 0,
        })
    }
}

/// A type that can be stored in a save stream.
///
/// Implemented here for the scalar types the schema language knows about.
/// External types referenced from a schema implement it themselves; a
/// `Fixed(n)` implementation must always encode exactly `n` bytes.
pub trait WireValue: Sized {
    const KIND: WireKind;

    fn encode(&self, out: &mut Vec<u8>);

    fn decode(bytes: &[u8]) -> Result<Self, WireError>;
}

macro_rules! fixed_wire_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WireValue for $ty {
                const KIND: WireKind = WireKind::Fixed(std::mem::size_of::<$ty>() as u8);

                fn encode(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Result<Self, WireError> {
                    let raw: [u8; std::mem::size_of::<$ty>()] =
                        bytes.try_into().map_err(|_| WireError::Length {
                            expected: std::mem::size_of::<$ty>(),
                            actual: bytes.len(),
                        })?;
                    Ok(<$ty>::from_le_bytes(raw))
                }
            }
        )*
    };
}

fixed_wire_value!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl WireValue for bool {
    const KIND: WireKind = WireKind::Fixed(1);

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }

    fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        match bytes {
            [b] => Ok(*b != 0),
            _ => Err(WireError::Length {
                expected: 1,
                actual: bytes.len(),
            }),
        }
    }
}

impl WireValue for String {
    const KIND: WireKind = WireKind::Blob;

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }

    fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8)
    }
}
