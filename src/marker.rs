//! MessagePack format markers. For internal use only.

/// MessagePack lead-byte markers, decomposed into their logical forms.
///
/// The size-carrying variants (`FixMap`, `FixArray`, `FixStr`, `PosFixInt`,
/// `NegFixInt`) already have their payload folded into the marker so callers
/// never have to re-mask the raw byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    PosFixInt(u8),
    FixMap(u8),
    FixArray(u8),
    FixStr(u8),
    Nil,
    Reserved,
    False,
    True,
    Bin8,
    Bin16,
    Bin32,
    Ext8,
    Ext16,
    Ext32,
    Float32,
    Float64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    FixExt1,
    FixExt2,
    FixExt4,
    FixExt8,
    FixExt16,
    Str8,
    Str16,
    Str32,
    Array16,
    Array32,
    Map16,
    Map32,
    NegFixInt(i8),
}

impl Marker {
    /// Construct a marker from a single lead byte.
    pub fn from_u8(n: u8) -> Marker {
        match n {
            0x00..=0x7f => Marker::PosFixInt(n),
            0x80..=0x8f => Marker::FixMap(n & 0x0f),
            0x90..=0x9f => Marker::FixArray(n & 0x0f),
            0xa0..=0xbf => Marker::FixStr(n & 0x1f),
            0xc0 => Marker::Nil,
            0xc1 => Marker::Reserved,
            0xc2 => Marker::False,
            0xc3 => Marker::True,
            0xc4 => Marker::Bin8,
            0xc5 => Marker::Bin16,
            0xc6 => Marker::Bin32,
            0xc7 => Marker::Ext8,
            0xc8 => Marker::Ext16,
            0xc9 => Marker::Ext32,
            0xca => Marker::Float32,
            0xcb => Marker::Float64,
            0xcc => Marker::UInt8,
            0xcd => Marker::UInt16,
            0xce => Marker::UInt32,
            0xcf => Marker::UInt64,
            0xd0 => Marker::Int8,
            0xd1 => Marker::Int16,
            0xd2 => Marker::Int32,
            0xd3 => Marker::Int64,
            0xd4 => Marker::FixExt1,
            0xd5 => Marker::FixExt2,
            0xd6 => Marker::FixExt4,
            0xd7 => Marker::FixExt8,
            0xd8 => Marker::FixExt16,
            0xd9 => Marker::Str8,
            0xda => Marker::Str16,
            0xdb => Marker::Str32,
            0xdc => Marker::Array16,
            0xdd => Marker::Array32,
            0xde => Marker::Map16,
            0xdf => Marker::Map32,
            0xe0..=0xff => Marker::NegFixInt(n as i8),
        }
    }

    /// Collapse a marker back down to its single-byte wire representation.
    /// Assumes any folded payload is already within range for its variant.
    pub fn into_u8(self) -> u8 {
        match self {
            Marker::PosFixInt(val) => val,
            Marker::FixMap(len) => 0x80 | len,
            Marker::FixArray(len) => 0x90 | len,
            Marker::FixStr(len) => 0xa0 | len,
            Marker::Nil => 0xc0,
            Marker::Reserved => 0xc1,
            Marker::False => 0xc2,
            Marker::True => 0xc3,
            Marker::Bin8 => 0xc4,
            Marker::Bin16 => 0xc5,
            Marker::Bin32 => 0xc6,
            Marker::Ext8 => 0xc7,
            Marker::Ext16 => 0xc8,
            Marker::Ext32 => 0xc9,
            Marker::Float32 => 0xca,
            Marker::Float64 => 0xcb,
            Marker::UInt8 => 0xcc,
            Marker::UInt16 => 0xcd,
            Marker::UInt32 => 0xce,
            Marker::UInt64 => 0xcf,
            Marker::Int8 => 0xd0,
            Marker::Int16 => 0xd1,
            Marker::Int32 => 0xd2,
            Marker::Int64 => 0xd3,
            Marker::FixExt1 => 0xd4,
            Marker::FixExt2 => 0xd5,
            Marker::FixExt4 => 0xd6,
            Marker::FixExt8 => 0xd7,
            Marker::FixExt16 => 0xd8,
            Marker::Str8 => 0xd9,
            Marker::Str16 => 0xda,
            Marker::Str32 => 0xdb,
            Marker::Array16 => 0xdc,
            Marker::Array32 => 0xdd,
            Marker::Map16 => 0xde,
            Marker::Map32 => 0xdf,
            Marker::NegFixInt(val) => val as u8,
        }
    }

    /// Write the ext header (marker + any length bytes) for a payload of
    /// `len` bytes, selecting the smallest form that fits per §4.1/§4.7.
    pub fn write_ext_header(buf: &mut Vec<u8>, len: usize) {
        use byteorder::{BigEndian, WriteBytesExt};
        match len {
            1 => buf.push(Marker::FixExt1.into_u8()),
            2 => buf.push(Marker::FixExt2.into_u8()),
            4 => buf.push(Marker::FixExt4.into_u8()),
            8 => buf.push(Marker::FixExt8.into_u8()),
            16 => buf.push(Marker::FixExt16.into_u8()),
            _ if len <= u8::MAX as usize => {
                buf.push(Marker::Ext8.into_u8());
                buf.push(len as u8);
            }
            _ if len <= u16::MAX as usize => {
                buf.push(Marker::Ext16.into_u8());
                buf.write_u16::<BigEndian>(len as u16).unwrap();
            }
            _ => {
                buf.push(Marker::Ext32.into_u8());
                buf.write_u32::<BigEndian>(len as u32).unwrap();
            }
        }
    }
}

impl From<u8> for Marker {
    fn from(val: u8) -> Marker {
        Marker::from_u8(val)
    }
}

impl From<Marker> for u8 {
    fn from(val: Marker) -> u8 {
        val.into_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_all_bytes() {
        for n in 0..=255u8 {
            let marker = Marker::from_u8(n);
            // Reserved (0xc1) and the negative-but-not-fixneg cases aside,
            // into_u8 must reproduce the original byte.
            assert_eq!(marker.into_u8(), n, "byte 0x{:02x} didn't round-trip", n);
        }
    }

    #[test]
    fn ext_header_picks_fixed_forms() {
        let mut buf = Vec::new();
        Marker::write_ext_header(&mut buf, 1);
        assert_eq!(buf, vec![Marker::FixExt1.into_u8()]);

        let mut buf = Vec::new();
        Marker::write_ext_header(&mut buf, 3);
        assert_eq!(buf, vec![Marker::Ext8.into_u8(), 3]);
    }
}
