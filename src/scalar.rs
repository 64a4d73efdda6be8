//! Big-endian scalar I/O primitives (§4.2) shared by the encoder and decoder.
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

pub fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

pub fn write_u16(buf: &mut Vec<u8>, v: u16) {
    buf.write_u16::<BigEndian>(v).expect("Vec<u8> write is infallible");
}

pub fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.write_u32::<BigEndian>(v).expect("Vec<u8> write is infallible");
}

pub fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.write_u64::<BigEndian>(v).expect("Vec<u8> write is infallible");
}

pub fn write_f64(buf: &mut Vec<u8>, v: f64) {
    buf.write_f64::<BigEndian>(v).expect("Vec<u8> write is infallible");
}

fn truncated(step: &'static str) -> Error {
    Error::Format(format!("data ended early while reading {}", step))
}

pub fn read_u8(data: &mut &[u8]) -> Result<u8> {
    data.read_u8().map_err(|_| truncated("u8"))
}

pub fn read_i8(data: &mut &[u8]) -> Result<i8> {
    data.read_i8().map_err(|_| truncated("i8"))
}

pub fn read_u16(data: &mut &[u8]) -> Result<u16> {
    data.read_u16::<BigEndian>().map_err(|_| truncated("u16"))
}

pub fn read_i16(data: &mut &[u8]) -> Result<i16> {
    data.read_i16::<BigEndian>().map_err(|_| truncated("i16"))
}

pub fn read_u32(data: &mut &[u8]) -> Result<u32> {
    data.read_u32::<BigEndian>().map_err(|_| truncated("u32"))
}

pub fn read_i32(data: &mut &[u8]) -> Result<i32> {
    data.read_i32::<BigEndian>().map_err(|_| truncated("i32"))
}

pub fn read_u64(data: &mut &[u8]) -> Result<u64> {
    data.read_u64::<BigEndian>().map_err(|_| truncated("u64"))
}

pub fn read_i64(data: &mut &[u8]) -> Result<i64> {
    data.read_i64::<BigEndian>().map_err(|_| truncated("i64"))
}

pub fn read_f32(data: &mut &[u8]) -> Result<f32> {
    data.read_f32::<BigEndian>().map_err(|_| truncated("f32"))
}

pub fn read_f64(data: &mut &[u8]) -> Result<f64> {
    data.read_f64::<BigEndian>().map_err(|_| truncated("f64"))
}

/// Compare two short byte slices, widest chunk first. Used to accelerate
/// string-cache slot probes (§4.2): most cache misses differ in their first
/// few bytes, so comparing 8 bytes at a time bails out fast, falling back to
/// 4-byte and then byte-wise comparison for the remainder.
pub fn fast_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a;
    let mut b = b;
    while a.len() >= 8 {
        if a[..8] != b[..8] {
            return false;
        }
        a = &a[8..];
        b = &b[8..];
    }
    while a.len() >= 4 {
        if a[..4] != b[..4] {
            return false;
        }
        a = &a[4..];
        b = &b[4..];
    }
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_round_trip() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0xdead_beef);
        assert_eq!(buf, vec![0xde, 0xad, 0xbe, 0xef]);
        let mut slice = &buf[..];
        assert_eq!(read_u32(&mut slice).unwrap(), 0xdead_beef);
    }

    #[test]
    fn fast_eq_matches_naive() {
        let cases: &[(&[u8], &[u8], bool)] = &[
            (b"", b"", true),
            (b"abc", b"abc", true),
            (b"abc", b"abd", false),
            (b"abcdefgh", b"abcdefgh", true),
            (b"abcdefgh", b"abcdefgi", false),
            (b"abcdefghij", b"abcdefghij", true),
            (b"short", b"longer-slice", false),
        ];
        for (a, b, expect) in cases {
            assert_eq!(fast_eq(a, b), *expect, "{:?} vs {:?}", a, b);
        }
    }
}
