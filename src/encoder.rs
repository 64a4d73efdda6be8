//! Value -> wire-format encoder (§4.5).
use crate::buffer::EncodeBuffer;
use crate::error::{Error, Result};
use crate::ext::Registry;
use crate::integer::Integer;
use crate::marker::Marker;
use crate::value::Value;

/// Recursion bound shared with the decoder (§4.6, §5).
pub const MAX_DEPTH: usize = 1000;

/// Encoder-side settings: the extensions registry (unused directly by this
/// closed `Value` model, see [`crate::ext::Registry`]'s module docs, but
/// threaded through for symmetry with the decoder and for callers building
/// `Value::Ext` nodes via [`Registry::encode_any`]) and the strict-keys flag.
pub struct EncodeContext<'a> {
    pub registry: &'a Registry,
    pub strict_keys: bool,
}

/// Encode `value` to a fresh byte vector.
pub fn encode(value: &Value, ctx: &EncodeContext) -> Result<Vec<u8>> {
    let container_len = top_level_len(value);
    let mut buf = EncodeBuffer::new(container_len);
    encode_value(value, ctx, &mut buf, 0)?;
    Ok(buf.finish(container_len))
}

fn top_level_len(value: &Value) -> Option<usize> {
    match value {
        Value::Array(v) => Some(v.len()),
        Value::Map(v) => Some(v.len()),
        _ => None,
    }
}

fn check_depth(depth: usize) -> Result<usize> {
    if depth >= MAX_DEPTH {
        return Err(Error::Recursion { limit: MAX_DEPTH });
    }
    Ok(depth + 1)
}

/// Dispatch order mirrors §4.5's type-priority list exactly, even though
/// `Value`'s variants are mutually exclusive and a plain `match` would give
/// the same result in any order — this keeps the arms in the spec's
/// documented priority for anyone diffing against it.
fn encode_value(value: &Value, ctx: &EncodeContext, buf: &mut EncodeBuffer, depth: usize) -> Result<()> {
    match value {
        Value::Str(s) => encode_str(s, buf),
        Value::Int(n) => encode_int(*n, buf),
        Value::Float(f) => encode_float(*f, buf),
        Value::Map(pairs) => encode_map(pairs, ctx, buf, depth),
        Value::Bool(b) => {
            buf.push(if *b { Marker::True.into_u8() } else { Marker::False.into_u8() });
            Ok(())
        }
        Value::Array(items) => encode_array(items, ctx, buf, depth),
        Value::Nil => {
            buf.push(Marker::Nil.into_u8());
            Ok(())
        }
        Value::Bin(bytes) => encode_bin(bytes, buf),
        Value::Ext(tag, bytes) => encode_ext(*tag, bytes, buf),
    }
}

fn size_error(len: usize) -> Error {
    Error::Size { max: u32::MAX as u64, actual: len as u64 }
}

fn encode_str(s: &str, buf: &mut EncodeBuffer) -> Result<()> {
    let bytes = s.as_bytes();
    let len = bytes.len();
    if len <= 31 {
        buf.push(Marker::FixStr(len as u8).into_u8());
    } else if len <= u8::MAX as usize {
        buf.push(Marker::Str8.into_u8());
        buf.push(len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(Marker::Str16.into_u8());
        buf.write_u16(len as u16);
    } else if len <= u32::MAX as usize {
        buf.push(Marker::Str32.into_u8());
        buf.write_u32(len as u32);
    } else {
        return Err(size_error(len));
    }
    buf.extend_from_slice(bytes);
    Ok(())
}

fn encode_int(n: Integer, buf: &mut EncodeBuffer) -> Result<()> {
    if n.is_positive_repr() {
        let v = n.as_u64().expect("PosInt repr always fits u64");
        if v <= 0x7f {
            buf.push(Marker::PosFixInt(v as u8).into_u8());
        } else if v <= u8::MAX as u64 {
            buf.push(Marker::UInt8.into_u8());
            buf.push(v as u8);
        } else if v <= u16::MAX as u64 {
            buf.push(Marker::UInt16.into_u8());
            buf.write_u16(v as u16);
        } else if v <= u32::MAX as u64 {
            buf.push(Marker::UInt32.into_u8());
            buf.write_u32(v as u32);
        } else {
            buf.push(Marker::UInt64.into_u8());
            buf.write_u64(v);
        }
    } else {
        let v = n.as_i64().expect("NegInt repr always fits i64");
        if v >= -32 {
            buf.push(Marker::NegFixInt(v as i8).into_u8());
        } else if v >= i8::MIN as i64 {
            buf.push(Marker::Int8.into_u8());
            buf.push(v as i8 as u8);
        } else if v >= i16::MIN as i64 {
            buf.push(Marker::Int16.into_u8());
            buf.write_u16(v as i16 as u16);
        } else if v >= i32::MIN as i64 {
            buf.push(Marker::Int32.into_u8());
            buf.write_u32(v as i32 as u32);
        } else {
            buf.push(Marker::Int64.into_u8());
            buf.write_u64(v as u64);
        }
    }
    Ok(())
}

fn encode_float(f: f64, buf: &mut EncodeBuffer) -> Result<()> {
    buf.push(Marker::Float64.into_u8());
    buf.write_f64(f);
    Ok(())
}

fn encode_bin(bytes: &[u8], buf: &mut EncodeBuffer) -> Result<()> {
    let len = bytes.len();
    if len <= u8::MAX as usize {
        buf.push(Marker::Bin8.into_u8());
        buf.push(len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(Marker::Bin16.into_u8());
        buf.write_u16(len as u16);
    } else if len <= u32::MAX as usize {
        buf.push(Marker::Bin32.into_u8());
        buf.write_u32(len as u32);
    } else {
        return Err(size_error(len));
    }
    buf.extend_from_slice(bytes);
    Ok(())
}

fn encode_array(items: &[Value], ctx: &EncodeContext, buf: &mut EncodeBuffer, depth: usize) -> Result<()> {
    let depth = check_depth(depth)?;
    let len = items.len();
    if len <= 15 {
        buf.push(Marker::FixArray(len as u8).into_u8());
    } else if len <= u16::MAX as usize {
        buf.push(Marker::Array16.into_u8());
        buf.write_u16(len as u16);
    } else if len <= u32::MAX as usize {
        buf.push(Marker::Array32.into_u8());
        buf.write_u32(len as u32);
    } else {
        return Err(size_error(len));
    }
    for item in items {
        encode_value(item, ctx, buf, depth)?;
    }
    Ok(())
}

fn encode_map(pairs: &[(Value, Value)], ctx: &EncodeContext, buf: &mut EncodeBuffer, depth: usize) -> Result<()> {
    let depth = check_depth(depth)?;
    let len = pairs.len();
    if len <= 15 {
        buf.push(Marker::FixMap(len as u8).into_u8());
    } else if len <= u16::MAX as usize {
        buf.push(Marker::Map16.into_u8());
        buf.write_u16(len as u16);
    } else if len <= u32::MAX as usize {
        buf.push(Marker::Map32.into_u8());
        buf.write_u32(len as u32);
    } else {
        return Err(size_error(len));
    }
    for (key, value) in pairs {
        if ctx.strict_keys && !key.is_str() {
            return Err(Error::Type("strict-keys map requires Str keys".into()));
        }
        encode_value(key, ctx, buf, depth)?;
        encode_value(value, ctx, buf, depth)?;
    }
    Ok(())
}

fn encode_ext(tag: i8, bytes: &[u8], buf: &mut EncodeBuffer) -> Result<()> {
    let len = bytes.len();
    if len > u32::MAX as usize {
        return Err(size_error(len));
    }
    let mut header = Vec::new();
    Marker::write_ext_header(&mut header, len);
    buf.extend_from_slice(&header);
    buf.push(tag as u8);
    buf.extend_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(registry: &Registry) -> EncodeContext<'_> {
        EncodeContext { registry, strict_keys: false }
    }

    #[test]
    fn nil_bool_encode_to_single_byte() {
        let reg = Registry::new();
        assert_eq!(encode(&Value::Nil, &ctx(&reg)).unwrap(), vec![0xc0]);
        assert_eq!(encode(&Value::Bool(true), &ctx(&reg)).unwrap(), vec![0xc3]);
        assert_eq!(encode(&Value::Bool(false), &ctx(&reg)).unwrap(), vec![0xc2]);
    }

    #[test]
    fn small_ints_use_fixint_forms() {
        let reg = Registry::new();
        assert_eq!(encode(&Value::from(5i64), &ctx(&reg)).unwrap(), vec![0x05]);
        assert_eq!(encode(&Value::from(-1i64), &ctx(&reg)).unwrap(), vec![0xff]);
    }

    #[test]
    fn large_ints_pick_smallest_width() {
        let reg = Registry::new();
        let bytes = encode(&Value::from(300i64), &ctx(&reg)).unwrap();
        assert_eq!(bytes[0], Marker::UInt16.into_u8());
    }

    #[test]
    fn strings_pick_fixstr_for_short_values() {
        let reg = Registry::new();
        let bytes = encode(&Value::from("hi"), &ctx(&reg)).unwrap();
        assert_eq!(bytes, vec![0xa2, b'h', b'i']);
    }

    #[test]
    fn strict_keys_rejects_non_str_map_key() {
        let reg = Registry::new();
        let mut strict = ctx(&reg);
        strict.strict_keys = true;
        let map = Value::Map(vec![(Value::from(1i64), Value::from("x"))]);
        assert!(encode(&map, &strict).is_err());
    }

    #[test]
    fn deeply_nested_array_hits_recursion_limit() {
        let reg = Registry::new();
        let mut value = Value::Array(vec![]);
        for _ in 0..MAX_DEPTH + 1 {
            value = Value::Array(vec![value]);
        }
        assert!(matches!(encode(&value, &ctx(&reg)), Err(Error::Recursion { .. })));
    }

    #[test]
    fn deeply_nested_array_at_the_limit_succeeds() {
        let reg = Registry::new();
        let mut value = Value::Array(vec![]);
        for _ in 0..MAX_DEPTH - 1 {
            value = Value::Array(vec![value]);
        }
        assert!(encode(&value, &ctx(&reg)).is_ok());
    }

    #[test]
    fn literal_wire_bytes_match_the_spec_scenarios() {
        let reg = Registry::new();
        let c = ctx(&reg);
        assert_eq!(encode(&Value::from(0i64), &c).unwrap(), vec![0x00]);
        assert_eq!(encode(&Value::from(127i64), &c).unwrap(), vec![0x7f]);
        assert_eq!(encode(&Value::from(128i64), &c).unwrap(), vec![0xcc, 0x80]);
        assert_eq!(encode(&Value::from(-1i64), &c).unwrap(), vec![0xff]);
        assert_eq!(encode(&Value::from(-32i64), &c).unwrap(), vec![0xe0]);
        assert_eq!(encode(&Value::from(-33i64), &c).unwrap(), vec![0xd0, 0xdf]);
        assert_eq!(
            encode(&Value::from("Hello"), &c).unwrap(),
            vec![0xa5, 0x48, 0x65, 0x6c, 0x6c, 0x6f]
        );
        let arr = Value::Array(vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]);
        assert_eq!(encode(&arr, &c).unwrap(), vec![0x93, 0x01, 0x02, 0x03]);
        let map = Value::Map(vec![(Value::from("a"), Value::from(1i64))]);
        assert_eq!(encode(&map, &c).unwrap(), vec![0x81, 0xa1, 0x61, 0x01]);
        assert_eq!(
            encode(&Value::from(1.5f64), &c).unwrap(),
            vec![0xcb, 0x3f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn ext_fixed_and_small_forms_match_the_spec_scenarios() {
        let reg = Registry::new();
        let c = ctx(&reg);
        let fix2 = Value::Ext(7, vec![0xde, 0xad]);
        assert_eq!(encode(&fix2, &c).unwrap(), vec![0xd5, 0x07, 0xde, 0xad]);

        let small = Value::Ext(7, vec![0xde, 0xad, 0xbe]);
        assert_eq!(
            encode(&small, &c).unwrap(),
            vec![0xc7, 0x03, 0x07, 0xde, 0xad, 0xbe]
        );
    }

    #[test]
    fn uint64_max_succeeds_and_past_it_requires_a_wider_host_type() {
        let reg = Registry::new();
        let c = ctx(&reg);
        assert_eq!(
            encode(&Value::from(u64::MAX), &c).unwrap(),
            vec![0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
        // i64::MIN (-2^63) is the most negative value representable; it
        // round-trips as the widest signed form.
        assert_eq!(
            encode(&Value::from(i64::MIN), &c).unwrap()[0],
            Marker::Int64.into_u8()
        );
    }
}
