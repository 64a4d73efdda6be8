//! Wire-format -> Value decoder (§4.6).
use crate::cache::{IntCache, StringCache};
use crate::error::{Error, Result};
use crate::ext::{ExtBytes, Registry};
use crate::integer::Integer;
use crate::marker::Marker;
use crate::scalar;
use crate::value::Value;

pub use crate::encoder::MAX_DEPTH;

/// A source of bytes the decoder reads from and advances through.
///
/// This is what lets the same recursive decode logic serve both the
/// in-memory path (`&[u8]`, below) and the chunked file-stream path
/// (`crate::stream::FileStream`, which refills on overread per §4.8).
///
/// `fill` ensures `need` bytes are available from the current position,
/// refilling the underlying storage if necessary; `peek` then hands back a
/// slice over (at least) those bytes without moving the cursor, and
/// `advance` moves the cursor past bytes already consumed via `peek`.
/// Splitting "ensure available" from "read" from "consume" lets callers
/// hold a borrow from `peek` across a registry call (for zero-copy ext
/// decoding) and only release it by calling `advance` afterward.
pub trait ByteSource {
    fn fill(&mut self, need: usize) -> Result<()>;
    fn peek(&self, need: usize) -> &[u8];
    fn advance(&mut self, n: usize);
}

impl<'b> ByteSource for &'b [u8] {
    fn fill(&mut self, need: usize) -> Result<()> {
        if self.len() < need {
            Err(Error::Format(format!(
                "unexpected end of data: needed {} bytes, {} remain",
                need,
                self.len()
            )))
        } else {
            Ok(())
        }
    }

    fn peek(&self, need: usize) -> &[u8] {
        &self[..need]
    }

    fn advance(&mut self, n: usize) {
        *self = &self[n..];
    }
}

/// Decoder-side settings: the extensions registry, the strict-keys flag,
/// and the two decoded-value caches (§4.3).
pub struct DecodeContext<'a> {
    pub registry: &'a Registry,
    pub strict_keys: bool,
    pub strings: &'a StringCache,
    pub ints: &'a IntCache,
}

/// Decode exactly one value from `bytes`. Any bytes left over after the
/// value is read are an error (§4.6: "the remaining buffer must be empty").
pub fn decode(bytes: &[u8], ctx: &DecodeContext) -> Result<Value> {
    let mut source = bytes;
    let value = decode_value(&mut source, ctx, 0)?;
    if !source.is_empty() {
        return Err(Error::Format(format!(
            "{} trailing byte(s) after decoded value",
            source.len()
        )));
    }
    Ok(value)
}

/// Decode exactly one value from an arbitrary [`ByteSource`], leaving the
/// cursor positioned just past it. Used by the file stream, which decodes a
/// sequence of messages back to back rather than requiring an empty buffer.
pub fn decode_from<S: ByteSource>(source: &mut S, ctx: &DecodeContext) -> Result<Value> {
    decode_value(source, ctx, 0)
}

fn check_depth(depth: usize) -> Result<usize> {
    if depth >= MAX_DEPTH {
        return Err(Error::Recursion { limit: MAX_DEPTH });
    }
    Ok(depth + 1)
}

fn read_u8<S: ByteSource>(source: &mut S) -> Result<u8> {
    source.fill(1)?;
    let b = source.peek(1)[0];
    source.advance(1);
    Ok(b)
}

fn read_i8<S: ByteSource>(source: &mut S) -> Result<i8> {
    Ok(read_u8(source)? as i8)
}

fn read_u16<S: ByteSource>(source: &mut S) -> Result<u16> {
    source.fill(2)?;
    let v = {
        let mut c = source.peek(2);
        scalar::read_u16(&mut c)?
    };
    source.advance(2);
    Ok(v)
}

fn read_u32<S: ByteSource>(source: &mut S) -> Result<u32> {
    source.fill(4)?;
    let v = {
        let mut c = source.peek(4);
        scalar::read_u32(&mut c)?
    };
    source.advance(4);
    Ok(v)
}

fn read_u64<S: ByteSource>(source: &mut S) -> Result<u64> {
    source.fill(8)?;
    let v = {
        let mut c = source.peek(8);
        scalar::read_u64(&mut c)?
    };
    source.advance(8);
    Ok(v)
}

fn read_i16<S: ByteSource>(source: &mut S) -> Result<i16> {
    source.fill(2)?;
    let v = {
        let mut c = source.peek(2);
        scalar::read_i16(&mut c)?
    };
    source.advance(2);
    Ok(v)
}

fn read_i32<S: ByteSource>(source: &mut S) -> Result<i32> {
    source.fill(4)?;
    let v = {
        let mut c = source.peek(4);
        scalar::read_i32(&mut c)?
    };
    source.advance(4);
    Ok(v)
}

fn read_i64<S: ByteSource>(source: &mut S) -> Result<i64> {
    source.fill(8)?;
    let v = {
        let mut c = source.peek(8);
        scalar::read_i64(&mut c)?
    };
    source.advance(8);
    Ok(v)
}

fn take<S: ByteSource>(source: &mut S, n: usize) -> Result<Vec<u8>> {
    source.fill(n)?;
    let v = source.peek(n).to_vec();
    source.advance(n);
    Ok(v)
}

fn decode_value<S: ByteSource>(source: &mut S, ctx: &DecodeContext, depth: usize) -> Result<Value> {
    let lead = read_u8(source)?;
    match Marker::from_u8(lead) {
        Marker::PosFixInt(n) => Ok(int_value(n as i64, ctx)),
        Marker::NegFixInt(n) => Ok(int_value(n as i64, ctx)),
        Marker::FixStr(len) => decode_str(source, ctx, len as usize),
        Marker::FixArray(len) => decode_array(source, ctx, len as usize, depth),
        Marker::FixMap(len) => decode_map(source, ctx, len as usize, depth),
        Marker::Nil => Ok(Value::Nil),
        Marker::False => Ok(Value::Bool(false)),
        Marker::True => Ok(Value::Bool(true)),
        Marker::Reserved => Err(Error::Format("reserved lead byte 0xc1".into())),
        Marker::Bin8 => {
            let len = read_u8(source)? as usize;
            Ok(Value::Bin(take(source, len)?))
        }
        Marker::Bin16 => {
            let len = read_u16(source)? as usize;
            Ok(Value::Bin(take(source, len)?))
        }
        Marker::Bin32 => {
            let len = read_u32(source)? as usize;
            Ok(Value::Bin(take(source, len)?))
        }
        Marker::Str8 => {
            let len = read_u8(source)? as usize;
            decode_str(source, ctx, len)
        }
        Marker::Str16 => {
            let len = read_u16(source)? as usize;
            decode_str(source, ctx, len)
        }
        Marker::Str32 => {
            let len = read_u32(source)? as usize;
            decode_str(source, ctx, len)
        }
        Marker::Array16 => {
            let len = read_u16(source)? as usize;
            decode_array(source, ctx, len, depth)
        }
        Marker::Array32 => {
            let len = read_u32(source)? as usize;
            decode_array(source, ctx, len, depth)
        }
        Marker::Map16 => {
            let len = read_u16(source)? as usize;
            decode_map(source, ctx, len, depth)
        }
        Marker::Map32 => {
            let len = read_u32(source)? as usize;
            decode_map(source, ctx, len, depth)
        }
        Marker::Float32 => {
            source.fill(4)?;
            let v = {
                let mut c = source.peek(4);
                scalar::read_f32(&mut c)?
            };
            source.advance(4);
            Ok(Value::Float(v as f64))
        }
        Marker::Float64 => {
            source.fill(8)?;
            let v = {
                let mut c = source.peek(8);
                scalar::read_f64(&mut c)?
            };
            source.advance(8);
            Ok(Value::Float(v))
        }
        Marker::UInt8 => Ok(int_value(read_u8(source)? as i64, ctx)),
        Marker::UInt16 => Ok(int_value(read_u16(source)? as i64, ctx)),
        Marker::UInt32 => Ok(int_value(read_u32(source)? as i64, ctx)),
        Marker::UInt64 => {
            let n = read_u64(source)?;
            Ok(match i64::try_from(n).ok().and_then(|n| ctx.ints.get(n)) {
                Some(v) => v,
                None => Value::Int(Integer::from(n)),
            })
        }
        Marker::Int8 => Ok(int_value(read_i8(source)? as i64, ctx)),
        Marker::Int16 => Ok(int_value(read_i16(source)? as i64, ctx)),
        Marker::Int32 => Ok(int_value(read_i32(source)? as i64, ctx)),
        Marker::Int64 => Ok(int_value(read_i64(source)?, ctx)),
        Marker::FixExt1 => decode_ext(source, ctx, 1),
        Marker::FixExt2 => decode_ext(source, ctx, 2),
        Marker::FixExt4 => decode_ext(source, ctx, 4),
        Marker::FixExt8 => decode_ext(source, ctx, 8),
        Marker::FixExt16 => decode_ext(source, ctx, 16),
        Marker::Ext8 => {
            let len = read_u8(source)? as usize;
            decode_ext(source, ctx, len)
        }
        Marker::Ext16 => {
            let len = read_u16(source)? as usize;
            decode_ext(source, ctx, len)
        }
        Marker::Ext32 => {
            let len = read_u32(source)? as usize;
            decode_ext(source, ctx, len)
        }
    }
}

fn int_value(n: i64, ctx: &DecodeContext) -> Value {
    match ctx.ints.get(n) {
        Some(v) => v,
        None => Value::Int(Integer::from(n)),
    }
}

fn decode_str<S: ByteSource>(source: &mut S, ctx: &DecodeContext, len: usize) -> Result<Value> {
    source.fill(len)?;
    let s = ctx.strings.get_or_insert(source.peek(len))?;
    source.advance(len);
    Ok(Value::Str(s))
}

fn decode_array<S: ByteSource>(source: &mut S, ctx: &DecodeContext, len: usize, depth: usize) -> Result<Value> {
    let depth = check_depth(depth)?;
    let mut items = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        items.push(decode_value(source, ctx, depth)?);
    }
    Ok(Value::Array(items))
}

fn decode_map<S: ByteSource>(source: &mut S, ctx: &DecodeContext, len: usize, depth: usize) -> Result<Value> {
    let depth = check_depth(depth)?;
    let mut pairs = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        let key = decode_value(source, ctx, depth)?;
        if ctx.strict_keys && !key.is_str() {
            return Err(Error::Type("strict-keys map requires Str keys".into()));
        }
        let value = decode_value(source, ctx, depth)?;
        pairs.push((key, value));
    }
    Ok(Value::Map(pairs))
}

fn decode_ext<S: ByteSource>(source: &mut S, ctx: &DecodeContext, len: usize) -> Result<Value> {
    let tag = read_i8(source)?;
    source.fill(len)?;
    let value = if ctx.registry.pass_memoryview() {
        let bytes = source.peek(len);
        ctx.registry.decode(tag, ExtBytes::Borrowed(bytes))?
    } else {
        let bytes = source.peek(len).to_vec();
        ctx.registry.decode(tag, ExtBytes::Owned(bytes))?
    };
    source.advance(len);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode, EncodeContext};

    fn round_trip(value: &Value) -> Value {
        let registry = Registry::new();
        let strings = StringCache::with_default_size();
        let ints = IntCache::new();
        let bytes = encode(value, &EncodeContext { registry: &registry, strict_keys: false }).unwrap();
        decode(
            &bytes,
            &DecodeContext { registry: &registry, strict_keys: false, strings: &strings, ints: &ints },
        )
        .unwrap()
    }

    #[test]
    fn scalars_round_trip() {
        assert_eq!(round_trip(&Value::Nil), Value::Nil);
        assert_eq!(round_trip(&Value::Bool(true)), Value::Bool(true));
        assert_eq!(round_trip(&Value::from(42i64)), Value::from(42i64));
        assert_eq!(round_trip(&Value::from(-12345i64)), Value::from(-12345i64));
        assert_eq!(round_trip(&Value::from(3.25f64)), Value::from(3.25f64));
        assert_eq!(round_trip(&Value::from("hello")), Value::from("hello"));
        assert_eq!(round_trip(&Value::Bin(vec![1, 2, 3])), Value::Bin(vec![1, 2, 3]));
    }

    #[test]
    fn nested_containers_round_trip() {
        let v = Value::Map(vec![
            (Value::from("a"), Value::Array(vec![Value::from(1i64), Value::from(2i64)])),
            (Value::from("b"), Value::Nil),
        ]);
        assert_eq!(round_trip(&v), v);
    }

    #[test]
    fn trailing_bytes_are_an_error() {
        let registry = Registry::new();
        let strings = StringCache::with_default_size();
        let ints = IntCache::new();
        let ctx = DecodeContext { registry: &registry, strict_keys: false, strings: &strings, ints: &ints };
        let mut bytes = encode(&Value::Nil, &EncodeContext { registry: &registry, strict_keys: false }).unwrap();
        bytes.push(0xc0);
        assert!(decode(&bytes, &ctx).is_err());
    }

    #[test]
    fn truncated_input_is_an_error() {
        let registry = Registry::new();
        let strings = StringCache::with_default_size();
        let ints = IntCache::new();
        let ctx = DecodeContext { registry: &registry, strict_keys: false, strings: &strings, ints: &ints };
        assert!(decode(&[0xcc], &ctx).is_err());
    }

    #[test]
    fn strict_keys_rejects_non_str_map_key() {
        let registry = Registry::new();
        let strings = StringCache::with_default_size();
        let ints = IntCache::new();
        let strict = DecodeContext { registry: &registry, strict_keys: true, strings: &strings, ints: &ints };
        let bytes = encode(
            &Value::Map(vec![(Value::from(1i64), Value::from("x"))]),
            &EncodeContext { registry: &registry, strict_keys: false },
        )
        .unwrap();
        assert!(decode(&bytes, &strict).is_err());
    }

    #[test]
    fn small_ints_share_cached_allocation() {
        let registry = Registry::new();
        let strings = StringCache::with_default_size();
        let ints = IntCache::new();
        let ctx = DecodeContext { registry: &registry, strict_keys: false, strings: &strings, ints: &ints };
        let bytes = encode(&Value::from(5i64), &EncodeContext { registry: &registry, strict_keys: false }).unwrap();
        let a = decode(&bytes, &ctx).unwrap();
        let b = decode(&bytes, &ctx).unwrap();
        assert_eq!(a, b);
    }

    mod random_roundtrip {
        use super::*;
        use rand::prelude::*;

        /// Boundary sizes around each format's size-class cutoff, same
        /// spread the teacher's `element.rs` bin/str roundtrip tests use.
        fn boundary_sizes() -> Vec<usize> {
            let mut sizes = vec![0, 1, 30, 31, 32, 33];
            for i in 0..5 {
                sizes.push(u8::MAX as usize - 2 + i);
                sizes.push(u16::MAX as usize - 2 + i);
            }
            sizes
        }

        #[test]
        fn bin_round_trips_at_every_size_boundary() {
            let mut rng = thread_rng();
            for len in boundary_sizes() {
                let mut bytes = vec![0u8; len];
                rng.fill_bytes(&mut bytes);
                assert_eq!(round_trip(&Value::Bin(bytes.clone())), Value::Bin(bytes));
            }
        }

        #[test]
        fn str_round_trips_at_every_size_boundary() {
            let mut rng = thread_rng();
            for len in boundary_sizes() {
                let s: String = rand::distributions::Alphanumeric
                    .sample_iter(&mut rng)
                    .take(len)
                    .map(char::from)
                    .collect();
                assert_eq!(round_trip(&Value::from(s.as_str())), Value::from(s.as_str()));
            }
        }

        #[test]
        fn random_ints_round_trip_across_the_full_range() {
            let mut rng = thread_rng();
            for _ in 0..200 {
                let n: i64 = rng.gen();
                assert_eq!(round_trip(&Value::from(n)), Value::from(n));
            }
            for _ in 0..200 {
                let n: u64 = rng.gen();
                assert_eq!(round_trip(&Value::from(n)), Value::from(n));
            }
        }

        #[test]
        fn random_nested_value_trees_round_trip() {
            fn arbitrary(rng: &mut rand::rngs::ThreadRng, depth: u32) -> Value {
                if depth == 0 {
                    return Value::Nil;
                }
                match rng.gen_range(0..6) {
                    0 => Value::Nil,
                    1 => Value::Bool(rng.gen()),
                    2 => Value::from(rng.gen::<i64>()),
                    3 => Value::from(rng.gen::<f64>()),
                    4 => Value::Array((0..rng.gen_range(0..4)).map(|_| arbitrary(rng, depth - 1)).collect()),
                    _ => Value::Map(
                        (0..rng.gen_range(0..4))
                            .map(|i| (Value::from(format!("k{i}")), arbitrary(rng, depth - 1)))
                            .collect(),
                    ),
                }
            }

            let mut rng = thread_rng();
            for _ in 0..50 {
                let tree = arbitrary(&mut rng, 4);
                assert_eq!(round_trip(&tree), tree);
            }
        }
    }
}
