//! User extension types (§4.7): encode dispatch keyed by Rust type, decode
//! dispatch keyed by the wire-level tag byte.
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::{Error, Result};
use crate::value::Value;

/// The bytes handed to a decode callback: either a fresh copy or a
/// zero-copy view over the decoder's current buffer, depending on the
/// registry's `pass_memoryview` setting.
pub enum ExtBytes<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a [u8]),
}

impl<'a> ExtBytes<'a> {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            ExtBytes::Owned(v) => v,
            ExtBytes::Borrowed(v) => v,
        }
    }

    pub fn into_owned(self) -> Vec<u8> {
        match self {
            ExtBytes::Owned(v) => v,
            ExtBytes::Borrowed(v) => v.to_vec(),
        }
    }
}

type EncodeFn = dyn Fn(&dyn Any) -> Result<Vec<u8>> + Send + Sync;
type DecodeFn = dyn for<'a> Fn(i8, ExtBytes<'a>) -> Result<Value> + Send + Sync;

/// Encode-by-type, decode-by-tag mapping for extension values (§4.7).
///
/// The same tag may be registered to several Rust types on the encode side
/// (each with its own callback); the decode side has exactly one callback
/// per tag, since the tag is all the wire format gives the decoder to work
/// with.
pub struct Registry {
    encode: HashMap<TypeId, (i8, Arc<EncodeFn>)>,
    decode: Vec<Option<Arc<DecodeFn>>>,
    pass_memoryview: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            encode: HashMap::new(),
            decode: vec![None; 256],
            pass_memoryview: false,
        }
    }

    /// When true, `decode` callbacks receive a [`ExtBytes::Borrowed`] view
    /// instead of an owned copy.
    pub fn set_pass_memoryview(&mut self, pass: bool) {
        self.pass_memoryview = pass;
    }

    pub fn pass_memoryview(&self) -> bool {
        self.pass_memoryview
    }

    /// Register an encode callback for `T`, tagged with `tag`.
    pub fn add_encode<T, F>(&mut self, tag: i8, f: F)
    where
        T: Any,
        F: Fn(&T) -> Vec<u8> + Send + Sync + 'static,
    {
        let wrapped = move |any: &dyn Any| -> Result<Vec<u8>> {
            let typed = any.downcast_ref::<T>().ok_or_else(|| {
                Error::Ext("extension encode callback received the wrong type".into())
            })?;
            Ok(f(typed))
        };
        self.encode.insert(TypeId::of::<T>(), (tag, Arc::new(wrapped)));
    }

    /// Register a decode callback for wire tag `tag`.
    pub fn add_decode<F>(&mut self, tag: i8, f: F)
    where
        F: for<'a> Fn(i8, ExtBytes<'a>) -> Result<Value> + Send + Sync + 'static,
    {
        self.decode[tag_index(tag)] = Some(Arc::new(f));
    }

    /// Remove the encode entry registered for `T`, if any. Never fails on
    /// an absent entry.
    pub fn remove_encode<T: Any>(&mut self) {
        self.encode.remove(&TypeId::of::<T>());
    }

    /// Remove the decode entry for `tag`, if any. Never fails on an absent
    /// entry.
    pub fn remove_decode(&mut self, tag: i8) {
        self.decode[tag_index(tag)] = None;
    }

    pub fn clear(&mut self) {
        self.encode.clear();
        self.decode.iter_mut().for_each(|slot| *slot = None);
    }

    /// Look up the encode callback for `T` and run it, returning the tag
    /// and payload bytes the caller should write as an ext value.
    pub fn encode_any<T: Any>(&self, value: &T) -> Result<(i8, Vec<u8>)> {
        let (tag, f) = self.encode.get(&TypeId::of::<T>()).ok_or_else(|| {
            Error::Type("no extension encode callback registered for this type".into())
        })?;
        Ok((*tag, f(value)?))
    }

    /// Convert an arbitrary registered type into the closed `Value::Ext`
    /// node the encoder knows how to write (§4.5 dispatch item 12:
    /// "anything else -> extensions").
    pub fn encode_any_as_value<T: Any>(&self, value: &T) -> Result<Value> {
        let (tag, bytes) = self.encode_any(value)?;
        Ok(Value::Ext(tag, bytes))
    }

    /// Run the decode callback registered for `tag`, if present.
    pub fn decode<'a>(&self, tag: i8, bytes: ExtBytes<'a>) -> Result<Value> {
        match &self.decode[tag_index(tag)] {
            Some(f) => {
                tracing::trace!(tag, "extension decode callback invoked");
                f(tag, bytes)
            }
            None => Err(Error::Ext(format!("no decoder registered for ext tag {}", tag))),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn tag_index(tag: i8) -> usize {
    (tag as i16 + 128) as usize
}

/// The process-wide default registry, used whenever a caller doesn't supply
/// its own (§4.7: "a global default registry exists per process").
pub fn default_registry() -> &'static Mutex<Registry> {
    static DEFAULT: OnceLock<Mutex<Registry>> = OnceLock::new();
    DEFAULT.get_or_init(|| Mutex::new(Registry::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let mut reg = Registry::new();
        reg.add_encode::<Point, _>(5, |p: &Point| {
            let mut v = Vec::new();
            v.extend_from_slice(&p.x.to_be_bytes());
            v.extend_from_slice(&p.y.to_be_bytes());
            v
        });
        reg.add_decode(5, |_tag, bytes| {
            let b = bytes.as_slice();
            let x = i32::from_be_bytes(b[0..4].try_into().unwrap());
            let y = i32::from_be_bytes(b[4..8].try_into().unwrap());
            Ok(Value::Array(vec![Value::from(x as i64), Value::from(y as i64)]))
        });

        let p = Point { x: 3, y: -7 };
        let (tag, bytes) = reg.encode_any(&p).unwrap();
        assert_eq!(tag, 5);
        let decoded = reg.decode(tag, ExtBytes::Owned(bytes)).unwrap();
        assert_eq!(decoded, Value::Array(vec![Value::from(3i64), Value::from(-7i64)]));
    }

    #[test]
    fn missing_decode_slot_fails() {
        let reg = Registry::new();
        assert!(reg.decode(9, ExtBytes::Owned(vec![])).is_err());
    }

    #[test]
    fn missing_encode_type_fails() {
        let reg = Registry::new();
        assert!(reg.encode_any(&Point { x: 0, y: 0 }).is_err());
    }

    #[test]
    fn remove_is_idempotent_on_absent_entries() {
        let mut reg = Registry::new();
        reg.remove_decode(-10);
        reg.remove_encode::<Point>();
    }

    #[test]
    fn tag_index_covers_full_i8_range() {
        assert_eq!(tag_index(-128), 0);
        assert_eq!(tag_index(127), 255);
    }
}
