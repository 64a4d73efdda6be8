//! The crate's top-level `encode`/`decode` entry points (§6).
use std::sync::OnceLock;

use crate::cache::{IntCache, StringCache};
use crate::decoder::{self, DecodeContext};
use crate::encoder::{self, EncodeContext};
use crate::error::Result;
use crate::ext::{default_registry, Registry};
use crate::value::Value;

fn default_caches() -> &'static (StringCache, IntCache) {
    static CACHES: OnceLock<(StringCache, IntCache)> = OnceLock::new();
    CACHES.get_or_init(|| (StringCache::with_default_size(), IntCache::new()))
}

/// Encode `value` using the process-wide default registry and
/// non-strict map keys.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let registry = default_registry().lock().expect("default registry mutex poisoned");
    encode_with(value, &registry, false)
}

/// Encode `value` against an explicit registry and strict-keys setting.
pub fn encode_with(value: &Value, registry: &Registry, strict_keys: bool) -> Result<Vec<u8>> {
    encoder::encode(value, &EncodeContext { registry, strict_keys })
}

/// Decode one value from `bytes` using the process-wide default registry,
/// the shared default caches, and non-strict map keys.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let registry = default_registry().lock().expect("default registry mutex poisoned");
    let (strings, ints) = default_caches();
    decode_with(bytes, &registry, false, strings, ints)
}

/// Decode one value from `bytes` against an explicit registry,
/// strict-keys setting, and cache pair.
pub fn decode_with(
    bytes: &[u8],
    registry: &Registry,
    strict_keys: bool,
    strings: &StringCache,
    ints: &IntCache,
) -> Result<Value> {
    decoder::decode(bytes, &DecodeContext { registry, strict_keys, strings, ints })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_entry_points_round_trip() {
        let bytes = encode(&Value::from(123i64)).unwrap();
        assert_eq!(decode(&bytes).unwrap(), Value::from(123i64));
    }

    #[test]
    fn explicit_registry_round_trips() {
        let registry = Registry::new();
        let strings = StringCache::with_default_size();
        let ints = IntCache::new();
        let value = Value::from("round trip");
        let bytes = encode_with(&value, &registry, false).unwrap();
        assert_eq!(decode_with(&bytes, &registry, false, &strings, &ints).unwrap(), value);
    }
}
