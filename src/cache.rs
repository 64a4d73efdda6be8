//! Decoded-value caches (§4.3): a short-string intern cache and a small
//! integer cache. Both exist purely to cut allocation churn on repeated
//! decodes of the same map keys / small counters; disabling either must
//! never change the decoded value, only its provenance and timing.
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::integer::Integer;
use crate::value::{SharedStr, Value};

/// Strings longer than this never touch the cache; they're decoded straight
/// into a fresh `Arc<str>` (this is also the longest `FixStr` payload).
const MAX_CACHED_LEN: usize = 31;

/// Initial and floor match-strength for a freshly inserted slot.
const INITIAL_STRENGTH: u8 = 3;

fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

type Slot = Mutex<Option<(Arc<str>, u8)>>;

/// Fixed-size intern table for short strings (§4.3).
///
/// Each slot is addressed by `fnv1a(bytes) % slots.len()`; collisions are
/// resolved by match-strength displacement rather than chaining, so lookups
/// are always a single slot probe.
pub struct StringCache {
    slots: Vec<Slot>,
}

impl StringCache {
    /// Build a cache with `slots` entries, all empty.
    pub fn new(slots: usize) -> Self {
        let mut v = Vec::with_capacity(slots);
        v.resize_with(slots, || Mutex::new(None));
        Self { slots: v }
    }

    /// Default table size: generous enough that map-key-heavy payloads see
    /// few collisions without costing much idle memory.
    pub fn with_default_size() -> Self {
        Self::new(1024)
    }

    /// Decode `bytes` as UTF-8, consulting the cache for strings of at most
    /// [`MAX_CACHED_LEN`] bytes. A hit returns a clone of the cached `Arc`
    /// (no allocation); a miss allocates, and may displace the slot.
    pub fn get_or_insert(&self, bytes: &[u8]) -> Result<SharedStr> {
        if bytes.len() > MAX_CACHED_LEN {
            return Ok(Arc::from(std::str::from_utf8(bytes).map_err(invalid_utf8)?));
        }

        let idx = (fnv1a(bytes) as usize) % self.slots.len().max(1);
        let mut slot = self.slots[idx].lock().expect("string cache mutex poisoned");

        if let Some((cached, strength)) = slot.as_mut() {
            if crate::scalar::fast_eq(cached.as_bytes(), bytes) {
                *strength = strength.saturating_add(1);
                tracing::trace!(len = bytes.len(), "string cache hit");
                return Ok(cached.clone());
            }
        }

        let s: Arc<str> = Arc::from(std::str::from_utf8(bytes).map_err(invalid_utf8)?);
        let ascii = bytes.is_ascii();
        match slot.as_mut() {
            None => {
                *slot = Some((s.clone(), INITIAL_STRENGTH));
                tracing::trace!(len = bytes.len(), "string cache miss, slot empty");
            }
            Some((cached, strength)) if ascii => {
                *strength = strength.saturating_sub(1);
                if *strength == 0 {
                    tracing::trace!(len = bytes.len(), "string cache miss, slot displaced");
                    *cached = s.clone();
                    *strength = INITIAL_STRENGTH;
                } else {
                    tracing::trace!(len = bytes.len(), strength = *strength, "string cache miss, slot held");
                }
            }
            Some(_) => {
                // Non-ASCII miss: the spec's match-strength decay is
                // ASCII-only, so the incumbent keeps its strength untouched.
                tracing::trace!(len = bytes.len(), "string cache miss, non-ascii, slot held");
            }
        }

        Ok(s)
    }
}

fn invalid_utf8(e: std::str::Utf8Error) -> crate::error::Error {
    crate::error::Error::Format(format!("string payload is not valid UTF-8: {}", e))
}

/// Lower/upper bounds of the integer cache range (§4.3): every `PosFixInt`,
/// every `NegFixInt`, and the low end of the wider unsigned/signed forms.
const INT_CACHE_MIN: i64 = -128;
const INT_CACHE_MAX: i64 = 1023;

/// Dense, read-only-after-construction cache of small integer `Value`s.
pub struct IntCache {
    values: Vec<Value>,
}

impl IntCache {
    pub fn new() -> Self {
        let values = (INT_CACHE_MIN..=INT_CACHE_MAX)
            .map(|n| Value::Int(Integer::from(n)))
            .collect();
        Self { values }
    }

    /// Return a cached `Value::Int` for `n` if it falls in the cached range.
    pub fn get(&self, n: i64) -> Option<Value> {
        if (INT_CACHE_MIN..=INT_CACHE_MAX).contains(&n) {
            Some(self.values[(n - INT_CACHE_MIN) as usize].clone())
        } else {
            None
        }
    }
}

impl Default for IntCache {
    fn default() -> Self {
        Self::new()
    }
}
