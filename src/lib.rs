//! A MessagePack codec with an adaptive output buffer, a short-string and
//! small-integer decode cache, a user-extension-type registry, and
//! incremental file streaming.
//!
//! The core surface is [`encode`]/[`decode`] over [`Value`], the dynamically
//! typed tree every MessagePack message round-trips through. Callers who
//! encode/decode repeatedly on one thread should prefer a [`Stream`], which
//! reuses its registry and caches instead of going through the process-wide
//! defaults on every call. [`FileEncodeSink`]/[`FileDecodeSource`] do the
//! same for a file growing one message at a time.

mod api;
mod buffer;
mod cache;
mod decoder;
mod encoder;
mod error;
mod ext;
mod integer;
mod marker;
mod scalar;
mod stream;
mod value;

pub use api::{decode, decode_with, encode, encode_with};
pub use decoder::{decode_from, ByteSource, DecodeContext};
pub use encoder::{EncodeContext, MAX_DEPTH};
pub use error::{Error, Result};
pub use ext::{default_registry, ExtBytes, Registry};
pub use integer::Integer;
pub use stream::{FileDecodeSource, FileEncodeSink, Stream};
pub use value::{SharedStr, Value};

pub use cache::{IntCache, StringCache};
