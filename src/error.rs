//! Codec error types.
use std::fmt;
use std::path::PathBuf;

/// An `rmpk` result, normally returning an [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A codec error. Covers every way encode, decode, and file streaming can
/// fail.
#[derive(Debug)]
pub enum Error {
    /// Unknown lead byte, inconsistent length, or data ended before a value
    /// was complete.
    Format(String),
    /// A length field (string/bin/array/map/ext) exceeded `u32::MAX`.
    Size { max: u64, actual: u64 },
    /// An integer's magnitude exceeded the signed-64 or unsigned-64 range.
    Overflow,
    /// Encoder or decoder recursion exceeded the depth limit.
    Recursion { limit: usize },
    /// A value had no wire representation (no registered extension), or a
    /// strict-keys map held a non-`Str` key.
    Type(String),
    /// No decode callback registered for an ext tag, or an encode callback
    /// returned something other than bytes.
    Ext(String),
    /// A file handle failed to open, read, or write. Carries the path and,
    /// for writes, the byte offset the failure occurred at.
    Os {
        path: PathBuf,
        offset: Option<u64>,
        source: std::io::Error,
    },
    /// A short write's rollback (truncate) itself failed; both errors are
    /// preserved.
    RollbackFailed {
        path: PathBuf,
        write_error: Box<Error>,
        truncate_error: std::io::Error,
    },
    /// Allocation failure (surfaced rather than aborting, for callers who
    /// bound memory).
    Memory(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Format(msg) => write!(f, "malformed MessagePack data: {}", msg),
            Error::Size { max, actual } => {
                write!(f, "length {} exceeds maximum of {}", actual, max)
            }
            Error::Overflow => write!(f, "integer magnitude exceeds the 64-bit range"),
            Error::Recursion { limit } => {
                write!(f, "recursion limit of {} exceeded", limit)
            }
            Error::Type(msg) => write!(f, "type error: {}", msg),
            Error::Ext(msg) => write!(f, "extension error: {}", msg),
            Error::Os {
                path,
                offset,
                source,
            } => match offset {
                Some(offset) => write!(
                    f,
                    "I/O error on {} at offset {}: {}",
                    path.display(),
                    offset,
                    source
                ),
                None => write!(f, "I/O error on {}: {}", path.display(), source),
            },
            Error::RollbackFailed {
                path,
                write_error,
                truncate_error,
            } => write!(
                f,
                "write to {} failed ({}), and rollback truncate also failed: {}",
                path.display(),
                write_error,
                truncate_error
            ),
            Error::Memory(msg) => write!(f, "allocation failure: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Os { source, .. } => Some(source),
            Error::RollbackFailed { truncate_error, .. } => Some(truncate_error),
            _ => None,
        }
    }
}
