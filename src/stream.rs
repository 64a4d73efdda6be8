//! Reusable in-memory and file-backed streams (§4.8).
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cache::{IntCache, StringCache};
use crate::decoder::{self, ByteSource, DecodeContext};
use crate::encoder::{self, EncodeContext};
use crate::error::{Error, Result};
use crate::ext::Registry;
use crate::value::Value;

/// Default refill chunk size for [`FileDecodeSource`] (§4.8 offers 4096 or
/// 16384; this picks the smaller as a memory-conscious default).
pub const DEFAULT_CHUNK: usize = 4096;

/// An in-memory encode/decode context, reusable across many calls so the
/// registry and caches aren't rebuilt each time.
///
/// "A single stream instance is serialized by an internal flag under
/// shared-everything concurrency" (§4.8/§5): `busy` enforces that here, so
/// two threads can't drive the same `Stream` at once, matching the
/// single-instance-per-thread contract without requiring `&mut self` on
/// every call.
pub struct Stream {
    registry: Registry,
    strict_keys: bool,
    strings: StringCache,
    ints: IntCache,
    busy: AtomicBool,
}

impl Stream {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            strict_keys: false,
            strings: StringCache::with_default_size(),
            ints: IntCache::new(),
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_strict_keys(mut self, strict_keys: bool) -> Self {
        self.strict_keys = strict_keys;
        self
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    fn enter(&self) -> Result<()> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(Error::Format("stream is already in use on another thread".into()));
        }
        Ok(())
    }

    fn leave(&self) {
        self.busy.store(false, Ordering::Release);
    }

    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        self.enter()?;
        let result = encoder::encode(
            value,
            &EncodeContext { registry: &self.registry, strict_keys: self.strict_keys },
        );
        self.leave();
        result
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        self.enter()?;
        let result = decoder::decode(
            bytes,
            &DecodeContext {
                registry: &self.registry,
                strict_keys: self.strict_keys,
                strings: &self.strings,
                ints: &self.ints,
            },
        );
        self.leave();
        result
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

fn os_err(path: &Path, offset: Option<u64>, source: std::io::Error) -> Error {
    Error::Os { path: path.to_path_buf(), offset, source }
}

/// An append-only encode sink over a file (§4.8 encode side).
///
/// Opens the target in append mode with no intervening `BufWriter` — each
/// call builds the whole message in memory first, so there is nothing to
/// flush and no buffered-I/O layer to disable.
pub struct FileEncodeSink {
    file: File,
    path: PathBuf,
    offset: u64,
    needs_reopen: bool,
}

impl FileEncodeSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| os_err(&path, None, e))?;
        let offset = file.metadata().map_err(|e| os_err(&path, None, e))?.len();
        Ok(Self { file, path, offset, needs_reopen: false })
    }

    /// Encode `value` and append it to the file.
    pub fn encode(&mut self, value: &Value, ctx: &EncodeContext) -> Result<()> {
        self.reopen_if_needed()?;
        let bytes = encoder::encode(value, ctx)?;
        self.write_with_rollback(&bytes)
    }

    fn reopen_if_needed(&mut self) -> Result<()> {
        if !self.needs_reopen {
            return Ok(());
        }
        tracing::debug!(path = %self.path.display(), "reopening file encode sink");
        self.file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| os_err(&self.path, None, e))?;
        self.needs_reopen = false;
        Ok(())
    }

    fn write_with_rollback(&mut self, bytes: &[u8]) -> Result<()> {
        match self.file.write_all(bytes) {
            Ok(()) => {
                self.offset += bytes.len() as u64;
                Ok(())
            }
            Err(write_err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    offset = self.offset,
                    "short write to file stream, rolling back"
                );
                self.needs_reopen = true;
                let write_error = os_err(&self.path, Some(self.offset), write_err);
                match self.file.set_len(self.offset) {
                    Ok(()) => Err(write_error),
                    Err(truncate_error) => Err(Error::RollbackFailed {
                        path: self.path.clone(),
                        write_error: Box::new(write_error),
                        truncate_error,
                    }),
                }
            }
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// A chunked decode source over a file (§4.8 decode side): a bounded refill
/// buffer that grows only when a single value's header demands more than it
/// currently holds.
pub struct FileDecodeSource {
    file: File,
    path: PathBuf,
    buf: Vec<u8>,
    offset: usize,
    end: usize,
    read_offset: u64,
}

impl FileDecodeSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_chunk_size(path, DEFAULT_CHUNK)
    }

    pub fn with_chunk_size(path: impl AsRef<Path>, chunk: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| os_err(&path, None, e))?;
        Ok(Self {
            file,
            path,
            buf: vec![0u8; chunk.max(1)],
            offset: 0,
            end: 0,
            read_offset: 0,
        })
    }

    /// Decode the next value from the file, advancing past it.
    pub fn decode(&mut self, ctx: &DecodeContext) -> Result<Value> {
        decoder::decode_from(self, ctx)
    }

    /// Bytes remaining in the file that haven't been read into the buffer
    /// or consumed from it, a rough "anything left?" probe for callers
    /// decoding a sequence of messages until EOF.
    pub fn has_more(&mut self) -> Result<bool> {
        if self.end > self.offset {
            return Ok(true);
        }
        self.refill(1).map(|_| true).or_else(|_| Ok(false))
    }

    fn refill(&mut self, need: usize) -> Result<()> {
        let tail_len = self.end - self.offset;
        self.buf.copy_within(self.offset..self.end, 0);
        self.offset = 0;
        self.end = tail_len;

        if need > self.buf.len() {
            let new_cap = (need as f64 * 1.2).ceil() as usize;
            tracing::debug!(new_cap, need, "growing file-stream refill buffer");
            self.buf.resize(new_cap, 0);
        }

        self.file
            .seek(SeekFrom::Start(self.read_offset))
            .map_err(|e| os_err(&self.path, Some(self.read_offset), e))?;

        loop {
            let read = self
                .file
                .read(&mut self.buf[self.end..])
                .map_err(|e| os_err(&self.path, Some(self.read_offset), e))?;
            if read == 0 {
                break;
            }
            self.end += read;
            self.read_offset += read as u64;
            if self.end - self.offset >= need || self.end == self.buf.len() {
                break;
            }
        }

        if self.end - self.offset < need {
            return Err(Error::Format("unexpected end of file while decoding".into()));
        }
        Ok(())
    }
}

impl ByteSource for FileDecodeSource {
    fn fill(&mut self, need: usize) -> Result<()> {
        if self.end - self.offset >= need {
            return Ok(());
        }
        self.refill(need)
    }

    fn peek(&self, need: usize) -> &[u8] {
        &self.buf[self.offset..self.offset + need]
    }

    fn advance(&mut self, n: usize) {
        self.offset += n;
    }
}
