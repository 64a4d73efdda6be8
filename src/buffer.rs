//! Adaptive-sizing output buffer for the encoder (§4.4).
use std::cell::Cell;

const EXTRA_MIN: usize = 64;
const ITEM_MIN: usize = 6;

thread_local! {
    static EXTRA_AVG: Cell<usize> = Cell::new(EXTRA_MIN);
    static ITEM_AVG: Cell<usize> = Cell::new(ITEM_MIN);
}

/// Update a rolling average with a biased blend toward the latest
/// observation, clamped to `min` and capped at doubling per step so a single
/// outlier can't blow the next allocation up unreasonably.
fn update_avg(cell: &Cell<usize>, observed: usize, min: usize) {
    let curr = cell.get();
    let capped = observed.min(curr.saturating_mul(2).max(min));
    let new = (2 * curr + capped) / 3;
    cell.set(new.max(min));
}

/// The growable buffer an [`crate::encoder`] writes into.
///
/// Sizing is informed by two thread-local rolling averages so repeated
/// encodes of similarly shaped values stop re-growing the `Vec` after a
/// handful of calls.
pub struct EncodeBuffer {
    buf: Vec<u8>,
}

impl EncodeBuffer {
    /// Allocate a buffer sized from the current thread's rolling averages.
    /// `container_len` is `Some(n)` for a top-level array/map of `n`
    /// elements, `None` for any other top-level value.
    pub fn new(container_len: Option<usize>) -> Self {
        let extra = EXTRA_AVG.with(Cell::get);
        let cap = match container_len {
            Some(n) => extra + n.saturating_mul(ITEM_AVG.with(Cell::get)),
            None => extra,
        };
        tracing::trace!(cap, container_len, "allocating encode buffer");
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    /// Ensure room for `needed` more bytes, growing `(used + needed) * 1.5`
    /// if the current capacity would be exceeded.
    pub fn reserve_for(&mut self, needed: usize) {
        let used = self.buf.len();
        if self.buf.capacity() - used >= needed {
            return;
        }
        let target = ((used + needed) as f64 * 1.5).ceil() as usize;
        tracing::trace!(used, needed, target, "encode buffer regrowth");
        self.buf.reserve(target - used);
    }

    pub fn push(&mut self, byte: u8) {
        self.reserve_for(1);
        self.buf.push(byte);
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.reserve_for(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.reserve_for(2);
        crate::scalar::write_u16(&mut self.buf, v);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.reserve_for(4);
        crate::scalar::write_u32(&mut self.buf, v);
    }

    pub fn write_u64(&mut self, v: u64) {
        self.reserve_for(8);
        crate::scalar::write_u64(&mut self.buf, v);
    }

    pub fn write_f64(&mut self, v: f64) {
        self.reserve_for(8);
        crate::scalar::write_f64(&mut self.buf, v);
    }

    pub fn as_vec_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the buffer, updating the thread-local averages from the
    /// final byte count and element count before returning the payload.
    pub fn finish(self, container_len: Option<usize>) -> Vec<u8> {
        EXTRA_AVG.with(|c| update_avg(c, self.buf.len(), EXTRA_MIN));
        if let Some(n) = container_len {
            if n > 0 {
                ITEM_AVG.with(|c| update_avg(c, self.buf.len() / n, ITEM_MIN));
            }
        }
        self.buf
    }
}
