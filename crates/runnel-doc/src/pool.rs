// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reusable scratch buffers.
//!
//! [`BufferPool`] is an explicit, injectable pool: callers own an instance
//! (usually inside a `Collection`) and pass it to the calls that need scratch
//! space. A checked-out [`PooledBuffer`] is exclusively owned by its borrower
//! and goes back to the free list when dropped.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

use tracing::trace;

/// Default length of freshly allocated buffers.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Default number of idle buffers the pool keeps.
pub const DEFAULT_MAX_RETAINED: usize = 64;

/// Size to reallocate to after an attempt reported `needed` bytes.
///
/// Rounds up to the next power of two so pathological growth costs
/// O(log n) retries.
pub fn grow_to(needed: usize) -> usize {
    needed.checked_next_power_of_two().unwrap_or(needed)
}

/// Thread-safe free list of byte buffers.
///
/// Only acquire and release touch the lock; a buffer in use is never shared.
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    buffer_capacity: usize,
    max_retained: usize,
}

impl BufferPool {
    /// Create a pool with the default buffer size and retention bound.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_RETAINED)
    }

    /// Create a pool whose new buffers are `buffer_capacity` bytes long and
    /// which keeps at most `max_retained` idle buffers.
    pub fn with_limits(buffer_capacity: usize, max_retained: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            buffer_capacity: buffer_capacity.max(1),
            max_retained,
        }
    }

    /// Length of freshly allocated buffers.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Check out a buffer. Its length is at least
    /// [`buffer_capacity`](BufferPool::buffer_capacity); contents are
    /// unspecified.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let reused = self.free.lock().unwrap_or_else(|e| e.into_inner()).pop();
        let buf = reused.unwrap_or_else(|| {
            trace!(len = self.buffer_capacity, "allocating pooled buffer");
            vec![0; self.buffer_capacity]
        });
        PooledBuffer { buf, pool: self }
    }

    fn release(&self, buf: Vec<u8>) {
        let mut free = self.free.lock().unwrap_or_else(|e| e.into_inner());
        if free.len() < self.max_retained {
            free.push(buf);
        } else {
            trace!(len = buf.len(), "pool full; dropping buffer");
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A buffer checked out of a [`BufferPool`]. Returned to the pool on drop.
#[derive(Debug)]
pub struct PooledBuffer<'p> {
    buf: Vec<u8>,
    pool: &'p BufferPool,
}

impl PooledBuffer<'_> {
    /// Resize so that at least `needed` bytes fit, following [`grow_to`].
    /// Existing contents are discarded.
    pub fn grow(&mut self, needed: usize) {
        let len = grow_to(needed);
        self.buf.clear();
        self.buf.resize(len, 0);
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
