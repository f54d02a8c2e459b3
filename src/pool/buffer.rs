use crossbeam::queue::SegQueue;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::constants::builder::INITIAL_CAPACITY;

/// A reusable byte buffer for building one operation's wire representation
///
/// The builder automatically returns to its pool when dropped. A builder is
/// only retained if its capacity stayed within the pool's capacity cap and
/// the pool has not reached its retained-builder limit; otherwise the memory
/// is released on drop.
///
/// ## Usage
/// ```ignore
/// let mut builder = pool.rent(request_len);
/// builder.put_u8(0x80);
/// builder.extend_from_slice(key);
/// stream.write_all(&builder).await?;
/// ```
pub struct OperationBuilder {
    buf: Vec<u8>,
    shared: Arc<PoolShared>,
}

#[derive(Debug)]
struct PoolShared {
    retained: SegQueue<Vec<u8>>,
    retained_count: AtomicUsize,
    max_retained: usize,
    max_capacity: usize,
}

impl OperationBuilder {
    /// Get the current allocated capacity of the builder
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Clear the written bytes, keeping the allocation
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Ensure space for at least `additional` more bytes
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    /// Append a single byte
    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Append a big-endian u16
    #[inline]
    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Append a big-endian u32
    #[inline]
    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Append a big-endian u64
    #[inline]
    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Append raw bytes
    #[inline]
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Resize the written region, zero-filling new bytes
    ///
    /// Used on the read path: size the builder to the frame body length and
    /// then `read_exact` into the mutable slice.
    #[inline]
    pub fn resize(&mut self, new_len: usize, value: u8) {
        self.buf.resize(new_len, value);
    }
}

impl Deref for OperationBuilder {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for OperationBuilder {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl AsRef<[u8]> for OperationBuilder {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl Drop for OperationBuilder {
    fn drop(&mut self) {
        // Oversized builders are never retained; releasing them bounds peak
        // retained memory at max_capacity * max_retained.
        if self.buf.capacity() > self.shared.max_capacity {
            return;
        }

        // Atomically reserve a retained slot so the limit is never exceeded
        // under concurrent returns.
        let mut current = self.shared.retained_count.load(Ordering::Relaxed);
        while current < self.shared.max_retained {
            match self.shared.retained_count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    let buf = std::mem::take(&mut self.buf);
                    self.shared.retained.push(buf);
                    return;
                }
                Err(new_count) => current = new_count,
            }
        }
        // Pool is full, builder memory is released
    }
}

/// Lock-free pool of reusable operation builders
///
/// Renting never blocks: if no retained builder is available a fresh one is
/// allocated. Returning happens automatically when an `OperationBuilder` is
/// dropped, subject to the capacity and retention caps.
#[derive(Debug, Clone)]
pub struct OperationBuilderPool {
    shared: Arc<PoolShared>,
}

impl OperationBuilderPool {
    /// Create a new builder pool
    ///
    /// # Arguments
    /// * `max_capacity` - largest builder capacity that will be retained
    /// * `max_retained` - maximum number of builders kept for reuse
    #[must_use]
    pub fn new(max_capacity: usize, max_retained: usize) -> Self {
        debug!(
            max_capacity,
            max_retained, "Created operation builder pool"
        );
        Self {
            shared: Arc::new(PoolShared {
                retained: SegQueue::new(),
                retained_count: AtomicUsize::new(0),
                max_retained,
                max_capacity,
            }),
        }
    }

    /// Rent a builder with capacity for at least `size_hint` bytes
    ///
    /// Reuses a retained builder when one is available, growing it if its
    /// capacity is below the hint; otherwise allocates a fresh builder.
    pub fn rent(&self, size_hint: usize) -> OperationBuilder {
        let buf = if let Some(mut buf) = self.shared.retained.pop() {
            self.shared.retained_count.fetch_sub(1, Ordering::Relaxed);
            buf.clear();
            if buf.capacity() < size_hint {
                buf.reserve(size_hint);
            }
            buf
        } else {
            Vec::with_capacity(size_hint.max(INITIAL_CAPACITY))
        };

        OperationBuilder {
            buf,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Number of builders currently retained for reuse
    #[must_use]
    pub fn retained(&self) -> usize {
        self.shared.retained_count.load(Ordering::Relaxed)
    }

    /// The capacity cap above which builders are discarded instead of retained
    #[must_use]
    #[inline]
    pub fn max_capacity(&self) -> usize {
        self.shared.max_capacity
    }

    /// Maximum number of builders the pool will retain
    #[must_use]
    #[inline]
    pub fn max_retained(&self) -> usize {
        self.shared.max_retained
    }
}
