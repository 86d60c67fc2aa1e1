//! Work buffer allocation strategies.
//!
//! Digesting and comparing both stream file content through a scratch
//! buffer. Where that buffer comes from is decided by a [`BufferPool`]:
//!
//! - [`SingleBufferPool`]: one shared buffer, lent out to one caller at a time.
//!   It is deliberately not `Sync`, so it cannot reach concurrent code.
//! - [`HeapPool`]: a fresh, fallibly allocated buffer per acquisition.
//! - [`RecyclingPool`]: a thread-safe free list that keeps released buffers
//!   for reuse, bounded by a retention limit.
//!
//! Buffers are always handed out through a [`ScratchBuffer`] guard, which
//! returns them to their pool when dropped, on success and failure alike.
//!
//! # Capacity
//!
//! A pool may hand out less than was requested. The length of the buffer
//! it returns is its actual capacity, and callers size their reads by it.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

/// Capacity of the buffer owned by [`SingleBufferPool::default`].
pub const DEFAULT_SHARED_CAPACITY: usize = 32 * 1024;

/// Number of buffers a [`RecyclingPool`] keeps by default.
pub const DEFAULT_RETAINED_BUFFERS: usize = 64;

/// Source of scratch buffers.
pub trait BufferPool {
    /// Obtain a buffer of up to `capacity` bytes.
    ///
    /// The returned buffer's length is its usable capacity. `None` means no
    /// buffer could be provided.
    fn acquire(&self, capacity: usize) -> Option<Vec<u8>>;

    /// Give a buffer obtained from [`acquire`](Self::acquire) back to the pool.
    fn release(&self, buffer: Vec<u8>);
}

impl<P: BufferPool + ?Sized> BufferPool for &P {
    fn acquire(&self, capacity: usize) -> Option<Vec<u8>> {
        (**self).acquire(capacity)
    }

    fn release(&self, buffer: Vec<u8>) {
        (**self).release(buffer);
    }
}

/// A buffer on loan from a [`BufferPool`].
///
/// Dereferences to the buffer bytes and returns them to the pool on drop.
pub struct ScratchBuffer<'p, P: BufferPool + ?Sized> {
    pool: &'p P,
    buffer: Option<Vec<u8>>,
}

impl<'p, P: BufferPool + ?Sized> ScratchBuffer<'p, P> {
    /// Borrow a buffer of up to `capacity` bytes from `pool`.
    ///
    /// Returns `None` if the pool has nothing to lend or lends an empty buffer.
    #[must_use]
    pub fn acquire(pool: &'p P, capacity: usize) -> Option<Self> {
        let buffer = pool.acquire(capacity)?;
        let guard = Self {
            pool,
            buffer: Some(buffer),
        };
        if guard.capacity() == 0 {
            // Dropping the guard hands the empty buffer back.
            return None;
        }
        Some(guard)
    }

    /// Usable capacity of the borrowed buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().map_or(0, Vec::len)
    }
}

impl<P: BufferPool + ?Sized> Deref for ScratchBuffer<'_, P> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buffer.as_deref().unwrap_or_default()
    }
}

impl<P: BufferPool + ?Sized> DerefMut for ScratchBuffer<'_, P> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buffer.as_deref_mut().unwrap_or_default()
    }
}

impl<P: BufferPool + ?Sized> Drop for ScratchBuffer<'_, P> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.release(buffer);
        }
    }
}

/// One shared buffer of fixed size, for single-threaded use only.
///
/// The requested capacity is ignored: every caller gets the same buffer.
/// While it is on loan, further acquisitions fail.
#[derive(Debug)]
pub struct SingleBufferPool {
    slot: RefCell<Option<Vec<u8>>>,
}

impl SingleBufferPool {
    /// Create a pool owning one buffer of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slot: RefCell::new(Some(vec![0; capacity])),
        }
    }

    /// Whether the buffer is currently available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

impl Default for SingleBufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_SHARED_CAPACITY)
    }
}

impl BufferPool for SingleBufferPool {
    fn acquire(&self, _capacity: usize) -> Option<Vec<u8>> {
        self.slot.borrow_mut().take()
    }

    fn release(&self, buffer: Vec<u8>) {
        *self.slot.borrow_mut() = Some(buffer);
    }
}

/// Allocates a new buffer for every acquisition.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapPool;

impl BufferPool for HeapPool {
    fn acquire(&self, capacity: usize) -> Option<Vec<u8>> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(capacity).ok()?;
        buffer.resize(capacity, 0);
        Some(buffer)
    }

    fn release(&self, _buffer: Vec<u8>) {}
}

/// Thread-safe pool that recycles released buffers.
#[derive(Debug)]
pub struct RecyclingPool {
    free: Mutex<Vec<Vec<u8>>>,
    max_retained: usize,
}

impl RecyclingPool {
    /// Create a pool keeping at most `max_retained` idle buffers.
    #[must_use]
    pub fn new(max_retained: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_retained,
        }
    }

    /// Number of idle buffers currently held.
    #[must_use]
    pub fn retained(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for RecyclingPool {
    fn default() -> Self {
        Self::new(DEFAULT_RETAINED_BUFFERS)
    }
}

impl BufferPool for RecyclingPool {
    fn acquire(&self, capacity: usize) -> Option<Vec<u8>> {
        let recycled = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let mut buffer = recycled.unwrap_or_default();
        if buffer.len() < capacity {
            buffer.try_reserve_exact(capacity - buffer.len()).ok()?;
        }
        buffer.resize(capacity, 0);
        Some(buffer)
    }

    fn release(&self, buffer: Vec<u8>) {
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.max_retained {
            free.push(buffer);
        }
    }
}
