//! Transient decode scratch-space pool.
//!
//! A mutex-guarded pool of reusable byte buffers for per-request scratch
//! space (e.g. decompression scratch in the doc store). `acquire()` pops a
//! buffer or allocates a fresh one on exhaustion; the returned guard puts it
//! back on drop, so a buffer is released on every exit path — including an
//! early return via `?` — without the caller having to remember to call
//! `put()` itself.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    capacity: usize,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self { buffers: Mutex::new(Vec::with_capacity(capacity)), capacity }
    }

    /// Acquire a scratch buffer, cleared and ready to use.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let mut buf = self.buffers.lock().pop().unwrap_or_default();
        buf.clear();
        PooledBuffer { pool: self, buf: Some(buf) }
    }

    fn release(&self, buf: Vec<u8>) {
        let mut buffers = self.buffers.lock();
        if buffers.len() < self.capacity {
            buffers.push(buf);
        }
    }

    /// Number of buffers currently idle in the pool.
    pub fn idle_count(&self) -> usize {
        self.buffers.lock().len()
    }
}

/// A scratch buffer borrowed from a [`BufferPool`]. Returned to the pool
/// when dropped, regardless of why the borrowing scope ended.
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Option<Vec<u8>>,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;
    fn deref(&self) -> &Vec<u8> {
        self.buf.as_ref().expect("buffer taken before drop")
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.buf.as_mut().expect("buffer taken before drop")
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_released_buffer_instead_of_allocating() {
        let pool = BufferPool::new(4);
        {
            let mut buf = pool.acquire();
            buf.extend_from_slice(b"scratch");
        }
        assert_eq!(pool.idle_count(), 1);
        let buf = pool.acquire();
        assert!(buf.is_empty()); // cleared on acquire, capacity reused
    }

    #[test]
    fn releases_on_early_return_via_question_mark() {
        let pool = BufferPool::new(4);
        fn fallible(pool: &BufferPool) -> Result<(), ()> {
            let _buf = pool.acquire();
            Err(())?;
            Ok(())
        }
        let _ = fallible(&pool);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn caps_pool_size_at_capacity() {
        let pool = BufferPool::new(1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 1);
    }
}
