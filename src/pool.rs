//! Reusable fixed-width buffers for the scoring loop.
//!
//! A pool hands out `Vec<f32>` of one width and takes them back without
//! clearing them. Callers that need a clean buffer (every feature vector)
//! must re-zero it after `acquire`; see [`crate::features::fill_dense`].

use tracing::debug;

/// Allocation counters for a [`BufferPool`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers created because the pool was empty
    pub allocated: usize,
    /// Acquisitions served from the pool
    pub reused: usize,
    /// Buffers currently idle in the pool
    pub idle: usize,
}

/// A pool of equal-width `f32` buffers.
///
/// Not shared between threads: give each worker its own pool.
#[derive(Debug)]
pub struct BufferPool {
    width: usize,
    free: Vec<Vec<f32>>,
    allocated: usize,
    reused: usize,
}

impl BufferPool {
    pub fn new(width: usize) -> Self {
        Self::with_capacity(width, 0)
    }

    /// Create a pool with `count` buffers already allocated.
    ///
    /// Size `count` to the peak number of in-flight requests so the hot
    /// path never allocates.
    pub fn with_capacity(width: usize, count: usize) -> Self {
        let free = (0..count).map(|_| vec![0.0; width]).collect();
        Self {
            width,
            free,
            allocated: count,
            reused: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Take a buffer of `width` values.
    ///
    /// Freshly allocated buffers are zeroed; reused ones still hold whatever
    /// the previous user left in them.
    pub fn acquire(&mut self) -> Vec<f32> {
        match self.free.pop() {
            Some(buf) => {
                self.reused += 1;
                buf
            }
            None => {
                self.allocated += 1;
                vec![0.0; self.width]
            }
        }
    }

    /// Return a buffer for reuse. Contents are left as they are.
    pub fn release(&mut self, buf: Vec<f32>) {
        if buf.len() != self.width {
            debug!(
                "Dropping buffer of width {} returned to pool of width {}",
                buf.len(),
                self.width
            );
            return;
        }
        self.free.push(buf);
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.allocated,
            reused: self.reused,
            idle: self.free.len(),
        }
    }
}

/// The feature and result pools one scoring worker needs.
#[derive(Debug)]
pub struct ScoringBuffers {
    pub features: BufferPool,
    pub results: BufferPool,
}

impl ScoringBuffers {
    pub fn new(num_features: usize, num_outputs: usize, capacity: usize) -> Self {
        Self {
            features: BufferPool::with_capacity(num_features, capacity),
            results: BufferPool::with_capacity(num_outputs, capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_allocates_when_empty() {
        let mut pool = BufferPool::new(46);
        let buf = pool.acquire();

        assert_eq!(buf.len(), 46);
        assert!(buf.iter().all(|v| *v == 0.0));
        assert_eq!(
            pool.stats(),
            PoolStats {
                allocated: 1,
                reused: 0,
                idle: 0
            }
        );
    }

    #[test]
    fn test_release_keeps_contents() {
        let mut pool = BufferPool::new(4);
        let mut buf = pool.acquire();
        buf[2] = 7.5;
        let addr = buf.as_ptr();
        pool.release(buf);

        let again = pool.acquire();
        assert_eq!(again.as_ptr(), addr);
        assert_eq!(again[2], 7.5);
        assert_eq!(pool.stats().reused, 1);
    }

    #[test]
    fn test_preallocated_pool_never_allocates_at_capacity() {
        let mut pool = BufferPool::with_capacity(46, 2);
        for _ in 0..100 {
            let a = pool.acquire();
            let b = pool.acquire();
            pool.release(a);
            pool.release(b);
        }

        let stats = pool.stats();
        assert_eq!(stats.allocated, 2);
        assert_eq!(stats.reused, 200);
        assert_eq!(stats.idle, 2);
    }

    #[test]
    fn test_wrong_width_buffer_is_dropped() {
        let mut pool = BufferPool::new(4);
        pool.release(vec![0.0; 3]);
        assert_eq!(pool.stats().idle, 0);
    }

    #[test]
    fn test_scoring_buffers_widths() {
        let mut buffers = ScoringBuffers::new(46, 1, 1);
        assert_eq!(buffers.features.acquire().len(), 46);
        assert_eq!(buffers.results.acquire().len(), 1);
        assert_eq!(buffers.features.stats().allocated, 1);
    }
}
