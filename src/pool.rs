//! # ArtifactPool: bounded, lossy, lock-free artifact exchange.
//!
//! Workers hand artifacts to each other through one shared pool. The pool never
//! blocks and never grows past its capacity.
//!
//! ## Rules
//! - `push` on a full pool **disposes the pushed artifact**; queued artifacts
//!   are never evicted (drop-newest).
//! - `pop` on an empty pool returns `None`; that is the common case, not an error.
//! - No ordering guarantee across threads; artifacts are interchangeable.
//!
//! ```text
//! worker A ──push──►┌────────────────────┐──pop──► worker C
//! worker B ──push──►│ ArrayQueue (cap N) │──pop──► worker D
//!                   └────────────────────┘
//!        full? ──► artifact.dispose()  (overflowed += 1)
//! ```
//!
//! Both paths are lock-free (`ArrayQueue` uses CAS), so a worker aborted in
//! the middle of an iteration cannot leave the pool half-updated.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_queue::ArrayQueue;

use crate::workload::Artifact;

/// What happened to an artifact handed to [`ArtifactPool::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    /// Nothing was pushed (`None`).
    Empty,
    /// The artifact is now owned by the pool.
    Queued,
    /// The pool was full; the artifact was disposed.
    Overflowed,
}

/// Bounded multi-producer/multi-consumer pool of artifacts.
pub struct ArtifactPool<A: Artifact> {
    queue: ArrayQueue<A>,
    overflowed: AtomicU64,
}

impl<A: Artifact> ArtifactPool<A> {
    /// Creates an empty pool. A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            overflowed: AtomicU64::new(0),
        }
    }

    /// Offers an artifact to the pool.
    ///
    /// Accepts either `A` or `Option<A>`; `None` is a no-op. When the pool is
    /// full the offered artifact is disposed and [`Push::Overflowed`] returned.
    pub fn push(&self, artifact: impl Into<Option<A>>) -> Push {
        let Some(artifact) = artifact.into() else {
            return Push::Empty;
        };
        match self.queue.push(artifact) {
            Ok(()) => Push::Queued,
            Err(rejected) => {
                self.overflowed.fetch_add(1, Ordering::Relaxed);
                rejected.dispose();
                Push::Overflowed
            }
        }
    }

    /// Takes any one artifact, transferring ownership to the caller.
    pub fn pop(&self) -> Option<A> {
        self.queue.pop()
    }

    /// Number of queued artifacts (a snapshot under concurrency).
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Maximum number of queued artifacts.
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Number of artifacts disposed because the pool was full.
    pub fn overflowed(&self) -> u64 {
        self.overflowed.load(Ordering::Relaxed)
    }

    /// Disposes everything currently queued; returns how many were disposed.
    pub fn drain(&self) -> usize {
        let mut n = 0;
        while let Some(artifact) = self.queue.pop() {
            artifact.dispose();
            n += 1;
        }
        n
    }
}

impl<A: Artifact> std::fmt::Debug for ArtifactPool<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactPool")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("overflowed", &self.overflowed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    static DISPOSED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, PartialEq, Eq)]
    struct Tag(char);

    impl Artifact for Tag {
        fn duplicate(&self) -> Self {
            Tag(self.0)
        }
        fn dispose(self) {
            DISPOSED.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn overflow_destroys_the_newest() {
        let pool = ArtifactPool::new(4);
        let before = DISPOSED.load(Ordering::Relaxed);
        for c in ['A', 'B', 'C', 'D'] {
            assert_eq!(pool.push(Tag(c)), Push::Queued);
        }
        assert_eq!(pool.push(Tag('E')), Push::Overflowed);
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.overflowed(), 1);
        assert!(DISPOSED.load(Ordering::Relaxed) > before);

        let mut left: Vec<char> = std::iter::from_fn(|| pool.pop()).map(|t| t.0).collect();
        left.sort_unstable();
        assert_eq!(left, vec!['A', 'B', 'C', 'D']);
    }

    #[test]
    fn none_is_a_no_op() {
        let pool: ArtifactPool<Tag> = ArtifactPool::new(1);
        assert_eq!(pool.push(None::<Tag>), Push::Empty);
        assert!(pool.is_empty());
    }

    #[test]
    fn empty_pop_is_none() {
        let pool: ArtifactPool<Tag> = ArtifactPool::new(2);
        assert_eq!(pool.pop(), None);
        pool.push(Some(Tag('x')));
        assert_eq!(pool.pop(), Some(Tag('x')));
        assert_eq!(pool.pop(), None);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let pool: ArtifactPool<Tag> = ArtifactPool::new(0);
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn drain_disposes_everything() {
        let pool = ArtifactPool::new(3);
        pool.push(Tag('a'));
        pool.push(Tag('b'));
        assert_eq!(pool.drain(), 2);
        assert!(pool.is_empty());
    }

    #[test]
    fn concurrent_churn_never_exceeds_capacity() {
        let pool = Arc::new(ArtifactPool::new(8));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for i in 0..2_000u32 {
                        if (i + t) % 3 == 0 {
                            drop(pool.pop());
                        } else {
                            pool.push(Tag('z'));
                        }
                        assert!(pool.len() <= pool.capacity());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(pool.len() <= 8);
    }
}
