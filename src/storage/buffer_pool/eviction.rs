//! LRU eviction queue for the buffer pool.
//!
//! A frame enters the queue when its last pin is released and leaves it
//! when it is pinned again or chosen as a victim.

use std::collections::VecDeque;

/// Unpinned frames ordered from least to most recently released.
#[derive(Debug, Default)]
pub struct LruEvictionQueue {
    queue: VecDeque<usize>,
}

impl LruEvictionQueue {
    /// Creates an empty queue sized for `capacity` frames.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
        }
    }

    /// Marks a frame as most recently released.
    pub fn push(&mut self, frame_idx: usize) {
        self.remove(frame_idx);
        self.queue.push_back(frame_idx);
    }

    /// Removes and returns the least recently released frame.
    pub fn pop(&mut self) -> Option<usize> {
        self.queue.pop_front()
    }

    /// Drops a frame that was pinned again before eviction.
    pub fn remove(&mut self, frame_idx: usize) {
        self.queue.retain(|&idx| idx != frame_idx);
    }

    /// Returns true if the frame is waiting for eviction.
    #[must_use]
    pub fn contains(&self, frame_idx: usize) -> bool {
        self.queue.contains(&frame_idx)
    }

    /// Returns the number of frames in the eviction queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
