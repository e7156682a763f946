use std::collections::VecDeque;

use super::frame::Frame;

pub const DEFAULT_QUEUE_CAPACITY: usize = 5;

/// Fixed-capacity FIFO sitting between the producer and the consumer.
///
/// Nothing here blocks. A full queue rejects the push and hands the frame
/// back; the producer is expected to back off and retry.
#[derive(Debug)]
pub struct BoundedFrameQueue {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl BoundedFrameQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    pub fn try_push(&mut self, frame: Frame) -> Result<(), Frame> {
        if self.is_full() {
            return Err(frame);
        }

        self.frames.push_back(frame);
        Ok(())
    }

    pub fn try_pop(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }
}

impl Default for BoundedFrameQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
