//! An unbounded, single-producer/single-consumer FIFO channel.
//!
//! Shaped on the intra-thread allocator in `communication::allocator::thread`,
//! which backs its single-process channels with a plain shared `VecDeque`
//! rather than anything lock-based: there is exactly one logical scheduler
//! driving every step, so `Rc<RefCell<_>>` is sufficient and an
//! `Arc<Mutex<_>>` would buy nothing but overhead.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// FIFO contract shared by every channel in the matrix: `enqueue` appends
/// at the tail, `dequeue` removes from the head, `peek_nonempty` is a
/// non-destructive emptiness test. Channels never reorder and never drop.
pub trait FifoChannel<T> {
    fn enqueue(&self, item: T);
    fn dequeue(&self) -> Option<T>;
    fn peek_nonempty(&self) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        !self.peek_nonempty()
    }
}

/// A single directed FIFO channel between two endpoints.
///
/// Cloning a `Channel` clones the handle, not the queue: both clones see
/// the same underlying `VecDeque`, which is exactly what's needed for a
/// `Controller` to hold one handle while a `Node`/`Observer` holds the
/// other end.
#[derive(Debug)]
pub struct Channel<T> {
    queue: Rc<RefCell<VecDeque<T>>>,
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Channel { queue: Rc::new(RefCell::new(VecDeque::new())) }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Channel { queue: Rc::clone(&self.queue) }
    }
}

impl<T> FifoChannel<T> for Channel<T> {
    fn enqueue(&self, item: T) {
        self.queue.borrow_mut().push_back(item);
    }

    fn dequeue(&self) -> Option<T> {
        self.queue.borrow_mut().pop_front()
    }

    fn peek_nonempty(&self) -> bool {
        !self.queue.borrow().is_empty()
    }

    fn len(&self) -> usize {
        self.queue.borrow().len()
    }
}
