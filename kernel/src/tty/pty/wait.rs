//! FIFO of tasks suspended on one side of a pty buffer
//!
//! The queue only records who is waiting. Registration happens under the
//! pair's state lock; the actual wakeups are issued through the scheduler
//! after that lock is released.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::task::TaskId;

pub struct WaitQueue {
    waiters: VecDeque<TaskId>,
}

impl WaitQueue {
    pub const fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
        }
    }

    /// Register a task as waiting; a task already queued keeps its position
    pub fn register(&mut self, task: TaskId) {
        if !self.waiters.contains(&task) {
            self.waiters.push_back(task);
        }
    }

    /// Unregister a task (woken early, interrupted, or satisfied)
    pub fn remove(&mut self, task: TaskId) {
        self.waiters.retain(|&t| t != task);
    }

    /// Dequeue every waiter in FIFO order
    pub fn take_all(&mut self) -> Vec<TaskId> {
        self.waiters.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_all_is_fifo() {
        let mut q = WaitQueue::new();
        q.register(TaskId::new(3));
        q.register(TaskId::new(1));
        q.register(TaskId::new(2));

        assert_eq!(q.take_all(), [TaskId::new(3), TaskId::new(1), TaskId::new(2)]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_register_is_deduplicated() {
        let mut q = WaitQueue::new();
        q.register(TaskId::new(5));
        q.register(TaskId::new(6));
        q.register(TaskId::new(5));

        assert_eq!(q.len(), 2);
        assert_eq!(q.take_all(), [TaskId::new(5), TaskId::new(6)]);
    }

    #[test]
    fn test_remove() {
        let mut q = WaitQueue::new();
        q.register(TaskId::new(1));
        q.register(TaskId::new(2));
        q.remove(TaskId::new(1));
        q.remove(TaskId::new(9));

        assert_eq!(q.take_all(), [TaskId::new(2)]);
    }
}
