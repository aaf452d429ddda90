//! Readiness publication for poll/select
//!
//! Every pty mutation recomputes the readiness of both endpoints of the pair
//! and hands any change to a `ReadinessSink`. The embedding kernel's poll
//! machinery consumes those events; `ReadinessQueue` is a ready-made sink
//! it can drain from any context.

use alloc::vec::Vec;
use crossbeam_queue::ArrayQueue;

use crate::tty::pty::EndpointId;

/// Poll event flags (matching Linux definitions)
pub mod events {
    /// Data available to read
    pub const POLLIN: i16 = 0x0001;
    /// Write won't block
    pub const POLLOUT: i16 = 0x0004;
    /// Error condition (output only)
    pub const POLLERR: i16 = 0x0008;
    /// Hang up (output only)
    pub const POLLHUP: i16 = 0x0010;
}

/// One readiness change for one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessEvent {
    /// Endpoint whose readiness changed
    pub endpoint: EndpointId,
    /// New readiness bits (POLLIN / POLLOUT / POLLHUP)
    pub revents: i16,
}

/// Consumer of readiness changes
///
/// Called after the pty state lock has been released; implementations may
/// wake pollers but must not call back into the same endpoint's I/O path.
pub trait ReadinessSink: Send + Sync {
    fn publish(&self, event: ReadinessEvent);
}

/// Default capacity of a `ReadinessQueue`
pub const READINESS_QUEUE_SIZE: usize = 256;

/// Bounded lock-free queue of readiness events
pub struct ReadinessQueue {
    queue: ArrayQueue<ReadinessEvent>,
}

impl ReadinessQueue {
    pub fn new() -> Self {
        Self::with_capacity(READINESS_QUEUE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
        }
    }

    /// Take the oldest pending event
    pub fn pop(&self) -> Option<ReadinessEvent> {
        self.queue.pop()
    }

    /// Take every pending event, oldest first
    pub fn drain(&self) -> Vec<ReadinessEvent> {
        let mut events = Vec::with_capacity(self.queue.len());
        while let Some(event) = self.queue.pop() {
            events.push(event);
        }
        events
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for ReadinessQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessSink for ReadinessQueue {
    fn publish(&self, event: ReadinessEvent) {
        if self.queue.push(event).is_err() {
            log::warn!(
                "Readiness queue full; dropping event for {:?} (revents={:#x})",
                event.endpoint,
                event.revents
            );
        }
    }
}
