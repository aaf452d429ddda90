//! Scheduler contract consumed by the pty driver
//!
//! The driver never owns threads. It only needs to know who is calling,
//! to park that caller on a wait queue, and to make parked callers runnable
//! again. Everything else about scheduling belongs to the embedding kernel.

use core::fmt;

/// Identifier of a schedulable task (a kernel thread id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(raw: u64) -> Self {
        TaskId(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Black-box scheduler primitives
///
/// Contract:
/// - `block_current` suspends the calling task until `unblock` is called
///   for it. An `unblock` that arrives after the task registered itself on a
///   wait queue but before it reached `block_current` must not be lost: the
///   subsequent `block_current` returns immediately.
/// - `block_current` may also return early because a signal became pending;
///   callers re-check `signal_pending` after every wake.
/// - `unblock` on a task that is not blocked is harmless.
pub trait Scheduler: Send + Sync {
    /// Task executing the current call
    fn current_task(&self) -> TaskId;

    /// Suspend the current task until it is unblocked or signalled
    fn block_current(&self);

    /// Make a suspended task runnable again
    fn unblock(&self, task: TaskId);

    /// Whether `task` has a deliverable signal pending
    fn signal_pending(&self, task: TaskId) -> bool;
}
