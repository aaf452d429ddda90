//! Signal delivery to the tasks attached to a pty slave
//!
//! There is no session or process-group model here. The "slave group" of a
//! pair is every task that currently holds an open file description on one
//! of its slave endpoints. `SignalFanout` is the only seam the rest of the
//! driver sees, so a real job-control implementation can replace
//! `DescriptorScan` without touching the line discipline.

use core::any::Any;

use super::endpoint::PtyEndpoint;
use super::{PtyHandle, Role};
use crate::task::TaskId;

/// Raise a signal on every task attached to a pty's slave side
pub trait SignalFanout: Send + Sync {
    fn signal_slave_group(&self, pty: PtyHandle, signal: u32);
}

/// Read-only view of the kernel's task list and descriptor tables
pub trait TaskTable: Send + Sync {
    /// Call `f` once for every live task
    fn for_each_task(&self, f: &mut dyn FnMut(TaskId));

    /// Call `f` for every open file description of `task`
    ///
    /// Files are passed as `Any` so pty endpoints can be recognised by
    /// downcasting; anything else is skipped.
    fn for_each_open_file(&self, task: TaskId, f: &mut dyn FnMut(&dyn Any));

    /// Mark `signal` pending for `task` (and wake it if it is blocked)
    fn send_signal(&self, task: TaskId, signal: u32);
}

/// Fan-out by scanning every descriptor of every task
///
/// O(tasks x descriptors) per signal. Each matching task receives the
/// signal once, however many slave descriptors it holds.
pub struct DescriptorScan<T: TaskTable> {
    tasks: T,
}

impl<T: TaskTable> DescriptorScan<T> {
    pub fn new(tasks: T) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &T {
        &self.tasks
    }

    /// Tasks holding a slave endpoint of `pty`
    pub fn slave_group(&self, pty: PtyHandle) -> alloc::vec::Vec<TaskId> {
        let mut all = alloc::vec::Vec::new();
        self.tasks.for_each_task(&mut |task| all.push(task));

        all.into_iter()
            .filter(|&task| {
                let mut attached = false;
                self.tasks.for_each_open_file(task, &mut |file| {
                    if let Some(ep) = file.downcast_ref::<PtyEndpoint>() {
                        if ep.role() == Role::Slave && ep.handle() == pty {
                            attached = true;
                        }
                    }
                });
                attached
            })
            .collect()
    }
}

impl<T: TaskTable> SignalFanout for DescriptorScan<T> {
    fn signal_slave_group(&self, pty: PtyHandle, signal: u32) {
        let group = self.slave_group(pty);
        log::trace!("PTY{}: signal {} -> {} task(s)", pty.index(), signal, group.len());
        for task in group {
            self.tasks.send_signal(task, signal);
        }
    }
}

/// Fan-out that drops every signal, for embeddings without signal delivery
pub struct NoSignals;

impl SignalFanout for NoSignals {
    fn signal_slave_group(&self, pty: PtyHandle, signal: u32) {
        log::debug!("PTY{}: no signal delivery, dropping signal {}", pty.index(), signal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::vfs::{FileOperations, OpenFlags};
    use crate::signal::constants::SIGINT;
    use crate::tty::pty::testing::TestRig;
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use spin::Mutex;

    /// Task 1 holds `files`; task 2 holds a plain integer "file"
    struct FixedTable {
        files: Vec<Arc<PtyEndpoint>>,
        sent: Mutex<Vec<(TaskId, u32)>>,
    }

    impl TaskTable for FixedTable {
        fn for_each_task(&self, f: &mut dyn FnMut(TaskId)) {
            f(TaskId::new(1));
            f(TaskId::new(2));
        }

        fn for_each_open_file(&self, task: TaskId, f: &mut dyn FnMut(&dyn Any)) {
            match task.as_u64() {
                1 => self.files.iter().for_each(|ep| f(ep.as_any())),
                _ => f(&42u32),
            }
        }

        fn send_signal(&self, task: TaskId, signal: u32) {
            self.sent.lock().push((task, signal));
        }
    }

    #[test]
    fn test_scan_matches_slave_holders_once() {
        let rig = TestRig::new(2);
        let master = rig.driver.create_pair(OpenFlags::O_RDWR).unwrap();
        master.slot().unwrap().set_locked(false);
        let a = rig.driver.open_slave(0, OpenFlags::O_RDWR).unwrap();
        let b = rig.driver.open_slave(0, OpenFlags::O_RDWR).unwrap();

        let scan = DescriptorScan::new(FixedTable {
            files: alloc::vec![Arc::new(a), Arc::new(b)],
            sent: Mutex::new(Vec::new()),
        });

        scan.signal_slave_group(master.handle(), SIGINT);
        assert_eq!(*scan.tasks().sent.lock(), [(TaskId::new(1), SIGINT)]);
    }

    #[test]
    fn test_scan_ignores_master_and_other_pairs() {
        let rig = TestRig::new(2);
        let master = rig.driver.create_pair(OpenFlags::O_RDWR).unwrap();
        let other = rig.driver.create_pair(OpenFlags::O_RDWR).unwrap();
        other.slot().unwrap().set_locked(false);
        let other_slave = rig.driver.open_slave(other.number(), OpenFlags::O_RDWR).unwrap();

        let scan = DescriptorScan::new(FixedTable {
            files: alloc::vec![Arc::new(master), Arc::new(other_slave)],
            sent: Mutex::new(Vec::new()),
        });

        assert!(scan.slave_group(PtyHandle::new(0, 0)).is_empty());
        assert_eq!(scan.slave_group(other.handle()), [TaskId::new(1)]);
    }
}
