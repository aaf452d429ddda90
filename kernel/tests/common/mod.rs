//! Hosted stand-in for the kernel services the pty driver calls out to
//!
//! Every std thread is a task. Blocking uses one condition variable with
//! per-task permits, so an unblock that lands before the task parks is
//! remembered. The task table holds `Arc<PtyEndpoint>`s per task, which is
//! what the descriptor-scan fan-out walks.

#![allow(dead_code)]

use std::any::Any;
use std::cell::Cell;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use ptyfs::fs::vfs::{FileOperations, OpenFlags};
use ptyfs::ipc::poll::ReadinessQueue;
use ptyfs::task::{Scheduler, TaskId};
use ptyfs::tty::pty::{DescriptorScan, PtyDriver, PtyEndpoint, PtyRegistry, TaskTable};

/// How long a test waits for another thread before declaring a hang
pub const TIMEOUT: Duration = Duration::from_secs(5);

pub const RDWR: u32 = OpenFlags::O_RDWR;
pub const RDWR_NB: u32 = OpenFlags::O_RDWR | OpenFlags::O_NONBLOCK;

static NEXT_TASK: AtomicU64 = AtomicU64::new(100);

thread_local! {
    static CURRENT: Cell<Option<TaskId>> = const { Cell::new(None) };
}

/// TaskId of the calling thread, assigned on first use
pub fn current_task() -> TaskId {
    CURRENT.with(|c| match c.get() {
        Some(id) => id,
        None => {
            let id = TaskId::new(NEXT_TASK.fetch_add(1, Ordering::Relaxed));
            c.set(Some(id));
            id
        }
    })
}

#[derive(Default)]
struct KernelState {
    permits: HashSet<TaskId>,
    blocked: HashSet<TaskId>,
    pending: BTreeMap<TaskId, Vec<u32>>,
    files: BTreeMap<TaskId, Vec<Arc<PtyEndpoint>>>,
}

#[derive(Default)]
pub struct MockKernel {
    state: Mutex<KernelState>,
    cond: Condvar,
}

impl MockKernel {
    /// Give `task` an open file description
    pub fn install(&self, task: TaskId, file: Arc<PtyEndpoint>) {
        self.state.lock().unwrap().files.entry(task).or_default().push(file);
    }

    /// Drop every descriptor `task` holds
    pub fn close_all(&self, task: TaskId) {
        let files = self.state.lock().unwrap().files.remove(&task);
        // Endpoints close outside the kernel lock; closing may raise signals
        drop(files);
    }

    /// Signals raised for `task` so far, clearing them
    pub fn take_signals(&self, task: TaskId) -> Vec<u32> {
        self.state.lock().unwrap().pending.remove(&task).unwrap_or_default()
    }

    pub fn pending_signals(&self, task: TaskId) -> Vec<u32> {
        self.state.lock().unwrap().pending.get(&task).cloned().unwrap_or_default()
    }

    /// Wait until `task` is parked in `block_current`
    pub fn wait_blocked(&self, task: TaskId) {
        let deadline = Instant::now() + TIMEOUT;
        let mut st = self.state.lock().unwrap();
        while !st.blocked.contains(&task) {
            let left = deadline.saturating_duration_since(Instant::now());
            assert!(!left.is_zero(), "task {} never blocked", task);
            st = self.cond.wait_timeout(st, left).unwrap().0;
        }
    }
}

impl Scheduler for MockKernel {
    fn current_task(&self) -> TaskId {
        current_task()
    }

    fn block_current(&self) {
        let me = current_task();
        let mut st = self.state.lock().unwrap();
        st.blocked.insert(me);
        self.cond.notify_all();
        while !st.permits.remove(&me) && !st.pending.get(&me).is_some_and(|p| !p.is_empty()) {
            st = self.cond.wait(st).unwrap();
        }
        st.blocked.remove(&me);
    }

    fn unblock(&self, task: TaskId) {
        self.state.lock().unwrap().permits.insert(task);
        self.cond.notify_all();
    }

    fn signal_pending(&self, task: TaskId) -> bool {
        self.state.lock().unwrap().pending.get(&task).is_some_and(|p| !p.is_empty())
    }
}

/// Task-table view of the mock kernel
pub struct KernelTasks(pub Arc<MockKernel>);

impl TaskTable for KernelTasks {
    fn for_each_task(&self, f: &mut dyn FnMut(TaskId)) {
        let tasks: Vec<TaskId> = self.0.state.lock().unwrap().files.keys().copied().collect();
        for task in tasks {
            f(task);
        }
    }

    fn for_each_open_file(&self, task: TaskId, f: &mut dyn FnMut(&dyn Any)) {
        let files = self.0.state.lock().unwrap().files.get(&task).cloned().unwrap_or_default();
        for file in &files {
            f(file.as_any());
        }
    }

    fn send_signal(&self, task: TaskId, signal: u32) {
        self.0.state.lock().unwrap().pending.entry(task).or_default().push(signal);
        self.0.cond.notify_all();
    }
}

pub struct Harness {
    pub kernel: Arc<MockKernel>,
    pub driver: Arc<PtyDriver>,
    pub readiness: Arc<ReadinessQueue>,
}

impl Harness {
    pub fn new(capacity: usize) -> Self {
        let kernel = Arc::new(MockKernel::default());
        let readiness = Arc::new(ReadinessQueue::new());
        let driver = Arc::new(PtyDriver::new(
            PtyRegistry::with_capacity(capacity),
            kernel.clone(),
            Arc::new(DescriptorScan::new(KernelTasks(kernel.clone()))),
            readiness.clone(),
        ));
        Self {
            kernel,
            driver,
            readiness,
        }
    }

    /// A fresh pair, already unlocked, with one slave open
    pub fn open_pair(&self, flags: u32) -> (PtyEndpoint, PtyEndpoint) {
        let master = self.driver.create_pair(flags).unwrap();
        unlock(&master);
        let slave = self.driver.open_slave(master.number(), flags).unwrap();
        (master, slave)
    }
}

pub fn unlock(master: &PtyEndpoint) {
    let zero: i32 = 0;
    master
        .ioctl(ptyfs::tty::ioctl::TIOCSPTLCK, &zero as *const i32 as u64)
        .unwrap();
}

/// Switch a pair to raw mode (no canonical processing, no echo)
pub fn make_raw(ep: &PtyEndpoint) {
    let slot = ep.slot().unwrap();
    let mut termios = slot.termios();
    termios.set_raw();
    slot.set_termios(ep.driver(), termios);
}

/// Read until `want` bytes arrived or the endpoint reports end-of-data
pub fn read_exact(ep: &PtyEndpoint, want: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 512];
    while out.len() < want {
        let cap = (want - out.len()).min(buf.len());
        match ep.read(&mut buf[..cap]) {
            Ok(0) => break,
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(e) => panic!("read failed: errno {}", e),
        }
    }
    out
}
