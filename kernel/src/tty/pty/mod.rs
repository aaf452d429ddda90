//! PTY (Pseudo-Terminal) subsystem
//!
//! Pairs live in a fixed-capacity arena. Each entry carries a generation
//! counter that is bumped when its pair is reclaimed, so a `PtyHandle` kept
//! past its pair's lifetime can never reach the next occupant of the same
//! index. Endpoints hold handles, never direct references.

pub mod endpoint;
pub mod pair;
pub mod ring;
pub mod signal;
pub mod wait;

pub use endpoint::PtyEndpoint;
pub use pair::{FlushTarget, PtySlot};
pub use ring::{ByteRing, PTY_BUFFER_SIZE};
pub use signal::{DescriptorScan, NoSignals, SignalFanout, TaskTable};

use alloc::sync::Arc;
use alloc::vec::Vec;
use conquer_once::spin::OnceCell;
use spin::Mutex;

use crate::fs::vfs::OpenFlags;
use crate::ipc::poll::ReadinessSink;
use crate::syscall::errno::{EBUSY, EIO, ENODEV, ENOENT, ENOSPC};
use crate::task::Scheduler;

/// Default maximum number of PTY pairs
pub const MAX_PTYS: usize = 64;

/// Slave names carry exactly three digits, so no index may reach this
pub const PTS_INDEX_LIMIT: usize = 1000;

/// Generation-checked reference to a registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PtyHandle {
    index: u16,
    generation: u32,
}

impl PtyHandle {
    pub const fn new(index: u16, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Side of a pair an endpoint is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Master,
    Slave,
}

/// One endpoint of one pair, as seen by the readiness publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointId {
    pub handle: PtyHandle,
    pub role: Role,
}

struct Entry {
    generation: u32,
    slot: Option<Arc<PtySlot>>,
}

/// Fixed-size table of pty pairs
pub struct PtyRegistry {
    entries: Mutex<Vec<Entry>>,
}

impl PtyRegistry {
    pub fn new() -> Self {
        Self::with_capacity(MAX_PTYS)
    }

    /// Registry holding at most `capacity` concurrent pairs (capped at 1000)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(PTS_INDEX_LIMIT);
        let entries = (0..capacity)
            .map(|_| Entry {
                generation: 0,
                slot: None,
            })
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().len()
    }

    /// Claim the lowest free entry for a fresh pair
    fn allocate(&self) -> Result<Arc<PtySlot>, i32> {
        let mut entries = self.entries.lock();
        let (index, entry) = entries
            .iter_mut()
            .enumerate()
            .find(|(_, e)| e.slot.is_none())
            .ok_or(ENOSPC)?;

        let slot = Arc::new(PtySlot::new(PtyHandle::new(index as u16, entry.generation)));
        entry.slot = Some(slot.clone());
        Ok(slot)
    }

    /// Resolve a handle; EIO if its pair has been reclaimed
    pub fn get(&self, handle: PtyHandle) -> Result<Arc<PtySlot>, i32> {
        let entries = self.entries.lock();
        match entries.get(handle.index as usize) {
            Some(Entry {
                generation,
                slot: Some(slot),
            }) if *generation == handle.generation => Ok(slot.clone()),
            _ => Err(EIO),
        }
    }

    /// Current pair at `number`, if any
    pub fn lookup(&self, number: u32) -> Option<Arc<PtySlot>> {
        self.entries.lock().get(number as usize)?.slot.clone()
    }

    /// Free the entry `handle` refers to and bump its generation
    fn reclaim(&self, handle: PtyHandle) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(handle.index as usize) {
            if entry.generation == handle.generation && entry.slot.is_some() {
                entry.slot = None;
                entry.generation = entry.generation.wrapping_add(1);
                log::debug!("PTY{}: slot reclaimed", handle.index);
            }
        }
    }

    /// Allocated pairs, lowest number first
    pub fn active(&self) -> Vec<Arc<PtySlot>> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| e.slot.clone())
            .collect()
    }

    /// Numbers of all allocated pairs
    pub fn list_active(&self) -> Vec<u32> {
        self.active().iter().map(|s| s.number()).collect()
    }
}

impl Default for PtyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The pty driver: registry plus the kernel services it calls out to
pub struct PtyDriver {
    registry: PtyRegistry,
    scheduler: Arc<dyn Scheduler>,
    signals: Arc<dyn SignalFanout>,
    readiness: Arc<dyn ReadinessSink>,
}

impl PtyDriver {
    pub fn new(
        registry: PtyRegistry,
        scheduler: Arc<dyn Scheduler>,
        signals: Arc<dyn SignalFanout>,
        readiness: Arc<dyn ReadinessSink>,
    ) -> Self {
        Self {
            registry,
            scheduler,
            signals,
            readiness,
        }
    }

    pub fn registry(&self) -> &PtyRegistry {
        &self.registry
    }

    pub fn slot(&self, handle: PtyHandle) -> Result<Arc<PtySlot>, i32> {
        self.registry.get(handle)
    }

    /// Open /dev/ptmx: allocate a pair and return its master
    pub fn create_pair(self: &Arc<Self>, flags: u32) -> Result<PtyEndpoint, i32> {
        let flags = OpenFlags::from_flags(flags)?;
        let slot = self.registry.allocate().map_err(|e| {
            log::warn!("PTY: no free pair ({} in use)", self.registry.capacity());
            e
        })?;

        slot.refresh_readiness(self);
        log::info!("PTY{}: pair created", slot.number());
        Ok(PtyEndpoint::new(self.clone(), slot.handle(), Role::Master, flags))
    }

    /// Open /dev/pts/N
    ///
    /// ENOENT if no pair with a live master has that number, EACCES while the
    /// pair is still locked.
    pub fn open_slave(self: &Arc<Self>, number: u32, flags: u32) -> Result<PtyEndpoint, i32> {
        let flags = OpenFlags::from_flags(flags)?;
        let slot = self.registry.lookup(number).ok_or(ENOENT)?;
        slot.attach_slave(self)?;

        log::info!("PTY{}: slave opened ({} open)", number, slot.slave_open_count());
        Ok(PtyEndpoint::new(self.clone(), slot.handle(), Role::Slave, flags))
    }

    /// Detach an endpoint; reclaims the pair once both sides are gone
    pub(crate) fn release(&self, handle: PtyHandle, role: Role) {
        let slot = match self.registry.get(handle) {
            Ok(slot) => slot,
            Err(_) => {
                log::warn!("PTY{}: release of stale {:?} endpoint", handle.index, role);
                return;
            }
        };

        let reclaim = match role {
            Role::Master => slot.close_master(self),
            Role::Slave => slot.close_slave(self),
        };
        log::debug!("PTY{}: {:?} closed", handle.index, role);

        if reclaim {
            self.registry.reclaim(handle);
        }
    }
}

/// Global pty driver
static PTY_DRIVER: OnceCell<Arc<PtyDriver>> = OnceCell::uninit();

/// Install the global driver; EBUSY if one is already installed
pub fn init(driver: PtyDriver) -> Result<(), i32> {
    PTY_DRIVER
        .try_init_once(|| Arc::new(driver))
        .map_err(|_| EBUSY)?;
    log::info!("PTY subsystem initialized");
    Ok(())
}

/// The global driver installed by `init`
pub fn driver() -> Result<&'static Arc<PtyDriver>, i32> {
    PTY_DRIVER.try_get().map_err(|_| ENODEV)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Single-threaded driver harness for unit tests

    use super::*;
    use crate::ipc::poll::ReadinessQueue;
    use crate::task::TaskId;

    /// Scheduler for tests that never block
    pub struct StubScheduler;

    impl Scheduler for StubScheduler {
        fn current_task(&self) -> TaskId {
            TaskId::new(1)
        }

        fn block_current(&self) {
            panic!("single-threaded test would block");
        }

        fn unblock(&self, _task: TaskId) {}

        fn signal_pending(&self, _task: TaskId) -> bool {
            false
        }
    }

    /// Fan-out that records what it was asked to raise
    #[derive(Default)]
    pub struct RecordingSignals {
        raised: Mutex<Vec<(PtyHandle, u32)>>,
    }

    impl RecordingSignals {
        pub fn raised(&self) -> Vec<(PtyHandle, u32)> {
            self.raised.lock().clone()
        }
    }

    impl SignalFanout for RecordingSignals {
        fn signal_slave_group(&self, pty: PtyHandle, signal: u32) {
            self.raised.lock().push((pty, signal));
        }
    }

    pub struct TestRig {
        pub driver: Arc<PtyDriver>,
        pub signals: Arc<RecordingSignals>,
        pub readiness: Arc<ReadinessQueue>,
    }

    impl TestRig {
        pub fn new(capacity: usize) -> Self {
            let signals = Arc::new(RecordingSignals::default());
            let readiness = Arc::new(ReadinessQueue::new());
            let driver = Arc::new(PtyDriver::new(
                PtyRegistry::with_capacity(capacity),
                Arc::new(StubScheduler),
                signals.clone(),
                readiness.clone(),
            ));
            Self {
                driver,
                signals,
                readiness,
            }
        }
    }
}
