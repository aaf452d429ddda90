//! Master and slave file objects
//!
//! An endpoint owns no buffers. It is a role plus a handle into the
//! registry; every operation resolves the handle and forwards to the pair.
//! Dropping the endpoint closes it.

use alloc::sync::Arc;
use core::any::Any;
use core::sync::atomic::{AtomicBool, Ordering};

use super::pair::PtySlot;
use super::{PtyDriver, PtyHandle, Role};
use crate::fs::vfs::{FileOperations, OpenFlags};
use crate::syscall::errno::EACCES;
use crate::tty::ioctl;

/// An open /dev/ptmx or /dev/pts/N
pub struct PtyEndpoint {
    driver: Arc<PtyDriver>,
    handle: PtyHandle,
    role: Role,
    /// Access mode fixed at open
    access: OpenFlags,
    /// O_NONBLOCK, which may change after open (F_SETFL)
    nonblock: AtomicBool,
}

impl PtyEndpoint {
    pub(super) fn new(driver: Arc<PtyDriver>, handle: PtyHandle, role: Role, flags: OpenFlags) -> Self {
        Self {
            driver,
            handle,
            role,
            access: flags,
            nonblock: AtomicBool::new(flags.nonblock),
        }
    }

    pub fn handle(&self) -> PtyHandle {
        self.handle
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_master(&self) -> bool {
        self.role == Role::Master
    }

    /// PTY number of the pair this endpoint belongs to
    pub fn number(&self) -> u32 {
        self.handle.index() as u32
    }

    pub fn driver(&self) -> &Arc<PtyDriver> {
        &self.driver
    }

    /// Current open flags
    pub fn flags(&self) -> OpenFlags {
        OpenFlags {
            nonblock: self.nonblock.load(Ordering::Relaxed),
            ..self.access
        }
    }

    /// Toggle O_NONBLOCK
    pub fn set_nonblocking(&self, nonblocking: bool) {
        self.nonblock.store(nonblocking, Ordering::Relaxed);
    }

    /// The pair this endpoint is bound to; EIO if it was reclaimed
    pub fn slot(&self) -> Result<Arc<PtySlot>, i32> {
        self.driver.slot(self.handle)
    }

    /// Path of the slave side, e.g. "/dev/pts/0"
    pub fn slave_path(&self) -> alloc::string::String {
        crate::fs::devptsfs::slave_path(self.number())
    }
}

impl FileOperations for PtyEndpoint {
    fn read(&self, buf: &mut [u8]) -> Result<usize, i32> {
        let flags = self.flags();
        if !flags.read {
            return Err(EACCES);
        }
        let slot = self.slot()?;
        match self.role {
            Role::Master => slot.master_read(&self.driver, buf, flags.nonblock),
            Role::Slave => slot.slave_read(&self.driver, buf, flags.nonblock),
        }
    }

    fn write(&self, buf: &[u8]) -> Result<usize, i32> {
        let flags = self.flags();
        if !flags.write {
            return Err(EACCES);
        }
        let slot = self.slot()?;
        match self.role {
            Role::Master => slot.master_write(&self.driver, buf, flags.nonblock),
            Role::Slave => slot.slave_write(&self.driver, buf, flags.nonblock),
        }
    }

    fn ioctl(&self, request: u64, arg: u64) -> Result<i64, i32> {
        ioctl::pty_ioctl(self, request, arg)
    }

    fn poll(&self) -> i16 {
        match self.slot() {
            Ok(slot) => slot.poll(self.role),
            Err(_) => crate::ipc::poll::events::POLLERR,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for PtyEndpoint {
    fn drop(&mut self) {
        self.driver.release(self.handle, self.role);
    }
}

impl core::fmt::Debug for PtyEndpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PtyEndpoint")
            .field("pty", &self.handle.index())
            .field("role", &self.role)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::poll::events::{POLLHUP, POLLIN, POLLOUT};
    use crate::syscall::errno::{EAGAIN, EIO};
    use crate::tty::pty::testing::TestRig;

    const RDWR_NB: u32 = OpenFlags::O_RDWR | OpenFlags::O_NONBLOCK;

    fn open_pair(rig: &TestRig) -> (PtyEndpoint, PtyEndpoint) {
        let master = rig.driver.create_pair(RDWR_NB).unwrap();
        master.slot().unwrap().set_locked(false);
        let slave = rig.driver.open_slave(master.number(), RDWR_NB).unwrap();
        (master, slave)
    }

    #[test]
    fn test_access_mode_enforced() {
        let rig = TestRig::new(1);
        let master = rig.driver.create_pair(OpenFlags::O_WRONLY).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(master.read(&mut buf), Err(EACCES));
        assert_eq!(master.write(b"x"), Ok(1));
    }

    #[test]
    fn test_nonblocking_reads_would_block() {
        let rig = TestRig::new(1);
        let (master, slave) = open_pair(&rig);
        let mut buf = [0u8; 8];

        assert_eq!(slave.read(&mut buf), Err(EAGAIN));
        assert_eq!(master.read(&mut buf), Err(EAGAIN));
    }

    #[test]
    fn test_canonical_line_reaches_slave() {
        let rig = TestRig::new(1);
        let (master, slave) = open_pair(&rig);
        let mut buf = [0u8; 16];

        assert_eq!(master.write(b"echo hi\n"), Ok(8));
        assert_eq!(slave.read(&mut buf), Ok(8));
        assert_eq!(&buf[..8], b"echo hi\n");

        assert_eq!(slave.write(b"hi\r\n"), Ok(4));
        // Echo of the typed line first, then the slave's output
        let n = master.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"echo hi\nhi\r\n");
    }

    #[test]
    fn test_set_nonblocking() {
        let rig = TestRig::new(1);
        let master = rig.driver.create_pair(OpenFlags::O_RDWR).unwrap();
        assert!(!master.flags().nonblock);
        master.set_nonblocking(true);
        assert!(master.flags().nonblock);
        assert!(master.flags().read && master.flags().write);

        let mut buf = [0u8; 1];
        assert_eq!(master.read(&mut buf), Err(EAGAIN));
    }

    #[test]
    fn test_poll_bits() {
        let rig = TestRig::new(1);
        let (master, slave) = open_pair(&rig);

        assert_eq!(slave.poll(), POLLOUT);
        master.write(b"x\n").unwrap();
        assert_eq!(slave.poll(), POLLIN | POLLOUT);
        assert_eq!(master.poll(), POLLIN | POLLOUT);

        drop(slave);
        assert_eq!(master.poll() & POLLHUP, POLLHUP);
    }

    #[test]
    fn test_master_close_hangs_up_slave() {
        let rig = TestRig::new(1);
        let (master, slave) = open_pair(&rig);
        let handle = master.handle();
        drop(master);

        let mut buf = [0u8; 4];
        assert_eq!(slave.read(&mut buf), Ok(0));
        assert_eq!(slave.write(b"x"), Err(EIO));
        assert_eq!(slave.poll() & POLLHUP, POLLHUP);
        assert_eq!(rig.signals.raised(), [(handle, crate::signal::constants::SIGHUP)]);

        // Pair stays allocated until the slave is gone too
        assert!(rig.driver.registry().get(handle).is_ok());
        drop(slave);
        assert_eq!(rig.driver.registry().get(handle).err(), Some(EIO));
    }

    #[test]
    fn test_slave_close_then_master_close_reclaims() {
        let rig = TestRig::new(1);
        let (master, slave) = open_pair(&rig);
        let handle = master.handle();

        drop(slave);
        let mut buf = [0u8; 4];
        assert_eq!(master.read(&mut buf), Ok(0));

        drop(master);
        assert!(rig.driver.registry().list_active().is_empty());
        assert!(rig.driver.registry().get(handle).is_err());
    }

    #[test]
    fn test_slave_open_count() {
        let rig = TestRig::new(1);
        let (master, first) = open_pair(&rig);
        let second = rig.driver.open_slave(master.number(), RDWR_NB).unwrap();
        assert_eq!(master.slot().unwrap().slave_open_count(), 2);

        drop(first);
        // One slave still attached: master is not hung up
        let mut buf = [0u8; 4];
        assert_eq!(master.read(&mut buf), Err(EAGAIN));

        drop(second);
        assert_eq!(master.read(&mut buf), Ok(0));
    }

    #[test]
    fn test_slave_open_after_master_close_fails() {
        let rig = TestRig::new(1);
        let (master, slave) = open_pair(&rig);
        let number = master.number();
        drop(master);

        assert_eq!(
            rig.driver.open_slave(number, RDWR_NB).err(),
            Some(crate::syscall::errno::ENOENT)
        );
        drop(slave);
    }

    #[test]
    fn test_raw_write_fills_exactly_then_would_block() {
        let rig = TestRig::new(1);
        let (master, slave) = open_pair(&rig);
        let mut raw = master.slot().unwrap().termios();
        raw.set_raw();
        master.slot().unwrap().set_termios(master.driver(), raw);

        let chunk = alloc::vec![b'a'; crate::tty::pty::PTY_BUFFER_SIZE];
        assert_eq!(master.write(&chunk), Ok(chunk.len()));
        assert_eq!(master.write(b"b"), Err(EAGAIN));
        assert_eq!(master.poll() & POLLOUT, 0);

        let mut buf = [0u8; 1];
        assert_eq!(slave.read(&mut buf), Ok(1));
        assert_eq!(master.write(b"b"), Ok(1));
    }

    #[test]
    fn test_readiness_published() {
        let rig = TestRig::new(1);
        let (master, slave) = open_pair(&rig);
        rig.readiness.drain();

        master.write(b"ls\n").unwrap();
        let events = rig.readiness.drain();
        assert!(events.iter().any(|e| e.endpoint.role == Role::Slave && e.revents & POLLIN != 0));
        assert!(events.iter().any(|e| e.endpoint.role == Role::Master && e.revents & POLLIN != 0));
        drop(slave);
    }
}
