//! PTY pair (master/slave) implementation
//!
//! A `PtySlot` owns everything one pair needs: both rings, the line
//! discipline, the four wait queues, the window size and the lifecycle
//! flags. All of it sits behind a single lock. Blocking calls register on a
//! wait queue while holding that lock, release it, and only then ask the
//! scheduler to park the caller; after a wake they re-acquire and retry.
//!
//! Anything with an effect outside the slot (waking tasks, raising signals,
//! publishing readiness) is collected in a `Deferred` while the lock is held
//! and carried out after it is dropped.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use spin::Mutex;

use super::ring::{ByteRing, PTY_BUFFER_SIZE};
use super::wait::WaitQueue;
use super::{EndpointId, PtyDriver, PtyHandle, Role};
use crate::ipc::poll::{events, ReadinessEvent};
use crate::signal::constants::{signal_name, SIGHUP, SIGWINCH};
use crate::syscall::errno::{EACCES, EAGAIN, EINTR, EIO, ENOENT};
use crate::task::TaskId;
use crate::tty::ioctl::Winsize;
use crate::tty::line_discipline::{LineDiscipline, LineEvent};
use crate::tty::termios::Termios;

/// Which of the four per-pair wait queues a blocked task sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Queue {
    MasterRead,
    MasterWrite,
    SlaveRead,
    SlaveWrite,
}

/// Queues selected by TCFLSH
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTarget {
    /// Data the endpoint has not read yet
    Input,
    /// Data the endpoint wrote that its peer has not read yet
    Output,
    Both,
}

/// Work to perform once the slot lock is released
#[derive(Default)]
struct Deferred {
    signals: Vec<u32>,
    wake: Vec<TaskId>,
    events: Vec<ReadinessEvent>,
}

impl Deferred {
    fn run(&mut self, driver: &PtyDriver, pty: PtyHandle) {
        // Signals first so a reader woken below already sees them pending
        for sig in self.signals.drain(..) {
            log::debug!("PTY{}: raising {} on slave group", pty.index(), signal_name(sig));
            driver.signals.signal_slave_group(pty, sig);
        }
        for task in self.wake.drain(..) {
            driver.scheduler.unblock(task);
        }
        for event in self.events.drain(..) {
            driver.readiness.publish(event);
        }
    }
}

/// Lock-protected state of one pair
struct SlotState {
    /// Master -> slave (what the slave reads)
    inbound: ByteRing,

    /// Slave -> master (what the master reads, echo included)
    outbound: ByteRing,

    /// Canonical line editing and terminal attributes
    ldisc: LineDiscipline,

    master_readers: WaitQueue,
    master_writers: WaitQueue,
    slave_readers: WaitQueue,
    slave_writers: WaitQueue,

    winsize: Winsize,

    /// Slave opens are refused while set
    locked: bool,

    master_alive: bool,

    /// Number of live slave endpoints
    slave_opens: u32,

    /// Whether a slave was ever attached; before that the master is not hung up
    slave_ever_opened: bool,

    /// For each EOF the slave has not yet seen, the inbound bytes ahead of it
    eof_marks: VecDeque<usize>,

    /// Last readiness published for [master, slave]
    published: [i16; 2],
}

impl SlotState {
    fn new() -> Self {
        Self {
            inbound: ByteRing::new(),
            outbound: ByteRing::new(),
            ldisc: LineDiscipline::new(),
            master_readers: WaitQueue::new(),
            master_writers: WaitQueue::new(),
            slave_readers: WaitQueue::new(),
            slave_writers: WaitQueue::new(),
            winsize: Winsize::default_pty(),
            locked: true,
            master_alive: true,
            slave_opens: 0,
            slave_ever_opened: false,
            eof_marks: VecDeque::new(),
            published: [0; 2],
        }
    }

    fn queue(&mut self, queue: Queue) -> &mut WaitQueue {
        match queue {
            Queue::MasterRead => &mut self.master_readers,
            Queue::MasterWrite => &mut self.master_writers,
            Queue::SlaveRead => &mut self.slave_readers,
            Queue::SlaveWrite => &mut self.slave_writers,
        }
    }

    /// Every slave endpoint that was ever opened has since closed
    fn slave_hung_up(&self) -> bool {
        self.slave_ever_opened && self.slave_opens == 0
    }

    fn readiness(&self, role: Role) -> i16 {
        let mut revents = 0;
        match role {
            Role::Master => {
                let hup = self.slave_hung_up();
                if !self.outbound.is_empty() || hup {
                    revents |= events::POLLIN;
                }
                // Canonical input never blocks: the line is cut at commit time
                if self.ldisc.termios().is_canonical() || !self.inbound.is_full() {
                    revents |= events::POLLOUT;
                }
                if hup {
                    revents |= events::POLLHUP;
                }
            }
            Role::Slave => {
                if !self.inbound.is_empty() || !self.eof_marks.is_empty() || !self.master_alive {
                    revents |= events::POLLIN;
                }
                if self.master_alive && !self.outbound.is_full() {
                    revents |= events::POLLOUT;
                }
                if !self.master_alive {
                    revents |= events::POLLHUP;
                }
            }
        }
        revents
    }

    /// Queue a readiness event for every endpoint whose bits changed
    fn publish_readiness(&mut self, pty: PtyHandle, deferred: &mut Deferred) {
        for (i, role) in [Role::Master, Role::Slave].into_iter().enumerate() {
            let revents = self.readiness(role);
            if revents != self.published[i] {
                self.published[i] = revents;
                deferred.events.push(ReadinessEvent {
                    endpoint: EndpointId { handle: pty, role },
                    revents,
                });
            }
        }
    }

    /// Feed master bytes through the canonical line discipline
    ///
    /// Never blocks: echo that does not fit in the outbound ring and line
    /// bytes that do not fit in the inbound ring are dropped.
    fn canonical_input(&mut self, data: &[u8], deferred: &mut Deferred) {
        let SlotState {
            ldisc,
            inbound,
            outbound,
            eof_marks,
            master_readers,
            slave_readers,
            ..
        } = self;

        let mut echoed = false;
        let mut committed = false;

        for &byte in data {
            let event = ldisc.input_char(byte, &mut |e| echoed |= outbound.push(e));
            match event {
                Some(LineEvent::Commit) => {
                    ldisc.commit(inbound);
                    committed = true;
                }
                Some(LineEvent::Eof) => {
                    ldisc.commit(inbound);
                    if eof_marks.len() < PTY_BUFFER_SIZE {
                        eof_marks.push_back(inbound.len());
                    }
                    committed = true;
                }
                Some(LineEvent::Signal(sig)) => deferred.signals.push(sig),
                None => {}
            }
        }

        if echoed {
            deferred.wake.extend(master_readers.take_all());
        }
        if committed {
            deferred.wake.extend(slave_readers.take_all());
        }
    }
}

/// One pty pair
pub struct PtySlot {
    handle: PtyHandle,
    state: Mutex<SlotState>,
}

impl PtySlot {
    pub(super) fn new(handle: PtyHandle) -> Self {
        Self {
            handle,
            state: Mutex::new(SlotState::new()),
        }
    }

    pub fn handle(&self) -> PtyHandle {
        self.handle
    }

    /// PTY number (the NNN in /dev/pts/NNN)
    pub fn number(&self) -> u32 {
        self.handle.index() as u32
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Count a new slave endpoint against this pair
    pub(super) fn attach_slave(&self, driver: &PtyDriver) -> Result<(), i32> {
        let mut deferred = Deferred::default();
        let mut st = self.state.lock();
        if !st.master_alive {
            return Err(ENOENT);
        }
        if st.locked {
            return Err(EACCES);
        }
        st.slave_opens += 1;
        st.slave_ever_opened = true;
        st.publish_readiness(self.handle, &mut deferred);
        drop(st);
        deferred.run(driver, self.handle);
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    /// Lock or unlock the slave side (unlockpt / TIOCSPTLCK)
    pub fn set_locked(&self, locked: bool) {
        self.state.lock().locked = locked;
        log::debug!("PTY{}: slave {}", self.number(), if locked { "locked" } else { "unlocked" });
    }

    pub fn is_master_alive(&self) -> bool {
        self.state.lock().master_alive
    }

    pub fn slave_open_count(&self) -> u32 {
        self.state.lock().slave_opens
    }

    /// Detach the master; returns true when the slot can be reclaimed
    pub(super) fn close_master(&self, driver: &PtyDriver) -> bool {
        let mut deferred = Deferred::default();
        let mut st = self.state.lock();
        st.master_alive = false;

        let reclaim = st.slave_opens == 0;
        if !reclaim {
            let readers = st.slave_readers.take_all();
            let writers = st.slave_writers.take_all();
            deferred.wake.extend(readers);
            deferred.wake.extend(writers);
            deferred.signals.push(SIGHUP);
            st.publish_readiness(self.handle, &mut deferred);
        }
        drop(st);

        deferred.run(driver, self.handle);
        reclaim
    }

    /// Detach one slave endpoint; returns true when the slot can be reclaimed
    pub(super) fn close_slave(&self, driver: &PtyDriver) -> bool {
        let mut deferred = Deferred::default();
        let mut st = self.state.lock();
        st.slave_opens = st.slave_opens.saturating_sub(1);

        let mut reclaim = false;
        if st.slave_opens == 0 {
            if st.master_alive {
                let readers = st.master_readers.take_all();
                let writers = st.master_writers.take_all();
                deferred.wake.extend(readers);
                deferred.wake.extend(writers);
                st.publish_readiness(self.handle, &mut deferred);
            } else {
                reclaim = true;
            }
        }
        drop(st);

        deferred.run(driver, self.handle);
        reclaim
    }

    /// Raise SIGHUP on the slave group without closing anything (TIOCVHANGUP)
    pub fn hangup(&self, driver: &PtyDriver) {
        let mut deferred = Deferred::default();
        deferred.signals.push(SIGHUP);
        deferred.run(driver, self.handle);
    }

    /// Publish the current readiness of both endpoints
    pub(super) fn refresh_readiness(&self, driver: &PtyDriver) {
        let mut deferred = Deferred::default();
        self.state.lock().publish_readiness(self.handle, &mut deferred);
        deferred.run(driver, self.handle);
    }

    // =========================================================================
    // Data paths
    // =========================================================================

    /// Run `attempt` under the slot lock until it produces a result
    ///
    /// `attempt` returns `None` when the caller would have to wait. Blocking
    /// callers then park on `queue`; a wake caused by a pending signal ends
    /// the call with EINTR.
    fn run_blocking<T>(
        &self,
        driver: &PtyDriver,
        queue: Queue,
        nonblocking: bool,
        mut attempt: impl FnMut(&mut SlotState, &mut Deferred) -> Option<Result<T, i32>>,
    ) -> Result<T, i32> {
        let me = driver.scheduler.current_task();
        let mut deferred = Deferred::default();
        let mut slept = false;

        loop {
            let mut st = self.state.lock();
            st.queue(queue).remove(me);

            let outcome = if slept && driver.scheduler.signal_pending(me) {
                Some(Err(EINTR))
            } else {
                match attempt(&mut st, &mut deferred) {
                    None if nonblocking => Some(Err(EAGAIN)),
                    outcome => outcome,
                }
            };

            if outcome.is_none() {
                st.queue(queue).register(me);
            }
            st.publish_readiness(self.handle, &mut deferred);
            drop(st);
            deferred.run(driver, self.handle);

            match outcome {
                Some(result) => return result,
                None => {
                    log::trace!("PTY{}: task {} blocking on {:?}", self.number(), me, queue);
                    driver.scheduler.block_current();
                    slept = true;
                }
            }
        }
    }

    /// Write data from the master (becomes slave input)
    ///
    /// Canonical mode runs every byte through the line discipline and never
    /// blocks. Raw mode appends straight to the inbound ring, echoing each
    /// accepted byte when ECHO is set, and blocks while the ring is full.
    pub fn master_write(&self, driver: &PtyDriver, data: &[u8], nonblocking: bool) -> Result<usize, i32> {
        if data.is_empty() {
            return Ok(0);
        }

        {
            let mut deferred = Deferred::default();
            let mut st = self.state.lock();
            if st.ldisc.termios().is_canonical() {
                st.canonical_input(data, &mut deferred);
                st.publish_readiness(self.handle, &mut deferred);
                drop(st);
                deferred.run(driver, self.handle);
                return Ok(data.len());
            }
        }

        let mut written = 0;
        self.run_blocking(driver, Queue::MasterWrite, nonblocking, |st, deferred| {
            let n = st.inbound.write(&data[written..]);
            if n > 0 {
                if st.ldisc.termios().is_echo() {
                    let echoed = st.outbound.write(&data[written..written + n]);
                    if echoed > 0 {
                        deferred.wake.extend(st.master_readers.take_all());
                    }
                }
                written += n;
                deferred.wake.extend(st.slave_readers.take_all());
            }

            if written == data.len() {
                Some(Ok(written))
            } else if st.slave_hung_up() {
                Some(Err(EIO))
            } else {
                None
            }
        })
    }

    /// Read data at the master (slave output and echo)
    ///
    /// Returns Ok(0) once the slave side has hung up and nothing is left.
    pub fn master_read(&self, driver: &PtyDriver, buf: &mut [u8], nonblocking: bool) -> Result<usize, i32> {
        if buf.is_empty() {
            return Ok(0);
        }

        self.run_blocking(driver, Queue::MasterRead, nonblocking, |st, deferred| {
            let n = st.outbound.read(buf);
            if n > 0 {
                deferred.wake.extend(st.slave_writers.take_all());
                Some(Ok(n))
            } else if st.slave_hung_up() {
                Some(Ok(0))
            } else {
                None
            }
        })
    }

    /// Write data from the slave (becomes master input)
    ///
    /// Fails with EIO once the master is gone.
    pub fn slave_write(&self, driver: &PtyDriver, data: &[u8], nonblocking: bool) -> Result<usize, i32> {
        if data.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        self.run_blocking(driver, Queue::SlaveWrite, nonblocking, |st, deferred| {
            if !st.master_alive {
                return Some(Err(EIO));
            }
            let n = st.outbound.write(&data[written..]);
            if n > 0 {
                written += n;
                deferred.wake.extend(st.master_readers.take_all());
            }
            if written == data.len() {
                Some(Ok(written))
            } else {
                None
            }
        })
    }

    /// Read data at the slave (committed lines, or raw bytes)
    ///
    /// Each EOF yields exactly one Ok(0) at the point in the stream where it
    /// was typed; a read never crosses an EOF. Every read after the master
    /// has gone and the ring is drained also yields Ok(0).
    pub fn slave_read(&self, driver: &PtyDriver, buf: &mut [u8], nonblocking: bool) -> Result<usize, i32> {
        if buf.is_empty() {
            return Ok(0);
        }

        self.run_blocking(driver, Queue::SlaveRead, nonblocking, |st, deferred| {
            if st.eof_marks.front() == Some(&0) {
                st.eof_marks.pop_front();
                return Some(Ok(0));
            }

            let limit = st.eof_marks.front().map_or(buf.len(), |&ahead| ahead.min(buf.len()));
            let n = st.inbound.read(&mut buf[..limit]);
            if n > 0 {
                st.eof_marks.iter_mut().for_each(|ahead| *ahead -= n);
                deferred.wake.extend(st.master_writers.take_all());
                Some(Ok(n))
            } else if !st.master_alive {
                Some(Ok(0))
            } else {
                None
            }
        })
    }

    // =========================================================================
    // Control state
    // =========================================================================

    pub fn termios(&self) -> Termios {
        *self.state.lock().ldisc.termios()
    }

    /// Replace the terminal attributes; TCSETS, TCSETSW and TCSETSF all land here
    pub fn set_termios(&self, driver: &PtyDriver, termios: Termios) {
        let mut deferred = Deferred::default();
        let mut st = self.state.lock();
        st.ldisc.set_termios(termios);
        st.publish_readiness(self.handle, &mut deferred);
        drop(st);
        deferred.run(driver, self.handle);
        log::debug!("PTY{}: termios set - lflag={:#x}", self.number(), termios.c_lflag);
    }

    pub fn winsize(&self) -> Winsize {
        self.state.lock().winsize
    }

    /// Store a new window size, raising SIGWINCH on the slave group if it changed
    pub fn set_winsize(&self, driver: &PtyDriver, winsize: Winsize) {
        let mut st = self.state.lock();
        let changed = st.winsize != winsize;
        st.winsize = winsize;
        drop(st);

        if changed {
            let mut deferred = Deferred::default();
            deferred.signals.push(SIGWINCH);
            deferred.run(driver, self.handle);
        }
    }

    /// Discard buffered data as seen from `role` (TCFLSH)
    pub fn flush(&self, driver: &PtyDriver, role: Role, target: FlushTarget) {
        let mut deferred = Deferred::default();
        let mut st = self.state.lock();

        let input = matches!(target, FlushTarget::Input | FlushTarget::Both);
        let output = matches!(target, FlushTarget::Output | FlushTarget::Both);

        let (flush_inbound, flush_outbound) = match role {
            Role::Master => (output, input),
            Role::Slave => (input, output),
        };

        if flush_inbound {
            st.inbound.clear();
            st.eof_marks.clear();
            if role == Role::Slave {
                st.ldisc.flush_input();
            }
            let writers = st.master_writers.take_all();
            deferred.wake.extend(writers);
        }
        if flush_outbound {
            st.outbound.clear();
            let writers = st.slave_writers.take_all();
            deferred.wake.extend(writers);
        }

        st.publish_readiness(self.handle, &mut deferred);
        drop(st);
        deferred.run(driver, self.handle);
    }

    /// Bytes `role` could read right now (FIONREAD)
    pub fn readable(&self, role: Role) -> usize {
        let st = self.state.lock();
        match role {
            Role::Master => st.outbound.len(),
            Role::Slave => st.inbound.len(),
        }
    }

    /// Current poll bits for `role`
    pub fn poll(&self, role: Role) -> i16 {
        self.state.lock().readiness(role)
    }
}
