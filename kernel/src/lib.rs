//! Pseudo-terminal driver
//!
//! Master/slave terminal pairs for a monolithic kernel: the `/dev/ptmx` and
//! `/dev/pts/NNN` name space, bounded ring buffers with blocking and
//! non-blocking flow control, the canonical line discipline, signal fan-out
//! to the tasks holding a slave open, the ioctl control plane, and readiness
//! publication for poll.
//!
//! The embedding kernel supplies the scheduler, signal delivery and the
//! readiness consumer through the traits in `task`, `tty::pty::signal` and
//! `ipc::poll`, then installs the driver with `tty::pty::init`.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod fs;
pub mod ipc;
pub mod signal;
pub mod syscall;
pub mod task;
pub mod tty;
