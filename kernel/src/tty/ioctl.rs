//! PTY ioctl request codes and handlers
//!
//! This module implements the control plane of pty endpoints:
//! - TCGETS/TCSETS/TCSETSW/TCSETSF: Get/set terminal attributes (termios)
//! - TIOCGWINSZ/TIOCSWINSZ: Get/set window size
//! - TIOCGPTN/TIOCSPTLCK: Slave number and lock (ptsname/unlockpt)
//! - TIOCVHANGUP: Hang up the slave group (master only)
//! - TCFLSH/FIONREAD: Flush queues, count readable bytes
//!
//! Every request checks the endpoint's access mode before touching the pair:
//! requests that report state need read access, requests that change it need
//! write access, and master-only requests fail with EACCES on a slave.

use super::pty::{FlushTarget, PtyEndpoint, PtySlot};
use super::termios::Termios;
use crate::syscall::errno::{EACCES, EINVAL, ENOTTY, ERANGE};
use crate::syscall::userptr::{copy_bytes_to_user, copy_from_user, copy_to_user};

// =============================================================================
// ioctl Request Codes (matching Linux values)
// =============================================================================

/// Get termios structure
pub const TCGETS: u64 = 0x5401;

/// Set termios structure immediately
pub const TCSETS: u64 = 0x5402;

/// Set termios structure after draining output
pub const TCSETSW: u64 = 0x5403;

/// Set termios structure after flushing input and draining output
pub const TCSETSF: u64 = 0x5404;

/// Flush input and/or output queues (argument is a value, not a pointer)
pub const TCFLSH: u64 = 0x540B;

/// Get window size
pub const TIOCGWINSZ: u64 = 0x5413;

/// Set window size
pub const TIOCSWINSZ: u64 = 0x5414;

/// Number of bytes available to read
pub const FIONREAD: u64 = 0x541B;

/// Hang up the slave side
pub const TIOCVHANGUP: u64 = 0x5437;

/// Get pty number (_IOR('T', 0x30, unsigned int))
pub const TIOCGPTN: u64 = 0x8004_5430;

/// Lock/unlock the slave (_IOW('T', 0x31, int))
pub const TIOCSPTLCK: u64 = 0x4004_5431;

/// TCFLSH selectors
pub const TCIFLUSH: u64 = 0;
pub const TCOFLUSH: u64 = 1;
pub const TCIOFLUSH: u64 = 2;

// =============================================================================
// Window Size Structure
// =============================================================================

/// Terminal window size (for TIOCGWINSZ/TIOCSWINSZ)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Winsize {
    /// Number of rows
    pub ws_row: u16,
    /// Number of columns
    pub ws_col: u16,
    /// Horizontal size in pixels (unused)
    pub ws_xpixel: u16,
    /// Vertical size in pixels (unused)
    pub ws_ypixel: u16,
}

impl Winsize {
    /// Size a new pair starts with: 80 columns by 25 rows
    pub const fn default_pty() -> Self {
        Self {
            ws_row: 25,
            ws_col: 80,
            ws_xpixel: 0,
            ws_ypixel: 0,
        }
    }
}

// =============================================================================
// Permission checks
// =============================================================================

fn require_read(ep: &PtyEndpoint) -> Result<(), i32> {
    if ep.flags().read {
        Ok(())
    } else {
        Err(EACCES)
    }
}

fn require_write(ep: &PtyEndpoint) -> Result<(), i32> {
    if ep.flags().write {
        Ok(())
    } else {
        Err(EACCES)
    }
}

fn require_master(ep: &PtyEndpoint) -> Result<(), i32> {
    if ep.is_master() {
        Ok(())
    } else {
        Err(EACCES)
    }
}

// =============================================================================
// ioctl Handler Functions
// =============================================================================

/// Handle TCGETS - copy the pair's termios out to userspace
pub fn handle_tcgets(ep: &PtyEndpoint, slot: &PtySlot, arg: u64) -> Result<(), i32> {
    require_read(ep)?;
    copy_to_user(arg as *mut Termios, &slot.termios())
}

/// Handle TCSETS/TCSETSW/TCSETSF - apply a termios record from userspace
///
/// Output is never held back and input is not flushed, so the three set
/// variants behave identically.
pub fn handle_tcsets(ep: &PtyEndpoint, slot: &PtySlot, arg: u64) -> Result<(), i32> {
    require_write(ep)?;
    let termios: Termios = copy_from_user(arg as *const Termios)?;
    slot.set_termios(ep.driver(), termios);
    Ok(())
}

/// Handle TIOCGWINSZ - copy the stored window size out
pub fn handle_tiocgwinsz(ep: &PtyEndpoint, slot: &PtySlot, arg: u64) -> Result<(), i32> {
    require_read(ep)?;
    copy_to_user(arg as *mut Winsize, &slot.winsize())
}

/// Handle TIOCSWINSZ - store a new window size (SIGWINCH if it changed)
pub fn handle_tiocswinsz(ep: &PtyEndpoint, slot: &PtySlot, arg: u64) -> Result<(), i32> {
    require_write(ep)?;
    let winsize: Winsize = copy_from_user(arg as *const Winsize)?;
    slot.set_winsize(ep.driver(), winsize);
    log::debug!(
        "PTY{}: window size {}x{}",
        slot.number(),
        winsize.ws_col,
        winsize.ws_row
    );
    Ok(())
}

/// Handle TIOCGPTN - report the pty number
pub fn handle_tiocgptn(ep: &PtyEndpoint, slot: &PtySlot, arg: u64) -> Result<(), i32> {
    require_read(ep)?;
    copy_to_user(arg as *mut u32, &slot.number())
}

/// Handle TIOCSPTLCK - lock (non-zero) or unlock (zero) the slave
pub fn handle_tiocsptlck(ep: &PtyEndpoint, slot: &PtySlot, arg: u64) -> Result<(), i32> {
    require_master(ep)?;
    let lock: i32 = copy_from_user(arg as *const i32)?;
    slot.set_locked(lock != 0);
    Ok(())
}

/// Handle TIOCVHANGUP - raise SIGHUP on every task holding the slave open
pub fn handle_tiocvhangup(ep: &PtyEndpoint, slot: &PtySlot) -> Result<(), i32> {
    require_master(ep)?;
    slot.hangup(ep.driver());
    Ok(())
}

/// Handle TCFLSH - discard queued data
pub fn handle_tcflsh(ep: &PtyEndpoint, slot: &PtySlot, arg: u64) -> Result<(), i32> {
    require_write(ep)?;
    let target = match arg {
        TCIFLUSH => FlushTarget::Input,
        TCOFLUSH => FlushTarget::Output,
        TCIOFLUSH => FlushTarget::Both,
        _ => return Err(EINVAL),
    };
    slot.flush(ep.driver(), ep.role(), target);
    Ok(())
}

/// Handle FIONREAD - bytes this endpoint could read without blocking
pub fn handle_fionread(ep: &PtyEndpoint, slot: &PtySlot, arg: u64) -> Result<(), i32> {
    require_read(ep)?;
    let avail = i32::try_from(slot.readable(ep.role())).unwrap_or(i32::MAX);
    copy_to_user(arg as *mut i32, &avail)
}

/// Copy the NUL-terminated slave path into a user buffer (ptsname_r)
///
/// ERANGE if `buflen` cannot hold the path and its terminator.
pub fn ptsname(ep: &PtyEndpoint, buf: u64, buflen: usize) -> Result<usize, i32> {
    require_read(ep)?;
    ep.slot()?;

    let mut path = ep.slave_path().into_bytes();
    path.push(0);
    if path.len() > buflen {
        return Err(ERANGE);
    }

    copy_bytes_to_user(buf, &path)?;
    Ok(path.len() - 1)
}

/// Dispatch a pty ioctl request to the appropriate handler
///
/// # Arguments
/// * `ep` - The endpoint the request was issued on
/// * `request` - The ioctl request code
/// * `arg` - The argument (typically a pointer to a structure)
///
/// # Returns
/// * `Ok(0)` on success
/// * `Err(errno)` on failure
pub fn pty_ioctl(ep: &PtyEndpoint, request: u64, arg: u64) -> Result<i64, i32> {
    let slot = ep.slot()?;

    match request {
        TCGETS => handle_tcgets(ep, &slot, arg)?,
        TCSETS | TCSETSW | TCSETSF => handle_tcsets(ep, &slot, arg)?,
        TIOCGWINSZ => handle_tiocgwinsz(ep, &slot, arg)?,
        TIOCSWINSZ => handle_tiocswinsz(ep, &slot, arg)?,
        TIOCGPTN => handle_tiocgptn(ep, &slot, arg)?,
        TIOCSPTLCK => handle_tiocsptlck(ep, &slot, arg)?,
        TIOCVHANGUP => handle_tiocvhangup(ep, &slot)?,
        TCFLSH => handle_tcflsh(ep, &slot, arg)?,
        FIONREAD => handle_fionread(ep, &slot, arg)?,
        _ => {
            log::warn!("PTY{}: Unknown ioctl request {:#x}", slot.number(), request);
            return Err(ENOTTY);
        }
    }

    Ok(0)
}
