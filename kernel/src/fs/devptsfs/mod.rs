//! DevPTS Filesystem (devpts)
//!
//! Name resolution for the pty device nodes. Nothing here is stored; every
//! node is derived from the driver's registry when it is looked up.
//!
//! # Supported Entries
//!
//! - `/dev/ptmx` - Opening it allocates a new pair and returns the master
//! - `/dev/pts/000` - Slave of pair 0 (once allocated and unlocked)
//! - `/dev/pts/001` - Slave of pair 1, etc.
//!
//! Slave names always carry exactly three zero-padded digits.
//!
//! # Architecture
//!
//! ```text
//! open("/dev/pts/000")
//!         |
//!         v
//!     parse_name("pts/000") -> Slave(0)
//!         |
//!         v
//!     PtyDriver::open_slave(0): exists? master alive? unlocked?
//!         |
//!         v
//!     PtyEndpoint (slave)
//! ```

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::syscall::errno::ENOENT;
use crate::tty::pty::{PtyDriver, PtyEndpoint};

/// Name of the pair-creation node
pub const PTMX_NAME: &str = "ptmx";

/// Directory holding the slave nodes
pub const PTS_DIR: &str = "pts";

/// Digits in a slave node name
const PTS_NAME_DIGITS: usize = 3;

/// Base inode for slave nodes, clear of other filesystems' inodes
const PTY_INODE_BASE: u64 = 0x10000;

/// PTY slaves use major number 136 (standard Unix/Linux convention)
const PTY_SLAVE_MAJOR: u32 = 136;

/// A resolved devpts name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevptsNode {
    Ptmx,
    Slave(u32),
}

/// Directory entry for /dev/pts listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtsEntry {
    /// PTY number (0, 1, 2, ...)
    pub pty_num: u32,
    /// Inode number for stat
    pub inode: u64,
}

impl PtsEntry {
    /// Entry name inside /dev/pts, e.g. "000"
    pub fn name(&self) -> String {
        alloc::format!("{:03}", self.pty_num)
    }
}

/// Resolve a name relative to /dev ("ptmx", "pts/003"); a leading "/dev/" is accepted
pub fn parse_name(name: &str) -> Result<DevptsNode, i32> {
    let name = name.strip_prefix("/dev/").unwrap_or(name);

    if name == PTMX_NAME {
        return Ok(DevptsNode::Ptmx);
    }

    let digits = name
        .strip_prefix(PTS_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or(ENOENT)?;

    if digits.len() != PTS_NAME_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ENOENT);
    }

    digits.parse().map(DevptsNode::Slave).map_err(|_| ENOENT)
}

/// Open a devpts node: a new master for ptmx, an existing pair's slave otherwise
pub fn open(driver: &Arc<PtyDriver>, name: &str, flags: u32) -> Result<PtyEndpoint, i32> {
    match parse_name(name)? {
        DevptsNode::Ptmx => driver.create_pair(flags),
        DevptsNode::Slave(pty_num) => driver.open_slave(pty_num, flags),
    }
}

/// Slave node name relative to /dev, e.g. "pts/000"
pub fn slave_name(pty_num: u32) -> String {
    alloc::format!("{}/{:03}", PTS_DIR, pty_num)
}

/// Absolute slave path, e.g. "/dev/pts/000"
pub fn slave_path(pty_num: u32) -> String {
    alloc::format!("/dev/{}", slave_name(pty_num))
}

/// Look up a slave by number
///
/// Returns the number if the pair exists, its master is open and it has
/// been unlocked.
pub fn lookup(driver: &PtyDriver, pty_num: u32) -> Option<u32> {
    let slot = driver.registry().lookup(pty_num)?;
    if slot.is_locked() || !slot.is_master_alive() {
        return None;
    }
    Some(pty_num)
}

/// Look up a PTY slave by inode number
pub fn lookup_by_inode(driver: &PtyDriver, inode: u64) -> Option<u32> {
    let pty_num = u32::try_from(inode.checked_sub(PTY_INODE_BASE)?).ok()?;
    lookup(driver, pty_num)
}

/// Get inode number for a PTY slave
pub fn get_inode(pty_num: u32) -> u64 {
    PTY_INODE_BASE + pty_num as u64
}

/// List the slave nodes that can currently be opened
pub fn list_entries(driver: &PtyDriver) -> Vec<PtsEntry> {
    driver
        .registry()
        .list_active()
        .into_iter()
        .filter_map(|pty_num| lookup(driver, pty_num))
        .map(|pty_num| PtsEntry {
            pty_num,
            inode: get_inode(pty_num),
        })
        .collect()
}

/// List all PTY slave names (for directory listing)
pub fn list_names(driver: &PtyDriver) -> Vec<String> {
    list_entries(driver).into_iter().map(|e| e.name()).collect()
}

/// Device numbers (major, minor) of a PTY slave; minor is the PTY number
pub fn get_device_numbers(pty_num: u32) -> (u32, u32) {
    (PTY_SLAVE_MAJOR, pty_num)
}

/// Combined device number for stat st_rdev
///
/// Uses the Linux `new_encode_dev` layout: the low minor byte, then 12 bits
/// of major, then the rest of the minor. Minors below 256 keep the classic
/// `major << 8 | minor` value.
pub fn get_rdev(pty_num: u32) -> u64 {
    let (major, minor) = get_device_numbers(pty_num);
    let (major, minor) = (major as u64, minor as u64);
    (minor & 0xff) | ((major & 0xfff) << 8) | ((minor & !0xff) << 12)
}
