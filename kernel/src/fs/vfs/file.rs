//! VFS Open File Representation

use core::any::Any;

use crate::syscall::errno::EINVAL;

/// Open file flags (POSIX O_* flags) relevant to character devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// File is open for reading
    pub read: bool,
    /// File is open for writing
    pub write: bool,
    /// Reads and writes return EAGAIN instead of blocking
    pub nonblock: bool,
}

impl OpenFlags {
    /// O_RDONLY - Open for reading only
    pub const O_RDONLY: u32 = 0;
    /// O_WRONLY - Open for writing only
    pub const O_WRONLY: u32 = 1;
    /// O_RDWR - Open for reading and writing
    pub const O_RDWR: u32 = 2;
    /// Access mode mask
    pub const O_ACCMODE: u32 = 0x3;
    /// O_NONBLOCK - Non-blocking I/O
    pub const O_NONBLOCK: u32 = 0x800;

    /// Parse POSIX open flags; EINVAL for an access mode of 3
    pub fn from_flags(flags: u32) -> Result<Self, i32> {
        let access_mode = flags & Self::O_ACCMODE;
        if access_mode == Self::O_ACCMODE {
            return Err(EINVAL);
        }

        Ok(Self {
            read: access_mode == Self::O_RDONLY || access_mode == Self::O_RDWR,
            write: access_mode == Self::O_WRONLY || access_mode == Self::O_RDWR,
            nonblock: (flags & Self::O_NONBLOCK) != 0,
        })
    }

    /// Convert OpenFlags back to POSIX flags
    pub fn to_flags(&self) -> u32 {
        let mut flags = if self.read && self.write {
            Self::O_RDWR
        } else if self.write {
            Self::O_WRONLY
        } else {
            Self::O_RDONLY
        };

        if self.nonblock {
            flags |= Self::O_NONBLOCK;
        }

        flags
    }
}

/// Operations the dispatch layer performs on an open file
pub trait FileOperations: Send + Sync {
    fn read(&self, buf: &mut [u8]) -> Result<usize, i32>;

    fn write(&self, buf: &[u8]) -> Result<usize, i32>;

    /// Device control; unknown requests fail with ENOTTY
    fn ioctl(&self, request: u64, arg: u64) -> Result<i64, i32>;

    /// Current POLLIN / POLLOUT / POLLHUP bits
    fn poll(&self) -> i16;

    /// Concrete type access, used to recognise files of a given driver
    fn as_any(&self) -> &dyn Any;
}
