//! POSIX errno values
//!
//! Error codes returned by the pty driver to the filesystem dispatch layer.

/// Operation not permitted
pub const EPERM: i32 = 1;

/// No such file or directory
pub const ENOENT: i32 = 2;

/// Interrupted system call
pub const EINTR: i32 = 4;

/// I/O error
pub const EIO: i32 = 5;

/// Resource temporarily unavailable (would block)
pub const EAGAIN: i32 = 11;

/// Permission denied
pub const EACCES: i32 = 13;

/// Bad address
pub const EFAULT: i32 = 14;

/// Device or resource busy
pub const EBUSY: i32 = 16;

/// No such device
pub const ENODEV: i32 = 19;

/// Invalid argument
pub const EINVAL: i32 = 22;

/// Not a typewriter (inappropriate ioctl for device)
pub const ENOTTY: i32 = 25;

/// No space left on device
pub const ENOSPC: i32 = 28;

/// Result too large / buffer too small
pub const ERANGE: i32 = 34;
