//! Virtual File System (VFS) contract
//!
//! The generic dispatch layer owns descriptors and path lookup. Drivers in
//! this crate only implement the per-file operations it calls into.
//!
//! ```text
//! System Calls (open, read, write, ioctl, poll)
//!         |
//!         v
//!     VFS dispatch (embedding kernel)
//!         |
//!         v
//!     FileOperations (pty endpoints)
//! ```

pub mod file;

pub use file::{FileOperations, OpenFlags};
