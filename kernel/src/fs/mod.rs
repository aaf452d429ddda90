//! Filesystem layer
//!
//! Only the pieces the pty driver needs: the per-file operations contract
//! and the devpts name space.

pub mod devptsfs;
pub mod vfs;
