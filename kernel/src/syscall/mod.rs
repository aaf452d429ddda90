//! Syscall-boundary helpers shared by the pty control plane

pub mod errno;
pub mod userptr;
