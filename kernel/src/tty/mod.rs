//! TTY Subsystem
//!
//! Provides POSIX terminal semantics for pseudo-terminals:
//! - Terminal attributes (termios)
//! - Canonical line discipline (line editing, echo, signal characters)
//! - Pty pairs, their registry and endpoints
//! - The ioctl control plane

pub mod ioctl;
pub mod line_discipline;
pub mod pty;
pub mod termios;

pub use line_discipline::{LineDiscipline, LineEvent};
pub use termios::Termios;
