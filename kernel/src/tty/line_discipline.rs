//! TTY Line Discipline Implementation
//!
//! Canonical-mode input processing for the pty master -> slave direction.
//! Bytes written by the master are fed in one at a time; the discipline
//! edits the line being assembled, produces echo through a callback, and
//! reports when the line must be committed, when end-of-file was typed, or
//! when a signal must be raised.
//!
//! Control characters are matched in a fixed priority order:
//! KILL, EOF, INTR, QUIT, REPRINT, ERASE, then CR, NL and ordinary bytes.
//! Raw mode never reaches this module; the pty pair appends raw bytes to
//! its inbound ring directly.

use alloc::vec::Vec;

use super::pty::ring::ByteRing;
use super::termios::Termios;
use crate::signal::constants::{SIGINT, SIGQUIT};

/// Maximum line buffer size for canonical mode
pub const MAX_CANON: usize = 255;

/// A c_cc entry holding this value never matches (POSIX _POSIX_VDISABLE)
const VDISABLE: u8 = 0;

/// Backspace, as used in erase rendering
const BS: u8 = 0x08;

/// What the pty pair must do after feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    /// A newline completed the line: commit it to the inbound ring
    Commit,
    /// EOF was typed: commit whatever is buffered and flag end-of-file
    Eof,
    /// INTR or QUIT was typed with ISIG on: raise this signal on the slave group
    Signal(u32),
}

/// Line discipline for the slave side of a pty
///
/// Owns the terminal settings and the line currently being edited.
pub struct LineDiscipline {
    /// Terminal attributes controlling behavior
    termios: Termios,

    /// Line buffer for canonical mode editing, never longer than MAX_CANON
    line_buffer: Vec<u8>,
}

impl LineDiscipline {
    /// Create a new line discipline with default termios settings
    pub fn new() -> Self {
        Self::with_termios(Termios::default())
    }

    /// Create a new line discipline with custom termios settings
    pub fn with_termios(termios: Termios) -> Self {
        Self {
            termios,
            line_buffer: Vec::with_capacity(MAX_CANON),
        }
    }

    /// Get a reference to the current termios settings
    pub fn termios(&self) -> &Termios {
        &self.termios
    }

    /// Get a mutable reference to the termios settings
    pub fn termios_mut(&mut self) -> &mut Termios {
        &mut self.termios
    }

    /// Set new termios settings
    ///
    /// The partially edited line survives a mode change; it is committed on
    /// the next newline if canonical mode is turned back on.
    pub fn set_termios(&mut self, termios: Termios) {
        self.termios = termios;
    }

    /// The uncommitted line
    pub fn line(&self) -> &[u8] {
        &self.line_buffer
    }

    /// Process one input character in canonical mode
    ///
    /// # Arguments
    /// * `c` - The input character to process
    /// * `echo_fn` - Callback receiving every echoed byte, in order
    ///
    /// # Returns
    /// The follow-up the caller must perform, if any.
    pub fn input_char(&mut self, c: u8, echo_fn: &mut dyn FnMut(u8)) -> Option<LineEvent> {
        let echo = self.termios.is_echo();

        if matches(self.termios.kill_char(), c) {
            self.handle_kill(echo_fn);
            return None;
        }

        if matches(self.termios.eof_char(), c) {
            if echo {
                echo_control_char(c, echo_fn);
                echo_fn(b'\n');
            }
            return Some(LineEvent::Eof);
        }

        if self.termios.is_sig() {
            if matches(self.termios.intr_char(), c) {
                return Some(self.handle_signal(c, SIGINT, echo_fn));
            }
            if matches(self.termios.quit_char(), c) {
                return Some(self.handle_signal(c, SIGQUIT, echo_fn));
            }
        }

        if matches(self.termios.reprint_char(), c) {
            if echo {
                echo_fn(b'\n');
                echo_fn(b'>');
                echo_fn(b' ');
                for &b in &self.line_buffer {
                    echo_visible(b, echo_fn);
                }
            }
            return None;
        }

        if matches(self.termios.erase_char(), c) {
            if let Some(deleted) = self.line_buffer.pop() {
                if echo {
                    echo_erase(deleted, echo_fn);
                }
            }
            return None;
        }

        // CR is dropped in canonical mode rather than mapped to NL
        if c == b'\r' {
            return None;
        }

        if c == b'\n' {
            if self.line_buffer.len() < MAX_CANON {
                self.line_buffer.push(c);
            }
            if echo || self.termios.is_echonl() {
                echo_fn(b'\n');
            }
            return Some(LineEvent::Commit);
        }

        if self.line_buffer.len() < MAX_CANON {
            self.line_buffer.push(c);
            if echo {
                echo_visible(c, echo_fn);
            }
        } else {
            log::trace!("ldisc: line full, dropping {:#04x}", c);
        }

        None
    }

    /// Move the assembled line into `ring`
    ///
    /// Bytes that do not fit in the ring's remaining space are dropped.
    /// Returns the number of bytes committed.
    pub fn commit(&mut self, ring: &mut ByteRing) -> usize {
        let written = ring.write(&self.line_buffer);
        if written < self.line_buffer.len() {
            log::debug!(
                "ldisc: inbound ring full, dropped {} of {} line bytes",
                self.line_buffer.len() - written,
                self.line_buffer.len()
            );
        }
        self.line_buffer.clear();
        written
    }

    /// Discard the uncommitted line without echo
    pub fn flush_input(&mut self) {
        self.line_buffer.clear();
    }

    /// Handle KILL - discard the line, erasing each character visually
    fn handle_kill(&mut self, echo_fn: &mut dyn FnMut(u8)) {
        if self.termios.is_echo() {
            while let Some(deleted) = self.line_buffer.pop() {
                echo_erase(deleted, echo_fn);
            }
        }
        self.line_buffer.clear();
    }

    /// Handle INTR/QUIT with ISIG on - discard the line and report the signal
    fn handle_signal(&mut self, c: u8, sig: u32, echo_fn: &mut dyn FnMut(u8)) -> LineEvent {
        self.line_buffer.clear();
        if self.termios.is_echo() {
            echo_control_char(c, echo_fn);
            echo_fn(b'\n');
        }
        LineEvent::Signal(sig)
    }
}

impl Default for LineDiscipline {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn matches(cc: u8, c: u8) -> bool {
    cc != VDISABLE && cc == c
}

/// Bytes rendered in caret notation (^X) and therefore two cells wide
#[inline]
pub fn is_control(c: u8) -> bool {
    (c < 0x20 && c != b'\t') || c == 0x7F
}

/// Echo a control character as ^X
fn echo_control_char(c: u8, echo_fn: &mut dyn FnMut(u8)) {
    echo_fn(b'^');
    echo_fn(c ^ 0x40);
}

/// Echo a byte the way it appears on screen
fn echo_visible(c: u8, echo_fn: &mut dyn FnMut(u8)) {
    if is_control(c) {
        echo_control_char(c, echo_fn);
    } else {
        echo_fn(c);
    }
}

/// Visually erase one buffered byte: one BS-space-BS per cell it occupies
fn echo_erase(deleted: u8, echo_fn: &mut dyn FnMut(u8)) {
    let cells = if is_control(deleted) { 2 } else { 1 };
    for _ in 0..cells {
        echo_fn(BS);
        echo_fn(b' ');
        echo_fn(BS);
    }
}
