//! POSIX termios structure and constants
//!
//! The pty driver stores one `Termios` per pair and copies it in and out
//! through the control plane verbatim. Only the control-character table and
//! four local-mode flags (ICANON, ISIG, ECHO, ECHONL) are consulted by the
//! line discipline; every other field is carried opaquely.

use core::default::Default;

/// Number of control characters in the c_cc array
pub const NCCS: usize = 32;

// =============================================================================
// Input Flags (c_iflag)
// =============================================================================

/// Ignore CR on input
pub const IGNCR: u32 = 0o000200;

/// Map CR to NL on input (unless IGNCR is set)
pub const ICRNL: u32 = 0o000400;

/// Enable XON/XOFF flow control on output
pub const IXON: u32 = 0o002000;

// =============================================================================
// Output Flags (c_oflag)
// =============================================================================

/// Enable output processing
pub const OPOST: u32 = 0o000001;

/// Map NL to CR-NL on output
pub const ONLCR: u32 = 0o000004;

// =============================================================================
// Control Flags (c_cflag)
// =============================================================================

/// 8 bits per character
pub const CS8: u32 = 0o000060;

/// Enable receiver
pub const CREAD: u32 = 0o000200;

// =============================================================================
// Local Flags (c_lflag)
// =============================================================================

/// Enable signals (INTR, QUIT)
pub const ISIG: u32 = 0o000001;

/// Canonical mode (line-by-line input)
pub const ICANON: u32 = 0o000002;

/// Enable echo
pub const ECHO: u32 = 0o000010;

/// Echo ERASE as backspace-space-backspace
pub const ECHOE: u32 = 0o000020;

/// Echo KILL by erasing each character on the line
pub const ECHOK: u32 = 0o000040;

/// Echo NL even if ECHO is not set
pub const ECHONL: u32 = 0o000100;

/// Enable implementation-defined input processing
pub const IEXTEN: u32 = 0o100000;

// =============================================================================
// Control Character Indices (c_cc)
// =============================================================================

/// Interrupt character (SIGINT) - typically Ctrl+C
pub const VINTR: usize = 0;

/// Quit character (SIGQUIT) - typically Ctrl+\
pub const VQUIT: usize = 1;

/// Erase character - Ctrl+H on this driver
pub const VERASE: usize = 2;

/// Kill line character - typically Ctrl+U
pub const VKILL: usize = 3;

/// End of file character - typically Ctrl+D
pub const VEOF: usize = 4;

/// Timeout in deciseconds for non-canonical read (stored, not interpreted)
pub const VTIME: usize = 5;

/// Minimum number of characters for non-canonical read (stored, not interpreted)
pub const VMIN: usize = 6;

/// Start character for XON/XOFF - typically Ctrl+Q
pub const VSTART: usize = 8;

/// Stop character for XON/XOFF - typically Ctrl+S
pub const VSTOP: usize = 9;

/// Suspend character - typically Ctrl+Z
pub const VSUSP: usize = 10;

/// Reprint line character - typically Ctrl+R
pub const VREPRINT: usize = 12;

/// Word erase character - typically Ctrl+W
pub const VWERASE: usize = 14;

/// Literal next character - typically Ctrl+V
pub const VLNEXT: usize = 15;

// =============================================================================
// Default Control Character Values
// =============================================================================

/// Ctrl+C (ETX)
pub const CTRL_C: u8 = 0x03;

/// Ctrl+\ (FS)
pub const CTRL_BACKSLASH: u8 = 0x1C;

/// Ctrl+H (BS)
pub const CTRL_H: u8 = 0x08;

/// Ctrl+U (NAK)
pub const CTRL_U: u8 = 0x15;

/// Ctrl+D (EOT)
pub const CTRL_D: u8 = 0x04;

/// Ctrl+R (DC2)
pub const CTRL_R: u8 = 0x12;

/// Ctrl+Z (SUB)
const CTRL_Z: u8 = 0x1A;

/// Ctrl+Q (DC1/XON)
const CTRL_Q: u8 = 0x11;

/// Ctrl+S (DC3/XOFF)
const CTRL_S: u8 = 0x13;

/// Ctrl+V (SYN)
const CTRL_V: u8 = 0x16;

/// Ctrl+W (ETB)
const CTRL_W: u8 = 0x17;

// =============================================================================
// Termios Structure
// =============================================================================

/// Terminal I/O settings structure
///
/// Layout matches the Linux `struct termios` used by TCGETS/TCSETS so the
/// record can be exchanged with userspace without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Termios {
    /// Input mode flags
    pub c_iflag: u32,

    /// Output mode flags
    pub c_oflag: u32,

    /// Control mode flags
    pub c_cflag: u32,

    /// Local mode flags
    pub c_lflag: u32,

    /// Line discipline (0 for N_TTY)
    pub c_line: u8,

    /// Control characters array
    pub c_cc: [u8; NCCS],

    /// Input baud rate
    pub c_ispeed: u32,

    /// Output baud rate
    pub c_ospeed: u32,
}

impl Default for Termios {
    /// Settings a freshly created pty pair starts with:
    /// canonical mode, signal generation, echo and echo-newline all on.
    fn default() -> Self {
        let mut c_cc = [0u8; NCCS];

        c_cc[VINTR] = CTRL_C;
        c_cc[VQUIT] = CTRL_BACKSLASH;
        c_cc[VERASE] = CTRL_H;
        c_cc[VKILL] = CTRL_U;
        c_cc[VEOF] = CTRL_D;
        c_cc[VTIME] = 0;
        c_cc[VMIN] = 1;
        c_cc[VSTART] = CTRL_Q;
        c_cc[VSTOP] = CTRL_S;
        c_cc[VSUSP] = CTRL_Z;
        c_cc[VREPRINT] = CTRL_R;
        c_cc[VWERASE] = CTRL_W;
        c_cc[VLNEXT] = CTRL_V;

        Self {
            c_iflag: 0,
            c_oflag: OPOST | ONLCR,
            c_cflag: CS8 | CREAD,
            c_lflag: ICANON | ISIG | ECHO | ECHONL,
            c_line: 0,
            c_cc,
            c_ispeed: 38400,
            c_ospeed: 38400,
        }
    }
}

impl Termios {
    /// Create a new termios with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if canonical (line) mode is enabled
    #[inline]
    pub fn is_canonical(&self) -> bool {
        (self.c_lflag & ICANON) != 0
    }

    /// Set or clear canonical (line) mode
    #[inline]
    pub fn set_canonical(&mut self, enable: bool) {
        if enable {
            self.c_lflag |= ICANON;
        } else {
            self.c_lflag &= !ICANON;
        }
    }

    /// Check if echo is enabled
    #[inline]
    pub fn is_echo(&self) -> bool {
        (self.c_lflag & ECHO) != 0
    }

    /// Check if a newline is echoed even with ECHO off
    #[inline]
    pub fn is_echonl(&self) -> bool {
        (self.c_lflag & ECHONL) != 0
    }

    /// Check if signal generation is enabled
    #[inline]
    pub fn is_sig(&self) -> bool {
        (self.c_lflag & ISIG) != 0
    }

    /// Get the interrupt character (usually Ctrl+C)
    #[inline]
    pub fn intr_char(&self) -> u8 {
        self.c_cc[VINTR]
    }

    /// Get the quit character (usually Ctrl+\)
    #[inline]
    pub fn quit_char(&self) -> u8 {
        self.c_cc[VQUIT]
    }

    /// Get the EOF character (usually Ctrl+D)
    #[inline]
    pub fn eof_char(&self) -> u8 {
        self.c_cc[VEOF]
    }

    /// Get the erase character
    #[inline]
    pub fn erase_char(&self) -> u8 {
        self.c_cc[VERASE]
    }

    /// Get the kill (line erase) character (usually Ctrl+U)
    #[inline]
    pub fn kill_char(&self) -> u8 {
        self.c_cc[VKILL]
    }

    /// Get the reprint character (usually Ctrl+R)
    #[inline]
    pub fn reprint_char(&self) -> u8 {
        self.c_cc[VREPRINT]
    }

    /// Set raw mode (disable canonical processing, echo, and signals)
    pub fn set_raw(&mut self) {
        self.c_lflag &= !(ICANON | ECHO | ECHOE | ECHOK | ECHONL | ISIG | IEXTEN);
        self.c_iflag &= !(IGNCR | ICRNL | IXON);
        self.c_cc[VMIN] = 1;
        self.c_cc[VTIME] = 0;
    }
}
