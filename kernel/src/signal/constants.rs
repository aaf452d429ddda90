//! Signal numbers following Linux x86_64 conventions
//!
//! Only the signals the pty driver raises are listed here; delivery itself
//! belongs to the embedding kernel.

/// Hangup detected on controlling terminal
pub const SIGHUP: u32 = 1;
/// Interrupt from keyboard (INTR character)
pub const SIGINT: u32 = 2;
/// Quit from keyboard (QUIT character)
pub const SIGQUIT: u32 = 3;
/// Window resize
pub const SIGWINCH: u32 = 28;

/// Get signal name for debugging
pub fn signal_name(sig: u32) -> &'static str {
    match sig {
        SIGHUP => "SIGHUP",
        SIGINT => "SIGINT",
        SIGQUIT => "SIGQUIT",
        SIGWINCH => "SIGWINCH",
        _ => "UNKNOWN",
    }
}
