//! Signal numbers raised by the terminal subsystem

pub mod constants;
