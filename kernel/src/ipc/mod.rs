//! Inter-process readiness plumbing

pub mod poll;
