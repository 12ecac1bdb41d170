//! Process primitives for the launcher
//!
//! Workers are started in their own session so they outlive the launcher
//! and can be signalled as a group. Liveness of a recorded PID is judged with
//! a signal-0 probe.
//!
//! ## Platform Support
//!
//! - **Unix**: detached spawn via `setsid()`, `kill(pid, 0)` probes, group signals

#[cfg(unix)]
pub mod unix;

#[cfg(unix)]
pub use unix::*;
