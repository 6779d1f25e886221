//! I/O layer - process lifecycle management for the office child
//!
//! This module provides the process abstraction the bridge layer builds on:
//!
//! - **Process**: external process lifecycle with a recorded pid, graceful
//!   and forced termination, and stderr draining
//!
//! Nothing here knows about UNO or sessions; it is reusable plumbing.

pub mod process;

// Re-export main types for convenience
pub use process::{
    OfficeProcessManager, ProcessError, ProcessExitEvent, ProcessExitHandler, ProcessManager,
    ProcessState, StderrMonitor, StopMode,
};
