//! Error types for profile management and bridge establishment

use std::path::PathBuf;
use std::time::Duration;

use crate::io::ProcessError;
use crate::uno::UnoError;

// ============================================================================
// Profile Errors
// ============================================================================

/// Errors from working-directory and profile-cache handling
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The resolved cache path exists but is not a directory
    #[error("cache path is not a directory: {path}")]
    CachePathNotDirectory { path: PathBuf },

    /// The unique working directory could not be created
    #[error("failed to create working directory: {path}")]
    WorkingDirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A recursive profile copy failed
    #[error("profile copy failed: {from} -> {to}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Connection Errors
// ============================================================================

/// Errors from establishing or tearing down the process bridge
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The office child process could not be spawned
    #[error("failed to spawn office process: {0}")]
    Spawn(#[from] ProcessError),

    /// Profile preparation before spawn failed
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),

    /// The retry loop exhausted its timeout; carries the last error seen
    #[error("connect timed out after {timeout:?}: {last}")]
    Timeout {
        timeout: Duration,
        #[source]
        last: UnoError,
    },

    /// A non-transient bridge fault aborted the connect attempt
    #[error("bridge error: {0}")]
    Bridge(UnoError),

    /// A connect is already in flight on this bridge
    #[error("connect already in flight")]
    ConnectInFlight,

    /// The bridge has been disposed and cannot be reused
    #[error("bridge is disposed")]
    Disposed,

    /// No context is available (bridge not connected)
    #[error("bridge is not connected")]
    NotConnected,
}
