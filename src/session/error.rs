//! Error types for session management
//!
//! Everything a session operation can surface to the caller. Operations the
//! session initiates never swallow errors; only best-effort teardown paths
//! (working-dir deletion, graceful-then-forceful office kill) log and
//! continue.

use std::time::Duration;

use crate::office::{ConnectionError, ProfileError};
use crate::uno::UnoError;

use super::urls::UrlError;

// ============================================================================
// Session Errors
// ============================================================================

/// Errors surfaced by [`OfficeSession`] operations
///
/// [`OfficeSession`]: super::OfficeSession
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Bridge establishment or teardown failure
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Profile cache handling failure
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Configuration validation failure
    #[error("configuration error: {0}")]
    Config(#[from] SessionConfigError),

    /// Path/URL resolution failure
    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    /// Invalid session state or a remote load/open/create failure
    #[error("loading error: {reason}")]
    Loading { reason: String },

    /// The loader returned no component without raising
    #[error("loader returned no component for: {url}")]
    NoComponent { url: String },

    /// A cancelable event was cancelled and not marked handled; always
    /// recoverable by the caller
    #[error("operation cancelled by event subscriber: {event}")]
    CancelEvent { event: String },

    /// Command dispatch failure (empty command, dispatch-helper creation,
    /// or the underlying remote dispatch)
    #[error("dispatch error: {reason}")]
    Dispatch { reason: String },

    /// A required remote interface query failed
    #[error("missing interface: {interface}")]
    MissingInterface { interface: String },

    /// The remote side refused to close; a normal catchable condition
    #[error("close was vetoed by the remote side")]
    CloseVeto,

    /// Invalid session state transition
    #[error("invalid session state: current={current}, expected={expected}")]
    InvalidState { current: String, expected: String },

    /// Any other remote fault
    #[error("remote error: {0}")]
    Remote(UnoError),
}

impl SessionError {
    /// Create a loading error with context
    pub fn loading(reason: impl Into<String>) -> Self {
        Self::Loading {
            reason: reason.into(),
        }
    }

    /// Create a dispatch error with context
    pub fn dispatch(reason: impl Into<String>) -> Self {
        Self::Dispatch {
            reason: reason.into(),
        }
    }

    /// Create a cancelled-event error
    pub fn cancelled(event: impl Into<String>) -> Self {
        Self::CancelEvent {
            event: event.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(current: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidState {
            current: current.into(),
            expected: expected.into(),
        }
    }
}

impl From<UnoError> for SessionError {
    fn from(err: UnoError) -> Self {
        match err {
            UnoError::CloseVetoed => SessionError::CloseVeto,
            UnoError::MissingInterface(interface) => SessionError::MissingInterface { interface },
            other => SessionError::Remote(other),
        }
    }
}

// ============================================================================
// Session Configuration Errors
// ============================================================================

/// Configuration validation and building errors
#[derive(Debug, thiserror::Error)]
pub enum SessionConfigError {
    /// Invalid executable path value
    #[error("invalid soffice path: {path} - {reason}")]
    InvalidSofficePath { path: String, reason: String },

    /// Invalid timeout value
    #[error("invalid timeout: {timeout:?} - {reason}")]
    InvalidTimeout { timeout: Duration, reason: String },

    /// Invalid cache capacity
    #[error("invalid cache capacity: {capacity} - {reason}")]
    InvalidCacheCapacity { capacity: usize, reason: String },
}

impl SessionConfigError {
    /// Create an invalid soffice path error
    pub fn invalid_soffice_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSofficePath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid timeout error
    pub fn invalid_timeout(timeout: Duration, reason: impl Into<String>) -> Self {
        Self::InvalidTimeout {
            timeout,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
