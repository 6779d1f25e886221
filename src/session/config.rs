//! Session configuration
//!
//! Builder-validated configuration for an [`OfficeSession`]. Every timing
//! knob has a default matching observed office startup/shutdown behavior;
//! validation happens once at build time so session operations never need to
//! re-check.
//!
//! [`OfficeSession`]: super::OfficeSession

use std::path::PathBuf;
use std::time::Duration;

use crate::office::{ConnectionDescriptor, DEFAULT_CONNECT_TIMEOUT, DEFAULT_POLL_INTERVAL};

use super::cache::DEFAULT_CACHE_CAPACITY;
use super::error::SessionConfigError;

/// Default budget for graceful office termination
pub const DEFAULT_CLOSE_WAIT: Duration = Duration::from_secs(10);

/// Default interval between graceful termination attempts
pub const DEFAULT_CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound on the bridge connect timeout; anything beyond this is a
/// configuration mistake, not a slow machine
pub const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(300);

// ============================================================================
// Session Configuration
// ============================================================================

/// Validated configuration for an office session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How to reach (and optionally start) the office process
    pub descriptor: ConnectionDescriptor,

    /// Reuse a persisted first-run profile copy to skip first-run work
    pub use_profile_cache: bool,

    /// Explicit profile cache location; None resolves a platform default
    pub profile_cache_path: Option<PathBuf>,

    /// Hard timeout for bridge establishment
    pub connect_timeout: Duration,

    /// Interval between bridge connection attempts
    pub poll_interval: Duration,

    /// Budget for graceful office termination before giving up
    pub close_wait: Duration,

    /// Interval between graceful termination attempts
    pub close_poll_interval: Duration,

    /// Bound on the derived-value cache
    pub cache_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            descriptor: ConnectionDescriptor::default(),
            use_profile_cache: false,
            profile_cache_path: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            close_wait: DEFAULT_CLOSE_WAIT,
            close_poll_interval: DEFAULT_CLOSE_POLL_INTERVAL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Start building a configuration
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }
}

// ============================================================================
// Configuration Builder
// ============================================================================

/// Builder with validation at `build()`
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    /// Use a specific connection descriptor
    pub fn descriptor(mut self, descriptor: ConnectionDescriptor) -> Self {
        self.config.descriptor = descriptor;
        self
    }

    /// Path to the office executable
    pub fn soffice_path(mut self, path: impl Into<String>) -> Self {
        self.config.descriptor.soffice_path = path.into();
        self
    }

    /// Enable the persisted profile cache
    pub fn use_profile_cache(mut self, enabled: bool) -> Self {
        self.config.use_profile_cache = enabled;
        self
    }

    /// Explicit profile cache location (implies `use_profile_cache`)
    pub fn profile_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.profile_cache_path = Some(path.into());
        self.config.use_profile_cache = true;
        self
    }

    /// Hard timeout for bridge establishment
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Interval between bridge connection attempts
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Budget for graceful office termination
    pub fn close_wait(mut self, budget: Duration) -> Self {
        self.config.close_wait = budget;
        self
    }

    /// Interval between graceful termination attempts
    pub fn close_poll_interval(mut self, interval: Duration) -> Self {
        self.config.close_poll_interval = interval;
        self
    }

    /// Bound on the derived-value cache
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> Result<SessionConfig, SessionConfigError> {
        let config = self.config;

        if config.descriptor.soffice_path.trim().is_empty() {
            return Err(SessionConfigError::invalid_soffice_path(
                &config.descriptor.soffice_path,
                "path is empty",
            ));
        }
        if config.descriptor.soffice_path.contains('\0') {
            return Err(SessionConfigError::invalid_soffice_path(
                config.descriptor.soffice_path.replace('\0', "\\0"),
                "path contains a NUL byte",
            ));
        }

        if config.connect_timeout.is_zero() {
            return Err(SessionConfigError::invalid_timeout(
                config.connect_timeout,
                "connect timeout must be non-zero",
            ));
        }
        if config.connect_timeout > MAX_CONNECT_TIMEOUT {
            return Err(SessionConfigError::invalid_timeout(
                config.connect_timeout,
                "connect timeout exceeds the maximum of 300s",
            ));
        }
        if config.poll_interval.is_zero() {
            return Err(SessionConfigError::invalid_timeout(
                config.poll_interval,
                "poll interval must be non-zero",
            ));
        }
        if config.poll_interval > config.connect_timeout {
            return Err(SessionConfigError::invalid_timeout(
                config.poll_interval,
                "poll interval exceeds the connect timeout",
            ));
        }

        if config.close_wait.is_zero() {
            return Err(SessionConfigError::invalid_timeout(
                config.close_wait,
                "close wait budget must be non-zero",
            ));
        }
        if config.close_poll_interval.is_zero()
            || config.close_poll_interval > config.close_wait
        {
            return Err(SessionConfigError::invalid_timeout(
                config.close_poll_interval,
                "close poll interval must be non-zero and within the close wait budget",
            ));
        }

        if config.cache_capacity == 0 {
            return Err(SessionConfigError::InvalidCacheCapacity {
                capacity: 0,
                reason: "cache capacity must be non-zero".to_string(),
            });
        }

        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
