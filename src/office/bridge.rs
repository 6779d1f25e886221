//! Process bridge
//!
//! Spawns the office process (or attaches to a running one) and establishes
//! the UNO bridge with a bounded retry loop: the child needs a variable
//! amount of startup time before it is listening, so "no connection yet"
//! errors are retried at a fixed interval until a hard timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::io::{OfficeProcessManager, ProcessManager, StopMode};
use crate::session::urls;
use crate::uno::{BridgeConnector, ComponentContext, UnoError};

use super::descriptor::ConnectionDescriptor;
use super::error::ConnectionError;
use super::profile::ProfileCache;

/// Default hard timeout for bridge establishment
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between connection attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Bridge lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal: the bridge and its resources have been torn down
    Disposed,
}

/// Owns the spawned office process and the live bridge handle
///
/// Not reentrant: callers serialize access per instance (the session layer
/// enforces single-flight); a concurrent `connect` on the same instance is
/// rejected via the `Connecting` state.
pub struct ProcessBridge {
    descriptor: ConnectionDescriptor,
    profile: ProfileCache,
    connector: Arc<dyn BridgeConnector>,
    connect_timeout: Duration,
    poll_interval: Duration,
    state: BridgeState,
    process: Option<OfficeProcessManager>,
    context: Option<Arc<dyn ComponentContext>>,
}

impl ProcessBridge {
    pub fn new(
        descriptor: ConnectionDescriptor,
        profile: ProfileCache,
        connector: Arc<dyn BridgeConnector>,
    ) -> Self {
        Self {
            descriptor,
            profile,
            connector,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: BridgeState::Disconnected,
            process: None,
            context: None,
        }
    }

    /// Override the retry loop timing
    pub fn with_retry(mut self, connect_timeout: Duration, poll_interval: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// The remote component context; None unless connected
    pub fn context(&self) -> Option<Arc<dyn ComponentContext>> {
        self.context.clone()
    }

    /// Recorded pid of the spawned office process, if any
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(OfficeProcessManager::pid)
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    /// Spawn (when configured) and establish the bridge
    ///
    /// The only path into `Connected`. Any failure returns the bridge to
    /// `Disconnected` with the error surfaced to the caller.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        match self.state {
            BridgeState::Disposed => return Err(ConnectionError::Disposed),
            BridgeState::Connecting => return Err(ConnectionError::ConnectInFlight),
            BridgeState::Connected => return Ok(()),
            BridgeState::Disconnected => {}
        }

        self.state = BridgeState::Connecting;
        match self.establish().await {
            Ok(context) => {
                self.context = Some(context);
                self.state = BridgeState::Connected;
                info!("Bridge connected ({})", self.descriptor.connect_string());

                // Capture first-run profile state once; never fail a live
                // connection over it
                if let Err(e) = self.profile.cache_profile() {
                    warn!("Profile cache capture failed: {}", e);
                }
                Ok(())
            }
            Err(e) => {
                self.state = BridgeState::Disconnected;
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> Result<Arc<dyn ComponentContext>, ConnectionError> {
        if self.descriptor.start_office {
            // Seed the profile before the process starts
            self.profile.copy_cache_to_profile()?;

            let profile_url = urls::path_to_file_url(&self.profile.working_dir()?)
                .map_err(|e| ConnectionError::Bridge(UnoError::Remote(e.to_string())))?;
            let args = self.descriptor.spawn_args(Some(&profile_url));

            let mut env = self.descriptor.env_overrides.clone();
            env.extend(self.profile.env_overrides()?);

            debug!(
                "Spawning office: {} {:?}",
                self.descriptor.soffice_path, args
            );
            let mut process = OfficeProcessManager::new(
                self.descriptor.soffice_path.clone(),
                args,
                None,
            )
            .with_env_overrides(env);

            // Fire-and-forget: the retry loop below observes readiness
            process.start().await?;
            self.process = Some(process);
        }

        self.retry_connect().await
    }

    /// Bounded retry loop for bridge establishment
    ///
    /// Transient "no connection yet" errors are retried every poll interval
    /// until the timeout elapses, then the last error propagates. Any other
    /// connector error aborts immediately.
    async fn retry_connect(&self) -> Result<Arc<dyn ComponentContext>, ConnectionError> {
        let connect_string = self.descriptor.connect_string();
        let deadline = Instant::now() + self.connect_timeout;

        loop {
            match self.connector.connect(&connect_string).await {
                Ok(context) => return Ok(context),
                Err(e) if e.is_transient() => {
                    if Instant::now() >= deadline {
                        return Err(ConnectionError::Timeout {
                            timeout: self.connect_timeout,
                            last: e,
                        });
                    }
                    debug!("Office not ready yet, retrying: {}", e);
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => return Err(ConnectionError::Bridge(e)),
            }
        }
    }

    /// Attach to a context obtained in-process (no spawn, no retry loop)
    ///
    /// Used when the caller already runs inside the office process.
    pub fn direct_attach(&mut self, context: Arc<dyn ComponentContext>) -> Result<(), ConnectionError> {
        match self.state {
            BridgeState::Disposed => Err(ConnectionError::Disposed),
            BridgeState::Connecting => Err(ConnectionError::ConnectInFlight),
            _ => {
                self.context = Some(context);
                self.state = BridgeState::Connected;
                info!("Bridge attached to in-process context");
                Ok(())
            }
        }
    }

    /// Forcibly terminate the office process and dispose the bridge
    ///
    /// Idempotent; teardown failures are logged, never propagated.
    pub async fn kill(&mut self) {
        if self.state == BridgeState::Disposed {
            return;
        }

        if let Some(mut process) = self.process.take() {
            if process.is_running() {
                if let Err(e) = process.stop(StopMode::Force).await {
                    warn!("Office process kill failed: {}", e);
                }
            }
        }

        self.context = None;
        self.profile.delete_working_dir();
        self.state = BridgeState::Disposed;
        info!("Bridge disposed");
    }
}

impl Drop for ProcessBridge {
    fn drop(&mut self) {
        // Sync fallback when kill() was never called
        if let Some(process) = self.process.as_mut() {
            if process.is_running() {
                warn!("ProcessBridge dropped while office still running - force killing");
                process.kill_sync();
            }
        }
        self.profile.delete_working_dir();
    }
}
