//! Process management layer
//!
//! Handles the office child process lifecycle: spawn with a structured argv
//! and environment map, stderr draining, and termination by recorded pid.
//! The pid is recorded at spawn time because a relaunching office binary may
//! outlive the handle we spawned; signals always target the recorded id.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};

// ============================================================================
// Process State Management
// ============================================================================

/// How to stop a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Try graceful shutdown first (SIGTERM), then force kill if needed
    Graceful,
    /// Force kill immediately (SIGKILL)
    Force,
}

/// Process lifecycle states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    /// Process has not been started yet
    NotStarted,
    /// Process is currently running
    Running { pid: u32 },
    /// Process has been stopped (either gracefully or forcefully)
    Stopped,
}

impl ProcessState {
    /// Get the process ID if the process is running
    pub fn pid(&self) -> Option<u32> {
        match self {
            ProcessState::Running { pid } => Some(*pid),
            _ => None,
        }
    }

    /// Check if the process is currently running
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running { .. })
    }
}

// ============================================================================
// Process Exit Events
// ============================================================================

/// Event fired when the process exits
#[derive(Debug, Clone)]
pub struct ProcessExitEvent {}

/// Trait for handling process exit events
#[async_trait::async_trait]
pub trait ProcessExitHandler: Send + Sync {
    /// Called when the process exits
    async fn on_process_exit(&self, event: ProcessExitEvent);
}

// ============================================================================
// Stderr Monitoring Trait
// ============================================================================

/// Trait for monitoring stderr output from external processes
pub trait StderrMonitor: Send + Sync {
    /// Install a handler for stderr lines
    ///
    /// The handler will be called for each line received from stderr.
    /// Only one handler can be active at a time - installing a new handler
    /// will replace the previous one.
    ///
    /// Note: Monitoring starts automatically when the process starts if a handler is installed.
    fn on_stderr_line<F>(&mut self, handler: F)
    where
        F: Fn(String) + Send + Sync + 'static;
}

// ============================================================================
// Process Management
// ============================================================================

/// Error types for process management
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Process not started")]
    NotStarted,

    #[error("Process already started")]
    AlreadyStarted,

    #[error("Stderr not available")]
    StderrNotAvailable,
}

/// Trait for managing external process lifecycle
#[async_trait::async_trait]
pub trait ProcessManager: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Start the external process
    async fn start(&mut self) -> Result<(), Self::Error>;

    /// Stop the external process
    async fn stop(&mut self, mode: StopMode) -> Result<(), Self::Error>;

    /// Check if the process is currently running
    fn is_running(&self) -> bool;

    /// Synchronous force kill for Drop trait implementations
    ///
    /// This is a simplified version of stop() that directly kills the
    /// process. Intended for use in Drop implementations.
    fn kill_sync(&mut self);
}

/// Manages the office child process spawned via Command
pub struct OfficeProcessManager {
    /// Executable to run (soffice path)
    command: String,

    /// Command arguments
    args: Vec<String>,

    /// Working directory for the process (optional)
    working_directory: Option<PathBuf>,

    /// Environment variable overrides applied on top of the inherited env
    env_overrides: HashMap<String, String>,

    /// Thread-safe process state holding the recorded pid
    state: Arc<Mutex<ProcessState>>,

    /// Stderr handler
    stderr_handler: Option<Box<dyn Fn(String) + Send + Sync>>,

    /// Stderr monitoring task handle
    stderr_task: Option<JoinHandle<()>>,

    /// Process wait task handle (waits for child to exit)
    wait_task: Option<JoinHandle<()>>,

    /// Process exit event handler
    exit_handler: Option<Arc<dyn ProcessExitHandler>>,
}

impl OfficeProcessManager {
    /// Create a new office process manager
    ///
    /// # Arguments
    /// * `command` - The executable to run
    /// * `args` - Command line arguments
    /// * `working_dir` - Optional working directory for the process
    pub fn new(command: String, args: Vec<String>, working_dir: Option<PathBuf>) -> Self {
        Self {
            command,
            args,
            working_directory: working_dir,
            env_overrides: HashMap::new(),
            state: Arc::new(Mutex::new(ProcessState::NotStarted)),
            stderr_handler: None,
            stderr_task: None,
            wait_task: None,
            exit_handler: None,
        }
    }

    /// Add environment variable overrides applied when the process starts
    pub fn with_env_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.env_overrides = overrides;
        self
    }

    /// Install a handler fired when the process exits
    pub fn set_exit_handler(&mut self, handler: Arc<dyn ProcessExitHandler>) {
        self.exit_handler = Some(handler);
    }

    /// Get current process state (thread-safe)
    pub fn get_state(&self) -> ProcessState {
        // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
        self.state.lock().unwrap().clone()
    }

    /// Get the recorded process ID, if running
    pub fn pid(&self) -> Option<u32> {
        self.get_state().pid()
    }

    /// Spawn the stderr monitoring task with a provided stderr pipe
    ///
    /// Always drains stderr to prevent the child from blocking on a full
    /// pipe. If a handler is installed, lines are forwarded to it.
    fn spawn_stderr_monitor_with_pipe(&mut self, stderr: tokio::process::ChildStderr) {
        // Only start if we don't already have a task running
        if self.stderr_task.is_some() {
            return;
        }

        // Move handler into task (take ownership, no cloning needed)
        let handler = self.stderr_handler.take();

        let task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut line = String::new();

            trace!(
                "OfficeProcessManager: Starting stderr monitoring (handler: {})",
                if handler.is_some() {
                    "installed"
                } else {
                    "draining only"
                }
            );

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        // EOF reached
                        trace!("OfficeProcessManager: stderr EOF reached");
                        break;
                    }
                    Ok(_) => {
                        let line_content = line.trim().to_string();
                        if !line_content.is_empty() {
                            if let Some(ref handler) = handler {
                                trace!("OfficeProcessManager: stderr line: {}", line_content);
                                handler(line_content);
                            } else {
                                trace!("OfficeProcessManager: stderr drained: {}", line_content);
                            }
                        }
                    }
                    Err(e) => {
                        error!("Failed to read from stderr: {}", e);
                        break;
                    }
                }
            }

            trace!("OfficeProcessManager: stderr monitoring finished");
        });

        self.stderr_task = Some(task);
    }

    /// Spawn the wait task that monitors child process exit
    fn spawn_wait_task(&mut self, mut child: Child) {
        let current_pid = self.get_state().pid();
        let exit_handler = self.exit_handler.clone();
        let state = Arc::clone(&self.state);

        let task = tokio::spawn(async move {
            trace!(
                "OfficeProcessManager: Starting wait task for PID {:?}",
                current_pid
            );

            match child.wait().await {
                Ok(exit_status) => {
                    info!(
                        "Process PID {:?} exited with status: {}",
                        current_pid, exit_status
                    );

                    if let Ok(mut process_state) = state.lock() {
                        *process_state = ProcessState::Stopped;
                    }

                    if let Some(handler) = &exit_handler {
                        handler.on_process_exit(ProcessExitEvent {}).await;
                    }
                }
                Err(e) => {
                    error!("Error waiting for child process: {}", e);

                    if let Ok(mut process_state) = state.lock() {
                        *process_state = ProcessState::Stopped;
                    }

                    if let Some(handler) = &exit_handler {
                        handler.on_process_exit(ProcessExitEvent {}).await;
                    }
                }
            }

            trace!(
                "OfficeProcessManager: Wait task finished for PID {:?}",
                current_pid
            );
        });

        self.wait_task = Some(task);
    }

    /// Send a termination signal to the recorded pid
    ///
    /// Signals target the recorded id rather than the child handle: when the
    /// office binary relaunches itself (service mode), the handle we spawned
    /// and the live office process can differ.
    fn signal_pid(pid: u32, mode: StopMode) {
        #[cfg(unix)]
        {
            unsafe {
                match mode {
                    StopMode::Graceful => {
                        if libc::kill(pid as libc::pid_t, libc::SIGTERM) == 0 {
                            info!("Sent SIGTERM to process {}", pid);
                        }
                        // Don't wait here - the wait task detects exit naturally.
                        // Callers escalate to stop(Force) if the process lingers.
                    }
                    StopMode::Force => {
                        libc::kill(pid as libc::pid_t, libc::SIGKILL);
                        info!("Sent SIGKILL to process {}", pid);
                    }
                }
            }
        }
        #[cfg(not(unix))]
        {
            // Best-effort taskkill; a permission failure is tolerated
            let mut cmd = std::process::Command::new("taskkill");
            if matches!(mode, StopMode::Force) {
                cmd.arg("/F");
            }
            match cmd.args(["/PID", &pid.to_string()]).status() {
                Ok(status) if status.success() => info!("taskkill terminated process {}", pid),
                Ok(status) => warn!("taskkill for process {} exited with {}", pid, status),
                Err(e) => warn!("taskkill for process {} failed: {}", pid, e),
            }
        }
    }
}

#[async_trait::async_trait]
impl ProcessManager for OfficeProcessManager {
    type Error = ProcessError;

    async fn start(&mut self) -> Result<(), Self::Error> {
        // Simple check - don't start if already running
        if self.is_running() {
            return Err(ProcessError::AlreadyStarted);
        }

        info!("Starting process: {} {:?}", self.command, self.args);

        let mut command_builder = Command::new(&self.command);
        command_builder
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Set working directory if specified
        if let Some(working_dir) = &self.working_directory {
            command_builder.current_dir(working_dir);
        }

        // Apply environment overrides on top of the inherited environment
        for (key, value) in &self.env_overrides {
            command_builder.env(key, value);
        }

        let mut child = command_builder.spawn()?;

        let pid = child.id();
        info!("Process started with PID: {:?}", pid);

        // Update state to Running with the recorded PID
        if let Some(pid) = pid {
            // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
            *self.state.lock().unwrap() = ProcessState::Running { pid };
        } else {
            return Err(ProcessError::Io(std::io::Error::other(
                "Failed to get process ID",
            )));
        }

        let stderr = child
            .stderr
            .take()
            .ok_or(ProcessError::StderrNotAvailable)?;

        // Always start stderr monitoring to prevent the child from blocking
        // Handler is optional - if not installed, lines are just drained
        self.spawn_stderr_monitor_with_pipe(stderr);

        // Start wait task with the child process (this consumes the child)
        self.spawn_wait_task(child);

        Ok(())
    }

    async fn stop(&mut self, mode: StopMode) -> Result<(), Self::Error> {
        // Simply check if we have a running process
        let pid = match self.get_state().pid() {
            Some(pid) => pid,
            None => return Err(ProcessError::NotStarted),
        };

        match mode {
            StopMode::Graceful => info!("Gracefully stopping process with PID: {}", pid),
            StopMode::Force => info!("Force killing process with PID: {}", pid),
        }

        Self::signal_pid(pid, mode);

        // Stop stderr monitoring task
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }

        // Update state immediately for API consistency
        // The wait task will also update state when it detects the actual exit
        // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
        *self.state.lock().unwrap() = ProcessState::Stopped;

        Ok(())
    }

    fn is_running(&self) -> bool {
        self.get_state().is_running()
    }

    fn kill_sync(&mut self) {
        let pid = match self.get_state().pid() {
            Some(pid) => pid,
            None => return, // Already stopped
        };

        info!("Synchronously force killing process with PID: {}", pid);

        Self::signal_pid(pid, StopMode::Force);

        // Stop stderr monitoring task
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }

        // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
        *self.state.lock().unwrap() = ProcessState::Stopped;
    }
}

impl StderrMonitor for OfficeProcessManager {
    fn on_stderr_line<F>(&mut self, handler: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.stderr_handler = Some(Box::new(handler));
    }
}
