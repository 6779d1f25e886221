//! Command dispatch
//!
//! Normalizes command names to their full `.uno:` URL form and routes them
//! through the remote dispatch provider, bracketed by the
//! `dispatching`/`dispatched` event pair. Subscribers of `dispatching` may
//! veto the dispatch or mutate its property bag before it goes remote.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::{names, EventArgs, EventBus};
use crate::log_timing;
use crate::uno::{DispatchExecutor, PropertyBag};

use super::error::SessionError;

/// Prefix every plain command is normalized to
pub const UNO_PREFIX: &str = ".uno:";

/// Command URLs passed through without normalization
const PASSTHROUGH_PREFIXES: [&str; 2] = ["vnd.sun.star.", "service:"];

/// Routes normalized commands through a remote dispatch provider
pub struct CommandDispatcher {
    bus: Arc<EventBus>,
    executor: Arc<dyn DispatchExecutor>,
}

impl CommandDispatcher {
    pub fn new(bus: Arc<EventBus>, executor: Arc<dyn DispatchExecutor>) -> Self {
        Self { bus, executor }
    }

    /// Normalize a command name to its full dispatch URL
    ///
    /// Plain names get the `.uno:` prefix exactly once; `vnd.sun.star.` and
    /// `service:` URLs pass through untouched. Empty commands fail here,
    /// before anything goes remote.
    pub fn normalize(command: &str) -> Result<String, SessionError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(SessionError::dispatch("command is empty"));
        }
        if PASSTHROUGH_PREFIXES
            .iter()
            .any(|prefix| command.starts_with(prefix))
        {
            return Ok(command.to_string());
        }
        let bare = command.strip_prefix(UNO_PREFIX).unwrap_or(command);
        if bare.is_empty() {
            return Err(SessionError::dispatch("command is empty"));
        }
        Ok(format!("{UNO_PREFIX}{bare}"))
    }

    /// Dispatch a command and wait for its result
    ///
    /// Publishes `dispatching` (cancelable, property bag mutable by
    /// subscribers), executes remotely, then publishes `dispatched` carrying
    /// the result.
    pub async fn dispatch(
        &self,
        frame: Option<&str>,
        command: &str,
        props: PropertyBag,
    ) -> Result<Value, SessionError> {
        let (command, props) = self.before_dispatch(command, props)?;

        let started = Instant::now();
        let result = self
            .executor
            .execute(frame, &command, &props)
            .await
            .map_err(|e| SessionError::dispatch(format!("{command}: {e}")))?;
        log_timing!(tracing::Level::DEBUG, "dispatch", started.elapsed());

        self.publish_dispatched(&command, Some(&result));
        Ok(result)
    }

    /// Dispatch a command on a background task
    ///
    /// The property bag is snapshotted after the `dispatching` subscribers
    /// have run; later caller-side mutations do not reach the worker. The
    /// `dispatched` event fires from the worker when the remote call
    /// completes; a remote failure is logged there, not surfaced.
    pub fn dispatch_in_background(
        &self,
        frame: Option<String>,
        command: &str,
        props: PropertyBag,
    ) -> Result<JoinHandle<()>, SessionError> {
        let (command, props) = self.before_dispatch(command, props)?;

        let bus = Arc::clone(&self.bus);
        let executor = Arc::clone(&self.executor);
        Ok(tokio::spawn(async move {
            let started = Instant::now();
            match executor.execute(frame.as_deref(), &command, &props).await {
                Ok(result) => {
                    log_timing!(tracing::Level::DEBUG, "dispatch", started.elapsed());
                    let mut args = EventArgs::new();
                    args.set(names::KEY_COMMAND, Value::String(command.clone()));
                    args.set(names::KEY_RESULT, result);
                    bus.publish(names::DISPATCHED, &mut args);
                }
                Err(e) => {
                    warn!("Background dispatch of {} failed: {}", command, e);
                }
            }
        }))
    }

    /// Normalize and publish `dispatching`; returns the command plus the
    /// property bag as (possibly) rewritten by subscribers
    fn before_dispatch(
        &self,
        command: &str,
        props: PropertyBag,
    ) -> Result<(String, PropertyBag), SessionError> {
        let command = Self::normalize(command)?;
        debug!("Dispatching command: {}", command);

        let mut args = EventArgs::with_entry(names::KEY_PROPS, Value::Object(props));
        args.set(names::KEY_COMMAND, Value::String(command.clone()));

        let outcome = self.bus.publish_cancelable(names::DISPATCHING, &mut args);
        if outcome.is_vetoed() {
            return Err(SessionError::cancelled(names::DISPATCHING));
        }

        let props = match args.data.remove(names::KEY_PROPS) {
            Some(Value::Object(props)) => props,
            _ => PropertyBag::new(),
        };
        Ok((command, props))
    }

    fn publish_dispatched(&self, command: &str, result: Option<&Value>) {
        let mut args = EventArgs::with_entry(
            names::KEY_COMMAND,
            Value::String(command.to_string()),
        );
        if let Some(result) = result {
            args.set(names::KEY_RESULT, result.clone());
        }
        self.bus.publish(names::DISPATCHED, &mut args);
    }
}
