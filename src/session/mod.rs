//! Office session management
//!
//! [`OfficeSession`] owns at most one office connection at a time and drives
//! the full document lifecycle through it: load the office, open/create
//! documents, save, close, dispatch commands, and tear the office down
//! gracefully (with a forceful fallback). Every stateful operation is
//! bracketed by events on the session's [`EventBus`], and every "...ing"
//! event is cancelable.
//!
//! A process-wide default session can be installed once via
//! [`set_default_session`]; it is marked singleton and refuses to be
//! re-targeted at a different office after its first load.

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod formats;
pub mod urls;

use std::sync::{Arc, Mutex as StdMutex, OnceLock, Weak};

use serde_json::{json, Value};
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::events::{names, EventArgs, EventBus};
use crate::office::{ConnectionError, ProcessBridge, ProfileCache};
use crate::uno::{
    BridgeConnector, ComponentContext, DocumentKind, OfficeDocument, PropertyBag,
};

pub use cache::{SessionCache, DEFAULT_CACHE_CAPACITY};
pub use config::{
    SessionConfig, SessionConfigBuilder, DEFAULT_CLOSE_POLL_INTERVAL, DEFAULT_CLOSE_WAIT,
};
pub use dispatcher::CommandDispatcher;
pub use error::{SessionConfigError, SessionError};
pub use urls::UrlError;

/// Cache key for the remotely-resolved active frame name
const CACHE_KEY_FRAME: &str = "current_frame";

// ============================================================================
// Session State
// ============================================================================

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No office has been loaded yet
    Unloaded,
    /// Bridge establishment in progress
    Loading,
    /// Office connected; document operations are available
    Loaded,
    /// Graceful termination in progress
    Closing,
    /// Office closed; non-singleton sessions may load again
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Unloaded => "unloaded",
            SessionState::Loading => "loading",
            SessionState::Loaded => "loaded",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// Office Session
// ============================================================================

/// Owns one office connection and the document lifecycle through it
///
/// Single-writer: operations take `&mut self` and callers serialize access
/// (the default session wraps one in an async mutex). The event bus and the
/// derived-value cache are shared handles so subscribers can hold them
/// independently.
pub struct OfficeSession {
    config: SessionConfig,
    connector: Arc<dyn BridgeConnector>,
    bus: Arc<EventBus>,
    cache: Arc<SessionCache>,
    bridge: Option<ProcessBridge>,
    current_doc: Arc<StdMutex<Option<Weak<dyn OfficeDocument>>>>,
    state: SessionState,
    singleton: bool,
}

impl OfficeSession {
    pub fn new(config: SessionConfig, connector: Arc<dyn BridgeConnector>) -> Self {
        let bus = Arc::new(EventBus::new());
        let cache = Arc::new(SessionCache::new(config.cache_capacity));
        let current_doc: Arc<StdMutex<Option<Weak<dyn OfficeDocument>>>> =
            Arc::new(StdMutex::new(None));

        // Derived state is dropped through the reset event so external
        // publishers of `reset` invalidate exactly like internal ones
        {
            let cache = Arc::clone(&cache);
            let current_doc = Arc::clone(&current_doc);
            bus.subscribe(names::RESET, move |_| {
                cache.invalidate_all();
                // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
                *current_doc.lock().unwrap() = None;
            });
        }

        Self {
            config,
            connector,
            bus,
            cache,
            bridge: None,
            current_doc,
            state: SessionState::Unloaded,
            singleton: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The session's event bus; subscribe here for lifecycle events
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The document most recently opened or created, if still alive
    pub fn current_document(&self) -> Option<Arc<dyn OfficeDocument>> {
        // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
        self.current_doc
            .lock()
            .unwrap()
            .as_ref()
            .and_then(Weak::upgrade)
    }

    // ========================================================================
    // Office Lifecycle
    // ========================================================================

    /// Spawn (when configured) and connect to the office process
    ///
    /// Publishes `officeLoading` (cancelable) before acting and
    /// `officeLoaded` once the bridge is connected. A singleton session
    /// loads at most once.
    pub async fn load_office(&mut self) -> Result<(), SessionError> {
        self.ensure_can_load()?;

        if self
            .publish_cancelable(names::OFFICE_LOADING, EventArgs::new())
            .is_err()
        {
            return Err(SessionError::cancelled(names::OFFICE_LOADING));
        }

        self.state = SessionState::Loading;
        self.publish_reset();

        let started = std::time::Instant::now();
        let mut bridge = self.build_bridge();
        match bridge.connect().await {
            Ok(()) => {
                self.bridge = Some(bridge);
                self.state = SessionState::Loaded;
                crate::log_timing!(tracing::Level::INFO, "load_office", started.elapsed());
                self.publish(names::OFFICE_LOADED, EventArgs::new());
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Unloaded;
                Err(e.into())
            }
        }
    }

    /// Attach to a component context obtained in-process (no spawn)
    pub async fn attach_office(
        &mut self,
        context: Arc<dyn ComponentContext>,
    ) -> Result<(), SessionError> {
        self.ensure_can_load()?;

        if self
            .publish_cancelable(names::OFFICE_LOADING, EventArgs::new())
            .is_err()
        {
            return Err(SessionError::cancelled(names::OFFICE_LOADING));
        }

        self.state = SessionState::Loading;
        self.publish_reset();

        let mut bridge = self.build_bridge();
        match bridge.direct_attach(context) {
            Ok(()) => {
                self.bridge = Some(bridge);
                self.state = SessionState::Loaded;
                self.publish(names::OFFICE_LOADED, EventArgs::new());
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Unloaded;
                Err(e.into())
            }
        }
    }

    /// Gracefully close the office, retrying refused terminations
    ///
    /// Publishes `officeClosing` (cancelable); a veto fails the operation
    /// and leaves the bridge connected. Termination refusals (a modal
    /// dialog, an unsaved document) are retried every poll interval within
    /// the close budget; `Ok(false)` means the office refused throughout
    /// and is still running. [`kill_office`](Self::kill_office) is the
    /// forceful fallback.
    pub async fn close_office(&mut self) -> Result<bool, SessionError> {
        if self.bridge.is_none() {
            return Ok(true);
        }

        if self
            .publish_cancelable(names::OFFICE_CLOSING, EventArgs::new())
            .is_err()
        {
            return Err(SessionError::cancelled(names::OFFICE_CLOSING));
        }

        let context = self.context()?;
        self.state = SessionState::Closing;

        let deadline = Instant::now() + self.config.close_wait;
        loop {
            match context.terminate().await {
                Ok(true) => {
                    debug!("Office accepted termination request");
                    self.teardown().await;
                    return Ok(true);
                }
                Ok(false) => {
                    if Instant::now() >= deadline {
                        warn!(
                            "Office refused termination for {:?}, giving up",
                            self.config.close_wait
                        );
                        self.state = SessionState::Loaded;
                        return Ok(false);
                    }
                    debug!("Office refused termination, retrying");
                    tokio::time::sleep(self.config.close_poll_interval).await;
                }
                Err(e) => {
                    self.state = SessionState::Loaded;
                    return Err(e.into());
                }
            }
        }
    }

    /// Forcibly terminate the office process and reset the session
    ///
    /// Always succeeds: teardown failures are logged, and the session ends
    /// in `Closed` with `reset` and `officeClosed` published regardless.
    pub async fn kill_office(&mut self) {
        info!("Killing office session");
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if let Some(mut bridge) = self.bridge.take() {
            bridge.kill().await;
        }
        self.publish_reset();
        self.state = SessionState::Closed;
        self.publish(names::OFFICE_CLOSED, EventArgs::new());
    }

    // ========================================================================
    // Document Lifecycle
    // ========================================================================

    /// Open a document from a local path or URL
    ///
    /// Local paths must exist; they are validated and converted before
    /// anything goes remote. The opened document becomes the session's
    /// current document.
    pub async fn open_document(
        &mut self,
        source: &str,
        props: PropertyBag,
    ) -> Result<Arc<dyn OfficeDocument>, SessionError> {
        self.ensure_loaded()?;

        let args = EventArgs::with_entry(names::KEY_SOURCE, json!(source));
        if self.publish_cancelable(names::DOC_OPENING, args).is_err() {
            return Err(SessionError::cancelled(names::DOC_OPENING));
        }

        let url = urls::resolve_openable_url(source)?;
        let doc = self.load_component(&url, &props).await?;
        self.set_current(&doc);

        info!("Opened {} document: {}", doc.kind(), url);
        self.publish(
            names::DOC_OPENED,
            EventArgs::with_entry(names::KEY_URL, json!(url)),
        );
        Ok(doc)
    }

    /// Create a blank document of the given kind
    pub async fn create_document(
        &mut self,
        kind: DocumentKind,
        props: PropertyBag,
    ) -> Result<Arc<dyn OfficeDocument>, SessionError> {
        self.ensure_loaded()?;

        let args = EventArgs::with_entry(names::KEY_KIND, json!(kind.to_string()));
        if self.publish_cancelable(names::DOC_CREATING, args).is_err() {
            return Err(SessionError::cancelled(names::DOC_CREATING));
        }

        let doc = self.load_component(kind.factory_url(), &props).await?;
        self.set_current(&doc);

        info!("Created blank {} document", kind);
        self.publish(
            names::DOC_CREATED,
            EventArgs::with_entry(names::KEY_KIND, json!(kind.to_string())),
        );
        Ok(doc)
    }

    /// Create a new document from a template file
    ///
    /// The template itself is left untouched; the loader materializes an
    /// unsaved copy.
    pub async fn create_from_template(
        &mut self,
        template: &str,
        mut props: PropertyBag,
    ) -> Result<Arc<dyn OfficeDocument>, SessionError> {
        self.ensure_loaded()?;

        let args = EventArgs::with_entry(names::KEY_SOURCE, json!(template));
        if self.publish_cancelable(names::DOC_CREATING, args).is_err() {
            return Err(SessionError::cancelled(names::DOC_CREATING));
        }

        let url = urls::resolve_openable_url(template)?;
        props.insert("AsTemplate".to_string(), json!(true));
        let doc = self.load_component(&url, &props).await?;
        self.set_current(&doc);

        info!("Created {} document from template: {}", doc.kind(), url);
        self.publish(
            names::DOC_CREATED,
            EventArgs::with_entry(names::KEY_URL, json!(url)),
        );
        Ok(doc)
    }

    /// Save a document, resolving the filter from the target extension
    ///
    /// With no target the document stores to its own location (plain Save).
    /// An explicit `filter` overrides extension-based resolution; unknown
    /// extensions fall back to the plain text filter rather than failing.
    pub async fn save_document(
        &self,
        doc: &Arc<dyn OfficeDocument>,
        target: Option<&str>,
        filter: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), SessionError> {
        let mut args = EventArgs::new();
        if let Some(target) = target {
            args.set(names::KEY_SOURCE, json!(target));
        }
        if self.publish_cancelable(names::DOC_SAVING, args).is_err() {
            return Err(SessionError::cancelled(names::DOC_SAVING));
        }

        let mut saved = EventArgs::new();
        match target {
            None => {
                doc.store().await?;
                debug!("Stored document to its own location");
            }
            Some(target) => {
                let url = urls::resolve_target_url(target)?;
                let extension = urls::target_extension(&url);
                let filter = match filter {
                    Some(filter) => filter.to_string(),
                    None => formats::resolve_filter(doc.kind(), extension.as_deref()).to_string(),
                };
                doc.store_to_url(&url, &filter, password).await?;
                info!("Saved {} document to {} (filter: {})", doc.kind(), url, filter);
                saved.set(names::KEY_URL, json!(url));
            }
        }

        self.publish(names::DOC_SAVED, saved);
        Ok(())
    }

    /// Close a document; a remote veto surfaces as
    /// [`SessionError::CloseVeto`], a normal catchable condition
    pub async fn close_document(
        &mut self,
        doc: &Arc<dyn OfficeDocument>,
        deliver_ownership: bool,
    ) -> Result<(), SessionError> {
        if self
            .publish_cancelable(names::DOC_CLOSING, EventArgs::new())
            .is_err()
        {
            return Err(SessionError::cancelled(names::DOC_CLOSING));
        }

        doc.close(deliver_ownership).await?;

        {
            // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
            let mut current = self.current_doc.lock().unwrap();
            let is_current = current
                .as_ref()
                .and_then(Weak::upgrade)
                .is_some_and(|cur| Arc::ptr_eq(&cur, doc));
            if is_current {
                *current = None;
            }
        }

        self.publish(names::DOC_CLOSED, EventArgs::new());
        Ok(())
    }

    // ========================================================================
    // Command Dispatch
    // ========================================================================

    /// Dispatch a command against the active frame and wait for the result
    pub async fn dispatch_command(
        &self,
        command: &str,
        props: PropertyBag,
    ) -> Result<Value, SessionError> {
        self.ensure_loaded()?;
        let frame = self.current_frame();
        self.command_dispatcher()?
            .dispatch(frame.as_deref(), command, props)
            .await
    }

    /// Dispatch a command on a background task
    ///
    /// The returned handle resolves when the remote call completes; the
    /// `dispatched` event fires from the worker.
    pub fn dispatch_command_in_background(
        &self,
        command: &str,
        props: PropertyBag,
    ) -> Result<JoinHandle<()>, SessionError> {
        self.ensure_loaded()?;
        let frame = self.current_frame();
        self.command_dispatcher()?
            .dispatch_in_background(frame, command, props)
    }

    fn command_dispatcher(&self) -> Result<CommandDispatcher, SessionError> {
        let executor = self
            .context()?
            .dispatcher()
            .map_err(|e| SessionError::dispatch(format!("no dispatch provider: {e}")))?;
        Ok(CommandDispatcher::new(Arc::clone(&self.bus), executor))
    }

    /// The active frame name, cached per connection generation
    fn current_frame(&self) -> Option<String> {
        if let Some(Value::String(frame)) = self.cache.get(CACHE_KEY_FRAME) {
            return Some(frame);
        }
        let frame = self.context().ok()?.current_frame()?;
        self.cache.put(CACHE_KEY_FRAME, json!(frame));
        Some(frame)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn build_bridge(&self) -> ProcessBridge {
        let mut profile = ProfileCache::new(self.config.use_profile_cache);
        if let Some(path) = &self.config.profile_cache_path {
            profile = profile.with_cache_path(path);
        }
        ProcessBridge::new(
            self.config.descriptor.clone(),
            profile,
            Arc::clone(&self.connector),
        )
        .with_retry(self.config.connect_timeout, self.config.poll_interval)
    }

    fn ensure_can_load(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Unloaded => Ok(()),
            SessionState::Closed if !self.singleton => Ok(()),
            SessionState::Closed => Err(SessionError::loading(
                "the default session cannot be re-targeted after its office closed",
            )),
            state => Err(SessionError::invalid_state(
                state.to_string(),
                SessionState::Unloaded.to_string(),
            )),
        }
    }

    fn ensure_loaded(&self) -> Result<(), SessionError> {
        if self.state != SessionState::Loaded {
            return Err(SessionError::invalid_state(
                self.state.to_string(),
                SessionState::Loaded.to_string(),
            ));
        }
        Ok(())
    }

    fn context(&self) -> Result<Arc<dyn ComponentContext>, SessionError> {
        self.bridge
            .as_ref()
            .and_then(ProcessBridge::context)
            .ok_or(SessionError::Connection(ConnectionError::NotConnected))
    }

    /// Load a component through the remote loader
    ///
    /// A loader that returns nothing without raising is a distinct failure
    /// from a raising one. A successful load changes what the derived
    /// lookups would resolve to, so the cache generation is bumped.
    async fn load_component(
        &self,
        url: &str,
        props: &PropertyBag,
    ) -> Result<Arc<dyn OfficeDocument>, SessionError> {
        let loader = self.context()?.loader()?;
        match loader.load_component_from_url(url, props).await {
            Ok(Some(doc)) => {
                self.cache.invalidate_all();
                Ok(doc)
            }
            Ok(None) => Err(SessionError::NoComponent {
                url: url.to_string(),
            }),
            Err(e) => Err(SessionError::loading(format!("could not load {url}: {e}"))),
        }
    }

    fn set_current(&self, doc: &Arc<dyn OfficeDocument>) {
        // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
        *self.current_doc.lock().unwrap() = Some(Arc::downgrade(doc));
    }

    fn publish(&self, event: &str, mut args: EventArgs) {
        self.bus.publish(event, &mut args);
    }

    /// Publish a cancelable event; `Err(())` means vetoed
    fn publish_cancelable(&self, event: &str, mut args: EventArgs) -> Result<(), ()> {
        if self.bus.publish_cancelable(event, &mut args).is_vetoed() {
            debug!("Operation vetoed by {} subscriber", event);
            return Err(());
        }
        Ok(())
    }

    fn publish_reset(&self) {
        self.publish(names::RESET, EventArgs::new());
    }
}

impl std::fmt::Debug for OfficeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfficeSession")
            .field("state", &self.state)
            .field("singleton", &self.singleton)
            .field("connected", &self.bridge.is_some())
            .finish()
    }
}

// ============================================================================
// Default Session
// ============================================================================

static DEFAULT_SESSION: OnceLock<Arc<TokioMutex<OfficeSession>>> = OnceLock::new();

/// Install the process-wide default session
///
/// May be called at most once, before any [`default_session`] user relies
/// on it. The installed session is marked singleton: it loads one office
/// and refuses to be re-targeted after that office closes.
pub fn set_default_session(mut session: OfficeSession) -> Result<(), SessionError> {
    session.singleton = true;
    DEFAULT_SESSION
        .set(Arc::new(TokioMutex::new(session)))
        .map_err(|_| {
            SessionError::invalid_state(
                "default session already installed",
                "no default session",
            )
        })
}

/// The process-wide default session, if one has been installed
pub fn default_session() -> Option<Arc<TokioMutex<OfficeSession>>> {
    DEFAULT_SESSION.get().cloned()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::office::ConnectionDescriptor;
    use crate::uno::testing::{MockConnector, MockContext, MockDocument, MockOfficeStore};
    use std::fs;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    #[cfg(feature = "test-logging")]
    crate::setup_test_logging!();

    fn test_config() -> SessionConfig {
        SessionConfig::builder()
            .descriptor(ConnectionDescriptor {
                start_office: false,
                ..ConnectionDescriptor::default()
            })
            .close_wait(Duration::from_secs(2))
            .close_poll_interval(Duration::from_millis(100))
            .build()
            .unwrap()
    }

    fn session_with(context: Arc<MockContext>) -> OfficeSession {
        let connector = Arc::new(MockConnector::new(context));
        OfficeSession::new(test_config(), connector as Arc<dyn BridgeConnector>)
    }

    async fn loaded_session() -> (OfficeSession, Arc<MockContext>, MockOfficeStore) {
        let store = MockOfficeStore::new();
        let context = Arc::new(MockContext::new(store.clone()));
        let mut session = session_with(Arc::clone(&context));
        session.load_office().await.unwrap();
        (session, context, store)
    }

    fn record_events(session: &OfficeSession, events: &[&'static str]) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for event in events {
            let seen = Arc::clone(&seen);
            session.bus().subscribe(event, move |args| {
                seen.lock().unwrap().push(args.event.clone());
            });
        }
        seen
    }

    #[tokio::test]
    async fn test_load_office_publishes_lifecycle_events() {
        let store = MockOfficeStore::new();
        let context = Arc::new(MockContext::new(store));
        let mut session = session_with(context);
        let seen = record_events(&session, &[names::OFFICE_LOADING, names::OFFICE_LOADED]);

        assert_eq!(session.state(), SessionState::Unloaded);
        session.load_office().await.unwrap();
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![names::OFFICE_LOADING, names::OFFICE_LOADED]
        );
    }

    #[tokio::test]
    async fn test_load_office_veto_leaves_session_unloaded() {
        let store = MockOfficeStore::new();
        let context = Arc::new(MockContext::new(store));
        let connector = Arc::new(MockConnector::new(Arc::clone(&context)));
        let mut session =
            OfficeSession::new(test_config(), Arc::clone(&connector) as Arc<dyn BridgeConnector>);

        session.bus().subscribe(names::OFFICE_LOADING, |args| {
            args.cancel = true;
        });

        let result = session.load_office().await;
        assert!(matches!(result, Err(SessionError::CancelEvent { .. })));
        assert_eq!(session.state(), SessionState::Unloaded);
        // Nothing went near the connector
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn test_load_while_loaded_is_rejected() {
        let (mut session, _, _) = loaded_session().await;
        let result = session.load_office().await;
        assert!(matches!(result, Err(SessionError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_create_save_reopen_preserves_kind() {
        let (mut session, _, store) = loaded_session().await;
        let dir = tempdir().unwrap();

        let cases = [
            (DocumentKind::Writer, "report.odt"),
            (DocumentKind::Calc, "sheet.ods"),
            (DocumentKind::Impress, "deck.odp"),
            (DocumentKind::Draw, "diagram.odg"),
        ];

        for (kind, name) in cases {
            let target = dir.path().join(name);
            let target_str = target.to_string_lossy().to_string();

            let doc = session
                .create_document(kind, PropertyBag::new())
                .await
                .unwrap();
            session
                .save_document(&doc, Some(&target_str), None, None)
                .await
                .unwrap();
            session.close_document(&doc, true).await.unwrap();

            // The remote side stored under the resolved URL
            let url = urls::resolve_target_url(&target_str).unwrap();
            assert_eq!(store.kind_at(&url), Some(kind), "{kind}");

            // Reopening the same path resolves to the same URL and kind
            fs::write(&target, "stored").unwrap();
            let reopened = session
                .open_document(&target_str, PropertyBag::new())
                .await
                .unwrap();
            assert_eq!(reopened.kind(), kind, "{kind}");
        }
    }

    #[tokio::test]
    async fn test_open_missing_path_fails_before_remote_call() {
        let (mut session, context, _) = loaded_session().await;

        let result = session
            .open_document("missing/file.ods", PropertyBag::new())
            .await;
        assert!(matches!(result, Err(SessionError::Url(UrlError::NotOpenable(_)))));
        assert_eq!(context.mock_loader().load_calls(), 0);
    }

    #[tokio::test]
    async fn test_loader_returning_nothing_is_an_error() {
        let (mut session, _, _) = loaded_session().await;

        let result = session
            .open_document("file:///tmp/silent.none", PropertyBag::new())
            .await;
        assert!(matches!(result, Err(SessionError::NoComponent { .. })));
    }

    #[tokio::test]
    async fn test_loader_failure_wraps_as_loading_error() {
        let (mut session, context, _) = loaded_session().await;

        // A URL the remote side has never stored raises through the loader
        let result = session
            .open_document("file:///tmp/never-stored.odt", PropertyBag::new())
            .await;
        assert!(matches!(result, Err(SessionError::Loading { .. })));
        assert_eq!(context.mock_loader().load_calls(), 1);
    }

    #[tokio::test]
    async fn test_vetoed_save_never_goes_remote() {
        let (mut session, _, store) = loaded_session().await;
        session.bus().subscribe(names::DOC_SAVING, |args| {
            args.cancel = true;
        });

        let doc = session
            .create_document(DocumentKind::Writer, PropertyBag::new())
            .await
            .unwrap();
        let result = session
            .save_document(&doc, Some("/tmp/out.odt"), None, None)
            .await;

        assert!(matches!(result, Err(SessionError::CancelEvent { .. })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_save_resolves_filter_from_extension() {
        let (mut session, _, store) = loaded_session().await;
        let doc = session
            .create_document(DocumentKind::Writer, PropertyBag::new())
            .await
            .unwrap();

        session
            .save_document(&doc, Some("file:///tmp/report.pdf"), None, None)
            .await
            .unwrap();
        assert_eq!(
            store.kind_at("file:///tmp/report.pdf"),
            Some(DocumentKind::Writer)
        );
    }

    #[tokio::test]
    async fn test_close_veto_surfaces_as_close_veto() {
        let (mut session, _, store) = loaded_session().await;
        let doc: Arc<dyn OfficeDocument> =
            Arc::new(MockDocument::new(DocumentKind::Writer, None, store).with_close_veto());

        let result = session.close_document(&doc, true).await;
        assert!(matches!(result, Err(SessionError::CloseVeto)));
    }

    #[tokio::test]
    async fn test_close_document_clears_current() {
        let (mut session, _, _) = loaded_session().await;
        let doc = session
            .create_document(DocumentKind::Draw, PropertyBag::new())
            .await
            .unwrap();
        assert!(session.current_document().is_some());

        session.close_document(&doc, true).await.unwrap();
        assert!(session.current_document().is_none());
    }

    #[tokio::test]
    async fn test_dispatch_targets_active_frame() {
        let (session, context, _) = loaded_session().await;

        session
            .dispatch_command("Copy", PropertyBag::new())
            .await
            .unwrap();

        let executed = context.mock_dispatcher().executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].0.as_deref(), Some("_blank"));
        assert_eq!(executed[0].1, ".uno:Copy");
    }

    #[tokio::test]
    async fn test_dispatch_requires_loaded_office() {
        let store = MockOfficeStore::new();
        let context = Arc::new(MockContext::new(store));
        let session = session_with(context);

        let result = session.dispatch_command("Copy", PropertyBag::new()).await;
        assert!(matches!(result, Err(SessionError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_close_office_veto_leaves_office_usable() {
        let (mut session, context, _) = loaded_session().await;
        session.bus().subscribe(names::OFFICE_CLOSING, |args| {
            args.cancel = true;
        });

        let result = session.close_office().await;
        assert!(matches!(result, Err(SessionError::CancelEvent { .. })));
        assert_eq!(session.state(), SessionState::Loaded);

        // Still connected and dispatching
        session
            .dispatch_command("Copy", PropertyBag::new())
            .await
            .unwrap();
        assert_eq!(context.mock_dispatcher().executed().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_office_retries_refused_terminations() {
        let store = MockOfficeStore::new();
        let context = Arc::new(MockContext::new(store).with_terminate_refusals(3));
        let mut session = session_with(context);
        session.load_office().await.unwrap();
        let seen = record_events(&session, &[names::RESET, names::OFFICE_CLOSED]);
        seen.lock().unwrap().clear();

        let closed = session.close_office().await.unwrap();
        assert!(closed);
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![names::RESET, names::OFFICE_CLOSED]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_office_gives_up_within_budget() {
        let store = MockOfficeStore::new();
        let context = Arc::new(MockContext::new(store).refusing_terminate_forever());
        let mut session = session_with(context);
        session.load_office().await.unwrap();

        let started = Instant::now();
        let closed = session.close_office().await.unwrap();
        let elapsed = started.elapsed();

        assert!(!closed);
        assert_eq!(session.state(), SessionState::Loaded);
        assert!(elapsed >= Duration::from_secs(2), "gave up too early: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_kill_office_always_resets() {
        let (mut session, _, _) = loaded_session().await;
        let seen = record_events(&session, &[names::RESET, names::OFFICE_CLOSED]);
        seen.lock().unwrap().clear();

        session.kill_office().await;
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![names::RESET, names::OFFICE_CLOSED]
        );

        // Document operations are rejected after teardown
        let result = session.dispatch_command("Copy", PropertyBag::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_non_singleton_reloads_after_close() {
        let (mut session, _, _) = loaded_session().await;
        session.kill_office().await;
        assert_eq!(session.state(), SessionState::Closed);

        session.load_office().await.unwrap();
        assert_eq!(session.state(), SessionState::Loaded);
    }

    #[tokio::test]
    async fn test_default_session_installs_once_and_stays_pinned() {
        let store = MockOfficeStore::new();
        let context = Arc::new(MockContext::new(store.clone()));
        let session = session_with(Arc::clone(&context));
        set_default_session(session).unwrap();

        // Second install is rejected
        let another = session_with(Arc::new(MockContext::new(store)));
        assert!(set_default_session(another).is_err());

        let shared = default_session().unwrap();
        {
            let mut session = shared.lock().await;
            session.load_office().await.unwrap();
            session.kill_office().await;

            // Singleton refuses a second office
            let result = session.load_office().await;
            assert!(matches!(result, Err(SessionError::Loading { .. })));
        }
    }
}
