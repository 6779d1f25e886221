//! Mock implementations of the remote object-model seams
//!
//! Backed by an in-memory document store so session tests can exercise the
//! full load/open/save/close/dispatch lifecycle without a running office.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    BridgeConnector, ComponentContext, ComponentLoader, DispatchExecutor, DocumentKind,
    OfficeDocument, PropertyBag, UnoError,
};

/// Shared in-memory "filesystem" of stored documents, keyed by URL
#[derive(Clone, Default)]
pub struct MockOfficeStore {
    documents: Arc<Mutex<HashMap<String, DocumentKind>>>,
}

impl MockOfficeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, kind: DocumentKind) {
        self.documents.lock().unwrap().insert(url.into(), kind);
    }

    pub fn kind_at(&self, url: &str) -> Option<DocumentKind> {
        self.documents.lock().unwrap().get(url).copied()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mock document backed by [`MockOfficeStore`]
pub struct MockDocument {
    kind: DocumentKind,
    url: Mutex<Option<String>>,
    store: MockOfficeStore,
    veto_close: bool,
    store_calls: AtomicUsize,
}

impl MockDocument {
    pub fn new(kind: DocumentKind, url: Option<String>, store: MockOfficeStore) -> Self {
        Self {
            kind,
            url: Mutex::new(url),
            store,
            veto_close: false,
            store_calls: AtomicUsize::new(0),
        }
    }

    /// Make every close attempt raise a veto
    pub fn with_close_veto(mut self) -> Self {
        self.veto_close = true;
        self
    }

    pub fn store_calls(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OfficeDocument for MockDocument {
    fn kind(&self) -> DocumentKind {
        self.kind
    }

    fn url(&self) -> Option<String> {
        self.url.lock().unwrap().clone()
    }

    async fn store(&self) -> Result<(), UnoError> {
        let url = self
            .url
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| UnoError::Remote("document has no location".to_string()))?;
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        self.store.insert(url, self.kind);
        Ok(())
    }

    async fn store_to_url(
        &self,
        url: &str,
        _filter_name: &str,
        _password: Option<&str>,
    ) -> Result<(), UnoError> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        self.store.insert(url, self.kind);
        *self.url.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn close(&self, _deliver_ownership: bool) -> Result<(), UnoError> {
        if self.veto_close {
            return Err(UnoError::CloseVetoed);
        }
        Ok(())
    }
}

/// Mock component loader
///
/// `private:factory/...` URLs create blank documents; stored URLs reopen the
/// stored kind; anything else fails like a remote loader would. URLs ending
/// in `.none` reproduce the "loader returned no component" case.
pub struct MockLoader {
    store: MockOfficeStore,
    load_calls: AtomicUsize,
}

impl MockLoader {
    pub fn new(store: MockOfficeStore) -> Self {
        Self {
            store,
            load_calls: AtomicUsize::new(0),
        }
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComponentLoader for MockLoader {
    async fn load_component_from_url(
        &self,
        url: &str,
        _props: &PropertyBag,
    ) -> Result<Option<Arc<dyn OfficeDocument>>, UnoError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);

        if url.ends_with(".none") {
            return Ok(None);
        }

        let kind = match url {
            "private:factory/swriter" => Some(DocumentKind::Writer),
            "private:factory/scalc" => Some(DocumentKind::Calc),
            "private:factory/simpress" => Some(DocumentKind::Impress),
            "private:factory/sdraw" => Some(DocumentKind::Draw),
            _ => None,
        };

        if let Some(kind) = kind {
            return Ok(Some(Arc::new(MockDocument::new(
                kind,
                None,
                self.store.clone(),
            ))));
        }

        match self.store.kind_at(url) {
            Some(kind) => Ok(Some(Arc::new(MockDocument::new(
                kind,
                Some(url.to_string()),
                self.store.clone(),
            )))),
            None => Err(UnoError::Remote(format!("cannot load {url}"))),
        }
    }
}

/// Mock dispatch executor recording every executed command
pub struct MockDispatchExecutor {
    executed: Mutex<Vec<(Option<String>, String, PropertyBag)>>,
    delay: Option<Duration>,
}

impl MockDispatchExecutor {
    pub fn new() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Simulate a slow remote call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn executed(&self) -> Vec<(Option<String>, String, PropertyBag)> {
        self.executed.lock().unwrap().clone()
    }
}

impl Default for MockDispatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DispatchExecutor for MockDispatchExecutor {
    async fn execute(
        &self,
        frame: Option<&str>,
        command: &str,
        props: &PropertyBag,
    ) -> Result<Value, UnoError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.executed.lock().unwrap().push((
            frame.map(str::to_string),
            command.to_string(),
            props.clone(),
        ));
        Ok(Value::String(command.to_string()))
    }
}

/// Mock component context wiring the mock loader and dispatcher together
pub struct MockContext {
    loader: Arc<MockLoader>,
    dispatcher: Arc<MockDispatchExecutor>,
    /// How many terminate calls to refuse before accepting
    terminate_refusals: AtomicUsize,
    /// Refuse terminate forever (modal dialog stuck open)
    never_terminate: bool,
}

impl MockContext {
    pub fn new(store: MockOfficeStore) -> Self {
        Self {
            loader: Arc::new(MockLoader::new(store)),
            dispatcher: Arc::new(MockDispatchExecutor::new()),
            terminate_refusals: AtomicUsize::new(0),
            never_terminate: false,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<MockDispatchExecutor>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_terminate_refusals(self, refusals: usize) -> Self {
        self.terminate_refusals.store(refusals, Ordering::SeqCst);
        self
    }

    pub fn refusing_terminate_forever(mut self) -> Self {
        self.never_terminate = true;
        self
    }

    pub fn mock_loader(&self) -> &MockLoader {
        &self.loader
    }

    pub fn mock_dispatcher(&self) -> &MockDispatchExecutor {
        &self.dispatcher
    }
}

#[async_trait]
impl ComponentContext for MockContext {
    fn loader(&self) -> Result<Arc<dyn ComponentLoader>, UnoError> {
        Ok(Arc::clone(&self.loader) as Arc<dyn ComponentLoader>)
    }

    fn dispatcher(&self) -> Result<Arc<dyn DispatchExecutor>, UnoError> {
        Ok(Arc::clone(&self.dispatcher) as Arc<dyn DispatchExecutor>)
    }

    fn current_frame(&self) -> Option<String> {
        Some("_blank".to_string())
    }

    async fn terminate(&self) -> Result<bool, UnoError> {
        if self.never_terminate {
            return Ok(false);
        }
        let remaining = self.terminate_refusals.load(Ordering::SeqCst);
        if remaining > 0 {
            self.terminate_refusals.store(remaining - 1, Ordering::SeqCst);
            return Ok(false);
        }
        Ok(true)
    }
}

/// Mock connector that refuses the first N attempts with
/// [`UnoError::NoConnection`], mimicking office startup delay
pub struct MockConnector {
    context: Arc<MockContext>,
    fail_attempts: usize,
    attempts: AtomicUsize,
    /// Fail every attempt forever (office never comes up)
    never_connects: bool,
}

impl MockConnector {
    pub fn new(context: Arc<MockContext>) -> Self {
        Self {
            context,
            fail_attempts: 0,
            attempts: AtomicUsize::new(0),
            never_connects: false,
        }
    }

    pub fn failing_first(mut self, attempts: usize) -> Self {
        self.fail_attempts = attempts;
        self
    }

    pub fn never_connecting(mut self) -> Self {
        self.never_connects = true;
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BridgeConnector for MockConnector {
    async fn connect(&self, _connect_string: &str) -> Result<Arc<dyn ComponentContext>, UnoError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.never_connects || attempt < self.fail_attempts {
            return Err(UnoError::NoConnection(
                "office not accepting connections yet".to_string(),
            ));
        }
        Ok(Arc::clone(&self.context) as Arc<dyn ComponentContext>)
    }
}
