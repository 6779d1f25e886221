//! Remote object-model seams
//!
//! The session layer talks to the office process through a small set of
//! traits rather than concrete UNO proxies: the hundreds of object-model
//! wrapper types (documents, sheets, shapes, styles) live outside this crate
//! and call back into the session. These traits are the contract between the
//! two sides, and the mock implementations in [`testing`] exercise the whole
//! lifecycle without a running office.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

#[cfg(test)]
pub mod testing;

/// Property bag passed to loaders, stores, and dispatches.
///
/// UNO models these as sequences of named `PropertyValue`s; a JSON map keeps
/// the same shape while staying serializable.
pub type PropertyBag = serde_json::Map<String, Value>;

// ============================================================================
// Document Kinds
// ============================================================================

/// The four document families the session layer distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DocumentKind {
    /// Text documents (Writer)
    Writer,
    /// Spreadsheets (Calc)
    Calc,
    /// Presentations (Impress)
    Impress,
    /// Drawings (Draw)
    Draw,
}

impl DocumentKind {
    /// The `private:factory/...` URL used to create a blank document
    pub fn factory_url(&self) -> &'static str {
        match self {
            DocumentKind::Writer => "private:factory/swriter",
            DocumentKind::Calc => "private:factory/scalc",
            DocumentKind::Impress => "private:factory/simpress",
            DocumentKind::Draw => "private:factory/sdraw",
        }
    }

    /// The UNO service name identifying this document family
    pub fn service_name(&self) -> &'static str {
        match self {
            DocumentKind::Writer => "com.sun.star.text.TextDocument",
            DocumentKind::Calc => "com.sun.star.sheet.SpreadsheetDocument",
            DocumentKind::Impress => "com.sun.star.presentation.PresentationDocument",
            DocumentKind::Draw => "com.sun.star.drawing.DrawingDocument",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocumentKind::Writer => "writer",
            DocumentKind::Calc => "calc",
            DocumentKind::Impress => "impress",
            DocumentKind::Draw => "draw",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// Remote Errors
// ============================================================================

/// Errors surfaced by the remote side of the bridge
#[derive(Debug, thiserror::Error)]
pub enum UnoError {
    /// The office process is not (yet) accepting connections - transient,
    /// the connect retry loop keeps polling on this variant
    #[error("no connection to office process: {0}")]
    NoConnection(String),

    /// The remote side refused a close request
    #[error("close request was vetoed by the remote side")]
    CloseVetoed,

    /// A required remote interface could not be queried
    #[error("missing remote interface: {0}")]
    MissingInterface(String),

    /// A remote invocation failed
    #[error("remote call failed: {0}")]
    Remote(String),
}

impl UnoError {
    /// Whether the connect retry loop should keep polling on this error
    pub fn is_transient(&self) -> bool {
        matches!(self, UnoError::NoConnection(_))
    }
}

// ============================================================================
// Bridge and Component Context
// ============================================================================

/// Establishes a UNO bridge for a given connect string
///
/// Implementations own the transport details (named pipe or TCP socket plus
/// the URP wire protocol). Returning [`UnoError::NoConnection`] signals
/// "office not listening yet" and keeps the bridge's retry loop polling;
/// every other error aborts the connect attempt.
#[async_trait]
pub trait BridgeConnector: Send + Sync {
    /// Attempt to establish a bridge and resolve the remote component context
    async fn connect(&self, connect_string: &str) -> Result<Arc<dyn ComponentContext>, UnoError>;
}

/// The live remote component context obtained through an established bridge
#[async_trait]
pub trait ComponentContext: Send + Sync {
    /// The component loader (desktop) used to open and create documents
    fn loader(&self) -> Result<Arc<dyn ComponentLoader>, UnoError>;

    /// The dispatch provider used to execute named commands
    fn dispatcher(&self) -> Result<Arc<dyn DispatchExecutor>, UnoError>;

    /// Name of the currently active frame, if any
    fn current_frame(&self) -> Option<String>;

    /// Ask the desktop to terminate; `Ok(false)` means the request was
    /// refused (e.g. a modal dialog is open) and may be retried
    async fn terminate(&self) -> Result<bool, UnoError>;
}

/// Loads document components from URLs (the `XComponentLoader` seam)
#[async_trait]
pub trait ComponentLoader: Send + Sync {
    /// Load a component; `Ok(None)` means the loader returned no component
    /// without raising, which callers must treat as a distinct failure
    async fn load_component_from_url(
        &self,
        url: &str,
        props: &PropertyBag,
    ) -> Result<Option<Arc<dyn OfficeDocument>>, UnoError>;
}

/// Executes named dispatch commands against a frame
#[async_trait]
pub trait DispatchExecutor: Send + Sync {
    /// Execute a fully-prefixed command string against the given frame
    async fn execute(
        &self,
        frame: Option<&str>,
        command: &str,
        props: &PropertyBag,
    ) -> Result<Value, UnoError>;
}

// ============================================================================
// Documents
// ============================================================================

/// A loaded document component
#[async_trait]
pub trait OfficeDocument: Send + Sync {
    /// Which document family this component belongs to
    fn kind(&self) -> DocumentKind;

    /// The document's own URL, if it has been stored before
    fn url(&self) -> Option<String>;

    /// Store to the document's own location (plain Save)
    async fn store(&self) -> Result<(), UnoError>;

    /// Store to a new location with an explicit filter and optional password
    /// (SaveAs); overwrite semantics are implied
    async fn store_to_url(
        &self,
        url: &str,
        filter_name: &str,
        password: Option<&str>,
    ) -> Result<(), UnoError>;

    /// Close the document; a remote veto surfaces as
    /// [`UnoError::CloseVetoed`]
    async fn close(&self, deliver_ownership: bool) -> Result<(), UnoError>;
}
