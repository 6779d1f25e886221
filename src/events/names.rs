//! Well-known event names published by the session layer
//!
//! Every stateful operation publishes a cancelable "...ing" event before
//! acting and an informational "...ed" event after.

/// Office process is about to be loaded (cancelable)
pub const OFFICE_LOADING: &str = "officeLoading";
/// Office process was loaded and the bridge is connected
pub const OFFICE_LOADED: &str = "officeLoaded";
/// Office is about to be closed gracefully (cancelable)
pub const OFFICE_CLOSING: &str = "officeClosing";
/// Office was closed (gracefully or killed)
pub const OFFICE_CLOSED: &str = "officeClosed";

/// A document is about to be opened (cancelable)
pub const DOC_OPENING: &str = "docOpening";
/// A document was opened
pub const DOC_OPENED: &str = "docOpened";
/// A document is about to be created (cancelable)
pub const DOC_CREATING: &str = "docCreating";
/// A document was created
pub const DOC_CREATED: &str = "docCreated";
/// A document is about to be saved (cancelable)
pub const DOC_SAVING: &str = "docSaving";
/// A document was saved
pub const DOC_SAVED: &str = "docSaved";
/// A document is about to be closed (cancelable)
pub const DOC_CLOSING: &str = "docClosing";
/// A document was closed
pub const DOC_CLOSED: &str = "docClosed";

/// A command is about to be dispatched (cancelable; subscribers may mutate
/// the property bag carried in the payload)
pub const DISPATCHING: &str = "dispatching";
/// A command was dispatched; the payload carries the result when available
pub const DISPATCHED: &str = "dispatched";

/// Session-scoped cached state must be invalidated
pub const RESET: &str = "reset";

/// Re-published when a cancelable event ends up cancelled-and-unhandled;
/// the payload's `event` extension names the original event. Process-wide:
/// subscribers must check which event they are reacting to.
pub const GLOBAL_CANCEL: &str = "globalCancel";

/// Payload extension key carrying the original event name on
/// [`GLOBAL_CANCEL`]
pub const KEY_SOURCE_EVENT: &str = "event";

/// Payload extension key carrying the normalized command URL on
/// [`DISPATCHING`]/[`DISPATCHED`]
pub const KEY_COMMAND: &str = "command";
/// Payload extension key carrying mutable dispatch/load properties
pub const KEY_PROPS: &str = "props";
/// Payload extension key carrying a dispatch result on [`DISPATCHED`]
pub const KEY_RESULT: &str = "result";
/// Payload extension key carrying a source path or URL
pub const KEY_SOURCE: &str = "source";
/// Payload extension key carrying a resolved target URL
pub const KEY_URL: &str = "url";
/// Payload extension key carrying a document kind name
pub const KEY_KIND: &str = "kind";
