//! Connection and session management for a headless LibreOffice process
//!
//! This crate owns the plumbing between an application and a LibreOffice
//! instance reached over the UNO remote protocol: isolated user profiles
//! with first-run caching, process spawning with bounded-retry bridge
//! establishment, a synchronous lifecycle event bus with cooperative
//! cancellation, command dispatch, and a session type tying the document
//! lifecycle together.
//!
//! The remote object model itself (documents, sheets, shapes, styles) lives
//! behind the trait seams in [`uno`]; this crate ships mock implementations
//! for tests and expects a transport crate to provide the real ones.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use uno_session::session::{OfficeSession, SessionConfig};
//! use uno_session::uno::{BridgeConnector, DocumentKind, PropertyBag};
//!
//! async fn run(connector: Arc<dyn BridgeConnector>) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::builder()
//!         .use_profile_cache(true)
//!         .build()?;
//!
//!     let mut session = OfficeSession::new(config, connector);
//!     session.load_office().await?;
//!
//!     let doc = session
//!         .create_document(DocumentKind::Calc, PropertyBag::new())
//!         .await?;
//!     session
//!         .save_document(&doc, Some("/tmp/sheet.ods"), None, None)
//!         .await?;
//!
//!     session.close_office().await?;
//!     Ok(())
//! }
//! ```

pub mod events;
pub mod io;
pub mod logging;
pub mod office;
pub mod session;
pub mod uno;

#[cfg(test)]
mod test_utils;

pub use logging::{LogConfig, init_logging};
pub use office::{ConnectIdentity, ConnectionDescriptor, ProcessBridge, ProfileCache};
pub use session::{OfficeSession, SessionConfig, SessionError, SessionState};
pub use uno::{DocumentKind, PropertyBag, UnoError};
