//! Office process connection layer
//!
//! Everything needed to get from "no office running" to a live bridge:
//!
//! - **ProfileCache**: isolated user profile with an optional persisted copy
//! - **ConnectionDescriptor**: pipe/socket identity plus startup flags
//! - **ProcessBridge**: spawn + bounded-retry bridge establishment
//!
//! The session layer owns exactly one bridge (or none, in direct-attach
//! mode); working/profile directories belong exclusively to the bridge that
//! created them and are never shared across concurrently live bridges.

pub mod bridge;
pub mod descriptor;
pub mod error;
pub mod profile;

// Re-export main types for convenience
pub use bridge::{BridgeState, ProcessBridge, DEFAULT_CONNECT_TIMEOUT, DEFAULT_POLL_INTERVAL};
pub use descriptor::{ConnectIdentity, ConnectionDescriptor, DEFAULT_SOFFICE_PATH};
pub use error::{ConnectionError, ProfileError};
pub use profile::ProfileCache;
