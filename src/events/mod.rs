//! Lifecycle event system
//!
//! Every stateful session operation is sequenced through a synchronous
//! publish/subscribe bus:
//!
//! - **Bus**: insertion-ordered synchronous dispatch, handler removal by id
//! - **Args**: one mutable payload type; cancelable publishes inspect the
//!   `cancel`/`handled` flags after all subscribers have run
//! - **Names**: the well-known event name constants
//!
//! Cancellation is cooperative and carried as data: the bus reports the
//! outcome and the publishing operation decides whether to fail.

pub mod args;
pub mod bus;
pub mod names;

// Re-export main types for convenience
pub use args::{CancelOutcome, EventArgs};
pub use bus::{EventBus, EventHandler, HandlerId};
