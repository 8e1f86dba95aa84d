//! # Events Module
//!
//! Typed file-lifecycle events, a synchronous publish/subscribe bus, and an
//! event-driven directory verifier.
//!
//! ## Design
//! The pipeline publishes an event for every mutating filesystem operation
//! *after* the operation is verified. Delivery is synchronous and in publish
//! order, so subscribers (the verifier, a UI bridge) always observe a state
//! consistent with the pipeline's own view.
//!
//! ## Example
//! ```rust,ignore
//! let bus = Arc::new(EventBus::new());
//! let verifier = DirectoryVerifier::new(&[dest.as_path()], bus.clone())?;
//!
//! // ... run the pipeline with this bus ...
//!
//! assert!(verifier.report());
//! ```

mod bus;
mod channel;
mod types;
mod verifier;

pub use bus::{EventBus, SubscriberId};
pub use channel::{EventBridge, EventReceiver};
pub use types::*;
pub use verifier::{DirectoryVerifier, VerifierStats};
