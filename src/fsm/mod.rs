//! State machine rewriting
//!
//! This module provides:
//! - State table (states, transitions, selection)
//! - Data handlers and the built-in ones
//! - The engine loop driving a session over a source
//! - An async adapter racing reads against cancellation

pub mod cancellable;
pub mod handler;
pub mod machine;
pub mod state;

pub use cancellable::CancellableReader;
pub use handler::{skip_deferred, skip_token, void, Action, DataHandler, HandlerError, HandlerRegistry};
pub use machine::Machine;
pub use state::{Description, State, StateName, Transition};
