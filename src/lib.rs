//! Streaming state-machine byte rewriter
//!
//! A [`Machine`] reads a byte source incrementally, recognizes configured
//! trigger sequences (optionally bounded by delimiter bytes and subject to
//! `\` escapes) and rewrites the stream: bytes between triggers are passed
//! through or handed to a data handler that decides their replacement.
//! Nothing is buffered beyond a fixed window plus the region a handler is
//! waiting for, so the rewriter composes as an [`std::io::Read`] stage.
//!
//! ```no_run
//! use std::io::Read;
//! use stream_fsm::{Description, HandlerError, Machine, State, Switch, Transition};
//!
//! let bang = |_: &mut (), deferred: &[u8], _: &[u8]| -> Result<Vec<u8>, HandlerError> {
//!     Ok([deferred, b"!".as_slice()].concat())
//! };
//!
//! let table = Description::new("text")
//!     .state("text", State::new(vec![Transition::pass("tag", Switch::new("<")?)]))
//!     .state("tag", State::new(vec![Transition::replace("text", Switch::new(">")?, bang)]));
//!
//! let mut machine = Machine::new(&b"a<b>c"[..], table, ())?;
//! let mut out = String::new();
//! machine.read_to_string(&mut out)?;
//! assert_eq!(out, "a<b!c");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`CancellableReader`] wraps a machine for async callers that need to
//! abandon a read when a [`tokio_util::sync::CancellationToken`] fires.

pub mod config;
pub mod error;
pub mod fsm;
pub mod streaming;
pub mod telemetry;

pub use config::MachineConfig;
pub use error::{ConfigError, Error, Result};
pub use fsm::{
    Action, CancellableReader, DataHandler, Description, HandlerError, HandlerRegistry, Machine, State, StateName,
    Transition,
};
pub use streaming::{Delimiters, Switch};
pub use telemetry::MachineStats;
