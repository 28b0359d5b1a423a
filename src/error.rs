use std::io;

use thiserror::Error;

use crate::fsm::{HandlerError, StateName};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors terminating a read on a machine session.
///
/// Every variant except end of stream (which is `Ok(0)`, not an error) is
/// fatal: the session refuses further reads with [`Error::Closed`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("source read failed: {0}")]
    Io(#[from] io::Error),

    #[error("data handler failed in state `{state}` switching to `{target}`: {source}")]
    Handler {
        state: StateName,
        target: StateName,
        #[source]
        source: HandlerError,
    },

    #[error("read cancelled")]
    Cancelled,

    #[error("session is closed after a previous failure")]
    Closed,

    #[error("background read task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors building a state table or loading its configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("trigger must not be empty")]
    EmptyTrigger,

    #[error("unknown initial state `{0}`")]
    UnknownState(StateName),

    #[error("state `{state}` has a transition to unknown state `{target}`")]
    UnknownTarget { state: StateName, target: StateName },

    #[error("unknown data handler `{0}`")]
    UnknownHandler(String),

    #[error("buffer of {capacity} bytes cannot hold a trigger footprint of {footprint} bytes")]
    BufferTooSmall { capacity: usize, footprint: usize },
}
