//! Engine Loop
//!
//! [`Machine`] pulls bytes from a source into a fixed window, matches the
//! current state's triggers, routes literal bytes either straight to output
//! or into the deferred buffer, and runs handlers on matches. The rewritten
//! stream is exposed through [`Machine::transform`] and [`std::io::Read`].
//!
//! Everything runs on the caller's thread; the only blocking point is the
//! source read. An optional [`CancellationToken`] is checked between steps.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::handler::{Action, HandlerRegistry};
use super::state::{Description, StateName};
use crate::config::MachineConfig;
use crate::error::{ConfigError, Error, Result};
use crate::streaming::{Carry, Window, DEFAULT_CAPACITY};
use crate::telemetry::{EventType, MachineEvent, MachineStats};

/// One rewrite session over a byte source.
///
/// Sessions are single-use: after end of stream reads keep returning `Ok(0)`,
/// after any error they return [`Error::Closed`].
pub struct Machine<R, C = ()> {
    source: R,
    description: Arc<Description<C>>,
    context: C,

    current: StateName,

    window: Window,
    carry: Carry,

    /// Literal bytes waiting for a handler decision
    deferred: Vec<u8>,
    /// Bytes ready for the caller
    output: VecDeque<u8>,

    eof: bool,
    closed: bool,
    finished: bool,

    cancel: Option<CancellationToken>,
    log_transitions: bool,
    stats: MachineStats,
}

impl<R: Read, C> Machine<R, C> {
    /// Create a session with the default window size
    pub fn new(
        source: R,
        description: impl Into<Arc<Description<C>>>,
        context: C,
    ) -> Result<Self, ConfigError> {
        Self::with_capacity(source, description, context, DEFAULT_CAPACITY)
    }

    /// Create a session reading through a window of `capacity` bytes.
    ///
    /// The capacity must fit the largest trigger footprint of the table.
    pub fn with_capacity(
        source: R,
        description: impl Into<Arc<Description<C>>>,
        context: C,
        capacity: usize,
    ) -> Result<Self, ConfigError> {
        let description = description.into();
        description.validate(capacity)?;

        Ok(Self {
            source,
            current: description.initial().clone(),
            description,
            context,
            window: Window::new(capacity),
            carry: Carry::default(),
            deferred: Vec::new(),
            output: VecDeque::new(),
            eof: false,
            closed: false,
            finished: false,
            cancel: None,
            log_transitions: false,
            stats: MachineStats::default(),
        })
    }

    /// Stop between steps once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Log state switches at debug level instead of trace
    pub fn log_transitions(mut self, enabled: bool) -> Self {
        self.log_transitions = enabled;
        self
    }

    pub fn state(&self) -> &StateName {
        &self.current
    }

    pub fn stats(&self) -> MachineStats {
        self.stats
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Give back the source and the user context
    pub fn into_parts(self) -> (R, C) {
        (self.source, self.context)
    }

    /// Fill `dst` with rewritten bytes.
    ///
    /// Returns `Ok(0)` only at end of stream (or for an empty `dst`).
    pub fn transform(&mut self, dst: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::Closed);
        }
        if dst.is_empty() {
            return Ok(0);
        }

        match self.run(dst) {
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                self.report(&e);
                Err(e)
            }
        }
    }

    fn run(&mut self, dst: &mut [u8]) -> Result<usize> {
        loop {
            if !self.output.is_empty() {
                return Ok(self.drain(dst));
            }

            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Err(Error::Cancelled);
            }

            let switched = self.step()?;

            self.carry.absorb(self.window.consumed());
            self.window.compact();

            if switched {
                continue;
            }

            if self.eof {
                // Nothing matched by end of stream is passed through
                self.output.extend(self.deferred.drain(..));
                if self.output.is_empty() && self.window.is_empty() {
                    self.finish();
                    return Ok(0);
                }
                continue;
            }

            self.fill()?;
        }
    }

    /// Match once against the window. Returns whether a transition was taken.
    fn step(&mut self) -> Result<bool> {
        if self.window.is_empty() {
            return Ok(false);
        }

        let description = Arc::clone(&self.description);
        let boundary = self.carry.boundary(self.eof);
        let pending = self.window.as_slice();

        let (selected, footprint, defers) = match description.get(&self.current) {
            Some(state) => (state.select(pending, &boundary), state.footprint(), state.defers()),
            None => (None, 0, false),
        };

        // Bytes that no future data can turn into part of a trigger
        let safe = if self.eof || footprint == 0 {
            pending.len()
        } else {
            pending.len().saturating_sub(footprint - 1)
        };

        let (i, transition) = match selected {
            // A match inside the withheld tail could still lose to a
            // transition that only becomes visible with more data
            Some((i, transition)) if self.eof || i < safe => (i, transition),
            _ => {
                if defers {
                    self.deferred.extend_from_slice(&pending[..safe]);
                } else {
                    self.output.extend(&pending[..safe]);
                }
                self.window.consume(safe);
                return Ok(false);
            }
        };

        if defers {
            self.deferred.extend_from_slice(&pending[..i]);
        } else {
            self.output.extend(&pending[..i]);
        }

        let trigger = transition.switch.trigger();
        match &transition.action {
            Action::PassThrough => {
                self.output.extend(self.deferred.drain(..));
                self.output.extend(trigger);
            }
            Action::Replace(handler) => {
                self.stats.handler_calls += 1;
                let replacement = handler
                    .handle(&mut self.context, &self.deferred, trigger)
                    .map_err(|source| Error::Handler {
                        state: self.current.clone(),
                        target: transition.target.clone(),
                        source,
                    })?;
                self.deferred.clear();
                self.output.extend(replacement);
            }
        }
        self.window.consume(i + trigger.len());

        MachineEvent::new(EventType::StateSwitched)
            .with_states(self.current.as_str(), transition.target.as_str())
            .with_trigger(trigger, i)
            .verbose(self.log_transitions)
            .emit();

        self.current = transition.target.clone();
        self.stats.transitions += 1;

        Ok(true)
    }

    fn fill(&mut self) -> Result<()> {
        debug_assert!(self.window.appendable_capacity() > 0, "window full without progress");

        let n = self.window.fill_from(&mut self.source)?;
        if n == 0 {
            self.eof = true;
        } else {
            self.stats.bytes_read += n as u64;
        }
        Ok(())
    }

    fn drain(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.output.len());
        for (slot, byte) in dst.iter_mut().zip(self.output.drain(..n)) {
            *slot = byte;
        }
        self.stats.bytes_written += n as u64;
        n
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        MachineEvent::new(EventType::Finished)
            .with_state(self.current.as_str())
            .with_stats(self.stats)
            .emit();
    }

    fn report(&self, error: &Error) {
        let event_type = match error {
            Error::Io(_) => EventType::SourceFailed,
            Error::Handler { .. } => EventType::HandlerFailed,
            Error::Cancelled => EventType::Cancelled,
            Error::Closed | Error::Task(_) => return,
        };

        MachineEvent::new(event_type)
            .with_state(self.current.as_str())
            .with_reason(&error.to_string())
            .with_stats(self.stats)
            .emit();
    }
}

impl<R: Read, C: 'static> Machine<R, C> {
    /// Build a session from JSON configuration and a handler registry
    pub fn from_config(
        source: R,
        config: &MachineConfig,
        registry: &HandlerRegistry<C>,
        context: C,
    ) -> Result<Self, ConfigError> {
        let description = Description::from_config(config, registry)?;
        let machine = Self::with_capacity(source, description, context, config.buffer_size)?;
        Ok(machine.log_transitions(config.log_transitions))
    }
}

impl<R: Read, C> Read for Machine<R, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.transform(buf).map_err(|e| match e {
            // Source errors pass through untouched
            Error::Io(e) => e,
            other => io::Error::other(other),
        })
    }
}
