//! Cancellable Read Adapter
//!
//! Runs each machine read on tokio's blocking pool and races it against a
//! [`CancellationToken`]. Cancellation answers the caller immediately; the
//! abandoned step shares the token and stops at its next checkpoint, and
//! whatever it produced is dropped. A blocked source read is not interrupted.

use std::io::Read;

use tokio_util::sync::CancellationToken;

use super::machine::Machine;
use crate::error::{Error, Result};
use crate::telemetry::{EventType, MachineEvent};

/// Size of each read issued by [`CancellableReader::read_to_end`]
const READ_CHUNK: usize = 8 * 1024;

/// Async, cancellable front end for a [`Machine`].
///
/// Only one read may be in flight at a time, which `&mut self` enforces.
pub struct CancellableReader<R, C = ()> {
    /// `None` once a read was cancelled or its task failed
    machine: Option<Machine<R, C>>,
    token: CancellationToken,
}

impl<R, C> CancellableReader<R, C>
where
    R: Read + Send + 'static,
    C: Send + 'static,
{
    pub fn new(machine: Machine<R, C>, token: CancellationToken) -> Self {
        Self {
            machine: Some(machine.with_cancellation(token.clone())),
            token,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether reads are still possible
    pub fn is_open(&self) -> bool {
        self.machine.as_ref().is_some_and(|m| !m.is_closed())
    }

    /// Read rewritten bytes into `dst`; `Ok(0)` means end of stream.
    pub async fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        let mut machine = self.machine.take().ok_or(Error::Closed)?;

        if self.token.is_cancelled() {
            abandoned();
            return Err(Error::Cancelled);
        }

        let mut scratch = vec![0u8; dst.len()];
        let task = tokio::task::spawn_blocking(move || {
            let result = machine.transform(&mut scratch);
            (machine, scratch, result)
        });

        let token = self.token.clone();
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                abandoned();
                Err(Error::Cancelled)
            }
            joined = task => {
                let (machine, scratch, result) = joined?;
                self.machine = Some(machine);

                let n = result?;
                dst[..n].copy_from_slice(&scratch[..n]);
                Ok(n)
            }
        }
    }

    /// Read until end of stream, appending to `out`.
    pub async fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let mut buf = vec![0u8; READ_CHUNK];
        let mut total = 0;

        loop {
            let n = self.read(&mut buf).await?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&buf[..n]);
            total += n;
        }
    }

    /// Take the machine back, unless a read was abandoned
    pub fn into_inner(self) -> Option<Machine<R, C>> {
        self.machine
    }
}

fn abandoned() {
    MachineEvent::new(EventType::Cancelled)
        .with_reason("read abandoned before completion")
        .emit();
}
