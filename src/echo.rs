//! Foreground echo of completed lines.
//!
//! Takes lines out of the [`LineQueue`] and writes `prefix + line` over the
//! transport with the blocking send. Runs only in the foreground loop.

use crate::handoff::{CompletedLine, LineQueue};
use crate::serial::{SerialPort, SerialTransport, TransportError};

/// Echo service.
pub struct LineEcho {
    prefix: &'static [u8],
    echoed: u32,
}

impl LineEcho {
    pub const fn new(prefix: &'static [u8]) -> Self {
        Self { prefix, echoed: 0 }
    }

    /// Echo the waiting line, if any, and hand the copy back.
    ///
    /// The NUL sentinel is not transmitted.
    pub fn pump<P: SerialPort, const N: usize>(
        &mut self,
        queue: &LineQueue<N>,
        transport: &mut SerialTransport<P>,
    ) -> Result<Option<CompletedLine<N>>, TransportError> {
        let Some(line) = queue.take() else {
            return Ok(None);
        };

        transport.send(self.prefix)?;
        transport.send(line.as_bytes())?;
        self.echoed = self.echoed.wrapping_add(1);
        Ok(Some(line))
    }

    /// Lines echoed since creation.
    pub fn echoed(&self) -> u32 {
        self.echoed
    }
}
