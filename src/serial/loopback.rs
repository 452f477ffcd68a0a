//! Simulated UART for host builds and tests.
//!
//! Models the parts of a real peripheral the link cares about:
//!
//! - RX holding queue fed by [`inject`](LoopbackPort::inject) (the peer) or,
//!   with loopback enabled, by our own transmitted bytes
//! - RX overrun: bytes arriving while the queue is full are lost and counted
//! - TX readiness that can be held busy for a number of polls, or forever
//! - A transmitter that rejects writes, like a failing driver
//! - A data register that keeps its last value, so reading when nothing is
//!   pending returns stale data just like the hardware

use super::{SerialPort, TransportError};
use crate::config::{SerialConfig, TxReadySignal};

/// Default queue depth for both directions.
pub const LOOPBACK_DEPTH: usize = 256;

/// Host-side UART model.
pub struct LoopbackPort<const N: usize = LOOPBACK_DEPTH> {
    rx: [u8; N],
    rx_head: usize,
    rx_len: usize,
    tx: [u8; N],
    tx_len: usize,
    last_rx: u8,
    loopback: bool,
    busy_polls: u32,
    busy_left: u32,
    stuck: bool,
    write_fault: bool,
    configured: Option<(SerialConfig, u16)>,
    overruns: u32,
    acks: u32,
    polls: u32,
}

impl<const N: usize> LoopbackPort<N> {
    /// Create an idle port with loopback disabled.
    pub const fn new() -> Self {
        Self {
            rx: [0u8; N],
            rx_head: 0,
            rx_len: 0,
            tx: [0u8; N],
            tx_len: 0,
            last_rx: 0,
            loopback: false,
            busy_polls: 0,
            busy_left: 0,
            stuck: false,
            write_fault: false,
            configured: None,
            overruns: 0,
            acks: 0,
            polls: 0,
        }
    }

    /// Create a port whose transmitted bytes are received back.
    pub const fn looped() -> Self {
        let mut port = Self::new();
        port.loopback = true;
        port
    }

    /// Route transmitted bytes back into the receive queue.
    pub fn set_loopback(&mut self, enabled: bool) {
        self.loopback = enabled;
    }

    /// Report busy for `polls` readiness checks after every written byte.
    pub fn set_busy_polls(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    /// Never report transmit-ready.
    pub fn set_stuck(&mut self, stuck: bool) {
        self.stuck = stuck;
    }

    /// Reject every write with `TransportError::Peripheral`.
    pub fn set_write_fault(&mut self, fault: bool) {
        self.write_fault = fault;
    }

    /// Bytes arriving from the peer.
    pub fn inject(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.receive(b);
        }
    }

    fn receive(&mut self, byte: u8) {
        if self.rx_len == N {
            self.overruns += 1;
            return;
        }
        self.rx[(self.rx_head + self.rx_len) % N] = byte;
        self.rx_len += 1;
    }

    /// Everything written to the transmitter, up to the queue depth.
    pub fn transmitted(&self) -> &[u8] {
        &self.tx[..self.tx_len]
    }

    /// Forget transmitted bytes.
    pub fn clear_transmitted(&mut self) {
        self.tx_len = 0;
    }

    /// Received bytes not yet read.
    pub fn rx_pending(&self) -> usize {
        self.rx_len
    }

    /// Configuration and divisor last programmed.
    pub fn configured(&self) -> Option<&(SerialConfig, u16)> {
        self.configured.as_ref()
    }

    /// Bytes lost to a full receive queue.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Receive interrupt acknowledgements.
    pub fn acks(&self) -> u32 {
        self.acks
    }

    /// Transmit-ready polls performed.
    pub fn tx_polls(&self) -> u32 {
        self.polls
    }
}

impl<const N: usize> Default for LoopbackPort<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SerialPort for LoopbackPort<N> {
    fn configure(&mut self, config: &SerialConfig, divisor: u16) -> Result<(), TransportError> {
        self.configured = Some((*config, divisor));
        Ok(())
    }

    fn tx_ready(&mut self, _signal: TxReadySignal) -> bool {
        self.polls = self.polls.wrapping_add(1);
        if self.stuck {
            return false;
        }
        if self.busy_left > 0 {
            self.busy_left -= 1;
            return false;
        }
        true
    }

    fn write_data(&mut self, byte: u8) -> Result<(), TransportError> {
        if self.write_fault {
            return Err(TransportError::Peripheral);
        }
        if self.tx_len < N {
            self.tx[self.tx_len] = byte;
            self.tx_len += 1;
        }
        let rx_enabled = self.configured.map(|(c, _)| c.rx_enable).unwrap_or(false);
        if self.loopback && rx_enabled {
            self.receive(byte);
        }
        self.busy_left = self.busy_polls;
        Ok(())
    }

    fn rx_ready(&self) -> bool {
        self.rx_len > 0
    }

    fn read_data(&mut self) -> u8 {
        if self.rx_len > 0 {
            self.last_rx = self.rx[self.rx_head];
            self.rx_head = (self.rx_head + 1) % N;
            self.rx_len -= 1;
        }
        self.last_rx
    }

    fn acknowledge_rx(&mut self) {
        self.acks += 1;
    }
}
