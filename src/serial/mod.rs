//! Serial transport.
//!
//! [`SerialPort`] is the register-level seam: one implementation per
//! platform (ESP-IDF UART driver on the device, [`LoopbackPort`] on the
//! host). [`SerialTransport`] builds the link primitives on top of it:
//! one-time initialization, busy-wait send, receive-ready polling and
//! byte reads.
//!
//! # Blocking
//!
//! `send` polls the transmit-ready condition with no timeout. A peripheral
//! that never becomes ready hangs the caller; use `send_bounded` where that
//! must be reported instead. Never call either from interrupt context.

pub mod loopback;

#[cfg(target_os = "espidf")]
pub mod esp;

pub use loopback::LoopbackPort;

use core::fmt;

use crate::config::{BaudError, SerialConfig, TxReadySignal};

/// Register-level access to a UART peripheral.
pub trait SerialPort {
    /// Program baud divisor, framing and enable bits.
    fn configure(&mut self, config: &SerialConfig, divisor: u16) -> Result<(), TransportError>;

    /// Poll the given transmit-ready condition.
    fn tx_ready(&mut self, signal: TxReadySignal) -> bool;

    /// Hand one byte to the transmitter.
    fn write_data(&mut self, byte: u8) -> Result<(), TransportError>;

    /// A received byte is waiting. Must be side-effect free.
    fn rx_ready(&self) -> bool;

    /// Read the received byte, clearing the ready condition.
    fn read_data(&mut self) -> u8;

    /// Acknowledge the receive interrupt after draining.
    fn acknowledge_rx(&mut self) {}
}

/// Transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// `initialize` has not succeeded yet.
    NotInitialized,
    /// Transmitter busy (non-blocking send only).
    WouldBlock,
    /// Transmitter stayed busy for the whole poll budget.
    Stalled { sent: usize },
    /// Baud rate not achievable.
    Baud(BaudError),
    /// Driver rejected the operation.
    Peripheral,
    /// Transmitter disabled by configuration.
    Disabled,
    /// Frame format not supported.
    Framing,
}

impl TransportError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "T01",
            Self::WouldBlock => "T02",
            Self::Stalled { .. } => "T03",
            Self::Baud(_) => "T04",
            Self::Peripheral => "T05",
            Self::Disabled => "T06",
            Self::Framing => "T07",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::NotInitialized => "transport not initialized",
            Self::WouldBlock => "transmitter busy",
            Self::Stalled { .. } => "transmitter stalled",
            Self::Baud(_) => "invalid baud configuration",
            Self::Peripheral => "peripheral error",
            Self::Disabled => "transmitter disabled",
            Self::Framing => "unsupported frame format",
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stalled { sent } => write!(f, "{}: {} after {} bytes", self.code(), self.message(), sent),
            Self::Baud(e) => write!(f, "{}: {} ({})", self.code(), self.message(), e),
            _ => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}

impl From<BaudError> for TransportError {
    fn from(e: BaudError) -> Self {
        TransportError::Baud(e)
    }
}

/// Link primitives over a [`SerialPort`].
pub struct SerialTransport<P> {
    port: P,
    config: Option<SerialConfig>,
}

impl<P: SerialPort> SerialTransport<P> {
    /// Wrap an unconfigured port.
    pub const fn new(port: P) -> Self {
        Self { port, config: None }
    }

    /// Program the line parameters and enable the link.
    ///
    /// Intended to run once at start-up. A later call reprograms the port.
    pub fn initialize(&mut self, config: SerialConfig) -> Result<(), TransportError> {
        if !config.frame.is_valid() {
            return Err(TransportError::Framing);
        }
        let divisor = config.divisor()?;
        self.port.configure(&config, divisor)?;
        self.config = Some(config);
        Ok(())
    }

    /// Active configuration, if initialized.
    pub fn config(&self) -> Option<&SerialConfig> {
        self.config.as_ref()
    }

    fn tx_signal(&self) -> Result<TxReadySignal, TransportError> {
        match &self.config {
            None => Err(TransportError::NotInitialized),
            Some(c) if !c.tx_enable => Err(TransportError::Disabled),
            Some(c) => Ok(c.tx_ready),
        }
    }

    /// Send bytes in order, busy-waiting on transmit-ready before each.
    ///
    /// Returns once the last byte is handed to hardware, not when it has
    /// left the wire. Hangs forever if the transmitter never becomes ready.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let signal = self.tx_signal()?;
        for &byte in bytes {
            while !self.port.tx_ready(signal) {
                core::hint::spin_loop();
            }
            self.port.write_data(byte)?;
        }
        Ok(())
    }

    /// Like [`send`](Self::send), but gives up on a byte after `max_polls`
    /// unsuccessful readiness polls.
    pub fn send_bounded(&mut self, bytes: &[u8], max_polls: u32) -> Result<(), TransportError> {
        let signal = self.tx_signal()?;
        for (sent, &byte) in bytes.iter().enumerate() {
            let mut polls = 0u32;
            while !self.port.tx_ready(signal) {
                polls += 1;
                if polls >= max_polls {
                    return Err(TransportError::Stalled { sent });
                }
                core::hint::spin_loop();
            }
            self.port.write_data(byte)?;
        }
        Ok(())
    }

    /// Send one byte if the transmitter is ready right now.
    pub fn try_send_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        let signal = self.tx_signal()?;
        if !self.port.tx_ready(signal) {
            return Err(TransportError::WouldBlock);
        }
        self.port.write_data(byte)
    }

    /// A received byte is waiting. Safe from interrupt context.
    #[inline]
    pub fn receive_ready(&self) -> bool {
        self.config.is_some_and(|c| c.rx_enable) && self.port.rx_ready()
    }

    /// Read the received byte.
    ///
    /// Only meaningful after `receive_ready()` returned true; otherwise the
    /// port returns whatever stale value its data register holds.
    #[inline]
    pub fn read_byte(&mut self) -> u8 {
        self.port.read_data()
    }

    /// Read a byte if one is waiting.
    #[inline]
    pub fn try_read_byte(&mut self) -> Option<u8> {
        if self.receive_ready() {
            Some(self.port.read_data())
        } else {
            None
        }
    }

    /// Re-arm the receive interrupt.
    #[inline]
    pub fn acknowledge_receive(&mut self) {
        self.port.acknowledge_rx();
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

}
