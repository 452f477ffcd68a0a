//! ESP-IDF UART port.
//!
//! The IDF driver owns the real UART interrupt and buffers received bytes
//! in its ring; this port exposes that ring through the [`SerialPort`]
//! polling contract.
//!
//! # Hardware Setup
//!
//! ```text
//! ESP32-S3 GPIO17 (TX) ──────▶ modem RX
//! ESP32-S3 GPIO18 (RX) ◀────── modem TX
//! ```

use esp_idf_svc::hal::delay::NON_BLOCK;
use esp_idf_svc::hal::gpio;
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, UartDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys;

use super::{SerialPort, TransportError};
use crate::config::{FrameFormat, Parity, SerialConfig, TxReadySignal};

fn data_bits(frame: &FrameFormat) -> Result<uart::config::DataBits, TransportError> {
    match frame.data_bits {
        5 => Ok(uart::config::DataBits::DataBits5),
        6 => Ok(uart::config::DataBits::DataBits6),
        7 => Ok(uart::config::DataBits::DataBits7),
        8 => Ok(uart::config::DataBits::DataBits8),
        _ => Err(TransportError::Framing),
    }
}

fn parity(frame: &FrameFormat) -> uart::config::Parity {
    match frame.parity {
        Parity::None => uart::config::Parity::ParityNone,
        Parity::Even => uart::config::Parity::ParityEven,
        Parity::Odd => uart::config::Parity::ParityOdd,
    }
}

fn stop_bits(frame: &FrameFormat) -> Result<uart::config::StopBits, TransportError> {
    match frame.stop_bits {
        1 => Ok(uart::config::StopBits::STOP1),
        2 => Ok(uart::config::StopBits::STOP2),
        _ => Err(TransportError::Framing),
    }
}

/// UART driver adapted to [`SerialPort`].
pub struct EspUartPort<'d> {
    uart: UartDriver<'d>,
    last_rx: u8,
}

impl<'d> EspUartPort<'d> {
    /// Install the IDF UART driver on the given pins at the configured baud.
    ///
    /// Framing is applied by [`SerialTransport::initialize`](super::SerialTransport::initialize).
    pub fn new<U: uart::Uart>(
        uart: impl Peripheral<P = U> + 'd,
        tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
        rx_pin: impl Peripheral<P = impl gpio::InputPin> + 'd,
        config: &SerialConfig,
    ) -> Result<Self, sys::EspError> {
        let uart_config = uart::config::Config::default().baudrate(Hertz(config.baud_rate));

        let uart = UartDriver::new(
            uart,
            tx_pin,
            rx_pin,
            Option::<gpio::AnyIOPin>::None, // CTS
            Option::<gpio::AnyIOPin>::None, // RTS
            &uart_config,
        )?;

        Ok(Self { uart, last_rx: 0 })
    }
}

impl SerialPort for EspUartPort<'_> {
    fn configure(&mut self, config: &SerialConfig, _divisor: u16) -> Result<(), TransportError> {
        // The IDF computes its own divisor from the APB clock
        let frame = &config.frame;
        let data_bits = data_bits(frame)?;
        let stop_bits = stop_bits(frame)?;

        let peripheral = |_| TransportError::Peripheral;
        self.uart.change_baudrate(Hertz(config.baud_rate)).map_err(peripheral)?;
        self.uart.change_data_bits(data_bits).map_err(peripheral)?;
        self.uart.change_parity(parity(frame)).map_err(peripheral)?;
        self.uart.change_stop_bits(stop_bits).map_err(peripheral)?;
        Ok(())
    }

    fn tx_ready(&mut self, signal: TxReadySignal) -> bool {
        match signal {
            // Driver write blocks on FIFO space itself
            TxReadySignal::BufferEmpty => true,
            TxReadySignal::ShiftRegisterEmpty => {
                // SAFETY: Port number comes from an installed driver.
                unsafe { sys::uart_wait_tx_done(self.uart.port(), 0) == sys::ESP_OK }
            }
        }
    }

    fn write_data(&mut self, byte: u8) -> Result<(), TransportError> {
        match self.uart.write(&[byte]) {
            Ok(1) => Ok(()),
            _ => Err(TransportError::Peripheral),
        }
    }

    fn rx_ready(&self) -> bool {
        let mut len: usize = 0;
        // SAFETY: Port number comes from an installed driver, `len` is a
        // valid out pointer.
        let err = unsafe { sys::uart_get_buffered_data_len(self.uart.port(), &mut len) };
        err == sys::ESP_OK && len > 0
    }

    fn read_data(&mut self) -> u8 {
        let mut byte = [0u8; 1];
        if let Ok(1) = self.uart.read(&mut byte, NON_BLOCK) {
            self.last_rx = byte[0];
        }
        self.last_rx
    }
}
