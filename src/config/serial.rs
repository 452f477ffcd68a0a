//! Serial line parameters and baud-rate generator math.
//!
//! The link runs asynchronous 8-N-1. The baud rate is derived from the
//! peripheral clock through a divisor whose scale depends on the generator
//! mode (8 or 16 bit, low or high speed):
//!
//! ```text
//! baud = clock_hz / (scale * (divisor + 1))
//!
//!   Low8    scale 64
//!   High8   scale 16
//!   Low16   scale 16
//!   High16  scale  4
//! ```

use core::fmt;

/// Largest acceptable deviation between requested and generated baud rate.
pub const MAX_BAUD_ERROR_PERMILLE: u32 = 30;

/// Baud-rate generator mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaudGenerator {
    /// 8-bit divisor, low speed.
    Low8,
    /// 8-bit divisor, high speed.
    High8,
    /// 16-bit divisor, low speed.
    Low16,
    /// 16-bit divisor, high speed.
    High16,
}

impl BaudGenerator {
    /// Clock divider applied on top of `divisor + 1`.
    pub const fn scale(self) -> u32 {
        match self {
            BaudGenerator::Low8 => 64,
            BaudGenerator::High8 | BaudGenerator::Low16 => 16,
            BaudGenerator::High16 => 4,
        }
    }

    /// Largest divisor register value.
    pub const fn max_divisor(self) -> u32 {
        match self {
            BaudGenerator::Low8 | BaudGenerator::High8 => 0xFF,
            BaudGenerator::Low16 | BaudGenerator::High16 => 0xFFFF,
        }
    }
}

/// Condition polled before each transmitted byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxReadySignal {
    /// Transmit holding buffer can take another byte.
    BufferEmpty,
    /// Transmit shift register is idle (previous byte fully shifted out).
    ShiftRegisterEmpty,
}

/// Character framing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameFormat {
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl FrameFormat {
    /// 8 data bits, no parity, 1 stop bit.
    pub const EIGHT_N_ONE: Self = Self {
        data_bits: 8,
        parity: Parity::None,
        stop_bits: 1,
    };

    /// 5 to 8 data bits, 1 or 2 stop bits.
    pub const fn is_valid(&self) -> bool {
        self.data_bits >= 5 && self.data_bits <= 8 && self.stop_bits >= 1 && self.stop_bits <= 2
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Baud configuration error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaudError {
    /// Requested baud rate is zero.
    ZeroBaud,
    /// No divisor in range produces the requested rate.
    Unreachable,
    /// Closest divisor deviates by more than [`MAX_BAUD_ERROR_PERMILLE`].
    ExcessiveError { permille: u32 },
}

impl fmt::Display for BaudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaudError::ZeroBaud => write!(f, "baud rate is zero"),
            BaudError::Unreachable => write!(f, "baud rate out of generator range"),
            BaudError::ExcessiveError { permille } => {
                write!(f, "baud rate error {}.{}% too high", permille / 10, permille % 10)
            }
        }
    }
}

/// Serial transport configuration, fixed after start-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerialConfig {
    /// Requested baud rate.
    pub baud_rate: u32,
    /// Peripheral clock feeding the baud generator.
    pub clock_hz: u32,
    pub generator: BaudGenerator,
    pub frame: FrameFormat,
    pub tx_ready: TxReadySignal,
    /// When clear, every send fails with `TransportError::Disabled`.
    pub tx_enable: bool,
    /// When clear, received bytes are never reported ready.
    pub rx_enable: bool,
}

impl SerialConfig {
    /// 115200 baud from 16 MHz, 16-bit high-speed generator (divisor 34).
    pub const FAST: Self = Self {
        baud_rate: 115_200,
        clock_hz: 16_000_000,
        generator: BaudGenerator::High16,
        frame: FrameFormat::EIGHT_N_ONE,
        tx_ready: TxReadySignal::ShiftRegisterEmpty,
        tx_enable: true,
        rx_enable: true,
    };

    /// 9600 baud from 16 MHz, 8-bit low-speed generator (divisor 25).
    pub const SLOW: Self = Self {
        baud_rate: 9_600,
        clock_hz: 16_000_000,
        generator: BaudGenerator::Low8,
        frame: FrameFormat::EIGHT_N_ONE,
        tx_ready: TxReadySignal::BufferEmpty,
        tx_enable: true,
        rx_enable: true,
    };

    /// Divisor register value for this configuration.
    pub fn divisor(&self) -> Result<u16, BaudError> {
        divisor_for(self.clock_hz, self.baud_rate, self.generator)
    }

    /// Baud rate actually generated by the configured divisor.
    pub fn actual_baud(&self) -> Result<u32, BaudError> {
        let divisor = self.divisor()?;
        Ok(actual_baud(self.clock_hz, divisor, self.generator))
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::FAST
    }
}

/// Compute the nearest divisor for `baud` and check the resulting error.
pub fn divisor_for(clock_hz: u32, baud: u32, generator: BaudGenerator) -> Result<u16, BaudError> {
    if baud == 0 {
        return Err(BaudError::ZeroBaud);
    }

    let step = u64::from(generator.scale()) * u64::from(baud);
    // Round to nearest (divisor + 1)
    let ticks = (u64::from(clock_hz) + step / 2) / step;
    if ticks == 0 || ticks - 1 > u64::from(generator.max_divisor()) {
        return Err(BaudError::Unreachable);
    }

    let divisor = (ticks - 1) as u16;
    let permille = error_permille(baud, actual_baud(clock_hz, divisor, generator));
    if permille > MAX_BAUD_ERROR_PERMILLE {
        return Err(BaudError::ExcessiveError { permille });
    }

    Ok(divisor)
}

/// Generated baud rate for a divisor value.
pub fn actual_baud(clock_hz: u32, divisor: u16, generator: BaudGenerator) -> u32 {
    let denom = u64::from(generator.scale()) * (u64::from(divisor) + 1);
    (u64::from(clock_hz) / denom) as u32
}

/// Absolute deviation of `actual` from `requested`, in tenths of a percent.
pub fn error_permille(requested: u32, actual: u32) -> u32 {
    let diff = u64::from(requested.abs_diff(actual)) * 1000;
    ((diff + u64::from(requested) / 2) / u64::from(requested)) as u32
}
