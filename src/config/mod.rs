//! Module: config
//!
//! Purpose: Compile-time configuration for the modem link.
//!
//! Architecture:
//! - `serial`: line parameters and baud divisor math
//! - `LinkConfig`: everything the firmware needs at start-up, exposed as
//!   the immutable [`CONFIG`]
//!
//! Safety: RT-safe. Plain constants, no interior mutability.

pub mod serial;

pub use serial::{
    BaudError, BaudGenerator, FrameFormat, Parity, SerialConfig, TxReadySignal,
    MAX_BAUD_ERROR_PERMILLE,
};

use crate::assembler::{OverflowPolicy, TerminatorPolicy};
use crate::at;

/// Line assembler policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssemblerConfig {
    pub terminator: TerminatorPolicy,
    pub overflow: OverflowPolicy,
}

impl AssemblerConfig {
    pub const DEFAULT: Self = Self {
        terminator: TerminatorPolicy::Keep,
        overflow: OverflowPolicy::Discard,
    };
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Complete link configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    pub serial: SerialConfig,
    pub assembler: AssemblerConfig,
    /// Echo completed lines back over the link from the foreground loop.
    pub echo_enabled: bool,
    /// Written before every echoed line.
    pub echo_prefix: &'static [u8],
    /// Sent once after the transport is initialized.
    pub startup_command: &'static str,
}

impl LinkConfig {
    pub const DEFAULT: Self = Self {
        serial: SerialConfig::FAST,
        assembler: AssemblerConfig::DEFAULT,
        echo_enabled: true,
        echo_prefix: b"\n\r",
        startup_command: at::commands::GMR,
    };
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Firmware configuration.
pub static CONFIG: LinkConfig = LinkConfig::DEFAULT;
