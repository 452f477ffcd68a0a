//! # RustEspAtLink
//!
//! UART link to an ESP AT-command modem with interrupt-driven line receive.
//!
//! ## Architecture
//!
//! ```text
//! modem ─▶ UART ─▶ InterruptDispatch ─▶ LineAssembler ─▶ LineQueue
//!                  (interrupt context)                     │
//!                                                          ▼
//! modem ◀─ UART ◀─ SerialTransport::send ◀──── LineEcho / at::send_command
//!                  (foreground only, blocking)
//! ```
//!
//! - The line buffer lives inside [`LineAssembler`]; only the dispatcher
//!   holds it mutably
//! - Interrupt context never blocks: lines cross to the foreground through
//!   a fixed [`LineQueue`], logs through a lock-free [`LogStream`]
//! - Overflow and stalls are reported through [`FaultState`], never silent

#![cfg_attr(not(test), no_std)]

pub mod assembler;
pub mod at;
pub mod config;
pub mod dispatch;
pub mod echo;
pub mod fault;
pub mod hal;
pub mod handoff;
pub mod link;
pub mod log_drain;
pub mod log_globals;
pub mod logging;
pub mod serial;

pub use assembler::{Feed, Line, LineAssembler, OverflowPolicy, TerminatorPolicy, LINE_CAPACITY};
pub use config::{LinkConfig, SerialConfig, CONFIG};
pub use dispatch::{DrainReport, Dispatcher, InterruptDispatch};
pub use echo::LineEcho;
pub use fault::{FaultCode, FaultState};
pub use handoff::{CompletedLine, LineQueue};
pub use link::{Link, LinkContext, PollReport};
pub use log_globals::{ISR_LOG_STREAM, MAIN_LOG_STREAM};
pub use logging::LogStream;
pub use serial::{LoopbackPort, SerialPort, SerialTransport, TransportError};
