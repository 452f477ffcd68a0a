//! Hardware Abstraction Layer for the modem link.
//!
//! Thin wrappers around board peripherals that are not the UART itself.

pub mod gpio;

pub use gpio::{ActivityCounter, ActivityIndicator, NoActivity};
