//! AT command vocabulary and the start-up command sender.
//!
//! Commands go out fire-and-forget: no response correlation, no retry, no
//! timeout. Reply literals are provided for callers that want to compare
//! them against a received line themselves.

use crate::serial::{SerialPort, SerialTransport, TransportError};

/// Command literals understood by ESP AT firmware.
pub mod commands {
    /// Attention / liveness check.
    pub const AT: &str = "AT";
    /// Restart the module.
    pub const RST: &str = "AT+RST";
    /// Firmware version information.
    pub const GMR: &str = "AT+GMR";
    /// Wi-Fi mode (station / soft-AP).
    pub const CWMODE: &str = "AT+CWMODE";
    /// Join an access point.
    pub const CWJAP: &str = "AT+CWJAP";
    /// Open a TCP/UDP connection.
    pub const CIPSTART: &str = "AT+CIPSTART";
    /// Send data on the open connection.
    pub const CIPSEND: &str = "AT+CIPSEND";
    /// Close the connection.
    pub const CIPCLOSE: &str = "AT+CIPCLOSE";
}

/// Reply literal: command accepted.
pub const OK: &str = "OK";
/// Reply literal: not joined to any access point.
pub const NO_AP: &str = "No AP";
/// Reply literal: any failure.
pub const ERROR: &str = "ERROR";

/// Line framing used by [`send_command_line`].
pub const LINE_END: &[u8] = b"\r\n";

/// Known reply words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    Ok,
    NoAp,
    Error,
}

impl Reply {
    /// Literal text the modem sends.
    pub fn literal(self) -> &'static str {
        match self {
            Reply::Ok => OK,
            Reply::NoAp => NO_AP,
            Reply::Error => ERROR,
        }
    }
}

/// Send `command` exactly as given.
pub fn send_command<P: SerialPort>(
    transport: &mut SerialTransport<P>,
    command: &str,
) -> Result<(), TransportError> {
    transport.send(command.as_bytes())
}

/// Send `command` wrapped as `"\r\n" command "\r\n"`.
pub fn send_command_line<P: SerialPort>(
    transport: &mut SerialTransport<P>,
    command: &str,
) -> Result<(), TransportError> {
    transport.send(LINE_END)?;
    transport.send(command.as_bytes())?;
    transport.send(LINE_END)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_literals() {
        assert_eq!(Reply::Ok.literal(), "OK");
        assert_eq!(Reply::NoAp.literal(), "No AP");
        assert_eq!(Reply::Error.literal(), "ERROR");
    }
}
