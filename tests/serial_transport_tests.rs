//! Serial transport tests

use rust_esp_at_link::assembler::{Feed, LineAssembler, LINE_CAPACITY};
use rust_esp_at_link::at::{self, commands};
use rust_esp_at_link::config::{
    BaudError, BaudGenerator, FrameFormat, Parity, SerialConfig, TxReadySignal,
};
use rust_esp_at_link::serial::{LoopbackPort, SerialTransport, TransportError};

fn transport() -> SerialTransport<LoopbackPort> {
    let mut t = SerialTransport::new(LoopbackPort::new());
    t.initialize(SerialConfig::FAST).unwrap();
    t
}

#[test]
fn test_initialize_programs_divisor() {
    let t = transport();

    let (config, divisor) = t.port().configured().copied().unwrap();
    assert_eq!(divisor, 34);
    assert_eq!(config.generator, BaudGenerator::High16);
    assert_eq!(t.config(), Some(&SerialConfig::FAST));
}

#[test]
fn test_initialize_rejects_bad_baud() {
    let mut t = SerialTransport::new(LoopbackPort::<16>::new());
    let config = SerialConfig {
        baud_rate: 0,
        ..SerialConfig::FAST
    };

    assert_eq!(t.initialize(config), Err(TransportError::Baud(BaudError::ZeroBaud)));
    assert!(t.config().is_none());
    assert!(t.port().configured().is_none());
}

#[test]
fn test_send_preserves_order() {
    let mut t = transport();

    t.send(b"AT+GMR").unwrap();
    assert_eq!(t.port().transmitted(), b"AT+GMR");
}

#[test]
fn test_send_waits_for_ready() {
    let mut t = transport();
    t.port_mut().set_busy_polls(3);

    t.send(b"AT").unwrap();

    assert_eq!(t.port().transmitted(), b"AT");
    // 1 ready poll for the first byte, 3 busy + 1 ready for the second
    assert_eq!(t.port().tx_polls(), 5);
}

#[test]
fn test_send_bounded_reports_stall() {
    let mut t = transport();
    t.send(b"A").unwrap();
    t.port_mut().set_stuck(true);

    assert_eq!(
        t.send_bounded(b"BC", 100),
        Err(TransportError::Stalled { sent: 0 })
    );
    assert_eq!(t.port().transmitted(), b"A");
}

#[test]
fn test_send_bounded_succeeds_within_budget() {
    let mut t = transport();
    t.port_mut().set_busy_polls(5);

    assert_eq!(t.send_bounded(b"OK", 10), Ok(()));
    assert_eq!(t.port().transmitted(), b"OK");
}

#[test]
fn test_try_send_would_block() {
    let mut t = transport();
    t.port_mut().set_busy_polls(1);

    assert_eq!(t.try_send_byte(b'a'), Ok(()));
    assert_eq!(t.try_send_byte(b'b'), Err(TransportError::WouldBlock));
    assert_eq!(t.try_send_byte(b'b'), Ok(()));
    assert_eq!(t.port().transmitted(), b"ab");
}

#[test]
fn test_try_read_byte() {
    let mut t = transport();
    assert_eq!(t.try_read_byte(), None);

    t.port_mut().inject(b"K");
    assert!(t.receive_ready());
    assert_eq!(t.try_read_byte(), Some(b'K'));
    assert!(!t.receive_ready());
}

#[test]
fn test_loopback_round_trip_yields_one_line() {
    let mut t = SerialTransport::new(LoopbackPort::<64>::looped());
    t.initialize(SerialConfig::FAST).unwrap();
    let mut asm = LineAssembler::<LINE_CAPACITY>::default();

    t.send(b"AT\r").unwrap();

    let mut received = Vec::new();
    let mut lines = Vec::new();
    while t.receive_ready() {
        let byte = t.read_byte();
        received.push(byte);
        if let Feed::LineReady(line) = asm.feed(byte) {
            lines.push(line.as_bytes_with_nul().to_vec());
        }
    }

    assert_eq!(received, b"AT\r");
    assert_eq!(lines, vec![b"AT\r\0".to_vec()]);
}

#[test]
fn test_slow_config_uses_buffer_empty_signal() {
    let mut t = SerialTransport::new(LoopbackPort::<16>::new());
    t.initialize(SerialConfig::SLOW).unwrap();

    assert_eq!(t.config().unwrap().tx_ready, TxReadySignal::BufferEmpty);
    assert_eq!(t.port().configured().unwrap().1, 25);
}

#[test]
fn test_send_command_is_verbatim() {
    let mut t = transport();

    at::send_command(&mut t, commands::GMR).unwrap();
    assert_eq!(t.port().transmitted(), b"AT+GMR");
}

#[test]
fn test_send_command_line_wraps_crlf() {
    let mut t = transport();

    at::send_command_line(&mut t, commands::GMR).unwrap();
    assert_eq!(t.port().transmitted(), b"\r\nAT+GMR\r\n");
}

#[test]
fn test_tx_disabled_refuses_to_send() {
    let mut t = SerialTransport::new(LoopbackPort::<16>::new());
    t.initialize(SerialConfig {
        tx_enable: false,
        ..SerialConfig::FAST
    })
    .unwrap();

    assert_eq!(t.send(b"AT"), Err(TransportError::Disabled));
    assert_eq!(t.send_bounded(b"AT", 10), Err(TransportError::Disabled));
    assert_eq!(t.try_send_byte(b'A'), Err(TransportError::Disabled));
    assert!(t.port().transmitted().is_empty());
}

#[test]
fn test_rx_disabled_reports_nothing_ready() {
    let mut t = SerialTransport::new(LoopbackPort::<16>::new());
    t.initialize(SerialConfig {
        rx_enable: false,
        ..SerialConfig::FAST
    })
    .unwrap();

    t.port_mut().inject(b"OK\r");
    assert!(!t.receive_ready());
    assert_eq!(t.try_read_byte(), None);
    assert_eq!(t.port().rx_pending(), 3);
}

#[test]
fn test_frame_format_programmed() {
    let mut t = SerialTransport::new(LoopbackPort::<16>::new());
    let frame = FrameFormat {
        data_bits: 7,
        parity: Parity::Even,
        stop_bits: 2,
    };
    t.initialize(SerialConfig {
        frame,
        ..SerialConfig::FAST
    })
    .unwrap();

    assert_eq!(t.port().configured().unwrap().0.frame, frame);
}

#[test]
fn test_unsupported_frame_rejected() {
    let mut t = SerialTransport::new(LoopbackPort::<16>::new());
    let config = SerialConfig {
        frame: FrameFormat {
            data_bits: 9,
            ..FrameFormat::EIGHT_N_ONE
        },
        ..SerialConfig::FAST
    };

    assert_eq!(t.initialize(config), Err(TransportError::Framing));
    assert!(t.port().configured().is_none());
}
