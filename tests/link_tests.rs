//! End-to-end link tests

use rust_esp_at_link::config::{LinkConfig, SerialConfig};
use rust_esp_at_link::fault::{FaultCode, FaultState};
use rust_esp_at_link::hal::{ActivityCounter, NoActivity};
use rust_esp_at_link::handoff::LineQueue;
use rust_esp_at_link::link::{Link, LinkContext};
use rust_esp_at_link::logging::LogStream;
use rust_esp_at_link::serial::{LoopbackPort, TransportError};

struct Shared {
    queue: LineQueue,
    fault: FaultState,
    isr_log: LogStream,
    main_log: LogStream,
}

impl Shared {
    fn new() -> Self {
        Self {
            queue: LineQueue::new(),
            fault: FaultState::new(),
            isr_log: LogStream::new(),
            main_log: LogStream::new(),
        }
    }

    fn ctx(&self) -> LinkContext<'_, 100> {
        LinkContext {
            queue: &self.queue,
            fault: &self.fault,
            isr_log: &self.isr_log,
            main_log: &self.main_log,
        }
    }
}

#[test]
fn test_start_sends_startup_command() {
    let shared = Shared::new();
    let mut link = Link::new(LoopbackPort::<64>::new(), LinkConfig::DEFAULT, shared.ctx(), NoActivity);

    link.start(0).unwrap();

    assert_eq!(link.transport().port().transmitted(), b"AT+GMR");
    assert_eq!(link.transport().port().configured().unwrap().1, 34);
}

#[test]
fn test_poll_echoes_line_with_prefix() {
    let shared = Shared::new();
    let mut link = Link::new(LoopbackPort::<64>::new(), LinkConfig::DEFAULT, shared.ctx(), NoActivity);
    link.start(0).unwrap();
    link.transport_mut().port_mut().clear_transmitted();

    link.transport_mut().port_mut().inject(b"OK\r");
    let report = link.poll(1);

    assert_eq!(report.drain.lines, 1);
    assert_eq!(report.last.unwrap().as_bytes_with_nul(), b"OK\r\0");
    assert_eq!(link.transport().port().transmitted(), b"\n\rOK\r");
}

#[test]
fn test_multi_line_reply_echoed_in_one_poll() {
    let shared = Shared::new();
    let mut link = Link::new(LoopbackPort::<256>::new(), LinkConfig::DEFAULT, shared.ctx(), NoActivity);
    link.start(0).unwrap();
    link.transport_mut().port_mut().clear_transmitted();

    link.transport_mut()
        .port_mut()
        .inject(b"AT+GMR\r\nAT version:2.2.0.0\r\nSDK version:v4.4\r\n\r\nOK\r");
    let mut seen = Vec::new();
    let report = link.poll_with(1, |line| seen.push(line.as_bytes().to_vec()));

    assert_eq!(report.drain.bytes, 51);
    assert_eq!(report.drain.lines, 5);
    assert_eq!(report.drain.dropped, 0);
    assert_eq!(report.lines, 5);
    assert_eq!(report.last.unwrap().as_bytes(), b"\nOK\r");
    assert_eq!(
        seen,
        vec![
            b"AT+GMR\r".to_vec(),
            b"\nAT version:2.2.0.0\r".to_vec(),
            b"\nSDK version:v4.4\r".to_vec(),
            b"\n\r".to_vec(),
            b"\nOK\r".to_vec(),
        ]
    );
    assert_eq!(
        link.transport().port().transmitted(),
        b"\n\rAT+GMR\r\n\r\nAT version:2.2.0.0\r\n\r\nSDK version:v4.4\r\n\r\n\r\n\r\nOK\r"
    );
    assert!(!shared.fault.is_active());

    // Nothing left for the next round
    let report = link.poll(2);
    assert_eq!(report.lines, 0);
    assert!(report.last.is_none());
}

#[test]
fn test_echo_disabled_leaves_transport_quiet() {
    let shared = Shared::new();
    let config = LinkConfig {
        echo_enabled: false,
        ..LinkConfig::DEFAULT
    };
    let mut link = Link::new(LoopbackPort::<64>::new(), config, shared.ctx(), NoActivity);
    link.start(0).unwrap();
    link.transport_mut().port_mut().clear_transmitted();

    link.transport_mut().port_mut().inject(b"No AP\r");
    let report = link.poll(1);

    assert_eq!(report.last.unwrap().as_str(), Some("No AP\r"));
    assert!(link.transport().port().transmitted().is_empty());
}

#[test]
fn test_overflow_reported_and_cleared() {
    let shared = Shared::new();
    let mut link = Link::new(LoopbackPort::<256>::new(), LinkConfig::DEFAULT, shared.ctx(), NoActivity);
    link.start(0).unwrap();

    link.transport_mut().port_mut().inject(&[b'x'; 120]);
    link.transport_mut().port_mut().inject(b"\rOK\r");
    let report = link.poll(5);

    assert_eq!(report.drain.overflows, 1);
    assert_eq!(report.last.unwrap().as_bytes(), b"OK\r");

    // Fault was reported through the foreground log, then cleared
    assert!(!shared.fault.is_active());
    assert_eq!(shared.fault.count(), 1);
    assert!(shared.isr_log.drain().unwrap().message().contains("overflow"));

    let mut messages = Vec::new();
    while let Some(entry) = shared.main_log.drain() {
        messages.push(entry.message().to_string());
    }
    assert!(messages.iter().any(|m| m.contains("fault: line overflow")));
}

#[test]
fn test_start_fails_on_invalid_baud() {
    let shared = Shared::new();
    let config = LinkConfig {
        serial: SerialConfig {
            baud_rate: 0,
            ..SerialConfig::FAST
        },
        ..LinkConfig::DEFAULT
    };
    let mut link = Link::new(LoopbackPort::<64>::new(), config, shared.ctx(), NoActivity);

    assert!(matches!(link.start(0), Err(TransportError::Baud(_))));
    assert!(shared.fault.is_active());
    assert!(link.transport().port().transmitted().is_empty());
}

#[test]
fn test_activity_counts_data_bytes() {
    let shared = Shared::new();
    let mut link = Link::new(
        LoopbackPort::<64>::new(),
        LinkConfig::DEFAULT,
        shared.ctx(),
        ActivityCounter::default(),
    );
    link.start(0).unwrap();

    link.transport_mut().port_mut().inject(b"ERROR\r");
    link.poll(0);

    assert_eq!(link.dispatch().activity().pulses, 5);
}

#[test]
fn test_driver_write_failure_faults() {
    let shared = Shared::new();
    let mut port = LoopbackPort::<64>::new();
    port.set_write_fault(true);
    let mut link = Link::new(port, LinkConfig::DEFAULT, shared.ctx(), NoActivity);

    assert_eq!(link.start(0), Err(TransportError::Peripheral));
    assert_eq!(shared.fault.code(), FaultCode::PeripheralFault);
    assert!(link.transport().port().transmitted().is_empty());

    let mut messages = Vec::new();
    while let Some(entry) = shared.main_log.drain() {
        messages.push(entry.message().to_string());
    }
    assert!(messages.iter().any(|m| m.contains("T05")));
}
