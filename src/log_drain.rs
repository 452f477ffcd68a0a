//! Foreground log drain.
//!
//! Empties the log streams into a [`ByteSink`]. On the device the sink is a
//! TX-only UART on GPIO6, separate from the modem link.
//!
//! ```text
//! ESP32-S3 GPIO6 (TX) ──────▶ USB-UART RX
//!                              └─▶ PC Serial Monitor
//! ```

use core::fmt::Write;

use crate::logging::{BufWriter, LogEntry, LogStream};

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripheral::Peripheral;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::uart::{self, UartTxDriver};

/// Interval between dropped-message reports.
pub const DROPPED_REPORT_INTERVAL_US: i64 = 10_000_000;

/// Formatted line buffer size.
const FORMAT_BUF_LEN: usize = 128;

/// Blocking byte output for log text.
pub trait ByteSink {
    fn write_bytes(&mut self, bytes: &[u8]);
}

#[cfg(target_os = "espidf")]
impl ByteSink for UartTxDriver<'_> {
    fn write_bytes(&mut self, bytes: &[u8]) {
        let _ = self.write(bytes);
    }
}

/// Format: `[timestamp_us] LEVEL: message\r\n`
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    let mut writer = BufWriter::new(buf);
    let _ = write!(
        writer,
        "[{:10}] {}: {}\r\n",
        entry.timestamp_us,
        entry.level.as_str(),
        entry.message()
    );
    writer.len()
}

/// Drains log streams in priority order and reports drops.
pub struct LogDrain {
    last_dropped_report: i64,
}

impl LogDrain {
    pub const fn new() -> Self {
        Self {
            last_dropped_report: 0,
        }
    }

    /// Write every pending entry of `streams`, first stream first.
    ///
    /// Returns the number of entries written. Every
    /// [`DROPPED_REPORT_INTERVAL_US`] a summary of dropped messages is
    /// written and the counters are reset.
    pub fn drain(&mut self, streams: &[&LogStream], sink: &mut dyn ByteSink, now_us: i64) -> usize {
        let mut format_buf = [0u8; FORMAT_BUF_LEN];
        let mut written = 0;

        for stream in streams {
            while let Some(entry) = stream.drain() {
                let len = format_log_entry(&entry, &mut format_buf);
                sink.write_bytes(&format_buf[..len]);
                written += 1;
            }
        }

        if now_us - self.last_dropped_report >= DROPPED_REPORT_INTERVAL_US {
            let dropped: u32 = streams.iter().map(|s| s.dropped()).sum();
            if dropped > 0 {
                let mut writer = BufWriter::new(&mut format_buf);
                let _ = write!(writer, "[WARN] Dropped log messages: {}\r\n", dropped);
                let len = writer.len();
                sink.write_bytes(&format_buf[..len]);

                for stream in streams {
                    stream.reset_dropped();
                }
            }
            self.last_dropped_report = now_us;
        }

        written
    }
}

impl Default for LogDrain {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize a TX-only UART for log output.
#[cfg(target_os = "espidf")]
pub fn init_log_uart<'d>(
    uart: impl Peripheral<P = impl uart::Uart> + 'd,
    tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
    baud_rate: u32,
) -> Result<UartTxDriver<'d>, esp_idf_svc::sys::EspError> {
    let uart_config = uart::config::Config::default()
        .baudrate(esp_idf_svc::hal::units::Hertz(baud_rate));

    UartTxDriver::new(
        uart,
        tx_pin,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &uart_config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MAX_MSG_LEN};

    struct VecSink(std::vec::Vec<u8>);

    impl ByteSink for VecSink {
        fn write_bytes(&mut self, bytes: &[u8]) {
            self.0.extend_from_slice(bytes);
        }
    }

    impl VecSink {
        fn text(&self) -> &str {
            core::str::from_utf8(&self.0).unwrap()
        }
    }

    #[test]
    fn test_format_log_entry() {
        let mut msg = [0u8; MAX_MSG_LEN];
        msg[..13].copy_from_slice(b"line overflow");
        let entry = LogEntry {
            timestamp_us: 1234567,
            level: LogLevel::Warn,
            len: 13,
            msg,
        };

        let mut buf = [0u8; FORMAT_BUF_LEN];
        let len = format_log_entry(&entry, &mut buf);
        let formatted = core::str::from_utf8(&buf[..len]).unwrap();

        assert_eq!(formatted, "[   1234567] WARN: line overflow\r\n");
    }

    #[test]
    fn test_drain_order_and_count() {
        let isr = LogStream::new();
        let main = LogStream::new();
        isr.push(2, LogLevel::Warn, b"from isr");
        main.push(1, LogLevel::Info, b"from main");

        let mut sink = VecSink(std::vec::Vec::new());
        let mut drain = LogDrain::new();
        assert_eq!(drain.drain(&[&isr, &main], &mut sink, 0), 2);

        let text = sink.text();
        assert!(text.find("from isr").unwrap() < text.find("from main").unwrap());
    }

    #[test]
    fn test_dropped_reported_after_interval() {
        let stream = LogStream::new();
        for _ in 0..=crate::logging::LOG_BUFFER_SIZE {
            stream.push(0, LogLevel::Info, b"x");
        }
        assert_eq!(stream.dropped(), 1);

        let mut sink = VecSink(std::vec::Vec::new());
        let mut drain = LogDrain::new();

        drain.drain(&[&stream], &mut sink, 0);
        assert!(!sink.text().contains("Dropped"));

        drain.drain(&[&stream], &mut sink, DROPPED_REPORT_INTERVAL_US);
        assert!(sink.text().contains("Dropped log messages: 1"));
        assert_eq!(stream.dropped(), 0);
    }
}
