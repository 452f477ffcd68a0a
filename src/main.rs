//! RustEspAtLink - Main entry point
//!
//! Device build (ESP-IDF):
//! 1. Bring up the log UART and the modem UART
//! 2. Initialize the link and send the start-up command
//! 3. Loop: service received bytes, echo lines, drain logs
//!
//! Host build: the same loop against a simulated modem on a
//! [`LoopbackPort`](rust_esp_at_link::LoopbackPort).

#![cfg_attr(target_os = "espidf", no_std)]
#![cfg_attr(target_os = "espidf", no_main)]

use rust_esp_at_link::{FaultState, LineQueue};

// Static allocations shared by the receive path and the foreground loop
static LINE_QUEUE: LineQueue = LineQueue::new();
static FAULT_STATE: FaultState = FaultState::new();

#[cfg(target_os = "espidf")]
mod firmware {
    use esp_idf_svc::hal::gpio::OutputPin;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::sys::{self as esp_idf_sys, EspError};

    use rust_esp_at_link::hal::gpio::ActivityPin;
    use rust_esp_at_link::link::{Link, LinkContext};
    use rust_esp_at_link::log_drain::{init_log_uart, LogDrain};
    use rust_esp_at_link::serial::esp::EspUartPort;
    use rust_esp_at_link::{isr_error, CONFIG, ISR_LOG_STREAM, MAIN_LOG_STREAM};

    use super::{FAULT_STATE, LINE_QUEUE};

    /// Log UART speed (GPIO6, independent of the modem link).
    const LOG_BAUD: u32 = 115_200;

    #[no_mangle]
    fn main() {
        // Initialize ESP-IDF
        esp_idf_sys::link_patches();

        if let Err(e) = run() {
            isr_error!(MAIN_LOG_STREAM, timestamp_us(), "startup failed: {}", e);
        }

        // Nothing left to drive; stay idle
        loop {
            unsafe {
                esp_idf_sys::vTaskDelay(1000);
            }
        }
    }

    fn run() -> Result<(), EspError> {
        let peripherals = Peripherals::take()?;

        let mut log_uart = init_log_uart(peripherals.uart1, peripherals.pins.gpio6, LOG_BAUD)?;
        let port = EspUartPort::new(
            peripherals.uart2,
            peripherals.pins.gpio17,
            peripherals.pins.gpio18,
            &CONFIG.serial,
        )?;
        let activity = ActivityPin::new(peripherals.pins.gpio2.downgrade_output())?;

        let ctx = LinkContext {
            queue: &LINE_QUEUE,
            fault: &FAULT_STATE,
            isr_log: &ISR_LOG_STREAM,
            main_log: &MAIN_LOG_STREAM,
        };
        let mut link = Link::new(port, CONFIG, ctx, activity);
        let mut drain = LogDrain::new();

        // Errors are already logged and faulted by the link
        let _ = link.start(timestamp_us());

        loop {
            let now = timestamp_us();
            let _ = link.poll(now);
            drain.drain(&[&ISR_LOG_STREAM, &MAIN_LOG_STREAM], &mut log_uart, now);

            unsafe {
                esp_idf_sys::vTaskDelay(1);
            }
        }
    }

    fn timestamp_us() -> i64 {
        unsafe { esp_idf_sys::esp_timer_get_time() }
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use std::io::Write;

    use rust_esp_at_link::hal::NoActivity;
    use rust_esp_at_link::link::{Link, LinkContext};
    use rust_esp_at_link::log_drain::{ByteSink, LogDrain};
    use rust_esp_at_link::{LoopbackPort, CONFIG, ISR_LOG_STREAM, MAIN_LOG_STREAM};

    struct Stderr;

    impl ByteSink for Stderr {
        fn write_bytes(&mut self, bytes: &[u8]) {
            let _ = std::io::stderr().write_all(bytes);
        }
    }

    let ctx = LinkContext {
        queue: &LINE_QUEUE,
        fault: &FAULT_STATE,
        isr_log: &ISR_LOG_STREAM,
        main_log: &MAIN_LOG_STREAM,
    };
    let mut link = Link::new(LoopbackPort::<512>::new(), CONFIG, ctx, NoActivity);
    let mut drain = LogDrain::new();

    if let Err(e) = link.start(0) {
        eprintln!("startup failed: {}", e);
        std::process::exit(1);
    }

    // Simulated modem reply to AT+GMR, arriving in one burst
    link.transport_mut()
        .port_mut()
        .inject(b"AT+GMR\r\nAT version:2.2.0.0\r\nSDK version:v4.4\r\n\r\nOK\r");

    link.poll_with(0, |line| {
        println!("line: {:?}", String::from_utf8_lossy(line.as_bytes()));
    });
    drain.drain(&[&ISR_LOG_STREAM, &MAIN_LOG_STREAM], &mut Stderr, 0);

    let echoed = link.transport().port().transmitted();
    println!("transmitted: {:?}", String::from_utf8_lossy(echoed));
}
