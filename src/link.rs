//! Link assembly: transport, dispatcher and foreground services wired
//! together from a [`LinkConfig`].
//!
//! On the device the IDF driver runs the real UART interrupt and buffers
//! bytes; [`Link::poll`] services that buffer through the dispatcher and
//! then runs the foreground half (echo, fault report). The two halves still
//! only meet at the [`LineQueue`].

use crate::assembler::LineAssembler;
use crate::at;
use crate::config::LinkConfig;
use crate::dispatch::{DrainReport, InterruptDispatch};
use crate::echo::LineEcho;
use crate::fault::{FaultCode, FaultState};
use crate::hal::ActivityIndicator;
use crate::handoff::{CompletedLine, LineQueue};
use crate::logging::LogStream;
use crate::serial::{SerialPort, SerialTransport, TransportError};

/// Shared state the link borrows. Usually all `static`.
pub struct LinkContext<'a, const N: usize> {
    pub queue: &'a LineQueue<N>,
    pub fault: &'a FaultState,
    /// Written from the receive path.
    pub isr_log: &'a LogStream,
    /// Written from the foreground.
    pub main_log: &'a LogStream,
}

/// Result of one [`Link::poll`].
#[derive(Debug, Default)]
pub struct PollReport<const N: usize> {
    pub drain: DrainReport,
    /// Lines taken from the queue this round (echoed if echo is enabled).
    pub lines: u32,
    /// Most recent of them.
    pub last: Option<CompletedLine<N>>,
}

pub struct Link<'a, P: SerialPort, A: ActivityIndicator, const N: usize> {
    config: LinkConfig,
    transport: SerialTransport<P>,
    dispatch: InterruptDispatch<'a, A, N>,
    queue: &'a LineQueue<N>,
    fault: &'a FaultState,
    main_log: &'a LogStream,
    echo: Option<LineEcho>,
}

impl<'a, P: SerialPort, A: ActivityIndicator, const N: usize> Link<'a, P, A, N> {
    pub fn new(port: P, config: LinkConfig, ctx: LinkContext<'a, N>, activity: A) -> Self {
        let dispatch = InterruptDispatch::new(
            LineAssembler::from_config(&config.assembler),
            ctx.queue,
            ctx.isr_log,
        )
        .with_fault(ctx.fault)
        .with_activity(activity);

        Self {
            transport: SerialTransport::new(port),
            dispatch,
            queue: ctx.queue,
            fault: ctx.fault,
            main_log: ctx.main_log,
            echo: config.echo_enabled.then(|| LineEcho::new(config.echo_prefix)),
            config,
        }
    }

    /// Initialize the transport and send the start-up command.
    pub fn start(&mut self, now_us: i64) -> Result<(), TransportError> {
        if let Err(e) = self.transport.initialize(self.config.serial) {
            self.report(e, now_us);
            return Err(e);
        }

        crate::isr_info!(self.main_log, now_us, "sending {}", self.config.startup_command);
        let result = at::send_command(&mut self.transport, self.config.startup_command);
        if let Err(e) = result {
            self.report(e, now_us);
        }
        result
    }

    /// Service received bytes, then forward every queued line.
    pub fn poll(&mut self, now_us: i64) -> PollReport<N> {
        self.poll_with(now_us, |_| {})
    }

    /// Like [`poll`](Self::poll), handing each line to `on_line` after it
    /// has been echoed.
    pub fn poll_with<F>(&mut self, now_us: i64, mut on_line: F) -> PollReport<N>
    where
        F: FnMut(&CompletedLine<N>),
    {
        let drain = self.dispatch.on_receive_interrupt(&mut self.transport, now_us);
        let mut report = PollReport {
            drain,
            lines: 0,
            last: None,
        };

        loop {
            let line = match self.echo.as_mut() {
                Some(echo) => match echo.pump(self.queue, &mut self.transport) {
                    Ok(line) => line,
                    Err(e) => {
                        self.report(e, now_us);
                        None
                    }
                },
                None => self.queue.take(),
            };
            let Some(line) = line else {
                break;
            };

            on_line(&line);
            report.lines += 1;
            report.last = Some(line);
        }

        self.report_faults(now_us);
        report
    }

    fn report(&self, e: TransportError, now_us: i64) {
        let code = match e {
            TransportError::Stalled { .. } => FaultCode::TransportStalled,
            _ => FaultCode::PeripheralFault,
        };
        let data = match e {
            TransportError::Stalled { sent } => sent as u32,
            _ => 0,
        };
        self.fault.set(code, data);
        crate::isr_error!(self.main_log, now_us, "{}", e);
    }

    fn report_faults(&self, now_us: i64) {
        if !self.fault.is_active() {
            return;
        }
        let snap = self.fault.snapshot();
        crate::isr_warn!(
            self.main_log,
            now_us,
            "fault: {} ({}), total {}",
            snap.code.as_str(),
            snap.data,
            snap.count
        );
        self.fault.clear();
    }

    pub fn transport(&self) -> &SerialTransport<P> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut SerialTransport<P> {
        &mut self.transport
    }

    pub fn dispatch(&self) -> &InterruptDispatch<'a, A, N> {
        &self.dispatch
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}
