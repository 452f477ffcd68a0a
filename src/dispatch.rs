//! Receive interrupt dispatch.
//!
//! # State machine
//!
//! ```text
//!            receive interrupt
//!   Idle ─────────────────────────▶ Draining ──┐ while receive_ready():
//!    ▲                                 │   ◀───┘   feed one byte
//!    └──── acknowledge, return ────────┘
//!              (nothing ready)
//! ```
//!
//! One call drains exactly the bytes that are ready and returns. It never
//! waits for more, and it never transmits: completed lines are copied into
//! a [`LineQueue`] for the foreground to send.

use crate::assembler::{Feed, LineAssembler, LINE_CAPACITY};
use crate::fault::{FaultCode, FaultState};
use crate::hal::{ActivityIndicator, NoActivity};
use crate::handoff::LineQueue;
use crate::logging::LogStream;
use crate::serial::{SerialPort, SerialTransport};

/// Dispatcher state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Draining,
}

/// Outcome of one interrupt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Bytes read from the transport.
    pub bytes: u32,
    /// Lines completed and published.
    pub lines: u32,
    /// Lines that overflowed the buffer.
    pub overflows: u32,
    /// Completed lines lost because the queue was full.
    pub dropped: u32,
}

/// Owns the line assembler and feeds it from the transport.
pub struct InterruptDispatch<'a, A: ActivityIndicator, const N: usize> {
    assembler: LineAssembler<N>,
    queue: &'a LineQueue<N>,
    log: &'a LogStream,
    fault: Option<&'a FaultState>,
    activity: A,
    state: DispatchState,
    interrupts: u32,
}

/// Dispatcher with the default line capacity and no activity pin.
pub type Dispatcher<'a> = InterruptDispatch<'a, NoActivity, LINE_CAPACITY>;

impl<'a, const N: usize> InterruptDispatch<'a, NoActivity, N> {
    pub fn new(assembler: LineAssembler<N>, queue: &'a LineQueue<N>, log: &'a LogStream) -> Self {
        Self {
            assembler,
            queue,
            log,
            fault: None,
            activity: NoActivity,
            state: DispatchState::Idle,
            interrupts: 0,
        }
    }
}

impl<'a, A: ActivityIndicator, const N: usize> InterruptDispatch<'a, A, N> {
    /// Record overflows and dropped lines in `fault`.
    pub fn with_fault(mut self, fault: &'a FaultState) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Pulse `activity` for every non-terminator byte.
    pub fn with_activity<B: ActivityIndicator>(self, activity: B) -> InterruptDispatch<'a, B, N> {
        InterruptDispatch {
            assembler: self.assembler,
            queue: self.queue,
            log: self.log,
            fault: self.fault,
            activity,
            state: self.state,
            interrupts: self.interrupts,
        }
    }

    /// Receive interrupt entry point.
    ///
    /// `now_us` only timestamps log entries.
    pub fn on_receive_interrupt<P: SerialPort>(
        &mut self,
        transport: &mut SerialTransport<P>,
        now_us: i64,
    ) -> DrainReport {
        let mut report = DrainReport::default();
        self.state = DispatchState::Draining;
        self.interrupts = self.interrupts.wrapping_add(1);

        while transport.receive_ready() {
            let byte = transport.read_byte();
            report.bytes += 1;
            self.on_byte(byte, now_us, &mut report);
        }

        transport.acknowledge_receive();
        self.state = DispatchState::Idle;
        report
    }

    fn on_byte(&mut self, byte: u8, now_us: i64, report: &mut DrainReport) {
        let cursor = self.assembler.cursor();

        let published = match self.assembler.feed(byte) {
            Feed::Pending => {
                self.activity.on_byte();
                return;
            }
            Feed::Overflow => {
                self.activity.on_byte();
                report.overflows += 1;
                if let Some(fault) = self.fault {
                    fault.set(FaultCode::LineOverflow, cursor as u32);
                }
                crate::isr_warn!(self.log, now_us, "line overflow at {}", cursor);
                return;
            }
            Feed::LineReady(line) => self.queue.publish(line.as_bytes_with_nul()),
        };

        if published {
            report.lines += 1;
        } else {
            report.dropped += 1;
            if let Some(fault) = self.fault {
                fault.set(FaultCode::LineDropped, self.queue.dropped());
            }
            crate::isr_warn!(self.log, now_us, "line dropped, queue full");
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn assembler(&self) -> &LineAssembler<N> {
        &self.assembler
    }

    pub fn activity(&self) -> &A {
        &self.activity
    }

    /// Interrupts serviced since creation.
    pub fn interrupts(&self) -> u32 {
        self.interrupts
    }
}
