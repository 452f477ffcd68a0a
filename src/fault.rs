//! Link fault state.
//!
//! The original firmware failed silently: overflowing lines scribbled past
//! the buffer and a stuck transmitter just hung. Here every such condition
//! lands in a [`FaultState`] the foreground can inspect and report.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Fault codes raised by the link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    /// No fault (normal operation).
    None = 0,

    /// A received line did not fit the line buffer.
    /// Data: cursor position when the overflow was detected.
    LineOverflow = 1,

    /// A completed line was dropped because the foreground had not yet
    /// taken the previous one.
    /// Data: total dropped lines.
    LineDropped = 2,

    /// Transmitter did not become ready within the poll budget.
    /// Data: bytes sent before the stall.
    TransportStalled = 3,

    /// Peripheral driver reported an error.
    PeripheralFault = 4,
}

impl FaultCode {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => FaultCode::LineOverflow,
            2 => FaultCode::LineDropped,
            3 => FaultCode::TransportStalled,
            4 => FaultCode::PeripheralFault,
            _ => FaultCode::None,
        }
    }

    /// Short name for log output.
    pub fn as_str(self) -> &'static str {
        match self {
            FaultCode::None => "none",
            FaultCode::LineOverflow => "line overflow",
            FaultCode::LineDropped => "line dropped",
            FaultCode::TransportStalled => "transport stalled",
            FaultCode::PeripheralFault => "peripheral fault",
        }
    }
}

/// Interrupt-safe fault state.
///
/// Set from interrupt or foreground context, polled by the foreground loop.
///
/// # Usage
///
/// ```ignore
/// static FAULT: FaultState = FaultState::new();
///
/// // In the receive interrupt:
/// if let Feed::Overflow = assembler.feed(byte) {
///     FAULT.set(FaultCode::LineOverflow, cursor as u32);
/// }
///
/// // In the foreground loop:
/// if FAULT.is_active() {
///     report(FAULT.snapshot());
///     FAULT.clear();
/// }
/// ```
pub struct FaultState {
    active: AtomicBool,
    code: AtomicU8,
    /// Code-specific detail.
    data: AtomicU32,
    /// Total fault count since boot (never cleared).
    count: AtomicU32,
}

impl FaultState {
    /// Create new fault state (no fault).
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(0),
            data: AtomicU32::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Record a fault. The latest fault wins.
    #[inline]
    pub fn set(&self, code: FaultCode, data: u32) {
        self.code.store(code as u8, Ordering::Release);
        self.data.store(data, Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Get fault code (only meaningful if `is_active()` is true).
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    #[inline]
    pub fn data(&self) -> u32 {
        self.data.load(Ordering::Acquire)
    }

    /// Get total fault count since boot.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Clear the active flag. The counter is kept.
    #[inline]
    pub fn clear(&self) {
        self.active.store(false, Ordering::Release);
    }

    #[inline]
    pub fn snapshot(&self) -> FaultSnapshot {
        FaultSnapshot {
            active: self.is_active(),
            code: self.code(),
            data: self.data(),
            count: self.count(),
        }
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of fault state at a point in time.
#[derive(Clone, Copy, Debug)]
pub struct FaultSnapshot {
    pub active: bool,
    pub code: FaultCode,
    pub data: u32,
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_state_basic() {
        let fault = FaultState::new();

        assert!(!fault.is_active());
        assert_eq!(fault.code(), FaultCode::None);

        fault.set(FaultCode::LineOverflow, 98);

        assert!(fault.is_active());
        assert_eq!(fault.code(), FaultCode::LineOverflow);
        assert_eq!(fault.data(), 98);

        fault.clear();

        assert!(!fault.is_active());
        assert_eq!(fault.count(), 1);
    }

    #[test]
    fn test_latest_fault_wins() {
        let fault = FaultState::new();

        fault.set(FaultCode::LineOverflow, 1);
        fault.set(FaultCode::TransportStalled, 3);

        let snap = fault.snapshot();
        assert_eq!(snap.code, FaultCode::TransportStalled);
        assert_eq!(snap.data, 3);
        assert_eq!(snap.count, 2);
    }

    #[test]
    fn test_unknown_code_maps_to_none() {
        assert_eq!(FaultCode::from_u8(200), FaultCode::None);
        assert_eq!(FaultCode::from_u8(3), FaultCode::TransportStalled);
    }
}
