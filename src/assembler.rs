//! Receive line assembler.
//!
//! Turns the received byte stream into carriage-return delimited lines, one
//! byte per call. Runs in interrupt context; the dispatcher owns the only
//! `&mut` so no other context ever touches the buffer.
//!
//! # Layout
//!
//! ```text
//! buf:  [ A ][ T ][ \r ][ \0 ][ .. ]
//!         ^cursor advances      ^ capacity - 1 is the last usable slot
//! ```
//!
//! One slot is always reserved for the NUL sentinel, and under
//! [`TerminatorPolicy::Keep`] a second one for the terminator itself, so a
//! line can never be written past the end of the buffer.

/// Line buffer capacity in bytes (sentinel included).
pub const LINE_CAPACITY: usize = 100;

/// Byte that completes a line.
pub const LINE_TERMINATOR: u8 = b'\r';

/// Sentinel written after every completed line.
pub const SENTINEL: u8 = 0;

/// Whether the terminator is part of the emitted line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminatorPolicy {
    /// Emit `AT\r\0`.
    Keep,
    /// Emit `AT\0`.
    Strip,
}

/// What happens when a line outgrows the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Report once, drop the whole line, resynchronize on the next terminator.
    Discard,
    /// Report once, keep the bytes that fit, emit them at the terminator.
    Truncate,
}

/// Assembler state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssemblerState {
    /// Accepting bytes into the buffer.
    Collecting,
    /// Current line overflowed; bytes are dropped until the terminator.
    Overflowed,
}

/// Result of feeding one byte.
#[derive(Debug, PartialEq, Eq)]
pub enum Feed<'a> {
    /// Byte consumed, no line completed.
    Pending,
    /// Terminator seen, line completed.
    LineReady(Line<'a>),
    /// Byte did not fit. Reported once per line.
    Overflow,
}

/// Borrowed view of a completed line, valid until the next `feed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line<'a> {
    bytes: &'a [u8],
    truncated: bool,
}

impl<'a> Line<'a> {
    /// Line content without the sentinel.
    pub fn as_bytes(&self) -> &'a [u8] {
        let bytes = self.bytes;
        &bytes[..bytes.len() - 1]
    }

    /// Line content followed by the NUL sentinel.
    pub fn as_bytes_with_nul(&self) -> &'a [u8] {
        self.bytes
    }

    /// Content as text, if valid UTF-8.
    pub fn as_str(&self) -> Option<&'a str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    pub fn len(&self) -> usize {
        self.bytes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if bytes were dropped under [`OverflowPolicy::Truncate`].
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// Assembler counters since creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    pub bytes: u32,
    pub lines: u32,
    pub overflows: u32,
    pub discarded_lines: u32,
}

/// Fixed-capacity line assembler.
pub struct LineAssembler<const N: usize = LINE_CAPACITY> {
    buf: [u8; N],
    cursor: usize,
    state: AssemblerState,
    terminator: TerminatorPolicy,
    overflow: OverflowPolicy,
    stats: AssemblerStats,
}

impl<const N: usize> LineAssembler<N> {
    /// Create an empty assembler.
    pub const fn new(terminator: TerminatorPolicy, overflow: OverflowPolicy) -> Self {
        // Terminator and sentinel must both fit
        const { assert!(N >= 2, "Line buffer needs room for terminator and sentinel") };

        Self {
            buf: [0u8; N],
            cursor: 0,
            state: AssemblerState::Collecting,
            terminator,
            overflow,
            stats: AssemblerStats {
                bytes: 0,
                lines: 0,
                overflows: 0,
                discarded_lines: 0,
            },
        }
    }

    /// Create an assembler from configured policies.
    pub const fn from_config(config: &crate::config::AssemblerConfig) -> Self {
        Self::new(config.terminator, config.overflow)
    }

    /// Number of content bytes a line may hold.
    #[inline]
    pub const fn content_limit(&self) -> usize {
        match self.terminator {
            TerminatorPolicy::Keep => N - 2,
            TerminatorPolicy::Strip => N - 1,
        }
    }

    /// Feed one received byte.
    #[inline]
    pub fn feed(&mut self, byte: u8) -> Feed<'_> {
        self.stats.bytes = self.stats.bytes.wrapping_add(1);

        if byte == LINE_TERMINATOR {
            return self.complete();
        }

        if self.state == AssemblerState::Overflowed {
            return Feed::Pending;
        }

        if self.cursor >= self.content_limit() {
            self.state = AssemblerState::Overflowed;
            self.stats.overflows = self.stats.overflows.wrapping_add(1);
            return Feed::Overflow;
        }

        self.buf[self.cursor] = byte;
        self.cursor += 1;
        Feed::Pending
    }

    fn complete(&mut self) -> Feed<'_> {
        let overflowed = self.state == AssemblerState::Overflowed;
        let len = self.cursor;
        self.cursor = 0;
        self.state = AssemblerState::Collecting;

        if overflowed && self.overflow == OverflowPolicy::Discard {
            self.stats.discarded_lines = self.stats.discarded_lines.wrapping_add(1);
            return Feed::Pending;
        }

        let mut end = len;
        if self.terminator == TerminatorPolicy::Keep {
            self.buf[end] = LINE_TERMINATOR;
            end += 1;
        }
        self.buf[end] = SENTINEL;
        self.stats.lines = self.stats.lines.wrapping_add(1);

        Feed::LineReady(Line {
            bytes: &self.buf[..=end],
            truncated: overflowed,
        })
    }

    /// Bytes collected since the last terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buf[..self.cursor]
    }

    /// Next write offset.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Drop any partial line.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.state = AssemblerState::Collecting;
    }
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new(TerminatorPolicy::Keep, OverflowPolicy::Discard)
    }
}
