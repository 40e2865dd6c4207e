//! Scripted test doubles for the protocol engine.
//!
//! `MockLink` keeps reads and writes independent (a `Cursor` would conflate
//! them) and releases one scripted reply per write, which models the unit's
//! request/response behavior. `FakeClock` advances time when parked, so
//! deadline loops terminate deterministically without sleeping.

use crate::clock::Clock;
use crate::error::Result;
use crate::link::Link;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Deterministic clock; `park` advances it instead of sleeping.
#[derive(Debug, Default)]
pub(crate) struct FakeClock {
    now: Cell<u64>,
}

impl FakeClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn park(&self, duration: Duration) {
        self.advance(duration.as_millis().max(1) as u64);
    }
}

impl Clock for Rc<FakeClock> {
    fn now_ms(&self) -> u64 {
        self.as_ref().now_ms()
    }

    fn park(&self, duration: Duration) {
        self.as_ref().park(duration);
    }
}

/// Mock serial link with separate read/write buffers.
pub(crate) struct MockLink {
    clock: Rc<FakeClock>,
    incoming: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    /// Every frame written, in order.
    pub(crate) writes: Vec<Vec<u8>>,
    /// Fake-clock stamp of each write.
    pub(crate) write_stamps: Vec<u64>,
}

impl MockLink {
    pub(crate) fn new(clock: Rc<FakeClock>) -> Self {
        Self {
            clock,
            incoming: VecDeque::new(),
            replies: VecDeque::new(),
            writes: Vec::new(),
            write_stamps: Vec::new(),
        }
    }

    /// Queue a reply; it becomes readable after the next write. An empty
    /// reply scripts a unit that never answers.
    pub(crate) fn push_reply(&mut self, bytes: impl Into<Vec<u8>>) {
        self.replies.push_back(bytes.into());
    }

    /// Make bytes readable immediately (unsolicited traffic).
    pub(crate) fn inject(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }
}

impl Link for MockLink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.writes.push(bytes.to_vec());
        self.write_stamps.push(self.clock.now_ms());
        if let Some(reply) = self.replies.pop_front() {
            self.incoming.extend(reply);
        }
        Ok(())
    }

    fn byte_ready(&mut self) -> Result<bool> {
        Ok(!self.incoming.is_empty())
    }

    fn read_byte(&mut self) -> Result<u8> {
        self.incoming.pop_front().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "mock link empty").into()
        })
    }

    fn clear_input(&mut self) -> Result<()> {
        self.incoming.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
