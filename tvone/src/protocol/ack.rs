//! Acknowledgment synchronization against a wall-clock deadline.
//!
//! The collector is a two-state byte machine: **Seeking** discards input
//! until the start-of-frame marker appears, **Collecting** stores bytes in
//! order until the expected length is reached. The deadline is absolute for
//! the whole exchange; there is no early-return settle window. Whether a
//! complete buffer is actually a *successful* acknowledgment is the
//! orchestrator's call — the only contract here is "got exactly N
//! well-aligned bytes, or didn't".

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::link::Link;
use crate::protocol::frame::MARKER;
use log::trace;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long to park between polls when no byte is pending.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Result of one collection attempt.
///
/// `Short` is never a success: it carries whatever arrived before the
/// deadline, for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reception {
    /// Exactly the expected number of bytes arrived in time.
    Complete(Vec<u8>),
    /// The deadline expired first.
    Short(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Seeking,
    Collecting,
}

/// Collect a marker-aligned reply of exactly `expected_len` bytes, storing
/// the marker at position 0.
pub fn receive_aligned<L, C>(
    link: &mut L,
    clock: &C,
    expected_len: usize,
    timeout: Duration,
    cancel: Option<&AtomicBool>,
) -> Result<Reception>
where
    L: Link + ?Sized,
    C: Clock + ?Sized,
{
    collect(link, clock, expected_len, timeout, cancel, SyncState::Seeking)
}

/// Collect exactly `expected_len` raw bytes with no marker alignment
/// (the bulk-transfer reply has no marker byte).
pub fn receive_exact<L, C>(
    link: &mut L,
    clock: &C,
    expected_len: usize,
    timeout: Duration,
    cancel: Option<&AtomicBool>,
) -> Result<Reception>
where
    L: Link + ?Sized,
    C: Clock + ?Sized,
{
    collect(
        link,
        clock,
        expected_len,
        timeout,
        cancel,
        SyncState::Collecting,
    )
}

#[allow(clippy::cast_possible_truncation)] // timeouts are far below u64::MAX ms
fn collect<L, C>(
    link: &mut L,
    clock: &C,
    expected_len: usize,
    timeout: Duration,
    cancel: Option<&AtomicBool>,
    initial: SyncState,
) -> Result<Reception>
where
    L: Link + ?Sized,
    C: Clock + ?Sized,
{
    let mut buffer = Vec::with_capacity(expected_len);
    let mut state = initial;
    let deadline = clock.now_ms().saturating_add(timeout.as_millis() as u64);

    while clock.now_ms() < deadline {
        if cancel.is_some_and(|token| token.load(Ordering::Relaxed)) {
            return Err(Error::Cancelled);
        }

        if link.byte_ready()? {
            let byte = link.read_byte()?;
            match state {
                SyncState::Seeking if byte == MARKER => {
                    buffer.push(byte);
                    state = SyncState::Collecting;
                },
                SyncState::Seeking => {
                    trace!("discarding unaligned byte {byte:#04x}");
                },
                SyncState::Collecting => {
                    buffer.push(byte);
                },
            }
            if buffer.len() == expected_len {
                return Ok(Reception::Complete(buffer));
            }
        } else {
            clock.park(POLL_INTERVAL);
        }
    }

    Ok(Reception::Short(buffer))
}
