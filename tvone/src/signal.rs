//! Protocol event outputs: status signals and structured diagnostics.
//!
//! Both interfaces are injected and optional. The engine works fine with
//! neither; with them, every exchange drives the busy/error outputs and
//! produces one [`ExchangeRecord`] for the sink.

use crate::protocol::frame::Direction;
use log::{debug, warn};

/// Binary status outputs driven by protocol events.
///
/// `set_busy` frames every transmission; `set_error` is pulsed by the engine
/// for a fixed duration after a failed exchange and cleared automatically.
pub trait StatusSignals {
    /// Drive the "write in progress" output.
    fn set_busy(&mut self, on: bool);

    /// Drive the error output.
    fn set_error(&mut self, on: bool);
}

/// How one exchange concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    /// Full acknowledgment with accept status and a consistent payload echo.
    Accepted,
    /// The deadline expired with fewer bytes than a full acknowledgment.
    TimedOut {
        /// Bytes collected before the deadline.
        received: usize,
    },
    /// Full acknowledgment, but the status byte signalled rejection.
    Rejected {
        /// The raw status byte.
        status: u8,
    },
    /// Write acknowledged, but the unit holds a different payload.
    EchoMismatch {
        /// The payload the caller asked to set.
        requested: i32,
        /// The payload the unit echoed.
        echoed: i32,
    },
    /// Full-length acknowledgment whose payload echo was not parseable hex.
    Garbled,
    /// Bulk chunk reply did not match the fixed accept pattern.
    ChunkRejected {
        /// Zero-based index of the rejected chunk.
        index: u16,
    },
}

impl Outcome {
    /// Whether this outcome is a success.
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Structured record of one exchange, command or bulk chunk.
///
/// For bulk chunks the record is keyed differently: `window` carries the
/// target slot, `function` the bulk opcode, and `payload` the chunk index.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExchangeRecord<'a> {
    /// Direction of the exchange.
    pub direction: Direction,
    /// Channel addressed.
    pub channel: u8,
    /// Window addressed.
    pub window: u8,
    /// Function code.
    pub function: u16,
    /// Payload requested (writes) or zero (reads).
    pub payload: i32,
    /// How the exchange concluded.
    pub outcome: Outcome,
    /// Raw reply bytes as collected (partial on timeout).
    pub reply: &'a [u8],
}

/// Receives one record per exchange.
pub trait DiagnosticSink {
    /// Called after every exchange, successful or not.
    fn exchange(&mut self, record: &ExchangeRecord<'_>);
}

/// Diagnostic sink that routes records to the `log` facade.
///
/// Successes go to `debug`, failures to `warn` with the raw reply bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn exchange(&mut self, record: &ExchangeRecord<'_>) {
        if record.outcome.is_accepted() {
            debug!(
                "{:?} ch={} win={:#04x} func={:#06x} payload={}: ok",
                record.direction, record.channel, record.window, record.function, record.payload
            );
        } else {
            warn!(
                "{:?} ch={} win={:#04x} func={:#06x} payload={}: {:?}, reply {:02X?}",
                record.direction,
                record.channel,
                record.window,
                record.function,
                record.payload,
                record.outcome,
                record.reply
            );
        }
    }
}
