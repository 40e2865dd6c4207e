//! Transaction orchestration for one unit.
//!
//! A [`Processor`] owns the link for its lifetime and is the sole reader and
//! sole writer on it. Every exchange runs the same sequence: pacing gate
//! (drain stale input, honor the minimum inter-command spacing), transmit,
//! synchronize on the acknowledgment against the current deadline, interpret
//! the reply, drive the busy/error outputs, and hand a record to the
//! diagnostic sink. Controlling several units means one isolated `Processor`
//! per unit; no state is shared across instances.

pub mod functions;
pub mod presets;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::link::Link;
use crate::protocol::ack::{self, Reception};
use crate::protocol::bulk::{self, BlobKind};
use crate::protocol::frame::{self, CommandFrame};
use crate::signal::{DiagnosticSink, ExchangeRecord, Outcome, StatusSignals};
use crate::timing::{self, TimingPolicy};
use log::{debug, trace, warn};
use self::presets::TimingTable;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Width of the auto-clearing error pulse.
const ERROR_PULSE: Duration = Duration::from_millis(250);

/// Attempts made by the escalating retry wrapper.
const RETRY_ATTEMPTS: usize = 3;

/// How long the pacing gate parks between polls.
const PACE_POLL: Duration = Duration::from_millis(1);

/// One command/response round trip, dispatched by direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// Set a parameter and verify the echoed payload.
    Write {
        /// Channel to address.
        channel: u8,
        /// Window to address.
        window: u8,
        /// Function code.
        function: u16,
        /// Payload to set (signed 24-bit range).
        payload: i32,
    },
    /// Query a parameter.
    Read {
        /// Channel to address.
        channel: u8,
        /// Window to address.
        window: u8,
        /// Function code.
        function: u16,
    },
}

/// Identity of the controlled unit, resolved lazily by read exchanges and
/// cached for the session once complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessorIdentity {
    /// Firmware version code.
    pub version: i32,
    /// Product type code.
    pub product_type: i32,
    /// Board type code.
    pub board_type: i32,
}

#[derive(Debug, Clone, Copy, Default)]
struct IdentityCache {
    version: Option<i32>,
    product_type: Option<i32>,
    board_type: Option<i32>,
}

impl IdentityCache {
    fn complete(&self) -> Option<ProcessorIdentity> {
        Some(ProcessorIdentity {
            version: self.version?,
            product_type: self.product_type?,
            board_type: self.board_type?,
        })
    }
}

/// Protocol engine for one unit.
///
/// Generic over the link type `L` and clock `C`, so the same engine drives
/// real serial hardware and deterministic test doubles.
pub struct Processor<L: Link, C: Clock = SystemClock> {
    link: L,
    clock: C,
    timing: TimingPolicy,
    signals: Option<Box<dyn StatusSignals>>,
    diagnostics: Option<Box<dyn DiagnosticSink>>,
    cancel: Option<Arc<AtomicBool>>,
    identity: IdentityCache,
    error_pulse_until: Option<u64>,
}

impl<L: Link, C: Clock> Processor<L, C> {
    /// Create an engine over an open link.
    pub fn new(link: L, clock: C) -> Self {
        Self {
            link,
            clock,
            timing: TimingPolicy::new(),
            signals: None,
            diagnostics: None,
            cancel: None,
            identity: IdentityCache::default(),
            error_pulse_until: None,
        }
    }

    /// Attach busy/error status outputs.
    #[must_use]
    pub fn with_signals(mut self, signals: Box<dyn StatusSignals>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Attach a structured diagnostic sink.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Attach a cancellation token; poll loops abort when it is set.
    #[must_use]
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Replace the timing policy.
    #[must_use]
    pub fn with_timing(mut self, timing: TimingPolicy) -> Self {
        self.timing = timing;
        self
    }

    /// Get a reference to the underlying link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Get a mutable reference to the underlying link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Consume the engine and return the underlying link.
    pub fn into_link(self) -> L {
        self.link
    }

    /// The current timing policy.
    pub fn timing(&self) -> &TimingPolicy {
        &self.timing
    }

    /// Mutable access to the timing policy.
    pub fn timing_mut(&mut self) -> &mut TimingPolicy {
        &mut self.timing
    }

    /// Milliseconds since the last exchange completed, if any has.
    pub fn idle_ms(&self) -> Option<u64> {
        self.timing.idle_ms(self.clock.now_ms())
    }

    /// Periodic hygiene: clears an elapsed error pulse and refreshes the
    /// idle reference after long-idle sessions. Call roughly once a minute
    /// when the engine sits idle; exchanges do both on their own.
    pub fn maintain(&mut self) {
        let now = self.clock.now_ms();
        self.service_error_pulse(now);
        self.timing.maintain(now);
    }

    /// Run one exchange and return the echoed payload.
    ///
    /// For writes the echo has already been verified against the requested
    /// payload; for reads it is the queried value.
    pub fn execute(&mut self, exchange: Exchange) -> Result<i32> {
        let (command, requested) = match exchange {
            Exchange::Write {
                channel,
                window,
                function,
                payload,
            } => (
                CommandFrame::write(channel, window, function, payload),
                Some(frame::masked_payload(payload)),
            ),
            Exchange::Read {
                channel,
                window,
                function,
            } => (CommandFrame::read(channel, window, function), None),
        };

        self.pace()?;
        self.set_busy(true);

        let reception = self
            .link
            .write_all(&command.encode())
            .and_then(|()| {
                ack::receive_aligned(
                    &mut self.link,
                    &self.clock,
                    frame::STANDARD_ACK_LEN,
                    self.timing.timeout_period(),
                    self.cancel.as_deref(),
                )
            });

        self.set_busy(false);
        self.timing.mark_exchange(self.clock.now_ms());

        let (outcome, reply, result) = match reception? {
            Reception::Short(bytes) => {
                let received = bytes.len();
                (
                    Outcome::TimedOut { received },
                    bytes,
                    Err(Error::Timeout {
                        expected: frame::STANDARD_ACK_LEN,
                        received,
                    }),
                )
            },
            Reception::Complete(buffer) => Self::interpret(&command, requested, buffer),
        };

        self.conclude(&command, outcome, &reply);
        result
    }

    /// Judge a complete acknowledgment. Reaching here only means the bytes
    /// arrived; acceptance and echo consistency are decided now.
    fn interpret(
        command: &CommandFrame,
        requested: Option<i32>,
        buffer: Vec<u8>,
    ) -> (Outcome, Vec<u8>, Result<i32>) {
        if !frame::ack_accepted(&buffer) {
            let status = buffer[1];
            return (
                Outcome::Rejected { status },
                buffer,
                Err(Error::DeviceError { status }),
            );
        }

        let Some(echoed) = frame::ack_payload(&buffer) else {
            return (
                Outcome::Garbled,
                buffer,
                Err(Error::Protocol(format!(
                    "unparseable payload echo for function {:#06x}",
                    command.function()
                ))),
            );
        };

        match requested {
            Some(requested) if echoed != requested => (
                Outcome::EchoMismatch { requested, echoed },
                buffer,
                Err(Error::PayloadMismatch { requested, echoed }),
            ),
            _ => (Outcome::Accepted, buffer, Ok(echoed)),
        }
    }

    /// Set a parameter.
    pub fn set(&mut self, channel: u8, window: u8, function: u16, payload: i32) -> Result<()> {
        self.execute(Exchange::Write {
            channel,
            window,
            function,
            payload,
        })
        .map(|_| ())
    }

    /// Read a parameter.
    pub fn get(&mut self, channel: u8, window: u8, function: u16) -> Result<i32> {
        self.execute(Exchange::Read {
            channel,
            window,
            function,
        })
    }

    /// Set a parameter with the escalating retry loop.
    ///
    /// Some adjustments need settling time the unit does not advertise.
    /// Each failed attempt loosens both timing periods by the escalation
    /// step for the attempts that follow; the baseline is restored when the
    /// loop exits, success or not.
    pub fn set_with_retry(
        &mut self,
        channel: u8,
        window: u8,
        function: u16,
        payload: i32,
    ) -> Result<()> {
        let baseline = self.timing.profile();
        let mut last_error = None;

        for attempt in 1..=RETRY_ATTEMPTS {
            match self.set(channel, window, function, payload) {
                Ok(()) => {
                    self.timing.apply(baseline);
                    return Ok(());
                },
                Err(
                    error @ (Error::Timeout { .. }
                    | Error::DeviceError { .. }
                    | Error::PayloadMismatch { .. }
                    | Error::Protocol(_)),
                ) => {
                    warn!(
                        "write {function:#06x} failed (attempt {attempt}/{RETRY_ATTEMPTS}): {error}"
                    );
                    if attempt < RETRY_ATTEMPTS {
                        let step = self.timing.escalation();
                        self.timing.increase(step);
                    }
                    last_error = Some(error);
                },
                Err(fatal) => {
                    self.timing.apply(baseline);
                    return Err(fatal);
                },
            }
        }

        self.timing.apply(baseline);
        Err(last_error.unwrap_or(Error::Protocol("write retries exhausted".into())))
    }

    /// Install the three custom timing tables, with the front panel locked
    /// for the duration. Short-circuits on the first failure; already
    /// applied steps are not rolled back.
    pub fn install_custom_resolutions(&mut self) -> Result<()> {
        debug!("installing custom resolution stores");
        self.set_with_retry(0, 0, functions::FRONT_PANEL_LOCK, 1)?;
        for table in presets::CUSTOM_TABLES {
            self.install_timing_table(table)?;
        }
        self.set_with_retry(0, 0, functions::FRONT_PANEL_LOCK, 0)?;
        Ok(())
    }

    /// Write one timing table into its resolution store.
    pub fn install_timing_table(&mut self, table: &TimingTable) -> Result<()> {
        debug!("writing {} to store {}", table.name, table.store);
        self.set_with_retry(0, 0, functions::RESOLUTION_IMAGE_TO_ADJUST, table.store)?;
        for (function, value) in table.steps() {
            self.set_with_retry(0, 0, function, value)?;
        }
        Ok(())
    }

    /// Enable or disable content protection on the output and both source
    /// windows. Short-circuits on the first failure.
    pub fn set_hdcp_enabled(&mut self, enabled: bool) -> Result<()> {
        let state = i32::from(enabled);
        debug!("setting HDCP state to {state}");
        self.set_with_retry(0, functions::WINDOW_A, functions::OUTPUT_HDCP_REQUIRED, state)?;
        self.set_with_retry(0, functions::WINDOW_A, functions::OUTPUT_HDCP_STATUS, state)?;
        self.set_with_retry(0, functions::WINDOW_A, functions::SOURCE_HDCP_ADVERTIZE, state)?;
        self.set_with_retry(0, functions::WINDOW_B, functions::SOURCE_HDCP_ADVERTIZE, state)?;
        self.set_with_retry(0, functions::WINDOW_A, functions::SOURCE_HDCP_STATUS, state)?;
        self.set_with_retry(0, functions::WINDOW_B, functions::SOURCE_HDCP_STATUS, state)?;
        Ok(())
    }

    /// Identify the unit. Fields resolve lazily through read exchanges and
    /// stay cached for the engine's lifetime once all three are known.
    pub fn identity(&mut self) -> Result<ProcessorIdentity> {
        if let Some(identity) = self.identity.complete() {
            return Ok(identity);
        }

        let version = match self.identity.version {
            Some(value) => value,
            None => {
                let value = self.get(0, 0, functions::SOFTWARE_VERSION)?;
                self.identity.version = Some(value);
                value
            },
        };
        let product_type = match self.identity.product_type {
            Some(value) => value,
            None => {
                let value = self.get(0, 0, functions::PRODUCT_TYPE)?;
                self.identity.product_type = Some(value);
                value
            },
        };
        let board_type = match self.identity.board_type {
            Some(value) => value,
            None => {
                let value = self.get(0, 0, functions::BOARD_TYPE)?;
                self.identity.board_type = Some(value);
                value
            },
        };

        Ok(ProcessorIdentity {
            version,
            product_type,
            board_type,
        })
    }

    /// Upload display-identification data into a fixed 256-byte slot.
    ///
    /// The full slot width is always transmitted; sources shorter than the
    /// slot are zero-filled. `progress` receives `(sent_chunks, total)`.
    pub fn upload_edid(
        &mut self,
        source: &[u8],
        slot: u8,
        progress: impl FnMut(usize, usize),
    ) -> Result<()> {
        if source.len() > bulk::EDID_SLOT_SIZE {
            return Err(Error::InvalidSource(format!(
                "EDID source is {} bytes, slot holds {}",
                source.len(),
                bulk::EDID_SLOT_SIZE
            )));
        }
        self.upload_blob(BlobKind::Edid, source, slot, bulk::EDID_SLOT_SIZE, progress)
    }

    /// Upload an image into a storage slot. The chunk count follows the
    /// source length. `progress` receives `(sent_chunks, total)`.
    pub fn upload_image(
        &mut self,
        source: &[u8],
        slot: u8,
        progress: impl FnMut(usize, usize),
    ) -> Result<()> {
        if source.is_empty() {
            return Err(Error::InvalidSource("image source is empty".into()));
        }
        self.upload_blob(BlobKind::Image, source, slot, source.len(), progress)
    }

    /// Common upload path: impose the conservative upload profile, run the
    /// transfer, restore the previous profile whatever the outcome. After an
    /// aborted upload the slot's contents are unspecified; callers must
    /// treat it as unusable.
    fn upload_blob(
        &mut self,
        kind: BlobKind,
        source: &[u8],
        slot: u8,
        span: usize,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<()> {
        let saved = self.timing.profile();
        self.timing.apply(timing::UPLOAD_PROFILE);
        let outcome = self.run_upload(kind, source, slot, span, &mut progress);
        self.timing.apply(saved);
        outcome
    }

    #[allow(clippy::cast_possible_truncation)] // chunk indices fit u16 by construction
    fn run_upload(
        &mut self,
        kind: BlobKind,
        source: &[u8],
        slot: u8,
        span: usize,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<()> {
        let total = bulk::chunk_count(span);
        debug!(
            "uploading {kind} blob to slot {slot}: {} bytes, {total} chunks",
            source.len()
        );

        for index in 0..total {
            let window_start = (index * bulk::CHUNK_PAYLOAD).min(source.len());
            let meaningful = (source.len() - window_start).min(bulk::CHUNK_PAYLOAD);
            let payload = &source[window_start..window_start + meaningful];

            let chunk = bulk::chunk_frame(kind, slot, index as u16, payload);
            self.send_chunk(slot, index, &chunk)?;
            progress(index + 1, total);
        }

        debug!("{kind} upload complete");
        Ok(())
    }

    /// Transmit one chunk and require the exact 4-byte accept reply. Any
    /// mismatch aborts the whole upload; there is no per-chunk retry.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn send_chunk(&mut self, slot: u8, index: usize, chunk: &[u8]) -> Result<()> {
        self.pace()?;
        self.set_busy(true);

        let reception = self.link.write_all(chunk).and_then(|()| {
            ack::receive_exact(
                &mut self.link,
                &self.clock,
                bulk::ACK_LEN,
                self.timing.timeout_period(),
                self.cancel.as_deref(),
            )
        });

        self.set_busy(false);
        self.timing.mark_exchange(self.clock.now_ms());

        let (outcome, reply, result) = match reception? {
            Reception::Short(bytes) => {
                let received = bytes.len();
                (
                    Outcome::TimedOut { received },
                    bytes,
                    Err(Error::Timeout {
                        expected: bulk::ACK_LEN,
                        received,
                    }),
                )
            },
            Reception::Complete(buffer) => {
                if buffer == bulk::ACCEPT_PATTERN {
                    (Outcome::Accepted, buffer, Ok(()))
                } else {
                    (
                        Outcome::ChunkRejected {
                            index: index as u16,
                        },
                        buffer,
                        Err(Error::UploadAckMismatch { chunk: index }),
                    )
                }
            },
        };

        // Bulk records key the slot into `window` and the chunk index into
        // `payload`; see ExchangeRecord.
        let record_frame = CommandFrame::write(0, slot, u16::from(bulk::BLOB_WRITE), index as i32);
        self.conclude(&record_frame, outcome, &reply);
        result
    }

    /// Pacing gate: drain unsolicited input and block until the minimum
    /// inter-command spacing has elapsed since the previous exchange
    /// completed.
    fn pace(&mut self) -> Result<()> {
        loop {
            while self.link.byte_ready()? {
                let stale = self.link.read_byte()?;
                trace!("discarding stale byte {stale:#04x}");
            }

            let now = self.clock.now_ms();
            self.service_error_pulse(now);
            if self.timing.pacing_cleared(now) {
                return Ok(());
            }
            if self.cancelled() {
                return Err(Error::Cancelled);
            }
            self.clock.park(PACE_POLL);
        }
    }

    /// Common tail of every exchange: diagnostics always, error pulse on
    /// failure.
    fn conclude(&mut self, command: &CommandFrame, outcome: Outcome, reply: &[u8]) {
        if let Some(sink) = &mut self.diagnostics {
            sink.exchange(&ExchangeRecord {
                direction: command.direction(),
                channel: command.channel(),
                window: command.window(),
                function: command.function(),
                payload: command.payload(),
                outcome,
                reply,
            });
        }
        if !outcome.is_accepted() {
            self.raise_error_pulse();
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|token| token.load(Ordering::Relaxed))
    }

    fn set_busy(&mut self, on: bool) {
        if let Some(signals) = &mut self.signals {
            signals.set_busy(on);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn raise_error_pulse(&mut self) {
        if let Some(signals) = &mut self.signals {
            signals.set_error(true);
            self.error_pulse_until =
                Some(self.clock.now_ms() + ERROR_PULSE.as_millis() as u64);
        }
    }

    fn service_error_pulse(&mut self, now_ms: u64) {
        if self.error_pulse_until.is_some_and(|until| now_ms >= until) {
            if let Some(signals) = &mut self.signals {
                signals.set_error(false);
            }
            self.error_pulse_until = None;
        }
    }
}

#[cfg(feature = "native")]
impl Processor<crate::link::NativeLink> {
    /// Open a serial port and build an engine over it with the wall clock.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let link = crate::link::NativeLink::open(port_name, baud_rate)?;
        Ok(Self::new(link, SystemClock::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeClock, MockLink};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::AtomicBool;

    /// Signal recorder sharing its event list with the test.
    struct RecordedSignals(Rc<RefCell<Vec<(&'static str, bool)>>>);

    impl StatusSignals for RecordedSignals {
        fn set_busy(&mut self, on: bool) {
            self.0.borrow_mut().push(("busy", on));
        }
        fn set_error(&mut self, on: bool) {
            self.0.borrow_mut().push(("error", on));
        }
    }

    /// Diagnostic recorder keeping owned copies of every record.
    struct RecordedDiagnostics(Rc<RefCell<Vec<Outcome>>>);

    impl DiagnosticSink for RecordedDiagnostics {
        fn exchange(&mut self, record: &ExchangeRecord<'_>) {
            self.0.borrow_mut().push(record.outcome);
        }
    }

    fn processor() -> (Processor<MockLink, Rc<FakeClock>>, Rc<FakeClock>) {
        let clock = Rc::new(FakeClock::new());
        let link = MockLink::new(Rc::clone(&clock));
        (Processor::new(link, Rc::clone(&clock)), clock)
    }

    /// A 20-byte acknowledgment with accept status and the given echo.
    fn standard_ack(payload: i32) -> Vec<u8> {
        let mut ack = Vec::with_capacity(frame::STANDARD_ACK_LEN);
        ack.extend_from_slice(b"F4");
        ack.extend_from_slice(b"000000000"); // header echo, ignored by the engine
        ack.extend_from_slice(format!("{:06X}", (payload as u32) & 0x00FF_FFFF).as_bytes());
        ack.extend_from_slice(b"00\r");
        assert_eq!(ack.len(), frame::STANDARD_ACK_LEN);
        ack
    }

    #[test]
    fn test_write_exchange_success() {
        let (mut processor, _clock) = processor();
        processor.link_mut().push_reply(standard_ack(1920));

        processor.set(0, 0, 0x0010, 1920).unwrap();

        let writes = &processor.link().writes;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0], b"F04000000100007809B\r");
    }

    #[test]
    fn test_read_exchange_returns_echo() {
        let (mut processor, _clock) = processor();
        processor.link_mut().push_reply(standard_ack(415));

        let value = processor.get(0, 0, functions::SOFTWARE_VERSION).unwrap();
        assert_eq!(value, 415);
        assert_eq!(processor.link().writes[0].len(), frame::READ_WIRE_LEN);
    }

    #[test]
    fn test_payload_mismatch_is_never_success() {
        let (mut processor, _clock) = processor();
        processor.link_mut().push_reply(standard_ack(1921));

        let err = processor.set(0, 0, 0x0010, 1920).unwrap_err();
        assert!(matches!(
            err,
            Error::PayloadMismatch {
                requested: 1920,
                echoed: 1921
            }
        ));
    }

    #[test]
    fn test_device_rejection() {
        let (mut processor, _clock) = processor();
        let mut nack = standard_ack(1920);
        nack[1] = b'5';
        processor.link_mut().push_reply(nack);

        let err = processor.set(0, 0, 0x0010, 1920).unwrap_err();
        assert!(matches!(err, Error::DeviceError { status: b'5' }));
    }

    #[test]
    fn test_timeout_asserts_error_signal_and_diagnostics() {
        let (processor, _clock) = processor();
        let events = Rc::new(RefCell::new(Vec::new()));
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let mut processor = processor
            .with_signals(Box::new(RecordedSignals(Rc::clone(&events))))
            .with_diagnostics(Box::new(RecordedDiagnostics(Rc::clone(&outcomes))));
        processor.link_mut().push_reply(Vec::new());

        let err = processor.set(0, 0, 0x0010, 1920).unwrap_err();
        assert!(matches!(
            err,
            Error::Timeout {
                expected: 20,
                received: 0
            }
        ));
        assert_eq!(
            events.borrow().as_slice(),
            &[("busy", true), ("busy", false), ("error", true)]
        );
        assert_eq!(
            outcomes.borrow().as_slice(),
            &[Outcome::TimedOut { received: 0 }]
        );
    }

    #[test]
    fn test_partial_ack_is_timeout_with_count() {
        let (mut processor, _clock) = processor();
        processor.link_mut().push_reply(b"F4000".to_vec());

        let err = processor.set(0, 0, 0x0010, 1920).unwrap_err();
        assert!(matches!(
            err,
            Error::Timeout {
                expected: 20,
                received: 5
            }
        ));
    }

    #[test]
    fn test_error_pulse_auto_clears() {
        let (processor, clock) = processor();
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut processor = processor.with_signals(Box::new(RecordedSignals(Rc::clone(&events))));
        processor.link_mut().push_reply(Vec::new());

        processor.set(0, 0, 0x0010, 1920).unwrap_err();
        assert_eq!(events.borrow().last(), Some(&("error", true)));

        clock.advance(300);
        processor.maintain();
        assert_eq!(events.borrow().last(), Some(&("error", false)));
    }

    #[test]
    fn test_pacing_gate_spaces_consecutive_exchanges() {
        let (mut processor, _clock) = processor();
        processor.link_mut().push_reply(standard_ack(1));
        processor.link_mut().push_reply(standard_ack(2));

        processor.set(0, 0, 0x0020, 1).unwrap();
        processor.set(0, 0, 0x0020, 2).unwrap();

        let stamps = &processor.link().write_stamps;
        assert_eq!(stamps.len(), 2);
        assert!(stamps[1] - stamps[0] >= 100);
    }

    #[test]
    fn test_pacing_gate_drains_unsolicited_bytes() {
        let (mut processor, _clock) = processor();
        processor.link_mut().inject(b"noise before command");
        processor.link_mut().push_reply(standard_ack(7));

        processor.set(0, 0, 0x0020, 7).unwrap();
    }

    #[test]
    fn test_retry_escalates_then_restores_baseline() {
        let (mut processor, _clock) = processor();
        let baseline = processor.timing().profile();
        processor.link_mut().push_reply(Vec::new());
        processor.link_mut().push_reply(Vec::new());
        processor.link_mut().push_reply(standard_ack(1920));

        processor.set_with_retry(0, 0, 0x0010, 1920).unwrap();

        let stamps = processor.link().write_stamps.clone();
        assert_eq!(stamps.len(), 3);
        // Attempt 2 runs after attempt 1's 100 ms deadline plus an
        // escalated 600 ms gate; attempt 3 after a 600 ms deadline plus a
        // twice-escalated 1100 ms gate.
        assert_eq!(stamps[1] - stamps[0], 700);
        assert_eq!(stamps[2] - stamps[1], 1700);
        assert_eq!(processor.timing().profile(), baseline);
    }

    #[test]
    fn test_retry_exhaustion_restores_baseline_and_surfaces_last_error() {
        let (mut processor, _clock) = processor();
        let baseline = processor.timing().profile();
        for _ in 0..3 {
            processor.link_mut().push_reply(Vec::new());
        }

        let err = processor.set_with_retry(0, 0, 0x0010, 1920).unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(processor.link().writes.len(), 3);
        assert_eq!(processor.timing().profile(), baseline);
    }

    #[test]
    fn test_identity_reads_once_then_caches() {
        let (mut processor, _clock) = processor();
        processor.link_mut().push_reply(standard_ack(415));
        processor.link_mut().push_reply(standard_ack(282));
        processor.link_mut().push_reply(standard_ack(3));

        let identity = processor.identity().unwrap();
        assert_eq!(
            identity,
            ProcessorIdentity {
                version: 415,
                product_type: 282,
                board_type: 3
            }
        );
        assert_eq!(processor.link().writes.len(), 3);

        // Cached: no further traffic
        let again = processor.identity().unwrap();
        assert_eq!(again, identity);
        assert_eq!(processor.link().writes.len(), 3);
    }

    #[test]
    fn test_identity_partial_failure_keeps_resolved_fields() {
        let (mut processor, _clock) = processor();
        processor.link_mut().push_reply(standard_ack(415));
        processor.link_mut().push_reply(Vec::new());

        processor.identity().unwrap_err();

        // Version is cached; only the two missing fields are re-read
        processor.link_mut().push_reply(standard_ack(282));
        processor.link_mut().push_reply(standard_ack(3));
        let identity = processor.identity().unwrap();
        assert_eq!(identity.version, 415);
        assert_eq!(processor.link().writes.len(), 4);
    }

    #[test]
    fn test_edid_upload_sends_full_slot_in_chunks() {
        let (mut processor, _clock) = processor();
        for _ in 0..8 {
            processor.link_mut().push_reply(bulk::ACCEPT_PATTERN.to_vec());
        }

        let mut reported = Vec::new();
        processor
            .upload_edid(&[1, 2, 3, 4, 5, 6, 7, 8], 0, |sent, total| {
                reported.push((sent, total));
            })
            .unwrap();

        let writes = &processor.link().writes;
        assert_eq!(writes.len(), 8);
        for chunk in writes {
            assert_eq!(chunk.len(), bulk::FRAME_LEN);
        }
        // First chunk carries the 8 real bytes zero-padded to 32
        assert_eq!(writes[0][1], 15);
        assert_eq!(&writes[0][8..16], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(writes[0][16..40].iter().all(|b| *b == 0));
        // Remaining 7 chunks are entirely padding
        for chunk in &writes[1..] {
            assert_eq!(chunk[1], 7);
            assert!(chunk[8..40].iter().all(|b| *b == 0));
        }
        assert_eq!(reported.last(), Some(&(8, 8)));
    }

    #[test]
    fn test_image_upload_chunk_count_follows_source() {
        let (mut processor, _clock) = processor();
        for _ in 0..3 {
            processor.link_mut().push_reply(bulk::ACCEPT_PATTERN.to_vec());
        }

        let source = vec![0xAB; 70];
        processor.upload_image(&source, 4, |_, _| {}).unwrap();
        assert_eq!(processor.link().writes.len(), 3);
    }

    #[test]
    fn test_upload_aborts_on_first_chunk_mismatch() {
        let (mut processor, _clock) = processor();
        let baseline = processor.timing().profile();
        processor.link_mut().push_reply(bulk::ACCEPT_PATTERN.to_vec());
        processor.link_mut().push_reply(vec![0x53, 0x02, 0x40, 0x00]);

        let err = processor
            .upload_edid(&[0xFF; 256], 1, |_, _| {})
            .unwrap_err();
        assert!(matches!(err, Error::UploadAckMismatch { chunk: 1 }));
        assert_eq!(processor.link().writes.len(), 2);
        // Upload profile restored despite the abort
        assert_eq!(processor.timing().profile(), baseline);
    }

    #[test]
    fn test_oversized_edid_source_rejected_before_transfer() {
        let (mut processor, _clock) = processor();
        let err = processor
            .upload_edid(&[0u8; 257], 0, |_, _| {})
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSource(_)));
        assert!(processor.link().writes.is_empty());
    }

    #[test]
    fn test_cancellation_token_aborts_exchange() {
        let (processor, _clock) = processor();
        let token = Arc::new(AtomicBool::new(true));
        let mut processor = processor.with_cancel_token(Arc::clone(&token));

        let err = processor.set(0, 0, 0x0010, 1920).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
