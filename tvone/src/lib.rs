//! # tvone
//!
//! A library for controlling TV One video processors (1T-C2-750 class)
//! over an RS232 link.
//!
//! This crate implements the unit's point-to-point command/response
//! protocol:
//!
//! - Binary command framing with modular-sum checksums, carried as
//!   ASCII-hex on the wire
//! - Acknowledgment synchronization under the unit's hard timing
//!   constraints, with inter-command pacing and escalating retry
//! - A chunked binary bulk-transfer sub-protocol for uploading EDID data
//!   and stored images
//! - Composite operations: custom resolution installation, HDCP toggling,
//!   identity queries
//!
//! The engine is synchronous and blocking by design: every exchange polls
//! the link until data arrives or a deadline expires, and the engine is the
//! sole reader and writer of its link. Drive several units with one
//! isolated [`Processor`] each.
//!
//! ## Supported platforms
//!
//! - **Native** (default): Linux, macOS, Windows via the `serialport` crate
//!
//! ## Features
//!
//! - `native` (default): Native serial port support
//! - `serde`: Serialization support for data types
//!
//! ## Example
//!
//! ```rust,no_run
//! use tvone::{Processor, device::functions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut unit = Processor::open("/dev/ttyUSB0", tvone::link::DEFAULT_BAUD)?;
//!
//!     // Set the output's active width on the selected resolution store
//!     unit.set(0, 0, functions::RESOLUTION_ACTIVE_H, 1920)?;
//!
//!     // Query the firmware version
//!     let version = unit.get(0, 0, functions::SOFTWARE_VERSION)?;
//!     println!("firmware version {version}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod device;
pub mod error;
pub mod link;
pub mod protocol;
pub mod signal;
pub mod timing;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
// Native-specific re-exports
#[cfg(feature = "native")]
pub use link::NativeLink;
pub use {
    clock::{Clock, SystemClock},
    device::{Exchange, Processor, ProcessorIdentity},
    error::{Error, Result},
    link::Link,
    protocol::bulk::BlobKind,
    protocol::frame::{CommandFrame, Direction},
    signal::{DiagnosticSink, ExchangeRecord, LogDiagnostics, Outcome, StatusSignals},
    timing::{TimingPolicy, TimingProfile},
};
