//! Chunked binary bulk-transfer framing.
//!
//! Firmware-like blobs (display identification data, stored images) go up
//! through a sub-protocol distinct from the command framing: raw binary
//! frames, no ASCII-hex layer, and a fixed 4-byte accept reply per chunk.
//!
//! ## Chunk frame (41 bytes)
//!
//! ```text
//! +------+-----+------+------+------+------+---------+--------------+------+
//! | 0x53 | LEN | 0x22 | KIND | SLOT | 0x00 | IDX(LE) | PAYLOAD (32) | 0x3F |
//! +------+-----+------+------+------+------+---------+--------------+------+
//! | 1    | 1   | 1    | 1    | 1    | 1    | 2       | 32           | 1    |
//! +------+-----+------+------+------+------+---------+--------------+------+
//! ```
//!
//! `LEN = 6 + meaningful + 1`, where `meaningful` counts the real
//! (pre-padding) payload bytes in the 32-byte window. Short windows are
//! zero-padded; every frame is 41 bytes regardless.

use byteorder::{LittleEndian, WriteBytesExt};
use std::fmt;

/// First byte of every bulk frame and of the accept reply.
pub const FRAME_START: u8 = 0x53;

/// Opcode for writing a blob chunk.
pub const BLOB_WRITE: u8 = 0x22;

/// Terminator byte of every bulk frame.
pub const FRAME_END: u8 = 0x3F;

/// Payload window per chunk.
pub const CHUNK_PAYLOAD: usize = 32;

/// Total frame length: 8-byte header + payload window + terminator.
pub const FRAME_LEN: usize = 41;

/// Length of the per-chunk reply.
pub const ACK_LEN: usize = 4;

/// The fixed accept reply. Exact match required, no partial credit.
pub const ACCEPT_PATTERN: [u8; ACK_LEN] = [0x53, 0x02, 0x40, 0x95];

/// Width of a display-identification (EDID) slot. Slot-bounded uploads
/// always transmit the full slot in 32-byte chunks.
pub const EDID_SLOT_SIZE: usize = 256;

/// Class of blob being uploaded; selects the unit's target storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlobKind {
    /// Display-identification data for an input (fixed 256-byte slot).
    Edid,
    /// Stored image data (length-bounded).
    Image,
}

impl BlobKind {
    /// The kind tag byte carried in every chunk frame.
    pub fn tag(self) -> u8 {
        match self {
            Self::Edid => 0x00,
            Self::Image => 0x01,
        }
    }
}

impl fmt::Display for BlobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edid => write!(f, "EDID"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// Number of chunks needed to cover `span` bytes.
pub fn chunk_count(span: usize) -> usize {
    span.div_ceil(CHUNK_PAYLOAD)
}

/// Build the frame for one chunk.
///
/// `payload` holds the meaningful bytes of this chunk's 32-byte window;
/// shorter slices are zero-padded on the wire. Windows past the end of a
/// slot-bounded source are all padding (`payload` empty).
#[allow(clippy::cast_possible_truncation)] // LEN is at most 39
#[allow(clippy::unwrap_used)] // Writing to Vec<u8> cannot fail
pub fn chunk_frame(kind: BlobKind, slot: u8, index: u16, payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= CHUNK_PAYLOAD);

    let mut frame = Vec::with_capacity(FRAME_LEN);
    frame.push(FRAME_START);
    frame.push((6 + payload.len() + 1) as u8);
    frame.push(BLOB_WRITE);
    frame.push(kind.tag());
    frame.push(slot);
    frame.push(0x00);
    frame.write_u16::<LittleEndian>(index).unwrap();
    frame.extend_from_slice(payload);
    frame.resize(FRAME_LEN - 1, 0x00);
    frame.push(FRAME_END);
    frame
}
