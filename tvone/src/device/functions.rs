//! Device function catalogue for the 1T-C2-750 class of units.
//!
//! Configuration data, not protocol logic: window identifiers and the
//! 13-bit function codes behind the operations this crate ships. Codes for
//! other adjustments follow the same scheme and can be passed straight to
//! [`Processor::set`](crate::device::Processor::set) /
//! [`Processor::get`](crate::device::Processor::get).

/// Logical window A.
pub const WINDOW_A: u8 = 0x41;

/// Logical window B.
pub const WINDOW_B: u8 = 0x42;

// Adjust-resolution group. All writes target the store previously selected
// with RESOLUTION_IMAGE_TO_ADJUST.

/// Select which resolution store subsequent adjustments apply to.
pub const RESOLUTION_IMAGE_TO_ADJUST: u16 = 0x000F;

/// Active pixels per line.
pub const RESOLUTION_ACTIVE_H: u16 = 0x0010;

/// Active lines per frame.
pub const RESOLUTION_ACTIVE_V: u16 = 0x0011;

/// Horizontal start of active video.
pub const RESOLUTION_START_H: u16 = 0x0012;

/// Vertical start of active video.
pub const RESOLUTION_START_V: u16 = 0x0013;

/// Total clocks per line.
pub const RESOLUTION_CLKS: u16 = 0x0014;

/// Total lines per frame.
pub const RESOLUTION_LINES: u16 = 0x0015;

/// Horizontal sync width.
pub const RESOLUTION_SYNC_H: u16 = 0x0016;

/// Vertical sync width.
pub const RESOLUTION_SYNC_V: u16 = 0x0017;

/// Sync polarity.
pub const RESOLUTION_SYNC_POLARITY: u16 = 0x0018;

/// Interlaced flag.
pub const RESOLUTION_INTERLACED: u16 = 0x0019;

/// Coarse horizontal frequency, in Hz.
pub const RESOLUTION_FREQ_COARSE_H: u16 = 0x001A;

/// Fine horizontal frequency, in Hz.
pub const RESOLUTION_FREQ_FINE_H: u16 = 0x001B;

/// Lock/unlock the front panel.
pub const FRONT_PANEL_LOCK: u16 = 0x0021;

// Content-protection group.

/// Whether the output requires HDCP.
pub const OUTPUT_HDCP_REQUIRED: u16 = 0x0231;

/// HDCP state of the output.
pub const OUTPUT_HDCP_STATUS: u16 = 0x0232;

/// Whether a source window advertises HDCP support upstream.
pub const SOURCE_HDCP_ADVERTIZE: u16 = 0x0233;

/// HDCP state of a source window.
pub const SOURCE_HDCP_STATUS: u16 = 0x0234;

// Identity group, read-only.

/// Firmware version.
pub const SOFTWARE_VERSION: u16 = 0x0062;

/// Product type code.
pub const PRODUCT_TYPE: u16 = 0x0063;

/// Board type code.
pub const BOARD_TYPE: u16 = 0x0064;

// Custom resolution stores used by the shipped timing tables.

/// Store holding the triple-head 1920x480p60 timing.
pub const STORE_TRIPLE_HEAD_VGA_P60: i32 = 87;

/// Store holding the dual-head 1600x600p60 timing.
pub const STORE_DUAL_HEAD_SVGA_P60: i32 = 88;

/// Store holding the dual-head 2048x768p60 timing.
pub const STORE_DUAL_HEAD_XGA_P60: i32 = 89;
