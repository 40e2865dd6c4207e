//! Custom display-timing tables.
//!
//! Multi-head rigs drive the unit at widths its stock tables don't cover;
//! these three cover the usual dual/triple-head splits. Values are the
//! measured timings the hardware accepts, not computed from a standard.

use crate::device::functions;

/// One custom timing table, written field-by-field into a resolution store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TimingTable {
    /// Human-readable mode name.
    pub name: &'static str,
    /// Resolution store this table is installed into.
    pub store: i32,
    /// Interlaced mode.
    pub interlaced: bool,
    /// Horizontal frequency in Hz (written to both coarse and fine).
    pub freq_h: i32,
    /// Active pixels per line.
    pub active_h: i32,
    /// Active lines per frame.
    pub active_v: i32,
    /// Horizontal start of active video.
    pub start_h: i32,
    /// Vertical start of active video.
    pub start_v: i32,
    /// Total clocks per line.
    pub clks: i32,
    /// Total lines per frame.
    pub lines: i32,
    /// Horizontal sync width.
    pub sync_h: i32,
    /// Vertical sync width.
    pub sync_v: i32,
    /// Sync polarity.
    pub sync_polarity: i32,
}

impl TimingTable {
    /// The adjustment writes that install this table, in order. Does not
    /// include the store selection, which must precede them.
    pub fn steps(&self) -> [(u16, i32); 12] {
        [
            (functions::RESOLUTION_INTERLACED, i32::from(self.interlaced)),
            (functions::RESOLUTION_FREQ_COARSE_H, self.freq_h),
            (functions::RESOLUTION_FREQ_FINE_H, self.freq_h),
            (functions::RESOLUTION_ACTIVE_H, self.active_h),
            (functions::RESOLUTION_ACTIVE_V, self.active_v),
            (functions::RESOLUTION_START_H, self.start_h),
            (functions::RESOLUTION_START_V, self.start_v),
            (functions::RESOLUTION_CLKS, self.clks),
            (functions::RESOLUTION_LINES, self.lines),
            (functions::RESOLUTION_SYNC_H, self.sync_h),
            (functions::RESOLUTION_SYNC_V, self.sync_v),
            (functions::RESOLUTION_SYNC_POLARITY, self.sync_polarity),
        ]
    }
}

/// 1920x480p60 for triple-head VGA splits.
pub const TRIPLE_HEAD_VGA_P60: TimingTable = TimingTable {
    name: "1920x480p60",
    store: functions::STORE_TRIPLE_HEAD_VGA_P60,
    interlaced: false,
    freq_h: 31475,
    active_h: 1920,
    active_v: 480,
    start_h: 240,
    start_v: 5,
    clks: 2400,
    lines: 525,
    sync_h: 192,
    sync_v: 30,
    sync_polarity: 0,
};

/// 1600x600p60 for dual-head SVGA splits.
pub const DUAL_HEAD_SVGA_P60: TimingTable = TimingTable {
    name: "1600x600p60",
    store: functions::STORE_DUAL_HEAD_SVGA_P60,
    interlaced: false,
    freq_h: 37879,
    active_h: 1600,
    active_v: 600,
    start_h: 192,
    start_v: 14,
    clks: 2112,
    lines: 628,
    sync_h: 160,
    sync_v: 13,
    sync_polarity: 0,
};

/// 2048x768p60 for dual-head XGA splits.
pub const DUAL_HEAD_XGA_P60: TimingTable = TimingTable {
    name: "2048x768p60",
    store: functions::STORE_DUAL_HEAD_XGA_P60,
    interlaced: false,
    freq_h: 48363,
    active_h: 2048,
    active_v: 768,
    start_h: 224,
    start_v: 11,
    clks: 2688,
    lines: 806,
    sync_h: 368,
    sync_v: 24,
    sync_polarity: 0,
};

/// The tables installed by
/// [`Processor::install_custom_resolutions`](crate::device::Processor::install_custom_resolutions).
pub const CUSTOM_TABLES: [&TimingTable; 3] =
    [&TRIPLE_HEAD_VGA_P60, &DUAL_HEAD_SVGA_P60, &DUAL_HEAD_XGA_P60];
