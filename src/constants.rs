//! `Ldackit` Constants
//!
//! This module contains all the constants used throughout the `Ldackit`
//! library. These constants define capacity limits, LDAC codec parameters,
//! and the default adaptive bitrate thresholds.

/// LDAC codec identifier carried in byte 0 of the capability element
pub const LDAC_CODEC_ID: u8 = 0x2D;

/// High bitrate tier in bits per second (990 kbps)
pub const BITRATE_HIGH_BPS: u32 = 990_000;

/// Mid bitrate tier in bits per second (660 kbps)
pub const BITRATE_MID_BPS: u32 = 660_000;

/// Low bitrate tier in bits per second (330 kbps)
pub const BITRATE_LOW_BPS: u32 = 330_000;

/// Wire size of the LDAC capability information element in bytes
pub const CAPS_IE_LEN: usize = 5;

/// Maximum accepted capability element length (trailing bytes are ignored)
pub const MAX_CAPS_IE_LEN: usize = 8;

/// Maximum number of simultaneous codec sessions (must be a power of two)
pub const MAX_SESSIONS: usize = 4;

/// Depth of the event/request/response/notification channels
pub const CHANNEL_DEPTH: usize = 8;

/// Capacity of the per-session link-quality sample window
pub const LINK_QUALITY_WINDOW: usize = 8;

/// Buffer fill percentage below which a sample counts as degraded (X)
pub const DEFAULT_DEGRADE_BUFFER_PERCENT: u8 = 25;

/// Buffer fill percentage above which a sample counts as good (X')
pub const DEFAULT_UPGRADE_BUFFER_PERCENT: u8 = 75;

/// Retransmit count above which a sample counts as degraded (Y)
pub const DEFAULT_MAX_RETRANSMITS: u8 = 2;

/// Consecutive degraded samples required to drop a tier (N)
pub const DEFAULT_DEGRADE_SAMPLE_COUNT: u8 = 3;

/// Consecutive good samples required to raise a tier (M)
pub const DEFAULT_UPGRADE_SAMPLE_COUNT: u8 = 8;

/// Silence longer than this between samples makes link quality unknown
pub const DEFAULT_SAMPLE_TIMEOUT_MS: u64 = 2_000;

/// `EndpointId` length in bytes
pub const ENDPOINT_ID_LENGTH: usize = 6;
