//! LDAC Codec Capabilities
//!
//! This module defines the LDAC capability model and the wire codec for the
//! capability information element exchanged during stream configuration.
//!
//! The element is five bytes: the codec identifier followed by one bitmask
//! byte per capability field. Reserved bits must be zero.
//!
//! | offset | field               |
//! |--------|---------------------|
//! | 0      | codec id (`0x2D`)   |
//! | 1      | sampling-rate mask  |
//! | 2      | channel-mode mask   |
//! | 3      | bit-depth mask      |
//! | 4      | bitrate-tier mask   |

use crate::constants::{
    BITRATE_HIGH_BPS, BITRATE_LOW_BPS, BITRATE_MID_BPS, CAPS_IE_LEN, LDAC_CODEC_ID,
};

/// Capability element parse errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ParseError {
    /// Element is shorter than the fixed header
    Truncated,
    /// Codec identifier mismatch or reserved bits set
    Malformed,
}

/// LDAC bitrate tiers, ordered `Low < Mid < High`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, defmt::Format)]
pub enum BitrateTier {
    /// 330 kbps
    Low,
    /// 660 kbps
    Mid,
    /// 990 kbps
    High,
}

impl BitrateTier {
    /// Bitrate of this tier in bits per second
    #[must_use]
    pub const fn bps(self) -> u32 {
        match self {
            Self::Low => BITRATE_LOW_BPS,
            Self::Mid => BITRATE_MID_BPS,
            Self::High => BITRATE_HIGH_BPS,
        }
    }

    /// Look up the tier for a raw bits-per-second value
    #[must_use]
    pub const fn from_bps(bps: u32) -> Option<Self> {
        match bps {
            BITRATE_LOW_BPS => Some(Self::Low),
            BITRATE_MID_BPS => Some(Self::Mid),
            BITRATE_HIGH_BPS => Some(Self::High),
            _ => None,
        }
    }

    /// Next tier down, or `None` at `Low`
    #[must_use]
    pub const fn step_down(self) -> Option<Self> {
        match self {
            Self::High => Some(Self::Mid),
            Self::Mid => Some(Self::Low),
            Self::Low => None,
        }
    }

    /// Next tier up, or `None` at `High`
    #[must_use]
    pub const fn step_up(self) -> Option<Self> {
        match self {
            Self::Low => Some(Self::Mid),
            Self::Mid => Some(Self::High),
            Self::High => None,
        }
    }
}

/// Audio channel modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ChannelMode {
    /// Single channel
    Mono,
    /// Two independent channels
    Dual,
    /// Stereo pair
    Stereo,
}

/// Sampling rate support (bitfield)
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct SamplingRates(pub u8);

impl SamplingRates {
    /// 44100 Hz
    pub const HZ_44100: u8 = 0x01;
    /// 48000 Hz
    pub const HZ_48000: u8 = 0x02;
    /// 88200 Hz
    pub const HZ_88200: u8 = 0x04;
    /// 96000 Hz
    pub const HZ_96000: u8 = 0x08;
    /// Bits that must be zero on the wire
    pub const RESERVED: u8 = 0xF0;

    /// Create with all rates supported
    #[must_use]
    pub const fn all() -> Self {
        Self(Self::HZ_44100 | Self::HZ_48000 | Self::HZ_88200 | Self::HZ_96000)
    }

    /// Create with the standard rates (44.1 kHz and 48 kHz)
    #[must_use]
    pub const fn standard() -> Self {
        Self(Self::HZ_44100 | Self::HZ_48000)
    }

    /// Check if a rate bit is supported
    #[must_use]
    pub const fn supports(&self, rate: u8) -> bool {
        (self.0 & rate) != 0
    }

    /// Check whether no rate is supported
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Rates supported by both sets
    #[must_use]
    pub const fn intersect(&self, other: &Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Highest supported rate in Hz
    #[must_use]
    pub const fn highest_hz(&self) -> Option<u32> {
        if self.supports(Self::HZ_96000) {
            Some(96_000)
        } else if self.supports(Self::HZ_88200) {
            Some(88_200)
        } else if self.supports(Self::HZ_48000) {
            Some(48_000)
        } else if self.supports(Self::HZ_44100) {
            Some(44_100)
        } else {
            None
        }
    }

    /// Check if a rate in Hz is supported
    #[must_use]
    pub const fn supports_hz(&self, hz: u32) -> bool {
        match hz {
            44_100 => self.supports(Self::HZ_44100),
            48_000 => self.supports(Self::HZ_48000),
            88_200 => self.supports(Self::HZ_88200),
            96_000 => self.supports(Self::HZ_96000),
            _ => false,
        }
    }
}

/// Channel mode support (bitfield)
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct ChannelModes(pub u8);

impl ChannelModes {
    /// Mono
    pub const MONO: u8 = 0x01;
    /// Dual channel
    pub const DUAL: u8 = 0x02;
    /// Stereo
    pub const STEREO: u8 = 0x04;
    /// Bits that must be zero on the wire
    pub const RESERVED: u8 = 0xF8;

    /// Create with all modes supported
    #[must_use]
    pub const fn all() -> Self {
        Self(Self::MONO | Self::DUAL | Self::STEREO)
    }

    /// Create with stereo only
    #[must_use]
    pub const fn stereo() -> Self {
        Self(Self::STEREO)
    }

    /// Check if a mode bit is supported
    #[must_use]
    pub const fn supports(&self, mode: u8) -> bool {
        (self.0 & mode) != 0
    }

    /// Check whether no mode is supported
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Modes supported by both sets
    #[must_use]
    pub const fn intersect(&self, other: &Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Preferred supported mode (stereo over dual over mono)
    #[must_use]
    pub const fn best(&self) -> Option<ChannelMode> {
        if self.supports(Self::STEREO) {
            Some(ChannelMode::Stereo)
        } else if self.supports(Self::DUAL) {
            Some(ChannelMode::Dual)
        } else if self.supports(Self::MONO) {
            Some(ChannelMode::Mono)
        } else {
            None
        }
    }

    /// Check if a channel mode is supported
    #[must_use]
    pub const fn supports_mode(&self, mode: ChannelMode) -> bool {
        match mode {
            ChannelMode::Mono => self.supports(Self::MONO),
            ChannelMode::Dual => self.supports(Self::DUAL),
            ChannelMode::Stereo => self.supports(Self::STEREO),
        }
    }
}

/// Bit depth support (bitfield)
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct BitDepths(pub u8);

impl BitDepths {
    /// 16-bit samples
    pub const BITS_16: u8 = 0x01;
    /// 24-bit samples
    pub const BITS_24: u8 = 0x02;
    /// Bits that must be zero on the wire
    pub const RESERVED: u8 = 0xFC;

    /// Create with all depths supported
    #[must_use]
    pub const fn all() -> Self {
        Self(Self::BITS_16 | Self::BITS_24)
    }

    /// Check if a depth bit is supported
    #[must_use]
    pub const fn supports(&self, depth: u8) -> bool {
        (self.0 & depth) != 0
    }

    /// Check whether no depth is supported
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Depths supported by both sets
    #[must_use]
    pub const fn intersect(&self, other: &Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Deepest supported sample depth in bits
    #[must_use]
    pub const fn deepest(&self) -> Option<u8> {
        if self.supports(Self::BITS_24) {
            Some(24)
        } else if self.supports(Self::BITS_16) {
            Some(16)
        } else {
            None
        }
    }

    /// Check if a depth in bits is supported
    #[must_use]
    pub const fn supports_bits(&self, bits: u8) -> bool {
        match bits {
            16 => self.supports(Self::BITS_16),
            24 => self.supports(Self::BITS_24),
            _ => false,
        }
    }
}

/// Bitrate tier support (bitfield)
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct BitrateTiers(pub u8);

impl BitrateTiers {
    /// 330 kbps tier
    pub const LOW: u8 = 0x01;
    /// 660 kbps tier
    pub const MID: u8 = 0x02;
    /// 990 kbps tier
    pub const HIGH: u8 = 0x04;
    /// Bits that must be zero on the wire
    pub const RESERVED: u8 = 0xF8;

    /// Create with all tiers supported
    #[must_use]
    pub const fn all() -> Self {
        Self(Self::LOW | Self::MID | Self::HIGH)
    }

    /// Check if a tier bit is supported
    #[must_use]
    pub const fn supports(&self, tier: u8) -> bool {
        (self.0 & tier) != 0
    }

    /// Check whether no tier is supported
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Tiers supported by both sets
    #[must_use]
    pub const fn intersect(&self, other: &Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Highest supported tier
    #[must_use]
    pub const fn highest(&self) -> Option<BitrateTier> {
        if self.supports(Self::HIGH) {
            Some(BitrateTier::High)
        } else if self.supports(Self::MID) {
            Some(BitrateTier::Mid)
        } else if self.supports(Self::LOW) {
            Some(BitrateTier::Low)
        } else {
            None
        }
    }

    /// Check if a tier is supported
    #[must_use]
    pub const fn supports_tier(&self, tier: BitrateTier) -> bool {
        match tier {
            BitrateTier::Low => self.supports(Self::LOW),
            BitrateTier::Mid => self.supports(Self::MID),
            BitrateTier::High => self.supports(Self::HIGH),
        }
    }
}

/// Parsed LDAC capability set
///
/// Holds one bitmask per capability field. A set is immutable once parsed;
/// negotiation builds new sets via `intersect` rather than mutating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct CapabilitySet {
    /// Supported sampling rates
    pub sampling_rates: SamplingRates,
    /// Supported channel modes
    pub channel_modes: ChannelModes,
    /// Supported bit depths
    pub bit_depths: BitDepths,
    /// Supported bitrate tiers
    pub bitrate_tiers: BitrateTiers,
}

impl CapabilitySet {
    /// Create a set with every capability supported
    #[must_use]
    pub const fn all() -> Self {
        Self {
            sampling_rates: SamplingRates::all(),
            channel_modes: ChannelModes::all(),
            bit_depths: BitDepths::all(),
            bitrate_tiers: BitrateTiers::all(),
        }
    }

    /// Parse a capability information element
    ///
    /// Trailing bytes beyond the fixed element are ignored.
    ///
    /// # Errors
    /// Returns `ParseError::Truncated` if the element is shorter than
    /// [`CAPS_IE_LEN`] bytes, `ParseError::Malformed` if the codec
    /// identifier does not match [`LDAC_CODEC_ID`] or any reserved bit
    /// is set.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < CAPS_IE_LEN {
            return Err(ParseError::Truncated);
        }
        if bytes[0] != LDAC_CODEC_ID {
            return Err(ParseError::Malformed);
        }
        if bytes[1] & SamplingRates::RESERVED != 0
            || bytes[2] & ChannelModes::RESERVED != 0
            || bytes[3] & BitDepths::RESERVED != 0
            || bytes[4] & BitrateTiers::RESERVED != 0
        {
            return Err(ParseError::Malformed);
        }

        Ok(Self {
            sampling_rates: SamplingRates(bytes[1]),
            channel_modes: ChannelModes(bytes[2]),
            bit_depths: BitDepths(bytes[3]),
            bitrate_tiers: BitrateTiers(bytes[4]),
        })
    }

    /// Encode the set as a capability information element
    ///
    /// # Errors
    /// Returns `ParseError::Truncated` if the buffer is too small.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, ParseError> {
        if buffer.len() < CAPS_IE_LEN {
            return Err(ParseError::Truncated);
        }

        buffer[0] = LDAC_CODEC_ID;
        buffer[1] = self.sampling_rates.0;
        buffer[2] = self.channel_modes.0;
        buffer[3] = self.bit_depths.0;
        buffer[4] = self.bitrate_tiers.0;

        Ok(CAPS_IE_LEN)
    }

    /// Capabilities supported by both sets, field by field
    #[must_use]
    pub const fn intersect(&self, other: &Self) -> Self {
        Self {
            sampling_rates: self.sampling_rates.intersect(&other.sampling_rates),
            channel_modes: self.channel_modes.intersect(&other.channel_modes),
            bit_depths: self.bit_depths.intersect(&other.bit_depths),
            bitrate_tiers: self.bitrate_tiers.intersect(&other.bitrate_tiers),
        }
    }
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::all()
    }
}
