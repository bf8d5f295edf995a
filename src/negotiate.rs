//! Operating Point Negotiation
//!
//! Negotiation intersects the local and remote capability sets field by
//! field and selects the highest-quality configuration both sides support:
//! highest sampling rate, stereo over dual over mono, deepest bit depth,
//! highest bitrate tier. The selection is deterministic so that two runs
//! over the same capability sets always produce the same operating point.

use crate::caps::{BitrateTier, CapabilitySet, ChannelMode};

/// Capability fields, in the order they appear in the capability element
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum CapabilityField {
    /// Sampling rate field
    SamplingRate,
    /// Channel mode field
    ChannelMode,
    /// Bit depth field
    BitDepth,
    /// Bitrate tier field
    BitrateTier,
}

/// Negotiation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum NegotiationError {
    /// Local and remote share no value for the named field
    NoCommonCapability {
        /// First field with an empty intersection, in element order
        field: CapabilityField,
    },
}

/// The negotiated configuration for an active session
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct OperatingPoint {
    /// Sampling rate in Hz
    pub sampling_rate_hz: u32,
    /// Channel mode
    pub channel_mode: ChannelMode,
    /// Sample depth in bits
    pub bit_depth: u8,
    /// Bitrate tier
    pub tier: BitrateTier,
}

impl OperatingPoint {
    /// Bitrate of the active tier in bits per second
    #[must_use]
    pub const fn bitrate_bps(&self) -> u32 {
        self.tier.bps()
    }

    /// Check that every field of this point is supported by the given set
    #[must_use]
    pub const fn is_supported_by(&self, caps: &CapabilitySet) -> bool {
        caps.sampling_rates.supports_hz(self.sampling_rate_hz)
            && caps.channel_modes.supports_mode(self.channel_mode)
            && caps.bit_depths.supports_bits(self.bit_depth)
            && caps.bitrate_tiers.supports_tier(self.tier)
    }
}

/// Negotiate an operating point between local and remote capabilities
///
/// Each field is intersected independently; the first field with an empty
/// intersection (in capability element order) fails the negotiation. The
/// result's tier is the highest common tier and acts as the ceiling for
/// runtime bitrate adaptation.
///
/// # Errors
/// Returns `NegotiationError::NoCommonCapability` naming the failing field.
pub fn negotiate(
    local: &CapabilitySet,
    remote: &CapabilitySet,
) -> Result<OperatingPoint, NegotiationError> {
    let common = local.intersect(remote);

    let sampling_rate_hz =
        common
            .sampling_rates
            .highest_hz()
            .ok_or(NegotiationError::NoCommonCapability {
                field: CapabilityField::SamplingRate,
            })?;
    let channel_mode = common
        .channel_modes
        .best()
        .ok_or(NegotiationError::NoCommonCapability {
            field: CapabilityField::ChannelMode,
        })?;
    let bit_depth = common
        .bit_depths
        .deepest()
        .ok_or(NegotiationError::NoCommonCapability {
            field: CapabilityField::BitDepth,
        })?;
    let tier = common
        .bitrate_tiers
        .highest()
        .ok_or(NegotiationError::NoCommonCapability {
            field: CapabilityField::BitrateTier,
        })?;

    Ok(OperatingPoint {
        sampling_rate_hz,
        channel_mode,
        bit_depth,
        tier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::{BitDepths, BitrateTiers, ChannelModes, SamplingRates};

    fn caps(rates: u8, modes: u8, depths: u8, tiers: u8) -> CapabilitySet {
        CapabilitySet {
            sampling_rates: SamplingRates(rates),
            channel_modes: ChannelModes(modes),
            bit_depths: BitDepths(depths),
            bitrate_tiers: BitrateTiers(tiers),
        }
    }

    #[test]
    fn test_negotiate_prefers_highest_quality() {
        let point = negotiate(&CapabilitySet::all(), &CapabilitySet::all()).unwrap();
        assert_eq!(point.sampling_rate_hz, 96_000);
        assert_eq!(point.channel_mode, ChannelMode::Stereo);
        assert_eq!(point.bit_depth, 24);
        assert_eq!(point.tier, BitrateTier::High);
        assert_eq!(point.bitrate_bps(), 990_000);
    }

    #[test]
    fn test_negotiate_standard_sink() {
        // Local: {48000,44100} x {stereo} x {16} x {High,Mid}
        // Remote: {44100} x {stereo,mono} x {16} x {Mid,Low}
        let local = caps(
            SamplingRates::HZ_48000 | SamplingRates::HZ_44100,
            ChannelModes::STEREO,
            BitDepths::BITS_16,
            BitrateTiers::HIGH | BitrateTiers::MID,
        );
        let remote = caps(
            SamplingRates::HZ_44100,
            ChannelModes::STEREO | ChannelModes::MONO,
            BitDepths::BITS_16,
            BitrateTiers::MID | BitrateTiers::LOW,
        );

        let point = negotiate(&local, &remote).unwrap();
        assert_eq!(point.sampling_rate_hz, 44_100);
        assert_eq!(point.channel_mode, ChannelMode::Stereo);
        assert_eq!(point.bit_depth, 16);
        assert_eq!(point.tier, BitrateTier::Mid);
    }

    #[test]
    fn test_negotiate_result_supported_by_both() {
        let sets = [
            CapabilitySet::all(),
            caps(
                SamplingRates::HZ_44100 | SamplingRates::HZ_96000,
                ChannelModes::MONO | ChannelModes::STEREO,
                BitDepths::BITS_24,
                BitrateTiers::LOW | BitrateTiers::HIGH,
            ),
            caps(
                SamplingRates::HZ_48000 | SamplingRates::HZ_96000,
                ChannelModes::MONO | ChannelModes::DUAL,
                BitDepths::BITS_16 | BitDepths::BITS_24,
                BitrateTiers::MID | BitrateTiers::HIGH,
            ),
        ];

        for a in &sets {
            for b in &sets {
                if let Ok(point) = negotiate(a, b) {
                    assert!(point.is_supported_by(a));
                    assert!(point.is_supported_by(b));
                }
            }
        }
    }

    #[test]
    fn test_negotiate_deterministic_and_symmetric() {
        let a = caps(
            SamplingRates::HZ_44100 | SamplingRates::HZ_88200,
            ChannelModes::DUAL | ChannelModes::STEREO,
            BitDepths::BITS_16 | BitDepths::BITS_24,
            BitrateTiers::LOW | BitrateTiers::MID,
        );
        let b = caps(
            SamplingRates::HZ_88200 | SamplingRates::HZ_96000,
            ChannelModes::MONO | ChannelModes::STEREO,
            BitDepths::BITS_24,
            BitrateTiers::MID | BitrateTiers::HIGH,
        );

        let first = negotiate(&a, &b).unwrap();
        let second = negotiate(&a, &b).unwrap();
        assert_eq!(first, second);

        let swapped = negotiate(&b, &a).unwrap();
        assert_eq!(first, swapped);
    }

    #[test]
    fn test_negotiate_no_common_capability_per_field() {
        let full = CapabilitySet::all();

        let no_rate = caps(0, ChannelModes::STEREO, BitDepths::BITS_16, BitrateTiers::MID);
        assert_eq!(
            negotiate(&full, &no_rate),
            Err(NegotiationError::NoCommonCapability {
                field: CapabilityField::SamplingRate
            })
        );

        let no_mode = caps(SamplingRates::HZ_48000, 0, BitDepths::BITS_16, BitrateTiers::MID);
        assert_eq!(
            negotiate(&full, &no_mode),
            Err(NegotiationError::NoCommonCapability {
                field: CapabilityField::ChannelMode
            })
        );

        let no_depth = caps(SamplingRates::HZ_48000, ChannelModes::STEREO, 0, BitrateTiers::MID);
        assert_eq!(
            negotiate(&full, &no_depth),
            Err(NegotiationError::NoCommonCapability {
                field: CapabilityField::BitDepth
            })
        );

        let no_tier = caps(SamplingRates::HZ_48000, ChannelModes::STEREO, BitDepths::BITS_16, 0);
        assert_eq!(
            negotiate(&full, &no_tier),
            Err(NegotiationError::NoCommonCapability {
                field: CapabilityField::BitrateTier
            })
        );
    }

    #[test]
    fn test_negotiate_disjoint_rates() {
        let a = caps(
            SamplingRates::HZ_44100,
            ChannelModes::STEREO,
            BitDepths::BITS_16,
            BitrateTiers::MID,
        );
        let b = caps(
            SamplingRates::HZ_96000,
            ChannelModes::STEREO,
            BitDepths::BITS_16,
            BitrateTiers::MID,
        );
        assert_eq!(
            negotiate(&a, &b),
            Err(NegotiationError::NoCommonCapability {
                field: CapabilityField::SamplingRate
            })
        );
    }
}
