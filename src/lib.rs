#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(dead_code, clippy::unused_async, clippy::too_many_lines)]

pub mod abr;
pub mod api;
pub mod caps;
pub mod constants;
mod endpoint;
pub mod negotiate;
pub mod processor;
pub mod session;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::{FnvIndexMap, Vec};

use crate::abr::{AbrOptions, LinkQualitySample, TierChange};
use crate::caps::{BitrateTier, CapabilitySet, ChannelMode, ParseError};
use crate::constants::{CHANNEL_DEPTH, MAX_CAPS_IE_LEN, MAX_SESSIONS};
use crate::negotiate::{NegotiationError, OperatingPoint};
use crate::session::{Session, SessionState};

pub use endpoint::EndpointId;

pub(crate) static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, CodecEvent, CHANNEL_DEPTH> =
    Channel::new();

pub(crate) static REQUEST_CHANNEL: Channel<CriticalSectionRawMutex, Request, CHANNEL_DEPTH> =
    Channel::new();

pub(crate) static RESPONSE_CHANNEL: Channel<CriticalSectionRawMutex, Response, CHANNEL_DEPTH> =
    Channel::new();

pub(crate) static NOTIFICATION_CHANNEL: Channel<
    CriticalSectionRawMutex,
    Notification,
    CHANNEL_DEPTH,
> = Channel::new();

/// Codec-core errors with detailed error information
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum CodecError {
    /// Remote capability element could not be parsed
    Parse(ParseError),
    /// No common operating point with the remote endpoint
    Negotiation(NegotiationError),
    /// No session exists for the endpoint
    SessionNotFound,
    /// Session table is full
    TooManySessions,
    /// Operation is not valid in the session's current state
    InvalidState,
    /// Invalid parameter provided (e.g., malformed endpoint id)
    InvalidParameter,
    /// Internal channel plumbing failed or returned an unexpected response
    TransportFailed,
}

impl From<ParseError> for CodecError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<NegotiationError> for CodecError {
    fn from(err: NegotiationError) -> Self {
        Self::Negotiation(err)
    }
}

/// Options for configuring a `CodecHost` instance
///
/// The preferred tier and the adaptive thresholds mirror the externally
/// configurable parameters of the codec core; everything else is fixed by
/// negotiation.
///
/// # Examples
///
/// ```rust
/// use ldackit::CodecHostOptions;
/// use ldackit::caps::{BitrateTier, CapabilitySet};
///
/// // Default: full local capabilities, start as high as the link allows
/// let defaults = CodecHostOptions::default();
/// assert_eq!(defaults.local_caps, CapabilitySet::all());
/// assert_eq!(defaults.preferred_tier, BitrateTier::High);
///
/// // Conservative startup at 660 kbps
/// let conservative = CodecHostOptions {
///     preferred_tier: BitrateTier::Mid,
///     ..CodecHostOptions::default()
/// };
/// assert_eq!(conservative.preferred_tier, BitrateTier::Mid);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CodecHostOptions {
    /// Capabilities advertised for the local device
    pub local_caps: CapabilitySet,
    /// Tier to start streaming at, clamped to the negotiated ceiling
    pub preferred_tier: BitrateTier,
    /// Adaptive bitrate thresholds and switches
    pub abr: AbrOptions,
}

impl Default for CodecHostOptions {
    fn default() -> Self {
        Self {
            local_caps: CapabilitySet::all(),
            preferred_tier: BitrateTier::High,
            abr: AbrOptions::default(),
        }
    }
}

/// Top-level codec context owning every session
///
/// Explicitly constructed and owned by the processor task; handlers get it
/// by mutable reference. Sessions are looked up by endpoint id and never
/// share state with each other.
#[derive(Debug)]
pub struct CodecHost {
    options: CodecHostOptions,
    sessions: FnvIndexMap<EndpointId, Session, MAX_SESSIONS>,
}

impl CodecHost {
    /// Create a new `CodecHost` with default options
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(CodecHostOptions::default())
    }

    /// Create a new `CodecHost` with custom options
    #[must_use]
    pub fn with_options(options: CodecHostOptions) -> Self {
        Self {
            options,
            sessions: FnvIndexMap::new(),
        }
    }

    /// Get a reference to the options
    #[must_use]
    pub fn options(&self) -> &CodecHostOptions {
        &self.options
    }

    /// Look up a session by endpoint id
    #[must_use]
    pub fn session(&self, endpoint: &EndpointId) -> Option<&Session> {
        self.sessions.get(endpoint)
    }

    /// Look up a session by endpoint id, mutably
    pub fn session_mut(&mut self, endpoint: &EndpointId) -> Option<&mut Session> {
        self.sessions.get_mut(endpoint)
    }

    /// Get the session for an endpoint, creating an idle one if absent
    ///
    /// # Errors
    /// Returns `CodecError::TooManySessions` if the session table is full.
    pub fn ensure_session(&mut self, endpoint: EndpointId) -> Result<&mut Session, CodecError> {
        if !self.sessions.contains_key(&endpoint) {
            self.sessions
                .insert(endpoint, Session::new(endpoint))
                .map_err(|_| CodecError::TooManySessions)?;
        }
        // Just inserted or already present
        self.sessions
            .get_mut(&endpoint)
            .ok_or(CodecError::SessionNotFound)
    }

    /// Remove a session, returning it if it existed
    pub fn remove_session(&mut self, endpoint: &EndpointId) -> Option<Session> {
        self.sessions.remove(endpoint)
    }

    /// Number of tracked sessions
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Check whether any session is actively streaming
    #[must_use]
    pub fn has_streaming_sessions(&self) -> bool {
        self.sessions
            .values()
            .any(|s| s.state() == SessionState::Streaming)
    }
}

impl Default for CodecHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport-facing events driving the codec core
///
/// Delivered in arrival order through a single queue, so events for one
/// session are always processed in the order the transport observed them.
#[derive(Debug, Clone)]
pub enum CodecEvent {
    /// Remote endpoint connected and advertised its capability element
    Connect {
        /// Remote endpoint id
        endpoint: EndpointId,
        /// Raw capability information element
        caps: Vec<u8, MAX_CAPS_IE_LEN>,
    },
    /// Transport confirmed the proposed configuration
    NegotiationSucceeded {
        /// Remote endpoint id
        endpoint: EndpointId,
        /// The configuration the remote accepted
        operating_point: OperatingPoint,
    },
    /// Transport reported the remote rejected the configuration
    NegotiationFailed {
        /// Remote endpoint id
        endpoint: EndpointId,
    },
    /// Periodic link-quality observation for a streaming session
    LinkQuality {
        /// Remote endpoint id
        endpoint: EndpointId,
        /// The observation
        sample: LinkQualitySample,
    },
    /// Remote endpoint is disconnecting
    Disconnect {
        /// Remote endpoint id
        endpoint: EndpointId,
    },
    /// In-flight data finished flushing after a disconnect
    DrainComplete {
        /// Remote endpoint id
        endpoint: EndpointId,
    },
    /// Unrecoverable transport failure for this endpoint
    FatalError {
        /// Remote endpoint id
        endpoint: EndpointId,
    },
}

/// Notifications emitted toward the transport layer
#[derive(Debug, Clone, Copy)]
pub enum Notification {
    /// A configuration was negotiated and should be applied at the link
    Configured {
        /// Remote endpoint id
        endpoint: EndpointId,
        /// Proposed operating point
        operating_point: OperatingPoint,
    },
    /// The active bitrate tier changed
    TierChanged {
        /// Remote endpoint id
        endpoint: EndpointId,
        /// The applied change
        change: TierChange,
    },
    /// A session finished draining and returned to idle
    Drained {
        /// Remote endpoint id
        endpoint: EndpointId,
    },
}

/// Snapshot of a streaming session's codec configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct CodecStatus {
    /// Active bitrate in bits per second
    pub bitrate_bps: u32,
    /// Sampling rate in Hz
    pub sampling_rate_hz: u32,
    /// Channel mode
    pub channel_mode: ChannelMode,
    /// Sample depth in bits
    pub bit_depth: u8,
    /// Whether automatic bitrate adaptation is enabled
    pub adaptive: bool,
    /// Whether link quality has been observed recently
    pub link_quality_known: bool,
    /// Mean buffer fill over the recent sample window
    pub average_buffer_fill_percent: Option<u8>,
}

/// API requests sent to the codec processing task
#[derive(Debug, Clone, Copy)]
pub(crate) enum Request {
    /// Force the bitrate tier of a streaming session
    SetBitrate {
        endpoint: EndpointId,
        tier: BitrateTier,
    },
    /// Snapshot the codec configuration of a streaming session
    GetStatus { endpoint: EndpointId, now_ms: u64 },
    /// Get the active operating point, if any
    GetOperatingPoint { endpoint: EndpointId },
    /// Get the session lifecycle state
    GetSessionState { endpoint: EndpointId },
    /// Recover a failed session
    Reset { endpoint: EndpointId },
}

/// API responses sent back from the codec processing task
#[derive(Debug, Clone, Copy)]
pub(crate) enum Response {
    /// Bitrate request applied; the change if the tier moved
    BitrateSet(Option<TierChange>),
    /// Codec status snapshot
    Status(CodecStatus),
    /// Active operating point, if streaming
    OperatingPoint(Option<OperatingPoint>),
    /// Session lifecycle state
    State(SessionState),
    /// Failed session recovered
    ResetDone,
    /// Error occurred
    Error(CodecError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(n: u8) -> EndpointId {
        EndpointId::new([n, 0x22, 0x33, 0x44, 0x55, 0x66])
    }

    #[test]
    fn test_codec_host_options_default() {
        let options = CodecHostOptions::default();
        assert_eq!(options.local_caps, CapabilitySet::all());
        assert_eq!(options.preferred_tier, BitrateTier::High);
        assert!(options.abr.adaptive);
    }

    #[test]
    fn test_codec_host_session_management() {
        let mut host = CodecHost::new();
        assert_eq!(host.session_count(), 0);
        assert!(host.session(&endpoint(1)).is_none());

        host.ensure_session(endpoint(1)).unwrap();
        assert_eq!(host.session_count(), 1);

        // Idempotent for an existing endpoint
        host.ensure_session(endpoint(1)).unwrap();
        assert_eq!(host.session_count(), 1);

        let removed = host.remove_session(&endpoint(1));
        assert!(removed.is_some());
        assert_eq!(host.session_count(), 0);
    }

    #[test]
    fn test_codec_host_session_capacity() {
        let mut host = CodecHost::new();
        for n in 0..MAX_SESSIONS {
            host.ensure_session(endpoint(u8::try_from(n).unwrap()))
                .unwrap();
        }
        assert_eq!(
            host.ensure_session(endpoint(0xFF)),
            Err(CodecError::TooManySessions)
        );
    }

    #[test]
    fn test_codec_host_streaming_query() {
        let mut host = CodecHost::new();
        host.ensure_session(endpoint(1)).unwrap();
        assert!(!host.has_streaming_sessions());

        let preferred = host.options().preferred_tier;
        let abr = host.options().abr;
        let session = host.session_mut(&endpoint(1)).unwrap();
        session.connect().unwrap();
        session
            .negotiation_succeeded(
                negotiate::OperatingPoint {
                    sampling_rate_hz: 48_000,
                    channel_mode: ChannelMode::Stereo,
                    bit_depth: 16,
                    tier: BitrateTier::Mid,
                },
                preferred,
                abr,
            )
            .unwrap();
        assert!(host.has_streaming_sessions());
    }

    #[test]
    fn test_error_conversions() {
        let parse: CodecError = ParseError::Truncated.into();
        assert_eq!(parse, CodecError::Parse(ParseError::Truncated));

        let negotiation: CodecError = NegotiationError::NoCommonCapability {
            field: negotiate::CapabilityField::BitrateTier,
        }
        .into();
        assert!(matches!(negotiation, CodecError::Negotiation(_)));
    }
}
