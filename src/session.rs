//! Codec Session State Machine
//!
//! One `Session` tracks the negotiation and streaming lifecycle of a single
//! remote endpoint and gates which operations are valid in which state:
//!
//! ```text
//! Idle -> Negotiating -> Streaming -> Draining -> Idle
//!              |              |
//!              +--> Failed <--+   (and from any state on fatal error)
//! ```
//!
//! `Failed` is terminal until an explicit `reset()`. Operations invalid for
//! the current state fail with `CodecError::InvalidState` and leave the
//! session untouched. Sessions never share state, so a failure here can
//! not affect any other endpoint.

use crate::CodecError;
use crate::abr::{AbrController, AbrOptions, LinkQualitySample, TierChange};
use crate::caps::BitrateTier;
use crate::endpoint::EndpointId;
use crate::negotiate::OperatingPoint;

/// Lifecycle states of a codec session
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SessionState {
    /// No connection activity
    Idle,
    /// Capabilities exchanged, waiting for the negotiation outcome
    Negotiating,
    /// Audio is streaming and the bitrate controller is active
    Streaming,
    /// Disconnecting, in-flight data still flushing
    Draining,
    /// Unrecoverable error, waiting for an explicit reset
    Failed,
}

/// Per-endpoint codec session
#[derive(Debug)]
pub struct Session {
    endpoint: EndpointId,
    state: SessionState,
    operating_point: Option<OperatingPoint>,
    abr: Option<AbrController>,
}

impl Session {
    /// Create an idle session for an endpoint
    #[must_use]
    pub const fn new(endpoint: EndpointId) -> Self {
        Self {
            endpoint,
            state: SessionState::Idle,
            operating_point: None,
            abr: None,
        }
    }

    /// Endpoint this session belongs to
    #[must_use]
    pub const fn endpoint(&self) -> EndpointId {
        self.endpoint
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The active operating point, reflecting the current bitrate tier
    ///
    /// `Some` only while streaming or draining.
    #[must_use]
    pub fn operating_point(&self) -> Option<OperatingPoint> {
        let point = self.operating_point?;
        match &self.abr {
            Some(abr) => Some(OperatingPoint {
                tier: abr.tier(),
                ..point
            }),
            None => Some(point),
        }
    }

    /// Whether link quality is currently known for this session
    #[must_use]
    pub fn link_quality_known(&self, now_ms: u64) -> bool {
        self.abr
            .as_ref()
            .is_some_and(|abr| abr.link_quality_known(now_ms))
    }

    /// Mean buffer fill over the recent sample window
    #[must_use]
    pub fn average_buffer_fill(&self) -> Option<u8> {
        self.abr.as_ref().and_then(AbrController::average_buffer_fill)
    }

    /// Begin negotiating with the remote endpoint
    ///
    /// # Errors
    /// Returns `CodecError::InvalidState` unless the session is `Idle`.
    pub fn connect(&mut self) -> Result<(), CodecError> {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Negotiating;
                Ok(())
            }
            _ => Err(CodecError::InvalidState),
        }
    }

    /// Apply a confirmed negotiation outcome and start streaming
    ///
    /// Seeds the bitrate controller with the negotiated tier as ceiling and
    /// the configured preference as the starting point. Returns the active
    /// operating point.
    ///
    /// # Errors
    /// Returns `CodecError::InvalidState` unless the session is
    /// `Negotiating`.
    pub fn negotiation_succeeded(
        &mut self,
        point: OperatingPoint,
        preferred: BitrateTier,
        abr_options: AbrOptions,
    ) -> Result<OperatingPoint, CodecError> {
        match self.state {
            SessionState::Negotiating => {
                let abr = AbrController::new(abr_options, preferred, point.tier);
                let active = OperatingPoint {
                    tier: abr.tier(),
                    ..point
                };
                self.operating_point = Some(point);
                self.abr = Some(abr);
                self.state = SessionState::Streaming;
                Ok(active)
            }
            _ => Err(CodecError::InvalidState),
        }
    }

    /// Record a failed negotiation
    ///
    /// # Errors
    /// Returns `CodecError::InvalidState` unless the session is
    /// `Negotiating`.
    pub fn negotiation_failed(&mut self) -> Result<(), CodecError> {
        match self.state {
            SessionState::Negotiating => {
                self.state = SessionState::Failed;
                Ok(())
            }
            _ => Err(CodecError::InvalidState),
        }
    }

    /// Feed a link-quality sample to the bitrate controller
    ///
    /// The session state does not change; the controller may decide a tier
    /// change, which the caller forwards to the transport.
    ///
    /// # Errors
    /// Returns `CodecError::InvalidState` unless the session is `Streaming`.
    pub fn link_quality(
        &mut self,
        sample: LinkQualitySample,
    ) -> Result<Option<TierChange>, CodecError> {
        match (self.state, &mut self.abr) {
            (SessionState::Streaming, Some(abr)) => Ok(abr.on_sample(sample)),
            _ => Err(CodecError::InvalidState),
        }
    }

    /// Force the active bitrate tier
    ///
    /// # Errors
    /// Returns `CodecError::InvalidState` unless the session is `Streaming`.
    pub fn set_tier(&mut self, tier: BitrateTier) -> Result<Option<TierChange>, CodecError> {
        match (self.state, &mut self.abr) {
            (SessionState::Streaming, Some(abr)) => Ok(abr.set_tier(tier)),
            _ => Err(CodecError::InvalidState),
        }
    }

    /// Start disconnecting
    ///
    /// Valid while negotiating or streaming; pending negotiation outcomes
    /// and tier decisions are discarded.
    ///
    /// # Errors
    /// Returns `CodecError::InvalidState` in any other state.
    pub fn disconnect(&mut self) -> Result<(), CodecError> {
        match self.state {
            SessionState::Negotiating | SessionState::Streaming => {
                self.state = SessionState::Draining;
                Ok(())
            }
            _ => Err(CodecError::InvalidState),
        }
    }

    /// Complete a drain, returning the session to idle
    ///
    /// # Errors
    /// Returns `CodecError::InvalidState` unless the session is `Draining`.
    pub fn drain_complete(&mut self) -> Result<(), CodecError> {
        match self.state {
            SessionState::Draining => {
                self.operating_point = None;
                self.abr = None;
                self.state = SessionState::Idle;
                Ok(())
            }
            _ => Err(CodecError::InvalidState),
        }
    }

    /// Record a fatal transport error, valid in every state
    pub fn fatal_transport_error(&mut self) {
        self.operating_point = None;
        self.abr = None;
        self.state = SessionState::Failed;
    }

    /// Explicitly recover a failed session back to idle
    ///
    /// # Errors
    /// Returns `CodecError::InvalidState` unless the session is `Failed`.
    pub fn reset(&mut self) -> Result<(), CodecError> {
        match self.state {
            SessionState::Failed => {
                self.operating_point = None;
                self.abr = None;
                self.state = SessionState::Idle;
                Ok(())
            }
            _ => Err(CodecError::InvalidState),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::ChannelMode;

    fn endpoint() -> EndpointId {
        EndpointId::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66])
    }

    fn point(tier: BitrateTier) -> OperatingPoint {
        OperatingPoint {
            sampling_rate_hz: 48_000,
            channel_mode: ChannelMode::Stereo,
            bit_depth: 24,
            tier,
        }
    }

    fn sample(timestamp_ms: u64, buffer_fill_percent: u8, retransmit_count: u8) -> LinkQualitySample {
        LinkQualitySample {
            buffer_fill_percent,
            retransmit_count,
            timestamp_ms,
        }
    }

    #[test]
    fn test_full_lifecycle() {
        let mut session = Session::new(endpoint());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.operating_point(), None);

        session.connect().unwrap();
        assert_eq!(session.state(), SessionState::Negotiating);
        assert_eq!(session.operating_point(), None);

        let active = session
            .negotiation_succeeded(point(BitrateTier::High), BitrateTier::High, AbrOptions::default())
            .unwrap();
        assert_eq!(session.state(), SessionState::Streaming);
        assert_eq!(session.operating_point(), Some(active));

        session.disconnect().unwrap();
        assert_eq!(session.state(), SessionState::Draining);
        assert!(session.operating_point().is_some());

        session.drain_complete().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.operating_point(), None);
    }

    #[test]
    fn test_disconnect_during_negotiation_emits_no_operating_point() {
        let mut session = Session::new(endpoint());
        session.connect().unwrap();
        session.disconnect().unwrap();
        assert_eq!(session.state(), SessionState::Draining);
        assert_eq!(session.operating_point(), None);

        // A late negotiation outcome is discarded
        assert_eq!(
            session.negotiation_succeeded(
                point(BitrateTier::High),
                BitrateTier::High,
                AbrOptions::default()
            ),
            Err(CodecError::InvalidState)
        );

        session.drain_complete().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.operating_point(), None);
    }

    #[test]
    fn test_negotiation_failure_requires_reset() {
        let mut session = Session::new(endpoint());
        session.connect().unwrap();
        session.negotiation_failed().unwrap();
        assert_eq!(session.state(), SessionState::Failed);

        // No implicit recovery
        assert_eq!(session.connect(), Err(CodecError::InvalidState));
        assert_eq!(session.disconnect(), Err(CodecError::InvalidState));

        session.reset().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        session.connect().unwrap();
    }

    #[test]
    fn test_fatal_error_from_any_state() {
        let mut session = Session::new(endpoint());
        session.fatal_transport_error();
        assert_eq!(session.state(), SessionState::Failed);
        session.reset().unwrap();

        session.connect().unwrap();
        session
            .negotiation_succeeded(point(BitrateTier::Mid), BitrateTier::Mid, AbrOptions::default())
            .unwrap();
        session.fatal_transport_error();
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.operating_point(), None);
    }

    #[test]
    fn test_reset_only_valid_in_failed() {
        let mut session = Session::new(endpoint());
        assert_eq!(session.reset(), Err(CodecError::InvalidState));
        session.connect().unwrap();
        assert_eq!(session.reset(), Err(CodecError::InvalidState));
    }

    #[test]
    fn test_link_quality_only_while_streaming() {
        let mut session = Session::new(endpoint());
        assert_eq!(
            session.link_quality(sample(0, 50, 0)),
            Err(CodecError::InvalidState)
        );

        session.connect().unwrap();
        session
            .negotiation_succeeded(point(BitrateTier::High), BitrateTier::High, AbrOptions::default())
            .unwrap();
        assert_eq!(session.link_quality(sample(0, 50, 0)), Ok(None));

        session.disconnect().unwrap();
        assert_eq!(
            session.link_quality(sample(100, 50, 0)),
            Err(CodecError::InvalidState)
        );
    }

    #[test]
    fn test_operating_point_tracks_tier_changes() {
        let mut session = Session::new(endpoint());
        session.connect().unwrap();
        session
            .negotiation_succeeded(point(BitrateTier::High), BitrateTier::High, AbrOptions::default())
            .unwrap();

        // Three degraded samples drop one tier
        for i in 0..3 {
            session.link_quality(sample(i * 100, 5, 5)).unwrap();
        }
        let active = session.operating_point().unwrap();
        assert_eq!(active.tier, BitrateTier::Mid);
        // Non-tier fields are untouched
        assert_eq!(active.sampling_rate_hz, 48_000);
        assert_eq!(active.bit_depth, 24);
    }

    #[test]
    fn test_preferred_tier_seeds_controller() {
        let mut session = Session::new(endpoint());
        session.connect().unwrap();
        let active = session
            .negotiation_succeeded(point(BitrateTier::High), BitrateTier::Mid, AbrOptions::default())
            .unwrap();
        assert_eq!(active.tier, BitrateTier::Mid);
        assert_eq!(session.operating_point().unwrap().tier, BitrateTier::Mid);
    }

    #[test]
    fn test_set_tier_gated_by_state() {
        let mut session = Session::new(endpoint());
        assert_eq!(
            session.set_tier(BitrateTier::Low),
            Err(CodecError::InvalidState)
        );

        session.connect().unwrap();
        session
            .negotiation_succeeded(point(BitrateTier::High), BitrateTier::High, AbrOptions::default())
            .unwrap();
        let change = session.set_tier(BitrateTier::Low).unwrap().unwrap();
        assert_eq!(change.to, BitrateTier::Low);
        assert_eq!(session.operating_point().unwrap().tier, BitrateTier::Low);
    }
}
