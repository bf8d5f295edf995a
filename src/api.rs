//! `Ldackit` API Functions
//!
//! This module provides the public control-plane functions for interacting
//! with the codec processing task. These functions use static channels to
//! communicate with the processor and can be called from any task once
//! [`crate::processor::run`] has been spawned.
//!
//! The functions are not coupled to any particular transport: the same
//! surface works whether link-quality samples come from an HCI controller,
//! a test harness, or a simulation.
//!
//! # Usage
//!
//! ```rust,no_run
//! use ldackit::{api, caps::BitrateTier, EndpointId};
//!
//! async fn example(endpoint: EndpointId, now_ms: u64) -> Result<(), ldackit::CodecError> {
//!     // Pin a streaming session to 330 kbps
//!     api::set_bitrate(endpoint, BitrateTier::Low).await?;
//!
//!     // Inspect the active configuration
//!     let status = api::codec_status(endpoint, now_ms).await?;
//!     let _ = status.bitrate_bps;
//!     Ok(())
//! }
//! ```

use crate::abr::TierChange;
use crate::caps::BitrateTier;
use crate::negotiate::OperatingPoint;
use crate::session::SessionState;
use crate::{
    CodecError, CodecStatus, EndpointId, REQUEST_CHANNEL, RESPONSE_CHANNEL, Request, Response,
};

/// Force the bitrate tier of a streaming session.
///
/// The tier is clamped to the negotiated ceiling. Returns the applied
/// change, or `None` if the session was already at the requested tier.
///
/// # Errors
///
/// Returns an error if no session exists for the endpoint, the session is
/// not streaming, or the response is unexpected.
pub async fn set_bitrate(
    endpoint: EndpointId,
    tier: BitrateTier,
) -> Result<Option<TierChange>, CodecError> {
    REQUEST_CHANNEL
        .sender()
        .send(Request::SetBitrate { endpoint, tier })
        .await;
    match RESPONSE_CHANNEL.receiver().receive().await {
        Response::BitrateSet(change) => Ok(change),
        Response::Error(e) => Err(e),
        _ => Err(CodecError::TransportFailed),
    }
}

/// Get the codec status snapshot of a streaming session.
///
/// `now_ms` is the caller's clock, used to judge whether link quality has
/// been observed within the configured timeout.
///
/// # Errors
///
/// Returns an error if no session exists for the endpoint, the session is
/// not streaming, or the response is unexpected.
pub async fn codec_status(endpoint: EndpointId, now_ms: u64) -> Result<CodecStatus, CodecError> {
    REQUEST_CHANNEL
        .sender()
        .send(Request::GetStatus { endpoint, now_ms })
        .await;
    match RESPONSE_CHANNEL.receiver().receive().await {
        Response::Status(status) => Ok(status),
        Response::Error(e) => Err(e),
        _ => Err(CodecError::TransportFailed),
    }
}

/// Get the active operating point of a session, if it is streaming.
///
/// # Errors
///
/// Returns an error if no session exists for the endpoint or the response
/// is unexpected.
pub async fn operating_point(endpoint: EndpointId) -> Result<Option<OperatingPoint>, CodecError> {
    REQUEST_CHANNEL
        .sender()
        .send(Request::GetOperatingPoint { endpoint })
        .await;
    match RESPONSE_CHANNEL.receiver().receive().await {
        Response::OperatingPoint(point) => Ok(point),
        Response::Error(e) => Err(e),
        _ => Err(CodecError::TransportFailed),
    }
}

/// Get the lifecycle state of a session.
///
/// # Errors
///
/// Returns an error if no session exists for the endpoint or the response
/// is unexpected.
pub async fn session_state(endpoint: EndpointId) -> Result<SessionState, CodecError> {
    REQUEST_CHANNEL
        .sender()
        .send(Request::GetSessionState { endpoint })
        .await;
    match RESPONSE_CHANNEL.receiver().receive().await {
        Response::State(state) => Ok(state),
        Response::Error(e) => Err(e),
        _ => Err(CodecError::TransportFailed),
    }
}

/// Recover a failed session, returning its endpoint to idle.
///
/// # Errors
///
/// Returns an error if no session exists for the endpoint, the session has
/// not failed, or the response is unexpected.
pub async fn reset(endpoint: EndpointId) -> Result<(), CodecError> {
    REQUEST_CHANNEL
        .sender()
        .send(Request::Reset { endpoint })
        .await;
    match RESPONSE_CHANNEL.receiver().receive().await {
        Response::ResetDone => Ok(()),
        Response::Error(e) => Err(e),
        _ => Err(CodecError::TransportFailed),
    }
}
