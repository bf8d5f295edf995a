//! Codec Processor Task - event dispatch and control-plane handling
//!
//! This module contains the single task that owns the [`CodecHost`] and
//! processes transport events and API requests in arrival order. Transport
//! code feeds events with [`submit_event`] and consumes the resulting
//! notifications with [`next_notification`]; application code talks to the
//! task through the functions in the [`crate::api`] module.
//!
//! # Usage
//!
//! Spawn the processor as an Embassy task:
//!
//! ```rust,ignore
//! #[embassy_executor::task]
//! async fn codec_task() {
//!     ldackit::processor::run(CodecHostOptions::default()).await;
//! }
//! ```
//!
//! # Architecture
//!
//! * **Event dispatch**: [`dispatch_event`] maps each transport event to
//!   its handler and returns the notification to forward, if any
//! * **Request handling**: [`handle_request`] serves the control-plane
//!   surface (set bitrate, status, state, reset)
//! * **Run loop**: [`run`] owns the `CodecHost` and selects over the two
//!   inbound channels; both paths are synchronous once an item arrives
//!
//! Processing is strictly sequential, so per-session event order is the
//! order the transport submitted them. Sessions fail independently: an
//! error for one endpoint never disturbs the others.

use embassy_futures::select::{Either, select};

use crate::abr::{LinkQualitySample, TierChange, TierChangeReason};
use crate::caps::CapabilitySet;
use crate::negotiate::{OperatingPoint, negotiate};
use crate::{
    CodecError, CodecEvent, CodecHost, CodecHostOptions, CodecStatus, EVENT_CHANNEL, EndpointId,
    NOTIFICATION_CHANNEL, Notification, REQUEST_CHANNEL, RESPONSE_CHANNEL, Request, Response,
};

/// Submit a transport event to the codec processor
pub async fn submit_event(event: CodecEvent) {
    EVENT_CHANNEL.sender().send(event).await;
}

/// Receive the next notification for the transport layer
pub async fn next_notification() -> Notification {
    NOTIFICATION_CHANNEL.receiver().receive().await
}

/// Run the codec processor with the given options
///
/// Constructs the [`CodecHost`] owned by this task and never returns.
pub async fn run(options: CodecHostOptions) -> ! {
    let mut host = CodecHost::with_options(options);

    loop {
        match select(
            EVENT_CHANNEL.receiver().receive(),
            REQUEST_CHANNEL.receiver().receive(),
        )
        .await
        {
            Either::First(event) => match dispatch_event(&mut host, event) {
                Ok(Some(notification)) => {
                    NOTIFICATION_CHANNEL.sender().send(notification).await;
                }
                Ok(None) => {}
                Err(e) => {
                    defmt::warn!("[CODEC] Event handling failed: {}", e);
                }
            },
            Either::Second(request) => {
                let (response, notification) = handle_request(&mut host, request);
                if let Some(notification) = notification {
                    NOTIFICATION_CHANNEL.sender().send(notification).await;
                }
                RESPONSE_CHANNEL.sender().send(response).await;
            }
        }
    }
}

/// Dispatch a transport event to its handler
///
/// The single entry point mapping each event to the operation it carries.
/// Returns the notification to forward to the transport, if the event
/// produced one.
///
/// # Errors
/// Returns the handler's error; the affected session has already been moved
/// to its failure state where the state machine requires it.
pub fn dispatch_event(
    host: &mut CodecHost,
    event: CodecEvent,
) -> Result<Option<Notification>, CodecError> {
    match event {
        CodecEvent::Connect { endpoint, caps } => handle_connect(host, endpoint, &caps),
        CodecEvent::NegotiationSucceeded {
            endpoint,
            operating_point,
        } => handle_negotiation_succeeded(host, endpoint, operating_point),
        CodecEvent::NegotiationFailed { endpoint } => handle_negotiation_failed(host, endpoint),
        CodecEvent::LinkQuality { endpoint, sample } => {
            handle_link_quality(host, endpoint, sample)
        }
        CodecEvent::Disconnect { endpoint } => handle_disconnect(host, endpoint),
        CodecEvent::DrainComplete { endpoint } => handle_drain_complete(host, endpoint),
        CodecEvent::FatalError { endpoint } => handle_fatal_error(host, endpoint),
    }
}

/// Serve a control-plane request
///
/// Returns the response for the caller plus a notification for the
/// transport when the request changed the link configuration.
pub(crate) fn handle_request(
    host: &mut CodecHost,
    request: Request,
) -> (Response, Option<Notification>) {
    match request {
        Request::SetBitrate { endpoint, tier } => {
            let Some(session) = host.session_mut(&endpoint) else {
                return (Response::Error(CodecError::SessionNotFound), None);
            };
            match session.set_tier(tier) {
                Ok(change) => {
                    if let Some(change) = change {
                        defmt::info!("[CODEC] Bitrate set for {}: {}", endpoint, change);
                    }
                    let notification =
                        change.map(|change| Notification::TierChanged { endpoint, change });
                    (Response::BitrateSet(change), notification)
                }
                Err(e) => (Response::Error(e), None),
            }
        }
        Request::GetStatus { endpoint, now_ms } => {
            let adaptive = host.options().abr.adaptive;
            let Some(session) = host.session(&endpoint) else {
                return (Response::Error(CodecError::SessionNotFound), None);
            };
            let Some(point) = session.operating_point() else {
                return (Response::Error(CodecError::InvalidState), None);
            };
            let status = CodecStatus {
                bitrate_bps: point.bitrate_bps(),
                sampling_rate_hz: point.sampling_rate_hz,
                channel_mode: point.channel_mode,
                bit_depth: point.bit_depth,
                adaptive,
                link_quality_known: session.link_quality_known(now_ms),
                average_buffer_fill_percent: session.average_buffer_fill(),
            };
            (Response::Status(status), None)
        }
        Request::GetOperatingPoint { endpoint } => match host.session(&endpoint) {
            Some(session) => (Response::OperatingPoint(session.operating_point()), None),
            None => (Response::Error(CodecError::SessionNotFound), None),
        },
        Request::GetSessionState { endpoint } => match host.session(&endpoint) {
            Some(session) => (Response::State(session.state()), None),
            None => (Response::Error(CodecError::SessionNotFound), None),
        },
        Request::Reset { endpoint } => {
            let Some(session) = host.session_mut(&endpoint) else {
                return (Response::Error(CodecError::SessionNotFound), None);
            };
            match session.reset() {
                Ok(()) => {
                    host.remove_session(&endpoint);
                    defmt::info!("[CODEC] Session {} reset", endpoint);
                    (Response::ResetDone, None)
                }
                Err(e) => (Response::Error(e), None),
            }
        }
    }
}

/// Parse the remote capabilities and propose an operating point
fn handle_connect(
    host: &mut CodecHost,
    endpoint: EndpointId,
    caps: &[u8],
) -> Result<Option<Notification>, CodecError> {
    let local_caps = host.options().local_caps;
    let session = host.ensure_session(endpoint)?;
    session.connect()?;

    let remote_caps = match CapabilitySet::parse(caps) {
        Ok(parsed) => parsed,
        Err(e) => {
            defmt::warn!(
                "[CODEC] Capability element from {} rejected: {}",
                endpoint,
                e
            );
            session.negotiation_failed()?;
            return Err(e.into());
        }
    };

    match negotiate(&local_caps, &remote_caps) {
        Ok(point) => {
            defmt::info!("[CODEC] Proposing {} to {}", point, endpoint);
            Ok(Some(Notification::Configured {
                endpoint,
                operating_point: point,
            }))
        }
        Err(e) => {
            defmt::warn!("[CODEC] Negotiation with {} failed: {}", endpoint, e);
            session.negotiation_failed()?;
            Err(e.into())
        }
    }
}

/// Start streaming with the configuration the remote accepted
fn handle_negotiation_succeeded(
    host: &mut CodecHost,
    endpoint: EndpointId,
    point: OperatingPoint,
) -> Result<Option<Notification>, CodecError> {
    let local_caps = host.options().local_caps;
    let preferred = host.options().preferred_tier;
    let abr_options = host.options().abr;

    let session = host
        .session_mut(&endpoint)
        .ok_or(CodecError::SessionNotFound)?;

    // The transport echoes the accepted configuration; it must still be
    // something we actually advertised
    if !point.is_supported_by(&local_caps) {
        defmt::warn!(
            "[CODEC] Accepted configuration {} for {} is outside local capabilities",
            point,
            endpoint
        );
        session.negotiation_failed()?;
        return Err(CodecError::InvalidParameter);
    }

    let active = session.negotiation_succeeded(point, preferred, abr_options)?;
    defmt::info!("[CODEC] Streaming to {} at {}", endpoint, active);

    if active.tier == point.tier {
        Ok(None)
    } else {
        // Streaming starts below the ceiling; tell the transport
        Ok(Some(Notification::TierChanged {
            endpoint,
            change: TierChange {
                from: point.tier,
                to: active.tier,
                reason: TierChangeReason::Initial,
            },
        }))
    }
}

fn handle_negotiation_failed(
    host: &mut CodecHost,
    endpoint: EndpointId,
) -> Result<Option<Notification>, CodecError> {
    let session = host
        .session_mut(&endpoint)
        .ok_or(CodecError::SessionNotFound)?;
    session.negotiation_failed()?;
    defmt::warn!("[CODEC] Remote {} rejected the configuration", endpoint);
    Ok(None)
}

/// Feed a link-quality sample to the session's bitrate controller
fn handle_link_quality(
    host: &mut CodecHost,
    endpoint: EndpointId,
    sample: LinkQualitySample,
) -> Result<Option<Notification>, CodecError> {
    let session = host
        .session_mut(&endpoint)
        .ok_or(CodecError::SessionNotFound)?;

    match session.link_quality(sample)? {
        Some(change) => {
            defmt::info!("[CODEC] Tier change for {}: {}", endpoint, change);
            Ok(Some(Notification::TierChanged { endpoint, change }))
        }
        None => Ok(None),
    }
}

fn handle_disconnect(
    host: &mut CodecHost,
    endpoint: EndpointId,
) -> Result<Option<Notification>, CodecError> {
    let session = host
        .session_mut(&endpoint)
        .ok_or(CodecError::SessionNotFound)?;
    session.disconnect()?;
    defmt::debug!("[CODEC] Session {} draining", endpoint);
    Ok(None)
}

fn handle_drain_complete(
    host: &mut CodecHost,
    endpoint: EndpointId,
) -> Result<Option<Notification>, CodecError> {
    let session = host
        .session_mut(&endpoint)
        .ok_or(CodecError::SessionNotFound)?;
    session.drain_complete()?;
    host.remove_session(&endpoint);
    defmt::debug!("[CODEC] Session {} drained", endpoint);
    Ok(Some(Notification::Drained { endpoint }))
}

fn handle_fatal_error(
    host: &mut CodecHost,
    endpoint: EndpointId,
) -> Result<Option<Notification>, CodecError> {
    let session = host
        .session_mut(&endpoint)
        .ok_or(CodecError::SessionNotFound)?;
    session.fatal_transport_error();
    defmt::error!("[CODEC] Fatal transport error on {}", endpoint);
    Ok(None)
}
