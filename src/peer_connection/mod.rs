#[cfg(test)]
mod peer_connection_test;

pub mod configuration;
mod event_handlers;
mod observer;
pub mod offer_answer_options;
pub mod operation;
pub(crate) mod peer_connection_internal;
pub mod peer_connection_state;
pub mod policy;
pub mod sdp;
pub mod signaling_state;

use std::any::Any;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use configuration::{RTCConfiguration, RTCConfigurationInit};
use event_handlers::RTCPeerConnectionHandlers;
use observer::ObserverBridge;
use offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use operation::{Deferred, Operation, Operations, Promise, RTCLegacyCallbacks};
use peer_connection_internal::{NativeHandle, PeerConnectionInternal};
use peer_connection_state::RTCPeerConnectionState;
use portable_atomic::{AtomicBool, AtomicU8};
use sdp::sdp_type::RTCSdpType;
use sdp::session_description::{RTCSessionDescription, RTCSessionDescriptionInit};
use signaling_state::{next_signaling_state, RTCSignalingState, StateChangeOp};

use crate::api::API;
use crate::callback::{managed, CallbackGate};
use crate::data_channel::data_channel_init::RTCDataChannelInit;
use crate::data_channel::RTCDataChannel;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::event::*;
use crate::ice_transport::ice_candidate::RTCIceCandidateInit;
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::ice_transport::ice_gathering_state::RTCIceGatheringState;
use crate::lifecycle::LifecycleGuard;
use crate::native::{DescriptionKind, NativePeerConnection};
use crate::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::{
    RTCMediaKind, RTCRtpReceiver, RTCRtpSender, RTCRtpTransceiver, RTCRtpTransceiverInit,
};
use crate::stats::{RTCLegacyStatsReport, RTCStatsReport};

/// PeerConnection represents a WebRTC connection that establishes a
/// peer-to-peer communications with another PeerConnection instance in a
/// browser, or to another endpoint implementing the required protocols.
///
/// It owns one native connection and drives it by delegation. Every native
/// callback becomes exactly one event, delivered on the dispatch context;
/// none is delivered once [`close`](Self::close) has been called.
pub struct RTCPeerConnection {
    internal: Arc<PeerConnectionInternal>,
    native_handle_id: Option<u64>,
}

impl fmt::Debug for RTCPeerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCPeerConnection")
            .field("native_handle_id", &self.native_handle_id)
            .field("signaling_state", &self.signaling_state())
            .finish()
    }
}

impl RTCPeerConnection {
    /// creates a PeerConnection with the configuration. Use
    /// [`API::new_peer_connection`] to create one.
    pub(crate) async fn new(api: &API, init: RTCConfigurationInit) -> Result<Arc<Self>> {
        let configuration = RTCConfiguration::new(init)?;

        let guard = api
            .lifecycle_tracker
            .as_ref()
            .map(|tracker| tracker.register("peer_connection"));
        let native_handle_id = guard.as_ref().map(LifecycleGuard::id);

        let dispatcher = Arc::clone(&api.dispatcher);
        let c = configuration.clone();
        let pc = Arc::new_cyclic(|weak: &Weak<RTCPeerConnection>| {
            let owner: Weak<dyn Any + Send + Sync> = weak.clone();
            RTCPeerConnection {
                internal: PeerConnectionInternal::new(dispatcher, owner, c),
                native_handle_id,
            }
        });

        let observer = Arc::new(ObserverBridge::new(Arc::downgrade(&pc.internal)));
        let native = api
            .engine
            .create_peer_connection(&configuration, observer)
            .await?;
        pc.internal
            .gate
            .install(Arc::new(NativeHandle::new(native, guard)));

        Ok(pc)
    }

    /// The lifecycle id of the owned native handle, when the connection was
    /// built with a lifecycle tracker.
    pub fn native_handle_id(&self) -> Option<u64> {
        self.native_handle_id
    }

    fn start<T, F, Fut>(
        &self,
        operation: &'static str,
        callbacks: Option<RTCLegacyCallbacks<T>>,
        f: F,
    ) -> Promise<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(Arc<PeerConnectionInternal>, Arc<NativeHandle>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<T>> + Send + 'static,
    {
        if self.internal.is_closed() {
            return Promise::rejected(
                &self.internal.dispatcher,
                operation,
                callbacks,
                Error::closed(operation),
            );
        }

        let (deferred, promise) = Deferred::new(&self.internal.dispatcher, operation, callbacks);
        self.internal.run(deferred, f);
        promise
    }

    /// create_offer starts the PeerConnection and generates the localDescription
    /// <https://w3c.github.io/webrtc-pc/#dom-rtcpeerconnection-createoffer>
    pub fn create_offer(&self, options: Option<RTCOfferOptions>) -> Promise<RTCSessionDescription> {
        self.start("createOffer", None, move |internal, handle| {
            internal.create_offer(handle, options)
        })
    }

    pub fn create_offer_with_callbacks(
        &self,
        options: Option<RTCOfferOptions>,
        callbacks: RTCLegacyCallbacks<RTCSessionDescription>,
    ) -> Promise<RTCSessionDescription> {
        self.start("createOffer", Some(callbacks), move |internal, handle| {
            internal.create_offer(handle, options)
        })
    }

    /// create_answer starts the PeerConnection and generates the localDescription
    pub fn create_answer(
        &self,
        options: Option<RTCAnswerOptions>,
    ) -> Promise<RTCSessionDescription> {
        self.start("createAnswer", None, move |internal, handle| {
            internal.create_answer(handle, options)
        })
    }

    pub fn create_answer_with_callbacks(
        &self,
        options: Option<RTCAnswerOptions>,
        callbacks: RTCLegacyCallbacks<RTCSessionDescription>,
    ) -> Promise<RTCSessionDescription> {
        self.start("createAnswer", Some(callbacks), move |internal, handle| {
            internal.create_answer(handle, options)
        })
    }

    /// set_local_description sets the SessionDescription of the local peer.
    /// An empty `sdp` applies the last offer or answer created, and a missing
    /// type applies the offer or answer the signaling state calls for.
    pub fn set_local_description(&self, desc: RTCSessionDescriptionInit) -> Promise<()> {
        self.start("setLocalDescription", None, move |internal, handle| {
            internal.set_local_description(handle, desc)
        })
    }

    pub fn set_local_description_with_callbacks(
        &self,
        desc: RTCSessionDescriptionInit,
        callbacks: RTCLegacyCallbacks<()>,
    ) -> Promise<()> {
        self.start(
            "setLocalDescription",
            Some(callbacks),
            move |internal, handle| internal.set_local_description(handle, desc),
        )
    }

    /// set_remote_description sets the SessionDescription of the remote peer
    pub fn set_remote_description(&self, desc: RTCSessionDescriptionInit) -> Promise<()> {
        self.start("setRemoteDescription", None, move |internal, handle| {
            internal.set_remote_description(handle, desc)
        })
    }

    pub fn set_remote_description_with_callbacks(
        &self,
        desc: RTCSessionDescriptionInit,
        callbacks: RTCLegacyCallbacks<()>,
    ) -> Promise<()> {
        self.start(
            "setRemoteDescription",
            Some(callbacks),
            move |internal, handle| internal.set_remote_description(handle, desc),
        )
    }

    /// add_ice_candidate accepts an ICE candidate string and adds it
    /// to the existing set of candidates. An empty candidate string signals
    /// the end of the remote candidates.
    pub fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Promise<()> {
        self.start("addIceCandidate", None, move |internal, handle| {
            internal.add_ice_candidate(handle, candidate)
        })
    }

    pub fn add_ice_candidate_with_callbacks(
        &self,
        candidate: RTCIceCandidateInit,
        callbacks: RTCLegacyCallbacks<()>,
    ) -> Promise<()> {
        self.start("addIceCandidate", Some(callbacks), move |internal, handle| {
            internal.add_ice_candidate(handle, candidate)
        })
    }

    /// get_stats return data providing statistics about the overall connection
    pub fn get_stats(&self) -> Promise<RTCStatsReport> {
        self.start("getStats", None, |internal, handle| internal.get_stats(handle))
    }

    /// legacy_get_stats delivers the stats to `success` as a list of legacy
    /// reports, or the error to `failure`, on the dispatch context.
    pub fn legacy_get_stats(
        &self,
        success: impl FnOnce(Vec<RTCLegacyStatsReport>) + Send + 'static,
        failure: impl FnOnce(Error) + Send + 'static,
    ) {
        let callbacks = RTCLegacyCallbacks::new(success, failure);
        let _ = self.start("getStats", Some(callbacks), |internal, handle| async move {
            internal
                .get_stats(handle)
                .await
                .map(|report| report.to_legacy())
        });
    }

    /// create_data_channel creates a new DataChannel object with the given label
    /// and optional DataChannelInit used to configure properties of the
    /// underlying channel such as data reliability. It fails synchronously
    /// when the connection is closed or `init` is inconsistent.
    pub fn create_data_channel(
        &self,
        label: &str,
        init: Option<RTCDataChannelInit>,
    ) -> Result<Promise<Arc<RTCDataChannel>>> {
        // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #2)
        if self.internal.is_closed() {
            return Err(Error::ErrConnectionClosed {
                operation: "createDataChannel",
            });
        }

        let init = init.unwrap_or_default();
        if init.max_packet_life_time.is_some() && init.max_retransmits.is_some() {
            return Err(Error::ErrInvalidDataChannelInit(
                "maxPacketLifeTime and maxRetransmits are mutually exclusive",
            ));
        }
        if init.negotiated == Some(true) && init.id.is_none() {
            return Err(Error::ErrInvalidDataChannelInit(
                "a negotiated channel needs an id",
            ));
        }
        if init.id == Some(u16::MAX) {
            return Err(Error::ErrInvalidDataChannelInit("id 65535 is reserved"));
        }

        let label = label.to_owned();
        Ok(self.start("createDataChannel", None, move |internal, handle| {
            internal.create_data_channel(handle, label, init)
        }))
    }

    /// add_transceiver creates a new transceiver of `kind` and adds it to the
    /// set of transceivers, which makes the connection need negotiation.
    /// An unspecified direction is sendrecv. It fails synchronously when the
    /// connection is closed or `kind` is neither audio nor video.
    pub fn add_transceiver(
        &self,
        kind: RTCMediaKind,
        init: Option<RTCRtpTransceiverInit>,
    ) -> Result<Promise<Arc<RTCRtpTransceiver>>> {
        if self.internal.is_closed() {
            return Err(Error::ErrConnectionClosed {
                operation: "addTransceiver",
            });
        }
        if kind == RTCMediaKind::Unspecified {
            return Err(Error::ErrUnsupportedMediaKind(kind.to_string()));
        }

        let mut init = init.unwrap_or_default();
        if init.direction == RTCRtpTransceiverDirection::Unspecified {
            init.direction = RTCRtpTransceiverDirection::Sendrecv;
        }
        Ok(self.start("addTransceiver", None, move |internal, handle| {
            internal.add_transceiver(handle, kind, init)
        }))
    }

    /// get_transceivers returns the transceivers currently attached to this
    /// connection; none once it is closed. Every call returns new wrappers.
    pub async fn get_transceivers(&self) -> Vec<Arc<RTCRtpTransceiver>> {
        self.internal
            .transceivers()
            .await
            .into_iter()
            .map(|native| Arc::new(RTCRtpTransceiver::new(native)))
            .collect()
    }

    /// get_senders returns the sender of every transceiver.
    pub async fn get_senders(&self) -> Vec<Arc<RTCRtpSender>> {
        self.get_transceivers()
            .await
            .iter()
            .map(|transceiver| transceiver.sender())
            .collect()
    }

    /// get_receivers returns the receiver of every transceiver.
    pub async fn get_receivers(&self) -> Vec<Arc<RTCRtpReceiver>> {
        self.get_transceivers()
            .await
            .iter()
            .map(|transceiver| transceiver.receiver())
            .collect()
    }

    /// can_trickle_ice_candidates is `None` until a remote description is
    /// set, then whether the remote peer announced trickle ICE.
    pub async fn can_trickle_ice_candidates(&self) -> Option<bool> {
        self.remote_description()
            .await
            .map(|desc| desc.has_ice_option("trickle"))
    }

    /// restart_ice makes the next offer restart ICE.
    pub fn restart_ice(&self) -> Result<()> {
        if self.internal.is_closed() {
            return Err(Error::ErrConnectionClosed {
                operation: "restartIce",
            });
        }
        self.internal
            .ice_restart_pending
            .store(true, Ordering::SeqCst);
        Ok(())
    }

    /// get_configuration returns a copy of the current configuration. It keeps
    /// answering after close.
    pub fn get_configuration(&self) -> RTCConfiguration {
        self.internal.configuration()
    }

    /// set_configuration updates the configuration of this PeerConnection object.
    /// Fields absent from `patch` keep their value.
    pub fn set_configuration(&self, patch: RTCConfigurationInit) -> Result<()> {
        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-setconfiguration (step #2)
        if self.internal.is_closed() {
            return Err(Error::ErrConnectionClosed {
                operation: "setConfiguration",
            });
        }
        self.internal.set_configuration(patch)
    }

    /// local_description returns PendingLocalDescription if it is not null and
    /// otherwise it returns CurrentLocalDescription.
    pub async fn local_description(&self) -> Option<RTCSessionDescription> {
        self.internal.description(DescriptionKind::Local).await
    }

    /// remote_description returns pending_remote_description if it is not null and
    /// otherwise it returns current_remote_description.
    pub async fn remote_description(&self) -> Option<RTCSessionDescription> {
        self.internal.description(DescriptionKind::Remote).await
    }

    /// current_local_description represents the local description that was
    /// successfully negotiated the last time the PeerConnection transitioned
    /// into the stable state.
    pub async fn current_local_description(&self) -> Option<RTCSessionDescription> {
        self.internal.description(DescriptionKind::CurrentLocal).await
    }

    /// pending_local_description represents a local description that is in the
    /// process of being negotiated.
    pub async fn pending_local_description(&self) -> Option<RTCSessionDescription> {
        self.internal.description(DescriptionKind::PendingLocal).await
    }

    pub async fn current_remote_description(&self) -> Option<RTCSessionDescription> {
        self.internal
            .description(DescriptionKind::CurrentRemote)
            .await
    }

    pub async fn pending_remote_description(&self) -> Option<RTCSessionDescription> {
        self.internal
            .description(DescriptionKind::PendingRemote)
            .await
    }

    /// signaling_state attribute returns the signaling state of the
    /// PeerConnection instance.
    pub fn signaling_state(&self) -> RTCSignalingState {
        self.internal.signaling_state()
    }

    /// ice_connection_state returns the ICE connection state of the
    /// PeerConnection instance.
    pub fn ice_connection_state(&self) -> RTCIceConnectionState {
        if self.internal.is_closed() {
            return RTCIceConnectionState::Closed;
        }
        self.internal
            .gate
            .get()
            .map_or(RTCIceConnectionState::New, |handle| {
                handle.native.ice_connection_state()
            })
    }

    /// connection_state attribute returns the connection state of the
    /// PeerConnection instance.
    pub fn connection_state(&self) -> RTCPeerConnectionState {
        if self.internal.is_closed() {
            return RTCPeerConnectionState::Closed;
        }
        self.internal
            .gate
            .get()
            .map_or(RTCPeerConnectionState::New, |handle| {
                handle.native.connection_state()
            })
    }

    /// ice_gathering_state attribute returns the ICE gathering state of the
    /// PeerConnection instance.
    pub fn ice_gathering_state(&self) -> RTCIceGatheringState {
        if self.internal.is_closed() {
            return RTCIceGatheringState::Complete;
        }
        self.internal
            .gate
            .get()
            .map_or(RTCIceGatheringState::New, |handle| {
                handle.native.ice_gathering_state()
            })
    }

    pub fn is_closed(&self) -> bool {
        self.internal.is_closed()
    }

    /// close ends the PeerConnection. Only the first call has an effect; it
    /// releases the native handle, settles every pending operation with an
    /// `InvalidStateError` and silences all further native callbacks.
    pub fn close(&self) {
        self.internal.close();
    }

    pub fn add_event_listener(&self, event_type: &str, listener: EventListener) {
        self.internal
            .event_target
            .add_event_listener(event_type, listener);
    }

    pub fn remove_event_listener(&self, event_type: &str, listener: &EventListener) {
        self.internal
            .event_target
            .remove_event_listener(event_type, listener);
    }

    /// dispatch_event queues `event` for this connection's listeners. The
    /// payload of the connection's own event types must match the type.
    pub fn dispatch_event(&self, event: Event) -> Result<()> {
        let expected = match (event.event_type(), event.detail()) {
            (EVENT_ICE_CANDIDATE, EventDetail::IceCandidate(_))
            | (EVENT_ICE_CANDIDATE_ERROR, EventDetail::IceCandidateError(_))
            | (EVENT_TRACK, EventDetail::Track(_))
            | (EVENT_DATA_CHANNEL, EventDetail::DataChannel(_)) => None,
            (EVENT_ICE_CANDIDATE, _) => Some("RTCPeerConnectionIceEvent"),
            (EVENT_ICE_CANDIDATE_ERROR, _) => Some("RTCPeerConnectionIceErrorEvent"),
            (EVENT_TRACK, _) => Some("RTCTrackEvent"),
            (EVENT_DATA_CHANNEL, _) => Some("RTCDataChannelEvent"),
            _ => None,
        };
        if let Some(expected) = expected {
            return Err(Error::ErrTypeMismatch { expected });
        }

        self.internal.event_target.dispatch_event(event)
    }

    /// The handler currently assigned to `on<event_type>`.
    pub fn event_handler(&self, event_type: &str) -> Option<EventListener> {
        self.internal.handlers.handler(event_type)
    }

    /// on_track sets the `ontrack` handler, `None` clears it.
    pub fn on_track(&self, handler: Option<EventListener>) {
        self.internal.handlers.set(EVENT_TRACK, handler);
    }

    pub fn on_connection_state_change(&self, handler: Option<EventListener>) {
        self.internal
            .handlers
            .set(EVENT_CONNECTION_STATE_CHANGE, handler);
    }

    /// on_ice_candidate sets the `onicecandidate` handler. The end of
    /// gathering is delivered as an event without a candidate.
    pub fn on_ice_candidate(&self, handler: Option<EventListener>) {
        self.internal.handlers.set(EVENT_ICE_CANDIDATE, handler);
    }

    pub fn on_ice_candidate_error(&self, handler: Option<EventListener>) {
        self.internal
            .handlers
            .set(EVENT_ICE_CANDIDATE_ERROR, handler);
    }

    pub fn on_signaling_state_change(&self, handler: Option<EventListener>) {
        self.internal
            .handlers
            .set(EVENT_SIGNALING_STATE_CHANGE, handler);
    }

    pub fn on_ice_connection_state_change(&self, handler: Option<EventListener>) {
        self.internal
            .handlers
            .set(EVENT_ICE_CONNECTION_STATE_CHANGE, handler);
    }

    pub fn on_ice_gathering_state_change(&self, handler: Option<EventListener>) {
        self.internal
            .handlers
            .set(EVENT_ICE_GATHERING_STATE_CHANGE, handler);
    }

    pub fn on_negotiation_needed(&self, handler: Option<EventListener>) {
        self.internal
            .handlers
            .set(EVENT_NEGOTIATION_NEEDED, handler);
    }

    /// on_data_channel sets the `ondatachannel` handler, fired when the remote
    /// peer opens a channel.
    pub fn on_data_channel(&self, handler: Option<EventListener>) {
        self.internal.handlers.set(EVENT_DATA_CHANNEL, handler);
    }

    #[cfg(test)]
    pub(crate) async fn operations_done(&self) {
        self.internal.ops.done().await;
    }
}

impl Drop for RTCPeerConnection {
    fn drop(&mut self) {
        self.internal.close();
    }
}
