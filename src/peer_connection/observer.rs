use std::sync::Weak;

use super::*;
use crate::event::EventDetail;
use crate::ice_transport::ice_candidate::RTCIceCandidate;
use crate::ice_transport::ice_candidate_error::RTCPeerConnectionIceErrorEvent;
use crate::native::{NativeDataChannel, NativeObserver, NativeRtpReceiver, NativeRtpTransceiver};
use crate::rtp_transceiver::RTCTrackEvent;

/// ObserverBridge is the only object handed to the native engine. Each
/// callback runs under the panic boundary, is dropped once the connection
/// has released its native handle, and otherwise becomes one queued event.
pub(crate) struct ObserverBridge {
    internal: Weak<PeerConnectionInternal>,
}

impl ObserverBridge {
    pub(super) fn new(internal: Weak<PeerConnectionInternal>) -> Self {
        ObserverBridge { internal }
    }

    fn with_open(&self, callback: &str, f: impl FnOnce(&Arc<PeerConnectionInternal>)) {
        managed(callback, || {
            let Some(internal) = self.internal.upgrade() else {
                log::trace!("{callback} after the connection was dropped");
                return;
            };
            if !internal.gate.is_open() {
                log::trace!("{callback} ignored, native handle released");
                return;
            }
            f(&internal);
        });
    }
}

impl NativeObserver for ObserverBridge {
    fn on_signaling_change(&self, state: RTCSignalingState) {
        self.with_open("on_signaling_change", |internal| {
            internal.set_signaling_state(state);
            internal.dispatch_native(Event::new(EVENT_SIGNALING_STATE_CHANGE));
        });
    }

    fn on_ice_connection_change(&self, state: RTCIceConnectionState) {
        self.with_open("on_ice_connection_change", |internal| {
            log::debug!("ICE connection state changed: {state}");
            internal.dispatch_native(Event::new(EVENT_ICE_CONNECTION_STATE_CHANGE));
        });
    }

    fn on_connection_change(&self, state: RTCPeerConnectionState) {
        self.with_open("on_connection_change", |internal| {
            log::debug!("peer connection state changed: {state}");
            internal.dispatch_native(Event::new(EVENT_CONNECTION_STATE_CHANGE));
        });
    }

    fn on_ice_gathering_change(&self, state: RTCIceGatheringState) {
        self.with_open("on_ice_gathering_change", |internal| {
            internal.dispatch_native(Event::new(EVENT_ICE_GATHERING_STATE_CHANGE));
            // the end of gathering is announced as a null candidate
            if state == RTCIceGatheringState::Complete && !internal.is_closed() {
                internal.dispatch_native(Event::with_detail(
                    EVENT_ICE_CANDIDATE,
                    EventDetail::IceCandidate(None),
                ));
            }
        });
    }

    fn on_ice_candidate(&self, candidate: RTCIceCandidateInit) {
        self.with_open("on_ice_candidate", |internal| {
            let candidate = RTCIceCandidate::parse(candidate);
            internal.dispatch_native(Event::with_detail(
                EVENT_ICE_CANDIDATE,
                EventDetail::IceCandidate(Some(candidate)),
            ));
        });
    }

    fn on_ice_candidate_error(
        &self,
        host_candidate: &str,
        url: &str,
        error_code: u16,
        error_text: &str,
    ) {
        self.with_open("on_ice_candidate_error", |internal| {
            let err = RTCPeerConnectionIceErrorEvent::from_host_candidate(
                host_candidate,
                url.to_owned(),
                error_code,
                error_text.to_owned(),
            );
            internal.dispatch_native(Event::with_detail(
                EVENT_ICE_CANDIDATE_ERROR,
                EventDetail::IceCandidateError(err),
            ));
        });
    }

    fn on_data_channel(&self, channel: Arc<dyn NativeDataChannel>) {
        self.with_open("on_data_channel", |internal| {
            let channel = internal.new_data_channel(channel);
            internal.dispatch_native(Event::with_detail(
                EVENT_DATA_CHANNEL,
                EventDetail::DataChannel(Arc::clone(&channel)),
            ));
            // wired after the datachannel event is queued, so open comes later
            channel.attach();
        });
    }

    fn on_track(
        &self,
        receiver: Arc<dyn NativeRtpReceiver>,
        stream_ids: Vec<String>,
        transceiver: Arc<dyn NativeRtpTransceiver>,
    ) {
        self.with_open("on_track", |internal| {
            let track = RTCTrackEvent::from_native(receiver, stream_ids, transceiver);
            internal.dispatch_native(Event::with_detail(EVENT_TRACK, EventDetail::Track(track)));
        });
    }

    fn on_negotiation_needed(&self) {
        self.with_open("on_negotiation_needed", |internal| {
            internal.dispatch_native(Event::new(EVENT_NEGOTIATION_NEEDED));
        });
    }
}
