//! The narrow interface through which the facade drives a native engine and
//! through which the engine reports back. Implementations may call the
//! [`NativeObserver`] from any thread, at any time, including after `close`.

pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::data_channel::data_channel_init::RTCDataChannelInit;
use crate::data_channel::data_channel_state::RTCDataChannelState;
use crate::error::Result;
use crate::ice_transport::ice_candidate::RTCIceCandidateInit;
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::ice_transport::ice_gathering_state::RTCIceGatheringState;
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use crate::peer_connection::peer_connection_state::RTCPeerConnectionState;
use crate::peer_connection::sdp::session_description::RTCSessionDescription;
use crate::peer_connection::signaling_state::RTCSignalingState;
use crate::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::{RTCMediaKind, RTCRtpTransceiverInit};
use crate::stats::RTCStatsReport;

/// Which of the six description slots of a connection to read.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DescriptionKind {
    Local,
    Remote,
    CurrentLocal,
    PendingLocal,
    CurrentRemote,
    PendingRemote,
}

impl DescriptionKind {
    pub const ALL: [DescriptionKind; 6] = [
        DescriptionKind::Local,
        DescriptionKind::Remote,
        DescriptionKind::CurrentLocal,
        DescriptionKind::PendingLocal,
        DescriptionKind::CurrentRemote,
        DescriptionKind::PendingRemote,
    ];
}

#[async_trait]
pub trait NativeEngine: Send + Sync {
    /// Creates a native connection. `observer` receives every callback the
    /// connection produces for as long as the engine keeps it.
    async fn create_peer_connection(
        &self,
        configuration: &RTCConfiguration,
        observer: Arc<dyn NativeObserver>,
    ) -> Result<Arc<dyn NativePeerConnection>>;
}

#[async_trait]
pub trait NativePeerConnection: Send + Sync {
    async fn create_offer(&self, options: RTCOfferOptions) -> Result<RTCSessionDescription>;
    async fn create_answer(&self, options: RTCAnswerOptions) -> Result<RTCSessionDescription>;
    async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()>;
    async fn set_remote_description(&self, desc: RTCSessionDescription) -> Result<()>;
    async fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()>;
    async fn get_stats(&self) -> Result<RTCStatsReport>;

    /// Snapshot of one description slot, `None` when it is empty.
    async fn description(&self, kind: DescriptionKind) -> Option<RTCSessionDescription>;

    async fn set_configuration(&self, configuration: &RTCConfiguration) -> Result<()>;

    async fn create_data_channel(
        &self,
        label: &str,
        init: &RTCDataChannelInit,
    ) -> Result<Arc<dyn NativeDataChannel>>;

    /// Adds a transceiver of `kind`. `init.direction` is never unspecified.
    async fn add_transceiver(
        &self,
        kind: RTCMediaKind,
        init: &RTCRtpTransceiverInit,
    ) -> Result<Arc<dyn NativeRtpTransceiver>>;

    /// Every transceiver of the connection, in the order they were added.
    async fn transceivers(&self) -> Vec<Arc<dyn NativeRtpTransceiver>>;

    fn ice_connection_state(&self) -> RTCIceConnectionState;
    fn connection_state(&self) -> RTCPeerConnectionState;
    fn ice_gathering_state(&self) -> RTCIceGatheringState;

    /// Stops the connection. Fire and forget: it must not block and must not
    /// call back into the observer synchronously.
    fn close(&self);
}

/// Callbacks of a native connection.
pub trait NativeObserver: Send + Sync {
    fn on_signaling_change(&self, state: RTCSignalingState);
    fn on_ice_connection_change(&self, state: RTCIceConnectionState);
    fn on_connection_change(&self, state: RTCPeerConnectionState);
    fn on_ice_gathering_change(&self, state: RTCIceGatheringState);
    fn on_ice_candidate(&self, candidate: RTCIceCandidateInit);
    /// `host_candidate` is the combined `address:port` of the local candidate.
    fn on_ice_candidate_error(
        &self,
        host_candidate: &str,
        url: &str,
        error_code: u16,
        error_text: &str,
    );
    fn on_data_channel(&self, channel: Arc<dyn NativeDataChannel>);
    fn on_track(
        &self,
        receiver: Arc<dyn NativeRtpReceiver>,
        stream_ids: Vec<String>,
        transceiver: Arc<dyn NativeRtpTransceiver>,
    );
    fn on_negotiation_needed(&self);
}

#[async_trait]
pub trait NativeDataChannel: Send + Sync {
    fn label(&self) -> String;
    fn id(&self) -> Option<u16>;
    fn protocol(&self) -> String;
    fn ordered(&self) -> bool;
    fn ready_state(&self) -> RTCDataChannelState;
    async fn buffered_amount(&self) -> usize;
    async fn send(&self, data: &Bytes) -> Result<usize>;
    async fn send_text(&self, text: String) -> Result<usize>;

    /// Starts closing the channel. A local close is not reported back
    /// through [`NativeDataChannelObserver::on_close`].
    async fn close(&self) -> Result<()>;

    /// Replaces the observer of this channel. An engine reports `on_open`
    /// right away for a channel that is already open.
    fn register_observer(&self, observer: Arc<dyn NativeDataChannelObserver>);
}

/// Callbacks of a native data channel, with the same threading rules as
/// [`NativeObserver`].
pub trait NativeDataChannelObserver: Send + Sync {
    fn on_open(&self);
    fn on_message(&self, data: Bytes, is_string: bool);
    fn on_error(&self, error_text: String);
    /// The channel was closed by the remote peer or by a transport failure.
    fn on_close(&self);
}

pub trait NativeRtpReceiver: Send + Sync {
    /// `None` until the engine has a remote track for the receiver.
    fn track_id(&self) -> Option<String>;
    fn kind(&self) -> RTCMediaKind;
}

pub trait NativeRtpSender: Send + Sync {
    /// `None` for a sender without a track.
    fn track_id(&self) -> Option<String>;
    fn kind(&self) -> RTCMediaKind;
}

pub trait NativeRtpTransceiver: Send + Sync {
    fn mid(&self) -> Option<String>;
    fn kind(&self) -> RTCMediaKind;
    fn direction(&self) -> RTCRtpTransceiverDirection;
    fn sender(&self) -> Arc<dyn NativeRtpSender>;
    fn receiver(&self) -> Arc<dyn NativeRtpReceiver>;
}
