//! Engine backed by the `webrtc` crate. Each connection gets its own media
//! engine, interceptor registry and setting engine, so per-connection options
//! such as the UDP port range never leak between connections.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit as NativeDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel as WebRtcDataChannel;
use webrtc::ice::udp_network::{EphemeralUDP, UDPNetwork};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit as NativeIceCandidateInit;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_server::RTCIceServer as NativeIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration as NativeConfiguration;
use webrtc::peer_connection::offer_answer_options::{
    RTCAnswerOptions as NativeAnswerOptions, RTCOfferOptions as NativeOfferOptions,
};
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType as NativeSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription as NativeSessionDescription;
use webrtc::peer_connection::RTCPeerConnection as WebRtcPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver as WebRtcRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection as NativeDirection;
use webrtc::rtp_transceiver::{
    RTCRtpTransceiver as WebRtcRtpTransceiver, RTCRtpTransceiverInit as NativeTransceiverInit,
};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use crate::data_channel::data_channel_init::RTCDataChannelInit;
use crate::data_channel::data_channel_state::RTCDataChannelState;
use crate::error::{Error, Result};
use crate::ice_transport::ice_candidate::RTCIceCandidateInit;
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::ice_transport::ice_gathering_state::RTCIceGatheringState;
use crate::native::*;
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use crate::peer_connection::peer_connection_state::RTCPeerConnectionState;
use crate::peer_connection::sdp::session_description::RTCSessionDescription;
use crate::peer_connection::signaling_state::RTCSignalingState;
use crate::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::{RTCMediaKind, RTCRtpTransceiverInit};
use crate::stats::RTCStatsReport;

/// WebRtcRsEngine creates connections with the default codecs and
/// interceptors of the `webrtc` crate.
#[derive(Default, Debug, Clone)]
pub struct WebRtcRsEngine {}

impl WebRtcRsEngine {
    pub fn new() -> Self {
        WebRtcRsEngine {}
    }

    fn setting_engine(configuration: &RTCConfiguration) -> Result<SettingEngine> {
        let mut setting_engine = SettingEngine::default();

        let port_range = configuration.port_range;
        if port_range.min.is_some() || port_range.max.is_some() {
            let ephemeral = EphemeralUDP::new(
                port_range.min.unwrap_or(1),
                port_range.max.unwrap_or(u16::MAX),
            )
            .map_err(|e| Error::ErrNative(e.to_string()))?;
            setting_engine.set_udp_network(UDPNetwork::Ephemeral(ephemeral));
        }

        Ok(setting_engine)
    }
}

#[async_trait]
impl NativeEngine for WebRtcRsEngine {
    async fn create_peer_connection(
        &self,
        configuration: &RTCConfiguration,
        observer: Arc<dyn NativeObserver>,
    ) -> Result<Arc<dyn NativePeerConnection>> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .with_setting_engine(Self::setting_engine(configuration)?)
            .build();

        let pc = Arc::new(
            api.new_peer_connection(to_native_configuration(configuration))
                .await?,
        );
        register_handlers(&pc, observer);

        log::debug!("created webrtc-rs peer connection");
        Ok(Arc::new(WebRtcRsPeerConnection {
            pc,
            runtime: tokio::runtime::Handle::try_current().ok(),
        }))
    }
}

fn to_native_configuration(configuration: &RTCConfiguration) -> NativeConfiguration {
    let ice_servers = configuration
        .get_ice_servers()
        .into_iter()
        .map(|server| NativeIceServer {
            urls: server.urls,
            username: server.username,
            credential: server.credential,
            ..Default::default()
        })
        .collect();

    NativeConfiguration {
        ice_servers,
        ice_transport_policy: configuration.ice_transport_policy.to_string().as_str().into(),
        bundle_policy: configuration.bundle_policy.to_string().as_str().into(),
        rtcp_mux_policy: configuration.rtcp_mux_policy.to_string().as_str().into(),
        ice_candidate_pool_size: configuration.ice_candidate_pool_size,
        ..Default::default()
    }
}

fn to_native_description(desc: &RTCSessionDescription) -> Result<NativeSessionDescription> {
    let value = serde_json::to_value(desc).map_err(|e| Error::ErrNative(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| Error::ErrNative(e.to_string()))
}

/// webrtc-rs parses every description it applies, a rollback included. An
/// empty rollback takes the SDP of the pending description it undoes.
fn with_rollback_sdp(
    mut desc: NativeSessionDescription,
    pending: Option<NativeSessionDescription>,
) -> NativeSessionDescription {
    if desc.sdp_type == NativeSdpType::Rollback && desc.sdp.is_empty() {
        if let Some(pending) = pending {
            desc.sdp = pending.sdp;
        }
    }
    desc
}

fn from_native_description(desc: NativeSessionDescription) -> Result<RTCSessionDescription> {
    let value = serde_json::to_value(&desc).map_err(|e| Error::ErrNative(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| Error::ErrNative(e.to_string()))
}

/// Forwards every webrtc-rs callback of `pc` to `observer`. The observer
/// is called inline; the returned futures are empty.
fn register_handlers(pc: &WebRtcPeerConnection, observer: Arc<dyn NativeObserver>) {
    let o = Arc::clone(&observer);
    pc.on_signaling_state_change(Box::new(move |state| {
        o.on_signaling_change(RTCSignalingState::from(state.to_string().as_str()));
        Box::pin(async {})
    }));

    let o = Arc::clone(&observer);
    pc.on_ice_connection_state_change(Box::new(move |state| {
        o.on_ice_connection_change(RTCIceConnectionState::from(state.to_string().as_str()));
        Box::pin(async {})
    }));

    let o = Arc::clone(&observer);
    pc.on_peer_connection_state_change(Box::new(move |state| {
        o.on_connection_change(RTCPeerConnectionState::from(state.to_string().as_str()));
        Box::pin(async {})
    }));

    let o = Arc::clone(&observer);
    pc.on_ice_gathering_state_change(Box::new(move |state: RTCIceGathererState| {
        match state {
            RTCIceGathererState::New => o.on_ice_gathering_change(RTCIceGatheringState::New),
            RTCIceGathererState::Gathering => {
                o.on_ice_gathering_change(RTCIceGatheringState::Gathering)
            }
            RTCIceGathererState::Complete => {
                o.on_ice_gathering_change(RTCIceGatheringState::Complete)
            }
            // closing the gatherer is reported through the connection state
            _ => {}
        }
        Box::pin(async {})
    }));

    let o = Arc::clone(&observer);
    pc.on_ice_candidate(Box::new(move |candidate| {
        // webrtc-rs ends gathering with a `None` candidate; the end is
        // announced from the gathering state instead
        if let Some(candidate) = candidate {
            match candidate.to_json() {
                Ok(init) => o.on_ice_candidate(from_native_candidate(init)),
                Err(err) => log::warn!("dropping local candidate: {err}"),
            }
        }
        Box::pin(async {})
    }));

    let o = Arc::clone(&observer);
    pc.on_data_channel(Box::new(move |channel: Arc<WebRtcDataChannel>| {
        o.on_data_channel(Arc::new(WebRtcRsDataChannel { channel }));
        Box::pin(async {})
    }));

    let o = Arc::clone(&observer);
    pc.on_track(Box::new(
        move |track: Arc<TrackRemote>,
              _receiver: Arc<WebRtcRtpReceiver>,
              transceiver: Arc<WebRtcRtpTransceiver>| {
            let o = Arc::clone(&o);
            Box::pin(async move {
                let receiver = Arc::new(WebRtcRsRtpReceiver {
                    track_id: Some(track.id()),
                    kind: to_media_kind(track.kind()),
                });
                let transceiver = WebRtcRsRtpTransceiver::resolve(transceiver).await;
                o.on_track(receiver, vec![track.stream_id()], transceiver);
            })
        },
    ));

    let o = observer;
    pc.on_negotiation_needed(Box::new(move || {
        o.on_negotiation_needed();
        Box::pin(async {})
    }));
}

fn to_media_kind(kind: RTPCodecType) -> RTCMediaKind {
    kind.to_string().as_str().into()
}

fn from_native_candidate(init: NativeIceCandidateInit) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_mline_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

struct WebRtcRsPeerConnection {
    pc: Arc<WebRtcPeerConnection>,
    /// runtime the connection was created on, for closing from outside it
    runtime: Option<tokio::runtime::Handle>,
}

#[async_trait]
impl NativePeerConnection for WebRtcRsPeerConnection {
    async fn create_offer(&self, options: RTCOfferOptions) -> Result<RTCSessionDescription> {
        let offer = self
            .pc
            .create_offer(Some(NativeOfferOptions {
                voice_activity_detection: options.voice_activity_detection,
                ice_restart: options.ice_restart,
            }))
            .await?;
        from_native_description(offer)
    }

    async fn create_answer(&self, options: RTCAnswerOptions) -> Result<RTCSessionDescription> {
        let answer = self
            .pc
            .create_answer(Some(NativeAnswerOptions {
                voice_activity_detection: options.voice_activity_detection,
            }))
            .await?;
        from_native_description(answer)
    }

    async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()> {
        let mut native = to_native_description(&desc)?;
        if native.sdp_type == NativeSdpType::Rollback {
            let pending = self.pc.pending_local_description().await;
            native = with_rollback_sdp(native, pending);
        }
        self.pc.set_local_description(native).await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: RTCSessionDescription) -> Result<()> {
        let mut native = to_native_description(&desc)?;
        if native.sdp_type == NativeSdpType::Rollback {
            let pending = self.pc.pending_remote_description().await;
            native = with_rollback_sdp(native, pending);
        }
        self.pc.set_remote_description(native).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()> {
        self.pc
            .add_ice_candidate(NativeIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_mline_index,
                username_fragment: candidate.username_fragment,
            })
            .await?;
        Ok(())
    }

    async fn get_stats(&self) -> Result<RTCStatsReport> {
        let report = self.pc.get_stats().await;
        let value = serde_json::to_value(&report).map_err(|e| Error::ErrNative(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| Error::ErrNative(e.to_string()))
    }

    async fn description(&self, kind: DescriptionKind) -> Option<RTCSessionDescription> {
        let desc = match kind {
            DescriptionKind::Local => self.pc.local_description().await,
            DescriptionKind::Remote => self.pc.remote_description().await,
            DescriptionKind::CurrentLocal => self.pc.current_local_description().await,
            DescriptionKind::PendingLocal => self.pc.pending_local_description().await,
            DescriptionKind::CurrentRemote => self.pc.current_remote_description().await,
            DescriptionKind::PendingRemote => self.pc.pending_remote_description().await,
        }?;

        match from_native_description(desc) {
            Ok(desc) => Some(desc),
            Err(err) => {
                log::warn!("unreadable {kind:?} description: {err}");
                None
            }
        }
    }

    async fn set_configuration(&self, configuration: &RTCConfiguration) -> Result<()> {
        self.pc
            .set_configuration(to_native_configuration(configuration))
            .await?;
        Ok(())
    }

    async fn create_data_channel(
        &self,
        label: &str,
        init: &RTCDataChannelInit,
    ) -> Result<Arc<dyn NativeDataChannel>> {
        // webrtc-rs takes the stream id of a negotiated channel in place
        // of the flag and assigns ids of in-band channels itself
        let negotiated = match init.negotiated {
            Some(true) => init.id,
            _ => None,
        };
        let channel = self
            .pc
            .create_data_channel(
                label,
                Some(NativeDataChannelInit {
                    ordered: init.ordered,
                    max_packet_life_time: init.max_packet_life_time,
                    max_retransmits: init.max_retransmits,
                    protocol: init.protocol.clone(),
                    negotiated,
                }),
            )
            .await?;
        Ok(Arc::new(WebRtcRsDataChannel { channel }))
    }

    async fn add_transceiver(
        &self,
        kind: RTCMediaKind,
        init: &RTCRtpTransceiverInit,
    ) -> Result<Arc<dyn NativeRtpTransceiver>> {
        let transceiver = self
            .pc
            .add_transceiver_from_kind(
                RTPCodecType::from(kind.as_str()),
                Some(NativeTransceiverInit {
                    direction: NativeDirection::from(init.direction.as_str()),
                    send_encodings: vec![],
                }),
            )
            .await?;
        Ok(WebRtcRsRtpTransceiver::resolve(transceiver).await)
    }

    async fn transceivers(&self) -> Vec<Arc<dyn NativeRtpTransceiver>> {
        let mut transceivers: Vec<Arc<dyn NativeRtpTransceiver>> = vec![];
        for transceiver in self.pc.get_transceivers().await {
            transceivers.push(WebRtcRsRtpTransceiver::resolve(transceiver).await);
        }
        transceivers
    }

    fn ice_connection_state(&self) -> RTCIceConnectionState {
        self.pc.ice_connection_state().to_string().as_str().into()
    }

    fn connection_state(&self) -> RTCPeerConnectionState {
        self.pc.connection_state().to_string().as_str().into()
    }

    fn ice_gathering_state(&self) -> RTCIceGatheringState {
        self.pc.ice_gathering_state().to_string().as_str().into()
    }

    fn close(&self) {
        let runtime = tokio::runtime::Handle::try_current()
            .ok()
            .or_else(|| self.runtime.clone());
        let Some(runtime) = runtime else {
            log::error!("no runtime to close the webrtc-rs peer connection on");
            return;
        };

        let pc = Arc::clone(&self.pc);
        runtime.spawn(async move {
            if let Err(err) = pc.close().await {
                log::warn!("failed to close webrtc-rs peer connection: {err}");
            }
        });
    }
}

struct WebRtcRsDataChannel {
    channel: Arc<WebRtcDataChannel>,
}

#[async_trait]
impl NativeDataChannel for WebRtcRsDataChannel {
    fn label(&self) -> String {
        self.channel.label().to_owned()
    }

    fn id(&self) -> Option<u16> {
        Some(self.channel.id())
    }

    fn protocol(&self) -> String {
        self.channel.protocol().to_owned()
    }

    fn ordered(&self) -> bool {
        self.channel.ordered()
    }

    fn ready_state(&self) -> RTCDataChannelState {
        self.channel.ready_state().to_string().as_str().into()
    }

    async fn buffered_amount(&self) -> usize {
        self.channel.buffered_amount().await
    }

    async fn send(&self, data: &Bytes) -> Result<usize> {
        Ok(self.channel.send(data).await?)
    }

    async fn send_text(&self, text: String) -> Result<usize> {
        Ok(self.channel.send_text(text).await?)
    }

    async fn close(&self) -> Result<()> {
        Ok(self.channel.close().await?)
    }

    fn register_observer(&self, observer: Arc<dyn NativeDataChannelObserver>) {
        // webrtc-rs runs the open handler right away on an open channel
        let o = Arc::clone(&observer);
        self.channel.on_open(Box::new(move || {
            o.on_open();
            Box::pin(async {})
        }));

        let o = Arc::clone(&observer);
        self.channel
            .on_message(Box::new(move |message: DataChannelMessage| {
                o.on_message(message.data, message.is_string);
                Box::pin(async {})
            }));

        let o = Arc::clone(&observer);
        self.channel.on_error(Box::new(move |err: webrtc::Error| {
            o.on_error(err.to_string());
            Box::pin(async {})
        }));

        let o = observer;
        self.channel.on_close(Box::new(move || {
            o.on_close();
            Box::pin(async {})
        }));
    }
}

struct WebRtcRsRtpReceiver {
    track_id: Option<String>,
    kind: RTCMediaKind,
}

impl NativeRtpReceiver for WebRtcRsRtpReceiver {
    fn track_id(&self) -> Option<String> {
        self.track_id.clone()
    }

    fn kind(&self) -> RTCMediaKind {
        self.kind
    }
}

struct WebRtcRsRtpSender {
    track_id: Option<String>,
    kind: RTCMediaKind,
}

impl NativeRtpSender for WebRtcRsRtpSender {
    fn track_id(&self) -> Option<String> {
        self.track_id.clone()
    }

    fn kind(&self) -> RTCMediaKind {
        self.kind
    }
}

/// WebRtcRsRtpTransceiver reads mid and direction through. webrtc-rs only
/// hands out the sender, the receiver and their tracks asynchronously, so
/// those are taken when the transceiver is wrapped.
struct WebRtcRsRtpTransceiver {
    transceiver: Arc<WebRtcRtpTransceiver>,
    sender: Arc<WebRtcRsRtpSender>,
    receiver: Arc<WebRtcRsRtpReceiver>,
}

impl WebRtcRsRtpTransceiver {
    async fn resolve(transceiver: Arc<WebRtcRtpTransceiver>) -> Arc<Self> {
        let kind = to_media_kind(transceiver.kind());
        let sender_track = transceiver.sender().await.track().await;
        let receiver_track = transceiver.receiver().await.tracks().await.into_iter().next();

        Arc::new(WebRtcRsRtpTransceiver {
            sender: Arc::new(WebRtcRsRtpSender {
                track_id: sender_track.map(|track| track.id().to_owned()),
                kind,
            }),
            receiver: Arc::new(WebRtcRsRtpReceiver {
                track_id: receiver_track.map(|track| track.id()),
                kind,
            }),
            transceiver,
        })
    }
}

impl NativeRtpTransceiver for WebRtcRsRtpTransceiver {
    fn mid(&self) -> Option<String> {
        self.transceiver.mid().map(|mid| mid.to_string())
    }

    fn kind(&self) -> RTCMediaKind {
        to_media_kind(self.transceiver.kind())
    }

    fn direction(&self) -> RTCRtpTransceiverDirection {
        self.transceiver.direction().to_string().as_str().into()
    }

    fn sender(&self) -> Arc<dyn NativeRtpSender> {
        Arc::clone(&self.sender) as Arc<dyn NativeRtpSender>
    }

    fn receiver(&self) -> Arc<dyn NativeRtpReceiver> {
        Arc::clone(&self.receiver) as Arc<dyn NativeRtpReceiver>
    }
}
