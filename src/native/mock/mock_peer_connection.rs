use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use async_trait::async_trait;
use portable_atomic::{AtomicU64, AtomicUsize};
use tokio::sync::{Notify, Semaphore};

use super::MockDataChannel;
use crate::data_channel::data_channel_init::RTCDataChannelInit;
use crate::error::{Error, Result};
use crate::ice_transport::ice_candidate::RTCIceCandidateInit;
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::ice_transport::ice_gathering_state::RTCIceGatheringState;
use crate::native::*;
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use crate::peer_connection::peer_connection_state::RTCPeerConnectionState;
use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use crate::peer_connection::sdp::session_description::RTCSessionDescription;
use crate::peer_connection::signaling_state::RTCSignalingState;
use crate::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::{RTCMediaKind, RTCRtpTransceiverInit};
use crate::stats::RTCStatsReport;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct MockState {
    signaling_state: RTCSignalingState,
    ice_connection_state: RTCIceConnectionState,
    connection_state: RTCPeerConnectionState,
    ice_gathering_state: RTCIceGatheringState,

    pending_local: Option<RTCSessionDescription>,
    current_local: Option<RTCSessionDescription>,
    pending_remote: Option<RTCSessionDescription>,
    current_remote: Option<RTCSessionDescription>,

    remote_candidates: Vec<RTCIceCandidateInit>,
    offer_options: Vec<RTCOfferOptions>,
    data_channels: Vec<Arc<MockDataChannel>>,
    transceivers: Vec<Arc<MockRtpTransceiver>>,
}

/// MockPeerConnection applies descriptions the way a real engine tracks
/// them and reports signaling changes from inside the call, before the
/// call returns.
pub struct MockPeerConnection {
    id: u64,
    observer: Arc<dyn NativeObserver>,
    configuration: Mutex<RTCConfiguration>,
    state: Mutex<MockState>,

    hold: Mutex<Option<Arc<Semaphore>>>,
    entered: Notify,
    fail_next: Mutex<Option<Error>>,

    session_version: AtomicU64,
    close_count: AtomicUsize,
}

impl MockPeerConnection {
    pub(super) fn new(
        id: u64,
        configuration: RTCConfiguration,
        observer: Arc<dyn NativeObserver>,
    ) -> Self {
        MockPeerConnection {
            id,
            observer,
            configuration: Mutex::new(configuration),
            state: Mutex::new(MockState {
                signaling_state: RTCSignalingState::Stable,
                ice_connection_state: RTCIceConnectionState::New,
                connection_state: RTCPeerConnectionState::New,
                ice_gathering_state: RTCIceGatheringState::New,
                pending_local: None,
                current_local: None,
                pending_remote: None,
                current_remote: None,
                remote_candidates: vec![],
                offer_options: vec![],
                data_channels: vec![],
                transceivers: vec![],
            }),
            hold: Mutex::new(None),
            entered: Notify::new(),
            fail_next: Mutex::new(None),
            session_version: AtomicU64::new(0),
            close_count: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The configuration last pushed by the facade.
    pub fn configuration(&self) -> RTCConfiguration {
        lock(&self.configuration).clone()
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    pub fn remote_candidates(&self) -> Vec<RTCIceCandidateInit> {
        lock(&self.state).remote_candidates.clone()
    }

    /// The options of every offer created so far.
    pub fn offer_options(&self) -> Vec<RTCOfferOptions> {
        lock(&self.state).offer_options.clone()
    }

    pub fn data_channels(&self) -> Vec<Arc<MockDataChannel>> {
        lock(&self.state).data_channels.clone()
    }

    /// hold makes every following async operation wait for
    /// [`release_hold`](Self::release_hold) before doing anything.
    pub fn hold(&self) {
        *lock(&self.hold) = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_hold(&self) {
        if let Some(hold) = lock(&self.hold).take() {
            hold.close();
        }
    }

    /// Resolves once an async operation has started.
    pub async fn entered(&self) {
        self.entered.notified().await
    }

    /// Makes the next async operation fail with `err`.
    pub fn fail_next(&self, err: Error) {
        *lock(&self.fail_next) = Some(err);
    }

    async fn step(&self) -> Result<()> {
        self.entered.notify_one();
        let hold = lock(&self.hold).clone();
        if let Some(hold) = hold {
            // closing the semaphore is the release
            let _ = hold.acquire().await;
        }
        match lock(&self.fail_next).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// emit runs `f` against the observer on a new thread and waits for it.
    pub fn emit(&self, f: impl FnOnce(&dyn NativeObserver) + Send + 'static) {
        let observer = Arc::clone(&self.observer);
        let emitter = thread::spawn(move || f(observer.as_ref()));
        if emitter.join().is_err() {
            log::error!("mock emitter thread panicked");
        }
    }

    pub fn emit_ice_candidate(&self, candidate: &str) {
        let init = RTCIceCandidateInit {
            candidate: candidate.to_owned(),
            sdp_mid: Some("0".to_owned()),
            sdp_mline_index: Some(0),
            username_fragment: None,
        };
        self.emit(move |observer| observer.on_ice_candidate(init));
    }

    pub fn emit_ice_candidate_error(&self, host_candidate: &str, url: &str, code: u16, text: &str) {
        let (host, url, text) = (host_candidate.to_owned(), url.to_owned(), text.to_owned());
        self.emit(move |observer| observer.on_ice_candidate_error(&host, &url, code, &text));
    }

    pub fn emit_ice_gathering_state(&self, state: RTCIceGatheringState) {
        lock(&self.state).ice_gathering_state = state;
        self.emit(move |observer| observer.on_ice_gathering_change(state));
    }

    pub fn emit_ice_connection_state(&self, state: RTCIceConnectionState) {
        lock(&self.state).ice_connection_state = state;
        self.emit(move |observer| observer.on_ice_connection_change(state));
    }

    pub fn emit_connection_state(&self, state: RTCPeerConnectionState) {
        lock(&self.state).connection_state = state;
        self.emit(move |observer| observer.on_connection_change(state));
    }

    pub fn emit_signaling_state(&self, state: RTCSignalingState) {
        lock(&self.state).signaling_state = state;
        self.emit(move |observer| observer.on_signaling_change(state));
    }

    pub fn emit_negotiation_needed(&self) {
        self.emit(|observer| observer.on_negotiation_needed());
    }

    /// Announces a channel opened by the remote peer.
    pub fn emit_data_channel(&self, label: &str, id: u16) -> Arc<MockDataChannel> {
        let channel = Arc::new(MockDataChannel::new(
            label,
            Some(id),
            &RTCDataChannelInit::default(),
        ));
        let c = Arc::clone(&channel) as Arc<dyn NativeDataChannel>;
        self.emit(move |observer| observer.on_data_channel(c));
        channel
    }

    /// Announces a remote track on a new receive-only transceiver.
    pub fn emit_track(&self, track_id: &str, stream_ids: &[&str], mid: &str, kind: RTCMediaKind) {
        let receiver = Arc::new(MockRtpReceiver {
            track_id: Some(track_id.to_owned()),
            kind,
        });
        let transceiver = Arc::new(MockRtpTransceiver {
            mid: Mutex::new(Some(mid.to_owned())),
            kind,
            direction: RTCRtpTransceiverDirection::Recvonly,
            sender: Arc::new(MockRtpSender {
                track_id: None,
                kind,
            }),
            receiver: Arc::clone(&receiver),
        });
        lock(&self.state).transceivers.push(Arc::clone(&transceiver));

        let stream_ids = stream_ids.iter().map(|id| (*id).to_owned()).collect();
        self.emit(move |observer| observer.on_track(receiver, stream_ids, transceiver));
    }

    fn sdp(&self, ice_restart: bool) -> String {
        let version = self.session_version.fetch_add(1, Ordering::SeqCst);
        let mut sdp = format!(
            "v=0\r\no=- {} {version} IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n",
            self.id
        );
        if ice_restart {
            sdp.push_str("a=ice-options:restart\r\n");
        }
        sdp
    }

    fn apply(&self, desc: RTCSessionDescription, is_local: bool) -> Result<()> {
        let next = {
            let mut s = lock(&self.state);
            let (pending, other_pending, current, other_current) = if is_local {
                let s = &mut *s;
                (
                    &mut s.pending_local,
                    &mut s.pending_remote,
                    &mut s.current_local,
                    &mut s.current_remote,
                )
            } else {
                let s = &mut *s;
                (
                    &mut s.pending_remote,
                    &mut s.pending_local,
                    &mut s.current_remote,
                    &mut s.current_local,
                )
            };

            let desc_type = desc.sdp_type();
            let next = match (desc_type, is_local) {
                (RTCSdpType::Offer, true) => {
                    *pending = Some(desc);
                    RTCSignalingState::HaveLocalOffer
                }
                (RTCSdpType::Offer, false) => {
                    *pending = Some(desc);
                    RTCSignalingState::HaveRemoteOffer
                }
                (RTCSdpType::Pranswer, true) => {
                    *pending = Some(desc);
                    RTCSignalingState::HaveLocalPranswer
                }
                (RTCSdpType::Pranswer, false) => {
                    *pending = Some(desc);
                    RTCSignalingState::HaveRemotePranswer
                }
                (RTCSdpType::Answer, _) => {
                    *current = Some(desc);
                    *pending = None;
                    if let Some(offer) = other_pending.take() {
                        *other_current = Some(offer);
                    }
                    RTCSignalingState::Stable
                }
                (RTCSdpType::Rollback, _) => {
                    *pending = None;
                    RTCSignalingState::Stable
                }
                (RTCSdpType::Unspecified, _) => {
                    return Err(Error::ErrNative("description without a type".to_owned()));
                }
            };
            if desc_type != RTCSdpType::Rollback {
                assign_mids(&s.transceivers);
            }
            s.signaling_state = next;
            next
        };

        self.observer.on_signaling_change(next);
        Ok(())
    }
}

#[async_trait]
impl NativePeerConnection for MockPeerConnection {
    async fn create_offer(&self, options: RTCOfferOptions) -> Result<RTCSessionDescription> {
        self.step().await?;
        lock(&self.state).offer_options.push(options);
        Ok(RTCSessionDescription::offer(self.sdp(options.ice_restart)))
    }

    async fn create_answer(&self, _options: RTCAnswerOptions) -> Result<RTCSessionDescription> {
        self.step().await?;
        if lock(&self.state).pending_remote.is_none() {
            return Err(Error::ErrNative("no remote offer to answer".to_owned()));
        }
        Ok(RTCSessionDescription::answer(self.sdp(false)))
    }

    async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()> {
        self.step().await?;
        self.apply(desc, true)
    }

    async fn set_remote_description(&self, desc: RTCSessionDescription) -> Result<()> {
        self.step().await?;
        self.apply(desc, false)
    }

    async fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()> {
        self.step().await?;
        lock(&self.state).remote_candidates.push(candidate);
        Ok(())
    }

    async fn get_stats(&self) -> Result<RTCStatsReport> {
        self.step().await?;
        let data_channels = lock(&self.state).data_channels.len();
        let value = serde_json::json!({
            "PC": {
                "id": "PC",
                "type": "peer-connection",
                "timestamp": 1000.0,
                "dataChannelsRequested": data_channels,
            },
            "T01": {
                "id": "T01",
                "type": "transport",
                "timestamp": 1000.0,
                "iceRole": "controlling",
            },
        });
        serde_json::from_value(value).map_err(|e| Error::ErrNative(e.to_string()))
    }

    async fn description(&self, kind: DescriptionKind) -> Option<RTCSessionDescription> {
        let s = lock(&self.state);
        match kind {
            DescriptionKind::Local => s.pending_local.clone().or_else(|| s.current_local.clone()),
            DescriptionKind::Remote => s
                .pending_remote
                .clone()
                .or_else(|| s.current_remote.clone()),
            DescriptionKind::CurrentLocal => s.current_local.clone(),
            DescriptionKind::PendingLocal => s.pending_local.clone(),
            DescriptionKind::CurrentRemote => s.current_remote.clone(),
            DescriptionKind::PendingRemote => s.pending_remote.clone(),
        }
    }

    async fn set_configuration(&self, configuration: &RTCConfiguration) -> Result<()> {
        self.step().await?;
        *lock(&self.configuration) = configuration.clone();
        Ok(())
    }

    async fn create_data_channel(
        &self,
        label: &str,
        init: &RTCDataChannelInit,
    ) -> Result<Arc<dyn NativeDataChannel>> {
        self.step().await?;
        let mut s = lock(&self.state);
        let id = match init.negotiated {
            Some(true) => init.id,
            _ => Some(s.data_channels.len() as u16 * 2),
        };
        let channel = Arc::new(MockDataChannel::new(label, id, init));
        s.data_channels.push(Arc::clone(&channel));
        Ok(channel)
    }

    async fn add_transceiver(
        &self,
        kind: RTCMediaKind,
        init: &RTCRtpTransceiverInit,
    ) -> Result<Arc<dyn NativeRtpTransceiver>> {
        self.step().await?;
        let mut s = lock(&self.state);
        let track_id = init
            .direction
            .has_send()
            .then(|| format!("{kind}-{}", s.transceivers.len()));
        let transceiver = Arc::new(MockRtpTransceiver {
            mid: Mutex::new(None),
            kind,
            direction: init.direction,
            sender: Arc::new(MockRtpSender { track_id, kind }),
            receiver: Arc::new(MockRtpReceiver {
                track_id: None,
                kind,
            }),
        });
        s.transceivers.push(Arc::clone(&transceiver));
        Ok(transceiver)
    }

    async fn transceivers(&self) -> Vec<Arc<dyn NativeRtpTransceiver>> {
        lock(&self.state)
            .transceivers
            .iter()
            .map(|t| Arc::clone(t) as Arc<dyn NativeRtpTransceiver>)
            .collect()
    }

    fn ice_connection_state(&self) -> RTCIceConnectionState {
        lock(&self.state).ice_connection_state
    }

    fn connection_state(&self) -> RTCPeerConnectionState {
        lock(&self.state).connection_state
    }

    fn ice_gathering_state(&self) -> RTCIceGatheringState {
        lock(&self.state).ice_gathering_state
    }

    fn close(&self) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        let mut s = lock(&self.state);
        s.signaling_state = RTCSignalingState::Closed;
        s.ice_connection_state = RTCIceConnectionState::Closed;
        s.connection_state = RTCPeerConnectionState::Closed;
    }
}

/// Gives every transceiver still without a mid the next free one.
fn assign_mids(transceivers: &[Arc<MockRtpTransceiver>]) {
    for (index, transceiver) in transceivers.iter().enumerate() {
        let mut mid = lock(&transceiver.mid);
        if mid.is_none() {
            *mid = Some(index.to_string());
        }
    }
}

pub struct MockRtpReceiver {
    track_id: Option<String>,
    kind: RTCMediaKind,
}

impl NativeRtpReceiver for MockRtpReceiver {
    fn track_id(&self) -> Option<String> {
        self.track_id.clone()
    }

    fn kind(&self) -> RTCMediaKind {
        self.kind
    }
}

pub struct MockRtpSender {
    track_id: Option<String>,
    kind: RTCMediaKind,
}

impl NativeRtpSender for MockRtpSender {
    fn track_id(&self) -> Option<String> {
        self.track_id.clone()
    }

    fn kind(&self) -> RTCMediaKind {
        self.kind
    }
}

pub struct MockRtpTransceiver {
    mid: Mutex<Option<String>>,
    kind: RTCMediaKind,
    direction: RTCRtpTransceiverDirection,
    sender: Arc<MockRtpSender>,
    receiver: Arc<MockRtpReceiver>,
}

impl NativeRtpTransceiver for MockRtpTransceiver {
    fn mid(&self) -> Option<String> {
        lock(&self.mid).clone()
    }

    fn kind(&self) -> RTCMediaKind {
        self.kind
    }

    fn direction(&self) -> RTCRtpTransceiverDirection {
        self.direction
    }

    fn sender(&self) -> Arc<dyn NativeRtpSender> {
        Arc::clone(&self.sender) as Arc<dyn NativeRtpSender>
    }

    fn receiver(&self) -> Arc<dyn NativeRtpReceiver> {
        Arc::clone(&self.receiver) as Arc<dyn NativeRtpReceiver>
    }
}
