use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

use super::*;
use crate::data_channel::data_channel_state::RTCDataChannelState;
use crate::native::{NativeDataChannel, NativeRtpTransceiver};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// NativeHandle is the owned native connection. The lifecycle guard rides
/// along so the teardown is recorded when the last reference goes away.
pub(crate) struct NativeHandle {
    pub(crate) native: Arc<dyn NativePeerConnection>,
    _guard: Option<LifecycleGuard>,
}

impl NativeHandle {
    pub(super) fn new(native: Arc<dyn NativePeerConnection>, guard: Option<LifecycleGuard>) -> Self {
        NativeHandle {
            native,
            _guard: guard,
        }
    }
}

pub(crate) struct PeerConnectionInternal {
    pub(super) event_target: EventTarget,
    pub(super) handlers: Arc<RTCPeerConnectionHandlers>,
    pub(super) dispatcher: Arc<Dispatcher>,

    /// gate holds the native handle. Native callbacks and queued operations
    /// only reach it while the gate is open; close releases it exactly once.
    pub(super) gate: CallbackGate<NativeHandle>,

    /// ops is an operations queue which will ensure the enqueued actions are
    /// executed in order.
    pub(super) ops: Operations,

    signaling_state: AtomicU8,
    is_closed: AtomicBool,

    configuration: Mutex<RTCConfiguration>,
    local_description_applied: AtomicBool,
    pub(super) ice_restart_pending: AtomicBool,

    last_offer: Mutex<String>,
    last_answer: Mutex<String>,

    /// last snapshot of each description slot, served once the native
    /// handle has been released
    descriptions: Mutex<HashMap<DescriptionKind, RTCSessionDescription>>,

    /// channels that are not closed yet, kept alive so their events arrive
    data_channels: Mutex<Vec<Arc<RTCDataChannel>>>,
}

impl PeerConnectionInternal {
    pub(super) fn new(
        dispatcher: Arc<Dispatcher>,
        owner: Weak<dyn Any + Send + Sync>,
        configuration: RTCConfiguration,
    ) -> Arc<Self> {
        let handlers = Arc::new(RTCPeerConnectionHandlers::default());
        let event_target = EventTarget::with_owner(
            Arc::clone(&dispatcher),
            owner,
            Arc::clone(&handlers) as Arc<dyn LegacyHandlers>,
        );

        Arc::new(PeerConnectionInternal {
            event_target,
            handlers,
            dispatcher,
            gate: CallbackGate::new(),
            ops: Operations::new(),
            signaling_state: AtomicU8::new(RTCSignalingState::Stable as u8),
            is_closed: AtomicBool::new(false),
            configuration: Mutex::new(configuration),
            local_description_applied: AtomicBool::new(false),
            ice_restart_pending: AtomicBool::new(false),
            last_offer: Mutex::new(String::new()),
            last_answer: Mutex::new(String::new()),
            descriptions: Mutex::new(HashMap::new()),
            data_channels: Mutex::new(vec![]),
        })
    }

    pub(super) fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self, operation: &'static str) -> Result<()> {
        if self.is_closed() {
            Err(Error::closed(operation))
        } else {
            Ok(())
        }
    }

    pub(super) fn signaling_state(&self) -> RTCSignalingState {
        self.signaling_state.load(Ordering::SeqCst).into()
    }

    /// Stores `state` unless the connection is already closed, which is
    /// terminal. Returns whether the stored value changed.
    pub(super) fn set_signaling_state(&self, state: RTCSignalingState) -> bool {
        let closed = RTCSignalingState::Closed as u8;
        self.signaling_state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                if cur == closed || cur == state as u8 {
                    None
                } else {
                    Some(state as u8)
                }
            })
            .is_ok()
    }

    pub(super) fn close(&self) {
        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-close (step #1 - #3)
        if self.is_closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.signaling_state
            .store(RTCSignalingState::Closed as u8, Ordering::SeqCst);

        // from here on every native callback is a no-op
        let handle = self.gate.release();
        self.ops.close();

        let data_channels = std::mem::take(&mut *lock(&self.data_channels));
        for channel in data_channels {
            channel.detach();
        }

        if let Some(handle) = handle {
            handle.native.close();
        }
        log::debug!("peer connection closed");
    }

    /// Wraps a native channel of this connection. The connection holds on
    /// to it until it closes, and detaches it when the connection closes.
    pub(super) fn new_data_channel(
        &self,
        native: Arc<dyn NativeDataChannel>,
    ) -> Arc<RTCDataChannel> {
        let channel = RTCDataChannel::new(native, Arc::clone(&self.dispatcher));
        {
            let mut data_channels = lock(&self.data_channels);
            data_channels.retain(|c| c.ready_state() != RTCDataChannelState::Closed);
            data_channels.push(Arc::clone(&channel));
        }
        // close may have taken the list already
        if self.is_closed() {
            channel.detach();
        }
        channel
    }

    /// dispatch_native queues an event that originated in the native engine.
    /// Delivery stops the moment the native handle is released.
    pub(super) fn dispatch_native(self: &Arc<Self>, event: Event) {
        let weak = Arc::downgrade(self);
        let event_type = event.event_type().to_owned();
        let is_open = move || weak.upgrade().is_some_and(|internal| internal.gate.is_open());
        if let Err(err) = self.event_target.dispatch_event_while(event, is_open) {
            log::warn!("{event_type} not dispatched: {err}");
        }
    }

    /// run queues `f` on the operations chain and settles `deferred` with its
    /// result. If the connection is closed before or while `f` runs, the
    /// deferred is rejected instead.
    pub(super) fn run<T, F, Fut>(self: &Arc<Self>, deferred: Deferred<T>, f: F)
    where
        T: Clone + Send + 'static,
        F: FnOnce(Arc<Self>, Arc<NativeHandle>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let operation = deferred.operation();
        let internal = Arc::clone(self);
        let op = Operation::new(
            move || {
                Box::pin(async move {
                    let Some(handle) = internal.gate.get() else {
                        deferred.reject(Error::closed(operation));
                        return;
                    };
                    let result = f(Arc::clone(&internal), handle).await;
                    if internal.is_closed() {
                        deferred.reject(Error::closed(operation));
                    } else {
                        deferred.settle(result);
                    }
                })
            },
            operation,
        );

        // a refused operation is dropped here, which rejects its deferred
        if let Err(err) = self.ops.enqueue(op) {
            log::trace!("{operation} not queued: {err}");
        }
    }

    pub(super) fn configuration(&self) -> RTCConfiguration {
        lock(&self.configuration).clone()
    }

    /// set_configuration validates and stores the patched configuration right
    /// away, then pushes it to the engine on the operations chain. If the
    /// engine refuses it, the previous configuration is put back unless a
    /// later call has replaced it in the meantime.
    pub(super) fn set_configuration(self: &Arc<Self>, patch: RTCConfigurationInit) -> Result<()> {
        let (previous, configuration) = {
            let mut current = lock(&self.configuration);
            let patched = current.patched(
                patch,
                self.local_description_applied.load(Ordering::SeqCst),
            )?;
            let previous = std::mem::replace(&mut *current, patched.clone());
            (previous, patched)
        };

        let internal = Arc::clone(self);
        self.ops.enqueue(Operation::new(
            move || {
                Box::pin(async move {
                    let Some(handle) = internal.gate.get() else {
                        return;
                    };
                    if let Err(err) = handle.native.set_configuration(&configuration).await {
                        log::error!("native engine refused the configuration: {err}");
                        let mut current = lock(&internal.configuration);
                        if *current == configuration {
                            *current = previous;
                        }
                    }
                })
            },
            "setConfiguration",
        ))
    }

    pub(super) async fn description(&self, kind: DescriptionKind) -> Option<RTCSessionDescription> {
        match self.gate.get() {
            Some(handle) => handle.native.description(kind).await,
            None => {
                let descriptions = lock(&self.descriptions);
                descriptions.get(&kind).cloned()
            }
        }
    }

    async fn refresh_descriptions(&self, native: &Arc<dyn NativePeerConnection>) {
        let mut snapshot = HashMap::new();
        for kind in DescriptionKind::ALL {
            if let Some(desc) = native.description(kind).await {
                snapshot.insert(kind, desc);
            }
        }
        *lock(&self.descriptions) = snapshot;
    }

    fn last_created(&self, sdp_type: RTCSdpType) -> String {
        match sdp_type {
            RTCSdpType::Offer => lock(&self.last_offer).clone(),
            RTCSdpType::Answer | RTCSdpType::Pranswer => lock(&self.last_answer).clone(),
            _ => String::new(),
        }
    }

    fn offer_options(&self, options: Option<RTCOfferOptions>) -> RTCOfferOptions {
        let mut options = options.unwrap_or_default();
        if self.ice_restart_pending.swap(false, Ordering::SeqCst) {
            options.ice_restart = true;
        }
        options
    }

    pub(super) async fn create_offer(
        self: Arc<Self>,
        handle: Arc<NativeHandle>,
        options: Option<RTCOfferOptions>,
    ) -> Result<RTCSessionDescription> {
        let options = self.offer_options(options);
        let offer = handle.native.create_offer(options).await?;
        self.ensure_open("createOffer")?;

        *lock(&self.last_offer) = offer.sdp().to_owned();
        Ok(offer)
    }

    pub(super) async fn create_answer(
        self: Arc<Self>,
        handle: Arc<NativeHandle>,
        options: Option<RTCAnswerOptions>,
    ) -> Result<RTCSessionDescription> {
        const OPERATION: &str = "createAnswer";

        let state = self.signaling_state();
        if !matches!(
            state,
            RTCSignalingState::HaveRemoteOffer | RTCSignalingState::HaveLocalPranswer
        ) {
            return Err(Error::ErrIncorrectSignalingState {
                operation: OPERATION,
                state,
            });
        }

        let answer = handle
            .native
            .create_answer(options.unwrap_or_default())
            .await?;
        self.ensure_open(OPERATION)?;

        *lock(&self.last_answer) = answer.sdp().to_owned();
        Ok(answer)
    }

    pub(super) async fn set_local_description(
        self: Arc<Self>,
        handle: Arc<NativeHandle>,
        init: RTCSessionDescriptionInit,
    ) -> Result<()> {
        const OPERATION: &str = "setLocalDescription";

        let current = self.signaling_state();
        // a description without a type is the implicit offer or answer
        let sdp_type = match init.sdp_type {
            RTCSdpType::Unspecified => match current {
                RTCSignalingState::Stable
                | RTCSignalingState::HaveLocalOffer
                | RTCSignalingState::HaveRemotePranswer => RTCSdpType::Offer,
                _ => RTCSdpType::Answer,
            },
            sdp_type => sdp_type,
        };
        let next = next_signaling_state(current, StateChangeOp::SetLocal, sdp_type)?;

        let mut sdp = init.sdp;
        if sdp.is_empty() && sdp_type.reuses_last_sdp() {
            sdp = self.last_created(sdp_type);
        }
        if sdp.is_empty() && sdp_type == RTCSdpType::Offer {
            let offer = Arc::clone(&self)
                .create_offer(Arc::clone(&handle), None)
                .await?;
            sdp = offer.sdp().to_owned();
        } else if sdp.is_empty() && sdp_type.reuses_last_sdp() {
            let answer = Arc::clone(&self)
                .create_answer(Arc::clone(&handle), None)
                .await?;
            sdp = answer.sdp().to_owned();
        }

        let desc = RTCSessionDescription::new(RTCSessionDescriptionInit { sdp_type, sdp })?;
        handle.native.set_local_description(desc).await?;
        self.ensure_open(OPERATION)?;

        self.set_signaling_state(next);
        if sdp_type != RTCSdpType::Rollback {
            self.local_description_applied.store(true, Ordering::SeqCst);
        }
        self.refresh_descriptions(&handle.native).await;

        Ok(())
    }

    pub(super) async fn set_remote_description(
        self: Arc<Self>,
        handle: Arc<NativeHandle>,
        init: RTCSessionDescriptionInit,
    ) -> Result<()> {
        let desc = RTCSessionDescription::new(init)?;
        let next = next_signaling_state(
            self.signaling_state(),
            StateChangeOp::SetRemote,
            desc.sdp_type(),
        )?;

        handle.native.set_remote_description(desc).await?;
        self.ensure_open("setRemoteDescription")?;

        self.set_signaling_state(next);
        self.refresh_descriptions(&handle.native).await;

        Ok(())
    }

    pub(super) async fn add_ice_candidate(
        self: Arc<Self>,
        handle: Arc<NativeHandle>,
        candidate: RTCIceCandidateInit,
    ) -> Result<()> {
        if handle
            .native
            .description(DescriptionKind::Remote)
            .await
            .is_none()
        {
            return Err(Error::ErrNoRemoteDescription);
        }

        handle.native.add_ice_candidate(candidate).await?;
        self.ensure_open("addIceCandidate")
    }

    pub(super) async fn get_stats(
        self: Arc<Self>,
        handle: Arc<NativeHandle>,
    ) -> Result<RTCStatsReport> {
        let report = handle.native.get_stats().await?;
        self.ensure_open("getStats")?;
        Ok(report)
    }

    pub(super) async fn create_data_channel(
        self: Arc<Self>,
        handle: Arc<NativeHandle>,
        label: String,
        init: RTCDataChannelInit,
    ) -> Result<Arc<RTCDataChannel>> {
        let native = handle.native.create_data_channel(&label, &init).await?;
        self.ensure_open("createDataChannel")?;

        let channel = self.new_data_channel(native);
        channel.attach();
        Ok(channel)
    }

    pub(super) async fn add_transceiver(
        self: Arc<Self>,
        handle: Arc<NativeHandle>,
        kind: RTCMediaKind,
        init: RTCRtpTransceiverInit,
    ) -> Result<Arc<RTCRtpTransceiver>> {
        let native = handle.native.add_transceiver(kind, &init).await?;
        self.ensure_open("addTransceiver")?;
        Ok(Arc::new(RTCRtpTransceiver::new(native)))
    }

    /// The engine's current transceivers. A closed connection has none.
    pub(super) async fn transceivers(&self) -> Vec<Arc<dyn NativeRtpTransceiver>> {
        match self.gate.get() {
            Some(handle) => handle.native.transceivers().await,
            None => vec![],
        }
    }
}
