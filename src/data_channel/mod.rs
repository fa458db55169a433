
pub mod data_channel_init;
pub mod data_channel_message;
pub mod data_channel_state;
mod event_handlers;
mod observer;

use std::any::Any;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use data_channel_state::RTCDataChannelState;
use event_handlers::RTCDataChannelHandlers;
use observer::DataChannelObserver;
use portable_atomic::AtomicBool;

use crate::callback::{managed, CallbackGate};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::event::*;
use crate::native::NativeDataChannel;

/// RTCDataChannel represents a WebRTC DataChannel, a network channel which
/// can be used for bidirectional peer-to-peer transfers of arbitrary data.
///
/// It wraps the native channel by composition; the properties that are fixed
/// at creation are copied once, the ones that change are read through.
/// Native callbacks become `open`, `message`, `error` and `close` events on
/// the dispatch context of the owning connection.
///
/// ## Specifications
///
/// * [MDN]
/// * [W3C]
///
/// [MDN]: https://developer.mozilla.org/en-US/docs/Web/API/RTCDataChannel
/// [W3C]: https://w3c.github.io/webrtc-pc/#dom-rtcdatachannel
pub struct RTCDataChannel {
    label: String,
    protocol: String,
    ordered: bool,
    native: Arc<dyn NativeDataChannel>,

    event_target: EventTarget,
    handlers: Arc<RTCDataChannelHandlers>,

    /// gate is open while the channel may be driven and report back. It is
    /// released once, when the channel closes or its connection does.
    gate: CallbackGate<dyn NativeDataChannel>,

    /// set when the owning connection closed; silences queued events too
    detached: Arc<AtomicBool>,
}

impl fmt::Debug for RTCDataChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCDataChannel")
            .field("label", &self.label)
            .field("protocol", &self.protocol)
            .field("ordered", &self.ordered)
            .field("ready_state", &self.ready_state())
            .finish()
    }
}

impl RTCDataChannel {
    /// Wraps `native`. Callbacks are not wired until [`attach`](Self::attach).
    pub(crate) fn new(
        native: Arc<dyn NativeDataChannel>,
        dispatcher: Arc<Dispatcher>,
    ) -> Arc<Self> {
        let handlers = Arc::new(RTCDataChannelHandlers::default());
        let channel = Arc::new_cyclic(|weak: &Weak<RTCDataChannel>| {
            let owner: Weak<dyn Any + Send + Sync> = weak.clone();
            RTCDataChannel {
                label: native.label(),
                protocol: native.protocol(),
                ordered: native.ordered(),
                native: Arc::clone(&native),
                event_target: EventTarget::with_owner(
                    dispatcher,
                    owner,
                    Arc::clone(&handlers) as Arc<dyn LegacyHandlers>,
                ),
                handlers,
                gate: CallbackGate::new(),
                detached: Arc::new(AtomicBool::new(false)),
            }
        });
        channel.gate.install(native);
        channel
    }

    /// attach registers the observer with the native channel. Events the
    /// native channel reports from here on are queued behind anything the
    /// caller has already dispatched.
    pub(crate) fn attach(self: &Arc<Self>) {
        let observer = Arc::new(DataChannelObserver::new(Arc::downgrade(self)));
        self.native.register_observer(observer);
    }

    /// detach is the connection closing: the channel reports closed and no
    /// event, queued or future, is delivered.
    pub(crate) fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
        if self.gate.release().is_some() {
            log::trace!("data channel {} detached", self.label);
        }
    }

    fn dispatch_native(&self, event: Event) {
        let detached = Arc::clone(&self.detached);
        let event_type = event.event_type().to_owned();
        let is_open = move || !detached.load(Ordering::SeqCst);
        if let Err(err) = self.event_target.dispatch_event_while(event, is_open) {
            log::warn!("{event_type} not dispatched on data channel {}: {err}", self.label);
        }
    }

    /// finish_close releases the gate and fires `close`, once.
    fn finish_close(&self) {
        if self.gate.release().is_some() {
            self.dispatch_native(Event::new(EVENT_CLOSE));
        }
    }

    fn open_native(&self) -> Result<Arc<dyn NativeDataChannel>> {
        self.gate
            .get()
            .ok_or_else(|| Error::ErrDataChannelClosed(self.label.clone()))
    }

    /// label represents a label that can be used to distinguish this
    /// DataChannel object from other DataChannel objects.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn ordered(&self) -> bool {
        self.ordered
    }

    /// id is `None` until the stream id has been negotiated.
    pub fn id(&self) -> Option<u16> {
        self.native.id()
    }

    pub fn ready_state(&self) -> RTCDataChannelState {
        match self.gate.get() {
            Some(native) => native.ready_state(),
            None => RTCDataChannelState::Closed,
        }
    }

    /// buffered_amount is the number of bytes queued to be sent. It is 0
    /// once the channel is closed.
    pub async fn buffered_amount(&self) -> usize {
        match self.gate.get() {
            Some(native) => native.buffered_amount().await,
            None => 0,
        }
    }

    /// send sends the binary message to the DataChannel peer
    pub async fn send(&self, data: &Bytes) -> Result<usize> {
        self.open_native()?.send(data).await
    }

    /// send_text sends the text message to the DataChannel peer
    pub async fn send_text(&self, text: impl Into<String>) -> Result<usize> {
        self.open_native()?.send_text(text.into()).await
    }

    /// close closes the channel and fires `close`. Closing a closed channel
    /// does nothing.
    pub async fn close(&self) -> Result<()> {
        let Some(native) = self.gate.get() else {
            return Ok(());
        };
        native.close().await?;
        self.finish_close();
        Ok(())
    }

    pub fn add_event_listener(&self, event_type: &str, listener: EventListener) {
        self.event_target.add_event_listener(event_type, listener);
    }

    pub fn remove_event_listener(&self, event_type: &str, listener: &EventListener) {
        self.event_target.remove_event_listener(event_type, listener);
    }

    /// dispatch_event queues `event` for this channel's listeners.
    pub fn dispatch_event(&self, event: Event) -> Result<()> {
        let expected = match (event.event_type(), event.detail()) {
            (EVENT_MESSAGE, EventDetail::Message(_)) | (EVENT_ERROR, EventDetail::Error(_)) => None,
            (EVENT_MESSAGE, _) => Some("MessageEvent"),
            (EVENT_ERROR, _) => Some("RTCErrorEvent"),
            _ => None,
        };
        if let Some(expected) = expected {
            return Err(Error::ErrTypeMismatch { expected });
        }

        self.event_target.dispatch_event(event)
    }

    /// The handler currently assigned to `on<event_type>`.
    pub fn event_handler(&self, event_type: &str) -> Option<EventListener> {
        self.handlers.handler(event_type)
    }

    /// on_open sets the `onopen` handler, fired once the underlying
    /// transport is established.
    pub fn on_open(&self, handler: Option<EventListener>) {
        self.handlers.set(EVENT_OPEN, handler);
    }

    pub fn on_message(&self, handler: Option<EventListener>) {
        self.handlers.set(EVENT_MESSAGE, handler);
    }

    pub fn on_error(&self, handler: Option<EventListener>) {
        self.handlers.set(EVENT_ERROR, handler);
    }

    pub fn on_close(&self, handler: Option<EventListener>) {
        self.handlers.set(EVENT_CLOSE, handler);
    }
}
