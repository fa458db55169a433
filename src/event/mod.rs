#[cfg(test)]
mod event_target_test;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use smol_str::SmolStr;

use crate::callback::managed;
use crate::data_channel::data_channel_message::RTCDataChannelMessage;
use crate::data_channel::RTCDataChannel;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::ice_transport::ice_candidate::RTCIceCandidate;
use crate::ice_transport::ice_candidate_error::RTCPeerConnectionIceErrorEvent;
use crate::rtp_transceiver::RTCTrackEvent;

pub const EVENT_TRACK: &str = "track";
pub const EVENT_CONNECTION_STATE_CHANGE: &str = "connectionstatechange";
pub const EVENT_ICE_CANDIDATE: &str = "icecandidate";
pub const EVENT_ICE_CANDIDATE_ERROR: &str = "icecandidateerror";
pub const EVENT_SIGNALING_STATE_CHANGE: &str = "signalingstatechange";
pub const EVENT_ICE_CONNECTION_STATE_CHANGE: &str = "iceconnectionstatechange";
pub const EVENT_ICE_GATHERING_STATE_CHANGE: &str = "icegatheringstatechange";
pub const EVENT_NEGOTIATION_NEEDED: &str = "negotiationneeded";
pub const EVENT_DATA_CHANNEL: &str = "datachannel";

// events of a data channel
pub const EVENT_OPEN: &str = "open";
pub const EVENT_MESSAGE: &str = "message";
pub const EVENT_ERROR: &str = "error";
pub const EVENT_CLOSE: &str = "close";

/// Type-specific payload of an [`Event`].
#[derive(Debug, Clone, Default)]
pub enum EventDetail {
    #[default]
    None,
    /// `None` marks the end of candidate gathering.
    IceCandidate(Option<RTCIceCandidate>),
    IceCandidateError(RTCPeerConnectionIceErrorEvent),
    Track(RTCTrackEvent),
    DataChannel(Arc<RTCDataChannel>),
    Message(RTCDataChannelMessage),
    Error(Error),
}

/// Event is a value handed to listeners. It holds a weak reference to the
/// object that emitted it, so a queued event never keeps its target alive.
#[derive(Clone)]
pub struct Event {
    event_type: SmolStr,
    target: Option<Weak<dyn Any + Send + Sync>>,
    detail: EventDetail,
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("detail", &self.detail)
            .finish()
    }
}

impl Event {
    pub fn new(event_type: &str) -> Self {
        Self::with_detail(event_type, EventDetail::None)
    }

    pub fn with_detail(event_type: &str, detail: EventDetail) -> Self {
        Event {
            event_type: SmolStr::new(event_type),
            target: None,
            detail,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn detail(&self) -> &EventDetail {
        &self.detail
    }

    /// target returns the emitting object, if it is still alive and is a `T`.
    pub fn target<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let target = self.target.as_ref()?.upgrade()?;
        target.downcast::<T>().ok()
    }

    /// candidate returns the candidate of an `icecandidate` event. It is
    /// `None` for the end-of-candidates signal and for other event types.
    pub fn candidate(&self) -> Option<&RTCIceCandidate> {
        match &self.detail {
            EventDetail::IceCandidate(candidate) => candidate.as_ref(),
            _ => None,
        }
    }

    pub fn channel(&self) -> Option<&Arc<RTCDataChannel>> {
        match &self.detail {
            EventDetail::DataChannel(channel) => Some(channel),
            _ => None,
        }
    }

    pub fn track(&self) -> Option<&RTCTrackEvent> {
        match &self.detail {
            EventDetail::Track(track) => Some(track),
            _ => None,
        }
    }

    pub fn ice_error(&self) -> Option<&RTCPeerConnectionIceErrorEvent> {
        match &self.detail {
            EventDetail::IceCandidateError(err) => Some(err),
            _ => None,
        }
    }

    /// message returns the payload of a data channel `message` event.
    pub fn message(&self) -> Option<&RTCDataChannelMessage> {
        match &self.detail {
            EventDetail::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.detail {
            EventDetail::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// EventListener is a shareable listener callable. Two listeners are equal
/// when they are clones of the same registration handle.
#[derive(Clone)]
pub struct EventListener(Arc<dyn Fn(&Event) + Send + Sync>);

impl EventListener {
    pub fn new(f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        EventListener(Arc::new(f))
    }

    fn call(&self, event: &Event) {
        (self.0)(event)
    }
}

impl PartialEq for EventListener {
    fn eq(&self, other: &Self) -> bool {
        // compare the data pointer only, vtables may be duplicated across units
        Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
    }
}

impl Eq for EventListener {}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventListener({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

impl<F> From<F> for EventListener
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        EventListener::new(f)
    }
}

/// LegacyHandlers exposes the `on<type>` handler slots of an object.
pub trait LegacyHandlers: Send + Sync {
    fn handler(&self, event_type: &str) -> Option<EventListener>;
}

struct EventTargetInner {
    listeners: Mutex<HashMap<SmolStr, Vec<EventListener>>>,
    dispatcher: Arc<Dispatcher>,
    handlers: Option<Arc<dyn LegacyHandlers>>,
    owner: Option<Weak<dyn Any + Send + Sync>>,
}

/// EventTarget is the listener registry an object composes to emit events.
/// Every dispatch is posted to its [`Dispatcher`] and runs on a later turn.
#[derive(Clone)]
pub struct EventTarget {
    inner: Arc<EventTargetInner>,
}

impl EventTarget {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        EventTarget {
            inner: Arc::new(EventTargetInner {
                listeners: Mutex::new(HashMap::new()),
                dispatcher,
                handlers: None,
                owner: None,
            }),
        }
    }

    /// Builds a target whose events point back at `owner` and which also
    /// delivers to the `on<type>` slots of `handlers`.
    pub fn with_owner(
        dispatcher: Arc<Dispatcher>,
        owner: Weak<dyn Any + Send + Sync>,
        handlers: Arc<dyn LegacyHandlers>,
    ) -> Self {
        EventTarget {
            inner: Arc::new(EventTargetInner {
                listeners: Mutex::new(HashMap::new()),
                dispatcher,
                handlers: Some(handlers),
                owner: Some(owner),
            }),
        }
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<SmolStr, Vec<EventListener>>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }

    /// add_event_listener registers `listener` for `event_type`. Registering
    /// the same listener twice for one type is a no-op.
    pub fn add_event_listener(&self, event_type: &str, listener: EventListener) {
        let mut listeners = self.listeners();
        let registered = listeners.entry(SmolStr::new(event_type)).or_default();
        if !registered.contains(&listener) {
            registered.push(listener);
        }
    }

    pub fn remove_event_listener(&self, event_type: &str, listener: &EventListener) {
        let mut listeners = self.listeners();
        if let Some(registered) = listeners.get_mut(event_type) {
            registered.retain(|l| l != listener);
            if registered.is_empty() {
                listeners.remove(event_type);
            }
        }
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners().get(event_type).map_or(0, Vec::len)
    }

    /// dispatch_event queues delivery of `event` to the listeners registered
    /// for its type, plus the matching `on<type>` handler.
    pub fn dispatch_event(&self, event: Event) -> Result<()> {
        self.dispatch_event_while(event, || true)
    }

    /// dispatch_event_while is dispatch_event with a gate: `is_open` is
    /// consulted before each listener runs and delivery stops as soon as it
    /// returns false.
    pub fn dispatch_event_while(
        &self,
        mut event: Event,
        is_open: impl Fn() -> bool + Send + 'static,
    ) -> Result<()> {
        if event.target.is_none() {
            event.target = self.inner.owner.clone();
        }

        let target = self.clone();
        self.inner.dispatcher.post(move || target.deliver(&event, is_open))
    }

    fn deliver(&self, event: &Event, is_open: impl Fn() -> bool) {
        let mut snapshot = self
            .listeners()
            .get(event.event_type())
            .cloned()
            .unwrap_or_default();
        if let Some(handler) = self
            .inner
            .handlers
            .as_ref()
            .and_then(|h| h.handler(event.event_type()))
        {
            if !snapshot.contains(&handler) {
                snapshot.push(handler);
            }
        }

        let context = format!("{} listener", event.event_type());
        for listener in snapshot {
            if !is_open() {
                log::trace!("{} dropped, target released", event.event_type());
                return;
            }
            managed(&context, || listener.call(event));
        }
    }
}
