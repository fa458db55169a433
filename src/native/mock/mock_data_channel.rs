use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use async_trait::async_trait;
use bytes::Bytes;
use portable_atomic::AtomicU8;

use crate::data_channel::data_channel_init::RTCDataChannelInit;
use crate::data_channel::data_channel_state::RTCDataChannelState;
use crate::error::{Error, Result};
use crate::native::{NativeDataChannel, NativeDataChannelObserver};

/// MockDataChannel records what is sent on it instead of transmitting.
/// Like the mock connection it reports through its observer from a freshly
/// spawned thread.
pub struct MockDataChannel {
    label: String,
    id: Option<u16>,
    protocol: String,
    ordered: bool,
    ready_state: AtomicU8,
    sent: Mutex<Vec<Bytes>>,
    observer: Mutex<Option<Arc<dyn NativeDataChannelObserver>>>,
}

impl MockDataChannel {
    pub fn new(label: &str, id: Option<u16>, init: &RTCDataChannelInit) -> Self {
        MockDataChannel {
            label: label.to_owned(),
            id,
            protocol: init.protocol.clone().unwrap_or_default(),
            ordered: init.ordered.unwrap_or(true),
            ready_state: AtomicU8::new(RTCDataChannelState::Connecting as u8),
            sent: Mutex::new(vec![]),
            observer: Mutex::new(None),
        }
    }

    pub fn has_observer(&self) -> bool {
        self.observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// emit runs `f` against the observer on a new thread and waits for it.
    /// Nothing happens while no observer is registered.
    pub fn emit(&self, f: impl FnOnce(&dyn NativeDataChannelObserver) + Send + 'static) {
        let observer = self
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(observer) = observer else {
            log::debug!("mock data channel {} has no observer", self.label);
            return;
        };
        let emitter = thread::spawn(move || f(observer.as_ref()));
        if emitter.join().is_err() {
            log::error!("mock data channel emitter thread panicked");
        }
    }

    pub fn emit_open(&self) {
        self.set_ready_state(RTCDataChannelState::Open);
        self.emit(|observer| observer.on_open());
    }

    pub fn emit_message(&self, data: &[u8], is_string: bool) {
        let data = Bytes::copy_from_slice(data);
        self.emit(move |observer| observer.on_message(data, is_string));
    }

    pub fn emit_error(&self, error_text: &str) {
        let error_text = error_text.to_owned();
        self.emit(move |observer| observer.on_error(error_text));
    }

    /// Closes the channel the way the remote peer would.
    pub fn emit_close(&self) {
        self.set_ready_state(RTCDataChannelState::Closed);
        self.emit(|observer| observer.on_close());
    }

    pub fn set_ready_state(&self, state: RTCDataChannelState) {
        self.ready_state.store(state as u8, Ordering::SeqCst);
    }

    /// sent returns every message sent so far, text messages as UTF-8.
    pub fn sent(&self) -> Vec<Bytes> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, data: Bytes) -> Result<usize> {
        if self.ready_state() != RTCDataChannelState::Open {
            return Err(Error::ErrNative(format!(
                "data channel {} is {}",
                self.label,
                self.ready_state()
            )));
        }
        let n = data.len();
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data);
        Ok(n)
    }
}

#[async_trait]
impl NativeDataChannel for MockDataChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn id(&self) -> Option<u16> {
        self.id
    }

    fn protocol(&self) -> String {
        self.protocol.clone()
    }

    fn ordered(&self) -> bool {
        self.ordered
    }

    fn ready_state(&self) -> RTCDataChannelState {
        self.ready_state.load(Ordering::SeqCst).into()
    }

    async fn buffered_amount(&self) -> usize {
        0
    }

    async fn send(&self, data: &Bytes) -> Result<usize> {
        self.record(data.clone())
    }

    async fn send_text(&self, text: String) -> Result<usize> {
        self.record(Bytes::from(text))
    }

    async fn close(&self) -> Result<()> {
        self.set_ready_state(RTCDataChannelState::Closed);
        Ok(())
    }

    fn register_observer(&self, observer: Arc<dyn NativeDataChannelObserver>) {
        *self.observer.lock().unwrap_or_else(PoisonError::into_inner) = Some(observer);
        if self.ready_state() == RTCDataChannelState::Open {
            self.emit(|observer| observer.on_open());
        }
    }
}
