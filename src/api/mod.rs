
use std::fmt;
use std::sync::Arc;

use crate::dispatch::Dispatcher;
use crate::engine::WebRtcRsEngine;
use crate::error::Result;
use crate::lifecycle::LifecycleTracker;
use crate::native::NativeEngine;
use crate::peer_connection::configuration::RTCConfigurationInit;
use crate::peer_connection::RTCPeerConnection;

/// API binds a native engine to the dispatch context its connections deliver
/// events on. Connections made by the same API share both.
pub struct API {
    pub(crate) engine: Arc<dyn NativeEngine>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) lifecycle_tracker: Option<LifecycleTracker>,
}

impl fmt::Debug for API {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("API")
            .field("dispatcher", &self.dispatcher)
            .field("lifecycle_tracker", &self.lifecycle_tracker.is_some())
            .finish_non_exhaustive()
    }
}

impl API {
    /// new_peer_connection creates a new PeerConnection with the provided
    /// configuration. Unset fields take their defaults; an invalid
    /// configuration fails before any native object is created.
    pub async fn new_peer_connection(
        &self,
        configuration: RTCConfigurationInit,
    ) -> Result<Arc<RTCPeerConnection>> {
        RTCPeerConnection::new(self, configuration).await
    }

    /// Returns the dispatch context of this API.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn lifecycle_tracker(&self) -> Option<&LifecycleTracker> {
        self.lifecycle_tracker.as_ref()
    }
}

#[derive(Default)]
pub struct APIBuilder {
    engine: Option<Arc<dyn NativeEngine>>,
    dispatcher: Option<Arc<Dispatcher>>,
    lifecycle_tracker: Option<LifecycleTracker>,
}

impl APIBuilder {
    pub fn new() -> Self {
        APIBuilder::default()
    }

    pub fn build(mut self) -> API {
        API {
            engine: if let Some(engine) = self.engine.take() {
                engine
            } else {
                Arc::new(WebRtcRsEngine::new())
            },
            dispatcher: if let Some(dispatcher) = self.dispatcher.take() {
                dispatcher
            } else {
                Dispatcher::global()
            },
            lifecycle_tracker: self.lifecycle_tracker.take(),
        }
    }

    /// with_engine allows providing the native engine connections are built on.
    pub fn with_engine(mut self, engine: Arc<dyn NativeEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// with_dispatcher allows providing an isolated dispatch context. The
    /// process-wide one is used otherwise.
    pub fn with_dispatcher(mut self, dispatcher: Arc<Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// with_lifecycle_tracker registers the native handle of every connection
    /// with `tracker`.
    pub fn with_lifecycle_tracker(mut self, tracker: LifecycleTracker) -> Self {
        self.lifecycle_tracker = Some(tracker);
        self
    }
}
