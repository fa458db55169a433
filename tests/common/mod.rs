#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rtc_bridge::api::APIBuilder;
use rtc_bridge::dispatch::Dispatcher;
use rtc_bridge::event::{Event, EventListener};
use rtc_bridge::lifecycle::LifecycleTracker;
use rtc_bridge::native::mock::{MockEngine, MockPeerConnection};
use rtc_bridge::native::NativeEngine;
use rtc_bridge::peer_connection::configuration::RTCConfigurationInit;
use rtc_bridge::peer_connection::RTCPeerConnection;

pub fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

/// One connection over the mock engine, on its own dispatch thread.
pub struct Harness {
    pub pc: Arc<RTCPeerConnection>,
    pub mock: Arc<MockPeerConnection>,
    pub engine: Arc<MockEngine>,
    pub dispatcher: Arc<Dispatcher>,
    pub tracker: LifecycleTracker,
}

pub async fn harness(name: &str) -> Harness {
    harness_with(name, RTCConfigurationInit::default()).await
}

pub async fn harness_with(name: &str, configuration: RTCConfigurationInit) -> Harness {
    init_logger();

    let engine = MockEngine::new();
    let dispatcher = Dispatcher::new(name);
    let tracker = LifecycleTracker::new();
    let api = APIBuilder::new()
        .with_engine(Arc::clone(&engine) as Arc<dyn NativeEngine>)
        .with_dispatcher(Arc::clone(&dispatcher))
        .with_lifecycle_tracker(tracker.clone())
        .build();

    let pc = api
        .new_peer_connection(configuration)
        .await
        .expect("mock engine creates connections");
    let mock = engine.last().expect("connection was created");

    Harness {
        pc,
        mock,
        engine,
        dispatcher,
        tracker,
    }
}

/// EventLog records the type of every event its listener sees, plus the
/// events themselves for inspection.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog::default()
    }

    pub fn listener(&self) -> EventListener {
        let events = Arc::clone(&self.events);
        EventListener::new(move |event| {
            events.lock().unwrap().push(event.clone());
        })
    }

    pub fn types(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.event_type().to_owned())
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

/// Blocks the dispatch thread until the returned sender is dropped or
/// signalled, so that events pile up behind it.
pub fn block_dispatcher(dispatcher: &Dispatcher) -> std::sync::mpsc::Sender<()> {
    let (tx, rx) = std::sync::mpsc::channel::<()>();
    dispatcher
        .post(move || {
            let _ = rx.recv();
        })
        .expect("dispatcher accepts tasks");
    tx
}

pub const ALL_EVENTS: [&str; 9] = [
    rtc_bridge::event::EVENT_TRACK,
    rtc_bridge::event::EVENT_CONNECTION_STATE_CHANGE,
    rtc_bridge::event::EVENT_ICE_CANDIDATE,
    rtc_bridge::event::EVENT_ICE_CANDIDATE_ERROR,
    rtc_bridge::event::EVENT_SIGNALING_STATE_CHANGE,
    rtc_bridge::event::EVENT_ICE_CONNECTION_STATE_CHANGE,
    rtc_bridge::event::EVENT_ICE_GATHERING_STATE_CHANGE,
    rtc_bridge::event::EVENT_NEGOTIATION_NEEDED,
    rtc_bridge::event::EVENT_DATA_CHANNEL,
];
