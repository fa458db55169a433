use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use arc_swap::ArcSwapOption;

use super::*;

fn counter(count: &Arc<AtomicUsize>) -> EventListener {
    let c = Arc::clone(count);
    EventListener::new(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    })
}

#[tokio::test]
async fn test_same_listener_registered_once() -> Result<()> {
    let dispatcher = Dispatcher::new("test_same_listener_registered_once");
    let target = EventTarget::new(Arc::clone(&dispatcher));
    let count = Arc::new(AtomicUsize::new(0));

    let listener = counter(&count);
    target.add_event_listener(EVENT_ICE_CANDIDATE, listener.clone());
    target.add_event_listener(EVENT_ICE_CANDIDATE, listener.clone());
    assert_eq!(target.listener_count(EVENT_ICE_CANDIDATE), 1);

    target.dispatch_event(Event::new(EVENT_ICE_CANDIDATE))?;
    dispatcher.done().await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // a separately built listener is a different registration
    target.add_event_listener(EVENT_ICE_CANDIDATE, counter(&count));
    target.dispatch_event(Event::new(EVENT_ICE_CANDIDATE))?;
    dispatcher.done().await;
    assert_eq!(count.load(Ordering::SeqCst), 3);

    Ok(())
}

#[tokio::test]
async fn test_remove_event_listener() -> Result<()> {
    let dispatcher = Dispatcher::new("test_remove_event_listener");
    let target = EventTarget::new(Arc::clone(&dispatcher));
    let count = Arc::new(AtomicUsize::new(0));

    let listener = counter(&count);
    // removing an absent listener is a no-op
    target.remove_event_listener(EVENT_TRACK, &listener);

    target.add_event_listener(EVENT_TRACK, listener.clone());
    target.add_event_listener(EVENT_DATA_CHANNEL, listener.clone());
    target.remove_event_listener(EVENT_TRACK, &listener);
    assert_eq!(target.listener_count(EVENT_TRACK), 0);
    assert_eq!(target.listener_count(EVENT_DATA_CHANNEL), 1);

    target.dispatch_event(Event::new(EVENT_TRACK))?;
    target.dispatch_event(Event::new(EVENT_DATA_CHANNEL))?;
    dispatcher.done().await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_dispatch_is_deferred() -> Result<()> {
    let dispatcher = Dispatcher::new("test_dispatch_is_deferred");
    let target = EventTarget::new(Arc::clone(&dispatcher));
    let fired = Arc::new(AtomicBool::new(false));

    // hold the dispatch thread so delivery can not race the assertion
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    dispatcher.post(move || {
        let _ = release_rx.recv();
    })?;

    let f = Arc::clone(&fired);
    target.add_event_listener(
        EVENT_NEGOTIATION_NEEDED,
        EventListener::new(move |_| f.store(true, Ordering::SeqCst)),
    );
    target.dispatch_event(Event::new(EVENT_NEGOTIATION_NEEDED))?;
    assert!(!fired.load(Ordering::SeqCst));

    release_tx.send(()).unwrap();
    dispatcher.done().await;
    assert!(fired.load(Ordering::SeqCst));

    Ok(())
}

#[tokio::test]
async fn test_listener_added_during_dispatch_misses_event() -> Result<()> {
    let dispatcher = Dispatcher::new("test_listener_added_during_dispatch");
    let target = EventTarget::new(Arc::clone(&dispatcher));
    let late = Arc::new(AtomicUsize::new(0));

    let t = target.clone();
    let l = Arc::clone(&late);
    target.add_event_listener(
        EVENT_ICE_CANDIDATE,
        EventListener::new(move |_| {
            t.add_event_listener(EVENT_ICE_CANDIDATE, counter(&l));
        }),
    );

    target.dispatch_event(Event::new(EVENT_ICE_CANDIDATE))?;
    dispatcher.done().await;
    assert_eq!(late.load(Ordering::SeqCst), 0);
    assert_eq!(target.listener_count(EVENT_ICE_CANDIDATE), 2);

    Ok(())
}

#[tokio::test]
async fn test_panicking_listener_does_not_stop_delivery() -> Result<()> {
    let dispatcher = Dispatcher::new("test_panicking_listener");
    let target = EventTarget::new(Arc::clone(&dispatcher));
    let count = Arc::new(AtomicUsize::new(0));

    target.add_event_listener(EVENT_TRACK, counter(&count));
    target.add_event_listener(
        EVENT_TRACK,
        EventListener::new(|_| panic!("listener failure")),
    );
    target.add_event_listener(EVENT_TRACK, counter(&count));

    target.dispatch_event(Event::new(EVENT_TRACK))?;
    target.dispatch_event(Event::new(EVENT_TRACK))?;
    dispatcher.done().await;
    assert_eq!(count.load(Ordering::SeqCst), 4);

    Ok(())
}

#[derive(Default)]
struct Slots {
    on_icecandidate: ArcSwapOption<EventListener>,
}

impl LegacyHandlers for Slots {
    fn handler(&self, event_type: &str) -> Option<EventListener> {
        match event_type {
            EVENT_ICE_CANDIDATE => self.on_icecandidate.load_full().map(|h| (*h).clone()),
            _ => None,
        }
    }
}

#[tokio::test]
async fn test_legacy_handler_not_duplicated() -> Result<()> {
    let dispatcher = Dispatcher::new("test_legacy_handler_not_duplicated");
    let slots = Arc::new(Slots::default());
    let owner: Arc<dyn Any + Send + Sync> = Arc::new(7u32);
    let target = EventTarget::with_owner(
        Arc::clone(&dispatcher),
        Arc::downgrade(&owner),
        Arc::clone(&slots) as Arc<dyn LegacyHandlers>,
    );
    let count = Arc::new(AtomicUsize::new(0));

    let handler = counter(&count);
    slots.on_icecandidate.store(Some(Arc::new(handler.clone())));
    target.dispatch_event(Event::new(EVENT_ICE_CANDIDATE))?;
    dispatcher.done().await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // the same callable as both listener and handler fires once
    target.add_event_listener(EVENT_ICE_CANDIDATE, handler);
    target.dispatch_event(Event::new(EVENT_ICE_CANDIDATE))?;
    dispatcher.done().await;
    assert_eq!(count.load(Ordering::SeqCst), 2);

    slots.on_icecandidate.store(None);
    target.dispatch_event(Event::new(EVENT_ICE_CANDIDATE))?;
    dispatcher.done().await;
    assert_eq!(count.load(Ordering::SeqCst), 3);

    Ok(())
}

#[tokio::test]
async fn test_event_target_points_at_owner() -> Result<()> {
    let dispatcher = Dispatcher::new("test_event_target_points_at_owner");
    let owner: Arc<dyn Any + Send + Sync> = Arc::new(String::from("owner"));
    let target = EventTarget::with_owner(
        Arc::clone(&dispatcher),
        Arc::downgrade(&owner),
        Arc::new(Slots::default()),
    );
    let seen = Arc::new(Mutex::new(None));

    let s = Arc::clone(&seen);
    target.add_event_listener(
        EVENT_DATA_CHANNEL,
        EventListener::new(move |event| {
            *s.lock().unwrap() = event.target::<String>().map(|t| (*t).clone());
            assert!(event.target::<u32>().is_none());
        }),
    );
    target.dispatch_event(Event::new(EVENT_DATA_CHANNEL))?;
    dispatcher.done().await;

    assert_eq!(seen.lock().unwrap().as_deref(), Some("owner"));

    Ok(())
}

#[tokio::test]
async fn test_dispatch_while_stops_when_gate_closes() -> Result<()> {
    let dispatcher = Dispatcher::new("test_dispatch_while_stops");
    let target = EventTarget::new(Arc::clone(&dispatcher));
    let open = Arc::new(AtomicBool::new(true));
    let count = Arc::new(AtomicUsize::new(0));

    // the first listener closes the gate, the second must not run
    let o = Arc::clone(&open);
    let c = Arc::clone(&count);
    target.add_event_listener(
        EVENT_ICE_CANDIDATE,
        EventListener::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            o.store(false, Ordering::SeqCst);
        }),
    );
    target.add_event_listener(EVENT_ICE_CANDIDATE, counter(&count));

    let o = Arc::clone(&open);
    target.dispatch_event_while(Event::new(EVENT_ICE_CANDIDATE), move || {
        o.load(Ordering::SeqCst)
    })?;
    let o = Arc::clone(&open);
    target.dispatch_event_while(Event::new(EVENT_ICE_CANDIDATE), move || {
        o.load(Ordering::SeqCst)
    })?;
    dispatcher.done().await;

    assert_eq!(count.load(Ordering::SeqCst), 1);

    Ok(())
}
