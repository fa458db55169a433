use std::time::Duration;

use tokio::time::timeout;

use super::*;
use crate::error::Result;

#[tokio::test]
async fn test_lifecycle_register_and_drop() -> Result<()> {
    let tracker = LifecycleTracker::new();

    let a = tracker.register("peer_connection");
    let b = tracker.register("data_channel");
    assert_ne!(a.id(), b.id());
    assert!(tracker.is_live(a.id()));
    assert_eq!(
        tracker.live(),
        vec![
            (a.id(), SmolStr::new("peer_connection")),
            (b.id(), SmolStr::new("data_channel")),
        ]
    );

    let a_id = a.id();
    drop(a);
    assert!(!tracker.is_live(a_id));
    assert_eq!(tracker.stop(), vec![(b.id(), SmolStr::new("data_channel"))]);

    drop(b);
    assert!(tracker.stop().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_lifecycle_destructor_fires_after_drop() -> Result<()> {
    let tracker = LifecycleTracker::new();
    let guard = tracker.register("peer_connection");
    let id = guard.id();

    let t = tracker.clone();
    let waiter = tokio::spawn(async move { t.destructor(id).await });

    // other handles coming and going do not wake the waiter for good
    drop(tracker.register("other"));
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    drop(guard);
    assert!(timeout(Duration::from_secs(5), waiter).await.is_ok());

    // already torn down
    assert!(timeout(Duration::from_secs(5), tracker.destructor(id))
        .await
        .is_ok());

    Ok(())
}
