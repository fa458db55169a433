
mod promise;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};

use portable_atomic::AtomicUsize;
pub use promise::{Promise, RTCLegacyCallbacks};
pub(crate) use promise::Deferred;
use tokio::sync::mpsc;
use waitgroup::WaitGroup;

use crate::error::{Error, Result};

/// Operation is a one-shot unit of async work run by [`Operations`].
pub struct Operation(
    pub Box<dyn (FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send>,
    pub &'static str,
);

impl Operation {
    pub(crate) fn new(
        op: impl FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> + Send + 'static,
        description: &'static str,
    ) -> Self {
        Self(Box::new(op), description)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Operation")
            .field(&"_")
            .field(&self.1)
            .finish()
    }
}

/// Operations runs the async operations of one connection strictly one after
/// another. Closing it drops the running operation and everything still
/// queued; whatever they captured is dropped with them.
pub(crate) struct Operations {
    length: Arc<AtomicUsize>,
    ops_tx: Mutex<Option<mpsc::UnboundedSender<Operation>>>,
    close_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl Operations {
    /// Must be called within a tokio runtime.
    pub(crate) fn new() -> Self {
        let length = Arc::new(AtomicUsize::new(0));
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = mpsc::channel(1);
        let l = Arc::clone(&length);
        tokio::spawn(async move {
            Operations::start(l, ops_rx, close_rx).await;
        });

        Operations {
            length,
            ops_tx: Mutex::new(Some(ops_tx)),
            close_tx: Mutex::new(Some(close_tx)),
        }
    }

    /// enqueue adds a new operation behind the ones already queued.
    pub(crate) fn enqueue(&self, op: Operation) -> Result<()> {
        let ops_tx = self.ops_tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(ops_tx) = ops_tx.as_ref() else {
            return Err(Error::ErrConnectionClosed { operation: op.1 });
        };

        self.length.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = ops_tx.send(op) {
            self.length.fetch_sub(1, Ordering::SeqCst);
            return Err(err.into());
        }

        Ok(())
    }

    /// is_empty checks if there are tasks in the queue
    pub(crate) fn is_empty(&self) -> bool {
        self.length.load(Ordering::SeqCst) == 0
    }

    /// done blocks until all currently enqueued operations are finished
    /// executing, or until the chain is closed.
    pub(crate) async fn done(&self) {
        let wg = WaitGroup::new();
        let w = wg.worker();
        let _ = self.enqueue(Operation::new(
            move || {
                drop(w);
                Box::pin(async {})
            },
            "Operation::done",
        ));
        wg.wait().await;
    }

    async fn start(
        length: Arc<AtomicUsize>,
        mut ops_rx: mpsc::UnboundedReceiver<Operation>,
        mut close_rx: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = close_rx.recv() => {
                    break;
                }
                result = ops_rx.recv() => {
                    let Some(op) = result else {
                        break;
                    };
                    length.fetch_sub(1, Ordering::SeqCst);
                    let description = op.1;
                    tokio::select! {
                        biased;
                        _ = close_rx.recv() => {
                            log::trace!("operation {description} dropped by close");
                            break;
                        }
                        _ = (op.0)() => {}
                    }
                }
            }
        }
        length.store(0, Ordering::SeqCst);
    }

    /// close stops the chain. It does not wait for the running operation.
    pub(crate) fn close(&self) {
        self.ops_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(close_tx) = self
            .close_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = close_tx.try_send(());
        }
    }
}
