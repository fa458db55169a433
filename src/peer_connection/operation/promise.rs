use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::callback::managed;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};

/// Success and failure callbacks of the legacy call style. Only one of the
/// two ever runs, on the dispatch context.
pub struct RTCLegacyCallbacks<T> {
    success: Box<dyn FnOnce(T) + Send + 'static>,
    failure: Box<dyn FnOnce(Error) + Send + 'static>,
}

impl<T> RTCLegacyCallbacks<T> {
    pub fn new(
        success: impl FnOnce(T) + Send + 'static,
        failure: impl FnOnce(Error) + Send + 'static,
    ) -> Self {
        RTCLegacyCallbacks {
            success: Box::new(success),
            failure: Box::new(failure),
        }
    }

    fn call(self, result: Result<T>) {
        match result {
            Ok(value) => (self.success)(value),
            Err(err) => (self.failure)(err),
        }
    }
}

impl<T> fmt::Debug for RTCLegacyCallbacks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCLegacyCallbacks").finish_non_exhaustive()
    }
}

/// Promise is the eventual result of an async connection operation. It
/// settles exactly once; operations cut short by `close` reject with
/// `InvalidStateError`.
#[must_use = "a promise does nothing unless awaited"]
pub struct Promise<T> {
    rx: oneshot::Receiver<Result<T>>,
    operation: &'static str,
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("operation", &self.operation)
            .finish()
    }
}

impl<T> Future for Promise<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let operation = self.operation;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(Error::ErrOperationAborted(operation))))
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// A promise that is already rejected with `err`. Legacy callbacks, if
    /// any, still run on a later dispatch turn.
    pub(crate) fn rejected(
        dispatcher: &Arc<Dispatcher>,
        operation: &'static str,
        callbacks: Option<RTCLegacyCallbacks<T>>,
        err: Error,
    ) -> Self {
        let (deferred, promise) = Deferred::new(dispatcher, operation, callbacks);
        deferred.settle(Err(err));
        promise
    }
}

/// Deferred is the settling side of a [`Promise`]. Dropping it unsettled
/// rejects the promise as if the connection had been closed.
pub(crate) struct Deferred<T: Clone + Send + 'static> {
    tx: Option<oneshot::Sender<Result<T>>>,
    callbacks: Option<RTCLegacyCallbacks<T>>,
    dispatcher: Arc<Dispatcher>,
    operation: &'static str,
}

impl<T: Clone + Send + 'static> Deferred<T> {
    pub(crate) fn new(
        dispatcher: &Arc<Dispatcher>,
        operation: &'static str,
        callbacks: Option<RTCLegacyCallbacks<T>>,
    ) -> (Self, Promise<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Deferred {
                tx: Some(tx),
                callbacks,
                dispatcher: Arc::clone(dispatcher),
                operation,
            },
            Promise { rx, operation },
        )
    }

    pub(crate) fn operation(&self) -> &'static str {
        self.operation
    }

    pub(crate) fn resolve(self, value: T) {
        self.settle(Ok(value))
    }

    pub(crate) fn reject(self, err: Error) {
        self.settle(Err(err))
    }

    pub(crate) fn settle(mut self, result: Result<T>) {
        self.settle_inner(result);
    }

    fn settle_inner(&mut self, result: Result<T>) {
        let Some(tx) = self.tx.take() else {
            return;
        };

        if let Some(callbacks) = self.callbacks.take() {
            let r = result.clone();
            let operation = self.operation;
            if let Err(err) = self.dispatcher.post(move || {
                managed(operation, move || callbacks.call(r));
            }) {
                log::warn!("{operation}: legacy callbacks not delivered: {err}");
            }
        }

        // the receiver may be gone if the caller only wanted the callbacks
        let _ = tx.send(result);
    }
}

impl<T: Clone + Send + 'static> Drop for Deferred<T> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            log::trace!("{} dropped before settling", self.operation);
            self.settle_inner(Err(Error::closed(self.operation)));
        }
    }
}
