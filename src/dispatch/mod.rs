
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use portable_atomic::AtomicUsize;
use tokio::sync::mpsc;
use waitgroup::WaitGroup;

use crate::callback::managed;
use crate::error::{Error, Result};

/// Task is a unit of work run on the dispatch thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

lazy_static! {
    static ref GLOBAL_DISPATCHER: Arc<Dispatcher> = Dispatcher::new("rtc-dispatch");
}

/// Dispatcher is the single logical thread on which events are delivered and
/// legacy callbacks run. Tasks run one at a time, in the order they were
/// posted, each to completion before the next starts. A task that panics is
/// logged and does not take the thread down.
pub struct Dispatcher {
    name: String,
    length: Arc<AtomicUsize>,
    tasks_tx: Mutex<Option<mpsc::UnboundedSender<Task>>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("length", &self.len())
            .finish()
    }
}

impl Dispatcher {
    /// Starts a dispatch thread for an isolated execution context.
    pub fn new(name: &str) -> Arc<Self> {
        let length = Arc::new(AtomicUsize::new(0));
        let (tasks_tx, tasks_rx) = mpsc::unbounded_channel();

        let l = Arc::clone(&length);
        let thread_name = name.to_owned();
        let spawned = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || Dispatcher::start(thread_name, l, tasks_rx));
        let tasks_tx = match spawned {
            Ok(_) => Some(tasks_tx),
            Err(err) => {
                log::error!("failed to spawn dispatch thread {name}: {err}");
                None
            }
        };

        Arc::new(Dispatcher {
            name: name.to_owned(),
            length,
            tasks_tx: Mutex::new(tasks_tx),
        })
    }

    /// The process-wide dispatch context.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_DISPATCHER)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// post queues `task` behind everything already posted. It never runs
    /// `task` inline, even when called from the dispatch thread itself.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> Result<()> {
        let tasks_tx = self.tasks_tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tasks_tx) = tasks_tx.as_ref() else {
            return Err(Error::ErrDispatcherClosed);
        };

        self.length.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = tasks_tx.send(Box::new(task)) {
            self.length.fetch_sub(1, Ordering::SeqCst);
            return Err(err.into());
        }

        Ok(())
    }

    /// len returns the number of tasks waiting to run
    pub fn len(&self) -> usize {
        self.length.load(Ordering::SeqCst)
    }

    /// is_empty checks if there are tasks in the queue
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// done waits until every task posted before the call has run.
    pub async fn done(&self) {
        let wg = WaitGroup::new();
        let w = wg.worker();
        if self
            .post(move || {
                drop(w);
            })
            .is_err()
        {
            return;
        }
        wg.wait().await;
    }

    /// close stops accepting tasks. Tasks already queued still run.
    pub fn close(&self) {
        let mut tasks_tx = self.tasks_tx.lock().unwrap_or_else(PoisonError::into_inner);
        tasks_tx.take();
    }

    fn start(name: String, length: Arc<AtomicUsize>, mut tasks_rx: mpsc::UnboundedReceiver<Task>) {
        log::trace!("dispatch thread {name} started");
        while let Some(task) = tasks_rx.blocking_recv() {
            length.fetch_sub(1, Ordering::SeqCst);
            managed(&name, task);
        }
        log::trace!("dispatch thread {name} exited");
    }
}
