
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Runs `f`, containing any panic it raises. The panic is logged against
/// `context` and swallowed, so code on the far side of a native or dispatch
/// boundary never unwinds.
pub fn managed<F: FnOnce()>(context: &str, f: F) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(panic) => {
            log::error!("{context}: callback panicked: {}", panic_message(&panic));
            false
        }
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// CallbackGate owns the handle that native callbacks are allowed to reach.
///
/// Releasing the gate and checking it share one lock: once `release` has
/// returned, every later `is_open`/`get` observes the gate as closed, so a
/// callback that was already in flight becomes a no-op.
pub struct CallbackGate<T: ?Sized> {
    slot: Mutex<GateState<T>>,
}

enum GateState<T: ?Sized> {
    Pending,
    Open(Arc<T>),
    Released,
}

impl<T: ?Sized> Default for CallbackGate<T> {
    fn default() -> Self {
        CallbackGate {
            slot: Mutex::new(GateState::Pending),
        }
    }
}

impl<T: ?Sized> CallbackGate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateState<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// install opens the gate with `handle`. It returns false, dropping
    /// nothing, if the gate was already released.
    pub fn install(&self, handle: Arc<T>) -> bool {
        let mut slot = self.lock();
        match *slot {
            GateState::Released => false,
            _ => {
                *slot = GateState::Open(handle);
                true
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.lock(), GateState::Open(_))
    }

    pub fn is_released(&self) -> bool {
        matches!(*self.lock(), GateState::Released)
    }

    /// get returns the handle while the gate is open.
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.lock() {
            GateState::Open(handle) => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    /// release closes the gate for good. Only the first call returns the
    /// handle; concurrent and repeated calls get `None`.
    pub fn release(&self) -> Option<Arc<T>> {
        let mut slot = self.lock();
        match std::mem::replace(&mut *slot, GateState::Released) {
            GateState::Open(handle) => Some(handle),
            _ => None,
        }
    }
}
