use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use portable_atomic::AtomicBool;

use super::MockPeerConnection;
use crate::error::{Error, Result};
use crate::native::{NativeEngine, NativeObserver, NativePeerConnection};
use crate::peer_connection::configuration::RTCConfiguration;

/// MockEngine hands out [`MockPeerConnection`]s and keeps every one it made.
#[derive(Default)]
pub struct MockEngine {
    connections: Mutex<Vec<Arc<MockPeerConnection>>>,
    fail_next_create: AtomicBool,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(MockEngine::default())
    }

    /// connections lists every connection created so far, oldest first.
    pub fn connections(&self) -> Vec<Arc<MockPeerConnection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// last returns the most recently created connection.
    pub fn last(&self) -> Option<Arc<MockPeerConnection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Makes the next create_peer_connection fail.
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NativeEngine for MockEngine {
    async fn create_peer_connection(
        &self,
        configuration: &RTCConfiguration,
        observer: Arc<dyn NativeObserver>,
    ) -> Result<Arc<dyn NativePeerConnection>> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(Error::ErrNative(
                "mock engine refused to create a connection".to_owned(),
            ));
        }

        let mut connections = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let pc = Arc::new(MockPeerConnection::new(
            connections.len() as u64 + 1,
            configuration.clone(),
            observer,
        ));
        connections.push(Arc::clone(&pc));

        Ok(pc)
    }
}
