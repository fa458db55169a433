//! A scripted in-memory engine for exercising the facade without a network.
//! Callbacks are emitted from freshly spawned threads, the way a real engine
//! reports from its own worker threads.

pub mod mock_data_channel;
pub mod mock_engine;
pub mod mock_peer_connection;

pub use mock_data_channel::MockDataChannel;
pub use mock_engine::MockEngine;
pub use mock_peer_connection::{
    MockPeerConnection, MockRtpReceiver, MockRtpSender, MockRtpTransceiver,
};
