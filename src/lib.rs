#![warn(rust_2018_idioms)]
#![allow(dead_code)]

// re-export the engine crate the default backend is built on
pub use webrtc;

#[macro_use]
mod macros;

pub mod api;
pub mod callback;
pub mod data_channel;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod ice_transport;
pub mod lifecycle;
pub mod native;
pub mod peer_connection;
pub mod rtp_transceiver;
pub mod stats;

pub use error::Error;

#[macro_use]
extern crate lazy_static;

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";
