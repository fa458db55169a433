//! Native engines the facade can drive.

pub mod webrtc_rs;

pub use webrtc_rs::WebRtcRsEngine;
