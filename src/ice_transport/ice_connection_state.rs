idl_enum! {
    /// RTCIceConnectionState indicates signaling state of the ICE Connection.
    pub enum RTCIceConnectionState {
        New = "new",
        Checking = "checking",
        Connected = "connected",
        Completed = "completed",
        Disconnected = "disconnected",
        Failed = "failed",
        Closed = "closed",
    }
}

impl RTCIceConnectionState {
    /// Whether the connection has a working candidate pair.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            RTCIceConnectionState::Connected | RTCIceConnectionState::Completed
        )
    }
}
