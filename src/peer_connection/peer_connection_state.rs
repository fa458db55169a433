idl_enum! {
    /// Indicates the state of the [`RTCPeerConnection`] as a whole, aggregated
    /// by the native engine over its ICE and DTLS transports.
    ///
    /// [`RTCPeerConnection`]: crate::peer_connection::RTCPeerConnection
    pub enum RTCPeerConnectionState {
        New = "new",
        Connecting = "connecting",
        Connected = "connected",
        Disconnected = "disconnected",
        Failed = "failed",
        Closed = "closed",
    }
}
