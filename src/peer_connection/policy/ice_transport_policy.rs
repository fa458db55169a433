idl_enum! {
    /// ICETransportPolicy defines the ICE candidate policy surface the
    /// permitted candidates. Only these candidates are used for connectivity checks.
    pub enum RTCIceTransportPolicy {
        /// Any type of candidate may be used.
        All = "all",

        /// Only media relay candidates such as candidates passing through a TURN
        /// server are used.
        Relay = "relay",
    }
}
