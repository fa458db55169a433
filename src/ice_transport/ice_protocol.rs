idl_enum! {
    /// RTCIceProtocol indicates the transport protocol type that is used in the
    /// ice.URL structure.
    pub enum RTCIceProtocol {
        Udp = "udp",
        Tcp = "tcp",
    }
}

impl RTCIceProtocol {
    /// Reads the transport token of a candidate line, which is case-insensitive.
    pub(crate) fn from_candidate_token(token: &str) -> Self {
        RTCIceProtocol::from(token.to_ascii_lowercase().as_str())
    }
}
