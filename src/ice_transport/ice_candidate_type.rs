idl_enum! {
    /// ICECandidateType represents the type of the ICE candidate used.
    pub enum RTCIceCandidateType {
        /// A candidate obtained by binding to a specific port from an IP address
        /// on the host, see <https://tools.ietf.org/html/rfc8445#section-5.1.1.1>.
        Host = "host",

        /// A binding allocated by a NAT for an ICE agent after it sends a packet
        /// through the NAT to a server such as a STUN server.
        Srflx = "srflx",

        /// A binding allocated by a NAT for an ICE agent after it sends a packet
        /// through the NAT to its peer.
        Prflx = "prflx",

        /// A candidate obtained from a relay server, such as a TURN server.
        Relay = "relay",
    }
}
