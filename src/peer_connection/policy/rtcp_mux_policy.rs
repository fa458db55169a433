idl_enum! {
    /// RTCPMuxPolicy affects what ICE candidates are gathered to support
    /// non-multiplexed RTCP. Fixed for the lifetime of a connection.
    pub enum RTCRtcpMuxPolicy {
        /// Gather ICE candidates for both RTP and RTCP candidates. If the remote
        /// endpoint is capable of multiplexing RTCP, multiplex RTCP on the RTP
        /// candidates. If it is not, use both the RTP and RTCP candidates separately.
        Negotiate = "negotiate",

        /// Gather ICE candidates only for RTP and multiplex RTCP on the RTP
        /// candidates. If the remote endpoint is not capable of rtcp-mux, session
        /// negotiation will fail.
        Require = "require",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rtcp_mux_policy_json() {
        let policy: RTCRtcpMuxPolicy = serde_json::from_str(r#""negotiate""#).unwrap();
        assert_eq!(policy, RTCRtcpMuxPolicy::Negotiate);
        assert!(serde_json::from_str::<RTCRtcpMuxPolicy>(r#""sometimes""#).is_err());
    }
}
