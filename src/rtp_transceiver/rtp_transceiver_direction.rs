idl_enum! {
    /// RTCRtpTransceiverDirection indicates the direction of the RTCRtpTransceiver.
    pub enum RTCRtpTransceiverDirection {
        /// Sendrecv indicates the sender will offer to send RTP and the
        /// receiver will offer to receive RTP.
        Sendrecv = "sendrecv",
        /// Sendonly indicates the sender will offer to send RTP.
        Sendonly = "sendonly",
        /// Recvonly indicates the receiver will offer to receive RTP.
        Recvonly = "recvonly",
        /// Inactive indicates neither half will offer RTP.
        Inactive = "inactive",
    }
}

impl RTCRtpTransceiverDirection {
    pub fn has_send(&self) -> bool {
        matches!(self, Self::Sendrecv | Self::Sendonly)
    }

    pub fn has_recv(&self) -> bool {
        matches!(self, Self::Sendrecv | Self::Recvonly)
    }
}
