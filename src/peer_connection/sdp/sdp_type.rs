idl_enum! {
    /// SDPType describes the type of an SessionDescription.
    ///
    /// ## Specifications
    ///
    /// * [MDN]
    /// * [W3C]
    ///
    /// [MDN]: https://developer.mozilla.org/en-US/docs/Web/API/RTCSessionDescription/type
    /// [W3C]: https://w3c.github.io/webrtc-pc/#dom-rtcsessiondescription-type
    pub enum RTCSdpType {
        /// The description is an SDP offer.
        Offer = "offer",

        /// The description is a provisional SDP answer. It may be applied as a
        /// response to an offer, or as an update to a previous pranswer.
        Pranswer = "pranswer",

        /// The description is the final SDP answer and completes the offer-answer
        /// exchange.
        Answer = "answer",

        /// Cancels the current negotiation and moves the offer and answer back to
        /// the previous stable state.
        Rollback = "rollback",
    }
}

impl RTCSdpType {
    /// Whether a description of this type carries SDP which may be
    /// substituted from the last created offer or answer.
    pub(crate) fn reuses_last_sdp(&self) -> bool {
        matches!(
            self,
            RTCSdpType::Offer | RTCSdpType::Answer | RTCSdpType::Pranswer
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sdp_type_reuses_last_sdp() {
        let reusing: Vec<_> = ["offer", "pranswer", "answer", "rollback", ""]
            .into_iter()
            .map(RTCSdpType::from)
            .filter(RTCSdpType::reuses_last_sdp)
            .map(|t| t.to_string())
            .collect();
        assert_eq!(reusing, vec!["offer", "pranswer", "answer"]);
    }

    #[test]
    fn test_sdp_type_rejects_unknown_json() {
        assert!(serde_json::from_str::<RTCSdpType>(r#""bogus""#).is_err());
        assert!(serde_json::from_str::<RTCSdpType>(r#""Unspecified""#).is_err());
        assert_eq!(
            serde_json::from_str::<RTCSdpType>(r#""rollback""#).ok(),
            Some(RTCSdpType::Rollback)
        );
    }
}
