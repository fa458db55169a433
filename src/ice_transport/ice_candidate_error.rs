use serde::{Deserialize, Serialize};

/// Payload of the `icecandidateerror` event, reported when the native engine
/// fails to reach a STUN or TURN server.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCPeerConnectionIceErrorEvent {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub url: String,
    pub error_code: u16,
    pub error_text: String,
}

impl RTCPeerConnectionIceErrorEvent {
    /// Builds the event from the engine's combined `address:port` host
    /// candidate string, splitting on the first colon.
    ///
    /// IPv6 literals contain colons and are split at the wrong place; the
    /// engine's wire format for them has not been confirmed.
    pub fn from_host_candidate(
        host_candidate: &str,
        url: String,
        error_code: u16,
        error_text: String,
    ) -> Self {
        let (address, port) = match host_candidate.split_once(':') {
            Some((address, port)) => (address, port.parse().ok()),
            None => (host_candidate, None),
        };

        RTCPeerConnectionIceErrorEvent {
            address: if address.is_empty() {
                None
            } else {
                Some(address.to_owned())
            },
            port,
            url,
            error_code,
            error_text,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ice_error_host_candidate_split() {
        let tests = vec![
            ("10.0.0.1:5000", Some("10.0.0.1"), Some(5000)),
            ("10.0.0.1", Some("10.0.0.1"), None),
            ("10.0.0.1:abc", Some("10.0.0.1"), None),
            ("", None, None),
            // first colon wins, even inside an IPv6 literal
            ("fe80::1:5000", Some("fe80"), None),
        ];

        for (host_candidate, address, port) in tests {
            let event = RTCPeerConnectionIceErrorEvent::from_host_candidate(
                host_candidate,
                "stun:stun.example.org".to_owned(),
                701,
                "STUN host lookup received error.".to_owned(),
            );
            assert_eq!(event.address.as_deref(), address, "{host_candidate}");
            assert_eq!(event.port, port, "{host_candidate}");
            assert_eq!(event.error_code, 701);
        }
    }
}
