use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ice_transport::ice_candidate_type::RTCIceCandidateType;
use crate::ice_transport::ice_protocol::RTCIceProtocol;

lazy_static! {
    static ref CANDIDATE_LINE: Regex = Regex::new(
        r"^(?:a=)?candidate:(\S+) (\d+) (\S+) (\d+) (\S+) (\d+) typ (\S+)(.*)$"
    )
    .unwrap();
}

/// ICECandidateInit is used to serialize ice candidates
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCIceCandidateInit {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
    pub username_fragment: Option<String>,
}

/// ICECandidate is an immutable snapshot of a single ICE candidate. Every
/// attribute is present in its serialized form; attributes the source did not
/// provide serialize as `null`.
///
/// ## Specifications
///
/// * [MDN]
/// * [W3C]
///
/// [MDN]: https://developer.mozilla.org/en-US/docs/Web/API/RTCIceCandidate
/// [W3C]: https://w3c.github.io/webrtc-pc/#rtcicecandidate-interface
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCIceCandidate {
    candidate: Option<String>,
    sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    sdp_mline_index: Option<u16>,
    foundation: Option<String>,
    component: Option<u16>,
    priority: Option<u32>,
    address: Option<String>,
    protocol: Option<RTCIceProtocol>,
    port: Option<u16>,
    #[serde(rename = "type")]
    typ: Option<RTCIceCandidateType>,
    tcp_type: Option<String>,
    related_address: Option<String>,
    related_port: Option<u16>,
    username_fragment: Option<String>,
}

impl RTCIceCandidate {
    /// Copies the initializer. Attributes only carried inside the candidate
    /// line stay null.
    pub fn new(init: RTCIceCandidateInit) -> Self {
        RTCIceCandidate {
            candidate: Some(init.candidate),
            sdp_mid: init.sdp_mid,
            sdp_mline_index: init.sdp_mline_index,
            username_fragment: init.username_fragment,
            ..Default::default()
        }
    }

    /// Copies the initializer and fills the remaining attributes from the
    /// candidate line. A line that does not parse leaves them null.
    pub fn parse(init: RTCIceCandidateInit) -> Self {
        let mut c = RTCIceCandidate::new(init);
        let line = c.candidate.as_deref().unwrap_or_default();
        let Some(caps) = CANDIDATE_LINE.captures(line) else {
            return c;
        };

        let foundation = caps[1].to_owned();
        let component = caps[2].parse().ok();
        let protocol = RTCIceProtocol::from_candidate_token(&caps[3]);
        let priority = caps[4].parse().ok();
        let address = caps[5].to_owned();
        let port = caps[6].parse().ok();
        let typ = RTCIceCandidateType::from(&caps[7]);
        let rest = caps[8].to_owned();

        c.foundation = Some(foundation);
        c.component = component;
        c.protocol = Some(protocol).filter(|p| *p != RTCIceProtocol::Unspecified);
        c.priority = priority;
        c.address = Some(address);
        c.port = port;
        c.typ = Some(typ).filter(|t| *t != RTCIceCandidateType::Unspecified);

        let mut tokens = rest.split_whitespace();
        while let (Some(key), Some(value)) = (tokens.next(), tokens.next()) {
            match key {
                "raddr" => c.related_address = Some(value.to_owned()),
                "rport" => c.related_port = value.parse().ok(),
                "tcptype" => c.tcp_type = Some(value.to_owned()),
                "ufrag" if c.username_fragment.is_none() => {
                    c.username_fragment = Some(value.to_owned())
                }
                _ => {}
            }
        }

        c
    }

    pub fn candidate(&self) -> Option<&str> {
        self.candidate.as_deref()
    }

    pub fn sdp_mid(&self) -> Option<&str> {
        self.sdp_mid.as_deref()
    }

    pub fn sdp_mline_index(&self) -> Option<u16> {
        self.sdp_mline_index
    }

    pub fn foundation(&self) -> Option<&str> {
        self.foundation.as_deref()
    }

    pub fn component(&self) -> Option<u16> {
        self.component
    }

    pub fn priority(&self) -> Option<u32> {
        self.priority
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn protocol(&self) -> Option<RTCIceProtocol> {
        self.protocol
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn typ(&self) -> Option<RTCIceCandidateType> {
        self.typ
    }

    pub fn tcp_type(&self) -> Option<&str> {
        self.tcp_type.as_deref()
    }

    pub fn related_address(&self) -> Option<&str> {
        self.related_address.as_deref()
    }

    pub fn related_port(&self) -> Option<u16> {
        self.related_port
    }

    pub fn username_fragment(&self) -> Option<&str> {
        self.username_fragment.as_deref()
    }

    /// to_json returns an ICECandidateInit
    /// as defined by W3C <https://w3c.github.io/webrtc-pc/#dom-rtcicecandidate-tojson>
    pub fn to_json(&self) -> RTCIceCandidateInit {
        RTCIceCandidateInit {
            candidate: self.candidate.clone().unwrap_or_default(),
            sdp_mid: self.sdp_mid.clone(),
            sdp_mline_index: self.sdp_mline_index,
            username_fragment: self.username_fragment.clone(),
        }
    }
}

impl From<&RTCIceCandidate> for RTCIceCandidateInit {
    fn from(c: &RTCIceCandidate) -> Self {
        c.to_json()
    }
}

impl fmt::Display for RTCIceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}:{}",
            self.protocol.unwrap_or_default(),
            self.typ.unwrap_or_default(),
            self.address.as_deref().unwrap_or_default(),
            self.port.unwrap_or_default(),
        )
    }
}
