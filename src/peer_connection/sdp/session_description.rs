use serde::{Deserialize, Serialize};

use super::sdp_type::RTCSdpType;
use crate::error::{Error, Result};

/// Initializer for [`RTCSessionDescription`], as accepted by
/// `set_local_description`/`set_remote_description`.
///
/// A missing `sdp` deserializes to the empty string.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCSessionDescriptionInit {
    #[serde(rename = "type")]
    pub sdp_type: RTCSdpType,

    #[serde(default)]
    pub sdp: String,
}

impl RTCSessionDescriptionInit {
    pub fn rollback() -> Self {
        RTCSessionDescriptionInit {
            sdp_type: RTCSdpType::Rollback,
            sdp: String::new(),
        }
    }
}

/// SessionDescription is an immutable snapshot of a local or remote session
/// description. Every read of a description property produces a new one.
///
/// ## Specifications
///
/// * [W3C]
///
/// [W3C]: https://w3c.github.io/webrtc-pc/#rtcsessiondescription-class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCSessionDescription {
    #[serde(rename = "type")]
    sdp_type: RTCSdpType,

    sdp: String,
}

impl RTCSessionDescription {
    /// Copies the initializer. Fails with a TypeError when no type was given.
    pub fn new(init: RTCSessionDescriptionInit) -> Result<Self> {
        if init.sdp_type == RTCSdpType::Unspecified {
            return Err(Error::ErrSDPTypeInvalidValue(init.sdp_type.to_string()));
        }
        Ok(RTCSessionDescription {
            sdp_type: init.sdp_type,
            sdp: init.sdp,
        })
    }

    /// Given SDP representing an offer, wrap it in an RTCSessionDescription.
    pub fn offer(sdp: String) -> Self {
        RTCSessionDescription {
            sdp_type: RTCSdpType::Offer,
            sdp,
        }
    }

    /// Given SDP representing an answer, wrap it in an RTCSessionDescription.
    pub fn answer(sdp: String) -> Self {
        RTCSessionDescription {
            sdp_type: RTCSdpType::Answer,
            sdp,
        }
    }

    /// Given SDP representing a provisional answer, wrap it in an RTCSessionDescription.
    pub fn pranswer(sdp: String) -> Self {
        RTCSessionDescription {
            sdp_type: RTCSdpType::Pranswer,
            sdp,
        }
    }

    pub fn sdp_type(&self) -> RTCSdpType {
        self.sdp_type
    }

    pub fn sdp(&self) -> &str {
        &self.sdp
    }

    /// has_ice_option reports whether an `a=ice-options` line of the
    /// description lists `option`.
    pub fn has_ice_option(&self, option: &str) -> bool {
        self.sdp
            .lines()
            .filter_map(|line| line.trim_end().strip_prefix("a=ice-options:"))
            .flat_map(str::split_whitespace)
            .any(|token| token == option)
    }

    /// to_json returns the `{sdp, type}` initializer this description was built from.
    pub fn to_json(&self) -> RTCSessionDescriptionInit {
        RTCSessionDescriptionInit {
            sdp_type: self.sdp_type,
            sdp: self.sdp.clone(),
        }
    }
}

impl From<RTCSessionDescription> for RTCSessionDescriptionInit {
    fn from(desc: RTCSessionDescription) -> Self {
        RTCSessionDescriptionInit {
            sdp_type: desc.sdp_type,
            sdp: desc.sdp,
        }
    }
}

impl From<&RTCSessionDescription> for RTCSessionDescriptionInit {
    fn from(desc: &RTCSessionDescription) -> Self {
        desc.to_json()
    }
}
