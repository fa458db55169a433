use serde::{Deserialize, Serialize};

/// RTCDataChannelInit can be used to configure properties of the underlying
/// channel such as data reliability.
///
/// ## Specifications
///
/// * [W3C]
///
/// [W3C]: https://w3c.github.io/webrtc-pc/#dom-rtcdatachannelinit
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCDataChannelInit {
    /// ordered indicates if data is allowed to be delivered out of order. The
    /// default value of true, guarantees that data will be delivered in order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordered: Option<bool>,

    /// max_packet_life_time limits the time (in milliseconds) during which the
    /// channel will transmit or retransmit data if not acknowledged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_packet_life_time: Option<u16>,

    /// max_retransmits limits the number of times a channel will retransmit data
    /// if not successfully delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retransmits: Option<u16>,

    /// protocol describes the subprotocol name used for this channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    /// negotiated describes if the data channel is created by the local peer or
    /// the remote peer. A negotiated channel needs an `id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negotiated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u16>,
}
