use bytes::Bytes;

/// RTCDataChannelMessage is the payload of a `message` event. `is_string`
/// is set when the remote peer sent the message as text; otherwise it is
/// binary.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCDataChannelMessage {
    pub is_string: bool,
    pub data: Bytes,
}

impl RTCDataChannelMessage {
    /// text returns the message as a string when it was sent as valid text.
    pub fn text(&self) -> Option<&str> {
        if !self.is_string {
            return None;
        }
        std::str::from_utf8(&self.data).ok()
    }
}
