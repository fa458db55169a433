pub mod rtp_transceiver_direction;

use std::fmt;
use std::sync::Arc;

use rtp_transceiver_direction::RTCRtpTransceiverDirection;

use crate::native::{NativeRtpReceiver, NativeRtpSender, NativeRtpTransceiver};

idl_enum! {
    /// RTCMediaKind determines the kind of media a receiver or transceiver carries.
    pub enum RTCMediaKind {
        Audio = "audio",
        Video = "video",
    }
}

/// RTCRtpTransceiverInit dictionary is used when calling the WebRTC function
/// addTransceiver() to provide configuration options for the new transceiver.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct RTCRtpTransceiverInit {
    /// Unspecified is sendrecv.
    pub direction: RTCRtpTransceiverDirection,
}

/// RTCRtpReceiver is the receiving half of a transceiver.
pub struct RTCRtpReceiver {
    kind: RTCMediaKind,
    native: Arc<dyn NativeRtpReceiver>,
}

impl fmt::Debug for RTCRtpReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCRtpReceiver")
            .field("track_id", &self.track_id())
            .field("kind", &self.kind)
            .finish()
    }
}

impl RTCRtpReceiver {
    pub(crate) fn new(native: Arc<dyn NativeRtpReceiver>) -> Self {
        RTCRtpReceiver {
            kind: native.kind(),
            native,
        }
    }

    /// track_id is the id of the remote track, read through. It is `None`
    /// while the engine has no track for this receiver.
    pub fn track_id(&self) -> Option<String> {
        self.native.track_id()
    }

    pub fn kind(&self) -> RTCMediaKind {
        self.kind
    }
}

/// RTCRtpSender is the sending half of a transceiver.
pub struct RTCRtpSender {
    kind: RTCMediaKind,
    native: Arc<dyn NativeRtpSender>,
}

impl fmt::Debug for RTCRtpSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCRtpSender")
            .field("track_id", &self.track_id())
            .field("kind", &self.kind)
            .finish()
    }
}

impl RTCRtpSender {
    pub(crate) fn new(native: Arc<dyn NativeRtpSender>) -> Self {
        RTCRtpSender {
            kind: native.kind(),
            native,
        }
    }

    pub fn track_id(&self) -> Option<String> {
        self.native.track_id()
    }

    pub fn kind(&self) -> RTCMediaKind {
        self.kind
    }
}

/// RTCRtpTransceiver pairs a sender and a receiver sharing one media section.
pub struct RTCRtpTransceiver {
    kind: RTCMediaKind,
    sender: Arc<RTCRtpSender>,
    receiver: Arc<RTCRtpReceiver>,
    native: Arc<dyn NativeRtpTransceiver>,
}

impl fmt::Debug for RTCRtpTransceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCRtpTransceiver")
            .field("mid", &self.mid())
            .field("kind", &self.kind)
            .field("direction", &self.direction())
            .finish()
    }
}

impl RTCRtpTransceiver {
    pub(crate) fn new(native: Arc<dyn NativeRtpTransceiver>) -> Self {
        RTCRtpTransceiver {
            kind: native.kind(),
            sender: Arc::new(RTCRtpSender::new(native.sender())),
            receiver: Arc::new(RTCRtpReceiver::new(native.receiver())),
            native,
        }
    }

    /// mid is read through, it is assigned during negotiation.
    pub fn mid(&self) -> Option<String> {
        self.native.mid()
    }

    pub fn kind(&self) -> RTCMediaKind {
        self.kind
    }

    pub fn direction(&self) -> RTCRtpTransceiverDirection {
        self.native.direction()
    }

    pub fn sender(&self) -> Arc<RTCRtpSender> {
        Arc::clone(&self.sender)
    }

    pub fn receiver(&self) -> Arc<RTCRtpReceiver> {
        Arc::clone(&self.receiver)
    }
}

/// RTCMediaStream groups the remote tracks that share a stream id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RTCMediaStream {
    id: String,
}

impl RTCMediaStream {
    pub fn new(id: impl Into<String>) -> Self {
        RTCMediaStream { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Payload of the `track` event.
#[derive(Debug, Clone)]
pub struct RTCTrackEvent {
    pub receiver: Arc<RTCRtpReceiver>,
    pub streams: Vec<RTCMediaStream>,
    pub transceiver: Arc<RTCRtpTransceiver>,
}

impl RTCTrackEvent {
    pub(crate) fn from_native(
        receiver: Arc<dyn NativeRtpReceiver>,
        stream_ids: Vec<String>,
        transceiver: Arc<dyn NativeRtpTransceiver>,
    ) -> Self {
        RTCTrackEvent {
            receiver: Arc::new(RTCRtpReceiver::new(receiver)),
            streams: stream_ids.into_iter().map(RTCMediaStream::new).collect(),
            transceiver: Arc::new(RTCRtpTransceiver::new(transceiver)),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use super::*;

    struct Receiver {
        track_id: Mutex<Option<String>>,
    }

    impl NativeRtpReceiver for Receiver {
        fn track_id(&self) -> Option<String> {
            self.track_id.lock().unwrap().clone()
        }
        fn kind(&self) -> RTCMediaKind {
            RTCMediaKind::Audio
        }
    }

    struct Sender;

    impl NativeRtpSender for Sender {
        fn track_id(&self) -> Option<String> {
            None
        }
        fn kind(&self) -> RTCMediaKind {
            RTCMediaKind::Audio
        }
    }

    struct Transceiver {
        receiver: Arc<Receiver>,
    }

    impl NativeRtpTransceiver for Transceiver {
        fn mid(&self) -> Option<String> {
            Some("0".to_owned())
        }
        fn kind(&self) -> RTCMediaKind {
            RTCMediaKind::Audio
        }
        fn direction(&self) -> RTCRtpTransceiverDirection {
            RTCRtpTransceiverDirection::Recvonly
        }
        fn sender(&self) -> Arc<dyn NativeRtpSender> {
            Arc::new(Sender)
        }
        fn receiver(&self) -> Arc<dyn NativeRtpReceiver> {
            Arc::clone(&self.receiver) as Arc<dyn NativeRtpReceiver>
        }
    }

    fn audio_receiver(track_id: Option<&str>) -> Arc<Receiver> {
        Arc::new(Receiver {
            track_id: Mutex::new(track_id.map(str::to_owned)),
        })
    }

    #[test]
    fn test_media_kind_string() {
        let tests = vec![
            (RTCMediaKind::Unspecified, crate::UNSPECIFIED_STR),
            (RTCMediaKind::Audio, "audio"),
            (RTCMediaKind::Video, "video"),
        ];

        for (kind, expected_string) in tests {
            assert_eq!(expected_string, kind.to_string());
            assert_eq!(kind, RTCMediaKind::from(expected_string));
        }
    }

    #[test]
    fn test_track_event_from_native() {
        let receiver = audio_receiver(Some("audio-track"));
        let event = RTCTrackEvent::from_native(
            Arc::clone(&receiver) as Arc<dyn NativeRtpReceiver>,
            vec!["stream-a".to_owned(), "stream-b".to_owned()],
            Arc::new(Transceiver { receiver }),
        );

        assert_eq!(event.receiver.track_id().as_deref(), Some("audio-track"));
        assert_eq!(event.receiver.kind(), RTCMediaKind::Audio);
        assert_eq!(
            event.streams,
            vec![RTCMediaStream::new("stream-a"), RTCMediaStream::new("stream-b")]
        );
        assert_eq!(event.transceiver.mid().as_deref(), Some("0"));
    }

    #[test]
    fn test_receiver_reads_track_through() {
        let receiver = audio_receiver(None);
        let transceiver = RTCRtpTransceiver::new(Arc::new(Transceiver {
            receiver: Arc::clone(&receiver),
        }));
        assert_eq!(transceiver.receiver().track_id(), None);

        // the engine attaches the remote track after the wrapper exists
        *receiver.track_id.lock().unwrap() = Some("late-track".to_owned());
        assert_eq!(
            transceiver.receiver().track_id().as_deref(),
            Some("late-track")
        );

        assert_eq!(transceiver.direction(), RTCRtpTransceiverDirection::Recvonly);
        assert_eq!(transceiver.sender().track_id(), None);
        assert_eq!(transceiver.sender().kind(), RTCMediaKind::Audio);
    }
}
