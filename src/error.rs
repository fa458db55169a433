use thiserror::Error;
use tokio::sync::mpsc::error::SendError as MpscSendError;

use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use crate::peer_connection::signaling_state::RTCSignalingState;

pub type Result<T> = std::result::Result<T, Error>;

const INVALID_STATE_ERROR: &str = "InvalidStateError";
const SYNTAX_ERROR: &str = "SyntaxError";
const INVALID_MODIFICATION_ERROR: &str = "InvalidModificationError";
const INVALID_ACCESS_ERROR: &str = "InvalidAccessError";
const TYPE_ERROR: &str = "TypeError";
const OPERATION_ERROR: &str = "OperationError";

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// ErrConnectionClosed indicates an operation executed after connection
    /// has already been closed.
    #[error("Failed to execute '{operation}' on 'RTCPeerConnection': The RTCPeerConnection's signalingState is 'closed'.")]
    ErrConnectionClosed { operation: &'static str },

    /// ErrIceCandidateConnectionClosed indicates add_ice_candidate was called
    /// after the connection has been closed.
    #[error("Failed to set ICE candidate; RTCPeerConnection is closed.")]
    ErrIceCandidateConnectionClosed,

    /// ErrStatsConnectionClosed indicates stats were requested after the
    /// connection has been closed.
    #[error("RTCPeerConnection is closed")]
    ErrStatsConnectionClosed,

    #[error("can't rollback from {from} state")]
    ErrSignalingStateCannotRollback { from: RTCSignalingState },

    #[error(
        "invalid proposed signaling state transition from {} applying {} {}",
        from,
        if *is_local { "local" } else {  "remote" },
        applying
    )]
    ErrSignalingStateProposedTransitionInvalid {
        from: RTCSignalingState,
        applying: RTCSdpType,
        is_local: bool,
    },

    /// ErrModifyingBundlePolicy indicates that an attempt to modify
    /// BundlePolicy was made after PeerConnection has been initialized.
    #[error("bundle policy cannot be modified")]
    ErrModifyingBundlePolicy,

    /// ErrModifyingRTCPMuxPolicy indicates that an attempt to modify
    /// RTCPMuxPolicy was made after PeerConnection has been initialized.
    #[error("rtcp mux policy cannot be modified")]
    ErrModifyingRTCPMuxPolicy,

    /// ErrModifyingICECandidatePoolSize indicates that an attempt to modify
    /// ICECandidatePoolSize was made after a local description was applied.
    #[error("ice candidate pool size cannot be modified")]
    ErrModifyingICECandidatePoolSize,

    /// ErrNoTurnCredentials indicates that a TURN server URL was provided
    /// without required credentials.
    #[error("turn server credentials required")]
    ErrNoTurnCredentials,

    #[error("invalid ice server url: {0}")]
    ErrInvalidIceServerUrl(String),

    #[error("unsupported ice server url scheme: {0}")]
    ErrUnsupportedIceServerScheme(String),

    #[error("port range minimum {min} is greater than maximum {max}")]
    ErrInvalidPortRange { min: u16, max: u16 },

    #[error("invalid configuration: {0}")]
    ErrInvalidConfiguration(String),

    #[error("invalid SDP type: {0}")]
    ErrSDPTypeInvalidValue(String),

    /// ErrNoRemoteDescription indicates that an operation was rejected because
    /// the remote description is not set.
    #[error("remote description is not set")]
    ErrNoRemoteDescription,

    /// ErrIncorrectSignalingState indicates an operation was called in a
    /// signaling state that does not allow it.
    #[error("Failed to execute '{operation}' on 'RTCPeerConnection': called in wrong state: {state}")]
    ErrIncorrectSignalingState {
        operation: &'static str,
        state: RTCSignalingState,
    },

    #[error("invalid data channel init: {0}")]
    ErrInvalidDataChannelInit(&'static str),

    /// ErrUnsupportedMediaKind indicates a transceiver was requested for a
    /// kind other than audio or video.
    #[error("unsupported media kind: {0}")]
    ErrUnsupportedMediaKind(String),

    /// ErrDataChannelClosed indicates the data channel was used after it
    /// was closed, either by itself or by its connection.
    #[error("data channel '{0}' is closed")]
    ErrDataChannelClosed(String),

    /// ErrTypeMismatch indicates an argument was not an instance of the
    /// expected value type.
    #[error("argument is not an instance of {expected}")]
    ErrTypeMismatch { expected: &'static str },

    /// ErrOperationAborted indicates the operation was dropped before it
    /// could settle.
    #[error("operation {0} was aborted")]
    ErrOperationAborted(&'static str),

    #[error("dispatcher is closed")]
    ErrDispatcherClosed,

    #[error("mpsc send: {0}")]
    MpscSend(String),

    /// ErrNative indicates the native engine reported an unexpected failure.
    #[error("{0}")]
    ErrNative(String),
}

impl Error {
    /// DOM exception name of this error.
    pub fn name(&self) -> &'static str {
        match self {
            Error::ErrConnectionClosed { .. }
            | Error::ErrIceCandidateConnectionClosed
            | Error::ErrStatsConnectionClosed
            | Error::ErrSignalingStateCannotRollback { .. }
            | Error::ErrSignalingStateProposedTransitionInvalid { .. }
            | Error::ErrNoRemoteDescription
            | Error::ErrIncorrectSignalingState { .. }
            | Error::ErrDataChannelClosed(_)
            | Error::ErrDispatcherClosed => INVALID_STATE_ERROR,
            Error::ErrModifyingBundlePolicy
            | Error::ErrModifyingRTCPMuxPolicy
            | Error::ErrModifyingICECandidatePoolSize => INVALID_MODIFICATION_ERROR,
            Error::ErrNoTurnCredentials | Error::ErrTypeMismatch { .. } => INVALID_ACCESS_ERROR,
            Error::ErrInvalidIceServerUrl(_) | Error::ErrUnsupportedIceServerScheme(_) => {
                SYNTAX_ERROR
            }
            Error::ErrInvalidPortRange { .. }
            | Error::ErrInvalidConfiguration(_)
            | Error::ErrInvalidDataChannelInit(_)
            | Error::ErrUnsupportedMediaKind(_)
            | Error::ErrSDPTypeInvalidValue(_) => TYPE_ERROR,
            Error::ErrOperationAborted(_) | Error::MpscSend(_) | Error::ErrNative(_) => {
                OPERATION_ERROR
            }
        }
    }

    /// The error an operation settles with once the connection is closed.
    pub(crate) fn closed(operation: &'static str) -> Self {
        match operation {
            "addIceCandidate" => Error::ErrIceCandidateConnectionClosed,
            "getStats" => Error::ErrStatsConnectionClosed,
            _ => Error::ErrConnectionClosed { operation },
        }
    }

    /// Legacy DOMException code, 0 for names without one.
    pub fn code(&self) -> u16 {
        match self.name() {
            INVALID_STATE_ERROR => 11,
            SYNTAX_ERROR => 12,
            INVALID_MODIFICATION_ERROR => 13,
            INVALID_ACCESS_ERROR => 15,
            _ => 0,
        }
    }
}

// Because Tokio SendError is parameterized, we sadly lose the backtrace.
impl<T> From<MpscSendError<T>> for Error {
    fn from(e: MpscSendError<T>) -> Self {
        Error::MpscSend(e.to_string())
    }
}

impl From<webrtc::Error> for Error {
    fn from(e: webrtc::Error) -> Self {
        Error::ErrNative(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::ErrInvalidConfiguration(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_name_and_code() {
        let tests = vec![
            (
                Error::ErrConnectionClosed {
                    operation: "createOffer",
                },
                "InvalidStateError",
                11,
            ),
            (
                Error::ErrSignalingStateCannotRollback {
                    from: RTCSignalingState::Stable,
                },
                "InvalidStateError",
                11,
            ),
            (Error::ErrModifyingBundlePolicy, "InvalidModificationError", 13),
            (
                Error::ErrModifyingICECandidatePoolSize,
                "InvalidModificationError",
                13,
            ),
            (Error::ErrNoTurnCredentials, "InvalidAccessError", 15),
            (
                Error::ErrInvalidIceServerUrl("stun".to_owned()),
                "SyntaxError",
                12,
            ),
            (
                Error::ErrInvalidPortRange { min: 2, max: 1 },
                "TypeError",
                0,
            ),
            (Error::ErrNative("boom".to_owned()), "OperationError", 0),
        ];

        for (err, name, code) in tests {
            assert_eq!(err.name(), name, "{err}");
            assert_eq!(err.code(), code, "{err}");
        }
    }

    #[test]
    fn test_closed_error_per_operation() {
        assert_eq!(
            Error::closed("addIceCandidate").to_string(),
            "Failed to set ICE candidate; RTCPeerConnection is closed."
        );
        assert_eq!(
            Error::closed("getStats").to_string(),
            "RTCPeerConnection is closed"
        );
        assert_eq!(
            Error::closed("createAnswer"),
            Error::ErrConnectionClosed {
                operation: "createAnswer"
            }
        );
    }

    #[test]
    fn test_connection_closed_message() {
        let err = Error::ErrConnectionClosed {
            operation: "setConfiguration",
        };
        assert_eq!(
            err.to_string(),
            "Failed to execute 'setConfiguration' on 'RTCPeerConnection': The RTCPeerConnection's signalingState is 'closed'."
        );
    }
}
