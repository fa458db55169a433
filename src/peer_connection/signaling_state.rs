use std::fmt;

use crate::error::{Error, Result};
use crate::peer_connection::sdp::sdp_type::RTCSdpType;

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum StateChangeOp {
    #[default]
    SetLocal,
    SetRemote,
}

impl fmt::Display for StateChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StateChangeOp::SetLocal => write!(f, "SetLocal"),
            StateChangeOp::SetRemote => write!(f, "SetRemote"),
        }
    }
}

idl_enum! {
    /// SignalingState indicates the signaling state of the offer/answer process.
    ///
    /// ## Specifications
    ///
    /// * [MDN]
    /// * [W3C]
    ///
    /// [MDN]: https://developer.mozilla.org/en-US/docs/Web/API/RTCPeerConnection/signalingState
    /// [W3C]: https://w3c.github.io/webrtc-pc/#dom-peerconnection-signaling-state
    pub enum RTCSignalingState {
        /// There is no offer/answer exchange in progress. This is also the
        /// initial state, in which case the local and remote descriptions are nil.
        Stable = "stable",

        /// A local description of type "offer" has been successfully applied.
        HaveLocalOffer = "have-local-offer",

        /// A remote description of type "offer" has been successfully applied.
        HaveRemoteOffer = "have-remote-offer",

        /// A remote offer and a local pranswer have been successfully applied.
        HaveLocalPranswer = "have-local-pranswer",

        /// A local offer and a remote pranswer have been successfully applied.
        HaveRemotePranswer = "have-remote-pranswer",

        /// The PeerConnection has been closed.
        Closed = "closed",
    }
}

/// Computes the state reached by applying a description of `sdp_type` in
/// state `cur`, following JSEP 4.3.1.
pub(crate) fn next_signaling_state(
    cur: RTCSignalingState,
    op: StateChangeOp,
    sdp_type: RTCSdpType,
) -> Result<RTCSignalingState> {
    // rollback is only meaningful while an offer is outstanding
    if sdp_type == RTCSdpType::Rollback {
        return match cur {
            RTCSignalingState::HaveLocalOffer | RTCSignalingState::HaveRemoteOffer => {
                Ok(RTCSignalingState::Stable)
            }
            _ => Err(Error::ErrSignalingStateCannotRollback { from: cur }),
        };
    }

    let next = match (cur, op, sdp_type) {
        // stable->SetLocal(offer)->have-local-offer
        (RTCSignalingState::Stable, StateChangeOp::SetLocal, RTCSdpType::Offer) => {
            Some(RTCSignalingState::HaveLocalOffer)
        }
        // stable->SetRemote(offer)->have-remote-offer
        (RTCSignalingState::Stable, StateChangeOp::SetRemote, RTCSdpType::Offer) => {
            Some(RTCSignalingState::HaveRemoteOffer)
        }
        // have-local-offer->SetLocal(offer)->have-local-offer
        (RTCSignalingState::HaveLocalOffer, StateChangeOp::SetLocal, RTCSdpType::Offer) => {
            Some(RTCSignalingState::HaveLocalOffer)
        }
        // have-local-offer->SetRemote(answer)->stable
        (RTCSignalingState::HaveLocalOffer, StateChangeOp::SetRemote, RTCSdpType::Answer) => {
            Some(RTCSignalingState::Stable)
        }
        // have-local-offer->SetRemote(pranswer)->have-remote-pranswer
        (RTCSignalingState::HaveLocalOffer, StateChangeOp::SetRemote, RTCSdpType::Pranswer) => {
            Some(RTCSignalingState::HaveRemotePranswer)
        }
        // have-remote-pranswer->SetRemote(pranswer)->have-remote-pranswer
        (
            RTCSignalingState::HaveRemotePranswer,
            StateChangeOp::SetRemote,
            RTCSdpType::Pranswer,
        ) => Some(RTCSignalingState::HaveRemotePranswer),
        // have-remote-pranswer->SetRemote(answer)->stable
        (RTCSignalingState::HaveRemotePranswer, StateChangeOp::SetRemote, RTCSdpType::Answer) => {
            Some(RTCSignalingState::Stable)
        }
        // have-remote-offer->SetRemote(offer)->have-remote-offer
        (RTCSignalingState::HaveRemoteOffer, StateChangeOp::SetRemote, RTCSdpType::Offer) => {
            Some(RTCSignalingState::HaveRemoteOffer)
        }
        // have-remote-offer->SetLocal(answer)->stable
        (RTCSignalingState::HaveRemoteOffer, StateChangeOp::SetLocal, RTCSdpType::Answer) => {
            Some(RTCSignalingState::Stable)
        }
        // have-remote-offer->SetLocal(pranswer)->have-local-pranswer
        (RTCSignalingState::HaveRemoteOffer, StateChangeOp::SetLocal, RTCSdpType::Pranswer) => {
            Some(RTCSignalingState::HaveLocalPranswer)
        }
        // have-local-pranswer->SetLocal(pranswer)->have-local-pranswer
        (RTCSignalingState::HaveLocalPranswer, StateChangeOp::SetLocal, RTCSdpType::Pranswer) => {
            Some(RTCSignalingState::HaveLocalPranswer)
        }
        // have-local-pranswer->SetLocal(answer)->stable
        (RTCSignalingState::HaveLocalPranswer, StateChangeOp::SetLocal, RTCSdpType::Answer) => {
            Some(RTCSignalingState::Stable)
        }
        _ => None,
    };

    next.ok_or(Error::ErrSignalingStateProposedTransitionInvalid {
        from: cur,
        applying: sdp_type,
        is_local: op == StateChangeOp::SetLocal,
    })
}
