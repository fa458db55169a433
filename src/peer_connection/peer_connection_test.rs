use std::sync::Mutex;

use super::*;
use crate::api::APIBuilder;
use crate::native::mock::{MockEngine, MockPeerConnection};

pub(crate) async fn new_mock_connection(
    name: &str,
) -> Result<(Arc<RTCPeerConnection>, Arc<MockPeerConnection>, Arc<Dispatcher>)> {
    let engine = MockEngine::new();
    let dispatcher = Dispatcher::new(name);
    let api = APIBuilder::new()
        .with_engine(Arc::clone(&engine) as Arc<dyn crate::native::NativeEngine>)
        .with_dispatcher(Arc::clone(&dispatcher))
        .build();

    let pc = api.new_peer_connection(RTCConfigurationInit::default()).await?;
    let mock = engine
        .last()
        .ok_or(Error::ErrNative("no connection was created".to_owned()))?;
    Ok((pc, mock, dispatcher))
}

fn recorder(log: &Arc<Mutex<Vec<String>>>) -> EventListener {
    let log = Arc::clone(log);
    EventListener::new(move |event| {
        log.lock().unwrap().push(event.event_type().to_owned());
    })
}

fn offer_init(sdp: &str) -> RTCSessionDescriptionInit {
    RTCSessionDescriptionInit {
        sdp_type: RTCSdpType::Offer,
        sdp: sdp.to_owned(),
    }
}

#[tokio::test]
async fn test_create_offer_then_set_local_description() -> Result<()> {
    let (pc, _mock, dispatcher) =
        new_mock_connection("test_create_offer_then_set_local_description").await?;
    let log = Arc::new(Mutex::new(vec![]));
    pc.add_event_listener(EVENT_SIGNALING_STATE_CHANGE, recorder(&log));

    let offer = pc.create_offer(None).await?;
    assert_eq!(offer.sdp_type(), RTCSdpType::Offer);
    assert_eq!(pc.signaling_state(), RTCSignalingState::Stable);

    // an empty sdp applies the offer just created
    pc.set_local_description(offer_init("")).await?;
    assert_eq!(pc.signaling_state(), RTCSignalingState::HaveLocalOffer);

    let local = pc.local_description().await.unwrap();
    assert_eq!(local.sdp(), offer.sdp());
    assert_eq!(pc.pending_local_description().await, Some(local));
    assert_eq!(pc.current_local_description().await, None);

    dispatcher.done().await;
    assert_eq!(*log.lock().unwrap(), vec![EVENT_SIGNALING_STATE_CHANGE]);

    Ok(())
}

#[tokio::test]
async fn test_set_local_description_without_type() -> Result<()> {
    let (pc, mock, _dispatcher) =
        new_mock_connection("test_set_local_description_without_type").await?;

    pc.set_local_description(RTCSessionDescriptionInit::default())
        .await?;
    assert_eq!(pc.signaling_state(), RTCSignalingState::HaveLocalOffer);
    assert_eq!(mock.offer_options().len(), 1);

    let local = pc.local_description().await.unwrap();
    assert_eq!(local.sdp_type(), RTCSdpType::Offer);
    assert!(!local.sdp().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_offer_answer_exchange() -> Result<()> {
    let (offerer, _, _) = new_mock_connection("test_offer_answer_exchange_offerer").await?;
    let (answerer, _, _) = new_mock_connection("test_offer_answer_exchange_answerer").await?;

    let offer = offerer.create_offer(None).await?;
    offerer
        .set_local_description(offer_init(offer.sdp()))
        .await?;
    answerer
        .set_remote_description(offer_init(offer.sdp()))
        .await?;
    assert_eq!(answerer.signaling_state(), RTCSignalingState::HaveRemoteOffer);

    let answer = answerer.create_answer(None).await?;
    assert_eq!(answer.sdp_type(), RTCSdpType::Answer);
    answerer
        .set_local_description(RTCSessionDescriptionInit {
            sdp_type: RTCSdpType::Answer,
            sdp: String::new(),
        })
        .await?;
    offerer
        .set_remote_description(RTCSessionDescriptionInit {
            sdp_type: RTCSdpType::Answer,
            sdp: answer.sdp().to_owned(),
        })
        .await?;

    for pc in [&offerer, &answerer] {
        assert_eq!(pc.signaling_state(), RTCSignalingState::Stable);
        assert!(pc.current_local_description().await.is_some());
        assert!(pc.current_remote_description().await.is_some());
        assert_eq!(pc.pending_local_description().await, None);
        assert_eq!(pc.pending_remote_description().await, None);
    }
    assert_eq!(
        offerer.current_remote_description().await.unwrap().sdp(),
        answer.sdp()
    );

    Ok(())
}

#[tokio::test]
async fn test_create_answer_in_wrong_state() -> Result<()> {
    let (pc, _, _) = new_mock_connection("test_create_answer_in_wrong_state").await?;

    let err = pc.create_answer(None).await.unwrap_err();
    assert_eq!(
        err,
        Error::ErrIncorrectSignalingState {
            operation: "createAnswer",
            state: RTCSignalingState::Stable,
        }
    );
    assert_eq!(err.name(), "InvalidStateError");

    Ok(())
}

#[tokio::test]
async fn test_rollback() -> Result<()> {
    let (pc, _, _) = new_mock_connection("test_rollback").await?;

    let err = pc
        .set_local_description(RTCSessionDescriptionInit::rollback())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::ErrSignalingStateCannotRollback {
            from: RTCSignalingState::Stable
        }
    );

    pc.set_local_description(RTCSessionDescriptionInit::default())
        .await?;
    assert_eq!(pc.signaling_state(), RTCSignalingState::HaveLocalOffer);

    pc.set_local_description(RTCSessionDescriptionInit::rollback())
        .await?;
    assert_eq!(pc.signaling_state(), RTCSignalingState::Stable);
    assert_eq!(pc.local_description().await, None);

    Ok(())
}

#[tokio::test]
async fn test_invalid_transition_is_rejected() -> Result<()> {
    let (pc, _, _) = new_mock_connection("test_invalid_transition_is_rejected").await?;

    let err = pc
        .set_remote_description(RTCSessionDescriptionInit {
            sdp_type: RTCSdpType::Answer,
            sdp: "v=0\r\n".to_owned(),
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::ErrSignalingStateProposedTransitionInvalid {
            from: RTCSignalingState::Stable,
            applying: RTCSdpType::Answer,
            is_local: false,
        }
    );
    assert_eq!(pc.signaling_state(), RTCSignalingState::Stable);

    // a description must name its type
    let err = pc
        .set_remote_description(RTCSessionDescriptionInit::default())
        .await
        .unwrap_err();
    assert_eq!(err.name(), "TypeError");

    Ok(())
}

#[tokio::test]
async fn test_native_failure_leaves_state_untouched() -> Result<()> {
    let (pc, mock, _) = new_mock_connection("test_native_failure_leaves_state_untouched").await?;

    mock.fail_next(Error::ErrNative("engine said no".to_owned()));
    let err = pc
        .set_local_description(RTCSessionDescriptionInit::default())
        .await
        .unwrap_err();
    assert_eq!(err, Error::ErrNative("engine said no".to_owned()));
    assert_eq!(err.name(), "OperationError");
    assert_eq!(pc.signaling_state(), RTCSignalingState::Stable);

    // the next operation runs normally
    pc.create_offer(None).await?;

    Ok(())
}

#[tokio::test]
async fn test_add_ice_candidate_needs_remote_description() -> Result<()> {
    let (pc, mock, _) =
        new_mock_connection("test_add_ice_candidate_needs_remote_description").await?;
    let candidate = RTCIceCandidateInit {
        candidate: "candidate:1 1 udp 2122260223 192.168.1.2 50000 typ host".to_owned(),
        sdp_mid: Some("0".to_owned()),
        ..Default::default()
    };

    let err = pc
        .add_ice_candidate(candidate.clone())
        .await
        .unwrap_err();
    assert_eq!(err, Error::ErrNoRemoteDescription);

    pc.set_remote_description(offer_init("v=0\r\n")).await?;
    pc.add_ice_candidate(candidate.clone()).await?;
    assert_eq!(mock.remote_candidates(), vec![candidate]);

    Ok(())
}

#[tokio::test]
async fn test_restart_ice_applies_to_next_offer() -> Result<()> {
    let (pc, mock, _) = new_mock_connection("test_restart_ice_applies_to_next_offer").await?;

    pc.create_offer(None).await?;
    pc.restart_ice()?;
    let restarted = pc.create_offer(None).await?;
    pc.create_offer(None).await?;

    let restarts: Vec<bool> = mock
        .offer_options()
        .iter()
        .map(|options| options.ice_restart)
        .collect();
    assert_eq!(restarts, vec![false, true, false]);
    assert!(restarted.sdp().contains("ice-options:restart"));

    Ok(())
}

#[tokio::test]
async fn test_set_configuration_reaches_engine() -> Result<()> {
    let (pc, mock, _) = new_mock_connection("test_set_configuration_reaches_engine").await?;

    pc.set_configuration(RTCConfigurationInit {
        ice_servers: Some(vec![crate::ice_transport::ice_server::RTCIceServer {
            urls: vec!["stun:stun.example.org".to_owned()],
            ..Default::default()
        }]),
        ice_candidate_pool_size: Some(2),
        ..Default::default()
    })?;
    pc.operations_done().await;

    assert_eq!(mock.configuration(), pc.get_configuration());
    assert_eq!(mock.configuration().ice_candidate_pool_size, 2);

    // once a local description is applied the pool size is frozen
    pc.set_local_description(RTCSessionDescriptionInit::default())
        .await?;
    let err = pc
        .set_configuration(RTCConfigurationInit {
            ice_candidate_pool_size: Some(3),
            ..Default::default()
        })
        .unwrap_err();
    assert_eq!(err, Error::ErrModifyingICECandidatePoolSize);
    assert_eq!(pc.get_configuration().ice_candidate_pool_size, 2);

    Ok(())
}

#[tokio::test]
async fn test_set_configuration_refused_by_engine() -> Result<()> {
    let (pc, mock, _) = new_mock_connection("test_set_configuration_refused_by_engine").await?;

    mock.fail_next(Error::ErrNative("pool size not supported".to_owned()));
    pc.set_configuration(RTCConfigurationInit {
        ice_candidate_pool_size: Some(1),
        ..Default::default()
    })?;
    assert_eq!(pc.get_configuration().ice_candidate_pool_size, 1);
    pc.operations_done().await;

    // the refused configuration is taken back
    assert_eq!(pc.get_configuration().ice_candidate_pool_size, 0);
    assert_eq!(mock.configuration(), pc.get_configuration());

    // a refusal does not undo a configuration set after it
    mock.hold();
    mock.fail_next(Error::ErrNative("pool size not supported".to_owned()));
    pc.set_configuration(RTCConfigurationInit {
        ice_candidate_pool_size: Some(1),
        ..Default::default()
    })?;
    pc.set_configuration(RTCConfigurationInit {
        ice_candidate_pool_size: Some(2),
        ..Default::default()
    })?;
    mock.release_hold();
    pc.operations_done().await;

    assert_eq!(pc.get_configuration().ice_candidate_pool_size, 2);
    assert_eq!(mock.configuration().ice_candidate_pool_size, 2);

    Ok(())
}

#[tokio::test]
async fn test_add_transceiver() -> Result<()> {
    let (pc, _mock, _) = new_mock_connection("test_add_transceiver").await?;

    let audio = pc.add_transceiver(RTCMediaKind::Audio, None)?.await?;
    assert_eq!(audio.kind(), RTCMediaKind::Audio);
    assert_eq!(audio.direction(), RTCRtpTransceiverDirection::Sendrecv);
    assert_eq!(audio.mid(), None);
    assert_eq!(audio.sender().track_id().as_deref(), Some("audio-0"));
    assert_eq!(audio.receiver().track_id(), None);

    let video = pc
        .add_transceiver(
            RTCMediaKind::Video,
            Some(RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Recvonly,
            }),
        )?
        .await?;
    assert_eq!(video.direction(), RTCRtpTransceiverDirection::Recvonly);
    assert_eq!(video.sender().track_id(), None);

    let kinds: Vec<RTCMediaKind> = pc.get_transceivers().await.iter().map(|t| t.kind()).collect();
    assert_eq!(kinds, vec![RTCMediaKind::Audio, RTCMediaKind::Video]);
    let sender_tracks: Vec<Option<String>> = pc
        .get_senders()
        .await
        .iter()
        .map(|sender| sender.track_id())
        .collect();
    assert_eq!(sender_tracks, vec![Some("audio-0".to_owned()), None]);
    assert_eq!(pc.get_receivers().await.len(), 2);

    // negotiation assigns the mids, read through by the wrappers already out
    pc.set_local_description(RTCSessionDescriptionInit::default())
        .await?;
    assert_eq!(audio.mid().as_deref(), Some("0"));
    assert_eq!(video.mid().as_deref(), Some("1"));

    Ok(())
}

#[tokio::test]
async fn test_add_transceiver_errors() -> Result<()> {
    let (pc, mock, _) = new_mock_connection("test_add_transceiver_errors").await?;

    let err = pc
        .add_transceiver(RTCMediaKind::Unspecified, None)
        .unwrap_err();
    assert_eq!(err, Error::ErrUnsupportedMediaKind(crate::UNSPECIFIED_STR.to_owned()));
    assert_eq!(err.name(), "TypeError");

    // an engine failure rejects the promise
    mock.fail_next(Error::ErrNative("no codecs".to_owned()));
    let err = pc
        .add_transceiver(RTCMediaKind::Audio, None)?
        .await
        .unwrap_err();
    assert_eq!(err.name(), "OperationError");

    pc.add_transceiver(RTCMediaKind::Audio, None)?.await?;
    assert_eq!(pc.get_transceivers().await.len(), 1);

    pc.close();
    let err = pc.add_transceiver(RTCMediaKind::Audio, None).unwrap_err();
    assert_eq!(
        err,
        Error::ErrConnectionClosed {
            operation: "addTransceiver"
        }
    );
    assert_eq!(err.name(), "InvalidStateError");
    assert!(pc.get_transceivers().await.is_empty());
    assert!(pc.get_senders().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_can_trickle_ice_candidates() -> Result<()> {
    let (pc, _mock, _) = new_mock_connection("test_can_trickle_ice_candidates").await?;
    assert_eq!(pc.can_trickle_ice_candidates().await, None);

    pc.set_remote_description(offer_init("v=0\r\na=ice-options:trickle\r\n"))
        .await?;
    assert_eq!(pc.can_trickle_ice_candidates().await, Some(true));

    let (pc, _mock, _) = new_mock_connection("test_can_trickle_ice_candidates_off").await?;
    pc.set_remote_description(offer_init("v=0\r\n")).await?;
    assert_eq!(pc.can_trickle_ice_candidates().await, Some(false));

    Ok(())
}

#[tokio::test]
async fn test_create_data_channel() -> Result<()> {
    let (pc, mock, _) = new_mock_connection("test_create_data_channel").await?;

    let channel = pc
        .create_data_channel(
            "chat",
            Some(RTCDataChannelInit {
                ordered: Some(false),
                protocol: Some("json".to_owned()),
                ..Default::default()
            }),
        )?
        .await?;
    assert_eq!(channel.label(), "chat");
    assert_eq!(channel.protocol(), "json");
    assert!(!channel.ordered());
    assert_eq!(mock.data_channels().len(), 1);

    let tests = vec![
        RTCDataChannelInit {
            max_packet_life_time: Some(100),
            max_retransmits: Some(3),
            ..Default::default()
        },
        RTCDataChannelInit {
            negotiated: Some(true),
            ..Default::default()
        },
        RTCDataChannelInit {
            negotiated: Some(true),
            id: Some(u16::MAX),
            ..Default::default()
        },
    ];
    for init in tests {
        let err = pc.create_data_channel("bad", Some(init)).unwrap_err();
        assert_eq!(err.name(), "TypeError", "{err}");
    }
    assert_eq!(mock.data_channels().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_get_stats() -> Result<()> {
    let (pc, _, _) = new_mock_connection("test_get_stats").await?;

    let report = pc.get_stats().await?;
    assert_eq!(report.len(), 2);
    assert_eq!(report.get("PC").unwrap()["type"], "peer-connection");

    Ok(())
}

#[tokio::test]
async fn test_state_getters_follow_native() -> Result<()> {
    let (pc, mock, _) = new_mock_connection("test_state_getters_follow_native").await?;

    assert_eq!(pc.ice_connection_state(), RTCIceConnectionState::New);
    mock.emit_ice_connection_state(RTCIceConnectionState::Checking);
    mock.emit_connection_state(RTCPeerConnectionState::Connecting);
    mock.emit_ice_gathering_state(RTCIceGatheringState::Gathering);
    assert_eq!(pc.ice_connection_state(), RTCIceConnectionState::Checking);
    assert_eq!(pc.connection_state(), RTCPeerConnectionState::Connecting);
    assert_eq!(pc.ice_gathering_state(), RTCIceGatheringState::Gathering);

    pc.close();
    assert_eq!(pc.signaling_state(), RTCSignalingState::Closed);
    assert_eq!(pc.ice_connection_state(), RTCIceConnectionState::Closed);
    assert_eq!(pc.connection_state(), RTCPeerConnectionState::Closed);
    assert_eq!(pc.ice_gathering_state(), RTCIceGatheringState::Complete);

    Ok(())
}

#[tokio::test]
async fn test_native_signaling_change_after_close_is_ignored() -> Result<()> {
    let (pc, mock, _) =
        new_mock_connection("test_native_signaling_change_after_close_is_ignored").await?;

    pc.close();
    mock.emit_signaling_state(RTCSignalingState::HaveRemoteOffer);
    assert_eq!(pc.signaling_state(), RTCSignalingState::Closed);

    Ok(())
}
