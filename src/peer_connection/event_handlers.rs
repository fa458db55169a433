use arc_swap::ArcSwapOption;

use crate::event::*;

/// The `on<type>` handler slots of an [`RTCPeerConnection`], one per event it
/// emits. An assigned handler is delivered alongside the registered listeners.
///
/// [`RTCPeerConnection`]: crate::peer_connection::RTCPeerConnection
#[derive(Default)]
pub(crate) struct RTCPeerConnectionHandlers {
    on_track: ArcSwapOption<EventListener>,
    on_connection_state_change: ArcSwapOption<EventListener>,
    on_ice_candidate: ArcSwapOption<EventListener>,
    on_ice_candidate_error: ArcSwapOption<EventListener>,
    on_signaling_state_change: ArcSwapOption<EventListener>,
    on_ice_connection_state_change: ArcSwapOption<EventListener>,
    on_ice_gathering_state_change: ArcSwapOption<EventListener>,
    on_negotiation_needed: ArcSwapOption<EventListener>,
    on_data_channel: ArcSwapOption<EventListener>,
}

impl RTCPeerConnectionHandlers {
    fn slot(&self, event_type: &str) -> Option<&ArcSwapOption<EventListener>> {
        let slot = match event_type {
            EVENT_TRACK => &self.on_track,
            EVENT_CONNECTION_STATE_CHANGE => &self.on_connection_state_change,
            EVENT_ICE_CANDIDATE => &self.on_ice_candidate,
            EVENT_ICE_CANDIDATE_ERROR => &self.on_ice_candidate_error,
            EVENT_SIGNALING_STATE_CHANGE => &self.on_signaling_state_change,
            EVENT_ICE_CONNECTION_STATE_CHANGE => &self.on_ice_connection_state_change,
            EVENT_ICE_GATHERING_STATE_CHANGE => &self.on_ice_gathering_state_change,
            EVENT_NEGOTIATION_NEEDED => &self.on_negotiation_needed,
            EVENT_DATA_CHANNEL => &self.on_data_channel,
            _ => return None,
        };
        Some(slot)
    }

    /// set replaces the handler for `event_type`. Unknown types are ignored.
    pub(crate) fn set(&self, event_type: &str, handler: Option<EventListener>) {
        match self.slot(event_type) {
            Some(slot) => slot.store(handler.map(std::sync::Arc::new)),
            None => log::debug!("no {event_type} handler slot"),
        }
    }
}

impl LegacyHandlers for RTCPeerConnectionHandlers {
    fn handler(&self, event_type: &str) -> Option<EventListener> {
        self.slot(event_type)?
            .load_full()
            .map(|handler| (*handler).clone())
    }
}
