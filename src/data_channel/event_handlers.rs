use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::event::*;

/// The `on<type>` handler slots of an [`RTCDataChannel`].
///
/// [`RTCDataChannel`]: crate::data_channel::RTCDataChannel
#[derive(Default)]
pub(crate) struct RTCDataChannelHandlers {
    on_open: ArcSwapOption<EventListener>,
    on_message: ArcSwapOption<EventListener>,
    on_error: ArcSwapOption<EventListener>,
    on_close: ArcSwapOption<EventListener>,
}

impl RTCDataChannelHandlers {
    fn slot(&self, event_type: &str) -> Option<&ArcSwapOption<EventListener>> {
        let slot = match event_type {
            EVENT_OPEN => &self.on_open,
            EVENT_MESSAGE => &self.on_message,
            EVENT_ERROR => &self.on_error,
            EVENT_CLOSE => &self.on_close,
            _ => return None,
        };
        Some(slot)
    }

    pub(crate) fn set(&self, event_type: &str, handler: Option<EventListener>) {
        match self.slot(event_type) {
            Some(slot) => slot.store(handler.map(Arc::new)),
            None => log::debug!("no {event_type} handler slot on a data channel"),
        }
    }
}

impl LegacyHandlers for RTCDataChannelHandlers {
    fn handler(&self, event_type: &str) -> Option<EventListener> {
        self.slot(event_type)?
            .load_full()
            .map(|handler| (*handler).clone())
    }
}
