use super::*;
use crate::data_channel::data_channel_message::RTCDataChannelMessage;
use crate::native::NativeDataChannelObserver;

/// DataChannelObserver is what a data channel hands to its native channel.
/// Like the connection's observer it runs every callback under the panic
/// boundary and drops callbacks once the channel's gate is released.
pub(super) struct DataChannelObserver {
    channel: Weak<RTCDataChannel>,
}

impl DataChannelObserver {
    pub(super) fn new(channel: Weak<RTCDataChannel>) -> Self {
        DataChannelObserver { channel }
    }

    fn with_open(&self, callback: &str, f: impl FnOnce(&RTCDataChannel)) {
        managed(callback, || {
            let Some(channel) = self.channel.upgrade() else {
                log::trace!("{callback} after the data channel was dropped");
                return;
            };
            if !channel.gate.is_open() {
                log::trace!("{callback} ignored, data channel {} released", channel.label);
                return;
            }
            f(channel.as_ref());
        });
    }
}

impl NativeDataChannelObserver for DataChannelObserver {
    fn on_open(&self) {
        self.with_open("on_open", |channel| {
            log::debug!("data channel {} open", channel.label);
            channel.dispatch_native(Event::new(EVENT_OPEN));
        });
    }

    fn on_message(&self, data: Bytes, is_string: bool) {
        self.with_open("on_message", |channel| {
            channel.dispatch_native(Event::with_detail(
                EVENT_MESSAGE,
                EventDetail::Message(RTCDataChannelMessage { is_string, data }),
            ));
        });
    }

    fn on_error(&self, error_text: String) {
        self.with_open("on_error", |channel| {
            log::warn!("data channel {} failed: {error_text}", channel.label);
            channel.dispatch_native(Event::with_detail(
                EVENT_ERROR,
                EventDetail::Error(Error::ErrNative(error_text)),
            ));
        });
    }

    fn on_close(&self) {
        self.with_open("on_close", |channel| channel.finish_close());
    }
}
