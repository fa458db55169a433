idl_enum! {
    /// RTCDataChannelState indicates the state of a data channel.
    pub enum RTCDataChannelState {
        /// The channel is being established. Both channels created with
        /// `create_data_channel` and channels announced by the remote peer start
        /// here.
        Connecting = "connecting",

        /// The underlying transport is established and data can flow.
        Open = "open",

        /// Closing of the underlying transport has started.
        Closing = "closing",

        /// The underlying transport has been closed or could not be established.
        Closed = "closed",
    }
}
