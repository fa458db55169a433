idl_enum! {
    /// Describes the state of the ICE candidate gathering process.
    pub enum RTCIceGatheringState {
        /// No transport has started gathering, or there are no transports.
        New = "new",

        /// At least one transport is gathering candidates.
        Gathering = "gathering",

        /// All transports have finished gathering. Reaching this state produces
        /// the end-of-candidates `icecandidate` event.
        Complete = "complete",
    }
}
