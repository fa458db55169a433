idl_enum! {
    /// BundlePolicy affects which media tracks are negotiated if the remote
    /// endpoint is not bundle-aware, and what ICE candidates are gathered. If the
    /// remote endpoint is bundle-aware, all media tracks and data channels are
    /// bundled onto the same transport.
    ///
    /// Fixed for the lifetime of a connection once constructed.
    ///
    /// ## Specifications
    ///
    /// * [W3C]
    ///
    /// [W3C]: https://w3c.github.io/webrtc-pc/#rtcbundlepolicy-enum
    pub enum RTCBundlePolicy {
        /// Gather ICE candidates for each media type in use (audio, video, and
        /// data). If the remote endpoint is not bundle-aware, negotiate only one
        /// audio and video track on separate transports.
        Balanced = "balanced",

        /// Gather ICE candidates for each track. If the remote endpoint is not
        /// bundle-aware, negotiate all media tracks on separate transports.
        MaxCompat = "max-compat",

        /// Gather ICE candidates for only one track. If the remote endpoint is
        /// not bundle-aware, negotiate only one media track.
        MaxBundle = "max-bundle",
    }
}
