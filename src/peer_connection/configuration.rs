use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ice_transport::ice_server::RTCIceServer;
use crate::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use crate::peer_connection::policy::ice_transport_policy::RTCIceTransportPolicy;
use crate::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;

/// Range of local UDP ports the engine may bind. Either bound may be absent.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCPortRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u16>,
}

impl RTCPortRange {
    fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(Error::ErrInvalidPortRange { min, max });
            }
        }
        Ok(())
    }
}

/// Defines a set of parameters to configure how the peer-to-peer communication via
/// [`RTCPeerConnection`] is established or re-established.
///
/// This is the normalized form: every field is populated, with defaults filled
/// in for whatever the caller left unset. It is copied out on every read and
/// never shared by reference.
///
/// [`RTCPeerConnection`]: crate::peer_connection::RTCPeerConnection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCConfiguration {
    /// Defines a slice describing servers available to be used by
    /// ICE, such as STUN and TURN servers.
    pub ice_servers: Vec<RTCIceServer>,

    /// Indicates which candidates the ICE Agent is allowed
    /// to use.
    pub ice_transport_policy: RTCIceTransportPolicy,

    /// Indicates which media-bundling policy to use when gathering
    /// ICE candidates. Fixed at construction.
    pub bundle_policy: RTCBundlePolicy,

    /// Indicates which rtcp-mux policy to use when gathering ICE
    /// candidates. Fixed at construction.
    pub rtcp_mux_policy: RTCRtcpMuxPolicy,

    /// The size of the prefetched ICE pool, as defined in
    /// [RFC8829](https://www.rfc-editor.org/rfc/rfc8829). Fixed once a local
    /// description has been applied.
    pub ice_candidate_pool_size: u8,

    pub port_range: RTCPortRange,
}

impl Default for RTCConfiguration {
    fn default() -> Self {
        RTCConfiguration {
            ice_servers: vec![],
            ice_transport_policy: RTCIceTransportPolicy::All,
            bundle_policy: RTCBundlePolicy::Balanced,
            rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
            ice_candidate_pool_size: 0,
            port_range: RTCPortRange::default(),
        }
    }
}

/// Initializer and patch form of [`RTCConfiguration`]. Unset fields take the
/// default at construction and keep their current value on `set_configuration`.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCConfigurationInit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ice_servers: Option<Vec<RTCIceServer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ice_transport_policy: Option<RTCIceTransportPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_policy: Option<RTCBundlePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtcp_mux_policy: Option<RTCRtcpMuxPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ice_candidate_pool_size: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range: Option<RTCPortRange>,
}

impl RTCConfigurationInit {
    /// Parses a JSON configuration object such as
    /// `{"iceServers":[{"urls":"stun:stun.l.google.com:19302"}]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl RTCConfiguration {
    /// Builds the normalized configuration for a new connection.
    pub fn new(init: RTCConfigurationInit) -> Result<Self> {
        let defaults = RTCConfiguration::default();
        let configuration = RTCConfiguration {
            ice_servers: init.ice_servers.unwrap_or(defaults.ice_servers),
            ice_transport_policy: or_default(
                init.ice_transport_policy,
                RTCIceTransportPolicy::Unspecified,
                defaults.ice_transport_policy,
            ),
            bundle_policy: or_default(
                init.bundle_policy,
                RTCBundlePolicy::Unspecified,
                defaults.bundle_policy,
            ),
            rtcp_mux_policy: or_default(
                init.rtcp_mux_policy,
                RTCRtcpMuxPolicy::Unspecified,
                defaults.rtcp_mux_policy,
            ),
            ice_candidate_pool_size: init
                .ice_candidate_pool_size
                .unwrap_or(defaults.ice_candidate_pool_size),
            port_range: init.port_range.unwrap_or(defaults.port_range),
        };
        configuration.validate()?;
        Ok(configuration)
    }

    fn validate(&self) -> Result<()> {
        for ice_server in &self.ice_servers {
            ice_server.validate()?;
        }
        self.port_range.validate()
    }

    /// Returns the configuration that results from applying `patch`, or the
    /// error for the first rule it violates. Rules are evaluated against the
    /// current value of each field, so the order of fields in the patch does
    /// not matter.
    pub(crate) fn patched(
        &self,
        patch: RTCConfigurationInit,
        local_description_applied: bool,
    ) -> Result<RTCConfiguration> {
        if let Some(bundle_policy) = patch.bundle_policy {
            if bundle_policy != self.bundle_policy {
                return Err(Error::ErrModifyingBundlePolicy);
            }
        }

        if let Some(rtcp_mux_policy) = patch.rtcp_mux_policy {
            if rtcp_mux_policy != self.rtcp_mux_policy {
                return Err(Error::ErrModifyingRTCPMuxPolicy);
            }
        }

        if let Some(ice_candidate_pool_size) = patch.ice_candidate_pool_size {
            if local_description_applied && ice_candidate_pool_size != self.ice_candidate_pool_size
            {
                return Err(Error::ErrModifyingICECandidatePoolSize);
            }
        }

        let mut configuration = self.clone();
        if let Some(ice_servers) = patch.ice_servers {
            configuration.ice_servers = ice_servers;
        }
        if let Some(ice_transport_policy) = patch.ice_transport_policy {
            configuration.ice_transport_policy = or_default(
                Some(ice_transport_policy),
                RTCIceTransportPolicy::Unspecified,
                self.ice_transport_policy,
            );
        }
        if let Some(ice_candidate_pool_size) = patch.ice_candidate_pool_size {
            configuration.ice_candidate_pool_size = ice_candidate_pool_size;
        }
        if let Some(port_range) = patch.port_range {
            configuration.port_range = port_range;
        }
        configuration.validate()?;

        Ok(configuration)
    }

    /// get_ice_servers side-steps the strict parsing mode of the ice package
    /// (as defined in https://tools.ietf.org/html/rfc7064) by copying and then
    /// stripping any erroneous queries from "stun(s):" URLs before parsing.
    pub(crate) fn get_ice_servers(&self) -> Vec<RTCIceServer> {
        let mut ice_servers = self.ice_servers.clone();

        for ice_server in &mut ice_servers {
            for raw_url in &mut ice_server.urls {
                if raw_url.starts_with("stun") {
                    if let Some((stripped, _)) = raw_url.split_once('?') {
                        *raw_url = stripped.to_owned();
                    }
                }
            }
        }

        ice_servers
    }
}

fn or_default<T: PartialEq>(value: Option<T>, unspecified: T, default: T) -> T {
    match value {
        Some(v) if v != unspecified => v,
        _ => default,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_configuration_defaults() {
        let configuration = RTCConfiguration::new(RTCConfigurationInit::default()).unwrap();
        assert_eq!(configuration, RTCConfiguration::default());

        let json = serde_json::to_value(&configuration).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "iceServers": [],
                "iceTransportPolicy": "all",
                "bundlePolicy": "balanced",
                "rtcpMuxPolicy": "require",
                "iceCandidatePoolSize": 0,
                "portRange": {},
            })
        );
    }

    #[test]
    fn test_configuration_from_json() {
        let init = RTCConfigurationInit::from_json(
            r#"{
                "iceServers": [{"urls": "stun:stun.l.google.com:19302"}],
                "iceTransportPolicy": "relay",
                "bundlePolicy": "max-bundle",
                "rtcpMuxPolicy": "negotiate",
                "iceCandidatePoolSize": 4,
                "portRange": {"min": 10000, "max": 10100}
            }"#,
        )
        .unwrap();
        let configuration = RTCConfiguration::new(init).unwrap();

        assert_eq!(configuration.ice_servers.len(), 1);
        assert_eq!(
            configuration.ice_transport_policy,
            RTCIceTransportPolicy::Relay
        );
        assert_eq!(configuration.bundle_policy, RTCBundlePolicy::MaxBundle);
        assert_eq!(configuration.rtcp_mux_policy, RTCRtcpMuxPolicy::Negotiate);
        assert_eq!(configuration.ice_candidate_pool_size, 4);
        assert_eq!(
            configuration.port_range,
            RTCPortRange {
                min: Some(10000),
                max: Some(10100)
            }
        );
    }

    #[test]
    fn test_configuration_rejects_invalid_input() {
        let err = RTCConfigurationInit::from_json(r#"{"bundlePolicy":"max-everything"}"#)
            .unwrap_err();
        assert_eq!(err.name(), "TypeError");

        let err = RTCConfiguration::new(RTCConfigurationInit {
            port_range: Some(RTCPortRange {
                min: Some(2),
                max: Some(1),
            }),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, Error::ErrInvalidPortRange { min: 2, max: 1 });

        let err = RTCConfiguration::new(RTCConfigurationInit {
            ice_servers: Some(vec![RTCIceServer {
                urls: vec!["turn:turn.example.org".to_owned()],
                ..Default::default()
            }]),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, Error::ErrNoTurnCredentials);
    }

    #[test]
    fn test_configuration_patch_rules() {
        let current = RTCConfiguration::new(RTCConfigurationInit {
            bundle_policy: Some(RTCBundlePolicy::MaxBundle),
            ..Default::default()
        })
        .unwrap();

        let tests = vec![
            (
                "same bundle policy",
                RTCConfigurationInit {
                    bundle_policy: Some(RTCBundlePolicy::MaxBundle),
                    ..Default::default()
                },
                false,
                None,
            ),
            (
                "different bundle policy",
                RTCConfigurationInit {
                    bundle_policy: Some(RTCBundlePolicy::Balanced),
                    ..Default::default()
                },
                false,
                Some(Error::ErrModifyingBundlePolicy),
            ),
            (
                "different rtcp mux policy",
                RTCConfigurationInit {
                    rtcp_mux_policy: Some(RTCRtcpMuxPolicy::Negotiate),
                    ..Default::default()
                },
                false,
                Some(Error::ErrModifyingRTCPMuxPolicy),
            ),
            (
                "pool size before local description",
                RTCConfigurationInit {
                    ice_candidate_pool_size: Some(3),
                    ..Default::default()
                },
                false,
                None,
            ),
            (
                "pool size after local description",
                RTCConfigurationInit {
                    ice_candidate_pool_size: Some(3),
                    ..Default::default()
                },
                true,
                Some(Error::ErrModifyingICECandidatePoolSize),
            ),
            (
                "same pool size after local description",
                RTCConfigurationInit {
                    ice_candidate_pool_size: Some(0),
                    ..Default::default()
                },
                true,
                None,
            ),
            (
                "ice servers after local description",
                RTCConfigurationInit {
                    ice_servers: Some(vec![RTCIceServer {
                        urls: vec!["stun:stun.example.org".to_owned()],
                        ..Default::default()
                    }]),
                    ice_transport_policy: Some(RTCIceTransportPolicy::Relay),
                    port_range: Some(RTCPortRange {
                        min: Some(5000),
                        max: None,
                    }),
                    ..Default::default()
                },
                true,
                None,
            ),
        ];

        for (name, patch, local_description_applied, expected_err) in tests {
            let result = current.patched(patch, local_description_applied);
            match expected_err {
                Some(err) => assert_eq!(result, Err(err), "{name}"),
                None => assert!(result.is_ok(), "{name}: {result:?}"),
            }
        }
    }

    #[test]
    fn test_configuration_patch_keeps_unset_fields() {
        let current = RTCConfiguration::default();
        let patched = current
            .patched(
                RTCConfigurationInit {
                    ice_servers: Some(vec![RTCIceServer {
                        urls: vec!["stun:stun.example.org".to_owned()],
                        ..Default::default()
                    }]),
                    ..Default::default()
                },
                false,
            )
            .unwrap();

        assert_eq!(patched.ice_servers[0].urls[0], "stun:stun.example.org");
        assert_eq!(patched.bundle_policy, current.bundle_policy);
        assert_eq!(patched.rtcp_mux_policy, current.rtcp_mux_policy);
        assert_eq!(patched.port_range, current.port_range);
    }

    #[test]
    fn test_get_ice_servers_strips_stun_query() {
        let configuration = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: vec![
                    "stun:stun.example.org?transport=udp".to_owned(),
                    "turn:turn.example.org?transport=udp".to_owned(),
                ],
                username: "u".to_owned(),
                credential: "c".to_owned(),
            }],
            ..Default::default()
        };

        let servers = configuration.get_ice_servers();
        assert_eq!(servers[0].urls[0], "stun:stun.example.org");
        assert_eq!(servers[0].urls[1], "turn:turn.example.org?transport=udp");
    }
}
