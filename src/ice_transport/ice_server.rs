use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::error::{Error, Result};

const SCHEME_STUN: &str = "stun";
const SCHEME_STUNS: &str = "stuns";
const SCHEME_TURN: &str = "turn";
const SCHEME_TURNS: &str = "turns";

/// ICEServer describes a single STUN and TURN server that can be used by
/// the ICEAgent to establish a connection with a peer.
///
/// `urls` deserializes from either a single string or a list of strings.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCIceServer {
    #[serde(deserialize_with = "string_or_seq")]
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub credential: String,
}

impl RTCIceServer {
    pub(crate) fn validate(&self) -> Result<()> {
        self.urls()?;
        Ok(())
    }

    pub(crate) fn urls(&self) -> Result<Vec<Url>> {
        let mut urls = vec![];

        for url_str in &self.urls {
            let url = Url::parse(url_str)
                .map_err(|e| Error::ErrInvalidIceServerUrl(format!("{url_str}: {e}")))?;
            if url.path().is_empty() {
                return Err(Error::ErrInvalidIceServerUrl(url_str.clone()));
            }

            match url.scheme() {
                SCHEME_STUN | SCHEME_STUNS => {}
                SCHEME_TURN | SCHEME_TURNS => {
                    // https://www.w3.org/TR/webrtc/#set-the-configuration (step #11.3.2)
                    if self.username.is_empty() || self.credential.is_empty() {
                        return Err(Error::ErrNoTurnCredentials);
                    }
                }
                scheme => return Err(Error::ErrUnsupportedIceServerScheme(scheme.to_owned())),
            }

            urls.push(url);
        }

        Ok(urls)
    }
}

fn string_or_seq<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrSeq {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrSeq::deserialize(deserializer)? {
        StringOrSeq::One(url) => vec![url],
        StringOrSeq::Many(urls) => urls,
    })
}
