//! Fragments handed to the ingestion entry point

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One chunk of captured traffic for a session
///
/// In JSON the `data` field is base64 encoded, since captured traffic is
/// arbitrary binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub session_id: String,

    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,

    /// Set on the fragment that carries the response, completing the session
    #[serde(default)]
    pub has_response: bool,
}

impl Fragment {
    pub fn new(session_id: impl Into<String>, data: impl Into<Vec<u8>>, has_response: bool) -> Self {
        Self {
            session_id: session_id.into(),
            data: data.into(),
            has_response,
        }
    }
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
