//! Opaque OAuth `state` payload carried through the provider redirect.
//!
//! The payload is a closed, versioned record encoded as unpadded URL-safe
//! base64 of its JSON form. Decoding never fails: anything that is not a
//! well-formed current-version payload yields [`OAuthState::default`].
//!
//! The state is not signed. It only steers the post-login redirect, and the
//! origin it carries is re-checked against the allow-list before use.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Version tag written by [`OAuthState::encode`].
pub const STATE_VERSION: u8 = 1;

/// Round-trip payload for a single login attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthState {
    /// Front-end origin that started the login.
    #[serde(
        rename = "frontendOrigin",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub frontend_origin: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u8,
    #[serde(flatten)]
    payload: OAuthState,
}

impl OAuthState {
    /// Creates a payload for a login started from `frontend_origin`.
    ///
    /// An empty origin is stored as absent.
    #[must_use]
    pub fn for_origin(frontend_origin: Option<&str>) -> Self {
        Self {
            frontend_origin: frontend_origin
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string),
        }
    }

    /// Encodes the payload into a URL-safe opaque string.
    #[must_use]
    pub fn encode(&self) -> String {
        let envelope = Envelope {
            v: STATE_VERSION,
            payload: self.clone(),
        };
        // Serializing a struct of strings cannot fail.
        let json = serde_json::to_vec(&envelope).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decodes an opaque state, falling back to the empty payload.
    #[must_use]
    pub fn decode(token: &str) -> Self {
        Self::try_decode(token).unwrap_or_default()
    }

    fn try_decode(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }

        let bytes = URL_SAFE_NO_PAD.decode(token.trim_end_matches('=')).ok()?;
        let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        if !value.is_object() {
            return None;
        }

        let envelope: Envelope = serde_json::from_value(value).ok()?;
        (envelope.v == STATE_VERSION).then_some(envelope.payload)
    }
}
