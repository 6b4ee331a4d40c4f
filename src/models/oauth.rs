use serde::{Deserialize, Serialize};

/// Session key holding the pending sign-in started by `/oauth/authorize`.
pub const OAUTH_SESSION_KEY: &str = "oauth_data";
/// Session key holding the access token once a code has been exchanged.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Discriminator every relayed message carries so openers can filter
/// their `message` events.
pub const MESSAGE_SOURCE: &str = "oauth_callback";

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct OAuthSessionData {
    pub pkce_verifier_secret: Option<String>,
    pub csrf_token_secret: Option<String>,
}

/// What the identity provider handed back on the redirect. Lives for one
/// page load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackResult {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Success,
    ProviderError,
    MalformedCallback,
}

impl Disposition {
    pub fn is_relayable(self) -> bool {
        !matches!(self, Disposition::MalformedCallback)
    }
}

/// Ways a callback result can leave the popup, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    OpenerWindow,
    NativeDeepLink,
    WebAppRedirect,
    ManualDisplay,
}

/// Payload posted to the opener window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub source: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl RelayMessage {
    /// Builds the payload for a classified result. Malformed callbacks have
    /// nothing worth relaying.
    pub fn for_result(result: &CallbackResult, disposition: Disposition) -> Option<Self> {
        match disposition {
            Disposition::Success => Some(Self {
                source: MESSAGE_SOURCE.to_string(),
                success: true,
                code: result.code.clone(),
                state: result.state.clone(),
                error: None,
                error_description: None,
            }),
            Disposition::ProviderError => Some(Self {
                source: MESSAGE_SOURCE.to_string(),
                success: false,
                code: None,
                state: None,
                error: result.error.clone(),
                error_description: result
                    .error_description
                    .clone()
                    .filter(|description| !description.is_empty()),
            }),
            Disposition::MalformedCallback => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExchangeParams {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
}
