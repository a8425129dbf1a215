//! Sign-in callback parsing and JWT claim decoding.
//!
//! Tokens are never verified here; the API enforces authorization. Claims
//! are read only to show who is signed in.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::AuthError;

/// Tokens delivered by a successful sign-in redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    /// Identity token (a JWT); used as the API bearer token.
    pub id_token: String,
    /// Access token.
    pub access_token: String,
    /// Lifetime in seconds, when provided.
    pub expires_in: Option<u64>,
    /// Token type, `Bearer` unless stated.
    pub token_type: String,
}

/// Result of reading a sign-in redirect fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Sign-in succeeded.
    Tokens(TokenSet),
    /// The identity provider reported an error.
    Error {
        /// Error code (e.g. `access_denied`).
        error: String,
        /// Human-readable description, when provided.
        description: Option<String>,
    },
}

/// Parses the fragment of a sign-in redirect.
///
/// Accepts the bare fragment (`id_token=..&access_token=..`), the fragment
/// with its leading `#`, or the whole redirect URL. Returns `None` when
/// neither an error nor both tokens are present.
#[must_use]
pub fn parse_callback_fragment(input: &str) -> Option<CallbackOutcome> {
    let input = input.trim();
    let fragment = input.split_once('#').map_or(input, |(_, fragment)| fragment);
    if fragment.is_empty() {
        return None;
    }

    let mut id_token = None;
    let mut access_token = None;
    let mut expires_in = None;
    let mut token_type = None;
    let mut error = None;
    let mut description = None;

    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        let value = value.into_owned();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "id_token" => id_token = Some(value),
            "access_token" => access_token = Some(value),
            "expires_in" => expires_in = value.parse().ok(),
            "token_type" => token_type = Some(value),
            "error" => error = Some(value),
            "error_description" => description = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(CallbackOutcome::Error { error, description });
    }

    Some(CallbackOutcome::Tokens(TokenSet {
        id_token: id_token?,
        access_token: access_token?,
        expires_in,
        token_type: token_type.unwrap_or_else(|| "Bearer".to_string()),
    }))
}

/// Claims carried in an identity token payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (stable user id).
    #[serde(default)]
    pub sub: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the email was verified.
    #[serde(default)]
    pub email_verified: Option<bool>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Provider user name.
    #[serde(default, rename = "cognito:username")]
    pub username: Option<String>,
    /// Expiry (seconds since the epoch).
    #[serde(default)]
    pub exp: Option<i64>,
    /// Everything else.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Whether the token expired before `now`. Tokens without `exp` never expire.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires_at| expires_at <= now)
    }
}

/// Who is signed in, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    /// Subject.
    pub sub: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Whether the email was verified.
    pub email_verified: Option<bool>,
    /// Display name: `name`, else user name, else email.
    pub name: Option<String>,
    /// User name, else email.
    pub username: Option<String>,
}

impl From<&Claims> for UserInfo {
    fn from(claims: &Claims) -> Self {
        let username = claims.username.clone().or_else(|| claims.email.clone());
        Self {
            sub: claims.sub.clone(),
            email: claims.email.clone(),
            email_verified: claims.email_verified,
            name: claims.name.clone().or_else(|| username.clone()),
            username,
        }
    }
}

/// Decodes the payload segment of a JWT without verifying it.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] when the token has no payload
/// segment, [`AuthError::Base64`] or [`AuthError::Claims`] when the payload
/// cannot be decoded.
pub fn decode_claims(token: &str) -> Result<Claims, AuthError> {
    let payload = token
        .trim()
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or(AuthError::MalformedToken)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}
