//! Sign-in through the hosted identity provider.
//!
//! The redirect flow itself happens in a browser. This module builds the
//! hosted page URLs, reads the tokens from the callback fragment, keeps them
//! in local storage, and decodes identity claims for display.

mod hosted_ui;
mod store;
mod token;

use thiserror::Error;

pub use hosted_ui::{DEFAULT_CLIENT_ID, DEFAULT_COGNITO_DOMAIN, DEFAULT_REDIRECT_URI, HostedUi};
pub use store::TokenStore;
pub use token::{
    CallbackOutcome, Claims, TokenSet, UserInfo, decode_claims, parse_callback_fragment,
};

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Hosted UI settings are unusable.
    #[error("invalid hosted UI settings: {0}")]
    InvalidHostedUi(String),

    /// The token is not a three-part JWT.
    #[error("token is not a JWT")]
    MalformedToken,

    /// The payload segment is not base64url.
    #[error("token payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload is not a JSON claims object.
    #[error("token payload is not a claims object: {0}")]
    Claims(#[from] serde_json::Error),
}
