//! Storage key names.
//!
//! These match the keys the web client wrote to browser storage. Values
//! differ for the two token keys: the web client stored the raw token text,
//! while here every value is JSON-encoded, so tokens are stored as JSON
//! strings. Collection keys hold the same JSON in both.

/// Cognito ID token (bearer credential for the API).
pub const ID_TOKEN: &str = "familyCloudIdToken";

/// Cognito access token.
pub const ACCESS_TOKEN: &str = "familyCloudAccessToken";

/// JSON array of profiles.
pub const PROFILES: &str = "kebijo_profiles";

/// JSON object of the currently selected profile.
pub const ACTIVE_PROFILE: &str = "kebijo_active_profile";

/// JSON array of playlists.
pub const PLAYLISTS: &str = "kebijo_playlists";

/// Token keys older web builds wrote; removed on sign-out.
pub const LEGACY_AUTH_TOKENS: [&str; 2] = ["authToken", "devAuthToken"];

const CONTINUE_WATCHING_PREFIX: &str = "kebijo_continue_watching";

/// Per-profile continue-watching list key.
#[must_use]
pub fn continue_watching(profile_id: &str) -> String {
    format!("{CONTINUE_WATCHING_PREFIX}_{profile_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continue_watching_key_is_scoped_by_profile() {
        assert_eq!(continue_watching("3"), "kebijo_continue_watching_3");
        assert_ne!(continue_watching("1"), continue_watching("2"));
    }
}
