//! Persisted sign-in tokens.

use tracing::{debug, instrument, warn};

use super::token::{Claims, TokenSet, UserInfo, decode_claims};
use crate::storage::{LocalStorage, StorageError, keys};

/// Reads and writes the identity and access tokens in local storage.
#[derive(Debug, Clone)]
pub struct TokenStore {
    storage: LocalStorage,
}

impl TokenStore {
    /// Creates a token store over `storage`.
    #[must_use]
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// Persists both tokens.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if either write fails.
    #[instrument(skip_all)]
    pub async fn save(&self, tokens: &TokenSet) -> Result<(), StorageError> {
        self.storage.set_json(keys::ID_TOKEN, &tokens.id_token).await?;
        self.storage
            .set_json(keys::ACCESS_TOKEN, &tokens.access_token)
            .await?;
        debug!("tokens saved");
        Ok(())
    }

    /// The stored identity token, used as the API bearer token.
    pub async fn id_token(&self) -> Option<String> {
        self.read(keys::ID_TOKEN).await
    }

    /// The stored access token.
    pub async fn access_token(&self) -> Option<String> {
        self.read(keys::ACCESS_TOKEN).await
    }

    /// Whether a non-empty identity token is stored.
    pub async fn is_authenticated(&self) -> bool {
        self.id_token().await.is_some()
    }

    /// Claims of the stored identity token.
    pub async fn claims(&self) -> Option<Claims> {
        let token = self.id_token().await?;
        match decode_claims(&token) {
            Ok(claims) => Some(claims),
            Err(error) => {
                warn!(%error, "stored identity token could not be decoded");
                None
            }
        }
    }

    /// Who is signed in, when a decodable token is stored.
    pub async fn user_info(&self) -> Option<UserInfo> {
        self.claims().await.as_ref().map(UserInfo::from)
    }

    /// Removes both tokens and the keys older clients wrote.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if a delete fails.
    #[instrument(skip_all)]
    pub async fn clear(&self) -> Result<(), StorageError> {
        for key in [keys::ID_TOKEN, keys::ACCESS_TOKEN]
            .into_iter()
            .chain(keys::LEGACY_AUTH_TOKENS)
        {
            self.storage.remove_item(key).await?;
        }
        debug!("tokens cleared");
        Ok(())
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.storage.get_json::<String>(key).await {
            Ok(token) => token.filter(|token| !token.trim().is_empty()),
            Err(error) => {
                warn!(key, %error, "failed to read stored token");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;
    use crate::db::Database;

    async fn store() -> TokenStore {
        TokenStore::new(LocalStorage::new(Database::new_in_memory().await.unwrap()))
    }

    fn tokens(id_token: &str) -> TokenSet {
        TokenSet {
            id_token: id_token.to_string(),
            access_token: "access".to_string(),
            expires_in: Some(3600),
            token_type: "Bearer".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_then_read_tokens() {
        let store = store().await;
        assert!(!store.is_authenticated().await);

        store.save(&tokens("id")).await.unwrap();

        assert!(store.is_authenticated().await);
        assert_eq!(store.id_token().await.as_deref(), Some("id"));
        assert_eq!(store.access_token().await.as_deref(), Some("access"));
    }

    #[tokio::test]
    async fn test_tokens_are_stored_as_json_strings() {
        let store = store().await;
        store.save(&tokens("id")).await.unwrap();
        assert_eq!(
            store.storage.get_item(keys::ID_TOKEN).await.unwrap().as_deref(),
            Some("\"id\"")
        );
    }

    #[tokio::test]
    async fn test_clear_removes_tokens_and_legacy_keys() {
        let store = store().await;
        store.save(&tokens("id")).await.unwrap();
        store.storage.set_item("authToken", "id").await.unwrap();

        store.clear().await.unwrap();

        assert!(!store.is_authenticated().await);
        assert_eq!(store.storage.get_item("authToken").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_user_info_from_stored_token() {
        let store = store().await;
        let payload = URL_SAFE_NO_PAD.encode(r#"{"email":"tobi@example.com"}"#);
        store.save(&tokens(&format!("h.{payload}.s"))).await.unwrap();

        let info = store.user_info().await.unwrap();
        assert_eq!(info.name.as_deref(), Some("tobi@example.com"));
    }

    #[tokio::test]
    async fn test_undecodable_token_has_no_user_info() {
        let store = store().await;
        store.save(&tokens("garbage")).await.unwrap();
        assert!(store.is_authenticated().await);
        assert_eq!(store.user_info().await, None);
    }
}
