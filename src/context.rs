//! Application context shared by every operation.
//!
//! Built once at start-up and passed explicitly; there is no global state.
//! [`AppContext::logout`] is the explicit teardown of the signed-in session.

use std::path::Path;

use tracing::{info, instrument};

use crate::api::{ApiClient, ApiConfig, ApiError};
use crate::auth::{HostedUi, TokenStore, UserInfo};
use crate::continue_watching::ContinueWatchingStore;
use crate::db::{Database, DbError};
use crate::playlists::PlaylistStore;
use crate::profiles::{Profile, ProfileStore};
use crate::storage::{LocalStorage, StorageError};

/// Errors while building an [`AppContext`].
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The local database could not be opened.
    #[error(transparent)]
    Database(#[from] DbError),

    /// The API client could not be built.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Everything an operation needs: storage, API client and sign-in settings.
#[derive(Debug, Clone)]
pub struct AppContext {
    storage: LocalStorage,
    api: ApiClient,
    hosted_ui: HostedUi,
}

impl AppContext {
    /// Assembles a context from already-built parts.
    #[must_use]
    pub fn new(storage: LocalStorage, api: ApiClient, hosted_ui: HostedUi) -> Self {
        Self {
            storage,
            api,
            hosted_ui,
        }
    }

    /// Opens the database at `db_path` and builds the API client.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] if the database cannot be opened or the API
    /// settings are invalid.
    #[instrument(skip(api_config, hosted_ui), fields(path = %db_path.display()))]
    pub async fn open(
        db_path: &Path,
        api_config: ApiConfig,
        hosted_ui: HostedUi,
    ) -> Result<Self, ContextError> {
        let db = Database::new(db_path).await?;
        let api = ApiClient::new(api_config)?;
        Ok(Self::new(LocalStorage::new(db), api, hosted_ui))
    }

    /// Local key/value storage.
    #[must_use]
    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Hosted sign-in settings.
    #[must_use]
    pub fn hosted_ui(&self) -> &HostedUi {
        &self.hosted_ui
    }

    /// Token store.
    #[must_use]
    pub fn tokens(&self) -> TokenStore {
        TokenStore::new(self.storage.clone())
    }

    /// Profile store.
    #[must_use]
    pub fn profiles(&self) -> ProfileStore {
        ProfileStore::new(self.storage.clone())
    }

    /// Playlist store.
    #[must_use]
    pub fn playlists(&self) -> PlaylistStore {
        PlaylistStore::new(self.storage.clone())
    }

    /// Continue-watching store.
    #[must_use]
    pub fn continue_watching(&self) -> ContinueWatchingStore {
        ContinueWatchingStore::new(self.storage.clone())
    }

    /// The bearer token for API calls, if signed in.
    pub async fn session_token(&self) -> Option<String> {
        self.tokens().id_token().await
    }

    /// Who is signed in, if anyone.
    pub async fn user(&self) -> Option<UserInfo> {
        self.tokens().user_info().await
    }

    /// The selected profile, if any.
    pub async fn active_profile(&self) -> Option<Profile> {
        self.profiles().active().await
    }

    /// Ends the session: clears both tokens and the active profile.
    ///
    /// Returns the hosted UI logout URL for the browser.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the tokens cannot be removed.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<String, StorageError> {
        self.tokens().clear().await?;
        self.profiles().clear_active().await;
        info!("signed out");
        Ok(self.hosted_ui.logout_url())
    }
}
