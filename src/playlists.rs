//! Playlists: named, ordered lists of video ids kept on the device.
//!
//! A playlist's `video_ids` never contains duplicates and `video_count`
//! always equals its length after any mutation made here.

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::storage::{LocalStorage, generate_id, keys, timestamp_now};

/// An ordered collection of videos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    /// Record id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Cover image URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Video ids in play order.
    #[serde(default)]
    pub video_ids: Vec<String>,
    /// Number of videos (always `video_ids.len()`).
    #[serde(default)]
    pub video_count: usize,
    /// Creation time.
    pub created_at: String,
    /// Last modification time.
    pub updated_at: String,
}

impl Playlist {
    fn touch(&mut self) {
        self.video_count = self.video_ids.len();
        self.updated_at = timestamp_now();
    }
}

/// Fields for a new playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPlaylist {
    /// Display name.
    pub name: String,
    /// Description; empty when `None`.
    pub description: Option<String>,
}

/// Fields to change on a playlist. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistPatch {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New cover image URL.
    pub thumbnail: Option<String>,
}

/// The playlists seeded on first use.
#[must_use]
pub fn default_playlists() -> Vec<Playlist> {
    [
        (
            "1",
            "Christmas 2024",
            "All our Christmas memories from 2024",
            &["6", "5"][..],
            "2024-12-25",
            "2024-12-25",
        ),
        (
            "2",
            "Baby's First Year",
            "Precious moments from the first year",
            &["4", "2"][..],
            "2024-01-01",
            "2024-01-15",
        ),
        (
            "3",
            "Family Trips",
            "Our adventures together",
            &["1", "3"][..],
            "2024-01-10",
            "2024-01-15",
        ),
        (
            "4",
            "Birthday Celebrations",
            "All the birthday fun",
            &["2"][..],
            "2024-01-10",
            "2024-01-10",
        ),
    ]
    .into_iter()
    .map(|(id, name, description, video_ids, created_at, updated_at)| Playlist {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        thumbnail: None,
        video_ids: video_ids.iter().map(ToString::to_string).collect(),
        video_count: video_ids.len(),
        created_at: created_at.to_string(),
        updated_at: updated_at.to_string(),
    })
    .collect()
}

/// CRUD over the stored playlist list.
#[derive(Debug, Clone)]
pub struct PlaylistStore {
    storage: LocalStorage,
}

impl PlaylistStore {
    /// Creates a playlist store over `storage`.
    #[must_use]
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// All playlists; seeds [`default_playlists`] on first use.
    pub async fn list(&self) -> Vec<Playlist> {
        match self
            .storage
            .load_or_init(keys::PLAYLISTS, default_playlists)
            .await
        {
            Ok(playlists) => playlists,
            Err(error) => {
                error!(%error, "failed to load playlists");
                default_playlists()
            }
        }
    }

    /// Replaces the whole stored list.
    pub async fn save_all(&self, playlists: &[Playlist]) {
        if let Err(error) = self.storage.set_json(keys::PLAYLISTS, playlists).await {
            error!(%error, "failed to save playlists");
        }
    }

    /// The playlist with `id`, if any.
    pub async fn get_by_id(&self, id: &str) -> Option<Playlist> {
        self.list().await.into_iter().find(|playlist| playlist.id == id)
    }

    /// Appends an empty playlist with a fresh id.
    #[instrument(skip(self))]
    pub async fn create(&self, new: NewPlaylist) -> Playlist {
        let now = timestamp_now();
        let playlist = Playlist {
            id: generate_id(),
            name: new.name.trim().to_string(),
            description: new.description.unwrap_or_default(),
            thumbnail: None,
            video_ids: Vec::new(),
            video_count: 0,
            created_at: now.clone(),
            updated_at: now,
        };

        let stored = playlist.clone();
        if let Err(error) = self
            .storage
            .update_json(keys::PLAYLISTS, default_playlists, |playlists: &mut Vec<Playlist>| {
                playlists.push(stored);
            })
            .await
        {
            error!(%error, "failed to save new playlist");
        }

        info!(id = %playlist.id, name = %playlist.name, "playlist created");
        playlist
    }

    /// Merges `patch` into the playlist with `id` and refreshes `updated_at`.
    pub async fn update(&self, id: &str, patch: PlaylistPatch) -> Option<Playlist> {
        self.modify(id, |playlist| {
            if let Some(name) = patch.name {
                playlist.name = name.trim().to_string();
            }
            if let Some(description) = patch.description {
                playlist.description = description;
            }
            if let Some(thumbnail) = patch.thumbnail {
                playlist.thumbnail = Some(thumbnail);
            }
            true
        })
        .await
    }

    /// Removes the playlist with `id`. Returns whether the list shrank.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> bool {
        let result = self
            .storage
            .update_json(keys::PLAYLISTS, default_playlists, |playlists: &mut Vec<Playlist>| {
                let before = playlists.len();
                playlists.retain(|playlist| playlist.id != id);
                playlists.len() < before
            })
            .await;
        match result {
            Ok(removed) => removed,
            Err(error) => {
                error!(id, %error, "failed to delete playlist");
                false
            }
        }
    }

    /// Appends `video_id` unless already present.
    ///
    /// A video that is already in the playlist leaves it untouched.
    pub async fn add_video(&self, playlist_id: &str, video_id: &str) -> Option<Playlist> {
        self.modify(playlist_id, |playlist| {
            if playlist.video_ids.iter().any(|id| id == video_id) {
                return false;
            }
            playlist.video_ids.push(video_id.to_string());
            true
        })
        .await
    }

    /// Removes every occurrence of `video_id`.
    pub async fn remove_video(&self, playlist_id: &str, video_id: &str) -> Option<Playlist> {
        self.modify(playlist_id, |playlist| {
            playlist.video_ids.retain(|id| id != video_id);
            true
        })
        .await
    }

    /// Playlists that contain `video_id`.
    pub async fn playlists_for_video(&self, video_id: &str) -> Vec<Playlist> {
        self.list()
            .await
            .into_iter()
            .filter(|playlist| playlist.video_ids.iter().any(|id| id == video_id))
            .collect()
    }

    /// Applies `change` to one playlist in a single transaction. `change`
    /// returns whether it modified the playlist; only then is it touched.
    async fn modify<F>(&self, id: &str, change: F) -> Option<Playlist>
    where
        F: FnOnce(&mut Playlist) -> bool,
    {
        let result = self
            .storage
            .update_json(keys::PLAYLISTS, default_playlists, |playlists: &mut Vec<Playlist>| {
                let playlist = playlists.iter_mut().find(|playlist| playlist.id == id)?;
                if change(playlist) {
                    playlist.touch();
                }
                Some(playlist.clone())
            })
            .await;
        match result {
            Ok(updated) => updated,
            Err(error) => {
                error!(id, %error, "failed to update playlist");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn store() -> PlaylistStore {
        PlaylistStore::new(LocalStorage::new(Database::new_in_memory().await.unwrap()))
    }

    fn named(name: &str) -> NewPlaylist {
        NewPlaylist {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_write_failures_degrade_to_defaults() {
        let store = store().await;
        store.list().await;
        store.storage.database().pool().close().await;

        let created = store.create(named("Summer")).await;
        assert_eq!(created.name, "Summer");
        assert_eq!(created.video_count, 0);

        let patch = PlaylistPatch {
            name: Some("Winter".to_string()),
            ..PlaylistPatch::default()
        };
        assert_eq!(store.update("1", patch).await, None);
        assert_eq!(store.add_video("1", "9").await, None);
        assert!(!store.delete("1").await);
        assert_eq!(store.list().await, default_playlists());
    }

    #[tokio::test]
    async fn test_list_seeds_defaults() {
        let store = store().await;
        let playlists = store.list().await;
        assert_eq!(playlists, default_playlists());
        assert_eq!(playlists[0].video_ids, vec!["6", "5"]);
        assert_eq!(playlists[3].video_count, 1);
    }

    #[tokio::test]
    async fn test_create_then_get_is_empty() {
        let store = store().await;
        let created = store.create(named("X")).await;

        let fetched = store.get_by_id(&created.id).await.unwrap();
        assert!(fetched.video_ids.is_empty());
        assert_eq!(fetched.video_count, 0);
        assert_eq!(fetched.description, "");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_add_video_twice_keeps_one_copy() {
        let store = store().await;
        let playlist = store.create(named("X")).await;

        store.add_video(&playlist.id, "v1").await.unwrap();
        let after = store.add_video(&playlist.id, "v1").await.unwrap();

        assert_eq!(after.video_ids, vec!["v1"]);
        assert_eq!(after.video_count, 1);
    }

    #[tokio::test]
    async fn test_remove_video_recomputes_count() {
        let store = store().await;
        let after = store.remove_video("1", "6").await.unwrap();
        assert_eq!(after.video_ids, vec!["5"]);
        assert_eq!(after.video_count, 1);
        assert_ne!(after.updated_at, "2024-12-25");
    }

    #[tokio::test]
    async fn test_mutations_on_missing_playlist_return_none() {
        let store = store().await;
        assert_eq!(store.add_video("missing", "v").await, None);
        assert_eq!(store.remove_video("missing", "v").await, None);
        assert_eq!(store.update("missing", PlaylistPatch::default()).await, None);
        assert_eq!(store.list().await, default_playlists());
    }

    #[tokio::test]
    async fn test_update_merges_and_refreshes_timestamp() {
        let store = store().await;
        let patch = PlaylistPatch {
            name: Some("Xmas".to_string()),
            ..PlaylistPatch::default()
        };
        let updated = store.update("1", patch).await.unwrap();
        assert_eq!(updated.name, "Xmas");
        assert_eq!(updated.description, "All our Christmas memories from 2024");
        assert_eq!(updated.created_at, "2024-12-25");
        assert_ne!(updated.updated_at, "2024-12-25");
    }

    #[tokio::test]
    async fn test_delete_reports_shrink() {
        let store = store().await;
        assert!(store.delete("2").await);
        assert!(!store.delete("2").await);
        assert_eq!(store.list().await.len(), 3);
    }

    #[tokio::test]
    async fn test_save_all_round_trips() {
        let store = store().await;
        let mut playlists = default_playlists();
        playlists.truncate(2);
        playlists[1].thumbnail = Some("https://cdn/t.jpg".to_string());

        store.save_all(&playlists).await;

        assert_eq!(store.list().await, playlists);
    }

    #[tokio::test]
    async fn test_playlists_for_video() {
        let store = store().await;
        let ids: Vec<String> = store
            .playlists_for_video("2")
            .await
            .into_iter()
            .map(|playlist| playlist.id)
            .collect();
        assert_eq!(ids, vec!["2", "4"]);
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Database::new(&temp_dir.path().join("state.db")).await.unwrap();
        let store = PlaylistStore::new(LocalStorage::new(db));
        let playlist = store.create(named("Party")).await;

        let mut handles = Vec::new();
        for n in 0..8 {
            let store = store.clone();
            let id = playlist.id.clone();
            handles.push(tokio::spawn(async move {
                store.add_video(&id, &format!("v{n}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store.get_by_id(&playlist.id).await.unwrap();
        assert_eq!(stored.video_count, 8);
    }
}
