//! Per-profile "continue watching" lists.
//!
//! Each profile has at most [`MAX_ENTRIES`] entries, one per video, ordered
//! most recently watched first.

use std::cmp::Reverse;

use tracing::{debug, error, instrument, warn};

pub use crate::api::{ContinueWatchingEntry, VideoSnapshot};
use crate::api::{ApiClient, parse_timestamp};
use crate::storage::{LocalStorage, keys, timestamp_now};

/// Entries kept per profile.
pub const MAX_ENTRIES: usize = 20;

/// Clamps a progress fraction into `[0, 1]`; NaN becomes 0.
#[must_use]
pub fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Reads and writes continue-watching lists.
#[derive(Debug, Clone)]
pub struct ContinueWatchingStore {
    storage: LocalStorage,
}

impl ContinueWatchingStore {
    /// Creates a store over `storage`.
    #[must_use]
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// The stored list for `profile_id`; empty when absent or unreadable.
    pub async fn list(&self, profile_id: &str) -> Vec<ContinueWatchingEntry> {
        let key = keys::continue_watching(profile_id);
        match self.storage.get_json(&key).await {
            Ok(entries) => entries.unwrap_or_default(),
            Err(error) => {
                error!(profile_id, %error, "failed to load continue watching");
                Vec::new()
            }
        }
    }

    /// Replaces the stored list for `profile_id`.
    pub async fn save(&self, profile_id: &str, entries: &[ContinueWatchingEntry]) {
        let key = keys::continue_watching(profile_id);
        if let Err(error) = self.storage.set_json(&key, entries).await {
            error!(profile_id, %error, "failed to save continue watching");
        }
    }

    /// Records progress on `video_id`.
    ///
    /// An existing entry keeps its snapshot and gets the new progress and
    /// time; otherwise a new entry is built from `snapshot` (or from the id
    /// alone). The list is re-sorted newest first and cut to
    /// [`MAX_ENTRIES`]. Returns the stored list.
    #[instrument(skip(self, snapshot))]
    pub async fn upsert_progress(
        &self,
        profile_id: &str,
        video_id: &str,
        progress: f64,
        snapshot: Option<VideoSnapshot>,
    ) -> Vec<ContinueWatchingEntry> {
        let key = keys::continue_watching(profile_id);
        let progress = clamp_progress(progress);
        let now = timestamp_now();

        let result = self
            .storage
            .update_json(&key, Vec::new, |entries: &mut Vec<ContinueWatchingEntry>| {
                let entry = match entries.iter().position(|entry| entry.video.id == video_id) {
                    Some(index) => {
                        let mut entry = entries.remove(index);
                        entry.progress = progress;
                        entry.last_watched_at.clone_from(&now);
                        entry
                    }
                    None => {
                        let mut video =
                            snapshot.unwrap_or_else(|| VideoSnapshot::from_id(video_id));
                        video.id = video_id.to_string();
                        if video.uploaded_at.is_none() {
                            video.uploaded_at = Some(now.clone());
                        }
                        ContinueWatchingEntry {
                            video,
                            progress,
                            last_watched_at: now.clone(),
                        }
                    }
                };
                // Newest entry goes first so it wins ties on equal timestamps.
                entries.insert(0, entry);
                entries.sort_by_key(|entry| Reverse(parse_timestamp(&entry.last_watched_at)));
                entries.truncate(MAX_ENTRIES);
                entries.clone()
            })
            .await;

        match result {
            Ok(entries) => {
                debug!(profile_id, video_id, progress, count = entries.len(), "progress recorded");
                entries
            }
            Err(error) => {
                error!(profile_id, video_id, %error, "failed to record progress");
                self.list(profile_id).await
            }
        }
    }

    /// Drops `video_id` from the list. Returns whether it was present.
    pub async fn remove(&self, profile_id: &str, video_id: &str) -> bool {
        let key = keys::continue_watching(profile_id);
        let result = self
            .storage
            .update_json(&key, Vec::new, |entries: &mut Vec<ContinueWatchingEntry>| {
                let before = entries.len();
                entries.retain(|entry| entry.video.id != video_id);
                entries.len() < before
            })
            .await;
        match result {
            Ok(removed) => removed,
            Err(error) => {
                error!(profile_id, video_id, %error, "failed to remove from continue watching");
                false
            }
        }
    }

    /// Deletes the whole list for `profile_id`.
    pub async fn clear(&self, profile_id: &str) {
        let key = keys::continue_watching(profile_id);
        if let Err(error) = self.storage.remove_item(&key).await {
            error!(profile_id, %error, "failed to clear continue watching");
        }
    }

    /// Fetches the list from the API, caching it locally; falls back to the
    /// stored list when there is no token or the request fails.
    #[instrument(skip(self, api, token))]
    pub async fn fetch(
        &self,
        api: &ApiClient,
        token: Option<&str>,
        profile_id: &str,
    ) -> Vec<ContinueWatchingEntry> {
        let has_token = token.is_some_and(|token| !token.trim().is_empty());
        if has_token && !profile_id.trim().is_empty() {
            match api.fetch_continue_watching(token, profile_id).await {
                Ok(entries) => {
                    self.save(profile_id, &entries).await;
                    return entries;
                }
                Err(error) => {
                    warn!(
                        profile_id,
                        %error,
                        "remote continue watching unavailable; using local list"
                    );
                }
            }
        }
        self.list(profile_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::ApiConfig;
    use crate::db::Database;

    async fn store() -> ContinueWatchingStore {
        ContinueWatchingStore::new(LocalStorage::new(Database::new_in_memory().await.unwrap()))
    }

    fn entry(id: &str, at: &str) -> ContinueWatchingEntry {
        ContinueWatchingEntry {
            video: VideoSnapshot::from_id(id),
            progress: 0.5,
            last_watched_at: at.to_string(),
        }
    }

    #[test]
    fn test_clamp_progress() {
        assert!((clamp_progress(1.7) - 1.0).abs() < f64::EPSILON);
        assert!(clamp_progress(-0.2).abs() < f64::EPSILON);
        assert!(clamp_progress(f64::NAN).abs() < f64::EPSILON);
        assert!((clamp_progress(0.42) - 0.42).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_list_is_empty_when_absent() {
        let store = store().await;
        assert!(store.list("1").await.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_new_entry_uses_snapshot_defaults() {
        let store = store().await;
        let entries = store.upsert_progress("1", "v1", 0.3, None).await;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].video.title, "Untitled");
        assert!(entries[0].video.uploaded_at.is_some());
        assert_eq!(store.list("1").await, entries);
    }

    #[tokio::test]
    async fn test_upsert_existing_updates_in_place() {
        let store = store().await;
        let snapshot = VideoSnapshot {
            title: "Beach".to_string(),
            ..VideoSnapshot::from_id("v1")
        };
        store.upsert_progress("1", "v1", 0.1, Some(snapshot)).await;
        store.upsert_progress("1", "v2", 0.2, None).await;
        let entries = store.upsert_progress("1", "v1", 0.9, None).await;

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].video.id, "v1");
        assert_eq!(entries[0].video.title, "Beach");
        assert!((entries[0].progress - 0.9).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_twenty_one_videos_keep_twenty_most_recent() {
        let store = store().await;
        for n in 0..21 {
            store.upsert_progress("1", &format!("v{n}"), 0.5, None).await;
        }

        let entries = store.list("1").await;
        assert_eq!(entries.len(), MAX_ENTRIES);
        assert_eq!(entries[0].video.id, "v20");
        assert!(entries.iter().all(|entry| entry.video.id != "v0"));
    }

    #[tokio::test]
    async fn test_lists_are_per_profile() {
        let store = store().await;
        store.upsert_progress("1", "v1", 0.5, None).await;
        assert!(store.list("2").await.is_empty());
    }

    #[tokio::test]
    async fn test_sort_orders_by_timestamp_not_insertion() {
        let store = store().await;
        store
            .save(
                "1",
                &[
                    entry("old", "2024-01-01T00:00:00.000Z"),
                    entry("older", "2023-01-01T00:00:00.000Z"),
                ],
            )
            .await;
        let entries = store.upsert_progress("1", "new", 0.1, None).await;
        let ids: Vec<&str> = entries.iter().map(|entry| entry.video.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "older"]);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = store().await;
        store.upsert_progress("1", "v1", 0.5, None).await;
        store.upsert_progress("1", "v2", 0.5, None).await;

        assert!(store.remove("1", "v1").await);
        assert!(!store.remove("1", "v1").await);
        assert_eq!(store.list("1").await.len(), 1);

        store.clear("1").await;
        assert!(store.list("1").await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_caches_remote_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/continue-watching"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "videos": [{
                    "video": {"id": "r1", "title": "Remote"},
                    "progress": 0.4,
                    "lastWatchedAt": "2024-02-02T00:00:00Z"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        let api = ApiClient::new(ApiConfig::with_base_url(server.uri())).unwrap();
        let store = store().await;

        let entries = store.fetch(&api, Some("tok"), "1").await;

        assert_eq!(entries[0].video.title, "Remote");
        assert_eq!(store.list("1").await, entries);
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_local_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        let api = ApiClient::new(ApiConfig::with_base_url(server.uri())).unwrap();
        let store = store().await;
        store.upsert_progress("1", "local", 0.5, None).await;

        let entries = store.fetch(&api, Some("tok"), "1").await;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].video.id, "local");
    }

    #[tokio::test]
    async fn test_fetch_without_token_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let api = ApiClient::new(ApiConfig::with_base_url(server.uri())).unwrap();

        assert!(store().await.fetch(&api, None, "1").await.is_empty());
    }
}
