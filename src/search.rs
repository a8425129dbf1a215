//! Video search and browse categories.
//!
//! Remote search is preferred; local substring matching over an in-memory
//! list is the fallback. Neither tokenizes, ranks nor fuzzy-matches.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::api::{ApiClient, Video};

/// Videos shown under [`Category::RecentlyAdded`].
pub const RECENTLY_ADDED_LIMIT: usize = 10;

/// Case-insensitive substring search over title, description and tags.
///
/// A blank query matches nothing.
#[must_use]
pub fn search_local(query: &str, videos: &[Video]) -> Vec<Video> {
    let term = query.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }
    videos
        .iter()
        .filter(|video| {
            video.title.to_lowercase().contains(&term)
                || video
                    .description
                    .as_deref()
                    .is_some_and(|description| description.to_lowercase().contains(&term))
                || video.tags.join(" ").to_lowercase().contains(&term)
        })
        .cloned()
        .collect()
}

/// Searches through the API, falling back to [`search_local`] over
/// `fallback` when there is no token or the request fails.
///
/// A blank query returns nothing without any request.
#[instrument(skip(api, token, fallback), fields(fallback_len = fallback.len()))]
pub async fn search_videos(
    api: &ApiClient,
    token: Option<&str>,
    query: &str,
    fallback: &[Video],
) -> Vec<Video> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    match search_remote(api, token, query).await {
        Some(videos) => videos,
        None => search_local(query, fallback),
    }
}

/// Like [`search_videos`], but only calls `load_fallback` once the remote
/// search is skipped or has failed.
#[instrument(skip(api, token, load_fallback))]
pub async fn search_videos_with<F, Fut>(
    api: &ApiClient,
    token: Option<&str>,
    query: &str,
    load_fallback: F,
) -> Vec<Video>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Vec<Video>>,
{
    if query.trim().is_empty() {
        return Vec::new();
    }
    match search_remote(api, token, query).await {
        Some(videos) => videos,
        None => search_local(query, &load_fallback().await),
    }
}

/// Remote results, or `None` when signed out or the request failed.
async fn search_remote(api: &ApiClient, token: Option<&str>, query: &str) -> Option<Vec<Video>> {
    if !token.is_some_and(|token| !token.trim().is_empty()) {
        return None;
    }
    match api.search_videos(token, query).await {
        Ok(videos) => {
            debug!(count = videos.len(), "remote search results");
            Some(videos)
        }
        Err(error) => {
            warn!(%error, "remote search failed; searching locally");
            None
        }
    }
}

/// Browse categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Trips and holidays.
    FamilyTrips,
    /// Birthdays and parties.
    Birthdays,
    /// Children.
    Kids,
    /// Archive footage.
    OldMemories,
    /// The newest uploads.
    RecentlyAdded,
}

impl Category {
    /// Every category in display order.
    pub const ALL: [Category; 5] = [
        Category::FamilyTrips,
        Category::Birthdays,
        Category::Kids,
        Category::OldMemories,
        Category::RecentlyAdded,
    ];

    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FamilyTrips => "Family Trips",
            Self::Birthdays => "Birthdays",
            Self::Kids => "Kids",
            Self::OldMemories => "Old Memories",
            Self::RecentlyAdded => "Recently Added",
        }
    }

    /// Lowercase keywords a video's text must contain one of.
    #[must_use]
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::FamilyTrips => &["trip", "vacation", "travel", "journey", "adventure"],
            Self::Birthdays => &["birthday", "celebration", "party"],
            Self::Kids => &["kids", "children", "child", "baby", "toddler"],
            Self::OldMemories => &["old", "vintage", "archive", "memory", "past"],
            Self::RecentlyAdded => &[],
        }
    }

    /// Videos in this category.
    ///
    /// [`Category::RecentlyAdded`] is the newest [`RECENTLY_ADDED_LIMIT`]
    /// videos by upload time; the others match keywords against title,
    /// description and tags.
    #[must_use]
    pub fn videos(self, videos: &[Video]) -> Vec<Video> {
        if self == Self::RecentlyAdded {
            let mut sorted = videos.to_vec();
            sorted.sort_by_key(|video| Reverse(video.uploaded_at_utc()));
            sorted.truncate(RECENTLY_ADDED_LIMIT);
            return sorted;
        }

        let keywords = self.keywords();
        videos
            .iter()
            .filter(|video| {
                let text = format!(
                    "{} {} {}",
                    video.title,
                    video.description.as_deref().unwrap_or_default(),
                    video.tags.join(" ")
                )
                .to_lowercase();
                keywords.iter().any(|keyword| text.contains(keyword))
            })
            .cloned()
            .collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts display names case-insensitively (`"family trips"`,
    /// `"Recently Added"`) and kebab-case (`"old-memories"`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().replace('-', " ").to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.name().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown category: {value}"))
    }
}

/// A category with its videos, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryData {
    /// Category display name.
    pub name: String,
    /// Matching videos.
    pub videos: Vec<Video>,
    /// Number of matching videos.
    pub count: usize,
}

/// Display names of every category.
#[must_use]
pub fn categories() -> Vec<&'static str> {
    Category::ALL.iter().map(|category| category.name()).collect()
}

/// Videos for a category given by name; unknown names match nothing.
#[must_use]
pub fn videos_by_category(name: &str, videos: &[Video]) -> Vec<Video> {
    name.parse::<Category>()
        .map(|category| category.videos(videos))
        .unwrap_or_default()
}

/// [`videos_by_category`] bundled with its name and count.
#[must_use]
pub fn category_data(name: &str, videos: &[Video]) -> CategoryData {
    let videos = videos_by_category(name, videos);
    CategoryData {
        name: name.to_string(),
        count: videos.len(),
        videos,
    }
}
