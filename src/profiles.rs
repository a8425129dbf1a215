//! Family member profiles and the active-profile pointer.
//!
//! Profiles live on the device only. Storage failures are logged and
//! absorbed: reads fall back to the default family, writes become no-ops.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::storage::{LocalStorage, StorageError, generate_id, keys};

/// Longest accepted profile name, in characters.
pub const MAX_NAME_CHARS: usize = 20;

/// Color given to new profiles when none is chosen.
pub const DEFAULT_COLOR: &str = "#0066e6";

/// Colors offered when creating a profile.
pub const PROFILE_COLORS: [&str; 8] = [
    "#0066e6", "#564d4d", "#0071eb", "#003d80", "#ff6b00", "#00d4ff", "#1ce783", "#ffa500",
];

/// A family member who watches videos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Record id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Accent color (`#rrggbb`).
    pub color: String,
    /// Whether this is a child's profile.
    #[serde(default)]
    pub is_child: bool,
}

/// Fields for a new profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProfile {
    /// Display name (required, at most [`MAX_NAME_CHARS`]).
    pub name: String,
    /// Accent color; [`DEFAULT_COLOR`] when `None`.
    pub color: Option<String>,
    /// Whether this is a child's profile.
    pub is_child: bool,
}

/// Fields to change on an existing profile. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    /// New name.
    pub name: Option<String>,
    /// New color.
    pub color: Option<String>,
    /// New child flag.
    pub is_child: Option<bool>,
    /// New avatar URL.
    pub avatar: Option<String>,
}

impl ProfilePatch {
    fn apply(&self, profile: &mut Profile) {
        if let Some(name) = &self.name {
            profile.name.clone_from(name);
        }
        if let Some(color) = &self.color {
            profile.color.clone_from(color);
        }
        if let Some(is_child) = self.is_child {
            profile.is_child = is_child;
        }
        if let Some(avatar) = &self.avatar {
            profile.avatar = Some(avatar.clone());
        }
    }
}

/// Rejected profile input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    /// The name is blank.
    #[error("please enter a name")]
    NameRequired,

    /// The name is longer than [`MAX_NAME_CHARS`].
    #[error("name must be {MAX_NAME_CHARS} characters or less")]
    NameTooLong,
}

/// Trims and checks a profile name.
///
/// # Errors
///
/// Returns [`ProfileError`] for a blank or over-long name.
pub fn validate_name(name: &str) -> Result<String, ProfileError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProfileError::NameRequired);
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ProfileError::NameTooLong);
    }
    Ok(name.to_string())
}

/// First palette color no existing profile uses, cycling through
/// [`PROFILE_COLORS`] once all are taken.
#[must_use]
pub fn next_color(existing: &[Profile]) -> &'static str {
    PROFILE_COLORS
        .iter()
        .find(|color| !existing.iter().any(|profile| profile.color == **color))
        .copied()
        .unwrap_or(PROFILE_COLORS[existing.len() % PROFILE_COLORS.len()])
}

/// The family seeded on first use.
#[must_use]
pub fn default_profiles() -> Vec<Profile> {
    [
        ("1", "Dad", "#0066e6", false),
        ("2", "Mum", "#564d4d", false),
        ("3", "Tobi", "#0071eb", true),
        ("4", "Grandma", "#003d80", false),
    ]
    .into_iter()
    .map(|(id, name, color, is_child)| Profile {
        id: id.to_string(),
        name: name.to_string(),
        avatar: None,
        color: color.to_string(),
        is_child,
    })
    .collect()
}

/// CRUD over the stored profile list.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    storage: LocalStorage,
}

impl ProfileStore {
    /// Creates a profile store over `storage`.
    #[must_use]
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// All profiles; seeds [`default_profiles`] on first use.
    pub async fn list(&self) -> Vec<Profile> {
        match self.storage.load_or_init(keys::PROFILES, default_profiles).await {
            Ok(profiles) => profiles,
            Err(error) => {
                error!(%error, "failed to load profiles");
                default_profiles()
            }
        }
    }

    /// The profile with `id`, if any.
    pub async fn get_by_id(&self, id: &str) -> Option<Profile> {
        self.list().await.into_iter().find(|profile| profile.id == id)
    }

    /// Adds a profile with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError`] when the name is rejected. A storage failure
    /// is logged; the record is still returned.
    #[instrument(skip(self))]
    pub async fn create(&self, new: NewProfile) -> Result<Profile, ProfileError> {
        let profile = Profile {
            id: generate_id(),
            name: validate_name(&new.name)?,
            avatar: None,
            color: new
                .color
                .filter(|color| !color.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            is_child: new.is_child,
        };

        let stored = profile.clone();
        let result = self
            .storage
            .update_json(keys::PROFILES, default_profiles, |profiles: &mut Vec<Profile>| {
                profiles.push(stored);
            })
            .await;
        log_write_failure("create", result);

        info!(id = %profile.id, name = %profile.name, "profile created");
        Ok(profile)
    }

    /// Merges `patch` into the profile with `id`.
    ///
    /// Returns `Ok(None)` when no such profile exists. The active pointer is
    /// rewritten when it refers to this profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError`] when a new name is rejected.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: &str,
        patch: ProfilePatch,
    ) -> Result<Option<Profile>, ProfileError> {
        let mut patch = patch;
        if let Some(name) = &patch.name {
            patch.name = Some(validate_name(name)?);
        }

        let result = self
            .storage
            .update_json(keys::PROFILES, default_profiles, |profiles: &mut Vec<Profile>| {
                profiles.iter_mut().find(|profile| profile.id == id).map(|profile| {
                    patch.apply(profile);
                    profile.clone()
                })
            })
            .await;

        let updated = match result {
            Ok(updated) => updated,
            Err(error) => {
                error!(id, %error, "failed to update profile");
                None
            }
        };

        if let Some(profile) = &updated
            && self.active().await.is_some_and(|active| active.id == id)
        {
            self.write_active(profile).await;
        }
        Ok(updated)
    }

    /// Removes the profile with `id`; clears the active pointer if it was
    /// active. Returns whether the list shrank.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> bool {
        let result = self
            .storage
            .update_json(keys::PROFILES, default_profiles, |profiles: &mut Vec<Profile>| {
                let before = profiles.len();
                profiles.retain(|profile| profile.id != id);
                profiles.len() < before
            })
            .await;

        let removed = match result {
            Ok(removed) => removed,
            Err(error) => {
                error!(id, %error, "failed to delete profile");
                false
            }
        };

        if removed && self.active().await.is_some_and(|active| active.id == id) {
            self.clear_active().await;
        }
        removed
    }

    /// The selected profile, if any.
    pub async fn active(&self) -> Option<Profile> {
        match self.storage.get_json(keys::ACTIVE_PROFILE).await {
            Ok(active) => active,
            Err(error) => {
                error!(%error, "failed to read active profile");
                None
            }
        }
    }

    /// Makes the profile with `id` active. Returns it, or `None` if unknown.
    #[instrument(skip(self))]
    pub async fn select(&self, id: &str) -> Option<Profile> {
        let profile = self.get_by_id(id).await?;
        self.write_active(&profile).await;
        info!(id, name = %profile.name, "profile selected");
        Some(profile)
    }

    /// Forgets the active profile.
    pub async fn clear_active(&self) {
        match self.storage.remove_item(keys::ACTIVE_PROFILE).await {
            Ok(_) => debug!("active profile cleared"),
            Err(error) => error!(%error, "failed to clear active profile"),
        }
    }

    async fn write_active(&self, profile: &Profile) {
        if let Err(error) = self.storage.set_json(keys::ACTIVE_PROFILE, profile).await {
            error!(id = %profile.id, %error, "failed to store active profile");
        }
    }
}

fn log_write_failure<T>(operation: &str, result: Result<T, StorageError>) {
    if let Err(error) = result {
        error!(operation, %error, "failed to save profiles");
    }
}
