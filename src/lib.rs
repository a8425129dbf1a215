//! Family Cloud Core Library
//!
//! Client-side core of the family video cloud: an authenticated API client
//! with retry and response normalization, presigned uploads, hosted sign-in
//! helpers, and on-device stores for profiles, playlists and
//! continue-watching progress.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`db`] - SQLite connection and schema management
//! - [`storage`] - Key/value storage on top of the database
//! - [`api`] - REST client, retry policy and wire types
//! - [`upload`] - Streaming uploads to presigned URLs
//! - [`auth`] - Hosted sign-in URLs, callback parsing, token storage
//! - [`profiles`], [`playlists`], [`continue_watching`] - On-device stores
//! - [`search`] - Remote search with local fallback, browse categories
//! - [`context`] - The explicit application context

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod context;
pub mod continue_watching;
pub mod db;
pub mod playlists;
pub mod profiles;
pub mod search;
pub mod storage;
pub mod upload;

// Re-export commonly used types
pub use api::{ApiClient, ApiConfig, ApiError, RetryPolicy, Video};
pub use auth::{HostedUi, TokenStore};
pub use context::{AppContext, ContextError};
pub use continue_watching::{ContinueWatchingEntry, ContinueWatchingStore};
pub use db::{Database, DbError};
pub use playlists::{Playlist, PlaylistStore};
pub use profiles::{Profile, ProfileStore};
pub use storage::{LocalStorage, StorageError};
pub use upload::{UploadError, UploadProgress, upload_video};
