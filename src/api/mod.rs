//! Client for the family video REST API.
//!
//! Endpoints: `GET /videos`, `GET /play/{id}`, `POST /upload/initiate`,
//! `PUT /videos/{id}`, `DELETE /videos/{id}`, `GET /search?q=` and
//! `GET /continue-watching?profileId=`. All of them carry
//! `Authorization: Bearer <token>`.

mod client;
mod error;
mod models;
mod retry;

pub use client::{
    ApiClient, ApiConfig, CONNECT_TIMEOUT_SECS, DEFAULT_API_BASE_URL, READ_TIMEOUT_SECS,
    require_token,
};
pub use error::ApiError;
pub use models::{
    ContinueWatchingEntry, UploadMetadata, UploadTicket, Video, VideoPatch, VideoSnapshot,
    parse_timestamp,
};
pub use retry::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES, FailureType, RETRYABLE_STATUS_CODES, RetryDecision,
    RetryPolicy, classify_error,
};
