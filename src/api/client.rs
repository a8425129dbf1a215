//! HTTP client for the family video API.
//!
//! [`ApiClient`] is created once and reused; it owns a pooled
//! `reqwest::Client`. Every endpoint requires a bearer token and checks it,
//! then its required parameters, before any request is sent.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::ApiError;
use super::models::{
    CONTINUE_WATCHING_FIELDS, ContinueWatchingEntry, InitiateUploadRequest, PLAYBACK_URL_FIELDS,
    SAVED_VIDEO_FIELDS, SEARCH_RESULT_FIELDS, UPLOAD_URL_FIELDS, UPLOAD_VIDEO_ID_FIELDS,
    UploadMetadata, UploadTicket, VIDEO_LIST_FIELDS, Video, VideoPatch, take_list, take_record,
    take_string,
};
use super::retry::{RetryDecision, RetryPolicy, classify_error};

/// Production API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://1hshn8sqfa.execute-api.us-east-1.amazonaws.com/prod";

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default whole-request timeout (60 seconds).
pub const READ_TIMEOUT_SECS: u64 = 60;

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub read_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// Default settings pointed at `base_url`.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Authenticated client for the video API.
///
/// # Example
///
/// ```no_run
/// use family_cloud_core::api::{ApiClient, ApiConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::new(ApiConfig::default())?;
/// let videos = client.fetch_videos(Some("id-token")).await?;
/// println!("{} videos", videos.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] when the base URL is not an absolute
    /// http(s) URL, or [`ApiError::ClientBuild`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url).map_err(|_| ApiError::invalid_url(&base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::invalid_url(&base_url));
        }

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .gzip(true)
            .user_agent(default_user_agent())
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            http,
            base_url,
            retry: config.retry,
        })
    }

    /// Returns the normalized base URL (no trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the retry policy applied to retried endpoints.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Returns the pooled HTTP client, shared with presigned uploads.
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// `GET /videos`.
    ///
    /// Items that are not video records are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the token is missing or the request fails
    /// after retries.
    #[instrument(skip(self, token))]
    pub async fn fetch_videos(&self, token: Option<&str>) -> Result<Vec<Video>, ApiError> {
        let token = require_token(token)?;
        let url = self.endpoint("/videos")?;
        let body = self.send(Method::GET, &url, token, None, &self.retry).await?;
        let videos = decode_items(&url, take_list(body, VIDEO_LIST_FIELDS));
        debug!(count = videos.len(), "fetched videos");
        Ok(videos)
    }

    /// `GET /play/{id}`: resolves a streamable URL for a video.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a blank id, [`ApiError::Decode`]
    /// when the response carries no URL, or the request error.
    #[instrument(skip(self, token))]
    pub async fn fetch_playback_url(
        &self,
        token: Option<&str>,
        video_id: &str,
    ) -> Result<String, ApiError> {
        let token = require_token(token)?;
        let video_id = require_param(video_id, "video id")?;
        let url = self.endpoint(&format!("/play/{}", urlencoding::encode(video_id)))?;
        let body = self.send(Method::GET, &url, token, None, &self.retry).await?;
        take_string(&body, PLAYBACK_URL_FIELDS)
            .ok_or_else(|| ApiError::decode(url.as_str(), "response has no playback URL"))
    }

    /// `POST /upload/initiate`: reserves a video id and a presigned upload URL.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a blank filename, [`ApiError::Decode`]
    /// when the ticket lacks an upload URL or video id, or the request error.
    #[instrument(skip(self, token, metadata))]
    pub async fn initiate_upload(
        &self,
        token: Option<&str>,
        filename: &str,
        metadata: &UploadMetadata,
    ) -> Result<UploadTicket, ApiError> {
        let token = require_token(token)?;
        let filename = require_param(filename, "filename")?;
        let url = self.endpoint("/upload/initiate")?;
        let request = to_json(
            &url,
            &InitiateUploadRequest {
                filename,
                metadata,
            },
        )?;
        let body = self
            .send(Method::POST, &url, token, Some(&request), &self.retry)
            .await?;

        let upload_url = take_string(&body, UPLOAD_URL_FIELDS)
            .ok_or_else(|| ApiError::decode(url.as_str(), "upload ticket has no upload URL"))?;
        let video_id = take_string(&body, UPLOAD_VIDEO_ID_FIELDS)
            .ok_or_else(|| ApiError::decode(url.as_str(), "upload ticket has no video id"))?;
        let extra = match body {
            Value::Object(map) => map
                .into_iter()
                .filter(|(key, _)| {
                    !UPLOAD_URL_FIELDS.contains(&key.as_str())
                        && !UPLOAD_VIDEO_ID_FIELDS.contains(&key.as_str())
                })
                .collect(),
            _ => Map::new(),
        };

        info!(video_id = %video_id, "upload initiated");
        Ok(UploadTicket {
            upload_url,
            video_id,
            extra,
        })
    }

    /// `PUT /videos/{id}`: writes metadata fields.
    ///
    /// Returns the saved record when the backend echoes one back.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a blank id, or the request error.
    #[instrument(skip(self, token, patch))]
    pub async fn save_video_metadata(
        &self,
        token: Option<&str>,
        video_id: &str,
        patch: &VideoPatch,
    ) -> Result<Option<Video>, ApiError> {
        let token = require_token(token)?;
        let video_id = require_param(video_id, "video id")?;
        let url = self.endpoint(&format!("/videos/{}", urlencoding::encode(video_id)))?;
        let request = to_json(&url, patch)?;
        let body = self
            .send(Method::PUT, &url, token, Some(&request), &self.retry)
            .await?;
        Ok(serde_json::from_value(take_record(body, SAVED_VIDEO_FIELDS)).ok())
    }

    /// `DELETE /videos/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a blank id, or the request error.
    #[instrument(skip(self, token))]
    pub async fn delete_video(&self, token: Option<&str>, video_id: &str) -> Result<(), ApiError> {
        let token = require_token(token)?;
        let video_id = require_param(video_id, "video id")?;
        let url = self.endpoint(&format!("/videos/{}", urlencoding::encode(video_id)))?;
        self.send(Method::DELETE, &url, token, None, &self.retry)
            .await?;
        info!(video_id, "video deleted");
        Ok(())
    }

    /// `GET /search?q=`.
    ///
    /// Sent once without retries; callers fall back to local search.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a blank query, or the request error.
    #[instrument(skip(self, token))]
    pub async fn search_videos(
        &self,
        token: Option<&str>,
        query: &str,
    ) -> Result<Vec<Video>, ApiError> {
        let token = require_token(token)?;
        let query = require_param(query, "search query")?;
        let mut url = self.endpoint("/search")?;
        url.query_pairs_mut().append_pair("q", query);
        let body = self
            .send(Method::GET, &url, token, None, &RetryPolicy::none())
            .await?;
        Ok(decode_items(&url, take_list(body, SEARCH_RESULT_FIELDS)))
    }

    /// `GET /continue-watching?profileId=`.
    ///
    /// Sent once without retries; callers fall back to the local list.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a blank profile id, or the
    /// request error.
    #[instrument(skip(self, token))]
    pub async fn fetch_continue_watching(
        &self,
        token: Option<&str>,
        profile_id: &str,
    ) -> Result<Vec<ContinueWatchingEntry>, ApiError> {
        let token = require_token(token)?;
        let profile_id = require_param(profile_id, "profile id")?;
        let mut url = self.endpoint("/continue-watching")?;
        url.query_pairs_mut().append_pair("profileId", profile_id);
        let body = self
            .send(Method::GET, &url, token, None, &RetryPolicy::none())
            .await?;
        Ok(decode_items(&url, take_list(body, CONTINUE_WATCHING_FIELDS)))
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}{path}", self.base_url);
        Url::parse(&raw).map_err(|_| ApiError::invalid_url(raw))
    }

    /// Sends a request, retrying per `policy`; returns the parsed success body.
    async fn send(
        &self,
        method: Method,
        url: &Url,
        token: &str,
        body: Option<&Value>,
        policy: &RetryPolicy,
    ) -> Result<Value, ApiError> {
        let mut retries_so_far = 0;
        loop {
            let error = match self.send_once(method.clone(), url, token, body).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match policy.should_retry(classify_error(&error), retries_so_far) {
                RetryDecision::Retry { delay, retry } => {
                    warn!(
                        url = %url,
                        method = %method,
                        retry,
                        max_retries = policy.max_retries(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying API request"
                    );
                    tokio::time::sleep(delay).await;
                    retries_so_far = retry;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url = %url, %reason, "not retrying API request");
                    return Err(error);
                }
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &Url,
        token: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let mut request = self
            .http
            .request(method, url.clone())
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|source| ApiError::network(url.as_str(), source))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(status, response).await;
            return Err(ApiError::http_status(url.as_str(), status.as_u16(), message));
        }

        parse_success_body(url, response).await
    }
}

/// Returns the token, or [`ApiError::AuthenticationRequired`] when absent or blank.
///
/// # Errors
///
/// Returns [`ApiError::AuthenticationRequired`].
pub fn require_token(token: Option<&str>) -> Result<&str, ApiError> {
    match token.map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(ApiError::AuthenticationRequired),
    }
}

fn require_param<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ApiError::validation(field))
    } else {
        Ok(value)
    }
}

fn default_user_agent() -> String {
    format!("family-cloud/{}", env!("CARGO_PKG_VERSION"))
}

fn to_json<T: serde::Serialize>(url: &Url, value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|error| ApiError::decode(url.as_str(), error.to_string()))
}

fn decode_items<T: DeserializeOwned>(url: &Url, items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                warn!(url = %url, %error, "skipping malformed item in response");
                None
            }
        })
        .collect()
}

/// JSON bodies are parsed strictly; other bodies are parsed when they look
/// like JSON, kept as a string otherwise, and an empty body becomes `{}`.
async fn parse_success_body(url: &Url, response: Response) -> Result<Value, ApiError> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"));

    let text = response
        .text()
        .await
        .map_err(|source| ApiError::network(url.as_str(), source))?;

    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    if is_json {
        return serde_json::from_str(&text)
            .map_err(|error| ApiError::decode(url.as_str(), format!("invalid JSON body: {error}")));
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Message for a failed response: JSON `message`, then JSON `error`, then a
/// generic line; a non-JSON body yields the status text.
async fn error_message(status: StatusCode, response: Response) -> String {
    let fallback = format!("API request failed with status {}", status.as_u16());
    let text = response.text().await.unwrap_or_default();

    match serde_json::from_str::<Value>(&text) {
        Ok(body) => ["message", "error"]
            .iter()
            .find_map(|field| match body.get(*field) {
                Some(Value::String(message)) if !message.trim().is_empty() => {
                    Some(message.clone())
                }
                _ => None,
            })
            .unwrap_or(fallback),
        Err(_) => status
            .canonical_reason()
            .map_or(fallback, ToString::to_string),
    }
}
