//! Video uploads through presigned object-storage URLs.
//!
//! An upload is three steps: `POST /upload/initiate` reserves a video id and
//! a presigned URL, the raw file is streamed to that URL with a `PUT`, and
//! the metadata is saved with `PUT /videos/{id}`. Progress is reported after
//! every chunk. There is no pause, resume or cancel.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument};

use crate::api::{ApiClient, ApiError, UploadMetadata, Video, VideoPatch, require_token};

/// Largest accepted file (500 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// Read size for each streamed chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Whole-request timeout for the object-storage `PUT`.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Duration sent until the backend has probed the file.
const UNKNOWN_DURATION: &str = "0:00";

/// Errors that can occur during an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The local file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being uploaded.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file type is not a recognised video format.
    #[error("{path} is not a video file")]
    NotAVideo {
        /// Rejected file.
        path: PathBuf,
    },

    /// The file exceeds [`MAX_UPLOAD_BYTES`].
    #[error("{path} is {size} bytes; files must be smaller than 500MB")]
    TooLarge {
        /// Rejected file.
        path: PathBuf,
        /// Its size in bytes.
        size: u64,
    },

    /// Object storage answered something other than 200 or 204.
    #[error("upload rejected with HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The upload request failed before a response arrived.
    #[error("network error during upload: {0}")]
    Network(#[source] reqwest::Error),

    /// Initiating the upload or saving metadata failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl UploadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Bytes sent so far out of the file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes handed to the transport.
    pub sent: u64,
    /// File size in bytes.
    pub total: u64,
}

impl UploadProgress {
    /// Whole percentage sent, 0 to 100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let percent = self.sent.min(self.total).saturating_mul(100) / self.total;
        u8::try_from(percent).unwrap_or(100)
    }
}

/// What a finished upload produced.
#[derive(Debug, Clone)]
pub struct UploadedVideo {
    /// Backend id of the new video.
    pub video_id: String,
    /// Title saved with the metadata.
    pub title: String,
    /// The record echoed by the backend, if any.
    pub saved: Option<Video>,
}

/// Streams `path` to a presigned `url` with `PUT`.
///
/// `on_progress` is called after each chunk is read into the request body.
///
/// # Errors
///
/// Returns [`UploadError::Io`] if the file cannot be opened,
/// [`UploadError::Network`] on transport failure, or [`UploadError::Status`]
/// when the response is neither 200 nor 204.
#[instrument(skip(client, url, on_progress), fields(path = %path.display()))]
pub async fn upload_to_presigned_url<F>(
    client: &Client,
    url: &str,
    path: &Path,
    content_type: &str,
    on_progress: F,
) -> Result<(), UploadError>
where
    F: FnMut(UploadProgress) + Send + 'static,
{
    let file = File::open(path)
        .await
        .map_err(|source| UploadError::io(path, source))?;
    let total = file
        .metadata()
        .await
        .map_err(|source| UploadError::io(path, source))?
        .len();

    let chunks = futures_util::stream::try_unfold(
        (file, on_progress, 0_u64),
        move |(mut file, mut on_progress, sent)| async move {
            let mut buffer = vec![0_u8; CHUNK_SIZE];
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                return Ok::<_, std::io::Error>(None);
            }
            buffer.truncate(read);
            let sent = sent.saturating_add(u64::try_from(read).unwrap_or(u64::MAX));
            on_progress(UploadProgress { sent, total });
            Ok(Some((buffer, (file, on_progress, sent))))
        },
    );

    let response = client
        .put(url)
        .timeout(UPLOAD_TIMEOUT)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, total)
        .body(reqwest::Body::wrap_stream(chunks))
        .send()
        .await
        .map_err(UploadError::Network)?;

    let status = response.status().as_u16();
    if matches!(status, 200 | 204) {
        debug!(bytes = total, "object upload complete");
        Ok(())
    } else {
        Err(UploadError::Status { status })
    }
}

/// Uploads a local video file end to end.
///
/// The title defaults to the file name without its extension.
///
/// # Errors
///
/// Returns [`UploadError::Api`] for a missing token (before touching the
/// file) and for API failures; [`UploadError::NotAVideo`] or
/// [`UploadError::TooLarge`] when the file is rejected locally; otherwise the
/// errors of [`upload_to_presigned_url`].
#[instrument(skip(api, token, on_progress), fields(path = %path.display()))]
pub async fn upload_video<F>(
    api: &ApiClient,
    token: Option<&str>,
    path: &Path,
    title: Option<&str>,
    on_progress: F,
) -> Result<UploadedVideo, UploadError>
where
    F: FnMut(UploadProgress) + Send + 'static,
{
    require_token(token)?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| UploadError::NotAVideo {
            path: path.to_path_buf(),
        })?
        .to_string();
    let content_type = guess_content_type(path);
    if !content_type.starts_with("video/") {
        return Err(UploadError::NotAVideo {
            path: path.to_path_buf(),
        });
    }

    let size = tokio::fs::metadata(path)
        .await
        .map_err(|source| UploadError::io(path, source))?
        .len();
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            path: path.to_path_buf(),
            size,
        });
    }

    let metadata = UploadMetadata {
        content_type: Some(content_type.to_string()),
        size: Some(size),
    };
    let ticket = api.initiate_upload(token, &filename, &metadata).await?;

    upload_to_presigned_url(api.http(), &ticket.upload_url, path, content_type, on_progress)
        .await?;

    let title = title
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map_or_else(|| file_stem_title(&filename), ToString::to_string);
    let patch = VideoPatch {
        title: Some(title.clone()),
        filename: Some(filename),
        size: Some(size),
        content_type: Some(content_type.to_string()),
        duration: Some(UNKNOWN_DURATION.to_string()),
        ..VideoPatch::default()
    };
    let saved = api
        .save_video_metadata(token, &ticket.video_id, &patch)
        .await?;

    let title = saved
        .as_ref()
        .map(|video| video.title.clone())
        .filter(|saved_title| !saved_title.is_empty())
        .unwrap_or(title);
    info!(video_id = %ticket.video_id, title = %title, bytes = size, "video uploaded");

    Ok(UploadedVideo {
        video_id: ticket.video_id,
        title,
        saved,
    })
}

/// MIME type for a video file, judged by extension.
#[must_use]
pub fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// File name with its last extension removed.
fn file_stem_title(filename: &str) -> String {
    match filename.rfind('.') {
        Some(index) if index > 0 => filename[..index].to_string(),
        _ => filename.to_string(),
    }
}

/// Human-readable size such as `"1.5 MB"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
