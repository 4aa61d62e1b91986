//! Thumbnail normalization: every thumbnail becomes a file part before upload.

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Part;

use crate::errors::{ClientError, ClientResult};
use crate::models::{filename_from_url, Thumbnail, ThumbnailFile, FALLBACK_MIME};

impl Thumbnail {
    /// Resolve into uploadable bytes. `Remote` thumbnails are downloaded with
    /// a plain GET; the bytes are passed through untouched.
    pub async fn resolve(self, http: &reqwest::Client) -> ClientResult<ThumbnailFile> {
        match self {
            Thumbnail::Binary {
                bytes,
                filename,
                mime,
            } => Ok(ThumbnailFile {
                bytes,
                filename,
                mime,
            }),
            Thumbnail::Remote(url) => download(http, &url).await,
        }
    }
}

async fn download(http: &reqwest::Client, url: &str) -> ClientResult<ThumbnailFile> {
    tracing::debug!("Downloading thumbnail from {}", url);

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| ClientError::Transport(format!("Failed to fetch {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Transport(format!(
            "Failed to fetch {}: status {}",
            url, status
        )));
    }

    let mime = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(FALLBACK_MIME)
        .to_string();

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::Transport(format!("Failed to fetch {}: {}", url, e)))?;

    Ok(ThumbnailFile {
        bytes: bytes.to_vec(),
        filename: filename_from_url(url),
        mime,
    })
}

impl ThumbnailFile {
    /// Multipart file part for the `thumbnail` field.
    pub fn into_part(self) -> ClientResult<Part> {
        let part = Part::bytes(self.bytes).file_name(self.filename);
        match part.mime_str(&self.mime) {
            Ok(part) => Ok(part),
            Err(e) => Err(ClientError::Validation(format!(
                "Invalid mime type {:?}: {}",
                self.mime, e
            ))),
        }
    }
}
