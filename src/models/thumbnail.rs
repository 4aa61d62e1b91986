//! Thumbnail input: an uploaded file or a URL to download.

use std::path::Path;

use reqwest::Url;
use validator::ValidateUrl;

use crate::errors::{ClientError, ClientResult};

/// Filename used when a URL has no usable last path segment.
pub const FALLBACK_FILENAME: &str = "thumbnail.jpg";

/// Mime type used when nothing better is known.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Thumbnail supplied by a caller. The API only accepts binary uploads, so a
/// `Remote` thumbnail is downloaded and re-sent as a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    Binary {
        bytes: Vec<u8>,
        filename: String,
        mime: String,
    },
    Remote(String),
}

/// A thumbnail ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: String,
}

impl Thumbnail {
    pub fn binary(bytes: Vec<u8>, filename: impl Into<String>, mime: impl Into<String>) -> Self {
        Thumbnail::Binary {
            bytes,
            filename: filename.into(),
            mime: mime.into(),
        }
    }

    /// Read a local image file, guessing the mime type from its extension.
    pub fn from_path(path: &Path) -> ClientResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ClientError::Validation(format!("Arquivo inválido: {}: {}", path.display(), e))
        })?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_FILENAME)
            .to_string();
        let mime = mime_from_filename(&filename).to_string();
        Ok(Thumbnail::Binary {
            bytes,
            filename,
            mime,
        })
    }

    /// Interpret a command-line argument: http(s) URLs are remote, anything
    /// else is a local path.
    pub fn from_arg(arg: &str) -> ClientResult<Self> {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            Ok(Thumbnail::Remote(arg.to_string()))
        } else {
            Self::from_path(Path::new(arg))
        }
    }

    pub fn validate(&self) -> ClientResult<()> {
        match self {
            Thumbnail::Binary { bytes, .. } if bytes.is_empty() => {
                Err(ClientError::Validation("Arquivo inválido".to_string()))
            }
            Thumbnail::Binary { .. } => Ok(()),
            Thumbnail::Remote(url) if url.trim().is_empty() => Err(ClientError::Validation(
                "Thumbnail é obrigatória (arquivo ou URL)".to_string(),
            )),
            Thumbnail::Remote(url) if !url.validate_url() => {
                Err(ClientError::Validation("URL inválida".to_string()))
            }
            Thumbnail::Remote(url) => match Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
                _ => Err(ClientError::Validation("URL inválida".to_string())),
            },
        }
    }
}

/// Filename for a downloaded thumbnail: the URL's last path segment.
pub fn filename_from_url(url: &str) -> String {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string)),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next().map(str::to_string)),
    };
    segment
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

fn mime_from_filename(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        _ => FALLBACK_MIME,
    }
}
