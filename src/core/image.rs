//! Recipe image storage.
//!
//! Images arrive either as a base64 data URI inside a JSON payload or as a
//! multipart file part. Both end up as `recipes/images/{uuid}.{ext}` under the
//! media root and are referred to by their public `/media/...` URL.

use crate::errors::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const IMAGE_DIR: &str = "recipes/images";
const MEDIA_URL_PREFIX: &str = "/media/";
const MAX_EXTENSION_LEN: usize = 10;

/// An image as received from a client, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// `data:image/<ext>;base64,<payload>`
    DataUri(String),
    /// Raw bytes from a multipart file part
    Upload { extension: String, bytes: Vec<u8> },
}

/// Image bytes with the file extension they will be stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

fn normalize_extension(raw: &str) -> Result<String> {
    let ext = raw.trim().to_ascii_lowercase();
    let ext = if ext == "jpeg" { "jpg".to_string() } else { ext };
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(Error::validation(format!(
            "Unsupported image type {raw:?}"
        )));
    }
    Ok(ext)
}

/// Decodes `data:image/<ext>;base64,<payload>`.
///
/// # Errors
/// Returns `Error::Validation` for anything that is not a non-empty base64
/// encoded image.
pub fn decode_data_uri(uri: &str) -> Result<DecodedImage> {
    let malformed = || Error::validation("Image must be a data:image/<type>;base64 URI");

    let (meta, payload) = uri
        .trim()
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(malformed)?;
    let subtype = meta
        .strip_suffix(";base64")
        .and_then(|mime| mime.strip_prefix("image/"))
        .ok_or_else(malformed)?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::validation(format!("Image is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(Error::validation("Image is empty"));
    }

    Ok(DecodedImage {
        extension: normalize_extension(subtype)?,
        bytes,
    })
}

impl ImageInput {
    /// Decodes the image into bytes plus extension.
    ///
    /// # Errors
    /// Returns `Error::Validation` for malformed or empty images.
    pub fn decode(self) -> Result<DecodedImage> {
        match self {
            Self::DataUri(uri) => decode_data_uri(&uri),
            Self::Upload { extension, bytes } => {
                if bytes.is_empty() {
                    return Err(Error::validation("Image is empty"));
                }
                Ok(DecodedImage {
                    extension: normalize_extension(&extension)?,
                    bytes,
                })
            }
        }
    }
}

/// Writes images below the media root and maps them to public URLs.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The media root that `/media/` is served from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decodes and stores an image, returning its public URL.
    ///
    /// # Errors
    /// Returns `Error::Validation` for a malformed image and `Error::Io` when
    /// the file cannot be written.
    pub async fn save(&self, image: ImageInput) -> Result<String> {
        let decoded = image.decode()?;
        let relative = format!(
            "{IMAGE_DIR}/{}.{}",
            Uuid::new_v4().simple(),
            decoded.extension
        );
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &decoded.bytes).await?;

        debug!("Stored {} byte image at {}", decoded.bytes.len(), path.display());
        Ok(format!("{MEDIA_URL_PREFIX}{relative}"))
    }

    /// Deletes a previously stored image. Failures are logged, not returned.
    pub async fn remove(&self, url: &str) {
        let Some(relative) = url.strip_prefix(MEDIA_URL_PREFIX) else {
            warn!("Refusing to remove image outside the media root: {url}");
            return;
        };
        if relative.split('/').any(|part| part == "..") {
            warn!("Refusing to remove image with parent traversal: {url}");
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
            warn!("Failed to remove image {url}: {e}");
        }
    }
}
