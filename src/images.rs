//! Uploaded images travel as base64 data URLs (`data:image/png;base64,...`),
//! the same representation the store persists for logo and picture.

use base64::Engine;
use image::DynamicImage;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageDataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not an image file: {0}")]
    NotAnImage(String),

    #[error("Malformed data URL")]
    MalformedDataUrl,

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Unsupported image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Encode raw bytes as a data URL with the given MIME type.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}

/// Read an image file into a data URL. The MIME type comes from the extension.
pub fn read_data_url(path: &Path) -> Result<String, ImageDataError> {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(ImageDataError::NotAnImage(path.display().to_string()));
    }
    let bytes = fs::read(path)?;
    tracing::debug!(path = %path.display(), mime = %mime, bytes = bytes.len(), "image read");
    Ok(to_data_url(mime.essence_str(), &bytes))
}

/// Split a base64 data URL into its MIME type and decoded payload.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), ImageDataError> {
    let rest = url.strip_prefix("data:").ok_or(ImageDataError::MalformedDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(ImageDataError::MalformedDataUrl)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(ImageDataError::MalformedDataUrl)?;
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
    Ok((mime.to_string(), bytes))
}

/// Decode a data URL straight into pixels.
pub fn load_data_url(url: &str) -> Result<DynamicImage, ImageDataError> {
    let (_, bytes) = decode_data_url(url)?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Load an image referenced by a template shape. Absolute web paths such as
/// `/card-background-images/x.jpg` resolve under `assets_dir`; data URLs are
/// decoded in place.
pub fn load_asset(reference: &str, assets_dir: &Path) -> Result<DynamicImage, ImageDataError> {
    if reference.starts_with("data:") {
        return load_data_url(reference);
    }
    let path = assets_dir.join(reference.trim_start_matches('/'));
    Ok(image::open(path)?)
}
