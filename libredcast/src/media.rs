//! Image checks for image posts

use std::path::Path;

use tracing::{error, info};

/// Largest image Reddit accepts for an image post (20 MiB)
pub const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

/// Largest width or height accepted, in pixels
pub const MAX_IMAGE_DIMENSION: u32 = 10_000;

/// Image types the bot knows how to upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
    Png,
    Gif,
}

impl ImageMimeType {
    /// Detect MIME type from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detect MIME type from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Get the MIME type string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }
}

impl std::fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check that an image exists and fits the size and dimension limits
///
/// Never fails: any problem is logged and reported as `false`. Only the
/// image header is decoded, so oversized files are rejected before being
/// read in full.
pub fn validate_image(path: &Path, max_bytes: u64, max_dimension: u32) -> bool {
    let metadata = match std::fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        Ok(_) | Err(_) => {
            error!("Image file not found: {}", path.display());
            return false;
        }
    };

    if metadata.len() > max_bytes {
        error!(
            "Image file too large: {} bytes (max: {})",
            metadata.len(),
            max_bytes
        );
        return false;
    }

    match image::image_dimensions(path) {
        Ok((width, height)) if width > max_dimension || height > max_dimension => {
            error!("Image dimensions too large: {}x{}", width, height);
            false
        }
        Ok(_) => {
            info!("Image validation passed: {}", path.display());
            true
        }
        Err(e) => {
            error!("Error validating image {}: {}", path.display(), e);
            false
        }
    }
}
