//! Image attachments
//!
//! Loads an image from disk once; each provider then applies its own size
//! limit and encoding.

use crate::utils::error::{AppError, AppResult, ErrorContext};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};

/// Image read from disk and base64-encoded
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    pub path: PathBuf,
    pub media_type: String,
    /// Size of the raw file in bytes
    pub size: u64,
    /// Base64 of the file contents
    pub data: String,
}

impl ImageAttachment {
    /// Read and encode an image file.
    ///
    /// Only jpg/jpeg/png/gif/webp are accepted.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let media_type = media_type_for(path).ok_or_else(|| {
            AppError::Validation(format!("Unsupported image format: {}", path.display()))
        })?;
        
        let bytes = std::fs::read(path)
            .validation_context(&format!("Failed to read image {}", path.display()))?;
        
        Ok(Self {
            path: path.to_path_buf(),
            media_type: media_type.to_string(),
            size: bytes.len() as u64,
            data: STANDARD.encode(&bytes),
        })
    }
    
    /// Reject images above a provider's limit
    pub fn check_size(&self, max_bytes: u64) -> AppResult<()> {
        if self.size > max_bytes {
            return Err(AppError::Validation(format!(
                "Image too large ({:.1}MB). Max {}MB.",
                self.size as f64 / (1024.0 * 1024.0),
                max_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }
    
    /// `data:` URL form
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// MIME type from the file extension
pub fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
