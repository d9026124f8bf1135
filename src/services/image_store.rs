//! Product image storage
//!
//! Uploaded images land on local disk under a single flat directory. Stored
//! filenames are prefixed with a UUID so concurrent uploads of the same
//! original name never collide, and lookups only ever accept a bare filename
//! so the store cannot be escaped with path tricks.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use image::ImageFormat;
use uuid::Uuid;

use crate::error::{AppError, ErrorCode};

/// Upload size cap in bytes (10 MB)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

#[derive(Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Open (creating if needed) the storage directory.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Validate and persist an uploaded image, returning the stored filename.
    pub async fn save(&self, original_name: &str, data: Bytes) -> Result<String, AppError> {
        if data.is_empty() {
            return Err(AppError::new(ErrorCode::EmptyFile));
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(AppError::new(ErrorCode::FileTooLarge)
                .with_detail("max_bytes", MAX_IMAGE_BYTES as u64));
        }

        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::new(ErrorCode::UnsupportedFileFormat)
                .with_detail("allowed", "jpg, jpeg, png, gif"));
        }

        // Sniff the actual content; the extension alone is not trusted.
        match image::guess_format(&data) {
            Ok(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif) => {}
            _ => return Err(AppError::new(ErrorCode::InvalidImageFile)),
        }

        let filename = unique_filename(original_name);
        tokio::fs::write(self.root.join(&filename), &data)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, filename, "Failed to write image");
                AppError::internal("Failed to store image")
            })?;

        Ok(filename)
    }

    /// Best-effort removal of a stored image; a missing file is not an error.
    pub async fn remove(&self, filename: &str) {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.root.join(filename)).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(error = %e, filename, "Failed to remove image");
        }
    }

    /// Read a stored image back, returning its bytes and content type.
    pub async fn open(&self, filename: &str) -> Result<(Vec<u8>, String), AppError> {
        // Only bare filenames are valid; anything path-like is rejected.
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return Err(AppError::new(ErrorCode::FileNotFound));
        }

        let path = self.root.join(filename);
        let data = tokio::fs::read(&path)
            .await
            .map_err(|_| AppError::new(ErrorCode::FileNotFound))?;

        let content_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string();
        Ok((data, content_type))
    }
}

/// `photo album.png` -> `550e8400-...-photoalbum.png`
fn unique_filename(original_name: &str) -> String {
    let sanitized: String = original_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    format!("{}-{}", Uuid::new_v4(), sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid 1x1 PNG
    const PNG_BYTES: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
        0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00,
        0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78,
        0x9C, 0x62, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00,
        0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    fn store() -> (tempfile::TempDir, ImageStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_save_and_open_roundtrip() {
        let (_dir, store) = store();
        let name = store
            .save("photo.png", Bytes::from_static(PNG_BYTES))
            .await
            .unwrap();
        assert!(name.ends_with("photo.png"));

        let (data, content_type) = store.open(&name).await.unwrap();
        assert_eq!(data, PNG_BYTES);
        assert_eq!(content_type, "image/png");
    }

    #[tokio::test]
    async fn test_spaces_are_stripped_from_filename() {
        let (_dir, store) = store();
        let name = store
            .save("my photo.png", Bytes::from_static(PNG_BYTES))
            .await
            .unwrap();
        assert!(name.ends_with("myphoto.png"));
        assert!(!name.contains(' '));
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let (_dir, store) = store();
        let err = store.save("photo.png", Bytes::new()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyFile);
    }

    #[tokio::test]
    async fn test_oversized_file_rejected() {
        let (_dir, store) = store();
        let data = Bytes::from(vec![0u8; MAX_IMAGE_BYTES + 1]);
        let err = store.save("photo.png", data).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::FileTooLarge);
    }

    #[tokio::test]
    async fn test_unsupported_extension_rejected() {
        let (_dir, store) = store();
        let err = store
            .save("document.pdf", Bytes::from_static(PNG_BYTES))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedFileFormat);
    }

    #[tokio::test]
    async fn test_non_image_content_rejected() {
        let (_dir, store) = store();
        let err = store
            .save("photo.png", Bytes::from_static(b"definitely not an image"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidImageFile);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let (_dir, store) = store();
        for name in ["../secret", "a/b.png", "..\\b.png", ""] {
            let err = store.open(name).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::FileNotFound);
        }
    }

    #[tokio::test]
    async fn test_remove_deletes_stored_file() {
        let (_dir, store) = store();
        let name = store
            .save("photo.png", Bytes::from_static(PNG_BYTES))
            .await
            .unwrap();
        store.remove(&name).await;

        let err = store.open(&name).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::FileNotFound);
        // Removing again is a no-op
        store.remove(&name).await;
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (_dir, store) = store();
        let err = store.open("nope.png").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::FileNotFound);
    }
}
