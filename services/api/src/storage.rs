//! Local storage for uploaded media files
//!
//! Files land in `<dir>/media/<uuid><ext>` and are served back under
//! `/uploads/media/`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::media::MediaType;

pub const PUBLIC_PREFIX: &str = "/uploads";
const MEDIA_SUBDIR: &str = "media";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub dir: String,
    /// Bytes
    pub max_file_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
            max_file_size: 50 * 1024 * 1024,
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid file type. Only images (jpg, jpeg, png, gif, webp) and videos (mp4, mov, avi) are allowed")]
    UnsupportedType,

    #[error("File exceeds the {0} byte limit")]
    TooLarge(usize),

    #[error("File storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Accepted upload, classified by its extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileKind {
    pub extension: String,
    pub media_type: MediaType,
    pub mime_type: &'static str,
}

/// Classify an original file name by its (case-insensitive) extension
pub fn classify(file_name: &str) -> Result<FileKind, StorageError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .ok_or(StorageError::UnsupportedType)?;

    let (media_type, mime_type) =
        MediaType::from_extension(&extension).ok_or(StorageError::UnsupportedType)?;

    Ok(FileKind {
        extension,
        media_type,
        mime_type,
    })
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub url: String,
    pub size: i64,
}

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    max_file_size: usize,
}

impl MediaStorage {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: PathBuf::from(&config.dir),
            max_file_size: config.max_file_size,
        }
    }

    /// Directory served under [`PUBLIC_PREFIX`]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub async fn save(&self, id: Uuid, kind: &FileKind, bytes: &[u8]) -> Result<StoredFile, StorageError> {
        if bytes.len() > self.max_file_size {
            return Err(StorageError::TooLarge(self.max_file_size));
        }

        let dir = self.root.join(MEDIA_SUBDIR);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{id}{}", kind.extension);
        tokio::fs::write(dir.join(&file_name), bytes).await?;
        info!(media_id = %id, file = %file_name, size = bytes.len(), "Stored upload");

        Ok(StoredFile {
            url: format!("{PUBLIC_PREFIX}/{MEDIA_SUBDIR}/{file_name}"),
            file_name,
            size: bytes.len() as i64,
        })
    }

    /// Remove the file behind a public url. Failures are logged only.
    pub async fn remove(&self, url: &str) {
        let Some(file_name) = url
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|rest| rest.strip_prefix(&format!("/{MEDIA_SUBDIR}/")))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
        else {
            warn!(url, "Not a local media url; nothing removed");
            return;
        };

        let path = self.root.join(MEDIA_SUBDIR).join(file_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove media file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(max_file_size: usize) -> MediaStorage {
        let dir = std::env::temp_dir().join(format!("portfolio-uploads-{}", Uuid::new_v4()));
        MediaStorage::new(&UploadConfig {
            dir: dir.to_string_lossy().into_owned(),
            max_file_size,
        })
    }

    #[test]
    fn test_classify() {
        let kind = classify("Sunset.JPG").unwrap();
        assert_eq!(kind.extension, ".jpg");
        assert_eq!(kind.media_type, MediaType::Image);
        assert_eq!(kind.mime_type, "image/jpeg");

        assert_eq!(classify("clip.mov").unwrap().media_type, MediaType::Video);
        assert!(matches!(classify("notes.txt"), Err(StorageError::UnsupportedType)));
        assert!(matches!(classify("no_extension"), Err(StorageError::UnsupportedType)));
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let storage = storage(1024);
        let id = Uuid::new_v4();
        let kind = classify("a.png").unwrap();

        let stored = storage.save(id, &kind, b"png-bytes").await.unwrap();
        assert_eq!(stored.url, format!("/uploads/media/{id}.png"));
        assert_eq!(stored.size, 9);

        let path = storage.root().join("media").join(&stored.file_name);
        assert!(path.exists());

        storage.remove(&stored.url).await;
        assert!(!path.exists());

        // Missing files and foreign urls are tolerated
        storage.remove(&stored.url).await;
        storage.remove("/uploads/media/../secrets").await;
        storage.remove("https://cdn.example.com/x.png").await;

        let _ = std::fs::remove_dir_all(storage.root());
    }

    #[tokio::test]
    async fn test_size_limit() {
        let storage = storage(4);
        let kind = classify("a.png").unwrap();
        assert!(matches!(
            storage.save(Uuid::new_v4(), &kind, b"too large").await,
            Err(StorageError::TooLarge(4))
        ));
    }
}
