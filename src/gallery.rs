use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{GalleryEntry, GalleryImage, GalleryWriter, Result, ShareError};

/// Gallery backed by a plain directory: `<root>/<album>/<file name>`.
/// Writes are complete when `write` returns, so entries are never pending.
#[derive(Debug, Clone)]
pub struct FsGallery {
    root: PathBuf,
}

impl FsGallery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsGallery{root: root.into()}
    }

    /// The user's pictures directory, if one can be found.
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    pub fn pictures() -> Option<Self> {
        dirs::picture_dir().map(Self::new)
    }
}

#[async_trait]
impl GalleryWriter for FsGallery {
    async fn request_access(&self) -> Result<bool> {
        Ok(true)
    }

    async fn write(&self, image: GalleryImage) -> Result<GalleryEntry> {
        let file_name = Path::new(&image.file_name).file_name()
            .ok_or_else(|| ShareError::InvalidArguments(format!("'{}' is not a file name", image.file_name)))?;
        let dir = self.root.join(&image.album);
        let path = dir.join(file_name);
        std::fs::create_dir_all(&dir).and_then(|_| std::fs::write(&path, &image.bytes))
            .map_err(|e| ShareError::SaveFailed(format!("{}: {e}", path.display())))?;
        Ok(GalleryEntry{location: path.display().to_string(), pending: false})
    }

    async fn publish(&self, entry: GalleryEntry) -> Result<GalleryEntry> {
        Ok(GalleryEntry{pending: false, ..entry})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(file_name: &str) -> GalleryImage {
        GalleryImage{album: "SocialShare".to_string(), file_name: file_name.to_string(), mime_type: "image/png", bytes: vec![1, 2, 3]}
    }

    #[tokio::test]
    async fn writes_into_album() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = FsGallery::new(dir.path());
        let entry = gallery.write(image("a.png")).await.unwrap();
        assert!(!entry.pending);
        assert_eq!(std::fs::read(dir.path().join("SocialShare").join("a.png")).unwrap(), vec![1, 2, 3]);
    }

    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    #[test]
    fn pictures_is_the_user_picture_dir() {
        assert_eq!(FsGallery::pictures().map(|gallery| gallery.root), dirs::picture_dir());
    }

    #[tokio::test]
    async fn file_names_cannot_escape_album() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = FsGallery::new(dir.path());
        gallery.write(image("../../escape.png")).await.unwrap();
        assert!(dir.path().join("SocialShare").join("escape.png").exists());
        assert!(matches!(gallery.write(image("..")).await, Err(ShareError::InvalidArguments(_))));
    }
}
