use std::path::Path;

use async_trait::async_trait;

use crate::{
    FsGallery, GalleryEntry, GalleryImage, GalleryWriter, ImageAsset, InstalledAppOracle,
    NativeShareInvoker, Result, ShareConfig, ShareTarget, StoryShare, WhatsAppRoute,
};

#[derive(Debug, Clone)]
pub struct OsBridge {
    gallery: Option<FsGallery>,
}

impl OsBridge {
    pub fn new(_config: &ShareConfig) -> Result<Self> {
        Ok(OsBridge{gallery: FsGallery::pictures()})
    }

    pub fn with_gallery(gallery: FsGallery) -> Self {
        OsBridge{gallery: Some(gallery)}
    }
}

impl InstalledAppOracle for OsBridge {
    fn is_installed(&self, _target: ShareTarget) -> bool {
        false
    }
}

#[async_trait]
impl NativeShareInvoker for OsBridge {
    async fn resolve_story(&self, _target: ShareTarget) -> Result<bool> {
        Ok(false)
    }

    async fn grant_read_access(&self, _target: ShareTarget, _asset: &ImageAsset) -> Result<()> {
        Ok(())
    }

    async fn open_story(&self, _share: StoryShare) -> Result<bool> {
        Ok(false)
    }

    async fn resolve_whatsapp(&self, _route: WhatsAppRoute, _file: &Path) -> Result<bool> {
        Ok(false)
    }

    async fn hand_off_whatsapp(&self, _route: WhatsAppRoute, _file: &Path) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl GalleryWriter for OsBridge {
    async fn request_access(&self) -> Result<bool> {
        Ok(self.gallery.is_some())
    }

    async fn write(&self, image: GalleryImage) -> Result<GalleryEntry> {
        match &self.gallery {
            Some(gallery) => gallery.write(image).await,
            None => Err(crate::ShareError::SaveFailed("no pictures directory".to_string())),
        }
    }

    async fn publish(&self, entry: GalleryEntry) -> Result<GalleryEntry> {
        Ok(GalleryEntry{pending: false, ..entry})
    }
}
