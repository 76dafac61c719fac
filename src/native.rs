use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::{HexColor, Result, ShareTarget};

// Capabilities the dispatcher needs from the operating system.
// Implementations live in `platform`, tests use the recording fakes at the bottom of this file.

/// An image ready to hand to another app.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    /// The file the caller pointed at.
    pub path: PathBuf,
    /// Encoded image. The original file contents unless `resized` is set, then PNG.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub resized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Image(ImageAsset),
    Colors { top: HexColor, bottom: HexColor },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoryShare {
    pub target: ShareTarget,
    pub sticker: ImageAsset,
    pub background: Background,
    pub app_id: Option<String>,
}

impl StoryShare {
    /// Every file the receiving app needs read access to.
    pub fn files(&self) -> Vec<&ImageAsset> {
        let mut files = vec![&self.sticker];
        if let Background::Image(background) = &self.background {
            files.push(background);
        }
        files
    }
}

/// Ways of getting an image into WhatsApp, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhatsAppRoute {
    /// Contact picker preselected on the `status@broadcast` jid.
    StatusPicker,
    /// The status camera/recorder screen.
    StatusRecorder,
    /// The system "open in" menu for the file.
    OpenIn,
    /// A plain send intent restricted to the WhatsApp package.
    PackageShare,
}

impl WhatsAppRoute {
    pub const CHAIN: [WhatsAppRoute; 4] = [
        WhatsAppRoute::StatusPicker,
        WhatsAppRoute::StatusRecorder,
        WhatsAppRoute::OpenIn,
        WhatsAppRoute::PackageShare,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryImage {
    pub album: String,
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Receipt for a gallery write. A pending entry is invisible to other apps until published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryEntry {
    pub location: String,
    pub pending: bool,
}

pub trait InstalledAppOracle: Send + Sync {
    /// Total: anything that prevents a definite answer reads as `false`.
    fn is_installed(&self, target: ShareTarget) -> bool;
}

#[async_trait]
pub trait NativeShareInvoker: Send + Sync {
    /// Whether the target's story composer can be opened right now.
    async fn resolve_story(&self, target: ShareTarget) -> Result<bool>;
    async fn grant_read_access(&self, target: ShareTarget, asset: &ImageAsset) -> Result<()>;
    /// Hands the payload over. The boolean is the platform's acceptance.
    async fn open_story(&self, share: StoryShare) -> Result<bool>;
    /// An `Err` means the route could not even be constructed.
    async fn resolve_whatsapp(&self, route: WhatsAppRoute, file: &Path) -> Result<bool>;
    async fn hand_off_whatsapp(&self, route: WhatsAppRoute, file: &Path) -> Result<()>;
}

#[async_trait]
pub trait GalleryWriter: Send + Sync {
    async fn request_access(&self) -> Result<bool>;
    async fn write(&self, image: GalleryImage) -> Result<GalleryEntry>;
    /// Clears the pending state of `entry`.
    async fn publish(&self, entry: GalleryEntry) -> Result<GalleryEntry>;
}

impl<T: InstalledAppOracle + ?Sized> InstalledAppOracle for Arc<T> {
    fn is_installed(&self, target: ShareTarget) -> bool {
        (**self).is_installed(target)
    }
}

#[async_trait]
impl<T: NativeShareInvoker + ?Sized> NativeShareInvoker for Arc<T> {
    async fn resolve_story(&self, target: ShareTarget) -> Result<bool> {
        (**self).resolve_story(target).await
    }

    async fn grant_read_access(&self, target: ShareTarget, asset: &ImageAsset) -> Result<()> {
        (**self).grant_read_access(target, asset).await
    }

    async fn open_story(&self, share: StoryShare) -> Result<bool> {
        (**self).open_story(share).await
    }

    async fn resolve_whatsapp(&self, route: WhatsAppRoute, file: &Path) -> Result<bool> {
        (**self).resolve_whatsapp(route, file).await
    }

    async fn hand_off_whatsapp(&self, route: WhatsAppRoute, file: &Path) -> Result<()> {
        (**self).hand_off_whatsapp(route, file).await
    }
}

#[async_trait]
impl<T: GalleryWriter + ?Sized> GalleryWriter for Arc<T> {
    async fn request_access(&self) -> Result<bool> {
        (**self).request_access().await
    }

    async fn write(&self, image: GalleryImage) -> Result<GalleryEntry> {
        (**self).write(image).await
    }

    async fn publish(&self, entry: GalleryEntry) -> Result<GalleryEntry> {
        (**self).publish(entry).await
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;
    use crate::ShareError;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Installed(ShareTarget),
        ResolveStory(ShareTarget),
        Grant(ShareTarget, PathBuf),
        OpenStory(StoryShare),
        ResolveWhatsApp(WhatsAppRoute),
        HandOff(WhatsAppRoute, PathBuf),
        RequestAccess,
        Write(GalleryImage),
        Publish(String),
    }

    /// Oracle, invoker and gallery in one, recording every call in order.
    #[derive(Default)]
    pub struct FakeNative {
        pub installed: HashSet<ShareTarget>,
        pub story_resolvable: bool,
        pub story_accepted: bool,
        pub routes: HashSet<WhatsAppRoute>,
        pub broken_routes: HashSet<WhatsAppRoute>,
        pub hand_off_fails: bool,
        pub gallery_denied: bool,
        pub gallery_pending: bool,
        pub publish_fails: bool,
        pub calls: Mutex<Vec<Call>>,
    }

    impl FakeNative {
        pub fn new() -> Self {
            FakeNative{story_accepted: true, ..Default::default()}
        }

        pub fn with_installed(mut self, target: ShareTarget) -> Self {
            self.installed.insert(target);
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        /// Calls other than installed-app probes.
        pub fn native_calls(&self) -> Vec<Call> {
            self.calls().into_iter().filter(|c| !matches!(c, Call::Installed(_))).collect()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl InstalledAppOracle for FakeNative {
        fn is_installed(&self, target: ShareTarget) -> bool {
            self.record(Call::Installed(target));
            self.installed.contains(&target)
        }
    }

    #[async_trait]
    impl NativeShareInvoker for FakeNative {
        async fn resolve_story(&self, target: ShareTarget) -> Result<bool> {
            self.record(Call::ResolveStory(target));
            Ok(self.story_resolvable)
        }

        async fn grant_read_access(&self, target: ShareTarget, asset: &ImageAsset) -> Result<()> {
            self.record(Call::Grant(target, asset.path.clone()));
            Ok(())
        }

        async fn open_story(&self, share: StoryShare) -> Result<bool> {
            self.record(Call::OpenStory(share));
            Ok(self.story_accepted)
        }

        async fn resolve_whatsapp(&self, route: WhatsAppRoute, _file: &Path) -> Result<bool> {
            self.record(Call::ResolveWhatsApp(route));
            if self.broken_routes.contains(&route) {
                return Err(ShareError::ShareFailed(format!("{route:?} could not be built")));
            }
            Ok(self.routes.contains(&route))
        }

        async fn hand_off_whatsapp(&self, route: WhatsAppRoute, file: &Path) -> Result<()> {
            self.record(Call::HandOff(route, file.to_path_buf()));
            if self.hand_off_fails {
                return Err(ShareError::StartActivityFailed(format!("{route:?} was refused")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl GalleryWriter for FakeNative {
        async fn request_access(&self) -> Result<bool> {
            self.record(Call::RequestAccess);
            Ok(!self.gallery_denied)
        }

        async fn write(&self, image: GalleryImage) -> Result<GalleryEntry> {
            let location = format!("{}/{}", image.album, image.file_name);
            self.record(Call::Write(image));
            Ok(GalleryEntry{location, pending: self.gallery_pending})
        }

        async fn publish(&self, entry: GalleryEntry) -> Result<GalleryEntry> {
            self.record(Call::Publish(entry.location.clone()));
            if self.publish_fails {
                return Ok(entry);
            }
            Ok(GalleryEntry{pending: false, ..entry})
        }
    }
}
