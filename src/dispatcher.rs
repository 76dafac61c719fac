use crate::imaging;
use crate::request::{GalleryPayload, Operation, ShareRequest, StickerPayload, WhatsAppPayload};
use crate::{
    Arguments, Background, GalleryImage, GalleryWriter, InstalledAppOracle, MethodCall,
    NativeShareInvoker, Reply, Result, ShareConfig, ShareError, ShareTarget, StoryShare, Value,
    WhatsAppRoute,
};

/// Routes method calls onto the native collaborators.
///
/// Holds no per-call state: every call validates its own arguments, checks the target app,
/// then makes at most one native hand-off.
pub struct Dispatcher<O, I, G> {
    oracle: O,
    invoker: I,
    gallery: G,
    config: ShareConfig,
}

impl<O: InstalledAppOracle, I: NativeShareInvoker, G: GalleryWriter> Dispatcher<O, I, G> {
    pub fn new(oracle: O, invoker: I, gallery: G, config: ShareConfig) -> Self {
        Dispatcher{oracle, invoker, gallery, config}
    }

    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    pub async fn invoke(&self, method: &str, args: Arguments) -> Reply {
        self.handle(MethodCall::new(method, args)).await.into()
    }

    pub async fn handle(&self, call: MethodCall) -> Result<Value> {
        let request = ShareRequest::from_call(call)?;
        log::info!("handling {}", request.operation.method_name());
        let result = self.dispatch(&request).await;
        if let Err(e) = &result {
            log::warn!("{} failed with {}: {}", request.operation.method_name(), e.code(), e);
        }
        result.map(Value::Bool)
    }

    async fn dispatch(&self, request: &ShareRequest) -> Result<bool> {
        match request.operation {
            Operation::CheckInstalled(target) => Ok(self.oracle.is_installed(target)),
            Operation::InstagramStory => self.share_story(ShareTarget::Instagram, &request.args).await,
            Operation::FacebookStory => self.share_story(ShareTarget::Facebook, &request.args).await,
            Operation::WhatsAppStatus => self.share_whatsapp(&request.args).await,
            Operation::SaveToGallery => self.save_to_gallery(&request.args).await,
        }
    }

    async fn share_story(&self, target: ShareTarget, args: &Arguments) -> Result<bool> {
        let payload = StickerPayload::from_arguments(args)?;
        if !self.oracle.is_installed(target) {
            return Err(ShareError::AppNotInstalled(target));
        }

        let sticker = imaging::load_asset(&payload.sticker_image_path, self.config.max_sticker_dimension)?;
        let background = match &payload.background_image_path {
            Some(path) => Background::Image(imaging::load_asset(path, self.config.max_background_dimension)?),
            None => {
                let colors = payload.background_colors(self.config.default_background(target));
                Background::Colors{top: colors.top, bottom: colors.bottom}
            }
        };
        let app_id = match target {
            ShareTarget::Facebook => payload.app_id.clone().or_else(|| self.config.facebook_app_id.clone()),
            _ => None,
        };
        let share = StoryShare{target, sticker, background, app_id};

        if !self.invoker.resolve_story(target).await? {
            return Err(ShareError::ActivityNotFound);
        }
        for asset in share.files() {
            self.invoker.grant_read_access(target, asset).await?;
        }
        self.invoker.open_story(share).await
    }

    async fn share_whatsapp(&self, args: &Arguments) -> Result<bool> {
        let payload = WhatsAppPayload::from_arguments(args)?;
        let path = payload.image_path.as_path();
        if !path.is_file() {
            return Err(ShareError::FileNotFound(path.display().to_string()));
        }
        if !self.oracle.is_installed(ShareTarget::WhatsApp) {
            return Err(ShareError::AppNotInstalled(ShareTarget::WhatsApp));
        }

        // Strictly sequential, the first resolvable route is the only one handed off.
        for route in WhatsAppRoute::CHAIN {
            match self.invoker.resolve_whatsapp(route, path).await {
                Ok(true) => {
                    log::debug!("sharing to WhatsApp through {route:?}");
                    self.invoker.hand_off_whatsapp(route, path).await?;
                    return Ok(true);
                }
                Ok(false) => log::debug!("WhatsApp route {route:?} is not available"),
                Err(e) => log::warn!("WhatsApp route {route:?} skipped: {e}"),
            }
        }
        Err(ShareError::ActivityNotFound)
    }

    async fn save_to_gallery(&self, args: &Arguments) -> Result<bool> {
        let payload = GalleryPayload::from_arguments(args)?;
        // The decoded bitmap only lives inside this block.
        let png = {
            let image = imaging::decode(&payload.image_bytes)?;
            imaging::encode_png(&image)?
        };

        if !self.gallery.request_access().await? {
            return Err(ShareError::PermissionDenied);
        }

        let mut entry = self.gallery.write(GalleryImage {
            album: self.config.gallery_album.clone(),
            file_name: payload.file_name,
            mime_type: "image/png",
            bytes: png,
        }).await?;
        if entry.pending {
            entry = self.gallery.publish(entry).await?;
        }
        if entry.pending {
            return Err(ShareError::SaveFailed(format!("{} is still pending", entry.location)));
        }
        log::info!("saved {}", entry.location);
        Ok(true)
    }
}
