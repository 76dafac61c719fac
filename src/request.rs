use std::path::PathBuf;

use crate::{Arguments, BackgroundColors, HexColor, MethodCall, Result, ShareError, ShareTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    InstagramStory,
    FacebookStory,
    WhatsAppStatus,
    SaveToGallery,
    CheckInstalled(ShareTarget),
}

impl Operation {
    pub fn parse(method: &str) -> Option<Self> {
        Some(match method {
            "shareToInstagramStories" => Operation::InstagramStory,
            "shareToFacebookStories" => Operation::FacebookStory,
            "shareToWhatsAppStatus" => Operation::WhatsAppStatus,
            "saveToGallery" => Operation::SaveToGallery,
            "isInstagramInstalled" => Operation::CheckInstalled(ShareTarget::Instagram),
            "isFacebookInstalled" => Operation::CheckInstalled(ShareTarget::Facebook),
            "isWhatsAppInstalled" => Operation::CheckInstalled(ShareTarget::WhatsApp),
            _ => return None,
        })
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            Operation::InstagramStory => "shareToInstagramStories",
            Operation::FacebookStory => "shareToFacebookStories",
            Operation::WhatsAppStatus => "shareToWhatsAppStatus",
            Operation::SaveToGallery => "saveToGallery",
            Operation::CheckInstalled(ShareTarget::Instagram) => "isInstagramInstalled",
            Operation::CheckInstalled(ShareTarget::Facebook) => "isFacebookInstalled",
            Operation::CheckInstalled(ShareTarget::WhatsApp) => "isWhatsAppInstalled",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareRequest {
    pub operation: Operation,
    pub args: Arguments,
}

impl ShareRequest {
    pub fn from_call(call: MethodCall) -> Result<Self> {
        let operation = Operation::parse(&call.method).ok_or(ShareError::NotImplemented(call.method))?;
        Ok(ShareRequest{operation, args: call.arguments})
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StickerPayload {
    pub sticker_image_path: PathBuf,
    pub background_image_path: Option<PathBuf>,
    pub background_top_color: Option<HexColor>,
    pub background_bottom_color: Option<HexColor>,
    pub app_id: Option<String>,
}

impl StickerPayload {
    pub fn from_arguments(args: &Arguments) -> Result<Self> {
        let sticker = args.string("stickerPath")
            .ok_or_else(|| ShareError::InvalidArguments("Sticker path is required".to_string()))?;
        let background_image_path = args.string("backgroundImagePath").map(PathBuf::from);
        // A background image replaces the colours, so they are not read at all.
        let (background_top_color, background_bottom_color) = match background_image_path {
            Some(_) => (None, None),
            None => (color_argument(args, "backgroundTopColor")?, color_argument(args, "backgroundBottomColor")?),
        };
        Ok(StickerPayload {
            sticker_image_path: PathBuf::from(sticker),
            background_image_path,
            background_top_color,
            background_bottom_color,
            app_id: args.first_string(&["appId", "appID"]).map(str::to_string),
        })
    }

    /// Caller colours, each falling back independently to `defaults`.
    pub fn background_colors(&self, defaults: BackgroundColors) -> BackgroundColors {
        BackgroundColors {
            top: self.background_top_color.unwrap_or(defaults.top),
            bottom: self.background_bottom_color.unwrap_or(defaults.bottom),
        }
    }
}

fn color_argument(args: &Arguments, key: &str) -> Result<Option<HexColor>> {
    args.string(key).map(|raw| {
        HexColor::parse(raw).ok_or_else(|| ShareError::InvalidArguments(format!("{key} must be a #RRGGBB colour, got '{raw}'")))
    }).transpose()
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhatsAppPayload {
    pub image_path: PathBuf,
}

impl WhatsAppPayload {
    pub fn from_arguments(args: &Arguments) -> Result<Self> {
        let path = args.string("imagePath")
            .ok_or_else(|| ShareError::InvalidArguments("Image path is required".to_string()))?;
        Ok(WhatsAppPayload{image_path: PathBuf::from(path)})
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryPayload {
    pub image_bytes: Vec<u8>,
    pub file_name: String,
}

impl GalleryPayload {
    pub fn from_arguments(args: &Arguments) -> Result<Self> {
        let missing = || ShareError::InvalidArguments("Image bytes and filename required".to_string());
        let image_bytes = args.bytes("imageBytes").filter(|b| !b.is_empty()).ok_or_else(missing)?;
        let file_name = args.string("fileName").ok_or_else(missing)?.to_string();
        Ok(GalleryPayload{image_bytes, file_name})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_round_trip() {
        for method in [
            "shareToInstagramStories", "shareToFacebookStories", "shareToWhatsAppStatus",
            "saveToGallery", "isInstagramInstalled", "isFacebookInstalled", "isWhatsAppInstalled",
        ] {
            assert_eq!(Operation::parse(method).unwrap().method_name(), method);
        }
        assert_eq!(Operation::parse("shareToinstagramStories"), None);
        assert_eq!(Operation::parse("shareToTikTok"), None);
    }

    #[test]
    fn unknown_methods_are_not_implemented() {
        let err = ShareRequest::from_call(MethodCall::new("shareToSnapchat", Arguments::new())).unwrap_err();
        assert_eq!(err, ShareError::NotImplemented("shareToSnapchat".to_string()));
    }

    #[test]
    fn sticker_payload_reads_everything() {
        let args = Arguments::new()
            .with("stickerPath", "/tmp/s.png")
            .with("backgroundTopColor", "#112233")
            .with("appID", "42")
            .with("unrelated", true);
        let payload = StickerPayload::from_arguments(&args).unwrap();
        assert_eq!(payload.sticker_image_path, PathBuf::from("/tmp/s.png"));
        assert_eq!(payload.background_image_path, None);
        assert_eq!(payload.background_top_color, Some(HexColor::new(0x11, 0x22, 0x33)));
        assert_eq!(payload.background_bottom_color, None);
        assert_eq!(payload.app_id.as_deref(), Some("42"));
    }

    #[test]
    fn background_image_ignores_colours() {
        let args = Arguments::new()
            .with("stickerPath", "/tmp/s.png")
            .with("backgroundImagePath", "/tmp/bg.png")
            .with("backgroundTopColor", "#FFF")
            .with("backgroundBottomColor", "not a colour");
        let payload = StickerPayload::from_arguments(&args).unwrap();
        assert_eq!(payload.background_image_path, Some(PathBuf::from("/tmp/bg.png")));
        assert_eq!(payload.background_top_color, None);
        assert_eq!(payload.background_bottom_color, None);
    }

    #[test]
    fn colours_default_independently() {
        let args = Arguments::new().with("stickerPath", "/tmp/s.png").with("backgroundBottomColor", "#FF0000");
        let payload = StickerPayload::from_arguments(&args).unwrap();
        let colors = payload.background_colors(BackgroundColors::solid(HexColor::WHITE));
        assert_eq!(colors.top, HexColor::WHITE);
        assert_eq!(colors.bottom, HexColor::new(0xFF, 0, 0));
    }

    #[test]
    fn bad_colour_is_invalid_arguments() {
        let args = Arguments::new().with("stickerPath", "/tmp/s.png").with("backgroundTopColor", "red");
        assert!(matches!(StickerPayload::from_arguments(&args), Err(ShareError::InvalidArguments(_))));
    }

    #[test]
    fn required_arguments() {
        assert!(matches!(StickerPayload::from_arguments(&Arguments::new()), Err(ShareError::InvalidArguments(_))));
        assert!(matches!(WhatsAppPayload::from_arguments(&Arguments::new()), Err(ShareError::InvalidArguments(_))));

        let no_name = Arguments::new().with("imageBytes", vec![1u8, 2, 3]);
        assert!(matches!(GalleryPayload::from_arguments(&no_name), Err(ShareError::InvalidArguments(_))));
        let empty_bytes = Arguments::new().with("imageBytes", Vec::<u8>::new()).with("fileName", "a.png");
        assert!(matches!(GalleryPayload::from_arguments(&empty_bytes), Err(ShareError::InvalidArguments(_))));
        let ok = Arguments::new().with("imageBytes", vec![1u8]).with("fileName", "a.png");
        assert_eq!(GalleryPayload::from_arguments(&ok).unwrap().file_name, "a.png");
    }
}
