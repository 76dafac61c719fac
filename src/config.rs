use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{HexColor, ShareTarget};

/// Background used when a story share supplies neither a background image nor colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundColors {
    pub top: HexColor,
    pub bottom: HexColor,
}

impl BackgroundColors {
    pub fn solid(color: HexColor) -> Self {
        BackgroundColors{top: color, bottom: color}
    }
}

/// Tunables for the dispatcher and the platform backends.
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShareConfig {
    pub instagram_background: BackgroundColors,
    pub facebook_background: BackgroundColors,
    /// Used for Facebook stories when the caller does not send an `appId`.
    pub facebook_app_id: Option<String>,
    /// Sub-album (iOS) or Pictures sub-directory (Android, desktop) every gallery save lands in.
    pub gallery_album: String,
    pub pasteboard_expiry_secs: u64,
    pub max_sticker_dimension: u32,
    pub max_background_dimension: u32,
    /// Appended to the Android package name to form the FileProvider authority.
    pub file_provider_suffix: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        ShareConfig {
            instagram_background: BackgroundColors::solid(HexColor::WHITE),
            facebook_background: BackgroundColors::solid(HexColor::BLACK),
            facebook_app_id: None,
            gallery_album: "SocialShare".to_string(),
            pasteboard_expiry_secs: 5 * 60,
            max_sticker_dimension: 640,
            max_background_dimension: 1920,
            file_provider_suffix: ".fileprovider".to_string(),
        }
    }
}

impl ShareConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&raw)?)
    }

    pub fn default_background(&self, target: ShareTarget) -> BackgroundColors {
        match target {
            ShareTarget::Facebook => self.facebook_background,
            _ => self.instagram_background,
        }
    }

    pub fn pasteboard_expiry(&self) -> Duration {
        Duration::from_secs(self.pasteboard_expiry_secs)
    }
}
