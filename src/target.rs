use serde::{Deserialize, Serialize};

// Apps this crate can hand content to.

// System:
// <Android>>>: each target is identified by its package name, stories go through an explicit ADD_TO_STORY intent.
// <iOS>>>: each target is probed through its URL scheme, stories go through the general pasteboard.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShareTarget {
    Instagram,
    Facebook,
    WhatsApp,
}

impl ShareTarget {
    pub fn display_name(&self) -> &'static str {
        match self {
            ShareTarget::Instagram => "Instagram",
            ShareTarget::Facebook => "Facebook",
            ShareTarget::WhatsApp => "WhatsApp",
        }
    }

    pub fn package_name(&self) -> &'static str {
        match self {
            ShareTarget::Instagram => "com.instagram.android",
            ShareTarget::Facebook => "com.facebook.katana",
            ShareTarget::WhatsApp => "com.whatsapp",
        }
    }

    pub fn url_scheme(&self) -> &'static str {
        match self {
            ShareTarget::Instagram => "instagram-stories://",
            ShareTarget::Facebook => "facebook-stories://",
            ShareTarget::WhatsApp => "whatsapp://",
        }
    }

    pub fn not_installed_code(&self) -> &'static str {
        match self {
            ShareTarget::Instagram => "INSTAGRAM_NOT_INSTALLED",
            ShareTarget::Facebook => "FACEBOOK_NOT_INSTALLED",
            ShareTarget::WhatsApp => "WHATSAPP_NOT_INSTALLED",
        }
    }

    /// Android intent action that opens the story composer. WhatsApp has none.
    pub fn story_action(&self) -> Option<&'static str> {
        match self {
            ShareTarget::Instagram => Some("com.instagram.share.ADD_TO_STORY"),
            ShareTarget::Facebook => Some("com.facebook.stories.ADD_TO_STORY"),
            ShareTarget::WhatsApp => None,
        }
    }

    /// Prefix of the iOS pasteboard keys read by the story composer.
    pub fn pasteboard_prefix(&self) -> Option<&'static str> {
        match self {
            ShareTarget::Instagram => Some("com.instagram.sharedSticker"),
            ShareTarget::Facebook => Some("com.facebook.sharedSticker"),
            ShareTarget::WhatsApp => None,
        }
    }
}

impl std::fmt::Display for ShareTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
