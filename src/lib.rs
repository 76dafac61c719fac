use std::sync::Arc;

mod error;
pub use error::{ErrorKind, Result, ShareError};

mod target;
pub use target::ShareTarget;

mod color;
pub use color::HexColor;

mod channel;
pub use channel::{Arguments, MethodCall, Reply, Value};

mod config;
pub use config::{BackgroundColors, ShareConfig};

pub mod imaging;

mod native;
pub use native::{
    Background, GalleryEntry, GalleryImage, GalleryWriter, ImageAsset, InstalledAppOracle,
    NativeShareInvoker, StoryShare, WhatsAppRoute,
};

pub mod request;
pub use request::{Operation, ShareRequest};

mod dispatcher;
pub use dispatcher::Dispatcher;

mod gallery;
pub use gallery::FsGallery;

mod logger;
pub use logger::Logger;

pub mod platform;
pub use platform::OsBridge;

pub mod prelude {
    pub use crate::{Arguments, Reply, ShareConfig, SocialShare, Value};
}

/// The plugin entry point: a [`Dispatcher`] wired to this platform's [`OsBridge`].
pub struct SocialShare {
    dispatcher: Dispatcher<Arc<OsBridge>, Arc<OsBridge>, Arc<OsBridge>>,
}

impl SocialShare {
    pub fn new(config: ShareConfig) -> Result<Self> {
        let bridge = Arc::new(OsBridge::new(&config)?);
        Ok(Self::with_bridge(bridge, config))
    }

    pub fn with_bridge(bridge: Arc<OsBridge>, config: ShareConfig) -> Self {
        SocialShare{dispatcher: Dispatcher::new(bridge.clone(), bridge.clone(), bridge, config)}
    }

    pub fn config(&self) -> &ShareConfig {
        self.dispatcher.config()
    }

    pub async fn invoke(&self, method: &str, args: Arguments) -> Reply {
        self.dispatcher.invoke(method, args).await
    }

    /// Takes a `{"method": .., "arguments": {..}}` call and answers with the JSON reply envelope.
    pub async fn invoke_json(&self, call: &str) -> String {
        let reply = match MethodCall::from_json(call) {
            Ok(call) => self.dispatcher.handle(call).await.into(),
            Err(e) => Reply::from(Err(ShareError::InvalidArguments(format!("Malformed method call: {e}")))),
        };
        reply.to_json()
    }
}

#[cfg(all(test, not(any(target_os = "android", target_os = "ios"))))]
mod tests {
    use super::*;

    fn plugin(dir: &std::path::Path) -> SocialShare {
        let bridge = Arc::new(OsBridge::with_gallery(FsGallery::new(dir)));
        SocialShare::with_bridge(bridge, ShareConfig::default())
    }

    #[tokio::test]
    async fn nothing_is_installed_on_desktop() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = plugin(dir.path());
        for method in ["isInstagramInstalled", "isFacebookInstalled", "isWhatsAppInstalled"] {
            assert_eq!(plugin.invoke(method, Arguments::new()).await, Reply::Success(Value::Bool(false)));
        }
    }

    #[tokio::test]
    async fn story_reports_missing_app() {
        let dir = tempfile::tempdir().unwrap();
        let reply = plugin(dir.path())
            .invoke("shareToInstagramStories", Arguments::new().with("stickerPath", "/tmp/sticker.png"))
            .await;
        assert!(matches!(reply, Reply::Error{code, ..} if code == "INSTAGRAM_NOT_INSTALLED"));
    }

    #[tokio::test]
    async fn saves_into_the_album() {
        let dir = tempfile::tempdir().unwrap();
        let args = Arguments::new()
            .with("imageBytes", imaging::png_bytes(4, 4))
            .with("fileName", "shot.png");
        let reply = plugin(dir.path()).invoke("saveToGallery", args).await;
        assert_eq!(reply, Reply::Success(Value::Bool(true)));
        assert!(dir.path().join("SocialShare").join("shot.png").is_file());
    }

    #[tokio::test]
    async fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = plugin(dir.path());
        let reply = plugin.invoke_json(r#"{"method":"isWhatsAppInstalled","arguments":{}}"#).await;
        assert_eq!(serde_json::from_str::<Reply>(&reply).unwrap(), Reply::Success(Value::Bool(false)));

        let reply = plugin.invoke_json(r#"{"method":"shareToSnapchat"}"#).await;
        assert_eq!(serde_json::from_str::<Reply>(&reply).unwrap(), Reply::NotImplemented);
    }

    #[tokio::test]
    async fn null_arguments_are_no_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = plugin(dir.path());
        let reply = plugin.invoke_json(r#"{"method":"isInstagramInstalled","arguments":null}"#).await;
        assert_eq!(serde_json::from_str::<Reply>(&reply).unwrap(), Reply::Success(Value::Bool(false)));

        let reply = plugin.invoke_json(r#"{"method":"shareToSnapchat","arguments":null}"#).await;
        assert_eq!(serde_json::from_str::<Reply>(&reply).unwrap(), Reply::NotImplemented);
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let reply = plugin(dir.path()).invoke_json("{not json").await;
        match serde_json::from_str::<Reply>(&reply).unwrap() {
            Reply::Error{code, ..} => assert_eq!(code, "INVALID_ARGUMENTS"),
            other => panic!("unexpected reply {other:?}"),
        }
    }
}
