// Native backends for the dispatcher.

// System:

// <Android>>>: JNI against the application Context. Package lookups answer the installed checks,
//      stories and WhatsApp go through explicit intents with FileProvider URIs, the gallery is MediaStore.

// <iOS>>>: URL scheme probes answer the installed checks, stories go through the general pasteboard,
//      WhatsApp through a document interaction "open in" menu, the gallery is PHPhotoLibrary.

// <macOS, Linux, Windows>>>: no app to share to, so nothing is installed. Gallery saves land in the pictures directory.

#[cfg(target_os = "android")]
mod android;
#[cfg(target_os = "android")]
pub use android::OsBridge;

#[cfg(target_os = "ios")]
mod ios;
#[cfg(target_os = "ios")]
pub use ios::OsBridge;

#[cfg(not(any(target_os = "android", target_os = "ios")))]
mod desktop;
#[cfg(not(any(target_os = "android", target_os = "ios")))]
pub use desktop::OsBridge;
