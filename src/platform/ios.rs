use std::cell::Cell;
use std::ffi::c_void;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use block2::RcBlock;
use dispatch2::DispatchQueue;
use objc2::rc::{Retained, autoreleasepool};
use objc2::runtime::{AnyClass, AnyObject, Bool, ClassBuilder, Sel};
use objc2::{MainThreadMarker, class, msg_send, sel};
use objc2_foundation::{NSData, NSPoint, NSRect, NSSize, NSString};
use tokio::sync::oneshot;

use crate::{
    Background, GalleryEntry, GalleryImage, GalleryWriter, ImageAsset, InstalledAppOracle,
    NativeShareInvoker, Result, ShareConfig, ShareError, ShareTarget, StoryShare, WhatsAppRoute,
};

#[link(name = "Photos", kind = "framework")]
unsafe extern "C" {}

const EXPIRATION_DATE_OPTION: &str = "com.apple.UIKit.pasteboard.expirationDate";
const PH_AUTHORIZED: isize = 3;
const PH_LIMITED: isize = 4;
const PH_ASSET_COLLECTION_ALBUM: isize = 1;
const PH_ASSET_COLLECTION_SUBTYPE_ALBUM_REGULAR: isize = 2;

/// URL scheme and pasteboard based sharing. UIKit work is always marshalled onto the main queue.
#[derive(Debug, Clone)]
pub struct OsBridge {
    pasteboard_expiry: Duration,
}

impl OsBridge {
    pub fn new(config: &ShareConfig) -> Result<Self> {
        Ok(OsBridge{pasteboard_expiry: config.pasteboard_expiry()})
    }
}

/// Runs `work` on the main queue and waits for the value it sends back.
async fn on_main<T: Send + 'static>(work: impl FnOnce(oneshot::Sender<T>) + Send + 'static) -> Result<T> {
    let (tx, rx) = oneshot::channel();
    DispatchQueue::main().exec_async(move || autoreleasepool(|_| work(tx)));
    rx.await.map_err(|_| ShareError::PresentationFailed("the main thread dropped the request".to_string()))
}

fn run_on_main<T: Send + Default>(work: impl FnOnce() -> T + Send) -> T {
    if MainThreadMarker::new().is_some() {
        return autoreleasepool(|_| work());
    }
    let mut out = None;
    DispatchQueue::main().exec_sync(|| out = Some(autoreleasepool(|_| work())));
    out.unwrap_or_default()
}

fn story_url(target: ShareTarget) -> Result<String> {
    match target {
        ShareTarget::Instagram => {
            let bundle = unsafe { bundle_identifier() }.unwrap_or_default();
            Ok(format!("{}share?source_application={bundle}", target.url_scheme()))
        }
        ShareTarget::Facebook => Ok(format!("{}share", target.url_scheme())),
        ShareTarget::WhatsApp => Err(ShareError::Url("WhatsApp has no story URL".to_string())),
    }
}

unsafe fn bundle_identifier() -> Option<String> {
    let bundle: *mut AnyObject = unsafe { msg_send![class!(NSBundle), mainBundle] };
    if bundle.is_null() {
        return None;
    }
    let identifier: *mut NSString = unsafe { msg_send![bundle, bundleIdentifier] };
    if identifier.is_null() {
        return None;
    }
    Some(unsafe { (*identifier).to_string() })
}

unsafe fn url_from_str(url: &str) -> Option<Retained<AnyObject>> {
    let string = NSString::from_str(url);
    unsafe { msg_send![class!(NSURL), URLWithString: &*string] }
}

unsafe fn shared_application() -> *mut AnyObject {
    unsafe { msg_send![class!(UIApplication), sharedApplication] }
}

unsafe fn can_open(url: &str) -> bool {
    let Some(url) = (unsafe { url_from_str(url) }) else {
        return false;
    };
    let app = unsafe { shared_application() };
    if app.is_null() {
        return false;
    }
    unsafe { msg_send![app, canOpenURL: &*url] }
}

unsafe fn root_view_controller() -> Option<*mut AnyObject> {
    let app = unsafe { shared_application() };
    if app.is_null() {
        return None;
    }
    let key_window: *mut AnyObject = unsafe { msg_send![app, keyWindow] };
    if key_window.is_null() {
        return None;
    }
    let root_vc: *mut AnyObject = unsafe { msg_send![key_window, rootViewController] };
    (!root_vc.is_null()).then_some(root_vc)
}

unsafe fn set_value(dictionary: *mut AnyObject, key: &str, value: &AnyObject) {
    let key = NSString::from_str(key);
    let _: () = unsafe { msg_send![dictionary, setObject: value, forKey: &*key] };
}

/// Puts the story payload on the general pasteboard, expiring after `expiry`.
unsafe fn write_pasteboard(share: &StoryShare, expiry: Duration) -> Result<()> {
    let prefix = share.target.pasteboard_prefix()
        .ok_or_else(|| ShareError::ShareFailed(format!("{} has no story composer", share.target)))?;

    let item: *mut AnyObject = unsafe { msg_send![class!(NSMutableDictionary), dictionary] };
    let sticker = NSData::with_bytes(&share.sticker.bytes);
    unsafe { set_value(item, &format!("{prefix}.stickerImage"), &sticker) };

    match &share.background {
        Background::Image(background) => {
            let background = NSData::with_bytes(&background.bytes);
            unsafe { set_value(item, &format!("{prefix}.backgroundImage"), &background) };
        }
        Background::Colors{top, bottom} => {
            let top = NSString::from_str(&top.to_string());
            let bottom = NSString::from_str(&bottom.to_string());
            unsafe {
                set_value(item, &format!("{prefix}.backgroundTopColor"), &top);
                set_value(item, &format!("{prefix}.backgroundBottomColor"), &bottom);
            }
        }
    }
    if let Some(app_id) = &share.app_id {
        let app_id = NSString::from_str(app_id);
        unsafe { set_value(item, &format!("{prefix}.appID"), &app_id) };
    }

    let items: *mut AnyObject = unsafe { msg_send![class!(NSArray), arrayWithObject: item] };
    let expires: *mut AnyObject = unsafe {
        msg_send![class!(NSDate), dateWithTimeIntervalSinceNow: expiry.as_secs_f64()]
    };
    let options: *mut AnyObject = unsafe { msg_send![class!(NSMutableDictionary), dictionary] };
    unsafe { set_value(options, EXPIRATION_DATE_OPTION, &*expires) };

    let pasteboard: *mut AnyObject = unsafe { msg_send![class!(UIPasteboard), generalPasteboard] };
    if pasteboard.is_null() {
        return Err(ShareError::ShareFailed("general pasteboard unavailable".to_string()));
    }
    let _: () = unsafe { msg_send![pasteboard, setItems: items, options: options] };
    Ok(())
}

/// Owns the document interaction controller and its delegate for as long as the menu is up.
struct OpenInMenu {
    _controller: Retained<AnyObject>,
    _delegate: Retained<AnyObject>,
}

const MENU_IVAR: &std::ffi::CStr = c"rustOpenInMenu";

extern "C" fn did_dismiss_open_in_menu(this: &AnyObject, _cmd: Sel, _controller: *mut AnyObject) {
    let Some(ivar) = this.class().instance_variable(MENU_IVAR) else {
        return;
    };
    unsafe {
        let slot = ivar.load_ptr::<*mut c_void>(this);
        let menu = std::mem::replace(&mut *slot, std::ptr::null_mut());
        if !menu.is_null() {
            // The menu holds the last strong reference to `this`, keep it until the pool drains.
            if let Some(this) = Retained::retain(this as *const AnyObject as *mut AnyObject) {
                let _ = Retained::autorelease_ptr(this);
            }
            drop(Box::from_raw(menu as *mut OpenInMenu));
        }
    }
}

fn open_in_delegate_class() -> Option<&'static AnyClass> {
    static CLASS: OnceLock<Option<&'static AnyClass>> = OnceLock::new();
    *CLASS.get_or_init(|| {
        let mut builder = ClassBuilder::new(c"SocialShareOpenInDelegate", class!(NSObject))?;
        builder.add_ivar::<*mut c_void>(MENU_IVAR);
        unsafe {
            builder.add_method(
                sel!(documentInteractionControllerDidDismissOpenInMenu:),
                did_dismiss_open_in_menu as extern "C" fn(&'static AnyObject, Sel, *mut AnyObject),
            );
        }
        Some(builder.register())
    })
}

/// Presents the "open in" menu for `path`. The controller lives until the menu is dismissed.
unsafe fn present_open_in(path: &Path) -> Result<bool> {
    let root_vc = unsafe { root_view_controller() }
        .ok_or_else(|| ShareError::View("Unable to find root view controller".to_string()))?;
    let view: *mut AnyObject = unsafe { msg_send![root_vc, view] };
    if view.is_null() {
        return Err(ShareError::View("Root view controller has no view".to_string()));
    }

    let path = NSString::from_str(&path.to_string_lossy());
    let url: Option<Retained<AnyObject>> = unsafe { msg_send![class!(NSURL), fileURLWithPath: &*path] };
    let url = url.ok_or_else(|| ShareError::Url("Invalid file URL".to_string()))?;
    let controller: Option<Retained<AnyObject>> = unsafe {
        msg_send![class!(UIDocumentInteractionController), interactionControllerWithURL: &*url]
    };
    let controller = controller.ok_or_else(|| ShareError::PresentationFailed("Could not create interaction controller".to_string()))?;
    let uti = NSString::from_str("public.image");
    let _: () = unsafe { msg_send![&*controller, setUTI: &*uti] };

    let class = open_in_delegate_class()
        .ok_or_else(|| ShareError::PresentationFailed("Could not register interaction delegate".to_string()))?;
    let delegate: Retained<AnyObject> = unsafe { msg_send![class, new] };
    let _: () = unsafe { msg_send![&*controller, setDelegate: &*delegate] };

    let ivar = class.instance_variable(MENU_IVAR)
        .ok_or_else(|| ShareError::PresentationFailed("Interaction delegate is missing its state".to_string()))?;
    let menu = Box::new(OpenInMenu{_controller: controller.clone(), _delegate: delegate.clone()});
    let slot = unsafe { ivar.load_ptr::<*mut c_void>(&delegate) };
    unsafe { *slot = Box::into_raw(menu) as *mut c_void };

    let rect = NSRect::new(NSPoint::new(0.0, 0.0), NSSize::new(1.0, 1.0));
    let presented: bool = unsafe {
        msg_send![&*controller, presentOpenInMenuFromRect: rect, inView: view, animated: true]
    };
    if !presented {
        did_dismiss_open_in_menu(&delegate, sel!(documentInteractionControllerDidDismissOpenInMenu:), std::ptr::null_mut());
    }
    Ok(presented)
}

fn photo_library() -> Result<&'static AnyClass> {
    AnyClass::get(c"PHPhotoLibrary").ok_or_else(|| ShareError::SaveFailed("Photos framework unavailable".to_string()))
}

unsafe fn error_message(error: *mut AnyObject) -> String {
    if error.is_null() {
        return "unknown error".to_string();
    }
    let description: *mut NSString = unsafe { msg_send![error, localizedDescription] };
    if description.is_null() {
        return "unknown error".to_string();
    }
    unsafe { (*description).to_string() }
}

unsafe fn find_album(title: &str) -> Option<Retained<AnyObject>> {
    let collections: *mut AnyObject = unsafe {
        msg_send![
            class!(PHAssetCollection),
            fetchAssetCollectionsWithType: PH_ASSET_COLLECTION_ALBUM,
            subtype: PH_ASSET_COLLECTION_SUBTYPE_ALBUM_REGULAR,
            options: std::ptr::null_mut::<AnyObject>()
        ]
    };
    if collections.is_null() {
        return None;
    }
    let count: usize = unsafe { msg_send![collections, count] };
    (0..count).find_map(|index| {
        let collection: Option<Retained<AnyObject>> = unsafe { msg_send![collections, objectAtIndex: index] };
        let collection = collection?;
        let name: *mut NSString = unsafe { msg_send![&*collection, localizedTitle] };
        (!name.is_null() && unsafe { (*name).to_string() } == title).then_some(collection)
    })
}

/// Queues the Photos change request. `done` receives the outcome from the Photos callback queue.
unsafe fn perform_save(image: &GalleryImage, done: oneshot::Sender<Result<()>>) -> Result<()> {
    let library_class = photo_library()?;
    let data = NSData::with_bytes(&image.bytes);
    let ui_image: Option<Retained<AnyObject>> = unsafe { msg_send![class!(UIImage), imageWithData: &*data] };
    let ui_image = ui_image.ok_or_else(|| ShareError::ImageConversion("UIImage rejected the encoded bytes".to_string()))?;
    let album = unsafe { find_album(&image.album) };
    let title = NSString::from_str(&image.album);

    let changes = RcBlock::new(move || unsafe {
        let request: *mut AnyObject = msg_send![class!(PHAssetChangeRequest), creationRequestForAssetFromImage: &*ui_image];
        if request.is_null() {
            return;
        }
        let placeholder: *mut AnyObject = msg_send![request, placeholderForCreatedAsset];
        let album_request: *mut AnyObject = match &album {
            Some(collection) => msg_send![class!(PHAssetCollectionChangeRequest), changeRequestForAssetCollection: &**collection],
            None => msg_send![class!(PHAssetCollectionChangeRequest), creationRequestForAssetCollectionWithTitle: &*title],
        };
        if !album_request.is_null() && !placeholder.is_null() {
            let assets: *mut AnyObject = msg_send![class!(NSArray), arrayWithObject: placeholder];
            let _: () = msg_send![album_request, addAssets: assets];
        }
    });

    let done = Cell::new(Some(done));
    let completion = RcBlock::new(move |success: Bool, error: *mut AnyObject| {
        let Some(done) = done.take() else {
            return;
        };
        let outcome = if success.as_bool() {
            Ok(())
        } else {
            Err(ShareError::SaveFailed(unsafe { error_message(error) }))
        };
        let _ = done.send(outcome);
    });

    let library: *mut AnyObject = unsafe { msg_send![library_class, sharedPhotoLibrary] };
    if library.is_null() {
        return Err(ShareError::SaveFailed("shared photo library unavailable".to_string()));
    }
    let _: () = unsafe { msg_send![library, performChanges: &*changes, completionHandler: &*completion] };
    Ok(())
}

unsafe fn request_photo_access(done: oneshot::Sender<bool>) -> Result<()> {
    let library_class = photo_library()?;
    let done = Cell::new(Some(done));
    let handler = RcBlock::new(move |status: isize| {
        if let Some(done) = done.take() {
            let _ = done.send(status == PH_AUTHORIZED || status == PH_LIMITED);
        }
    });
    let _: () = unsafe { msg_send![library_class, requestAuthorization: &*handler] };
    Ok(())
}

impl InstalledAppOracle for OsBridge {
    fn is_installed(&self, target: ShareTarget) -> bool {
        run_on_main(move || unsafe { can_open(target.url_scheme()) })
    }
}

#[async_trait]
impl NativeShareInvoker for OsBridge {
    async fn resolve_story(&self, target: ShareTarget) -> Result<bool> {
        let url = story_url(target)?;
        Ok(run_on_main(move || unsafe { can_open(&url) }))
    }

    async fn grant_read_access(&self, _target: ShareTarget, _asset: &ImageAsset) -> Result<()> {
        Ok(())
    }

    async fn open_story(&self, share: StoryShare) -> Result<bool> {
        let url = story_url(share.target)?;
        let expiry = self.pasteboard_expiry;
        let opened = on_main(move |tx: oneshot::Sender<Result<oneshot::Receiver<bool>>>| unsafe {
            let Some(url) = url_from_str(&url) else {
                let _ = tx.send(Err(ShareError::Url("Invalid URL scheme".to_string())));
                return;
            };
            if let Err(e) = write_pasteboard(&share, expiry) {
                let _ = tx.send(Err(e));
                return;
            }

            let (opened_tx, opened_rx) = oneshot::channel();
            let opened_tx = Cell::new(Some(opened_tx));
            let completion = RcBlock::new(move |success: Bool| {
                if let Some(opened_tx) = opened_tx.take() {
                    let _ = opened_tx.send(success.as_bool());
                }
            });
            let options: *mut AnyObject = msg_send![class!(NSDictionary), dictionary];
            let app = shared_application();
            let _: () = msg_send![app, openURL: &*url, options: options, completionHandler: &*completion];
            let _ = tx.send(Ok(opened_rx));
        }).await??;

        opened.await.map_err(|_| ShareError::PresentationFailed("openURL never completed".to_string()))
    }

    async fn resolve_whatsapp(&self, route: WhatsAppRoute, _file: &Path) -> Result<bool> {
        if route != WhatsAppRoute::OpenIn {
            return Ok(false);
        }
        Ok(run_on_main(|| unsafe {
            root_view_controller().is_some() && can_open(ShareTarget::WhatsApp.url_scheme())
        }))
    }

    async fn hand_off_whatsapp(&self, route: WhatsAppRoute, file: &Path) -> Result<()> {
        if route != WhatsAppRoute::OpenIn {
            return Err(ShareError::ShareFailed(format!("{route:?} is not available on iOS")));
        }
        let file = file.to_path_buf();
        let presented = on_main(move |tx| {
            let _ = tx.send(unsafe { present_open_in(&file) });
        }).await??;
        if !presented {
            return Err(ShareError::ShareFailed("Failed to present share options".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl GalleryWriter for OsBridge {
    async fn request_access(&self) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        unsafe { request_photo_access(tx)? };
        rx.await.map_err(|_| ShareError::PermissionDenied)
    }

    async fn write(&self, image: GalleryImage) -> Result<GalleryEntry> {
        let (tx, rx) = oneshot::channel();
        unsafe { perform_save(&image, tx)? };
        rx.await.map_err(|_| ShareError::SaveFailed("Photos never completed the change".to_string()))??;
        Ok(GalleryEntry{location: format!("{}/{}", image.album, image.file_name), pending: false})
    }

    async fn publish(&self, entry: GalleryEntry) -> Result<GalleryEntry> {
        Ok(GalleryEntry{pending: false, ..entry})
    }
}
