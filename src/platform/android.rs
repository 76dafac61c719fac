use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::jobject;
use jni::{JNIEnv, JavaVM};

use crate::imaging;
use crate::{
    Background, FsGallery, GalleryEntry, GalleryImage, GalleryWriter, ImageAsset,
    InstalledAppOracle, NativeShareInvoker, Result, ShareConfig, ShareError, ShareTarget,
    StoryShare, WhatsAppRoute,
};

type JniResult<T> = std::result::Result<T, Box<dyn Error>>;

const FLAG_GRANT_READ_URI_PERMISSION: i32 = 0x0000_0001;
const FLAG_ACTIVITY_NEW_TASK: i32 = 0x1000_0000;
const PERMISSION_GRANTED: i32 = 0;
const ANDROID_Q: i32 = 29;
const STATUS_JID: &str = "status@broadcast";

/// Intent based sharing through the application Context.
#[derive(Clone)]
pub struct OsBridge {
    vm: Arc<JavaVM>,
    context: GlobalRef,
    authority: String,
    cache_dir: PathBuf,
}

impl OsBridge {
    pub fn new(config: &ShareConfig) -> Result<Self> {
        Self::initialize(config).map_err(|e| ShareError::View(format!("Android context unavailable: {e}")))
    }

    fn initialize(config: &ShareConfig) -> JniResult<Self> {
        let vm = unsafe { JavaVM::from_raw(ndk_context::android_context().vm().cast())? };
        let ctx_ptr = ndk_context::android_context().context();
        if ctx_ptr.is_null() {
            return Err("Failed to get Android context".into());
        }

        let (context, authority, cache_dir) = {
            let mut env = vm.attach_current_thread()?;
            let context_obj = unsafe { JObject::from_raw(ctx_ptr as jobject) };
            let context = env.new_global_ref(context_obj)?;

            let package = env.call_method(context.as_obj(), "getPackageName", "()Ljava/lang/String;", &[])?.l()?;
            let package: String = env.get_string(&JString::from(package))?.into();

            let cache = env.call_method(context.as_obj(), "getCacheDir", "()Ljava/io/File;", &[])?.l()?;
            let cache = absolute_path(&mut env, &cache)?;
            (context, format!("{package}{}", config.file_provider_suffix), cache.join("social_share"))
        };

        Ok(OsBridge{vm: Arc::new(vm), context, authority, cache_dir})
    }

    /// Runs `f` in its own local frame and clears any pending Java exception afterwards.
    fn with_env<T>(&self, f: impl FnOnce(&mut JNIEnv) -> JniResult<T>) -> JniResult<T> {
        let mut env = self.vm.attach_current_thread()?;
        let result = env.with_local_frame(32, |env| f(env));
        if env.exception_check().unwrap_or(false) {
            let _ = env.exception_describe();
            let _ = env.exception_clear();
        }
        result
    }

    fn load_class<'local>(&self, env: &mut JNIEnv<'local>, name: &str) -> JniResult<JClass<'local>> {
        let loader = env.call_method(self.context.as_obj(), "getClassLoader", "()Ljava/lang/ClassLoader;", &[])?.l()?;
        let name = env.new_string(name)?;
        let class = env.call_method(
            &loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&name)],
        )?.l()?;
        Ok(JClass::from(class))
    }

    fn sdk_version(env: &mut JNIEnv) -> JniResult<i32> {
        Ok(env.get_static_field("android/os/Build$VERSION", "SDK_INT", "I")?.i()?)
    }

    fn package_installed(&self, package: &str) -> JniResult<bool> {
        self.with_env(|env| {
            let pm = package_manager(env, self.context.as_obj())?;
            let name = env.new_string(package)?;
            env.call_method(
                &pm,
                "getPackageInfo",
                "(Ljava/lang/String;I)Landroid/content/pm/PackageInfo;",
                &[JValue::Object(&name), JValue::Int(0)],
            )?;
            Ok(true)
        })
    }

    fn shareable_path(&self, asset: &ImageAsset) -> Result<PathBuf> {
        imaging::staged_path(asset, &self.cache_dir)
    }

    fn file_uri<'local>(&self, env: &mut JNIEnv<'local>, path: &Path) -> JniResult<JObject<'local>> {
        let path = env.new_string(path.to_string_lossy())?;
        let file = env.new_object("java/io/File", "(Ljava/lang/String;)V", &[JValue::Object(&path)])?;
        let authority = env.new_string(&self.authority)?;
        let provider = self.load_class(env, "androidx.core.content.FileProvider")?;
        let uri = env.call_static_method(
            provider,
            "getUriForFile",
            "(Landroid/content/Context;Ljava/lang/String;Ljava/io/File;)Landroid/net/Uri;",
            &[JValue::Object(self.context.as_obj()), JValue::Object(&authority), JValue::Object(&file)],
        )?.l()?;
        Ok(uri)
    }

    fn grant(&self, env: &mut JNIEnv, package: &str, uri: &JObject) -> JniResult<()> {
        let package = env.new_string(package)?;
        env.call_method(
            self.context.as_obj(),
            "grantUriPermission",
            "(Ljava/lang/String;Landroid/net/Uri;I)V",
            &[JValue::Object(&package), JValue::Object(uri), JValue::Int(FLAG_GRANT_READ_URI_PERMISSION)],
        )?;
        Ok(())
    }

    fn resolves(&self, env: &mut JNIEnv, intent: &JObject) -> JniResult<bool> {
        let pm = package_manager(env, self.context.as_obj())?;
        let info = env.call_method(
            &pm,
            "resolveActivity",
            "(Landroid/content/Intent;I)Landroid/content/pm/ResolveInfo;",
            &[JValue::Object(intent), JValue::Int(0)],
        )?.l()?;
        Ok(!info.is_null())
    }

    fn start_activity(&self, env: &mut JNIEnv, intent: &JObject) -> JniResult<()> {
        env.call_method(
            self.context.as_obj(),
            "startActivity",
            "(Landroid/content/Intent;)V",
            &[JValue::Object(intent)],
        )?;
        Ok(())
    }

    fn story_probe<'local>(&self, env: &mut JNIEnv<'local>, target: ShareTarget) -> JniResult<JObject<'local>> {
        let action = target.story_action().ok_or_else(|| format!("{target} has no story composer"))?;
        let intent = new_intent(env, action)?;
        set_package(env, &intent, target.package_name())?;
        set_type(env, &intent, "image/*")?;
        Ok(intent)
    }

    fn story_intent<'local>(&self, env: &mut JNIEnv<'local>, share: &StoryShare) -> JniResult<JObject<'local>> {
        let action = share.target.story_action().ok_or_else(|| format!("{} has no story composer", share.target))?;
        let intent = new_intent(env, action)?;
        env.call_method(
            &intent,
            "setFlags",
            "(I)Landroid/content/Intent;",
            &[JValue::Int(FLAG_GRANT_READ_URI_PERMISSION | FLAG_ACTIVITY_NEW_TASK)],
        )?;
        set_package(env, &intent, share.target.package_name())?;

        let sticker = self.file_uri(env, &self.shareable_path(&share.sticker)?)?;
        put_parcelable_extra(env, &intent, "interactive_asset_uri", &sticker)?;

        if let Some(app_id) = &share.app_id {
            put_string_extra(env, &intent, "com.facebook.platform.extra.APPLICATION_ID", app_id)?;
        }

        match &share.background {
            Background::Image(background) => {
                let uri = self.file_uri(env, &self.shareable_path(background)?)?;
                let mime = env.new_string("image/*")?;
                env.call_method(
                    &intent,
                    "setDataAndType",
                    "(Landroid/net/Uri;Ljava/lang/String;)Landroid/content/Intent;",
                    &[JValue::Object(&uri), JValue::Object(&mime)],
                )?;
            }
            Background::Colors{top, bottom} => {
                set_type(env, &intent, "image/*")?;
                put_string_extra(env, &intent, "top_background_color", &top.to_string())?;
                put_string_extra(env, &intent, "bottom_background_color", &bottom.to_string())?;
            }
        }
        Ok(intent)
    }

    fn whatsapp_intent<'local>(
        &self,
        env: &mut JNIEnv<'local>,
        route: WhatsAppRoute,
        uri: &JObject,
    ) -> JniResult<Option<JObject<'local>>> {
        let package = ShareTarget::WhatsApp.package_name();
        let component = match route {
            WhatsAppRoute::StatusPicker => Some("com.whatsapp.ContactPicker"),
            WhatsAppRoute::StatusRecorder => Some("com.whatsapp.StatusRecorderActivity"),
            WhatsAppRoute::PackageShare => None,
            WhatsAppRoute::OpenIn => return Ok(None),
        };

        let intent = new_intent(env, "android.intent.action.SEND")?;
        set_type(env, &intent, "image/*")?;
        env.call_method(
            &intent,
            "setFlags",
            "(I)Landroid/content/Intent;",
            &[JValue::Int(FLAG_GRANT_READ_URI_PERMISSION | FLAG_ACTIVITY_NEW_TASK)],
        )?;
        put_parcelable_extra(env, &intent, "android.intent.extra.STREAM", uri)?;

        match component {
            Some(class_name) => {
                if route == WhatsAppRoute::StatusPicker {
                    put_string_extra(env, &intent, "jid", STATUS_JID)?;
                }
                let package = env.new_string(package)?;
                let class_name = env.new_string(class_name)?;
                let component = env.new_object(
                    "android/content/ComponentName",
                    "(Ljava/lang/String;Ljava/lang/String;)V",
                    &[JValue::Object(&package), JValue::Object(&class_name)],
                )?;
                env.call_method(
                    &intent,
                    "setComponent",
                    "(Landroid/content/ComponentName;)Landroid/content/Intent;",
                    &[JValue::Object(&component)],
                )?;
            }
            None => set_package(env, &intent, package)?,
        }
        Ok(Some(intent))
    }

    fn content_resolver<'local>(&self, env: &mut JNIEnv<'local>) -> JniResult<JObject<'local>> {
        Ok(env.call_method(self.context.as_obj(), "getContentResolver", "()Landroid/content/ContentResolver;", &[])?.l()?)
    }

    fn insert_pending(&self, image: &GalleryImage) -> JniResult<GalleryEntry> {
        self.with_env(|env| {
            let values = env.new_object("android/content/ContentValues", "()V", &[])?;
            put_value(env, &values, "_display_name", &image.file_name)?;
            put_value(env, &values, "mime_type", image.mime_type)?;
            put_value(env, &values, "relative_path", &format!("Pictures/{}", image.album))?;
            put_int_value(env, &values, "is_pending", 1)?;

            let collection = env.get_static_field(
                "android/provider/MediaStore$Images$Media",
                "EXTERNAL_CONTENT_URI",
                "Landroid/net/Uri;",
            )?.l()?;
            let resolver = self.content_resolver(env)?;
            let uri = env.call_method(
                &resolver,
                "insert",
                "(Landroid/net/Uri;Landroid/content/ContentValues;)Landroid/net/Uri;",
                &[JValue::Object(&collection), JValue::Object(&values)],
            )?.l()?;
            if uri.is_null() {
                return Err("Failed to create MediaStore entry".into());
            }

            let stream = env.call_method(
                &resolver,
                "openOutputStream",
                "(Landroid/net/Uri;)Ljava/io/OutputStream;",
                &[JValue::Object(&uri)],
            )?.l()?;
            if stream.is_null() {
                return Err("Failed to open MediaStore entry".into());
            }
            let bytes = env.byte_array_from_slice(&image.bytes)?;
            env.call_method(&stream, "write", "([B)V", &[JValue::Object(&bytes)])?;
            env.call_method(&stream, "close", "()V", &[])?;

            let location = env.call_method(&uri, "toString", "()Ljava/lang/String;", &[])?.l()?;
            let location: String = env.get_string(&JString::from(location))?.into();
            Ok(GalleryEntry{location, pending: true})
        })
    }

    fn clear_pending(&self, entry: &GalleryEntry) -> JniResult<bool> {
        self.with_env(|env| {
            let location = env.new_string(&entry.location)?;
            let uri = env.call_static_method(
                "android/net/Uri",
                "parse",
                "(Ljava/lang/String;)Landroid/net/Uri;",
                &[JValue::Object(&location)],
            )?.l()?;
            let values = env.new_object("android/content/ContentValues", "()V", &[])?;
            put_int_value(env, &values, "is_pending", 0)?;
            let resolver = self.content_resolver(env)?;
            let rows = env.call_method(
                &resolver,
                "update",
                "(Landroid/net/Uri;Landroid/content/ContentValues;Ljava/lang/String;[Ljava/lang/String;)I",
                &[JValue::Object(&uri), JValue::Object(&values), JValue::Object(&JObject::null()), JValue::Object(&JObject::null())],
            )?.i()?;
            Ok(rows > 0)
        })
    }

    /// Pre-Q devices write straight into the public pictures directory and ask the scanner to index it.
    fn legacy_pictures(&self) -> JniResult<FsGallery> {
        self.with_env(|env| {
            let name = env.new_string("Pictures")?;
            let dir = env.call_static_method(
                "android/os/Environment",
                "getExternalStoragePublicDirectory",
                "(Ljava/lang/String;)Ljava/io/File;",
                &[JValue::Object(&name)],
            )?.l()?;
            Ok(FsGallery::new(absolute_path(env, &dir)?))
        })
    }

    fn scan_file(&self, path: &str) -> JniResult<()> {
        self.with_env(|env| {
            let path = env.new_string(path)?;
            let file = env.new_object("java/io/File", "(Ljava/lang/String;)V", &[JValue::Object(&path)])?;
            let uri = env.call_static_method(
                "android/net/Uri",
                "fromFile",
                "(Ljava/io/File;)Landroid/net/Uri;",
                &[JValue::Object(&file)],
            )?.l()?;
            let intent = new_intent(env, "android.intent.action.MEDIA_SCANNER_SCAN_FILE")?;
            env.call_method(&intent, "setData", "(Landroid/net/Uri;)Landroid/content/Intent;", &[JValue::Object(&uri)])?;
            env.call_method(
                self.context.as_obj(),
                "sendBroadcast",
                "(Landroid/content/Intent;)V",
                &[JValue::Object(&intent)],
            )?;
            Ok(())
        })
    }
}

impl InstalledAppOracle for OsBridge {
    fn is_installed(&self, target: ShareTarget) -> bool {
        self.package_installed(target.package_name()).unwrap_or(false)
    }
}

#[async_trait]
impl NativeShareInvoker for OsBridge {
    async fn resolve_story(&self, target: ShareTarget) -> Result<bool> {
        self.with_env(|env| {
            let intent = self.story_probe(env, target)?;
            self.resolves(env, &intent)
        }).map_err(|e| ShareError::ShareFailed(e.to_string()))
    }

    async fn grant_read_access(&self, target: ShareTarget, asset: &ImageAsset) -> Result<()> {
        let path = self.shareable_path(asset)?;
        self.with_env(|env| {
            let uri = self.file_uri(env, &path)?;
            self.grant(env, target.package_name(), &uri)
        }).map_err(|e| ShareError::ShareFailed(e.to_string()))
    }

    async fn open_story(&self, share: StoryShare) -> Result<bool> {
        let intent = self.with_env(|env| {
            let intent = self.story_intent(env, &share)?;
            Ok(env.new_global_ref(intent)?)
        }).map_err(|e| ShareError::ShareFailed(e.to_string()))?;

        self.with_env(|env| self.start_activity(env, intent.as_obj()))
            .map_err(|e| ShareError::StartActivityFailed(e.to_string()))?;
        Ok(true)
    }

    async fn resolve_whatsapp(&self, route: WhatsAppRoute, file: &Path) -> Result<bool> {
        self.with_env(|env| {
            let uri = self.file_uri(env, file)?;
            match self.whatsapp_intent(env, route, &uri)? {
                Some(intent) => self.resolves(env, &intent),
                None => Ok(false),
            }
        }).map_err(|e| ShareError::ShareFailed(e.to_string()))
    }

    async fn hand_off_whatsapp(&self, route: WhatsAppRoute, file: &Path) -> Result<()> {
        self.with_env(|env| {
            let uri = self.file_uri(env, file)?;
            let intent = self.whatsapp_intent(env, route, &uri)?
                .ok_or_else(|| format!("{route:?} is not available on Android"))?;
            self.grant(env, ShareTarget::WhatsApp.package_name(), &uri)?;
            self.start_activity(env, &intent)
        }).map_err(|e| ShareError::StartActivityFailed(e.to_string()))
    }
}

#[async_trait]
impl GalleryWriter for OsBridge {
    async fn request_access(&self) -> Result<bool> {
        self.with_env(|env| {
            if Self::sdk_version(env)? >= ANDROID_Q {
                return Ok(true);
            }
            let permission = env.new_string("android.permission.WRITE_EXTERNAL_STORAGE")?;
            let state = env.call_method(
                self.context.as_obj(),
                "checkSelfPermission",
                "(Ljava/lang/String;)I",
                &[JValue::Object(&permission)],
            )?.i()?;
            Ok(state == PERMISSION_GRANTED)
        }).map_err(|e| ShareError::SaveFailed(e.to_string()))
    }

    async fn write(&self, image: GalleryImage) -> Result<GalleryEntry> {
        let sdk = self.with_env(|env| Self::sdk_version(env)).map_err(|e| ShareError::SaveFailed(e.to_string()))?;
        if sdk >= ANDROID_Q {
            return self.insert_pending(&image).map_err(|e| ShareError::SaveFailed(e.to_string()));
        }

        let gallery = self.legacy_pictures().map_err(|e| ShareError::SaveFailed(e.to_string()))?;
        let entry = gallery.write(image).await?;
        if let Err(e) = self.scan_file(&entry.location) {
            log::warn!("media scan of {} failed: {e}", entry.location);
        }
        Ok(entry)
    }

    async fn publish(&self, entry: GalleryEntry) -> Result<GalleryEntry> {
        let published = self.clear_pending(&entry).map_err(|e| ShareError::SaveFailed(e.to_string()))?;
        Ok(GalleryEntry{pending: !published, ..entry})
    }
}

fn package_manager<'local>(env: &mut JNIEnv<'local>, context: &JObject) -> JniResult<JObject<'local>> {
    Ok(env.call_method(context, "getPackageManager", "()Landroid/content/pm/PackageManager;", &[])?.l()?)
}

fn absolute_path(env: &mut JNIEnv, file: &JObject) -> JniResult<PathBuf> {
    let path = env.call_method(file, "getAbsolutePath", "()Ljava/lang/String;", &[])?.l()?;
    let path: String = env.get_string(&JString::from(path))?.into();
    Ok(PathBuf::from(path))
}

fn new_intent<'local>(env: &mut JNIEnv<'local>, action: &str) -> JniResult<JObject<'local>> {
    let action = env.new_string(action)?;
    Ok(env.new_object("android/content/Intent", "(Ljava/lang/String;)V", &[JValue::Object(&action)])?)
}

fn set_package(env: &mut JNIEnv, intent: &JObject, package: &str) -> JniResult<()> {
    let package = env.new_string(package)?;
    env.call_method(intent, "setPackage", "(Ljava/lang/String;)Landroid/content/Intent;", &[JValue::Object(&package)])?;
    Ok(())
}

fn set_type(env: &mut JNIEnv, intent: &JObject, mime: &str) -> JniResult<()> {
    let mime = env.new_string(mime)?;
    env.call_method(intent, "setType", "(Ljava/lang/String;)Landroid/content/Intent;", &[JValue::Object(&mime)])?;
    Ok(())
}

fn put_string_extra(env: &mut JNIEnv, intent: &JObject, key: &str, value: &str) -> JniResult<()> {
    let key = env.new_string(key)?;
    let value = env.new_string(value)?;
    env.call_method(
        intent,
        "putExtra",
        "(Ljava/lang/String;Ljava/lang/String;)Landroid/content/Intent;",
        &[JValue::Object(&key), JValue::Object(&value)],
    )?;
    Ok(())
}

fn put_parcelable_extra(env: &mut JNIEnv, intent: &JObject, key: &str, value: &JObject) -> JniResult<()> {
    let key = env.new_string(key)?;
    env.call_method(
        intent,
        "putExtra",
        "(Ljava/lang/String;Landroid/os/Parcelable;)Landroid/content/Intent;",
        &[JValue::Object(&key), JValue::Object(value)],
    )?;
    Ok(())
}

fn put_value(env: &mut JNIEnv, values: &JObject, key: &str, value: &str) -> JniResult<()> {
    let key = env.new_string(key)?;
    let value = env.new_string(value)?;
    env.call_method(values, "put", "(Ljava/lang/String;Ljava/lang/String;)V", &[JValue::Object(&key), JValue::Object(&value)])?;
    Ok(())
}

fn put_int_value(env: &mut JNIEnv, values: &JObject, key: &str, value: i32) -> JniResult<()> {
    let key = env.new_string(key)?;
    let boxed = env.call_static_method("java/lang/Integer", "valueOf", "(I)Ljava/lang/Integer;", &[JValue::Int(value)])?.l()?;
    env.call_method(values, "put", "(Ljava/lang/String;Ljava/lang/Integer;)V", &[JValue::Object(&key), JValue::Object(&boxed)])?;
    Ok(())
}
