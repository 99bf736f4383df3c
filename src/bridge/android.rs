//! Android-only glue: logcat logging, APK asset loading and the EGL loader.

use std::ffi::{c_char, c_void, CString};
use std::ptr::NonNull;

use jni::objects::JObject;
use jni::JNIEnv;

use crate::error::{BridgeError, RenderError};
use crate::face::FaceModel;

use super::{run_guarded, shared, GlLoader};

#[link(name = "EGL")]
extern "C" {
    fn eglGetProcAddress(procname: *const c_char) -> *const c_void;
    fn eglGetCurrentContext() -> *mut c_void;
}

/// Route `tracing` events (through its `log` feature) to logcat
pub fn init_logging() {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("CartoonHead"),
    );
}

/// Loader for the EGL context current on the GL thread
pub fn gl_loader() -> GlLoader {
    Box::new(|| {
        if unsafe { eglGetCurrentContext() }.is_null() {
            return Err(RenderError::Context("no EGL context is current".into()).into());
        }
        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name| eglGetProcAddress(name.as_ptr()))
        };
        Ok(gl)
    })
}

#[no_mangle]
pub extern "system" fn Java_com_google_mediapipe_examples_facelandmarker_OverlayView_NativeSetAssets(
    env: JNIEnv,
    _this: JObject,
    asset_manager: JObject,
) {
    run_guarded("NativeSetAssets", || {
        let ptr = unsafe {
            ndk_sys::AAssetManager_fromJava(env.get_raw() as *mut _, asset_manager.as_raw() as _)
        };
        let ptr = NonNull::new(ptr)
            .ok_or_else(|| BridgeError::AssetNotFound("AssetManager".to_string()))?;
        let manager = unsafe { ndk::asset::AssetManager::from_ptr(ptr) };

        let name = shared().config().face.asset_name.clone();
        let cname =
            CString::new(name.as_str()).map_err(|_| BridgeError::AssetNotFound(name.clone()))?;
        let mut asset = manager
            .open(&cname)
            .ok_or_else(|| BridgeError::AssetNotFound(name.clone()))?;

        let model = FaceModel::from_slice(asset.buffer()?)?;
        tracing::info!(
            "Loaded {} from assets ({} primitives)",
            name,
            model.primitive_count()
        );
        shared().set_model(model);
        Ok(())
    });
}
