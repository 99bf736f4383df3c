//! JNI entry points called by the Android app.
//!
//! Results arrive on the UI thread through the adapter exports; surface
//! callbacks arrive on the GL thread, which owns its [`FaceEngine`]. Neither
//! errors nor panics cross the boundary: both are logged and the call returns.

#![allow(non_snake_case)]

pub mod engine;

#[cfg(feature = "android")]
pub mod android;

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use jni::objects::{JFloatArray, JList, JObject, JString};
use jni::sys::jint;
use jni::JNIEnv;

use crate::error::{BridgeError, Result};
use crate::render::NativeSurface;
use crate::{Config, SharedFace};

pub use engine::{FaceEngine, GlLoader};

static SHARED: OnceLock<Arc<SharedFace>> = OnceLock::new();

thread_local! {
    static ENGINE: RefCell<Option<FaceEngine>> = const { RefCell::new(None) };
}

/// Process-wide state behind the JNI exports
pub fn shared() -> &'static Arc<SharedFace> {
    SHARED.get_or_init(|| {
        #[cfg(feature = "android")]
        android::init_logging();

        tracing::info!("{} v{} native side initialised", crate::NAME, crate::VERSION);
        SharedFace::new(Config::default())
    })
}

fn new_engine(shared: Arc<SharedFace>) -> FaceEngine {
    #[cfg(feature = "android")]
    {
        FaceEngine::with_loader(shared, android::gl_loader())
    }
    #[cfg(not(feature = "android"))]
    {
        FaceEngine::headless(shared)
    }
}

/// Run `f` with this thread's engine, creating it on first use
fn with_engine(f: impl FnOnce(&mut FaceEngine) -> Result<()>) -> Result<()> {
    ENGINE.with(|cell| {
        let mut slot = cell.borrow_mut();
        let engine = slot.get_or_insert_with(|| new_engine(Arc::clone(shared())));
        f(engine)
    })
}

/// Run a native call, logging errors and swallowing panics.
fn run_guarded(name: &str, f: impl FnOnce() -> Result<()>) {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("{} failed: {}", name, e),
        Err(payload) => {
            let e = BridgeError::Panic(panic_message(payload.as_ref()));
            tracing::error!("{} failed: {}", name, e);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn read_string_list(env: &mut JNIEnv, list: &JObject) -> Result<Vec<String>> {
    let list = JList::from_env(env, list).map_err(BridgeError::Jni)?;
    let size = list.size(env).map_err(BridgeError::Jni)?;

    let mut keys = Vec::with_capacity(size.max(0) as usize);
    for i in 0..size {
        let key = match list.get(env, i).map_err(BridgeError::Jni)? {
            Some(obj) => {
                let s = JString::from(obj);
                let key: String = env.get_string(&s).map_err(BridgeError::Jni)?.into();
                env.delete_local_ref(s).map_err(BridgeError::Jni)?;
                key
            }
            None => String::new(),
        };
        keys.push(key);
    }
    Ok(keys)
}

fn read_float_array(env: &mut JNIEnv, array: &JFloatArray) -> Result<Vec<f32>> {
    let len = env.get_array_length(array).map_err(BridgeError::Jni)?;
    let mut buf = vec![0.0f32; len.max(0) as usize];
    env.get_float_array_region(array, 0, &mut buf)
        .map_err(BridgeError::Jni)?;
    Ok(buf)
}

#[no_mangle]
pub extern "system" fn Java_com_google_mediapipe_examples_facelandmarker_MyGLRenderer_NativeSurfaceCreate(
    _env: JNIEnv,
    _this: JObject,
) {
    run_guarded("NativeSurfaceCreate", || {
        with_engine(|engine| engine.surface_created())
    });
}

#[no_mangle]
pub extern "system" fn Java_com_google_mediapipe_examples_facelandmarker_MyGLRenderer_NativeSurfaceChange(
    _env: JNIEnv,
    _this: JObject,
    width: jint,
    height: jint,
) {
    run_guarded("NativeSurfaceChange", || {
        with_engine(|engine| engine.surface_changed(width, height))
    });
}

#[no_mangle]
pub extern "system" fn Java_com_google_mediapipe_examples_facelandmarker_MyGLRenderer_NativeOnFrame(
    _env: JNIEnv,
    _this: JObject,
) {
    run_guarded("NativeOnFrame", || with_engine(|engine| engine.draw_frame()));
}

#[no_mangle]
pub extern "system" fn Java_com_google_mediapipe_examples_facelandmarker_fragment_FaceBlendshapesResultAdapter_NativeSetBlendshapeKey(
    mut env: JNIEnv,
    _this: JObject,
    keys: JObject,
) {
    run_guarded("NativeSetBlendshapeKey", || {
        let keys = read_string_list(&mut env, &keys)?;
        shared().set_keys(keys);
        Ok(())
    });
}

#[no_mangle]
pub extern "system" fn Java_com_google_mediapipe_examples_facelandmarker_fragment_FaceBlendshapesResultAdapter_NativeSetBlendshapeAndMatrixed(
    mut env: JNIEnv,
    _this: JObject,
    scores: JFloatArray,
    matrix: JFloatArray,
) {
    run_guarded("NativeSetBlendshapeAndMatrixed", || {
        let scores = read_float_array(&mut env, &scores)?;
        let matrix = read_float_array(&mut env, &matrix)?;
        shared().set_scores_and_matrix(&scores, &matrix)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CartoonHeadError, FaceError};
    use std::cell::Cell;

    #[test]
    fn test_run_guarded_swallows_errors_and_panics() {
        let ran = Cell::new(0);
        run_guarded("ok", || {
            ran.set(ran.get() + 1);
            Ok(())
        });
        run_guarded("err", || {
            ran.set(ran.get() + 1);
            Err(CartoonHeadError::Face(FaceError::ScoreCount {
                expected: 52,
                actual: 0,
            }))
        });
        run_guarded("panic", || {
            ran.set(ran.get() + 1);
            panic!("boom");
        });
        assert_eq!(ran.get(), 3);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_engine_is_per_thread() {
        with_engine(|engine| engine.surface_changed(320, 240)).unwrap();
        ENGINE.with(|cell| {
            let viewport = cell.borrow().as_ref().and_then(FaceEngine::viewport);
            assert!(viewport.is_some());
        });

        std::thread::spawn(|| {
            ENGINE.with(|cell| assert!(cell.borrow().is_none()));
        })
        .join()
        .unwrap();
    }
}
