// src/bridge/ffi.rs
//
// C ABI for mobile hosts that link the static library. The host keeps an
// opaque session handle, passes method calls as JSON and reports permission
// dialog outcomes back by request code.
//
// Strings returned by this module must be released with
// `eye_tracking_string_free`.
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr, CString};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

use crate::bridge::channel::MethodChannel;
use crate::channels::ChannelKind;
use crate::permission::{HostPermissionProvider, PermissionStatus};
use crate::platform::{Platform, PlatformInfo};
use crate::settings;
use crate::tracking::controller::TrackingController;

/// Shows the OS permission dialog for `request_code`; false if no UI is available.
pub type PermissionPromptCallback = extern "C" fn(request_code: i32) -> bool;
/// Current camera permission as a `PermissionStatus` code (0..=3).
pub type PermissionStatusCallback = extern "C" fn() -> i32;
/// Receives a JSON payload. The pointer is only valid for the duration of the call.
pub type PayloadCallback = extern "C" fn(user_data: *mut c_void, payload: *const c_char);

struct FfiSession {
    controller: Arc<TrackingController>,
    channel: MethodChannel,
    permissions: Arc<HostPermissionProvider>,
    listeners: HashMap<ChannelKind, JoinHandle<()>>,
}

// Host-owned context pointer handed back untouched on every callback.
#[derive(Clone, Copy)]
struct UserData(*mut c_void);

unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

lazy_static::lazy_static! {
    static ref RUNTIME: Option<Runtime> = match tokio::runtime::Builder::new_multi_thread()
        .thread_name("eye-tracking")
        .enable_all()
        .build()
    {
        Ok(runtime) => Some(runtime),
        Err(e) => {
            log::error!("Failed to start eye tracking runtime: {}", e);
            None
        }
    };
    static ref SESSIONS: Mutex<HashMap<u64, FfiSession>> = Mutex::new(HashMap::new());
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

fn into_c_string(value: String) -> *mut c_char {
    // interior NULs cannot cross the boundary
    CString::new(value.replace('\0', ""))
        .map(CString::into_raw)
        .unwrap_or(std::ptr::null_mut())
}

fn with_session<T>(handle: u64, f: impl FnOnce(&mut FfiSession) -> T) -> Option<T> {
    let mut sessions = SESSIONS.lock().unwrap_or_else(|e| e.into_inner());
    sessions.get_mut(&handle).map(f)
}

/// Creates a session and returns its handle, or 0 on failure.
///
/// `has_front_camera` is the host's probe of the device (on iOS,
/// `isCameraDeviceAvailable(.front)`) and is reported by `getCapabilities`.
///
/// # Safety
/// `platform` and `os_version` must be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn eye_tracking_session_create(
    platform: *const c_char,
    os_version: *const c_char,
    has_front_camera: bool,
    prompt: PermissionPromptCallback,
    status: PermissionStatusCallback,
) -> u64 {
    if RUNTIME.is_none() {
        return 0;
    }

    let platform = read_str(platform).map(Platform::from_tag).unwrap_or_else(Platform::current);
    let os_version = read_str(os_version).unwrap_or("unknown");
    let config = settings::load_or_default();

    let permissions = Arc::new(HostPermissionProvider::new(
        Arc::new(move |code| prompt(code)),
        Arc::new(move || PermissionStatus::from_code(status())),
        config.permission_timeout(),
    ));
    let controller = Arc::new(
        TrackingController::new(config, permissions.clone())
            .with_platform(PlatformInfo::new(platform, os_version).with_front_camera(has_front_camera)),
    );

    let handle = NEXT_HANDLE.fetch_add(1, Ordering::SeqCst);
    let session = FfiSession {
        channel: MethodChannel::new(controller.clone()),
        controller,
        permissions,
        listeners: HashMap::new(),
    };
    SESSIONS.lock().unwrap_or_else(|e| e.into_inner()).insert(handle, session);

    log::info!("✅ Eye tracking session handle {} created", handle);
    handle
}

/// Runs a JSON method call to completion and returns the JSON response.
///
/// Blocks the calling thread. Hosts that deliver permission results on the
/// same thread they call from must use `eye_tracking_invoke_async` for
/// `requestCameraPermission`. Calls made from inside an async runtime,
/// including from a payload callback, are refused with `reentrant_call`.
///
/// # Safety
/// `call_json` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn eye_tracking_invoke(handle: u64, call_json: *const c_char) -> *mut c_char {
    let Some(runtime) = RUNTIME.as_ref() else {
        return std::ptr::null_mut();
    };
    let Some(channel) = with_session(handle, |s| s.channel.clone()) else {
        return into_c_string(format!(
            r#"{{"status":"error","code":"unknown_session","message":"No session with handle {}"}}"#,
            handle
        ));
    };
    if Handle::try_current().is_ok() {
        log::warn!("Blocking invoke on handle {} from inside a runtime refused", handle);
        return into_c_string(
            r#"{"status":"error","code":"reentrant_call","message":"eye_tracking_invoke cannot block inside an async runtime; use eye_tracking_invoke_async"}"#
                .to_string(),
        );
    }
    let call = read_str(call_json).unwrap_or("").to_string();

    into_c_string(runtime.block_on(async move { channel.invoke_json(&call).await }))
}

/// Runs a JSON method call on the session runtime and hands the JSON response
/// to `callback`. Returns false if the handle is unknown.
///
/// # Safety
/// `call_json` must be null or a valid NUL-terminated string. `user_data` is
/// passed back untouched and must stay valid until the callback fires.
#[no_mangle]
pub unsafe extern "C" fn eye_tracking_invoke_async(
    handle: u64,
    call_json: *const c_char,
    callback: PayloadCallback,
    user_data: *mut c_void,
) -> bool {
    let Some(runtime) = RUNTIME.as_ref() else {
        return false;
    };
    let Some(channel) = with_session(handle, |s| s.channel.clone()) else {
        return false;
    };
    let call = read_str(call_json).unwrap_or("").to_string();
    let user_data = UserData(user_data);

    runtime.spawn(async move {
        let response = channel.invoke_json(&call).await;
        if let Ok(payload) = CString::new(response.replace('\0', "")) {
            let context = user_data;
            callback(context.0, payload.as_ptr());
        }
    });
    true
}

/// Delivers the outcome of the OS permission dialog.
#[no_mangle]
pub extern "C" fn eye_tracking_permission_result(handle: u64, request_code: i32, granted: bool) -> bool {
    let Some(permissions) = with_session(handle, |s| s.permissions.clone()) else {
        return false;
    };
    permissions.handle_result(request_code, granted)
}

/// Subscribes `callback` to an event channel, replacing any previous listener.
///
/// # Safety
/// `channel` must be null or a valid NUL-terminated string. `user_data` must
/// stay valid until the channel is cancelled or the session destroyed.
#[no_mangle]
pub unsafe extern "C" fn eye_tracking_listen(
    handle: u64,
    channel: *const c_char,
    callback: PayloadCallback,
    user_data: *mut c_void,
) -> bool {
    let Some(runtime) = RUNTIME.as_ref() else {
        return false;
    };
    let Some(kind) = read_str(channel).and_then(|name| name.parse::<ChannelKind>().ok()) else {
        return false;
    };
    let user_data = UserData(user_data);

    with_session(handle, |session| {
        let _guard = runtime.enter();
        let task = session.controller.channels().forward(kind, move |payload| {
            if let Ok(payload) = CString::new(payload.to_string()) {
                let context = user_data;
                callback(context.0, payload.as_ptr());
            }
        });
        if let Some(previous) = session.listeners.insert(kind, task) {
            previous.abort();
        }
    })
    .is_some()
}

/// Stops delivery on an event channel. Returns true if a listener was removed.
///
/// # Safety
/// `channel` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn eye_tracking_cancel(handle: u64, channel: *const c_char) -> bool {
    let Some(kind) = read_str(channel).and_then(|name| name.parse::<ChannelKind>().ok()) else {
        return false;
    };

    with_session(handle, |session| {
        session.listeners.remove(&kind);
        session.controller.channels().cancel(kind)
    })
    .unwrap_or(false)
}

/// Disposes the session and releases its handle.
///
/// From inside an async runtime the dispose runs in the background.
#[no_mangle]
pub extern "C" fn eye_tracking_session_destroy(handle: u64) -> bool {
    let session = SESSIONS.lock().unwrap_or_else(|e| e.into_inner()).remove(&handle);
    let Some(session) = session else {
        return false;
    };

    if let Some(runtime) = RUNTIME.as_ref() {
        let controller = session.controller.clone();
        let dispose = async move {
            if let Err(e) = controller.dispose().await {
                log::warn!("Dispose failed for handle {}: {}", handle, e);
            }
        };
        if Handle::try_current().is_ok() {
            runtime.spawn(dispose);
        } else {
            runtime.block_on(dispose);
        }
    }
    for (_, task) in session.listeners {
        task.abort();
    }
    log::info!("🔄 Eye tracking session handle {} destroyed", handle);
    true
}

/// Releases a string returned by this module.
///
/// # Safety
/// `ptr` must be null or a pointer previously returned by this module.
#[no_mangle]
pub unsafe extern "C" fn eye_tracking_string_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::atomic::AtomicI32;
    use std::time::Duration;

    static CAMERA_STATUS: AtomicI32 = AtomicI32::new(0);

    extern "C" fn show_dialog(_request_code: i32) -> bool {
        true
    }

    extern "C" fn camera_status() -> i32 {
        CAMERA_STATUS.load(Ordering::SeqCst)
    }

    extern "C" fn ignore_payload(_user_data: *mut c_void, _payload: *const c_char) {}

    static REPLIES: Mutex<Vec<String>> = Mutex::new(Vec::new());

    extern "C" fn collect_reply(_user_data: *mut c_void, payload: *const c_char) {
        let reply = unsafe { CStr::from_ptr(payload) }.to_string_lossy().into_owned();
        REPLIES.lock().unwrap().push(reply);
    }

    fn invoke(handle: u64, call: &str) -> Value {
        let call = CString::new(call).unwrap();
        unsafe {
            let raw = eye_tracking_invoke(handle, call.as_ptr());
            assert!(!raw.is_null());
            let reply = CStr::from_ptr(raw).to_str().unwrap().to_string();
            eye_tracking_string_free(raw);
            serde_json::from_str(&reply).unwrap()
        }
    }

    fn create(platform: &str) -> u64 {
        create_with_front_camera(platform, true)
    }

    fn create_with_front_camera(platform: &str, has_front_camera: bool) -> u64 {
        let platform = CString::new(platform).unwrap();
        let version = CString::new("14").unwrap();
        let handle = unsafe {
            eye_tracking_session_create(
                platform.as_ptr(),
                version.as_ptr(),
                has_front_camera,
                show_dialog,
                camera_status,
            )
        };
        assert_ne!(handle, 0);
        handle
    }

    #[test]
    fn session_round_trip_over_the_c_abi() {
        let handle = create("android");

        assert_eq!(invoke(handle, r#"{"method":"getPlatformVersion"}"#)["result"], "Android 14");
        assert_eq!(invoke(handle, r#"{"method":"initialize"}"#)["result"], true);
        assert_eq!(invoke(handle, r#"{"method":"getState"}"#)["result"], "ready");
        assert_eq!(invoke(handle, r#"{"method":"getCapabilities"}"#)["result"]["platform"], "android");
        assert_eq!(invoke(handle, r#"{"method":"vibrate"}"#)["status"], "not_implemented");

        assert!(eye_tracking_session_destroy(handle));
        assert!(!eye_tracking_session_destroy(handle));
        assert_eq!(invoke(handle, r#"{"method":"getState"}"#)["code"], "unknown_session");
    }

    #[test]
    fn permission_result_resolves_blocked_request() {
        let handle = create("android");

        let responder = std::thread::spawn(move || {
            // keep answering until the request has registered
            for _ in 0..200 {
                std::thread::sleep(Duration::from_millis(10));
                let pending = with_session(handle, |s| s.permissions.pending_requests()).unwrap_or(0);
                if pending > 0 {
                    return eye_tracking_permission_result(handle, 100, true);
                }
            }
            false
        });

        let reply = invoke(handle, r#"{"method":"requestCameraPermission"}"#);
        assert!(responder.join().unwrap());
        assert_eq!(reply["result"], true);

        assert!(!eye_tracking_permission_result(handle, 7, true));
        assert!(eye_tracking_session_destroy(handle));
    }

    #[test]
    fn async_invoke_answers_through_the_callback() {
        let handle = create("android");
        let call = CString::new(r#"{"method":"getCalibrationAccuracy"}"#).unwrap();

        let queued = unsafe {
            eye_tracking_invoke_async(handle, call.as_ptr(), collect_reply, std::ptr::null_mut())
        };
        assert!(queued);

        let mut reply = None;
        for _ in 0..200 {
            if let Some(found) = REPLIES.lock().unwrap().iter().find(|r| r.contains("0.85")).cloned() {
                reply = Some(found);
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let reply: Value = serde_json::from_str(&reply.expect("no reply delivered")).unwrap();
        assert_eq!(reply["result"], 0.85);

        assert!(!unsafe { eye_tracking_invoke_async(0, call.as_ptr(), collect_reply, std::ptr::null_mut()) });
        assert!(eye_tracking_session_destroy(handle));
    }

    #[test]
    fn listen_and_cancel_by_channel_name() {
        let handle = create("ios");
        let gaze = CString::new("eye_tracking/gaze").unwrap();
        let bogus = CString::new("pupil").unwrap();

        unsafe {
            assert!(eye_tracking_listen(handle, gaze.as_ptr(), ignore_payload, std::ptr::null_mut()));
            assert!(!eye_tracking_listen(handle, bogus.as_ptr(), ignore_payload, std::ptr::null_mut()));
            assert!(eye_tracking_cancel(handle, gaze.as_ptr()));
            assert!(!eye_tracking_cancel(handle, gaze.as_ptr()));
        }
        assert!(eye_tracking_session_destroy(handle));
    }

    #[test]
    fn front_camera_probe_reaches_capabilities() {
        let handle = create_with_front_camera("ios", false);

        let caps = invoke(handle, r#"{"method":"getCapabilities"}"#)["result"].clone();
        assert_eq!(caps["platform"], "ios");
        assert_eq!(caps["hasFrontCamera"], false);
        assert!(eye_tracking_session_destroy(handle));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blocking_calls_inside_a_runtime_do_not_panic() {
        let handle = create("android");

        let reply = invoke(handle, r#"{"method":"getState"}"#);
        assert_eq!(reply["status"], "error");
        assert_eq!(reply["code"], "reentrant_call");

        assert!(eye_tracking_session_destroy(handle));
        assert_eq!(invoke(handle, r#"{"method":"getState"}"#)["code"], "unknown_session");
    }
}
