//! FFI bindings for the behavior tracker
//!
//! C-compatible functions for driving a tracker from a host UI. Strings are
//! null-terminated UTF-8; returned strings are allocated and must be freed by
//! the caller with `bt_free_string`. Functions returning `i32` use 0 for
//! success and -1 for failure.

use chrono::Utc;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::TrackerConfig;
use crate::replay::replay_to_json;
use crate::tracker::BehaviorTracker;
use crate::types::{BehaviorState, InputEvent, ViewClass};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Borrow the tracker behind a handle, recording an error when null
unsafe fn tracker_mut<'a>(handle: *mut TrackerHandle) -> Option<&'a mut BehaviorTracker> {
    if handle.is_null() {
        set_last_error("Null tracker pointer");
        return None;
    }
    Some(&mut (*handle).tracker)
}

// ============================================================================
// Tracker lifecycle
// ============================================================================

/// Opaque handle to a BehaviorTracker
pub struct TrackerHandle {
    tracker: BehaviorTracker,
}

/// Create a tracker.
///
/// `origin_ms` is the host's current clock reading, in the same units as later
/// event timestamps. Log entries are stamped relative to it, so a host on epoch
/// milliseconds gets wall-clock times.
///
/// # Safety
/// - `config_json` must be NULL (defaults) or a valid null-terminated C string.
/// - Must be freed with `bt_tracker_free`.
/// - Returns NULL on invalid configuration; call `bt_last_error` for details.
#[no_mangle]
pub unsafe extern "C" fn bt_tracker_new(
    config_json: *const c_char,
    origin_ms: u64,
) -> *mut TrackerHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        TrackerConfig::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string");
                return ptr::null_mut();
            }
        };
        match TrackerConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let handle = Box::new(TrackerHandle {
        tracker: BehaviorTracker::new(config).starting_at(Utc::now(), origin_ms),
    });
    Box::into_raw(handle)
}

/// Tear down and free a tracker.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `bt_tracker_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn bt_tracker_free(handle: *mut TrackerHandle) {
    if !handle.is_null() {
        let mut handle = Box::from_raw(handle);
        handle.tracker.teardown();
    }
}

// ============================================================================
// Input
// ============================================================================

/// Feed one JSON-encoded input event.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `bt_tracker_new`.
/// - `event_json` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn bt_tracker_handle_event(
    handle: *mut TrackerHandle,
    event_json: *const c_char,
) -> i32 {
    clear_last_error();

    let Some(tracker) = tracker_mut(handle) else {
        return -1;
    };
    let json = match cstr_to_string(event_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid event string pointer");
            return -1;
        }
    };
    let event: InputEvent = match serde_json::from_str(&json) {
        Ok(event) => event,
        Err(e) => {
            set_last_error(&format!("Failed to parse event: {e}"));
            return -1;
        }
    };
    if let Err(e) = event.validate() {
        set_last_error(&e.to_string());
        return -1;
    }

    tracker.handle(&event);
    0
}

/// Advance the tracker clock, firing due timers.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `bt_tracker_new`.
#[no_mangle]
pub unsafe extern "C" fn bt_tracker_advance(handle: *mut TrackerHandle, ts_ms: u64) -> i32 {
    clear_last_error();

    let Some(tracker) = tracker_mut(handle) else {
        return -1;
    };
    tracker.advance_to(ts_ms);
    0
}

/// Pointer entered the item `id`.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `bt_tracker_new`.
/// - `id` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn bt_tracker_hover_start(
    handle: *mut TrackerHandle,
    id: *const c_char,
    ts_ms: u64,
) -> i32 {
    clear_last_error();

    let Some(tracker) = tracker_mut(handle) else {
        return -1;
    };
    let id = match cstr_to_string(id) {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            set_last_error("Invalid item id");
            return -1;
        }
    };
    tracker.on_hover_start(&id, ts_ms);
    0
}

/// Pointer left the hovered item.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `bt_tracker_new`.
#[no_mangle]
pub unsafe extern "C" fn bt_tracker_hover_end(handle: *mut TrackerHandle, ts_ms: u64) -> i32 {
    clear_last_error();

    let Some(tracker) = tracker_mut(handle) else {
        return -1;
    };
    tracker.on_hover_end(ts_ms);
    0
}

// ============================================================================
// Output
// ============================================================================

#[derive(Serialize)]
struct StateSnapshot {
    state: BehaviorState,
    view_classes: BTreeSet<ViewClass>,
}

/// Current state and view classes as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `bt_tracker_new`.
/// - Returns a newly allocated string that must be freed with `bt_free_string`.
/// - Returns NULL on error; call `bt_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bt_tracker_state_json(handle: *mut TrackerHandle) -> *mut c_char {
    clear_last_error();

    let Some(tracker) = tracker_mut(handle) else {
        return ptr::null_mut();
    };
    let snapshot = StateSnapshot {
        state: tracker.state(),
        view_classes: tracker.view_classes(),
    };
    match serde_json::to_string(&snapshot) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Log entries recorded by this tracker, as a JSON array.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `bt_tracker_new`.
/// - Returns a newly allocated string that must be freed with `bt_free_string`.
/// - Returns NULL on error; call `bt_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bt_tracker_log_json(handle: *mut TrackerHandle) -> *mut c_char {
    clear_last_error();

    let Some(tracker) = tracker_mut(handle) else {
        return ptr::null_mut();
    };
    match serde_json::to_string(tracker.recorded()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Replay an event script (JSON array or NDJSON) with default settings.
///
/// # Safety
/// - `script` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `bt_free_string`.
/// - Returns NULL on error; call `bt_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bt_replay(script: *const c_char) -> *mut c_char {
    clear_last_error();

    let script = match cstr_to_string(script) {
        Some(s) => s,
        None => {
            set_last_error("Invalid script string pointer");
            return ptr::null_mut();
        }
    };

    match replay_to_json(&script) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory, errors, version
// ============================================================================

/// Free a string returned by a `bt_` function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a `bt_` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn bt_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next `bt_` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn bt_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn bt_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
