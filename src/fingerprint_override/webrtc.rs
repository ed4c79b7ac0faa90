//! In-page WebRTC entry point removal.
//!
//! The same entry points the extension's document-start script removes;
//! used when the module itself runs first in the page.

use js_sys::Reflect;
use wasm_bindgen::prelude::*;

use veil_core::webrtc::{MEDIA_DEVICES_ENTRY_POINT, NAVIGATOR_ENTRY_POINTS, WINDOW_ENTRY_POINTS};

/// Set every peer-connection and capture entry point to `undefined`.
/// Returns the names that were present.
pub fn suppress_globals() -> Vec<String> {
    let global: JsValue = js_sys::global().into();
    let mut removed = Vec::new();

    for name in WINDOW_ENTRY_POINTS {
        if clear(&global, name) {
            removed.push(name.to_string());
        }
    }

    let Ok(navigator) = Reflect::get(&global, &JsValue::from_str("navigator")) else {
        return removed;
    };
    for name in NAVIGATOR_ENTRY_POINTS {
        if clear(&navigator, name) {
            removed.push(format!("navigator.{}", name));
        }
    }
    if let Ok(media) = Reflect::get(&navigator, &JsValue::from_str("mediaDevices")) {
        if media.is_object() && clear(&media, MEDIA_DEVICES_ENTRY_POINT) {
            removed.push(format!("navigator.mediaDevices.{}", MEDIA_DEVICES_ENTRY_POINT));
        }
    }
    removed
}

fn clear(target: &JsValue, name: &str) -> bool {
    let key = JsValue::from_str(name);
    let present = Reflect::get(target, &key)
        .map(|v| !v.is_undefined() && !v.is_null())
        .unwrap_or(false);
    if !present {
        return false;
    }
    match Reflect::set(target, &key, &JsValue::UNDEFINED) {
        Ok(true) => true,
        _ => {
            log::warn!("could not remove {}", name);
            false
        }
    }
}
