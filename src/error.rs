//! Conversions between JS exceptions and engine errors.

use wasm_bindgen::JsValue;

use veil_core::{ErrorInfo, VeilError};

/// Wrap a thrown JS value as a binding failure on `context`.
pub fn binding(context: &str, err: JsValue) -> VeilError {
    let detail = err
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(&err, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", err));
    VeilError::Binding(format!("{}: {}", context, detail))
}

/// Error information for JavaScript consumption
pub fn to_js(err: &VeilError) -> JsValue {
    serde_wasm_bindgen::to_value(&ErrorInfo::from(err)).unwrap_or_else(|_| JsValue::from_str(&err.to_string()))
}
