//! Identity, geometry, and connection accessors.
//!
//! Each overridden member becomes an own getter on the live object
//! (`navigator`, `screen`, `window`, `navigator.connection`). The getter
//! closes over the profile value only; it never reads the native property.

use wasm_bindgen::prelude::*;

use veil_core::{OverrideValue, Result, Surface, VeilError};

use super::proxy_helpers;

/// The live object a surface's accessors are defined on.
pub fn target(surface: Surface) -> Result<JsValue> {
    match surface {
        Surface::Navigator => proxy_helpers::get_object(&js_sys::global(), "navigator"),
        Surface::Screen => proxy_helpers::get_object(&js_sys::global(), "screen"),
        Surface::Window => Ok(js_sys::global().into()),
        Surface::Connection => {
            let navigator = proxy_helpers::get_object(&js_sys::global(), "navigator")?;
            proxy_helpers::get_object(&navigator, "connection")
        }
        other => Err(VeilError::Internal(format!("{} has no accessors", other.as_str()))),
    }
}

pub fn to_js(value: &OverrideValue) -> JsValue {
    match value {
        OverrideValue::Text(s) => JsValue::from_str(s),
        OverrideValue::Integer(n) => JsValue::from_f64(*n as f64),
        OverrideValue::Number(n) => JsValue::from_f64(*n),
        OverrideValue::TextList(list) => proxy_helpers::frozen_string_array(list),
    }
}

pub fn apply(surface: Surface, member: &str, value: &OverrideValue) -> Result<()> {
    let target = target(surface)?;
    let value = to_js(value);
    // Frozen arrays are shared, so `navigator.languages === navigator.languages`.
    let getter = Closure::wrap(Box::new(move || -> JsValue { value.clone() }) as Box<dyn FnMut() -> JsValue>);
    proxy_helpers::patch_getter(&target, member, getter)
}
