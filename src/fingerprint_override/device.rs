//! Battery state.
//!
//! `navigator.getBattery()` still resolves through the native call; the
//! manager it yields gets own `level`/`charging` getters before the page
//! sees it.

use js_sys::Array;
use wasm_bindgen::prelude::*;

use veil_core::registry::member;
use veil_core::{Result, VeilError};

use super::proxy_helpers;

pub fn apply_battery(level: Option<f64>, charging: Option<bool>) -> Result<()> {
    let navigator = proxy_helpers::get_global("navigator")?;
    let original = proxy_helpers::get_object(&navigator, member::GET_BATTERY)?;

    let apply_trap = Closure::wrap(Box::new(move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
        let promise = proxy_helpers::call_function(&original, &this_arg, &args)?;
        let rewrite = Closure::once_into_js(move |manager: JsValue| -> JsValue {
            if let Err(err) = rewrite_manager(&manager, level, charging) {
                log::warn!("battery manager left native: {}", err);
            }
            manager
        });
        proxy_helpers::call_method(&promise, "then", &Array::of1(&rewrite))
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(&navigator, member::GET_BATTERY, apply_trap)?;
    Ok(())
}

fn rewrite_manager(manager: &JsValue, level: Option<f64>, charging: Option<bool>) -> Result<()> {
    let mut fields: Vec<(&str, JsValue)> = Vec::new();
    if let Some(level) = level {
        fields.push(("level", JsValue::from_f64(level)));
    }
    if let Some(charging) = charging {
        fields.push(("charging", JsValue::from_bool(charging)));
    }
    for (name, value) in fields {
        let getter = Closure::wrap(Box::new(move || -> JsValue { value.clone() }) as Box<dyn FnMut() -> JsValue>);
        match proxy_helpers::patch_getter(manager, name, getter) {
            // The same manager comes back on every call.
            Ok(()) | Err(VeilError::AlreadyWrapped(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
