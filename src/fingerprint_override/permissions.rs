//! Fixed permission states.

use std::collections::BTreeMap;

use js_sys::{Object, Promise, Reflect};
use wasm_bindgen::prelude::*;

use veil_core::registry::member;
use veil_core::Result;

use super::proxy_helpers;

pub fn apply(states: BTreeMap<String, String>) -> Result<()> {
    let navigator = proxy_helpers::get_global("navigator")?;
    let permissions = proxy_helpers::get_object(&navigator, "permissions")?;
    let original = proxy_helpers::get_object(&permissions, member::QUERY)?;

    let apply_trap = Closure::wrap(Box::new(move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
        let descriptor = proxy_helpers::argument(&args, 0);
        let name = Reflect::get(&descriptor, &JsValue::from_str("name"))
            .ok()
            .and_then(|n| n.as_string());
        match name.and_then(|n| states.get(&n).map(|state| (n, state))) {
            Some((name, state)) => {
                let status = Object::new();
                Reflect::set(&status, &JsValue::from_str("name"), &JsValue::from_str(&name))?;
                Reflect::set(&status, &JsValue::from_str("state"), &JsValue::from_str(state))?;
                Reflect::set(&status, &JsValue::from_str("onchange"), &JsValue::NULL)?;
                Ok(Promise::resolve(&status).into())
            }
            // Unconfigured names (and malformed descriptors) get the native answer.
            None => proxy_helpers::call_function(&original, &this_arg, &args),
        }
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(&permissions, member::QUERY, apply_trap)?;
    Ok(())
}
