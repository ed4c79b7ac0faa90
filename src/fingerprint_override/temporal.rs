//! Time zone consistency.
//!
//! `Date.prototype.getTimezoneOffset` and
//! `Intl.DateTimeFormat.prototype.resolvedOptions` are both fed from the
//! one [`TemporalOverride`] the registry resolved.

use wasm_bindgen::prelude::*;

use js_sys::Reflect;
use veil_core::registry::member;
use veil_core::Result;

use super::proxy_helpers;

pub fn apply_offset(offset_minutes: i32) -> Result<()> {
    let date_proto = proxy_helpers::get_prototype("Date")?;
    let offset = JsValue::from_f64(offset_minutes as f64);

    let apply_trap = Closure::wrap(Box::new(move |_target: JsValue, _this: JsValue, _args: JsValue| -> std::result::Result<JsValue, JsValue> {
        Ok(offset.clone())
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(&date_proto, member::GET_TIMEZONE_OFFSET, apply_trap)?;
    Ok(())
}

pub fn apply_zone(zone: &str) -> Result<()> {
    let intl = proxy_helpers::get_global("Intl")?;
    let dtf = proxy_helpers::get_object(&intl, "DateTimeFormat")?;
    let dtf_proto = proxy_helpers::get_object(&dtf, "prototype")?;
    let zone = JsValue::from_str(zone);

    let original = proxy_helpers::get_object(&dtf_proto, member::RESOLVED_OPTIONS)?;
    let apply_trap = Closure::wrap(Box::new(move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
        let result = proxy_helpers::call_function(&original, &this_arg, &args)?;
        // Only the zone field changes; locale, calendar, hour cycle stay native.
        Reflect::set(&result, &JsValue::from_str("timeZone"), &zone)?;
        Ok(result)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(&dtf_proto, member::RESOLVED_OPTIONS, apply_trap)?;
    Ok(())
}
