//! Proxy and Reflect utility wrappers for API interception.
//!
//! Every wrapper installed through these helpers is a `Proxy` over the
//! native function or a WASM closure, so `Function.prototype.toString()`
//! keeps answering `"function ... { [native code] }"`.
//!
//! Wrappers are recorded in a `WeakSet` owned by this module instance; a
//! second install from the same instance finds them there and skips instead
//! of nesting. A second instance cannot see that set, so a property it
//! cannot redefine because an earlier install locked it is reported the
//! same way.

use js_sys::{Array, Function, Object, Reflect, WeakSet};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use veil_core::{Result, VeilError};

use crate::error::binding;

pub type ApplyTrap = Closure<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>;

thread_local! {
    static INSTALLED: WeakSet = WeakSet::new();
}

/// Remember a wrapper (or a wrapped instance) as ours.
pub fn mark(value: &JsValue) {
    if let Some(obj) = value.dyn_ref::<Object>() {
        INSTALLED.with(|set| {
            set.add(obj);
        });
    }
}

pub fn is_marked(value: &JsValue) -> bool {
    value
        .dyn_ref::<Object>()
        .map(|obj| INSTALLED.with(|set| set.has(obj)))
        .unwrap_or(false)
}

/// Get a global constructor's prototype (e.g., "HTMLCanvasElement" → HTMLCanvasElement.prototype).
pub fn get_prototype(constructor_name: &str) -> Result<JsValue> {
    let ctor = get_global(constructor_name)?;
    if ctor.is_undefined() || ctor.is_null() {
        return Err(VeilError::SurfaceUnavailable(constructor_name.to_string()));
    }
    Reflect::get(&ctor, &JsValue::from_str("prototype")).map_err(|e| binding(constructor_name, e))
}

/// Get a property from the global scope.
pub fn get_global(prop: &str) -> Result<JsValue> {
    Reflect::get(&js_sys::global(), &JsValue::from_str(prop)).map_err(|e| binding(prop, e))
}

/// Get an object-valued property, treating `undefined`/`null` as a missing surface.
pub fn get_object(target: &JsValue, prop: &str) -> Result<JsValue> {
    let value = Reflect::get(target, &JsValue::from_str(prop)).map_err(|e| binding(prop, e))?;
    if value.is_undefined() || value.is_null() {
        return Err(VeilError::SurfaceUnavailable(prop.to_string()));
    }
    Ok(value)
}

fn define(obj: &JsValue, prop: &str, descriptor: &Object) -> Result<()> {
    let target: &Object = obj
        .dyn_ref()
        .ok_or_else(|| VeilError::SurfaceUnavailable(prop.to_string()))?;
    // Reflect.defineProperty reports failure as `false` instead of throwing.
    let defined = Reflect::define_property(target, &JsValue::from_str(prop), descriptor)
        .map_err(|e| binding(prop, e))?;
    if !defined {
        if is_locked(target, prop) {
            return Err(VeilError::AlreadyWrapped(prop.to_string()));
        }
        return Err(VeilError::Binding(format!("defineProperty refused {}", prop)));
    }
    Ok(())
}

/// An own, non-configurable property: what every install leaves behind.
fn is_locked(target: &Object, prop: &str) -> bool {
    let descriptor = Object::get_own_property_descriptor(target, &JsValue::from_str(prop));
    !descriptor.is_undefined()
        && Reflect::get(&descriptor, &JsValue::from_str("configurable"))
            .map(|c| c.is_falsy())
            .unwrap_or(false)
}

fn set_fields(descriptor: &Object, fields: &[(&str, &JsValue)]) -> Result<()> {
    for (name, value) in fields {
        Reflect::set(descriptor, &JsValue::from_str(name), value).map_err(|e| binding(name, e))?;
    }
    Ok(())
}

/// Install a read-only getter: non-configurable, enumerable.
/// The getter closure is a WASM function → native toString().
pub fn patch_getter(obj: &JsValue, prop_name: &str, getter: Closure<dyn FnMut() -> JsValue>) -> Result<()> {
    if let Some(existing) = own_getter(obj, prop_name) {
        if is_marked(&existing) {
            return Err(VeilError::AlreadyWrapped(prop_name.to_string()));
        }
    }

    let descriptor = Object::new();
    set_fields(
        &descriptor,
        &[
            ("get", getter.as_ref()),
            ("configurable", &JsValue::FALSE),
            ("enumerable", &JsValue::TRUE),
        ],
    )?;
    define(obj, prop_name, &descriptor)?;

    mark(getter.as_ref());
    getter.forget();
    Ok(())
}

fn own_getter(obj: &JsValue, prop_name: &str) -> Option<JsValue> {
    let target: &Object = obj.dyn_ref()?;
    let descriptor = Object::get_own_property_descriptor(target, &JsValue::from_str(prop_name));
    if descriptor.is_undefined() {
        return None;
    }
    Reflect::get(&descriptor, &JsValue::from_str("get")).ok()
}

/// Replace a method with a `Proxy` over the original.
///
/// The proxy is defined non-configurable and enumerable. Returns the
/// original function.
pub fn wrap_method(obj: &JsValue, method_name: &str, apply_trap: ApplyTrap) -> Result<JsValue> {
    let original = get_object(obj, method_name)?;
    if is_marked(&original) {
        return Err(VeilError::AlreadyWrapped(method_name.to_string()));
    }
    let proxy = proxy_function_with_apply(&original, apply_trap).map_err(|e| binding(method_name, e))?;

    let descriptor = Object::new();
    set_fields(
        &descriptor,
        &[
            ("value", &proxy),
            ("writable", &JsValue::FALSE),
            ("configurable", &JsValue::FALSE),
            ("enumerable", &JsValue::TRUE),
        ],
    )?;
    define(obj, method_name, &descriptor)?;

    mark(&proxy);
    Ok(original)
}

/// Create a Proxy around a target function with an `apply` trap.
/// The trap receives (target, thisArg, argumentsList).
pub fn proxy_function_with_apply(target: &JsValue, apply_trap: ApplyTrap) -> std::result::Result<JsValue, JsValue> {
    let handler = Object::new();
    Reflect::set(&handler, &JsValue::from_str("apply"), apply_trap.as_ref())?;
    apply_trap.forget();

    let proxy_ctor: Function = Reflect::get(&js_sys::global(), &JsValue::from_str("Proxy"))?
        .dyn_into()
        .map_err(|_| JsValue::from_str("Proxy not found"))?;
    let args = Array::of2(target, &handler);
    Reflect::construct(&proxy_ctor, &args)
}

/// Call a JS function with arguments via Reflect.apply.
pub fn call_function(func: &JsValue, this_arg: &JsValue, args: &JsValue) -> std::result::Result<JsValue, JsValue> {
    let func: &Function = func.unchecked_ref();
    Reflect::apply(func, this_arg, args.unchecked_ref())
}

/// Call a method looked up on `target` by name.
pub fn call_method(target: &JsValue, name: &str, args: &Array) -> std::result::Result<JsValue, JsValue> {
    let method: Function = Reflect::get(target, &JsValue::from_str(name))?.dyn_into()?;
    Reflect::apply(&method, target, args)
}

/// Argument `index` of a trap's argument list.
pub fn argument(args: &JsValue, index: u32) -> JsValue {
    let args: &Array = args.unchecked_ref();
    args.get(index)
}

/// Create a frozen JS array from strings.
pub fn frozen_string_array(items: &[String]) -> JsValue {
    let arr = Array::new();
    for item in items {
        arr.push(&JsValue::from_str(item));
    }
    Object::freeze(&arr).into()
}
