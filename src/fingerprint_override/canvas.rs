//! Canvas 2D noise.
//!
//! `getImageData` results are noised on the way out. `toDataURL` and
//! `toBlob` first noise the canvas itself (native read, perturb, native
//! write) and then serialize, so what is rendered afterwards carries the
//! same noise.

use std::cell::RefCell;

use js_sys::{Array, Uint8ClampedArray};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use veil_core::registry::member;
use veil_core::{Result, SharedNoise};

use super::proxy_helpers;

/// The unwrapped 2D pixel accessors.
#[derive(Clone)]
struct NativePixels {
    get_image_data: JsValue,
    put_image_data: JsValue,
}

thread_local! {
    static NATIVE: RefCell<Option<NativePixels>> = RefCell::new(None);
}

/// Record the native pixel accessors before anything wraps them.
pub fn capture_natives() {
    let Ok(proto) = proxy_helpers::get_prototype("CanvasRenderingContext2D") else {
        return;
    };
    let read = |name| js_sys::Reflect::get(&proto, &JsValue::from_str(name)).ok();
    if let (Some(get_image_data), Some(put_image_data)) = (read("getImageData"), read("putImageData")) {
        if proxy_helpers::is_marked(&get_image_data) {
            return;
        }
        NATIVE.with(|n| {
            n.borrow_mut().get_or_insert(NativePixels {
                get_image_data,
                put_image_data,
            });
        });
    }
}

fn natives() -> Option<NativePixels> {
    NATIVE.with(|n| n.borrow().clone())
}

fn noise_image_data(image: &JsValue, noise: &SharedNoise, magnitude: f64) -> std::result::Result<(), JsValue> {
    let data: Uint8ClampedArray = js_sys::Reflect::get(image, &JsValue::from_str("data"))?.dyn_into()?;
    // Copy to WASM memory, perturb, copy back
    let mut buffer = data.to_vec();
    noise.borrow_mut().perturb_rgb(&mut buffer, magnitude);
    data.copy_from(&buffer);
    Ok(())
}

pub fn apply_pixel_reads(magnitude: f64, noise: SharedNoise) -> Result<()> {
    let proto = proxy_helpers::get_prototype("CanvasRenderingContext2D")?;
    let original = proxy_helpers::get_object(&proto, member::GET_IMAGE_DATA)?;

    let apply_trap = Closure::wrap(Box::new(move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
        let result = proxy_helpers::call_function(&original, &this_arg, &args)?;
        noise_image_data(&result, &noise, magnitude)?;
        Ok(result)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(&proto, member::GET_IMAGE_DATA, apply_trap)?;
    Ok(())
}

/// Noise the visible bitmap of `canvas` once, through the native accessors.
fn noise_bitmap(canvas: &JsValue, noise: &SharedNoise, magnitude: f64) -> std::result::Result<(), JsValue> {
    let Some(native) = natives() else {
        return Ok(());
    };
    let ctx = proxy_helpers::call_method(canvas, "getContext", &Array::of1(&JsValue::from_str("2d")))?;
    // WebGL canvases have no 2D context and serialize untouched.
    if ctx.is_null() || ctx.is_undefined() {
        return Ok(());
    }
    let dimension = |name| {
        js_sys::Reflect::get(canvas, &JsValue::from_str(name))
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    };
    let (width, height) = (dimension("width"), dimension("height"));
    if width <= 0.0 || height <= 0.0 {
        return Ok(());
    }

    let zero = JsValue::from_f64(0.0);
    let read_args = Array::of4(&zero, &zero, &JsValue::from_f64(width), &JsValue::from_f64(height));
    let image = proxy_helpers::call_function(&native.get_image_data, &ctx, &read_args)?;
    noise_image_data(&image, noise, magnitude)?;
    proxy_helpers::call_function(&native.put_image_data, &ctx, &Array::of3(&image, &zero, &zero))?;
    Ok(())
}

/// Wrap one serialization entry point (`toDataURL` or `toBlob`).
pub fn apply_snapshot(method: &'static str, magnitude: f64, noise: SharedNoise) -> Result<()> {
    let proto = proxy_helpers::get_prototype("HTMLCanvasElement")?;
    let original = proxy_helpers::get_object(&proto, method)?;

    let apply_trap = Closure::wrap(Box::new(move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
        // A tainted or detached canvas still serializes; it just goes un-noised.
        if let Err(err) = noise_bitmap(&this_arg, &noise, magnitude) {
            log::debug!("{} left un-noised: {:?}", method, err);
        }
        proxy_helpers::call_function(&original, &this_arg, &args)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(&proto, method, apply_trap)?;
    Ok(())
}
