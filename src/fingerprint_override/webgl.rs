//! WebGL identity spoofing.
//!
//! `HTMLCanvasElement.prototype.getContext` is wrapped; every WebGL context
//! it hands out gets own `getParameter` (and, with pixel noise, `readPixels`)
//! wrappers the first time it is seen.

use js_sys::Uint8Array;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use veil_core::capability::ContextKind;
use veil_core::registry::member;
use veil_core::{Result, SharedNoise, WebGlSpoof};

use super::proxy_helpers;

pub fn apply(spoof: WebGlSpoof, noise: SharedNoise) -> Result<()> {
    let proto = proxy_helpers::get_prototype("HTMLCanvasElement")?;
    let original = proxy_helpers::get_object(&proto, member::GET_CONTEXT)?;

    let apply_trap = Closure::wrap(Box::new(move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
        let ctx = proxy_helpers::call_function(&original, &this_arg, &args)?;
        let is_webgl = proxy_helpers::argument(&args, 0)
            .as_string()
            .and_then(|kind| ContextKind::parse(&kind))
            .is_some_and(|kind| kind.is_webgl());
        if is_webgl && ctx.is_object() && !proxy_helpers::is_marked(&ctx) {
            if let Err(err) = wrap_context(&ctx, &spoof, &noise) {
                log::warn!("WebGL context left native: {}", err);
            }
            proxy_helpers::mark(&ctx);
        }
        Ok(ctx)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(&proto, member::GET_CONTEXT, apply_trap)?;
    Ok(())
}

fn wrap_context(ctx: &JsValue, spoof: &WebGlSpoof, noise: &SharedNoise) -> Result<()> {
    if spoof.vendor.is_some() || spoof.renderer.is_some() {
        wrap_get_parameter(ctx, spoof.clone())?;
    }
    if let Some(magnitude) = spoof.pixel_noise {
        wrap_read_pixels(ctx, magnitude, noise.clone())?;
    }
    Ok(())
}

fn wrap_get_parameter(ctx: &JsValue, spoof: WebGlSpoof) -> Result<()> {
    let original = proxy_helpers::get_object(ctx, "getParameter")?;

    let apply_trap = Closure::wrap(Box::new(move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
        let code = proxy_helpers::argument(&args, 0).as_f64().unwrap_or(0.0) as u32;
        match spoof.parameter(code) {
            Some(value) => Ok(JsValue::from_str(value)),
            None => proxy_helpers::call_function(&original, &this_arg, &args),
        }
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(ctx, "getParameter", apply_trap)?;
    Ok(())
}

fn wrap_read_pixels(ctx: &JsValue, magnitude: f64, noise: SharedNoise) -> Result<()> {
    let original = proxy_helpers::get_object(ctx, "readPixels")?;

    let apply_trap = Closure::wrap(Box::new(move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
        let result = proxy_helpers::call_function(&original, &this_arg, &args)?;
        // Output buffer is the 7th argument; only byte buffers are noised.
        if let Ok(pixels) = proxy_helpers::argument(&args, 6).dyn_into::<Uint8Array>() {
            let mut buffer = pixels.to_vec();
            noise.borrow_mut().perturb_pixels(&mut buffer, magnitude);
            pixels.copy_from(&buffer);
        } else {
            log::debug!("readPixels left un-noised: output is not a Uint8Array");
        }
        Ok(result)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(ctx, "readPixels", apply_trap)?;
    Ok(())
}
