//! Audio frequency-data noise.

use js_sys::Float32Array;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use veil_core::registry::member;
use veil_core::{Result, SharedNoise, VeilError};

use super::proxy_helpers;

const CONSTRUCTORS: [&str; 2] = ["AudioContext", "webkitAudioContext"];

/// Wrap `createAnalyser` on every audio context constructor present.
pub fn apply(magnitude: f64, noise: SharedNoise) -> Result<()> {
    let mut wrapped = 0;
    for name in CONSTRUCTORS {
        let proto = match proxy_helpers::get_prototype(name) {
            Ok(proto) => proto,
            Err(VeilError::SurfaceUnavailable(_)) => continue,
            Err(e) => return Err(e),
        };
        match wrap_create_analyser(&proto, magnitude, noise.clone()) {
            Ok(()) => wrapped += 1,
            // Safari aliases both names to one prototype.
            Err(VeilError::AlreadyWrapped(_)) if wrapped > 0 => {}
            Err(e) => return Err(e),
        }
    }
    if wrapped == 0 {
        return Err(VeilError::SurfaceUnavailable("AudioContext".to_string()));
    }
    Ok(())
}

fn wrap_create_analyser(proto: &JsValue, magnitude: f64, noise: SharedNoise) -> Result<()> {
    let original = proxy_helpers::get_object(proto, member::CREATE_ANALYSER)?;

    let apply_trap = Closure::wrap(Box::new(move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
        let analyser = proxy_helpers::call_function(&original, &this_arg, &args)?;
        if analyser.is_object() && !proxy_helpers::is_marked(&analyser) {
            if let Err(err) = wrap_frequency_data(&analyser, magnitude, noise.clone()) {
                log::warn!("analyser left native: {}", err);
            }
            proxy_helpers::mark(&analyser);
        }
        Ok(analyser)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(proto, member::CREATE_ANALYSER, apply_trap)?;
    Ok(())
}

fn wrap_frequency_data(analyser: &JsValue, magnitude: f64, noise: SharedNoise) -> Result<()> {
    let original = proxy_helpers::get_object(analyser, "getFloatFrequencyData")?;

    let apply_trap = Closure::wrap(Box::new(move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
        let result = proxy_helpers::call_function(&original, &this_arg, &args)?;
        if let Ok(bins) = proxy_helpers::argument(&args, 0).dyn_into::<Float32Array>() {
            let mut buffer = bins.to_vec();
            noise.borrow_mut().perturb_bins(&mut buffer, magnitude);
            bins.copy_from(&buffer);
        }
        Ok(result)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(analyser, "getFloatFrequencyData", apply_trap)?;
    Ok(())
}
