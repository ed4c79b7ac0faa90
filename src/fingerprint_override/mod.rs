//! Profile-driven fingerprint overrides for a live JS realm.
//!
//! The same [`OverrideRegistry`] the native installer uses is applied here
//! to the real `navigator`, `screen`, `window`, `Date`, `Intl`, canvas,
//! WebGL, audio, battery, connection and permissions objects. Accessors and
//! wrappers are WASM closures behind `Proxy`, so `toString()` still reports
//! `[native code]`.
//!
//! ## Usage
//!
//! ```javascript
//! import init, { install_fingerprint_overrides } from './pkg/veil_wasm.js';
//! await init();
//! const report = install_fingerprint_overrides(
//!   { platform: 'Win32', timezone: 'Europe/Berlin', canvas_noise: 0.02 },
//!   { noise_seed: 7, onEvent: (e) => console.debug(e) },
//! );
//! ```

use std::cell::RefCell;

use chrono::{DateTime, Utc};
use js_sys::{Array, Function, Object, Reflect};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use veil_core::events::EventLog;
use veil_core::{
    EventSink, InstallEvent, InstallOptions, LogSink, Override, OverrideKey, OverrideRegistry,
    OverrideValue, Profile, Result, SharedNoise, Surface, VeilError,
};

pub mod audio;
pub mod canvas;
pub mod device;
pub mod identity;
pub mod permissions;
pub mod proxy_helpers;
pub mod temporal;
pub mod webgl;
pub mod webrtc;

/// What the realm was installed with.
struct ActiveInstall {
    profile: Profile,
    registry: OverrideRegistry,
}

thread_local! {
    static ACTIVE: RefCell<Option<ActiveInstall>> = RefCell::new(None);
}

/// Forwards events to `log` and to an optional page-supplied callback.
struct JsCallbackSink {
    callback: Option<Function>,
}

impl JsCallbackSink {
    fn from_options(options: &JsValue) -> Self {
        let callback = if options.is_object() {
            Reflect::get(options, &JsValue::from_str("onEvent"))
                .ok()
                .and_then(|f| f.dyn_into::<Function>().ok())
        } else {
            None
        };
        Self { callback }
    }
}

impl EventSink for JsCallbackSink {
    fn emit(&self, event: &InstallEvent) {
        LogSink.emit(event);
        let Some(callback) = &self.callback else {
            return;
        };
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        match event.serialize(&serializer) {
            Ok(value) => {
                if let Err(err) = callback.call1(&JsValue::NULL, &value) {
                    log::warn!("onEvent callback threw: {:?}", err);
                }
            }
            Err(err) => log::warn!("event not serializable: {}", err),
        }
    }
}

fn parse_options(options: &JsValue) -> InstallOptions {
    if options.is_undefined() || options.is_null() {
        return InstallOptions::default();
    }
    serde_wasm_bindgen::from_value(options.clone()).unwrap_or_else(|err| {
        log::warn!("install options ignored: {}", err);
        InstallOptions::default()
    })
}

/// Convert the page-supplied profile. Only plain objects are accepted;
/// arrays would otherwise fill fields by position.
pub fn parse_profile(profile: JsValue) -> Result<Profile> {
    if profile.is_undefined() || profile.is_null() {
        return Ok(Profile::default());
    }
    if Array::is_array(&profile) {
        return Err(VeilError::InvalidProfile("profile must be an object, got an array".into()));
    }
    let value: serde_json::Value =
        serde_wasm_bindgen::from_value(profile).map_err(|e| VeilError::InvalidProfile(e.to_string()))?;
    Profile::from_value(value)
}

fn install_instant() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or_default()
}

/// Install every override the profile asks for into this realm.
///
/// Never throws. Returns the install report
/// (`{ applied, skipped, failed, corrections, alreadyInstalled }`); every
/// event is also passed to `options.onEvent` when given.
#[wasm_bindgen]
pub fn install_fingerprint_overrides(profile: JsValue, options: JsValue) -> JsValue {
    let sink = JsCallbackSink::from_options(&options);
    let options = parse_options(&options);
    if let Ok(level) = options.log_level.parse::<log::LevelFilter>() {
        log::set_max_level(level);
    }

    let mut events = EventLog::new(&sink);
    if ACTIVE.with(|a| a.borrow().is_some()) {
        events.emit(InstallEvent::AlreadyInstalled);
        return report_to_js(events);
    }

    let profile = parse_profile(profile).unwrap_or_else(|err| {
        events.error("profile", &err);
        Profile::default()
    });

    let (profile, corrections) = profile.sanitized();
    for correction in &corrections {
        events.emit(InstallEvent::from(correction));
    }

    let registry = OverrideRegistry::build(&profile, install_instant());
    for (key, err) in registry.failures() {
        events.error(key, err);
    }

    let noise = options.noise_source();
    canvas::capture_natives();
    for (key, value) in registry.entries() {
        match apply_entry(key, value, &noise) {
            Ok(()) => events.applied(key),
            Err(err) => events.error(key, &err),
        }
    }

    if options.suppress_webrtc {
        let removed = webrtc::suppress_globals();
        log::info!("WebRTC entry points removed: {}", removed.join(", "));
    }

    ACTIVE.with(|a| *a.borrow_mut() = Some(ActiveInstall { profile, registry }));
    let report = report_to_js(events);
    log::info!("fingerprint overrides installed");
    report
}

fn apply_entry(key: &OverrideKey, value: &Override, noise: &SharedNoise) -> Result<()> {
    match value {
        Override::Accessor(v) => identity::apply(key.surface, key.member, v),
        Override::TimezoneOffset(minutes) => temporal::apply_offset(*minutes),
        Override::ResolvedTimeZone(zone) => temporal::apply_zone(zone),
        Override::ContextQuery(spoof) => webgl::apply(spoof.clone(), noise.clone()),
        Override::PixelReadNoise(magnitude) => canvas::apply_pixel_reads(*magnitude, noise.clone()),
        Override::SnapshotNoise(magnitude) => canvas::apply_snapshot(key.member, *magnitude, noise.clone()),
        Override::AnalyserNoise(magnitude) => audio::apply(*magnitude, noise.clone()),
        Override::BatteryState { level, charging } => device::apply_battery(*level, *charging),
        Override::PermissionStates(states) => permissions::apply(states.clone()),
    }
}

fn report_to_js(events: EventLog<'_>) -> JsValue {
    let report = events.finish();
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    report.serialize(&serializer).unwrap_or(JsValue::UNDEFINED)
}

/// Per configured key, whether the realm currently reports the profile
/// value (accessors) or carries our wrapper (methods).
#[wasm_bindgen]
pub fn check_override_status() -> JsValue {
    let status = Object::new();
    ACTIVE.with(|a| {
        let active = a.borrow();
        let Some(active) = active.as_ref() else {
            return;
        };
        for (key, value) in active.registry.entries() {
            let ok = match value {
                Override::Accessor(expected) => reports_value(key, expected),
                _ => is_wrapped(key),
            };
            let _ = Reflect::set(&status, &JsValue::from_str(&key.to_string()), &JsValue::from_bool(ok));
        }
    });
    status.into()
}

fn reports_value(key: &OverrideKey, expected: &OverrideValue) -> bool {
    let Ok(target) = identity::target(key.surface) else {
        return false;
    };
    let Ok(live) = Reflect::get(&target, &JsValue::from_str(key.member)) else {
        return false;
    };
    match expected {
        OverrideValue::Text(s) => live.as_string().as_deref() == Some(s.as_str()),
        OverrideValue::Integer(_) | OverrideValue::Number(_) => live.as_f64() == expected.as_number(),
        OverrideValue::TextList(list) => live
            .dyn_ref::<Array>()
            .map(|arr| arr.iter().map(|v| v.as_string().unwrap_or_default()).eq(list.iter().cloned()))
            .unwrap_or(false),
    }
}

fn is_wrapped(key: &OverrideKey) -> bool {
    let host = match key.surface {
        Surface::Date => proxy_helpers::get_prototype("Date"),
        Surface::DateTimeFormat => proxy_helpers::get_global("Intl")
            .and_then(|intl| proxy_helpers::get_object(&intl, "DateTimeFormat"))
            .and_then(|dtf| proxy_helpers::get_object(&dtf, "prototype")),
        Surface::CanvasElement => proxy_helpers::get_prototype("HTMLCanvasElement"),
        Surface::Context2d => proxy_helpers::get_prototype("CanvasRenderingContext2D"),
        Surface::AudioContext => proxy_helpers::get_prototype("AudioContext")
            .or_else(|_| proxy_helpers::get_prototype("webkitAudioContext")),
        Surface::Permissions => proxy_helpers::get_global("navigator")
            .and_then(|nav| proxy_helpers::get_object(&nav, "permissions")),
        _ => identity::target(key.surface),
    };
    host.and_then(|host| proxy_helpers::get_object(&host, key.member))
        .map(|method| proxy_helpers::is_marked(&method))
        .unwrap_or(false)
}

/// The sanitized profile of the active installation, or `undefined`.
#[wasm_bindgen]
pub fn get_active_profile() -> JsValue {
    ACTIVE.with(|a| {
        a.borrow()
            .as_ref()
            .and_then(|active| active.profile.serialize(&serde_wasm_bindgen::Serializer::json_compatible()).ok())
            .unwrap_or(JsValue::UNDEFINED)
    })
}

/// Remove the WebRTC entry points from this realm. Returns the removed names.
#[wasm_bindgen]
pub fn suppress_webrtc_globals() -> JsValue {
    webrtc::suppress_globals()
        .into_iter()
        .map(|name| JsValue::from_str(&name))
        .collect::<Array>()
        .into()
}
