//! Extension background collaborators.
//!
//! Runs in a Chromium extension background page: answers proxy auth
//! challenges from provisioned credentials and applies the WebRTC leak
//! policy. Every step is fail-open; a missing API is logged and skipped.

use js_sys::{Array, Function, Object, Reflect};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use veil_core::webrtc::{self, ALL_URLS, BLOCKED_MEDIA, IP_HANDLING_POLICY, MEDIA_SETTING};
use veil_core::{AuthChallenge, ProxyAuthenticator, ProxyCredentials, Result, VeilError};

use crate::error::{binding, to_js};
use crate::fingerprint_override::proxy_helpers;

/// Which parts of the WebRTC policy took effect.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct PolicyReport {
    ip_handling: bool,
    media_blocked: Vec<String>,
    request_filter: bool,
    document_start_script: bool,
}

fn chrome_api(path: &[&str]) -> Result<JsValue> {
    let mut value = proxy_helpers::get_global("chrome")?;
    if value.is_undefined() || value.is_null() {
        return Err(VeilError::SurfaceUnavailable("chrome".into()));
    }
    for segment in path {
        value = proxy_helpers::get_object(&value, segment)?;
    }
    Ok(value)
}

fn url_filter() -> Result<JsValue> {
    let filter = Object::new();
    let urls = Array::of1(&JsValue::from_str(ALL_URLS));
    Reflect::set(&filter, &JsValue::from_str("urls"), &urls).map_err(|e| binding("urls", e))?;
    Ok(filter.into())
}

fn add_listener(event: &[&str], listener: &JsValue, extra: Option<&str>) -> Result<()> {
    let event = chrome_api(event)?;
    let args = Array::of2(listener, &url_filter()?);
    if let Some(extra) = extra {
        args.push(&Array::of1(&JsValue::from_str(extra)));
    }
    proxy_helpers::call_method(&event, "addListener", &args).map_err(|e| binding("addListener", e))?;
    Ok(())
}

fn string_field(obj: &JsValue, name: &str) -> Option<String> {
    Reflect::get(obj, &JsValue::from_str(name)).ok().and_then(|v| v.as_string())
}

/// Answer every proxy auth challenge with `credentials` (`{username, password}`).
///
/// Returns `true` once the blocking listener is registered; errors are
/// thrown as `{code, message, benign}`.
#[wasm_bindgen]
pub fn install_proxy_auth(credentials: JsValue) -> std::result::Result<bool, JsValue> {
    let raw: ProxyCredentials = serde_wasm_bindgen::from_value(credentials)
        .map_err(|e| to_js(&VeilError::InvalidProfile(e.to_string())))?;
    let credentials = ProxyCredentials::new(raw.username.clone(), raw.password.clone()).map_err(|e| to_js(&e))?;
    let authenticator = ProxyAuthenticator::new(credentials);
    log::info!("proxy auth listener for {}", authenticator.username());

    let observer = std::rc::Rc::new(authenticator);
    let responder = observer.clone();

    let on_auth = Closure::wrap(Box::new(move |details: JsValue| -> JsValue {
        let challenge: AuthChallenge = serde_wasm_bindgen::from_value(details).unwrap_or_default();
        serde_wasm_bindgen::to_value(&responder.respond(&challenge)).unwrap_or(JsValue::UNDEFINED)
    }) as Box<dyn FnMut(JsValue) -> JsValue>);
    add_listener(&["webRequest", "onAuthRequired"], on_auth.as_ref(), Some("blocking")).map_err(|e| to_js(&e))?;
    on_auth.forget();

    let on_request = Closure::wrap(Box::new(move |details: JsValue| {
        if let Some(url) = string_field(&details, "url") {
            observer.observe_request(&url);
        }
    }) as Box<dyn FnMut(JsValue)>);
    // Observation only; losing it costs nothing.
    if let Err(err) = add_listener(&["webRequest", "onBeforeRequest"], on_request.as_ref(), None) {
        log::debug!("request observer not installed: {}", err);
    }
    on_request.forget();

    Ok(true)
}

/// Apply the WebRTC leak policy. Never throws; returns which parts took
/// effect (`{ipHandling, mediaBlocked, requestFilter, documentStartScript}`).
#[wasm_bindgen]
pub fn install_webrtc_policy() -> JsValue {
    let mut report = PolicyReport::default();

    match set_ip_handling_policy() {
        Ok(()) => report.ip_handling = true,
        Err(err) => log::warn!("WebRTC IP handling policy not set: {}", err),
    }

    for media in BLOCKED_MEDIA {
        match block_media(media) {
            Ok(()) => report.media_blocked.push(media.to_string()),
            Err(err) => log::warn!("{} not blocked: {}", media, err),
        }
    }

    match install_request_filter() {
        Ok(()) => report.request_filter = true,
        Err(err) => log::warn!("signaling filter not installed: {}", err),
    }

    match install_document_start_script() {
        Ok(()) => report.document_start_script = true,
        Err(err) => log::warn!("document-start script not installed: {}", err),
    }

    serde_wasm_bindgen::to_value(&report).unwrap_or(JsValue::UNDEFINED)
}

fn set_ip_handling_policy() -> Result<()> {
    let policy = chrome_api(&["privacy", "network", "webRTCIPHandlingPolicy"])?;
    let details = Object::new();
    Reflect::set(&details, &JsValue::from_str("value"), &JsValue::from_str(IP_HANDLING_POLICY))
        .map_err(|e| binding("value", e))?;
    proxy_helpers::call_method(&policy, "set", &Array::of1(&details)).map_err(|e| binding("webRTCIPHandlingPolicy", e))?;
    log::info!("WebRTC IP handling set to {}", IP_HANDLING_POLICY);
    Ok(())
}

fn block_media(media: &str) -> Result<()> {
    let setting = chrome_api(&["contentSettings", media])?;
    let details = Object::new();
    Reflect::set(&details, &JsValue::from_str("primaryPattern"), &JsValue::from_str(ALL_URLS))
        .map_err(|e| binding("primaryPattern", e))?;
    Reflect::set(&details, &JsValue::from_str("setting"), &JsValue::from_str(MEDIA_SETTING))
        .map_err(|e| binding("setting", e))?;
    proxy_helpers::call_method(&setting, "set", &Array::of1(&details)).map_err(|e| binding(media, e))?;
    Ok(())
}

fn install_request_filter() -> Result<()> {
    let listener = Closure::wrap(Box::new(move |details: JsValue| -> JsValue {
        let response = Object::new();
        if let Some(url) = string_field(&details, "url") {
            if webrtc::is_signaling_url(&url) {
                log::info!("cancelled signaling request: {}", url);
                let _ = Reflect::set(&response, &JsValue::from_str("cancel"), &JsValue::TRUE);
            }
        }
        response.into()
    }) as Box<dyn FnMut(JsValue) -> JsValue>);
    add_listener(&["webRequest", "onBeforeRequest"], listener.as_ref(), Some("blocking"))?;
    listener.forget();
    Ok(())
}

fn install_document_start_script() -> Result<()> {
    let execute: Function = chrome_api(&["tabs", "executeScript"])?
        .dyn_into()
        .map_err(|_| VeilError::SurfaceUnavailable("tabs.executeScript".into()))?;
    let tabs = chrome_api(&["tabs"])?;
    let code = JsValue::from_str(&webrtc::suppression_script());

    let listener = Closure::wrap(Box::new(move |details: JsValue| {
        if string_field(&details, "type").as_deref() != Some("main_frame") {
            return;
        }
        let Ok(tab_id) = Reflect::get(&details, &JsValue::from_str("tabId")) else {
            return;
        };
        let injection = Object::new();
        let _ = Reflect::set(&injection, &JsValue::from_str("code"), &code);
        let _ = Reflect::set(&injection, &JsValue::from_str("runAt"), &JsValue::from_str("document_start"));
        if let Err(err) = execute.call2(&tabs, &tab_id, &injection) {
            log::warn!("WebRTC removal not injected: {:?}", err);
        }
    }) as Box<dyn FnMut(JsValue)>);
    add_listener(&["webRequest", "onHeadersReceived"], listener.as_ref(), Some("responseHeaders"))?;
    listener.forget();
    Ok(())
}
