//! Capability traits, one per overridden surface.
//!
//! A [`BrowsingContext`] is assembled from native implementations of these
//! traits. Installation replaces each one with a profile-backed decorator
//! (see [`crate::overrides`]), so consumers only ever talk to the trait and
//! never to a patched global.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::timezone::ResolvedDateTimeOptions;

/// Platform identification (`navigator.*`).
pub trait IdentityProvider {
    fn platform(&self) -> String;
    fn hardware_concurrency(&self) -> u32;
    /// `None` where the platform does not expose device memory.
    fn device_memory(&self) -> Option<f64>;
    fn max_touch_points(&self) -> u32;
    fn language(&self) -> String;
    fn languages(&self) -> Vec<String>;
    fn do_not_track(&self) -> Option<String>;
}

/// Screen geometry and pixel ratio.
pub trait DisplayProvider {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn avail_width(&self) -> u32;
    fn avail_height(&self) -> u32;
    fn color_depth(&self) -> u32;
    fn pixel_depth(&self) -> u32;
    fn device_pixel_ratio(&self) -> f64;
}

/// Time-zone dependent APIs.
pub trait ClockProvider {
    /// Current instant; the install pins the zone offset at this moment.
    fn now(&self) -> DateTime<Utc>;
    /// Minutes to add to local time to reach UTC.
    fn timezone_offset(&self) -> i32;
    fn resolved_options(&self) -> ResolvedDateTimeOptions;
}

/// Canvas factory.
pub trait GraphicsProvider {
    fn create_canvas(&self, width: u32, height: u32) -> Box<dyn CanvasElement>;
}

/// Kind string passed to `getContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    TwoD,
    WebGl,
    ExperimentalWebGl,
    WebGl2,
}

impl ContextKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "2d" => Some(ContextKind::TwoD),
            "webgl" => Some(ContextKind::WebGl),
            "experimental-webgl" => Some(ContextKind::ExperimentalWebGl),
            "webgl2" => Some(ContextKind::WebGl2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::TwoD => "2d",
            ContextKind::WebGl => "webgl",
            ContextKind::ExperimentalWebGl => "experimental-webgl",
            ContextKind::WebGl2 => "webgl2",
        }
    }

    pub fn is_webgl(&self) -> bool {
        !matches!(self, ContextKind::TwoD)
    }
}

/// A rendering context handed out by a canvas. Handles are shared: asking
/// the same canvas twice for the same kind yields the same context.
#[derive(Clone)]
pub enum ContextHandle {
    TwoD(Rc<RefCell<dyn Context2d>>),
    WebGl(Rc<RefCell<dyn WebGlContext>>),
}

impl ContextHandle {
    pub fn as_2d(&self) -> Option<Rc<RefCell<dyn Context2d>>> {
        match self {
            ContextHandle::TwoD(ctx) => Some(ctx.clone()),
            ContextHandle::WebGl(_) => None,
        }
    }

    pub fn as_webgl(&self) -> Option<Rc<RefCell<dyn WebGlContext>>> {
        match self {
            ContextHandle::WebGl(ctx) => Some(ctx.clone()),
            ContextHandle::TwoD(_) => None,
        }
    }
}

pub trait CanvasElement {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn get_context(&mut self, kind: ContextKind) -> Option<ContextHandle>;
    /// Serialize the bitmap as a `data:image/png;base64,...` URL.
    fn to_data_url(&mut self) -> String;
    /// Serialize the bitmap as raw encoded bytes.
    fn to_blob(&mut self) -> Vec<u8>;
}

/// RGBA pixel buffer, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width * height * 4) as usize],
        }
    }
}

/// Build a `data:` URL the way `toDataURL` does.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Payload of a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let (_, payload) = url.strip_prefix("data:")?.split_once(";base64,")?;
    STANDARD.decode(payload).ok()
}

pub trait Context2d {
    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, rgba: [u8; 4]);
    fn get_image_data(&self, x: u32, y: u32, width: u32, height: u32) -> ImageData;
    fn put_image_data(&mut self, image: &ImageData, x: u32, y: u32);
}

/// Result of `getParameter`.
#[derive(Debug, Clone, PartialEq)]
pub enum GlParameter {
    Text(String),
    Number(f64),
    Null,
}

pub trait WebGlContext {
    fn get_parameter(&self, code: u32) -> GlParameter;
    /// Fill `out` with RGBA pixels from the framebuffer.
    fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32, out: &mut [u8]);
}

/// Audio graph factory (`AudioContext`).
pub trait AudioProvider {
    fn create_analyser(&self) -> Box<dyn AnalyserNode>;
}

pub trait AnalyserNode {
    fn frequency_bin_count(&self) -> usize;
    fn get_float_frequency_data(&self, out: &mut [f32]);
}

/// Battery manager state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryStatus {
    pub level: f64,
    pub charging: bool,
    pub charging_time: f64,
    pub discharging_time: f64,
}

#[async_trait(?Send)]
pub trait BatteryProvider {
    async fn get_battery(&self) -> Result<BatteryStatus>;
}

/// Connection descriptor (`navigator.connection`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub effective_type: String,
    pub downlink: f64,
    pub rtt: f64,
}

pub trait NetworkProvider {
    /// `None` where the platform has no connection object.
    fn connection(&self) -> Option<ConnectionInfo>;
}

/// Outcome of a permission query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionStatus {
    pub name: String,
    pub state: String,
}

#[async_trait(?Send)]
pub trait PermissionProvider {
    async fn query(&self, name: &str) -> Result<PermissionStatus>;
}

/// Every surface of one browsing context.
///
/// Optional members model APIs a platform may lack; overrides for an
/// absent surface are skipped rather than synthesized.
pub struct BrowsingContext {
    pub identity: Box<dyn IdentityProvider>,
    pub display: Box<dyn DisplayProvider>,
    pub clock: Box<dyn ClockProvider>,
    pub graphics: Box<dyn GraphicsProvider>,
    pub network: Box<dyn NetworkProvider>,
    pub audio: Option<Box<dyn AudioProvider>>,
    pub battery: Option<Box<dyn BatteryProvider>>,
    pub permissions: Option<Box<dyn PermissionProvider>>,
    pub(crate) installed: bool,
}

impl BrowsingContext {
    pub fn new(
        identity: Box<dyn IdentityProvider>,
        display: Box<dyn DisplayProvider>,
        clock: Box<dyn ClockProvider>,
        graphics: Box<dyn GraphicsProvider>,
        network: Box<dyn NetworkProvider>,
    ) -> Self {
        Self {
            identity,
            display,
            clock,
            graphics,
            network,
            audio: None,
            battery: None,
            permissions: None,
            installed: false,
        }
    }

    pub fn with_audio(mut self, audio: Box<dyn AudioProvider>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_battery(mut self, battery: Box<dyn BatteryProvider>) -> Self {
        self.battery = Some(battery);
        self
    }

    pub fn with_permissions(mut self, permissions: Box<dyn PermissionProvider>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Whether an installer has already run against this context.
    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_kind_parse() {
        assert_eq!(ContextKind::parse("2d"), Some(ContextKind::TwoD));
        assert_eq!(ContextKind::parse("experimental-webgl"), Some(ContextKind::ExperimentalWebGl));
        assert_eq!(ContextKind::parse("bitmaprenderer"), None);
        assert!(ContextKind::WebGl2.is_webgl());
        assert!(!ContextKind::TwoD.is_webgl());
    }

    #[test]
    fn test_data_url() {
        let url = encode_data_url("image/png", &[1, 2, 3]);
        assert_eq!(url, "data:image/png;base64,AQID");
        assert_eq!(decode_data_url(&url), Some(vec![1, 2, 3]));
        assert_eq!(decode_data_url("data:,"), None);
    }

    #[test]
    fn test_image_data_size() {
        let image = ImageData::new(3, 2);
        assert_eq!(image.data.len(), 24);
    }
}
