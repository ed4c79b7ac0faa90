//! Native fakes for every capability surface.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use veil_core::capability::{
    encode_data_url, AnalyserNode, AudioProvider, BatteryProvider, BatteryStatus, CanvasElement,
    ClockProvider, ConnectionInfo, Context2d, ContextHandle, ContextKind, DisplayProvider,
    GlParameter, GraphicsProvider, IdentityProvider, ImageData, NetworkProvider,
    PermissionProvider, PermissionStatus, WebGlContext,
};
use veil_core::{BrowsingContext, Result, ResolvedDateTimeOptions, VeilError};

pub const NATIVE_PLATFORM: &str = "Linux x86_64";
pub const NATIVE_GL_VENDOR: &str = "Mesa";
pub const NATIVE_GL_RENDERER: &str = "llvmpipe (LLVM 17.0.6, 256 bits)";
pub const MAX_TEXTURE_SIZE: u32 = 0x0D33;
pub const NATIVE_BINS: f32 = -100.0;

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
}

pub struct FakeIdentity;

impl IdentityProvider for FakeIdentity {
    fn platform(&self) -> String {
        NATIVE_PLATFORM.into()
    }
    fn hardware_concurrency(&self) -> u32 {
        12
    }
    fn device_memory(&self) -> Option<f64> {
        Some(16.0)
    }
    fn max_touch_points(&self) -> u32 {
        0
    }
    fn language(&self) -> String {
        "de-DE".into()
    }
    fn languages(&self) -> Vec<String> {
        vec!["de-DE".into(), "de".into()]
    }
    fn do_not_track(&self) -> Option<String> {
        None
    }
}

pub struct FakeDisplay;

impl DisplayProvider for FakeDisplay {
    fn width(&self) -> u32 {
        2560
    }
    fn height(&self) -> u32 {
        1440
    }
    fn avail_width(&self) -> u32 {
        2560
    }
    fn avail_height(&self) -> u32 {
        1400
    }
    fn color_depth(&self) -> u32 {
        24
    }
    fn pixel_depth(&self) -> u32 {
        24
    }
    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }
}

pub struct FakeClock {
    pub now: DateTime<Utc>,
}

impl ClockProvider for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
    fn timezone_offset(&self) -> i32 {
        0
    }
    fn resolved_options(&self) -> ResolvedDateTimeOptions {
        ResolvedDateTimeOptions {
            locale: "en-US".into(),
            calendar: "gregory".into(),
            numbering_system: "latn".into(),
            time_zone: "UTC".into(),
            hour_cycle: Some("h12".into()),
            hour12: Some(true),
        }
    }
}

pub struct FakeContext2d {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl FakeContext2d {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }
}

impl Context2d for FakeContext2d {
    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, rgba: [u8; 4]) {
        for row in y..(y + height).min(self.height) {
            for col in x..(x + width).min(self.width) {
                let i = ((row * self.width + col) * 4) as usize;
                self.pixels[i..i + 4].copy_from_slice(&rgba);
            }
        }
    }

    fn get_image_data(&self, x: u32, y: u32, width: u32, height: u32) -> ImageData {
        let mut image = ImageData::new(width, height);
        for row in 0..height {
            for col in 0..width {
                let src = (((y + row) * self.width + x + col) * 4) as usize;
                let dst = ((row * width + col) * 4) as usize;
                image.data[dst..dst + 4].copy_from_slice(&self.pixels[src..src + 4]);
            }
        }
        image
    }

    fn put_image_data(&mut self, image: &ImageData, x: u32, y: u32) {
        for row in 0..image.height {
            for col in 0..image.width {
                let src = ((row * image.width + col) * 4) as usize;
                let dst = (((y + row) * self.width + x + col) * 4) as usize;
                self.pixels[dst..dst + 4].copy_from_slice(&image.data[src..src + 4]);
            }
        }
    }
}

pub struct FakeWebGl;

impl WebGlContext for FakeWebGl {
    fn get_parameter(&self, code: u32) -> GlParameter {
        match code {
            0x1F00 | 0x9245 => GlParameter::Text(NATIVE_GL_VENDOR.into()),
            0x1F01 | 0x9246 => GlParameter::Text(NATIVE_GL_RENDERER.into()),
            MAX_TEXTURE_SIZE => GlParameter::Number(16384.0),
            _ => GlParameter::Null,
        }
    }

    fn read_pixels(&self, _x: u32, _y: u32, _width: u32, _height: u32, out: &mut [u8]) {
        out.fill(128);
    }
}

/// Canvas that hands out one context for its lifetime, like a browser.
pub struct FakeCanvas {
    width: u32,
    height: u32,
    ctx2d: Option<Rc<RefCell<FakeContext2d>>>,
    gl: Option<Rc<RefCell<FakeWebGl>>>,
}

impl FakeCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ctx2d: None,
            gl: None,
        }
    }

    fn bitmap(&self) -> Vec<u8> {
        match &self.ctx2d {
            Some(ctx) => ctx.borrow().pixels.clone(),
            None => vec![0; (self.width * self.height * 4) as usize],
        }
    }
}

impl CanvasElement for FakeCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn get_context(&mut self, kind: ContextKind) -> Option<ContextHandle> {
        if kind.is_webgl() {
            if self.ctx2d.is_some() {
                return None;
            }
            let gl: Rc<RefCell<dyn WebGlContext>> =
                self.gl.get_or_insert_with(|| Rc::new(RefCell::new(FakeWebGl))).clone();
            Some(ContextHandle::WebGl(gl))
        } else {
            if self.gl.is_some() {
                return None;
            }
            let (width, height) = (self.width, self.height);
            let ctx: Rc<RefCell<dyn Context2d>> = self
                .ctx2d
                .get_or_insert_with(|| Rc::new(RefCell::new(FakeContext2d::new(width, height))))
                .clone();
            Some(ContextHandle::TwoD(ctx))
        }
    }

    fn to_data_url(&mut self) -> String {
        encode_data_url("image/png", &self.bitmap())
    }

    fn to_blob(&mut self) -> Vec<u8> {
        self.bitmap()
    }
}

pub struct FakeGraphics;

impl GraphicsProvider for FakeGraphics {
    fn create_canvas(&self, width: u32, height: u32) -> Box<dyn CanvasElement> {
        Box::new(FakeCanvas::new(width, height))
    }
}

pub struct FakeAnalyser;

impl AnalyserNode for FakeAnalyser {
    fn frequency_bin_count(&self) -> usize {
        64
    }

    fn get_float_frequency_data(&self, out: &mut [f32]) {
        out.fill(NATIVE_BINS);
    }
}

pub struct FakeAudio;

impl AudioProvider for FakeAudio {
    fn create_analyser(&self) -> Box<dyn AnalyserNode> {
        Box::new(FakeAnalyser)
    }
}

pub struct FakeBattery;

#[async_trait(?Send)]
impl BatteryProvider for FakeBattery {
    async fn get_battery(&self) -> Result<BatteryStatus> {
        Ok(BatteryStatus {
            level: 0.42,
            charging: false,
            charging_time: f64::INFINITY,
            discharging_time: 7200.0,
        })
    }
}

pub struct FakeNetwork(pub Option<ConnectionInfo>);

impl NetworkProvider for FakeNetwork {
    fn connection(&self) -> Option<ConnectionInfo> {
        self.0.clone()
    }
}

pub fn native_connection() -> ConnectionInfo {
    ConnectionInfo {
        effective_type: "3g".into(),
        downlink: 1.5,
        rtt: 300.0,
    }
}

/// Every name resolves to `"prompt"` except unknown ones, which reject.
pub struct FakePermissions;

#[async_trait(?Send)]
impl PermissionProvider for FakePermissions {
    async fn query(&self, name: &str) -> Result<PermissionStatus> {
        match name {
            "geolocation" | "camera" | "microphone" | "notifications" => Ok(PermissionStatus {
                name: name.into(),
                state: "prompt".into(),
            }),
            _ => Err(VeilError::Binding(format!("unknown permission {}", name))),
        }
    }
}

pub const INSTALL_INSTANT: &str = "2026-01-15T12:00:00Z";

/// A context with every optional surface present.
pub fn native_context() -> BrowsingContext {
    bare_context()
        .with_audio(Box::new(FakeAudio))
        .with_battery(Box::new(FakeBattery))
        .with_permissions(Box::new(FakePermissions))
}

/// A context lacking audio, battery, and permissions.
pub fn bare_context() -> BrowsingContext {
    BrowsingContext::new(
        Box::new(FakeIdentity),
        Box::new(FakeDisplay),
        Box::new(FakeClock { now: at(INSTALL_INSTANT) }),
        Box::new(FakeGraphics),
        Box::new(FakeNetwork(Some(native_connection()))),
    )
}

/// Draw a fixed test pattern through whatever context the canvas hands out.
pub fn draw_pattern(canvas: &mut dyn CanvasElement) {
    let ctx = canvas
        .get_context(ContextKind::TwoD)
        .and_then(|handle| handle.as_2d())
        .expect("2d context");
    let mut ctx = ctx.borrow_mut();
    ctx.fill_rect(0, 0, 16, 16, [40, 120, 200, 255]);
    ctx.fill_rect(4, 4, 8, 8, [250, 5, 128, 128]);
}
