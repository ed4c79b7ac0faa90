//! Rendering noise injectors.
//!
//! Canvases, their contexts, and analyser nodes are wrapped as they are
//! created. Every wrapper calls the native operation first and perturbs the
//! returned buffer in place, drawing fresh samples on every call.

use std::cell::RefCell;
use std::rc::Rc;

use crate::capability::{
    AnalyserNode, AudioProvider, CanvasElement, Context2d, ContextHandle, ContextKind,
    GlParameter, GraphicsProvider, ImageData, WebGlContext,
};
use crate::noise::SharedNoise;
use crate::registry::{member, Override, OverrideRegistry, Surface, WebGlSpoof};

/// Rendering overrides drawn from the registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderingConfig {
    pub webgl: Option<WebGlSpoof>,
    pub pixel_read_noise: Option<f64>,
    pub snapshot_noise: Option<f64>,
}

impl RenderingConfig {
    pub fn from_registry(registry: &OverrideRegistry) -> Self {
        let webgl = match registry.get(Surface::CanvasElement, member::GET_CONTEXT) {
            Some(Override::ContextQuery(spoof)) => Some(spoof.clone()),
            _ => None,
        };
        let pixel_read_noise = match registry.get(Surface::Context2d, member::GET_IMAGE_DATA) {
            Some(Override::PixelReadNoise(n)) => Some(*n),
            _ => None,
        };
        let snapshot_noise = match registry.get(Surface::CanvasElement, member::TO_DATA_URL) {
            Some(Override::SnapshotNoise(n)) => Some(*n),
            _ => None,
        };
        Self {
            webgl,
            pixel_read_noise,
            snapshot_noise,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub struct ProfileGraphics {
    inner: Box<dyn GraphicsProvider>,
    config: Rc<RenderingConfig>,
    noise: SharedNoise,
}

impl ProfileGraphics {
    pub fn new(inner: Box<dyn GraphicsProvider>, config: RenderingConfig, noise: SharedNoise) -> Self {
        Self {
            inner,
            config: Rc::new(config),
            noise,
        }
    }
}

impl GraphicsProvider for ProfileGraphics {
    fn create_canvas(&self, width: u32, height: u32) -> Box<dyn CanvasElement> {
        Box::new(ProfileCanvas {
            inner: self.inner.create_canvas(width, height),
            config: self.config.clone(),
            noise: self.noise.clone(),
            wrapped: Vec::new(),
        })
    }
}

// Identity of a native context, independent of its vtable.
fn handle_addr(handle: &ContextHandle) -> *const () {
    match handle {
        ContextHandle::TwoD(ctx) => Rc::as_ptr(ctx) as *const (),
        ContextHandle::WebGl(ctx) => Rc::as_ptr(ctx) as *const (),
    }
}

pub struct ProfileCanvas {
    inner: Box<dyn CanvasElement>,
    config: Rc<RenderingConfig>,
    noise: SharedNoise,
    /// Native context address -> wrapper handed out for it.
    wrapped: Vec<(*const (), ContextHandle)>,
}

impl ProfileCanvas {
    fn wrap(&self, native: ContextHandle) -> ContextHandle {
        match native {
            ContextHandle::TwoD(ctx) => match self.config.pixel_read_noise {
                Some(magnitude) => ContextHandle::TwoD(Rc::new(RefCell::new(NoisyContext2d {
                    inner: ctx,
                    magnitude,
                    noise: self.noise.clone(),
                }))),
                None => ContextHandle::TwoD(ctx),
            },
            ContextHandle::WebGl(ctx) => match &self.config.webgl {
                Some(spoof) => ContextHandle::WebGl(Rc::new(RefCell::new(SpoofedWebGl {
                    inner: ctx,
                    spoof: spoof.clone(),
                    noise: self.noise.clone(),
                }))),
                None => ContextHandle::WebGl(ctx),
            },
        }
    }

    /// Noise the visible 2D buffer through the native reader and writer.
    fn noise_bitmap(&mut self, magnitude: f64) {
        let (width, height) = (self.inner.width(), self.inner.height());
        if width == 0 || height == 0 {
            return;
        }
        // WebGL canvases have no 2D context and serialize untouched.
        let Some(ctx) = self
            .inner
            .get_context(ContextKind::TwoD)
            .and_then(|handle| handle.as_2d())
        else {
            return;
        };
        let mut image = ctx.borrow().get_image_data(0, 0, width, height);
        self.noise.borrow_mut().perturb_rgb(&mut image.data, magnitude);
        ctx.borrow_mut().put_image_data(&image, 0, 0);
    }
}

impl CanvasElement for ProfileCanvas {
    fn width(&self) -> u32 {
        self.inner.width()
    }

    fn height(&self) -> u32 {
        self.inner.height()
    }

    fn get_context(&mut self, kind: ContextKind) -> Option<ContextHandle> {
        let native = self.inner.get_context(kind)?;
        let addr = handle_addr(&native);
        if let Some((_, wrapper)) = self.wrapped.iter().find(|(a, _)| *a == addr) {
            return Some(wrapper.clone());
        }
        let wrapper = self.wrap(native);
        self.wrapped.push((addr, wrapper.clone()));
        Some(wrapper)
    }

    fn to_data_url(&mut self) -> String {
        if let Some(magnitude) = self.config.snapshot_noise {
            self.noise_bitmap(magnitude);
        }
        self.inner.to_data_url()
    }

    fn to_blob(&mut self) -> Vec<u8> {
        if let Some(magnitude) = self.config.snapshot_noise {
            self.noise_bitmap(magnitude);
        }
        self.inner.to_blob()
    }
}

/// 2D context whose pixel reads carry colour noise.
pub struct NoisyContext2d {
    inner: Rc<RefCell<dyn Context2d>>,
    magnitude: f64,
    noise: SharedNoise,
}

impl Context2d for NoisyContext2d {
    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, rgba: [u8; 4]) {
        self.inner.borrow_mut().fill_rect(x, y, width, height, rgba);
    }

    fn get_image_data(&self, x: u32, y: u32, width: u32, height: u32) -> ImageData {
        let mut image = self.inner.borrow().get_image_data(x, y, width, height);
        self.noise.borrow_mut().perturb_rgb(&mut image.data, self.magnitude);
        image
    }

    fn put_image_data(&mut self, image: &ImageData, x: u32, y: u32) {
        self.inner.borrow_mut().put_image_data(image, x, y);
    }
}

/// WebGL context reporting the spoofed GPU identity.
pub struct SpoofedWebGl {
    inner: Rc<RefCell<dyn WebGlContext>>,
    spoof: WebGlSpoof,
    noise: SharedNoise,
}

impl WebGlContext for SpoofedWebGl {
    fn get_parameter(&self, code: u32) -> GlParameter {
        match self.spoof.parameter(code) {
            Some(value) => GlParameter::Text(value.to_string()),
            None => self.inner.borrow().get_parameter(code),
        }
    }

    fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32, out: &mut [u8]) {
        self.inner.borrow().read_pixels(x, y, width, height, out);
        if let Some(magnitude) = self.spoof.pixel_noise {
            self.noise.borrow_mut().perturb_pixels(out, magnitude);
        }
    }
}

pub struct ProfileAudio {
    inner: Box<dyn AudioProvider>,
    magnitude: f64,
    noise: SharedNoise,
}

impl ProfileAudio {
    pub fn new(inner: Box<dyn AudioProvider>, magnitude: f64, noise: SharedNoise) -> Self {
        Self {
            inner,
            magnitude,
            noise,
        }
    }
}

impl AudioProvider for ProfileAudio {
    fn create_analyser(&self) -> Box<dyn AnalyserNode> {
        Box::new(NoisyAnalyser {
            inner: self.inner.create_analyser(),
            magnitude: self.magnitude,
            noise: self.noise.clone(),
        })
    }
}

pub struct NoisyAnalyser {
    inner: Box<dyn AnalyserNode>,
    magnitude: f64,
    noise: SharedNoise,
}

impl AnalyserNode for NoisyAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.inner.frequency_bin_count()
    }

    fn get_float_frequency_data(&self, out: &mut [f32]) {
        self.inner.get_float_frequency_data(out);
        self.noise.borrow_mut().perturb_bins(out, self.magnitude);
    }
}
