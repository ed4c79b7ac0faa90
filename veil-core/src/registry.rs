//! Override registry.
//!
//! Maps a `(surface, member)` pair to the value or wrapper that replaces
//! it. Built once per browsing context from a sanitized [`Profile`]; both
//! the native capability layer and the wasm bindings install from the same
//! registry, so the two can never drift apart.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::VeilError;
use crate::profile::Profile;
use crate::timezone::TemporalOverride;

/// A script-observable object whose members get overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Surface {
    Navigator,
    Screen,
    Window,
    Date,
    DateTimeFormat,
    CanvasElement,
    Context2d,
    AudioContext,
    Connection,
    Permissions,
}

impl Surface {
    /// Name of the script-visible object the surface lives on.
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Navigator => "navigator",
            Surface::Screen => "screen",
            Surface::Window => "window",
            Surface::Date => "Date.prototype",
            Surface::DateTimeFormat => "Intl.DateTimeFormat.prototype",
            Surface::CanvasElement => "HTMLCanvasElement.prototype",
            Surface::Context2d => "CanvasRenderingContext2D.prototype",
            Surface::AudioContext => "AudioContext.prototype",
            Surface::Connection => "navigator.connection",
            Surface::Permissions => "navigator.permissions",
        }
    }
}

/// Member names, spelled the way pages see them.
pub mod member {
    pub const PLATFORM: &str = "platform";
    pub const HARDWARE_CONCURRENCY: &str = "hardwareConcurrency";
    pub const DEVICE_MEMORY: &str = "deviceMemory";
    pub const MAX_TOUCH_POINTS: &str = "maxTouchPoints";
    pub const LANGUAGE: &str = "language";
    pub const LANGUAGES: &str = "languages";
    pub const DO_NOT_TRACK: &str = "doNotTrack";
    pub const GET_BATTERY: &str = "getBattery";

    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const AVAIL_WIDTH: &str = "availWidth";
    pub const AVAIL_HEIGHT: &str = "availHeight";
    pub const COLOR_DEPTH: &str = "colorDepth";
    pub const PIXEL_DEPTH: &str = "pixelDepth";
    pub const DEVICE_PIXEL_RATIO: &str = "devicePixelRatio";

    pub const GET_TIMEZONE_OFFSET: &str = "getTimezoneOffset";
    pub const RESOLVED_OPTIONS: &str = "resolvedOptions";

    pub const GET_CONTEXT: &str = "getContext";
    pub const TO_DATA_URL: &str = "toDataURL";
    pub const TO_BLOB: &str = "toBlob";
    pub const GET_IMAGE_DATA: &str = "getImageData";
    pub const CREATE_ANALYSER: &str = "createAnalyser";

    pub const EFFECTIVE_TYPE: &str = "effectiveType";
    pub const DOWNLINK: &str = "downlink";
    pub const RTT: &str = "rtt";

    pub const QUERY: &str = "query";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OverrideKey {
    pub surface: Surface,
    pub member: &'static str,
}

impl OverrideKey {
    pub const fn new(surface: Surface, member: &'static str) -> Self {
        Self { surface, member }
    }
}

impl fmt::Display for OverrideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.surface.as_str(), self.member)
    }
}

/// Fixed value returned by a read-only accessor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OverrideValue {
    Text(String),
    Integer(u32),
    Number(f64),
    TextList(Vec<String>),
}

impl OverrideValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            OverrideValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<u32> {
        match self {
            OverrideValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Integers widen to numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            OverrideValue::Number(n) => Some(*n),
            OverrideValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            OverrideValue::TextList(list) => Some(list),
            _ => None,
        }
    }
}

/// WebGL identity applied to every WebGL context a canvas hands out.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct WebGlSpoof {
    pub vendor: Option<String>,
    pub renderer: Option<String>,
    /// Noise magnitude for `readPixels`; `None` leaves reads untouched.
    pub pixel_noise: Option<f64>,
}

impl WebGlSpoof {
    pub const VENDOR: u32 = 0x1F00;
    pub const RENDERER: u32 = 0x1F01;
    pub const UNMASKED_VENDOR: u32 = 0x9245;
    pub const UNMASKED_RENDERER: u32 = 0x9246;

    /// Spoofed string for a parameter code, if this code is spoofed.
    pub fn parameter(&self, code: u32) -> Option<&str> {
        match code {
            Self::VENDOR | Self::UNMASKED_VENDOR => self.vendor.as_deref(),
            Self::RENDERER | Self::UNMASKED_RENDERER => self.renderer.as_deref(),
            _ => None,
        }
    }
}

/// What replaces a registry member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Override {
    /// Read-only accessor returning a fixed value.
    Accessor(OverrideValue),
    /// Offset accessor, minutes positive west of UTC.
    TimezoneOffset(i32),
    /// Formatter resolver whose zone field is overwritten.
    ResolvedTimeZone(String),
    /// Context-creation wrapper.
    ContextQuery(WebGlSpoof),
    /// 2D pixel read wrapper, with noise magnitude.
    PixelReadNoise(f64),
    /// Bitmap serialization wrapper; noises the visible buffer first.
    SnapshotNoise(f64),
    /// Analyser factory wrapper, with per-bin noise magnitude.
    AnalyserNoise(f64),
    /// Battery handle wrapper.
    BatteryState {
        level: Option<f64>,
        charging: Option<bool>,
    },
    /// Permission query wrapper with fixed states.
    PermissionStates(BTreeMap<String, String>),
}

/// Registry derived once from a profile.
#[derive(Debug, Clone, Default)]
pub struct OverrideRegistry {
    entries: BTreeMap<OverrideKey, Override>,
    failures: Vec<(OverrideKey, VeilError)>,
    temporal: Option<TemporalOverride>,
}

impl OverrideRegistry {
    /// Derive every override the profile asks for. `at` is the installation
    /// instant used to pin the zone offset.
    pub fn build(profile: &Profile, at: DateTime<Utc>) -> Self {
        let mut registry = Self::default();
        registry.add_identity(profile);
        registry.add_display(profile);
        registry.add_temporal(profile, at);
        registry.add_rendering(profile);
        registry.add_device(profile);
        registry
    }

    fn insert(&mut self, surface: Surface, member: &'static str, value: Override) {
        self.entries.insert(OverrideKey::new(surface, member), value);
    }

    fn accessor(&mut self, surface: Surface, member: &'static str, value: Option<OverrideValue>) {
        if let Some(value) = value {
            self.insert(surface, member, Override::Accessor(value));
        }
    }

    fn add_identity(&mut self, p: &Profile) {
        use OverrideValue::*;
        let nav = Surface::Navigator;
        self.accessor(nav, member::PLATFORM, p.platform.clone().map(Text));
        self.accessor(nav, member::HARDWARE_CONCURRENCY, p.hardware_concurrency.map(Integer));
        self.accessor(nav, member::DEVICE_MEMORY, p.device_memory.map(Number));
        self.accessor(nav, member::MAX_TOUCH_POINTS, p.max_touch_points.map(Integer));
        self.accessor(nav, member::DO_NOT_TRACK, p.do_not_track.clone().map(Text));

        // Both language members come from the same parsed list.
        if let Some(languages) = p.languages() {
            self.accessor(nav, member::LANGUAGE, languages.first().cloned().map(Text));
            self.accessor(nav, member::LANGUAGES, Some(TextList(languages)));
        }
    }

    fn add_display(&mut self, p: &Profile) {
        use OverrideValue::*;
        let screen = Surface::Screen;
        self.accessor(screen, member::WIDTH, p.screen_width.map(Integer));
        self.accessor(screen, member::HEIGHT, p.screen_height.map(Integer));
        self.accessor(screen, member::AVAIL_WIDTH, p.avail_width().map(Integer));
        self.accessor(screen, member::AVAIL_HEIGHT, p.avail_height().map(Integer));
        self.accessor(screen, member::COLOR_DEPTH, p.color_depth.map(Integer));
        self.accessor(screen, member::PIXEL_DEPTH, p.color_depth.map(Integer));
        self.accessor(Surface::Window, member::DEVICE_PIXEL_RATIO, p.pixel_ratio.map(Number));
    }

    fn add_temporal(&mut self, p: &Profile, at: DateTime<Utc>) {
        let Some(zone) = p.timezone.as_deref() else {
            return;
        };
        let offset_key = OverrideKey::new(Surface::Date, member::GET_TIMEZONE_OFFSET);
        let zone_key = OverrideKey::new(Surface::DateTimeFormat, member::RESOLVED_OPTIONS);
        match TemporalOverride::resolve(zone, at) {
            Ok(temporal) => {
                self.entries.insert(offset_key, Override::TimezoneOffset(temporal.offset_minutes()));
                self.entries.insert(zone_key, Override::ResolvedTimeZone(temporal.zone().to_string()));
                self.temporal = Some(temporal);
            }
            Err(err) => {
                // Neither surface is overridden: a lone offset would be skew.
                self.failures.push((offset_key, err.clone()));
                self.failures.push((zone_key, err));
            }
        }
    }

    fn add_rendering(&mut self, p: &Profile) {
        let spoof = WebGlSpoof {
            vendor: p.webgl_vendor.clone(),
            renderer: p.webgl_renderer.clone(),
            pixel_noise: p.webgl_noise(),
        };
        if spoof != WebGlSpoof::default() {
            self.insert(Surface::CanvasElement, member::GET_CONTEXT, Override::ContextQuery(spoof));
        }

        if let Some(noise) = p.canvas_noise() {
            self.insert(Surface::Context2d, member::GET_IMAGE_DATA, Override::PixelReadNoise(noise));
            self.insert(Surface::CanvasElement, member::TO_DATA_URL, Override::SnapshotNoise(noise));
            self.insert(Surface::CanvasElement, member::TO_BLOB, Override::SnapshotNoise(noise));
        }

        if let Some(noise) = p.audio_noise() {
            self.insert(Surface::AudioContext, member::CREATE_ANALYSER, Override::AnalyserNoise(noise));
        }
    }

    fn add_device(&mut self, p: &Profile) {
        use OverrideValue::*;
        if p.battery_level.is_some() || p.battery_charging.is_some() {
            self.insert(
                Surface::Navigator,
                member::GET_BATTERY,
                Override::BatteryState {
                    level: p.battery_level,
                    charging: p.battery_charging,
                },
            );
        }

        let conn = Surface::Connection;
        self.accessor(conn, member::EFFECTIVE_TYPE, p.connection_type.clone().map(Text));
        self.accessor(conn, member::DOWNLINK, p.connection_downlink.map(Number));
        self.accessor(conn, member::RTT, p.connection_rtt.map(Number));

        if !p.permissions.is_empty() {
            self.insert(
                Surface::Permissions,
                member::QUERY,
                Override::PermissionStates(p.permissions.clone()),
            );
        }
    }

    pub fn get(&self, surface: Surface, member: &str) -> Option<&Override> {
        self.entries
            .iter()
            .find(|(key, _)| key.surface == surface && key.member == member)
            .map(|(_, value)| value)
    }

    /// Accessor value for a member, if that member is overridden by value.
    pub fn value(&self, surface: Surface, member: &str) -> Option<&OverrideValue> {
        match self.get(surface, member) {
            Some(Override::Accessor(value)) => Some(value),
            _ => None,
        }
    }

    /// Entries in deterministic (surface, member) order.
    pub fn entries(&self) -> impl Iterator<Item = (&OverrideKey, &Override)> {
        self.entries.iter()
    }

    pub fn surface(&self, surface: Surface) -> impl Iterator<Item = (&OverrideKey, &Override)> {
        self.entries.iter().filter(move |(key, _)| key.surface == surface)
    }

    pub fn has_surface(&self, surface: Surface) -> bool {
        self.surface(surface).next().is_some()
    }

    /// Entries the profile asked for but that could not be derived.
    pub fn failures(&self) -> &[(OverrideKey, VeilError)] {
        &self.failures
    }

    pub fn temporal(&self) -> Option<&TemporalOverride> {
        self.temporal.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-15T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_empty_profile_builds_nothing() {
        let registry = OverrideRegistry::build(&Profile::default(), now());
        assert!(registry.is_empty());
        assert!(registry.failures().is_empty());
    }

    #[test]
    fn test_language_members_agree() {
        let profile = Profile {
            language: Some("en-US,fr;q=0.8".into()),
            ..Default::default()
        };
        let registry = OverrideRegistry::build(&profile, now());
        let primary = registry.value(Surface::Navigator, member::LANGUAGE).unwrap();
        let list = registry.value(Surface::Navigator, member::LANGUAGES).unwrap();
        assert_eq!(primary.as_text(), Some("en-US"));
        assert_eq!(list.as_text_list().unwrap(), ["en-US", "fr"]);
        assert_eq!(list.as_text_list().unwrap()[0], primary.as_text().unwrap());
    }

    #[test]
    fn test_color_depth_feeds_both_depths() {
        let profile = Profile {
            color_depth: Some(30),
            ..Default::default()
        };
        let registry = OverrideRegistry::build(&profile, now());
        assert_eq!(registry.value(Surface::Screen, member::COLOR_DEPTH).unwrap().as_integer(), Some(30));
        assert_eq!(registry.value(Surface::Screen, member::PIXEL_DEPTH).unwrap().as_integer(), Some(30));
    }

    #[test]
    fn test_temporal_pair() {
        let profile = Profile {
            timezone: Some("Asia/Tokyo".into()),
            ..Default::default()
        };
        let registry = OverrideRegistry::build(&profile, now());
        assert_eq!(
            registry.get(Surface::Date, member::GET_TIMEZONE_OFFSET),
            Some(&Override::TimezoneOffset(-540))
        );
        assert_eq!(
            registry.get(Surface::DateTimeFormat, member::RESOLVED_OPTIONS),
            Some(&Override::ResolvedTimeZone("Asia/Tokyo".into()))
        );
    }

    #[test]
    fn test_unknown_zone_skips_both_time_surfaces() {
        let profile = Profile {
            timezone: Some("Nowhere/Special".into()),
            platform: Some("MacIntel".into()),
            ..Default::default()
        };
        let registry = OverrideRegistry::build(&profile, now());
        assert!(!registry.has_surface(Surface::Date));
        assert!(!registry.has_surface(Surface::DateTimeFormat));
        assert_eq!(registry.failures().len(), 2);
        assert!(registry.value(Surface::Navigator, member::PLATFORM).is_some());
    }

    #[test]
    fn test_zero_noise_installs_no_wrapper() {
        let profile = Profile {
            canvas_noise: Some(0.0),
            audio_noise: Some(0.0),
            webgl_noise: Some(0.0),
            ..Default::default()
        };
        let registry = OverrideRegistry::build(&profile, now());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_webgl_spoof_codes() {
        let spoof = WebGlSpoof {
            vendor: Some("Intel Inc.".into()),
            renderer: None,
            pixel_noise: None,
        };
        assert_eq!(spoof.parameter(0x1F00), Some("Intel Inc."));
        assert_eq!(spoof.parameter(0x9245), Some("Intel Inc."));
        assert_eq!(spoof.parameter(0x9246), None);
        assert_eq!(spoof.parameter(0x0D33), None);
    }

    #[test]
    fn test_key_display() {
        let key = OverrideKey::new(Surface::Context2d, member::GET_IMAGE_DATA);
        assert_eq!(key.to_string(), "CanvasRenderingContext2D.prototype.getImageData");
    }
}
