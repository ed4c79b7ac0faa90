//! Synthetic identity profile.
//!
//! The profile arrives from outside the engine as an already-generated
//! record. Every field is optional; an absent field leaves the matching
//! surface native. Fields are read leniently: a malformed value is treated
//! as absent instead of rejecting the whole record.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, VeilError};

/// Vertical allowance (taskbar/dock) subtracted from the screen height when
/// the available height has to be derived from the screen alone.
pub const TASKBAR_INSET: u32 = 40;

/// The synthetic identity a browsing context reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    #[serde(deserialize_with = "lenient")]
    pub platform: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub hardware_concurrency: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub device_memory: Option<f64>,
    #[serde(deserialize_with = "lenient_count")]
    pub max_touch_points: Option<u32>,
    /// Raw `Accept-Language` style list, e.g. `"en-US,en;q=0.9"`.
    #[serde(deserialize_with = "lenient")]
    pub language: Option<String>,

    #[serde(deserialize_with = "lenient_count")]
    pub screen_width: Option<u32>,
    #[serde(deserialize_with = "lenient_count")]
    pub screen_height: Option<u32>,
    #[serde(deserialize_with = "lenient_count")]
    pub viewport_width: Option<u32>,
    #[serde(deserialize_with = "lenient_count")]
    pub viewport_height: Option<u32>,
    #[serde(deserialize_with = "lenient_count")]
    pub color_depth: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub pixel_ratio: Option<f64>,

    /// IANA zone name, e.g. `"Europe/Berlin"`.
    #[serde(deserialize_with = "lenient")]
    pub timezone: Option<String>,

    #[serde(deserialize_with = "lenient")]
    pub webgl_vendor: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub webgl_renderer: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub webgl_noise: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub canvas_noise: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub audio_noise: Option<f64>,

    #[serde(deserialize_with = "lenient")]
    pub battery_level: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub battery_charging: Option<bool>,

    #[serde(deserialize_with = "lenient")]
    pub connection_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub connection_downlink: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub connection_rtt: Option<f64>,

    #[serde(deserialize_with = "lenient")]
    pub do_not_track: Option<String>,

    /// Permission name -> fixed state (`"granted"`, `"denied"`, `"prompt"`).
    #[serde(deserialize_with = "lenient_permissions")]
    pub permissions: BTreeMap<String, String>,
}

/// A field `Profile::sanitized` dropped or adjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileCorrection {
    pub field: &'static str,
    pub reason: String,
}

impl ProfileCorrection {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl Profile {
    /// Parse a profile from JSON. Malformed fields are dropped, but the
    /// document itself must be a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Same as [`Profile::from_json`], for a document that is already
    /// parsed (the wasm host converts the JS object first).
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        // Derived struct visitors also take arrays, mapping elements by position.
        if !value.is_object() {
            return Err(VeilError::InvalidProfile("profile must be a JSON object".into()));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Enforce the record invariants without failing.
    ///
    /// Out-of-range values are dropped (the surface stays native) and
    /// viewport dimensions are clamped to the screen.
    pub fn sanitized(mut self) -> (Self, Vec<ProfileCorrection>) {
        let mut corrections = Vec::new();

        drop_unless(&mut self.hardware_concurrency, "hardware_concurrency", |v| *v >= 1, &mut corrections);
        drop_unless(&mut self.device_memory, "device_memory", |v| v.is_finite() && *v > 0.0, &mut corrections);
        drop_unless(&mut self.screen_width, "screen_width", |v| *v > 0, &mut corrections);
        drop_unless(&mut self.screen_height, "screen_height", |v| *v > 0, &mut corrections);
        drop_unless(&mut self.viewport_width, "viewport_width", |v| *v > 0, &mut corrections);
        drop_unless(&mut self.viewport_height, "viewport_height", |v| *v > 0, &mut corrections);
        drop_unless(&mut self.color_depth, "color_depth", |v| *v > 0, &mut corrections);
        drop_unless(&mut self.pixel_ratio, "pixel_ratio", |v| v.is_finite() && *v > 0.0, &mut corrections);
        drop_unless(&mut self.battery_level, "battery_level", |v| (0.0..=1.0).contains(v), &mut corrections);
        drop_unless(&mut self.connection_downlink, "connection_downlink", |v| v.is_finite() && *v >= 0.0, &mut corrections);
        drop_unless(&mut self.connection_rtt, "connection_rtt", |v| v.is_finite() && *v >= 0.0, &mut corrections);

        for (field, noise) in [
            ("webgl_noise", &mut self.webgl_noise),
            ("canvas_noise", &mut self.canvas_noise),
            ("audio_noise", &mut self.audio_noise),
        ] {
            drop_unless(noise, field, |v| v.is_finite() && *v >= 0.0, &mut corrections);
        }

        if self.language.as_deref().map(parse_languages).is_some_and(|l| l.is_empty()) {
            self.language = None;
            corrections.push(ProfileCorrection::new("language", "no locale tags"));
        }

        clamp_to(&mut self.viewport_width, self.screen_width, "viewport_width", &mut corrections);
        clamp_to(&mut self.viewport_height, self.screen_height, "viewport_height", &mut corrections);

        (self, corrections)
    }

    /// Parsed language list, primary first.
    pub fn languages(&self) -> Option<Vec<String>> {
        self.language
            .as_deref()
            .map(parse_languages)
            .filter(|langs| !langs.is_empty())
    }

    /// First entry of [`Profile::languages`].
    pub fn primary_language(&self) -> Option<String> {
        self.languages().and_then(|langs| langs.into_iter().next())
    }

    /// Available width: viewport if given, else the full screen width.
    pub fn avail_width(&self) -> Option<u32> {
        self.viewport_width.or(self.screen_width)
    }

    /// Available height: viewport if given, else the screen height minus
    /// [`TASKBAR_INSET`].
    pub fn avail_height(&self) -> Option<u32> {
        self.viewport_height
            .or_else(|| self.screen_height.map(|h| h.saturating_sub(TASKBAR_INSET)))
    }

    pub fn canvas_noise(&self) -> Option<f64> {
        active_noise(self.canvas_noise)
    }

    pub fn webgl_noise(&self) -> Option<f64> {
        active_noise(self.webgl_noise)
    }

    pub fn audio_noise(&self) -> Option<f64> {
        active_noise(self.audio_noise)
    }
}

/// Split a raw language string on commas and strip `;q=` weights.
///
/// `"en-US,fr;q=0.8"` becomes `["en-US", "fr"]`.
pub fn parse_languages(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|entry| entry.split(';').next())
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

// Zero noise disables the injector rather than installing a no-op wrapper.
fn active_noise(noise: Option<f64>) -> Option<f64> {
    noise.filter(|n| n.is_finite() && *n > 0.0)
}

fn drop_unless<T: std::fmt::Debug>(
    value: &mut Option<T>,
    field: &'static str,
    valid: impl Fn(&T) -> bool,
    corrections: &mut Vec<ProfileCorrection>,
) {
    if let Some(v) = value.as_ref() {
        if !valid(v) {
            corrections.push(ProfileCorrection::new(field, format!("out of range: {:?}", v)));
            *value = None;
        }
    }
}

fn clamp_to(
    value: &mut Option<u32>,
    limit: Option<u32>,
    field: &'static str,
    corrections: &mut Vec<ProfileCorrection>,
) {
    if let (Some(v), Some(max)) = (*value, limit) {
        if v > max {
            corrections.push(ProfileCorrection::new(field, format!("clamped {} to {}", v, max)));
            *value = Some(max);
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

// Integer fields also accept integral floats (`8.0`), which is what a JS
// number round-trips to.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })
        .and_then(|n| u32::try_from(n).ok()))
}

fn lenient_permissions<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let map = match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .filter_map(|(name, state)| state.as_str().map(|s| (name, s.to_string())))
            .filter(|(_, state)| !state.is_empty())
            .collect(),
        _ => BTreeMap::new(),
    };
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parsing() {
        let profile = Profile {
            language: Some("en-US,fr;q=0.8".into()),
            ..Default::default()
        };
        assert_eq!(profile.languages().unwrap(), vec!["en-US", "fr"]);
        assert_eq!(profile.primary_language().unwrap(), "en-US");
    }

    #[test]
    fn test_language_whitespace_and_empty_entries() {
        assert_eq!(
            parse_languages(" de-DE , de;q=0.9,, en;q=0.8 "),
            vec!["de-DE", "de", "en"]
        );
        assert!(parse_languages(" , ;q=0.5").is_empty());
    }

    #[test]
    fn test_avail_from_viewport() {
        let profile = Profile {
            screen_width: Some(1920),
            screen_height: Some(1080),
            viewport_width: Some(1366),
            viewport_height: Some(768),
            ..Default::default()
        };
        assert_eq!(profile.avail_width(), Some(1366));
        assert_eq!(profile.avail_height(), Some(768));
    }

    #[test]
    fn test_avail_height_inset() {
        let profile = Profile {
            screen_height: Some(1080),
            ..Default::default()
        };
        assert_eq!(profile.avail_height(), Some(1040));
        assert_eq!(profile.avail_width(), None);
    }

    #[test]
    fn test_zero_noise_is_inactive() {
        let profile = Profile {
            canvas_noise: Some(0.0),
            webgl_noise: Some(0.2),
            ..Default::default()
        };
        assert_eq!(profile.canvas_noise(), None);
        assert_eq!(profile.webgl_noise(), Some(0.2));
        assert_eq!(profile.audio_noise(), None);
    }

    #[test]
    fn test_sanitize_clamps_viewport() {
        let profile = Profile {
            screen_width: Some(1280),
            screen_height: Some(720),
            viewport_width: Some(1366),
            viewport_height: Some(700),
            ..Default::default()
        };
        let (profile, corrections) = profile.sanitized();
        assert_eq!(profile.viewport_width, Some(1280));
        assert_eq!(profile.viewport_height, Some(700));
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].field, "viewport_width");
    }

    #[test]
    fn test_sanitize_drops_negative_noise() {
        let profile = Profile {
            canvas_noise: Some(-0.1),
            audio_noise: Some(f64::NAN),
            battery_level: Some(1.5),
            hardware_concurrency: Some(0),
            ..Default::default()
        };
        let (profile, corrections) = profile.sanitized();
        assert_eq!(profile.canvas_noise, None);
        assert_eq!(profile.audio_noise, None);
        assert_eq!(profile.battery_level, None);
        assert_eq!(profile.hardware_concurrency, None);
        assert_eq!(corrections.len(), 4);
    }

    #[test]
    fn test_lenient_json() {
        let profile = Profile::from_json(
            r#"{
                "platform": "Win32",
                "hardware_concurrency": 8.0,
                "device_memory": "lots",
                "screen_width": 1920,
                "user_agent": "Mozilla/5.0",
                "permissions": {"geolocation": "denied", "camera": 3}
            }"#,
        )
        .unwrap();
        assert_eq!(profile.platform.as_deref(), Some("Win32"));
        assert_eq!(profile.hardware_concurrency, Some(8));
        assert_eq!(profile.device_memory, None);
        assert_eq!(profile.screen_width, Some(1920));
        assert_eq!(profile.permissions.len(), 1);
        assert_eq!(profile.permissions["geolocation"], "denied");
    }

    #[test]
    fn test_non_object_json_is_rejected() {
        assert!(Profile::from_json("[1, 2]").is_err());
        assert!(Profile::from_json("\"Win32\"").is_err());
        assert!(matches!(
            Profile::from_value(serde_json::json!(["Win32", 8])),
            Err(VeilError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_from_value_accepts_js_numbers() {
        // JS hands every number over as a float.
        let profile = Profile::from_value(serde_json::json!({
            "platform": "Win32",
            "hardware_concurrency": 8.0,
        }))
        .unwrap();
        assert_eq!(profile.platform.as_deref(), Some("Win32"));
        assert_eq!(profile.hardware_concurrency, Some(8));
    }
}
