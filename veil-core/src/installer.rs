//! Installer: profile in, decorated browsing context out.
//!
//! One synchronous pass. Every registry entry is applied independently; a
//! missing surface or a bad entry produces an event and leaves that surface
//! native, and the remaining entries still apply.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::capability::BrowsingContext;
use crate::error::VeilError;
use crate::events::{EventLog, EventSink, InstallEvent, InstallReport, LogSink};
use crate::noise::{RandomNoise, SeededNoise, SharedNoise};
use crate::overrides::{
    ProfileAudio, ProfileBattery, ProfileClock, ProfileDisplay, ProfileGraphics, ProfileIdentity,
    ProfileNetwork, ProfilePermissions, RenderingConfig,
};
use crate::profile::Profile;
use crate::registry::{member, Override, OverrideKey, OverrideRegistry, Surface};

/// Host-side installation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallOptions {
    /// Fixed noise seed for reproducible diagnostics. `None` draws from
    /// entropy.
    pub noise_seed: Option<u64>,
    /// Remove the WebRTC entry points in the same pass.
    pub suppress_webrtc: bool,
    /// Console log level for the wasm host.
    pub log_level: String,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            noise_seed: None,
            suppress_webrtc: false,
            log_level: "info".to_string(),
        }
    }
}

impl InstallOptions {
    pub fn noise_source(&self) -> SharedNoise {
        match self.noise_seed {
            Some(seed) => SeededNoise::shared(seed),
            None => RandomNoise::shared(),
        }
    }
}

pub struct Installer {
    options: InstallOptions,
    sink: Rc<dyn EventSink>,
    noise: Option<SharedNoise>,
}

impl Installer {
    pub fn new(options: InstallOptions) -> Self {
        Self {
            options,
            sink: Rc::new(LogSink),
            noise: None,
        }
    }

    pub fn with_sink(mut self, sink: Rc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the noise source; takes precedence over `noise_seed`.
    pub fn with_noise(mut self, noise: SharedNoise) -> Self {
        self.noise = Some(noise);
        self
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    /// Sanitize the profile, derive the registry, and decorate every
    /// surface the registry names. Never fails.
    pub fn install(&self, mut ctx: BrowsingContext, profile: &Profile) -> (BrowsingContext, InstallReport) {
        let mut events = EventLog::new(self.sink.as_ref());

        if ctx.installed {
            events.emit(InstallEvent::AlreadyInstalled);
            return (ctx, events.finish());
        }

        let (profile, corrections) = profile.clone().sanitized();
        for correction in &corrections {
            events.emit(InstallEvent::from(correction));
        }

        let registry = OverrideRegistry::build(&profile, ctx.clock.now());
        for (key, err) in registry.failures() {
            events.error(key, err);
        }

        let noise = self
            .noise
            .clone()
            .unwrap_or_else(|| self.options.noise_source());

        if has_any(&registry, &[Surface::Navigator], &[member::GET_BATTERY]) {
            ctx.identity = Box::new(ProfileIdentity::new(ctx.identity, &registry));
        }
        if has_any(&registry, &[Surface::Screen, Surface::Window], &[]) {
            ctx.display = Box::new(ProfileDisplay::new(ctx.display, &registry));
        }
        if let Some(temporal) = registry.temporal() {
            ctx.clock = Box::new(ProfileClock::new(ctx.clock, temporal.clone()));
        }
        let rendering = RenderingConfig::from_registry(&registry);
        if !rendering.is_empty() {
            ctx.graphics = Box::new(ProfileGraphics::new(ctx.graphics, rendering, noise.clone()));
        }
        if registry.has_surface(Surface::Connection) {
            ctx.network = Box::new(ProfileNetwork::new(ctx.network, &registry));
        }

        let has_connection = ctx.network.connection().is_some();
        for (key, value) in registry.entries() {
            match value {
                Override::Accessor(_) if key.surface == Surface::Connection && !has_connection => {
                    events.error(key, &unavailable(key))
                }
                Override::AnalyserNoise(magnitude) => match ctx.audio.take() {
                    Some(audio) => {
                        ctx.audio = Some(Box::new(ProfileAudio::new(audio, *magnitude, noise.clone())));
                        events.applied(key);
                    }
                    None => events.error(key, &unavailable(key)),
                },
                Override::BatteryState { level, charging } => match ctx.battery.take() {
                    Some(battery) => {
                        ctx.battery = Some(Box::new(ProfileBattery::new(battery, *level, *charging)));
                        events.applied(key);
                    }
                    None => events.error(key, &unavailable(key)),
                },
                Override::PermissionStates(states) => match ctx.permissions.take() {
                    Some(permissions) => {
                        ctx.permissions = Some(Box::new(ProfilePermissions::new(permissions, states.clone())));
                        events.applied(key);
                    }
                    None => events.error(key, &unavailable(key)),
                },
                _ => events.applied(key),
            }
        }

        ctx.installed = true;
        let report = events.finish();
        log::info!(
            "fingerprint overrides installed: {} applied, {} skipped, {} failed",
            report.applied.len(),
            report.skipped.len(),
            report.failed.len()
        );
        (ctx, report)
    }
}

impl Default for Installer {
    fn default() -> Self {
        Self::new(InstallOptions::default())
    }
}

fn unavailable(key: &OverrideKey) -> VeilError {
    VeilError::SurfaceUnavailable(key.to_string())
}

// Whether any entry lives on one of `surfaces`, ignoring the listed members.
fn has_any(registry: &OverrideRegistry, surfaces: &[Surface], except: &[&str]) -> bool {
    registry
        .entries()
        .any(|(key, _)| surfaces.contains(&key.surface) && !except.contains(&key.member))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options: InstallOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.noise_seed, None);
        assert!(!options.suppress_webrtc);
        assert_eq!(options.log_level, "info");
    }

    #[test]
    fn test_options_partial() {
        let options: InstallOptions = serde_json::from_str(r#"{"noise_seed": 42}"#).unwrap();
        assert_eq!(options.noise_seed, Some(42));
        assert_eq!(options.log_level, "info");
    }
}
