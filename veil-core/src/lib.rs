//! veil-core: Platform-agnostic fingerprint override engine
//!
//! This crate holds everything that does not need a browser:
//! - the synthetic identity [`Profile`] and its invariants
//! - the [`OverrideRegistry`] derived from it
//! - capability traits for each overridden surface, with profile-backed
//!   decorators and an [`Installer`] that swaps them in
//! - injectable noise sources and the temporal layer
//!
//! The wasm bindings apply the same registry to a real JS realm. Native
//! hosts (and the tests) supply their own [`BrowsingContext`].

pub mod capability;
pub mod error;
pub mod events;
pub mod installer;
pub mod noise;
pub mod overrides;
pub mod profile;
pub mod proxy_auth;
pub mod registry;
pub mod timezone;
pub mod webrtc;

// Re-export everything for easy access
pub use capability::BrowsingContext;
pub use error::{ErrorCode, ErrorInfo, Result, VeilError};
pub use events::{EventSink, InstallEvent, InstallReport, LogSink, RecordingSink};
pub use installer::{InstallOptions, Installer};
pub use noise::{NoiseSource, RandomNoise, ScriptedNoise, SeededNoise, SharedNoise};
pub use profile::{Profile, ProfileCorrection};
pub use proxy_auth::{AuthChallenge, ProxyAuthenticator, ProxyCredentials};
pub use registry::{Override, OverrideKey, OverrideRegistry, OverrideValue, Surface, WebGlSpoof};
pub use timezone::{ResolvedDateTimeOptions, TemporalOverride};
