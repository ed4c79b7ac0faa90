//! # Veil WASM
//!
//! Profile-driven browser fingerprint overrides compiled to WebAssembly.
//!
//! The engine itself (profile, override registry, noise, temporal layer,
//! installer) lives in [`veil_core`] and has no browser dependencies. This
//! crate applies it to a live JS realm and carries the extension-side
//! collaborators.
//!
//! ## Architecture
//!
//! ```text
//! Profile (JS object)
//!   ↓ serde-wasm-bindgen
//! veil_core::OverrideRegistry
//!   ↓
//! fingerprint_override (Proxy / Reflect over the realm)
//!
//! extension: proxy auth listener, WebRTC policy
//! ```

use wasm_bindgen::prelude::*;

mod error;
pub mod extension;
pub mod fingerprint_override;

pub use veil_core;

/// Initialize logging once per realm.
#[wasm_bindgen(start)]
pub fn init() {
    // A second module instance in the same realm already has a logger.
    if console_log::init_with_level(log::Level::Info).is_err() {
        return;
    }
    log::info!("veil-wasm {} initialized", env!("CARGO_PKG_VERSION"));
}
