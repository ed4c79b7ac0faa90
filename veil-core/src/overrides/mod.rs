//! Profile-backed decorators over the capability traits.

pub mod device;
pub mod identity;
pub mod permissions;
pub mod rendering;
pub mod temporal;

pub use device::{ProfileBattery, ProfileNetwork};
pub use identity::{ProfileDisplay, ProfileIdentity};
pub use permissions::ProfilePermissions;
pub use rendering::{ProfileAudio, ProfileGraphics, RenderingConfig};
pub use temporal::ProfileClock;
