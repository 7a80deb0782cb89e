//! Engine module housing the hardware-facing seams of the voice path.
//!
//! `backend` holds the platform, stream, route and device-selection traits
//! plus the deterministic stub hardware; `extension` holds the optional
//! multi-session extension.

pub mod backend;
pub mod extension;

pub use backend::{
    AuxiliaryPaths, DeviceSelector, NoAuxiliaryPaths, PcmHandle, PcmProvider, PlatformControl,
    RouteControl, StubHardware,
};
pub use extension::{MultiSessionExtension, NoExtension, VoiceExtension};
