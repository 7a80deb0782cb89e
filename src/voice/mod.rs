//! Voice call controller.
//!
//! [`VoiceController`] owns the hardware collaborators and drives every voice
//! operation against a caller-owned [`AudioDevice`]. It performs no locking:
//! the audio-I/O layer serializes calls, and every operation runs to
//! completion (or rollback) on the caller's thread.
//!
//! - `lifecycle`: usecase/call start, stop and rollback
//! - `query`: derived call-state predicates
//! - `mute`: mic/device mute and voice volume
//! - `recording`: in-call recording usecase selection
//! - `params`: voice key/value parameters
//! - `paths`: sidetone and AANC mixer paths

mod lifecycle;
mod mute;
mod params;
mod paths;
mod query;
mod recording;

use crate::config::VoiceConfig;
use crate::device::AudioDevice;
use crate::engine::backend::{
    AuxiliaryPaths, DeviceSelector, PcmProvider, PlatformControl, RouteControl,
};
use crate::engine::extension::VoiceExtension;
use crate::telemetry::{EventCollector, VoiceEvent};

pub use mute::volume_to_driver;
pub use params::{
    Parameters, PARAM_HAC, PARAM_INCALL_MUSIC, PARAM_TTY_MODE, TTY_FULL, TTY_HCO, TTY_OFF,
    TTY_VCO,
};
pub use paths::{aanc_mixer_path, sidetone_mixer_path};
pub use query::{classify_recording_source, is_in_call_rec_stream};
pub use recording::{
    incall_rec_backend_device, incall_rec_snd_device, recording_usecase, CaptureRequest,
    INCALL_REC_DEVICE_MAP,
};

/// Collaborators the voice path drives.
pub struct HalServices {
    pub platform: Box<dyn PlatformControl>,
    pub pcm: Box<dyn PcmProvider>,
    pub selector: Box<dyn DeviceSelector>,
    pub routes: Box<dyn RouteControl>,
    pub aux: Box<dyn AuxiliaryPaths>,
    pub extension: Box<dyn VoiceExtension>,
}

/// Voice session lifecycle controller.
pub struct VoiceController {
    services: HalServices,
    config: VoiceConfig,
    events: EventCollector,
}

impl VoiceController {
    pub fn new(services: HalServices, config: VoiceConfig) -> Self {
        Self {
            services,
            config,
            events: EventCollector::default(),
        }
    }

    /// Create the controller and reset the device's voice state.
    pub fn with_device(
        services: HalServices,
        config: VoiceConfig,
        dev: &mut AudioDevice,
    ) -> Self {
        let mut controller = Self::new(services, config);
        controller.init(dev);
        controller
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn events(&self) -> &EventCollector {
        &self.events
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<VoiceEvent> {
        self.events.subscribe()
    }

    fn publish(&mut self, event: VoiceEvent) {
        self.events.publish(event);
    }
}
