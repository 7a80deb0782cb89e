//! Sidetone and adaptive noise-cancellation mixer paths.

use log::{debug, warn};

use super::VoiceController;
use crate::device::SndDevice;
use crate::telemetry::VoiceEvent;

/// Mixer path for sidetone on `device`, or `None` if it has no sidetone.
///
/// USB endpoints take sidetone without a mixer path.
pub fn sidetone_mixer_path(device: SndDevice) -> Option<&'static str> {
    match device {
        SndDevice::OutVoiceHandset => Some("sidetone-handset"),
        SndDevice::OutVoiceHeadphones
        | SndDevice::OutVoiceHeadset
        | SndDevice::OutVoiceAncHeadset
        | SndDevice::OutVoiceAncFbHeadset => Some("sidetone-headphones"),
        SndDevice::OutVoiceUsbHeadset | SndDevice::OutUsbHeadset => Some(""),
        _ => None,
    }
}

pub fn aanc_mixer_path(device: SndDevice) -> Option<&'static str> {
    match device {
        SndDevice::OutAncHandset => Some("aanc-path"),
        _ => None,
    }
}

impl VoiceController {
    pub(crate) fn set_sidetone(&mut self, out_device: SndDevice, enable: bool) {
        debug!(
            "set_sidetone: {}, out_snd_device: {}",
            if enable { "enable" } else { "disable" },
            out_device.name()
        );
        let Some(path) = sidetone_mixer_path(out_device) else {
            warn!("set_sidetone: {} is not a sidetone device", out_device.name());
            return;
        };
        if let Err(err) = self
            .services
            .platform
            .set_sidetone(out_device, enable, path)
        {
            warn!("set_sidetone: platform returned {}", err);
        }
        self.publish(VoiceEvent::SidetoneChanged {
            device: out_device,
            enabled: enable,
        });
    }

    pub(crate) fn update_aanc_path(&mut self, out_device: SndDevice, enable: bool) {
        debug!(
            "update_aanc_path: {}, out_snd_device: {}",
            if enable { "enable" } else { "disable" },
            out_device.name()
        );
        let Some(path) = aanc_mixer_path(out_device) else {
            return;
        };
        if let Err(err) = self
            .services
            .platform
            .update_aanc_path(out_device, enable, path)
        {
            warn!("update_aanc_path: platform returned {}", err);
        }
        self.publish(VoiceEvent::AancChanged {
            device: out_device,
            enabled: enable,
        });
    }
}
