//! Mic mute, voice-device mute and voice volume.

use log::{debug, warn};

use super::VoiceController;
use crate::device::{AudioDevice, AudioMode, MuteDirection};
use crate::error::{log_voice_error, VoiceError};
use crate::telemetry::{MutePath, VoiceEvent};

/// Convert a caller volume (0 silent .. 1 loud) to the driver scale
/// (0 loudest .. 100 silent). Out-of-range and NaN inputs are clamped first.
pub fn volume_to_driver(volume: f32) -> i32 {
    let vol = (f64::from(clamp_volume(volume)) * 100.0).round_ties_even() as i32;
    100 - vol
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// A path that is not compiled in has nothing to apply.
pub(super) fn ignore_unsupported(result: Result<(), VoiceError>) -> Result<(), VoiceError> {
    match result {
        Err(err) if err.is_not_supported() => Ok(()),
        other => other,
    }
}

impl VoiceController {
    /// Record the requested mic mute and apply it on the path owning the mic.
    pub fn set_mic_mute(&mut self, dev: &mut AudioDevice, muted: bool) -> Result<(), VoiceError> {
        dev.voice.mic_mute = muted;

        let (path, result) = if self.services.aux.hfp_is_active() {
            (MutePath::Hfp, self.services.aux.hfp_set_mic_mute(muted))
        } else if dev.is_in_call_mode() {
            if dev.voice.use_device_mute {
                (
                    MutePath::DeviceMute,
                    self.services
                        .platform
                        .set_device_mute(muted, MuteDirection::Tx),
                )
            } else {
                (
                    MutePath::MicMute,
                    self.services.platform.set_mic_mute(muted),
                )
            }
        } else if dev.mode == AudioMode::InCommunication {
            (
                MutePath::Voip,
                ignore_unsupported(self.services.aux.voip_set_mic_mute(muted)),
            )
        } else {
            (MutePath::Deferred, Ok(()))
        };

        debug!(
            "set_mic_mute: muted={}, path={:?}, use_device_mute={}",
            muted, path, dev.voice.use_device_mute
        );
        if let Err(err) = &result {
            log_voice_error(err, "set_mic_mute");
        } else {
            self.publish(VoiceEvent::MicMuteApplied { muted, path });
        }
        result
    }

    /// Switch between voice-device mute and stream mic mute.
    ///
    /// Called when an incall-music uplink usecase starts or stops. While that
    /// mix is active only the voice tx path may be muted, so a muted mic is
    /// carried by device mute instead. The new mute is always engaged before
    /// the old one is released.
    pub fn set_device_mute_flag(
        &mut self,
        dev: &mut AudioDevice,
        active: bool,
    ) -> Result<(), VoiceError> {
        let mut first_err = None;
        if dev.voice.mic_mute {
            let platform = &mut self.services.platform;
            let steps = if active {
                [
                    platform.set_device_mute(true, MuteDirection::Tx),
                    platform.set_mic_mute(false),
                ]
            } else {
                [
                    platform.set_mic_mute(true),
                    platform.set_device_mute(false, MuteDirection::Tx),
                ]
            };
            for result in steps {
                if let Err(err) = result {
                    warn!("set_device_mute_flag: {}", err);
                    first_err.get_or_insert(err);
                }
            }
        }
        dev.voice.use_device_mute = active;
        self.publish(VoiceEvent::DeviceMuteFlagChanged { active });

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Record the clamped volume and apply it on the active call path.
    pub fn set_volume(&mut self, dev: &mut AudioDevice, volume: f32) -> Result<(), VoiceError> {
        let volume = clamp_volume(volume);
        dev.voice.volume = volume;

        let mut driver_value = None;
        let result = match dev.mode {
            AudioMode::InCall => {
                let value = volume_to_driver(volume);
                driver_value = Some(value);
                self.services.platform.set_voice_volume(value)
            }
            AudioMode::InCommunication => {
                ignore_unsupported(self.services.aux.voip_set_volume(volume))
            }
            _ => Ok(()),
        };

        match &result {
            Ok(()) => self.publish(VoiceEvent::VolumeApplied {
                volume,
                driver_value,
            }),
            Err(err) => log_voice_error(err, "set_volume"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_volume_endpoints() {
        assert_eq!(volume_to_driver(0.0), 100);
        assert_eq!(volume_to_driver(1.0), 0);
        assert_eq!(volume_to_driver(0.6), 40);
        assert_eq!(volume_to_driver(0.2), 80);
    }

    #[test]
    fn test_volume_out_of_range_clamps() {
        assert_eq!(volume_to_driver(-0.5), 100);
        assert_eq!(volume_to_driver(3.0), 0);
        assert_eq!(volume_to_driver(f32::NAN), 100);
        assert_eq!(volume_to_driver(f32::INFINITY), 0);
    }

    proptest! {
        #[test]
        fn driver_value_stays_in_range(volume in -10.0f32..10.0) {
            let value = volume_to_driver(volume);
            prop_assert!((0..=100).contains(&value));
        }

        #[test]
        fn driver_value_is_monotonic(a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(volume_to_driver(lo) >= volume_to_driver(hi));
        }
    }
}
