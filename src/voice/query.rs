//! Derived call-state predicates.
//!
//! Session-dependent answers come from the voice extension first; the
//! single-session base runs only when the extension reports unsupported.

use log::{trace, warn};

use super::VoiceController;
use crate::device::{
    AudioDevice, AudioMode, AudioSource, RecordingSource, UsecaseType, VOICE_SESS_IDX,
    VOICE_VSID,
};
use crate::error::ExtensionResultExt;

/// Which call legs a capture source records.
pub fn classify_recording_source(source: AudioSource) -> RecordingSource {
    match source {
        AudioSource::VoiceUplink => RecordingSource::Uplink,
        AudioSource::VoiceDownlink => RecordingSource::Downlink,
        AudioSource::VoiceCall => RecordingSource::UplinkAndDownlink,
        _ => RecordingSource::None,
    }
}

pub fn is_in_call_rec_stream(source: AudioSource) -> bool {
    classify_recording_source(source) != RecordingSource::None
}

impl VoiceController {
    /// True if any session is active, regardless of mode.
    pub fn is_call_state_active(&self, dev: &AudioDevice) -> bool {
        self.services
            .extension
            .is_call_state_active(dev)
            .or_base(|| {
                Ok(dev
                    .voice
                    .session(VOICE_SESS_IDX)
                    .is_some_and(|s| s.is_active()))
            })
            .unwrap_or_else(|err| {
                warn!("is_call_state_active: extension failed: {}", err);
                false
            })
    }

    /// Alias kept for callers that reason per session rather than per call.
    pub fn is_call_active_any_session(&self, dev: &AudioDevice) -> bool {
        self.is_call_state_active(dev)
    }

    /// Any session active and the device is in IN_CALL mode.
    pub fn is_call_state_active_in_call(&self, dev: &AudioDevice) -> bool {
        self.is_call_state_active(dev) && dev.is_in_call_mode()
    }

    /// Legacy single-call view: in-call flag and IN_CALL mode.
    pub fn is_in_call(&self, dev: &AudioDevice) -> bool {
        dev.voice.in_call && dev.is_in_call_mode()
    }

    pub fn is_in_call_or_call_screen(&self, dev: &AudioDevice) -> bool {
        dev.voice.in_call
    }

    pub fn is_usecase_active(&self, dev: &AudioDevice) -> bool {
        dev.voice.uc_active
    }

    pub fn is_lte_call_active(&self, dev: &AudioDevice) -> bool {
        dev.voice.lte_call
    }

    pub fn mic_mute(&self, dev: &AudioDevice) -> bool {
        dev.voice.mic_mute
    }

    /// VSID of the active session, or the default VSID.
    pub fn active_session_id(&self, dev: &AudioDevice) -> u32 {
        self.services
            .extension
            .active_session_id(dev)
            .or_base(|| Ok(VOICE_VSID))
            .unwrap_or(VOICE_VSID)
    }

    /// Any voice usecase linked, unless the device is screening a call.
    pub fn voice_call_usecases_active(&self, dev: &AudioDevice) -> bool {
        if dev.mode == AudioMode::CallScreen {
            return false;
        }
        let active = dev
            .usecases
            .iter()
            .find(|uc| uc.kind == UsecaseType::VoiceCall);
        if let Some(uc) = active {
            trace!("voice_call_usecases_active: voice usecase {} is active", uc.id);
        }
        active.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_recording_source() {
        assert_eq!(
            classify_recording_source(AudioSource::VoiceUplink),
            RecordingSource::Uplink
        );
        assert_eq!(
            classify_recording_source(AudioSource::VoiceDownlink),
            RecordingSource::Downlink
        );
        assert_eq!(
            classify_recording_source(AudioSource::VoiceCall),
            RecordingSource::UplinkAndDownlink
        );
        assert_eq!(
            classify_recording_source(AudioSource::Mic),
            RecordingSource::None
        );
    }

    #[test]
    fn test_in_call_rec_stream() {
        assert!(is_in_call_rec_stream(AudioSource::VoiceCall));
        assert!(!is_in_call_rec_stream(AudioSource::Camcorder));
        assert!(!is_in_call_rec_stream(AudioSource::VoiceCommunication));
    }
}
