//! In-call recording usecase selection.

use log::{debug, info};

use super::query::classify_recording_source;
use super::VoiceController;
use crate::device::{AudioDevice, AudioFormat, AudioSource, RecordingSource, SndDevice, UsecaseId};
use crate::error::{log_voice_error, VoiceError};
use crate::telemetry::VoiceEvent;

/// Capture request as seen by the recording selector.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub source: AudioSource,
    pub format: AudioFormat,
    pub channels: u32,
    /// Recording usecase chosen for the request, once selected.
    pub usecase: Option<UsecaseId>,
}

impl CaptureRequest {
    pub fn new(source: AudioSource, format: AudioFormat, channels: u32) -> Self {
        Self {
            source,
            format,
            channels,
            usecase: None,
        }
    }
}

/// Recording usecase for a leg selection and capture encoding.
pub fn recording_usecase(source: RecordingSource, compressed: bool) -> Option<UsecaseId> {
    let usecase = match (source, compressed) {
        (RecordingSource::Uplink, false) => UsecaseId::IncallRecUplink,
        (RecordingSource::Uplink, true) => UsecaseId::IncallRecUplinkCompress,
        (RecordingSource::Downlink, false) => UsecaseId::IncallRecDownlink,
        (RecordingSource::Downlink, true) => UsecaseId::IncallRecDownlinkCompress,
        (RecordingSource::UplinkAndDownlink, false) => UsecaseId::IncallRecUplinkAndDownlink,
        (RecordingSource::UplinkAndDownlink, true) => {
            UsecaseId::IncallRecUplinkAndDownlinkCompress
        }
        (RecordingSource::None, _) => return None,
    };
    Some(usecase)
}

/// Backend capture device feeding an in-call recording source.
pub fn incall_rec_backend_device(source: AudioSource) -> SndDevice {
    match classify_recording_source(source) {
        RecordingSource::Uplink => SndDevice::InIncallRecTx,
        RecordingSource::Downlink => SndDevice::InIncallRecRx,
        RecordingSource::UplinkAndDownlink => SndDevice::InIncallRecRxTx,
        RecordingSource::None => {
            info!("incall_rec_backend_device: invalid source {:?}", source);
            SndDevice::None
        }
    }
}

/// Call input devices whose recording calibration must use the mono
/// topology of a canonical device.
pub const INCALL_REC_DEVICE_MAP: [(SndDevice, SndDevice); 7] = [
    (SndDevice::InHandsetMic, SndDevice::InHandsetMic),
    (SndDevice::InVoiceDmic, SndDevice::InHandsetMic),
    (SndDevice::InAancHandsetMic, SndDevice::InHandsetMic),
    (SndDevice::InVoiceSpeakerMic, SndDevice::InVoiceSpeakerMic),
    (SndDevice::InVoiceSpeakerDmic, SndDevice::InVoiceSpeakerMic),
    (
        SndDevice::InVoiceSpeakerDmicBroadside,
        SndDevice::InVoiceSpeakerMic,
    ),
    (SndDevice::InVoiceSpeakerQmic, SndDevice::InVoiceSpeakerMic),
];

/// Device used to look up recording calibration for a call's input device.
pub fn incall_rec_snd_device(in_device: SndDevice) -> SndDevice {
    let rec_device = INCALL_REC_DEVICE_MAP
        .iter()
        .find(|(from, _)| *from == in_device)
        .map(|(_, to)| *to)
        .unwrap_or(in_device);
    debug!(
        "incall_rec_snd_device: in_snd_device({}) incall_record_device({})",
        in_device.name(),
        rec_device.name()
    );
    rec_device
}

impl VoiceController {
    /// Pick the in-call recording usecase for `request`.
    ///
    /// Without an active call, in-call sources are rejected and every other
    /// source passes through untouched.
    pub fn check_and_set_incall_rec_usecase(
        &mut self,
        dev: &AudioDevice,
        request: &mut CaptureRequest,
    ) -> Result<(), VoiceError> {
        let source = classify_recording_source(request.source);

        if !self.is_call_state_active(dev) {
            if source != RecordingSource::None {
                let err = VoiceError::RecordingWithoutCall {
                    source: request.source,
                };
                log_voice_error(&err, "check_and_set_incall_rec_usecase");
                return Err(err);
            }
            debug!("check_and_set_incall_rec_usecase: voice call not active");
            return Ok(());
        }

        let compressed = self.services.aux.compress_capture_enabled()
            && self.services.aux.compress_capture_supports(request.format);
        let Some(usecase) = recording_usecase(source, compressed) else {
            debug!(
                "check_and_set_incall_rec_usecase: source {:?} doesn't match incall recording criteria",
                request.source
            );
            return Ok(());
        };
        request.usecase = Some(usecase);

        let vsid = self.active_session_id(dev);
        let result = self
            .services
            .platform
            .set_incall_recording_session(vsid, source);
        self.services
            .platform
            .set_incall_recording_channels(request.channels);
        debug!(
            "check_and_set_incall_rec_usecase: update usecase to {}",
            usecase
        );

        match &result {
            Ok(()) => self.publish(VoiceEvent::RecordingSelected {
                usecase,
                vsid,
                channels: request.channels,
            }),
            Err(err) => log_voice_error(err, "check_and_set_incall_rec_usecase"),
        }
        result
    }

    /// Tear down platform recording state for in-call sources.
    pub fn check_and_stop_incall_rec_usecase(
        &mut self,
        request: &CaptureRequest,
    ) -> Result<(), VoiceError> {
        if classify_recording_source(request.source) == RecordingSource::None {
            return Ok(());
        }
        debug!("check_and_stop_incall_rec_usecase: stop in-call recording");
        self.services.platform.stop_incall_recording()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SndDevice::InVoiceSpeakerMic)]
    #[case(SndDevice::InVoiceSpeakerDmic)]
    #[case(SndDevice::InVoiceSpeakerDmicBroadside)]
    #[case(SndDevice::InVoiceSpeakerQmic)]
    fn speaker_variants_coerce_to_speaker_mic(#[case] device: SndDevice) {
        assert_eq!(incall_rec_snd_device(device), SndDevice::InVoiceSpeakerMic);
    }

    #[rstest]
    #[case(SndDevice::InHandsetMic)]
    #[case(SndDevice::InVoiceDmic)]
    #[case(SndDevice::InAancHandsetMic)]
    fn handset_variants_coerce_to_handset_mic(#[case] device: SndDevice) {
        assert_eq!(incall_rec_snd_device(device), SndDevice::InHandsetMic);
    }

    #[rstest]
    #[case(SndDevice::InVoiceHeadsetMic)]
    #[case(SndDevice::InBtScoMic)]
    #[case(SndDevice::None)]
    fn other_devices_pass_through(#[case] device: SndDevice) {
        assert_eq!(incall_rec_snd_device(device), device);
    }

    #[rstest]
    #[case(RecordingSource::Uplink, false, UsecaseId::IncallRecUplink)]
    #[case(RecordingSource::Uplink, true, UsecaseId::IncallRecUplinkCompress)]
    #[case(RecordingSource::Downlink, false, UsecaseId::IncallRecDownlink)]
    #[case(RecordingSource::Downlink, true, UsecaseId::IncallRecDownlinkCompress)]
    #[case(
        RecordingSource::UplinkAndDownlink,
        false,
        UsecaseId::IncallRecUplinkAndDownlink
    )]
    #[case(
        RecordingSource::UplinkAndDownlink,
        true,
        UsecaseId::IncallRecUplinkAndDownlinkCompress
    )]
    fn selects_one_of_six_usecases(
        #[case] source: RecordingSource,
        #[case] compressed: bool,
        #[case] expected: UsecaseId,
    ) {
        assert_eq!(recording_usecase(source, compressed), Some(expected));
    }

    #[test]
    fn test_no_usecase_for_plain_capture() {
        assert_eq!(recording_usecase(RecordingSource::None, true), None);
    }

    #[test]
    fn test_backend_devices() {
        assert_eq!(
            incall_rec_backend_device(AudioSource::VoiceUplink),
            SndDevice::InIncallRecTx
        );
        assert_eq!(
            incall_rec_backend_device(AudioSource::VoiceCall),
            SndDevice::InIncallRecRxTx
        );
        assert_eq!(incall_rec_backend_device(AudioSource::Mic), SndDevice::None);
    }
}
